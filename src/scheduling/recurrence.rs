use std::collections::HashSet;

use chrono::{DateTime, Datelike, Days, Months, NaiveDate, TimeZone, Utc, Weekday};
use chrono_tz::Tz;

use crate::reminder::{RepeatKind, Schedule};

/// Monthly rules without an end date are expanded one year ahead instead of
/// being clipped to the short daily horizon.
const MONTHLY_LOOKAHEAD_DAYS: u64 = 366;

/// Computes every firing instant of `schedule` strictly after `from`, within
/// a window of `horizon_days` days, sorted ascending.
///
/// Times of day are wall-clock times in `tz`. Local datetimes that do not
/// exist (DST gap) are skipped; ambiguous ones resolve to the earliest
/// mapping. Invalid schedules yield an empty list, never an error.
pub fn occurrences(
    schedule: &Schedule,
    from: DateTime<Utc>,
    horizon_days: u32,
    tz: Tz,
) -> Vec<DateTime<Utc>> {
    if schedule.times.is_empty() {
        return Vec::new();
    }

    if let Some(end_date) = schedule.end_date {
        if end_date < schedule.start_date {
            return Vec::new();
        }
    }

    let mut instants = match schedule.repeat {
        RepeatKind::Once => once_occurrences(schedule, from, tz),
        // Custom rules have no richer rule language yet and fall back to the
        // daily cadence.
        RepeatKind::Daily | RepeatKind::Custom => {
            day_window_occurrences(schedule, from, horizon_days, tz, None)
        }
        RepeatKind::Weekly => match &schedule.weekdays {
            Some(weekdays) if !weekdays.is_empty() => {
                day_window_occurrences(schedule, from, horizon_days, tz, Some(weekdays))
            }
            _ => {
                log::warn!(
                    "Weekly schedule without weekdays produces no occurrences. [start_date = {}]",
                    schedule.start_date
                );
                Vec::new()
            }
        },
        RepeatKind::Monthly => monthly_occurrences(schedule, from, tz),
    };

    instants.sort_unstable();
    instants
}

fn once_occurrences(schedule: &Schedule, from: DateTime<Utc>, tz: Tz) -> Vec<DateTime<Utc>> {
    day_times(schedule, schedule.start_date, tz)
        .filter(|at| *at > from)
        .collect()
}

fn day_window_occurrences(
    schedule: &Schedule,
    from: DateTime<Utc>,
    horizon_days: u32,
    tz: Tz,
    weekdays: Option<&HashSet<Weekday>>,
) -> Vec<DateTime<Utc>> {
    let from_date = from.with_timezone(&tz).date_naive();
    let Some(mut limit) = from_date.checked_add_days(Days::new(u64::from(horizon_days))) else {
        return Vec::new();
    };
    if let Some(end_date) = schedule.end_date {
        limit = limit.min(end_date);
    }

    // Iteration starts at the evaluation date, not the rule's start date, so
    // a rule created long before `from` keeps firing. A start date beyond the
    // horizon stays unscheduled until a later refresh pass reaches it.
    let mut date = schedule.start_date.max(from_date);

    let mut instants = Vec::new();
    while date <= limit {
        if weekdays.is_none_or(|weekdays| weekdays.contains(&date.weekday())) {
            instants.extend(day_times(schedule, date, tz).filter(|at| *at > from));
        }

        match date.succ_opt() {
            Some(next) => date = next,
            None => break,
        }
    }

    instants
}

fn monthly_occurrences(schedule: &Schedule, from: DateTime<Utc>, tz: Tz) -> Vec<DateTime<Utc>> {
    let Some(lookahead_end) = from
        .with_timezone(&tz)
        .date_naive()
        .checked_add_days(Days::new(MONTHLY_LOOKAHEAD_DAYS))
    else {
        return Vec::new();
    };
    let limit = schedule.end_date.unwrap_or(lookahead_end);

    // Every step is anchored at the start date, so a month-end anchor clamps
    // inside short months without drifting: Jan 31, Feb 28, Mar 31, ...
    let mut instants = Vec::new();
    for step in 0u32.. {
        let Some(date) = schedule.start_date.checked_add_months(Months::new(step)) else {
            break;
        };
        if date > limit {
            break;
        }

        instants.extend(day_times(schedule, date, tz).filter(|at| *at > from));
    }

    instants
}

fn day_times<'a>(
    schedule: &'a Schedule,
    date: NaiveDate,
    tz: Tz,
) -> impl Iterator<Item = DateTime<Utc>> + 'a {
    schedule.times.iter().filter_map(move |fire_time| {
        tz.from_local_datetime(&date.and_time(*fire_time.time()))
            .earliest()
            .map(|local| local.with_timezone(&Utc))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reminder::FireTime;
    use chrono::{NaiveDateTime, NaiveTime, TimeZone, Timelike};
    use chrono_tz::Tz;
    use proptest::prelude::*;
    use proptest_arbitrary_interop::arb;

    const UTC: Tz = chrono_tz::UTC;

    fn schedule(repeat: RepeatKind, times: &[(u32, u32)], start_date: NaiveDate) -> Schedule {
        Schedule {
            times: times
                .iter()
                .map(|(h, m)| FireTime::new(NaiveTime::from_hms_opt(*h, *m, 0).unwrap()))
                .collect(),
            weekdays: None,
            start_date,
            end_date: None,
            repeat,
        }
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn instant(y: i32, m: u32, d: u32, h: u32, min: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, h, min, 0).unwrap()
    }

    #[test]
    fn daily_pair_of_times_starts_with_remaining_time_of_today() {
        let schedule = schedule(RepeatKind::Daily, &[(9, 0), (21, 0)], date(2025, 6, 2));
        let from = instant(2025, 6, 2, 10, 0);

        let instants = occurrences(&schedule, from, 7, UTC);

        assert_eq!(*instants.first().unwrap(), instant(2025, 6, 2, 21, 0));
        // Today contributes only 21:00, the following 7 days a pair each.
        assert_eq!(instants.len(), 15);
    }

    #[test]
    fn weekly_fires_next_configured_weekday() {
        let mut schedule = schedule(RepeatKind::Weekly, &[(8, 0)], date(2025, 6, 1));
        schedule.weekdays = Some(HashSet::from([Weekday::Mon, Weekday::Wed]));
        let tuesday_midnight = instant(2025, 6, 3, 0, 0);

        let instants = occurrences(&schedule, tuesday_midnight, 7, UTC);

        assert_eq!(*instants.first().unwrap(), instant(2025, 6, 4, 8, 0));
        assert_eq!(instants.len(), 2); // Wed Jun 4 and Mon Jun 9
    }

    #[test]
    fn once_in_the_past_yields_nothing() {
        let schedule = schedule(RepeatKind::Once, &[(7, 0)], date(2025, 6, 2));
        let from = instant(2025, 6, 2, 12, 0);

        assert!(occurrences(&schedule, from, 7, UTC).is_empty());
    }

    #[test]
    fn once_in_the_future_yields_the_configured_times() {
        let schedule = schedule(RepeatKind::Once, &[(7, 0), (19, 0)], date(2025, 6, 2));
        let from = instant(2025, 6, 1, 0, 0);

        let instants = occurrences(&schedule, from, 7, UTC);

        assert_eq!(
            instants,
            vec![instant(2025, 6, 2, 7, 0), instant(2025, 6, 2, 19, 0)]
        );
    }

    #[test]
    fn monthly_month_end_anchor_neither_skips_nor_duplicates_months() {
        let schedule = schedule(RepeatKind::Monthly, &[(9, 0)], date(2025, 1, 31));
        let from = instant(2025, 1, 1, 0, 0);

        let instants = occurrences(&schedule, from, 7, UTC);

        assert_eq!(instants.len(), 12);
        let months: Vec<u32> = instants.iter().map(|at| at.month()).collect();
        assert_eq!(months, (1..=12).collect::<Vec<_>>());
        // Clamped in short months, back at the anchor day in long ones.
        assert_eq!(instants[1].day(), 28);
        assert_eq!(instants[2].day(), 31);
        assert_eq!(instants[3].day(), 30);
    }

    #[test]
    fn monthly_respects_end_date() {
        let mut schedule = schedule(RepeatKind::Monthly, &[(12, 0)], date(2025, 1, 15));
        schedule.end_date = Some(date(2025, 3, 20));
        let from = instant(2025, 1, 1, 0, 0);

        let instants = occurrences(&schedule, from, 7, UTC);

        assert_eq!(
            instants,
            vec![
                instant(2025, 1, 15, 12, 0),
                instant(2025, 2, 15, 12, 0),
                instant(2025, 3, 15, 12, 0),
            ]
        );
    }

    #[test]
    fn empty_time_list_yields_nothing() {
        let schedule = schedule(RepeatKind::Daily, &[], date(2025, 6, 2));

        assert!(occurrences(&schedule, instant(2025, 6, 1, 0, 0), 7, UTC).is_empty());
    }

    #[test]
    fn end_date_before_start_date_yields_nothing() {
        let mut schedule = schedule(RepeatKind::Daily, &[(9, 0)], date(2025, 6, 2));
        schedule.end_date = Some(date(2025, 5, 1));

        assert!(occurrences(&schedule, instant(2025, 6, 1, 0, 0), 7, UTC).is_empty());
    }

    #[test]
    fn evaluation_after_end_date_yields_nothing() {
        let mut schedule = schedule(RepeatKind::Daily, &[(9, 0)], date(2025, 6, 2));
        schedule.end_date = Some(date(2025, 6, 10));

        assert!(occurrences(&schedule, instant(2025, 6, 12, 0, 0), 7, UTC).is_empty());
    }

    #[test]
    fn weekly_without_weekdays_yields_nothing() {
        let mut schedule = schedule(RepeatKind::Weekly, &[(9, 0)], date(2025, 6, 2));
        schedule.weekdays = Some(HashSet::new());

        assert!(occurrences(&schedule, instant(2025, 6, 1, 0, 0), 7, UTC).is_empty());
    }

    #[test]
    fn unsorted_times_still_produce_sorted_instants() {
        let schedule = schedule(RepeatKind::Daily, &[(21, 0), (9, 0)], date(2025, 6, 2));

        let instants = occurrences(&schedule, instant(2025, 6, 1, 0, 0), 2, UTC);

        assert!(instants.windows(2).all(|pair| pair[0] <= pair[1]));
    }

    #[test]
    fn nonexistent_local_time_in_dst_gap_is_skipped() {
        // 02:30 does not exist in America/New_York on 2025-03-09.
        let schedule = schedule(RepeatKind::Daily, &[(2, 30)], date(2025, 3, 8));
        let from = instant(2025, 3, 8, 0, 0);

        let instants = occurrences(&schedule, from, 3, chrono_tz::America::New_York);

        let days: Vec<u32> = instants
            .iter()
            .map(|at| at.with_timezone(&chrono_tz::America::New_York).day())
            .collect();
        assert!(!days.contains(&9));
        assert!(days.contains(&8));
        assert!(days.contains(&10));
    }

    fn time_strategy() -> impl Strategy<Value = NaiveTime> {
        (0u32..24, 0u32..60).prop_map(|(h, m)| NaiveTime::from_hms_opt(h, m, 0).unwrap())
    }

    fn date_strategy() -> impl Strategy<Value = NaiveDate> {
        (2000i32..2100, 1u32..13, 1u32..29)
            .prop_map(|(y, m, d)| NaiveDate::from_ymd_opt(y, m, d).unwrap())
    }

    fn weekday_set_strategy() -> impl Strategy<Value = HashSet<Weekday>> {
        let weekday = prop::sample::select(vec![
            Weekday::Mon,
            Weekday::Tue,
            Weekday::Wed,
            Weekday::Thu,
            Weekday::Fri,
            Weekday::Sat,
            Weekday::Sun,
        ]);
        prop::collection::hash_set(weekday, 1..=7)
    }

    proptest! {
        #[test]
        fn daily_occurrences_are_sorted_strictly_after_from_and_bounded(
            start in date_strategy(),
            from_datetime in arb::<NaiveDateTime>(),
            times in prop::collection::vec(time_strategy(), 1..4),
            horizon_days in 0u32..14,
        ) {
            let schedule = Schedule {
                times: times.into_iter().map(FireTime::new).collect(),
                weekdays: None,
                start_date: start,
                end_date: None,
                repeat: RepeatKind::Daily,
            };
            let from = Utc.from_utc_datetime(&from_datetime.with_nanosecond(0).unwrap());

            let instants = occurrences(&schedule, from, horizon_days, UTC);

            prop_assert!(instants.iter().all(|at| *at > from));
            prop_assert!(instants.windows(2).all(|pair| pair[0] <= pair[1]));

            let distinct_days: HashSet<NaiveDate> =
                instants.iter().map(|at| at.date_naive()).collect();
            prop_assert!(distinct_days.len() <= horizon_days as usize + 1);
        }

        #[test]
        fn weekly_occurrences_fall_on_configured_weekdays(
            start in date_strategy(),
            from_datetime in arb::<NaiveDateTime>(),
            times in prop::collection::vec(time_strategy(), 1..4),
            weekdays in weekday_set_strategy(),
        ) {
            let schedule = Schedule {
                times: times.into_iter().map(FireTime::new).collect(),
                weekdays: Some(weekdays.clone()),
                start_date: start,
                end_date: None,
                repeat: RepeatKind::Weekly,
            };
            let from = Utc.from_utc_datetime(&from_datetime.with_nanosecond(0).unwrap());

            let instants = occurrences(&schedule, from, 7, UTC);

            prop_assert!(instants.iter().all(|at| weekdays.contains(&at.weekday())));
            prop_assert!(instants.iter().all(|at| *at > from));
        }

        #[test]
        fn monthly_occurrence_dates_are_distinct_months(
            start in date_strategy(),
            time in time_strategy(),
        ) {
            let schedule = Schedule {
                times: vec![FireTime::new(time)],
                weekdays: None,
                start_date: start,
                end_date: None,
                repeat: RepeatKind::Monthly,
            };
            let from = Utc.from_utc_datetime(&NaiveDateTime::new(start, NaiveTime::MIN));

            let instants = occurrences(&schedule, from, 7, UTC);

            let months: HashSet<(i32, u32)> =
                instants.iter().map(|at| (at.year(), at.month())).collect();
            prop_assert_eq!(months.len(), instants.len());
        }
    }
}
