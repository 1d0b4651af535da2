mod dispatcher;
pub mod recurrence;
pub mod token;

pub use dispatcher::{MAX_CANCEL_INDEX, ScheduleDispatcher};
pub use token::{DispatchToken, SNOOZE_SUFFIX};
