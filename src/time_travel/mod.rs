//! Time travel: month timeline and session flow

mod flow;
mod timeline;

pub use flow::{FlowMessage, SessionError, SessionState, TimeTravelFlow};
pub use timeline::{MonthTimeline, TimelineError, MONTHS_PER_YEAR};
