#![forbid(unsafe_code)]

pub mod countdown;
pub mod error;
pub mod model;
pub mod scorer;
pub mod time;

pub use countdown::{Countdown, CountdownTick, ManualTicks, TickSource, TimeLeft};
pub use error::Error;
pub use scorer::TimeAccounting;
pub use time::{Clock, Reading};
