#![allow(missing_docs)]

//! Session timing and cost accrual.

mod models;
pub mod timer;

pub use models::{SessionSnapshot, SessionSummary, SessionTick};
pub use timer::{SessionTimer, DEFAULT_TICK_PERIOD};
