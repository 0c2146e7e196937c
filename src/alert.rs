//! Alert evaluation.
//!
//! [`Evaluator`] classifies the latest value of each parameter against its
//! interval table and raises a notification whenever the matched interval
//! changes. Its [`Watchdog`] rate-limits missing-data notifications and
//! names the service to restart when a parameter stops reporting.

mod evaluator;
mod notification;
pub mod remediation;
mod state;
mod watchdog;

pub use evaluator::*;
pub use notification::*;
pub use state::*;
pub use watchdog::*;
