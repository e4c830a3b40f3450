//! # Quit Decision Engine
//!
//! A quit check lists an application's windows, classifies each one, and
//! decides whether the application should be asked to quit. Window listings
//! can lag behind a close notification, so a check that still sees windows
//! is retried on a short, bounded schedule before the engine gives up.

pub mod check;
pub mod types;

pub use check::evaluate;
pub use types::{Decision, RetrySchedule};
