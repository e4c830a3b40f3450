//! # Window Classification
//!
//! Decides which windows count toward "the application still has windows
//! open". Only standard, visible, reasonably-sized windows count; panels,
//! sheets, minimized windows, and tiny placeholder windows do not.
//!
//! The classifier is pure and synchronous. It operates on [`WindowSnapshot`]
//! values produced by the system backend, so it can be tested without any
//! accessibility access.

pub mod classifier;
pub mod types;

pub use classifier::Classifier;
pub use types::{WindowId, WindowSnapshot};
