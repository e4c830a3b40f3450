//! # Subscription Manager
//!
//! The watch table tracks every application under observation: its
//! subscription handle, the windows with a destroyed-notification
//! registration, and the flags the decision engine needs to avoid duplicate
//! terminations.
//!
//! An application whose subscription was rejected stays in the table; the
//! periodic poll still covers it.

pub mod table;
pub mod types;

pub use table::WatchTable;
pub use types::WatchedApp;
