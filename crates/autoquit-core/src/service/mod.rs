//! # Lifecycle Coordinator
//!
//! The coordinator is the single owner of all monitoring state. One tokio
//! task selects over the event feed, the permission poll and the fallback
//! window poll; every mutation of the watch table happens on that task, so
//! no state is shared or locked.

pub mod coordinator;

pub use coordinator::Coordinator;
