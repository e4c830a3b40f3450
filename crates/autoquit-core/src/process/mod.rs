//! # Process Layer
//!
//! Liveness checks and graceful termination. Termination is a request, not
//! a kill: the target gets SIGTERM and may present save dialogs or refuse
//! to exit. The monitor never escalates to SIGKILL.

pub mod errors;
pub mod operations;

pub use errors::ProcessError;
pub use operations::{is_process_running, terminate_gracefully};
