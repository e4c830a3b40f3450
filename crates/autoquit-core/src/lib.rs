//! autoquit-core: Core library for AutoQuit - window tracking and quit decisions
//!
//! This library watches running applications and decides when an application's
//! last standard window has closed, at which point the application is asked to
//! quit gracefully. It is used by the `autoquit` CLI.
//!
//! # Main Entry Points
//!
//! - [`service`] - The coordinator that owns all monitoring state
//! - [`watcher`] - Per-application subscription management
//! - [`engine`] - The quit decision check and retry schedule
//! - [`window`] - Window snapshots and the standard-window classifier
//! - [`system`] - The OS observation seam and its backends
//! - [`config`] - Configuration management

pub mod config;
pub mod engine;
pub mod errors;
pub mod events;
pub mod logging;
pub mod process;
pub mod service;
pub mod system;
pub mod watcher;
pub mod window;

// Re-export commonly used types at crate root for convenience
pub use config::AutoquitConfig;
pub use engine::types::{Decision, RetrySchedule};
pub use service::Coordinator;
pub use system::fake::FakeSystem;
pub use system::traits::WindowSystem;
pub use system::types::{ActivationPolicy, AppInfo, Pid, Subscription, SystemEvent};
pub use window::classifier::Classifier;
pub use window::types::{WindowId, WindowSnapshot};

// Re-export logging initialization
pub use logging::init_logging;
