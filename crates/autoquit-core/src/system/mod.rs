//! # OS Observation Seam
//!
//! Everything the monitor needs from the operating system goes through the
//! [`WindowSystem`] trait: trust queries, application enumeration, window
//! listing and attribute snapshots, change notifications, and graceful
//! termination requests.
//!
//! Two backends implement the trait:
//! - [`macos`] - the real backend, built on the Accessibility API
//!   (`AXObserver` notifications plus `AXUIElement` attribute queries)
//! - [`fake`] - a scripted in-memory system for deterministic tests
//!
//! [`WindowSystem`]: traits::WindowSystem

pub mod errors;
pub mod fake;
#[cfg(target_os = "macos")]
pub mod macos;
pub mod traits;
pub mod types;

pub use errors::SystemError;
pub use fake::FakeSystem;
#[cfg(target_os = "macos")]
pub use macos::MacosSystem;
pub use traits::WindowSystem;
pub use types::{ActivationPolicy, AppInfo, Pid, Subscription, SystemEvent};
