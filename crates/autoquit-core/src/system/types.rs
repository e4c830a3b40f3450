//! Value types crossing the OS observation seam.

use serde::{Deserialize, Serialize};

use crate::window::types::WindowId;

/// Process identifier of a running application.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Pid(pub i32);

impl std::fmt::Display for Pid {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// How an application participates in the user interface.
///
/// Only [`Regular`](ActivationPolicy::Regular) applications (Dock icon,
/// ordinary windows) are eligible for monitoring. Accessory applications
/// (menu bar extras) and prohibited ones (pure background processes) are
/// never watched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ActivationPolicy {
    Regular,
    Accessory,
    Prohibited,
}

/// Description of a running application as reported by the backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppInfo {
    pub pid: Pid,
    pub name: String,
    pub bundle_id: Option<String>,
    pub policy: ActivationPolicy,
}

impl AppInfo {
    /// A regular application, the common case in tests and enumeration.
    pub fn regular(pid: Pid, name: impl Into<String>) -> Self {
        Self {
            pid,
            name: name.into(),
            bundle_id: None,
            policy: ActivationPolicy::Regular,
        }
    }
}

/// Events delivered on the coordinator's single event feed.
///
/// `WindowDestroyed` deliberately carries no window identity: the
/// accessibility element is already invalid when the notification arrives,
/// so the only sound reaction is to re-examine the whole application.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SystemEvent {
    AppLaunched(AppInfo),
    AppTerminated(Pid),
    WindowCreated { pid: Pid, window: WindowId },
    WindowDestroyed { pid: Pid },
    /// Internal retry tick scheduled by the decision engine.
    Recheck { pid: Pid, attempt: u32 },
}

/// RAII handle for an active per-application subscription.
///
/// Dropping the handle releases the backend's notification registration.
/// Release is best effort; a backend whose target application has already
/// exited treats it as a no-op.
pub struct Subscription {
    release: Option<Box<dyn FnOnce() + Send>>,
}

impl Subscription {
    pub fn new(release: impl FnOnce() + Send + 'static) -> Self {
        Self {
            release: Some(Box::new(release)),
        }
    }

    /// A subscription with nothing to release.
    pub fn noop() -> Self {
        Self { release: None }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(release) = self.release.take() {
            release();
        }
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("active", &self.release.is_some())
            .finish()
    }
}
