//! The trait boundary between monitoring logic and the operating system.

use tokio::sync::mpsc::UnboundedSender;

use crate::system::errors::SystemError;
use crate::system::types::{AppInfo, Pid, Subscription, SystemEvent};
use crate::window::types::{WindowId, WindowSnapshot};

/// Operations the monitor needs from the OS.
///
/// All methods are synchronous and cheap enough to call from the
/// coordinator task. Change notifications flow back asynchronously through
/// the sender given to [`attach`](WindowSystem::attach).
pub trait WindowSystem: Send + Sync + 'static {
    /// Pid of the monitor process itself, excluded from watching.
    fn own_pid(&self) -> Pid;

    /// Whether accessibility access is currently granted.
    fn is_trusted(&self) -> bool;

    /// Ask the OS to show its grant-access prompt. Idempotent.
    fn request_trust_prompt(&self);

    /// Currently running applications, every activation policy included.
    fn running_apps(&self) -> Vec<AppInfo>;

    /// Identities of the application's windows right now.
    ///
    /// The listing can lag behind reality shortly after a window closes;
    /// callers must treat it as a point-in-time observation.
    fn windows(&self, pid: Pid) -> Vec<WindowId>;

    /// Attribute snapshot for one window, `None` when the window no longer
    /// answers attribute queries.
    fn snapshot(&self, pid: Pid, window: WindowId) -> Option<WindowSnapshot>;

    /// Hook up the single event feed. Called once by the coordinator before
    /// any subscription is created.
    fn attach(&self, events: UnboundedSender<SystemEvent>);

    /// Register for window-created and window-destroyed notifications from
    /// one application. The returned handle releases the registration on
    /// drop.
    fn subscribe(&self, pid: Pid) -> Result<Subscription, SystemError>;

    /// Register destroyed-notification delivery for one specific window.
    ///
    /// Backends whose application-level subscription already covers every
    /// window treat this as a no-op.
    fn observe_window(&self, pid: Pid, window: WindowId);

    /// Ask the application to quit gracefully. A pid that already exited is
    /// a successful no-op.
    fn request_terminate(&self, pid: Pid) -> Result<(), SystemError>;
}
