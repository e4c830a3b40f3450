//! Window value types shared across the monitor.

use serde::{Deserialize, Serialize};

/// Stable identifier for a window within one application.
///
/// Identity is only meaningful for the lifetime of the window; identifiers
/// may be reused after a window is destroyed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct WindowId(pub u64);

impl std::fmt::Display for WindowId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Point-in-time attribute snapshot for one window.
///
/// Every attribute is optional: querying a window that is mid-teardown, or an
/// application that is slow to respond, yields partial data. The classifier
/// treats missing attributes permissively except for the subrole, which must
/// be positively identified.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WindowSnapshot {
    /// Window identity within the owning application.
    pub id: WindowId,

    /// Accessibility subrole, e.g. `"AXStandardWindow"` or `"AXDialog"`.
    pub subrole: Option<String>,

    /// Whether the window is currently minimized to the Dock.
    pub minimized: Option<bool>,

    /// Whether the window is hidden along with its application.
    pub hidden: Option<bool>,

    /// Width in points.
    pub width: Option<f64>,

    /// Height in points.
    pub height: Option<f64>,

    /// Window title, used only for logging.
    pub title: Option<String>,
}

impl WindowSnapshot {
    /// Snapshot with only an identity, every attribute unknown.
    pub fn bare(id: WindowId) -> Self {
        Self {
            id,
            ..Self::default()
        }
    }
}
