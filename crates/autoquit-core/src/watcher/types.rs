//! Watch table entry types.

use std::collections::HashSet;

use crate::system::types::{AppInfo, Subscription};
use crate::window::types::WindowId;

/// State kept for one watched application.
#[derive(Debug)]
pub struct WatchedApp {
    pub info: AppInfo,

    /// Live notification registration, `None` when the backend rejected
    /// the subscription. Dropped (and thereby released) with the entry.
    pub subscription: Option<Subscription>,

    /// Windows with a destroyed-notification registration.
    pub observed_windows: HashSet<WindowId>,

    /// Whether the application was ever seen with a qualifying window.
    /// Applications that never opened one are not terminated.
    pub had_qualifying: bool,

    /// A check chain is currently in flight for this application.
    pub checking: bool,

    /// A graceful terminate was already requested. Cleared if the
    /// application turns out to still have qualifying windows.
    pub terminating: bool,
}

impl WatchedApp {
    pub fn new(info: AppInfo, subscription: Option<Subscription>) -> Self {
        Self {
            info,
            subscription,
            observed_windows: HashSet::new(),
            had_qualifying: false,
            checking: false,
            terminating: false,
        }
    }
}
