//! The table of watched applications.

use std::collections::HashMap;

use tracing::{debug, info};

use crate::system::traits::WindowSystem;
use crate::system::types::{ActivationPolicy, AppInfo, Pid};
use crate::watcher::types::WatchedApp;
use crate::window::types::WindowId;

/// All applications currently under observation, at most one entry per pid.
#[derive(Debug)]
pub struct WatchTable {
    entries: HashMap<Pid, WatchedApp>,
    own_pid: Pid,
}

impl WatchTable {
    pub fn new(own_pid: Pid) -> Self {
        Self {
            entries: HashMap::new(),
            own_pid,
        }
    }

    /// Whether an application can be watched at all: regular activation
    /// policy and not the monitor itself.
    pub fn is_eligible(&self, info: &AppInfo) -> bool {
        info.policy == ActivationPolicy::Regular && info.pid != self.own_pid
    }

    /// Start watching an application. Idempotent: an already-watched pid is
    /// left untouched. Returns true when a new entry was created.
    ///
    /// A rejected subscription still creates an entry so the periodic poll
    /// covers the application; only the event path is lost.
    pub fn watch(&mut self, system: &dyn WindowSystem, info: AppInfo) -> bool {
        if !self.is_eligible(&info) {
            debug!(
                event = "core.watcher.watch_skipped",
                pid = %info.pid,
                name = %info.name,
                reason = "ineligible"
            );
            return false;
        }
        if self.entries.contains_key(&info.pid) {
            debug!(
                event = "core.watcher.watch_skipped",
                pid = %info.pid,
                name = %info.name,
                reason = "already_watched"
            );
            return false;
        }

        let pid = info.pid;
        let subscription = match system.subscribe(pid) {
            Ok(handle) => Some(handle),
            Err(e) => {
                debug!(
                    event = "core.watcher.subscription_failed",
                    pid = %pid,
                    name = %info.name,
                    error = %e
                );
                None
            }
        };

        let mut entry = WatchedApp::new(info, subscription);

        // Register destroyed notifications for windows that already exist.
        for window in system.windows(pid) {
            system.observe_window(pid, window);
            entry.observed_windows.insert(window);
        }

        info!(
            event = "core.watcher.watch_started",
            pid = %pid,
            name = %entry.info.name,
            subscribed = entry.subscription.is_some(),
            windows = entry.observed_windows.len()
        );
        self.entries.insert(pid, entry);
        true
    }

    /// Stop watching an application, releasing its subscription. No-op for
    /// an unknown pid.
    pub fn unwatch(&mut self, pid: Pid) -> bool {
        match self.entries.remove(&pid) {
            Some(entry) => {
                info!(
                    event = "core.watcher.watch_stopped",
                    pid = %pid,
                    name = %entry.info.name
                );
                true
            }
            None => false,
        }
    }

    /// Record a destroyed-notification registration for a new window.
    /// Returns false when the window was already observed.
    pub fn record_observed(&mut self, pid: Pid, window: WindowId) -> bool {
        self.entries
            .get_mut(&pid)
            .is_some_and(|entry| entry.observed_windows.insert(window))
    }

    pub fn contains(&self, pid: Pid) -> bool {
        self.entries.contains_key(&pid)
    }

    pub fn get(&self, pid: Pid) -> Option<&WatchedApp> {
        self.entries.get(&pid)
    }

    pub fn get_mut(&mut self, pid: Pid) -> Option<&mut WatchedApp> {
        self.entries.get_mut(&pid)
    }

    /// Pids the periodic poll must cover, in stable order.
    pub fn poll_targets(&self) -> Vec<Pid> {
        let mut pids: Vec<Pid> = self.entries.keys().copied().collect();
        pids.sort();
        pids
    }

    /// Drop every entry, releasing all subscription handles. Used when
    /// accessibility trust is revoked.
    pub fn clear(&mut self) {
        if !self.entries.is_empty() {
            info!(event = "core.watcher.table_cleared", count = self.entries.len());
        }
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
