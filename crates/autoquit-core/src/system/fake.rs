//! Scripted in-memory backend for deterministic tests.
//!
//! Tests drive the monitor by calling the `script_*` methods, which mutate
//! the simulated system and emit the events a real backend would. Window
//! events are only delivered for applications with an active subscription,
//! mirroring the notification semantics of the real backend; lifecycle
//! events are delivered whenever a feed is attached.
//!
//! The fake can also serve stale window listings after a close, modeling
//! the short period where the OS window list still contains a destroyed
//! window.

use std::collections::{BTreeMap, HashMap, HashSet, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use tokio::sync::mpsc::UnboundedSender;
use tracing::debug;

use crate::system::errors::SystemError;
use crate::system::traits::WindowSystem;
use crate::system::types::{AppInfo, Pid, Subscription, SystemEvent};
use crate::window::types::{WindowId, WindowSnapshot};

/// Pid the fake reports for the monitor process itself.
pub const FAKE_OWN_PID: Pid = Pid(1);

#[derive(Debug, Default)]
struct FakeApp {
    info: Option<AppInfo>,
    windows: BTreeMap<WindowId, WindowSnapshot>,
    /// Listings still to be served before `windows()` reflects reality.
    stale_listings: VecDeque<Vec<(WindowId, WindowSnapshot)>>,
    /// Most recently served stale listing, backing snapshot reads.
    last_stale: Vec<(WindowId, WindowSnapshot)>,
}

#[derive(Debug, Default)]
struct FakeState {
    apps: HashMap<Pid, FakeApp>,
    subscribed: HashSet<Pid>,
    reject_subscriptions: HashSet<Pid>,
    events: Option<UnboundedSender<SystemEvent>>,
    terminate_requests: Vec<Pid>,
}

/// In-memory [`WindowSystem`] with a scripting surface for tests.
#[derive(Debug, Clone, Default)]
pub struct FakeSystem {
    state: Arc<Mutex<FakeState>>,
    trusted: Arc<std::sync::atomic::AtomicBool>,
    prompt_requests: Arc<AtomicUsize>,
}

impl FakeSystem {
    pub fn new() -> Self {
        let system = Self::default();
        system.trusted.store(true, Ordering::SeqCst);
        system
    }

    /// A fake that starts without accessibility trust.
    pub fn untrusted() -> Self {
        Self::default()
    }

    // --- scripting surface -------------------------------------------------

    /// Flip the simulated trust state. The permission poll observes it on
    /// its next tick; no event is emitted, matching the real backend.
    pub fn script_set_trusted(&self, trusted: bool) {
        self.trusted.store(trusted, Ordering::SeqCst);
    }

    /// Register a running application and emit `AppLaunched`.
    pub fn script_launch(&self, info: AppInfo) {
        let mut state = self.lock();
        let app = state.apps.entry(info.pid).or_default();
        app.info = Some(info.clone());
        Self::emit(&state, SystemEvent::AppLaunched(info));
    }

    /// Remove an application and emit `AppTerminated`.
    pub fn script_exit(&self, pid: Pid) {
        let mut state = self.lock();
        state.apps.remove(&pid);
        state.subscribed.remove(&pid);
        Self::emit(&state, SystemEvent::AppTerminated(pid));
    }

    /// Add a window to an application and emit `WindowCreated` if the
    /// application is subscribed.
    pub fn script_open_window(&self, pid: Pid, snapshot: WindowSnapshot) {
        let mut state = self.lock();
        let id = snapshot.id;
        state.apps.entry(pid).or_default().windows.insert(id, snapshot);
        if state.subscribed.contains(&pid) {
            Self::emit(&state, SystemEvent::WindowCreated { pid, window: id });
        }
    }

    /// Close a window immediately and emit `WindowDestroyed` if subscribed.
    pub fn script_close_window(&self, pid: Pid, window: WindowId) {
        let mut state = self.lock();
        if let Some(app) = state.apps.get_mut(&pid) {
            app.windows.remove(&window);
        }
        if state.subscribed.contains(&pid) {
            Self::emit(&state, SystemEvent::WindowDestroyed { pid });
        }
    }

    /// Close a window but keep serving it in the next `lag_listings` window
    /// listings, with its pre-close attributes.
    pub fn script_close_window_with_lag(&self, pid: Pid, window: WindowId, lag_listings: usize) {
        let mut state = self.lock();
        if let Some(app) = state.apps.get_mut(&pid) {
            let removed = app.windows.remove(&window);
            if let Some(snapshot) = removed {
                let mut listing: Vec<(WindowId, WindowSnapshot)> = app
                    .windows
                    .iter()
                    .map(|(id, s)| (*id, s.clone()))
                    .collect();
                listing.push((window, snapshot));
                for _ in 0..lag_listings {
                    app.stale_listings.push_back(listing.clone());
                }
            }
        }
        if state.subscribed.contains(&pid) {
            Self::emit(&state, SystemEvent::WindowDestroyed { pid });
        }
    }

    /// Make future `subscribe` calls for this pid fail.
    pub fn script_reject_subscriptions(&self, pid: Pid) {
        self.lock().reject_subscriptions.insert(pid);
    }

    // --- inspection surface ------------------------------------------------

    /// Pids passed to `request_terminate`, in order.
    pub fn terminate_requests(&self) -> Vec<Pid> {
        self.lock().terminate_requests.clone()
    }

    /// Number of times the trust prompt was requested.
    pub fn prompt_requests(&self) -> usize {
        self.prompt_requests.load(Ordering::SeqCst)
    }

    /// Whether the application currently has an active subscription.
    pub fn is_subscribed(&self, pid: Pid) -> bool {
        self.lock().subscribed.contains(&pid)
    }

    /// Stale listings not yet served. Each `windows()` call consumes one,
    /// which makes the number of listing reads observable.
    pub fn stale_listings_remaining(&self, pid: Pid) -> usize {
        self.lock()
            .apps
            .get(&pid)
            .map(|app| app.stale_listings.len())
            .unwrap_or(0)
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, FakeState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn emit(state: &FakeState, event: SystemEvent) {
        if let Some(events) = &state.events {
            // A closed receiver means the coordinator is gone; late script
            // actions are simply dropped.
            let _ = events.send(event);
        }
    }
}

impl WindowSystem for FakeSystem {
    fn own_pid(&self) -> Pid {
        FAKE_OWN_PID
    }

    fn is_trusted(&self) -> bool {
        self.trusted.load(Ordering::SeqCst)
    }

    fn request_trust_prompt(&self) {
        self.prompt_requests.fetch_add(1, Ordering::SeqCst);
    }

    fn running_apps(&self) -> Vec<AppInfo> {
        let state = self.lock();
        let mut apps: Vec<AppInfo> = state
            .apps
            .values()
            .filter_map(|app| app.info.clone())
            .collect();
        apps.sort_by_key(|info| info.pid);
        apps
    }

    fn windows(&self, pid: Pid) -> Vec<WindowId> {
        let mut state = self.lock();
        let Some(app) = state.apps.get_mut(&pid) else {
            return Vec::new();
        };
        if let Some(listing) = app.stale_listings.pop_front() {
            let ids = listing.iter().map(|(id, _)| *id).collect();
            app.last_stale = listing;
            return ids;
        }
        app.last_stale.clear();
        app.windows.keys().copied().collect()
    }

    fn snapshot(&self, pid: Pid, window: WindowId) -> Option<WindowSnapshot> {
        let state = self.lock();
        let app = state.apps.get(&pid)?;
        if let Some(snapshot) = app.windows.get(&window) {
            return Some(snapshot.clone());
        }
        app.last_stale
            .iter()
            .find(|(id, _)| *id == window)
            .map(|(_, snapshot)| snapshot.clone())
    }

    fn attach(&self, events: UnboundedSender<SystemEvent>) {
        self.lock().events = Some(events);
    }

    fn subscribe(&self, pid: Pid) -> Result<Subscription, SystemError> {
        let mut state = self.lock();
        if !state.apps.contains_key(&pid) {
            return Err(SystemError::AppUnreachable { pid });
        }
        if state.reject_subscriptions.contains(&pid) {
            return Err(SystemError::SubscriptionRejected {
                pid,
                message: "scripted rejection".to_string(),
            });
        }
        state.subscribed.insert(pid);

        let shared = Arc::clone(&self.state);
        Ok(Subscription::new(move || {
            let mut state = shared.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
            state.subscribed.remove(&pid);
            debug!(event = "core.system.fake.subscription_released", pid = %pid);
        }))
    }

    fn observe_window(&self, _pid: Pid, _window: WindowId) {
        // The app-level subscription already covers every window.
    }

    fn request_terminate(&self, pid: Pid) -> Result<(), SystemError> {
        self.lock().terminate_requests.push(pid);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::mpsc;

    fn standard_window(id: u64) -> WindowSnapshot {
        WindowSnapshot {
            id: WindowId(id),
            subrole: Some("AXStandardWindow".to_string()),
            minimized: Some(false),
            hidden: Some(false),
            width: Some(800.0),
            height: Some(600.0),
            title: None,
        }
    }

    #[test]
    fn test_launch_emits_event_when_attached() {
        let system = FakeSystem::new();
        let (tx, mut rx) = mpsc::unbounded_channel();
        system.attach(tx);

        system.script_launch(AppInfo::regular(Pid(100), "TextEdit"));

        match rx.try_recv() {
            Ok(SystemEvent::AppLaunched(info)) => assert_eq!(info.pid, Pid(100)),
            other => panic!("expected AppLaunched, got {:?}", other),
        }
    }

    #[test]
    fn test_window_events_require_subscription() {
        let system = FakeSystem::new();
        let (tx, mut rx) = mpsc::unbounded_channel();
        system.attach(tx);
        system.script_launch(AppInfo::regular(Pid(100), "TextEdit"));
        let _ = rx.try_recv();

        // Not subscribed yet: no WindowCreated.
        system.script_open_window(Pid(100), standard_window(1));
        assert!(rx.try_recv().is_err());

        let subscription = system.subscribe(Pid(100)).unwrap();
        system.script_open_window(Pid(100), standard_window(2));
        assert!(matches!(
            rx.try_recv(),
            Ok(SystemEvent::WindowCreated { pid: Pid(100), .. })
        ));

        // Dropping the handle stops delivery.
        drop(subscription);
        assert!(!system.is_subscribed(Pid(100)));
        system.script_close_window(Pid(100), WindowId(2));
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_subscribe_unknown_pid_fails() {
        let system = FakeSystem::new();
        let result = system.subscribe(Pid(999));
        assert!(matches!(result, Err(SystemError::AppUnreachable { .. })));
    }

    #[test]
    fn test_scripted_rejection() {
        let system = FakeSystem::new();
        system.script_launch(AppInfo::regular(Pid(100), "TextEdit"));
        system.script_reject_subscriptions(Pid(100));

        let result = system.subscribe(Pid(100));
        assert!(matches!(
            result,
            Err(SystemError::SubscriptionRejected { .. })
        ));
    }

    #[test]
    fn test_stale_listings_drain_then_reflect_reality() {
        let system = FakeSystem::new();
        system.script_launch(AppInfo::regular(Pid(100), "TextEdit"));
        system.script_open_window(Pid(100), standard_window(1));

        system.script_close_window_with_lag(Pid(100), WindowId(1), 2);

        // Two stale listings still contain the window, with readable
        // attributes.
        for _ in 0..2 {
            let ids = system.windows(Pid(100));
            assert_eq!(ids, vec![WindowId(1)]);
            let snapshot = system.snapshot(Pid(100), WindowId(1)).unwrap();
            assert_eq!(snapshot.subrole.as_deref(), Some("AXStandardWindow"));
        }

        // The third listing reflects the close.
        assert!(system.windows(Pid(100)).is_empty());
        assert!(system.snapshot(Pid(100), WindowId(1)).is_none());
    }

    #[test]
    fn test_terminate_requests_recorded() {
        let system = FakeSystem::new();
        system.request_terminate(Pid(100)).unwrap();
        system.request_terminate(Pid(100)).unwrap();
        assert_eq!(system.terminate_requests(), vec![Pid(100), Pid(100)]);
    }

    #[test]
    fn test_trust_flag_and_prompt() {
        let system = FakeSystem::untrusted();
        assert!(!system.is_trusted());
        system.request_trust_prompt();
        assert_eq!(system.prompt_requests(), 1);
        system.script_set_trusted(true);
        assert!(system.is_trusted());
    }
}
