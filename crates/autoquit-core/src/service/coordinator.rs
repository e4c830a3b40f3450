//! The event loop that drives the monitor.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio::sync::watch;
use tokio::time::{Instant, MissedTickBehavior, interval, interval_at};
use tracing::{debug, error, info, warn};

use crate::config::AutoquitConfig;
use crate::engine::check::evaluate;
use crate::engine::types::{Decision, RetrySchedule};
use crate::system::traits::WindowSystem;
use crate::system::types::{AppInfo, Pid, SystemEvent};
use crate::watcher::table::WatchTable;
use crate::window::classifier::Classifier;
use crate::window::types::WindowId;

/// Owns the watch table and trust state; runs the select loop.
///
/// Construct one per process, hook it to a backend, and [`run`] it until
/// shutdown. Everything else in the crate is driven from here.
///
/// [`run`]: Coordinator::run
pub struct Coordinator<S: WindowSystem> {
    system: Arc<S>,
    classifier: Classifier,
    schedule: RetrySchedule,
    table: WatchTable,
    trust_tx: watch::Sender<bool>,
    events_tx: UnboundedSender<SystemEvent>,
    events_rx: UnboundedReceiver<SystemEvent>,
    permission_poll: Duration,
    window_poll: Duration,
    dry_run: bool,
}

impl<S: WindowSystem> Coordinator<S> {
    pub fn new(system: Arc<S>, config: &AutoquitConfig, dry_run: bool) -> Self {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        system.attach(events_tx.clone());

        let (trust_tx, _) = watch::channel(false);
        let table = WatchTable::new(system.own_pid());

        Self {
            system,
            classifier: Classifier::new(&config.classifier),
            schedule: RetrySchedule::from_config(&config.retry),
            table,
            trust_tx,
            events_tx,
            events_rx,
            permission_poll: Duration::from_secs(config.monitor.permission_poll_secs),
            window_poll: Duration::from_secs(config.monitor.window_poll_secs),
            dry_run,
        }
    }

    /// Observe trust transitions, e.g. from a status surface.
    pub fn trust_receiver(&self) -> watch::Receiver<bool> {
        self.trust_tx.subscribe()
    }

    /// Run until the task is cancelled.
    ///
    /// The permission interval ticks immediately, so a monitor started with
    /// trust already granted begins watching right away. The window poll
    /// waits one full period first; it is a backstop, not the primary path.
    pub async fn run(mut self) {
        let mut permission = interval(self.permission_poll);
        permission.set_missed_tick_behavior(MissedTickBehavior::Delay);

        let mut poll = interval_at(Instant::now() + self.window_poll, self.window_poll);
        poll.set_missed_tick_behavior(MissedTickBehavior::Delay);

        info!(
            event = "core.service.coordinator_started",
            permission_poll_secs = self.permission_poll.as_secs(),
            window_poll_secs = self.window_poll.as_secs(),
            dry_run = self.dry_run
        );

        loop {
            tokio::select! {
                _ = permission.tick() => self.check_permission(),
                _ = poll.tick() => self.poll_all(),
                Some(event) = self.events_rx.recv() => self.handle_event(event),
            }
        }
    }

    fn trusted(&self) -> bool {
        *self.trust_tx.borrow()
    }

    /// Permission poll tick: detect trust transitions in both directions.
    fn check_permission(&mut self) {
        let trusted = self.system.is_trusted();
        if trusted == self.trusted() {
            return;
        }
        self.trust_tx.send_replace(trusted);

        if trusted {
            info!(event = "core.service.trust_granted");
            self.enumerate_and_watch();
        } else {
            // Dropping the table releases every subscription handle, so a
            // later re-grant starts from a clean slate and watches each
            // application exactly once.
            warn!(event = "core.service.trust_revoked");
            self.table.clear();
        }
    }

    /// Watch every eligible running application. Idempotent per pid.
    fn enumerate_and_watch(&mut self) {
        for info in self.system.running_apps() {
            self.watch_app(info);
        }
        info!(
            event = "core.service.enumeration_completed",
            watched = self.table.len()
        );
    }

    fn watch_app(&mut self, info: AppInfo) {
        let pid = info.pid;
        if !self.table.watch(&*self.system, info) {
            return;
        }
        // Seed the qualifying flag so an application watched with its
        // windows already open can be quit when the last one closes.
        if let Decision::WindowsRemain { .. } = evaluate(&*self.system, &self.classifier, pid)
            && let Some(entry) = self.table.get_mut(pid)
        {
            entry.had_qualifying = true;
        }
    }

    /// Window poll tick: reconcile the table against the live application
    /// list, then give every watched application one quit check.
    fn poll_all(&mut self) {
        if !self.trusted() {
            return;
        }

        self.reconcile();

        for pid in self.table.poll_targets() {
            self.run_check(pid, self.schedule.max_attempts(), false);
        }
    }

    /// The real backend delivers no launch or exit events; the poll diff
    /// covers application lifecycle for it (and missed events elsewhere).
    fn reconcile(&mut self) {
        let running = self.system.running_apps();

        for pid in self.table.poll_targets() {
            if !running.iter().any(|info| info.pid == pid) {
                debug!(event = "core.service.reconcile_app_gone", pid = %pid);
                self.table.unwatch(pid);
            }
        }
        for info in running {
            if self.table.is_eligible(&info) && !self.table.contains(info.pid) {
                debug!(
                    event = "core.service.reconcile_app_found",
                    pid = %info.pid,
                    name = %info.name
                );
                self.watch_app(info);
            }
        }
    }

    fn handle_event(&mut self, event: SystemEvent) {
        match event {
            SystemEvent::AppLaunched(info) => {
                if self.trusted() {
                    self.watch_app(info);
                }
            }
            SystemEvent::AppTerminated(pid) => {
                self.table.unwatch(pid);
            }
            SystemEvent::WindowCreated { pid, window } => self.handle_window_created(pid, window),
            SystemEvent::WindowDestroyed { pid } => self.begin_check(pid),
            SystemEvent::Recheck { pid, attempt } => {
                if self.trusted() {
                    self.run_check(pid, attempt, true);
                }
            }
        }
    }

    /// A new window never triggers a quit decision; it only gets its
    /// destroyed-notification registration and updates the qualifying flag.
    fn handle_window_created(&mut self, pid: Pid, window: WindowId) {
        if !self.table.contains(pid) {
            return;
        }
        if self.table.record_observed(pid, window) {
            self.system.observe_window(pid, window);
        }

        let qualifies = self
            .system
            .snapshot(pid, window)
            .is_some_and(|snapshot| self.classifier.qualifies(&snapshot));
        if qualifies && let Some(entry) = self.table.get_mut(pid) {
            entry.had_qualifying = true;
            if entry.terminating {
                // The application came back with a real window after a
                // terminate request (user cancelled a save prompt).
                debug!(event = "core.service.terminate_cancelled", pid = %pid);
                entry.terminating = false;
            }
        }
    }

    /// Start a check chain for an application whose window was destroyed.
    fn begin_check(&mut self, pid: Pid) {
        if !self.trusted() {
            return;
        }
        let Some(entry) = self.table.get_mut(pid) else {
            return;
        };
        if entry.checking || entry.terminating {
            // The chain in flight will observe the latest state anyway.
            debug!(event = "core.service.check_already_running", pid = %pid);
            return;
        }
        entry.checking = true;
        self.schedule_recheck(pid, 1);
    }

    /// Run one check attempt and either finish, retry, or terminate.
    ///
    /// `chain` marks attempts belonging to a destroyed-triggered retry
    /// chain; only those schedule retries and own the `checking` flag.
    /// Poll attempts are one-shot and leave the flag to the chain.
    fn run_check(&mut self, pid: Pid, attempt: u32, chain: bool) {
        if !self.table.contains(pid) {
            // The application exited while a recheck was in flight.
            debug!(event = "core.service.check_target_gone", pid = %pid);
            return;
        }

        let decision = evaluate(&*self.system, &self.classifier, pid);
        let max_attempts = self.schedule.max_attempts();
        let Some(entry) = self.table.get_mut(pid) else {
            return;
        };

        match decision {
            Decision::WindowsRemain { qualifying } => {
                entry.had_qualifying = true;
                if entry.terminating {
                    // The terminate request did not go through; the
                    // application still has real windows.
                    debug!(event = "core.service.terminate_cancelled", pid = %pid);
                    entry.terminating = false;
                }
                if !chain {
                    debug!(
                        event = "core.service.check_completed",
                        pid = %pid,
                        outcome = "windows_remain",
                        qualifying = qualifying
                    );
                    return;
                }
                if attempt < max_attempts {
                    debug!(
                        event = "core.service.check_retry_scheduled",
                        pid = %pid,
                        attempt = attempt,
                        qualifying = qualifying
                    );
                    self.schedule_recheck(pid, attempt + 1);
                } else {
                    debug!(
                        event = "core.service.check_completed",
                        pid = %pid,
                        outcome = "windows_remain",
                        qualifying = qualifying
                    );
                    entry.checking = false;
                }
            }
            Decision::Quit => {
                if chain {
                    entry.checking = false;
                }
                if entry.terminating {
                    debug!(event = "core.service.terminate_already_requested", pid = %pid);
                    return;
                }
                if !entry.had_qualifying {
                    // Never had a standard window; launching apps and pure
                    // background phases are left alone.
                    debug!(event = "core.service.quit_skipped_never_qualified", pid = %pid);
                    return;
                }
                entry.terminating = true;
                self.terminate(pid);
            }
        }
    }

    fn terminate(&mut self, pid: Pid) {
        let name = self
            .table
            .get(pid)
            .map(|entry| entry.info.name.clone())
            .unwrap_or_default();

        if self.dry_run {
            info!(
                event = "core.service.terminate_dry_run",
                pid = %pid,
                name = %name
            );
            return;
        }

        info!(event = "core.service.terminate_issued", pid = %pid, name = %name);
        if let Err(e) = self.system.request_terminate(pid) {
            error!(
                event = "core.service.terminate_failed",
                pid = %pid,
                name = %name,
                error = %e
            );
            if let Some(entry) = self.table.get_mut(pid) {
                entry.terminating = false;
            }
        }
    }

    /// Detached timer that feeds the retry back into the event loop. The
    /// task self-terminates after one send.
    fn schedule_recheck(&self, pid: Pid, attempt: u32) {
        let Some(delay) = self.schedule.delay_before(attempt) else {
            return;
        };
        let tx = self.events_tx.clone();
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let _ = tx.send(SystemEvent::Recheck { pid, attempt });
        });
    }
}
