//! End-to-end monitor behavior, driven through the fake backend with the
//! tokio clock paused. Time only moves when the test sleeps, so retry
//! delays, permission polls and the fallback window poll are exact.

use std::sync::Arc;
use std::time::Duration;

use autoquit_core::config::AutoquitConfig;
use autoquit_core::service::Coordinator;
use autoquit_core::system::fake::FakeSystem;
use autoquit_core::system::types::{AppInfo, Pid};
use autoquit_core::window::types::{WindowId, WindowSnapshot};

const APP: Pid = Pid(100);

fn standard_window(id: u64) -> WindowSnapshot {
    WindowSnapshot {
        id: WindowId(id),
        subrole: Some("AXStandardWindow".to_string()),
        minimized: Some(false),
        hidden: Some(false),
        width: Some(800.0),
        height: Some(600.0),
        title: Some("Document".to_string()),
    }
}

fn tiny_window(id: u64) -> WindowSnapshot {
    WindowSnapshot {
        width: Some(10.0),
        height: Some(10.0),
        ..standard_window(id)
    }
}

/// Spawn a coordinator over the given fake and let it finish startup
/// (the permission poll ticks immediately).
async fn start(system: &Arc<FakeSystem>) -> tokio::task::JoinHandle<()> {
    start_with(system, false).await
}

async fn start_with(system: &Arc<FakeSystem>, dry_run: bool) -> tokio::task::JoinHandle<()> {
    let coordinator = Coordinator::new(Arc::clone(system), &AutoquitConfig::default(), dry_run);
    let handle = tokio::spawn(coordinator.run());
    settle().await;
    handle
}

/// Let queued events and ready tasks run without advancing the clock.
async fn settle() {
    for _ in 0..20 {
        tokio::task::yield_now().await;
    }
}

async fn sleep_ms(ms: u64) {
    tokio::time::sleep(Duration::from_millis(ms)).await;
    settle().await;
}

#[tokio::test(start_paused = true)]
async fn test_last_window_close_terminates_within_one_second() {
    // Scenario: one standard window, user closes it.
    let system = Arc::new(FakeSystem::new());
    system.script_launch(AppInfo::regular(APP, "TextEdit"));
    system.script_open_window(APP, standard_window(1));

    let handle = start(&system).await;
    assert!(system.is_subscribed(APP));

    system.script_close_window(APP, WindowId(1));

    // First check attempt runs 100ms after the close notification.
    sleep_ms(150).await;
    assert_eq!(system.terminate_requests(), vec![APP]);

    // No duplicate request later.
    sleep_ms(2000).await;
    assert_eq!(system.terminate_requests(), vec![APP]);

    handle.abort();
}

#[tokio::test(start_paused = true)]
async fn test_tiny_placeholder_close_does_not_terminate() {
    // Scenario: a real 100x100 window plus a 10x10 placeholder. Closing
    // the placeholder must not quit the application.
    let system = Arc::new(FakeSystem::new());
    system.script_launch(AppInfo::regular(APP, "Sketchy"));
    let mut real = standard_window(1);
    real.width = Some(100.0);
    real.height = Some(100.0);
    system.script_open_window(APP, real);
    system.script_open_window(APP, tiny_window(2));

    let handle = start(&system).await;
    system.script_close_window(APP, WindowId(2));

    // Past the whole retry schedule and one fallback poll.
    sleep_ms(6000).await;
    assert!(system.terminate_requests().is_empty());

    handle.abort();
}

#[tokio::test(start_paused = true)]
async fn test_app_with_only_tiny_window_quits_when_real_one_closes() {
    let system = Arc::new(FakeSystem::new());
    system.script_launch(AppInfo::regular(APP, "Sketchy"));
    system.script_open_window(APP, standard_window(1));
    system.script_open_window(APP, tiny_window(2));

    let handle = start(&system).await;
    system.script_close_window(APP, WindowId(1));

    sleep_ms(150).await;
    assert_eq!(system.terminate_requests(), vec![APP]);

    handle.abort();
}

#[tokio::test(start_paused = true)]
async fn test_trust_revoke_and_regrant_rewatches_once() {
    // Scenario: user revokes accessibility access, then grants it again.
    let system = Arc::new(FakeSystem::new());
    system.script_launch(AppInfo::regular(APP, "TextEdit"));
    system.script_open_window(APP, standard_window(1));

    let handle = start(&system).await;
    assert!(system.is_subscribed(APP));

    system.script_set_trusted(false);
    // Next permission poll notices and drops every subscription.
    sleep_ms(3500).await;
    assert!(!system.is_subscribed(APP));

    system.script_set_trusted(true);
    sleep_ms(3500).await;
    assert!(system.is_subscribed(APP));

    // The fresh subscription works end to end: closing the last window
    // terminates exactly once.
    system.script_close_window(APP, WindowId(1));
    sleep_ms(150).await;
    assert_eq!(system.terminate_requests(), vec![APP]);

    handle.abort();
}

#[tokio::test(start_paused = true)]
async fn test_no_decisions_while_untrusted() {
    let system = Arc::new(FakeSystem::new());
    system.script_launch(AppInfo::regular(APP, "TextEdit"));
    system.script_open_window(APP, standard_window(1));

    let handle = start(&system).await;

    system.script_set_trusted(false);
    sleep_ms(3500).await;

    // Window events are no longer delivered (subscription released), and
    // the poll path is paused too.
    system.script_close_window(APP, WindowId(1));
    sleep_ms(10_000).await;
    assert!(system.terminate_requests().is_empty());

    handle.abort();
}

#[tokio::test(start_paused = true)]
async fn test_stale_listings_retry_until_third_attempt() {
    // Scenario: the window list lags behind the destroyed notification for
    // two reads. Attempts at 0.1s and 0.5s still see the ghost window; the
    // attempt at 1.0s sees the truth and terminates.
    let system = Arc::new(FakeSystem::new());
    system.script_launch(AppInfo::regular(APP, "Laggy"));
    system.script_open_window(APP, standard_window(1));

    let handle = start(&system).await;
    system.script_close_window_with_lag(APP, WindowId(1), 2);

    sleep_ms(700).await;
    assert!(
        system.terminate_requests().is_empty(),
        "attempts 1 and 2 must not terminate on stale listings"
    );

    sleep_ms(400).await;
    assert_eq!(system.terminate_requests(), vec![APP]);

    handle.abort();
}

#[tokio::test(start_paused = true)]
async fn test_retry_chain_is_bounded_to_three_attempts() {
    // With a deep stale queue, the chain must read exactly three listings
    // and then give up without terminating.
    let system = Arc::new(FakeSystem::new());
    system.script_launch(AppInfo::regular(APP, "VeryLaggy"));
    system.script_open_window(APP, standard_window(1));

    let handle = start(&system).await;
    system.script_close_window_with_lag(APP, WindowId(1), 10);

    // Past the whole schedule but before the 5s fallback poll.
    sleep_ms(2000).await;
    assert_eq!(system.stale_listings_remaining(APP), 7);
    assert!(system.terminate_requests().is_empty());

    handle.abort();
}

#[tokio::test(start_paused = true)]
async fn test_dry_run_never_terminates() {
    // Same close as the basic scenario, but the coordinator only logs the
    // decision.
    let system = Arc::new(FakeSystem::new());
    system.script_launch(AppInfo::regular(APP, "TextEdit"));
    system.script_open_window(APP, standard_window(1));

    let handle = start_with(&system, true).await;
    system.script_close_window(APP, WindowId(1));

    // Past the retry chain and one fallback poll.
    sleep_ms(6000).await;
    assert!(system.terminate_requests().is_empty());

    handle.abort();
}

#[tokio::test(start_paused = true)]
async fn test_poll_tick_does_not_restart_active_check_chain() {
    // A poll tick landing in the middle of a destroyed-triggered chain must
    // not reset its dedup; otherwise the next destroyed notification starts
    // a second concurrent chain, visible as extra listing reads.
    let system = Arc::new(FakeSystem::new());
    system.script_launch(AppInfo::regular(APP, "Busy"));
    system.script_open_window(APP, standard_window(1));
    system.script_open_window(APP, standard_window(2));

    let handle = start(&system).await;

    // Chain attempts land at 4.9s, 5.3s and 5.8s, straddling the 5s poll.
    sleep_ms(4800).await;
    system.script_close_window_with_lag(APP, WindowId(1), 10);
    sleep_ms(300).await;
    system.script_close_window(APP, WindowId(2));

    // By 6.5s: attempt 1, the poll, attempts 2 and 3 have each read one
    // listing; the second destroy joined the running chain instead of
    // starting its own.
    sleep_ms(1400).await;
    assert_eq!(system.stale_listings_remaining(APP), 6);
    assert!(system.terminate_requests().is_empty());

    handle.abort();
}

#[tokio::test(start_paused = true)]
async fn test_app_without_windows_is_never_terminated() {
    // A just-launched application with no windows yet must survive the
    // fallback polls indefinitely.
    let system = Arc::new(FakeSystem::new());
    system.script_launch(AppInfo::regular(APP, "SlowStarter"));

    let handle = start(&system).await;
    sleep_ms(20_000).await;
    assert!(system.terminate_requests().is_empty());

    handle.abort();
}

#[tokio::test(start_paused = true)]
async fn test_first_window_lifecycle_after_launch() {
    // An app watched with zero windows becomes terminable once it has
    // shown (and closed) a standard window.
    let system = Arc::new(FakeSystem::new());
    system.script_launch(AppInfo::regular(APP, "SlowStarter"));

    let handle = start(&system).await;
    system.script_open_window(APP, standard_window(1));
    settle().await;

    system.script_close_window(APP, WindowId(1));
    sleep_ms(150).await;
    assert_eq!(system.terminate_requests(), vec![APP]);

    handle.abort();
}

#[tokio::test(start_paused = true)]
async fn test_poll_backstop_covers_rejected_subscription() {
    // The backend refuses the subscription, so no close notification ever
    // arrives. The 5s poll still notices the last window is gone.
    let system = Arc::new(FakeSystem::new());
    system.script_launch(AppInfo::regular(APP, "Stubborn"));
    system.script_open_window(APP, standard_window(1));
    system.script_reject_subscriptions(APP);

    let handle = start(&system).await;
    assert!(!system.is_subscribed(APP));

    system.script_close_window(APP, WindowId(1));
    sleep_ms(1500).await;
    assert!(
        system.terminate_requests().is_empty(),
        "no event path, nothing before the poll"
    );

    sleep_ms(4000).await;
    assert_eq!(system.terminate_requests(), vec![APP]);

    handle.abort();
}

#[tokio::test(start_paused = true)]
async fn test_app_launched_mid_run_is_watched() {
    let system = Arc::new(FakeSystem::new());
    let handle = start(&system).await;

    system.script_launch(AppInfo::regular(APP, "Latecomer"));
    settle().await;
    assert!(system.is_subscribed(APP));

    system.script_open_window(APP, standard_window(1));
    settle().await;
    system.script_close_window(APP, WindowId(1));
    sleep_ms(150).await;
    assert_eq!(system.terminate_requests(), vec![APP]);

    handle.abort();
}

#[tokio::test(start_paused = true)]
async fn test_app_exit_aborts_pending_recheck() {
    // The application exits on its own while a recheck is in flight; the
    // stale recheck must not do anything.
    let system = Arc::new(FakeSystem::new());
    system.script_launch(AppInfo::regular(APP, "SelfQuitter"));
    system.script_open_window(APP, standard_window(1));

    let handle = start(&system).await;
    system.script_close_window_with_lag(APP, WindowId(1), 2);
    sleep_ms(200).await;

    system.script_exit(APP);
    sleep_ms(2000).await;
    assert!(system.terminate_requests().is_empty());

    handle.abort();
}

#[tokio::test(start_paused = true)]
async fn test_accessory_apps_are_ignored() {
    let system = Arc::new(FakeSystem::new());
    system.script_launch(AppInfo {
        pid: APP,
        name: "MenuExtra".to_string(),
        bundle_id: Some("com.example.menuextra".to_string()),
        policy: autoquit_core::system::types::ActivationPolicy::Accessory,
    });

    let handle = start(&system).await;
    assert!(!system.is_subscribed(APP));

    sleep_ms(20_000).await;
    assert!(system.terminate_requests().is_empty());

    handle.abort();
}
