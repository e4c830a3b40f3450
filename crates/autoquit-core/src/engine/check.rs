//! The synchronous quit check.

use tracing::debug;

use crate::engine::types::Decision;
use crate::system::traits::WindowSystem;
use crate::system::types::Pid;
use crate::window::classifier::Classifier;

/// Run one quit check attempt: list the application's windows, snapshot
/// each through the classifier, and decide.
///
/// A window that vanishes between listing and snapshot simply does not
/// count; the listing is a point-in-time observation either way.
pub fn evaluate(system: &dyn WindowSystem, classifier: &Classifier, pid: Pid) -> Decision {
    let windows = system.windows(pid);
    let listed = windows.len();

    let qualifying = windows
        .into_iter()
        .filter_map(|window| system.snapshot(pid, window))
        .filter(|snapshot| classifier.qualifies(snapshot))
        .count();

    debug!(
        event = "core.engine.check_evaluated",
        pid = %pid,
        listed = listed,
        qualifying = qualifying
    );

    if qualifying == 0 {
        Decision::Quit
    } else {
        Decision::WindowsRemain { qualifying }
    }
}
