//! Standard-window classification rule.

use tracing::debug;

use crate::config::ClassifierConfig;
use crate::window::types::WindowSnapshot;

/// Accessibility subrole of an ordinary document or application window.
pub const STANDARD_WINDOW_SUBROLE: &str = "AXStandardWindow";

/// Decides whether a window keeps its application alive.
///
/// A window qualifies when all of the following hold:
/// - its subrole is positively `AXStandardWindow` (dialogs, panels, sheets,
///   and windows whose subrole could not be read do not qualify)
/// - it is not minimized and not hidden (unknown counts as visible)
/// - it is not tiny, where tiny means both dimensions are known and below
///   the configured thresholds
#[derive(Debug, Clone)]
pub struct Classifier {
    min_width: f64,
    min_height: f64,
}

impl Classifier {
    pub fn new(config: &ClassifierConfig) -> Self {
        Self {
            min_width: config.min_width,
            min_height: config.min_height,
        }
    }

    /// Whether `snapshot` counts as a standard visible window.
    pub fn qualifies(&self, snapshot: &WindowSnapshot) -> bool {
        let standard = snapshot
            .subrole
            .as_deref()
            .is_some_and(|subrole| subrole == STANDARD_WINDOW_SUBROLE);
        if !standard {
            debug!(
                event = "core.window.excluded",
                window_id = %snapshot.id,
                reason = "subrole",
                subrole = snapshot.subrole.as_deref().unwrap_or("<unknown>")
            );
            return false;
        }

        // A window mid-teardown may stop answering attribute queries; treat
        // unknown visibility as visible so a live window is never miscounted
        // as gone.
        if snapshot.minimized.unwrap_or(false) {
            debug!(
                event = "core.window.excluded",
                window_id = %snapshot.id,
                reason = "minimized"
            );
            return false;
        }
        if snapshot.hidden.unwrap_or(false) {
            debug!(
                event = "core.window.excluded",
                window_id = %snapshot.id,
                reason = "hidden"
            );
            return false;
        }

        if self.is_tiny(snapshot) {
            debug!(
                event = "core.window.excluded",
                window_id = %snapshot.id,
                reason = "tiny",
                width = snapshot.width,
                height = snapshot.height
            );
            return false;
        }

        true
    }

    /// Count of qualifying windows in a listing.
    pub fn count_qualifying(&self, snapshots: &[WindowSnapshot]) -> usize {
        snapshots.iter().filter(|s| self.qualifies(s)).count()
    }

    fn is_tiny(&self, snapshot: &WindowSnapshot) -> bool {
        match (snapshot.width, snapshot.height) {
            (Some(w), Some(h)) => w < self.min_width && h < self.min_height,
            _ => false,
        }
    }
}
