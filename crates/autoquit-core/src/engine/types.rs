//! Decision and retry schedule types.

use std::time::Duration;

use crate::config::RetryConfig;

/// Outcome of one quit check attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    /// No qualifying windows remain; ask the application to quit.
    Quit,
    /// Qualifying windows remain; the application stays.
    WindowsRemain { qualifying: usize },
}

/// Bounded per-step retry schedule for quit checks.
///
/// Each entry is the delay before the corresponding attempt, so the
/// defaults [100 ms, 400 ms, 500 ms] place attempts at 0.1 s, 0.5 s and
/// 1.0 s after the trigger. The number of entries is the attempt bound.
#[derive(Debug, Clone)]
pub struct RetrySchedule {
    delays: Vec<Duration>,
}

impl RetrySchedule {
    pub fn from_config(config: &RetryConfig) -> Self {
        Self {
            delays: config.delays_ms.iter().map(|&ms| Duration::from_millis(ms)).collect(),
        }
    }

    /// Highest attempt number, attempts being numbered from 1.
    pub fn max_attempts(&self) -> u32 {
        self.delays.len() as u32
    }

    /// Delay preceding the given attempt, `None` past the bound.
    pub fn delay_before(&self, attempt: u32) -> Option<Duration> {
        if attempt == 0 {
            return None;
        }
        self.delays.get(attempt as usize - 1).copied()
    }
}

impl Default for RetrySchedule {
    fn default() -> Self {
        Self::from_config(&RetryConfig::default())
    }
}
