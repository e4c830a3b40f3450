//! # Configuration System
//!
//! TOML configuration for the AutoQuit monitor.
//!
//! Configuration is loaded from `~/.autoquit/config.toml` when present, or an
//! explicit path given on the command line. A missing default config file is
//! not an error; every field has a built-in default. Per-application allow or
//! deny lists are intentionally not configurable - the monitor applies the
//! same rule to every regular application.
//!
//! ## Example Configuration
//!
//! ```toml
//! [monitor]
//! permission_poll_secs = 3
//! window_poll_secs = 5
//!
//! [retry]
//! delays_ms = [100, 400, 500]
//!
//! [classifier]
//! min_width = 50.0
//! min_height = 50.0
//! ```

pub mod defaults;
pub mod loading;
pub mod types;

pub use loading::load;
pub use types::{AutoquitConfig, ClassifierConfig, MonitorConfig, RetryConfig};
