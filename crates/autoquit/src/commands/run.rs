//! The `run` subcommand: the monitor itself.

use clap::ArgMatches;

#[cfg(target_os = "macos")]
pub fn handle_run_command(matches: &ArgMatches) -> Result<(), Box<dyn std::error::Error>> {
    use std::path::Path;
    use std::sync::Arc;

    use autoquit_core::system::MacosSystem;
    use autoquit_core::{Coordinator, WindowSystem, config, events};
    use tracing::warn;

    let config_path = matches.get_one::<String>("config").map(Path::new);
    let config = config::load(config_path)?;
    let dry_run = matches.get_flag("dry-run");

    let system = Arc::new(MacosSystem::new());
    if !system.is_trusted() {
        // The coordinator starts watching as soon as access is granted;
        // surface the prompt now so the user knows what to do.
        warn!(
            event = "cli.run.trust_missing",
            message = "Accessibility access not granted, requesting prompt"
        );
        system.request_trust_prompt();
    }

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;

    runtime.block_on(async {
        let coordinator = Coordinator::new(Arc::clone(&system), &config, dry_run);
        events::log_app_startup();
        tokio::select! {
            _ = coordinator.run() => {}
            _ = tokio::signal::ctrl_c() => {
                events::log_app_shutdown();
            }
        }
    });

    Ok(())
}

#[cfg(not(target_os = "macos"))]
pub fn handle_run_command(_matches: &ArgMatches) -> Result<(), Box<dyn std::error::Error>> {
    Err(super::unsupported_platform())
}
