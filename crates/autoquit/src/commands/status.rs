//! The `status` subcommand: one-shot trust report.

use clap::ArgMatches;

#[cfg(target_os = "macos")]
pub fn handle_status_command(matches: &ArgMatches) -> Result<(), Box<dyn std::error::Error>> {
    use autoquit_core::WindowSystem;
    use autoquit_core::system::MacosSystem;

    let trusted = MacosSystem::new().is_trusted();

    if matches.get_flag("json") {
        println!("{}", serde_json::json!({ "trusted": trusted }));
    } else if trusted {
        println!("Accessibility access granted. AutoQuit can monitor windows.");
    } else {
        println!(
            "Accessibility access NOT granted. Run 'autoquit permission' or enable it in \
             System Settings > Privacy & Security > Accessibility."
        );
    }

    Ok(())
}

#[cfg(not(target_os = "macos"))]
pub fn handle_status_command(_matches: &ArgMatches) -> Result<(), Box<dyn std::error::Error>> {
    Err(super::unsupported_platform())
}
