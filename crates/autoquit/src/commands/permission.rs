//! The `permission` subcommand: trigger the accessibility prompt.

#[cfg(target_os = "macos")]
pub fn handle_permission_command() -> Result<(), Box<dyn std::error::Error>> {
    use autoquit_core::WindowSystem;
    use autoquit_core::system::MacosSystem;

    let system = MacosSystem::new();
    if system.is_trusted() {
        println!("Accessibility access already granted.");
        return Ok(());
    }

    system.request_trust_prompt();
    println!(
        "Requested accessibility access. Approve the prompt, or enable autoquit in \
         System Settings > Privacy & Security > Accessibility, then start the monitor \
         with 'autoquit run'."
    );

    Ok(())
}

#[cfg(not(target_os = "macos"))]
pub fn handle_permission_command() -> Result<(), Box<dyn std::error::Error>> {
    Err(super::unsupported_platform())
}
