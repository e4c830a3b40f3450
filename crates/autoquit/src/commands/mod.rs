use clap::ArgMatches;

pub mod permission;
pub mod run;
pub mod status;

pub fn run_command(matches: &ArgMatches) -> Result<(), Box<dyn std::error::Error>> {
    match matches.subcommand() {
        Some(("run", sub_matches)) => run::handle_run_command(sub_matches),
        Some(("status", sub_matches)) => status::handle_status_command(sub_matches),
        Some(("permission", _)) => permission::handle_permission_command(),
        _ => Err("Unknown command. Use --help to see available commands.".into()),
    }
}

#[cfg(not(target_os = "macos"))]
pub(crate) fn unsupported_platform() -> Box<dyn std::error::Error> {
    "autoquit monitors macOS application windows and only runs on macOS".into()
}
