use clap::{Arg, ArgAction, Command};

pub fn build_cli() -> Command {
    Command::new("autoquit")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Quit macOS applications when their last standard window closes")
        .long_about(
            "AutoQuit watches every regular application and asks it to quit gracefully \
             once its last standard visible window is gone. Dialogs, panels, minimized \
             windows and tiny placeholder windows do not keep an application alive. \
             Requires macOS accessibility access.",
        )
        .arg(
            Arg::new("quiet")
                .short('q')
                .long("quiet")
                .help("Only log errors")
                .action(ArgAction::SetTrue)
                .global(true),
        )
        .subcommand_required(true)
        .arg_required_else_help(true)
        .subcommand(
            Command::new("run")
                .about("Run the monitor until interrupted")
                .arg(
                    Arg::new("config")
                        .long("config")
                        .short('c')
                        .value_name("PATH")
                        .help("Config file path (default: ~/.autoquit/config.toml)"),
                )
                .arg(
                    Arg::new("dry-run")
                        .long("dry-run")
                        .help("Log quit decisions without terminating anything")
                        .action(ArgAction::SetTrue),
                ),
        )
        .subcommand(
            Command::new("status")
                .about("Show whether accessibility access is granted")
                .arg(
                    Arg::new("json")
                        .long("json")
                        .help("Output status as JSON")
                        .action(ArgAction::SetTrue),
                ),
        )
        .subcommand(
            Command::new("permission")
                .about("Trigger the accessibility permission prompt"),
        )
}
