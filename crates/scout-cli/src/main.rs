//! The `scout` binary.

use std::process::ExitCode;

use clap::Parser;

use scout_cli::{handle_config_command, init_logging, CliArgs, Command, ScoutApp};

#[tokio::main]
async fn main() -> ExitCode {
    let mut args = CliArgs::parse();
    init_logging(args.verbose, args.quiet);

    let result = match args.command.take() {
        // Config commands must work before a valid config file exists.
        Some(Command::Config(cmd)) => handle_config_command(args.config.as_deref(), cmd.command),
        command => match ScoutApp::from_args(&args) {
            Ok(app) => app.run(command).await,
            Err(e) => Err(e),
        },
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}
