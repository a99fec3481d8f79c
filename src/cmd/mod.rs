//! Subcommand dispatch and execution.
//!
//! The [`dispatch`] function routes the parsed CLI to the appropriate
//! subcommand handler: [`run`] or [`validate`]. Each handler lives in
//! its own submodule.

pub mod run;
pub mod validate;

use crate::cli::{Cli, Commands};
use crate::error::TimelabError;

pub async fn dispatch(cli: Cli) -> Result<(), TimelabError> {
    match cli.command {
        Some(Commands::Run(args)) => run::execute(*args).await,
        Some(Commands::Validate(ref args)) => validate::execute(args),
        None => {
            print_welcome();
            Ok(())
        }
    }
}

fn print_welcome() {
    let version = env!("CARGO_PKG_VERSION");
    println!(
        "\n  timelab v{version}: teaching-lab time server\n\n  \
         No command provided. To get started:\n\n    \
         timelab run                       Start with profiles/dev.yaml\n    \
         timelab run -P test               Start with the test profile\n    \
         timelab validate -P prod          Check a profile file\n    \
         timelab --help                    See all commands and options\n"
    );
}
