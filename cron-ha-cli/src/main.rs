use clap::Parser;
use std::process;

mod cli;
mod commands;
mod error;
mod exit_codes;
mod logging;

use cli::Cli;
use error::handle_cli_result;
use exit_codes::{EXIT_ERROR, EXIT_SUCCESS};

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            // Help and version requests are normal exits
            use clap::error::ErrorKind;
            match e.kind() {
                ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => {
                    print!("{}", e);
                    process::exit(EXIT_SUCCESS);
                }
                _ => {
                    eprintln!("{}", e);
                    process::exit(EXIT_ERROR);
                }
            }
        }
    };

    logging::configure_logging(cli.debug, cli.quiet);

    let exit_code = handle_cli_result(commands::run(cli).await);
    process::exit(exit_code);
}
