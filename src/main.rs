//! fleetrender CLI entry point.
//!
//! Parses the command line, installs the tracing subscriber, runs the
//! selected command, and exits with its aggregated exit code. Errors are
//! rendered through the user-friendly error formatter before exiting
//! non-zero.

use clap::Parser;
use fleetrender::cli::Cli;
use fleetrender::core::user_friendly_error;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    cli.init_tracing();

    #[cfg(windows)]
    colored::control::set_virtual_terminal(true).ok();

    match cli.execute().await {
        Ok(code) => std::process::exit(code),
        Err(e) => {
            let error_ctx = user_friendly_error(e);
            error_ctx.display();
            std::process::exit(1);
        }
    }
}
