//! packport command-line entry point.

use clap::Parser;
use packport::cli;
use packport::core::user_friendly_error;

#[tokio::main]
async fn main() {
    let cli = cli::Cli::parse();
    let config = cli.build_config();
    config.init_logging();

    #[cfg(windows)]
    colored::control::set_virtual_terminal(true).ok();

    if let Err(e) = cli.execute_with_config(config).await {
        user_friendly_error(e).display();
        std::process::exit(1);
    }
}
