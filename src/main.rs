//! acp-analyst CLI entry point.

use clap::Parser;

use acp_analyst::cli::{self, Cli, Commands};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    let config_path = cli.config.as_deref();

    let result = match cli.command {
        Commands::Serve => cli::commands::serve::execute(config_path).await,
        Commands::Fetch { ref kind } => {
            cli::init_cli_tracing();
            cli::commands::fetch::execute(kind, config_path).await
        }
        Commands::Classify { ref requirement } => {
            cli::commands::classify::execute(requirement);
            Ok(())
        }
    };

    if let Err(err) = result {
        cli::handle_error(err);
    }
}
