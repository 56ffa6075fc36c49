use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "acp-analyst")]
#[command(about = "ACP seller agent for black swan and market peak analyses", long_about = None)]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Configuration file replacing .acp-analyst/config.yaml and local.yaml
    #[arg(short, long, global = true, env = "ACP_ANALYST_CONFIG")]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the seller agent and its monitoring server
    Serve,

    /// Fetch and format one analysis, printing the JSON that would be delivered
    Fetch {
        /// Service slug (black-swan, market-peak) or canonical name
        kind: String,
    },

    /// Show which service a requirement would be classified as
    Classify {
        /// Requirement text, or a JSON object
        requirement: String,
    },
}
