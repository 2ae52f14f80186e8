use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(
    name = "contract-gas-projector",
    version,
    about = "Project Bahamut earnings from an Ethereum contract's gas usage"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Aggregate a contract's transactions and project earnings
    Analyze {
        address: String,
        /// Print the full report as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show verification status and deployability of a contract
    Contract {
        address: String,
        /// Print the verified source code instead of the summary
        #[arg(long)]
        source: bool,
    },
    /// Print the target chain's wallet parameters
    Chain,
    /// Run the HTTP API server
    Serve {
        /// Override bind address, e.g. 0.0.0.0:8080
        #[arg(long)]
        addr: Option<String>,
    },
}
