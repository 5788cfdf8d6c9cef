use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;

use keysweep::logging::{self, LogFormat};

mod cmd;

#[derive(Parser)]
#[command(name = "keysweep")]
#[command(
    version,
    about = "Sweep GitHub repositories for leaked access keys with a dispatched scan workflow"
)]
pub struct Cli {
    /// Regex selecting repositories by name, anchored at the start. Prompted when omitted.
    #[arg(short, long)]
    pub pattern: Option<String>,

    /// Access key ID passed to the scan workflow. Prompted when omitted.
    #[arg(short = 'k', long)]
    pub access_key: Option<String>,

    /// Load configuration from this file instead of `.env`
    #[arg(long)]
    pub env_file: Option<PathBuf>,

    #[arg(short, long)]
    pub verbose: bool,

    #[arg(long, value_enum, default_value_t = LogFormat::Text)]
    pub log_format: LogFormat,

    /// Print the final report as JSON on stdout
    #[arg(long)]
    pub json: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::init(cli.verbose, cli.log_format);

    cmd::cmd_sweep(&cli).await
}
