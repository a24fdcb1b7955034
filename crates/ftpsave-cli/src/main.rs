// ftpsave CLI
//
// Usage: ftpsave [--config FILE] [--server NAME] <list|test|upload|download>

use clap::Parser;
use tracing_subscriber::{fmt, EnvFilter};

mod commands;
mod handler;

#[tokio::main]
async fn main() {
    // RUST_LOG=debug ftpsave -s reports test  (상태 전이 포함)
    fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info"))
        )
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = commands::Cli::parse();

    if let Err(e) = handler::run(cli).await {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}
