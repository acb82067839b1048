use clap::Parser;
use tracing_subscriber::EnvFilter;

use jdao_node::cli;

fn main() {
    let cli = cli::Cli::parse();

    // RUST_LOG wins over the configured level. Logs go to stderr so that
    // `simulate --json` output stays parseable.
    let level = cli.log_level();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level)))
        .with_writer(std::io::stderr)
        .init();

    let rt = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            tracing::error!("failed to create tokio runtime: {}", e);
            std::process::exit(1);
        }
    };
    rt.block_on(async {
        if let Err(e) = cli::run(cli).await {
            tracing::error!("fatal error: {}", e);
            std::process::exit(1);
        }
    });
}
