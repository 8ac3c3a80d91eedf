use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use tracing::{debug, Level};
use tracing_subscriber::FmtSubscriber;

use syncstage::connector::adapter::{cancel_on_signals, DEFAULT_OUTPUT_CHANNEL};
use syncstage::{ci_fixture_plugin, Commands, Container, ContainerConfig, FailurePolicy, Router};

#[derive(Parser)]
#[command(name = "syncstage")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Where NDJSON results are written
    #[arg(long, global = true, default_value = DEFAULT_OUTPUT_CHANNEL)]
    output: PathBuf,

    /// Persist the sync state every N items
    #[arg(long, global = true, default_value_t = 100)]
    checkpoint_interval: usize,

    /// `propagate` or `log-and-return`
    #[arg(long, global = true, default_value = "propagate")]
    failure_policy: String,

    #[command(subcommand)]
    command: Commands,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let config = ContainerConfig {
        output_channel: cli.output,
        checkpoint_interval: cli.checkpoint_interval,
        failure_policy: FailurePolicy::parse(&cli.failure_policy)?,
    };
    let container = Container::new(ci_fixture_plugin()?, config)?;

    let cancel = container.cancellation_token();
    let watcher = cancel_on_signals(cancel.clone())?;

    let router = Router::new(&container);
    let result = router.route(cli.command).await;

    // Stops the signal watcher.
    cancel.cancel();
    let _ = watcher.await;

    let output = result?;
    debug!("Done");
    println!("{}", output);

    Ok(())
}
