use anyhow::{Context, Result};
use clap::Parser;
use http_fetch::HttpFetch;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

mod cli;
mod output;

use cli::Cli;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let config = cli.load_config()?;
    let mut client = HttpFetch::with_config(config).context("Failed to build HTTP client")?;
    cli.apply(&mut client);
    debug!(config = ?client.config(), options = ?client.options(), "client settings");

    info!(url = %cli.url, "fetching");
    let text = client
        .fetch(&cli.url, None, cli.body().as_ref())
        .await
        .with_context(|| format!("Failed to fetch {}", cli.url))?;

    output::write_output(&cli.output, &text).await?;
    info!(path = %cli.output.display(), bytes = text.len(), "page written");

    println!("Done");
    Ok(())
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr).init();
}
