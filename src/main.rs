use clap::Parser;
use color_eyre::eyre::{self, Context};
use tracing_subscriber::{filter::LevelFilter, fmt, prelude::*, EnvFilter};

use ssh_get_id::{aggregate, source::Http, Config};

#[tokio::main]
async fn main() -> eyre::Result<()> {
    let config = Config::parse();

    // Set-up the pretty-printed error handler
    color_eyre::install()?;

    // Set-up the log and traces handler, keeping stdout free for the keys
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(
            EnvFilter::builder()
                .with_default_directive(LevelFilter::WARN.into())
                .from_env_lossy(),
        )
        .init();

    let output = config.output()?;
    let local = config.local()?;

    let source = Http::new().wrap_err("Error setting up the HTTP client")?;

    let keys = aggregate::aggregate(&source, &config.targets, &local, !config.no_warn).await?;

    aggregate::write(&keys, &output)
        .await
        .wrap_err("Error writing the merged keys")
}
