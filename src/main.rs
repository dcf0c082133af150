//! sqlfeed - runs read-only SQL and prints the results as JSON.

mod cli;

use cli::Cli;
use futures::StreamExt;
use sqlfeed::query::QueryExecutor;
use sqlfeed::{db, logging};
use tracing::{error, info};

#[tokio::main]
async fn main() {
    let cli = Cli::parse_args();
    logging::init(cli.debug);

    if let Err(e) = run(cli).await {
        error!("{e:#}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    if let Err(message) = cli.validate() {
        anyhow::bail!(message);
    }

    let config = cli.to_config();
    info!("Connection: {}", config.display_string());

    let client = db::connect(&config)?;
    let executor = QueryExecutor::new(client.as_ref(), config.max_rows);

    if cli.stream {
        // One JSON array per line: the header row first, then data rows.
        let mut rows = executor.stream(&cli.query, &cli.formatter);
        while let Some(row) = rows.next().await {
            println!("{}", serde_json::Value::Array(row?));
        }
    } else {
        let result = executor.run_bounded(&cli.query, cli.limit).await;
        println!("{}", serde_json::to_string(&result)?);
    }

    client.close().await?;
    Ok(())
}
