use crate::cli::{BlockRangeArgs, Cli, Command, ExportBlocksArgs};
use crate::locator;
use crate::metrics;
use crate::pipeline::{ExportConfig, ExportJob};
use crate::server;
use crate::sink::JsonLinesExporter;
use betl_client::BtcClient;
use betl_primitives::BlockRange;
use prometheus_client::registry::Registry;


pub async fn run(args: &Cli) -> anyhow::Result<()> {
    match &args.command {
        Command::ExportBlocks(args) => export_blocks(args).await,
        Command::BlockRange(args) => block_range(args).await,
    }
}


async fn export_blocks(args: &ExportBlocksArgs) -> anyhow::Result<()> {
    let range = BlockRange::new(args.first_block, args.last_block)?;

    let config = ExportConfig {
        range,
        batch_size: args.batch_size,
        max_workers: args.max_workers,
        export_blocks: !args.skip_blocks,
        export_transactions: !args.skip_transactions,
        enrich_inputs: args.enrich_inputs,
    };

    if let Some(port) = args.prom_port {
        let mut registry = Registry::default();
        metrics::register_metrics(&mut registry);
        tokio::spawn(async move {
            if let Err(err) = server::run_server(registry, port).await {
                tracing::error!(err =? err, "metrics server failed");
            }
        });
    }

    let client = BtcClient::http(args.src.clone());
    let exporter = match &args.dest {
        Some(path) => JsonLinesExporter::file(path),
        None => JsonLinesExporter::stdout(),
    };

    let job = ExportJob::new(config, client, exporter)?;
    job.run().await
}


async fn block_range(args: &BlockRangeArgs) -> anyhow::Result<()> {
    let client = BtcClient::http(args.src.clone());

    let range = match (args.date, args.start_timestamp, args.end_timestamp) {
        (Some(date), None, None) => {
            locator::block_range_for_date(&client, date).await?
        }
        (None, Some(start_ts), Some(end_ts)) => {
            locator::block_range_for_timestamps(&client, start_ts, end_ts).await?
        }
        _ => anyhow::bail!(
            "specify either --date or --start-timestamp and --end-timestamp"
        ),
    };

    println!("{},{}", range.first_block(), range.last_block());
    Ok(())
}
