use crate::metrics;
use crate::progress::Progress;
use crate::sink::ItemExporter;
use anyhow::Context;
use betl_client::BtcClient;
use betl_data::mapper;
use betl_data::model::RawTransaction;
use betl_data::records::{Block, Record};
use betl_primitives::{BlockNumber, BlockRange};
use futures::{StreamExt, TryStreamExt};
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};
use std::num::{NonZeroU64, NonZeroUsize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};
use tracing::info;


#[derive(Debug, Clone)]
pub struct ExportConfig {
    pub range: BlockRange,
    pub batch_size: NonZeroU64,
    pub max_workers: NonZeroUsize,
    pub export_blocks: bool,
    pub export_transactions: bool,
    pub enrich_inputs: bool,
}


#[derive(Debug, Clone, thiserror::Error)]
pub enum ConfigError {
    #[error("nothing to export: block and transaction export are both disabled")]
    NothingToExport,

    #[error("input enrichment requires transaction export")]
    EnrichmentWithoutTransactions,
}


/// Exports a block range as a stream of block and transaction records.
///
/// The range is split into batches of `batch_size` blocks. Up to
/// `max_workers` batches run concurrently; each batch resolves its block
/// hashes and block bodies in two correlated RPC round trips, maps the raw
/// payloads to records and emits them under the exporter lock in
/// block-number order, block first, then its transactions in intra-block
/// order. Batches finish in arbitrary order relative to each other.
pub struct ExportJob<E> {
    config: ExportConfig,
    client: BtcClient,
    exporter: Mutex<E>,
    exported_blocks: AtomicU64,
    progress: Mutex<ProgressState>,
}


struct ProgressState {
    meter: Progress,
    last_block: BlockNumber,
    last_report: Instant,
}


impl<E: ItemExporter> ExportJob<E> {
    pub fn new(
        config: ExportConfig,
        client: BtcClient,
        exporter: E
    ) -> Result<Self, ConfigError>
    {
        if !config.export_blocks && !config.export_transactions {
            return Err(ConfigError::NothingToExport)
        }
        if config.enrich_inputs && !config.export_transactions {
            return Err(ConfigError::EnrichmentWithoutTransactions)
        }
        Ok(Self {
            config,
            client,
            exporter: Mutex::new(exporter),
            exported_blocks: AtomicU64::new(0),
            progress: Mutex::new(ProgressState {
                meter: Progress::new(Duration::from_secs(10)),
                last_block: 0,
                last_report: Instant::now(),
            }),
        })
    }

    pub async fn run(&self) -> anyhow::Result<()> {
        self.exporter.lock().open()?;
        let result = self.export().await;
        self.exporter.lock().close()?;
        result
    }

    async fn export(&self) -> anyhow::Result<()> {
        let range = self.config.range;
        info!("exporting blocks {}", range);

        // the first failed batch drops the stream, so no further batches
        // are submitted after an error
        futures::stream::iter(range.batches(self.config.batch_size))
            .map(|batch| self.export_batch(batch))
            .buffer_unordered(self.config.max_workers.get())
            .try_for_each(|()| std::future::ready(Ok(())))
            .await?;

        info!(
            "exported {} blocks from range {}",
            self.exported_blocks.load(Ordering::Relaxed),
            range
        );
        Ok(())
    }

    async fn export_batch(&self, batch: BlockRange) -> anyhow::Result<()> {
        let numbers: Vec<BlockNumber> = batch.iter().collect();

        let hashes = self.client
            .block_hashes(&numbers)
            .await
            .with_context(|| format!("failed to resolve hashes of blocks {}", batch))?;

        let raw_blocks = self.client
            .blocks(&hashes, self.config.export_transactions)
            .await
            .with_context(|| format!("failed to fetch blocks {}", batch))?;

        let mut blocks = raw_blocks
            .into_iter()
            .map(mapper::block_from_json)
            .collect::<Result<Vec<Block>, _>>()?;

        // correlation restores request order, which is ascending
        debug_assert!(blocks.windows(2).all(|pair| pair[0].number < pair[1].number));

        if self.config.enrich_inputs {
            self.enrich_inputs(&mut blocks).await?;
        }

        self.emit(&blocks)?;
        self.note_progress(&batch);
        Ok(())
    }

    fn emit(&self, blocks: &[Block]) -> anyhow::Result<()> {
        let mut exporter = self.exporter.lock();
        for block in blocks {
            if self.config.export_blocks {
                exporter.export_item(&Record::Block(block))?;
                metrics::EXPORTED_ITEMS.inc();
            }
            if self.config.export_transactions {
                for tx in &block.transactions {
                    exporter.export_item(&Record::Transaction(tx))?;
                    metrics::EXPORTED_ITEMS.inc();
                }
            }
        }
        Ok(())
    }

    /// Resolves the value of every spent outpoint in `blocks` with one
    /// extra correlated round trip, then derives per-transaction input
    /// totals and fees.
    async fn enrich_inputs(&self, blocks: &mut [Block]) -> anyhow::Result<()> {
        let mut seen = HashSet::new();
        let mut txids: Vec<String> = Vec::new();
        for block in blocks.iter() {
            for tx in &block.transactions {
                for input in &tx.inputs {
                    if let Some((txid, _)) = input.outpoint() {
                        if seen.insert(txid.to_string()) {
                            txids.push(txid.to_string());
                        }
                    }
                }
            }
        }
        if txids.is_empty() {
            return Ok(())
        }

        let raw = self.client
            .transactions(&txids)
            .await
            .context("failed to fetch spent transactions")?;

        let mut funding: HashMap<String, RawTransaction> =
            HashMap::with_capacity(txids.len());
        for value in raw {
            let tx = mapper::transaction_from_json(value)?;
            funding.insert(tx.txid.clone(), tx);
        }

        for block in blocks.iter_mut() {
            for tx in block.transactions.iter_mut() {
                if tx.is_coinbase {
                    continue
                }
                let mut input_value: u64 = 0;
                for input in tx.inputs.iter_mut() {
                    let Some((txid, vout)) = input
                        .outpoint()
                        .map(|(txid, vout)| (txid.to_string(), vout))
                    else {
                        continue
                    };
                    let spent = funding.get(&txid).with_context(|| {
                        format!("node did not return spent transaction {}", txid)
                    })?;
                    let value = mapper::output_value(spent, vout)?;
                    input.value = Some(value);
                    input_value += value;
                }
                let fee = input_value.checked_sub(tx.output_value).with_context(|| {
                    format!("transaction {} outputs exceed its inputs", tx.hash)
                })?;
                tx.input_value = Some(input_value);
                tx.fee = Some(fee);
            }
        }
        Ok(())
    }

    fn note_progress(&self, batch: &BlockRange) {
        let total = self.exported_blocks
            .fetch_add(batch.len(), Ordering::Relaxed) + batch.len();

        let mut progress = self.progress.lock();
        progress.last_block = progress.last_block.max(batch.last_block());
        progress.meter.update(total);
        metrics::LAST_BLOCK.set(progress.last_block as i64);

        if progress.last_report.elapsed() > Duration::from_secs(5) {
            progress.last_report = Instant::now();
            let speed = progress.meter.speed();
            metrics::PROGRESS.set(speed);
            info!(
                "block {} / {}, {} blocks/sec",
                progress.last_block,
                self.config.range.last_block(),
                speed.round()
            );
        }
    }
}
