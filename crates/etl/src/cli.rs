use betl_primitives::{BlockNumber, Timestamp};
use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};
use std::num::{NonZeroU64, NonZeroUsize};
use std::path::PathBuf;
use url::Url;


#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}


#[derive(Subcommand, Debug)]
pub enum Command {
    /// Export blocks and transactions from a block range
    ExportBlocks(ExportBlocksArgs),
    /// Find the block range covering a calendar date or timestamp window
    BlockRange(BlockRangeArgs),
}


#[derive(Args, Debug)]
pub struct ExportBlocksArgs {
    /// URL of the node JSON-RPC endpoint
    #[arg(short, long, value_name = "URL")]
    pub src: Url,

    /// First block of the range to export
    #[arg(long, value_name = "N")]
    pub first_block: BlockNumber,

    /// Last block of the range to export
    #[arg(long, value_name = "N")]
    pub last_block: BlockNumber,

    /// File to write records to; stdout when omitted
    #[arg(short, long, value_name = "FILE")]
    pub dest: Option<PathBuf>,

    /// Number of blocks per RPC batch
    #[arg(long, value_name = "N", default_value = "10")]
    pub batch_size: NonZeroU64,

    /// Upper limit on concurrently processed batches
    #[arg(long, value_name = "N", default_value = "5")]
    pub max_workers: NonZeroUsize,

    /// Do not emit block records
    #[arg(long)]
    pub skip_blocks: bool,

    /// Do not emit transaction records
    #[arg(long)]
    pub skip_transactions: bool,

    /// Resolve input values from the spent outputs
    /// (one extra RPC round trip per batch)
    #[arg(long)]
    pub enrich_inputs: bool,

    /// Port to use for built-in prometheus metrics server
    #[arg(long)]
    pub prom_port: Option<u16>,
}


#[derive(Args, Debug)]
pub struct BlockRangeArgs {
    /// URL of the node JSON-RPC endpoint
    #[arg(short, long, value_name = "URL")]
    pub src: Url,

    /// UTC calendar day to locate, e.g. 2017-01-02
    #[arg(
        long,
        value_name = "DATE",
        conflicts_with_all = ["start_timestamp", "end_timestamp"]
    )]
    pub date: Option<NaiveDate>,

    /// Start of a [start, end) timestamp window, seconds since epoch
    #[arg(long, value_name = "TS", requires = "end_timestamp")]
    pub start_timestamp: Option<Timestamp>,

    /// End of a [start, end) timestamp window, seconds since epoch
    #[arg(long, value_name = "TS", requires = "start_timestamp")]
    pub end_timestamp: Option<Timestamp>,
}
