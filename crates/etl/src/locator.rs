use anyhow::Context;
use betl_client::BtcClient;
use betl_primitives::{BlockNumber, BlockRange, Timestamp};
use chrono::NaiveDate;


const SECONDS_PER_DAY: Timestamp = 24 * 60 * 60;


#[derive(Debug, Clone, thiserror::Error)]
#[error(
    "no blocks in the window [{start_ts}, {end_ts}): \
     chain timestamps span {chain_start_ts}..={chain_end_ts}"
)]
pub struct OutOfBoundsError {
    pub start_ts: Timestamp,
    pub end_ts: Timestamp,
    pub chain_start_ts: Timestamp,
    pub chain_end_ts: Timestamp,
}


/// Timestamp probes against a chain. Block timestamps are non-decreasing in
/// block number (ties allowed). One probe is one node round trip, which is
/// why the locator binary-searches and never scans.
#[async_trait::async_trait]
pub trait BlockClock: Sync {
    async fn chain_height(&self) -> anyhow::Result<BlockNumber>;

    async fn block_timestamp(&self, number: BlockNumber) -> anyhow::Result<Timestamp>;
}


#[async_trait::async_trait]
impl BlockClock for BtcClient {
    async fn chain_height(&self) -> anyhow::Result<BlockNumber> {
        Ok(BtcClient::chain_height(self).await?)
    }

    async fn block_timestamp(&self, number: BlockNumber) -> anyhow::Result<Timestamp> {
        Ok(BtcClient::block_timestamp(self, number).await?)
    }
}


/// Blocks of the UTC calendar day `date`.
pub async fn block_range_for_date(
    clock: &impl BlockClock,
    date: NaiveDate
) -> anyhow::Result<BlockRange>
{
    let midnight = date.and_hms_opt(0, 0, 0).unwrap().and_utc().timestamp();
    let start_ts = Timestamp::try_from(midnight)
        .with_context(|| format!("date {} is before the epoch", date))?;
    block_range_for_timestamps(clock, start_ts, start_ts + SECONDS_PER_DAY).await
}


/// Blocks whose timestamps fall into the half-open window
/// `[start_ts, end_ts)`.
///
/// The bounds are found by two independent binary searches: the leftmost
/// block with timestamp >= start_ts and the rightmost block with timestamp
/// < end_ts. Picking the leftmost/rightmost match makes the result
/// deterministic when adjacent blocks share a timestamp.
pub async fn block_range_for_timestamps(
    clock: &impl BlockClock,
    start_ts: Timestamp,
    end_ts: Timestamp
) -> anyhow::Result<BlockRange>
{
    anyhow::ensure!(
        start_ts < end_ts,
        "window start {} is not below window end {}",
        start_ts,
        end_ts
    );

    let tip = clock.chain_height().await?;
    let chain_start_ts = clock.block_timestamp(0).await?;
    let chain_end_ts = clock.block_timestamp(tip).await?;

    let out_of_bounds = OutOfBoundsError {
        start_ts,
        end_ts,
        chain_start_ts,
        chain_end_ts,
    };

    if end_ts <= chain_start_ts || start_ts > chain_end_ts {
        return Err(out_of_bounds.into())
    }

    let first = first_at_or_after(clock, start_ts, tip).await?;
    let last = last_before(clock, end_ts, tip).await?;

    // both bounds exist, but a window falling into a gap between two
    // consecutive timestamps selects no blocks
    BlockRange::new(first, last).map_err(|_| out_of_bounds.into())
}


/// Smallest block number with timestamp >= `ts`. The caller guarantees the
/// tip qualifies.
async fn first_at_or_after(
    clock: &impl BlockClock,
    ts: Timestamp,
    tip: BlockNumber
) -> anyhow::Result<BlockNumber>
{
    let mut lo = 0;
    let mut hi = tip;
    while lo < hi {
        let mid = lo + (hi - lo) / 2;
        if clock.block_timestamp(mid).await? >= ts {
            hi = mid;
        } else {
            lo = mid + 1;
        }
    }
    Ok(lo)
}


/// Largest block number with timestamp < `ts`. The caller guarantees the
/// genesis block qualifies.
async fn last_before(
    clock: &impl BlockClock,
    ts: Timestamp,
    tip: BlockNumber
) -> anyhow::Result<BlockNumber>
{
    let mut lo = 0;
    let mut hi = tip;
    while lo < hi {
        let mid = lo + (hi - lo + 1) / 2;
        if clock.block_timestamp(mid).await? < ts {
            lo = mid;
        } else {
            hi = mid - 1;
        }
    }
    Ok(lo)
}
