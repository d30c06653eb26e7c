use crate::BlockNumber;
use std::fmt::{Display, Formatter};
use std::num::NonZeroU64;


#[derive(Debug, Clone, thiserror::Error)]
#[error("first block {first_block} is above last block {last_block}")]
pub struct BlockRangeError {
    pub first_block: BlockNumber,
    pub last_block: BlockNumber,
}


/// Inclusive range of block numbers. `first_block <= last_block` always holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct BlockRange {
    first_block: BlockNumber,
    last_block: BlockNumber,
}


impl BlockRange {
    pub fn new(
        first_block: BlockNumber,
        last_block: BlockNumber
    ) -> Result<Self, BlockRangeError>
    {
        if first_block > last_block {
            return Err(BlockRangeError {
                first_block,
                last_block,
            })
        }
        Ok(Self {
            first_block,
            last_block,
        })
    }

    pub fn first_block(&self) -> BlockNumber {
        self.first_block
    }

    pub fn last_block(&self) -> BlockNumber {
        self.last_block
    }

    pub fn len(&self) -> u64 {
        self.last_block - self.first_block + 1
    }

    pub fn contains(&self, block_number: BlockNumber) -> bool {
        self.first_block <= block_number && block_number <= self.last_block
    }

    pub fn iter(&self) -> impl Iterator<Item = BlockNumber> {
        self.first_block..=self.last_block
    }

    /// Splits the range into consecutive sub-ranges of at most `batch_size`
    /// blocks. Only the last one may be shorter.
    pub fn batches(self, batch_size: NonZeroU64) -> impl Iterator<Item = BlockRange> {
        let size = batch_size.get();
        let mut rest = Some(self);
        std::iter::from_fn(move || {
            let range = rest.take()?;
            if range.len() <= size {
                return Some(range)
            }
            let split = range.first_block + size - 1;
            rest = Some(BlockRange {
                first_block: split + 1,
                last_block: range.last_block,
            });
            Some(BlockRange {
                first_block: range.first_block,
                last_block: split,
            })
        })
    }
}


impl Display for BlockRange {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}-{}", self.first_block, self.last_block)
    }
}
