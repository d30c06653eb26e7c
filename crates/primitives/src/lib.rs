
pub type BlockNumber = u64;

pub type Timestamp = u64;

mod range;

pub use range::{BlockRange, BlockRangeError};
