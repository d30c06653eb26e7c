//! Typed records emitted by the export pipeline.
//!
//! Amounts are whole satoshi. A block record carries its transactions for
//! ordered emission, but serializes without them: transactions go out as
//! records of their own.

use betl_primitives::{BlockNumber, Timestamp};
use serde::Serialize;


#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Block {
    pub hash: String,
    pub number: BlockNumber,
    pub timestamp: Timestamp,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub median_timestamp: Option<Timestamp>,
    pub size: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stripped_size: Option<u64>,
    pub weight: u64,
    pub version: u32,
    pub nonce: u64,
    pub bits: String,
    pub merkle_root: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub previous_block_hash: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub coinbase_param: Option<String>,
    pub transaction_count: u64,
    #[serde(skip)]
    pub transactions: Vec<Transaction>,
}


#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Transaction {
    pub hash: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub virtual_size: Option<u64>,
    pub version: u32,
    pub lock_time: u32,
    pub block_number: BlockNumber,
    pub block_hash: String,
    pub block_timestamp: Timestamp,
    pub index: u32,
    pub is_coinbase: bool,
    pub inputs: Vec<TxInput>,
    pub outputs: Vec<TxOutput>,
    pub input_count: u64,
    pub output_count: u64,
    pub output_value: u64,
    /// Sum of resolved input values. Present only after input enrichment.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub input_value: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fee: Option<u64>,
}


#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TxInput {
    pub index: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub spent_transaction_hash: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub spent_output_index: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub coinbase_param: Option<String>,
    pub script_asm: String,
    pub script_hex: String,
    pub sequence: u64,
    /// Value of the spent output. Present only after input enrichment.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<u64>,
}


#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TxOutput {
    pub index: u32,
    pub value: u64,
    pub script_asm: String,
    pub script_hex: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub script_type: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub addresses: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub required_signatures: Option<u32>,
}


impl TxInput {
    pub fn outpoint(&self) -> Option<(&str, u32)> {
        match (&self.spent_transaction_hash, self.spent_output_index) {
            (Some(txid), Some(index)) => Some((txid.as_str(), index)),
            _ => None,
        }
    }
}


/// One exported item, tagged so that mixed streams stay self-describing.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Record<'a> {
    Block(&'a Block),
    Transaction(&'a Transaction),
}
