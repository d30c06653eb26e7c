//! Wire shapes of bitcoind block and transaction responses.
//!
//! Everything here is decode-only. Loose JSON stops at this boundary:
//! the rest of the system works with the typed records of [`crate::records`],
//! produced by [`crate::mapper`].

use betl_primitives::{BlockNumber, Timestamp};
use rust_decimal::Decimal;
use serde::Deserialize;


#[derive(Debug, Clone, Deserialize)]
pub struct RawBlock {
    pub hash: String,
    pub height: BlockNumber,
    pub version: u32,
    #[serde(rename = "merkleroot")]
    pub merkle_root: String,
    pub time: Timestamp,
    #[serde(rename = "mediantime", default)]
    pub median_time: Option<Timestamp>,
    pub nonce: u64,
    pub bits: String,
    pub size: u64,
    #[serde(rename = "strippedsize", default)]
    pub stripped_size: Option<u64>,
    pub weight: u64,
    #[serde(rename = "nTx", default)]
    pub n_tx: Option<u64>,
    #[serde(rename = "previousblockhash", default)]
    pub previous_block_hash: Option<String>,
    #[serde(default)]
    pub tx: TxList,
}


/// `getblock` returns transaction ids at verbosity 1 and full transaction
/// objects at verbosity 2. Both shapes are accepted, as is a missing list.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum TxList {
    Ids(Vec<String>),
    Full(Vec<RawTransaction>),
}


impl TxList {
    pub fn len(&self) -> usize {
        match self {
            TxList::Ids(ids) => ids.len(),
            TxList::Full(txs) => txs.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}


impl Default for TxList {
    fn default() -> Self {
        TxList::Ids(Vec::new())
    }
}


#[derive(Debug, Clone, Deserialize)]
pub struct RawTransaction {
    pub txid: String,
    #[serde(default)]
    pub hash: Option<String>,
    pub version: u32,
    #[serde(default)]
    pub size: Option<u64>,
    #[serde(default)]
    pub vsize: Option<u64>,
    pub locktime: u32,
    #[serde(default)]
    pub vin: Vec<RawInput>,
    #[serde(default)]
    pub vout: Vec<RawOutput>,
}


/// A coinbase input carries no outpoint, so the two shapes are told apart
/// by their fields alone.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum RawInput {
    Outpoint(RawOutpointInput),
    Coinbase(RawCoinbaseInput),
}


#[derive(Debug, Clone, Deserialize)]
pub struct RawOutpointInput {
    pub txid: String,
    pub vout: u32,
    #[serde(rename = "scriptSig", default)]
    pub script_sig: Option<RawScriptSig>,
    #[serde(default)]
    pub sequence: u64,
}


#[derive(Debug, Clone, Deserialize)]
pub struct RawCoinbaseInput {
    pub coinbase: String,
    #[serde(default)]
    pub sequence: u64,
}


#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawScriptSig {
    #[serde(default)]
    pub asm: String,
    #[serde(default)]
    pub hex: String,
}


#[derive(Debug, Clone, Deserialize)]
pub struct RawOutput {
    #[serde(with = "rust_decimal::serde::arbitrary_precision")]
    pub value: Decimal,
    pub n: u32,
    #[serde(rename = "scriptPubKey")]
    pub script_pub_key: RawScriptPubKey,
}


#[derive(Debug, Clone, Deserialize)]
pub struct RawScriptPubKey {
    #[serde(default)]
    pub asm: String,
    #[serde(default)]
    pub hex: String,
    #[serde(rename = "reqSigs", default)]
    pub req_sigs: Option<u32>,
    #[serde(rename = "type", default)]
    pub script_type: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub addresses: Option<Vec<String>>,
}


impl RawScriptPubKey {
    /// Newer nodes report a single `address`, older ones a list.
    pub fn addresses(&self) -> Vec<String> {
        if let Some(addresses) = &self.addresses {
            return addresses.clone()
        }
        self.address.clone().into_iter().collect()
    }
}
