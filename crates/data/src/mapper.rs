//! Conversion of raw node responses into export records.
//!
//! This is the single place where loose JSON becomes typed data. Mapping is
//! pure and deterministic: the same raw block always maps to a structurally
//! equal record.

use crate::amount::{btc_to_sat, AmountError};
use crate::model::{RawBlock, RawInput, RawTransaction, TxList};
use crate::records::{Block, Transaction, TxInput, TxOutput};


#[derive(Debug, thiserror::Error)]
pub enum MappingError {
    #[error("response does not match the expected {kind} schema: {source}")]
    Schema {
        kind: &'static str,
        #[source]
        source: serde_json::Error,
    },

    #[error("transaction {txid}, output {index}: {source}")]
    Amount {
        txid: String,
        index: u32,
        #[source]
        source: AmountError,
    },

    #[error("transaction {txid} has no output {index}")]
    MissingOutput { txid: String, index: u32 },
}


pub fn block_from_json(raw: serde_json::Value) -> Result<Block, MappingError> {
    let raw: RawBlock = serde_json::from_value(raw).map_err(|source| {
        MappingError::Schema { kind: "block", source }
    })?;
    block_from_raw(&raw)
}


pub fn transaction_from_json(raw: serde_json::Value) -> Result<RawTransaction, MappingError> {
    serde_json::from_value(raw).map_err(|source| {
        MappingError::Schema { kind: "transaction", source }
    })
}


pub fn block_from_raw(raw: &RawBlock) -> Result<Block, MappingError> {
    let transactions = match &raw.tx {
        TxList::Full(txs) => txs
            .iter()
            .enumerate()
            .map(|(index, tx)| transaction_from_raw(tx, raw, index as u32))
            .collect::<Result<Vec<_>, _>>()?,
        TxList::Ids(_) => Vec::new(),
    };

    let coinbase_param = transactions
        .first()
        .and_then(|tx| tx.inputs.first())
        .and_then(|input| input.coinbase_param.clone());

    // at verbosity 1 the tx list still tells the count; a header-only
    // response falls back to nTx
    let transaction_count = if raw.tx.is_empty() {
        raw.n_tx.unwrap_or(0)
    } else {
        raw.tx.len() as u64
    };

    Ok(Block {
        hash: raw.hash.clone(),
        number: raw.height,
        timestamp: raw.time,
        median_timestamp: raw.median_time,
        size: raw.size,
        stripped_size: raw.stripped_size,
        weight: raw.weight,
        version: raw.version,
        nonce: raw.nonce,
        bits: raw.bits.clone(),
        merkle_root: raw.merkle_root.clone(),
        previous_block_hash: raw.previous_block_hash.clone(),
        coinbase_param,
        transaction_count,
        transactions,
    })
}


pub fn transaction_from_raw(
    raw: &RawTransaction,
    block: &RawBlock,
    index: u32
) -> Result<Transaction, MappingError>
{
    let inputs: Vec<TxInput> = raw.vin
        .iter()
        .enumerate()
        .map(|(index, input)| input_from_raw(input, index as u32))
        .collect();

    let outputs = raw.vout
        .iter()
        .map(|output| {
            let value = btc_to_sat(output.value).map_err(|source| {
                amount_error(&raw.txid, output.n, source)
            })?;
            Ok(TxOutput {
                index: output.n,
                value,
                script_asm: output.script_pub_key.asm.clone(),
                script_hex: output.script_pub_key.hex.clone(),
                script_type: output.script_pub_key.script_type.clone(),
                addresses: output.script_pub_key.addresses(),
                required_signatures: output.script_pub_key.req_sigs,
            })
        })
        .collect::<Result<Vec<_>, MappingError>>()?;

    let output_value = outputs.iter().map(|output| output.value).sum();
    let is_coinbase = matches!(raw.vin.first(), Some(RawInput::Coinbase(_)));

    Ok(Transaction {
        hash: raw.txid.clone(),
        size: raw.size,
        virtual_size: raw.vsize,
        version: raw.version,
        lock_time: raw.locktime,
        block_number: block.height,
        block_hash: block.hash.clone(),
        block_timestamp: block.time,
        index,
        is_coinbase,
        input_count: inputs.len() as u64,
        output_count: outputs.len() as u64,
        inputs,
        outputs,
        output_value,
        input_value: None,
        fee: None,
    })
}


/// Value of output `index` of `raw`, for resolving spent outpoints during
/// input enrichment.
pub fn output_value(raw: &RawTransaction, index: u32) -> Result<u64, MappingError> {
    let output = raw.vout
        .iter()
        .find(|output| output.n == index)
        .ok_or_else(|| MappingError::MissingOutput {
            txid: raw.txid.clone(),
            index,
        })?;
    btc_to_sat(output.value).map_err(|source| amount_error(&raw.txid, index, source))
}


fn input_from_raw(raw: &RawInput, index: u32) -> TxInput {
    match raw {
        RawInput::Outpoint(input) => {
            let script_sig = input.script_sig.clone().unwrap_or_default();
            TxInput {
                index,
                spent_transaction_hash: Some(input.txid.clone()),
                spent_output_index: Some(input.vout),
                coinbase_param: None,
                script_asm: script_sig.asm,
                script_hex: script_sig.hex,
                sequence: input.sequence,
                value: None,
            }
        }
        RawInput::Coinbase(input) => TxInput {
            index,
            spent_transaction_hash: None,
            spent_output_index: None,
            coinbase_param: Some(input.coinbase.clone()),
            script_asm: String::new(),
            script_hex: String::new(),
            sequence: input.sequence,
            value: None,
        },
    }
}


fn amount_error(txid: &str, index: u32, source: AmountError) -> MappingError {
    MappingError::Amount {
        txid: txid.to_string(),
        index,
        source,
    }
}
