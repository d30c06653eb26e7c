use async_trait::async_trait;
use betl_client::{BtcClient, RpcError, RpcErrorObject, RpcRequest, RpcResponse, RpcTransport};
use betl_data::records::Record;
use betl_etl::pipeline::{ConfigError, ExportConfig, ExportJob};
use betl_etl::sink::{ItemExporter, JsonLinesExporter};
use betl_primitives::{BlockNumber, BlockRange};
use parking_lot::Mutex;
use serde_json::Value;
use std::num::{NonZeroU64, NonZeroUsize};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;


const GENESIS_TIME: u64 = 1231469665;

const COINBASE_VALUE: u64 = 5_000_000_000;
const SPEND_VALUE: u64 = 4_999_000_000;


fn block_hash(number: BlockNumber) -> String {
    format!("{:064x}", 0xb10c_0000_u64 + number)
}

fn coinbase_txid(number: BlockNumber) -> String {
    format!("{:064x}", 0x00c0_0000_u64 + number)
}

fn spend_txid(number: BlockNumber) -> String {
    format!("{:064x}", 0x00d0_0000_u64 + number)
}


fn coinbase_tx_json(number: BlockNumber) -> String {
    format!(
        r#"{{
            "txid": "{txid}",
            "hash": "{txid}",
            "version": 1,
            "size": 134,
            "vsize": 134,
            "locktime": 0,
            "vin": [{{"coinbase": "04ffff001d0104", "sequence": 4294967295}}],
            "vout": [{{
                "value": 50.00000000,
                "n": 0,
                "scriptPubKey": {{"asm": "OP_CHECKSIG", "hex": "ac", "type": "pubkey"}}
            }}]
        }}"#,
        txid = coinbase_txid(number)
    )
}


/// Spends the coinbase output of the previous block, leaving 0.01 as fee.
fn spend_tx_json(number: BlockNumber) -> String {
    format!(
        r#"{{
            "txid": "{txid}",
            "hash": "{txid}",
            "version": 1,
            "size": 275,
            "vsize": 275,
            "locktime": 0,
            "vin": [{{
                "txid": "{spent}",
                "vout": 0,
                "scriptSig": {{"asm": "sig", "hex": "47"}},
                "sequence": 4294967295
            }}],
            "vout": [{{
                "value": 49.99000000,
                "n": 0,
                "scriptPubKey": {{"asm": "OP_DUP", "hex": "76", "type": "pubkeyhash"}}
            }}]
        }}"#,
        txid = spend_txid(number),
        spent = coinbase_txid(number - 1)
    )
}


fn block_json(number: BlockNumber) -> Value {
    let mut txs = vec![coinbase_tx_json(number)];
    if number > 0 {
        txs.push(spend_tx_json(number));
    }
    let prev = if number > 0 {
        format!(r#""previousblockhash": "{}","#, block_hash(number - 1))
    } else {
        String::new()
    };
    let json = format!(
        r#"{{
            "hash": "{hash}",
            "height": {number},
            "version": 1,
            "merkleroot": "{merkle}",
            "time": {time},
            "mediantime": {time},
            "nonce": 1,
            "bits": "1d00ffff",
            "nTx": {n_tx},
            {prev}
            "size": 500,
            "strippedsize": 500,
            "weight": 2000,
            "tx": [{txs}]
        }}"#,
        hash = block_hash(number),
        merkle = coinbase_txid(number),
        time = GENESIS_TIME + number * 600,
        n_tx = txs.len(),
        txs = txs.join(",")
    );
    serde_json::from_str(&json).unwrap()
}


/// In-memory bitcoind. Returns every batch's responses in reverse order to
/// exercise response correlation on each round trip.
struct MockNode {
    blocks: Vec<Value>,
    calls: AtomicUsize,
    getblock_verbosities: Mutex<Vec<u64>>,
    fail_height: Option<BlockNumber>,
}


impl MockNode {
    fn new(block_count: u64) -> Self {
        Self {
            blocks: (0..block_count).map(block_json).collect(),
            calls: AtomicUsize::new(0),
            getblock_verbosities: Mutex::new(Vec::new()),
            fail_height: None,
        }
    }

    fn failing_at(block_count: u64, height: BlockNumber) -> Self {
        Self {
            fail_height: Some(height),
            ..Self::new(block_count)
        }
    }

    fn respond(&self, request: &RpcRequest) -> RpcResponse {
        let result = match request.method {
            "getblockhash" => {
                let number = request.params[0].as_u64().unwrap();
                match self.blocks.get(number as usize) {
                    Some(block) => Ok(block["hash"].clone()),
                    None => Err("Block height out of range"),
                }
            }
            "getblock" => {
                let hash = request.params[0].as_str().unwrap();
                let verbosity = request.params[1].as_u64().unwrap();
                self.getblock_verbosities.lock().push(verbosity);
                match self.find_block(hash) {
                    Some(block) if self.fail_height == Some(block["height"].as_u64().unwrap()) => {
                        Err("Block not available (pruned data)")
                    }
                    Some(block) if verbosity == 1 => {
                        let mut block = block.clone();
                        let txids: Vec<Value> = block["tx"]
                            .as_array()
                            .unwrap()
                            .iter()
                            .map(|tx| tx["txid"].clone())
                            .collect();
                        block["tx"] = Value::Array(txids);
                        Ok(block)
                    }
                    Some(block) => Ok(block.clone()),
                    None => Err("Block not found"),
                }
            }
            "getrawtransaction" => {
                let txid = request.params[0].as_str().unwrap();
                self.find_transaction(txid)
                    .ok_or("No such mempool or blockchain transaction")
            }
            "getblockcount" => Ok(Value::from(self.blocks.len() as u64 - 1)),
            "getblockheader" => {
                let hash = request.params[0].as_str().unwrap();
                match self.find_block(hash) {
                    Some(block) => Ok(serde_json::json!({"time": block["time"]})),
                    None => Err("Block not found"),
                }
            }
            method => panic!("unexpected rpc method {}", method),
        };

        match result {
            Ok(value) => RpcResponse {
                id: Some(request.id),
                result: Some(value),
                error: None,
            },
            Err(message) => RpcResponse {
                id: Some(request.id),
                result: None,
                error: Some(RpcErrorObject {
                    code: -5,
                    message: message.to_string(),
                }),
            },
        }
    }

    fn find_block(&self, hash: &str) -> Option<&Value> {
        self.blocks.iter().find(|block| block["hash"] == hash)
    }

    fn find_transaction(&self, txid: &str) -> Option<Value> {
        self.blocks.iter().find_map(|block| {
            block["tx"]
                .as_array()
                .unwrap()
                .iter()
                .find(|tx| tx["txid"] == txid)
                .cloned()
        })
    }
}


#[async_trait]
impl RpcTransport for MockNode {
    async fn make_request(
        &self,
        batch: &[RpcRequest]
    ) -> Result<Vec<RpcResponse>, RpcError>
    {
        self.calls.fetch_add(1, Ordering::Relaxed);
        let mut responses: Vec<RpcResponse> =
            batch.iter().map(|request| self.respond(request)).collect();
        responses.reverse();
        Ok(responses)
    }
}


#[derive(Debug, Clone, PartialEq, Eq)]
enum Item {
    Block(BlockNumber),
    Tx {
        block: BlockNumber,
        index: u32,
        input_value: Option<u64>,
        fee: Option<u64>,
    },
}


#[derive(Default)]
struct ExportLog {
    opens: usize,
    closes: usize,
    items: Vec<Item>,
}


struct RecordingExporter(Arc<Mutex<ExportLog>>);


impl ItemExporter for RecordingExporter {
    fn open(&mut self) -> anyhow::Result<()> {
        self.0.lock().opens += 1;
        Ok(())
    }

    fn export_item(&mut self, record: &Record<'_>) -> anyhow::Result<()> {
        let item = match record {
            Record::Block(block) => Item::Block(block.number),
            Record::Transaction(tx) => Item::Tx {
                block: tx.block_number,
                index: tx.index,
                input_value: tx.input_value,
                fee: tx.fee,
            },
        };
        self.0.lock().items.push(item);
        Ok(())
    }

    fn close(&mut self) -> anyhow::Result<()> {
        self.0.lock().closes += 1;
        Ok(())
    }
}


fn config(range: BlockRange, batch_size: u64, max_workers: usize) -> ExportConfig {
    ExportConfig {
        range,
        batch_size: NonZeroU64::new(batch_size).unwrap(),
        max_workers: NonZeroUsize::new(max_workers).unwrap(),
        export_blocks: true,
        export_transactions: true,
        enrich_inputs: false,
    }
}


async fn run_job(
    node: Arc<MockNode>,
    config: ExportConfig
) -> (anyhow::Result<()>, ExportLog)
{
    let log = Arc::new(Mutex::new(ExportLog::default()));
    let job = ExportJob::new(
        config,
        BtcClient::new(node),
        RecordingExporter(log.clone())
    ).unwrap();
    let result = job.run().await;
    let log = std::mem::take(&mut *log.lock());
    (result, log)
}


#[tokio::test]
async fn exports_every_block_in_order() {
    let node = Arc::new(MockNode::new(10));
    let range = BlockRange::new(0, 9).unwrap();
    let (result, log) = run_job(node, config(range, 4, 1)).await;
    result.unwrap();

    assert_eq!(log.opens, 1);
    assert_eq!(log.closes, 1);

    let mut expected = Vec::new();
    for number in 0..=9 {
        expected.push(Item::Block(number));
        expected.push(Item::Tx {
            block: number,
            index: 0,
            input_value: None,
            fee: None,
        });
        if number > 0 {
            expected.push(Item::Tx {
                block: number,
                index: 1,
                input_value: None,
                fee: None,
            });
        }
    }
    assert_eq!(log.items, expected);
}


#[tokio::test]
async fn concurrent_batches_keep_per_block_order() {
    let node = Arc::new(MockNode::new(30));
    let range = BlockRange::new(0, 29).unwrap();
    let (result, log) = run_job(node, config(range, 3, 4)).await;
    result.unwrap();

    let blocks: Vec<BlockNumber> = log.items
        .iter()
        .filter_map(|item| match item {
            Item::Block(number) => Some(*number),
            _ => None,
        })
        .collect();
    assert_eq!(blocks.len(), 30);
    let mut sorted = blocks.clone();
    sorted.sort();
    assert_eq!(sorted, (0..30).collect::<Vec<_>>());

    // a block record is followed directly by that block's transactions,
    // whatever order the batches finished in
    let mut current_block = None;
    let mut next_index = 0;
    for item in &log.items {
        match item {
            Item::Block(number) => {
                current_block = Some(*number);
                next_index = 0;
            }
            Item::Tx { block, index, .. } => {
                assert_eq!(Some(*block), current_block);
                assert_eq!(*index, next_index);
                next_index += 1;
            }
        }
    }
}


#[tokio::test]
async fn emitted_block_count_matches_range_len() {
    let node = Arc::new(MockNode::new(30));
    let range = BlockRange::new(7, 23).unwrap();
    let (result, log) = run_job(node, config(range, 5, 3)).await;
    result.unwrap();

    let blocks = log.items
        .iter()
        .filter(|item| matches!(item, Item::Block(_)))
        .count() as u64;
    assert_eq!(blocks, range.len());
}


#[tokio::test]
async fn empty_export_selection_is_rejected_before_any_rpc() {
    let node = Arc::new(MockNode::new(5));
    let mut config = config(BlockRange::new(0, 4).unwrap(), 2, 1);
    config.export_blocks = false;
    config.export_transactions = false;

    let err = ExportJob::new(
        config,
        BtcClient::new(node.clone()),
        RecordingExporter(Default::default())
    ).err().unwrap();

    assert!(matches!(err, ConfigError::NothingToExport));
    assert_eq!(node.calls.load(Ordering::Relaxed), 0);
}


#[tokio::test]
async fn enrichment_without_transactions_is_rejected() {
    let node = Arc::new(MockNode::new(5));
    let mut config = config(BlockRange::new(0, 4).unwrap(), 2, 1);
    config.export_transactions = false;
    config.enrich_inputs = true;

    let err = ExportJob::new(
        config,
        BtcClient::new(node),
        RecordingExporter(Default::default())
    ).err().unwrap();

    assert!(matches!(err, ConfigError::EnrichmentWithoutTransactions));
}


#[test]
fn inverted_range_is_rejected() {
    assert!(BlockRange::new(10, 5).is_err());
}


#[tokio::test]
async fn skipping_transactions_fetches_plain_blocks() {
    let node = Arc::new(MockNode::new(8));
    let range = BlockRange::new(0, 7).unwrap();
    let mut config = config(range, 4, 2);
    config.export_transactions = false;

    let (result, log) = run_job(node.clone(), config).await;
    result.unwrap();

    assert!(log.items.iter().all(|item| matches!(item, Item::Block(_))));
    assert_eq!(log.items.len() as u64, range.len());
    assert!(node.getblock_verbosities.lock().iter().all(|v| *v == 1));
}


#[tokio::test]
async fn failed_block_fetch_aborts_the_run_but_closes_the_sink() {
    let node = Arc::new(MockNode::failing_at(10, 5));
    let range = BlockRange::new(0, 9).unwrap();
    let (result, log) = run_job(node, config(range, 2, 1)).await;

    assert!(result.is_err());
    assert_eq!(log.opens, 1);
    assert_eq!(log.closes, 1);
    // batches past the failed one were never exported
    assert!(!log.items.contains(&Item::Block(9)));
}


#[tokio::test]
async fn enrichment_resolves_input_values_and_fees() {
    let node = Arc::new(MockNode::new(6));
    let range = BlockRange::new(1, 5).unwrap();
    let mut config = config(range, 3, 2);
    config.enrich_inputs = true;

    let (result, log) = run_job(node, config).await;
    result.unwrap();

    for item in &log.items {
        if let Item::Tx { index: 1, input_value, fee, .. } = item {
            assert_eq!(*input_value, Some(COINBASE_VALUE));
            assert_eq!(*fee, Some(COINBASE_VALUE - SPEND_VALUE));
        }
    }
    assert!(log.items.iter().any(|item| matches!(item, Item::Tx { index: 1, .. })));
}


#[tokio::test]
async fn json_lines_exporter_writes_tagged_records() -> anyhow::Result<()> {
    let node = Arc::new(MockNode::new(4));
    let range = BlockRange::new(0, 3).unwrap();

    let dir = tempfile::tempdir()?;
    let path = dir.path().join("export.jsonl");

    let job = ExportJob::new(
        config(range, 2, 1),
        BtcClient::new(node),
        JsonLinesExporter::file(&path)
    )?;
    job.run().await?;

    let content = std::fs::read_to_string(&path)?;
    let records: Vec<Value> = content
        .lines()
        .map(serde_json::from_str)
        .collect::<Result<_, _>>()?;

    let blocks = records.iter().filter(|r| r["type"] == "block").count();
    let transactions = records.iter().filter(|r| r["type"] == "transaction").count();
    assert_eq!(blocks, 4);
    assert_eq!(transactions, 4 + 3);

    let genesis = records
        .iter()
        .find(|r| r["type"] == "block" && r["number"] == 0)
        .unwrap();
    assert_eq!(genesis["hash"], block_hash(0));
    assert!(genesis.get("transactions").is_none());

    Ok(())
}
