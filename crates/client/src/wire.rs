//! JSON-RPC wire types and the node calls this tool makes.

use betl_primitives::BlockNumber;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};


#[derive(Debug, Clone, Serialize)]
pub struct RpcRequest {
    pub jsonrpc: &'static str,
    pub method: &'static str,
    pub params: Vec<Value>,
    pub id: u64,
}


impl RpcRequest {
    fn new(method: &'static str, params: Vec<Value>) -> Self {
        Self {
            jsonrpc: "2.0",
            method,
            params,
            id: 0,
        }
    }

    pub fn with_id(mut self, id: u64) -> Self {
        self.id = id;
        self
    }

    pub fn get_block_hash(height: BlockNumber) -> Self {
        Self::new("getblockhash", vec![json!(height)])
    }

    /// Verbosity 2 includes full transaction objects, verbosity 1 only ids.
    pub fn get_block(hash: &str, with_transactions: bool) -> Self {
        let verbosity = if with_transactions { 2 } else { 1 };
        Self::new("getblock", vec![json!(hash), json!(verbosity)])
    }

    pub fn get_block_header(hash: &str) -> Self {
        Self::new("getblockheader", vec![json!(hash)])
    }

    pub fn get_raw_transaction(txid: &str) -> Self {
        Self::new("getrawtransaction", vec![json!(txid), json!(true)])
    }

    pub fn get_block_count() -> Self {
        Self::new("getblockcount", vec![])
    }
}


#[derive(Debug, Clone, Deserialize)]
pub struct RpcResponse {
    /// Echo of the request id. Nodes report `null` for requests they could
    /// not parse.
    #[serde(default)]
    pub id: Option<u64>,
    #[serde(default)]
    pub result: Option<Value>,
    #[serde(default)]
    pub error: Option<RpcErrorObject>,
}


#[derive(Debug, Clone, Deserialize, thiserror::Error)]
#[error("node error {code}: {message}")]
pub struct RpcErrorObject {
    pub code: i64,
    pub message: String,
}
