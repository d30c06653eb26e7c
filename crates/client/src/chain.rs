use crate::correlate::CorrelatedBatch;
use crate::error::RpcError;
use crate::http::HttpTransport;
use crate::transport::RpcTransport;
use crate::wire::RpcRequest;
use betl_primitives::{BlockNumber, Timestamp};
use serde_json::Value;
use std::sync::Arc;
use url::Url;


/// Typed view of the node operations the exporter needs. Every method is one
/// correlated batch round trip; results come back in argument order.
#[derive(Clone)]
pub struct BtcClient {
    transport: Arc<dyn RpcTransport>,
}


impl BtcClient {
    pub fn new(transport: Arc<dyn RpcTransport>) -> Self {
        Self { transport }
    }

    pub fn http(url: Url) -> Self {
        Self::new(Arc::new(HttpTransport::new(url)))
    }

    pub async fn block_hashes(
        &self,
        numbers: &[BlockNumber]
    ) -> Result<Vec<String>, RpcError>
    {
        let batch = CorrelatedBatch::new(
            numbers.iter().copied().map(RpcRequest::get_block_hash)
        );
        let results = self.fetch(&batch).await?;
        results
            .into_iter()
            .enumerate()
            .map(|(index, value)| decode(index, "getblockhash", value))
            .collect()
    }

    /// Raw `getblock` payloads, one per hash. Transaction detail is included
    /// only when `with_transactions` is set.
    pub async fn blocks(
        &self,
        hashes: &[String],
        with_transactions: bool
    ) -> Result<Vec<Value>, RpcError>
    {
        let batch = CorrelatedBatch::new(
            hashes.iter().map(|hash| RpcRequest::get_block(hash, with_transactions))
        );
        self.fetch(&batch).await
    }

    /// Raw verbose `getrawtransaction` payloads, one per txid.
    pub async fn transactions(&self, txids: &[String]) -> Result<Vec<Value>, RpcError> {
        let batch = CorrelatedBatch::new(
            txids.iter().map(|txid| RpcRequest::get_raw_transaction(txid))
        );
        self.fetch(&batch).await
    }

    pub async fn chain_height(&self) -> Result<BlockNumber, RpcError> {
        let value = self.fetch_one(RpcRequest::get_block_count()).await?;
        decode(0, "getblockcount", value)
    }

    pub async fn block_timestamp(
        &self,
        number: BlockNumber
    ) -> Result<Timestamp, RpcError>
    {
        #[derive(serde::Deserialize)]
        struct Header {
            time: Timestamp,
        }

        let value = self.fetch_one(RpcRequest::get_block_hash(number)).await?;
        let hash: String = decode(0, "getblockhash", value)?;

        let value = self.fetch_one(RpcRequest::get_block_header(&hash)).await?;
        let header: Header = decode(0, "getblockheader", value)?;
        Ok(header.time)
    }

    async fn fetch(&self, batch: &CorrelatedBatch) -> Result<Vec<Value>, RpcError> {
        let responses = self.transport.make_request(batch.requests()).await?;
        batch.results(responses)
    }

    async fn fetch_one(&self, request: RpcRequest) -> Result<Value, RpcError> {
        let batch = CorrelatedBatch::new([request]);
        let mut results = self.fetch(&batch).await?;
        Ok(results.remove(0))
    }
}


fn decode<T: serde::de::DeserializeOwned>(
    index: usize,
    method: &'static str,
    value: Value
) -> Result<T, RpcError>
{
    serde_json::from_value(value).map_err(|source| RpcError::Decode {
        index,
        method,
        source,
    })
}
