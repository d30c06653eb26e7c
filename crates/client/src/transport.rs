use crate::error::RpcError;
use crate::wire::{RpcRequest, RpcResponse};


/// A JSON-RPC batch transport.
///
/// Takes an ordered batch of requests and returns the node's responses in
/// whatever order they arrived. Correlation back to request order is the
/// caller's job (see [`crate::CorrelatedBatch`]). Retry and timeout policy
/// live behind this boundary, not in the pipeline.
#[async_trait::async_trait]
pub trait RpcTransport: Send + Sync {
    async fn make_request(
        &self,
        batch: &[RpcRequest]
    ) -> Result<Vec<RpcResponse>, RpcError>;
}
