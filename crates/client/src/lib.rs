mod chain;
mod correlate;
mod error;
mod http;
mod transport;
mod wire;

pub use chain::BtcClient;
pub use correlate::CorrelatedBatch;
pub use error::RpcError;
pub use http::{default_http_client, HttpTransport};
pub use transport::RpcTransport;
pub use wire::{RpcErrorObject, RpcRequest, RpcResponse};
