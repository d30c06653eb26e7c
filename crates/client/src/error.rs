use crate::wire::RpcErrorObject;


#[derive(Debug, thiserror::Error)]
pub enum RpcError {
    #[error("http request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("request {index} ({method}): {source}")]
    Node {
        index: usize,
        method: &'static str,
        #[source]
        source: RpcErrorObject,
    },

    #[error("request {index} ({method}) got no response")]
    MissingResponse { index: usize, method: &'static str },

    #[error("request {index} ({method}) returned a null result")]
    NullResult { index: usize, method: &'static str },

    #[error("request {index} ({method}) returned an unexpected payload: {source}")]
    Decode {
        index: usize,
        method: &'static str,
        #[source]
        source: serde_json::Error,
    },

    #[error("batch response carries unknown request id {id}")]
    UnexpectedId { id: u64 },

    #[error("batch response carries request id {id} more than once")]
    DuplicateId { id: u64 },
}
