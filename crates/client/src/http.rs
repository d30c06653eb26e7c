use crate::error::RpcError;
use crate::transport::RpcTransport;
use crate::wire::{RpcRequest, RpcResponse};
use std::time::Duration;
use url::Url;


pub fn default_http_client() -> reqwest::Client {
    reqwest::Client::builder()
        .connect_timeout(Duration::from_secs(20))
        .read_timeout(Duration::from_secs(60))
        .gzip(true)
        .build()
        .unwrap()
}


pub struct HttpTransport {
    http: reqwest::Client,
    url: Url,
}


impl HttpTransport {
    pub fn new(url: Url) -> Self {
        Self::with_client(default_http_client(), url)
    }

    pub fn with_client(http: reqwest::Client, url: Url) -> Self {
        Self { http, url }
    }
}


#[async_trait::async_trait]
impl RpcTransport for HttpTransport {
    async fn make_request(
        &self,
        batch: &[RpcRequest]
    ) -> Result<Vec<RpcResponse>, RpcError>
    {
        if batch.is_empty() {
            return Ok(Vec::new())
        }

        tracing::debug!(calls = batch.len(), "sending rpc batch");

        let responses = self.http
            .post(self.url.clone())
            .json(batch)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        Ok(responses)
    }
}
