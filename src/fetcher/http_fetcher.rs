use std::time::Duration;

use async_trait::async_trait;
use futures::StreamExt;
use reqwest::header::AUTHORIZATION;
use reqwest::{Client, Method, RequestBuilder};

use crate::app::{Result, WarblerError};
use crate::config::TimeoutConfig;
use crate::fetcher::{ApiRequest, ApiResponse, ChunkStream, Transport};

/// reqwest-backed transport. Certificate and host verification stay on;
/// there is no switch to turn them off.
pub struct HttpTransport {
    client: Client,
    request_timeout: Duration,
}

impl HttpTransport {
    pub fn new(timeouts: &TimeoutConfig) -> Result<Self> {
        // No client-wide timeout: it would also cut long-lived streams.
        let client = Client::builder()
            .connect_timeout(timeouts.connect())
            .gzip(true)
            .brotli(true)
            .user_agent(concat!("warbler/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            client,
            request_timeout: timeouts.request(),
        })
    }

    fn build(&self, request: &ApiRequest) -> RequestBuilder {
        let builder = if request.method == Method::POST {
            self.client.post(&request.url).form(&request.params)
        } else {
            self.client
                .request(request.method.clone(), &request.url)
                .query(&request.params)
        };

        match &request.authorization {
            Some(value) => builder.header(AUTHORIZATION, value),
            None => builder,
        }
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn execute(&self, request: &ApiRequest) -> Result<ApiResponse> {
        tracing::debug!(method = %request.method, url = %request.url, "request");

        let response = self
            .build(request)
            .timeout(self.request_timeout)
            .send()
            .await?;

        let status = response.status().as_u16();
        let body = response.bytes().await?.to_vec();
        tracing::debug!(status, bytes = body.len(), "response");

        Ok(ApiResponse { status, body })
    }

    async fn open_stream(&self, request: &ApiRequest) -> Result<ChunkStream> {
        tracing::debug!(url = %request.url, "opening stream");

        let response = self.build(request).send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.ok();
            return Err(WarblerError::Status {
                code: status.as_u16(),
                body,
            });
        }

        let chunks = response
            .bytes_stream()
            .map(|chunk| chunk.map(|bytes| bytes.to_vec()).map_err(WarblerError::from));

        Ok(chunks.boxed())
    }
}
