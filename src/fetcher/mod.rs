pub mod http_fetcher;

pub use http_fetcher::HttpTransport;

use async_trait::async_trait;
use futures::stream::BoxStream;
use reqwest::Method;

use crate::app::Result;

/// Chunks of a long-lived response body, in arrival order.
pub type ChunkStream = BoxStream<'static, Result<Vec<u8>>>;

/// One outgoing request. GET parameters travel in the query string, POST
/// parameters as a form body.
#[derive(Debug, Clone)]
pub struct ApiRequest {
    pub method: Method,
    pub url: String,
    pub params: Vec<(String, String)>,
    pub authorization: Option<String>,
}

impl ApiRequest {
    pub fn new(method: Method, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            params: Vec::new(),
            authorization: None,
        }
    }

    pub fn get(url: impl Into<String>) -> Self {
        Self::new(Method::GET, url)
    }

    pub fn post(url: impl Into<String>) -> Self {
        Self::new(Method::POST, url)
    }

    pub fn param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.push((key.into(), value.into()));
        self
    }
}

#[derive(Debug, Clone)]
pub struct ApiResponse {
    pub status: u16,
    pub body: Vec<u8>,
}

impl ApiResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

#[async_trait]
pub trait Transport: Send + Sync {
    /// Buffered mode: the whole body is read before returning. Non-2xx
    /// statuses come back as a normal response for the caller to judge.
    async fn execute(&self, request: &ApiRequest) -> Result<ApiResponse>;

    /// Streaming mode: returns once the response head has arrived; the body
    /// is consumed chunk by chunk. Non-2xx statuses are an error here since
    /// there is no stream to hand out.
    async fn open_stream(&self, request: &ApiRequest) -> Result<ChunkStream>;
}


#[cfg(test)]
pub(crate) mod testing {
    use std::collections::VecDeque;
    use std::sync::Mutex;

    use futures::StreamExt;

    use super::*;

    /// Scripted transport: hands out queued responses and records requests.
    #[derive(Default)]
    pub(crate) struct MockTransport {
        responses: Mutex<VecDeque<Result<ApiResponse>>>,
        streams: Mutex<VecDeque<(Vec<Vec<u8>>, bool)>>,
        hang_on_open: std::sync::atomic::AtomicBool,
        pub(crate) requests: Mutex<Vec<ApiRequest>>,
    }

    impl MockTransport {
        pub(crate) fn new() -> Self {
            Self::default()
        }

        pub(crate) fn respond(&self, status: u16, body: impl Into<Vec<u8>>) {
            self.responses.lock().unwrap().push_back(Ok(ApiResponse {
                status,
                body: body.into(),
            }));
        }

        pub(crate) fn fail(&self, error: crate::app::WarblerError) {
            self.responses.lock().unwrap().push_back(Err(error));
        }

        pub(crate) fn stream_chunks<I, C>(&self, chunks: I)
        where
            I: IntoIterator<Item = C>,
            C: AsRef<[u8]>,
        {
            self.streams
                .lock()
                .unwrap()
                .push_back((chunks.into_iter().map(|c| c.as_ref().to_vec()).collect(), false));
        }

        /// Deliver `chunks`, then keep the connection open without sending more.
        pub(crate) fn stream_then_stall<I, C>(&self, chunks: I)
        where
            I: IntoIterator<Item = C>,
            C: AsRef<[u8]>,
        {
            self.streams
                .lock()
                .unwrap()
                .push_back((chunks.into_iter().map(|c| c.as_ref().to_vec()).collect(), true));
        }

        /// Never answer `open_stream`, like a server that accepts the
        /// connection but sends no response head.
        pub(crate) fn hang_on_open(&self) {
            self.hang_on_open
                .store(true, std::sync::atomic::Ordering::SeqCst);
        }

        pub(crate) fn recorded(&self) -> Vec<ApiRequest> {
            self.requests.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl Transport for MockTransport {
        async fn execute(&self, request: &ApiRequest) -> Result<ApiResponse> {
            self.requests.lock().unwrap().push(request.clone());
            self.responses
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Ok(ApiResponse { status: 404, body: Vec::new() }))
        }

        async fn open_stream(&self, request: &ApiRequest) -> Result<ChunkStream> {
            self.requests.lock().unwrap().push(request.clone());
            if self.hang_on_open.load(std::sync::atomic::Ordering::SeqCst) {
                return std::future::pending().await;
            }
            let (chunks, stall) = self.streams.lock().unwrap().pop_front().unwrap_or_default();
            let chunks = futures::stream::iter(chunks.into_iter().map(Ok));
            if stall {
                Ok(chunks.chain(futures::stream::pending()).boxed())
            } else {
                Ok(chunks.boxed())
            }
        }
    }
}
