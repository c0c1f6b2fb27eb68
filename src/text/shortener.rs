use std::sync::Arc;

use async_trait::async_trait;

use crate::app::{Result, WarblerError};
use crate::config::ShortenerKind;
use crate::fetcher::{ApiRequest, Transport};

/// Backend that turns one long URL into a short one.
#[async_trait]
pub trait Shortener: Send + Sync {
    async fn shorten_url(&self, url: &str) -> Result<String>;
}

/// is.gd style backend: `GET <endpoint>?format=simple&url=<url>` answers with
/// the short URL as the plain-text body.
pub struct IsGdShortener {
    transport: Arc<dyn Transport>,
    endpoint: String,
}

impl IsGdShortener {
    pub fn new(transport: Arc<dyn Transport>, endpoint: impl Into<String>) -> Self {
        Self {
            transport,
            endpoint: endpoint.into(),
        }
    }
}

#[async_trait]
impl Shortener for IsGdShortener {
    async fn shorten_url(&self, url: &str) -> Result<String> {
        let request = ApiRequest::get(&self.endpoint)
            .param("format", "simple")
            .param("url", url);

        let response = self
            .transport
            .execute(&request)
            .await
            .map_err(|e| WarblerError::Shorten(e.to_string()))?;

        if !response.is_success() {
            return Err(WarblerError::Shorten(format!(
                "{} answered HTTP {}",
                self.endpoint, response.status
            )));
        }

        let short = response.text().trim().to_string();
        if !short.starts_with("http") {
            return Err(WarblerError::Shorten(format!(
                "unexpected reply for {}: {}",
                url, short
            )));
        }

        Ok(short)
    }
}

pub fn shortener_for(
    kind: ShortenerKind,
    transport: Arc<dyn Transport>,
    endpoint: &str,
) -> Option<Arc<dyn Shortener>> {
    match kind {
        ShortenerKind::None => None,
        ShortenerKind::IsGd => Some(Arc::new(IsGdShortener::new(transport, endpoint))),
    }
}
