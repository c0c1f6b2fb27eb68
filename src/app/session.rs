use std::path::PathBuf;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::app::error::{Result, WarblerError};
use crate::auth::{RequestSigner, TokenExchange, TokenPair};
use crate::cache::ImageCache;
use crate::config::Config;
use crate::domain::{CursorTracker, Status};
use crate::fetcher::{ApiRequest, ApiResponse, HttpTransport, Transport};
use crate::normalizer::{Normalizer, WireFormat};
use crate::notify::Notifier;
use crate::stream::{StreamOutcome, StreamSession};
use crate::text::{prepare_post, shortener_for, Shortener};

/// Everything one account needs to talk to the service: keys, transport,
/// parsers, cursors and the avatar cache.
pub struct Session {
    config: Config,
    signer: RequestSigner,
    transport: Arc<dyn Transport>,
    normalizer: Normalizer,
    images: ImageCache,
    shortener: Option<Arc<dyn Shortener>>,
    timeline_cursor: CursorTracker,
    search_cursor: CursorTracker,
}

impl Session {
    pub fn new(config: Config) -> Result<Self> {
        let transport: Arc<dyn Transport> = Arc::new(HttpTransport::new(&config.timeouts)?);
        Self::with_transport(config, transport)
    }

    pub fn with_transport(config: Config, transport: Arc<dyn Transport>) -> Result<Self> {
        let images_dir = config
            .images_dir()
            .map_err(|e| WarblerError::Config(e.to_string()))?;
        Ok(Self::with_parts(config, transport, images_dir))
    }

    pub fn with_parts(config: Config, transport: Arc<dyn Transport>, images_dir: PathBuf) -> Self {
        let signer = RequestSigner::new(config.key_material());
        let images = ImageCache::new(images_dir, transport.clone());
        let shortener = shortener_for(
            config.shortener,
            transport.clone(),
            &config.endpoints.shortener_url,
        );

        Self {
            config,
            signer,
            transport,
            normalizer: Normalizer::new(),
            images,
            shortener,
            timeline_cursor: CursorTracker::new(),
            search_cursor: CursorTracker::new(),
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn images(&self) -> &ImageCache {
        &self.images
    }

    pub fn timeline_cursor(&self) -> &CursorTracker {
        &self.timeline_cursor
    }

    pub fn search_cursor(&self) -> &CursorTracker {
        &self.search_cursor
    }

    pub fn has_token(&self) -> bool {
        self.signer.keys().token.is_some()
    }

    /// Fetch the configured timeline, newest first, and advance the cursor.
    pub async fn fetch_timeline(&mut self) -> Result<Vec<Status>> {
        let url = self
            .config
            .endpoints
            .timeline_url(self.config.timeline, self.config.api_format);
        let mut request = ApiRequest::get(url);
        if let Some(since_id) = self.timeline_cursor.since_id() {
            request = request.param("since_id", since_id.to_string());
        }
        self.signer.sign(&mut request)?;

        let response = self.transport.execute(&request).await?;
        let body = self.check(response)?;
        let batch = self
            .normalizer
            .normalize(WireFormat::from(self.config.api_format), &body)?;

        self.timeline_cursor.update(&batch);
        debug!(
            count = batch.len(),
            since_id = ?self.timeline_cursor.since_id(),
            "timeline fetched"
        );
        Ok(batch)
    }

    /// Run a search query against the Atom search feed. Search keeps its own
    /// cursor and is not signed.
    pub async fn search(&mut self, query: &str) -> Result<Vec<Status>> {
        let mut request = ApiRequest::get(self.config.endpoints.search_url.as_str()).param("q", query);
        if let Some(since_id) = self.search_cursor.since_id() {
            request = request.param("since_id", since_id.to_string());
        }
        if let Some(lang) = &self.config.lang {
            request = request.param("lang", lang.as_str());
        }

        let response = self.transport.execute(&request).await?;
        let body = self.check(response)?;
        let batch = self.normalizer.normalize(WireFormat::SearchFeed, &body)?;

        self.search_cursor.update(&batch);
        debug!(query, count = batch.len(), "search fetched");
        Ok(batch)
    }

    /// Post a status. Links are shortened when a backend is configured and the
    /// length is checked before anything is sent. Returns the text as sent.
    pub async fn update_status(&self, text: &str) -> Result<String> {
        let prepared = prepare_post(text, self.shortener.as_deref()).await?;

        let mut request = ApiRequest::post(self.config.endpoints.update_url(self.config.api_format))
            .param("status", prepared.as_str())
            .param("source", self.config.source.as_str());
        self.signer.sign(&mut request)?;

        let response = self.transport.execute(&request).await?;
        self.check(response)?;
        info!("status posted");
        Ok(prepared)
    }

    /// Trade a username and password for an access token and start using it.
    pub async fn exchange_token(&mut self, username: &str, password: &str) -> Result<TokenPair> {
        let exchange = TokenExchange::new(&self.signer, &self.config.endpoints.access_token_url);
        let token = exchange
            .exchange(self.transport.as_ref(), username, password)
            .await?;

        self.signer = RequestSigner::new(self.signer.keys().with_token(token.clone()));
        Ok(token)
    }

    pub async fn avatar_for(&self, status: &Status) -> Option<PathBuf> {
        self.images.avatar_for(status).await
    }

    /// Open the user stream and deliver statuses to `notifier` until the
    /// connection ends or `cancel` fires.
    pub async fn stream(
        &self,
        notifier: &dyn Notifier,
        cancel: &CancellationToken,
    ) -> Result<StreamOutcome> {
        let mut request = ApiRequest::get(self.config.endpoints.stream_url.as_str());
        self.signer.sign(&mut request)?;

        let mut session = StreamSession::new(self.transport.as_ref(), self.config.timeouts.stream_read())
            .with_images(&self.images);
        session.run(&request, notifier, cancel).await
    }

    fn check(&self, response: ApiResponse) -> Result<Vec<u8>> {
        if response.is_success() {
            return Ok(response.body);
        }

        warn!(status = response.status, "request rejected");
        let body = self.config.verbose().then(|| response.text());
        Err(WarblerError::Status {
            code: response.status,
            body,
        })
    }
}
