//! Avatar cache: one file per avatar under a fixed directory, fetched on the
//! first miss and shrunk to a thumbnail.
//!
//! Entries are never invalidated. Concurrent `ensure` calls for the same key
//! are serialized so only one of them fetches.

mod thumbnail;

pub use thumbnail::{resize_to_bound, THUMBNAIL_BOUND};

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use tracing::{debug, warn};

use crate::app::{Result, WarblerError};
use crate::domain::Status;
use crate::fetcher::{ApiRequest, Transport};

/// Cache filename for an avatar: the last two path segments joined by `_`.
/// Host and earlier segments do not take part.
pub fn cache_key(avatar_url: &str) -> Result<String> {
    let without_query = avatar_url
        .split(['?', '#'])
        .next()
        .unwrap_or_default();
    let path = without_query
        .split_once("://")
        .map(|(_, rest)| rest.split_once('/').map(|(_, path)| path).unwrap_or(""))
        .unwrap_or(without_query);

    let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
    let tail = &segments[segments.len().saturating_sub(2)..];

    if tail.is_empty() || tail.iter().any(|s| *s == "." || *s == ".." || s.contains('\\')) {
        return Err(WarblerError::InvalidAvatarUrl(avatar_url.to_string()));
    }

    Ok(tail.join("_"))
}

/// Percent-encode only the final path segment (the filename).
pub fn escape_filename(avatar_url: &str) -> String {
    match avatar_url.rsplit_once('/') {
        Some((head, file)) => format!("{}/{}", head, urlencoding::encode(file)),
        None => urlencoding::encode(avatar_url).into_owned(),
    }
}

fn staged_extension(path: &Path) -> String {
    match path.extension() {
        Some(ext) => format!("{}.part", ext.to_string_lossy()),
        None => "part".to_string(),
    }
}

pub struct ImageCache {
    dir: PathBuf,
    transport: Arc<dyn Transport>,
    bound: u32,
    in_flight: Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>,
}

impl ImageCache {
    pub fn new(dir: impl Into<PathBuf>, transport: Arc<dyn Transport>) -> Self {
        Self::with_bound(dir, transport, THUMBNAIL_BOUND)
    }

    pub fn with_bound(dir: impl Into<PathBuf>, transport: Arc<dyn Transport>, bound: u32) -> Self {
        Self {
            dir: dir.into(),
            transport,
            bound,
            in_flight: Mutex::new(HashMap::new()),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_for(&self, avatar_url: &str) -> Result<PathBuf> {
        Ok(self.dir.join(cache_key(avatar_url)?))
    }

    /// Return the local thumbnail for `avatar_url`, fetching and resizing it
    /// on a miss. A hit never touches the network.
    pub async fn ensure(&self, avatar_url: &str) -> Result<PathBuf> {
        let key = cache_key(avatar_url)?;
        let path = self.dir.join(&key);
        if tokio::fs::try_exists(&path).await? {
            return Ok(path);
        }

        let lock = self.key_lock(&key)?;
        let result = {
            let _guard = lock.lock().await;
            // Another caller may have filled the entry while we waited.
            if tokio::fs::try_exists(&path).await? {
                Ok(path)
            } else {
                self.fill(avatar_url, &path).await.map(|()| path)
            }
        };

        self.release_key(&key, lock);
        result
    }

    /// Ensure the avatar for a status, logging instead of failing. A missing
    /// thumbnail must not stop the caller from showing the status.
    pub async fn avatar_for(&self, status: &Status) -> Option<PathBuf> {
        if status.author.avatar_url.is_empty() {
            return None;
        }
        match self.ensure(&status.author.avatar_url).await {
            Ok(path) => Some(path),
            Err(e) => {
                warn!(url = %status.author.avatar_url, error = %e, "avatar unavailable");
                None
            }
        }
    }

    async fn fill(&self, avatar_url: &str, path: &Path) -> Result<()> {
        tokio::fs::create_dir_all(&self.dir).await?;

        let url = escape_filename(avatar_url);
        debug!(url = %url, "fetching avatar");
        let response = self.transport.execute(&ApiRequest::get(&url)).await?;
        if !response.is_success() {
            return Err(WarblerError::Status {
                code: response.status,
                body: None,
            });
        }

        // Stage next to the final path; only a finished thumbnail is renamed in.
        let staged = path.with_extension(staged_extension(path));
        tokio::fs::write(&staged, &response.body).await?;

        match self.shrink(&staged).await {
            Ok(()) => {
                tokio::fs::rename(&staged, path).await?;
                Ok(())
            }
            Err(e) => {
                if let Err(remove) = tokio::fs::remove_file(&staged).await {
                    warn!(path = %staged.display(), error = %remove, "could not remove staged avatar");
                }
                Err(e)
            }
        }
    }

    async fn shrink(&self, staged: &Path) -> Result<()> {
        let owned = staged.to_path_buf();
        let bound = self.bound;
        let resized = tokio::task::spawn_blocking(move || resize_to_bound(&owned, bound))
            .await
            .map_err(|e| WarblerError::Other(format!("resize task failed: {}", e)))??;
        if resized {
            debug!(path = %staged.display(), bound, "thumbnail resized");
        }
        Ok(())
    }

    fn key_lock(&self, key: &str) -> Result<Arc<tokio::sync::Mutex<()>>> {
        let mut in_flight = self
            .in_flight
            .lock()
            .map_err(|e| WarblerError::Other(format!("image cache lock poisoned: {}", e)))?;
        Ok(in_flight.entry(key.to_string()).or_default().clone())
    }

    fn release_key(&self, key: &str, lock: Arc<tokio::sync::Mutex<()>>) {
        drop(lock);
        if let Ok(mut in_flight) = self.in_flight.lock() {
            if in_flight.get(key).is_some_and(|l| Arc::strong_count(l) == 1) {
                in_flight.remove(key);
            }
        }
    }
}
