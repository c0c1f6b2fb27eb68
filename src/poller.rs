//! Periodic timeline polling.
//!
//! Each tick fetches everything newer than the cursor and shows it oldest
//! first, pausing between statuses so a burst does not flood the display.

use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::app::{Result, Session};
use crate::config::{Backoff, Config};
use crate::domain::Status;
use crate::notify::Notifier;

#[derive(Debug, Clone)]
pub struct Poller {
    fetch_interval: Duration,
    display_interval: Duration,
    backoff: Backoff,
    skip_initial_batch: bool,
}

impl Poller {
    pub fn new(config: &Config) -> Self {
        Self {
            fetch_interval: config.fetch_interval(),
            display_interval: config.display_interval(),
            backoff: config.backoff,
            skip_initial_batch: config.skip_initial_batch,
        }
    }

    pub fn with_fetch_interval(mut self, interval: Duration) -> Self {
        self.fetch_interval = interval;
        self
    }

    /// Poll until `cancel` fires. Failed ticks are logged and retried after
    /// the backoff delay; the cursor only moves on success.
    pub async fn run(&self, session: &mut Session, notifier: &dyn Notifier, cancel: &CancellationToken) {
        info!(
            interval = %format_interval(self.fetch_interval.as_secs()),
            "polling started"
        );

        let mut seeded = !self.skip_initial_batch;
        let mut failures: u32 = 0;

        while !cancel.is_cancelled() {
            let outcome = if seeded {
                self.poll_once(session, notifier, cancel).await
            } else {
                self.seed(session).await
            };

            let delay = match outcome {
                Ok(_) => {
                    seeded = true;
                    failures = 0;
                    self.fetch_interval
                }
                Err(e) if e.is_transient() => {
                    failures = failures.saturating_add(1);
                    let delay = self.backoff.delay(self.fetch_interval, failures);
                    warn!(error = %e, failures, retry_in = ?delay, "poll failed");
                    delay
                }
                Err(e) => {
                    error!(error = %e, "poll failed");
                    self.fetch_interval
                }
            };

            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = tokio::time::sleep(delay) => {}
            }
        }

        info!("polling stopped");
    }

    /// One fetch-and-display cycle. Returns how many statuses were fetched.
    pub async fn poll_once(
        &self,
        session: &mut Session,
        notifier: &dyn Notifier,
        cancel: &CancellationToken,
    ) -> Result<usize> {
        let batch = session.fetch_timeline().await?;
        if !batch.is_empty() {
            info!(count = batch.len(), "new statuses");
        }
        self.display(session, &batch, notifier, cancel).await;
        Ok(batch.len())
    }

    /// First fetch only positions the cursor so old history is not replayed.
    async fn seed(&self, session: &mut Session) -> Result<usize> {
        let batch = session.fetch_timeline().await?;
        info!(
            skipped = batch.len(),
            since_id = ?session.timeline_cursor().since_id(),
            "cursor seeded"
        );
        Ok(batch.len())
    }

    async fn display(
        &self,
        session: &Session,
        batch: &[Status],
        notifier: &dyn Notifier,
        cancel: &CancellationToken,
    ) {
        for (shown, status) in batch.iter().rev().enumerate() {
            if cancel.is_cancelled() {
                return;
            }
            if shown > 0 && !self.display_interval.is_zero() {
                tokio::select! {
                    _ = cancel.cancelled() => return,
                    _ = tokio::time::sleep(self.display_interval) => {}
                }
            }

            let avatar = session.avatar_for(status).await;
            notifier.popup(status, avatar.as_deref());
        }
    }
}

/// Parse an interval like "90s", "5m", "1h", "1d" or bare seconds.
pub fn parse_interval(s: &str) -> std::result::Result<u64, String> {
    let s = s.trim().to_lowercase();

    if let Some(hours) = s.strip_suffix('h') {
        scaled(hours, 3600).ok_or_else(|| format!("Invalid hours: {}", hours))
    } else if let Some(minutes) = s.strip_suffix('m') {
        scaled(minutes, 60).ok_or_else(|| format!("Invalid minutes: {}", minutes))
    } else if let Some(days) = s.strip_suffix('d') {
        scaled(days, 86400).ok_or_else(|| format!("Invalid days: {}", days))
    } else if let Some(secs) = s.strip_suffix('s') {
        secs.parse::<u64>()
            .map_err(|_| format!("Invalid seconds: {}", secs))
    } else {
        s.parse::<u64>()
            .map_err(|_| format!("Invalid interval: {}. Use format like '90s', '5m', '1h'", s))
    }
}

fn scaled(count: &str, unit_secs: u64) -> Option<u64> {
    count.parse::<u64>().ok()?.checked_mul(unit_secs)
}

pub fn format_interval(secs: u64) -> String {
    if secs >= 86400 && secs.is_multiple_of(86400) {
        format!("{}d", secs / 86400)
    } else if secs >= 3600 && secs.is_multiple_of(3600) {
        format!("{}h", secs / 3600)
    } else if secs >= 60 && secs.is_multiple_of(60) {
        format!("{}m", secs / 60)
    } else {
        format!("{}s", secs)
    }
}
