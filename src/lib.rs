//! # Warbler
//!
//! Client core for a social-timeline service.
//!
//! ## Architecture
//!
//! ```text
//! RequestSigner → Transport → Normalizer → Status → Notifier
//!                                 │
//!                       CursorTracker, ImageCache
//! ```
//!
//! Timelines are polled, searches are one-shot and the user stream is a
//! long-lived connection; all three end up as [`Status`](domain::Status)
//! values handed to a [`Notifier`](notify::Notifier).
//!
//! ## Quick Start
//!
//! ```bash
//! # Get an access token once
//! warbler token -u alice -p secret
//!
//! # Poll the home timeline
//! warbler timeline --watch --interval 2m
//!
//! # Follow the stream
//! warbler stream
//! ```

/// Session context and error types.
///
/// [`Session`](app::Session) wires together signer, transport, parsers,
/// cursors and the avatar cache.
pub mod app;

/// OAuth 1.0a HMAC-SHA1 request signing and the xAuth token exchange.
pub mod auth;

/// Avatar cache with 48px thumbnails.
///
/// Files are keyed by the last two path segments of the avatar URL, so
/// users with the same file name do not collide.
pub mod cache;

/// Command-line interface using clap.
///
/// - `timeline [--watch]` - Show or poll the timeline
/// - `search <query>` - Search public statuses
/// - `stream` - Follow the user stream
/// - `post <text>` - Post a status
/// - `token` - Exchange credentials for an access token
pub mod cli;

/// Configuration loaded from `~/.config/warbler/config.toml`.
pub mod config;

/// Status model and the incremental read cursor.
pub mod domain;

/// HTTP transport.
///
/// - [`Transport`](fetcher::Transport): async trait for buffered and streamed requests
/// - [`HttpTransport`](fetcher::HttpTransport): reqwest-based implementation
pub mod fetcher;

/// Wire-format parsers: REST XML, REST JSON, the search feed and the
/// JSON stream.
pub mod normalizer;

pub mod notify;

/// Timeline polling loop.
pub mod poller;

/// Streaming session state machine.
pub mod stream;

/// Length checks, entity escaping and link shortening for posts.
pub mod text;
