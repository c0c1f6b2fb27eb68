pub mod json;
pub mod rest_xml;
pub mod search_feed;
pub mod stream_buffer;

pub use json::{classify, StreamMessage};
pub use stream_buffer::StreamBuffer;

use crate::app::Result;
use crate::config::ApiFormat;
use crate::domain::Status;

/// The three wire shapes a status list can arrive in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WireFormat {
    RestXml,
    RestJson,
    SearchFeed,
}

impl From<ApiFormat> for WireFormat {
    fn from(format: ApiFormat) -> Self {
        match format {
            ApiFormat::Xml => WireFormat::RestXml,
            ApiFormat::Json => WireFormat::RestJson,
        }
    }
}

#[derive(Clone, Default)]
pub struct Normalizer;

impl Normalizer {
    pub fn new() -> Self {
        Self
    }

    /// Parse a one-shot response body into newest-first statuses. Any
    /// malformed payload drops the whole batch.
    pub fn normalize(&self, format: WireFormat, body: &[u8]) -> Result<Vec<Status>> {
        let statuses = match format {
            WireFormat::RestXml => rest_xml::parse_statuses(body)?,
            WireFormat::RestJson => json::parse_statuses(body)?,
            WireFormat::SearchFeed => search_feed::parse_search_feed(body)?,
        };
        tracing::debug!(?format, count = statuses.len(), "normalized batch");
        Ok(statuses)
    }
}
