use serde::{Deserialize, Serialize};

use crate::text::{escape_for_transmission, unescape_for_display};

/// Author of a status as reported by the service.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Author {
    pub id: String,
    /// Absent in the search feed format.
    pub display_name: Option<String>,
    pub screen_name: String,
    pub avatar_url: String,
}

/// A single timeline entry, normalized from any of the wire formats.
///
/// `id` keeps the wire representation: a decimal string for the REST and
/// JSON formats, a tag URI (`tag:search.twitter.com,2005:123`) for the
/// search feed. Use [`Status::numeric_id`] for ordering and cursors.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Status {
    pub id: String,
    pub created_at: String,
    pub text: String,
    pub source: String,
    pub author: Author,
    pub retweeted: Option<Box<Status>>,
}

impl Status {
    pub fn numeric_id(&self) -> Option<u64> {
        parse_status_id(&self.id)
    }

    pub fn is_retweet(&self) -> bool {
        self.retweeted.is_some()
    }

    /// Walk the retweet chain down to the originally posted status.
    pub fn original(&self) -> &Status {
        let mut current = self;
        while let Some(inner) = current.retweeted.as_deref() {
            current = inner;
        }
        current
    }

    /// Text with the service's entity escaping undone, for plain rendering.
    pub fn display_text(&self) -> String {
        unescape_for_display(&self.text)
    }

    /// Text safe for sinks that interpret `<`, `>` and `&` as markup.
    pub fn markup_text(&self) -> String {
        escape_for_transmission(&self.display_text())
    }

    /// `@screen_name: text`
    pub fn summary_line(&self) -> String {
        format!("@{}: {}", self.author.screen_name, self.display_text())
    }
}

/// Extract the numeric id from either a bare decimal string or a
/// colon-delimited tag URI, where the id is the final segment.
pub fn parse_status_id(raw: &str) -> Option<u64> {
    let tail = raw.rsplit(':').next()?.trim();
    if tail.is_empty() || !tail.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    tail.parse().ok()
}
