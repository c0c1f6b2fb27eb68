//! Search results in the Atom-like feed format.
//!
//! Field mapping differs from the REST shape: the status id is a tag URI,
//! the author block only carries `name` ("screen_name (Display Name)") and
//! `uri`, and the avatar is an `<link rel="image">` on the entry.

use feed_rs::model::Entry;
use feed_rs::parser;

use crate::app::{Result, WarblerError};
use crate::domain::{Author, Status};

pub fn parse_search_feed(body: &[u8]) -> Result<Vec<Status>> {
    let feed = parser::parse(body).map_err(|e| WarblerError::FeedParse(e.to_string()))?;
    Ok(feed.entries.into_iter().map(entry_to_status).collect())
}

fn entry_to_status(entry: Entry) -> Status {
    let avatar_url = entry
        .links
        .iter()
        .find(|link| link.rel.as_deref() == Some("image"))
        .map(|link| link.href.clone())
        .unwrap_or_default();

    let author = entry
        .authors
        .first()
        .map(|person| Author {
            id: person.uri.clone().unwrap_or_default(),
            display_name: None,
            screen_name: screen_name_of(&person.name),
            avatar_url: avatar_url.clone(),
        })
        .unwrap_or_else(|| Author {
            avatar_url,
            ..Default::default()
        });

    let text = entry
        .title
        .map(|t| t.content)
        .or_else(|| entry.summary.map(|s| s.content))
        .unwrap_or_default();

    Status {
        id: entry.id,
        created_at: entry
            .published
            .or(entry.updated)
            .map(|dt| dt.to_rfc3339())
            .unwrap_or_default(),
        text,
        source: String::new(),
        author,
        retweeted: None,
    }
}

/// The feed's author name is `screen_name (Display Name)`.
fn screen_name_of(name: &str) -> String {
    name.trim().split(' ').next().unwrap_or_default().to_string()
}
