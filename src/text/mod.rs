//! Outgoing text preparation: code-point length checks, the three-symbol
//! entity transform, and link shortening.

mod shortener;

pub use shortener::{shortener_for, IsGdShortener, Shortener};

use std::sync::OnceLock;

use regex::Regex;

use crate::app::{Result, WarblerError};

/// Post length limit, counted in Unicode code points.
pub const MAX_STATUS_CHARS: usize = 140;

pub fn codepoint_count(text: &str) -> usize {
    text.chars().count()
}

/// Reject text longer than [`MAX_STATUS_CHARS`]; returns the count on success.
pub fn validate_length(text: &str) -> Result<usize> {
    let count = codepoint_count(text);
    if count > MAX_STATUS_CHARS {
        return Err(WarblerError::TooLong {
            count,
            max: MAX_STATUS_CHARS,
        });
    }
    Ok(count)
}

/// Escape `&`, `<` and `>` only. This is not a general XML/HTML encoder.
pub fn escape_for_transmission(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            _ => out.push(c),
        }
    }
    out
}

/// Inverse of [`escape_for_transmission`]: `&amp;`, `&lt;` and `&gt;` only,
/// in a single left-to-right pass. Any other entity is left as-is.
pub fn unescape_for_display(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;

    while let Some(pos) = rest.find('&') {
        out.push_str(&rest[..pos]);
        let tail = &rest[pos..];
        let (symbol, consumed) = if tail.starts_with("&amp;") {
            ('&', 5)
        } else if tail.starts_with("&lt;") {
            ('<', 4)
        } else if tail.starts_with("&gt;") {
            ('>', 4)
        } else {
            ('&', 1)
        };
        out.push(symbol);
        rest = &tail[consumed..];
    }

    out.push_str(rest);
    out
}

fn link_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"http://[!#$%&'()*+,\-./0-9:;=?@A-Z\[\]_a-z~]+")
            .expect("link pattern is valid")
    })
}

/// Replace every bare `http://` link with the backend's short form.
///
/// Any backend failure aborts the whole substitution.
pub async fn shorten(text: &str, shortener: &dyn Shortener) -> Result<String> {
    let mut out = String::with_capacity(text.len());
    let mut last = 0;

    for link in link_pattern().find_iter(text) {
        out.push_str(&text[last..link.start()]);
        let short = shortener.shorten_url(link.as_str()).await?;
        tracing::debug!(from = link.as_str(), to = %short, "shortened link");
        out.push_str(&short);
        last = link.end();
    }

    out.push_str(&text[last..]);
    Ok(out)
}

/// Shorten links (when a backend is configured) and enforce the length limit.
pub async fn prepare_post(text: &str, shortener: Option<&dyn Shortener>) -> Result<String> {
    let text = match shortener {
        Some(backend) => shorten(text, backend).await?,
        None => text.to_string(),
    };
    validate_length(&text)?;
    Ok(text)
}
