//! Polling REST XML: `<statuses><status>...<user>...</user></status></statuses>`.

use quick_xml::events::{BytesText, Event};
use quick_xml::name::QName;
use quick_xml::Reader;

use crate::app::{Result, WarblerError};
use crate::domain::{Author, Status};

/// Retweets nest one level in practice; this only guards against hostile input.
const MAX_NESTING: usize = 16;

fn xml_error(e: impl std::fmt::Display) -> WarblerError {
    WarblerError::FeedParse(format!("XML: {}", e))
}

fn text_of(t: &BytesText<'_>) -> String {
    t.unescape()
        .map(|s| s.into_owned())
        .unwrap_or_else(|_| String::from_utf8_lossy(t).into_owned())
}

pub fn parse_statuses(body: &[u8]) -> Result<Vec<Status>> {
    // No trimming: whitespace between elements is skipped by the match arms,
    // and leaf text is kept exactly as sent.
    let mut reader = Reader::from_reader(body);

    let mut statuses = Vec::new();
    loop {
        match reader.read_event().map_err(xml_error)? {
            Event::Start(e) if e.name().as_ref() == b"status" => {
                statuses.push(parse_status(&mut reader, b"status", 0)?);
            }
            Event::Eof => break,
            _ => {}
        }
    }

    Ok(statuses)
}

fn parse_status(reader: &mut Reader<&[u8]>, end: &[u8], depth: usize) -> Result<Status> {
    if depth > MAX_NESTING {
        return Err(xml_error("retweets nested too deeply"));
    }

    let mut status = Status::default();
    loop {
        match reader.read_event().map_err(xml_error)? {
            Event::Start(e) => {
                let name = e.name().as_ref().to_vec();
                match name.as_slice() {
                    b"created_at" => status.created_at = read_text(reader, &name)?,
                    b"id" => status.id = read_text(reader, &name)?,
                    b"text" | b"title" => status.text = read_text(reader, &name)?,
                    b"source" => status.source = read_text(reader, &name)?,
                    b"user" => status.author = parse_user(reader)?,
                    b"retweeted_status" => {
                        let inner = parse_status(reader, b"retweeted_status", depth + 1)?;
                        status.retweeted = Some(Box::new(inner));
                    }
                    _ => {
                        reader.read_to_end(QName(&name)).map_err(xml_error)?;
                    }
                }
            }
            Event::End(e) if e.name().as_ref() == end => break,
            Event::Eof => return Err(xml_error("unexpected end of document inside status")),
            _ => {}
        }
    }

    Ok(status)
}

fn parse_user(reader: &mut Reader<&[u8]>) -> Result<Author> {
    let mut author = Author::default();
    loop {
        match reader.read_event().map_err(xml_error)? {
            Event::Start(e) => {
                let name = e.name().as_ref().to_vec();
                match name.as_slice() {
                    b"id" => author.id = read_text(reader, &name)?,
                    b"name" => {
                        let display = read_text(reader, &name)?;
                        author.display_name = (!display.is_empty()).then_some(display);
                    }
                    b"screen_name" => author.screen_name = read_text(reader, &name)?,
                    b"profile_image_url" => author.avatar_url = read_text(reader, &name)?,
                    _ => {
                        reader.read_to_end(QName(&name)).map_err(xml_error)?;
                    }
                }
            }
            Event::End(e) if e.name().as_ref() == b"user" => break,
            Event::Eof => return Err(xml_error("unexpected end of document inside user")),
            _ => {}
        }
    }

    Ok(author)
}

/// Collect the text content of a leaf element up to its end tag.
fn read_text(reader: &mut Reader<&[u8]>, end: &[u8]) -> Result<String> {
    let mut text = String::new();
    let mut depth = 0usize;
    loop {
        match reader.read_event().map_err(xml_error)? {
            Event::Text(t) => text.push_str(&text_of(&t)),
            Event::CData(c) => text.push_str(&String::from_utf8_lossy(&c)),
            Event::Start(_) => depth += 1,
            Event::End(e) => {
                if depth == 0 {
                    debug_assert_eq!(e.name().as_ref(), end);
                    break;
                }
                depth -= 1;
            }
            Event::Eof => return Err(xml_error("unexpected end of document inside field")),
            _ => {}
        }
    }
    Ok(text)
}
