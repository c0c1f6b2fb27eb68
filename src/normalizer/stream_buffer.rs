//! Reassembly of JSON objects from arbitrary network chunks.
//!
//! Nothing is handed to the JSON parser as a value until a complete object
//! is buffered; a partial object simply waits for the next chunk.

use serde_json::{Deserializer, Value};
use tracing::warn;

/// Upper bound on buffered bytes without a complete object.
const MAX_PENDING: usize = 1 << 20;

#[derive(Debug, Default)]
pub struct StreamBuffer {
    pending: Vec<u8>,
}

impl StreamBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    /// Append a chunk and return every complete value now available.
    /// Malformed fragments are dropped up to the next line break.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<Value> {
        self.pending.extend_from_slice(chunk);
        let mut values = Vec::new();

        loop {
            let start = self
                .pending
                .iter()
                .position(|b| !b.is_ascii_whitespace())
                .unwrap_or(self.pending.len());
            self.pending.drain(..start);
            if self.pending.is_empty() {
                break;
            }

            let parsed = {
                let mut stream = Deserializer::from_slice(&self.pending).into_iter::<Value>();
                let next = stream.next();
                next.map(|result| result.map(|value| (value, stream.byte_offset())))
            };

            match parsed {
                Some(Ok((value, consumed))) => {
                    self.pending.drain(..consumed);
                    values.push(value);
                }
                Some(Err(e)) if e.is_eof() => break,
                Some(Err(e)) => {
                    warn!(error = %e, "skipping malformed stream fragment");
                    self.skip_line();
                }
                None => break,
            }
        }

        if self.pending.len() > MAX_PENDING {
            warn!(bytes = self.pending.len(), "discarding oversized partial object");
            self.pending.clear();
        }

        values
    }

    fn skip_line(&mut self) {
        match self.pending.iter().position(|&b| b == b'\n') {
            Some(newline) => {
                self.pending.drain(..=newline);
            }
            None => self.pending.clear(),
        }
    }
}
