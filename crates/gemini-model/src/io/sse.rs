use bytes::BytesMut;

use super::{Chunks, ChunksError};

#[derive(Debug, PartialEq, Eq)]
pub enum Error {
    ChunksError(ChunksError),
    InvalidPayload,
}

/// A type for reading server-sent events from a chunk stream.
///
/// Only the `data` field is surfaced. Multiple `data` lines in one event are
/// joined with a line feed, comments and the other standard fields are
/// skipped.
pub struct Sse {
    buf: BytesMut,
    chunks: Chunks,
}

impl Sse {
    #[inline]
    pub fn new(chunks: Chunks) -> Self {
        Self {
            buf: BytesMut::new(),
            chunks,
        }
    }

    pub async fn next_event(&mut self) -> Result<Option<String>, Error> {
        loop {
            // Drain what is already buffered before waiting on the network,
            // one chunk may carry several events.
            if let Some(event) = self.try_parse_event()? {
                return Ok(Some(event));
            }

            match self.chunks.next_chunk().await.map_err(Error::ChunksError)? {
                Some(bytes) => self.buf.extend_from_slice(&bytes),
                // Trailing bytes without an event terminator are dropped.
                None => return Ok(None),
            }
        }
    }

    fn try_parse_event(&mut self) -> Result<Option<String>, Error> {
        loop {
            // For `end-of-line`, we handle line feed and carriage return +
            // line feed.
            //
            // event         = *( comment / field ) end-of-line
            // comment       = colon *any-char end-of-line
            // field         = 1*name-char [ colon [ space ] *any-char ] end-of-line
            // end-of-line   = ( cr lf / cr / lf )
            let Some((end, sep_len)) = find_event_end(&self.buf) else {
                return Ok(None);
            };

            // Consume the bytes from the buffer. Decoding happens per event,
            // so multi-byte characters split across chunks are fine.
            let block = self.buf.split_to(end + sep_len);
            let Ok(block) = std::str::from_utf8(&block[..end]) else {
                return Err(Error::InvalidPayload);
            };

            let mut data: Option<String> = None;
            for line in block.lines() {
                if line.is_empty() || line.starts_with(':') {
                    continue;
                }
                let Some((name, value)) = line.split_once(':') else {
                    return Err(Error::InvalidPayload);
                };
                let value = value.strip_prefix(' ').unwrap_or(value);
                match name {
                    "data" => {
                        let data = data.get_or_insert_default();
                        if !data.is_empty() {
                            data.push('\n');
                        }
                        data.push_str(value);
                    }
                    "event" | "id" | "retry" => {
                        trace!("skipping sse field: {name}");
                    }
                    _ => return Err(Error::InvalidPayload),
                }
            }

            if let Some(data) = data {
                return Ok(Some(data));
            }
            // Comment-only event (keep-alive), look at the next one.
        }
    }
}

/// Returns the offset and the length of the first blank-line separator.
fn find_event_end(buf: &[u8]) -> Option<(usize, usize)> {
    (0..buf.len()).find_map(|idx| {
        let rest = &buf[idx..];
        if rest.starts_with(b"\r\n\r\n") {
            Some((idx, 4))
        } else if rest.starts_with(b"\n\n") {
            Some((idx, 2))
        } else {
            None
        }
    })
}
