use bytes::{BufMut, BytesMut};
use std::{io, str};
use thiserror::Error;
use tokio_util::codec::{Decoder, Encoder};

/// Longest line accepted from the device, terminator excluded.
pub const MAX_LINE_LENGTH: usize = 1000;

/// A received line the device sent but that can't be used as text.
///
/// These are yielded as items, not decoder errors, so the framed stream
/// keeps decoding the lines that follow.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LineError {
    #[error("Line exceeds {} bytes", MAX_LINE_LENGTH)]
    TooLong,
    #[error("Line is not valid UTF-8: {:?}", _0)]
    InvalidUtf8(#[from] str::Utf8Error),
}

/// Splits the byte stream into text lines on a configurable terminator
/// and appends the terminator to every outgoing command.
pub struct LineCodec {
    terminator: Vec<u8>,
    // Offset up to which the buffer was already searched for a terminator.
    next_index: usize,
    // Set after an overlong line was reported, until its terminator shows up.
    is_discarding: bool,
}

impl LineCodec {
    pub fn new(terminator: impl AsRef<[u8]>) -> Self {
        Self {
            terminator: terminator.as_ref().to_vec(),
            next_index: 0,
            is_discarding: false,
        }
    }

    fn find_terminator(&self, src: &BytesMut) -> Option<usize> {
        if self.terminator.is_empty() || src.len() < self.terminator.len() {
            return None;
        }
        // Step back so a terminator split across two reads is still found.
        let start = self.next_index.saturating_sub(self.terminator.len() - 1);
        src[start..]
            .windows(self.terminator.len())
            .position(|w| w == self.terminator.as_slice())
            .map(|pos| start + pos)
    }
}

fn strip_line_endings(line: &str) -> &str {
    line.trim_end_matches(&['\r', '\n'][..])
}

impl Decoder for LineCodec {
    type Item = Result<String, LineError>;
    type Error = io::Error;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        loop {
            match self.find_terminator(src) {
                Some(offset) => {
                    let frame = src.split_to(offset + self.terminator.len());
                    self.next_index = 0;
                    if self.is_discarding {
                        // Tail of a line already reported as too long.
                        self.is_discarding = false;
                        continue;
                    }
                    if offset > MAX_LINE_LENGTH {
                        return Ok(Some(Err(LineError::TooLong)));
                    }
                    let line = match str::from_utf8(&frame[..offset]) {
                        Ok(line) => line,
                        Err(err) => return Ok(Some(Err(err.into()))),
                    };
                    return Ok(Some(Ok(strip_line_endings(line).to_string())));
                }
                None if self.is_discarding => {
                    // Keep a possible partial terminator at the end.
                    let keep = self.terminator.len().saturating_sub(1).min(src.len());
                    let _ = src.split_to(src.len() - keep);
                    self.next_index = src.len();
                    return Ok(None);
                }
                None => {
                    if src.len() > MAX_LINE_LENGTH + self.terminator.len() {
                        let keep = self.terminator.len().saturating_sub(1).min(src.len());
                        let _ = src.split_to(src.len() - keep);
                        self.next_index = src.len();
                        self.is_discarding = true;
                        return Ok(Some(Err(LineError::TooLong)));
                    }
                    self.next_index = src.len();
                    return Ok(None);
                }
            }
        }
    }
}

impl Encoder<String> for LineCodec {
    type Error = io::Error;

    fn encode(&mut self, item: String, dst: &mut BytesMut) -> Result<(), Self::Error> {
        dst.reserve(item.len() + self.terminator.len());
        dst.put_slice(item.as_bytes());
        dst.put_slice(&self.terminator);
        Ok(())
    }
}
