//! Response body decoding.
//!
//! Bytes pass through an optional gzip stage and then a charset stage. Both
//! stages are push-based, so a body is decoded chunk by chunk in arrival
//! order without buffering the raw bytes.

use std::io::Write;

use encoding_rs::{CoderResult, Decoder};
use flate2::write::GzDecoder;
use tracing::trace;

use crate::core::{codec_name, resolve_encoding};
use crate::effects::transport::ResponseHead;
use crate::error::{FetchError, Result};

const GZIP_MAGIC: u8 = 0x1f;

enum Member {
    Active(GzDecoder<Vec<u8>>),
    /// Previous member finished; the next byte decides what follows.
    Ended,
    /// Bytes after the last member that do not start a new one.
    Trailing,
}

/// Streaming gzip decompression.
///
/// A body may hold several gzip members back to back; their contents are
/// concatenated. Once a member ends, anything that does not start with the
/// gzip magic byte (zero padding, for instance) is discarded.
pub struct GzipStage {
    member: Member,
}

impl GzipStage {
    pub fn new() -> Self {
        Self {
            member: Member::Active(GzDecoder::new(Vec::new())),
        }
    }

    /// Feed compressed bytes and take whatever has been inflated so far.
    pub fn push(&mut self, input: &[u8]) -> Result<Vec<u8>> {
        let mut output = Vec::new();
        let mut rest = input;

        while !rest.is_empty() {
            match &mut self.member {
                Member::Trailing => break,
                Member::Ended if rest[0] == GZIP_MAGIC => {
                    self.member = Member::Active(GzDecoder::new(Vec::new()));
                }
                Member::Ended => {
                    trace!(len = rest.len(), "discarding bytes after last gzip member");
                    self.member = Member::Trailing;
                }
                Member::Active(decoder) => {
                    let written = decoder.write(rest).map_err(decompression)?;
                    output.append(decoder.get_mut());
                    if written == 0 {
                        output.extend(self.end_member()?);
                    }
                    rest = &rest[written..];
                }
            }
        }

        Ok(output)
    }

    /// Finish the stream, verifying the trailer of the last member.
    pub fn finish(mut self) -> Result<Vec<u8>> {
        match self.member {
            Member::Active(_) => self.end_member(),
            Member::Ended | Member::Trailing => Ok(Vec::new()),
        }
    }

    fn end_member(&mut self) -> Result<Vec<u8>> {
        match std::mem::replace(&mut self.member, Member::Ended) {
            Member::Active(mut decoder) => {
                decoder.try_finish().map_err(decompression)?;
                Ok(std::mem::take(decoder.get_mut()))
            }
            other => {
                self.member = other;
                Ok(Vec::new())
            }
        }
    }
}

impl Default for GzipStage {
    fn default() -> Self { Self::new() }
}

fn decompression(e: std::io::Error) -> FetchError { FetchError::Decompression(e.to_string()) }

/// Streaming byte-to-text conversion for one charset.
///
/// Multi-byte sequences split across chunks are carried over to the next
/// push. Malformed sequences decode to U+FFFD.
pub struct CharsetStage {
    charset: String,
    decoder: Decoder,
}

impl CharsetStage {
    /// # Errors
    ///
    /// [`FetchError::CharsetConversion`] if `charset` names no known encoding.
    pub fn new(charset: &str) -> Result<Self> {
        let encoding = resolve_encoding(charset)?;
        Ok(Self {
            charset: charset.to_string(),
            decoder: encoding.new_decoder_with_bom_removal(),
        })
    }

    /// Charset as requested, before aliasing.
    pub fn charset(&self) -> &str { &self.charset }

    /// Name of the codec actually used.
    pub fn codec(&self) -> &str { codec_name(&self.charset) }

    pub fn push(&mut self, input: &[u8]) -> String { self.decode(input, false) }

    /// Flush any incomplete trailing sequence.
    pub fn finish(&mut self) -> String { self.decode(&[], true) }

    fn decode(&mut self, input: &[u8], last: bool) -> String {
        let mut output = String::new();
        let mut remaining = input;
        loop {
            let needed = self
                .decoder
                .max_utf8_buffer_length(remaining.len())
                .unwrap_or(remaining.len().saturating_mul(3).saturating_add(16));
            output.reserve(needed);

            let (result, read, _) = self.decoder.decode_to_string(remaining, &mut output, last);
            remaining = &remaining[read..];
            match result {
                CoderResult::InputEmpty => return output,
                CoderResult::OutputFull => continue,
            }
        }
    }
}

/// Ordered gzip → charset transform applied to every body chunk.
pub struct DecodePipeline {
    gzip:    Option<GzipStage>,
    charset: CharsetStage,
}

impl DecodePipeline {
    pub fn new(charset: &str, gzip: bool) -> Result<Self> {
        Ok(Self {
            gzip:    gzip.then(GzipStage::new),
            charset: CharsetStage::new(charset)?,
        })
    }

    /// Build the pipeline for a response: gzip only when the response
    /// declares `content-encoding: gzip`.
    pub fn for_response(head: &ResponseHead, charset: &str) -> Result<Self> {
        Self::new(charset, head.content_encoding() == Some("gzip"))
    }

    pub fn is_gzip(&self) -> bool { self.gzip.is_some() }

    pub fn charset(&self) -> &CharsetStage { &self.charset }

    /// Decode one chunk into a text fragment.
    pub fn push(&mut self, chunk: &[u8]) -> Result<String> {
        match self.gzip.as_mut() {
            Some(gzip) => {
                let inflated = gzip.push(chunk)?;
                Ok(self.charset.push(&inflated))
            }
            None => Ok(self.charset.push(chunk)),
        }
    }

    /// Flush both stages at end of stream.
    pub fn finish(&mut self) -> Result<String> {
        let mut tail = match self.gzip.take() {
            Some(gzip) => {
                let inflated = gzip.finish()?;
                self.charset.push(&inflated)
            }
            None => String::new(),
        };
        tail.push_str(&self.charset.finish());
        Ok(tail)
    }
}
