//! NDJSON line decoder and async frame stream for Ollama chat replies.
//!
//! The body is a sequence of JSON objects separated by `\n`. Network chunks
//! do not respect those boundaries, so bytes are buffered until a full line
//! is available; a trailing line without a newline is decoded once the body
//! ends.

use std::time::Duration;

use futures_util::StreamExt;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use hearth_core::llm::upstream::FrameStream;
use hearth_types::llm::{StreamFrame, UpstreamError};

use super::types::OllamaChatChunk;

/// Longest line kept by default; NDJSON chunks from the model server are tiny.
pub const DEFAULT_MAX_LINE_BYTES: usize = 1024 * 1024;

/// Splits a byte stream into complete lines.
///
/// Lines longer than the cap are dropped with a warning instead of being
/// buffered until the deadline.
#[derive(Debug)]
pub struct LineDecoder {
    buffer: Vec<u8>,
    /// Bytes of `buffer` already searched for a newline.
    scanned: usize,
    max_line: usize,
    /// Skipping the rest of an oversized line.
    discarding: bool,
}

impl Default for LineDecoder {
    fn default() -> Self {
        Self::with_max_line(DEFAULT_MAX_LINE_BYTES)
    }
}

impl LineDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_line(max_line: usize) -> Self {
        Self {
            buffer: Vec::new(),
            scanned: 0,
            max_line,
            discarding: false,
        }
    }

    /// Bytes held for the current incomplete line.
    pub fn buffered(&self) -> usize {
        self.buffer.len()
    }

    /// Feed a chunk and return every line it completed, without the newline.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<Vec<u8>> {
        self.buffer.extend_from_slice(chunk);

        let mut lines = Vec::new();
        let mut start = 0;
        while let Some(offset) = self.buffer[self.scanned..].iter().position(|b| *b == b'\n') {
            let end = self.scanned + offset;
            if self.discarding {
                self.discarding = false;
            } else if end - start > self.max_line {
                tracing::warn!(bytes = end - start, max = self.max_line, "dropping oversized line");
            } else {
                lines.push(self.buffer[start..end].to_vec());
            }
            start = end + 1;
            self.scanned = start;
        }
        self.buffer.drain(..start);
        self.scanned = self.buffer.len();

        if self.buffer.len() > self.max_line {
            tracing::warn!(bytes = self.buffer.len(), max = self.max_line, "dropping oversized line");
            self.buffer.clear();
            self.scanned = 0;
            self.discarding = true;
        }
        lines
    }

    /// Whatever is left once the body has ended.
    pub fn finish(&mut self) -> Option<Vec<u8>> {
        self.scanned = 0;
        if std::mem::take(&mut self.discarding) || self.buffer.is_empty() {
            self.buffer.clear();
            return None;
        }
        Some(std::mem::take(&mut self.buffer))
    }
}

/// What one decoded line contributes to the frame stream.
#[derive(Debug, PartialEq, Eq)]
pub enum LineOutcome {
    /// Blank, or valid JSON with nothing to surface.
    Skip,
    Frames(Vec<StreamFrame>),
    /// The server reported an error object in place of a chunk.
    ServerError(String),
}

/// Decode one NDJSON line.
///
/// A line may carry both final text and `done: true`; the text frame is
/// emitted first. Invalid UTF-8 makes the line undecodable.
pub fn decode_line(line: &[u8]) -> Result<LineOutcome, serde_json::Error> {
    let line = line.trim_ascii();
    if line.is_empty() {
        return Ok(LineOutcome::Skip);
    }

    let chunk: OllamaChatChunk = serde_json::from_slice(line)?;
    if let Some(message) = chunk.error {
        return Ok(LineOutcome::ServerError(message));
    }

    let mut frames = Vec::with_capacity(2);
    match chunk.message {
        Some(message) if !message.content.is_empty() => {
            frames.push(StreamFrame::Delta(message.content));
        }
        _ => {}
    }
    if chunk.done {
        frames.push(StreamFrame::Done);
    }

    if frames.is_empty() {
        Ok(LineOutcome::Skip)
    } else {
        Ok(LineOutcome::Frames(frames))
    }
}

enum Next<C> {
    Chunk(Option<C>),
    Cancelled,
    Expired,
}

/// Turn a successful streaming response into a [`FrameStream`].
///
/// The stream owns the response; dropping the stream aborts the request.
/// It ends after the first `Done` frame, at end of body, on cancellation
/// (`UpstreamError::Cancelled`), or once `deadline` passes
/// (`UpstreamError::DeadlineExceeded`).
pub fn create_ollama_stream(
    response: reqwest::Response,
    cancel: CancellationToken,
    deadline: Instant,
    max_duration: Duration,
) -> FrameStream {
    Box::pin(async_stream::stream! {
        let mut byte_stream = response.bytes_stream();
        let mut decoder = LineDecoder::new();
        let expiry = tokio::time::sleep_until(deadline);
        tokio::pin!(expiry);

        'read: loop {
            let next = tokio::select! {
                biased;
                _ = cancel.cancelled() => Next::Cancelled,
                _ = &mut expiry => Next::Expired,
                chunk = byte_stream.next() => Next::Chunk(chunk),
            };

            let lines = match next {
                Next::Cancelled => {
                    tracing::debug!("upstream read cancelled");
                    yield Err(UpstreamError::Cancelled);
                    break 'read;
                }
                Next::Expired => {
                    tracing::warn!(max_secs = max_duration.as_secs(), "upstream stream hit max duration");
                    yield Err(UpstreamError::DeadlineExceeded(max_duration.as_secs()));
                    break 'read;
                }
                Next::Chunk(Some(Ok(bytes))) => decoder.push(&bytes),
                Next::Chunk(Some(Err(e))) => {
                    yield Err(UpstreamError::Stream(format!("response body read: {e}")));
                    break 'read;
                }
                Next::Chunk(None) => {
                    let tail = decoder.finish();
                    for line in tail.iter() {
                        match decode_line(line) {
                            Ok(LineOutcome::Frames(frames)) => {
                                for frame in frames {
                                    yield Ok(frame);
                                }
                            }
                            Ok(LineOutcome::ServerError(message)) => {
                                yield Err(UpstreamError::Stream(message));
                            }
                            Ok(LineOutcome::Skip) => {}
                            Err(e) => tracing::warn!(error = %e, "dropping undecodable trailing line"),
                        }
                    }
                    break 'read;
                }
            };

            for line in lines {
                match decode_line(&line) {
                    Ok(LineOutcome::Frames(frames)) => {
                        for frame in frames {
                            let done = frame == StreamFrame::Done;
                            yield Ok(frame);
                            if done {
                                break 'read;
                            }
                        }
                    }
                    Ok(LineOutcome::ServerError(message)) => {
                        tracing::warn!(error = %message, "upstream reported an error mid-stream");
                        yield Err(UpstreamError::Stream(message));
                        break 'read;
                    }
                    Ok(LineOutcome::Skip) => {}
                    Err(e) => tracing::warn!(error = %e, "dropping undecodable line"),
                }
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "{\"message\":{\"content\":\"Hi\"},\"done\":false}\n{\"done\":true}\n";

    fn decode_all(chunks: &[&[u8]]) -> Vec<StreamFrame> {
        let mut decoder = LineDecoder::new();
        let mut lines = Vec::new();
        for chunk in chunks {
            lines.extend(decoder.push(chunk));
        }
        lines.extend(decoder.finish());

        let mut frames = Vec::new();
        for line in lines {
            if let Ok(LineOutcome::Frames(f)) = decode_line(&line) {
                frames.extend(f);
            }
        }
        frames
    }

    #[test]
    fn test_whole_input_decodes() {
        let frames = decode_all(&[SAMPLE.as_bytes()]);
        assert_eq!(
            frames,
            vec![StreamFrame::Delta("Hi".to_string()), StreamFrame::Done]
        );
    }

    #[test]
    fn test_any_split_point_decodes_identically() {
        let bytes = SAMPLE.as_bytes();
        let whole = decode_all(&[bytes]);
        for split in 0..=bytes.len() {
            let (a, b) = bytes.split_at(split);
            assert_eq!(decode_all(&[a, b]), whole, "split at {split}");
        }
    }

    #[test]
    fn test_byte_at_a_time_decodes_identically() {
        let bytes = SAMPLE.as_bytes();
        let chunks: Vec<&[u8]> = bytes.chunks(1).collect();
        assert_eq!(decode_all(&chunks), decode_all(&[bytes]));
    }

    #[test]
    fn test_multibyte_text_split_across_chunks() {
        let input = "{\"message\":{\"content\":\"héllo ✓\"},\"done\":false}\n".as_bytes();
        let split = input.iter().position(|b| *b == 0xC3).unwrap() + 1;
        let (a, b) = input.split_at(split);
        assert_eq!(
            decode_all(&[a, b]),
            vec![StreamFrame::Delta("héllo ✓".to_string())]
        );
    }

    #[test]
    fn test_trailing_line_without_newline() {
        let mut decoder = LineDecoder::new();
        assert!(decoder.push(b"{\"done\":true}").is_empty());
        assert_eq!(decoder.finish().as_deref(), Some(&b"{\"done\":true}"[..]));
        assert_eq!(decoder.finish(), None);
    }

    #[test]
    fn test_several_objects_in_one_chunk() {
        let mut decoder = LineDecoder::new();
        let lines = decoder.push(b"{\"a\":1}\n{\"b\":2}\n{\"c\"");
        assert_eq!(lines, vec![b"{\"a\":1}".to_vec(), b"{\"b\":2}".to_vec()]);
        assert_eq!(decoder.push(b":3}\n"), vec![b"{\"c\":3}".to_vec()]);
    }

    #[test]
    fn test_long_line_fed_in_small_chunks() {
        let content = "x".repeat(4096);
        let line = format!("{{\"message\":{{\"content\":\"{content}\"}},\"done\":false}}\n");
        let chunks: Vec<&[u8]> = line.as_bytes().chunks(7).collect();
        assert_eq!(decode_all(&chunks), vec![StreamFrame::Delta(content)]);
    }

    #[test]
    fn test_unterminated_oversized_line_is_dropped() {
        let mut decoder = LineDecoder::with_max_line(16);
        for _ in 0..10 {
            assert!(decoder.push(b"aaaaaaaa").is_empty());
            assert!(decoder.buffered() <= 16);
        }
        let lines = decoder.push(b"aaaa\n{\"done\":true}\n");
        assert_eq!(lines, vec![b"{\"done\":true}".to_vec()]);
        assert_eq!(decoder.finish(), None);
    }

    #[test]
    fn test_complete_oversized_line_is_dropped() {
        let mut decoder = LineDecoder::with_max_line(8);
        let lines = decoder.push(b"0123456789abc\nshort\n");
        assert_eq!(lines, vec![b"short".to_vec()]);
    }

    #[test]
    fn test_oversized_trailing_line_is_dropped() {
        let mut decoder = LineDecoder::with_max_line(4);
        assert!(decoder.push(b"toolong").is_empty());
        assert!(decoder.push(b"tail").is_empty());
        assert_eq!(decoder.finish(), None);
    }

    #[test]
    fn test_invalid_utf8_line_is_an_error() {
        assert!(decode_line(b"{\"message\":{\"content\":\"ok \xff\"},\"done\":false}").is_err());

        let frames = decode_all(&[
            &b"{\"message\":{\"content\":\"\xc3\x28\"},\"done\":false}\n"[..],
            &b"{\"message\":{\"content\":\"fine\"},\"done\":true}\n"[..],
        ]);
        assert_eq!(
            frames,
            vec![StreamFrame::Delta("fine".to_string()), StreamFrame::Done]
        );
    }

    #[test]
    fn test_empty_content_is_not_a_frame() {
        let outcome =
            decode_line(br#"{"message":{"role":"assistant","content":""},"done":false}"#).unwrap();
        assert_eq!(outcome, LineOutcome::Skip);
    }

    #[test]
    fn test_text_and_done_on_one_line() {
        let outcome = decode_line(br#"{"message":{"content":"bye"},"done":true}"#).unwrap();
        assert_eq!(
            outcome,
            LineOutcome::Frames(vec![
                StreamFrame::Delta("bye".to_string()),
                StreamFrame::Done
            ])
        );
    }

    #[test]
    fn test_blank_and_crlf_lines() {
        assert_eq!(decode_line(b"").unwrap(), LineOutcome::Skip);
        assert_eq!(decode_line(b"   \r").unwrap(), LineOutcome::Skip);
        assert_eq!(
            decode_line(b"{\"done\":true}\r").unwrap(),
            LineOutcome::Frames(vec![StreamFrame::Done])
        );
    }

    #[test]
    fn test_malformed_line_is_an_error() {
        assert!(decode_line(b"{\"message\":").is_err());
        assert!(decode_line(b"not json").is_err());
    }

    #[test]
    fn test_server_error_line() {
        assert_eq!(
            decode_line(br#"{"error":"out of memory"}"#).unwrap(),
            LineOutcome::ServerError("out of memory".to_string())
        );
    }
}
