//! Line-buffered decoding of vendor SSE bodies into text increments
//!
//! Every vendor streams `data: <json>` lines; only the way an increment is pulled
//! out of each line differs. The buffering lives here once and each provider
//! supplies a [`LineExtractor`].

use bytes::Bytes;
use futures::stream::{BoxStream, Stream, StreamExt};
use tracing::{debug, warn};

use super::base::IncrementSink;
use crate::errors::{ProviderError, ProviderResult};

/// Prefix carried by every data-bearing SSE line
pub const DATA_PREFIX: &str = "data: ";

/// What a single complete line means for the stream
#[derive(Debug, Clone, PartialEq)]
pub enum LineEvent {
    Increment(String),
    Ignore,
    /// Terminal sentinel; later lines produce nothing
    Done,
}

/// Vendor-specific interpretation of one trimmed, non-empty line
pub trait LineExtractor: Send + Sync {
    fn extract(&self, line: &str) -> ProviderResult<LineEvent>;
}

/// Strip the `data: ` prefix, returning the payload of a data line
pub fn data_payload(line: &str) -> Option<&str> {
    line.strip_prefix(DATA_PREFIX)
}

/// Accumulates raw body bytes and hands out complete lines.
///
/// Splitting happens on bytes so a multi-byte character cut across two chunks is
/// only decoded once both halves have arrived.
#[derive(Debug, Default)]
pub struct LineBuffer {
    pending: Vec<u8>,
}

impl LineBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a chunk and drain every line it completed
    pub fn push(&mut self, chunk: &[u8]) -> Vec<String> {
        self.pending.extend_from_slice(chunk);
        let Some(last_newline) = self.pending.iter().rposition(|b| *b == b'\n') else {
            return Vec::new();
        };
        let rest = self.pending.split_off(last_newline + 1);
        let mut complete = std::mem::replace(&mut self.pending, rest);
        complete.pop();
        complete
            .split(|b| *b == b'\n')
            .map(|line| String::from_utf8_lossy(line).into_owned())
            .collect()
    }

    /// Take whatever unterminated line is left once the body has ended
    pub fn finish(&mut self) -> Option<String> {
        if self.pending.is_empty() {
            return None;
        }
        let rest = std::mem::take(&mut self.pending);
        Some(String::from_utf8_lossy(&rest).into_owned())
    }
}

fn interpret<E: LineExtractor + ?Sized>(extractor: &E, raw: &str) -> LineEvent {
    let line = raw.trim();
    if line.is_empty() {
        return LineEvent::Ignore;
    }
    match extractor.extract(line) {
        Ok(event) => event,
        Err(e) => {
            warn!("Skipping malformed stream line: {}", e);
            debug!("Malformed line content: {}", line);
            LineEvent::Ignore
        }
    }
}

/// Turn a response body into a lazy, one-shot stream of text increments.
///
/// The stream ends when the body ends. After the terminal sentinel the rest of the
/// body is still drained but yields nothing. Malformed lines are logged and skipped;
/// only transport failures end the stream with an error.
pub fn increments<S, E>(body: S, extractor: E) -> BoxStream<'static, ProviderResult<String>>
where
    S: Stream<Item = reqwest::Result<Bytes>> + Send + 'static,
    E: LineExtractor + 'static,
{
    Box::pin(async_stream::try_stream! {
        let mut body = Box::pin(body);
        let mut buffer = LineBuffer::new();
        let mut done = false;

        while let Some(chunk) = body.next().await {
            let chunk = chunk.map_err(ProviderError::from)?;
            if done {
                continue;
            }
            for line in buffer.push(&chunk) {
                match interpret(&extractor, &line) {
                    LineEvent::Increment(text) => yield text,
                    LineEvent::Ignore => {}
                    LineEvent::Done => {
                        done = true;
                        break;
                    }
                }
            }
        }

        if !done {
            if let Some(line) = buffer.finish() {
                if let LineEvent::Increment(text) = interpret(&extractor, &line) {
                    yield text;
                }
            }
        }
    })
}

/// Drive an increment stream, forwarding each increment to the sink and returning the full text
pub async fn forward<S>(mut stream: S, on_increment: IncrementSink<'_>) -> ProviderResult<String>
where
    S: Stream<Item = ProviderResult<String>> + Unpin,
{
    let mut full_text = String::new();
    while let Some(increment) = stream.next().await {
        let increment = increment?;
        on_increment(&increment);
        full_text.push_str(&increment);
    }
    Ok(full_text)
}

/// Decode a whole response body with the given extractor
pub async fn decode_response<E>(
    response: reqwest::Response,
    extractor: E,
    on_increment: IncrementSink<'_>,
) -> ProviderResult<String>
where
    E: LineExtractor + 'static,
{
    forward(increments(response.bytes_stream(), extractor), on_increment).await
}
