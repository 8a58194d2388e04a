//! Streaming support for model responses
//!
//! Turns Ollama response pieces into normalized [`StreamChunk`]s. The same
//! mapping applies to a streamed piece and to a complete response: a `Text`
//! chunk when the piece carries non-empty content, then a `Usage` chunk when
//! the piece reports either token counter.

pub mod ndjson;

pub use ndjson::NdjsonParser;

use futures::StreamExt;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use super::{
    transport::{PieceStream, TransportError},
    wire::ChatResponse,
    ChunkStream, StreamChunk, Usage,
};
use crate::error::AdapterError;

/// Usage counters of a piece; missing counters default to zero.
///
/// `None` when the piece reports neither counter.
#[must_use]
pub fn usage_of(piece: &ChatResponse) -> Option<Usage> {
    if piece.prompt_eval_count.is_none() && piece.eval_count.is_none() {
        return None;
    }

    Some(Usage {
        input_tokens: piece.prompt_eval_count.unwrap_or(0),
        output_tokens: piece.eval_count.unwrap_or(0),
    })
}

/// Chunks for one response piece, in emission order
#[must_use]
pub fn piece_chunks(piece: &ChatResponse) -> Vec<StreamChunk> {
    let mut chunks = Vec::with_capacity(2);

    if let Some(text) = piece.content().filter(|text| !text.is_empty()) {
        chunks.push(StreamChunk::text(text));
    }
    if let Some(usage) = usage_of(piece) {
        chunks.push(StreamChunk::Usage(usage));
    }

    chunks
}

/// Normalize a stream of response pieces.
///
/// The returned stream ends after the first error. Cancelling `cancel` ends
/// it with [`AdapterError::Cancelled`]; dropping it cancels `cancel`.
pub fn normalize_stream(pieces: PieceStream, cancel: CancellationToken) -> ChunkStream {
    Box::pin(async_stream::stream! {
        let _guard = cancel.clone().drop_guard();
        let mut pieces = pieces;
        let mut emitted = 0usize;

        loop {
            let next = tokio::select! {
                biased;
                () = cancel.cancelled() => None,
                piece = pieces.next() => Some(piece),
            };

            match next {
                None | Some(Some(Err(TransportError::Cancelled))) => {
                    debug!("Ollama stream cancelled after {emitted} chunks");
                    yield Err(AdapterError::Cancelled);
                    break;
                }
                Some(None) => {
                    debug!("Ollama stream finished after {emitted} chunks");
                    break;
                }
                Some(Some(Ok(piece))) => {
                    for chunk in piece_chunks(&piece) {
                        emitted += 1;
                        yield Ok(chunk);
                    }
                }
                Some(Some(Err(err))) => {
                    warn!("Ollama stream failed after {emitted} chunks: {err}");
                    yield Err(AdapterError::StreamProcessing(err.to_string()));
                    break;
                }
            }
        }
    })
}
