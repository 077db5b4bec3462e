//! Generation-delta coalescing.
//!
//! Providers emit deltas token by token with no end-of-answer marker.
//! `GenerationCoalescer` regroups them into wider [`AnswerChunk`]s and marks
//! the last one, so downstream consumers get an explicit completion signal.

use std::pin::Pin;

use futures_util::{Stream, StreamExt};
use tokio::sync::mpsc;
use tracing::debug;

use mnemo_types::error::{GenerationError, IndexError};
use mnemo_types::generation::{AnswerChunk, GenerationDelta, UsageStats};

use crate::recall::provider::DeltaStream;

/// Stream of coalesced answer chunks.
pub type AnswerStream =
    Pin<Box<dyn Stream<Item = Result<AnswerChunk, GenerationError>> + Send + 'static>>;

/// Minimum coalescing width; anything narrower defeats the point.
pub const MIN_COALESCE_WIDTH: usize = 8;

/// Bounded capacity of the producer-to-consumer delta channel.
const CHANNEL_CAPACITY: usize = 256;

/// One-delta lookbehind.
///
/// The provider stream ends without warning, so a delta can only be
/// released once its successor has arrived; the held delta at end-of-stream
/// is what makes the final chunk final.
enum Lookbehind {
    Empty,
    Holding(GenerationDelta),
}

/// Regroups provider deltas into chunks of `width` deltas each.
///
/// Exactly one chunk per stream carries `is_final == true`: the last one,
/// which also carries the last-seen usage stats. An empty provider stream
/// still yields one (empty) final chunk. A provider error flushes the
/// buffered text as the final chunk, then the error terminates the stream.
#[derive(Debug, Clone, Copy)]
pub struct GenerationCoalescer {
    width: usize,
}

impl GenerationCoalescer {
    pub fn new(width: usize) -> Result<Self, IndexError> {
        if width < MIN_COALESCE_WIDTH {
            return Err(IndexError::Validation(format!(
                "coalesce width must be at least {MIN_COALESCE_WIDTH}, got {width}"
            )));
        }
        Ok(Self { width })
    }

    pub fn width(&self) -> usize {
        self.width
    }

    /// Consume a delta stream and produce the coalesced answer stream.
    ///
    /// A producer task forwards deltas into a bounded channel, so a slow
    /// consumer backpressures the provider instead of buffering unboundedly.
    /// Dropping the returned stream drops the receiver; the producer's next
    /// send fails and it stops pulling provider tokens.
    pub fn coalesce(&self, mut deltas: DeltaStream) -> AnswerStream {
        let width = self.width;
        let (tx, mut rx) = mpsc::channel::<Result<GenerationDelta, GenerationError>>(CHANNEL_CAPACITY);

        tokio::spawn(async move {
            while let Some(item) = deltas.next().await {
                let stop = item.is_err();
                if tx.send(item).await.is_err() {
                    debug!("answer stream dropped; abandoning provider stream");
                    return;
                }
                if stop {
                    return;
                }
            }
        });

        Box::pin(async_stream::stream! {
            let mut buffer = String::new();
            let mut buffered = 0usize;
            let mut usage: Option<UsageStats> = None;
            let mut lookbehind = Lookbehind::Empty;
            let mut pending_err: Option<GenerationError> = None;

            while let Some(item) = rx.recv().await {
                match item {
                    Ok(delta) => {
                        if delta.usage.is_some() {
                            usage = delta.usage;
                        }
                        match std::mem::replace(&mut lookbehind, Lookbehind::Holding(delta)) {
                            Lookbehind::Empty => {}
                            Lookbehind::Holding(previous) => {
                                buffer.push_str(&previous.text);
                                buffered += 1;
                                if buffered >= width {
                                    yield Ok(AnswerChunk {
                                        text: std::mem::take(&mut buffer),
                                        is_final: false,
                                        usage: None,
                                    });
                                    buffered = 0;
                                }
                            }
                        }
                    }
                    Err(e) => {
                        pending_err = Some(e);
                        break;
                    }
                }
            }

            // End of stream (or provider error): fold the held delta into
            // the buffer and emit the one final chunk.
            if let Lookbehind::Holding(last) = lookbehind {
                buffer.push_str(&last.text);
            }
            yield Ok(AnswerChunk {
                text: buffer,
                is_final: true,
                usage,
            });
            if let Some(e) = pending_err {
                yield Err(e);
            }
        })
    }
}
