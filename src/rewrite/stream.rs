//! Streaming bridge between response bodies and the transformer.
//!
//! # Data Flow
//! ```text
//! origin body ──pump task──▶ input channel ──▶ worker (blocking thread)
//!                                                 HtmlTransformer::write
//! client body ◀── output channel ◀────────────────────┘
//! ```
//!
//! # Design Decisions
//! - The rewriter's handlers share `Rc` state and are not `Send`, so it is
//!   created and driven on one blocking thread; parsing CPU also stays off
//!   the async workers
//! - Channels are bounded: a slow client back-pressures the origin read
//! - When the client goes away the pump stops reading and drops the origin body;
//!   the worker sees end of input and exits
//! - A rewrite failure switches the rest of the body to verbatim passthrough,
//!   starting with the input the parser had buffered but not yet written
//! - Each active transform holds one blocking-pool thread for the life of the
//!   body, parked in `blocking_recv` while the origin is slow; the number of
//!   transforms is capped below the pool size (`transform.max_concurrent`)

use std::io;

use axum::body::{Body, Bytes};
use futures_util::{stream, Stream, StreamExt};
use tokio::sync::{mpsc, OwnedSemaphorePermit};
use tracing::Instrument;

use crate::observability::metrics;
use crate::rewrite::transformer::{HtmlTransformer, TransformLimits};
use crate::rules::{ConfigKey, TransformContext};

/// Chunks buffered in each direction.
const CHANNEL_DEPTH: usize = 16;

type Chunk = io::Result<Bytes>;

/// Wrap `body` so it is rewritten as it streams to the client.
///
/// `permit` is held until the worker finishes.
pub fn transform_body(
    body: Body,
    context: TransformContext,
    limits: TransformLimits,
    permit: OwnedSemaphorePermit,
) -> Body {
    let (input_tx, input_rx) = mpsc::channel::<Chunk>(CHANNEL_DEPTH);
    let (output_tx, output_rx) = mpsc::channel::<Chunk>(CHANNEL_DEPTH);
    let span = tracing::Span::current();

    tokio::spawn(
        pump(body.into_data_stream(), input_tx, output_tx.clone()).instrument(span.clone()),
    );

    tokio::task::spawn_blocking(move || {
        let _entered = span.enter();
        let _permit = permit;
        run_worker(input_rx, output_tx, context, limits);
    });

    Body::from_stream(stream::unfold(output_rx, |mut rx| async move {
        rx.recv().await.map(|item| (item, rx))
    }))
}

/// Move origin chunks to the worker until the origin ends, fails, or the
/// client disconnects.
async fn pump<S, E>(mut body: S, input: mpsc::Sender<Chunk>, output: mpsc::Sender<Chunk>)
where
    S: Stream<Item = Result<Bytes, E>> + Unpin,
    E: std::error::Error + Send + Sync + 'static,
{
    loop {
        let next = tokio::select! {
            _ = output.closed() => {
                tracing::debug!("Client disconnected, dropping origin body");
                return;
            }
            next = body.next() => next,
        };

        let Some(item) = next else { return };
        let item = item.map_err(io::Error::other);
        let failed = item.is_err();

        if input.send(item).await.is_err() || failed {
            return;
        }
    }
}

fn run_worker(
    mut input: mpsc::Receiver<Chunk>,
    output: mpsc::Sender<Chunk>,
    context: TransformContext,
    limits: TransformLimits,
) {
    let key = context.key().clone();
    let mut transformer = Some(HtmlTransformer::new(context, limits));

    while let Some(item) = input.blocking_recv() {
        let chunk = match item {
            Ok(chunk) => chunk,
            Err(e) => {
                tracing::warn!(config_key = %key, error = %e, "Origin body failed mid-stream");
                let _ = output.blocking_send(Err(e));
                return;
            }
        };

        let result = transformer.as_mut().map(|active| active.write(&chunk));
        let ready = match result {
            None => chunk,
            Some(Ok(bytes)) => Bytes::from(bytes),
            Some(Err(e)) => {
                tracing::warn!(config_key = %key, error = %e, "Rewrite failed, passing the rest through");
                metrics::record_transform_failure("stream");
                // The failed chunk is part of what the transformer replays
                Bytes::from(transformer.take().map(HtmlTransformer::abandon).unwrap_or_default())
            }
        };

        if !send(&output, ready, &key) {
            return;
        }
    }

    if let Some(mut active) = transformer {
        let bytes = match active.end() {
            Ok(bytes) => bytes,
            Err(e) => {
                tracing::warn!(config_key = %key, error = %e, "Rewrite failed at end of document");
                metrics::record_transform_failure("end");
                active.abandon()
            }
        };
        send(&output, Bytes::from(bytes), &key);
    }
    tracing::trace!(config_key = %key, "Transform finished");
}

/// Returns false once the client side is gone.
fn send(output: &mpsc::Sender<Chunk>, bytes: Bytes, key: &ConfigKey) -> bool {
    if bytes.is_empty() {
        return true;
    }
    if output.blocking_send(Ok(bytes)).is_err() {
        tracing::debug!(config_key = %key, "Client disconnected, stopping transform");
        return false;
    }
    true
}
