//! Fetch endpoint with streamed progress.
//!
//! - GET /api/v1/repos/fetch?repoUrl=&branch=
//!   `branch` is required and must name a branch on the remote.
//!   Server-Sent Events: `start`, any number of `progress` (FetchProgress),
//!   then `end` carrying the final envelope. Progress ticks are dropped when
//!   the client reads slowly; `end` is always delivered. Closing the stream
//!   cancels the transfer.

use std::convert::Infallible;

use axum::{
    extract::{rejection::QueryRejection, Query, State},
    response::sse::{Event, KeepAlive, Sse},
    routing::get,
    Router,
};
use serde::Deserialize;
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio_stream::wrappers::ReceiverStream;
use tokio_stream::{Stream, StreamExt};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use super::{invalid_query, SharedCore};
use crate::error::Result;
use crate::models::FetchEvent;

const EVENT_BUFFER: usize = 32;

pub fn routes(core: SharedCore) -> Router {
    Router::new()
        .route("/api/v1/repos/fetch", get(fetch_branch))
        .with_state(core)
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FetchQuery {
    repo_url: String,
    branch: String,
}

async fn fetch_branch(
    State(core): State<SharedCore>,
    query: std::result::Result<Query<FetchQuery>, QueryRejection>,
) -> Result<Sse<impl Stream<Item = std::result::Result<Event, Infallible>>>> {
    let Query(query) = query.map_err(invalid_query)?;
    let events = fetch_events(core, query.repo_url, query.branch).map(|event| {
        let sse = Event::default().event(event.name());
        Ok(sse.json_data(&event).unwrap_or_else(|e| {
            warn!("Failed to encode fetch event: {}", e);
            Event::default().event(event.name())
        }))
    });
    Ok(Sse::new(events).keep_alive(KeepAlive::default()))
}

/// Run the fetch on the blocking pool and stream its events.
///
/// Dropping the returned stream cancels the fetch at its next progress tick.
pub fn fetch_events(core: SharedCore, repo_url: String, branch: String) -> ReceiverStream<FetchEvent> {
    let (tx, rx) = mpsc::channel(EVENT_BUFFER);
    let cancel = CancellationToken::new();

    tokio::task::spawn_blocking(move || {
        let mut ended = false;
        let mut sink = |event: FetchEvent| match event {
            FetchEvent::Progress(_) => match tx.try_send(event) {
                Ok(()) => {}
                Err(TrySendError::Full(_)) => debug!("Dropping fetch progress tick"),
                Err(TrySendError::Closed(_)) => cancel.cancel(),
            },
            other => {
                ended |= matches!(other, FetchEvent::End(_));
                if tx.blocking_send(other).is_err() {
                    cancel.cancel();
                }
            }
        };

        let envelope = core.fetch(&repo_url, &branch, &mut sink, &cancel);
        if !ended {
            // The fetch was rejected before it started.
            let _ = tx.blocking_send(FetchEvent::End(envelope));
        }
    });

    ReceiverStream::new(rx)
}
