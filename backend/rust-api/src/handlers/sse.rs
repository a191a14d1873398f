use axum::{
    extract::{Path, State},
    response::{
        sse::{Event, KeepAlive, Sse},
        IntoResponse,
    },
};
use futures::stream::{self, Stream};
use std::convert::Infallible;
use std::sync::Arc;
use tokio::sync::broadcast::{self, error::RecvError};
use uuid::Uuid;

use crate::{
    error::ApiError,
    metrics::SSE_CONNECTIONS_ACTIVE,
    models::timer::SessionEvent,
    services::AppState,
};

/// SSE endpoint for countdown and answer events
/// GET /api/sessions/{id}/stream
pub async fn session_stream(
    State(state): State<Arc<AppState>>,
    Path(session_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let receiver = state.sessions.subscribe(session_id).await?;
    tracing::info!("Client connected to SSE stream: session={}", session_id);

    Ok(Sse::new(event_stream(session_id, receiver)).keep_alive(KeepAlive::default()))
}

/// Decrements the connection gauge when the stream is dropped.
struct ConnectionGuard {
    session_id: Uuid,
}

impl ConnectionGuard {
    fn new(session_id: Uuid) -> Self {
        SSE_CONNECTIONS_ACTIVE.inc();
        Self { session_id }
    }
}

impl Drop for ConnectionGuard {
    fn drop(&mut self) {
        SSE_CONNECTIONS_ACTIVE.dec();
        tracing::debug!("SSE stream closed: session={}", self.session_id);
    }
}

/// Forwards session events until the session goes away. A slow client that
/// falls behind skips the events it missed.
fn event_stream(
    session_id: Uuid,
    receiver: broadcast::Receiver<SessionEvent>,
) -> impl Stream<Item = Result<Event, Infallible>> {
    let guard = ConnectionGuard::new(session_id);

    stream::unfold((receiver, guard), |(mut receiver, guard)| async move {
        loop {
            match receiver.recv().await {
                Ok(event) => {
                    let sse = Event::default()
                        .event(event.event_name())
                        .data(event.to_sse_data());
                    return Some((Ok(sse), (receiver, guard)));
                }
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!(
                        "SSE client lagging: session={}, skipped={}",
                        guard.session_id,
                        skipped
                    );
                }
                Err(RecvError::Closed) => return None,
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use futures::StreamExt;

    #[tokio::test]
    async fn stream_ends_when_session_is_dropped() {
        let (sender, receiver) = broadcast::channel(4);
        let session_id = Uuid::new_v4();

        sender
            .send(SessionEvent::TimerTick(crate::models::timer::TimerTick {
                session_id: session_id.to_string(),
                question_index: 0,
                remaining_seconds: 29,
                timestamp: Utc::now(),
            }))
            .unwrap();
        drop(sender);

        let events: Vec<_> = event_stream(session_id, receiver).collect().await;
        assert_eq!(events.len(), 1);
    }

    #[tokio::test]
    async fn lagging_client_skips_to_newest_events() {
        let (sender, receiver) = broadcast::channel(2);
        let session_id = Uuid::new_v4();

        for remaining in [30, 29, 28, 27] {
            sender
                .send(SessionEvent::TimerTick(crate::models::timer::TimerTick {
                    session_id: session_id.to_string(),
                    question_index: 0,
                    remaining_seconds: remaining,
                    timestamp: Utc::now(),
                }))
                .unwrap();
        }
        drop(sender);

        let events: Vec<_> = event_stream(session_id, receiver).collect().await;
        assert_eq!(events.len(), 2);
    }
}
