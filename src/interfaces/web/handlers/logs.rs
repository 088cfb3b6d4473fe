use std::convert::Infallible;
use std::time::Duration;

use axum::extract::State;
use axum::response::sse::{Event, KeepAlive, Sse};
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::wrappers::errors::BroadcastStreamRecvError;
use tokio_stream::{Stream, StreamExt};

use crate::interfaces::web::AppState;

/// Live tail of the daemon's log lines. Subscribers only see lines emitted after they connect.
pub async fn stream_logs(
    State(state): State<AppState>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let lines = BroadcastStream::new(state.log_tx.subscribe()).map(|line| {
        let event = match line {
            Ok(text) => Event::default().data(text.trim_end()),
            Err(BroadcastStreamRecvError::Lagged(skipped)) => Event::default()
                .event("lagged")
                .data(format!("{} log lines dropped", skipped)),
        };
        Ok(event)
    });

    Sse::new(lines).keep_alive(KeepAlive::new().interval(Duration::from_secs(15)))
}
