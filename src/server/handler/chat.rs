use std::io;

use axum::{
    body::Body,
    extract::{RawQuery, State},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};
use bytes::Bytes;
use futures::{StreamExt, future, stream};
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};

use crate::chat::{ChatError, SharedEngine};

use super::AppState;

enum TurnEvent {
    Fragment(String),
    Finished,
    Failed(ChatError),
}

/// `GET /chat?<inquiry>`: runs a turn and streams the answer back as it arrives.
pub async fn chat(State(state): State<AppState>, RawQuery(query): RawQuery) -> Response {
    let inquiry = match decode_inquiry(query.as_deref()) {
        Ok(inquiry) => inquiry,
        Err(response) => return response,
    };

    // the turn runs detached so a client hanging up does not cut it short
    let (events, mut received) = mpsc::unbounded_channel();
    tokio::spawn(run_turn(state.engine, inquiry, events));

    // the status line goes out only once we know whether the turn got going
    match received.recv().await {
        Some(TurnEvent::Fragment(first)) => stream_answer(first, received),
        Some(TurnEvent::Finished) => plain_text(Body::empty()),
        Some(TurnEvent::Failed(why)) => why.into_response(),
        None => StatusCode::INTERNAL_SERVER_ERROR.into_response(),
    }
}

async fn run_turn(engine: SharedEngine, inquiry: String, events: UnboundedSender<TurnEvent>) {
    let mut engine = engine.lock().await;

    let fragments = events.clone();
    let mut sink = move |fragment: &str| {
        let _ = fragments.send(TurnEvent::Fragment(fragment.to_string()));
    };

    let event = match engine.turn(inquiry, Some(&mut sink)).await {
        Ok(_) => TurnEvent::Finished,
        Err(why) => TurnEvent::Failed(why),
    };
    log::debug!(
        "turn ended as {:?}, {} exchanges on record",
        engine.state(),
        engine.history().len()
    );

    let _ = events.send(event);
}

fn stream_answer(first: String, received: UnboundedReceiver<TurnEvent>) -> Response {
    let rest = stream::unfold(received, |mut received| async move {
        match received.recv().await? {
            TurnEvent::Fragment(fragment) => Some((Ok(Bytes::from(fragment)), received)),
            // headers are already out, all that is left is to abort the body
            TurnEvent::Failed(why) => Some((Err(io::Error::other(why)), received)),
            TurnEvent::Finished => None,
        }
    });

    let body = stream::once(future::ready(Ok::<_, io::Error>(Bytes::from(first)))).chain(rest);

    plain_text(Body::from_stream(body))
}

fn plain_text(body: Body) -> Response {
    ([(header::CONTENT_TYPE, "text/plain; charset=utf-8")], body).into_response()
}

/// The whole query string is the inquiry, percent-decoded the way `decodeURIComponent` does.
fn decode_inquiry(query: Option<&str>) -> Result<String, Response> {
    let inquiry = urlencoding::decode(query.unwrap_or_default()).map_err(|why| {
        log::warn!("rejecting inquiry that is not valid UTF-8: {why}");
        (StatusCode::BAD_REQUEST, "inquiry is not valid UTF-8").into_response()
    })?;

    if inquiry.trim().is_empty() {
        return Err((StatusCode::BAD_REQUEST, "empty inquiry").into_response());
    }

    Ok(inquiry.into_owned())
}
