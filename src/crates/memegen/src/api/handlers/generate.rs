//! Streaming generation endpoint handlers
//!
//! Both endpoints answer with `text/event-stream`; each progress event is one
//! `data: <json>` frame and the stream ends after the terminal event.

use axum::{
    extract::{Query, State},
    response::sse::{Event, Sse},
    Json,
};
use futures::{Stream, StreamExt};
use providers::{ImageSize, NewsCategory};
use std::convert::Infallible;

use crate::api::{
    identity::RequestIdentity,
    models::{GenerateQuery, RegenerateBody},
    routes::AppState,
};
use crate::domain::{GenerationRequest, RegenerationRequest};
use crate::execution::{progress, GenerationError, ProgressEvent, ProgressStream};

// Sent if an event ever fails to serialize, so clients still see a terminal frame.
const ENCODING_FAILURE_FRAME: &str =
    r#"{"progress":100,"status":"Error","error":"Failed to encode progress event","errorKind":"UNKNOWN"}"#;

/// Handler for GET /api/meme-generator-stream
pub async fn generate_stream(
    State(app_state): State<AppState>,
    RequestIdentity(identity): RequestIdentity,
    Query(query): Query<GenerateQuery>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let stream = match identity {
        Some(identity) => {
            let request = GenerationRequest::new(identity)
                .with_category(query.category.as_deref().and_then(parse_category))
                .with_size(
                    query
                        .size
                        .as_deref()
                        .map(ImageSize::parse_or_default)
                        .unwrap_or_default(),
                );
            app_state.pipeline.start(request)
        }
        None => progress::rejected(&GenerationError::Unauthenticated),
    };
    into_sse(stream)
}

/// Handler for POST /api/regenerate-image
pub async fn regenerate_stream(
    State(app_state): State<AppState>,
    RequestIdentity(identity): RequestIdentity,
    Json(body): Json<RegenerateBody>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let stream = match identity {
        Some(identity) => {
            let request = RegenerationRequest::new(identity, body.prompt)
                .with_size(body.size.unwrap_or_default())
                .with_article(body.article);
            app_state.pipeline.start_regeneration(request)
        }
        None => progress::rejected(&GenerationError::Unauthenticated),
    };
    into_sse(stream)
}

fn parse_category(value: &str) -> Option<NewsCategory> {
    let category = NewsCategory::parse_safe(value);
    if category.is_none() && !value.trim().is_empty() {
        tracing::debug!(category = value, "Ignoring unsupported news category");
    }
    category
}

fn into_sse(stream: ProgressStream) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    Sse::new(stream.map(|event| Ok(to_sse_event(&event))))
}

fn to_sse_event(event: &ProgressEvent) -> Event {
    Event::default().json_data(event).unwrap_or_else(|err| {
        tracing::error!(error = %err, "Failed to encode progress event");
        Event::default().data(ENCODING_FAILURE_FRAME)
    })
}
