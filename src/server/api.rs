use crate::error::RelayError;
use crate::models::chat::Conversation;
use crate::relay::Relay;
use std::sync::Arc;
use axum::{
    body::{ Body, Bytes },
    extract::State,
    http::{ header, HeaderValue, StatusCode },
    response::{ IntoResponse, Response },
    routing::post,
    Router,
};
use tower_http::cors::{ Any, CorsLayer };
use log::{ debug, warn };

#[derive(Clone)]
pub struct AppState {
    relay: Arc<Relay>,
}

pub fn router(relay: Arc<Relay>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/api/chat", post(chat_handler))
        .layer(cors)
        .with_state(AppState { relay })
}

async fn chat_handler(State(state): State<AppState>, body: Bytes) -> Result<Response, RelayError> {
    let conversation = Conversation::from_slice(&body).map_err(|e| {
        warn!("Rejected chat request: {}", e);
        e
    })?;

    let relayed = state.relay.open(conversation).await?;
    debug!("[{}] Streaming upstream body to caller", relayed.request_id);
    let content_type = relayed.content_type.unwrap_or_else(||
        HeaderValue::from_static("application/octet-stream")
    );

    // An `Err` item aborts the chunked body, so the caller sees a truncated
    // transfer rather than a clean end.
    Ok((StatusCode::OK, [(header::CONTENT_TYPE, content_type)], Body::from_stream(relayed.body)).into_response())
}
