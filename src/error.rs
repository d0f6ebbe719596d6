use axum::{
    http::{ header, StatusCode },
    response::{ IntoResponse, Response },
};
use std::error::Error as StdError;
use thiserror::Error;

/// Text returned to the caller for every failure that is not the caller's fault.
pub const GENERIC_FAILURE: &str = "Failed to fetch a response from the upstream model";

#[derive(Debug, Error)]
pub enum RelayError {
    #[error("invalid conversation: {0}")]
    InvalidConversation(String),

    #[error("credential variable '{0}' is not set")]
    MissingCredential(String),

    #[error("credential is not a valid header value")]
    InvalidCredential,

    #[error("failed to build upstream HTTP client: {0}")]
    ClientInit(#[source] reqwest::Error),

    #[error("upstream request failed: {0}")]
    Dispatch(#[source] reqwest::Error),

    #[error("upstream responded with status {0}")]
    UpstreamStatus(reqwest::StatusCode),

    #[error("upstream stream failed: {0}")]
    Stream(#[source] Box<dyn StdError + Send + Sync>),
}

impl RelayError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            RelayError::InvalidConversation(_) => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for RelayError {
    fn into_response(self) -> Response {
        let body = match &self {
            RelayError::InvalidConversation(_) => self.to_string(),
            _ => GENERIC_FAILURE.to_string(),
        };
        (self.status_code(), [(header::CONTENT_TYPE, "text/plain; charset=utf-8")], body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;

    #[tokio::test]
    async fn upstream_failures_map_to_generic_500() {
        let resp = RelayError::UpstreamStatus(reqwest::StatusCode::UNAUTHORIZED).into_response();
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&body[..], GENERIC_FAILURE.as_bytes());
    }

    #[tokio::test]
    async fn missing_credential_does_not_name_the_variable() {
        let resp = RelayError::MissingCredential("OPENROUTER_API_KEY".into()).into_response();
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        assert!(!String::from_utf8_lossy(&body).contains("OPENROUTER_API_KEY"));
    }

    #[test]
    fn client_init_failure_is_not_reported_as_a_request_failure() {
        let builder_err = reqwest::Client::new().get("not a url").build().unwrap_err();
        let err = RelayError::ClientInit(builder_err);
        assert!(err.to_string().starts_with("failed to build upstream HTTP client"), "{}", err);
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[tokio::test]
    async fn invalid_conversation_is_a_400_with_reason() {
        let resp = RelayError::InvalidConversation("conversation must not be empty".into()).into_response();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let body = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&body[..], b"invalid conversation: conversation must not be empty");
    }
}
