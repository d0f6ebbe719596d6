//! Conversation client for the relay. The relay keeps no history, so the
//! session resends the whole conversation on every turn.

pub mod repl;

use futures::StreamExt;
use log::{ debug, warn };
use reqwest::{ Client as HttpClient, StatusCode };
use serde::Deserialize;
use thiserror::Error;

use crate::models::chat::ChatMessage;

pub const DEFAULT_RELAY_URL: &str = "http://127.0.0.1:3000/api/chat";
pub const GREETING: &str = "Hello, I am your AI assistant. How can I help you today?";
pub const FALLBACK_REPLY: &str = "An error occurred. Please try again.";

#[derive(Debug, Error)]
pub enum ReplyError {
    #[error("message is empty")]
    EmptyMessage,

    #[error("could not reach relay: {0}")]
    Request(#[source] reqwest::Error),

    #[error("relay responded with status {0}")]
    Status(StatusCode),

    #[error("reply was cut short after {received} byte(s): {source}")]
    Interrupted {
        received: usize,
        #[source]
        source: reqwest::Error,
    },

    #[error("reply could not be decoded: {0}")]
    Malformed(String),
}

#[derive(Deserialize)]
struct CompletionDocument {
    choices: Vec<CompletionChoice>,
}

#[derive(Deserialize)]
struct CompletionChoice {
    message: CompletionMessage,
}

#[derive(Deserialize)]
struct CompletionMessage {
    content: Option<String>,
}

#[derive(Deserialize)]
struct StreamEvent {
    choices: Vec<StreamChoice>,
}

#[derive(Deserialize)]
struct StreamChoice {
    delta: StreamDelta,
}

#[derive(Deserialize)]
struct StreamDelta {
    content: Option<String>,
}

/// Decodes an accumulated reply body. Accepts a single completion document
/// or server-sent `data:` events carrying content deltas.
pub fn decode_reply(body: &[u8]) -> Result<String, ReplyError> {
    let text = std::str::from_utf8(body).map_err(|e| ReplyError::Malformed(e.to_string()))?;
    let text = text.trim();

    if text.starts_with('{') {
        let doc: CompletionDocument = serde_json
            ::from_str(text)
            .map_err(|e| ReplyError::Malformed(e.to_string()))?;
        return doc.choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| ReplyError::Malformed("completion has no content".into()));
    }

    let mut reply = String::new();
    let mut events = 0;
    for line in text.lines() {
        let Some(data) = line.strip_prefix("data:") else {
            // comments (": keep-alive"), event names, blank separators
            continue;
        };
        let data = data.trim();
        if data == "[DONE]" {
            break;
        }
        let event: StreamEvent = serde_json
            ::from_str(data)
            .map_err(|e| ReplyError::Malformed(e.to_string()))?;
        events += 1;
        for choice in event.choices {
            if let Some(content) = choice.delta.content {
                reply.push_str(&content);
            }
        }
    }

    if events == 0 {
        return Err(ReplyError::Malformed("no completion found in reply".into()));
    }
    Ok(reply)
}

pub struct ChatSession {
    http: HttpClient,
    url: String,
    history: Vec<ChatMessage>,
}

impl ChatSession {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            http: HttpClient::new(),
            url: url.into(),
            history: vec![ChatMessage::assistant(GREETING)],
        }
    }

    pub fn history(&self) -> &[ChatMessage] {
        &self.history
    }

    /// Sends one user turn. On failure the fallback reply is recorded in
    /// place of the answer so the history keeps alternating and the session
    /// stays usable; the error is returned for the caller to report.
    pub async fn send(&mut self, text: &str) -> Result<&ChatMessage, ReplyError> {
        if text.trim().is_empty() {
            return Err(ReplyError::EmptyMessage);
        }
        self.history.push(ChatMessage::user(text));

        let outcome = self.fetch_reply().await;
        let reply = match &outcome {
            Ok(content) => ChatMessage::assistant(content.as_str()),
            Err(e) => {
                warn!("Turn failed: {}", e);
                ChatMessage::assistant(FALLBACK_REPLY)
            }
        };
        self.history.push(reply);

        match outcome {
            Ok(_) => Ok(&self.history[self.history.len() - 1]),
            Err(e) => Err(e),
        }
    }

    /// Posts the current history and reads the streamed body to its end.
    /// A transfer that stops early is an error, never a short answer.
    pub async fn fetch_reply(&self) -> Result<String, ReplyError> {
        let resp = self.http
            .post(&self.url)
            .json(&self.history)
            .send().await
            .map_err(ReplyError::Request)?;

        if resp.status() != StatusCode::OK {
            return Err(ReplyError::Status(resp.status()));
        }

        let mut body = Vec::new();
        let mut stream = resp.bytes_stream();
        while let Some(chunk) = stream.next().await {
            match chunk {
                Ok(chunk) => {
                    debug!("Received {} byte(s)", chunk.len());
                    body.extend_from_slice(&chunk);
                }
                Err(source) => {
                    return Err(ReplyError::Interrupted { received: body.len(), source });
                }
            }
        }

        decode_reply(&body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn decodes_single_completion_document() {
        let body = br#"

        {"id":"gen-1","choices":[{"index":0,"message":{"role":"assistant","content":"Hello"},"finish_reason":"stop"}]}"#;
        assert_eq!(decode_reply(body).unwrap(), "Hello");
    }

    #[test]
    fn decodes_server_sent_events() {
        let body = concat!(
            ": OPENROUTER PROCESSING\n\n",
            "data: {\"choices\":[{\"delta\":{\"role\":\"assistant\",\"content\":\"He\"}}]}\n\n",
            "data: {\"choices\":[{\"delta\":{\"content\":\"llo\"}}]}\n\n",
            "data: {\"choices\":[{\"delta\":{},\"finish_reason\":\"stop\"}]}\n\n",
            "data: [DONE]\n\n"
        );
        assert_eq!(decode_reply(body.as_bytes()).unwrap(), "Hello");
    }

    #[test]
    fn rejects_error_documents_and_garbage() {
        let bodies: [&[u8]; 4] = [
            br#"{"error":{"message":"rate limited","code":429}}"#,
            br#"{"choices":[]}"#,
            b"Hello",
            b"\xff\xfe",
        ];
        for body in bodies {
            assert!(matches!(decode_reply(body), Err(ReplyError::Malformed(_))));
        }
    }

    #[test]
    fn truncated_document_is_malformed() {
        let body = br#"{"choices":[{"message":{"content":"Hel"#;
        assert!(matches!(decode_reply(body), Err(ReplyError::Malformed(_))));
    }

    fn closed_port_url() -> String {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);
        format!("http://127.0.0.1:{}/api/chat", port)
    }

    #[tokio::test]
    async fn empty_input_is_not_sent() {
        let mut session = ChatSession::new(closed_port_url());
        assert!(matches!(session.send("   ").await, Err(ReplyError::EmptyMessage)));
        assert_eq!(session.history(), &[ChatMessage::assistant(GREETING)]);
    }

    #[tokio::test]
    async fn unreachable_relay_records_fallback() {
        let mut session = ChatSession::new(closed_port_url());
        let result = session.send("hi").await;

        assert!(matches!(result, Err(ReplyError::Request(_))));
        assert_eq!(session.history(), &[
            ChatMessage::assistant(GREETING),
            ChatMessage::user("hi"),
            ChatMessage::assistant(FALLBACK_REPLY),
        ]);
    }
}
