//! Streaming relay: one conversation in, one upstream POST out, upstream body
//! piped back to the caller chunk by chunk.
//!
//! The upstream reader runs in its own task and hands chunks to the caller
//! through a bounded channel. A full channel suspends upstream reads; a closed
//! channel (caller went away) stops the task and drops the upstream response,
//! which releases the connection.

use axum::body::Bytes;
use axum::http::HeaderValue;
use futures::{ Stream, StreamExt };
use log::{ info, warn };
use reqwest::header::CONTENT_TYPE;
use std::error::Error as StdError;
use std::pin::Pin;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use uuid::Uuid;

use crate::config::prompt::SystemPrompt;
use crate::error::RelayError;
use crate::llm::chat::{ ChatCompletionRequest, OpenRouterChatClient };
use crate::models::chat::Conversation;

pub const DEFAULT_BUFFER: usize = 32;

pub type ByteStream = Pin<Box<dyn Stream<Item = Result<Bytes, RelayError>> + Send>>;

/// An upstream response that passed the status gate. Items arrive in upstream
/// order; an `Err` item is always the last one and means the body was cut short.
pub struct RelayResponse {
    pub request_id: Uuid,
    pub content_type: Option<HeaderValue>,
    pub body: ByteStream,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamOutcome {
    Complete,
    UpstreamFailed,
    Cancelled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Forwarded {
    pub outcome: StreamOutcome,
    pub chunks: usize,
    pub bytes: usize,
}

pub struct Relay {
    client: OpenRouterChatClient,
    system_prompt: SystemPrompt,
    buffer: usize,
}

impl Relay {
    pub fn new(client: OpenRouterChatClient, system_prompt: SystemPrompt, buffer: usize) -> Self {
        Self {
            client,
            system_prompt,
            buffer: buffer.max(1),
        }
    }

    /// Dispatches the conversation upstream. Returns once the upstream status
    /// is known: errors before that point mean nothing was relayed.
    pub async fn open(&self, conversation: Conversation) -> Result<RelayResponse, RelayError> {
        let request_id = Uuid::new_v4();
        info!("[{}] Relaying conversation of {} message(s)", request_id, conversation.len());

        let req = ChatCompletionRequest::new(self.client.model(), &self.system_prompt, conversation);
        let resp = match self.client.send(&req).await {
            Ok(resp) => resp,
            Err(e) => {
                warn!("[{}] Upstream call failed: {}", request_id, e);
                return Err(e);
            }
        };

        let content_type = resp.headers().get(CONTENT_TYPE).cloned();
        let (tx, rx) = mpsc::channel(self.buffer);
        tokio::spawn(async move {
            forward(request_id, resp.bytes_stream(), tx).await;
        });

        Ok(RelayResponse {
            request_id,
            content_type,
            body: Box::pin(ReceiverStream::new(rx)),
        })
    }
}

/// Pumps `upstream` into `tx` until the upstream ends, fails, or the receiver
/// is dropped. Chunks are passed through untouched.
pub async fn forward<S, E>(
    request_id: Uuid,
    upstream: S,
    tx: mpsc::Sender<Result<Bytes, RelayError>>
) -> Forwarded
    where S: Stream<Item = Result<Bytes, E>> + Send, E: Into<Box<dyn StdError + Send + Sync>>
{
    let mut upstream = std::pin::pin!(upstream);
    let mut chunks = 0;
    let mut bytes = 0;

    let outcome = loop {
        let next = tokio::select! {
            biased;
            _ = tx.closed() => break StreamOutcome::Cancelled,
            next = upstream.next() => next,
        };

        match next {
            Some(Ok(chunk)) => {
                let len = chunk.len();
                if tx.send(Ok(chunk)).await.is_err() {
                    break StreamOutcome::Cancelled;
                }
                chunks += 1;
                bytes += len;
            }
            Some(Err(e)) => {
                let err = RelayError::Stream(e.into());
                warn!("[{}] {} after {} byte(s)", request_id, err, bytes);
                let _ = tx.send(Err(err)).await;
                break StreamOutcome::UpstreamFailed;
            }
            None => {
                break StreamOutcome::Complete;
            }
        }
    };

    match outcome {
        StreamOutcome::Complete => {
            info!("[{}] Stream complete: {} chunk(s), {} byte(s)", request_id, chunks, bytes);
        }
        StreamOutcome::Cancelled => {
            info!("[{}] Caller went away after {} byte(s); dropping upstream", request_id, bytes);
        }
        StreamOutcome::UpstreamFailed => {}
    }

    Forwarded { outcome, chunks, bytes }
}
