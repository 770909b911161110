//! Inbound LINE webhook.
//!
//! Every request is acknowledged with 200 right away; text messages are
//! queued for the dispatcher and everything else is dropped.

use axum::{
    Router,
    body::Bytes,
    extract::State,
    http::StatusCode,
    routing::{get, post},
};
use serde::Deserialize;
use tokio::sync::mpsc::UnboundedSender;
use tracing::{debug, warn};

use crate::dispatch::InboundMessage;

#[derive(Debug, Deserialize)]
struct WebhookBody {
    #[serde(default)]
    events: Vec<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
enum Event {
    Message(MessageEvent),
    #[serde(other)]
    Other,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct MessageEvent {
    reply_token: String,
    #[serde(default)]
    source: Source,
    message: MessageContent,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Source {
    user_id: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
enum MessageContent {
    Text { text: String },
    #[serde(other)]
    Other,
}

impl MessageEvent {
    fn into_inbound(self) -> Option<InboundMessage> {
        let MessageContent::Text { text } = self.message else {
            return None;
        };
        Some(InboundMessage {
            sender: self.source.user_id?,
            text,
            reply_token: self.reply_token,
        })
    }
}

#[derive(Debug, Clone)]
pub struct AppState {
    pub tx: UnboundedSender<InboundMessage>,
}

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/webhook", post(webhook))
        .route("/health", get(health))
        .with_state(state)
}

async fn health() -> &'static str {
    "ok"
}

async fn webhook(State(state): State<AppState>, body: Bytes) -> StatusCode {
    let body: WebhookBody = match serde_json::from_slice(&body) {
        Ok(body) => body,
        Err(e) => {
            warn!(error = %e, "Unparseable webhook body");
            return StatusCode::OK;
        }
    };

    for raw in body.events {
        let event = match serde_json::from_value::<Event>(raw) {
            Ok(Event::Message(event)) => event,
            Ok(Event::Other) => continue,
            Err(e) => {
                debug!(error = %e, "Skipping malformed event");
                continue;
            }
        };
        let Some(msg) = event.into_inbound() else {
            continue;
        };
        if state.tx.send(msg).is_err() {
            warn!("Dispatcher is gone, dropping message");
        }
    }
    StatusCode::OK
}
