//! Minimal LINE Messaging API client: text replies and profile lookups.

use core::{fmt, time::Duration};

use anyhow::{Context as _, Result, anyhow};
use async_trait::async_trait;
use plugin_core::Messenger;
use serde::{Deserialize, Serialize};

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ReplyBody<'a> {
    reply_token: &'a str,
    messages: [TextMessage<'a>; 1],
}

#[derive(Serialize)]
struct TextMessage<'a> {
    #[serde(rename = "type")]
    kind: &'static str,
    text: &'a str,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct Profile {
    display_name: String,
}

#[derive(Clone)]
pub struct LineClient {
    http: reqwest::Client,
    api_base: String,
    access_token: String,
}

impl fmt::Debug for LineClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LineClient")
            .field("api_base", &self.api_base)
            .finish_non_exhaustive()
    }
}

impl LineClient {
    /// Every request, connecting included, gives up after `timeout`.
    pub fn new(api_base: &str, access_token: impl Into<String>, timeout: Duration) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("building HTTP client")?;
        Ok(Self {
            http,
            api_base: api_base.trim_end_matches('/').to_owned(),
            access_token: access_token.into(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.api_base)
    }
}

async fn check(resp: reqwest::Response, what: &str) -> Result<reqwest::Response> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let body = resp.text().await.unwrap_or_default();
    Err(anyhow!("{what} failed: {status} {body}"))
}

#[async_trait]
impl Messenger for LineClient {
    async fn reply(&self, reply_token: &str, text: &str) -> Result<()> {
        let body = ReplyBody {
            reply_token,
            messages: [TextMessage { kind: "text", text }],
        };
        let resp = self
            .http
            .post(self.url("/v2/bot/message/reply"))
            .bearer_auth(&self.access_token)
            .json(&body)
            .send()
            .await
            .context("sending reply")?;
        check(resp, "reply").await?;
        Ok(())
    }

    async fn display_name(&self, user_id: &str) -> Result<String> {
        let resp = self
            .http
            .get(self.url(&format!("/v2/bot/profile/{user_id}")))
            .bearer_auth(&self.access_token)
            .send()
            .await
            .context("requesting profile")?;
        let profile: Profile = check(resp, "profile lookup")
            .await?
            .json()
            .await
            .context("parsing profile")?;
        Ok(profile.display_name)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use axum::{
        Json, Router,
        extract::{Path, State},
        http::{HeaderMap, StatusCode},
        routing::{get, post},
    };
    use serde_json::{Value, json};

    use super::*;

    const TIMEOUT: Duration = Duration::from_secs(5);

    fn client(base: &str) -> LineClient {
        LineClient::new(base, "secret-token", TIMEOUT).unwrap()
    }

    type Seen = Arc<Mutex<Vec<(Option<String>, Value)>>>;

    async fn fake_line_api() -> (String, Seen) {
        let seen: Seen = Arc::default();
        let app = Router::new()
            .route(
                "/v2/bot/message/reply",
                post(
                    |State(seen): State<Seen>, headers: HeaderMap, Json(body): Json<Value>| async move {
                        let auth = headers
                            .get("authorization")
                            .and_then(|v| v.to_str().ok())
                            .map(ToOwned::to_owned);
                        seen.lock().unwrap().push((auth, body));
                        Json(json!({}))
                    },
                ),
            )
            .route(
                "/v2/bot/profile/:user_id",
                get(|Path(user_id): Path<String>| async move {
                    if user_id == "U1" {
                        Ok(Json(json!({"userId": "U1", "displayName": "Alice"})))
                    } else {
                        Err(StatusCode::NOT_FOUND)
                    }
                }),
            )
            .with_state(Arc::clone(&seen));

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        (format!("http://{addr}/"), seen)
    }

    #[tokio::test]
    async fn reply_posts_text_message_with_bearer_token() {
        let (base, seen) = fake_line_api().await;
        let client = client(&base);

        client.reply("rt-1", "こんにちは").await.unwrap();

        let seen = seen.lock().unwrap();
        let (auth, body) = &seen[0];
        assert_eq!(auth.as_deref(), Some("Bearer secret-token"));
        assert_eq!(
            body,
            &json!({
                "replyToken": "rt-1",
                "messages": [{"type": "text", "text": "こんにちは"}]
            })
        );
    }

    #[tokio::test]
    async fn profile_lookup_returns_display_name() {
        let (base, _seen) = fake_line_api().await;
        let client = client(&base);

        assert_eq!(client.display_name("U1").await.unwrap(), "Alice");
        let err = client.display_name("U2").await.unwrap_err();
        assert!(err.to_string().contains("404"));
    }

    #[tokio::test]
    async fn silent_api_times_out_instead_of_hanging() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        // Accept connections and hold them open without ever answering.
        tokio::spawn(async move {
            let mut held = Vec::new();
            while let Ok((sock, _)) = listener.accept().await {
                held.push(sock);
            }
        });
        let client =
            LineClient::new(&format!("http://{addr}"), "t", Duration::from_millis(200)).unwrap();

        let lookup = tokio::time::timeout(Duration::from_secs(5), client.display_name("U1")).await;
        assert!(matches!(lookup, Ok(Err(_))), "lookup should fail on its own");
        let sent = tokio::time::timeout(Duration::from_secs(5), client.reply("rt", "hi")).await;
        assert!(matches!(sent, Ok(Err(_))), "reply should fail on its own");
    }

    #[test]
    fn debug_output_hides_token() {
        let client = client("https://api.line.me");
        assert!(!format!("{client:?}").contains("secret-token"));
    }
}
