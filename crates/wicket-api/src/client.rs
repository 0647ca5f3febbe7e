// SPDX-FileCopyrightText: 2026 Wicket Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP client for the support backend REST API.
//!
//! Implements [`ConversationStore`]: the fallback send path, history
//! loading, read-marking, and the conversation lifecycle endpoints.
//! Authentication is a bearer token attached as a default header.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use reqwest::{Method, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use wicket_config::model::ApiConfig;
use wicket_core::error::WicketError;
use wicket_core::traits::{ConversationStore, CredentialProvider};
use wicket_core::types::{ChatMessage, Conversation, ConversationId};

/// Wire body for the fallback send endpoint.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SendMessageRequest<'a> {
    conversation_id: ConversationId,
    content: &'a str,
}

/// Wire body for conversation creation.
#[derive(Debug, Serialize)]
struct CreateConversationRequest<'a> {
    subject: &'a str,
}

/// Error body shape the backend returns on failures.
#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    message: String,
}

/// HTTP client for the support backend.
#[derive(Debug, Clone)]
pub struct ApiClient {
    client: reqwest::Client,
    base_url: String,
}

impl ApiClient {
    /// Creates a new API client.
    ///
    /// The bearer token is read once from the credential provider and set
    /// as a default header; an absent token simply omits the header and
    /// lets the backend reject unauthenticated calls.
    pub fn new(
        config: &ApiConfig,
        credentials: &dyn CredentialProvider,
    ) -> Result<Self, WicketError> {
        let mut headers = HeaderMap::new();
        if let Some(token) = credentials.token() {
            let value = HeaderValue::from_str(&format!("Bearer {token}"))
                .map_err(|e| WicketError::Config(format!("invalid auth token header: {e}")))?;
            headers.insert(AUTHORIZATION, value);
        }

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| WicketError::Persistence {
                message: format!("failed to build HTTP client: {e}"),
                source: Some(Box::new(e)),
            })?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Overrides the base URL (for testing with wiremock).
    #[doc(hidden)]
    pub fn with_base_url(mut self, url: String) -> Self {
        self.base_url = url.trim_end_matches('/').to_string();
        self
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    /// Sends a request and decodes a JSON response, without retry.
    ///
    /// Mutating calls use this directly: one logical operation maps to
    /// exactly one backend call, so a failure is surfaced rather than
    /// silently retried.
    async fn request_json<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        body: Option<serde_json::Value>,
    ) -> Result<T, WicketError> {
        let mut req = self.client.request(method.clone(), self.url(path));
        if let Some(body) = body {
            req = req.json(&body);
        }

        let response = req.send().await.map_err(|e| WicketError::Persistence {
            message: format!("{method} {path} failed: {e}"),
            source: Some(Box::new(e)),
        })?;

        let response = check_status(response, path).await?;
        let body = response.text().await.map_err(|e| WicketError::Persistence {
            message: format!("failed to read response body for {path}: {e}"),
            source: Some(Box::new(e)),
        })?;
        serde_json::from_str(&body).map_err(|e| WicketError::Persistence {
            message: format!("failed to parse response for {path}: {e}"),
            source: Some(Box::new(e)),
        })
    }

    /// GET with a single retry on transient errors (429, 5xx).
    ///
    /// Read-only calls are safe to repeat; one retry after a short delay
    /// covers backend restarts without hiding real failures.
    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, WicketError> {
        let mut last_error = None;

        for attempt in 0..=1 {
            if attempt > 0 {
                warn!(path, "retrying GET after transient error");
                tokio::time::sleep(Duration::from_secs(1)).await;
            }

            let response = self
                .client
                .get(self.url(path))
                .send()
                .await
                .map_err(|e| WicketError::Persistence {
                    message: format!("GET {path} failed: {e}"),
                    source: Some(Box::new(e)),
                })?;

            let status = response.status();
            debug!(path, status = %status, attempt, "GET response received");

            if is_transient(status) && attempt == 0 {
                let body = response.text().await.unwrap_or_default();
                last_error = Some(WicketError::Persistence {
                    message: format!("backend returned {status}: {body}"),
                    source: None,
                });
                continue;
            }

            let response = check_status(response, path).await?;
            let body = response.text().await.map_err(|e| WicketError::Persistence {
                message: format!("failed to read response body for {path}: {e}"),
                source: Some(Box::new(e)),
            })?;
            return serde_json::from_str(&body).map_err(|e| WicketError::Persistence {
                message: format!("failed to parse response for {path}: {e}"),
                source: Some(Box::new(e)),
            });
        }

        Err(last_error.unwrap_or_else(|| WicketError::Persistence {
            message: format!("GET {path} failed after retry"),
            source: None,
        }))
    }
}

/// Maps non-2xx responses to [`WicketError::Persistence`], carrying the
/// backend's error message when the body is parseable.
async fn check_status(
    response: reqwest::Response,
    path: &str,
) -> Result<reqwest::Response, WicketError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    let message = match serde_json::from_str::<ApiErrorBody>(&body) {
        Ok(err) => format!("{path}: {} ({status})", err.message),
        Err(_) => format!("{path}: backend returned {status}: {body}"),
    };
    Err(WicketError::Persistence {
        message,
        source: None,
    })
}

fn is_transient(status: StatusCode) -> bool {
    status.as_u16() == 429 || status.is_server_error()
}

#[async_trait]
impl ConversationStore for ApiClient {
    async fn create_message(
        &self,
        conversation_id: ConversationId,
        content: &str,
    ) -> Result<ChatMessage, WicketError> {
        let body = serde_json::to_value(SendMessageRequest {
            conversation_id,
            content,
        })
        .map_err(|e| WicketError::Internal(format!("failed to encode send request: {e}")))?;
        self.request_json(Method::POST, "/api/messages", Some(body))
            .await
    }

    async fn mark_read(&self, conversation_id: ConversationId) -> Result<(), WicketError> {
        let path = format!("/api/conversations/{conversation_id}/read");
        let response = self
            .client
            .put(self.url(&path))
            .send()
            .await
            .map_err(|e| WicketError::Persistence {
                message: format!("PUT {path} failed: {e}"),
                source: Some(Box::new(e)),
            })?;
        check_status(response, &path).await?;
        Ok(())
    }

    async fn list_messages(
        &self,
        conversation_id: ConversationId,
    ) -> Result<Vec<ChatMessage>, WicketError> {
        self.get_json(&format!("/api/conversations/{conversation_id}/messages"))
            .await
    }

    async fn list_conversations(&self) -> Result<Vec<Conversation>, WicketError> {
        self.get_json("/api/conversations").await
    }

    async fn list_unassigned(&self) -> Result<Vec<Conversation>, WicketError> {
        self.get_json("/api/conversations/unassigned").await
    }

    async fn get_conversation(
        &self,
        id: ConversationId,
    ) -> Result<Conversation, WicketError> {
        self.get_json(&format!("/api/conversations/{id}")).await
    }

    async fn create_conversation(&self, subject: &str) -> Result<Conversation, WicketError> {
        let body = serde_json::to_value(CreateConversationRequest { subject })
            .map_err(|e| WicketError::Internal(format!("failed to encode request: {e}")))?;
        self.request_json(Method::POST, "/api/conversations", Some(body))
            .await
    }

    async fn assign_conversation(
        &self,
        id: ConversationId,
    ) -> Result<Conversation, WicketError> {
        self.request_json(Method::PUT, &format!("/api/conversations/{id}/assign"), None)
            .await
    }

    async fn close_conversation(
        &self,
        id: ConversationId,
    ) -> Result<Conversation, WicketError> {
        self.request_json(Method::PUT, &format!("/api/conversations/{id}/close"), None)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    struct StaticToken(Option<&'static str>);

    impl CredentialProvider for StaticToken {
        fn token(&self) -> Option<String> {
            self.0.map(|t| t.to_string())
        }
    }

    fn test_client(base_url: &str) -> ApiClient {
        ApiClient::new(&ApiConfig::default(), &StaticToken(Some("test-token")))
            .unwrap()
            .with_base_url(base_url.to_string())
    }

    fn message_body(id: i64, conversation: i64, sender: i64, content: &str) -> serde_json::Value {
        serde_json::json!({
            "id": id,
            "conversationId": conversation,
            "senderId": sender,
            "senderName": "Ada",
            "content": content,
            "sentAt": "2026-01-15T10:00:00Z",
            "isRead": false
        })
    }

    fn conversation_body(id: i64, status: &str) -> serde_json::Value {
        serde_json::json!({
            "id": id,
            "subject": "Broken booking",
            "customerId": 7,
            "customerName": "Ada",
            "status": status,
            "createdAt": "2026-01-15T09:00:00Z",
            "updatedAt": "2026-01-15T09:30:00Z",
            "unreadCount": 0
        })
    }

    #[tokio::test]
    async fn create_message_posts_once_and_returns_server_row() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/api/messages"))
            .and(header("authorization", "Bearer test-token"))
            .and(body_json(serde_json::json!({
                "conversationId": 9,
                "content": "hi"
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(message_body(501, 9, 7, "hi")))
            .expect(1)
            .mount(&server)
            .await;

        let client = test_client(&server.uri());
        let msg = client
            .create_message(ConversationId(9), "hi")
            .await
            .unwrap();
        assert_eq!(msg.id.0, 501);
        assert_eq!(msg.conversation_id, ConversationId(9));
        assert_eq!(msg.content, "hi");
    }

    #[tokio::test]
    async fn create_message_failure_is_not_retried() {
        let server = MockServer::start().await;

        // Even a transient-looking status gets exactly one attempt: the
        // fallback path must map one logical send to one backend call.
        Mock::given(method("POST"))
            .and(path("/api/messages"))
            .respond_with(ResponseTemplate::new(503).set_body_json(serde_json::json!({
                "message": "backend restarting"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = test_client(&server.uri());
        let err = client
            .create_message(ConversationId(9), "hi")
            .await
            .unwrap_err();
        assert!(matches!(err, WicketError::Persistence { .. }));
        assert!(err.to_string().contains("backend restarting"), "got: {err}");
    }

    #[tokio::test]
    async fn create_message_surfaces_closed_conversation_error() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/api/messages"))
            .respond_with(ResponseTemplate::new(409).set_body_json(serde_json::json!({
                "message": "conversation is closed"
            })))
            .mount(&server)
            .await;

        let client = test_client(&server.uri());
        let err = client
            .create_message(ConversationId(9), "hi")
            .await
            .unwrap_err();
        assert!(err.is_user_visible());
        assert!(err.to_string().contains("conversation is closed"));
    }

    #[tokio::test]
    async fn list_messages_retries_once_on_transient_error() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/api/conversations/5/messages"))
            .respond_with(ResponseTemplate::new(503))
            .up_to_n_times(1)
            .mount(&server)
            .await;

        Mock::given(method("GET"))
            .and(path("/api/conversations/5/messages"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
                message_body(1, 5, 7, "first"),
                message_body(2, 5, 8, "second"),
            ])))
            .mount(&server)
            .await;

        let client = test_client(&server.uri());
        let messages = client.list_messages(ConversationId(5)).await.unwrap();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].content, "first");
        assert_eq!(messages[1].content, "second");
    }

    #[tokio::test]
    async fn list_messages_fails_after_exhausted_retry() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/api/conversations/5/messages"))
            .respond_with(ResponseTemplate::new(500))
            .expect(2)
            .mount(&server)
            .await;

        let client = test_client(&server.uri());
        let err = client.list_messages(ConversationId(5)).await.unwrap_err();
        assert!(matches!(err, WicketError::Persistence { .. }));
    }

    #[tokio::test]
    async fn mark_read_puts_to_read_endpoint() {
        let server = MockServer::start().await;

        Mock::given(method("PUT"))
            .and(path("/api/conversations/42/read"))
            .and(header("authorization", "Bearer test-token"))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&server)
            .await;

        let client = test_client(&server.uri());
        client.mark_read(ConversationId(42)).await.unwrap();
    }

    #[tokio::test]
    async fn conversation_lifecycle_endpoints() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/api/conversations"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!([conversation_body(9, "OPEN")])),
            )
            .mount(&server)
            .await;

        Mock::given(method("POST"))
            .and(path("/api/conversations"))
            .and(body_json(serde_json::json!({"subject": "Broken booking"})))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(conversation_body(10, "OPEN")),
            )
            .mount(&server)
            .await;

        Mock::given(method("PUT"))
            .and(path("/api/conversations/10/close"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(conversation_body(10, "CLOSED")),
            )
            .mount(&server)
            .await;

        let client = test_client(&server.uri());

        let listed = client.list_conversations().await.unwrap();
        assert_eq!(listed.len(), 1);

        let created = client.create_conversation("Broken booking").await.unwrap();
        assert_eq!(created.id, ConversationId(10));

        let closed = client.close_conversation(ConversationId(10)).await.unwrap();
        assert!(closed.status.is_terminal());
    }

    #[tokio::test]
    async fn missing_token_omits_auth_header() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/api/conversations"))
            .respond_with(ResponseTemplate::new(401).set_body_json(serde_json::json!({
                "message": "unauthorized"
            })))
            .mount(&server)
            .await;

        let client = ApiClient::new(&ApiConfig::default(), &StaticToken(None))
            .unwrap()
            .with_base_url(server.uri());
        let err = client.list_conversations().await.unwrap_err();
        assert!(err.to_string().contains("unauthorized"));
    }
}
