//! Remote chat-completion endpoint
//!
//! The pipeline talks to the endpoint through [`ChatEndpoint`]. The default
//! [`HttpChatEndpoint`] posts to the MindMate proxy (or the upstream messages
//! API directly) and understands both reply shapes.

use std::time::Duration;

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};

use super::message::Message;
use crate::{Error, Result};

/// Upstream API version header value
pub const API_VERSION: &str = "2023-06-01";

/// Outbound chat completion request
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChatRequest {
    pub model: String,
    /// Exchange messages in conversational order, system prompt excluded
    pub messages: Vec<Message>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system: Option<String>,
    pub max_tokens: u32,
    pub temperature: f32,
}

/// A service that turns a chat request into generated text
#[async_trait]
pub trait ChatEndpoint: Send + Sync {
    /// Check that the endpoint has what it needs to make a request
    ///
    /// # Errors
    ///
    /// Returns `Error::Misconfigured` when a credential or address is missing
    fn ensure_configured(&self) -> Result<()> {
        Ok(())
    }

    /// Send one request and return the generated text
    ///
    /// # Errors
    ///
    /// Returns `Error::Endpoint` for non-2xx replies and malformed bodies,
    /// `Error::Http` for transport failures
    async fn complete(&self, request: &ChatRequest) -> Result<String>;
}

/// Reply body from the proxy (`{content, role}`) or the upstream API (`{content: [...]}`)
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum CompletionBody {
    Proxy { content: String },
    Upstream { content: Vec<ContentBlock> },
}

#[derive(Debug, Deserialize)]
struct ContentBlock {
    #[serde(default)]
    text: Option<String>,
}

/// Error body: `{error: "..."}` from the proxy or `{error: {message}}` upstream
#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ErrorDetail {
    Text(String),
    Object { message: String },
}

/// HTTP implementation of [`ChatEndpoint`]
#[derive(Clone)]
pub struct HttpChatEndpoint {
    client: reqwest::Client,
    url: Option<String>,
    api_key: Option<SecretString>,
}

impl std::fmt::Debug for HttpChatEndpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpChatEndpoint")
            .field("url", &self.url)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .finish_non_exhaustive()
    }
}

impl HttpChatEndpoint {
    /// Create an endpoint client
    ///
    /// Missing `url` or `api_key` is not an error here; requests fail with
    /// `Error::Misconfigured` instead.
    ///
    /// # Errors
    ///
    /// Returns error if the HTTP client cannot be built
    pub fn new(url: Option<String>, api_key: Option<SecretString>, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::Config(format!("failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            url: url.filter(|u| !u.trim().is_empty()),
            api_key: api_key.filter(|k| !k.expose_secret().trim().is_empty()),
        })
    }

    /// Build from loaded configuration
    ///
    /// # Errors
    ///
    /// Returns error if the HTTP client cannot be built
    pub fn from_config(config: &crate::Config) -> Result<Self> {
        Self::new(
            config.chat.endpoint_url.clone(),
            config.chat.api_key.clone(),
            config.chat.request_timeout,
        )
    }
}

#[async_trait]
impl ChatEndpoint for HttpChatEndpoint {
    fn ensure_configured(&self) -> Result<()> {
        if self.url.is_none() {
            return Err(Error::Misconfigured("chat endpoint URL is not set".to_string()));
        }
        if self.api_key.is_none() {
            return Err(Error::Misconfigured("chat API key is not set".to_string()));
        }
        Ok(())
    }

    async fn complete(&self, request: &ChatRequest) -> Result<String> {
        self.ensure_configured()?;
        let (Some(url), Some(api_key)) = (&self.url, &self.api_key) else {
            return Err(Error::Misconfigured("chat endpoint is not configured".to_string()));
        };

        tracing::debug!(
            model = %request.model,
            messages = request.messages.len(),
            "sending chat request"
        );

        let response = self
            .client
            .post(url)
            .header("x-api-key", api_key.expose_secret())
            .header("anthropic-version", API_VERSION)
            .json(request)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            return Err(Error::Endpoint {
                status: Some(status.as_u16()),
                message: error_message(&body),
            });
        }

        parse_completion(&body)
    }
}

/// Extract generated text from a successful reply body
///
/// # Errors
///
/// Returns `Error::Endpoint` if the body has neither reply shape or carries no text
pub fn parse_completion(body: &str) -> Result<String> {
    let parsed: CompletionBody = serde_json::from_str(body).map_err(|e| Error::Endpoint {
        status: None,
        message: format!("unexpected reply body: {e}"),
    })?;

    let text = match parsed {
        CompletionBody::Proxy { content } => content,
        CompletionBody::Upstream { content } => content
            .into_iter()
            .filter_map(|block| block.text)
            .collect::<Vec<_>>()
            .join(""),
    };

    if text.trim().is_empty() {
        return Err(Error::Endpoint {
            status: None,
            message: "reply contained no text".to_string(),
        });
    }

    Ok(text)
}

/// Best-effort error message from a non-2xx body
#[must_use]
pub fn error_message(body: &str) -> String {
    match serde_json::from_str::<ErrorBody>(body) {
        Ok(ErrorBody {
            error: ErrorDetail::Text(message) | ErrorDetail::Object { message },
        }) => message,
        Err(_) if body.trim().is_empty() => "empty error body".to_string(),
        Err(_) => body.chars().take(200).collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_proxy_reply() {
        let body = r#"{"content":"Try a breathing exercise","role":"assistant"}"#;
        assert_eq!(parse_completion(body).unwrap(), "Try a breathing exercise");
    }

    #[test]
    fn parses_upstream_reply() {
        let body = r#"{"id":"msg_1","content":[{"type":"text","text":"Hello"},{"type":"text","text":" there"}]}"#;
        assert_eq!(parse_completion(body).unwrap(), "Hello there");
    }

    #[test]
    fn rejects_empty_reply() {
        let err = parse_completion(r#"{"content":"  "}"#).unwrap_err();
        assert!(matches!(err, Error::Endpoint { status: None, .. }));
    }

    #[test]
    fn rejects_unknown_shape() {
        assert!(parse_completion(r#"{"choices":[]}"#).is_err());
        assert!(parse_completion("not json").is_err());
    }

    #[test]
    fn error_message_from_proxy_and_upstream() {
        assert_eq!(error_message(r#"{"error":"API key is required"}"#), "API key is required");
        assert_eq!(
            error_message(r#"{"type":"error","error":{"type":"rate_limit_error","message":"slow down"}}"#),
            "slow down"
        );
        assert_eq!(error_message(""), "empty error body");
        assert_eq!(error_message("Bad Gateway"), "Bad Gateway");
    }

    #[test]
    fn request_omits_missing_system() {
        let request = ChatRequest {
            model: "m".to_string(),
            messages: vec![Message::user("hi")],
            system: None,
            max_tokens: 350,
            temperature: 0.7,
        };
        let json = serde_json::to_value(&request).unwrap();
        assert!(json.get("system").is_none());
        assert_eq!(json["messages"][0]["role"], "user");
        assert_eq!(json["max_tokens"], 350);
    }

    #[test]
    fn missing_credentials_are_misconfigured() {
        let endpoint =
            HttpChatEndpoint::new(Some("http://localhost".into()), None, Duration::from_secs(5)).unwrap();
        assert!(matches!(endpoint.ensure_configured(), Err(Error::Misconfigured(_))));

        let endpoint = HttpChatEndpoint::new(
            None,
            Some(SecretString::from("key".to_string())),
            Duration::from_secs(5),
        )
        .unwrap();
        assert!(matches!(endpoint.ensure_configured(), Err(Error::Misconfigured(_))));

        let endpoint = HttpChatEndpoint::new(
            Some("http://localhost".into()),
            Some(SecretString::from("key".to_string())),
            Duration::from_secs(5),
        )
        .unwrap();
        assert!(endpoint.ensure_configured().is_ok());
    }
}
