use std::borrow::Cow;
use std::fmt;

use serde_json::Value;
use tokio::io::{AsyncWrite, AsyncWriteExt};

use crate::headers::Headers;
use crate::json::Spaced;

pub const DEFAULT_CONTENT_TYPE: &str = "text/html";
pub const JSON_CONTENT_TYPE: &str = "application/json";

#[derive(Debug, Clone, PartialEq)]
pub enum Body {
    Text(String),
    Json(Value),
}

impl Body {
    /// The body as it goes on the wire; JSON is rendered in fixture layout.
    pub fn serialized(&self) -> Cow<'_, str> {
        match self {
            Body::Text(text) => Cow::Borrowed(text.as_str()),
            Body::Json(value) => Cow::Owned(Spaced(value).to_string()),
        }
    }
}

impl Default for Body {
    fn default() -> Self {
        Body::Text(String::new())
    }
}

impl From<&str> for Body {
    fn from(text: &str) -> Self {
        Body::Text(text.to_string())
    }
}

impl From<String> for Body {
    fn from(text: String) -> Self {
        Body::Text(text)
    }
}

impl From<Value> for Body {
    fn from(value: Value) -> Self {
        Body::Json(value)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct HttpResponse {
    pub body: Body,
    pub status_code: u16,
    pub content_type: String,
    pub headers: Headers,
}

impl Default for HttpResponse {
    fn default() -> Self {
        Self {
            body: Body::default(),
            status_code: 200,
            content_type: DEFAULT_CONTENT_TYPE.to_string(),
            headers: Headers::new(),
        }
    }
}

impl HttpResponse {
    pub fn new() -> Self {
        Self::default()
    }

    /// A response whose body is JSON, served as `application/json`.
    pub fn json(value: Value) -> Self {
        Self::new().with_body(value).with_content_type(JSON_CONTENT_TYPE)
    }

    pub fn with_status(mut self, status_code: u16) -> Self {
        self.status_code = status_code;
        self
    }

    pub fn with_content_type(mut self, content_type: &str) -> Self {
        self.content_type = content_type.to_string();
        self
    }

    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        self.headers.insert(name, value);
        self
    }

    pub fn with_body(mut self, body: impl Into<Body>) -> Self {
        self.body = body.into();
        self
    }

    /// The complete wire message.
    pub fn to_wire(&self) -> Vec<u8> {
        self.to_string().into_bytes()
    }
}

/// Frames the response with bare `\n` line endings, which existing clients
/// and fixtures expect byte for byte.
impl fmt::Display for HttpResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let body = self.body.serialized();
        write!(
            f,
            "HTTP/1.1 {}\nContent-Type: {}; charset=utf-8\nContent-Length: {}\nConnection: close\n{}\n{}",
            self.status_code,
            self.content_type,
            body.len(),
            self.headers,
            body
        )
    }
}

/// A failure that a handler signals with a full response shape.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiError(pub HttpResponse);

impl ApiError {
    pub fn new(body: Value, status_code: u16) -> Self {
        Self(HttpResponse::json(body).with_status(status_code))
    }

    pub fn with_header(self, name: &str, value: &str) -> Self {
        Self(self.0.with_header(name, value))
    }

    pub fn status_code(&self) -> u16 {
        self.0.status_code
    }
}

impl From<ApiError> for HttpResponse {
    fn from(err: ApiError) -> Self {
        err.0
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "api error {}: {}", self.0.status_code, self.0.body.serialized())
    }
}

/// Sends one complete response and closes the write half.
#[derive(Debug)]
pub struct ResponseWriter<W> {
    writer: W,
}

impl<W: AsyncWrite + Unpin> ResponseWriter<W> {
    pub fn from(writer: W) -> Self {
        Self { writer }
    }

    /// Writes the whole message in one go and returns the bytes sent.
    pub async fn write_all(&mut self, response: &HttpResponse) -> Result<Vec<u8>, std::io::Error> {
        let wire = response.to_wire();
        self.writer.write_all(&wire).await?;
        self.writer.flush().await?;
        Ok(wire)
    }

    /// Shuts down the write half. A peer that already hung up is not an error.
    pub async fn finish(&mut self) {
        if let Err(e) = self.writer.shutdown().await {
            tracing::debug!(cause = %e, "write half already closed");
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use serde_json::json;

    #[test]
    fn defaults() {
        let response = HttpResponse::new();
        assert_eq!(response.status_code, 200);
        assert_eq!(response.content_type, "text/html");
        assert!(response.headers.is_empty());
        assert_eq!(response.to_string(), "HTTP/1.1 200\nContent-Type: text/html; charset=utf-8\nContent-Length: 0\nConnection: close\n\n");
    }

    #[test]
    fn json_body_is_framed() {
        let response = HttpResponse::json(json!({"ok": true, "ping": "pong!"}));
        let expected = "HTTP/1.1 200\n\
                        Content-Type: application/json; charset=utf-8\n\
                        Content-Length: 29\n\
                        Connection: close\n\
                        \n\
                        {\"ok\": true, \"ping\": \"pong!\"}";
        assert_eq!(response.to_string(), expected);
    }

    #[test]
    fn extra_headers_follow_mandatory_ones() {
        let response: HttpResponse = ApiError::new(json!({"ok": false, "error": "GET not supported."}), 405)
            .with_header("Allow", "POST")
            .into();
        let wire = response.to_string();
        assert!(wire.starts_with("HTTP/1.1 405\n"));
        assert!(wire.contains("Connection: close\nAllow: POST\n\n{\"ok\": false"));
        assert!(!wire.contains('\r'));
    }

    #[test]
    fn content_length_counts_bytes() {
        let response = HttpResponse::new().with_body("héllo");
        assert!(response.to_string().contains("Content-Length: 6\n"));
    }

    #[test]
    fn building_twice_is_identical() {
        let response = HttpResponse::json(json!({"ok": false, "b": [1, 2], "a": "x"}))
            .with_status(418)
            .with_header("X-One", "1")
            .with_header("X-Two", "2");
        assert_eq!(response.to_wire(), response.to_wire());
        assert_eq!(response.to_wire(), response.clone().to_wire());
    }

    #[tokio::test]
    async fn writer_sends_wire_bytes_and_closes() {
        let (client, server) = tokio::io::duplex(1024);
        let mut writer = ResponseWriter::from(server);
        let response = HttpResponse::new().with_body("hi");
        let sent = writer.write_all(&response).await.unwrap();
        writer.finish().await;

        let mut received = Vec::new();
        let mut client = client;
        tokio::io::AsyncReadExt::read_to_end(&mut client, &mut received).await.unwrap();
        assert_eq!(received, sent);
        assert_eq!(received, response.to_wire());
    }

    #[tokio::test]
    async fn finish_after_peer_hung_up_is_quiet() {
        let (client, server) = tokio::io::duplex(1024);
        drop(client);
        let mut writer = ResponseWriter::from(server);
        assert!(writer.write_all(&HttpResponse::new()).await.is_err());
        writer.finish().await;
    }
}
