use std::any::Any;
use std::panic::{self, AssertUnwindSafe};

use serde_json::json;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite};
use tracing::{debug, error};

use crate::error::ParseError;
use crate::handlers::HandlerError;
use crate::recorder::Recorder;
use crate::request::Request;
use crate::response::{ApiError, HttpResponse, ResponseWriter};
use crate::router::Router;

/// Size of the single read performed per connection. Anything a client sends
/// beyond it is never looked at.
pub const READ_BUFFER_SIZE: usize = 4096;

#[derive(Debug, PartialEq, Eq)]
pub enum Outcome {
    /// The request could not be parsed; nothing was written.
    Dropped(ParseError),
    Responded { status_code: u16 },
}

pub fn not_found() -> HttpResponse {
    ApiError::new(json!({"ok": false}), 404).into()
}

pub fn internal_error() -> HttpResponse {
    ApiError::new(json!({"ok": false}), 500).into()
}

/// Serves one accepted connection from first read to shutdown of the write half.
pub async fn handle_connection<S>(mut conn: S, router: &Router, recorder: &Recorder) -> std::io::Result<Outcome>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let mut buf = [0u8; READ_BUFFER_SIZE];
    let n = conn.read(&mut buf).await?;
    let raw = String::from_utf8_lossy(&buf[..n]);
    recorder.record("request", &raw).await;

    let mut writer = ResponseWriter::from(conn);
    let request = match Request::parse(&raw) {
        Ok(request) => request,
        Err(e) => {
            debug!(cause = %e, bytes = n, "dropping malformed request");
            writer.finish().await;
            return Ok(Outcome::Dropped(e));
        }
    };
    debug!(method = %request.method, path = %request.path, "parsed request");

    let response = dispatch(router, &request);
    let wire = writer.write_all(&response).await?;
    recorder.record("response", &String::from_utf8_lossy(&wire)).await;
    writer.finish().await;

    Ok(Outcome::Responded { status_code: response.status_code })
}

/// Routes and invokes the handler, turning every kind of failure into a response.
pub fn dispatch(router: &Router, request: &Request) -> HttpResponse {
    let handler = match router.resolve(&request.path) {
        Ok(handler) => handler,
        Err(e) => {
            debug!(cause = %e, "no route");
            return not_found();
        }
    };

    match panic::catch_unwind(AssertUnwindSafe(|| handler.handle(request))) {
        Ok(Ok(response)) => response,
        Ok(Err(HandlerError::Api(err))) => err.into(),
        Ok(Err(HandlerError::Unexpected(err))) => {
            error!(method = %request.method, path = %request.path, "handler failed: {:?}", err);
            internal_error()
        }
        Err(payload) => {
            error!(method = %request.method, path = %request.path, "handler panicked: {}", panic_message(&*payload));
            internal_error()
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    payload
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| payload.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("unknown panic payload")
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::handlers::HandlerResult;
    use anyhow::anyhow;
    use tokio::io::AsyncWriteExt;

    const SECRET: &str = "db password is hunter2";

    fn router() -> Router {
        let mut router = Router::new();
        router
            .register("/ping", |_: &Request| -> HandlerResult {
                Ok(HttpResponse::json(json!({"ok": true, "ping": "pong!"})))
            })
            .unwrap()
            .register("/bot", |req: &Request| -> HandlerResult {
                if req.method != "POST" {
                    return Err(ApiError::new(json!({"ok": false}), 405).with_header("Allow", "POST").into());
                }
                Ok(HttpResponse::new().with_body(req.body.as_str()))
            })
            .unwrap()
            .register("/fails", |_: &Request| -> HandlerResult { Err(anyhow!(SECRET).into()) })
            .unwrap()
            .register("/panics", |_: &Request| -> HandlerResult { panic!("{}", SECRET) })
            .unwrap();
        router
    }

    async fn exchange(request: &[u8]) -> (std::io::Result<Outcome>, Vec<u8>) {
        let (mut client, server) = tokio::io::duplex(READ_BUFFER_SIZE * 2);
        client.write_all(request).await.unwrap();
        let outcome = handle_connection(server, &router(), &Recorder::disabled()).await;
        let mut received = Vec::new();
        client.read_to_end(&mut received).await.unwrap();
        (outcome, received)
    }

    #[tokio::test]
    async fn ping() {
        let (outcome, received) = exchange(b"GET /ping HTTP/1.1\n\n\n").await;
        assert_eq!(outcome.unwrap(), Outcome::Responded { status_code: 200 });
        let expected = "HTTP/1.1 200\n\
                        Content-Type: application/json; charset=utf-8\n\
                        Content-Length: 29\n\
                        Connection: close\n\
                        \n\
                        {\"ok\": true, \"ping\": \"pong!\"}";
        assert_eq!(String::from_utf8(received).unwrap(), expected);
    }

    #[tokio::test]
    async fn unknown_path_is_404() {
        let (outcome, received) = exchange(b"GET /nowhere HTTP/1.1\n\n").await;
        assert_eq!(outcome.unwrap(), Outcome::Responded { status_code: 404 });
        let received = String::from_utf8(received).unwrap();
        assert!(received.starts_with("HTTP/1.1 404\n"));
        assert!(received.ends_with("\n\n{\"ok\": false}"));
    }

    #[tokio::test]
    async fn api_error_passes_through() {
        let (outcome, received) = exchange(b"GET /bot HTTP/1.1\nHost: localhost\n\n").await;
        assert_eq!(outcome.unwrap(), Outcome::Responded { status_code: 405 });
        let received = String::from_utf8(received).unwrap();
        assert!(received.starts_with("HTTP/1.1 405\n"));
        assert!(received.contains("\nAllow: POST\n"));
    }

    #[tokio::test]
    async fn unexpected_errors_do_not_leak() {
        for path in ["/fails", "/panics"] {
            let request = format!("GET {} HTTP/1.1\n\n", path);
            let (outcome, received) = exchange(request.as_bytes()).await;
            assert_eq!(outcome.unwrap(), Outcome::Responded { status_code: 500 });
            let received = String::from_utf8(received).unwrap();
            assert!(received.starts_with("HTTP/1.1 500\n"));
            assert!(received.ends_with("\n\n{\"ok\": false}"));
            assert!(!received.contains("hunter2"));
        }
    }

    #[tokio::test]
    async fn empty_request_is_dropped_silently() {
        let (mut client, server) = tokio::io::duplex(64);
        client.shutdown().await.unwrap();
        let outcome = handle_connection(server, &router(), &Recorder::disabled()).await.unwrap();
        assert_eq!(outcome, Outcome::Dropped(ParseError::Empty));
        let mut received = Vec::new();
        client.read_to_end(&mut received).await.unwrap();
        assert!(received.is_empty());
    }

    #[tokio::test]
    async fn malformed_request_line_is_dropped() {
        let (outcome, received) = exchange(b"HELLO\n\n").await;
        assert!(matches!(outcome.unwrap(), Outcome::Dropped(ParseError::RequestLine(_))));
        assert!(received.is_empty());
    }

    #[tokio::test]
    async fn only_one_buffer_is_read() {
        let mut request = b"POST /bot HTTP/1.1\n\n".to_vec();
        request.extend(std::iter::repeat_n(b'x', READ_BUFFER_SIZE));
        let (outcome, received) = exchange(&request).await;
        assert_eq!(outcome.unwrap(), Outcome::Responded { status_code: 200 });
        let body_len = READ_BUFFER_SIZE - "POST /bot HTTP/1.1\n\n".len();
        assert!(String::from_utf8(received).unwrap().contains(&format!("Content-Length: {}\n", body_len)));
    }

    #[tokio::test]
    async fn exchange_is_recorded() {
        let root = tempfile::tempdir().unwrap();
        let recorder = Recorder::new(root.path());
        let (mut client, server) = tokio::io::duplex(1024);
        client.write_all(b"GET /ping HTTP/1.1\n\n\n").await.unwrap();
        handle_connection(server, &router(), &recorder).await.unwrap();

        // the two files may land in neighbouring second directories
        let find = |name: &str| {
            std::fs::read_dir(root.path())
                .unwrap()
                .map(|entry| entry.unwrap().path().join(name))
                .find(|path| path.exists())
                .map(|path| std::fs::read_to_string(path).unwrap())
                .unwrap()
        };
        let request = find("request.txt");
        let response = find("response.txt");
        assert_eq!(request, "GET /ping HTTP/1.1\n\n\n");
        assert!(response.starts_with("HTTP/1.1 200\n"));
    }
}
