//! The HTTP API: a heartbeat, the Telegram webhook and a JSON 404 fallback.

use std::sync::Arc;

use serde_json::{Map, Value, json};
use tracing::info;

use crate::config::Config;
use crate::error::{ExecutionError, RouteError};
use crate::handlers::{Handler, HandlerResult};
use crate::request::Request;
use crate::response::{ApiError, HttpResponse};
use crate::server::App;

pub const SECRET_TOKEN_HEADER: &str = "X-TELEGRAM-BOT-API-SECRET-TOKEN";

/// Receives webhook updates that passed the HTTP-level checks.
pub trait UpdateSink: Send + Sync + 'static {
    fn handle_update(&self, update: &Map<String, Value>, secret_token: &str) -> Result<(), ExecutionError>;
}

/// Accepts every update and logs it.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogSink;

impl UpdateSink for LogSink {
    fn handle_update(&self, update: &Map<String, Value>, _secret_token: &str) -> Result<(), ExecutionError> {
        info!(update_id = ?update.get("update_id"), "received update");
        Ok(())
    }
}

/// Registers the API routes; the catch-all goes last so it cannot shadow them.
pub fn build_app(config: &Config, sink: impl UpdateSink) -> Result<App, RouteError> {
    App::new()
        .with_recorder(config.recorder())
        .route("/ping", ping)?
        .route(&config.bot_route, telegram_webhook(Arc::new(sink)))?
        .route("/.*", route_404)
}

pub fn ping(_: &Request) -> HandlerResult {
    Ok(HttpResponse::json(json!({"ok": true, "ping": "pong!"})))
}

pub fn route_404(_: &Request) -> HandlerResult {
    Err(ApiError::new(json!({"ok": false}), 404).into())
}

pub fn telegram_webhook(sink: Arc<dyn UpdateSink>) -> impl Handler {
    move |req: &Request| -> HandlerResult {
        assert_post(&req.method)?;
        let update = convert_to_json_object(&req.body)?;
        let secret_token = req.headers.get(SECRET_TOKEN_HEADER).unwrap_or("");

        sink.handle_update(&update, secret_token)
            .map_err(|e| ApiError::new(json!({"ok": false, "error": e.to_string()}), 400))?;

        Ok(HttpResponse::json(json!({"ok": true})))
    }
}

pub fn assert_post(method: &str) -> Result<(), ApiError> {
    if method == "POST" {
        return Ok(());
    }
    let error = format!("{} not supported.", method);
    Err(ApiError::new(json!({"ok": false, "error": error}), 405).with_header("Allow", "POST"))
}

pub fn convert_to_json_object(body: &str) -> Result<Map<String, Value>, ApiError> {
    match serde_json::from_str::<Value>(body) {
        Ok(Value::Object(update)) => Ok(update),
        Ok(_) => Err(ApiError::new(json!({"ok": false, "error": "Unsupported JSON."}), 400)),
        Err(_) => Err(ApiError::new(json!({"ok": false, "error": "Invalid JSON."}), 400)),
    }
}
