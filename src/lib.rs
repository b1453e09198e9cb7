//! A small HTTP server written against raw TCP.
//!
//! Requests are read with a single bounded read, parsed line by line, routed by
//! regular expression and answered with a `\n`-framed response before the
//! connection is closed. Connections are served one at a time.

pub mod api;
pub mod config;
pub mod connection;
pub mod error;
pub mod handlers;
pub mod headers;
pub mod json;
pub mod recorder;
pub mod request;
pub mod response;
pub mod router;
pub mod server;
pub mod signals;

pub use handlers::{Handler, HandlerError, HandlerResult};
pub use request::Request;
pub use response::{ApiError, HttpResponse};
pub use server::App;
