use std::fmt;

use crate::request::Request;
use crate::response::{ApiError, HttpResponse};

/// Why a handler did not produce its regular response.
///
/// `Api` carries the exact response to send. `Unexpected` is reported to the
/// client only as a bare 500; its detail stays in the server log.
#[derive(Debug)]
pub enum HandlerError {
    Api(ApiError),
    Unexpected(anyhow::Error),
}

impl From<ApiError> for HandlerError {
    fn from(err: ApiError) -> Self {
        HandlerError::Api(err)
    }
}

impl From<anyhow::Error> for HandlerError {
    fn from(err: anyhow::Error) -> Self {
        HandlerError::Unexpected(err)
    }
}

impl fmt::Display for HandlerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HandlerError::Api(err) => fmt::Display::fmt(err, f),
            HandlerError::Unexpected(err) => write!(f, "unexpected handler error: {:#}", err),
        }
    }
}

pub type HandlerResult = Result<HttpResponse, HandlerError>;

pub trait Handler: Send + Sync + 'static {
    fn handle(&self, req: &Request) -> HandlerResult;
}

impl<F> Handler for F
where
    F: Fn(&Request) -> HandlerResult + Send + Sync + 'static,
{
    fn handle(&self, req: &Request) -> HandlerResult {
        self(req)
    }
}
