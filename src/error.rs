use thiserror::Error;

/// Raised while turning raw request bytes into a [`crate::request::Request`].
///
/// Every variant is fatal for the connection: nothing is written back.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParseError {
    #[error("malformed request: no request line")]
    Empty,

    #[error("malformed request line: {0:?}")]
    RequestLine(String),

    #[error("malformed header line: {0:?}")]
    HeaderLine(String),
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("no route matches {path:?}")]
pub struct NotFound {
    pub path: String,
}

#[derive(Debug, Error)]
pub enum RouteError {
    #[error("invalid route pattern {pattern:?}: {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("please export {0} as an environment variable")]
    Missing(&'static str),

    #[error("could not cast {name} ({value}) to an integer")]
    NotAnInteger { name: &'static str, value: String },
}

/// The bot could not process an update; the message is returned to the caller.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("{0}")]
pub struct ExecutionError(pub String);
