use core::fmt;
use std::collections::BTreeMap;

use url::{Url, form_urlencoded};

use crate::error::ParseError;
use crate::headers::Headers;

/// Query parameters; a key may repeat, so each maps to every value in arrival order.
pub type Query = BTreeMap<String, Vec<String>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParserState {
    Initialized,
    ParsingHeaders,
    ParsingBody,
    Done,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestLine {
    pub method: String,
    pub target: String,
}

impl fmt::Display for RequestLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.method, self.target)
    }
}

impl RequestLine {
    /// `METHOD SP TARGET SP VERSION`; the version is checked for presence only.
    pub fn parse_request_line(line: &str) -> Result<Self, ParseError> {
        match line.split(' ').collect::<Vec<_>>().as_slice() {
            [method, target, _version] => Ok(Self {
                method: method.to_string(),
                target: target.to_string(),
            }),
            _ => Err(ParseError::RequestLine(line.to_string())),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Request {
    pub method: String,
    pub headers: Headers,
    pub path: String,
    pub query: Query,
    pub body: String,
}

impl Request {
    pub fn new(method: &str, target: &str) -> Self {
        let (path, query) = split_target(target);
        Self {
            method: method.to_string(),
            path,
            query,
            ..Default::default()
        }
    }

    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        self.headers.insert(&name.to_uppercase(), value);
        self
    }

    pub fn with_body(mut self, body: &str) -> Self {
        self.body = body.to_string();
        self
    }

    /// Parses the text of one request.
    ///
    /// Lines after the first empty line are joined into the body with their
    /// separators removed; stored fixtures depend on that layout.
    pub fn parse(raw: &str) -> Result<Self, ParseError> {
        let mut lines = raw.lines();
        let mut state = ParserState::Initialized;
        let mut request = Request::default();

        loop {
            match state {
                ParserState::Initialized => {
                    let line = lines.next().ok_or(ParseError::Empty)?;
                    let request_line = RequestLine::parse_request_line(line)?;
                    let (path, query) = split_target(&request_line.target);
                    request.method = request_line.method;
                    request.path = path;
                    request.query = query;
                    state = ParserState::ParsingHeaders;
                }
                ParserState::ParsingHeaders => match lines.next() {
                    Some("") => state = ParserState::ParsingBody,
                    Some(line) => {
                        let (k, v) = Headers::parse_header_line(line)?;
                        request.headers.insert(&k, &v);
                    }
                    None => state = ParserState::Done,
                },
                ParserState::ParsingBody => {
                    request.body = lines.by_ref().collect();
                    state = ParserState::Done;
                }
                ParserState::Done => break,
            }
        }

        Ok(request)
    }

    /// Serializes the request in the wire form [`Request::parse`] accepts.
    pub fn to_wire(&self) -> String {
        let mut target = self.path.clone();
        if !self.query.is_empty() {
            let mut serializer = form_urlencoded::Serializer::new(String::new());
            for (k, values) in &self.query {
                for v in values {
                    serializer.append_pair(k, v);
                }
            }
            target.push('?');
            target.push_str(&serializer.finish());
        }
        format!("{} {} HTTP/1.1\n{}\n{}", self.method, target, self.headers, self.body)
    }
}

/// Splits a request target into its path and decoded query.
///
/// Absolute-form targets are accepted; fragments are dropped. Parameters with a
/// blank value are skipped.
pub fn split_target(target: &str) -> (String, Query) {
    let (path, raw_query) = match Url::parse(target) {
        Ok(url) => (url.path().to_string(), url.query().unwrap_or("").to_string()),
        Err(_) => {
            let target = target.split_once('#').map_or(target, |(before, _)| before);
            match target.split_once('?') {
                Some((path, query)) => (path.to_string(), query.to_string()),
                None => (target.to_string(), String::new()),
            }
        }
    };
    (path, parse_query(&raw_query))
}

pub fn parse_query(raw: &str) -> Query {
    let mut query = Query::new();
    for (k, v) in form_urlencoded::parse(raw.as_bytes()) {
        if v.is_empty() {
            continue;
        }
        query.entry(k.into_owned()).or_default().push(v.into_owned());
    }
    query
}
