use regex::Regex;

use crate::error::{NotFound, RouteError};
use crate::handlers::Handler;

pub struct Route {
    pattern: Regex,
    handler: Box<dyn Handler>,
}

impl Route {
    /// Compiles `pattern` so that it has to cover the whole path.
    pub fn new(pattern: &str, handler: impl Handler) -> Result<Self, RouteError> {
        let pattern = Regex::new(&format!("^(?:{})$", pattern)).map_err(|source| RouteError::InvalidPattern {
            pattern: pattern.to_string(),
            source,
        })?;
        Ok(Self { pattern, handler: Box::new(handler) })
    }

    pub fn matches(&self, path: &str) -> bool {
        self.pattern.is_match(path)
    }
}

/// Ordered route table. The first registered pattern that matches wins, so a
/// catch-all such as `/.*` belongs at the end.
#[derive(Default)]
pub struct Router {
    routes: Vec<Route>,
}

impl Router {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, pattern: &str, handler: impl Handler) -> Result<&mut Self, RouteError> {
        self.routes.push(Route::new(pattern, handler)?);
        Ok(self)
    }

    pub fn resolve(&self, path: &str) -> Result<&dyn Handler, NotFound> {
        self.routes
            .iter()
            .find(|route| route.matches(path))
            .map(|route| route.handler.as_ref())
            .ok_or_else(|| NotFound { path: path.to_string() })
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}
