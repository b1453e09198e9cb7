use core::fmt;

use crate::error::ParseError;

/// Header map that keeps insertion order.
///
/// Requests store their keys upper-cased so lookups never depend on the casing a
/// client used; responses keep whatever casing the handler chose.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Headers(Vec<(String, String)>);

impl Headers {
    pub fn new() -> Self {
        Self(Vec::new())
    }

    /// Inserts a header, replacing an existing entry with the same key in place.
    pub fn insert(&mut self, k: &str, v: &str) -> Option<String> {
        match self.0.iter_mut().find(|(key, _)| key == k) {
            Some((_, value)) => Some(std::mem::replace(value, v.to_string())),
            None => {
                self.0.push((k.to_string(), v.to_string()));
                None
            }
        }
    }

    pub fn get(&self, k: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(k))
            .map(|(_, v)| v.as_str())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Parses one `Key: value` line into an upper-cased key and a trimmed value.
    pub fn parse_header_line(line: &str) -> Result<(String, String), ParseError> {
        let (field_name, field_value) = line
            .split_once(':')
            .ok_or_else(|| ParseError::HeaderLine(line.to_string()))?;
        Ok((field_name.trim().to_uppercase(), field_value.trim().to_string()))
    }
}

impl<K: AsRef<str>, V: AsRef<str>> FromIterator<(K, V)> for Headers {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut headers = Headers::new();
        for (k, v) in iter {
            headers.insert(k.as_ref(), v.as_ref());
        }
        headers
    }
}

impl fmt::Display for Headers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (k, v) in &self.0 {
            writeln!(f, "{}: {}", k, v)?;
        }
        Ok(())
    }
}
