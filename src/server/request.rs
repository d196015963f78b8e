use std::fmt;

use super::http_status::HttpStatus;

pub const MAX_HEAD_SIZE: usize = 64 * 1024;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    pub method: String,
    /// Raw (still percent-encoded) path component of the target
    pub path: String,
    pub query: Option<String>,
    pub version: String,
    headers: Vec<(String, String)>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RequestError {
    Empty,
    MalformedRequestLine(String),
    MalformedHeader(String),
    UnsupportedVersion(String),
    HeadTooLarge,
}

impl RequestError {
    pub fn status(&self) -> HttpStatus {
        match self {
            Self::UnsupportedVersion(_) => HttpStatus::HttpVersionNotSupported,
            Self::HeadTooLarge => HttpStatus::RequestHeaderFieldsTooLarge,
            _ => HttpStatus::BadRequest,
        }
    }
}

impl fmt::Display for RequestError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty => write!(f, "empty request"),
            Self::MalformedRequestLine(line) => write!(f, "malformed request line: {:?}", line),
            Self::MalformedHeader(line) => write!(f, "malformed header: {:?}", line),
            Self::UnsupportedVersion(version) => write!(f, "unsupported HTTP version: {}", version),
            Self::HeadTooLarge => write!(f, "request head exceeds {} bytes", MAX_HEAD_SIZE),
        }
    }
}

impl std::error::Error for RequestError {}

impl Request {
    pub fn parse(head: &str) -> Result<Self, RequestError> {
        let mut lines = head.lines();

        let request_line = lines.next().ok_or(RequestError::Empty)?;
        if request_line.trim().is_empty() {
            return Err(RequestError::Empty);
        }

        let parts: Vec<&str> = request_line.split_whitespace().collect();
        let &[method, target, version] = parts.as_slice() else {
            return Err(RequestError::MalformedRequestLine(request_line.to_string()));
        };

        if !version.starts_with("HTTP/") {
            return Err(RequestError::MalformedRequestLine(request_line.to_string()));
        }
        if version != "HTTP/1.0" && version != "HTTP/1.1" {
            return Err(RequestError::UnsupportedVersion(version.to_string()));
        }
        if !target.starts_with('/') {
            return Err(RequestError::MalformedRequestLine(request_line.to_string()));
        }

        let target = target.split('#').next().unwrap_or_default();
        let (path, query) = match target.split_once('?') {
            Some((path, query)) => (path.to_string(), Some(query.to_string())),
            None => (target.to_string(), None),
        };

        let mut headers = Vec::new();
        for line in lines {
            if line.is_empty() {
                break;
            }
            let (name, value) = line
                .split_once(':')
                .ok_or_else(|| RequestError::MalformedHeader(line.to_string()))?;
            if name.is_empty() || name.contains(char::is_whitespace) {
                return Err(RequestError::MalformedHeader(line.to_string()));
            }
            headers.push((name.to_string(), value.trim().to_string()));
        }

        Ok(Self {
            method: method.to_string(),
            path,
            query,
            version: version.to_string(),
            headers,
        })
    }

    /// Case-insensitive header lookup, first match wins.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn is_head(&self) -> bool {
        self.method == "HEAD"
    }
}

/// Returns the length of the request head including its blank-line terminator.
pub fn find_head_end(buffer: &[u8]) -> Option<usize> {
    if let Some(i) = buffer.windows(4).position(|w| w == b"\r\n\r\n") {
        return Some(i + 4);
    }
    buffer.windows(2).position(|w| w == b"\n\n").map(|i| i + 2)
}
