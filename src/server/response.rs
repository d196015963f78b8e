use chrono::{DateTime, Utc};
use std::fs::File;
use std::io::{self, Read, Write};

use super::http_status::HttpStatus;

pub const SERVER_NAME: &str = concat!("coi-serve/", env!("CARGO_PKG_VERSION"));

const HTTP_DATE_FORMAT: &str = "%a, %d %b %Y %H:%M:%S GMT";

pub enum Body {
    Empty,
    Bytes(Vec<u8>),
    File { file: File, len: u64 },
}

impl Body {
    pub fn len(&self) -> u64 {
        match self {
            Self::Empty => 0,
            Self::Bytes(bytes) => bytes.len() as u64,
            Self::File { len, .. } => *len,
        }
    }
}

pub struct Response {
    pub status: HttpStatus,
    headers: Vec<(String, String)>,
    pub body: Body,
    /// Set for HEAD requests: the head is sent as for GET, the body is not.
    pub head_only: bool,
}

impl Response {
    pub fn new(status: HttpStatus) -> Self {
        Self {
            status,
            headers: Vec::new(),
            body: Body::Empty,
            head_only: false,
        }
    }

    pub fn error(status: HttpStatus) -> Self {
        let body = format!(
            "<!DOCTYPE html>\n<html>\n<head><title>Error response</title></head>\n<body>\n<h1>Error response</h1>\n<p>Error code: {}</p>\n<p>Message: {}.</p>\n</body>\n</html>\n",
            status.code(),
            status.text()
        );
        Self::new(status)
            .with_header("Content-Type", "text/html;charset=utf-8")
            .with_body(Body::Bytes(body.into_bytes()))
    }

    pub fn redirect(location: &str) -> Self {
        Self::new(HttpStatus::MovedPermanently).with_header("Location", location)
    }

    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        self.add_header(name, value);
        self
    }

    pub fn with_body(mut self, body: Body) -> Self {
        self.body = body;
        self
    }

    /// Appends a header after the ones already queued.
    pub fn add_header(&mut self, name: &str, value: &str) {
        self.headers.push((name.to_string(), value.to_string()));
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn headers(&self) -> &[(String, String)] {
        &self.headers
    }

    fn sends_body(&self) -> bool {
        !self.head_only && !self.status.forbids_body()
    }

    /// Queues `Content-Length` and `Connection` unless already queued.
    pub fn queue_framing_headers(&mut self) {
        if !self.status.forbids_body() && self.header("Content-Length").is_none() {
            let len = self.body.len().to_string();
            self.add_header("Content-Length", &len);
        }
        if self.header("Connection").is_none() {
            self.add_header("Connection", "close");
        }
    }

    pub fn head_bytes(&self) -> Vec<u8> {
        let mut head = self.status.as_response_line();
        for (name, value) in &self.headers {
            head.push_str(&format!("{}: {}\r\n", name, value));
        }
        head.push_str("\r\n");
        head.into_bytes()
    }

    /// Writes the whole response, returning the number of body bytes sent.
    pub fn write_to<W: Write>(mut self, writer: &mut W) -> io::Result<u64> {
        self.queue_framing_headers();
        writer.write_all(&self.head_bytes())?;

        let sends_body = self.sends_body();
        let sent = match self.body {
            _ if !sends_body => 0,
            Body::Empty => 0,
            Body::Bytes(bytes) => {
                writer.write_all(&bytes)?;
                bytes.len() as u64
            }
            Body::File { file, len } => {
                let copied = io::copy(&mut file.take(len), writer)?;
                if copied < len {
                    return Err(io::Error::new(
                        io::ErrorKind::UnexpectedEof,
                        format!("file shrank while sending ({} of {} bytes)", copied, len),
                    ));
                }
                copied
            }
        };

        writer.flush()?;
        Ok(sent)
    }
}

pub fn http_date(time: DateTime<Utc>) -> String {
    time.format(HTTP_DATE_FORMAT).to_string()
}

pub fn parse_http_date(value: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc2822(value)
        .ok()
        .map(|t| t.with_timezone(&Utc))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn written(response: Response) -> String {
        let mut out = Vec::new();
        response.write_to(&mut out).unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn headers_keep_insertion_order() {
        let text = written(
            Response::new(HttpStatus::Ok)
                .with_header("Content-Type", "text/html")
                .with_header("X-Extra", "1")
                .with_body(Body::Bytes(b"<html></html>".to_vec())),
        );
        assert_eq!(
            text,
            "HTTP/1.1 200 OK\r\nContent-Type: text/html\r\nX-Extra: 1\r\nContent-Length: 13\r\nConnection: close\r\n\r\n<html></html>"
        );
    }

    #[test]
    fn head_only_keeps_length_but_drops_body() {
        let mut response = Response::new(HttpStatus::Ok).with_body(Body::Bytes(b"abc".to_vec()));
        response.head_only = true;
        let text = written(response);
        assert!(text.contains("Content-Length: 3\r\n"));
        assert!(text.ends_with("\r\n\r\n"));
    }

    #[test]
    fn framing_queued_early_keeps_its_position() {
        let mut response = Response::new(HttpStatus::Ok).with_body(Body::Bytes(b"abc".to_vec()));
        response.queue_framing_headers();
        response.add_header("X-Late", "1");
        let text = written(response);
        assert!(text.ends_with("Content-Length: 3\r\nConnection: close\r\nX-Late: 1\r\n\r\nabc"));
        assert_eq!(text.matches("Content-Length").count(), 1);
    }

    #[test]
    fn not_modified_has_no_length_or_body() {
        let text = written(Response::new(HttpStatus::NotModified));
        assert!(!text.contains("Content-Length"));
        assert!(text.starts_with("HTTP/1.1 304 Not Modified\r\n"));
    }

    #[test]
    fn error_page_mentions_code() {
        let response = Response::error(HttpStatus::NotFound);
        assert_eq!(response.header("content-type"), Some("text/html;charset=utf-8"));
        assert!(written(response).contains("Error code: 404"));
    }

    #[test]
    fn http_dates() {
        let t = Utc.with_ymd_and_hms(2026, 10, 17, 8, 5, 9).unwrap();
        assert_eq!(http_date(t), "Sat, 17 Oct 2026 08:05:09 GMT");
        assert_eq!(parse_http_date("Sat, 17 Oct 2026 08:05:09 GMT"), Some(t));
        assert_eq!(parse_http_date("yesterday"), None);
    }
}
