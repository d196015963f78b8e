#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpStatus {
    Ok,
    MovedPermanently,
    NotModified,
    BadRequest,
    Forbidden,
    NotFound,
    RequestHeaderFieldsTooLarge,
    InternalServerError,
    NotImplemented,
    HttpVersionNotSupported,
}

impl HttpStatus {
    pub fn code(&self) -> u16 {
        match self {
            Self::Ok => 200,
            Self::MovedPermanently => 301,
            Self::NotModified => 304,
            Self::BadRequest => 400,
            Self::Forbidden => 403,
            Self::NotFound => 404,
            Self::RequestHeaderFieldsTooLarge => 431,
            Self::InternalServerError => 500,
            Self::NotImplemented => 501,
            Self::HttpVersionNotSupported => 505,
        }
    }

    pub fn text(&self) -> &'static str {
        match self {
            Self::Ok => "OK",
            Self::MovedPermanently => "Moved Permanently",
            Self::NotModified => "Not Modified",
            Self::BadRequest => "Bad Request",
            Self::Forbidden => "Forbidden",
            Self::NotFound => "Not Found",
            Self::RequestHeaderFieldsTooLarge => "Request Header Fields Too Large",
            Self::InternalServerError => "Internal Server Error",
            Self::NotImplemented => "Not Implemented",
            Self::HttpVersionNotSupported => "HTTP Version Not Supported",
        }
    }

    /// Responses with these codes never carry a body, whatever the method.
    pub fn forbids_body(&self) -> bool {
        matches!(self, Self::NotModified)
    }

    pub fn as_response_line(&self) -> String {
        format!("HTTP/1.1 {} {}\r\n", self.code(), self.text())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn response_line_has_code_and_reason() {
        assert_eq!(HttpStatus::Ok.as_response_line(), "HTTP/1.1 200 OK\r\n");
        assert_eq!(
            HttpStatus::NotFound.as_response_line(),
            "HTTP/1.1 404 Not Found\r\n"
        );
        assert_eq!(HttpStatus::NotImplemented.code(), 501);
    }

    #[test]
    fn only_not_modified_forbids_body() {
        assert!(HttpStatus::NotModified.forbids_body());
        assert!(!HttpStatus::NotFound.forbids_body());
        assert!(!HttpStatus::Ok.forbids_body());
    }
}
