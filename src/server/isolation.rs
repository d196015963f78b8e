use super::response::Response;

/// A step run on every outgoing response right before its head is written.
pub trait ResponseLayer: Send + Sync {
    fn on_finalize(&self, response: &mut Response);
}

/// Opts every page into cross-origin isolation so browsers expose
/// `SharedArrayBuffer` and high-resolution timers.
#[derive(Debug, Clone, Copy, Default)]
pub struct CrossOriginIsolation;

impl CrossOriginIsolation {
    pub const HEADERS: [(&'static str, &'static str); 2] = [
        ("Cross-Origin-Embedder-Policy", "require-corp"),
        ("Cross-Origin-Opener-Policy", "same-origin"),
    ];
}

impl ResponseLayer for CrossOriginIsolation {
    fn on_finalize(&self, response: &mut Response) {
        for (name, value) in Self::HEADERS {
            response.add_header(name, value);
        }
    }
}

/// `Server` and `Date` headers.
#[derive(Debug, Clone, Copy, Default)]
pub struct ServerHeaders;

impl ResponseLayer for ServerHeaders {
    fn on_finalize(&self, response: &mut Response) {
        response.add_header("Server", super::response::SERVER_NAME);
        response.add_header("Date", &super::response::http_date(chrono::Utc::now()));
    }
}
