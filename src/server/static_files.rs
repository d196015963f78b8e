use chrono::{DateTime, Utc};
use log::{debug, error, warn};
use percent_encoding::percent_decode_str;
use std::fs::{self, File, Metadata};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use super::directory_listing;
use super::http_status::HttpStatus;
use super::mime::MimeTable;
use super::request::Request;
use super::response::{Body, Response, http_date, parse_http_date};

const INDEX_FILES: [&str; 2] = ["index.html", "index.htm"];

/// Maps request paths onto files beneath a document root.
pub struct FileResponder {
    document_root: PathBuf,
    mime_types: Arc<MimeTable>,
}

impl FileResponder {
    pub fn new(document_root: PathBuf, mime_types: Arc<MimeTable>) -> Self {
        Self {
            document_root,
            mime_types,
        }
    }

    pub fn respond(&self, request: &Request) -> Response {
        let mut response = match request.method.as_str() {
            "GET" | "HEAD" => self.serve(request),
            method => {
                warn!("Unsupported method {} for {}", method, request.path);
                Response::error(HttpStatus::NotImplemented)
            }
        };
        response.head_only = request.is_head();
        response
    }

    fn serve(&self, request: &Request) -> Response {
        let decoded = percent_decode_str(&request.path).decode_utf8_lossy();

        let Some(relative) = resolve_path(&decoded) else {
            warn!("Path traversal attempt: {}", request.path);
            return Response::error(HttpStatus::Forbidden);
        };
        let file_path = self.document_root.join(relative);

        let metadata = match fs::metadata(&file_path) {
            Ok(meta) => meta,
            Err(e) => {
                debug!("Cannot stat {:?}: {}", file_path, e);
                return Response::error(status_for(&e));
            }
        };

        if metadata.is_dir() {
            if !request.path.ends_with('/') {
                let mut location = format!("{}/", request.path);
                if let Some(query) = &request.query {
                    location.push('?');
                    location.push_str(query);
                }
                return Response::redirect(&location);
            }

            for index in INDEX_FILES {
                let index_path = file_path.join(index);
                if let Ok(index_meta) = fs::metadata(&index_path) {
                    if index_meta.is_file() {
                        return self.serve_file(request, &index_path, &index_meta);
                    }
                }
            }

            return self.list_directory(&file_path, &decoded);
        }

        // A trailing slash names a directory; a file there does not match.
        if request.path.ends_with('/') {
            return Response::error(HttpStatus::NotFound);
        }

        self.serve_file(request, &file_path, &metadata)
    }

    fn serve_file(&self, request: &Request, file_path: &Path, metadata: &Metadata) -> Response {
        let file = match File::open(file_path) {
            Ok(file) => file,
            Err(e) => {
                error!("Error opening file {:?}: {}", file_path, e);
                return Response::error(status_for(&e));
            }
        };

        let modified = metadata.modified().ok().map(DateTime::<Utc>::from);

        if let Some(modified) = modified {
            if is_not_modified(request, modified) {
                debug!("{:?} not modified since client copy", file_path);
                return Response::new(HttpStatus::NotModified);
            }
        }

        let mut response = Response::new(HttpStatus::Ok)
            .with_header("Content-Type", self.mime_types.content_type(file_path));
        if let Some(modified) = modified {
            response.add_header("Last-Modified", &http_date(modified));
        }

        response.with_body(Body::File {
            file,
            len: metadata.len(),
        })
    }

    fn list_directory(&self, dir: &Path, url_path: &str) -> Response {
        match directory_listing::render(dir, url_path) {
            Ok(html) => Response::new(HttpStatus::Ok)
                .with_header("Content-Type", "text/html; charset=utf-8")
                .with_body(Body::Bytes(html.into_bytes())),
            Err(e) => {
                warn!("Cannot list directory {:?}: {}", dir, e);
                Response::error(status_for(&e))
            }
        }
    }
}

/// Turns a decoded URL path into a path relative to the document root.
///
/// Empty and `.` segments are dropped and `..` removes the previous segment.
/// Returns `None` when `..` would climb above the root.
pub fn resolve_path(decoded: &str) -> Option<PathBuf> {
    let mut segments: Vec<&str> = Vec::new();
    for segment in decoded.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop()?;
            }
            s if s.contains('\0') => return None,
            s => segments.push(s),
        }
    }
    Some(segments.iter().collect())
}

/// `If-Modified-Since` is only honoured without `If-None-Match`; comparison is
/// at second precision since HTTP dates carry no fraction.
fn is_not_modified(request: &Request, modified: DateTime<Utc>) -> bool {
    if request.header("If-None-Match").is_some() {
        return false;
    }
    request
        .header("If-Modified-Since")
        .and_then(parse_http_date)
        .is_some_and(|since| modified.timestamp() <= since.timestamp())
}

fn status_for(error: &io::Error) -> HttpStatus {
    match error.kind() {
        io::ErrorKind::NotFound => HttpStatus::NotFound,
        io::ErrorKind::PermissionDenied => HttpStatus::Forbidden,
        _ => HttpStatus::InternalServerError,
    }
}
