use log::{debug, error, info, warn};
use std::io::{self, Read};
use std::net::{SocketAddr, TcpStream};
use std::os::fd::{AsRawFd, RawFd};
use std::time::{Duration, Instant};

use super::isolation::ResponseLayer;
use super::request::{MAX_HEAD_SIZE, Request, RequestError, find_head_end};
use super::response::Response;
use super::static_files::FileResponder;

/// How long a connection may sit without completing its request head.
pub const HEAD_TIMEOUT: Duration = Duration::from_secs(30);
pub const WRITE_TIMEOUT: Duration = Duration::from_secs(30);

/// File responder plus the layers every response passes through before
/// its head is written.
pub struct RequestPipeline {
    responder: FileResponder,
    layers: Vec<Box<dyn ResponseLayer>>,
}

impl RequestPipeline {
    pub fn new(responder: FileResponder) -> Self {
        Self {
            responder,
            layers: Vec::new(),
        }
    }

    /// Layers run in the order they are added.
    pub fn with_layer<L: ResponseLayer + 'static>(mut self, layer: L) -> Self {
        self.layers.push(Box::new(layer));
        self
    }

    pub fn handle(&self, request: &Result<Request, RequestError>) -> Response {
        let mut response = match request {
            Ok(request) => self.responder.respond(request),
            Err(e) => {
                warn!("Rejecting request: {}", e);
                Response::error(e.status())
            }
        };
        self.finalize(&mut response);
        response
    }

    fn finalize(&self, response: &mut Response) {
        response.queue_framing_headers();
        for layer in &self.layers {
            layer.on_finalize(response);
        }
    }
}

#[derive(Debug)]
pub enum ReadProgress {
    /// Head incomplete, more bytes may follow.
    Waiting,
    Complete(Result<Request, RequestError>),
    /// Peer closed before sending anything.
    Closed,
}

/// A connection still receiving its request head. Owned by the accept loop
/// and read without blocking, so it never holds a worker thread.
pub struct PendingConnection {
    pub stream: TcpStream,
    pub peer_addr: SocketAddr,
    buffer: Vec<u8>,
    accepted_at: Instant,
}

impl PendingConnection {
    pub fn new(stream: TcpStream, peer_addr: SocketAddr) -> io::Result<Self> {
        stream.set_nonblocking(true)?;
        Ok(Self {
            stream,
            peer_addr,
            buffer: Vec::with_capacity(8192),
            accepted_at: Instant::now(),
        })
    }

    pub fn fd(&self) -> RawFd {
        self.stream.as_raw_fd()
    }

    pub fn is_expired(&self, now: Instant) -> bool {
        now.duration_since(self.accepted_at) > HEAD_TIMEOUT
    }

    pub fn read_available(&mut self) -> io::Result<ReadProgress> {
        read_head(&mut self.stream, &mut self.buffer)
    }
}

/// Reads whatever is available into `buffer` and reports whether a full
/// head has arrived. `WouldBlock` means the head is still incomplete.
pub fn read_head<R: Read>(reader: &mut R, buffer: &mut Vec<u8>) -> io::Result<ReadProgress> {
    let mut chunk = [0u8; 8192];

    loop {
        let n = match reader.read(&mut chunk) {
            Ok(n) => n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) if e.kind() == io::ErrorKind::WouldBlock => return Ok(ReadProgress::Waiting),
            Err(e) => return Err(e),
        };

        if n == 0 {
            if buffer.is_empty() {
                return Ok(ReadProgress::Closed);
            }
            break;
        }
        buffer.extend_from_slice(&chunk[..n]);

        if let Some(end) = find_head_end(buffer) {
            buffer.truncate(end);
            break;
        }
        if buffer.len() > MAX_HEAD_SIZE {
            return Ok(ReadProgress::Complete(Err(RequestError::HeadTooLarge)));
        }
    }

    let head = String::from_utf8_lossy(buffer);
    Ok(ReadProgress::Complete(Request::parse(&head)))
}

/// Builds and writes the response for a fully received request head.
/// Runs on a pool thread.
pub fn respond(
    connection: PendingConnection,
    request: Result<Request, RequestError>,
    pipeline: &RequestPipeline,
) {
    let PendingConnection {
        mut stream,
        peer_addr,
        ..
    } = connection;

    debug!(
        "[Thread {:?}] Responding to {}",
        std::thread::current().id(),
        peer_addr
    );

    if let Err(e) = configure_stream(&stream) {
        error!("Failed to configure connection from {}: {}", peer_addr, e);
        return;
    }

    let response = pipeline.handle(&request);
    let status = response.status;

    match response.write_to(&mut stream) {
        Ok(sent) => {
            let request_line = match &request {
                Ok(req) => format!("{} {} {}", req.method, req.path, req.version),
                Err(_) => "-".to_string(),
            };
            info!(
                "{} \"{}\" {} {}",
                peer_addr,
                request_line,
                status.code(),
                sent
            );
        }
        Err(e) => {
            error!("Error sending response to {}: {}", peer_addr, e);
        }
    }
}

fn configure_stream(stream: &TcpStream) -> io::Result<()> {
    stream.set_nonblocking(false)?;
    stream.set_write_timeout(Some(WRITE_TIMEOUT))?;
    Ok(())
}
