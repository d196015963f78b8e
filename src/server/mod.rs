pub mod config;
pub mod connection;
mod directory_listing;
pub mod http_status;
pub mod isolation;
pub mod mime;
pub mod request;
pub mod response;
pub mod shutdown;
pub mod static_files;

use libc::{FD_ISSET, FD_SET, FD_ZERO, fd_set, pselect, timespec};
use log::{debug, error, info, warn};
use std::collections::HashMap;
use std::io;
use std::net::{SocketAddr, TcpListener};
use std::os::fd::{AsRawFd, RawFd};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};
use threadpool::ThreadPool;

use config::ServerConfig;
use connection::{PendingConnection, ReadProgress, RequestPipeline, respond};
use isolation::{CrossOriginIsolation, ServerHeaders};
use mime::MimeTable;
use shutdown::ShutdownToken;
use static_files::FileResponder;

/// Upper bound on how long the accept loop sleeps before rechecking shutdown.
const POLL_INTERVAL: Duration = Duration::from_millis(250);

const MIN_WORKERS: usize = 4;

pub struct HttpServer {
    listener: TcpListener,
    local_addr: SocketAddr,
    pipeline: Arc<RequestPipeline>,
    thread_pool: ThreadPool,
}

impl HttpServer {
    /// Binds the listening socket. Failure here is fatal for the caller.
    pub fn bind(config: &ServerConfig, document_root: PathBuf) -> io::Result<Self> {
        let addr = config.bind_addr();
        let listener = TcpListener::bind(&addr)?;
        listener.set_nonblocking(true)?;
        let local_addr = listener.local_addr()?;

        info!("Server bound to {}, serving {:?}", local_addr, document_root);

        let mime_types = Arc::new(MimeTable::for_web_builds());
        let pipeline = RequestPipeline::new(FileResponder::new(document_root, mime_types))
            .with_layer(ServerHeaders)
            .with_layer(CrossOriginIsolation);

        let threads = std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(MIN_WORKERS)
            .max(MIN_WORKERS);

        Ok(Self {
            listener,
            local_addr,
            pipeline: Arc::new(pipeline),
            thread_pool: ThreadPool::new(threads),
        })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    pub fn worker_count(&self) -> usize {
        self.thread_pool.max_count()
    }

    /// Accepts connections until `shutdown` fires, then waits for in-flight
    /// requests to finish. Connections still waiting for a request head are
    /// polled here and only reach the pool once the head is complete.
    pub fn run(&self, shutdown: &ShutdownToken) -> io::Result<()> {
        info!("Server running with {} threads", self.worker_count());

        let listener_fd = self.listener.as_raw_fd();
        let mut pending: HashMap<RawFd, PendingConnection> = HashMap::new();

        while !shutdown.is_triggered() {
            self.accept_new_connections(&mut pending);

            let mut watched: Vec<RawFd> = pending.keys().copied().collect();
            watched.push(listener_fd);

            for fd in wait_readable(&watched, POLL_INTERVAL)? {
                if fd != listener_fd {
                    self.handle_readable(fd, &mut pending);
                }
            }

            let now = Instant::now();
            pending.retain(|_, conn| {
                let expired = conn.is_expired(now);
                if expired {
                    debug!("Closing idle connection from {}", conn.peer_addr);
                }
                !expired
            });
        }

        info!(
            "Shutting down, closing {} idle connections and waiting for {} active requests",
            pending.len(),
            self.thread_pool.active_count()
        );
        pending.clear();
        self.thread_pool.join();
        info!("Server stopped");
        Ok(())
    }

    fn accept_new_connections(&self, pending: &mut HashMap<RawFd, PendingConnection>) {
        loop {
            match self.listener.accept() {
                Ok((stream, addr)) => {
                    if stream.as_raw_fd() as usize >= libc::FD_SETSIZE as usize {
                        warn!("Too many open connections, rejecting {}", addr);
                        continue;
                    }
                    match PendingConnection::new(stream, addr) {
                        Ok(conn) => {
                            debug!("New connection from {} (pending: {})", addr, pending.len() + 1);
                            pending.insert(conn.fd(), conn);
                        }
                        Err(e) => error!("Failed to set up connection from {}: {}", addr, e),
                    }
                }
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => return,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => return,
                Err(e) => {
                    error!("Error accepting connection: {}", e);
                    return;
                }
            }
        }
    }

    fn handle_readable(&self, fd: RawFd, pending: &mut HashMap<RawFd, PendingConnection>) {
        let Some(conn) = pending.get_mut(&fd) else {
            return;
        };
        let peer_addr = conn.peer_addr;

        match conn.read_available() {
            Ok(ReadProgress::Waiting) => {}
            Ok(ReadProgress::Complete(request)) => {
                if let Some(conn) = pending.remove(&fd) {
                    let pipeline = Arc::clone(&self.pipeline);
                    self.thread_pool.execute(move || {
                        respond(conn, request, &pipeline);
                    });
                }
            }
            Ok(ReadProgress::Closed) => {
                debug!("Connection closed by client {}", peer_addr);
                pending.remove(&fd);
            }
            Err(e) => {
                error!("Error reading from {}: {}", peer_addr, e);
                pending.remove(&fd);
            }
        }
    }
}

/// Waits until any of `fds` is readable, the timeout passes, or a signal
/// arrives. Returns the readable descriptors.
fn wait_readable(fds: &[RawFd], timeout: Duration) -> io::Result<Vec<RawFd>> {
    let mut read_set: fd_set = unsafe { std::mem::zeroed() };
    unsafe { FD_ZERO(&mut read_set) };

    let mut max_fd = -1;
    for &fd in fds {
        unsafe { FD_SET(fd, &mut read_set) };
        max_fd = max_fd.max(fd);
    }

    let timeout = timespec {
        tv_sec: timeout.as_secs() as _,
        tv_nsec: timeout.subsec_nanos() as _,
    };

    let ready_count = unsafe {
        pselect(
            max_fd + 1,
            &mut read_set,
            std::ptr::null_mut(),
            std::ptr::null_mut(),
            &timeout,
            std::ptr::null(),
        )
    };

    if ready_count < 0 {
        let err = io::Error::last_os_error();
        if err.kind() == io::ErrorKind::Interrupted {
            return Ok(Vec::new());
        }
        return Err(err);
    }

    Ok(fds
        .iter()
        .copied()
        .filter(|&fd| unsafe { FD_ISSET(fd, &read_set) })
        .collect())
}
