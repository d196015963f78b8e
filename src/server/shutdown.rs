use libc::c_int;
use std::io;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

static INTERRUPTED: AtomicBool = AtomicBool::new(false);

/// First signal requests a graceful stop; the default disposition is
/// restored so a second one terminates immediately.
extern "C" fn on_interrupt(signal: c_int) {
    INTERRUPTED.store(true, Ordering::SeqCst);
    unsafe { libc::signal(signal, libc::SIG_DFL) };
}

/// Cancellation token polled by the accept loop.
///
/// A token built with [`ShutdownToken::on_interrupt`] also fires when the
/// process receives `SIGINT` or `SIGTERM`.
#[derive(Debug, Clone, Default)]
pub struct ShutdownToken {
    requested: Arc<AtomicBool>,
    watch_signals: bool,
}

impl ShutdownToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Installs `SIGINT`/`SIGTERM` handlers and returns a token tied to them.
    pub fn on_interrupt() -> io::Result<Self> {
        for signal in [libc::SIGINT, libc::SIGTERM] {
            let handler = on_interrupt as extern "C" fn(c_int) as libc::sighandler_t;
            let previous = unsafe { libc::signal(signal, handler) };
            if previous == libc::SIG_ERR {
                return Err(io::Error::last_os_error());
            }
        }

        Ok(Self {
            requested: Arc::new(AtomicBool::new(false)),
            watch_signals: true,
        })
    }

    pub fn trigger(&self) {
        self.requested.store(true, Ordering::SeqCst);
    }

    pub fn is_triggered(&self) -> bool {
        self.requested.load(Ordering::SeqCst)
            || (self.watch_signals && INTERRUPTED.load(Ordering::SeqCst))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trigger_is_shared_between_clones() {
        let token = ShutdownToken::new();
        let clone = token.clone();
        assert!(!clone.is_triggered());

        token.trigger();
        assert!(clone.is_triggered());
    }

    #[test]
    fn handler_restores_default_disposition() {
        let handler = on_interrupt as extern "C" fn(c_int) as libc::sighandler_t;
        unsafe { libc::signal(libc::SIGUSR2, handler) };

        on_interrupt(libc::SIGUSR2);
        INTERRUPTED.store(false, Ordering::SeqCst);

        let previous = unsafe { libc::signal(libc::SIGUSR2, libc::SIG_DFL) };
        assert_eq!(previous, libc::SIG_DFL);
    }

    #[test]
    fn plain_token_ignores_signal_flag() {
        let token = ShutdownToken::new();
        INTERRUPTED.store(true, Ordering::SeqCst);
        let triggered = token.is_triggered();
        INTERRUPTED.store(false, Ordering::SeqCst);
        assert!(!triggered);
    }
}
