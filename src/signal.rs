//! Signal-driven cancellation
//!
//! Termination signals never run cleanup themselves: the handler counts the
//! signal in an atomic and the owning loop observes it through a
//! [`CancelToken`] between steps and sleep slices. Fault signals cannot
//! resume the faulting code, so they get an async-signal-safe exit path
//! instead.

use crate::error::{ModswitchError, Result};
use crate::shm::shm_cname;
use nix::sys::signal::{sigaction, SaFlags, SigAction, SigHandler, SigSet, Signal};
use std::ffi::{c_int, CString};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, OnceLock};
use std::thread;
use std::time::{Duration, Instant};

/// Number of SIGINT/SIGTERM deliveries so far
static TERMINATION_SIGNALS: AtomicUsize = AtomicUsize::new(0);

/// Longest uninterrupted sleep in [`CancelToken::sleep`]. `thread::sleep`
/// restarts after EINTR, so this bounds the signal response time.
const SLEEP_SLICE: Duration = Duration::from_millis(10);

/// Channel name to unlink if the process takes a fatal fault
static FAULT_UNLINK: OnceLock<CString> = OnceLock::new();

extern "C" fn on_termination(_signum: c_int) {
    TERMINATION_SIGNALS.fetch_add(1, Ordering::SeqCst);
}

extern "C" fn on_fault(_signum: c_int) {
    // Only async-signal-safe calls from here on
    if let Some(name) = FAULT_UNLINK.get() {
        let _ = rustix::shm::shm_unlink(name.as_c_str());
    }
    // SAFETY: _exit is async-signal-safe and skips destructors
    unsafe { libc::_exit(1) }
}

fn install(signal: Signal, handler: extern "C" fn(c_int)) -> Result<()> {
    let action = SigAction::new(
        SigHandler::Handler(handler),
        SaFlags::empty(),
        SigSet::empty(),
    );
    // SAFETY: both handlers only touch atomics and async-signal-safe syscalls
    unsafe { sigaction(signal, &action) }.map_err(|e| ModswitchError::SignalInstall {
        signal: signal.as_str(),
        source: e.into(),
    })?;
    Ok(())
}

/// Cooperative cancellation flag checked by the publisher and reader loops
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    requested: Arc<AtomicBool>,
    /// Signal count at creation; `None` if signals are not watched
    signals_seen: Option<usize>,
}

impl CancelToken {
    /// A token that is only cancelled through [`CancelToken::cancel`]
    pub fn new() -> Self {
        Self::default()
    }

    /// A token that is also cancelled by SIGINT or SIGTERM delivered after
    /// this call
    pub fn on_termination() -> Result<Self> {
        let seen = TERMINATION_SIGNALS.load(Ordering::SeqCst);
        install(Signal::SIGINT, on_termination)?;
        install(Signal::SIGTERM, on_termination)?;
        Ok(Self {
            requested: Arc::new(AtomicBool::new(false)),
            signals_seen: Some(seen),
        })
    }

    pub fn cancel(&self) {
        self.requested.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.requested.load(Ordering::SeqCst)
            || self
                .signals_seen
                .is_some_and(|seen| TERMINATION_SIGNALS.load(Ordering::SeqCst) > seen)
    }

    /// Sleep for `delay` unless cancelled first.
    ///
    /// Returns `true` if the token was cancelled before or during the sleep.
    pub fn sleep(&self, delay: Duration) -> bool {
        let deadline = Instant::now() + delay;
        loop {
            if self.is_cancelled() {
                return true;
            }
            let now = Instant::now();
            if now >= deadline {
                return false;
            }
            thread::sleep((deadline - now).min(SLEEP_SLICE));
        }
    }
}

/// Exit with status 1 on SIGBUS/SIGSEGV, unlinking `channel` first if given.
///
/// The kernel releases mappings, descriptors and flock locks on exit; the
/// shm name is the only resource that would otherwise outlive the process.
pub fn install_fault_handlers(channel: Option<&str>) -> Result<()> {
    if let Some(name) = channel {
        let _ = FAULT_UNLINK.set(shm_cname(name)?);
    }
    install(Signal::SIGBUS, on_fault)?;
    install(Signal::SIGSEGV, on_fault)?;
    Ok(())
}
