use std::sync::atomic::{AtomicU64, Ordering};

const RUNNING: u64 = 1;

/// Running flag tagged with a run generation.
///
/// Bit 0 is the flag; the remaining bits count claimed runs. A loop keeps
/// going only while the state equals the token it was started with, so a loop
/// still sleeping out its dwell after `stop()` cannot resume once a newer run
/// has been claimed.
#[derive(Debug, Default)]
pub(crate) struct RunState(AtomicU64);

impl RunState {
    /// Sets the flag and returns the new run's token, or `None` if a run is active.
    pub(crate) fn claim(&self) -> Option<u64> {
        let mut current = self.0.load(Ordering::Acquire);
        loop {
            if current & RUNNING != 0 {
                return None;
            }
            let token = (current | RUNNING).wrapping_add(2);
            match self.0.compare_exchange_weak(
                current,
                token,
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => return Some(token),
                Err(actual) => current = actual,
            }
        }
    }

    pub(crate) fn is_current(&self, token: u64) -> bool {
        self.0.load(Ordering::Acquire) == token
    }

    /// True once a newer run has been claimed after `token`'s.
    pub(crate) fn is_superseded(&self, token: u64) -> bool {
        (self.0.load(Ordering::Acquire) | RUNNING) != token
    }

    pub(crate) fn is_running(&self) -> bool {
        self.0.load(Ordering::Acquire) & RUNNING != 0
    }

    /// Clears the flag, whichever run holds it.
    pub(crate) fn stop(&self) {
        self.0.fetch_and(!RUNNING, Ordering::AcqRel);
    }

    /// Clears the flag only if `token` still owns it.
    pub(crate) fn release(&self, token: u64) {
        let _ = self
            .0
            .compare_exchange(token, token & !RUNNING, Ordering::AcqRel, Ordering::Acquire);
    }
}
