//! Shared cancellation token.
//!
//! `done()` yields a receiver that becomes disconnected once the token is
//! cancelled, so it can sit inside a `select!` next to data channels.

use crossbeam::channel::{bounded, Receiver, Sender};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

#[derive(Clone)]
pub struct Cancel {
    inner: Arc<Inner>,
}

struct Inner {
    flag: AtomicBool,
    trigger: Mutex<Option<Sender<()>>>,
    done: Receiver<()>,
}

impl Cancel {
    pub fn new() -> Self {
        let (tx, rx) = bounded(0);
        Self {
            inner: Arc::new(Inner {
                flag: AtomicBool::new(false),
                trigger: Mutex::new(Some(tx)),
                done: rx,
            }),
        }
    }

    /// Idempotent.
    pub fn cancel(&self) {
        self.inner.flag.store(true, Ordering::SeqCst);
        let mut trigger = self
            .inner
            .trigger
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        trigger.take();
    }

    pub fn is_cancelled(&self) -> bool {
        self.inner.flag.load(Ordering::SeqCst)
    }

    pub fn done(&self) -> &Receiver<()> {
        &self.inner.done
    }
}

impl Default for Cancel {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossbeam::channel::RecvTimeoutError;
    use std::thread;
    use std::time::Duration;

    #[test]
    fn done_blocks_until_cancelled() {
        let c = Cancel::new();
        assert!(!c.is_cancelled());
        assert_eq!(
            c.done().recv_timeout(Duration::from_millis(10)),
            Err(RecvTimeoutError::Timeout)
        );
        c.cancel();
        assert!(c.is_cancelled());
        assert_eq!(
            c.done().recv_timeout(Duration::from_millis(10)),
            Err(RecvTimeoutError::Disconnected)
        );
    }

    #[test]
    fn clones_share_state() {
        let c = Cancel::new();
        let other = c.clone();
        let handle = thread::spawn(move || other.done().recv().is_err());
        c.cancel();
        c.cancel();
        assert_eq!(handle.join().ok(), Some(true));
    }
}
