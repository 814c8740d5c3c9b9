use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::watch;
use tracing::debug;

/// Shared view of Ctrl-C for the whole process.
///
/// One watcher task listens for the signal. While a child process is running
/// (a [`BusyGuard`] is alive) the signal is only broadcast, and the executor
/// that owns the child kills it and unwinds. Otherwise the `on_idle` callback
/// runs, which is expected to clean up and exit.
#[derive(Clone)]
pub struct InterruptHandle {
    rx: watch::Receiver<bool>,
    busy: Arc<AtomicBool>,
}

impl InterruptHandle {
    /// Spawns the watcher task. Must be called from inside a tokio runtime.
    pub fn install<F>(on_idle: F) -> Self
    where
        F: Fn() + Send + Sync + 'static,
    {
        let (tx, rx) = watch::channel(false);
        let busy = Arc::new(AtomicBool::new(false));
        let watcher_busy = Arc::clone(&busy);

        tokio::spawn(async move {
            while tokio::signal::ctrl_c().await.is_ok() {
                let _ = tx.send(true);
                if watcher_busy.load(Ordering::SeqCst) {
                    debug!("interrupt forwarded to running child");
                } else {
                    on_idle();
                }
            }
        });

        Self { rx, busy }
    }

    /// A handle that never fires.
    #[cfg(test)]
    pub fn inert() -> Self {
        let (_tx, rx) = watch::channel(false);
        Self {
            rx,
            busy: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Marks a child process as in flight until the guard drops.
    pub fn busy(&self) -> BusyGuard {
        self.busy.store(true, Ordering::SeqCst);
        BusyGuard {
            busy: Arc::clone(&self.busy),
        }
    }

    #[cfg(test)]
    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::SeqCst)
    }

    /// Resolves once Ctrl-C has been seen. Pending forever on an inert handle.
    pub async fn interrupted(&mut self) {
        loop {
            if *self.rx.borrow_and_update() {
                return;
            }
            if self.rx.changed().await.is_err() {
                std::future::pending::<()>().await;
            }
        }
    }

    #[cfg(test)]
    pub fn manual() -> (watch::Sender<bool>, Self) {
        let (tx, rx) = watch::channel(false);
        (
            tx,
            Self {
                rx,
                busy: Arc::new(AtomicBool::new(false)),
            },
        )
    }
}

pub struct BusyGuard {
    busy: Arc<AtomicBool>,
}

impl Drop for BusyGuard {
    fn drop(&mut self) {
        self.busy.store(false, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn busy_guard_resets_on_drop() {
        let handle = InterruptHandle::inert();
        {
            let _guard = handle.busy();
            assert!(handle.is_busy());
        }
        assert!(!handle.is_busy());
    }

    #[tokio::test]
    async fn inert_handle_never_fires() {
        let mut handle = InterruptHandle::inert();
        let fired = tokio::time::timeout(Duration::from_millis(50), handle.interrupted()).await;
        assert!(fired.is_err());
    }

    #[tokio::test]
    async fn manual_handle_fires_after_send() {
        let (tx, mut handle) = InterruptHandle::manual();
        tx.send(true).unwrap();
        tokio::time::timeout(Duration::from_millis(50), handle.interrupted())
            .await
            .expect("interrupt should be observed");
    }
}
