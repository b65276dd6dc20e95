//! Cancellation signal shared by the fan-out and the task poller

use std::time::Duration;

use tokio::sync::watch;
use tokio::time::Instant;

/// Sender side; dropping it never cancels
#[derive(Debug)]
pub struct CancelHandle {
    tx: watch::Sender<bool>,
}

impl CancelHandle {
    /// Cancel every clone of the paired `Cancellation`
    pub fn cancel(&self) {
        let _ = self.tx.send(true);
    }
}

/// Cloneable cancellation signal with an optional deadline
#[derive(Debug, Clone)]
pub struct Cancellation {
    rx: watch::Receiver<bool>,
    deadline: Option<Instant>,
}

impl Cancellation {
    /// Create a signal and the handle that triggers it
    pub fn new() -> (CancelHandle, Cancellation) {
        let (tx, rx) = watch::channel(false);
        (
            CancelHandle { tx },
            Cancellation { rx, deadline: None },
        )
    }

    /// A signal that only fires through a deadline, if one is added
    pub fn never() -> Self {
        Self::new().1
    }

    /// Also cancel once `timeout` has elapsed; keeps the earlier deadline
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        let deadline = Instant::now() + timeout;
        self.deadline = Some(match self.deadline {
            Some(existing) => existing.min(deadline),
            None => deadline,
        });
        self
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    pub fn is_cancelled(&self) -> bool {
        *self.rx.borrow() || self.deadline.is_some_and(|d| Instant::now() >= d)
    }

    /// Resolves once cancelled or past the deadline
    pub async fn cancelled(&self) {
        let mut rx = self.rx.clone();
        let signal = async move {
            loop {
                if *rx.borrow_and_update() {
                    return;
                }
                if rx.changed().await.is_err() {
                    // Handle dropped without cancelling
                    std::future::pending::<()>().await;
                }
            }
        };

        match self.deadline {
            Some(deadline) => {
                tokio::select! {
                    _ = signal => {}
                    _ = tokio::time::sleep_until(deadline) => {}
                }
            }
            None => signal.await,
        }
    }
}
