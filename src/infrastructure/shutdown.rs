use std::{future, time::Duration};

use tokio::sync::watch;

/// Cancellation source shared by signal handlers and audit deadlines.
#[derive(Clone)]
pub struct Shutdown {
    sender: watch::Sender<bool>,
}

/// Cooperative cancellation token handed to every suspension point of an audit.
#[derive(Clone)]
pub struct ShutdownListener {
    receiver: watch::Receiver<bool>,
}

impl Shutdown {
    pub fn new() -> (Self, ShutdownListener) {
        let (sender, receiver) = watch::channel(false);
        (Self { sender }, ShutdownListener { receiver })
    }

    pub fn subscribe(&self) -> ShutdownListener {
        ShutdownListener {
            receiver: self.sender.subscribe(),
        }
    }

    pub fn trigger(&self) {
        let _ = self.sender.send(true);
    }

    /// Triggers once `deadline` elapses, unless already triggered.
    pub fn trigger_after(&self, deadline: Duration) {
        let shutdown = self.clone();
        tokio::spawn(async move {
            tokio::time::sleep(deadline).await;
            if !*shutdown.sender.borrow() {
                tracing::warn!(target: "app", ?deadline, "audit deadline reached; cancelling");
                shutdown.trigger();
            }
        });
    }
}

impl ShutdownListener {
    /// Resolves once triggered. A dropped source never counts as a trigger.
    pub async fn notified(&mut self) {
        if self.is_triggered() {
            return;
        }
        let source_dropped = self.receiver.wait_for(|triggered| *triggered).await.is_err();
        if source_dropped {
            future::pending::<()>().await;
        }
    }

    pub fn is_triggered(&self) -> bool {
        *self.receiver.borrow()
    }
}

pub fn install_signal_handlers(shutdown: Shutdown) {
    let ctrlc = shutdown.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!(target: "app", "interrupt received; cancelling audit");
            ctrlc.trigger();
        }
    });

    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};
        let term = shutdown.clone();
        tokio::spawn(async move {
            if let Ok(mut sig) = signal(SignalKind::terminate()) {
                sig.recv().await;
                term.trigger();
            }
        });
    }
}
