//! Ctrl-C routing.
//!
//! Once a Ctrl-C handler is installed the default SIGINT behaviour is gone for
//! the rest of the process, so a single watcher owns the signal. While a
//! generation is armed the signal stops that generation; at any other time
//! (a confirmation prompt, a git subprocess) it ends the process with 130.

use crate::error::GenerateError;
use crate::ui;
use std::future::Future;
use std::sync::{Arc, Mutex};
use tokio::sync::oneshot;
use tracing::debug;

#[derive(Debug, Default)]
pub struct InterruptRouter {
    active: Mutex<Option<oneshot::Sender<()>>>,
}

impl InterruptRouter {
    pub fn new() -> Self {
        Self::default()
    }

    fn slot(&self) -> std::sync::MutexGuard<'_, Option<oneshot::Sender<()>>> {
        self.active.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Register a generation. The returned future resolves when Ctrl-C is
    /// routed to it, and never resolves after [`disarm`](Self::disarm).
    pub fn arm(&self) -> impl Future<Output = ()> {
        let (tx, rx) = oneshot::channel();
        *self.slot() = Some(tx);
        async move {
            if rx.await.is_err() {
                futures::future::pending::<()>().await;
            }
        }
    }

    pub fn disarm(&self) {
        self.slot().take();
    }

    /// Hand one Ctrl-C to the armed generation. `false` when none took it.
    pub fn route(&self) -> bool {
        match self.slot().take() {
            Some(tx) => tx.send(()).is_ok(),
            None => false,
        }
    }
}

/// Watch for Ctrl-C for the rest of the process. Must be called inside the
/// runtime. If the handler cannot be installed, SIGINT keeps its default
/// behaviour.
pub fn watch(router: Arc<InterruptRouter>) {
    tokio::spawn(async move {
        loop {
            if let Err(e) = tokio::signal::ctrl_c().await {
                debug!("Ctrl-C handler unavailable: {}", e);
                return;
            }
            if !router.route() {
                ui::warning("Interrupted.");
                std::process::exit(GenerateError::Interrupted.exit_code());
            }
        }
    });
}
