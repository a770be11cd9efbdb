//! Graceful shutdown on SIGINT/SIGTERM via a shared cancellation token

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Cloneable shutdown handle shared by the orchestrator and every unit.
#[derive(Debug, Clone, Default)]
pub struct Shutdown {
    token: CancellationToken,
}

impl Shutdown {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request shutdown: units stop launching new attempts
    pub fn request(&self) {
        self.token.cancel();
    }

    pub fn is_requested(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Resolves once shutdown has been requested
    pub async fn requested(&self) {
        self.token.cancelled().await;
    }

    /// Spawn a listener that requests shutdown on the first interrupt.
    ///
    /// Must be called from within a tokio runtime. The listener exits on its
    /// own once shutdown is requested by other means.
    pub fn listen(&self) -> JoinHandle<()> {
        let token = self.token.clone();
        tokio::spawn(async move {
            tokio::select! {
                _ = wait_for_signal() => {
                    log::info!("Interrupt received, letting in-flight requests finish...");
                    token.cancel();
                }
                _ = token.cancelled() => {}
            }
        })
    }
}

#[cfg(unix)]
async fn wait_for_signal() {
    use tokio::signal::unix::{SignalKind, signal};

    match signal(SignalKind::terminate()) {
        Ok(mut term) => {
            tokio::select! {
                _ = park_on_error(tokio::signal::ctrl_c(), "Ctrl-C") => {}
                received = term.recv() => {
                    if received.is_none() {
                        std::future::pending::<()>().await;
                    }
                }
            }
        }
        Err(e) => {
            log::warn!("Cannot install SIGTERM handler: {e}");
            park_on_error(tokio::signal::ctrl_c(), "Ctrl-C").await;
        }
    }
}

#[cfg(not(unix))]
async fn wait_for_signal() {
    park_on_error(tokio::signal::ctrl_c(), "Ctrl-C").await;
}

/// Resolve when `listener` reports a signal. A listener that fails never
/// resolves, so a broken handler cannot cancel the run.
async fn park_on_error<F>(listener: F, name: &str)
where
    F: std::future::Future<Output = std::io::Result<()>>,
{
    if let Err(e) = listener.await {
        log::warn!("Cannot listen for {name}: {e}");
        std::future::pending::<()>().await;
    }
}
