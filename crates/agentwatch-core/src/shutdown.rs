//! Graceful shutdown
//!
//! Long-lived connections (push sockets, relay streams) never finish on their
//! own, so the server cannot simply wait for them. The controller hands out
//! child cancellation tokens; relays end when the token fires and the hub is
//! closed explicitly by the run loop.
//!
//! ```ignore
//! let shutdown = ShutdownController::new();
//! let bridge = PubSubBridge::new(broker, 64).with_shutdown(shutdown.token());
//!
//! axum::serve(listener, app)
//!     .with_graceful_shutdown(shutdown_signal_with_controller(shutdown.clone()))
//!     .await?;
//! shutdown.complete();
//! ```

use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// Shutdown phases
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownPhase {
    /// Normal operation
    Running,
    /// Signal received, no new connections are admitted
    Stopping,
    /// Open connections are being closed
    Draining,
    /// Server stopped and resources released
    Terminated,
}

impl ShutdownPhase {
    fn from_u8(value: u8) -> Self {
        match value {
            0 => Self::Running,
            1 => Self::Stopping,
            2 => Self::Draining,
            _ => Self::Terminated,
        }
    }
}

impl std::fmt::Display for ShutdownPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Running => write!(f, "Running"),
            Self::Stopping => write!(f, "Stopping"),
            Self::Draining => write!(f, "Draining"),
            Self::Terminated => write!(f, "Terminated"),
        }
    }
}

/// Coordinates shutdown across the hub, relays and the server loop
pub struct ShutdownController {
    cancel_token: CancellationToken,
    phase: AtomicU8,
    phase_tx: watch::Sender<ShutdownPhase>,
}

impl ShutdownController {
    /// Create a new controller in the `Running` phase
    #[must_use]
    pub fn new() -> Arc<Self> {
        let (phase_tx, _) = watch::channel(ShutdownPhase::Running);
        Arc::new(Self {
            cancel_token: CancellationToken::new(),
            phase: AtomicU8::new(ShutdownPhase::Running as u8),
            phase_tx,
        })
    }

    /// Child token, cancelled when shutdown begins
    #[must_use]
    pub fn token(&self) -> CancellationToken {
        self.cancel_token.child_token()
    }

    /// Watch phase changes
    pub fn subscribe(&self) -> watch::Receiver<ShutdownPhase> {
        self.phase_tx.subscribe()
    }

    /// Current phase
    #[must_use]
    pub fn phase(&self) -> ShutdownPhase {
        ShutdownPhase::from_u8(self.phase.load(Ordering::SeqCst))
    }

    /// Whether shutdown has been initiated
    #[must_use]
    pub fn is_shutting_down(&self) -> bool {
        self.phase() != ShutdownPhase::Running
    }

    fn advance(&self, phase: ShutdownPhase) -> bool {
        let previous = self.phase.fetch_max(phase as u8, Ordering::SeqCst);
        if previous >= phase as u8 {
            return false;
        }
        self.phase_tx.send_replace(phase);
        info!(phase = %phase, "Shutdown phase changed");
        true
    }

    /// Begin shutdown: stop admitting work and cancel every child token
    ///
    /// Returns `false` when shutdown was already underway.
    pub fn shutdown(&self) -> bool {
        if !self.advance(ShutdownPhase::Stopping) {
            debug!("Shutdown already initiated");
            return false;
        }
        self.cancel_token.cancel();
        self.advance(ShutdownPhase::Draining);
        true
    }

    /// Mark shutdown as finished once the server loop has returned
    pub fn complete(&self) {
        self.shutdown();
        if self.advance(ShutdownPhase::Terminated) {
            info!("Graceful shutdown complete");
        }
    }
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM)
pub async fn wait_for_shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C signal");
        }
        _ = terminate => {
            info!("Received SIGTERM signal");
        }
    }
}

/// Signal future for `with_graceful_shutdown`
///
/// Resolves when an OS signal arrives or when shutdown is triggered
/// programmatically, and leaves the controller in the `Draining` phase.
pub async fn shutdown_signal_with_controller(controller: Arc<ShutdownController>) {
    let token = controller.token();
    tokio::select! {
        _ = wait_for_shutdown_signal() => {}
        _ = token.cancelled() => {}
    }
    controller.shutdown();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shutdown_phases() {
        let controller = ShutdownController::new();
        assert_eq!(controller.phase(), ShutdownPhase::Running);
        assert!(!controller.is_shutting_down());

        assert!(controller.shutdown());
        assert_eq!(controller.phase(), ShutdownPhase::Draining);
        assert!(controller.is_shutting_down());

        controller.complete();
        assert_eq!(controller.phase(), ShutdownPhase::Terminated);
    }

    #[test]
    fn test_double_shutdown() {
        let controller = ShutdownController::new();
        assert!(controller.shutdown());
        assert!(!controller.shutdown());
        assert_eq!(controller.phase(), ShutdownPhase::Draining);
    }

    #[test]
    fn test_cancellation_propagation() {
        let controller = ShutdownController::new();
        let token = controller.token();
        assert!(!token.is_cancelled());

        controller.shutdown();
        assert!(token.is_cancelled());
        assert!(controller.token().is_cancelled());
    }

    #[tokio::test]
    async fn test_subscribe_sees_terminal_phase() {
        let controller = ShutdownController::new();
        let mut rx = controller.subscribe();

        controller.complete();
        rx.changed().await.unwrap();
        assert_eq!(*rx.borrow(), ShutdownPhase::Terminated);
    }

    #[tokio::test]
    async fn test_signal_future_resolves_on_programmatic_shutdown() {
        let controller = ShutdownController::new();
        let signal = tokio::spawn(shutdown_signal_with_controller(controller.clone()));

        controller.shutdown();
        signal.await.unwrap();
        assert_eq!(controller.phase(), ShutdownPhase::Draining);
    }
}
