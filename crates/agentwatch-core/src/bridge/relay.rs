//! Per-request relay from broker channels to a frame stream

use futures::Stream;
use serde_json::json;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use tokio::sync::mpsc;
use tokio_util::sync::{CancellationToken, DropGuard};
use tracing::{debug, info, warn};

use super::broker::{Broker, BrokerMessage, BrokerSubscription};

/// Frame produced by a relay
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BridgeFrame {
    /// A broker message, forwarded unmodified
    Message(BrokerMessage),
    /// Terminal failure; always the last frame of its stream
    Error {
        /// Human-readable reason
        message: String,
    },
}

impl BridgeFrame {
    fn error(message: impl Into<String>) -> Self {
        Self::Error {
            message: message.into(),
        }
    }

    /// Text carried in the frame's `data:` field
    #[must_use]
    pub fn data(&self) -> String {
        match self {
            Self::Message(msg) => msg.payload.clone(),
            Self::Error { message } => json!({"type": "error", "message": message}).to_string(),
        }
    }

    /// Whether this frame ends the stream
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Error { .. })
    }
}

/// Opens independent relays on a shared broker
pub struct PubSubBridge {
    broker: Arc<dyn Broker>,
    relay_buffer: usize,
    shutdown: CancellationToken,
}

impl PubSubBridge {
    /// Create a bridge; each relay buffers up to `relay_buffer` frames
    pub fn new(broker: Arc<dyn Broker>, relay_buffer: usize) -> Self {
        Self {
            broker,
            relay_buffer: relay_buffer.max(1),
            shutdown: CancellationToken::new(),
        }
    }

    /// End every relay when `token` is cancelled
    #[must_use]
    pub fn with_shutdown(mut self, token: CancellationToken) -> Self {
        self.shutdown = token;
        self
    }

    /// Broker name
    #[must_use]
    pub fn broker_name(&self) -> &str {
        self.broker.name()
    }

    /// Open a relay for `channels`
    ///
    /// The subscription lives in a spawned task bound to the returned stream:
    /// dropping the stream cancels the task, which unsubscribes before exiting.
    pub fn open(&self, channels: Vec<String>) -> RelayStream {
        let token = self.shutdown.child_token();
        let (tx, rx) = mpsc::channel(self.relay_buffer);

        tokio::spawn(run_relay(
            Arc::clone(&self.broker),
            channels,
            tx,
            token.clone(),
        ));

        RelayStream {
            rx,
            _guard: token.drop_guard(),
        }
    }
}

async fn run_relay(
    broker: Arc<dyn Broker>,
    channels: Vec<String>,
    tx: mpsc::Sender<BridgeFrame>,
    token: CancellationToken,
) {
    let opened = tokio::select! {
        biased;
        _ = token.cancelled() => {
            debug!(channels = ?channels, "Relay cancelled before subscribing");
            return;
        }
        opened = broker.subscribe(&channels) => opened,
    };

    let mut subscription = match opened {
        Ok(subscription) => subscription,
        Err(e) => {
            warn!(channels = ?channels, error = %e, "Relay failed to subscribe");
            let _ = tx.send(BridgeFrame::error(e.to_string())).await;
            return;
        }
    };
    info!(channels = ?channels, broker = broker.name(), "Relay opened");

    forward(&mut subscription, &tx, &token).await;

    if let Err(e) = subscription.unsubscribe().await {
        warn!(channels = ?channels, error = %e, "Relay failed to unsubscribe");
    }
    info!(channels = ?channels, "Relay closed");
}

async fn forward(
    subscription: &mut Box<dyn BrokerSubscription>,
    tx: &mpsc::Sender<BridgeFrame>,
    token: &CancellationToken,
) {
    loop {
        let next = tokio::select! {
            biased;
            _ = token.cancelled() => return,
            next = subscription.next_message() => next,
        };

        let frame = match next {
            Some(Ok(msg)) => BridgeFrame::Message(msg),
            Some(Err(e)) => BridgeFrame::error(e.to_string()),
            None => BridgeFrame::error("broker closed the subscription"),
        };
        let terminal = frame.is_terminal();

        tokio::select! {
            biased;
            _ = token.cancelled() => return,
            sent = tx.send(frame) => {
                if sent.is_err() || terminal {
                    return;
                }
            }
        }
    }
}

/// Stream of frames for one relay
///
/// Ends after an error frame, on server shutdown, or never. Dropping it
/// cancels the relay.
pub struct RelayStream {
    rx: mpsc::Receiver<BridgeFrame>,
    _guard: DropGuard,
}

impl Stream for RelayStream {
    type Item = BridgeFrame;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.rx.poll_recv(cx)
    }
}
