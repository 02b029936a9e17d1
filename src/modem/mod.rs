//! Modem transports: anything that can carry wire messages.

pub mod fake;
pub mod serial;

use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::mpsc;

use crate::proto::Message;

/// Longest a listen-side read waits before checking again. Keeps the loop
/// responsive to shutdown without busy-waiting on a quiet link.
pub const READ_WAIT: Duration = Duration::from_secs(1);

/// A decoded line longer than this means framing is broken; the buffer is
/// discarded rather than grown without bound.
pub const MAX_LINE: usize = 1024;

#[derive(Error, Debug)]
pub enum ModemError {
    #[error("Serial error: {0}")]
    Serial(#[from] tokio_serial::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Modem closed")]
    Closed,
}

/// A transport carrying encoded message lines in both directions.
///
/// `listen` owns the receive side for the life of the link: it decodes
/// whatever arrives, forwards good messages into `outbox`, and silently
/// drops anything malformed. It returns only when the link or `outbox` is
/// permanently closed; implementations never reconnect.
#[async_trait]
pub trait Modem: Send + Sync {
    /// Transmit one message. Failures are reported, not retried.
    async fn send(&self, msg: &Message) -> Result<(), ModemError>;

    /// Pump decoded inbound messages into `outbox` until the link closes.
    async fn listen(&self, outbox: mpsc::Sender<Message>);
}
