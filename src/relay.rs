//! Bounded relays between the session engine and the modem.
//!
//! Three background tasks move messages: the modem's listen loop feeds a raw
//! queue, an inbound relay forwards raw traffic to the engine, and an
//! outbound relay hands engine transmissions to the modem. Every queue is
//! bounded at the same small depth, so a stalled link backpressures the
//! operator instead of buffering without limit.

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::modem::Modem;
use crate::proto::{Command, Message, LOCAL_GROUP, SYSTEM_FROM};

/// Depth of every relay queue.
pub const QUEUE_DEPTH: usize = 10;

/// Allocate one relay queue.
pub fn channel() -> (mpsc::Sender<Message>, mpsc::Receiver<Message>) {
    mpsc::channel(QUEUE_DEPTH)
}

/// Run the modem's listen loop until the link closes.
pub fn spawn_listen(modem: Arc<dyn Modem>, raw: mpsc::Sender<Message>) -> JoinHandle<()> {
    tokio::spawn(async move {
        modem.listen(raw).await;
        tracing::debug!("Listen loop ended");
    })
}

/// Forward modem traffic into the engine's inbound queue.
pub fn spawn_inbound(
    mut raw: mpsc::Receiver<Message>,
    inbound: mpsc::Sender<Message>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(msg) = raw.recv().await {
            if inbound.send(msg).await.is_err() {
                break;
            }
        }
        tracing::debug!("Inbound relay ended");
    })
}

/// Forward engine transmissions to the modem until the engine drops its
/// sender. A failed send becomes a local notice on `notices` rather than a
/// silent loss; the relay itself never stops over one bad transmission.
pub fn spawn_outbound(
    modem: Arc<dyn Modem>,
    mut outbound: mpsc::Receiver<Message>,
    notices: mpsc::Sender<Message>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(msg) = outbound.recv().await {
            if let Err(e) = modem.send(&msg).await {
                tracing::warn!("Send failed: {}", e);

                let notice = Message::new(
                    SYSTEM_FROM,
                    LOCAL_GROUP,
                    Command::Msg,
                    format!("send failed: {}", e),
                );
                // Losing a notice to a saturated queue beats deadlocking the
                // pipeline it reports on.
                if notices.try_send(notice).is_err() {
                    tracing::warn!("Dropped send-failure notice");
                }
            }
        }
        tracing::debug!("Outbound relay drained");
    })
}
