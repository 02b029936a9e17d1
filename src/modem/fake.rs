//! Synthetic modem for development without radio hardware.
//!
//! Pretends to be a nearby station `KJ4XYZ` that answers finger requests,
//! plus occasional background traffic from `W1AW`, so the whole pipeline can
//! be exercised on a desk.

use async_trait::async_trait;
use rand::Rng;
use std::time::Duration;
use tokio::sync::{mpsc, Mutex};

use super::{Modem, ModemError};
use crate::proto::{Command, Message};

/// Callsign of the simulated station.
pub const FAKE_CALLSIGN: &str = "KJ4XYZ";

const FAKE_FINGER_REPLY: &str = "Gear: IC-9700 | Grid: EM65 | QTH: Huntsville";
const TRAFFIC_PERIOD: Duration = Duration::from_millis(200);

pub struct FakeModem {
    loop_tx: mpsc::Sender<Message>,
    // Taken by the first (and only) listen call.
    loop_rx: Mutex<Option<mpsc::Receiver<Message>>>,
}

impl FakeModem {
    pub fn new() -> Self {
        let (loop_tx, loop_rx) = mpsc::channel(10);
        Self {
            loop_tx,
            loop_rx: Mutex::new(Some(loop_rx)),
        }
    }
}

impl Default for FakeModem {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Modem for FakeModem {
    async fn send(&self, msg: &Message) -> Result<(), ModemError> {
        // Transmissions loop back to the simulated station, not to us.
        self.loop_tx
            .send(msg.clone())
            .await
            .map_err(|_| ModemError::Closed)
    }

    async fn listen(&self, outbox: mpsc::Sender<Message>) {
        let Some(mut loop_rx) = self.loop_rx.lock().await.take() else {
            tracing::error!("Fake listen started twice; ignoring");
            return;
        };

        let mut ticker = tokio::time::interval(TRAFFIC_PERIOD);

        loop {
            tokio::select! {
                maybe = loop_rx.recv() => {
                    let Some(msg) = maybe else { break };

                    // The simulated station only reacts to fingers aimed at it.
                    if msg.cmd == Command::FingerReq
                        && msg.body.eq_ignore_ascii_case(FAKE_CALLSIGN)
                    {
                        let reply = Message::new(
                            FAKE_CALLSIGN,
                            &msg.group,
                            Command::FingerRes,
                            FAKE_FINGER_REPLY,
                        );
                        if outbox.send(reply).await.is_err() {
                            break;
                        }
                    }
                }
                _ = ticker.tick() => {
                    if rand::thread_rng().gen_ratio(1, 50) {
                        let msg = Message::new(
                            "W1AW",
                            "@CQ",
                            Command::Msg,
                            "Test net starting soon!",
                        );
                        if outbox.send(msg).await.is_err() {
                            break;
                        }
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_finger_request_gets_reply() {
        let modem = Arc::new(FakeModem::new());
        let (tx, mut rx) = mpsc::channel(10);

        let listener = {
            let modem = modem.clone();
            tokio::spawn(async move { modem.listen(tx).await })
        };

        let req = Message::new("N0CALL", "@CQ", Command::FingerReq, "kj4xyz");
        modem.send(&req).await.unwrap();

        // Random background traffic may interleave; wait for the reply itself.
        let reply = loop {
            let msg = tokio::time::timeout(Duration::from_secs(5), rx.recv())
                .await
                .expect("timed out waiting for finger reply")
                .expect("listen loop ended early");
            if msg.cmd == Command::FingerRes {
                break msg;
            }
        };

        assert_eq!(reply.from, FAKE_CALLSIGN);
        assert_eq!(reply.group, "@CQ");
        assert!(reply.body.contains("IC-9700"));

        listener.abort();
    }

    #[tokio::test]
    async fn test_plain_traffic_is_not_answered() {
        let modem = Arc::new(FakeModem::new());
        let (tx, mut rx) = mpsc::channel(10);

        let listener = {
            let modem = modem.clone();
            tokio::spawn(async move { modem.listen(tx).await })
        };

        let msg = Message::new("N0CALL", "@CQ", Command::Msg, "just chatting");
        modem.send(&msg).await.unwrap();

        // Nothing but (rare) random traffic should come back.
        tokio::time::sleep(Duration::from_millis(50)).await;
        if let Ok(unexpected) = rx.try_recv() {
            assert_eq!(unexpected.from, "W1AW");
        }

        listener.abort();
    }
}
