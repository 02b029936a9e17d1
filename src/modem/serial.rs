//! Serial-port modem for real radio hardware.

use async_trait::async_trait;
use tokio::io::{AsyncReadExt, AsyncWriteExt, ReadHalf, WriteHalf};
use tokio::sync::{mpsc, Mutex};
use tokio_serial::{SerialPortBuilderExt, SerialStream};

use super::{Modem, ModemError, MAX_LINE, READ_WAIT};
use crate::proto::{self, Message};

/// Modem speaking newline-delimited wire lines over a serial port.
pub struct SerialModem {
    // Taken by the first (and only) listen call.
    reader: Mutex<Option<ReadHalf<SerialStream>>>,
    writer: Mutex<WriteHalf<SerialStream>>,
}

impl SerialModem {
    /// Open `device` at `baud`, 8N1.
    pub fn open(device: &str, baud: u32) -> Result<Self, ModemError> {
        let stream = tokio_serial::new(device, baud).open_native_async()?;
        let (reader, writer) = tokio::io::split(stream);

        tracing::info!("Opened serial modem on {} at {} baud", device, baud);

        Ok(Self {
            reader: Mutex::new(Some(reader)),
            writer: Mutex::new(writer),
        })
    }
}

#[async_trait]
impl Modem for SerialModem {
    async fn send(&self, msg: &Message) -> Result<(), ModemError> {
        let mut writer = self.writer.lock().await;
        writer.write_all(msg.encode().as_bytes()).await?;
        writer.write_all(b"\n").await?;
        writer.flush().await?;
        Ok(())
    }

    async fn listen(&self, outbox: mpsc::Sender<Message>) {
        let Some(mut reader) = self.reader.lock().await.take() else {
            tracing::error!("Serial listen started twice; ignoring");
            return;
        };

        let mut chunk = [0u8; 256];
        let mut pending: Vec<u8> = Vec::new();

        loop {
            // A plain read is safe to abandon at the timeout: no bytes are
            // lost, unlike a cancelled buffered line read.
            match tokio::time::timeout(READ_WAIT, reader.read(&mut chunk)).await {
                Err(_) => continue,
                Ok(Ok(0)) => {
                    tracing::warn!("Serial port closed; listen loop ending");
                    break;
                }
                Ok(Ok(n)) => {
                    pending.extend_from_slice(&chunk[..n]);
                    if !drain_lines(&mut pending, &outbox).await {
                        break;
                    }
                }
                Ok(Err(e)) => {
                    tracing::warn!("Serial read failed: {}", e);
                    break;
                }
            }
        }
    }
}

/// Split complete lines out of `pending` and forward the ones that decode.
/// Returns false once `outbox` is closed.
async fn drain_lines(pending: &mut Vec<u8>, outbox: &mpsc::Sender<Message>) -> bool {
    while let Some(pos) = pending.iter().position(|&b| b == b'\n') {
        let raw: Vec<u8> = pending.drain(..=pos).collect();
        let line = String::from_utf8_lossy(&raw);
        let line = line.trim_end_matches(['\r', '\n']);

        if line.is_empty() {
            continue;
        }

        match proto::decode(line) {
            Ok(msg) => {
                if outbox.send(msg).await.is_err() {
                    return false;
                }
            }
            // Noise on the link; drop it and keep listening.
            Err(e) => tracing::debug!("Dropping undecodable line: {}", e),
        }
    }

    if pending.len() > MAX_LINE {
        tracing::debug!("Discarding {} bytes with no line ending", pending.len());
        pending.clear();
    }

    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::proto::Command;

    #[tokio::test]
    async fn test_drain_lines_splits_and_decodes() {
        let (tx, mut rx) = mpsc::channel(10);
        let mut pending = b"MSG|W1AW|@CQ|hello\nMSG|KD7ABC|@CQ|hi back\npartial".to_vec();

        assert!(drain_lines(&mut pending, &tx).await);

        let first = rx.try_recv().unwrap();
        assert_eq!(first.from, "W1AW");
        assert_eq!(first.body, "hello");

        let second = rx.try_recv().unwrap();
        assert_eq!(second.from, "KD7ABC");

        // The partial line stays buffered for the next read.
        assert_eq!(pending, b"partial");
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_drain_lines_drops_garbage() {
        let (tx, mut rx) = mpsc::channel(10);
        let mut pending = b"not a message\r\nFINGERRES|KJ4XYZ|@CQ|Gear: IC-9700\n".to_vec();

        assert!(drain_lines(&mut pending, &tx).await);

        let msg = rx.try_recv().unwrap();
        assert_eq!(msg.cmd, Command::FingerRes);
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_drain_lines_caps_runaway_buffer() {
        let (tx, _rx) = mpsc::channel(10);
        let mut pending = vec![b'x'; MAX_LINE + 1];

        assert!(drain_lines(&mut pending, &tx).await);
        assert!(pending.is_empty());
    }
}
