//! Wire message type and line codec.
//!
//! One message per line: `CMD|FROM|GROUP|BODY`. The first three fields may
//! not contain the delimiter; the body is free text and keeps any delimiters
//! it contains, so the split is bounded at four fields.

use chrono::{DateTime, Utc};
use thiserror::Error;

/// Field delimiter on the wire.
pub const DELIMITER: char = '|';

/// Reserved group for notices that never leave this station. Always visible
/// regardless of the joined group.
pub const LOCAL_GROUP: &str = "@local";

/// Synthetic sender for locally generated notices.
pub const SYSTEM_FROM: &str = "SYSTEM";

/// Synthetic sender for identity-cache answers.
pub const CACHE_FROM: &str = "CACHE";

const TAG_MSG: &str = "MSG";
const TAG_FINGER_REQ: &str = "FINGERREQ";
const TAG_FINGER_RES: &str = "FINGERRES";
const TAG_WHOIS: &str = "WHOIS";

/// Message kind.
///
/// `Whois` is local-only: it marks cache answers in the scrollback and is
/// never accepted off the wire, so a remote station cannot spoof one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Msg,
    FingerReq,
    FingerRes,
    Whois,
}

impl Command {
    /// Wire tag for this command.
    pub fn as_tag(&self) -> &'static str {
        match self {
            Command::Msg => TAG_MSG,
            Command::FingerReq => TAG_FINGER_REQ,
            Command::FingerRes => TAG_FINGER_RES,
            Command::Whois => TAG_WHOIS,
        }
    }

    /// Parse a tag received off the wire. `WHOIS` is deliberately absent.
    fn from_wire(tag: &str) -> Option<Command> {
        match tag {
            TAG_MSG => Some(Command::Msg),
            TAG_FINGER_REQ => Some(Command::FingerReq),
            TAG_FINGER_RES => Some(Command::FingerRes),
            _ => None,
        }
    }
}

impl std::fmt::Display for Command {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_tag())
    }
}

/// A single chat message.
#[derive(Debug, Clone, PartialEq)]
pub struct Message {
    pub from: String,
    pub group: String,
    pub cmd: Command,
    pub body: String,
    /// Local arrival or creation time; never carried on the wire.
    pub created: DateTime<Utc>,
}

impl Message {
    /// Create a message stamped with the current time.
    pub fn new(
        from: impl Into<String>,
        group: impl Into<String>,
        cmd: Command,
        body: impl Into<String>,
    ) -> Self {
        Self {
            from: from.into(),
            group: group.into(),
            cmd,
            body: body.into(),
            created: Utc::now(),
        }
    }

    /// Render the wire line, without a trailing newline.
    pub fn encode(&self) -> String {
        format!(
            "{}|{}|{}|{}",
            self.cmd.as_tag(),
            self.from,
            self.group,
            self.body
        )
    }
}

#[derive(Error, Debug, PartialEq, Eq)]
pub enum DecodeError {
    #[error("invalid message format")]
    InvalidFormat,

    #[error("unknown command tag: {0}")]
    UnknownCommand(String),
}

/// Parse one wire line into a message, stamping arrival time.
///
/// Lines with fewer than four fields, an empty sender or group, or a command
/// tag this station does not accept are rejected.
pub fn decode(line: &str) -> Result<Message, DecodeError> {
    let parts: Vec<&str> = line.splitn(4, DELIMITER).collect();
    if parts.len() < 4 {
        return Err(DecodeError::InvalidFormat);
    }

    let (tag, from, group, body) = (parts[0], parts[1], parts[2], parts[3]);
    if from.is_empty() || group.is_empty() {
        return Err(DecodeError::InvalidFormat);
    }

    let cmd = Command::from_wire(tag).ok_or_else(|| DecodeError::UnknownCommand(tag.to_string()))?;

    Ok(Message {
        from: from.to_string(),
        group: group.to_string(),
        cmd,
        body: body.to_string(),
        created: Utc::now(),
    })
}

/// Normalize a group name: prefix the channel marker when absent.
pub fn normalize_group(name: &str) -> String {
    if name.starts_with('@') {
        name.to_string()
    } else {
        format!("@{}", name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_decode_roundtrip() {
        let msg = Message::new("KD7ABC", "@CQ", Command::Msg, "anyone on tonight?");
        let decoded = decode(&msg.encode()).unwrap();

        assert_eq!(decoded.from, "KD7ABC");
        assert_eq!(decoded.group, "@CQ");
        assert_eq!(decoded.cmd, Command::Msg);
        assert_eq!(decoded.body, "anyone on tonight?");
    }

    #[test]
    fn test_body_keeps_delimiters() {
        let msg = Message::new("KJ4XYZ", "@CQ", Command::FingerRes, "Gear: IC-9700 | Grid: EM65");
        let decoded = decode(&msg.encode()).unwrap();

        assert_eq!(decoded.body, "Gear: IC-9700 | Grid: EM65");
    }

    #[test]
    fn test_decode_short_line() {
        assert_eq!(decode("MSG|KD7ABC|@CQ"), Err(DecodeError::InvalidFormat));
        assert_eq!(decode("garbage"), Err(DecodeError::InvalidFormat));
        assert_eq!(decode(""), Err(DecodeError::InvalidFormat));
    }

    #[test]
    fn test_decode_empty_sender_or_group() {
        assert_eq!(decode("MSG||@CQ|hi"), Err(DecodeError::InvalidFormat));
        assert_eq!(decode("MSG|KD7ABC||hi"), Err(DecodeError::InvalidFormat));
    }

    #[test]
    fn test_decode_unknown_tag() {
        assert_eq!(
            decode("NOPE|KD7ABC|@CQ|hi"),
            Err(DecodeError::UnknownCommand("NOPE".to_string()))
        );
    }

    #[test]
    fn test_whois_rejected_off_the_wire() {
        assert_eq!(
            decode("WHOIS|KD7ABC|@CQ|W1AW"),
            Err(DecodeError::UnknownCommand("WHOIS".to_string()))
        );
    }

    #[test]
    fn test_empty_body_is_valid() {
        let decoded = decode("MSG|KD7ABC|@CQ|").unwrap();
        assert_eq!(decoded.body, "");
    }

    #[test]
    fn test_normalize_group() {
        assert_eq!(normalize_group("test"), "@test");
        assert_eq!(normalize_group("@test"), "@test");
        assert_eq!(normalize_group("@CQ"), "@CQ");
    }
}
