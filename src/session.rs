//! Session engine: command interpretation, scrollback, presence, activity.
//!
//! The engine owns all session state exclusively. It mutates only inside
//! `submit` (operator input) and `tick` (inbound drain plus time-based
//! decay), so no locking is needed anywhere in here.

use std::collections::{HashMap, VecDeque};
use std::time::{Duration, Instant};

use chrono::Utc;
use tokio::sync::mpsc;

use crate::error::{Error, Result};
use crate::finger::FingerStore;
use crate::proto::{normalize_group, Command, Message, CACHE_FROM, LOCAL_GROUP, SYSTEM_FROM};

/// Oldest messages fall off beyond this many.
pub const SCROLLBACK_CAP: usize = 100;

/// How long a send/receive activity pulse stays lit.
pub const PULSE_QUIET: Duration = Duration::from_millis(500);

/// A station heard within this window counts as present.
pub const PRESENCE_WINDOW: Duration = Duration::from_secs(5 * 60);

/// One activity lamp. Fires on traffic, decays after a quiet interval.
#[derive(Debug, Clone, Copy, Default)]
struct Pulse {
    active: bool,
    last: Option<Instant>,
}

impl Pulse {
    fn fire(&mut self, now: Instant) {
        self.active = true;
        self.last = Some(now);
    }

    fn decay(&mut self, now: Instant) {
        if let (true, Some(last)) = (self.active, self.last) {
            if now.duration_since(last) >= PULSE_QUIET {
                self.active = false;
            }
        }
    }
}

/// A live chat session on one radio link.
pub struct Session {
    callsign: String,
    group: String,
    scrollback: VecDeque<Message>,
    outbound: mpsc::Sender<Message>,
    inbound: mpsc::Receiver<Message>,
    store: FingerStore,
    tx: Pulse,
    rx: Pulse,
    last_seen: HashMap<String, Instant>,
    ended: bool,
}

impl Session {
    pub fn new(
        callsign: &str,
        group: &str,
        store: FingerStore,
        outbound: mpsc::Sender<Message>,
        inbound: mpsc::Receiver<Message>,
    ) -> Self {
        Self {
            callsign: callsign.to_string(),
            group: normalize_group(group),
            scrollback: VecDeque::with_capacity(SCROLLBACK_CAP),
            outbound,
            inbound,
            store,
            tx: Pulse::default(),
            rx: Pulse::default(),
            last_seen: HashMap::new(),
            ended: false,
        }
    }

    pub fn callsign(&self) -> &str {
        &self.callsign
    }

    pub fn group(&self) -> &str {
        &self.group
    }

    /// True once the operator has signed off.
    pub fn is_ended(&self) -> bool {
        self.ended
    }

    pub fn tx_active(&self) -> bool {
        self.tx.active
    }

    pub fn rx_active(&self) -> bool {
        self.rx.active
    }

    /// Whether a finger reply from this callsign has ever been cached.
    pub fn finger_known(&self, callsign: &str) -> bool {
        self.store.lookup(callsign).is_some()
    }

    /// Handle one line of operator input. A leading `/` marks a command;
    /// anything else goes out as a plain message to the current group.
    pub async fn submit(&mut self, line: &str, now: Instant) -> Result<()> {
        if self.ended {
            return Ok(());
        }

        let line = line.trim();
        if line.is_empty() {
            return Ok(());
        }

        match line.strip_prefix('/') {
            Some(command) => self.dispatch(command, now).await,
            None => {
                let msg = Message::new(&self.callsign, &self.group, Command::Msg, line);
                self.transmit(msg).await?;
                self.tx.fire(now);
                Ok(())
            }
        }
    }

    /// Drain pending inbound traffic and decay activity pulses.
    pub fn tick(&mut self, now: Instant) {
        while let Ok(msg) = self.inbound.try_recv() {
            self.absorb(msg, now);
        }

        self.tx.decay(now);
        self.rx.decay(now);
    }

    /// Messages for the current group, plus local notices. Oldest first.
    pub fn visible(&self) -> impl Iterator<Item = &Message> {
        self.scrollback
            .iter()
            .filter(|m| m.group == self.group || m.group == LOCAL_GROUP)
    }

    /// Callsigns heard recently, sorted. Never includes this station.
    pub fn presence(&self, now: Instant) -> Vec<String> {
        let mut stations: Vec<String> = self
            .last_seen
            .iter()
            .filter(|(_, &seen)| now.duration_since(seen) < PRESENCE_WINDOW)
            .map(|(call, _)| call.clone())
            .collect();
        stations.sort();
        stations
    }

    async fn dispatch(&mut self, command: &str, now: Instant) -> Result<()> {
        let mut words = command.split_whitespace();
        let name = words.next().unwrap_or("");

        match name {
            "quit" => self.quit().await,
            "join" => match words.next() {
                Some(group) => self.join(group).await,
                None => {
                    self.push_notice("usage: /join <group>");
                    Ok(())
                }
            },
            "finger" => match words.next() {
                Some(target) => self.finger(target, now).await,
                None => {
                    self.push_notice("usage: /finger <callsign>");
                    Ok(())
                }
            },
            "whois" => match words.next() {
                Some(target) => {
                    self.whois(target);
                    Ok(())
                }
                None => {
                    self.push_notice("usage: /whois <callsign>");
                    Ok(())
                }
            },
            other => {
                self.push_notice(format!("unknown command: /{}", other));
                Ok(())
            }
        }
    }

    /// Announce departure on the old group and arrival on the new one, then
    /// switch. Re-joining the current group just re-announces.
    async fn join(&mut self, group: &str) -> Result<()> {
        let next = normalize_group(group);
        let previous = self.group.clone();

        let leave = Message::new(&self.callsign, &previous, Command::Msg, "leaving channel.");
        self.transmit(leave).await?;

        let arrive = Message::new(&self.callsign, &next, Command::Msg, "joined channel.");
        self.transmit(arrive).await?;

        self.push_notice(format!("Switched from {} to {}", previous, next));
        self.group = next;

        tracing::info!("Joined group {}", self.group);
        Ok(())
    }

    async fn finger(&mut self, target: &str, now: Instant) -> Result<()> {
        let msg = Message::new(&self.callsign, &self.group, Command::FingerReq, target);
        self.transmit(msg).await?;
        self.tx.fire(now);
        Ok(())
    }

    /// Answer from the local cache only; nothing is transmitted.
    fn whois(&mut self, target: &str) {
        let body = match self.store.lookup(target) {
            Some(entry) => {
                let ms = (Utc::now() - entry.updated).num_milliseconds();
                let secs = ((ms + 500) / 1000).max(0);
                format!("{} ({}s ago)", entry.last_response, secs)
            }
            None => format!("No cached entry for {}", target),
        };

        self.push(Message::new(CACHE_FROM, LOCAL_GROUP, Command::Whois, body));
    }

    /// Sign off on the air and end the session. Input after this is ignored;
    /// queued transmissions still drain.
    async fn quit(&mut self) -> Result<()> {
        let msg = Message::new(&self.callsign, &self.group, Command::Msg, "signed off.");
        self.transmit(msg).await?;
        self.ended = true;

        tracing::info!("Signed off");
        Ok(())
    }

    /// Queue a message for the modem and echo it locally. Blocks while the
    /// outbound queue is full; that backpressure is what paces the operator
    /// to the link.
    async fn transmit(&mut self, msg: Message) -> Result<()> {
        self.outbound
            .send(msg.clone())
            .await
            .map_err(|_| Error::Queue("outbound queue closed".to_string()))?;
        self.push(msg);
        Ok(())
    }

    /// Process one inbound message.
    fn absorb(&mut self, msg: Message, now: Instant) {
        // Local notices carry no link activity.
        if msg.group != LOCAL_GROUP {
            if msg.from != self.callsign {
                self.last_seen.insert(msg.from.clone(), now);
            }
            self.rx.fire(now);

            if msg.cmd == Command::FingerRes {
                if let Err(e) = self.store.upsert(&msg.from, &msg.body, Utc::now()) {
                    tracing::warn!("Finger cache save failed: {}", e);
                    self.push_notice(format!("finger cache save failed: {}", e));
                }
            }
        }

        self.push(msg);
    }

    fn push(&mut self, msg: Message) {
        if self.scrollback.len() == SCROLLBACK_CAP {
            self.scrollback.pop_front();
        }
        self.scrollback.push_back(msg);
    }

    fn push_notice(&mut self, body: impl Into<String>) {
        self.push(Message::new(SYSTEM_FROM, LOCAL_GROUP, Command::Msg, body));
    }
}
