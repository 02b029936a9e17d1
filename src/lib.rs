//! ragchew library root.

pub mod cli;
pub mod error;
pub mod finger;
pub mod logging;
pub mod modem;
pub mod proto;
pub mod relay;
pub mod session;
pub mod ui;

pub use cli::Args;
pub use error::{Error, Result};
pub use finger::{FingerCache, FingerEntry, FingerStore};
pub use modem::{fake::FakeModem, serial::SerialModem, Modem, ModemError};
pub use proto::{decode, normalize_group, Command, DecodeError, Message};
pub use relay::QUEUE_DEPTH;
pub use session::Session;
pub use ui::App;
