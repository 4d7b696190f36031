use crate::keys::KeyUsage;
use crate::status::{Owner, PlatformState, Status};
use crate::transport::CommandId;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    /// Unknown command or wrong arity. Never reaches the device.
    #[error("usage: {0}")]
    Usage(String),
    /// Hex decode failure or wrong fixed-width length. Never reaches the device.
    #[error("malformed {field}")]
    MalformedInput {
        field: &'static str,
        #[source]
        source: hex::FromHexError,
    },
    /// The platform snapshot does not allow the requested transition.
    #[error("cannot {requested} while the platform is {state} and {owner}")]
    InvalidOwnershipTransition {
        requested: CommandId,
        state: PlatformState,
        owner: Owner,
    },
    /// The device acknowledged the command but returned no key material.
    #[error("no {0} present on the platform")]
    NoKeyPresent(KeyUsage),
    /// The device refused the command. Carries the status verbatim.
    #[error("{command} rejected by the device: {status}")]
    DeviceRejected { command: CommandId, status: Status },
    #[error("unexpected {len} byte reply to {command}")]
    UnexpectedReply { command: CommandId, len: usize },
    #[error("transport failure")]
    Transport(#[source] Box<dyn std::error::Error + Send + Sync>),
    #[error("I/O error")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Process exit status for this error. Device refusals report the
    /// firmware status itself, unknown ones 255. Local errors use codes
    /// above the firmware range.
    pub fn exit_code(&self) -> u8 {
        match self {
            // unknown statuses must not overlap the local codes below
            Error::DeviceRejected { status, .. } => match status {
                Status::Success | Status::Unknown(_) => u8::MAX,
                known => u8::try_from(u32::from(*known)).unwrap_or(u8::MAX),
            },
            Error::Usage(_) => 0x40,
            Error::MalformedInput { .. } => 0x41,
            Error::InvalidOwnershipTransition { .. } => 0x42,
            Error::NoKeyPresent(_) => 0x43,
            Error::UnexpectedReply { .. } => 0x44,
            Error::Transport(_) => 0x45,
            Error::Io(_) => 0x46,
        }
    }
}
