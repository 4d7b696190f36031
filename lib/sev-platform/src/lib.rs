#![warn(rust_2018_idioms)]

//! Client side orchestration of the SEV platform key hierarchy, ownership and
//! launch measurement commands.
//!
//! The co-processor is the only owner of platform state. Everything here is a
//! request/response over a [`Transport`]; nothing is cached between calls.

pub mod codec;
pub mod dispatch;
pub mod error;
pub mod keys;
pub mod measurement;
pub mod ownership;
pub mod status;
pub mod transport;

#[cfg(any(test, feature = "mock"))]
pub mod mock;

#[macro_use]
extern crate log;

pub use dispatch::{CommandResult, Operation, Output};
pub use error::Error;
pub use keys::KeyUsage;
pub use measurement::{Digest, MeasurementRequest, Nonce, Policy, Tik};
pub use status::{Owner, PlatformState, PlatformStatus, Status};
pub use transport::{CommandId, Reply, Transport};

/// Stateless service object over one co-processor. It holds the transport
/// handle and nothing else.
pub struct Platform<T> {
    transport: T,
}

impl<T: Transport> Platform<T> {
    pub fn new(transport: T) -> Self {
        Self { transport }
    }

    /// Sends one command and turns any non-success status into
    /// [`Error::DeviceRejected`]. The status is never retried or remapped.
    pub(crate) fn issue(
        &mut self,
        command: CommandId,
        payload: &[u8],
    ) -> Result<Option<Vec<u8>>, Error> {
        debug!(
            "{} ({:#04x}): sending {} byte payload",
            command,
            command.code(),
            payload.len()
        );
        let reply = self.transport.send(command, payload)?;

        if reply.status != Status::Success {
            warn!("{}: device returned {}", command, reply.status);
            return Err(Error::DeviceRejected {
                command,
                status: reply.status,
            });
        }

        trace!(
            "{}: {} byte reply",
            command,
            reply.data.as_ref().map_or(0, |d| d.len())
        );
        Ok(reply.data)
    }
}
