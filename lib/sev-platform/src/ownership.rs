//! Platform ownership transitions and factory reset.
//!
//! ```text
//! Uninitialized --> Initialized(SelfOwned | ExternallyOwned) --> Working
//!       ^                                                          |
//!       +------------------------ factory_reset -------------------+
//! ```
//!
//! Pre-checks are derived from a fresh status query and a successful
//! transition is confirmed by querying again.

use crate::status::{Owner, PlatformState, PlatformStatus};
use crate::transport::{CommandId, Transport};
use crate::{Error, Platform};

impl<T: Transport> Platform<T> {
    /// Read-only query, legal in every state.
    pub fn platform_status(&mut self) -> Result<PlatformStatus, Error> {
        let command = CommandId::PlatformStatus;
        let data = self.issue(command, &[])?.unwrap_or_default();

        PlatformStatus::from_bytes(&data).ok_or(Error::UnexpectedReply {
            command,
            len: data.len(),
        })
    }

    /// Destroys all platform keys and returns to `Uninitialized`. Legal from
    /// any state, repeated calls keep succeeding.
    pub fn factory_reset(&mut self) -> Result<(), Error> {
        self.issue(CommandId::FactoryReset, &[])?;
        info!("platform reset, all platform keys destroyed");
        Ok(())
    }

    pub fn set_self_owned(&mut self) -> Result<(), Error> {
        self.transition(CommandId::SetSelfOwned, Owner::SelfOwned)
    }

    /// Hands the key hierarchy to the owner whose certificate chain was
    /// installed by [`Platform::pek_cert_import`]. Without it the device
    /// refuses and the refusal is returned as is.
    pub fn set_externally_owned(&mut self) -> Result<(), Error> {
        self.transition(CommandId::SetExternallyOwned, Owner::ExternallyOwned)
    }

    fn transition(&mut self, command: CommandId, target: Owner) -> Result<(), Error> {
        let before = self.platform_status()?;

        // an uninitialized platform has no owner yet, whatever the flag says
        if before.state != PlatformState::Uninitialized && before.owner == target {
            return Err(Error::InvalidOwnershipTransition {
                requested: command,
                state: before.state,
                owner: before.owner,
            });
        }

        self.issue(command, &[])?;

        let after = self.platform_status()?;
        if after.owner != target {
            error!("{} acknowledged but platform is {}", command, after.owner);
            return Err(Error::InvalidOwnershipTransition {
                requested: command,
                state: after.state,
                owner: after.owner,
            });
        }

        info!("platform {} -> {}", before.owner, after.owner);
        Ok(())
    }
}
