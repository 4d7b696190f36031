//! PEK and PDH lifecycle. Key material never leaves the co-processor; only
//! certificates and signing requests pass through here, as opaque blobs.

use crate::status::{Owner, PlatformState};
use crate::transport::{CommandId, Transport};
use crate::{Error, Platform};
use core::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyUsage {
    /// Platform Endorsement Key
    Pek,
    /// Platform Diffie-Hellman key
    Pdh,
}

impl fmt::Display for KeyUsage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            KeyUsage::Pek => "PEK",
            KeyUsage::Pdh => "PDH",
        })
    }
}

impl<T: Transport> Platform<T> {
    /// Regenerates the PEK in place.
    pub fn pek_gen(&mut self) -> Result<(), Error> {
        self.issue(CommandId::PekGen, &[])?;
        info!("new PEK generated");
        Ok(())
    }

    /// Returns the signing request for the current PEK.
    pub fn pek_csr(&mut self) -> Result<Vec<u8>, Error> {
        self.fetch_blob(CommandId::PekCsr, KeyUsage::Pek)
    }

    pub fn pdh_gen(&mut self) -> Result<(), Error> {
        self.issue(CommandId::PdhGen, &[])?;
        info!("new PDH generated");
        Ok(())
    }

    /// Returns the PDH certificate and the chain that vouches for it.
    pub fn pdh_cert_export(&mut self) -> Result<Vec<u8>, Error> {
        self.fetch_blob(CommandId::PdhCertExport, KeyUsage::Pdh)
    }

    /// Installs an externally signed PEK certificate chain, the prerequisite
    /// of [`Platform::set_externally_owned`].
    ///
    /// Only the platform state is checked here. The chain is passed on
    /// unmodified and validated by the co-processor.
    pub fn pek_cert_import(&mut self, chain: &[u8]) -> Result<(), Error> {
        let command = CommandId::PekCertImport;
        let status = self.platform_status()?;

        if status.state != PlatformState::Initialized || status.owner == Owner::ExternallyOwned {
            return Err(Error::InvalidOwnershipTransition {
                requested: command,
                state: status.state,
                owner: status.owner,
            });
        }

        self.issue(command, chain)?;
        info!("PEK certificate chain imported ({} bytes)", chain.len());
        Ok(())
    }

    pub fn get_id(&mut self) -> Result<Vec<u8>, Error> {
        let command = CommandId::GetId;
        let id = self.issue(command, &[])?.unwrap_or_default();

        if id.is_empty() {
            return Err(Error::UnexpectedReply { command, len: 0 });
        }
        Ok(id)
    }

    fn fetch_blob(&mut self, command: CommandId, usage: KeyUsage) -> Result<Vec<u8>, Error> {
        match self.issue(command, &[])? {
            Some(blob) if !blob.is_empty() => Ok(blob),
            _ => Err(Error::NoKeyPresent(usage)),
        }
    }
}
