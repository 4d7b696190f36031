#![warn(rust_2018_idioms)]

//! Bindings for the Linux `/dev/sev` platform management interface.

pub(crate) mod kernel;

use kernel::cmd;
use nix::{fcntl::OFlag, sys::stat::Mode};
use std::os::fd::RawFd;
use thiserror::Error;

/// Size of a single SEV certificate (PDH, PEK, OCA or CEK).
pub const CERT_LEN: usize = 0x824;
/// PEK, OCA and CEK certificates returned alongside the PDH certificate.
pub const CERT_CHAIN_LEN: usize = 3 * CERT_LEN;
/// Room for the 64 byte identifiers of a two socket system.
pub const ID_LEN: usize = 0x80;
/// Size of the packed platform status structure.
pub const STATUS_LEN: usize = 12;

pub const DEV: &str = "/dev/sev";

const FLAGS: OFlag = OFlag::O_RDWR;
const MODE: Mode = Mode::from_bits_truncate(0o644);

#[derive(Debug, Error)]
pub enum Error {
    #[error("failed to open {0}")]
    Open(String, #[source] nix::Error),
    #[error("SEV_ISSUE_CMD ioctl failed")]
    Ioctl(#[source] nix::Error),
    #[error("firmware returned status {0:#04x}")]
    Firmware(u32),
    #[error("a {0} byte chain cannot be split into PEK and OCA certificates")]
    CertChainLength(usize),
}

struct Fd {
    fd: RawFd,
}

impl Fd {
    fn wrap(fd: RawFd) -> Self {
        Self { fd }
    }

    fn get(&self) -> RawFd {
        self.fd
    }
}

impl Drop for Fd {
    fn drop(&mut self) {
        if let Err(e) = nix::unistd::close(self.fd) {
            log::warn!("close failed: {}", e);
        }
    }
}

/// An open handle on the SEV platform device.
pub struct Device {
    fd: Fd,
}

impl Device {
    pub fn open(path: &str) -> Result<Self, Error> {
        let fd = nix::fcntl::open(path, FLAGS, MODE).map_err(|e| Error::Open(path.into(), e))?;
        Ok(Self { fd: Fd::wrap(fd) })
    }

    pub fn factory_reset(&self) -> Result<(), Error> {
        kernel::issue::<()>(self.fd.get(), cmd::FACTORY_RESET, None)
    }

    /// Returns the raw status structure, see [`STATUS_LEN`].
    pub fn platform_status(&self) -> Result<[u8; STATUS_LEN], Error> {
        let mut status = kernel::SevUserDataStatus::default();
        kernel::issue(self.fd.get(), cmd::PLATFORM_STATUS, Some(&mut status))?;
        Ok(status.to_bytes())
    }

    pub fn pek_gen(&self) -> Result<(), Error> {
        kernel::issue::<()>(self.fd.get(), cmd::PEK_GEN, None)
    }

    pub fn pdh_gen(&self) -> Result<(), Error> {
        kernel::issue::<()>(self.fd.get(), cmd::PDH_GEN, None)
    }

    pub fn pek_csr(&self) -> Result<Vec<u8>, Error> {
        let mut csr = vec![0u8; CERT_LEN];
        let mut req = kernel::SevUserDataPekCsr {
            address: csr.as_mut_ptr() as u64,
            length: CERT_LEN as u32,
        };
        kernel::issue(self.fd.get(), cmd::PEK_CSR, Some(&mut req))?;

        csr.truncate(req.length as usize);
        Ok(csr)
    }

    /// Returns the PDH certificate followed by the PEK, OCA and CEK
    /// certificates.
    pub fn pdh_cert_export(&self) -> Result<Vec<u8>, Error> {
        let mut pdh = vec![0u8; CERT_LEN];
        let mut chain = vec![0u8; CERT_CHAIN_LEN];
        let mut req = kernel::SevUserDataPdhCertExport {
            pdh_cert_address: pdh.as_mut_ptr() as u64,
            pdh_cert_len: CERT_LEN as u32,
            cert_chain_address: chain.as_mut_ptr() as u64,
            cert_chain_len: CERT_CHAIN_LEN as u32,
        };
        kernel::issue(self.fd.get(), cmd::PDH_CERT_EXPORT, Some(&mut req))?;

        pdh.truncate(req.pdh_cert_len as usize);
        chain.truncate(req.cert_chain_len as usize);
        pdh.append(&mut chain);
        Ok(pdh)
    }

    /// Imports a signed PEK certificate followed by the OCA certificate.
    /// Both have the same size, so the chain is split in the middle.
    pub fn pek_cert_import(&self, chain: &[u8]) -> Result<(), Error> {
        if chain.is_empty() || chain.len() % 2 != 0 {
            return Err(Error::CertChainLength(chain.len()));
        }
        let (pek, oca) = chain.split_at(chain.len() / 2);

        let mut req = kernel::SevUserDataPekCertImport {
            pek_cert_address: pek.as_ptr() as u64,
            pek_cert_len: pek.len() as u32,
            oca_cert_address: oca.as_ptr() as u64,
            oca_cert_len: oca.len() as u32,
        };
        kernel::issue(self.fd.get(), cmd::PEK_CERT_IMPORT, Some(&mut req))
    }

    pub fn get_id(&self) -> Result<Vec<u8>, Error> {
        let mut id = vec![0u8; ID_LEN];
        let mut req = kernel::SevUserDataGetId2 {
            address: id.as_mut_ptr() as u64,
            length: ID_LEN as u32,
        };
        kernel::issue(self.fd.get(), cmd::GET_ID2, Some(&mut req))?;

        id.truncate(req.length as usize);
        Ok(id)
    }
}
