/*
 * This file must match kernel API.
 *
 * Layouts follow include/uapi/linux/psp-sev.h. Every structure handed to the
 * driver is packed there, so they are packed here as well.
 */

use std::os::fd::RawFd;

use super::{Error, STATUS_LEN};

mod internal {
    use super::SevIssueCmd;

    nix::ioctl_readwrite!(sev_issue_cmd, b'S', 0x0, SevIssueCmd);
}

/// Firmware command codes accepted by `SEV_ISSUE_CMD`.
pub(super) mod cmd {
    pub const FACTORY_RESET: u32 = 0;
    pub const PLATFORM_STATUS: u32 = 1;
    pub const PEK_GEN: u32 = 2;
    pub const PEK_CSR: u32 = 3;
    pub const PDH_GEN: u32 = 4;
    pub const PDH_CERT_EXPORT: u32 = 5;
    pub const PEK_CERT_IMPORT: u32 = 6;
    pub const GET_ID2: u32 = 8;
}

// should be pub(super) but nix leaks the type through pub ioctl definitions
#[repr(C, packed)]
pub struct SevIssueCmd {
    pub(super) cmd: u32,
    pub(super) data: u64,
    pub(super) error: u32,
}

#[repr(C, packed)]
#[derive(Default, Clone, Copy)]
pub(super) struct SevUserDataStatus {
    pub(super) api_major: u8,
    pub(super) api_minor: u8,
    pub(super) state: u8,
    pub(super) flags: u32,
    pub(super) build: u8,
    pub(super) guest_count: u32,
}

impl SevUserDataStatus {
    /// Flattens the structure to the same little-endian byte layout the
    /// firmware uses.
    pub(super) fn to_bytes(self) -> [u8; STATUS_LEN] {
        let flags = self.flags.to_le_bytes();
        let guest_count = self.guest_count.to_le_bytes();

        let mut raw = [0u8; STATUS_LEN];
        raw[0] = self.api_major;
        raw[1] = self.api_minor;
        raw[2] = self.state;
        raw[3..7].copy_from_slice(&flags);
        raw[7] = self.build;
        raw[8..12].copy_from_slice(&guest_count);
        raw
    }
}

#[repr(C, packed)]
pub(super) struct SevUserDataPekCsr {
    pub(super) address: u64,
    pub(super) length: u32,
}

#[repr(C, packed)]
pub(super) struct SevUserDataPekCertImport {
    pub(super) pek_cert_address: u64,
    pub(super) pek_cert_len: u32,
    pub(super) oca_cert_address: u64,
    pub(super) oca_cert_len: u32,
}

#[repr(C, packed)]
pub(super) struct SevUserDataPdhCertExport {
    pub(super) pdh_cert_address: u64,
    pub(super) pdh_cert_len: u32,
    pub(super) cert_chain_address: u64,
    pub(super) cert_chain_len: u32,
}

#[repr(C, packed)]
pub(super) struct SevUserDataGetId2 {
    pub(super) address: u64,
    pub(super) length: u32,
}

/// Issues one firmware command. `data` is the user structure the command
/// expects, or `None` for commands that take no input.
pub(super) fn issue<T>(fd: RawFd, code: u32, data: Option<&mut T>) -> Result<(), Error> {
    let mut arg = SevIssueCmd {
        cmd: code,
        data: data.map_or(0, |d| d as *mut T as u64),
        error: 0,
    };

    // SAFETY: `arg` matches struct sev_issue_cmd and `data` outlives the call.
    let res = unsafe { internal::sev_issue_cmd(fd, &mut arg) };
    let error = arg.error;

    match res {
        Ok(_) => Ok(()),
        // the driver reports firmware refusals as EIO with the status filled in
        Err(_) if error != 0 => Err(Error::Firmware(error)),
        Err(e) => Err(Error::Ioctl(e)),
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn uapi_sizes() {
        assert_eq!(core::mem::size_of::<SevIssueCmd>(), 16);
        assert_eq!(core::mem::size_of::<SevUserDataStatus>(), STATUS_LEN);
        assert_eq!(core::mem::size_of::<SevUserDataPekCsr>(), 12);
        assert_eq!(core::mem::size_of::<SevUserDataPekCertImport>(), 24);
        assert_eq!(core::mem::size_of::<SevUserDataPdhCertExport>(), 24);
        assert_eq!(core::mem::size_of::<SevUserDataGetId2>(), 12);
    }

    #[test]
    fn status_layout() {
        let status = SevUserDataStatus {
            api_major: 0,
            api_minor: 24,
            state: 1,
            flags: 0x101,
            build: 15,
            guest_count: 3,
        };

        assert_eq!(
            status.to_bytes(),
            [0, 24, 1, 0x01, 0x01, 0, 0, 15, 3, 0, 0, 0]
        );
    }
}
