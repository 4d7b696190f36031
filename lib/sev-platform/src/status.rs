use core::fmt;

/// Size of the packed platform status reply.
pub const STATUS_LEN: usize = 12;

const FLAG_OWNER: u32 = 1 << 0;
const FLAG_CONFIG_ES: u32 = 1 << 8;

macro_rules! define_status {
    ($($variant:ident = $val:literal => $desc:expr),*,) => {
        /// Status codes returned by the SEV firmware.
        #[derive(Debug, Clone, Copy, PartialEq, Eq)]
        pub enum Status {
            $($variant,)*
            Unknown(u32),
        }

        impl From<u32> for Status {
            fn from(code: u32) -> Self {
                match code {
                    $($val => Status::$variant,)*
                    other => Status::Unknown(other),
                }
            }
        }

        impl From<Status> for u32 {
            fn from(status: Status) -> Self {
                match status {
                    $(Status::$variant => $val,)*
                    Status::Unknown(other) => other,
                }
            }
        }

        impl Status {
            pub fn as_str(&self) -> &'static str {
                match self {
                    $(Status::$variant => $desc,)*
                    Status::Unknown(_) => "unknown status",
                }
            }
        }
    };
}

define_status! {
    Success                 = 0x00 => "success",
    InvalidPlatformState    = 0x01 => "invalid platform state",
    InvalidGuestState       = 0x02 => "invalid guest state",
    InvalidConfig           = 0x03 => "invalid config",
    InvalidLength           = 0x04 => "invalid length",
    AlreadyOwned            = 0x05 => "already owned",
    InvalidCertificate      = 0x06 => "invalid certificate",
    PolicyFailure           = 0x07 => "policy failure",
    Inactive                = 0x08 => "inactive",
    InvalidAddress          = 0x09 => "invalid address",
    BadSignature            = 0x0a => "bad signature",
    BadMeasurement          = 0x0b => "bad measurement",
    AsidOwned               = 0x0c => "ASID owned",
    InvalidAsid             = 0x0d => "invalid ASID",
    WbinvdRequired          = 0x0e => "WBINVD required",
    DfFlushRequired         = 0x0f => "DF_FLUSH required",
    InvalidGuest            = 0x10 => "invalid guest",
    InvalidCommand          = 0x11 => "invalid command",
    Active                  = 0x12 => "active",
    HwErrorPlatform         = 0x13 => "hardware error (platform)",
    HwErrorUnsafe           = 0x14 => "hardware error (unsafe)",
    Unsupported             = 0x15 => "unsupported",
    InvalidParam            = 0x16 => "invalid parameter",
    ResourceLimit           = 0x17 => "resource limit",
    SecureDataInvalid       = 0x18 => "secure data invalid",
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({:#04x})", self.as_str(), u32::from(*self))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlatformState {
    Uninitialized,
    Initialized,
    Working,
}

impl PlatformState {
    fn from_raw(raw: u8) -> Option<Self> {
        match raw {
            0 => Some(Self::Uninitialized),
            1 => Some(Self::Initialized),
            2 => Some(Self::Working),
            _ => None,
        }
    }

    #[cfg(any(test, feature = "mock"))]
    fn raw(self) -> u8 {
        match self {
            Self::Uninitialized => 0,
            Self::Initialized => 1,
            Self::Working => 2,
        }
    }
}

impl fmt::Display for PlatformState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Uninitialized => "uninitialized",
            Self::Initialized => "initialized",
            Self::Working => "working",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Owner {
    SelfOwned,
    ExternallyOwned,
}

impl fmt::Display for Owner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::SelfOwned => "self-owned",
            Self::ExternallyOwned => "externally owned",
        })
    }
}

/// Snapshot returned by the `platform_status` command. Only valid for the
/// invocation that produced it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlatformStatus {
    pub api_major: u8,
    pub api_minor: u8,
    pub build: u8,
    pub state: PlatformState,
    pub owner: Owner,
    pub config_es: bool,
    pub guest_count: u32,
}

impl PlatformStatus {
    /// Parses the packed little-endian reply. Returns `None` for a reply of
    /// the wrong size or an unknown platform state.
    pub fn from_bytes(raw: &[u8]) -> Option<Self> {
        let raw: &[u8; STATUS_LEN] = raw.try_into().ok()?;
        let flags = u32::from_le_bytes([raw[3], raw[4], raw[5], raw[6]]);

        Some(Self {
            api_major: raw[0],
            api_minor: raw[1],
            state: PlatformState::from_raw(raw[2])?,
            owner: if flags & FLAG_OWNER != 0 {
                Owner::ExternallyOwned
            } else {
                Owner::SelfOwned
            },
            config_es: flags & FLAG_CONFIG_ES != 0,
            build: raw[7],
            guest_count: u32::from_le_bytes([raw[8], raw[9], raw[10], raw[11]]),
        })
    }

    #[cfg(any(test, feature = "mock"))]
    pub fn to_bytes(&self) -> [u8; STATUS_LEN] {
        let mut flags = 0u32;
        if self.owner == Owner::ExternallyOwned {
            flags |= FLAG_OWNER;
        }
        if self.config_es {
            flags |= FLAG_CONFIG_ES;
        }

        let mut raw = [0u8; STATUS_LEN];
        raw[0] = self.api_major;
        raw[1] = self.api_minor;
        raw[2] = self.state.raw();
        raw[3..7].copy_from_slice(&flags.to_le_bytes());
        raw[7] = self.build;
        raw[8..12].copy_from_slice(&self.guest_count.to_le_bytes());
        raw
    }

    /// One line firmware summary, e.g. `API_Major: 0, API_Minor: 24, BuildID: 15`.
    pub fn firmware_version(&self) -> String {
        format!(
            "API_Major: {}, API_Minor: {}, BuildID: {}",
            self.api_major, self.api_minor, self.build
        )
    }
}

impl fmt::Display for PlatformStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "API version:       {}.{}", self.api_major, self.api_minor)?;
        writeln!(f, "Build:             {}", self.build)?;
        writeln!(f, "Platform state:    {}", self.state)?;
        writeln!(f, "Owner:             {}", self.owner)?;
        writeln!(f, "SEV-ES configured: {}", self.config_es)?;
        write!(f, "Guest count:       {}", self.guest_count)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn parse_status() {
        let raw = [0, 24, 1, 0x01, 0x01, 0, 0, 15, 3, 0, 0, 0];
        let status = PlatformStatus::from_bytes(&raw).unwrap();

        assert_eq!(status.api_major, 0);
        assert_eq!(status.api_minor, 24);
        assert_eq!(status.build, 15);
        assert_eq!(status.state, PlatformState::Initialized);
        assert_eq!(status.owner, Owner::ExternallyOwned);
        assert!(status.config_es);
        assert_eq!(status.guest_count, 3);
        assert_eq!(status.to_bytes(), raw);
        assert_eq!(status.firmware_version(), "API_Major: 0, API_Minor: 24, BuildID: 15");
    }

    #[test]
    fn reject_bad_status() {
        assert!(PlatformStatus::from_bytes(&[0; STATUS_LEN - 1]).is_none());
        assert!(PlatformStatus::from_bytes(&[0; STATUS_LEN + 1]).is_none());

        let mut raw = [0u8; STATUS_LEN];
        raw[2] = 3;
        assert!(PlatformStatus::from_bytes(&raw).is_none());
    }

    #[test]
    fn status_codes() {
        assert_eq!(Status::from(0x0b), Status::BadMeasurement);
        assert_eq!(u32::from(Status::Unsupported), 0x15);
        assert_eq!(Status::from(0x99), Status::Unknown(0x99));
        assert_eq!(u32::from(Status::Unknown(0x99)), 0x99);
        assert_eq!(Status::InvalidCertificate.to_string(), "invalid certificate (0x06)");
    }
}
