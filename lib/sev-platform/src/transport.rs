use crate::status::Status;
use crate::Error;
use core::fmt;

macro_rules! define_interface {
    (command {$($variant:ident = $val:literal => $name:literal),*,}) => {
        /// Commands understood by the co-processor transport.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum CommandId {
            $($variant,)*
        }

        impl CommandId {
            pub const ALL: &'static [CommandId] = &[$(CommandId::$variant),*];

            pub fn code(&self) -> u32 {
                match self {
                    $(CommandId::$variant => $val,)*
                }
            }

            /// Symbolic name used on the command line.
            pub fn to_str(&self) -> &'static str {
                match self {
                    $(CommandId::$variant => $name,)*
                }
            }
        }
    };
}

define_interface! {
    command {
        FactoryReset        = 0  => "factory_reset",
        PlatformStatus      = 1  => "platform_status",
        PekGen              = 2  => "pek_gen",
        PekCsr              = 3  => "pek_csr",
        PdhGen              = 4  => "pdh_gen",
        PdhCertExport       = 5  => "pdh_cert_export",
        PekCertImport       = 6  => "pek_cert_import",
        GetId               = 7  => "get_id",
        CalcMeasurement     = 8  => "calc_measurement",
        SetSelfOwned        = 9  => "set_self_owned",
        SetExternallyOwned  = 10 => "set_externally_owned",
    }
}

impl fmt::Display for CommandId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.to_str())
    }
}

/// What the co-processor answered: a status and, for queries, output data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    pub status: Status,
    pub data: Option<Vec<u8>>,
}

impl Reply {
    pub fn success(data: Option<Vec<u8>>) -> Self {
        Self {
            status: Status::Success,
            data,
        }
    }

    pub fn status(status: Status) -> Self {
        Self { status, data: None }
    }
}

/// Delivers one opaque command buffer to the co-processor and waits for it to
/// complete.
///
/// Implementations return `Ok` whenever the device produced a status, even a
/// failing one. `Err` is reserved for not reaching the device at all.
pub trait Transport {
    fn send(&mut self, command: CommandId, payload: &[u8]) -> Result<Reply, Error>;
}

impl<T: Transport + ?Sized> Transport for &mut T {
    fn send(&mut self, command: CommandId, payload: &[u8]) -> Result<Reply, Error> {
        (**self).send(command, payload)
    }
}
