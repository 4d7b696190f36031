//! Launch measurement verification.
//!
//! The request is marshalled here and the verdict comes from the
//! co-processor's measurement root. Nothing is recomputed on this side.

use crate::codec;
use crate::transport::{CommandId, Transport};
use crate::{Error, Platform};

/// Size of the marshalled [`MeasurementRequest`].
pub const MEASUREMENT_REQUEST_LEN: usize = 72;

macro_rules! fixed_field {
    ($(#[$meta:meta])* $name:ident, $len:literal, $field:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq)]
        pub struct $name([u8; $len]);

        impl $name {
            pub const LEN: usize = $len;

            pub fn new(bytes: [u8; $len]) -> Self {
                Self(bytes)
            }

            pub fn from_hex(text: &str) -> Result<Self, Error> {
                codec::decode_array($field, text).map(Self)
            }

            pub fn as_bytes(&self) -> &[u8; $len] {
                &self.0
            }
        }
    };
}

fixed_field!(
    /// Launch digest supplied by the guest owner.
    Digest, 32, "digest"
);
fixed_field!(
    /// Measurement nonce.
    Nonce, 16, "mnonce"
);
fixed_field!(
    /// Transport integrity key of the guest context.
    Tik, 16, "tik"
);

/// Guest policy. Written as 8 hex digits, most significant first.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Policy(pub u32);

impl Policy {
    pub fn from_hex(text: &str) -> Result<Self, Error> {
        codec::decode_array("policy", text).map(|raw| Self(u32::from_be_bytes(raw)))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MeasurementRequest {
    pub meas_ctx: u8,
    pub api_major: u8,
    pub api_minor: u8,
    pub build_id: u8,
    pub policy: Policy,
    pub digest: Digest,
    pub mnonce: Nonce,
    pub tik: Tik,
}

impl MeasurementRequest {
    pub fn to_bytes(&self) -> [u8; MEASUREMENT_REQUEST_LEN] {
        let mut raw = [0u8; MEASUREMENT_REQUEST_LEN];
        raw[0] = self.meas_ctx;
        raw[1] = self.api_major;
        raw[2] = self.api_minor;
        raw[3] = self.build_id;
        raw[4..8].copy_from_slice(&self.policy.0.to_le_bytes());
        raw[8..40].copy_from_slice(self.digest.as_bytes());
        raw[40..56].copy_from_slice(self.mnonce.as_bytes());
        raw[56..72].copy_from_slice(self.tik.as_bytes());
        raw
    }
}

impl<T: Transport> Platform<T> {
    /// Submits the request and returns the co-processor's answer unchanged.
    /// The request is consumed, it is good for one verification only.
    pub fn calc_measurement(&mut self, request: MeasurementRequest) -> Result<Vec<u8>, Error> {
        let raw = request.to_bytes();
        debug!(
            "measuring ctx {:#04x}, api {}.{}, build {}, policy {:#010x}",
            request.meas_ctx, request.api_major, request.api_minor, request.build_id, request.policy.0
        );

        let measurement = self.issue(CommandId::CalcMeasurement, &raw)?.unwrap_or_default();
        info!("measurement: {}", codec::encode(&measurement));
        Ok(measurement)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::mock::MockDevice;
    use crate::status::Status;

    fn request() -> MeasurementRequest {
        MeasurementRequest {
            meas_ctx: 0x04,
            api_major: 0x00,
            api_minor: 0x18,
            build_id: 0x0f,
            policy: Policy::from_hex("00050001").unwrap(),
            digest: Digest::new([0xd1; 32]),
            mnonce: Nonce::new([0x4e; 16]),
            tik: Tik::new([0x7c; 16]),
        }
    }

    #[test]
    fn layout() {
        let raw = request().to_bytes();

        assert_eq!(&raw[..4], &[0x04, 0x00, 0x18, 0x0f]);
        assert_eq!(&raw[4..8], &[0x01, 0x00, 0x05, 0x00]);
        assert!(raw[8..40].iter().all(|b| *b == 0xd1));
        assert!(raw[40..56].iter().all(|b| *b == 0x4e));
        assert!(raw[56..72].iter().all(|b| *b == 0x7c));
    }

    #[test]
    fn policy_is_big_endian_text() {
        assert_eq!(Policy::from_hex("00000001").unwrap(), Policy(1));
        assert_eq!(Policy::from_hex("DEADbeef").unwrap(), Policy(0xdead_beef));
        assert!(Policy::from_hex("1").is_err());
    }

    #[test]
    fn sized_fields() {
        assert!(Digest::from_hex(&"00".repeat(Digest::LEN)).is_ok());
        assert!(Digest::from_hex(&"00".repeat(Nonce::LEN)).is_err());
        assert!(Nonce::from_hex(&"00".repeat(Digest::LEN)).is_err());
        assert!(matches!(
            Tik::from_hex("zz"),
            Err(Error::MalformedInput { field: "tik", .. })
        ));
    }

    #[test]
    fn verdict_is_returned() {
        let mut dev = MockDevice::new();
        let mut platform = Platform::new(&mut dev);

        let measurement = platform.calc_measurement(request()).unwrap();
        assert_eq!(measurement, vec![0xd1; 32]);
        assert_eq!(dev.calls(), &[CommandId::CalcMeasurement]);
        assert_eq!(dev.last_payload(), Some(&request().to_bytes()[..]));
    }

    #[test]
    fn bad_measurement_is_verbatim() {
        let mut dev = MockDevice::new().fail_with(CommandId::CalcMeasurement, Status::BadMeasurement);
        let mut platform = Platform::new(&mut dev);

        assert!(matches!(
            platform.calc_measurement(request()),
            Err(Error::DeviceRejected {
                command: CommandId::CalcMeasurement,
                status: Status::BadMeasurement,
            })
        ));
        assert_eq!(dev.calls().len(), 1);
    }
}
