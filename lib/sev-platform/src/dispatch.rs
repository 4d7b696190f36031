use crate::measurement::MeasurementRequest;
use crate::status::PlatformStatus;
use crate::transport::{CommandId, Transport};
use crate::{Error, Platform};

/// One fully parsed command, ready to go to the device. Arguments are
/// decoded before an `Operation` exists, so malformed input never reaches
/// the transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operation {
    FactoryReset,
    PlatformStatus,
    PekGen,
    PekCsr,
    PdhGen,
    PdhCertExport,
    PekCertImport(Vec<u8>),
    GetId,
    CalcMeasurement(MeasurementRequest),
    SetSelfOwned,
    SetExternallyOwned,
}

impl Operation {
    pub fn id(&self) -> CommandId {
        match self {
            Operation::FactoryReset => CommandId::FactoryReset,
            Operation::PlatformStatus => CommandId::PlatformStatus,
            Operation::PekGen => CommandId::PekGen,
            Operation::PekCsr => CommandId::PekCsr,
            Operation::PdhGen => CommandId::PdhGen,
            Operation::PdhCertExport => CommandId::PdhCertExport,
            Operation::PekCertImport(_) => CommandId::PekCertImport,
            Operation::GetId => CommandId::GetId,
            Operation::CalcMeasurement(_) => CommandId::CalcMeasurement,
            Operation::SetSelfOwned => CommandId::SetSelfOwned,
            Operation::SetExternallyOwned => CommandId::SetExternallyOwned,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Output {
    None,
    Status(PlatformStatus),
    /// Certificate, signing request, chip id or measurement.
    Blob(Vec<u8>),
}

/// Outcome of one command, including failures that happened before the
/// device was contacted.
#[derive(Debug)]
pub struct CommandResult {
    pub command: CommandId,
    pub outcome: Result<Output, Error>,
}

impl CommandResult {
    pub fn failed(command: CommandId, err: Error) -> Self {
        Self {
            command,
            outcome: Err(err),
        }
    }

    pub fn is_success(&self) -> bool {
        self.outcome.is_ok()
    }

    /// `0` on success, otherwise [`Error::exit_code`].
    pub fn code(&self) -> u8 {
        match &self.outcome {
            Ok(_) => 0,
            Err(err) => err.exit_code(),
        }
    }

    pub fn payload(&self) -> Option<&Output> {
        self.outcome.as_ref().ok()
    }
}

impl<T: Transport> Platform<T> {
    /// Runs one operation. Every failure is reported in the result, nothing
    /// is retried.
    pub fn dispatch(&mut self, op: Operation) -> CommandResult {
        let command = op.id();
        info!("dispatching {}", command);

        let outcome = match op {
            Operation::FactoryReset => self.factory_reset().map(|_| Output::None),
            Operation::PlatformStatus => self.platform_status().map(Output::Status),
            Operation::PekGen => self.pek_gen().map(|_| Output::None),
            Operation::PekCsr => self.pek_csr().map(Output::Blob),
            Operation::PdhGen => self.pdh_gen().map(|_| Output::None),
            Operation::PdhCertExport => self.pdh_cert_export().map(Output::Blob),
            Operation::PekCertImport(chain) => self.pek_cert_import(&chain).map(|_| Output::None),
            Operation::GetId => self.get_id().map(Output::Blob),
            Operation::CalcMeasurement(request) => {
                self.calc_measurement(request).map(Output::Blob)
            }
            Operation::SetSelfOwned => self.set_self_owned().map(|_| Output::None),
            Operation::SetExternallyOwned => self.set_externally_owned().map(|_| Output::None),
        };

        // the caller reports the failure
        if let Err(err) = &outcome {
            debug!("{}: {}", command, err);
        }
        CommandResult { command, outcome }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::measurement::{Digest, Nonce, Policy, Tik};
    use crate::mock::MockDevice;
    use crate::status::{PlatformState, Status};

    #[test]
    fn ids_follow_operations() {
        assert_eq!(Operation::PekCertImport(vec![]).id(), CommandId::PekCertImport);
        assert_eq!(Operation::SetExternallyOwned.id(), CommandId::SetExternallyOwned);
    }

    #[test]
    fn status_output() {
        let mut dev = MockDevice::initialized();
        let mut platform = Platform::new(&mut dev);

        let result = platform.dispatch(Operation::PlatformStatus);
        assert!(result.is_success());
        assert_eq!(result.code(), 0);
        match result.payload() {
            Some(Output::Status(status)) => assert_eq!(status.state, PlatformState::Initialized),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn device_status_becomes_code() {
        let mut dev = MockDevice::new();
        let mut platform = Platform::new(&mut dev);

        let result = platform.dispatch(Operation::PdhCertExport);
        assert!(!result.is_success());
        assert_eq!(result.command, CommandId::PdhCertExport);
        assert_eq!(result.code(), u32::from(Status::InvalidPlatformState) as u8);
        assert!(result.payload().is_none());
    }

    #[test]
    fn measurement_output() {
        let mut dev = MockDevice::new();
        let mut platform = Platform::new(&mut dev);

        let request = MeasurementRequest {
            meas_ctx: 1,
            api_major: 1,
            api_minor: 0,
            build_id: 5,
            policy: Policy(1),
            digest: Digest::new([0xab; 32]),
            mnonce: Nonce::new([0; 16]),
            tik: Tik::new([0; 16]),
        };
        let result = platform.dispatch(Operation::CalcMeasurement(request));
        assert_eq!(result.payload(), Some(&Output::Blob(vec![0xab; 32])));
    }

    #[test]
    fn local_failure() {
        let result = CommandResult::failed(CommandId::GetId, Error::Usage("get_id takes no arguments".into()));

        assert!(!result.is_success());
        assert_eq!(result.code(), 0x40);
    }
}
