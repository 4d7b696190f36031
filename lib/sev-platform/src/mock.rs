//! In-memory co-processor used by the unit tests and by the `mock` feature.
//!
//! It follows the firmware state machine closely enough to exercise the
//! client: commands mutate the emulated state and answer with the status a
//! real device would give.

use crate::measurement::MEASUREMENT_REQUEST_LEN;
use crate::status::{Owner, PlatformState, PlatformStatus, Status};
use crate::transport::{CommandId, Reply, Transport};
use crate::Error;
use std::collections::{HashMap, HashSet};

const API_MAJOR: u8 = 0;
const API_MINOR: u8 = 24;
const BUILD: u8 = 15;
const BLOB_LEN: usize = 0x824;
const ID_LEN: usize = 64;

#[derive(Debug)]
pub struct MockDevice {
    state: PlatformState,
    owner: Owner,
    pek: bool,
    pdh: bool,
    oca: bool,
    calls: Vec<CommandId>,
    last_payload: Option<Vec<u8>>,
    failures: HashMap<CommandId, Status>,
    empty: HashSet<CommandId>,
}

impl MockDevice {
    /// Fresh out of reset: uninitialized, self-owned, no keys.
    pub fn new() -> Self {
        Self {
            state: PlatformState::Uninitialized,
            owner: Owner::SelfOwned,
            pek: false,
            pdh: false,
            oca: false,
            calls: Vec::new(),
            last_payload: None,
            failures: HashMap::new(),
            empty: HashSet::new(),
        }
    }

    /// Initialized and self-owned with both PEK and PDH generated.
    pub fn initialized() -> Self {
        Self {
            state: PlatformState::Initialized,
            pek: true,
            pdh: true,
            ..Self::new()
        }
    }

    /// Answers every `command` with `status`, without touching the state.
    pub fn fail_with(mut self, command: CommandId, status: Status) -> Self {
        self.failures.insert(command, status);
        self
    }

    /// Answers `command` with success and no data.
    pub fn empty_reply(mut self, command: CommandId) -> Self {
        self.empty.insert(command);
        self
    }

    pub fn calls(&self) -> &[CommandId] {
        &self.calls
    }

    pub fn call_count(&self) -> usize {
        self.calls.len()
    }

    pub fn last_payload(&self) -> Option<&[u8]> {
        self.last_payload.as_deref()
    }

    pub fn owner(&self) -> Owner {
        self.owner
    }

    pub fn state(&self) -> PlatformState {
        self.state
    }

    fn status(&self) -> PlatformStatus {
        PlatformStatus {
            api_major: API_MAJOR,
            api_minor: API_MINOR,
            build: BUILD,
            state: self.state,
            owner: self.owner,
            config_es: false,
            guest_count: 0,
        }
    }

    fn init(&mut self) {
        if self.state == PlatformState::Uninitialized {
            self.state = PlatformState::Initialized;
        }
    }

    fn blob(fill: u8) -> Reply {
        Reply::success(Some(vec![fill; BLOB_LEN]))
    }

    fn execute(&mut self, command: CommandId, payload: &[u8]) -> Reply {
        match command {
            CommandId::FactoryReset => {
                let calls = core::mem::take(&mut self.calls);
                let failures = core::mem::take(&mut self.failures);
                let empty = core::mem::take(&mut self.empty);
                *self = Self {
                    calls,
                    failures,
                    empty,
                    ..Self::new()
                };
                Reply::success(None)
            }
            CommandId::PlatformStatus => Reply::success(Some(self.status().to_bytes().to_vec())),
            CommandId::PekGen => {
                if self.state == PlatformState::Working {
                    return Reply::status(Status::InvalidPlatformState);
                }
                self.init();
                self.pek = true;
                // the PDH is signed by the PEK and does not survive it
                self.pdh = false;
                self.owner = Owner::SelfOwned;
                self.oca = false;
                Reply::success(None)
            }
            CommandId::PekCsr if !self.pek => Reply::status(Status::InvalidPlatformState),
            CommandId::PekCsr => Self::blob(0xc5),
            CommandId::PdhGen => {
                if self.state == PlatformState::Working {
                    return Reply::status(Status::InvalidPlatformState);
                }
                self.init();
                self.pdh = true;
                Reply::success(None)
            }
            CommandId::PdhCertExport if !self.pdh => Reply::status(Status::InvalidPlatformState),
            CommandId::PdhCertExport => Self::blob(0xd4),
            CommandId::PekCertImport => {
                if self.state != PlatformState::Initialized {
                    Reply::status(Status::InvalidPlatformState)
                } else if self.owner == Owner::ExternallyOwned {
                    Reply::status(Status::AlreadyOwned)
                } else if payload.is_empty() {
                    Reply::status(Status::InvalidCertificate)
                } else {
                    self.oca = true;
                    Reply::success(None)
                }
            }
            CommandId::GetId => Reply::success(Some(vec![0x1d; ID_LEN])),
            CommandId::CalcMeasurement => {
                if payload.len() != MEASUREMENT_REQUEST_LEN {
                    return Reply::status(Status::InvalidLength);
                }
                // agrees with whatever digest it is given
                Reply::success(Some(payload[8..40].to_vec()))
            }
            CommandId::SetSelfOwned => {
                if self.state == PlatformState::Working {
                    return Reply::status(Status::InvalidPlatformState);
                }
                self.init();
                self.owner = Owner::SelfOwned;
                self.pek = true;
                self.oca = false;
                Reply::success(None)
            }
            CommandId::SetExternallyOwned => {
                if !self.oca {
                    return Reply::status(Status::InvalidCertificate);
                }
                self.owner = Owner::ExternallyOwned;
                Reply::success(None)
            }
        }
    }
}

impl Default for MockDevice {
    fn default() -> Self {
        Self::new()
    }
}

impl Transport for MockDevice {
    fn send(&mut self, command: CommandId, payload: &[u8]) -> Result<Reply, Error> {
        self.calls.push(command);
        self.last_payload = Some(payload.to_vec());

        if let Some(status) = self.failures.get(&command) {
            return Ok(Reply::status(*status));
        }

        let reply = self.execute(command, payload);
        if reply.status == Status::Success && self.empty.contains(&command) {
            return Ok(Reply::success(None));
        }
        Ok(reply)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn records_rejected_calls() {
        let mut dev = MockDevice::new().fail_with(CommandId::GetId, Status::HwErrorUnsafe);

        let reply = dev.send(CommandId::GetId, &[]).unwrap();
        assert_eq!(reply.status, Status::HwErrorUnsafe);
        assert_eq!(dev.call_count(), 1);
    }

    #[test]
    fn reset_keeps_history() {
        let mut dev = MockDevice::initialized();

        dev.send(CommandId::FactoryReset, &[]).unwrap();
        assert_eq!(dev.state(), PlatformState::Uninitialized);
        assert_eq!(dev.calls(), &[CommandId::FactoryReset]);
    }

    #[test]
    fn short_measurement_request() {
        let mut dev = MockDevice::new();

        let reply = dev.send(CommandId::CalcMeasurement, &[0; 71]).unwrap();
        assert_eq!(reply.status, Status::InvalidLength);
    }
}
