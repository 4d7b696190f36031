use sev_platform::{CommandId, Error, Reply, Status, Transport};

/// [`Transport`] over the Linux `/dev/sev` platform device.
pub(crate) struct PspDevice
{
    dev: sev_ioctl::Device,
}

impl PspDevice
{
    pub(crate) fn open(path: &str) -> Result<Self, Error>
    {
        let dev = sev_ioctl::Device::open(path).map_err(|e| Error::Transport(Box::new(e)))?;
        debug!("opened {}", path);
        Ok(Self { dev })
    }
}

impl Transport for PspDevice
{
    fn send(&mut self, command: CommandId, payload: &[u8]) -> Result<Reply, Error>
    {
        let result = match command {
            CommandId::FactoryReset => self.dev.factory_reset().map(|_| None),
            CommandId::PlatformStatus => self.dev.platform_status().map(|s| Some(s.to_vec())),
            // a fresh PEK drops any OCA, which hands the platform back to itself
            CommandId::PekGen | CommandId::SetSelfOwned => self.dev.pek_gen().map(|_| None),
            CommandId::PekCsr => self.dev.pek_csr().map(Some),
            CommandId::PdhGen => self.dev.pdh_gen().map(|_| None),
            CommandId::PdhCertExport => self.dev.pdh_cert_export().map(Some),
            CommandId::PekCertImport => self.dev.pek_cert_import(payload).map(|_| None),
            CommandId::GetId => self.dev.get_id().map(Some),
            CommandId::CalcMeasurement | CommandId::SetExternallyOwned => {
                warn!("{} has no platform device opcode", command);
                return Ok(Reply::status(Status::Unsupported));
            }
        };

        into_reply(result)
    }
}

/// Only a status filled in by the firmware becomes a [`Reply`]. Anything
/// refused before the ioctl was issued is a transport failure.
fn into_reply(result: Result<Option<Vec<u8>>, sev_ioctl::Error>) -> Result<Reply, Error>
{
    match result {
        Ok(data) => Ok(Reply::success(data)),
        Err(sev_ioctl::Error::Firmware(code)) => Ok(Reply::status(Status::from(code))),
        Err(e) => Err(Error::Transport(Box::new(e))),
    }
}

#[cfg(test)]
mod test
{
    use super::*;

    #[test]
    fn firmware_status_is_a_reply()
    {
        let reply = into_reply(Err(sev_ioctl::Error::Firmware(0x06))).unwrap();
        assert_eq!(reply.status, Status::InvalidCertificate);

        let reply = into_reply(Ok(Some(vec![1, 2]))).unwrap();
        assert_eq!(reply, Reply::success(Some(vec![1, 2])));
    }

    #[test]
    fn unsplittable_chain_is_local()
    {
        for len in [0, 0x824 + 1] {
            let err = into_reply(Err(sev_ioctl::Error::CertChainLength(len))).unwrap_err();
            assert!(matches!(err, Error::Transport(_)));
            assert_eq!(err.exit_code(), 0x45);
        }
    }
}
