use crate::{config, tools};
use clap::Args;
use sev_platform::codec;
use sev_platform::{
    CommandId, CommandResult, Digest, Error, MeasurementRequest, Nonce, Operation, Output, Policy,
    Tik,
};
use std::path::{Path, PathBuf};

#[derive(Args, Debug)]
pub(crate) struct PekCertImportArgs
{
    /// file with the signed PEK certificate followed by the OCA certificate,
    /// defaults to pek_cert_chain.cert in the output directory
    #[arg(short, long)]
    input: Option<PathBuf>,
}

impl PekCertImportArgs
{
    pub(crate) fn operation(&self, out_dir: &Path) -> Result<Operation, Error>
    {
        let input = match &self.input {
            Some(f) => f.clone(),
            None => out_dir.join(config::PEK_CERT_CHAIN_FILE),
        };
        info!("reading certificate chain from {}", input.display());

        Ok(Operation::PekCertImport(tools::file_read(&input)?))
    }
}

/// All fields are hex, each exactly twice as long as its size in bytes.
#[derive(Args, Debug)]
pub(crate) struct CalcMeasurementArgs
{
    /// measurement context (1 byte)
    meas_ctx: String,
    /// API major version (1 byte)
    api_major: String,
    /// API minor version (1 byte)
    api_minor: String,
    /// firmware build id (1 byte)
    build_id: String,
    /// guest policy (4 bytes, most significant first)
    policy: String,
    /// launch digest (32 bytes)
    digest: String,
    /// measurement nonce (16 bytes)
    mnonce: String,
    /// transport integrity key (16 bytes)
    tik: String,
}

impl CalcMeasurementArgs
{
    pub(crate) fn operation(&self) -> Result<Operation, Error>
    {
        let request = MeasurementRequest {
            meas_ctx: codec::decode_u8("meas_ctx", &self.meas_ctx)?,
            api_major: codec::decode_u8("api_major", &self.api_major)?,
            api_minor: codec::decode_u8("api_minor", &self.api_minor)?,
            build_id: codec::decode_u8("build_id", &self.build_id)?,
            policy: Policy::from_hex(&self.policy)?,
            digest: Digest::from_hex(&self.digest)?,
            mnonce: Nonce::from_hex(&self.mnonce)?,
            tik: Tik::from_hex(&self.tik)?,
        };

        Ok(Operation::CalcMeasurement(request))
    }
}

/// Prints the output of a successful command and stores blobs in `out_dir`.
pub(crate) fn present(result: &CommandResult, out_dir: &Path) -> Result<(), Error>
{
    let output = match result.payload() {
        Some(output) => output,
        None => return Ok(()),
    };

    match (result.command, output) {
        (_, Output::None) => {}
        (_, Output::Status(status)) => println!("{}", status),
        (CommandId::PekCsr, Output::Blob(csr)) => {
            write_blob(&out_dir.join(config::PEK_CSR_FILE), csr)?
        }
        (CommandId::PdhCertExport, Output::Blob(chain)) => {
            write_blob(&out_dir.join(config::PDH_CERT_CHAIN_FILE), chain)?
        }
        (CommandId::GetId, Output::Blob(id)) => {
            write_blob(&out_dir.join(config::GET_ID_FILE), id)?;
            println!("{}", hex::encode(id));
        }
        (_, Output::Blob(data)) => println!("{}", hex::encode(data)),
    }

    Ok(())
}

fn write_blob(path: &Path, data: &[u8]) -> Result<(), Error>
{
    tools::file_write(path, data)?;
    println!("Wrote {} bytes to {}", data.len(), path.display());
    Ok(())
}
