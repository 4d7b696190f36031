mod config;
mod device;
mod subcmds;
mod tools;

#[macro_use]
extern crate log;

use clap::{error::ErrorKind, ArgAction, CommandFactory, Parser, Subcommand};
use colored::Colorize;
use sev_platform::{CommandId, CommandResult, Error, Operation, Platform, Transport};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Cli
{
    #[command(subcommand)]
    command: Option<Commands>,

    /// SEV platform device
    #[arg(short, long, global = true, default_value = config::DEV)]
    device: String,

    /// directory for the certificates and ids written by the commands
    #[arg(short, long, global = true, default_value = config::OUT_DIR)]
    out_dir: PathBuf,

    /// more logging, can be repeated
    #[arg(short, long, global = true, action = ArgAction::Count)]
    verbose: u8,
}

#[derive(Subcommand, Debug)]
#[command(rename_all = "snake_case")]
enum Commands
{
    /// Destroys all platform keys and returns to the uninitialized state
    FactoryReset,
    /// Prints the platform status
    PlatformStatus,
    /// Regenerates the Platform Endorsement Key
    PekGen,
    /// Writes a signing request for the PEK
    PekCsr,
    /// Regenerates the Platform Diffie-Hellman key
    PdhGen,
    /// Writes the PDH certificate and its chain
    PdhCertExport,
    /// Imports a PEK certificate chain signed by an external owner
    PekCertImport(subcmds::PekCertImportArgs),
    /// Writes and prints the chip id
    GetId,
    /// Verifies a launch measurement
    CalcMeasurement(subcmds::CalcMeasurementArgs),
    /// Makes the platform self-owned
    SetSelfOwned,
    /// Hands the platform to the owner of the imported certificate chain
    SetExternallyOwned,
}

impl Commands
{
    fn id(&self) -> CommandId
    {
        match self {
            Commands::FactoryReset => CommandId::FactoryReset,
            Commands::PlatformStatus => CommandId::PlatformStatus,
            Commands::PekGen => CommandId::PekGen,
            Commands::PekCsr => CommandId::PekCsr,
            Commands::PdhGen => CommandId::PdhGen,
            Commands::PdhCertExport => CommandId::PdhCertExport,
            Commands::PekCertImport(_) => CommandId::PekCertImport,
            Commands::GetId => CommandId::GetId,
            Commands::CalcMeasurement(_) => CommandId::CalcMeasurement,
            Commands::SetSelfOwned => CommandId::SetSelfOwned,
            Commands::SetExternallyOwned => CommandId::SetExternallyOwned,
        }
    }

    /// Decodes the arguments. Runs before the device is opened.
    fn operation(&self, out_dir: &Path) -> Result<Operation, Error>
    {
        Ok(match self {
            Commands::FactoryReset => Operation::FactoryReset,
            Commands::PlatformStatus => Operation::PlatformStatus,
            Commands::PekGen => Operation::PekGen,
            Commands::PekCsr => Operation::PekCsr,
            Commands::PdhGen => Operation::PdhGen,
            Commands::PdhCertExport => Operation::PdhCertExport,
            Commands::PekCertImport(args) => args.operation(out_dir)?,
            Commands::GetId => Operation::GetId,
            Commands::CalcMeasurement(args) => args.operation()?,
            Commands::SetSelfOwned => Operation::SetSelfOwned,
            Commands::SetExternallyOwned => Operation::SetExternallyOwned,
        })
    }
}

fn usage(err: clap::Error) -> Error
{
    Error::Usage(err.to_string())
}

fn init_logger(verbose: u8)
{
    let level = match verbose {
        0 => log::LevelFilter::Warn,
        1 => log::LevelFilter::Info,
        2 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    };

    env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .init();
}

/// Decodes the command, then opens the transport and runs it. A command
/// with bad arguments never opens the transport.
fn run<T, F>(command: &Commands, out_dir: &Path, open: F) -> CommandResult
where
    T: Transport,
    F: FnOnce() -> Result<T, Error>,
{
    let id = command.id();
    let op = match command.operation(out_dir) {
        Ok(op) => op,
        Err(e) => return CommandResult::failed(id, e),
    };
    let mut platform = match open() {
        Ok(transport) => Platform::new(transport),
        Err(e) => return CommandResult::failed(id, e),
    };

    match platform.platform_status() {
        Ok(status) => println!("Firmware Version: {}", status.firmware_version()),
        Err(e) => warn!("firmware version unavailable: {}", e),
    }

    let result = platform.dispatch(op);
    match subcmds::present(&result, out_dir) {
        Ok(()) => result,
        Err(e) => CommandResult::failed(id, e),
    }
}

fn report(result: &CommandResult) -> ExitCode
{
    if let Err(e) = &result.outcome {
        eprintln!("{}: {}", "error".red(), e);
    }

    if result.is_success() {
        println!("{}", "Command Successful".green());
    } else {
        println!("{} 0x{:02x}", "Command Unsuccessful:".red(), result.code());
    }
    ExitCode::from(result.code())
}

fn main() -> ExitCode
{
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) if matches!(e.kind(), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion) => {
            e.exit()
        }
        Err(e) => {
            let _ = e.print();
            let err = usage(e);
            println!("{} 0x{:02x}", "Command Unsuccessful:".red(), err.exit_code());
            return ExitCode::from(err.exit_code());
        }
    };

    init_logger(cli.verbose);

    let command = match &cli.command {
        Some(command) => command,
        None => {
            let _ = Cli::command().print_help();
            return ExitCode::SUCCESS;
        }
    };

    println!("Command: {}", command.id());
    let result = run(command, &cli.out_dir, || device::PspDevice::open(&cli.device));
    report(&result)
}

#[cfg(test)]
mod test
{
    use super::*;
    use sev_platform::mock::MockDevice;
    use sev_platform::Output;

    const ZERO_DIGEST: &str = "0000000000000000000000000000000000000000000000000000000000000000";
    const ZERO_16: &str = "00000000000000000000000000000000";

    fn parse(args: &[&str]) -> Result<Cli, Error>
    {
        Cli::try_parse_from(std::iter::once("sev-tool").chain(args.iter().copied())).map_err(usage)
    }

    fn measurement_args<'a>(digest: &'a str) -> Vec<&'a str>
    {
        vec!["calc_measurement", "01", "01", "00", "05", "00000001", digest, ZERO_16, ZERO_16]
    }

    #[test]
    fn every_name_maps_to_its_command()
    {
        let full = measurement_args(ZERO_DIGEST);

        for id in CommandId::ALL {
            let args = match id {
                CommandId::CalcMeasurement => full.clone(),
                _ => vec![id.to_str()],
            };
            let cli = parse(&args).unwrap();
            assert_eq!(cli.command.unwrap().id(), *id);
        }
    }

    #[test]
    fn unknown_command()
    {
        let err = parse(&["pek_export"]).unwrap_err();

        assert!(matches!(err, Error::Usage(_)));
        assert_ne!(err.exit_code(), 0);
    }

    #[test]
    fn measurement_arity()
    {
        let mut args = measurement_args(ZERO_DIGEST);
        args.pop();
        assert!(matches!(parse(&args), Err(Error::Usage(_))));

        let mut args = measurement_args(ZERO_DIGEST);
        args.push("00");
        assert!(matches!(parse(&args), Err(Error::Usage(_))));

        assert!(matches!(parse(&["get_id", "00"]), Err(Error::Usage(_))));
    }

    const MEASUREMENT_FIELDS: [(&str, usize); 8] = [
        ("meas_ctx", 1),
        ("api_major", 1),
        ("api_minor", 1),
        ("build_id", 1),
        ("policy", 4),
        ("digest", 32),
        ("mnonce", 16),
        ("tik", 16),
    ];

    #[test]
    fn wrong_width_never_reaches_device()
    {
        for (pos, (field, len)) in MEASUREMENT_FIELDS.iter().enumerate() {
            let bad = [
                format!("{}0", "00".repeat(*len)),
                "00".repeat(len - 1),
                "00".repeat(len + 1),
                format!("g{}", &"00".repeat(*len)[1..]),
            ];

            for text in &bad {
                let mut args = measurement_args(ZERO_DIGEST);
                args[pos + 1] = text.as_str();
                let cli = parse(&args).unwrap();

                let mut dev = MockDevice::new();
                let transport = &mut dev;
                let result = run(&cli.command.unwrap(), &cli.out_dir, move || Ok(transport));

                match &result.outcome {
                    Err(Error::MalformedInput { field: f, .. }) => assert_eq!(f, field),
                    other => panic!("{} = {:?}: unexpected {:?}", field, text, other),
                }
                assert_eq!(result.code(), 0x41);
                assert_eq!(dev.call_count(), 0);
            }
        }
    }

    #[test]
    fn measurement_end_to_end()
    {
        let cli = parse(&measurement_args(ZERO_DIGEST)).unwrap();

        let mut dev = MockDevice::new();
        let transport = &mut dev;
        let result = run(&cli.command.unwrap(), &cli.out_dir, move || Ok(transport));

        assert!(result.is_success());
        assert_eq!(result.code(), 0);
        assert_eq!(result.payload(), Some(&Output::Blob(vec![0; 32])));
        assert_eq!(
            dev.calls(),
            &[CommandId::PlatformStatus, CommandId::CalcMeasurement]
        );
    }

    #[test]
    fn device_error_is_exit_code()
    {
        let cli = parse(&["pek_csr"]).unwrap();

        let mut dev = MockDevice::new();
        let transport = &mut dev;
        let result = run(&cli.command.unwrap(), &cli.out_dir, move || Ok(transport));

        assert_eq!(result.command, CommandId::PekCsr);
        assert_eq!(result.code(), 0x01);
    }

    #[test]
    fn get_id_is_written()
    {
        let dir = std::env::temp_dir().join(format!("sev-tool-test-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let cli = parse(&["-o", dir.to_str().unwrap(), "get_id"]).unwrap();

        let mut dev = MockDevice::new();
        let transport = &mut dev;
        let result = run(&cli.command.unwrap(), &cli.out_dir, move || Ok(transport));

        assert!(result.is_success());
        let id = tools::file_read(&dir.join(config::GET_ID_FILE)).unwrap();
        assert_eq!(id.len(), 64);
        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn missing_chain_file()
    {
        let cli = parse(&["pek_cert_import", "-i", "/nonexistent/chain.cert"]).unwrap();

        let mut dev = MockDevice::initialized();
        let transport = &mut dev;
        let result = run(&cli.command.unwrap(), &cli.out_dir, move || Ok(transport));

        assert!(matches!(result.outcome, Err(Error::Io(_))));
        assert_eq!(dev.call_count(), 0);
    }
}
