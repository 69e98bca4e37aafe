use clap::{Args, Subcommand};
use rspstub_packet::DEFAULT_MAX_BODY_LEN;

use crate::exit::CliResult;
use crate::output::OutputFormat;

pub mod checksum;
pub mod features;
pub mod serve;
pub mod version;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Wait for one debugger and serve it a simulated target.
    Serve(ServeArgs),
    /// Show the protocol features advertised in qSupported.
    Features(FeaturesArgs),
    /// Frame a packet body and show its checksum.
    Checksum(ChecksumArgs),
    /// Show version information.
    Version(VersionArgs),
}

pub fn run(command: Command, format: OutputFormat) -> CliResult<i32> {
    match command {
        Command::Serve(args) => serve::run(args, format),
        Command::Features(args) => features::run(args, format),
        Command::Checksum(args) => checksum::run(args, format),
        Command::Version(args) => version::run(args),
    }
}

#[derive(Args, Debug)]
pub struct ServeArgs {
    /// TCP port to listen on. 0 picks an ephemeral port.
    #[arg(long, short = 'p', env = "RSPSTUB_PORT", default_value_t = 1234)]
    pub port: u16,
    /// Address to bind.
    #[arg(long, default_value = "0.0.0.0")]
    pub host: String,
    /// Number of general registers in the simulated target.
    #[arg(long, default_value_t = 32)]
    pub registers: usize,
    /// First address of simulated memory (decimal or 0x-prefixed hex).
    #[arg(long, value_parser = parse_u64, default_value = "0")]
    pub memory_base: u64,
    /// Size of simulated memory in bytes (decimal or 0x-prefixed hex).
    #[arg(long, value_parser = parse_usize, default_value = "0x10000")]
    pub memory_size: usize,
    /// Maximum packet body length (decimal or 0x-prefixed hex).
    #[arg(long, value_parser = parse_usize, default_value_t = DEFAULT_MAX_BODY_LEN)]
    pub max_packet: usize,
}

#[derive(Args, Debug)]
pub struct FeaturesArgs {
    /// Maximum packet body length to advertise.
    #[arg(long, value_parser = parse_usize, default_value_t = DEFAULT_MAX_BODY_LEN)]
    pub max_packet: usize,
}

#[derive(Args, Debug)]
pub struct ChecksumArgs {
    /// Packet body, without framing.
    pub body: String,
}

#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Show extended build provenance.
    #[arg(long)]
    pub extended: bool,
}

pub fn parse_u64(raw: &str) -> Result<u64, String> {
    let raw = raw.trim();
    let parsed = match raw.strip_prefix("0x").or_else(|| raw.strip_prefix("0X")) {
        Some(hex) => u64::from_str_radix(hex, 16),
        None => raw.parse::<u64>(),
    };
    parsed.map_err(|err| format!("invalid number '{raw}': {err}"))
}

pub fn parse_usize(raw: &str) -> Result<usize, String> {
    let value = parse_u64(raw)?;
    usize::try_from(value).map_err(|_| format!("value '{raw}' is too large"))
}
