use std::io::Write;
use std::path::PathBuf;

use git_version::git_version;
use thiserror::Error;

pub use dreamcast;
use dreamcast::{DEFAULT_LOAD_ADDR, Dreamcast, LoadError};
use sh4_core::MapError;

pub const GIT_HASH: &str = git_version!(args = ["--always", "--dirty=-modified"], fallback = "unknown");

pub const DEFAULT_COUNT: usize = 32;

pub const USAGE: &str = "\
usage: nulldc <file> [--base ADDR] [--count N] [--raw]

  --base ADDR   load address for raw images, start address for ELF files
  --count N     number of instructions to list (default 32)
  --raw         treat <file> as a raw binary even if it looks like an ELF
  -V, --version print version
  -h, --help    print this message

RUST_LOG selects the log level (default: warn).";

#[derive(Debug, Error)]
pub enum CliError {
    #[error("{0}\n\n{usage}", usage = USAGE)]
    Usage(String),
    #[error("invalid value {value:?} for {flag}")]
    BadNumber { flag: &'static str, value: String },
    #[error("cannot read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error(transparent)]
    Load(#[from] LoadError),
    #[error("memory map setup failed: {0}")]
    Map(#[from] MapError),
    #[error("cannot write output: {0}")]
    Output(#[source] std::io::Error),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Disassemble(Options),
    Help,
    Version,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Options {
    pub path: PathBuf,
    pub base: Option<u32>,
    pub count: usize,
    pub raw: bool,
}

/// Accepts `0x`-prefixed hex or decimal.
fn parse_number(flag: &'static str, value: &str) -> Result<u64, CliError> {
    let parsed = match value.strip_prefix("0x").or_else(|| value.strip_prefix("0X")) {
        Some(hex) => u64::from_str_radix(&hex.replace('_', ""), 16),
        None => value.replace('_', "").parse(),
    };
    parsed.map_err(|_| CliError::BadNumber {
        flag,
        value: value.to_string(),
    })
}

impl Command {
    /// Parses the arguments after the program name.
    pub fn parse<I: IntoIterator<Item = String>>(args: I) -> Result<Self, CliError> {
        let mut path = None;
        let mut base = None;
        let mut count = DEFAULT_COUNT;
        let mut raw = false;

        let mut args = args.into_iter();
        while let Some(arg) = args.next() {
            match arg.as_str() {
                "-h" | "--help" => return Ok(Command::Help),
                "-V" | "--version" => return Ok(Command::Version),
                "--raw" => raw = true,
                "--base" | "--count" => {
                    let flag = if arg == "--base" { "--base" } else { "--count" };
                    let value = args
                        .next()
                        .ok_or_else(|| CliError::Usage(format!("{} needs a value", flag)))?;
                    let n = parse_number(flag, &value)?;
                    if flag == "--base" {
                        base = Some(u32::try_from(n).map_err(|_| CliError::BadNumber { flag, value })?);
                    } else {
                        count = usize::try_from(n).map_err(|_| CliError::BadNumber { flag, value })?;
                    }
                }
                s if s.starts_with('-') => {
                    return Err(CliError::Usage(format!("unknown option {}", s)));
                }
                _ if path.is_some() => {
                    return Err(CliError::Usage(format!("unexpected argument {}", arg)));
                }
                _ => path = Some(PathBuf::from(&arg)),
            }
        }

        let path = path.ok_or_else(|| CliError::Usage("missing input file".to_string()))?;
        Ok(Command::Disassemble(Options {
            path,
            base,
            count,
            raw,
        }))
    }
}

fn is_elf(data: &[u8]) -> bool {
    data.starts_with(b"\x7fELF")
}

/// Loads the image into a fresh system and lists `opts.count` instructions.
pub fn disassemble_image(opts: &Options, data: &[u8], out: &mut impl Write) -> Result<(), CliError> {
    let dc = Dreamcast::new()?;

    let start = if !opts.raw && is_elf(data) {
        let entry = dc.load_elf(data)?;
        opts.base.unwrap_or(entry)
    } else {
        let base = opts.base.unwrap_or(DEFAULT_LOAD_ADDR);
        dc.load_raw(base, data)?;
        base
    };

    for line in dc.disassemble(start, opts.count) {
        writeln!(out, "{}  {}", line.bytes, line.disassembly).map_err(CliError::Output)?;
    }
    Ok(())
}

pub fn run(opts: &Options, out: &mut impl Write) -> Result<(), CliError> {
    log::info!("nulldc {} reading {}", GIT_HASH, opts.path.display());
    let data = std::fs::read(&opts.path).map_err(|source| CliError::Io {
        path: opts.path.clone(),
        source,
    })?;
    disassemble_image(opts, &data, out)
}
