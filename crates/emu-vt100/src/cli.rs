//! Command line.

use std::ffi::OsString;
use std::path::PathBuf;

use clap::{ArgAction, Parser};

use crate::config::{LaunchOptions, RomSource, Vt100Config};
use crate::debugger::parse_address;

#[derive(Parser, Debug)]
#[command(name = "emu-vt100")]
#[command(about = "DEC VT100 terminal emulator with a built-in debugger", long_about = None)]
pub struct Args {
    /// Start running immediately instead of in control mode.
    #[arg(short, long, action = ArgAction::SetTrue)]
    pub run: bool,

    /// Stop when the program counter reaches this hex address. Repeatable.
    #[arg(short = 'b', long = "break", value_name = "HEX", value_parser = parse_address)]
    pub breakpoints: Vec<u16>,

    /// Leave out the Advanced Video Option.
    #[arg(short = 'N', long, action = ArgAction::SetTrue)]
    pub noavo: bool,

    /// Write diagnostics to this file.
    #[arg(long, value_name = "FILE")]
    pub log: Option<PathBuf>,

    /// ROM image; `-` or nothing for the built-in banner ROM.
    #[arg(value_name = "ROM")]
    pub rom: Option<String>,
}

impl Args {
    /// Resolve into launch options. `bare` means no arguments were given at
    /// all, which starts the machine running.
    #[must_use]
    pub fn into_options(self, bare: bool) -> LaunchOptions {
        let rom = match self.rom.as_deref() {
            None | Some("-") => RomSource::BuiltIn,
            Some(path) => RomSource::File(PathBuf::from(path)),
        };
        LaunchOptions {
            running: self.run || bare,
            breakpoints: self.breakpoints,
            config: Vt100Config {
                rom,
                avo: !self.noavo,
                ..Vt100Config::default()
            },
            log: self.log,
        }
    }
}

/// Parse a full argument list, program name first.
pub fn parse_from<I, T>(args: I) -> Result<LaunchOptions, clap::Error>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    let args: Vec<OsString> = args.into_iter().map(Into::into).collect();
    let bare = args.len() <= 1;
    Ok(Args::try_parse_from(args)?.into_options(bare))
}
