//! Machine configuration.

use std::env;
use std::path::PathBuf;

use tracing::warn;

/// Where the firmware comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RomSource {
    /// The banner program compiled into the emulator.
    BuiltIn,
    File(PathBuf),
    /// An image already in memory.
    Bytes(Vec<u8>),
}

/// Machine options.
#[derive(Debug, Clone)]
pub struct Vt100Config {
    pub rom: RomSource,
    /// Advanced Video Option fitted.
    pub avo: bool,
    /// NVR backing file. `None` keeps the NVR in memory only.
    pub nvr_path: Option<PathBuf>,
    /// The host terminal can show Unicode glyphs.
    pub unicode: bool,
}

impl Default for Vt100Config {
    fn default() -> Self {
        Self {
            rom: RomSource::BuiltIn,
            avo: true,
            nvr_path: default_nvr_path(),
            unicode: unicode_locale(),
        }
    }
}

impl Vt100Config {
    /// A configuration that touches nothing outside the process.
    #[must_use]
    pub fn hermetic(rom: RomSource) -> Self {
        Self {
            rom,
            avo: true,
            nvr_path: None,
            unicode: false,
        }
    }
}

/// Everything the command line decides.
#[derive(Debug, Clone)]
pub struct LaunchOptions {
    pub running: bool,
    pub breakpoints: Vec<u16>,
    pub config: Vt100Config,
    pub log: Option<PathBuf>,
}

pub const NVR_FILE: &str = ".emu-vt100.nvr.txt";

/// `$HOME/.emu-vt100.nvr.txt`, or `None` when `HOME` is unset.
#[must_use]
pub fn default_nvr_path() -> Option<PathBuf> {
    let path = env::var_os("HOME")
        .filter(|h| !h.is_empty())
        .map(|home| PathBuf::from(home).join(NVR_FILE));
    if path.is_none() {
        warn!("HOME is not set; NVR settings will not be saved");
    }
    path
}

/// Whether the locale asks for UTF-8 output.
#[must_use]
pub fn unicode_locale() -> bool {
    ["LC_ALL", "LC_CTYPE", "LANG"]
        .iter()
        .find_map(|var| env::var(var).ok().filter(|v| !v.is_empty()))
        .is_some_and(|v| {
            let v = v.to_ascii_lowercase();
            v.contains("utf-8") || v.contains("utf8")
        })
}

pub const DEFAULT_SHELL: &str = "/bin/sh";

/// The user's shell, falling back to `/bin/sh`.
#[must_use]
pub fn user_shell() -> String {
    env::var("SHELL")
        .ok()
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| DEFAULT_SHELL.to_string())
}

/// `TERM` for the child shell.
pub const TERM_NAME: &str = "vt100";
