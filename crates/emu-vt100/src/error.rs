//! Error types.

use std::io;
use std::path::PathBuf;

/// ROM image could not be loaded.
#[derive(Debug, thiserror::Error)]
pub enum RomError {
    #[error("failed to read ROM file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("ROM file {path} is empty")]
    Empty { path: PathBuf },
}

/// Operator-entered address is not 1-4 hex digits.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AddressError {
    #[error("empty address")]
    Empty,
    #[error("address {0:?} is longer than four hex digits")]
    TooLong(String),
    #[error("address {0:?} is not hexadecimal")]
    NotHex(String),
}

/// Pseudo-terminal setup failed.
#[derive(Debug, thiserror::Error)]
pub enum PtyError {
    #[error("posix_openpt: {0}")]
    Open(#[source] io::Error),
    #[error("grantpt/unlockpt: {0}")]
    Grant(#[source] io::Error),
    #[error("ptsname: {0}")]
    Name(#[source] io::Error),
    #[error("cannot open {path}: {source}")]
    OpenDevice {
        path: String,
        #[source]
        source: io::Error,
    },
    #[error("terminal attributes: {0}")]
    Termios(#[source] io::Error),
    #[error("cannot start {shell}: {source}")]
    Spawn {
        shell: String,
        #[source]
        source: io::Error,
    },
}

impl From<PtyError> for io::Error {
    fn from(e: PtyError) -> Self {
        io::Error::other(e)
    }
}
