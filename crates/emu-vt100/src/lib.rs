//! DEC VT100 video terminal.
//!
//! The machine is an 8080 with 8 KiB of ROM, screen RAM from 0x2000 and a
//! handful of port-mapped peripherals:
//!
//! | Port | Read              | Write                     |
//! |------|-------------------|---------------------------|
//! | 0x00 | PUSART data       | PUSART data               |
//! | 0x01 | PUSART status     | PUSART mode/command       |
//! | 0x02 |                   | Baud rate                 |
//! | 0x42 | Flags buffer      | Brightness                |
//! | 0x62 |                   | NVR latch                 |
//! | 0x82 | Keyboard UART     | Keyboard status           |
//! | 0xA2 |                   | Video processor DC012     |
//! | 0xC2 |                   | Video processor DC011     |
//!
//! Every peripheral is clocked from the CPU cycle count; see [`timing`].
//! The serial line is bridged to a shell on a host pseudo-terminal.

pub mod bus;
pub mod charset;
pub mod cli;
pub mod config;
pub mod debugger;
pub mod display;
pub mod error;
pub mod keyboard;
pub mod keymap;
pub mod machine;
pub mod messages;
pub mod pacing;
#[cfg(unix)]
pub mod pty;
pub mod rom;
pub mod session;
pub mod timing;
pub mod tui;
pub mod video;

pub use config::{LaunchOptions, RomSource, Vt100Config};
pub use error::{AddressError, RomError};
pub use machine::Vt100;
pub use session::{Frontend, Session};
