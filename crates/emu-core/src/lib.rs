//! Core traits and types for instruction-stepped hardware emulation.
//!
//! The CPU is the only clock source. Every peripheral derives its timing from
//! the number of CPU cycles each instruction consumed, divided down by
//! [`Signal`] square-wave generators.

mod bus;
mod clock;
mod cpu;
mod observable;
mod signal;
mod ticks;

pub use bus::{Bus, SimpleBus};
pub use clock::MasterClock;
pub use cpu::Cpu;
pub use observable::{Observable, Value};
pub use signal::Signal;
pub use ticks::Ticks;
