//! Intel 8080 CPU core.
//!
//! Each call to `step()` executes one whole instruction (or accepts one
//! interrupt) and reports the clock cycles it took. Interrupts arrive through
//! the bus as an instruction byte, normally an `RST`.

mod alu;
mod cpu;
mod flags;
mod registers;

pub use cpu::I8080;
pub use flags::{AC, CF, PF, SF, ZF};
pub use registers::Registers;
