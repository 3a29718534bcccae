//! CPU core trait.

use crate::{Bus, Ticks};

/// A CPU core.
///
/// CPUs execute instructions and access memory through a bus. The bus is
/// passed in, not owned, so the machine can inspect and clock its peripherals
/// between instructions.
///
/// CPUs expose their internal state for observation and debugging.
pub trait Cpu {
    /// The type used for register inspection.
    type Registers;

    /// Execute one instruction, or accept a pending interrupt, and return
    /// the number of clock cycles it took.
    ///
    /// Interrupts are taken from [`Bus::interrupt_vector`]; the CPU calls
    /// [`Bus::acknowledge_interrupt`] when it services one.
    fn step<B: Bus>(&mut self, bus: &mut B) -> Ticks;

    /// Total cycles executed since reset.
    fn total_ticks(&self) -> Ticks;

    /// Returns the current program counter.
    fn pc(&self) -> u16;

    /// Returns a snapshot of all registers for inspection.
    fn registers(&self) -> Self::Registers;

    /// Returns true if the CPU is halted.
    fn is_halted(&self) -> bool;

    /// Reset the CPU to its initial state.
    fn reset(&mut self);
}
