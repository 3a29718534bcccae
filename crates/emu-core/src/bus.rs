//! Memory, port I/O and interrupt interface.

/// Memory and I/O bus interface.
///
/// CPUs access memory, I/O ports and the interrupt request line through this
/// trait. The bus handles address decoding and routing to the appropriate
/// device.
pub trait Bus {
    /// Read a byte from the given address.
    fn read(&mut self, address: u16) -> u8;

    /// Write a byte to the given address.
    fn write(&mut self, address: u16, value: u8);

    /// Read a byte from an I/O port.
    fn io_read(&mut self, port: u8) -> u8;

    /// Write a byte to an I/O port.
    fn io_write(&mut self, port: u8, value: u8);

    /// The instruction byte to execute if an interrupt is being requested.
    ///
    /// The bus only raises the request; vectoring is the CPU's job.
    fn interrupt_vector(&self) -> Option<u8> {
        None
    }

    /// Called by the CPU once it has accepted the pending interrupt.
    fn acknowledge_interrupt(&mut self) {}
}

/// Flat 64 KiB RAM bus with no devices, for CPU tests.
///
/// Port reads return the last value written to that port (or 0xFF).
pub struct SimpleBus {
    ram: Box<[u8; 0x10000]>,
    ports: [Option<u8>; 256],
    interrupt: Option<u8>,
}

impl SimpleBus {
    #[must_use]
    pub fn new() -> Self {
        Self {
            ram: Box::new([0; 0x10000]),
            ports: [None; 256],
            interrupt: None,
        }
    }

    /// Copy `data` into RAM starting at `address`, wrapping at 64 KiB.
    pub fn load(&mut self, address: u16, data: &[u8]) {
        for (i, &byte) in data.iter().enumerate() {
            self.ram[usize::from(address.wrapping_add(i as u16))] = byte;
        }
    }

    /// Read RAM without side effects.
    #[must_use]
    pub fn peek(&self, address: u16) -> u8 {
        self.ram[usize::from(address)]
    }

    /// Raise an interrupt request carrying `vector`.
    pub fn request_interrupt(&mut self, vector: u8) {
        self.interrupt = Some(vector);
    }

    /// Last value written to `port`.
    #[must_use]
    pub fn port(&self, port: u8) -> Option<u8> {
        self.ports[usize::from(port)]
    }
}

impl Default for SimpleBus {
    fn default() -> Self {
        Self::new()
    }
}

impl Bus for SimpleBus {
    fn read(&mut self, address: u16) -> u8 {
        self.ram[usize::from(address)]
    }

    fn write(&mut self, address: u16, value: u8) {
        self.ram[usize::from(address)] = value;
    }

    fn io_read(&mut self, port: u8) -> u8 {
        self.ports[usize::from(port)].unwrap_or(0xFF)
    }

    fn io_write(&mut self, port: u8, value: u8) {
        self.ports[usize::from(port)] = Some(value);
    }

    fn interrupt_vector(&self) -> Option<u8> {
        self.interrupt
    }

    fn acknowledge_interrupt(&mut self) {
        self.interrupt = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn load_wraps_at_top_of_memory() {
        let mut bus = SimpleBus::new();
        bus.load(0xFFFF, &[0xAA, 0xBB]);
        assert_eq!(bus.peek(0xFFFF), 0xAA);
        assert_eq!(bus.peek(0x0000), 0xBB);
    }

    #[test]
    fn ports_echo_last_write() {
        let mut bus = SimpleBus::new();
        assert_eq!(bus.io_read(0x42), 0xFF);
        bus.io_write(0x42, 0x12);
        assert_eq!(bus.io_read(0x42), 0x12);
        assert_eq!(bus.port(0x42), Some(0x12));
    }

    #[test]
    fn interrupt_cleared_on_acknowledge() {
        let mut bus = SimpleBus::new();
        bus.request_interrupt(0xCF);
        assert_eq!(bus.interrupt_vector(), Some(0xCF));
        bus.acknowledge_interrupt();
        assert_eq!(bus.interrupt_vector(), None);
    }
}
