//! 8080 flag register bits.

/// Sign flag (bit 7).
pub const SF: u8 = 0b1000_0000;

/// Zero flag (bit 6).
pub const ZF: u8 = 0b0100_0000;

/// Auxiliary carry (bit 4) - carry out of bit 3.
pub const AC: u8 = 0b0001_0000;

/// Parity flag (bit 2) - set on even parity.
pub const PF: u8 = 0b0000_0100;

/// Bit 1 always reads as one.
pub const ONE: u8 = 0b0000_0010;

/// Carry flag (bit 0).
pub const CF: u8 = 0b0000_0001;

/// Sign, zero and parity for a result.
#[must_use]
pub const fn szp(value: u8) -> u8 {
    let mut f = 0;
    if value == 0 {
        f |= ZF;
    }
    if value & 0x80 != 0 {
        f |= SF;
    }
    if value.count_ones() % 2 == 0 {
        f |= PF;
    }
    f
}
