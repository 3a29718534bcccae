//! Arithmetic and logic for the 8080 accumulator group.

use crate::flags::{AC, CF, ONE, szp};

/// Result of an accumulator operation with flags.
#[derive(Debug, Clone, Copy)]
pub struct AluResult {
    pub value: u8,
    pub flags: u8,
}

#[must_use]
pub fn add(a: u8, b: u8, carry: bool) -> AluResult {
    let c = u8::from(carry);
    let wide = u16::from(a) + u16::from(b) + u16::from(c);
    let value = wide as u8;
    let mut flags = szp(value) | ONE;
    if (a & 0x0F) + (b & 0x0F) + c > 0x0F {
        flags |= AC;
    }
    if wide > 0xFF {
        flags |= CF;
    }
    AluResult { value, flags }
}

/// Subtraction is addition of the complement; carry holds the borrow.
#[must_use]
pub fn sub(a: u8, b: u8, borrow: bool) -> AluResult {
    let r = add(a, !b, !borrow);
    AluResult {
        value: r.value,
        flags: r.flags ^ CF,
    }
}

#[must_use]
pub fn and(a: u8, b: u8) -> AluResult {
    let value = a & b;
    // AC reflects the OR of bit 3 of the operands.
    let ac = if (a | b) & 0x08 != 0 { AC } else { 0 };
    AluResult {
        value,
        flags: szp(value) | ONE | ac,
    }
}

#[must_use]
pub fn xor(a: u8, b: u8) -> AluResult {
    let value = a ^ b;
    AluResult {
        value,
        flags: szp(value) | ONE,
    }
}

#[must_use]
pub fn or(a: u8, b: u8) -> AluResult {
    let value = a | b;
    AluResult {
        value,
        flags: szp(value) | ONE,
    }
}

/// Apply operation `op` (bits 5-3 of the opcode) to the accumulator.
#[must_use]
pub fn accumulate(op: u8, a: u8, b: u8, carry: bool) -> AluResult {
    match op & 7 {
        0 => add(a, b, false),
        1 => add(a, b, carry),
        2 => sub(a, b, false),
        3 => sub(a, b, carry),
        4 => and(a, b),
        5 => xor(a, b),
        6 => or(a, b),
        _ => AluResult {
            value: a,
            flags: sub(a, b, false).flags,
        },
    }
}

/// Increment/decrement: carry is preserved by the caller.
#[must_use]
pub fn inr(value: u8) -> AluResult {
    let r = value.wrapping_add(1);
    let ac = if r & 0x0F == 0 { AC } else { 0 };
    AluResult {
        value: r,
        flags: szp(r) | ONE | ac,
    }
}

#[must_use]
pub fn dcr(value: u8) -> AluResult {
    let r = value.wrapping_sub(1);
    let ac = if r & 0x0F == 0x0F { 0 } else { AC };
    AluResult {
        value: r,
        flags: szp(r) | ONE | ac,
    }
}

/// Decimal adjust.
#[must_use]
pub fn daa(a: u8, flags: u8) -> AluResult {
    let mut correction = 0;
    let mut carry = flags & CF != 0;
    if a & 0x0F > 9 || flags & AC != 0 {
        correction |= 0x06;
    }
    if a > 0x99 || carry {
        correction |= 0x60;
        carry = true;
    }
    let r = add(a, correction, false);
    AluResult {
        value: r.value,
        flags: (r.flags & !CF) | if carry { CF } else { 0 },
    }
}
