//! Instruction decode and execution.

use emu_core::{Bus, Cpu, Observable, Ticks, Value};

use crate::alu;
use crate::flags::{AC, CF, ONE, PF, SF, ZF};
use crate::registers::Registers;

/// Cycles charged per step while halted.
const HALT_CYCLES: u32 = 4;

/// Intel 8080 CPU.
pub struct I8080 {
    regs: Registers,
    /// EI takes effect after the following instruction.
    ei_pending: bool,
    total: Ticks,
}

impl I8080 {
    #[must_use]
    pub fn new() -> Self {
        Self {
            regs: Registers {
                f: ONE,
                ..Registers::default()
            },
            ei_pending: false,
            total: Ticks::ZERO,
        }
    }

    pub fn set_pc(&mut self, pc: u16) {
        self.regs.pc = pc;
    }

    pub fn set_sp(&mut self, sp: u16) {
        self.regs.sp = sp;
    }

    #[must_use]
    pub fn a(&self) -> u8 {
        self.regs.a
    }

    #[must_use]
    pub fn flags(&self) -> u8 {
        self.regs.f
    }

    #[must_use]
    pub fn interrupts_enabled(&self) -> bool {
        self.regs.inte
    }

    fn fetch<B: Bus>(&mut self, bus: &mut B) -> u8 {
        let v = bus.read(self.regs.pc);
        self.regs.pc = self.regs.pc.wrapping_add(1);
        v
    }

    fn fetch16<B: Bus>(&mut self, bus: &mut B) -> u16 {
        let lo = self.fetch(bus);
        let hi = self.fetch(bus);
        u16::from_le_bytes([lo, hi])
    }

    fn read16<B: Bus>(bus: &mut B, addr: u16) -> u16 {
        u16::from_le_bytes([bus.read(addr), bus.read(addr.wrapping_add(1))])
    }

    fn write16<B: Bus>(bus: &mut B, addr: u16, value: u16) {
        let [lo, hi] = value.to_le_bytes();
        bus.write(addr, lo);
        bus.write(addr.wrapping_add(1), hi);
    }

    fn push<B: Bus>(&mut self, bus: &mut B, value: u16) {
        self.regs.sp = self.regs.sp.wrapping_sub(2);
        Self::write16(bus, self.regs.sp, value);
    }

    fn pop<B: Bus>(&mut self, bus: &mut B) -> u16 {
        let v = Self::read16(bus, self.regs.sp);
        self.regs.sp = self.regs.sp.wrapping_add(2);
        v
    }

    /// Register by 3-bit code: B C D E H L M A.
    fn reg<B: Bus>(&self, bus: &mut B, code: u8) -> u8 {
        match code & 7 {
            0 => self.regs.b,
            1 => self.regs.c,
            2 => self.regs.d,
            3 => self.regs.e,
            4 => self.regs.h,
            5 => self.regs.l,
            6 => bus.read(self.regs.hl()),
            _ => self.regs.a,
        }
    }

    fn set_reg<B: Bus>(&mut self, bus: &mut B, code: u8, value: u8) {
        match code & 7 {
            0 => self.regs.b = value,
            1 => self.regs.c = value,
            2 => self.regs.d = value,
            3 => self.regs.e = value,
            4 => self.regs.h = value,
            5 => self.regs.l = value,
            6 => bus.write(self.regs.hl(), value),
            _ => self.regs.a = value,
        }
    }

    /// Register pair by 2-bit code: BC DE HL SP.
    fn pair(&self, code: u8) -> u16 {
        match code & 3 {
            0 => self.regs.bc(),
            1 => self.regs.de(),
            2 => self.regs.hl(),
            _ => self.regs.sp,
        }
    }

    fn set_pair(&mut self, code: u8, value: u16) {
        match code & 3 {
            0 => self.regs.set_bc(value),
            1 => self.regs.set_de(value),
            2 => self.regs.set_hl(value),
            _ => self.regs.sp = value,
        }
    }

    /// Condition by 3-bit code: NZ Z NC C PO PE P M.
    fn condition(&self, code: u8) -> bool {
        let f = self.regs.f;
        match code & 7 {
            0 => f & ZF == 0,
            1 => f & ZF != 0,
            2 => f & CF == 0,
            3 => f & CF != 0,
            4 => f & PF == 0,
            5 => f & PF != 0,
            6 => f & SF == 0,
            _ => f & SF != 0,
        }
    }

    fn call<B: Bus>(&mut self, bus: &mut B, target: u16) {
        let ret = self.regs.pc;
        self.push(bus, ret);
        self.regs.pc = target;
    }

    /// Execute one opcode, returning its cycle count.
    fn execute<B: Bus>(&mut self, bus: &mut B, op: u8) -> u32 {
        let dst = (op >> 3) & 7;
        let src = op & 7;
        let rp = (op >> 4) & 3;
        match op {
            0x76 => {
                self.regs.halted = true;
                7
            }
            0x40..=0x7F => {
                let v = self.reg(bus, src);
                self.set_reg(bus, dst, v);
                if src == 6 || dst == 6 { 7 } else { 5 }
            }
            0x80..=0xBF => {
                let v = self.reg(bus, src);
                let r = alu::accumulate(dst, self.regs.a, v, self.regs.f & CF != 0);
                self.regs.a = r.value;
                self.regs.f = r.flags;
                if src == 6 { 7 } else { 4 }
            }
            0xC6 | 0xCE | 0xD6 | 0xDE | 0xE6 | 0xEE | 0xF6 | 0xFE => {
                let v = self.fetch(bus);
                let r = alu::accumulate(dst, self.regs.a, v, self.regs.f & CF != 0);
                self.regs.a = r.value;
                self.regs.f = r.flags;
                7
            }
            0x00 | 0x08 | 0x10 | 0x18 | 0x20 | 0x28 | 0x30 | 0x38 => 4,
            0x01 | 0x11 | 0x21 | 0x31 => {
                let v = self.fetch16(bus);
                self.set_pair(rp, v);
                10
            }
            0x02 | 0x12 => {
                bus.write(self.pair(rp), self.regs.a);
                7
            }
            0x0A | 0x1A => {
                self.regs.a = bus.read(self.pair(rp));
                7
            }
            0x22 => {
                let addr = self.fetch16(bus);
                Self::write16(bus, addr, self.regs.hl());
                16
            }
            0x2A => {
                let addr = self.fetch16(bus);
                let v = Self::read16(bus, addr);
                self.regs.set_hl(v);
                16
            }
            0x32 => {
                let addr = self.fetch16(bus);
                bus.write(addr, self.regs.a);
                13
            }
            0x3A => {
                let addr = self.fetch16(bus);
                self.regs.a = bus.read(addr);
                13
            }
            0x03 | 0x13 | 0x23 | 0x33 => {
                self.set_pair(rp, self.pair(rp).wrapping_add(1));
                5
            }
            0x0B | 0x1B | 0x2B | 0x3B => {
                self.set_pair(rp, self.pair(rp).wrapping_sub(1));
                5
            }
            0x09 | 0x19 | 0x29 | 0x39 => {
                let (sum, carry) = self.regs.hl().overflowing_add(self.pair(rp));
                self.regs.set_hl(sum);
                self.regs.f = (self.regs.f & !CF) | if carry { CF } else { 0 };
                10
            }
            0x04 | 0x0C | 0x14 | 0x1C | 0x24 | 0x2C | 0x34 | 0x3C => {
                let v = self.reg(bus, dst);
                let r = alu::inr(v);
                self.set_reg(bus, dst, r.value);
                self.regs.f = (self.regs.f & CF) | r.flags;
                if dst == 6 { 10 } else { 5 }
            }
            0x05 | 0x0D | 0x15 | 0x1D | 0x25 | 0x2D | 0x35 | 0x3D => {
                let v = self.reg(bus, dst);
                let r = alu::dcr(v);
                self.set_reg(bus, dst, r.value);
                self.regs.f = (self.regs.f & CF) | r.flags;
                if dst == 6 { 10 } else { 5 }
            }
            0x06 | 0x0E | 0x16 | 0x1E | 0x26 | 0x2E | 0x36 | 0x3E => {
                let v = self.fetch(bus);
                self.set_reg(bus, dst, v);
                if dst == 6 { 10 } else { 7 }
            }
            0x07 => {
                let a = self.regs.a;
                self.regs.a = a.rotate_left(1);
                self.regs.f = (self.regs.f & !CF) | (a >> 7);
                4
            }
            0x0F => {
                let a = self.regs.a;
                self.regs.a = a.rotate_right(1);
                self.regs.f = (self.regs.f & !CF) | (a & 1);
                4
            }
            0x17 => {
                let a = self.regs.a;
                self.regs.a = (a << 1) | (self.regs.f & CF);
                self.regs.f = (self.regs.f & !CF) | (a >> 7);
                4
            }
            0x1F => {
                let a = self.regs.a;
                self.regs.a = (a >> 1) | ((self.regs.f & CF) << 7);
                self.regs.f = (self.regs.f & !CF) | (a & 1);
                4
            }
            0x27 => {
                let r = alu::daa(self.regs.a, self.regs.f);
                self.regs.a = r.value;
                self.regs.f = r.flags;
                4
            }
            0x2F => {
                self.regs.a = !self.regs.a;
                4
            }
            0x37 => {
                self.regs.f |= CF;
                4
            }
            0x3F => {
                self.regs.f ^= CF;
                4
            }
            0xC3 | 0xCB => {
                self.regs.pc = self.fetch16(bus);
                10
            }
            0xC2 | 0xCA | 0xD2 | 0xDA | 0xE2 | 0xEA | 0xF2 | 0xFA => {
                let target = self.fetch16(bus);
                if self.condition(dst) {
                    self.regs.pc = target;
                }
                10
            }
            0xCD | 0xDD | 0xED | 0xFD => {
                let target = self.fetch16(bus);
                self.call(bus, target);
                17
            }
            0xC4 | 0xCC | 0xD4 | 0xDC | 0xE4 | 0xEC | 0xF4 | 0xFC => {
                let target = self.fetch16(bus);
                if self.condition(dst) {
                    self.call(bus, target);
                    17
                } else {
                    11
                }
            }
            0xC9 | 0xD9 => {
                self.regs.pc = self.pop(bus);
                10
            }
            0xC0 | 0xC8 | 0xD0 | 0xD8 | 0xE0 | 0xE8 | 0xF0 | 0xF8 => {
                if self.condition(dst) {
                    self.regs.pc = self.pop(bus);
                    11
                } else {
                    5
                }
            }
            0xC7 | 0xCF | 0xD7 | 0xDF | 0xE7 | 0xEF | 0xF7 | 0xFF => {
                self.call(bus, u16::from(op & 0x38));
                11
            }
            0xE9 => {
                self.regs.pc = self.regs.hl();
                5
            }
            0xC5 | 0xD5 | 0xE5 => {
                let v = self.pair(rp);
                self.push(bus, v);
                11
            }
            0xF5 => {
                let v = self.regs.psw();
                self.push(bus, v);
                11
            }
            0xC1 | 0xD1 | 0xE1 => {
                let v = self.pop(bus);
                self.set_pair(rp, v);
                10
            }
            0xF1 => {
                let v = self.pop(bus);
                self.regs.set_psw(v);
                10
            }
            0xE3 => {
                let v = Self::read16(bus, self.regs.sp);
                Self::write16(bus, self.regs.sp, self.regs.hl());
                self.regs.set_hl(v);
                18
            }
            0xEB => {
                let (de, hl) = (self.regs.de(), self.regs.hl());
                self.regs.set_de(hl);
                self.regs.set_hl(de);
                4
            }
            0xF9 => {
                self.regs.sp = self.regs.hl();
                5
            }
            0xDB => {
                let port = self.fetch(bus);
                self.regs.a = bus.io_read(port);
                10
            }
            0xD3 => {
                let port = self.fetch(bus);
                bus.io_write(port, self.regs.a);
                10
            }
            0xF3 => {
                self.regs.inte = false;
                self.ei_pending = false;
                4
            }
            0xFB => {
                self.ei_pending = true;
                4
            }
        }
    }
}

impl Default for I8080 {
    fn default() -> Self {
        Self::new()
    }
}

impl Cpu for I8080 {
    type Registers = Registers;

    fn step<B: Bus>(&mut self, bus: &mut B) -> Ticks {
        let enable_after = std::mem::take(&mut self.ei_pending);
        let cycles = match bus.interrupt_vector() {
            Some(vector) if self.regs.inte => {
                bus.acknowledge_interrupt();
                self.regs.inte = false;
                self.regs.halted = false;
                self.execute(bus, vector)
            }
            _ if self.regs.halted => HALT_CYCLES,
            _ => {
                let op = self.fetch(bus);
                self.execute(bus, op)
            }
        };
        if enable_after && !self.ei_pending {
            self.regs.inte = true;
        }
        let ticks = Ticks::from(cycles);
        self.total += ticks;
        ticks
    }

    fn total_ticks(&self) -> Ticks {
        self.total
    }

    fn pc(&self) -> u16 {
        self.regs.pc
    }

    fn registers(&self) -> Registers {
        self.regs
    }

    fn is_halted(&self) -> bool {
        self.regs.halted
    }

    fn reset(&mut self) {
        self.regs.pc = 0;
        self.regs.inte = false;
        self.regs.halted = false;
        self.ei_pending = false;
    }
}

impl Observable for I8080 {
    fn query(&self, path: &str) -> Option<Value> {
        let r = &self.regs;
        let value = match path {
            "pc" => r.pc.into(),
            "sp" => r.sp.into(),
            "a" => r.a.into(),
            "f" => r.f.into(),
            "b" => r.b.into(),
            "c" => r.c.into(),
            "d" => r.d.into(),
            "e" => r.e.into(),
            "h" => r.h.into(),
            "l" => r.l.into(),
            "bc" => r.bc().into(),
            "de" => r.de().into(),
            "hl" => r.hl().into(),
            "psw" => r.psw().into(),
            "inte" => r.inte.into(),
            "halted" => r.halted.into(),
            "cycles" => self.total.get().into(),
            _ => return None,
        };
        Some(value)
    }

    fn query_paths(&self) -> &'static [&'static str] {
        &[
            "pc", "sp", "a", "f", "b", "c", "d", "e", "h", "l", "bc", "de", "hl", "psw", "inte",
            "halted", "cycles",
        ]
    }
}
