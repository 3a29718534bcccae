//! The assembled terminal: CPU, bus and debugger bookkeeping.

use std::collections::VecDeque;
use std::io;

use emu_core::{Cpu, Observable, Value};
use gi_er1400::{Er1400, Er1400Error};
use intel_8080::I8080;
use intel_8251::{SerialLine, Usart8251};

use crate::bus::{StepEvents, Vt100Bus};
use crate::config::Vt100Config;
use crate::keyboard::Keyboard;
use crate::messages::MessageLog;
use crate::rom;
use crate::video::{self, Frame};

/// Program counters remembered for breakpoint traces.
pub const HISTORY_LEN: usize = 10;

/// Outcome of one instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StepResult {
    pub cycles: u32,
    pub events: StepEvents,
}

pub struct Vt100 {
    cpu: I8080,
    bus: Vt100Bus,
    history: VecDeque<u16>,
    /// Cycles run since the last pacing sync, counted only while the
    /// display is lit.
    rt_ticks: u64,
    /// Vertical retraces not yet serviced by the run loop.
    vscan_tick: u32,
    unicode: bool,
    pub messages: MessageLog,
}

impl Vt100 {
    /// Build a terminal. Configuration problems fall back to built-in
    /// defaults and are reported through [`Self::messages`].
    #[must_use]
    pub fn new(config: &Vt100Config, line: Box<dyn SerialLine>) -> Self {
        let mut messages = MessageLog::new();

        let image = rom::load(&config.rom).unwrap_or_else(|e| {
            messages.push(format!("{e}; using built-in ROM"));
            rom::builtin()
        });

        let nvr = match &config.nvr_path {
            Some(path) => {
                let (nvr, error) = Er1400::with_file(path);
                match error {
                    Some(Er1400Error::Io { source, .. })
                        if source.kind() == io::ErrorKind::NotFound =>
                    {
                        messages.push("No NVR file yet, using factory settings");
                    }
                    Some(e) => messages.push(format!("{e}; using factory settings")),
                    None => {}
                }
                nvr
            }
            None => Er1400::new(),
        };

        let mut bus = Vt100Bus::new(Usart8251::new(line), nvr, config.avo);
        bus.load_rom(&image);

        Self {
            cpu: I8080::new(),
            bus,
            history: VecDeque::with_capacity(HISTORY_LEN + 1),
            rt_ticks: 0,
            vscan_tick: 0,
            unicode: config.unicode,
            messages,
        }
    }

    /// Execute one instruction and clock the peripherals by its cycles.
    pub fn step(&mut self) -> StepResult {
        if self.history.len() == HISTORY_LEN {
            self.history.pop_front();
        }
        self.history.push_back(self.cpu.pc());

        let cycles = u32::try_from(self.cpu.step(&mut self.bus).get()).unwrap_or(u32::MAX);
        self.bus.settle_interrupt();
        if !self.bus.display.blanked() {
            self.rt_ticks += u64::from(cycles);
        }
        let events = self.bus.advance(cycles);
        if events.vsync {
            self.vscan_tick += 1;
        }

        if let Some(notice) = self.bus.uart.take_notice() {
            self.messages.push(notice);
        }
        if let Some(e) = self.bus.nvr.take_save_error() {
            self.messages.push(format!("Cannot save NVR: {e}"));
        }
        StepResult { cycles, events }
    }

    #[must_use]
    pub fn pc(&self) -> u16 {
        self.cpu.pc()
    }

    #[must_use]
    pub fn cpu(&self) -> &I8080 {
        &self.cpu
    }

    #[must_use]
    pub fn bus(&self) -> &Vt100Bus {
        &self.bus
    }

    pub fn bus_mut(&mut self) -> &mut Vt100Bus {
        &mut self.bus
    }

    /// Program counters of the most recent instructions, oldest first.
    pub fn history(&self) -> impl Iterator<Item = u16> + '_ {
        self.history.iter().copied()
    }

    pub(crate) fn rt_ticks_mut(&mut self) -> &mut u64 {
        &mut self.rt_ticks
    }

    /// Consume one pending vertical retrace.
    pub fn take_vscan(&mut self) -> bool {
        if self.vscan_tick == 0 {
            return false;
        }
        self.vscan_tick -= 1;
        true
    }

    /// Press a key on the keyboard unit.
    pub fn keypress(&mut self, code: u8) {
        self.bus.kbd.keypress(code);
    }

    /// Decode the screen as it stands.
    #[must_use]
    pub fn frame(&self) -> Frame {
        video::decode(self.bus.ram(), &self.bus.display, self.bus.avo(), self.unicode)
    }
}

impl Observable for Vt100 {
    fn query(&self, path: &str) -> Option<Value> {
        if let Some(rest) = path.strip_prefix("cpu.") {
            return self.cpu.query(rest);
        }
        if let Some(rest) = path.strip_prefix("uart.") {
            return self.bus.uart.query(rest);
        }
        if let Some(rest) = path.strip_prefix("nvr.") {
            return self.bus.nvr.query(rest);
        }
        if let Some(rest) = path.strip_prefix("memory.") {
            let hex = rest.strip_prefix("0x").unwrap_or(rest);
            let address = u16::from_str_radix(hex, 16).ok()?;
            return Some(self.bus.peek(address).into());
        }
        let d = &self.bus.display;
        let value = match path {
            "display.bright" => d.bright.into(),
            "display.blink" => d.blink.into(),
            "display.cols132" => d.cols132.into(),
            "display.refresh50" => d.refresh50.into(),
            "display.interlaced" => d.interlaced.into(),
            "display.scroll" => d.scroll_latch.into(),
            "display.base_attr" => d.base_attr.into(),
            "display.screen_rev" => d.screen_rev.into(),
            "kbd.status" => self.bus.kbd.status().into(),
            "kbd.latch" => self.bus.kbd.latch().into(),
            "int.vector" => self.bus.vector().into(),
            "int.pending" => self.bus.interrupt_pending().into(),
            "cycles" => self.bus.cycles().get().into(),
            _ => return None,
        };
        Some(value)
    }

    fn query_paths(&self) -> &'static [&'static str] {
        &[
            "cpu.<i8080_paths>",
            "uart.<8251_paths>",
            "nvr.<er1400_paths>",
            "memory.<address>",
            "display.bright",
            "display.blink",
            "display.cols132",
            "display.refresh50",
            "display.interlaced",
            "display.scroll",
            "display.base_attr",
            "display.screen_rev",
            "kbd.status",
            "kbd.latch",
            "int.vector",
            "int.pending",
            "cycles",
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RomSource;
    use intel_8251::NullLine;

    fn machine(rom: Vec<u8>) -> Vt100 {
        Vt100::new(&Vt100Config::hermetic(RomSource::Bytes(rom)), Box::new(NullLine))
    }

    #[test]
    fn history_keeps_last_ten() {
        let mut vt = machine(vec![0; 0x40]);
        for _ in 0..15 {
            vt.step();
        }
        let history: Vec<u16> = vt.history().collect();
        assert_eq!(history, (5..15).collect::<Vec<u16>>());
    }

    #[test]
    fn blanked_display_does_not_pace() {
        let mut vt = machine(vec![0; 0x40]);
        vt.step();
        assert_eq!(*vt.rt_ticks_mut(), 0);
        // MVI A,10; OUT 42
        let mut vt = machine(vec![0x3E, 0x10, 0xD3, 0x42, 0x00]);
        vt.step();
        // The OUT that lights the display is already counted.
        let out = vt.step();
        let nop = vt.step();
        assert_eq!(*vt.rt_ticks_mut(), u64::from(out.cycles + nop.cycles));
    }

    #[test]
    fn vertical_interrupt_reaches_cpu() {
        // EI; loop: JMP loop. RST 4 handler at 0x20: HLT.
        let mut rom = vec![0xFB, 0xC3, 0x01, 0x00];
        rom.resize(0x20, 0);
        rom.push(0x76);
        let mut vt = machine(rom);
        for _ in 0..10_000 {
            vt.step();
            if vt.cpu().is_halted() {
                break;
            }
        }
        assert!(vt.cpu().is_halted());
        assert!(vt.take_vscan());
        assert!(!vt.take_vscan());
    }

    #[test]
    fn unreadable_rom_falls_back() {
        let config = Vt100Config::hermetic(RomSource::File("/nonexistent/rom.bin".into()));
        let vt = Vt100::new(&config, Box::new(NullLine));
        assert_eq!(vt.bus().peek(0), rom::builtin()[0]);
        assert!(vt.messages.last().is_some_and(|m| m.ends_with("using built-in ROM")));
    }

    #[test]
    fn builtin_rom_paints_banner() {
        let mut vt = machine(rom::builtin());
        for _ in 0..20_000 {
            vt.step();
        }
        let frame = vt.frame();
        assert_eq!(frame.title, "Video [bright 75%]");
        let text: Vec<String> = frame.rows.iter().map(video::Row::text).collect();
        assert!(text.iter().any(|t| t.contains("E M U - V T 1 0 0")));
    }

    #[test]
    fn observable_paths() {
        let vt = machine(vec![0x3E, 0x10]);
        assert_eq!(vt.query("cpu.pc"), Some(Value::U16(0)));
        assert_eq!(vt.query("memory.0x0001"), Some(Value::U8(0x10)));
        assert_eq!(vt.query("display.bright"), Some(Value::U8(0xF0)));
        assert_eq!(vt.query("uart.mode_select"), Some(Value::Bool(true)));
        assert_eq!(vt.query("bogus"), None);
    }
}
