//! Run loop and operator controls.
//!
//! The session owns the machine and decides, once per iteration, whether to
//! execute an instruction, refresh the display and poll the host keyboard.
//! Keys go either to the debugger (control mode) or to the VT100 keyboard
//! (typing mode); F10 switches between the two.

use std::collections::BTreeSet;
use std::io;
use std::path::Path;

use tracing::debug;

use crate::debugger::{self, parse_address};
use crate::keyboard::{KEY_CTRL, KEY_SHIFT, Keyboard, STATUS_BEEP, STATUS_LOCAL, STATUS_LOCKED};
use crate::keymap::{self, HostKey, KEYPAD_MODE_FLAG};
use crate::machine::Vt100;
use crate::pacing::Pacer;

/// Vertical ticks between display refreshes.
const REFRESH_TICKS: u8 = 4;

/// Vertical ticks a keyboard scan may stay busy before giving up on it.
const KEY_STUCK_LIMIT: u8 = 5;

const PATH_MAX: usize = 127;

const KEY_HELP: &[&str] = &[
    "Function Key map:",
    "F1..F4 -> PF1..PF4",
    "F5 -> Break",
    "F9 -> Setup",
    "F10 -> Cmd Mode",
    "F11 -> Escape",
    "F12 -> Backspace",
    "F13 -> Linefeed",
    "F14 -> Keycodes",
    "F15 -> Hangup",
];

/// The host side of the session: key input, line input and drawing.
pub trait Frontend {
    /// A key if one is waiting. Must not block.
    fn poll_key(&mut self) -> io::Result<Option<HostKey>>;

    /// Read a line of at most `max` characters. `None` if abandoned.
    fn prompt(&mut self, session: &Session, label: &str, max: usize) -> io::Result<Option<String>>;

    fn render(&mut self, session: &Session) -> io::Result<()>;

    /// Forget what is on screen so the next render repaints everything.
    fn clear(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Decimal key code typed after F14.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct KeycodeEntry {
    pub code: u16,
    pub shift: bool,
    pub ctrl: bool,
}

pub struct Session {
    machine: Vt100,
    breakpoints: BTreeSet<u16>,
    running: bool,
    control_mode: bool,
    /// Instructions left before stopping; 0 = unlimited.
    steps: u32,
    key_stuck: u8,
    refresh_clock: u8,
    redraw: bool,
    pacer: Pacer,
    keycode_entry: Option<KeycodeEntry>,
    status: Option<String>,
}

impl Session {
    #[must_use]
    pub fn new(
        mut machine: Vt100,
        running: bool,
        breakpoints: impl IntoIterator<Item = u16>,
        pacer: Pacer,
    ) -> Self {
        for line in KEY_HELP {
            machine.messages.push(*line);
        }
        Self {
            machine,
            breakpoints: breakpoints.into_iter().collect(),
            running,
            control_mode: !running,
            steps: 0,
            key_stuck: 0,
            refresh_clock: 0,
            redraw: true,
            pacer,
            keycode_entry: None,
            status: None,
        }
    }

    #[must_use]
    pub fn machine(&self) -> &Vt100 {
        &self.machine
    }

    pub fn machine_mut(&mut self) -> &mut Vt100 {
        &mut self.machine
    }

    #[must_use]
    pub fn breakpoints(&self) -> &BTreeSet<u16> {
        &self.breakpoints
    }

    #[must_use]
    pub fn running(&self) -> bool {
        self.running
    }

    #[must_use]
    pub fn control_mode(&self) -> bool {
        self.control_mode
    }

    #[must_use]
    pub fn status(&self) -> Option<&str> {
        self.status.as_deref()
    }

    #[must_use]
    pub fn keycode_entry(&self) -> Option<KeycodeEntry> {
        self.keycode_entry
    }

    /// Keyboard LEDs as (label, lit), in status bar order.
    #[must_use]
    pub fn leds(&self) -> Vec<(&'static str, bool)> {
        let flags = self.machine.bus().kbd.status();
        let mut leds = vec![("ONLINE", flags & STATUS_LOCAL == 0)];
        if flags & STATUS_BEEP != 0 {
            leds.push(("BEEP", true));
        } else {
            leds.push(("LOCAL", flags & STATUS_LOCAL != 0));
        }
        leds.push(("KBD LOCK", flags & STATUS_LOCKED != 0));
        for (i, name) in ["L1", "L2", "L3", "L4"].into_iter().enumerate() {
            leds.push((name, flags & (0x08 >> i) != 0));
        }
        leds
    }

    /// Run until the operator quits.
    pub fn run(&mut self, frontend: &mut impl Frontend) -> io::Result<()> {
        self.pacer.resync();
        while self.iterate(frontend)? {}
        Ok(())
    }

    /// One pass of the loop. Returns false when the operator quits.
    pub fn iterate(&mut self, frontend: &mut impl Frontend) -> io::Result<bool> {
        if self.running {
            self.execute();
        } else {
            self.pacer.idle(self.machine.rt_ticks_mut());
        }

        let key = if self.machine.take_vscan() {
            self.refresh_clock += 1;
            if self.refresh_clock >= REFRESH_TICKS {
                self.repaint(frontend)?;
                self.refresh_clock = 0;
            }
            let display = &mut self.machine.bus_mut().display;
            display.last_latch = display.scroll_latch;

            if self.control_mode || !self.machine.bus().kbd.busy_scanning() {
                self.key_stuck = 0;
                frontend.poll_key()?
            } else if self.key_stuck < KEY_STUCK_LIMIT {
                self.key_stuck += 1;
                None
            } else {
                self.machine.messages.push("Keyboard STUCK");
                self.control_mode = true;
                None
            }
        } else if !self.running {
            self.repaint(frontend)?;
            let key = frontend.poll_key()?;
            self.control_mode = true;
            key
        } else {
            None
        };

        match key {
            Some(key) => self.handle_key(frontend, key),
            None => Ok(true),
        }
    }

    fn repaint(&mut self, frontend: &mut impl Frontend) -> io::Result<()> {
        if std::mem::take(&mut self.redraw) {
            frontend.clear()?;
        }
        frontend.render(self)
    }

    fn execute(&mut self) {
        let result = self.machine.step();
        if result.events.serial_closed {
            self.control_mode = true;
        }
        if self.steps > 0 {
            self.steps -= 1;
            if self.steps == 0 {
                self.running = false;
            }
        }
        let pc = self.machine.pc();
        if self.breakpoints.contains(&pc) {
            for line in debugger::breakpoint_trace(pc, self.machine.history()) {
                self.machine.messages.push(line);
            }
            self.control_mode = true;
            self.running = false;
            self.redraw = true;
        }
        self.pacer.pace(self.machine.rt_ticks_mut());
    }

    fn handle_key(&mut self, frontend: &mut impl Frontend, key: HostKey) -> io::Result<bool> {
        if key == HostKey::F(10) {
            self.control_mode = !self.control_mode;
            self.redraw = true;
            return Ok(true);
        }
        if self.control_mode && !matches!(key, HostKey::F(5 | 9 | 15)) {
            return self.command(frontend, key);
        }
        if self.control_mode {
            self.control_mode = false;
            self.redraw = true;
        }
        self.type_key(key);
        Ok(true)
    }

    fn command(&mut self, frontend: &mut impl Frontend, key: HostKey) -> io::Result<bool> {
        match key {
            HostKey::Char('q') | HostKey::Ctrl('c' | 'd') => return Ok(false),
            HostKey::Ctrl('l') => self.redraw = true,
            HostKey::Char(' ') => self.running = !self.running,
            HostKey::Char('n') => {
                self.running = true;
                self.steps = 1;
            }
            HostKey::Char('m') => self.machine.bus_mut().snapshot(),
            HostKey::Char('b') => {
                if let Some(text) = frontend.prompt(self, "Addr. of breakpoint: ", 4)? {
                    self.status = Some(match parse_address(&text) {
                        Ok(address) => {
                            self.breakpoints.insert(address);
                            format!("Breakpoint added at {text}")
                        }
                        Err(_) => format!("Bad breakpoint {text}"),
                    });
                }
                self.after_prompt();
            }
            HostKey::Char('d') => {
                if let Some(text) = frontend.prompt(self, "Addr. of bp to remove: ", 4)? {
                    self.status = Some(match parse_address(&text) {
                        Ok(address) if self.breakpoints.remove(&address) => {
                            format!("Breakpoint removed at {text}")
                        }
                        Ok(_) => format!("No breakpoint {text}"),
                        Err(_) => format!("Bad breakpoint {text}"),
                    });
                }
                self.after_prompt();
            }
            HostKey::Char('s') => {
                if let Some(path) = frontend.prompt(self, "Save to: ", PATH_MAX)? {
                    match debugger::save_screen_memory(self.machine.bus().ram(), Path::new(&path)) {
                        Ok(()) => self.machine.messages.push("File saved"),
                        Err(e) => {
                            debug!("memory dump to {path}: {e}");
                            self.machine.messages.push(format!("Cannot save mem file {path}"));
                        }
                    }
                }
                self.after_prompt();
            }
            _ => {}
        }
        Ok(true)
    }

    /// The CPU was frozen while the operator typed.
    fn after_prompt(&mut self) {
        self.redraw = true;
        self.pacer.resync();
    }

    fn type_key(&mut self, key: HostKey) {
        if let Some(entry) = self.keycode_entry.as_mut() {
            match key {
                HostKey::F(14) => *entry = KeycodeEntry::default(),
                HostKey::Enter | HostKey::Char('\n' | '\r') => {
                    let entry = *entry;
                    self.keycode_entry = None;
                    self.send_keycode(entry);
                }
                HostKey::Char(c @ '0'..='9') => {
                    let digit = u16::from(c as u8 - b'0');
                    entry.code = entry.code.saturating_mul(10).saturating_add(digit);
                }
                HostKey::Char('s') => entry.shift = true,
                HostKey::Char('c') => entry.ctrl = true,
                _ => self.keycode_entry = None,
            }
            return;
        }
        if key == HostKey::F(14) {
            self.keycode_entry = Some(KeycodeEntry::default());
            return;
        }

        let strokes = keymap::translate(key);
        let bus = self.machine.bus_mut();
        if strokes.keypad && bus.peek(KEYPAD_MODE_FLAG) == 0 {
            bus.poke(KEYPAD_MODE_FLAG, 1);
        }
        for code in strokes.codes {
            self.machine.keypress(code);
        }
    }

    fn send_keycode(&mut self, entry: KeycodeEntry) {
        if entry.shift || entry.code & 0x80 != 0 {
            self.machine.keypress(KEY_SHIFT);
        }
        if entry.ctrl || entry.code & 0x100 != 0 {
            self.machine.keypress(KEY_CTRL);
        }
        let code = (entry.code & 0x7F) as u8;
        if code != 0 {
            self.machine.keypress(code);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;

    use intel_8251::NullLine;

    use crate::config::{RomSource, Vt100Config};

    #[derive(Default)]
    struct Script {
        keys: VecDeque<HostKey>,
        answers: VecDeque<Option<String>>,
        prompts: Vec<String>,
        renders: u32,
        clears: u32,
    }

    impl Frontend for Script {
        fn poll_key(&mut self) -> io::Result<Option<HostKey>> {
            Ok(self.keys.pop_front())
        }

        fn prompt(&mut self, _: &Session, label: &str, _: usize) -> io::Result<Option<String>> {
            self.prompts.push(label.to_string());
            Ok(self.answers.pop_front().flatten())
        }

        fn render(&mut self, _: &Session) -> io::Result<()> {
            self.renders += 1;
            Ok(())
        }

        fn clear(&mut self) -> io::Result<()> {
            self.clears += 1;
            Ok(())
        }
    }

    fn session(running: bool) -> Session {
        let config = Vt100Config::hermetic(RomSource::Bytes(vec![0; 0x100]));
        let machine = Vt100::new(&config, Box::new(NullLine));
        Session::new(machine, running, [], Pacer::unthrottled())
    }

    fn press(s: &mut Session, script: &mut Script, keys: &[HostKey]) {
        script.keys.extend(keys.iter().copied());
        while !script.keys.is_empty() {
            assert!(s.iterate(script).unwrap());
        }
    }

    #[test]
    fn starts_in_control_mode_when_stopped() {
        let s = session(false);
        assert!(s.control_mode());
        assert!(!s.running());
        assert_eq!(s.machine().messages.iter().next(), Some("Function Key map:"));
        assert!(!session(true).control_mode());
    }

    #[test]
    fn single_step_and_run_toggle() {
        let mut s = session(false);
        let mut script = Script::default();
        press(&mut s, &mut script, &[HostKey::Char('n')]);
        s.iterate(&mut script).unwrap();
        assert_eq!(s.machine().pc(), 1);
        assert!(!s.running());
        press(&mut s, &mut script, &[HostKey::Char(' ')]);
        assert!(s.running());
    }

    #[test]
    fn stopped_session_renders_and_clears_once() {
        let mut s = session(false);
        let mut script = Script::default();
        s.iterate(&mut script).unwrap();
        s.iterate(&mut script).unwrap();
        assert_eq!(script.renders, 2);
        assert_eq!(script.clears, 1);
        press(&mut s, &mut script, &[HostKey::Ctrl('l')]);
        s.iterate(&mut script).unwrap();
        assert_eq!(script.clears, 2);
    }

    #[test]
    fn quit_keys() {
        for key in [HostKey::Char('q'), HostKey::Ctrl('c'), HostKey::Ctrl('d')] {
            let mut s = session(false);
            let mut script = Script::default();
            script.keys.push_back(key);
            assert!(!s.iterate(&mut script).unwrap());
        }
    }

    #[test]
    fn breakpoint_prompts() {
        let mut s = session(false);
        let mut script = Script::default();
        script.answers = VecDeque::from([
            Some("1a2b".to_string()),
            Some("xyz".to_string()),
            Some("0010".to_string()),
            Some("1a2b".to_string()),
        ]);
        press(&mut s, &mut script, &[HostKey::Char('b')]);
        assert_eq!(s.status(), Some("Breakpoint added at 1a2b"));
        assert!(s.breakpoints().contains(&0x1A2B));
        press(&mut s, &mut script, &[HostKey::Char('b')]);
        assert_eq!(s.status(), Some("Bad breakpoint xyz"));
        press(&mut s, &mut script, &[HostKey::Char('d')]);
        assert_eq!(s.status(), Some("No breakpoint 0010"));
        press(&mut s, &mut script, &[HostKey::Char('d')]);
        assert_eq!(s.status(), Some("Breakpoint removed at 1a2b"));
        assert!(s.breakpoints().is_empty());
        assert_eq!(script.prompts[0], "Addr. of breakpoint: ");
        assert_eq!(script.prompts[2], "Addr. of bp to remove: ");
    }

    #[test]
    fn abandoned_prompt_changes_nothing() {
        let mut s = session(false);
        let mut script = Script::default();
        script.answers.push_back(None);
        press(&mut s, &mut script, &[HostKey::Char('b')]);
        assert!(s.status().is_none());
        assert!(s.breakpoints().is_empty());
    }

    #[test]
    fn save_reports_failure() {
        let mut s = session(false);
        let mut script = Script::default();
        script.answers.push_back(Some("/nonexistent/dir/dump.txt".into()));
        press(&mut s, &mut script, &[HostKey::Char('s')]);
        assert_eq!(
            s.machine().messages.last(),
            Some("Cannot save mem file /nonexistent/dir/dump.txt")
        );
    }

    #[test]
    fn f10_toggles_and_typing_leaves_control_mode() {
        let mut s = session(true);
        let mut script = Script::default();
        s.handle_key(&mut script, HostKey::F(10)).unwrap();
        assert!(s.control_mode());
        s.handle_key(&mut script, HostKey::F(9)).unwrap();
        assert!(!s.control_mode());
        assert_eq!(s.machine().bus().kbd.held().collect::<Vec<_>>(), vec![0x7B]);
    }

    #[test]
    fn typed_keys_reach_keyboard() {
        let mut s = session(true);
        let mut script = Script::default();
        s.handle_key(&mut script, HostKey::Char('A')).unwrap();
        let held: Vec<u8> = s.machine().bus().kbd.held().collect();
        assert_eq!(held, vec![KEY_SHIFT, 0x4A]);
    }

    #[test]
    fn keypad_keys_force_application_mode() {
        let mut s = session(true);
        let mut script = Script::default();
        s.handle_key(&mut script, HostKey::Home).unwrap();
        assert_eq!(s.machine().bus().peek(KEYPAD_MODE_FLAG), 1);
    }

    #[test]
    fn keycode_entry() {
        let mut s = session(true);
        let mut script = Script::default();
        for key in [
            HostKey::F(14),
            HostKey::Char('7'),
            HostKey::Char('4'),
            HostKey::Char('s'),
            HostKey::Enter,
        ] {
            s.handle_key(&mut script, key).unwrap();
        }
        assert!(s.keycode_entry().is_none());
        let held: Vec<u8> = s.machine().bus().kbd.held().collect();
        assert_eq!(held, vec![KEY_SHIFT, 74]);
    }

    #[test]
    fn leds_follow_keyboard_status() {
        let mut s = session(true);
        s.machine_mut().bus_mut().kbd.set_status(STATUS_LOCAL | 0x09);
        let leds = s.leds();
        assert_eq!(leds[0], ("ONLINE", false));
        assert_eq!(leds[1], ("LOCAL", true));
        assert_eq!(leds[3], ("L1", true));
        assert_eq!(leds[6], ("L4", true));
        s.machine_mut().bus_mut().kbd.set_status(STATUS_BEEP);
        assert_eq!(s.leds()[1], ("BEEP", true));
    }
}
