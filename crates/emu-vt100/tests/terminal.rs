//! Whole-terminal scenarios driven through the public API.

use std::collections::VecDeque;
use std::io;

use emu_vt100::bus::{PORT_COMMAND, PORT_DATA, PORT_FLAGS};
use emu_vt100::keymap::HostKey;
use emu_vt100::pacing::Pacer;
use emu_vt100::{Frontend, RomSource, Session, Vt100, Vt100Config, cli};
use intel_8251::{MockLine, NullLine};

/// Replays keys and counts renders.
#[derive(Default)]
struct Script {
    keys: VecDeque<HostKey>,
    renders: u32,
}

impl Frontend for Script {
    fn poll_key(&mut self) -> io::Result<Option<HostKey>> {
        Ok(self.keys.pop_front())
    }

    fn prompt(&mut self, _: &Session, _: &str, _: usize) -> io::Result<Option<String>> {
        Ok(None)
    }

    fn render(&mut self, _: &Session) -> io::Result<()> {
        self.renders += 1;
        Ok(())
    }
}

fn machine(rom: Vec<u8>) -> Vt100 {
    Vt100::new(&Vt100Config::hermetic(RomSource::Bytes(rom)), Box::new(NullLine))
}

/// `MVI A,n ; OUT port` for each pair, then a jump-to-self.
fn program(outs: &[(u8, u8)]) -> Vec<u8> {
    let mut rom = Vec::new();
    for &(port, value) in outs {
        rom.extend_from_slice(&[0x3E, value, 0xD3, port]);
    }
    let here = rom.len() as u16;
    rom.extend_from_slice(&[0xC3, here as u8, (here >> 8) as u8]);
    rom
}

#[test]
fn breakpoint_stops_with_trace() {
    let m = machine(vec![0; 0x20]);
    let mut session = Session::new(m, true, [0x0010], Pacer::unthrottled());
    let mut script = Script::default();

    for _ in 0..0x20 {
        assert!(session.iterate(&mut script).unwrap());
        if !session.running() {
            break;
        }
    }

    assert!(!session.running());
    assert!(session.control_mode());
    assert_eq!(session.machine().pc(), 0x0010);
    let history: Vec<u16> = session.machine().history().collect();
    assert_eq!(history, (0x0006..=0x000F).collect::<Vec<_>>());

    let messages: Vec<&str> = session.machine().messages.iter().collect();
    let start = messages
        .iter()
        .position(|m| *m == "Breakpoint trace for 0010:")
        .expect("trace header");
    assert_eq!(messages[start + 1], "  PC 0006");
    assert_eq!(messages[start + 10], "  PC 000f");
}

#[test]
fn resume_after_breakpoint() {
    let m = machine(vec![0; 0x20]);
    let mut session = Session::new(m, true, [0x0004], Pacer::unthrottled());
    let mut script = Script::default();
    while session.running() {
        session.iterate(&mut script).unwrap();
    }
    assert_eq!(session.machine().pc(), 0x0004);

    script.keys.push_back(HostKey::Char('n'));
    session.iterate(&mut script).unwrap();
    session.iterate(&mut script).unwrap();
    assert_eq!(session.machine().pc(), 0x0005);
    assert!(!session.running());
}

#[test]
fn break_option_without_rom_uses_builtin() {
    let options = cli::parse_from(["emu-vt100", "--break", "1A2B"]).unwrap();
    assert_eq!(options.breakpoints, vec![0x1A2B]);
    assert_eq!(options.config.rom, RomSource::BuiltIn);
    assert!(!options.running);
}

#[test]
fn screen_memory_decodes_after_display_lights() {
    let mut m = machine(program(&[(PORT_FLAGS, 0x00)]));
    assert!(m.frame().disabled);
    for _ in 0..4 {
        m.step();
    }

    let bus = m.bus_mut();
    for address in 0x3000..0x4000u16 {
        bus.poke(address, 0xFF);
    }
    // Two hidden fill lines, then "HI" pointing at itself.
    let screen: &[u8] = &[
        0x7F, 0x70, 0x03, //
        0x7F, 0x70, 0x06, //
        b'H', b'I', 0x7F, 0x70, 0x06,
    ];
    for (i, &b) in screen.iter().enumerate() {
        bus.poke(0x2000 + i as u16, b);
    }

    let frame = m.frame();
    assert!(!frame.disabled);
    assert_eq!(frame.title, "Video [bright 100%]");
    assert_eq!(frame.text_rows(), vec![(1, "HI".to_string())]);
}

#[test]
fn running_session_paints_builtin_banner() {
    let config = Vt100Config::hermetic(RomSource::BuiltIn);
    let m = Vt100::new(&config, Box::new(NullLine));
    let mut session = Session::new(m, true, [], Pacer::unthrottled());
    let mut script = Script::default();
    for _ in 0..100_000 {
        assert!(session.iterate(&mut script).unwrap());
    }
    assert!(script.renders > 0);
    assert!(session.running());

    let frame = session.machine().frame();
    let text: Vec<String> = frame.text_rows().into_iter().map(|(_, row)| row).collect();
    assert!(text.iter().any(|t| t.contains("E M U - V T 1 0 0")), "{text:?}");
}

#[test]
fn serial_bytes_go_out_and_come_back() {
    let line = MockLine::new();
    let config = Vt100Config::hermetic(RomSource::Bytes(program(&[
        (PORT_COMMAND, 0x4E),
        (PORT_COMMAND, 0x27),
        (PORT_DATA, b'A'),
    ])));
    let mut m = Vt100::new(&config, Box::new(line.clone()));
    for _ in 0..6 {
        m.step();
    }
    assert_eq!(line.state().opens, 1);
    assert_eq!(line.sent(), b"A");

    line.feed(b"z");
    let mut received = false;
    for _ in 0..200_000 {
        m.step();
        if m.bus().uart.rx_ready() {
            received = true;
            break;
        }
    }
    assert!(received);
    assert!(m.bus().interrupt_pending());
    assert_eq!(m.bus().vector() & 0xD7, 0xD7);
}

#[test]
fn shell_exit_returns_to_control_mode() {
    let line = MockLine::new();
    let config = Vt100Config::hermetic(RomSource::Bytes(program(&[
        (PORT_COMMAND, 0x4E),
        (PORT_COMMAND, 0x27),
    ])));
    let m = Vt100::new(&config, Box::new(line.clone()));
    let mut session = Session::new(m, true, [], Pacer::unthrottled());
    let mut script = Script::default();
    for _ in 0..4 {
        session.iterate(&mut script).unwrap();
    }
    assert!(!session.control_mode());

    line.hang_up();
    for _ in 0..200_000 {
        session.iterate(&mut script).unwrap();
        if session.control_mode() {
            break;
        }
    }
    assert!(session.control_mode());
    assert!(!line.state().open);
}
