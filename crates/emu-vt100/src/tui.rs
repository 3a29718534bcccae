//! Full-screen front end.
//!
//! Registers, breakpoints, screen memory and the message log sit above the
//! decoded video; the bottom line carries the keyboard LEDs, the session
//! state and any prompt.

use std::io::{self, Stdout};
use std::time::Duration;

use crossterm::{
    event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers},
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use ratatui::{
    Frame, Terminal,
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
};

use emu_core::Cpu;

use crate::debugger::DUMP_START;
use crate::keymap::HostKey;
use crate::session::{Frontend, Session};
use crate::video::{CellAttrs, Row};

/// Height of the register/breakpoint/memory/message strip.
const TOP_HEIGHT: u16 = 12;
/// 24 screen rows, two spare for the setup overlay and the border.
const VIDEO_HEIGHT: u16 = 28;

/// A line being typed at the status bar.
struct Prompt<'a> {
    label: &'a str,
    input: &'a str,
}

pub struct Tui {
    terminal: Terminal<CrosstermBackend<Stdout>>,
}

impl Tui {
    /// Take over the host terminal. It is restored on drop.
    pub fn new() -> io::Result<Self> {
        enable_raw_mode()?;
        let mut stdout = io::stdout();
        execute!(stdout, EnterAlternateScreen)?;
        let terminal = Terminal::new(CrosstermBackend::new(stdout))?;
        Ok(Self { terminal })
    }

    fn draw(&mut self, session: &Session, prompt: Option<&Prompt<'_>>) -> io::Result<()> {
        self.terminal.draw(|f| ui(f, session, prompt))?;
        Ok(())
    }
}

impl Drop for Tui {
    fn drop(&mut self) {
        let _ = disable_raw_mode();
        let _ = execute!(self.terminal.backend_mut(), LeaveAlternateScreen);
        let _ = self.terminal.show_cursor();
    }
}

impl Frontend for Tui {
    fn poll_key(&mut self) -> io::Result<Option<HostKey>> {
        while event::poll(Duration::ZERO)? {
            if let Event::Key(key) = event::read()? {
                if let Some(key) = host_key(key) {
                    return Ok(Some(key));
                }
            }
        }
        Ok(None)
    }

    fn prompt(&mut self, session: &Session, label: &str, max: usize) -> io::Result<Option<String>> {
        let mut input = String::new();
        loop {
            self.draw(session, Some(&Prompt { label, input: &input }))?;
            let Event::Key(key) = event::read()? else {
                continue;
            };
            if key.kind != KeyEventKind::Press {
                continue;
            }
            match key.code {
                KeyCode::Enter => return Ok(Some(input)),
                KeyCode::Esc => return Ok(None),
                KeyCode::Char('c' | 'd') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                    return Ok(None);
                }
                KeyCode::Backspace => {
                    input.pop();
                }
                KeyCode::Char(c) if input.chars().count() < max => input.push(c),
                _ => {}
            }
        }
    }

    fn render(&mut self, session: &Session) -> io::Result<()> {
        self.draw(session, None)
    }

    fn clear(&mut self) -> io::Result<()> {
        self.terminal.clear()
    }
}

/// Host key events as the session sees them. Shifted and controlled
/// function keys continue the numbering the way curses does: Shift-F1 is
/// F13 and Ctrl-F1 is F25.
fn host_key(key: KeyEvent) -> Option<HostKey> {
    if key.kind != KeyEventKind::Press {
        return None;
    }
    let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
    let shift = key.modifiers.contains(KeyModifiers::SHIFT);
    Some(match key.code {
        KeyCode::Char(c) if ctrl => HostKey::Ctrl(c.to_ascii_lowercase()),
        KeyCode::Char(c) => HostKey::Char(c),
        KeyCode::Enter => HostKey::Enter,
        KeyCode::Tab => HostKey::Tab,
        KeyCode::Backspace => HostKey::Backspace,
        KeyCode::Delete => HostKey::Delete,
        KeyCode::Insert => HostKey::Insert,
        KeyCode::Esc => HostKey::Esc,
        KeyCode::Up => HostKey::Up,
        KeyCode::Down => HostKey::Down,
        KeyCode::Left => HostKey::Left,
        KeyCode::Right => HostKey::Right,
        KeyCode::Home => HostKey::Home,
        KeyCode::End => HostKey::End,
        KeyCode::PageUp => HostKey::PageUp,
        KeyCode::PageDown => HostKey::PageDown,
        KeyCode::F(n) if n <= 12 && ctrl => HostKey::F(n + 24),
        KeyCode::F(n) if n <= 12 && shift => HostKey::F(n + 12),
        KeyCode::F(n) => HostKey::F(n),
        _ => return None,
    })
}

fn ui(f: &mut Frame, session: &Session, prompt: Option<&Prompt<'_>>) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(TOP_HEIGHT),
            Constraint::Min(VIDEO_HEIGHT),
            Constraint::Length(1),
        ])
        .split(f.area());

    let top = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Length(14),
            Constraint::Length(10),
            Constraint::Min(30),
            Constraint::Length(40),
        ])
        .split(chunks[0]);

    render_registers(f, top[0], session);
    render_breakpoints(f, top[1], session);
    render_memory(f, top[2], session);
    render_messages(f, top[3], session);
    render_video(f, chunks[1], session);
    match prompt {
        Some(prompt) => render_prompt(f, chunks[2], prompt),
        None => render_status(f, chunks[2], session),
    }
}

fn panel(title: &str) -> Block<'_> {
    Block::default()
        .borders(Borders::ALL)
        .title(title)
        .border_style(Style::default().fg(Color::DarkGray))
}

fn register_line(name: &str, value: String) -> Line<'static> {
    Line::from(vec![
        Span::styled(format!("{name:<4}"), Style::default().fg(Color::Gray)),
        Span::styled(value, Style::default().fg(Color::White)),
    ])
}

fn render_registers(f: &mut Frame, area: Rect, session: &Session) {
    let r = session.machine().cpu().registers();
    let lines = vec![
        register_line("A", format!("{:02x}", r.a)),
        register_line("B C", format!("{:02x} {:02x}", r.b, r.c)),
        register_line("D E", format!("{:02x} {:02x}", r.d, r.e)),
        register_line("H L", format!("{:02x} {:02x}", r.h, r.l)),
        register_line("PC", format!("{:04x}", r.pc)),
        register_line("SP", format!("{:04x}", r.sp)),
        register_line("F", format!("{:08b}", r.f)),
        register_line("INT", if r.inte { "on" } else { "off" }.to_string()),
    ];
    f.render_widget(Paragraph::new(lines).block(panel("Regs")), area);
}

fn render_breakpoints(f: &mut Frame, area: Rect, session: &Session) {
    let pc = session.machine().pc();
    let lines: Vec<Line> = session
        .breakpoints()
        .iter()
        .map(|&bp| {
            let colour = if bp == pc { Color::Red } else { Color::White };
            Line::from(Span::styled(format!("{bp:04x}"), Style::default().fg(colour)))
        })
        .collect();
    f.render_widget(Paragraph::new(lines).block(panel("Brkpts")), area);
}

fn render_memory(f: &mut Frame, area: Rect, session: &Session) {
    let bus = session.machine().bus();
    let ram = bus.ram();
    let per_line = usize::from(area.width.saturating_sub(8) / 3).max(1);
    let rows = usize::from(area.height.saturating_sub(2));

    let lines: Vec<Line> = (0..rows)
        .map(|row| {
            let start = usize::from(DUMP_START) + row * per_line;
            let mut spans = vec![Span::styled(
                format!("{start:04x}: "),
                Style::default().fg(Color::DarkGray),
            )];
            for address in (start..start + per_line).take_while(|&a| a < ram.len()) {
                let changed = bus.touched(address as u16);
                let style = if changed {
                    Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD)
                } else {
                    Style::default().fg(Color::Gray)
                };
                spans.push(Span::styled(format!("{:02x} ", ram[address]), style));
            }
            Line::from(spans)
        })
        .collect();
    f.render_widget(Paragraph::new(lines).block(panel("Mem")), area);
}

fn render_messages(f: &mut Frame, area: Rect, session: &Session) {
    let log = &session.machine().messages;
    let rows = usize::from(area.height.saturating_sub(2));
    let lines: Vec<Line> = log
        .iter()
        .skip(log.len().saturating_sub(rows))
        .map(|m| Line::from(Span::styled(m.to_string(), Style::default().fg(Color::White))))
        .collect();
    f.render_widget(Paragraph::new(lines).block(panel("Messages")), area);
}

fn cell_style(base: Style, attrs: CellAttrs) -> Style {
    let mut style = base;
    if attrs.inverse {
        style = style.add_modifier(Modifier::REVERSED);
    }
    if attrs.underline {
        style = style.add_modifier(Modifier::UNDERLINED);
    }
    if attrs.blink {
        style = style.add_modifier(Modifier::SLOW_BLINK);
    }
    if attrs.bold {
        style = style.add_modifier(Modifier::BOLD);
    }
    style
}

fn row_line(row: &Row) -> Line<'static> {
    let colour = if row.scrolling { Color::Red } else { Color::Green };
    let base = Style::default().fg(colour);
    Line::from(
        row.cells
            .iter()
            .map(|cell| Span::styled(cell.ch.to_string(), cell_style(base, cell.attrs)))
            .collect::<Vec<_>>(),
    )
}

fn render_video(f: &mut Frame, area: Rect, session: &Session) {
    let frame = session.machine().frame();
    let block = panel(&frame.title);
    if frame.disabled {
        f.render_widget(block, area);
        return;
    }

    // Rows are placed by their screen position; gaps stay blank.
    let mut lines: Vec<Line> = Vec::new();
    let mut place = |y: i32, line: Line<'static>| {
        let Ok(index) = usize::try_from(y - 1) else {
            return;
        };
        if lines.len() <= index {
            lines.resize(index + 1, Line::default());
        }
        lines[index] = line;
    };
    if frame.setup.is_some() {
        let style = Style::default().fg(Color::Green);
        for (y, text) in frame.text_rows() {
            place(y, Line::from(Span::styled(text, style)));
        }
    } else {
        for row in &frame.rows {
            place(row.y, row_line(row));
        }
    }
    f.render_widget(Paragraph::new(lines).block(block), area);
}

fn led(label: &str, lit: bool) -> Span<'static> {
    let style = if lit {
        Style::default().fg(Color::Black).bg(Color::Yellow)
    } else {
        Style::default().fg(Color::DarkGray)
    };
    Span::styled(format!("{label} "), style)
}

fn render_status(f: &mut Frame, area: Rect, session: &Session) {
    let mut spans: Vec<Span> = session.leds().into_iter().map(|(l, lit)| led(l, lit)).collect();

    spans.push(Span::raw(" "));
    spans.push(if session.control_mode() {
        Span::styled("CONTROL ", Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD))
    } else {
        Span::styled("TYPING ", Style::default().fg(Color::Green).add_modifier(Modifier::BOLD))
    });
    spans.push(if session.running() {
        Span::styled("RUNNING ", Style::default().fg(Color::Green))
    } else {
        Span::styled("STOPPED ", Style::default().fg(Color::Red))
    });
    spans.push(Span::styled(
        format!("{} ", session.machine().bus().uart.pty_name()),
        Style::default().fg(Color::Gray),
    ));
    if let Some(entry) = session.keycode_entry() {
        let mut text = format!("Keycode: {}", entry.code);
        if entry.shift {
            text.push_str(" shift");
        }
        if entry.ctrl {
            text.push_str(" ctrl");
        }
        spans.push(Span::styled(text + " ", Style::default().fg(Color::Yellow)));
    }
    if let Some(status) = session.status() {
        spans.push(Span::styled(status.to_string(), Style::default().fg(Color::White)));
    }
    f.render_widget(Paragraph::new(Line::from(spans)), area);
}

fn render_prompt(f: &mut Frame, area: Rect, prompt: &Prompt<'_>) {
    let line = Line::from(vec![
        Span::styled(prompt.label.to_string(), Style::default().fg(Color::Cyan)),
        Span::raw(prompt.input.to_string()),
    ]);
    f.render_widget(Paragraph::new(line), area);
    let width = prompt.label.chars().count() + prompt.input.chars().count();
    let x = area.x.saturating_add(u16::try_from(width).unwrap_or(u16::MAX));
    f.set_cursor_position((x.min(area.right().saturating_sub(1)), area.y));
}
