use std::error::Error;
use std::fs::File;
use std::path::Path;
use std::sync::Mutex;

use intel_8251::SerialLine;
use tracing::info;
use tracing_subscriber::EnvFilter;

use emu_vt100::cli;
use emu_vt100::pacing::Pacer;
use emu_vt100::tui::Tui;
use emu_vt100::{Session, Vt100};

/// Diagnostics go to a file; the terminal belongs to the UI.
fn init_logging(path: &Path) -> Result<(), Box<dyn Error>> {
    let file = File::create(path)?;
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .try_init()
        .map_err(|e| -> Box<dyn Error> { e })?;
    Ok(())
}

#[cfg(unix)]
fn serial_line() -> Box<dyn SerialLine> {
    Box::new(emu_vt100::pty::PtyLine::new())
}

#[cfg(not(unix))]
fn serial_line() -> Box<dyn SerialLine> {
    Box::new(intel_8251::NullLine)
}

fn main() -> Result<(), Box<dyn Error>> {
    let options = cli::parse_from(std::env::args_os()).unwrap_or_else(|e| e.exit());

    if let Some(path) = &options.log {
        init_logging(path)?;
    }
    info!(rom = ?options.config.rom, avo = options.config.avo, "starting");

    let machine = Vt100::new(&options.config, serial_line());
    let mut session = Session::new(
        machine,
        options.running,
        options.breakpoints.iter().copied(),
        Pacer::new(),
    );
    let mut tui = Tui::new()?;
    session.run(&mut tui)?;
    drop(tui);

    info!("exiting");
    Ok(())
}
