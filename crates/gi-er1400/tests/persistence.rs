use std::fs;
use std::path::PathBuf;

use gi_er1400::{CELLS, Command, DEFAULT_IMAGE, Er1400, Er1400Error, encode_address, render};

fn scratch(name: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("gi-er1400-{}", std::process::id()));
    fs::create_dir_all(&dir).unwrap();
    let path = dir.join(name);
    let _ = fs::remove_file(&path);
    path
}

fn clock_in(chip: &mut Er1400, command: Command, data: bool) {
    chip.set_latch(command.latch(data));
    chip.clock(true);
}

fn program(chip: &mut Er1400, cell: usize, value: u16) {
    let reg = encode_address(cell);
    for bit in (0..20).rev() {
        clock_in(chip, Command::AcceptAddress, reg & (1 << bit) != 0);
    }
    for bit in (0..14).rev() {
        clock_in(chip, Command::AcceptData, value & (1 << bit) != 0);
    }
    clock_in(chip, Command::Write, false);
}

#[test]
fn missing_file_falls_back_to_factory_image() {
    let path = scratch("missing.nvr.txt");
    let (chip, error) = Er1400::with_file(&path);
    assert!(matches!(error, Some(Er1400Error::Io { .. })));
    assert_eq!(chip.contents(), &DEFAULT_IMAGE);
    assert_eq!(chip.path(), Some(path.as_path()));
}

#[test]
fn malformed_file_falls_back_to_factory_image() {
    let path = scratch("short.nvr.txt");
    fs::write(&path, "0001 0002 0003\n").unwrap();
    let (chip, error) = Er1400::with_file(&path);
    assert!(matches!(error, Some(Er1400Error::Truncated { found: 3 })));
    assert_eq!(chip.contents(), &DEFAULT_IMAGE);
}

#[test]
fn save_and_reload_round_trip() {
    let path = scratch("round.nvr.txt");
    let mut cells = [0u16; CELLS];
    for (i, cell) in cells.iter_mut().enumerate() {
        *cell = (i as u16 * 0x0123) & 0x3FFF;
    }
    let chip = Er1400::with_contents(cells);
    chip.save(&path).unwrap();
    assert_eq!(fs::read_to_string(&path).unwrap(), render(&cells));

    let (reloaded, error) = Er1400::with_file(&path);
    assert!(error.is_none());
    assert_eq!(reloaded.contents(), &cells);
}

#[test]
fn low_cells_are_not_persisted() {
    let path = scratch("low.nvr.txt");
    let (mut chip, _) = Er1400::with_file(&path);
    program(&mut chip, 12, 0x0123);
    assert_eq!(chip.contents()[12], 0x0123);
    assert_eq!(chip.saves(), 0);
    assert!(!path.exists());
}

#[test]
fn persistence_starts_at_cell_fifty() {
    let path = scratch("boundary.nvr.txt");
    let (mut chip, _) = Er1400::with_file(&path);
    program(&mut chip, 49, 0x0001);
    assert_eq!(chip.saves(), 0);
    program(&mut chip, 50, 0x0002);
    assert_eq!(chip.saves(), 1);

    let (reloaded, error) = Er1400::with_file(&path);
    assert!(error.is_none());
    assert_eq!(reloaded.contents()[49], 0x0001);
    assert_eq!(reloaded.contents()[50], 0x0002);
}

#[test]
fn identical_write_persists_once() {
    let path = scratch("idempotent.nvr.txt");
    let (mut chip, _) = Er1400::with_file(&path);
    program(&mut chip, 60, 0x1234);
    assert_eq!(chip.saves(), 1);
    program(&mut chip, 60, 0x1234);
    assert_eq!(chip.saves(), 1);

    let (reloaded, error) = Er1400::with_file(&path);
    assert!(error.is_none());
    assert_eq!(reloaded.contents()[60], 0x1234);
}

#[test]
fn erase_between_identical_writes_lets_second_land() {
    let path = scratch("erase.nvr.txt");
    let (mut chip, _) = Er1400::with_file(&path);
    program(&mut chip, 77, 0x0042);
    clock_in(&mut chip, Command::Erase, false);
    assert_eq!(chip.contents()[77], 0x3FFF);
    clock_in(&mut chip, Command::Write, false);
    assert_eq!(chip.contents()[77], 0x0042);
    assert_eq!(chip.saves(), 2);
}

#[test]
fn unwritable_path_is_reported_not_fatal() {
    let dir = scratch("not-a-dir");
    fs::create_dir_all(&dir).unwrap();
    let (mut chip, _) = Er1400::with_file(&dir);
    program(&mut chip, 88, 0x0001);
    assert_eq!(chip.contents()[88], 0x0001);
    assert!(matches!(chip.take_save_error(), Some(Er1400Error::Io { .. })));
    assert!(chip.take_save_error().is_none());
}
