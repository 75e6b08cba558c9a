/*
    SDK-85 Emulator
    A peripheral-level emulator of the SDK-85 8085 trainer

    Copyright 2022-2025 Daniel Balsom

    Permission is hereby granted, free of charge, to any person obtaining a
    copy of this software and associated documentation files (the “Software”),
    to deal in the Software without restriction, including without limitation
    the rights to use, copy, modify, merge, publish, distribute, sublicense,
    and/or sell copies of the Software, and to permit persons to whom the
    Software is furnished to do so, subject to the following conditions:

    The above copyright notice and this permission notice shall be included in
    all copies or substantial portions of the Software.

    THE SOFTWARE IS PROVIDED “AS IS”, WITHOUT WARRANTY OF ANY KIND, EXPRESS OR
    IMPLIED, INCLUDING BUT NOT LIMITED TO THE WARRANTIES OF MERCHANTABILITY,
    FITNESS FOR A PARTICULAR PURPOSE AND NONINFRINGEMENT. IN NO EVENT SHALL THE
    AUTHORS OR COPYRIGHT HOLDERS BE LIABLE FOR ANY CLAIM, DAMAGES OR OTHER
    LIABILITY, WHETHER IN AN ACTION OF CONTRACT, TORT OR OTHERWISE, ARISING
    FROM, OUT OF OR IN CONNECTION WITH THE SOFTWARE OR THE USE OR OTHER
    DEALINGS IN THE SOFTWARE.

    ---------------------------------------------------------------------------

    lib.rs

*/

//! SDK-85 headless front-end main library component. The board is driven
//! from a terminal: keypad presses and teletype input come in as line
//! commands, and the display and teletype output are echoed back.
//!
//! No CPU core ships with this crate. A binary supplies one to [run] as a
//! builder closure over the prepared [BusInterface].

#![forbid(unsafe_code)]

mod command;
mod emulator;
mod keypad;
mod run_headless;
mod tty;
mod watchdog;

use std::path::Path;

use anyhow::Context;
use sdk85_core::{bus::BusInterface, cpu_common::Cpu, Machine};

pub use crate::{
    emulator::{EmuFlags, Emulator},
    keypad::{KeyAction, KeypadKey, KEYPAD_LAYOUT},
    tty::{tty_byte, TtyInput},
    watchdog::Watchdog,
};
use crate::run_headless::{run_headless, spawn_stdin_reader};

pub const DEFAULT_LOG_LEVEL: &str = "info";

/// Read a ROM or program image from disk.
pub fn load_file(path: &Path) -> Result<Vec<u8>, anyhow::Error> {
    std::fs::read(path).with_context(|| format!("Failed to read '{}'", path.display()))
}

/// Initialize logging. `RUST_LOG` wins over the configured level.
pub fn init_logging(level: Option<&str>) {
    let env = env_logger::Env::default().default_filter_or(level.unwrap_or(DEFAULT_LOG_LEVEL));
    if env_logger::Builder::from_env(env).try_init().is_err() {
        log::warn!("Logger already initialized");
    }
}

pub fn run<F>(cpu_builder: F)
where
    F: FnOnce(BusInterface) -> Box<dyn Cpu>,
{
    // Resolve the configuration by parsing the configuration toml and merging it with
    // command line arguments.
    let config = match sdk85_config::read_config_file("./sdk85.toml") {
        Ok(config) => config,
        Err(e) => match e.downcast_ref::<std::io::Error>() {
            Some(e) if e.kind() == std::io::ErrorKind::NotFound => {
                eprintln!(
                    "Configuration file not found! Please create sdk85.toml in the emulator directory \
                               or provide the path to configuration file with --configfile."
                );
                std::process::exit(1);
            }
            Some(e) => {
                eprintln!("Unknown IO error reading configuration file:\n{}", e);
                std::process::exit(1);
            }
            None => {
                eprintln!(
                    "Failed to parse configuration file. There may be a typo or otherwise invalid toml:\n{:#}",
                    e
                );
                std::process::exit(1);
            }
        },
    };

    init_logging(config.emulator.log_level.as_deref());

    let Some(rom_path) = config.emulator.rom.as_ref()
    else {
        eprintln!("No monitor ROM specified. Set 'rom' in the [emulator] section or pass --rom.");
        std::process::exit(1);
    };
    let rom = load_file(rom_path).unwrap_or_else(|e| {
        eprintln!("{:#}", e);
        std::process::exit(1);
    });

    let machine = Machine::new(config.machine, &rom, cpu_builder).unwrap_or_else(|e| {
        log::error!("Failed to build machine: {}", e);
        std::process::exit(1);
    });

    let mut emu = Emulator::new(machine, config.emulator.watchdog_interval());
    emu.flags = EmuFlags {
        echo_display: true,
        echo_tty: true,
    };

    if let Err(e) = emu.start() {
        log::error!("Failed to start machine: {}", e);
        std::process::exit(1);
    }

    if let Some(program_path) = config.emulator.program.as_ref() {
        let address = config.emulator.program_address;
        let loaded = load_file(program_path).and_then(|image| {
            emu.load_program(&image, address)
                .with_context(|| format!("Failed to load '{}' at {:04X}", program_path.display(), address))
        });
        if let Err(e) = loaded {
            eprintln!("{:#}", e);
            std::process::exit(1);
        }
        log::info!("Loaded '{}' at {:04X}", program_path.display(), address);
    }

    let input = spawn_stdin_reader().unwrap_or_else(|e| {
        eprintln!("Failed to start input reader: {}", e);
        std::process::exit(1);
    });

    println!("{}", emu.status_line());
    run_headless(&mut emu, input, config.emulator.program_address);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_names_path() {
        let err = load_file(Path::new("/nonexistent/monitor.bin")).unwrap_err();
        assert!(format!("{:#}", err).contains("/nonexistent/monitor.bin"));
    }
}
