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

    sdk85_config::lib.rs

*/

//! The `sdk85_config` crate reads the emulator's TOML configuration file and
//! overlays command line arguments on top of it. Command line arguments
//! always take priority over the configuration file.
//!
//! Features:
//! - `use_bpaf`: Enable BPAF support for command line argument parsing.

#[cfg(feature = "use_bpaf")]
mod bpaf_config;

use std::{
    path::{Path, PathBuf},
    time::Duration,
};

use anyhow::{anyhow, Context};
use cfg_if::cfg_if;
use sdk85_core::machine_types::MachineConfig;
use serde_derive::Deserialize;

#[cfg(feature = "use_bpaf")]
pub use bpaf_config::{cli_args, CmdLineArgs};

/// Where program images go when no address is given. Clear of the monitor's
/// scratch RAM.
pub const DEFAULT_PROGRAM_ADDRESS: u16 = 0x4000;
/// Seconds of inactivity before the emulator pauses itself.
pub const DEFAULT_WATCHDOG_INTERVAL: f64 = 300.0;

const fn _default_program_address() -> u16 {
    DEFAULT_PROGRAM_ADDRESS
}
const fn _default_watchdog_interval() -> f64 {
    DEFAULT_WATCHDOG_INTERVAL
}

#[derive(Debug, Deserialize)]
pub struct Emulator {
    pub rom: Option<PathBuf>,
    pub program: Option<PathBuf>,
    #[serde(default = "_default_program_address")]
    pub program_address: u16,
    #[serde(default = "_default_watchdog_interval")]
    pub watchdog_interval: f64,
    pub log_level: Option<String>,
}

impl Default for Emulator {
    fn default() -> Self {
        Self {
            rom: None,
            program: None,
            program_address: DEFAULT_PROGRAM_ADDRESS,
            watchdog_interval: DEFAULT_WATCHDOG_INTERVAL,
            log_level: None,
        }
    }
}

impl Emulator {
    /// The idle watchdog interval, or None if the watchdog is disabled.
    pub fn watchdog_interval(&self) -> Option<Duration> {
        if self.watchdog_interval > 0.0 {
            Duration::try_from_secs_f64(self.watchdog_interval).ok()
        }
        else {
            None
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct ConfigFileParams {
    #[serde(default)]
    pub emulator: Emulator,
    #[serde(default)]
    pub machine: MachineConfig,
}

#[cfg(feature = "use_bpaf")]
impl ConfigFileParams {
    pub fn overlay(&mut self, shell_args: CmdLineArgs) -> Result<(), anyhow::Error> {
        if let Some(rom) = shell_args.rom {
            self.emulator.rom = Some(rom);
        }
        if let Some(program) = shell_args.program {
            self.emulator.program = Some(program);
        }
        if let Some(address) = shell_args.program_address {
            self.emulator.program_address =
                parse_hex_u16(&address).with_context(|| format!("Bad program address '{}'", address))?;
        }
        if let Some(mode) = shell_args.mode {
            self.machine.mode = mode;
        }
        if let Some(cycles) = shell_args.clock_report_cycles {
            self.machine.clock_report_cycles = cycles;
        }
        if let Some(interval) = shell_args.watchdog_interval {
            self.emulator.watchdog_interval = interval;
        }
        if let Some(level) = shell_args.log_level {
            self.emulator.log_level = Some(level);
        }
        Ok(())
    }
}

/// Parse a 16-bit address written in hex, with or without a `0x` prefix or
/// an `h` suffix.
pub fn parse_hex_u16(s: &str) -> Result<u16, anyhow::Error> {
    let s = s.trim();
    let digits = s
        .strip_prefix("0x")
        .or_else(|| s.strip_prefix("0X"))
        .or_else(|| s.strip_suffix('h'))
        .or_else(|| s.strip_suffix('H'))
        .unwrap_or(s);
    if digits.is_empty() {
        return Err(anyhow!("Empty address"));
    }
    Ok(u16::from_str_radix(digits, 16)?)
}

/// Parse a TOML configuration string.
pub fn read_config(toml_string: impl AsRef<str>) -> Result<ConfigFileParams, anyhow::Error> {
    let toml_args: ConfigFileParams = toml::from_str(toml_string.as_ref())?;
    log::debug!("toml_config: {:?}", toml_args);
    Ok(toml_args)
}

fn read_config_path(path: &Path) -> Result<ConfigFileParams, anyhow::Error> {
    let toml_string = std::fs::read_to_string(path)
        .with_context(|| format!("Configuration file '{}' could not be read", path.display()))?;
    read_config(toml_string).with_context(|| format!("Error parsing configuration file '{}'", path.display()))
}

/// Read the TOML configuration from a file path, parse and overlay command line arguments.
pub fn read_config_file<P>(default_path: P) -> Result<ConfigFileParams, anyhow::Error>
where
    P: AsRef<Path>,
{
    cfg_if! {
        if #[cfg(feature = "use_bpaf")] {
            log::debug!("Reading command line arguments...");
            let shell_args = cli_args().run();

            // Allow configuration file path to be overridden by command line argument 'config_file'
            let path = match shell_args.config_file.as_ref() {
                Some(path) => path.clone(),
                None => default_path.as_ref().to_path_buf(),
            };
            let mut config = read_config_path(&path)?;
            config.overlay(shell_args)?;
            Ok(config)
        } else {
            log::debug!("Argument reading disabled...");
            read_config_path(default_path.as_ref())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sdk85_core::machine_types::BoardMode;

    const FULL_CONFIG: &str = r#"
[emulator]
rom = "roms/monitor.bin"
program = "programs/blink.bin"
program_address = 0x2000
watchdog_interval = 60.0
log_level = "debug"

[machine]
first_ram_address = 0x0800
clock_report_cycles = 5000
halt_banner_delay_ms = 50
mode = "tty"
"#;

    #[test]
    fn full_config_parses() {
        let config = read_config(FULL_CONFIG).unwrap();
        assert_eq!(config.emulator.rom, Some(PathBuf::from("roms/monitor.bin")));
        assert_eq!(config.emulator.program_address, 0x2000);
        assert_eq!(config.emulator.watchdog_interval(), Some(Duration::from_secs(60)));
        assert_eq!(config.emulator.log_level.as_deref(), Some("debug"));
        assert_eq!(config.machine.first_ram_address, 0x0800);
        assert_eq!(config.machine.clock_report_cycles, 5000);
        assert_eq!(config.machine.halt_banner_delay_ms, 50);
        assert_eq!(config.machine.mode, BoardMode::Tty);
    }

    #[test]
    fn empty_config_takes_defaults() {
        let config = read_config("").unwrap();
        assert_eq!(config.emulator.rom, None);
        assert_eq!(config.emulator.program_address, DEFAULT_PROGRAM_ADDRESS);
        assert_eq!(config.emulator.watchdog_interval(), Some(Duration::from_secs(300)));
        assert_eq!(config.machine, MachineConfig::default());
    }

    #[test]
    fn watchdog_can_be_disabled() {
        let config = read_config("[emulator]\nwatchdog_interval = 0.0\n").unwrap();
        assert_eq!(config.emulator.watchdog_interval(), None);
        let config = read_config("[emulator]\nwatchdog_interval = -3.0\n").unwrap();
        assert_eq!(config.emulator.watchdog_interval(), None);
    }

    #[test]
    fn bad_config_is_an_error() {
        assert!(read_config("[machine]\nmode = \"printer\"\n").is_err());
        assert!(read_config("[machine]\nfirst_ram_address = 70000\n").is_err());
    }

    #[test]
    fn hex_addresses() {
        assert_eq!(parse_hex_u16("2000").unwrap(), 0x2000);
        assert_eq!(parse_hex_u16("0x20C0").unwrap(), 0x20C0);
        assert_eq!(parse_hex_u16("4000h").unwrap(), 0x4000);
        assert!(parse_hex_u16("0x").is_err());
        assert!(parse_hex_u16("10000").is_err());
        assert!(parse_hex_u16("zz").is_err());
    }

    #[test]
    fn missing_file_reports_path() {
        let err = read_config_path(Path::new("/nonexistent/sdk85.toml")).unwrap_err();
        assert!(format!("{:#}", err).contains("/nonexistent/sdk85.toml"));
    }

    #[test]
    fn config_file_round() {
        let path = std::env::temp_dir().join(format!("sdk85_config_test_{}.toml", std::process::id()));
        std::fs::write(&path, FULL_CONFIG).unwrap();
        let config = read_config_path(&path).unwrap();
        std::fs::remove_file(&path).ok();
        assert_eq!(config.machine.mode, BoardMode::Tty);
    }

    #[cfg(feature = "use_bpaf")]
    #[test]
    fn command_line_overrides_file() {
        let mut config = read_config(FULL_CONFIG).unwrap();
        config
            .overlay(CmdLineArgs {
                program_address: Some("0x4800".to_string()),
                mode: Some(BoardMode::Keypad),
                watchdog_interval: Some(0.0),
                ..Default::default()
            })
            .unwrap();

        assert_eq!(config.emulator.program_address, 0x4800);
        assert_eq!(config.machine.mode, BoardMode::Keypad);
        assert_eq!(config.emulator.watchdog_interval(), None);
        // Untouched settings keep their file values.
        assert_eq!(config.emulator.rom, Some(PathBuf::from("roms/monitor.bin")));
        assert_eq!(config.machine.clock_report_cycles, 5000);
    }

    #[cfg(feature = "use_bpaf")]
    #[test]
    fn bad_address_argument_is_an_error() {
        let mut config = ConfigFileParams::default();
        let result = config.overlay(CmdLineArgs {
            program_address: Some("wxyz".to_string()),
            ..Default::default()
        });
        assert!(result.is_err());
    }
}
