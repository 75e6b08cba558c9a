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

    machine_types.rs

    Types shared between the machine, its devices and the frontends.

*/

use std::{str::FromStr, time::Duration};

use serde::Deserialize;

use crate::devices::kdc::DisplayLatches;

/// Reference address of the first writable byte. Everything below is ROM.
pub const DEFAULT_FIRST_RAM_ADDRESS: u16 = 0x1000;
/// Cycles between two clock rate estimates.
pub const DEFAULT_CLOCK_REPORT_CYCLES: u64 = 10_000;
/// About two frames at 60Hz.
pub const DEFAULT_HALT_BANNER_DELAY_MS: u64 = 33;

const fn _default_first_ram_address() -> u16 {
    DEFAULT_FIRST_RAM_ADDRESS
}
const fn _default_clock_report_cycles() -> u64 {
    DEFAULT_CLOCK_REPORT_CYCLES
}
const fn _default_halt_banner_delay_ms() -> u64 {
    DEFAULT_HALT_BANNER_DELAY_MS
}

/// Which console the monitor firmware should talk to. The firmware samples
/// the SID line after reset: a line held high selects the teletype.
#[derive(Copy, Clone, Debug, Default, Deserialize, PartialEq, Eq)]
pub enum BoardMode {
    #[default]
    #[serde(alias = "keypad", alias = "pcb")]
    Keypad,
    #[serde(alias = "tty")]
    Tty,
}

impl FromStr for BoardMode {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, String>
    where
        Self: Sized,
    {
        match s.to_lowercase().as_str() {
            "keypad" | "pcb" => Ok(BoardMode::Keypad),
            "tty" => Ok(BoardMode::Tty),
            _ => Err("Bad value for BoardMode".to_string()),
        }
    }
}

#[derive(Copy, Clone, Debug, Deserialize, PartialEq)]
pub struct MachineConfig {
    #[serde(default = "_default_first_ram_address")]
    pub first_ram_address: u16,
    #[serde(default = "_default_clock_report_cycles")]
    pub clock_report_cycles: u64,
    #[serde(default = "_default_halt_banner_delay_ms")]
    pub halt_banner_delay_ms: u64,
    #[serde(default)]
    pub mode: BoardMode,
}

impl Default for MachineConfig {
    fn default() -> Self {
        Self {
            first_ram_address: DEFAULT_FIRST_RAM_ADDRESS,
            clock_report_cycles: DEFAULT_CLOCK_REPORT_CYCLES,
            halt_banner_delay_ms: DEFAULT_HALT_BANNER_DELAY_MS,
            mode: BoardMode::Keypad,
        }
    }
}

impl MachineConfig {
    pub fn halt_banner_delay(&self) -> Duration {
        Duration::from_millis(self.halt_banner_delay_ms)
    }
}

/// Execution state of the driver.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum MachineState {
    /// Constructed, never run, or stopped for a mutation.
    Stopped,
    Running,
    Halted,
    Cancelled,
}

/// Everything the board reports to an observer.
#[derive(Copy, Clone, Debug, PartialEq)]
pub enum MachineEvent {
    /// The display latches changed. Carries the full new set.
    Display(DisplayLatches),
    /// A character was shifted out of the SOD line.
    SerialOut(char),
    /// Estimated CPU clock in Hz.
    ClockRate(f64),
    /// The CPU halted and the idle banner is up.
    Halted,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn board_mode_from_str() {
        assert_eq!("TTY".parse::<BoardMode>(), Ok(BoardMode::Tty));
        assert_eq!("pcb".parse::<BoardMode>(), Ok(BoardMode::Keypad));
        assert!("serial".parse::<BoardMode>().is_err());
    }

    #[test]
    fn default_delay_is_two_frames() {
        let config = MachineConfig::default();
        assert_eq!(config.halt_banner_delay(), Duration::from_millis(33));
    }
}
