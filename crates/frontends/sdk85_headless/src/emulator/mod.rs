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

    emulator::mod.rs

    Definition of the [Emulator] session: the machine plus everything the
    frontend keeps between commands (mirrored display, teletype transcript,
    pending teletype input, idle watchdog).

*/

use std::time::Duration;

use colored::*;
use sdk85_core::{
    devices::{
        kdc::DisplayLatches,
        seven_segment::{to_char, SEGMENT_DP},
    },
    machine_types::{BoardMode, MachineEvent, MachineState},
    Machine,
    MachineError,
};

use crate::{
    keypad::{KeyAction, KeypadKey},
    tty::TtyInput,
    watchdog::Watchdog,
};

/// Define flags to be used by the session.
#[derive(Copy, Clone, Debug, Default)]
pub struct EmuFlags {
    /// Print every display change as it happens.
    pub echo_display: bool,
    /// Print teletype output as it happens.
    pub echo_tty: bool,
}

/// All state the command loop works on. Members are public so the loop can
/// reach into it freely.
pub struct Emulator {
    pub machine: Machine,
    pub display: DisplayLatches,
    pub transcript: String,
    pub clock_rate: Option<f64>,
    pub tty_input: TtyInput,
    pub watchdog: Watchdog,
    pub paused: bool,
    pub flags: EmuFlags,
}

impl Emulator {
    pub fn new(machine: Machine, watchdog_interval: Option<Duration>) -> Self {
        let display = machine.devices().kdc.latches();
        Self {
            machine,
            display,
            transcript: String::new(),
            clock_rate: None,
            tty_input: TtyInput::new(),
            watchdog: Watchdog::new(watchdog_interval),
            paused: false,
            flags: EmuFlags::default(),
        }
    }

    /// Power on: reset the board and start the driver.
    pub fn start(&mut self) -> Result<(), MachineError> {
        self.watchdog.restart();
        self.machine.reset()
    }

    pub fn state(&self) -> MachineState {
        self.machine.state()
    }

    pub fn board_mode(&self) -> BoardMode {
        self.machine.config().mode
    }

    /// Drain the machine's events into the session, feed the teletype line
    /// and check the watchdog. Returns the events seen, for the caller to echo.
    pub fn pump_events(&mut self) -> Vec<MachineEvent> {
        let events = self.machine.events().drain();
        for event in &events {
            match *event {
                MachineEvent::Display(latches) => self.display = latches,
                MachineEvent::SerialOut(c) => self.transcript.push(c),
                MachineEvent::ClockRate(hz) => self.clock_rate = Some(hz),
                MachineEvent::Halted => {
                    log::debug!("Session: CPU halted");
                }
            }
        }

        self.tty_input.feed(&self.machine.devices().timer_io);

        if self.watchdog.poll() && !self.paused {
            self.pause();
        }
        events
    }

    /// Stop the driver until the next interaction.
    pub fn pause(&mut self) {
        match self.machine.cancel() {
            Ok(()) => {
                log::info!("Session: idle, pausing emulation");
                self.paused = true;
            }
            Err(e) => log::error!("Session: failed to pause: {}", e),
        }
    }

    /// Note user activity: restart the watchdog and resume a paused machine.
    fn interact(&mut self) -> Result<(), MachineError> {
        self.watchdog.restart();
        if self.paused {
            log::info!("Session: resuming emulation");
            self.paused = false;
            self.machine.resume()?;
        }
        Ok(())
    }

    /// Press a key on the hex keypad.
    pub fn press_key(&mut self, key: KeypadKey) -> Result<(), MachineError> {
        self.interact()?;
        log::debug!("Session: key {}", key);
        match key.action() {
            KeyAction::Reset => self.reset(),
            KeyAction::Interrupt { vector, key } => {
                let devices = self.machine.devices();
                if let Some(code) = key {
                    devices.kdc.enqueue_key(code);
                }
                devices.timer_io.set_vector(vector);
                devices.timer_io.raise_int();
                self.wake()
            }
        }
    }

    /// An interrupt is the only way out of HLT. If the driver has stopped on
    /// a halt, restart it so the CPU can take the interrupt. The driver may
    /// still be putting up the banner; cancel waits for it.
    fn wake(&mut self) -> Result<(), MachineError> {
        if self.machine.state() == MachineState::Halted {
            self.machine.cancel()?;
            self.machine.resume()?;
        }
        Ok(())
    }

    /// Queue teletype input. Returns the number of characters accepted.
    pub fn type_str(&mut self, s: &str) -> Result<usize, MachineError> {
        self.interact()?;
        let accepted = self.tty_input.push_str(s);
        self.tty_input.feed(&self.machine.devices().timer_io);
        Ok(accepted)
    }

    pub fn reset(&mut self) -> Result<(), MachineError> {
        self.watchdog.restart();
        self.paused = false;
        self.tty_input.clear();
        self.machine.reset()
    }

    pub fn set_board_mode(&mut self, mode: BoardMode) -> Result<(), MachineError> {
        self.watchdog.restart();
        self.paused = false;
        self.tty_input.clear();
        self.machine.set_board_mode(mode)
    }

    pub fn load_program(&mut self, image: &[u8], address: u16) -> Result<(), MachineError> {
        self.watchdog.restart();
        let result = self.machine.load_image(image, address);
        if result.is_ok() {
            self.paused = false;
            self.tty_input.clear();
        }
        result
    }

    pub fn display_text(&self) -> String {
        display_text(&self.display)
    }

    pub fn render_display(&self) -> String {
        render_latches(&self.display)
    }

    pub fn status_line(&self) -> String {
        let state = match (self.paused, self.machine.state()) {
            (true, _) => "paused".yellow(),
            (false, MachineState::Running) => "running".green(),
            (false, MachineState::Halted) => "halted".red(),
            (false, state) => format!("{:?}", state).to_lowercase().normal(),
        };
        let clock = match self.clock_rate {
            Some(hz) => format!("{:.3} MHz", hz / 1_000_000.0),
            None => "--".to_string(),
        };
        format!(
            "{} {} mode: {:?} clock: {}",
            self.render_display(),
            state,
            self.board_mode(),
            clock
        )
    }
}

/// The six digits as plain text, with a space between the address and data
/// fields.
pub fn display_text(latches: &DisplayLatches) -> String {
    let mut text: String = latches.address.iter().map(|g| digit_text(*g)).collect();
    text.push(' ');
    text.extend(latches.data.iter().map(|g| digit_text(*g)));
    text
}

/// The display as a terminal would show it, lit segments in red.
pub fn render_latches(latches: &DisplayLatches) -> String {
    format!("[{}]", display_text(latches).bright_red().bold())
}

fn digit_text(glyph: u8) -> String {
    let mut s = to_char(glyph).to_string();
    if glyph & SEGMENT_DP != 0 {
        s.push('.');
    }
    s
}
