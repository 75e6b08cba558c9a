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

    devices::timer_io.rs

    Implementation of the timer/interrupt/serial controller. This combines
    the 14-bit timer of the trainer's RAM-I/O-timer chip, the interrupt
    request latches the CPU polls between instructions, and the SID/SOD
    serial line the monitor bit-bangs to drive a teletype.

    The controller sits in I/O space and decodes only the low byte of the
    port address:

        0x20  command (timer mode in the top two bits)
        0x24  timer period, bits 0-7
        0x25  timer period, bits 8-13
        0xFF  serial line (SID on read, SOD on write)

*/

use std::sync::{Mutex, MutexGuard};

use modular_bitfield::prelude::*;

use crate::{bus::IoDevice, channel::EventPublisher, interrupt::InterruptLatches, machine_types::MachineEvent};

pub const TIC_COMMAND_PORT: u16 = 0x20;
pub const TIC_TIMER_LOW_PORT: u16 = 0x24;
pub const TIC_TIMER_HIGH_PORT: u16 = 0x25;
pub const TIC_SERIAL_PORT: u16 = 0xFF;

const TIC_PORT_MASK: u16 = 0x00FF;
const TIMER_HIGH_MASK: u8 = 0x3F;

/// Serial output enable. SOD writes without it are ignored.
pub const SOD_ENABLE: u8 = 0x40;
/// The serial line itself rides in the top bit on both SID and SOD.
pub const SERIAL_LINE_BIT: u8 = 0x80;

#[derive(Debug, PartialEq, BitfieldSpecifier)]
enum TimerCommandMode {
    NoChange,
    Abort,
    StopAfterCount,
    Start,
}

#[bitfield]
struct TimerCommand {
    // Port direction bits of the command register. Not modeled.
    #[skip]
    unused: B6,
    mode: TimerCommandMode,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum TimerState {
    Started,
    Pending,
    Stopped,
    Abort,
}

/// The 14-bit down counter. `count` only means something while the timer is
/// started or pending.
#[derive(Clone, Debug)]
pub struct Timer {
    period: u16,
    count: u16,
    state: TimerState,
}

impl Default for Timer {
    fn default() -> Self {
        Self {
            period: 0,
            count: 0,
            state: TimerState::Abort,
        }
    }
}

impl Timer {
    pub fn period(&self) -> u16 {
        self.period
    }

    pub fn count(&self) -> u16 {
        self.count
    }

    pub fn state(&self) -> TimerState {
        self.state
    }

    /// Apply a command byte. Only the top two bits matter.
    pub fn command(&mut self, byte: u8) {
        let command = TimerCommand::from_bytes([byte]);
        match command.mode() {
            TimerCommandMode::NoChange => {}
            TimerCommandMode::Abort => self.state = TimerState::Abort,
            TimerCommandMode::StopAfterCount => self.state = TimerState::Pending,
            TimerCommandMode::Start => {
                self.count = self.period;
                self.state = TimerState::Started;
            }
        }
        log::debug!("Timer: command {:02X} -> {:?} (period {})", byte, self.state, self.period);
    }

    pub fn load_low(&mut self, byte: u8) {
        self.period = (self.period & 0xFF00) | byte as u16;
    }

    pub fn load_high(&mut self, byte: u8) {
        self.period = (self.period & 0x00FF) | (((byte & TIMER_HIGH_MASK) as u16) << 8);
    }

    /// Count down by up to `units` input pulses. Returns true if the count
    /// ran out. Counting stops at the first terminal count, so a single call
    /// reports at most one elapsed period regardless of `units`.
    pub fn tick(&mut self, units: u32) -> bool {
        if !matches!(self.state, TimerState::Started | TimerState::Pending) {
            return false;
        }

        // A zero count runs out on the very first pulse.
        let remaining = self.count.max(1) as u32;
        if units < remaining {
            self.count -= units as u16;
            return false;
        }

        match self.state {
            TimerState::Started => self.count = self.period,
            _ => {
                self.count = 0;
                self.state = TimerState::Stopped;
            }
        }
        true
    }
}

#[derive(Debug, Default)]
struct SerialLine {
    sid: u8,
    sid_bits: u32,
    tty_connected: bool,
    sod: u8,
    sod_bits: u32,
    transcript: String,
}

impl SerialLine {
    fn read_sid(&mut self) -> u8 {
        if !self.tty_connected {
            // A line pulled high is a terminal being plugged in.
            if self.sid & SERIAL_LINE_BIT == 0 {
                return 0;
            }
            self.tty_connected = true;
            log::debug!("SID: terminal connected");
        }

        if self.sid & SERIAL_LINE_BIT != 0 {
            // Idle line, or stop bit.
            return SERIAL_LINE_BIT;
        }

        // Start bit first, then the data bits LSB first.
        let bit = ((((self.sid as u16) << 8) >> self.sid_bits) & SERIAL_LINE_BIT as u16) as u8;
        self.sid_bits += 1;
        if self.sid_bits == 8 {
            self.sid |= SERIAL_LINE_BIT;
            self.sid_bits = 0;
        }
        bit
    }

    fn write_sod(&mut self, data: u8) -> Option<char> {
        if data & SOD_ENABLE == 0 {
            return None;
        }
        self.sod = (self.sod | (!data & SERIAL_LINE_BIT)) >> 1;
        self.sod_bits += 1;
        if self.sod_bits < 8 {
            return None;
        }

        let c = char::from(self.sod);
        self.transcript.push(c);
        self.sod = 0;
        self.sod_bits = 0;
        Some(c)
    }
}

#[derive(Debug, Default)]
struct TimerIoState {
    timer: Timer,
    serial: SerialLine,
}

pub struct TimerIo {
    state: Mutex<TimerIoState>,
    latches: InterruptLatches,
    events: EventPublisher<MachineEvent>,
}

impl TimerIo {
    pub fn new(events: EventPublisher<MachineEvent>) -> Self {
        Self {
            state: Mutex::new(TimerIoState::default()),
            latches: InterruptLatches::default(),
            events,
        }
    }

    /// Return every register, latch and the transcript to power-on state.
    pub fn reset(&self) {
        *self.lock() = TimerIoState::default();
        self.latches.clear();
        log::debug!("TimerIo: reset");
    }

    /// Feed `cycles` input pulses to the timer. Returns true if a period elapsed.
    pub fn tick(&self, cycles: u32) -> bool {
        self.lock().timer.tick(cycles)
    }

    pub fn timer(&self) -> Timer {
        self.lock().timer.clone()
    }

    pub fn latches(&self) -> &InterruptLatches {
        &self.latches
    }

    pub fn raise_nmi(&self) {
        self.latches.nmi.raise();
    }

    pub fn take_nmi(&self) -> bool {
        self.latches.nmi.take()
    }

    pub fn raise_int(&self) {
        self.latches.int.raise();
    }

    pub fn take_int(&self) -> bool {
        self.latches.int.take()
    }

    pub fn request_reset(&self) {
        self.latches.reset.raise();
    }

    pub fn take_reset(&self) -> bool {
        self.latches.reset.take()
    }

    /// Set the byte the CPU picks up alongside INT.
    pub fn set_vector(&self, byte: u8) {
        self.latches.vector.set(byte);
    }

    pub fn take_vector(&self) -> u8 {
        self.latches.vector.take()
    }

    /// Drive the SID line with a new character (bit 7 clear) or an idle
    /// level (bit 7 set).
    pub fn set_serial_input(&self, byte: u8) {
        self.lock().serial.sid = byte;
    }

    pub fn serial_input(&self) -> u8 {
        self.lock().serial.sid
    }

    pub fn tty_connected(&self) -> bool {
        self.lock().serial.tty_connected
    }

    /// Plug or unplug the terminal without waiting for a line edge.
    pub fn set_tty_connected(&self, connected: bool) {
        let mut state = self.lock();
        state.serial.tty_connected = connected;
        state.serial.sid_bits = 0;
    }

    pub fn transcript(&self) -> String {
        self.lock().serial.transcript.clone()
    }

    fn lock(&self) -> MutexGuard<'_, TimerIoState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl IoDevice for TimerIo {
    fn read_u8(&self, port: u16) -> u8 {
        let byte = match port & TIC_PORT_MASK {
            TIC_SERIAL_PORT => self.lock().serial.read_sid(),
            _ => 0,
        };
        log::trace!("TimerIo: IN {:04X} : {:02X}", port, byte);
        byte
    }

    fn write_u8(&self, port: u16, data: u8) {
        log::trace!("TimerIo: OUT {:04X} : {:02X} ({:08b})", port, data, data);
        let sent = {
            let mut state = self.lock();
            match port & TIC_PORT_MASK {
                TIC_COMMAND_PORT => {
                    state.timer.command(data);
                    None
                }
                TIC_TIMER_LOW_PORT => {
                    state.timer.load_low(data);
                    None
                }
                TIC_TIMER_HIGH_PORT => {
                    state.timer.load_high(data);
                    None
                }
                TIC_SERIAL_PORT => state.serial.write_sod(data),
                _ => None,
            }
        };

        if let Some(c) = sent {
            self.events.publish(MachineEvent::SerialOut(c));
        }
    }

    fn port_list(&self) -> Vec<(String, u16)> {
        vec![
            (String::from("Timer Command"), TIC_COMMAND_PORT),
            (String::from("Timer Period Low"), TIC_TIMER_LOW_PORT),
            (String::from("Timer Period High"), TIC_TIMER_HIGH_PORT),
            (String::from("Serial SID/SOD"), TIC_SERIAL_PORT),
        ]
    }
}
