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

    devices::kdc.rs

    Implementation of the keyboard/display controller (an 8279 as wired on
    the trainer). Only the two commands the monitor firmware issues are
    modeled: "write address field" and "write data field". Scanned keys are
    not modeled either; the keypad frontend pushes decoded key codes into
    the FIFO directly.

    The controller is memory mapped. It occupies a 512 byte block: the data
    register answers at offset 0x000 and the control register at 0x100.

*/

use std::sync::{Mutex, MutexGuard};

use crate::{
    bus::IoDevice,
    channel::EventPublisher,
    devices::{
        key_queue::KeyQueue,
        seven_segment::{decode_latch, glyph, glyph_with_dp},
    },
    machine_types::MachineEvent,
};

pub const KDC_DEFAULT_BASE: u16 = 0x1800;
pub const KDC_BLOCK_SIZE: u16 = 0x200;
pub const KDC_DATA_OFFSET: u16 = 0x000;
pub const KDC_CONTROL_OFFSET: u16 = 0x100;

pub const KDC_CMD_IDLE: u8 = 0x08;
pub const KDC_CMD_WRITE_ADDRESS_FIELD: u8 = 0x90;
pub const KDC_CMD_WRITE_DATA_FIELD: u8 = 0x94;

pub const ADDRESS_FIELD_LEN: usize = 4;
pub const DATA_FIELD_LEN: usize = 2;

/// The six digit latches. `address` holds the four left digits, `data` the
/// two right digits.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct DisplayLatches {
    pub address: [u8; ADDRESS_FIELD_LEN],
    pub data: [u8; DATA_FIELD_LEN],
}

impl DisplayLatches {
    /// What the board shows on power-up, before the monitor writes anything.
    pub fn power_on() -> Self {
        Self {
            address: [glyph('H'), glyph('A'), glyph('L'), glyph_with_dp('t')],
            data: [0x00, 0x00],
        }
    }

    /// What the board shows once the CPU has halted.
    pub fn idle_banner() -> Self {
        Self {
            address: [glyph('H'), glyph('A'), glyph('L'), glyph_with_dp('t')],
            data: [glyph('7'), glyph('6')],
        }
    }
}

#[derive(Debug)]
struct ControlRegister {
    command: u8,
    // 1-based position of the next digit to be written.
    field: usize,
}

impl Default for ControlRegister {
    fn default() -> Self {
        Self {
            command: KDC_CMD_IDLE,
            field: 1,
        }
    }
}

#[derive(Debug)]
struct KdcState {
    control: ControlRegister,
    latches: DisplayLatches,
}

pub struct Kdc {
    base: u16,
    keys: KeyQueue,
    state: Mutex<KdcState>,
    events: EventPublisher<MachineEvent>,
}

impl Kdc {
    pub fn new(base: u16, events: EventPublisher<MachineEvent>) -> Self {
        Self {
            base,
            keys: KeyQueue::new(),
            state: Mutex::new(KdcState {
                control: ControlRegister::default(),
                latches: DisplayLatches::power_on(),
            }),
            events,
        }
    }

    pub fn base(&self) -> u16 {
        self.base
    }

    /// True if `address` falls into this controller's 512 byte block.
    pub fn decodes(&self, address: u16) -> bool {
        address.wrapping_sub(self.base) < KDC_BLOCK_SIZE
    }

    /// Clear pending keys and return the command register to idle.
    /// The display latches keep whatever they showed.
    pub fn reset(&self) {
        self.keys.clear();
        self.lock().control = ControlRegister::default();
        log::debug!("KDC: reset");
    }

    pub fn key_queue(&self) -> &KeyQueue {
        &self.keys
    }

    pub fn enqueue_key(&self, code: u8) {
        log::trace!("KDC: key {:02X} queued", code);
        self.keys.enqueue(code);
    }

    pub fn latches(&self) -> DisplayLatches {
        self.lock().latches
    }

    pub fn command(&self) -> u8 {
        self.lock().control.command
    }

    pub fn field_sequence(&self) -> usize {
        self.lock().control.field
    }

    /// Put the idle banner up and publish it.
    pub fn show_banner(&self) {
        let latches = DisplayLatches::idle_banner();
        self.lock().latches = latches;
        self.events.publish(MachineEvent::Display(latches));
    }

    fn data_register_read(&self) -> u8 {
        self.keys.dequeue_or_filler()
    }

    fn data_register_write(&self, data: u8) {
        let published = {
            let mut state = self.lock();
            let KdcState { control, latches } = &mut *state;

            let field: Option<&mut [u8]> = match control.command {
                KDC_CMD_WRITE_ADDRESS_FIELD => Some(&mut latches.address),
                KDC_CMD_WRITE_DATA_FIELD => Some(&mut latches.data),
                _ => None,
            };

            match field {
                Some(digits) => {
                    // The sequence counter advances even past the last digit.
                    let slot = control.field - 1;
                    control.field += 1;
                    match digits.get_mut(slot) {
                        Some(digit) => {
                            *digit = decode_latch(data);
                            Some(*latches)
                        }
                        None => {
                            log::trace!("KDC: data write {:02X} past field end ({})", data, slot + 1);
                            None
                        }
                    }
                }
                None => {
                    log::trace!("KDC: data write {:02X} ignored (command {:02X})", data, control.command);
                    None
                }
            }
        };

        if let Some(latches) = published {
            self.events.publish(MachineEvent::Display(latches));
        }
    }

    fn control_register_write(&self, data: u8) {
        let mut state = self.lock();
        state.control.command = data;
        state.control.field = 1;
        log::trace!("KDC: command {:02X}", data);
    }

    fn lock(&self) -> MutexGuard<'_, KdcState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl IoDevice for Kdc {
    fn read_u8(&self, port: u16) -> u8 {
        let byte = match port.wrapping_sub(self.base) {
            KDC_DATA_OFFSET => self.data_register_read(),
            // Status is not modeled; the monitor never polls it.
            KDC_CONTROL_OFFSET => 0,
            _ => 0,
        };
        log::trace!("KDC: IN {:04X} : {:02X}", port, byte);
        byte
    }

    fn write_u8(&self, port: u16, data: u8) {
        log::trace!("KDC: OUT {:04X} : {:02X}", port, data);
        match port.wrapping_sub(self.base) {
            KDC_DATA_OFFSET => self.data_register_write(data),
            KDC_CONTROL_OFFSET => self.control_register_write(data),
            _ => {}
        }
    }

    fn port_list(&self) -> Vec<(String, u16)> {
        vec![
            (String::from("KDC Data"), self.base + KDC_DATA_OFFSET),
            (String::from("KDC Control"), self.base + KDC_CONTROL_OFFSET),
        ]
    }
}
