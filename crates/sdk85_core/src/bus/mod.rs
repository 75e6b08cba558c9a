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

    bus::mod.rs

    Implement the trainer's system bus. The bus owns the 64KiB memory image
    and shared handles to the two peripheral controllers, and routes every
    memory and I/O access by fixed address ranges:

        memory 0000-FFFF   RAM/ROM, except
        memory 1800-19FF   keyboard/display controller
        I/O    any port    timer/interrupt/serial controller

    Each controller then decodes its own low-order offsets.

*/

pub mod io;
pub mod memory;

use std::sync::Arc;

use crate::devices::{kdc::Kdc, timer_io::TimerIo};

pub const ADDRESS_SPACE: usize = 0x10000;

/// A device that can be accessed with IN and OUT instructions or through a
/// memory mapped window. Devices take `&self`: each one guards its own state
/// so the driver thread and the frontend can both hold a handle.
pub trait IoDevice {
    /// Read a byte from the specified port. Offsets the device does not
    /// decode read as 0.
    fn read_u8(&self, port: u16) -> u8;

    /// Write a byte to the specified port. Offsets the device does not
    /// decode are ignored.
    fn write_u8(&self, port: u16, data: u8);

    /// Return a list of ports the device should service, comprised of a vector of tuples of
    /// (port description, port number).
    fn port_list(&self) -> Vec<(String, u16)>;
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum IoDeviceType {
    Kdc,
    TimerIo,
}

pub struct BusInterface {
    memory: Vec<u8>,
    first_ram_address: u16,
    kdc: Arc<Kdc>,
    timer_io: Arc<TimerIo>,
}

impl BusInterface {
    pub fn new(first_ram_address: u16, kdc: Arc<Kdc>, timer_io: Arc<TimerIo>) -> Self {
        Self {
            memory: vec![0; ADDRESS_SPACE],
            first_ram_address,
            kdc,
            timer_io,
        }
    }

    pub fn kdc(&self) -> &Arc<Kdc> {
        &self.kdc
    }

    pub fn timer_io(&self) -> &Arc<TimerIo> {
        &self.timer_io
    }

    /// Memory mapped device at `address`, if any.
    pub fn mmio_device(&self, address: u16) -> Option<IoDeviceType> {
        if self.kdc.decodes(address) {
            Some(IoDeviceType::Kdc)
        }
        else {
            None
        }
    }

    /// Device servicing I/O `port`. The timer/interrupt/serial controller
    /// answers the whole I/O space.
    pub fn io_device(&self, _port: u16) -> IoDeviceType {
        IoDeviceType::TimerIo
    }

    pub fn device(&self, device: IoDeviceType) -> &dyn IoDevice {
        match device {
            IoDeviceType::Kdc => self.kdc.as_ref(),
            IoDeviceType::TimerIo => self.timer_io.as_ref(),
        }
    }

    /// Consume a pending non-maskable interrupt. The CPU calls this before
    /// every instruction.
    pub fn take_nmi(&self) -> bool {
        self.timer_io.take_nmi()
    }

    /// Consume a pending maskable interrupt.
    pub fn take_int(&self) -> bool {
        self.timer_io.take_int()
    }

    /// Consume the instruction byte supplied with INT.
    pub fn take_int_vector(&self) -> u8 {
        self.timer_io.take_vector()
    }
}
