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

    bus::io.rs

*/

//! IO routines for [BusInterface].

use crate::bus::{BusInterface, IoDevice};

impl BusInterface {
    /// Read an 8-bit value from an IO port.
    pub fn io_read_u8(&self, port: u16) -> u8 {
        let device = self.io_device(port);
        let byte = self.device(device).read_u8(port);
        log::trace!("IN {:04X} ({:?}): {:02X}", port, device, byte);
        byte
    }

    /// Write an 8-bit value to an IO port.
    pub fn io_write_u8(&self, port: u16, data: u8) {
        let device = self.io_device(port);
        log::trace!("OUT {:04X} ({:?}): {:02X}", port, device, data);
        self.device(device).write_u8(port, data);
    }

    /// Every port serviced on the bus, for debug displays.
    pub fn dump_io_ports(&self) -> Vec<(String, u16)> {
        let mut ports = self.timer_io.port_list();
        ports.sort_by_key(|(_, port)| *port);
        ports
    }
}

#[cfg(test)]
mod tests {
    use crate::{
        bus::tests::test_bus,
        devices::timer_io::{TimerState, SOD_ENABLE, TIC_COMMAND_PORT, TIC_SERIAL_PORT, TIC_TIMER_LOW_PORT},
    };

    #[test]
    fn io_reaches_timer_io() {
        let bus = test_bus();
        bus.io_write_u8(TIC_TIMER_LOW_PORT, 0x40);
        bus.io_write_u8(TIC_COMMAND_PORT, 0xC0);
        let timer = bus.timer_io().timer();
        assert_eq!(timer.period(), 0x40);
        assert_eq!(timer.state(), TimerState::Started);
    }

    #[test]
    fn io_serial_round() {
        let bus = test_bus();
        for _ in 0..8 {
            bus.io_write_u8(TIC_SERIAL_PORT, SOD_ENABLE);
        }
        assert_eq!(bus.timer_io().transcript().chars().count(), 1);
        assert_eq!(bus.io_read_u8(TIC_SERIAL_PORT), 0x00);
        assert_eq!(bus.io_read_u8(0x0033), 0x00);
    }

    #[test]
    fn port_dump_is_sorted() {
        let bus = test_bus();
        let ports: Vec<u16> = bus.dump_io_ports().into_iter().map(|(_, p)| p).collect();
        assert_eq!(ports, vec![0x20, 0x24, 0x25, 0xFF]);
    }
}
