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

    bus::memory.rs

    Memory routines for [BusInterface]: image placement and byte access.

*/

use crate::{
    bus::{BusInterface, IoDevice, IoDeviceType, ADDRESS_SPACE},
    devices::kdc::KDC_BLOCK_SIZE,
    memerror::MemoryError,
};

impl BusInterface {
    pub fn first_ram_address(&self) -> u16 {
        self.first_ram_address
    }

    /// Place the monitor ROM at address 0. It must end below the first RAM address.
    pub fn load_rom(&mut self, rom: &[u8]) -> Result<(), MemoryError> {
        if rom.len() > self.first_ram_address as usize {
            log::warn!("ROM image of {} bytes rejected", rom.len());
            return Err(MemoryError::RomTooLarge {
                len: rom.len(),
                first_ram: self.first_ram_address,
            });
        }
        // The controller window hides whatever ROM lies beneath it.
        self.check_reserved(rom.len(), 0).inspect_err(|e| {
            log::warn!("ROM image rejected: {}", e);
        })?;
        self.memory[..rom.len()].copy_from_slice(rom);
        log::debug!("Loaded {} byte ROM image", rom.len());
        Ok(())
    }

    /// Copy a program image into RAM at `address`.
    pub fn load_image(&mut self, image: &[u8], address: u16) -> Result<(), MemoryError> {
        self.check_image(image.len(), address).inspect_err(|e| {
            log::warn!("Image rejected: {}", e);
        })?;

        let start = address as usize;
        self.memory[start..start + image.len()].copy_from_slice(image);
        log::debug!("Loaded {} byte image at {:04X}", image.len(), address);
        Ok(())
    }

    fn check_image(&self, len: usize, address: u16) -> Result<(), MemoryError> {
        let start = address as usize;
        if start + len > ADDRESS_SPACE {
            return Err(MemoryError::ImageTooLarge { address, len });
        }
        if address < self.first_ram_address {
            return Err(MemoryError::OutsideRam {
                address,
                first_ram: self.first_ram_address,
            });
        }

        self.check_reserved(len, address)
    }

    fn check_reserved(&self, len: usize, address: u16) -> Result<(), MemoryError> {
        let start = address as usize;
        let base = self.kdc.base() as usize;
        let window = base..base + KDC_BLOCK_SIZE as usize;
        if len > 0 && start < window.end && window.start < start + len {
            return Err(MemoryError::OverlapsReserved {
                address,
                len,
                base: self.kdc.base(),
            });
        }
        Ok(())
    }

    /// Read a byte from memory space, including memory mapped devices.
    pub fn read_u8(&self, address: u16) -> u8 {
        match self.mmio_device(address) {
            Some(IoDeviceType::Kdc) => {
                let byte = self.kdc.read_u8(address);
                log::trace!("MMIO read {:04X}: {:02X}", address, byte);
                byte
            }
            _ => self.memory[address as usize],
        }
    }

    /// Write a byte to memory space. Writes into ROM are dropped.
    pub fn write_u8(&mut self, address: u16, data: u8) {
        match self.mmio_device(address) {
            Some(IoDeviceType::Kdc) => {
                log::trace!("MMIO write {:04X}: {:02X}", address, data);
                self.kdc.write_u8(address, data);
            }
            _ if address < self.first_ram_address => {
                log::trace!("Write to ROM at {:04X} ignored", address);
            }
            _ => self.memory[address as usize] = data,
        }
    }

    pub fn read_u16(&self, address: u16) -> u16 {
        self.read_u8(address) as u16 | (self.read_u8(address.wrapping_add(1)) as u16) << 8
    }

    pub fn write_u16(&mut self, address: u16, data: u16) {
        self.write_u8(address, data as u8);
        self.write_u8(address.wrapping_add(1), (data >> 8) as u8);
    }

    /// Raw view of the memory image, bypassing memory mapped devices.
    pub fn peek_range(&self, address: u16, len: usize) -> Option<&[u8]> {
        let start = address as usize;
        self.memory.get(start..start.checked_add(len)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        bus::tests::test_bus,
        channel::EventPublisher,
        devices::{
            kdc::{Kdc, KDC_CMD_WRITE_ADDRESS_FIELD, KDC_DEFAULT_BASE},
            timer_io::TimerIo,
        },
    };
    use std::sync::Arc;

    #[test]
    fn rom_loads_at_zero() {
        let mut bus = test_bus();
        bus.load_rom(&[0x3E, 0x12, 0x76]).unwrap();
        assert_eq!(bus.peek_range(0, 3), Some(&[0x3E, 0x12, 0x76][..]));
        assert_eq!(bus.read_u16(0), 0x123E);
    }

    #[test]
    fn rom_must_end_below_ram() {
        let mut bus = test_bus();
        assert!(bus.load_rom(&vec![0; 0x1000]).is_ok());
        assert_eq!(
            bus.load_rom(&vec![0; 0x1001]),
            Err(MemoryError::RomTooLarge {
                len: 0x1001,
                first_ram: 0x1000
            })
        );
    }

    #[test]
    fn rom_must_not_reach_controller_window() {
        let kdc = Arc::new(Kdc::new(KDC_DEFAULT_BASE, EventPublisher::detached()));
        let timer_io = Arc::new(TimerIo::new(EventPublisher::detached()));
        let mut bus = BusInterface::new(0x2000, kdc, timer_io);

        assert!(bus.load_rom(&vec![0x11; 0x1800]).is_ok());
        let mut rom = vec![0x22; 0x1A00];
        rom[0x1800] = 0xAA;
        assert_eq!(
            bus.load_rom(&rom),
            Err(MemoryError::OverlapsReserved {
                address: 0x0000,
                len: 0x1A00,
                base: 0x1800
            })
        );
        // Rejected before anything was copied.
        assert_eq!(bus.peek_range(0x17FF, 1), Some(&[0x11][..]));
        assert_eq!(bus.peek_range(0x1800, 1), Some(&[0x00][..]));
    }

    #[test]
    fn image_placement_errors() {
        let mut bus = test_bus();
        assert_eq!(
            bus.load_image(&[0; 0x20], 0xFFF0),
            Err(MemoryError::ImageTooLarge {
                address: 0xFFF0,
                len: 0x20
            })
        );
        assert_eq!(
            bus.load_image(&[0; 4], 0x0800),
            Err(MemoryError::OutsideRam {
                address: 0x0800,
                first_ram: 0x1000
            })
        );
        assert_eq!(
            bus.load_image(&[0; 0x10], 0x17F8),
            Err(MemoryError::OverlapsReserved {
                address: 0x17F8,
                len: 0x10,
                base: 0x1800
            })
        );
        assert!(bus.load_image(&[0; 0x10], 0x19F8).is_err());
        assert!(bus.load_image(&[0; 0x08], 0x17F8).is_ok());
        assert!(bus.load_image(&[0xAA; 0x10], 0xFFF0).is_ok());
        assert!(bus.load_image(&[], 0x1800).is_ok());
    }

    #[test]
    fn rom_is_read_only() {
        let mut bus = test_bus();
        bus.load_rom(&[0x11]).unwrap();
        bus.write_u8(0x0000, 0x22);
        bus.write_u8(0x0FFF, 0x33);
        assert_eq!(bus.read_u8(0x0000), 0x11);
        assert_eq!(bus.read_u8(0x0FFF), 0x00);

        bus.write_u16(0x2000, 0xBEEF);
        assert_eq!(bus.read_u8(0x2000), 0xEF);
        assert_eq!(bus.read_u16(0x2000), 0xBEEF);
    }

    #[test]
    fn kdc_window_reaches_controller() {
        let mut bus = test_bus();
        bus.write_u8(0x1900, KDC_CMD_WRITE_ADDRESS_FIELD);
        bus.write_u8(0x1800, 0x98);
        assert_eq!(bus.kdc().latches().address[0], 0x76);
        // The window never touches backing memory.
        assert_eq!(bus.peek_range(0x1800, 1), Some(&[0x00][..]));

        bus.kdc().enqueue_key(0x12);
        assert_eq!(bus.read_u8(0x1800), 0x12);
        assert_eq!(bus.read_u8(0x1800), 0x00);
        assert_eq!(bus.read_u8(0x1900), 0x00);
    }
}
