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

    interrupt.rs

    Read-clear interrupt latches. A latch is raised by a producer (the
    execution driver, a keypad press, a port write) and consumed by exactly
    one reader: observing a raised latch clears it in the same atomic
    operation, so no event can be seen twice.

*/

use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};

/// A boolean interrupt request line with read-clear semantics.
#[derive(Debug, Default)]
pub struct ReadClearFlag(AtomicBool);

impl ReadClearFlag {
    pub const fn new() -> Self {
        Self(AtomicBool::new(false))
    }

    /// Assert the line. Raising an already raised line is not counted twice.
    #[inline]
    pub fn raise(&self) {
        self.0.store(true, Ordering::Release);
    }

    /// Return the current state of the line and clear it.
    #[inline]
    pub fn take(&self) -> bool {
        self.0.swap(false, Ordering::AcqRel)
    }

    /// Inspect the line without consuming it. Only meant for debug displays.
    #[inline]
    pub fn peek(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }

    #[inline]
    pub fn clear(&self) {
        self.0.store(false, Ordering::Release);
    }
}

/// An 8-bit payload with read-clear semantics. Reads of an empty latch return 0.
#[derive(Debug, Default)]
pub struct ReadClearByte(AtomicU8);

impl ReadClearByte {
    pub const fn new() -> Self {
        Self(AtomicU8::new(0))
    }

    #[inline]
    pub fn set(&self, byte: u8) {
        self.0.store(byte, Ordering::Release);
    }

    #[inline]
    pub fn take(&self) -> u8 {
        self.0.swap(0, Ordering::AcqRel)
    }

    #[inline]
    pub fn clear(&self) {
        self.0.store(0, Ordering::Release);
    }
}

/// The four latches owned by the timer/interrupt/serial controller.
#[derive(Debug, Default)]
pub struct InterruptLatches {
    pub nmi: ReadClearFlag,
    pub int: ReadClearFlag,
    pub reset: ReadClearFlag,
    pub vector: ReadClearByte,
}

impl InterruptLatches {
    pub fn clear(&self) {
        self.nmi.clear();
        self.int.clear();
        self.reset.clear();
        self.vector.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::{sync::Arc, thread};

    #[test]
    fn flag_read_clears() {
        let flag = ReadClearFlag::new();
        flag.raise();
        assert_eq!(flag.take(), true);
        assert_eq!(flag.take(), false);
    }

    #[test]
    fn byte_read_clears() {
        let byte = ReadClearByte::new();
        byte.set(0xEF);
        assert_eq!(byte.take(), 0xEF);
        assert_eq!(byte.take(), 0x00);
    }

    #[test]
    fn raised_flag_observed_exactly_once_across_threads() {
        let flag = Arc::new(ReadClearFlag::new());
        flag.raise();

        let readers: Vec<_> = (0..8)
            .map(|_| {
                let flag = flag.clone();
                thread::spawn(move || flag.take())
            })
            .collect();

        let seen = readers
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|observed| *observed)
            .count();
        assert_eq!(seen, 1);
    }

    #[test]
    fn latches_clear_resets_all() {
        let latches = InterruptLatches::default();
        latches.nmi.raise();
        latches.int.raise();
        latches.reset.raise();
        latches.vector.set(0xFF);
        latches.clear();
        assert!(!latches.nmi.take());
        assert!(!latches.int.take());
        assert!(!latches.reset.take());
        assert_eq!(latches.vector.take(), 0);
    }
}
