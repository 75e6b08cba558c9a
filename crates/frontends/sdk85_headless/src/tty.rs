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

    tty.rs

*/

//! Teletype input. The monitor only understands upper case, so lower-case
//! letters are folded before they reach the SID line. Anything outside
//! 7-bit ASCII is dropped.

use std::collections::VecDeque;

use sdk85_core::devices::timer_io::{TimerIo, SERIAL_LINE_BIT};

/// The byte put on the line for `c`, if it can be sent at all.
pub fn tty_byte(c: char) -> Option<u8> {
    match c {
        '\n' => Some(b'\r'),
        c if c.is_ascii() => Some(c.to_ascii_uppercase() as u8),
        _ => None,
    }
}

/// Characters waiting for the SID line.
#[derive(Debug, Default)]
pub struct TtyInput {
    pending: VecDeque<u8>,
}

impl TtyInput {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_str(&mut self, s: &str) -> usize {
        let before = self.pending.len();
        self.pending.extend(s.chars().filter_map(tty_byte));
        self.pending.len() - before
    }

    pub fn push(&mut self, c: char) -> bool {
        match tty_byte(c) {
            Some(byte) => {
                self.pending.push_back(byte);
                true
            }
            None => {
                log::debug!("TTY: dropped unsendable character {:?}", c);
                false
            }
        }
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    pub fn clear(&mut self) {
        self.pending.clear();
    }

    /// Put the next character on the line once the previous one has been
    /// shifted out. A fully read character leaves the line idle (high), and
    /// ASCII never has bit 7 set, so a low bit 7 means a character is still
    /// in flight. Returns the byte sent.
    pub fn feed(&mut self, timer_io: &TimerIo) -> Option<u8> {
        if !timer_io.tty_connected() || timer_io.serial_input() & SERIAL_LINE_BIT == 0 {
            return None;
        }
        let byte = self.pending.pop_front()?;
        timer_io.set_serial_input(byte);
        log::trace!("TTY: sent {:02X}", byte);
        Some(byte)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sdk85_core::{
        bus::IoDevice,
        channel::EventPublisher,
        devices::timer_io::TIC_SERIAL_PORT,
    };

    fn connected() -> TimerIo {
        let tic = TimerIo::new(EventPublisher::detached());
        tic.set_serial_input(SERIAL_LINE_BIT);
        tic.set_tty_connected(true);
        tic
    }

    #[test]
    fn letters_fold_to_upper_case() {
        assert_eq!(tty_byte('a'), Some(b'A'));
        assert_eq!(tty_byte('z'), Some(b'Z'));
        assert_eq!(tty_byte('G'), Some(b'G'));
        assert_eq!(tty_byte('5'), Some(b'5'));
        assert_eq!(tty_byte('{'), Some(b'{'));
        assert_eq!(tty_byte('\n'), Some(b'\r'));
        assert_eq!(tty_byte('é'), None);
    }

    #[test]
    fn one_character_in_flight() {
        let tic = connected();
        let mut input = TtyInput::new();
        assert_eq!(input.push_str("dx"), 2);

        assert_eq!(input.feed(&tic), Some(b'D'));
        assert_eq!(tic.serial_input(), b'D');
        // Still shifting out 'D'.
        assert_eq!(input.feed(&tic), None);

        for _ in 0..8 {
            tic.read_u8(TIC_SERIAL_PORT);
        }
        assert_eq!(input.feed(&tic), Some(b'X'));
        assert!(input.is_empty());
    }

    #[test]
    fn nothing_sent_without_terminal() {
        let tic = TimerIo::new(EventPublisher::detached());
        let mut input = TtyInput::new();
        input.push('a');
        assert_eq!(input.feed(&tic), None);
        assert_eq!(input.len(), 1);
    }
}
