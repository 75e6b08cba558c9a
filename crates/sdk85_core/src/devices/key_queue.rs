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

    devices::key_queue.rs

    FIFO of pending key codes between the keypad (any number of producers)
    and the keyboard/display controller's data register (one consumer).

*/

use std::{collections::VecDeque, sync::Mutex};

/// Value read from the data register when no key is pending.
pub const NO_KEY: u8 = 0x00;

#[derive(Debug, Default)]
pub struct KeyQueue {
    keys: Mutex<VecDeque<u8>>,
}

impl KeyQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn enqueue(&self, code: u8) {
        self.lock().push_back(code);
    }

    pub fn dequeue(&self) -> Option<u8> {
        self.lock().pop_front()
    }

    /// Dequeue a key, or [NO_KEY] if the queue is empty.
    pub fn dequeue_or_filler(&self) -> u8 {
        self.dequeue().unwrap_or(NO_KEY)
    }

    pub fn clear(&self) {
        self.lock().clear();
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, VecDeque<u8>> {
        // A panicking producer cannot leave a VecDeque in a torn state.
        self.keys.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
