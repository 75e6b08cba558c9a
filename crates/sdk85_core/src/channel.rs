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

    channel.rs

    Observation channel between the emulated board and whatever frontend is
    watching it. Devices publish through an [EventPublisher]; a frontend
    drains the paired [EventReceiver] at its own pace.

*/

use crossbeam_channel::{Receiver, Sender, TryRecvError};

/// Create a connected publisher/receiver pair.
pub fn event_channel<T>() -> (EventPublisher<T>, EventReceiver<T>) {
    let (sender, receiver) = crossbeam_channel::unbounded();
    (EventPublisher { sender }, EventReceiver { receiver })
}

/// Sending half. Publishing never blocks and never fails: an emulated device
/// must not stall because nobody is watching.
pub struct EventPublisher<T> {
    sender: Sender<T>,
}

impl<T> Clone for EventPublisher<T> {
    fn clone(&self) -> Self {
        Self {
            sender: self.sender.clone(),
        }
    }
}

impl<T> EventPublisher<T> {
    pub fn publish(&self, event: T) {
        if self.sender.send(event).is_err() {
            log::trace!("Event dropped: no receiver attached.");
        }
    }

    /// A publisher with no receiver, for devices built outside a machine.
    pub fn detached() -> Self {
        let (sender, _) = crossbeam_channel::unbounded();
        Self { sender }
    }
}

/// Receiving half.
#[derive(Clone)]
pub struct EventReceiver<T> {
    receiver: Receiver<T>,
}

impl<T> EventReceiver<T> {
    pub fn try_recv(&self) -> Option<T> {
        match self.receiver.try_recv() {
            Ok(event) => Some(event),
            Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => None,
        }
    }

    /// Blocking receive with a timeout. Returns None on timeout or disconnect.
    pub fn recv_timeout(&self, timeout: std::time::Duration) -> Option<T> {
        self.receiver.recv_timeout(timeout).ok()
    }

    /// Drain every pending event.
    pub fn drain(&self) -> Vec<T> {
        self.receiver.try_iter().collect()
    }

    pub fn receiver(&self) -> Receiver<T> {
        self.receiver.clone()
    }
}
