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

    watchdog.rs

    Idle watchdog. The session pauses the driver once nobody has touched the
    board for a while, so an unattended emulator stops burning a core.

*/

use std::time::Duration;

use web_time::Instant;

pub struct Watchdog {
    interval: Option<Duration>,
    deadline: Option<Instant>,
    expired: bool,
}

impl Watchdog {
    /// A watchdog that expires `interval` after the last restart. `None`
    /// disables it.
    pub fn new(interval: Option<Duration>) -> Self {
        let mut watchdog = Self {
            interval,
            deadline: None,
            expired: false,
        };
        watchdog.restart_at(Instant::now());
        watchdog
    }

    pub fn interval(&self) -> Option<Duration> {
        self.interval
    }

    pub fn is_expired(&self) -> bool {
        self.expired
    }

    /// Push the deadline out by a full interval from now.
    pub fn restart(&mut self) {
        self.restart_at(Instant::now());
    }

    pub fn restart_at(&mut self, now: Instant) {
        self.deadline = self.interval.and_then(|interval| now.checked_add(interval));
        self.expired = false;
    }

    /// True exactly once, on the first poll past the deadline.
    pub fn poll(&mut self) -> bool {
        self.poll_at(Instant::now())
    }

    pub fn poll_at(&mut self, now: Instant) -> bool {
        match self.deadline {
            Some(deadline) if !self.expired && now >= deadline => {
                log::debug!("Watchdog expired after {:?}", self.interval.unwrap_or_default());
                self.expired = true;
                true
            }
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fires_once_per_interval() {
        let start = Instant::now();
        let mut watchdog = Watchdog::new(Some(Duration::from_secs(10)));
        watchdog.restart_at(start);

        assert!(!watchdog.poll_at(start + Duration::from_secs(9)));
        assert!(watchdog.poll_at(start + Duration::from_secs(10)));
        assert!(watchdog.is_expired());
        assert!(!watchdog.poll_at(start + Duration::from_secs(30)));

        watchdog.restart_at(start + Duration::from_secs(30));
        assert!(!watchdog.is_expired());
        assert!(!watchdog.poll_at(start + Duration::from_secs(39)));
        assert!(watchdog.poll_at(start + Duration::from_secs(40)));
    }

    #[test]
    fn disabled_never_fires() {
        let start = Instant::now();
        let mut watchdog = Watchdog::new(None);
        watchdog.restart_at(start);
        assert!(!watchdog.poll_at(start + Duration::from_secs(100_000)));
        assert!(!watchdog.is_expired());
    }
}
