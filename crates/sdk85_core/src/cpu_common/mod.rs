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

    cpu_common::mod.rs

    The interface the execution driver needs from a CPU. The instruction
    decoder and executor live outside this crate; anything that can step
    one instruction against a [BusInterface] can drive the board.

*/

use crate::bus::BusInterface;

pub trait Cpu: Send + 'static {
    /// Execute one instruction, servicing any interrupt the bus reports
    /// pending beforehand. Returns the number of clock cycles consumed.
    fn step(&mut self) -> u32;

    /// Return to the power-on state and resume fetching at address 0.
    fn reset(&mut self);

    fn is_halted(&self) -> bool;

    /// Consume a reset request the CPU raised on its own (for instance from
    /// a RESET OUT line). The default CPU never requests one.
    fn take_reset_request(&mut self) -> bool {
        false
    }

    fn bus(&self) -> &BusInterface;

    fn bus_mut(&mut self) -> &mut BusInterface;
}
