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

    keypad.rs

    The trainer's 24 key hex keypad. Every key but RESET and VECT INTR is
    pushed into the display controller's key FIFO and announced to the CPU
    with an RST 5 interrupt.

*/

use std::{fmt, str::FromStr};

/// RST 5 opcode, supplied with INT for ordinary keys.
pub const RST5_OPCODE: u8 = 0xEF;
/// RST 7 opcode, supplied with INT for VECT INTR.
pub const RST7_OPCODE: u8 = 0xFF;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum KeypadKey {
    Reset,
    VectIntr,
    SingleStep,
    Go,
    SubstMem,
    ExamReg,
    Next,
    Exec,
    Hex(u8),
}

/// What a key press does to the board.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum KeyAction {
    /// Full machine reset.
    Reset,
    /// Raise INT with `vector`, after queuing `key` if there is one.
    Interrupt { vector: u8, key: Option<u8> },
}

use KeypadKey::*;

/// Physical layout, top row first.
#[rustfmt::skip]
pub const KEYPAD_LAYOUT: [[KeypadKey; 6]; 4] = [
    [Reset,    VectIntr, Hex(0xC), Hex(0xD), Hex(0xE), Hex(0xF)],
    [SingleStep, Go,     Hex(0x8), Hex(0x9), Hex(0xA), Hex(0xB)],
    [SubstMem, ExamReg,  Hex(0x4), Hex(0x5), Hex(0x6), Hex(0x7)],
    [Next,     Exec,     Hex(0x0), Hex(0x1), Hex(0x2), Hex(0x3)],
];

impl KeypadKey {
    /// Scan code the monitor reads back from the key FIFO.
    pub fn code(&self) -> u8 {
        match self {
            Reset => 0xFF,
            VectIntr => 0xFE,
            SingleStep => 0x15,
            Go => 0x12,
            SubstMem => 0x13,
            ExamReg => 0x14,
            Next => 0x11,
            Exec => 0x10,
            Hex(n) => n & 0x0F,
        }
    }

    pub fn action(&self) -> KeyAction {
        match self {
            Reset => KeyAction::Reset,
            VectIntr => KeyAction::Interrupt {
                vector: RST7_OPCODE,
                key: None,
            },
            key => KeyAction::Interrupt {
                vector: RST5_OPCODE,
                key: Some(key.code()),
            },
        }
    }
}

impl fmt::Display for KeypadKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Reset => write!(f, "RESET"),
            VectIntr => write!(f, "VECT INTR"),
            SingleStep => write!(f, "SINGLE STEP"),
            Go => write!(f, "GO"),
            SubstMem => write!(f, "SUBST MEM"),
            ExamReg => write!(f, "EXAM REG"),
            Next => write!(f, "NEXT"),
            Exec => write!(f, "EXEC"),
            Hex(n) => write!(f, "{:X}", n & 0x0F),
        }
    }
}

impl FromStr for KeypadKey {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, String>
    where
        Self: Sized,
    {
        let name = s.trim().to_uppercase().replace(['_', '-'], " ");
        match name.as_str() {
            "RESET" => Ok(Reset),
            "VECT" | "VECT INTR" | "INTR" => Ok(VectIntr),
            "STEP" | "SINGLE STEP" => Ok(SingleStep),
            "GO" => Ok(Go),
            "SUBST" | "SUBST MEM" | "MEM" => Ok(SubstMem),
            "EXAM" | "EXAM REG" | "REG" => Ok(ExamReg),
            "NEXT" | "," => Ok(Next),
            "EXEC" | "." => Ok(Exec),
            hex if hex.len() == 1 => u8::from_str_radix(hex, 16)
                .map(Hex)
                .map_err(|_| format!("Unknown key: {}", s)),
            _ => Err(format!("Unknown key: {}", s)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn layout_codes() {
        let codes: Vec<Vec<u8>> = KEYPAD_LAYOUT
            .iter()
            .map(|row| row.iter().map(|k| k.code()).collect())
            .collect();
        assert_eq!(
            codes,
            vec![
                vec![0xFF, 0xFE, 0x0C, 0x0D, 0x0E, 0x0F],
                vec![0x15, 0x12, 0x08, 0x09, 0x0A, 0x0B],
                vec![0x13, 0x14, 0x04, 0x05, 0x06, 0x07],
                vec![0x11, 0x10, 0x00, 0x01, 0x02, 0x03],
            ]
        );
    }

    #[test]
    fn key_actions() {
        assert_eq!(Reset.action(), KeyAction::Reset);
        assert_eq!(
            VectIntr.action(),
            KeyAction::Interrupt {
                vector: 0xFF,
                key: None
            }
        );
        assert_eq!(
            Go.action(),
            KeyAction::Interrupt {
                vector: 0xEF,
                key: Some(0x12)
            }
        );
        assert_eq!(
            Hex(0xA).action(),
            KeyAction::Interrupt {
                vector: 0xEF,
                key: Some(0x0A)
            }
        );
    }

    #[test]
    fn key_names_parse() {
        assert_eq!("go".parse::<KeypadKey>(), Ok(Go));
        assert_eq!("subst_mem".parse::<KeypadKey>(), Ok(SubstMem));
        assert_eq!(",".parse::<KeypadKey>(), Ok(Next));
        assert_eq!("f".parse::<KeypadKey>(), Ok(Hex(0xF)));
        assert!("G".parse::<KeypadKey>().is_err());
        assert!("HALT".parse::<KeypadKey>().is_err());

        for row in KEYPAD_LAYOUT {
            for key in row {
                assert_eq!(key.to_string().parse::<KeypadKey>(), Ok(key));
            }
        }
    }
}
