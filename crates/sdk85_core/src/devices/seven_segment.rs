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

    devices::seven_segment.rs

    Seven-segment glyph helpers. Glyphs are stored in positive logic with
    segment a in bit 0 through segment g in bit 6 and the decimal point in
    bit 7 (pgfedcba). The controller receives them from the firmware
    nibble-swapped and inverted, the way the trainer's segment drivers are
    wired.

*/

pub const SEGMENT_DP: u8 = 0x80;

#[rustfmt::skip]
const ASCII_GLYPHS: [u8; 128] = [
    //    0     1     2     3     4     5     6     7     8     9     A     B     C     D     E     F
    0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, // 0
    0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, // 1
    0x00, 0x86, 0x22, 0x00, 0x6d, 0x00, 0x6f, 0x02, 0x39, 0x0f, 0x63, 0x70, 0x10, 0x40, 0x80, 0x52, // 2
    0x3f, 0x06, 0x5b, 0x4f, 0x66, 0x6d, 0x7d, 0x07, 0x7f, 0x6f, 0x09, 0x0d, 0x61, 0x48, 0x43, 0x5b, // 3
    0x5b, 0x77, 0x7c, 0x39, 0x5e, 0x79, 0x71, 0x3d, 0x76, 0x06, 0x1e, 0x00, 0x38, 0x00, 0x37, 0x3f, // 4
    0x73, 0x67, 0x50, 0x6d, 0x78, 0x3e, 0x3e, 0x00, 0x76, 0x6e, 0x5b, 0x39, 0x64, 0x0f, 0x23, 0x08, // 5
    0x02, 0x5f, 0x7c, 0x58, 0x5e, 0x7b, 0x71, 0x6f, 0x74, 0x04, 0x0e, 0x00, 0x30, 0x00, 0x54, 0x5c, // 6
    0x73, 0x67, 0x50, 0x6d, 0x78, 0x1c, 0x1c, 0x00, 0x76, 0x6e, 0x5b, 0x46, 0x06, 0x70, 0x01, 0x00, // 7
];

/// Glyph for an ASCII character, blank for anything unprintable.
pub fn glyph(c: char) -> u8 {
    if c.is_ascii() {
        ASCII_GLYPHS[c as usize]
    }
    else {
        0x00
    }
}

/// Glyph for an ASCII character with the decimal point lit.
pub fn glyph_with_dp(c: char) -> u8 {
    glyph(c) | SEGMENT_DP
}

/// Convert a byte written to the display data register into a glyph.
#[inline]
pub fn decode_latch(data: u8) -> u8 {
    !data.rotate_left(4)
}

/// Inverse of [decode_latch]: the byte firmware writes to show `glyph`.
#[inline]
pub fn encode_latch(glyph: u8) -> u8 {
    (!glyph).rotate_left(4)
}

/// Render a glyph as the closest printable character, for text frontends.
pub fn to_char(g: u8) -> char {
    let segments = g & !SEGMENT_DP;
    if segments == 0 {
        return ' ';
    }
    // Prefer digits and upper-case letters on ambiguous glyphs.
    "0123456789AbCdEFHLPUtnor-_"
        .chars()
        .chain((0x20u8..0x80).map(char::from))
        .find(|c| glyph(*c) == segments)
        .unwrap_or('?')
}
