//! Tiny 3x5 digit font for the clock face.
//!
//! Each glyph is five rows of three bits, most significant bit on the
//! left. Characters without a glyph (the colon, spaces, letters from an
//! `%p` format) draw nothing.

pub const GLYPH_WIDTH: u32 = 3;
pub const GLYPH_HEIGHT: u32 = 5;

const DIGITS: [[u8; 5]; 10] = [
    [0b111, 0b101, 0b101, 0b101, 0b111], // 0
    [0b010, 0b110, 0b010, 0b010, 0b111], // 1
    [0b111, 0b001, 0b111, 0b100, 0b111], // 2
    [0b111, 0b001, 0b111, 0b001, 0b111], // 3
    [0b101, 0b101, 0b111, 0b001, 0b001], // 4
    [0b111, 0b100, 0b111, 0b001, 0b111], // 5
    [0b111, 0b100, 0b111, 0b101, 0b111], // 6
    [0b111, 0b001, 0b010, 0b010, 0b010], // 7
    [0b111, 0b101, 0b111, 0b101, 0b111], // 8
    [0b111, 0b101, 0b111, 0b001, 0b111], // 9
];

/// Rows of the glyph for `ch`, if it has one.
pub fn glyph(ch: char) -> Option<&'static [u8; 5]> {
    ch.to_digit(10).map(|d| &DIGITS[d as usize])
}

/// Offsets `(dx, dy)` of every lit pixel of `ch`.
pub fn lit_pixels(ch: char) -> impl Iterator<Item = (u32, u32)> {
    glyph(ch).into_iter().flat_map(|rows| {
        rows.iter().enumerate().flat_map(|(dy, bits)| {
            (0..GLYPH_WIDTH)
                .filter(move |dx| bits & (0b100 >> dx) != 0)
                .map(move |dx| (dx, dy as u32))
        })
    })
}
