//! Human-readable rendering of pixels, events, and raw word dumps.

use std::fmt::Write as _;

use crate::pixel::{Event, Pixel};

/// Words per line in [`format_words`] output.
pub const WORDS_PER_LINE: usize = 8;

/// Renders a pixel as `roc [column,row,value]`.
#[must_use]
pub fn format_pixel(pixel: &Pixel) -> String {
    format!(
        "{} [{},{},{}]",
        pixel.roc_id, pixel.column, pixel.row, pixel.value
    )
}

/// Renders an event as `====== hdr ====== px px ...` with the header in hex.
#[must_use]
pub fn format_event(event: &Event) -> String {
    let mut out = format!("====== {:04x} ======", event.header);
    for pixel in &event.pixels {
        out.push(' ');
        out.push_str(&format_pixel(pixel));
    }
    out
}

/// Hex dump of raw words, [`WORDS_PER_LINE`] per line.
#[must_use]
pub fn format_words(words: &[u16]) -> String {
    let mut out = String::with_capacity(words.len() * 5);
    for (line, chunk) in words.chunks(WORDS_PER_LINE).enumerate() {
        if line > 0 {
            out.push('\n');
        }
        for (index, word) in chunk.iter().enumerate() {
            if index > 0 {
                out.push(' ');
            }
            let _ = write!(out, "{word:04x}");
        }
    }
    out
}
