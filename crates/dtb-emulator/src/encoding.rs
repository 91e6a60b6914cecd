//! Pixel address codecs for the two hardware paths.
//!
//! The linear encoding is what the board's soft core sends over RPC:
//!
//! ```text
//! ........ ....IIII ..CCCCCC .RRRRRRR
//! ```
//!
//! The raw encoding is the 24-bit pixel word of the 400 Mbps deserializer.
//! Column and row are transmitted as base-6 digits in 3-bit fields:
//!
//! ```text
//! bit 23..21  20..18  17..15  14..12  11..9  8..5   4   3..0
//!     c1      c0      r2      r1      r0     ph_hi  0   ph_lo
//! ```
//!
//! Both layouts are wire contracts; the decoders never validate.

use crate::pixel::Pixel;
use crate::FaultCode;

/// Number of pixel columns on one readout chip.
pub const ROC_NUM_COLS: u8 = 52;
/// Number of pixel rows on one readout chip.
pub const ROC_NUM_ROWS: u8 = 80;

/// Linear encoding: shift of the chip id field.
pub const LINEAR_ROC_SHIFT: u32 = 16;
/// Linear encoding: mask of the chip id field after shifting.
pub const LINEAR_ROC_MASK: u32 = 0x0F;
/// Linear encoding: shift of the column field.
pub const LINEAR_COL_SHIFT: u32 = 8;
/// Linear encoding: mask of the column field after shifting.
pub const LINEAR_COL_MASK: u32 = 0x3F;
/// Linear encoding: mask of the row field (no shift).
pub const LINEAR_ROW_MASK: u32 = 0x7F;

/// Raw encoding: mask of the low pulse-height nibble.
pub const RAW_PH_LO_MASK: u32 = 0x0F;
/// Raw encoding: mask of the high pulse-height nibble after shifting right by one.
pub const RAW_PH_HI_MASK: u32 = 0xF0;
/// Raw encoding: width mask of every base-6 address digit.
pub const RAW_DIGIT_MASK: u32 = 0x07;
/// Raw encoding: offset of the high column digit.
pub const RAW_COL_HI_SHIFT: u32 = 21;
/// Raw encoding: offset of the low column digit.
pub const RAW_COL_LO_SHIFT: u32 = 18;
/// Raw encoding: row digit offsets, most significant first.
pub const RAW_ROW_SHIFTS: [u32; 3] = [15, 12, 9];
/// Raw encoding: radix of the address digits.
pub const RAW_DIGIT_RADIX: u32 = 6;
/// Raw encoding: mask of all 24 meaningful bits.
pub const RAW_PIXEL_MASK: u32 = 0x00FF_FFFF;

/// Address mode of the raw deserializer link.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum AddressMode {
    /// Standard address transmission.
    #[default]
    Normal,
    /// Inverted address transmission used by some chip revisions.
    Inverted,
}

/// Decodes a linear RPC address into chip id, column, and row.
///
/// The value is carried in a separate channel and passed through unchanged.
#[must_use]
#[allow(clippy::cast_possible_truncation)]
pub const fn decode_linear(address: u32, value: i32) -> Pixel {
    Pixel {
        roc_id: ((address >> LINEAR_ROC_SHIFT) & LINEAR_ROC_MASK) as u8,
        column: ((address >> LINEAR_COL_SHIFT) & LINEAR_COL_MASK) as u8,
        row: (address & LINEAR_ROW_MASK) as u8,
        value,
    }
}

/// Packs chip id, column, and row at the linear encoding bit positions.
///
/// Fields wider than their slot are masked, matching what the decoder reads.
#[must_use]
pub const fn encode_linear(roc_id: u8, column: u8, row: u8) -> u32 {
    ((roc_id as u32 & LINEAR_ROC_MASK) << LINEAR_ROC_SHIFT)
        | ((column as u32 & LINEAR_COL_MASK) << LINEAR_COL_SHIFT)
        | (row as u32 & LINEAR_ROW_MASK)
}

/// Decodes a raw deserializer pixel word.
///
/// Garbage digits decode into correspondingly out-of-range fields; the row
/// arithmetic wraps into the 8-bit field exactly like the hardware readout
/// software does. The chip id is not part of the raw word and is left at 0.
#[must_use]
#[allow(clippy::cast_possible_truncation, clippy::cast_possible_wrap)]
pub const fn decode_raw(raw: u32) -> Pixel {
    let value = (raw & RAW_PH_LO_MASK) + ((raw >> 1) & RAW_PH_HI_MASK);

    let c = ((raw >> RAW_COL_HI_SHIFT) & RAW_DIGIT_MASK) * RAW_DIGIT_RADIX
        + ((raw >> RAW_COL_LO_SHIFT) & RAW_DIGIT_MASK);

    let mut r = 0u32;
    let mut i = 0;
    while i < RAW_ROW_SHIFTS.len() {
        r = r * RAW_DIGIT_RADIX + ((raw >> RAW_ROW_SHIFTS[i]) & RAW_DIGIT_MASK);
        i += 1;
    }

    let row = ROC_NUM_ROWS as i32 - (r / 2) as i32;
    let column = 2 * c + (r & 1);

    Pixel {
        roc_id: 0,
        column: column as u8,
        row: row as u8,
        value: value as i32,
    }
}

/// Decodes a raw deserializer pixel word for the given link address mode.
///
/// # Errors
///
/// Returns [`FaultCode::UnsupportedAddressMode`] for [`AddressMode::Inverted`];
/// the inverted digit order is not specified for this link.
pub const fn decode_raw_with_mode(raw: u32, mode: AddressMode) -> Result<Pixel, FaultCode> {
    match mode {
        AddressMode::Normal => Ok(decode_raw(raw)),
        AddressMode::Inverted => Err(FaultCode::UnsupportedAddressMode),
    }
}

/// Encodes an in-range pixel hit into a 24-bit raw deserializer word.
///
/// # Errors
///
/// Returns [`FaultCode::PixelOutOfRange`] when `column >= 52`, `row >= 80`,
/// or `value` does not fit the 8-bit pulse height.
#[allow(clippy::cast_sign_loss)]
pub const fn encode_raw(column: u8, row: u8, value: i32) -> Result<u32, FaultCode> {
    if column >= ROC_NUM_COLS || row >= ROC_NUM_ROWS || value < 0 || value > 0xFF {
        return Err(FaultCode::PixelOutOfRange);
    }

    let value = value as u32;
    let c = column as u32 / 2;
    let r = 2 * (ROC_NUM_ROWS as u32 - row as u32) + (column as u32 & 1);

    let mut raw = (value & RAW_PH_LO_MASK) | ((value & RAW_PH_HI_MASK) << 1);
    raw |= (c / RAW_DIGIT_RADIX) << RAW_COL_HI_SHIFT;
    raw |= (c % RAW_DIGIT_RADIX) << RAW_COL_LO_SHIFT;

    let radix_sq = RAW_DIGIT_RADIX * RAW_DIGIT_RADIX;
    raw |= (r / radix_sq) << RAW_ROW_SHIFTS[0];
    raw |= ((r / RAW_DIGIT_RADIX) % RAW_DIGIT_RADIX) << RAW_ROW_SHIFTS[1];
    raw |= (r % RAW_DIGIT_RADIX) << RAW_ROW_SHIFTS[2];

    Ok(raw)
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;
    use rstest::rstest;

    use super::{
        decode_linear, decode_raw, decode_raw_with_mode, encode_linear, encode_raw, AddressMode,
        ROC_NUM_COLS, ROC_NUM_ROWS,
    };
    use crate::FaultCode;

    #[test]
    fn linear_decode_extracts_fields_at_documented_offsets() {
        let px = decode_linear(0x000B_2A4F, 17);
        assert_eq!(px.roc_id, 0xB);
        assert_eq!(px.column, 0x2A);
        assert_eq!(px.row, 0x4F);
        assert_eq!(px.value, 17);
    }

    #[test]
    fn linear_decode_ignores_bits_outside_fields() {
        let px = decode_linear(0xFFF0_C080, 0);
        assert_eq!(px.roc_id, 0);
        assert_eq!(px.column, 0);
        assert_eq!(px.row, 0);
    }

    #[test]
    fn raw_zero_decodes_to_top_row_first_column() {
        let px = decode_raw(0);
        assert_eq!(px.value, 0);
        assert_eq!(px.row, 80);
        assert_eq!(px.column, 0);
        assert_eq!(px.roc_id, 0);
    }

    #[rstest]
    #[case(0, 79, 0)]
    #[case(1, 79, 255)]
    #[case(51, 0, 100)]
    #[case(26, 40, 0x5A)]
    #[case(7, 13, 0x0F)]
    fn raw_encode_feeds_decoder(#[case] column: u8, #[case] row: u8, #[case] value: i32) {
        let raw = encode_raw(column, row, value).expect("in-range pixel");
        let px = decode_raw(raw);
        assert_eq!((px.column, px.row, px.value), (column, row, value));
    }

    #[test]
    fn raw_value_bit_four_is_ignored() {
        assert_eq!(decode_raw(0x10).value, 0);
        assert_eq!(decode_raw(0x1FF).value, 0xFF);
    }

    #[rstest]
    #[case(ROC_NUM_COLS, 0, 0)]
    #[case(0, ROC_NUM_ROWS, 0)]
    #[case(0, 0, 256)]
    #[case(0, 0, -1)]
    fn raw_encode_rejects_out_of_grid(#[case] column: u8, #[case] row: u8, #[case] value: i32) {
        assert_eq!(
            encode_raw(column, row, value),
            Err(FaultCode::PixelOutOfRange)
        );
    }

    #[test]
    fn inverted_address_mode_is_unsupported() {
        assert_eq!(
            decode_raw_with_mode(0x0012_3456, AddressMode::Inverted),
            Err(FaultCode::UnsupportedAddressMode)
        );
        assert_eq!(
            decode_raw_with_mode(0x0012_3456, AddressMode::Normal),
            Ok(decode_raw(0x0012_3456))
        );
    }

    #[test]
    fn garbage_digits_decode_without_panicking() {
        let px = decode_raw(0x00FF_FFFF);
        // r = 7*36 + 7*6 + 7 = 301, row = 80 - 150 wraps into the u8 field.
        assert_eq!(px.row, (80i32 - 150) as u8);
        assert_eq!(px.column, 2 * 49 + 1);
    }

    proptest! {
        #[test]
        fn linear_masks_are_idempotent(address in any::<u32>()) {
            let px = decode_linear(address, 0);
            let reencoded = encode_linear(px.roc_id, px.column, px.row);
            prop_assert_eq!(reencoded, address & 0x000F_3F7F);
        }

        #[test]
        fn raw_decode_is_pure(raw in any::<u32>()) {
            prop_assert_eq!(decode_raw(raw), decode_raw(raw));
        }

        #[test]
        fn raw_decode_only_reads_24_bits(raw in any::<u32>()) {
            prop_assert_eq!(decode_raw(raw), decode_raw(raw & 0x00FF_FFFF));
        }

        #[test]
        fn every_grid_pixel_survives_raw_encoding(
            column in 0u8..ROC_NUM_COLS,
            row in 0u8..ROC_NUM_ROWS,
            value in 0i32..=255,
        ) {
            let raw = encode_raw(column, row, value).expect("in-range pixel");
            prop_assert_eq!(raw & !0x00FF_FFFF, 0);
            let px = decode_raw(raw);
            prop_assert_eq!((px.column, px.row, px.value), (column, row, value));
        }
    }
}
