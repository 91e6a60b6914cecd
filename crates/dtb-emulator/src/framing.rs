//! Word-level framing of the readout stream.
//!
//! Without a TBM, chips are read out back to back and an event is delimited by
//! marker bits on its first and last word; the low 12 bits carry payload.
//! With a TBM, bits 15..13 of every word tag its kind:
//!
//! | kind  | meaning        |
//! |-------|----------------|
//! | `0xA` | TBM header hi  |
//! | `0x8` | TBM header lo  |
//! | `0x4` | ROC header     |
//! | `0x0` | pixel hi       |
//! | `0x2` | pixel lo       |
//! | `0xE` | TBM trailer hi |
//! | `0xC` | TBM trailer lo |

use crate::api::TbmType;

/// Payload bits of every readout word.
pub const PAYLOAD_MASK: u16 = 0x0FFF;
/// ROC header payload emitted by the emulated chips.
pub const ROC_HEADER_PAYLOAD: u16 = 0x07F8;
/// Mask identifying a ROC header payload; the two low bits carry status.
pub const ROC_HEADER_MASK: u16 = 0x0FFC;

/// Direct readout: marker on the first word of an event.
pub const ROC_FRAME_START: u16 = 0x8000;
/// Direct readout: marker on the last word of an event.
pub const ROC_FRAME_END: u16 = 0x4000;

/// TBM readout: mask selecting the word-kind bits.
pub const WORD_KIND_MASK: u16 = 0xE000;
/// TBM readout: first header word, low byte carries the event counter.
pub const TBM_HEADER_HI: u16 = 0xA000;
/// TBM readout: second header word, low byte carries the data id.
pub const TBM_HEADER_LO: u16 = 0x8000;
/// TBM readout: ROC header word.
pub const TBM_ROC_HEADER: u16 = 0x4000;
/// TBM readout: upper 12 bits of a raw pixel.
pub const TBM_PIXEL_HI: u16 = 0x0000;
/// TBM readout: lower 12 bits of a raw pixel.
pub const TBM_PIXEL_LO: u16 = 0x2000;
/// TBM readout: first trailer word.
pub const TBM_TRAILER_HI: u16 = 0xE000;
/// TBM readout: second trailer word, closes the event.
pub const TBM_TRAILER_LO: u16 = 0xC000;

/// Number of TBM header plus trailer words around one event.
pub const TBM_FRAME_OVERHEAD_WORDS: usize = 4;

/// Stream framing family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum Framing {
    /// Chips read out directly, start/end marker bits.
    Roc,
    /// Events wrapped in TBM header and trailer words.
    Tbm,
}

impl From<TbmType> for Framing {
    fn from(tbm: TbmType) -> Self {
        if tbm.has_tbm_framing() {
            Self::Tbm
        } else {
            Self::Roc
        }
    }
}

/// Returns true if `payload` is a ROC header.
#[must_use]
pub const fn is_roc_header_payload(payload: u16) -> bool {
    payload & ROC_HEADER_MASK == ROC_HEADER_PAYLOAD
}

/// Splits a 24-bit raw pixel into its two 12-bit payload halves.
#[must_use]
#[allow(clippy::cast_possible_truncation)]
pub const fn split_raw_pixel(raw: u32) -> (u16, u16) {
    (
        ((raw >> 12) as u16) & PAYLOAD_MASK,
        (raw as u16) & PAYLOAD_MASK,
    )
}

/// Joins two 12-bit payload halves into a 24-bit raw pixel.
#[must_use]
pub const fn join_raw_pixel(hi: u16, lo: u16) -> u32 {
    ((hi & PAYLOAD_MASK) as u32) << 12 | (lo & PAYLOAD_MASK) as u32
}

#[cfg(test)]
mod tests {
    use super::{
        is_roc_header_payload, join_raw_pixel, split_raw_pixel, Framing, ROC_HEADER_PAYLOAD,
    };
    use crate::api::TbmType;

    #[test]
    fn framing_follows_tbm_type() {
        assert_eq!(Framing::from(TbmType::None), Framing::Roc);
        assert_eq!(Framing::from(TbmType::Basic), Framing::Tbm);
        assert_eq!(Framing::from(TbmType::Emulated), Framing::Tbm);
    }

    #[test]
    fn roc_header_ignores_status_bits() {
        assert!(is_roc_header_payload(ROC_HEADER_PAYLOAD));
        assert!(is_roc_header_payload(ROC_HEADER_PAYLOAD | 0x3));
        assert!(!is_roc_header_payload(0x07F0));
    }

    #[test]
    fn raw_pixel_halves_rejoin() {
        let (hi, lo) = split_raw_pixel(0x00AB_CDEF);
        assert_eq!((hi, lo), (0x0ABC, 0x0DEF));
        assert_eq!(join_raw_pixel(hi, lo), 0x00AB_CDEF);
    }
}
