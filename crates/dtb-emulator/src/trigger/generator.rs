//! Synthesis of single raw readout events.

use crate::api::TbmType;
use crate::encoding::encode_raw;
use crate::frame::RawFrame;
use crate::framing::{
    split_raw_pixel, ROC_FRAME_END, ROC_FRAME_START, ROC_HEADER_PAYLOAD, TBM_FRAME_OVERHEAD_WORDS,
    TBM_HEADER_HI, TBM_HEADER_LO, TBM_PIXEL_HI, TBM_PIXEL_LO, TBM_ROC_HEADER, TBM_TRAILER_HI,
    TBM_TRAILER_LO,
};
use crate::FaultCode;

/// A pixel hit every chip of a synthesised event reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SyntheticHit {
    /// Pixel column.
    pub column: u8,
    /// Pixel row.
    pub row: u8,
    /// Pulse height.
    pub value: i32,
}

/// Shape of one synthesised event, used to predict its word count.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EventLayout {
    /// Framing device in front of the chips.
    pub tbm: TbmType,
    /// Chips read out in the event.
    pub rocs: usize,
    /// Pixel hits reported per chip.
    pub hits_per_roc: usize,
}

impl EventLayout {
    /// Exact number of 16-bit words the event occupies in a channel queue.
    #[must_use]
    pub const fn words(&self) -> usize {
        let chips = self.rocs * (1 + 2 * self.hits_per_roc);
        if self.tbm.has_tbm_framing() {
            TBM_FRAME_OVERHEAD_WORDS + chips
        } else if self.rocs == 0 {
            1
        } else {
            chips
        }
    }
}

/// Builds one raw event for `rocs` chips.
///
/// `event` feeds the TBM event counter (low byte). Without a TBM and without
/// chips the frame is a single ROC header word carrying both markers, so every
/// trigger leaves one readable event in the queue.
///
/// # Errors
///
/// Returns [`FaultCode::PixelOutOfRange`] when `hit` cannot be raw-encoded.
pub fn fill_raw_event(
    event: u32,
    tbm: TbmType,
    rocs: usize,
    hit: Option<SyntheticHit>,
) -> Result<RawFrame, FaultCode> {
    let pixel = match hit {
        Some(hit) => Some(split_raw_pixel(encode_raw(hit.column, hit.row, hit.value)?)),
        None => None,
    };

    let mut frame = RawFrame::new();

    if tbm.has_tbm_framing() {
        frame.push(TBM_HEADER_HI | (event & 0xFF) as u16);
        frame.push(TBM_HEADER_LO | u16::from(tbm.header_data_id()));
        for _ in 0..rocs {
            frame.push(TBM_ROC_HEADER | ROC_HEADER_PAYLOAD);
            if let Some((hi, lo)) = pixel {
                frame.push(TBM_PIXEL_HI | hi);
                frame.push(TBM_PIXEL_LO | lo);
            }
        }
        frame.push(TBM_TRAILER_HI);
        frame.push(TBM_TRAILER_LO);
        return Ok(frame);
    }

    if rocs == 0 {
        frame.push(ROC_FRAME_START | ROC_FRAME_END | ROC_HEADER_PAYLOAD);
        return Ok(frame);
    }

    let mut words = Vec::with_capacity(rocs * 3);
    for _ in 0..rocs {
        words.push(ROC_HEADER_PAYLOAD);
        if let Some((hi, lo)) = pixel {
            words.push(hi);
            words.push(lo);
        }
    }
    if let Some(first) = words.first_mut() {
        *first |= ROC_FRAME_START;
    }
    if let Some(last) = words.last_mut() {
        *last |= ROC_FRAME_END;
    }
    frame.extend(words);
    Ok(frame)
}
