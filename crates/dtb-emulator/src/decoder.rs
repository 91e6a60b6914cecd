//! Event decoder for drained readout streams.
//!
//! Decoding runs in two stages, mirroring the deserializer on the real link:
//! [`split_frames`] groups words into [`RawFrame`]s and flags framing errors,
//! then [`EventDecoder::decode`] turns one frame into an [`Event`]. Decoding is
//! lenient: unpaired pixel words and unknown word kinds are skipped.

use crate::encoding::AddressMode;
use crate::frame::RawFrame;
use crate::framing::{
    is_roc_header_payload, join_raw_pixel, Framing, PAYLOAD_MASK, ROC_FRAME_END, ROC_FRAME_START,
    TBM_HEADER_HI, TBM_HEADER_LO, TBM_PIXEL_HI, TBM_PIXEL_LO, TBM_ROC_HEADER, TBM_TRAILER_LO,
    WORD_KIND_MASK,
};
use crate::pixel::{Event, Pixel};
use crate::FaultCode;

/// Frame under construction while splitting.
struct FrameBuilder {
    frame: RawFrame,
    max_words: usize,
}

impl FrameBuilder {
    fn open(max_words: usize, start_error: bool) -> Self {
        let mut frame = RawFrame::new();
        if start_error {
            frame.set_start_error();
        }
        Self { frame, max_words }
    }

    fn push(&mut self, word: u16) {
        if self.frame.len() >= self.max_words {
            self.frame.set_overflow();
            return;
        }
        self.frame.push(word);
    }

    fn finish(self) -> RawFrame {
        self.frame
    }

    fn abandon(mut self) -> RawFrame {
        self.frame.set_end_error();
        self.frame
    }
}

/// Groups a drained word stream into raw frames.
///
/// Flags raised:
/// * start error: words arrived while no frame was open;
/// * end error: the frame was cut short by a new start or the end of `words`;
/// * overflow: the frame grew past `max_words`; the excess is dropped.
#[must_use]
pub fn split_frames(words: &[u16], framing: Framing, max_words: usize) -> Vec<RawFrame> {
    let mut frames = Vec::new();
    let mut current: Option<FrameBuilder> = None;

    for &word in words {
        let starts = match framing {
            Framing::Roc => word & ROC_FRAME_START != 0,
            Framing::Tbm => word & WORD_KIND_MASK == TBM_HEADER_HI,
        };
        let ends = ends_frame(word, framing);

        if starts {
            if let Some(open) = current.take() {
                frames.push(open.abandon());
            }
            current = Some(FrameBuilder::open(max_words, false));
        }

        let builder = current.get_or_insert_with(|| FrameBuilder::open(max_words, true));
        builder.push(word);

        if ends {
            if let Some(done) = current.take() {
                frames.push(done.finish());
            }
        }
    }

    if let Some(open) = current {
        frames.push(open.abandon());
    }
    frames
}

fn ends_frame(word: u16, framing: Framing) -> bool {
    match framing {
        Framing::Roc => word & ROC_FRAME_END != 0,
        Framing::Tbm => word & WORD_KIND_MASK == TBM_TRAILER_LO,
    }
}

/// Length of the longest prefix of `words` that ends on a frame end marker.
///
/// Words past it belong to a frame still being read out; callers draining a
/// channel in pieces keep them for the next read.
#[must_use]
pub fn complete_frames_len(words: &[u16], framing: Framing) -> usize {
    words
        .iter()
        .rposition(|&word| ends_frame(word, framing))
        .map_or(0, |index| index + 1)
}

/// Frame-to-event decoder for one link configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct EventDecoder {
    /// Stream framing family.
    pub framing: Framing,
    /// Raw link address mode.
    pub address_mode: AddressMode,
    /// Chip id assigned to the first ROC header of every frame.
    pub roc_offset: u8,
}

/// Events of one drained stream plus a count of flagged frames.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct DecodedStream {
    /// Decoded events in stream order.
    pub events: Vec<Event>,
    /// Frames that carried at least one error flag.
    pub flagged_frames: usize,
}

impl EventDecoder {
    /// Creates a decoder with normal address mode and chip ids starting at 0.
    #[must_use]
    pub const fn new(framing: Framing) -> Self {
        Self {
            framing,
            address_mode: AddressMode::Normal,
            roc_offset: 0,
        }
    }

    /// Decodes one frame.
    ///
    /// # Errors
    ///
    /// Returns [`FaultCode::UnsupportedAddressMode`] for
    /// [`AddressMode::Inverted`].
    pub fn decode(&self, frame: &RawFrame) -> Result<Event, FaultCode> {
        if self.address_mode != AddressMode::Normal {
            return Err(FaultCode::UnsupportedAddressMode);
        }
        Ok(match self.framing {
            Framing::Roc => self.decode_roc(frame.words()),
            Framing::Tbm => self.decode_tbm(frame.words()),
        })
    }

    /// Splits `words` and decodes every resulting frame.
    ///
    /// # Errors
    ///
    /// Propagates [`EventDecoder::decode`] faults.
    pub fn decode_stream(
        &self,
        words: &[u16],
        max_words: usize,
    ) -> Result<DecodedStream, FaultCode> {
        let mut stream = DecodedStream::default();
        for frame in split_frames(words, self.framing, max_words) {
            if frame.flags() != 0 {
                stream.flagged_frames += 1;
            }
            stream.events.push(self.decode(&frame)?);
        }
        Ok(stream)
    }

    fn next_roc(&self, roc: Option<u8>) -> Option<u8> {
        Some(roc.map_or(self.roc_offset, |id| id.wrapping_add(1)))
    }

    fn decode_roc(&self, words: &[u16]) -> Event {
        let mut event = Event::new(0);
        let mut header_seen = false;
        let mut roc = None;
        let mut pending_hi = None;

        for &word in words {
            let payload = word & PAYLOAD_MASK;
            if is_roc_header_payload(payload) {
                if !header_seen {
                    event.header = payload;
                    header_seen = true;
                }
                roc = self.next_roc(roc);
                pending_hi = None;
                continue;
            }
            match pending_hi.take() {
                None => pending_hi = Some(payload),
                Some(hi) => {
                    let roc_id = roc.unwrap_or(self.roc_offset);
                    event
                        .pixels
                        .push(Pixel::from_raw(join_raw_pixel(hi, payload), roc_id));
                }
            }
        }
        event
    }

    fn decode_tbm(&self, words: &[u16]) -> Event {
        let mut header_hi = 0u16;
        let mut header_lo = 0u16;
        let mut pixels = Vec::new();
        let mut roc = None;
        let mut pending_hi = None;

        for &word in words {
            match word & WORD_KIND_MASK {
                TBM_HEADER_HI => header_hi = word & 0xFF,
                TBM_HEADER_LO => header_lo = word & 0xFF,
                TBM_ROC_HEADER => {
                    roc = self.next_roc(roc);
                    pending_hi = None;
                }
                TBM_PIXEL_HI => pending_hi = Some(word & PAYLOAD_MASK),
                TBM_PIXEL_LO => {
                    if let Some(hi) = pending_hi.take() {
                        let roc_id = roc.unwrap_or(self.roc_offset);
                        pixels.push(Pixel::from_raw(
                            join_raw_pixel(hi, word & PAYLOAD_MASK),
                            roc_id,
                        ));
                    }
                }
                _ => {}
            }
        }

        Event {
            header: (header_hi << 8) | header_lo,
            pixels,
        }
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::{complete_frames_len, split_frames, EventDecoder};
    use crate::api::TbmType;
    use crate::encoding::AddressMode;
    use crate::frame::RawFrame;
    use crate::framing::Framing;
    use crate::pixel::Pixel;
    use crate::trigger::{fill_raw_event, SyntheticHit};
    use crate::FaultCode;

    const HIT: SyntheticHit = SyntheticHit {
        column: 12,
        row: 33,
        value: 77,
    };

    fn stream(events: u32, tbm: TbmType, rocs: usize, hit: Option<SyntheticHit>) -> Vec<u16> {
        (0..events)
            .flat_map(|event| {
                fill_raw_event(event, tbm, rocs, hit)
                    .expect("in-range hit")
                    .words()
                    .to_vec()
            })
            .collect()
    }

    #[test]
    fn roc_stream_splits_into_synthesised_events() {
        let words = stream(3, TbmType::None, 2, Some(HIT));
        let frames = split_frames(&words, Framing::Roc, 4096);
        assert_eq!(frames.len(), 3);
        for frame in &frames {
            assert_eq!(frame.flags(), 0);
            assert_eq!(frame.len(), 6);
        }
    }

    #[test]
    fn tbm_stream_splits_on_header_and_trailer() {
        let words = stream(4, TbmType::Emulated, 3, None);
        let frames = split_frames(&words, Framing::Tbm, 4096);
        assert_eq!(frames.len(), 4);
        assert!(frames.iter().all(|frame| frame.flags() == 0));
    }

    #[test]
    fn data_before_first_start_is_a_start_error() {
        let mut words = vec![0x0123, 0x0456];
        words.extend(stream(1, TbmType::None, 1, None));
        let frames = split_frames(&words, Framing::Roc, 4096);
        assert_eq!(frames.len(), 2);
        assert!(frames[0].is_start_error());
        assert!(frames[0].is_end_error());
        assert_eq!(frames[1].flags(), 0);
    }

    #[test]
    fn truncated_stream_ends_with_end_error() {
        let mut words = stream(1, TbmType::Basic, 2, Some(HIT));
        words.pop();
        let frames = split_frames(&words, Framing::Tbm, 4096);
        assert_eq!(frames.len(), 1);
        assert!(frames[0].is_end_error());
        assert!(!frames[0].is_start_error());
    }

    #[test]
    fn complete_prefix_stops_at_last_frame_end() {
        let tbm = stream(2, TbmType::Basic, 1, None);
        assert_eq!(complete_frames_len(&tbm, Framing::Tbm), tbm.len());
        assert_eq!(complete_frames_len(&tbm[..8], Framing::Tbm), 5);
        assert_eq!(complete_frames_len(&tbm[..3], Framing::Tbm), 0);

        let roc = stream(2, TbmType::None, 2, None);
        assert_eq!(complete_frames_len(&roc[..3], Framing::Roc), 2);
        assert_eq!(complete_frames_len(&[], Framing::Roc), 0);
    }

    #[test]
    fn new_start_interrupts_open_frame() {
        let words = [0x87F8, 0x0111, 0x87F8, 0x47F8];
        let frames = split_frames(&words, Framing::Roc, 4096);
        assert_eq!(frames.len(), 2);
        assert!(frames[0].is_end_error());
        assert_eq!(frames[0].words(), &[0x87F8, 0x0111]);
        assert_eq!(frames[1].flags(), 0);
    }

    #[test]
    fn oversized_frame_overflows_and_drops_excess() {
        let words = stream(1, TbmType::None, 5, None);
        let frames = split_frames(&words, Framing::Roc, 3);
        assert_eq!(frames.len(), 1);
        assert!(frames[0].is_overflow());
        assert_eq!(frames[0].len(), 3);
    }

    #[test]
    fn roc_frame_decodes_hits_with_chip_ids() {
        let words = stream(1, TbmType::None, 3, Some(HIT));
        let decoder = EventDecoder {
            roc_offset: 4,
            ..EventDecoder::new(Framing::Roc)
        };
        let stream = decoder.decode_stream(&words, 4096).expect("normal mode");

        assert_eq!(stream.events.len(), 1);
        let event = &stream.events[0];
        assert_eq!(event.header, 0x07F8);
        assert_eq!(
            event.pixels,
            vec![
                Pixel::new(4, 12, 33, 77),
                Pixel::new(5, 12, 33, 77),
                Pixel::new(6, 12, 33, 77),
            ]
        );
    }

    #[test]
    fn tbm_frame_header_joins_counter_and_data_id() {
        let frame = fill_raw_event(0x15, TbmType::Emulated, 1, Some(HIT)).expect("in-range hit");
        let event = EventDecoder::new(Framing::Tbm)
            .decode(&frame)
            .expect("normal mode");
        assert_eq!(event.header, 0x1580);
        assert_eq!(event.pixels, vec![Pixel::new(0, 12, 33, 77)]);
    }

    #[test]
    fn unpaired_pixel_words_are_skipped() {
        let mut frame = RawFrame::new();
        frame.extend([0xA001, 0x8000, 0x4000 | 0x07F8, 0x2123, 0x0456, 0xE000, 0xC000]);
        let event = EventDecoder::new(Framing::Tbm)
            .decode(&frame)
            .expect("normal mode");
        assert!(event.pixels.is_empty());
        assert_eq!(event.header, 0x0100);
    }

    #[test]
    fn inverted_address_mode_is_rejected() {
        let decoder = EventDecoder {
            address_mode: AddressMode::Inverted,
            ..EventDecoder::new(Framing::Roc)
        };
        assert_eq!(
            decoder.decode(&RawFrame::new()),
            Err(FaultCode::UnsupportedAddressMode)
        );
    }

    #[test]
    fn flagged_frames_are_counted() {
        let words = [0x0001, 0x0002, 0xC7F8];
        let stream = EventDecoder::new(Framing::Roc)
            .decode_stream(&words, 4096)
            .expect("normal mode");
        assert_eq!(stream.events.len(), 2);
        assert_eq!(stream.flagged_frames, 1);
    }

    proptest! {
        #[test]
        fn arbitrary_words_never_panic(
            words in proptest::collection::vec(any::<u16>(), 0..256),
            tbm in any::<bool>(),
        ) {
            let framing = if tbm { Framing::Tbm } else { Framing::Roc };
            let frames = split_frames(&words, framing, 64);
            let kept: usize = frames.iter().map(RawFrame::len).sum();
            prop_assert!(kept <= words.len());
            for frame in &frames {
                prop_assert!(frame.len() <= 64);
                prop_assert!(EventDecoder::new(framing).decode(frame).is_ok());
            }
        }

        #[test]
        fn synthesised_stream_decodes_exactly(
            events in 1u32..20,
            rocs in 1usize..8,
            column in 0u8..52,
            row in 0u8..80,
            value in 0i32..=255,
            tbm in prop_oneof![Just(TbmType::None), Just(TbmType::Basic), Just(TbmType::Emulated)],
        ) {
            let hit = SyntheticHit { column, row, value };
            let words = stream(events, tbm, rocs, Some(hit));
            let decoded = EventDecoder::new(Framing::from(tbm))
                .decode_stream(&words, 4096)
                .expect("normal mode");

            prop_assert_eq!(decoded.flagged_frames, 0);
            prop_assert_eq!(decoded.events.len(), events as usize);
            for event in &decoded.events {
                prop_assert_eq!(event.pixels.len(), rocs);
                for (index, px) in event.pixels.iter().enumerate() {
                    prop_assert_eq!(usize::from(px.roc_id), index);
                    prop_assert_eq!((px.column, px.row, px.value), (column, row, value));
                }
            }
        }
    }
}
