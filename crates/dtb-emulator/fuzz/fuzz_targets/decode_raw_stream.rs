#![no_main]

use dtb_emulator::{
    decode_linear, decode_raw, split_frames, EventDecoder, Framing, RawFrame,
};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if data.len() < 2 {
        return;
    }

    let framing = if data[0] & 1 == 0 {
        Framing::Roc
    } else {
        Framing::Tbm
    };
    let max_words = usize::from(data[1]) + 1;
    let words: Vec<u16> = data[2..]
        .chunks_exact(2)
        .map(|pair| u16::from_be_bytes([pair[0], pair[1]]))
        .collect();

    let frames = split_frames(&words, framing, max_words);
    let kept: usize = frames.iter().map(RawFrame::len).sum();
    assert!(kept <= words.len());

    let decoder = EventDecoder::new(framing);
    for frame in &frames {
        assert!(frame.len() <= max_words);
        let _ = decoder.decode(frame);
    }

    for quad in data[2..].chunks_exact(4) {
        let raw = u32::from_be_bytes([quad[0], quad[1], quad[2], quad[3]]);
        let _ = decode_raw(raw);
        let _ = decode_linear(raw, 0);
    }
});
