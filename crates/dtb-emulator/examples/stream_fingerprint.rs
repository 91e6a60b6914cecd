//! Deterministic readout-stream fingerprint used for cross-host comparison.

use dtb_emulator::{
    ChipScope, DacAxes, DacAxis, PixelExtent, SweepSpec, Testboard, TRG_SEL_PG_DIR,
};
use proptest as _;
use rstest as _;
#[cfg(feature = "serde")]
use serde as _;
use thiserror as _;
use tracing as _;

fn hash_bytes(hash: &mut u64, bytes: &[u8]) {
    for byte in bytes {
        *hash ^= u64::from(*byte);
        *hash = hash.wrapping_mul(0x1000_0000_01B3);
    }
}

fn drain_into(board: &mut Testboard, hash: &mut u64) {
    for channel in board.daq_channels().active_channels() {
        let read = board
            .daq_read(channel, u32::MAX)
            .expect("active channel exists");
        hash_bytes(hash, &[channel]);
        for word in read.words {
            hash_bytes(hash, &word.to_le_bytes());
        }
    }
}

fn fingerprint() -> String {
    let mut board = Testboard::new();
    for address in 0..4 {
        board.roc_i2c_addr(address);
    }
    board.daq_start(0).expect("channel 0 exists");
    board.daq_start(1).expect("channel 1 exists");

    let mut hash = 0xcbf2_9ce4_8422_2325_u64;

    board.pg_triggers(16, 0).expect("channels active");
    drain_into(&mut board, &mut hash);

    board.tbm_enable(true);
    board
        .loop_multi_roc_all_pixels_calibrate(&[0, 1, 2, 3], 1, 0)
        .expect("channels active");
    drain_into(&mut board, &mut hash);

    board.trigger_select(TRG_SEL_PG_DIR);
    let scan = SweepSpec {
        scope: ChipScope::Multi(vec![0, 1]),
        extent: PixelExtent::OnePixel { column: 5, row: 5 },
        dacs: DacAxes::Two(DacAxis::new(1, 0, 15), DacAxis::new(2, 100, 110)),
        triggers: 2,
        flags: 0,
    };
    board.run_sweep(&scan).expect("channels active");
    drain_into(&mut board, &mut hash);

    let diag = board.diag();
    hash_bytes(&mut hash, &diag.events_synthesised.to_le_bytes());
    hash_bytes(&mut hash, &diag.words_drained.to_le_bytes());

    format!("{hash:016x}")
}

fn main() {
    println!("{}", fingerprint());
}
