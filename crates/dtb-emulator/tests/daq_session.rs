//! DAQ channel and trigger distribution behaviour through the session surface.

use dtb_emulator::{
    EmulatorConfig, EventLayout, FaultCode, RawFrame, TbmType, Testboard,
    DEFAULT_FILL_LEVEL_PERCENT, TRG_SEL_GEN,
};
use proptest as _;
use rstest::rstest;
#[cfg(feature = "serde")]
use serde as _;
use thiserror as _;
use tracing as _;

fn board_with_chips(chips: u8) -> Testboard {
    let mut board = Testboard::new();
    for address in 0..chips {
        board.roc_i2c_addr(address);
    }
    board
}

#[test]
fn read_without_start_returns_nothing() {
    let mut board = board_with_chips(1);
    assert!(board.daq_open(0, 1000) >= 500);

    let read = board.daq_read(0, 100).expect("channel 0 exists");
    assert!(read.words.is_empty());
    assert_eq!(read.available, 0);
}

#[test]
fn five_triggers_fill_one_channel_with_five_events() {
    let mut board = board_with_chips(2);
    board.daq_open(0, 1000);
    board.daq_start(0).expect("channel 0 exists");

    board.pg_triggers(5, 100).expect("channel active");

    let event = EventLayout {
        tbm: TbmType::None,
        rocs: 2,
        hits_per_roc: 0,
    };
    assert_eq!(board.daq_get_size(0), Ok(5 * event.words() as u32));
}

#[test]
fn residual_chip_is_left_out() {
    let mut board = board_with_chips(3);
    board.daq_start(0).expect("channel 0 exists");
    board.daq_start(1).expect("channel 1 exists");

    let result = board.pg_triggers(1, 0).expect("channels active");

    assert_eq!(result.plan.rocs_per_channel, 1);
    assert_eq!(result.plan.excluded_chips, 1);
    // One ROC header word per channel: only two of three chips synthesised.
    assert_eq!(board.daq_get_size(0), Ok(1));
    assert_eq!(board.daq_get_size(1), Ok(1));
}

#[test]
fn close_after_writes_empties_channel() {
    let mut board = board_with_chips(1);
    board.daq_start(0).expect("channel 0 exists");
    board.pg_triggers(3, 0).expect("channel active");
    assert_eq!(board.daq_get_size(0), Ok(3));

    board.daq_close(0).expect("channel 0 exists");
    assert_eq!(board.daq_get_size(0), Ok(0));
}

#[test]
fn stop_keeps_data_for_a_later_start() {
    let mut board = board_with_chips(1);
    board.daq_start(0).expect("channel 0 exists");
    board.pg_triggers(2, 0).expect("channel active");
    board.daq_stop(0).expect("channel 0 exists");

    assert_eq!(board.daq_get_size(0), Ok(0));
    assert_eq!(board.daq_read(0, 100).expect("channel 0 exists").words.len(), 0);

    board.daq_start(0).expect("channel 0 exists");
    let read = board.daq_read(0, 100).expect("channel 0 exists");
    assert_eq!(read.words.len(), 2);
    assert_eq!(read.available, 0);
}

#[test]
fn partial_reads_drain_in_fifo_order() {
    let mut board = board_with_chips(1);
    board.tbm_enable(true);
    board.daq_start(0).expect("channel 0 exists");
    board.pg_triggers(2, 0).expect("channel active");

    let first = board.daq_read(0, 6).expect("channel 0 exists");
    assert_eq!(first.words, vec![0xA000, 0x8000, 0x47F8]);
    assert_eq!(first.available, 7);

    let rest = board.daq_read(0, 1000).expect("channel 0 exists");
    assert_eq!(
        rest.words,
        vec![0xE000, 0xC000, 0xA001, 0x8000, 0x47F8, 0xE000, 0xC000]
    );
    assert_eq!(rest.available, 0);
}

#[test]
fn raw_frame_clear_resets_words_and_flags() {
    let mut frame = RawFrame::new();
    frame.extend([1, 2, 3]);
    frame.set_start_error();

    frame.clear();

    assert_eq!(frame.len(), 0);
    assert!(!frame.is_start_error());
    assert!(!frame.is_end_error());
    assert!(!frame.is_overflow());
}

#[test]
fn triggers_without_open_channel_are_recoverable() {
    let mut board = board_with_chips(4);
    let fault = board.pg_triggers(10, 0).expect_err("no channel active");
    assert_eq!(fault, FaultCode::NoOpenDaqChannel);
    assert!(!fault.is_fatal());

    board.daq_start(0).expect("channel 0 exists");
    assert!(board.pg_triggers(10, 0).is_ok());
}

#[rstest]
#[case(4)]
#[case(5)]
#[case(255)]
fn out_of_range_channels_fault_fatally(#[case] channel: u8) {
    let mut board = Testboard::new();
    assert_eq!(board.daq_open(channel, 1000), 0);

    let fault = board.daq_start(channel).expect_err("channel out of range");
    assert_eq!(fault, FaultCode::ChannelOutOfRange);
    assert!(fault.is_fatal());
    assert_eq!(board.daq_read(channel, 10), Err(FaultCode::ChannelOutOfRange));
    assert_eq!(board.daq_close(channel), Err(FaultCode::ChannelOutOfRange));
}

#[test]
fn channel_count_is_configurable() {
    let mut board = Testboard::with_config(EmulatorConfig {
        daq_channels: 8,
        ..EmulatorConfig::default()
    });
    assert!(board.daq_open(7, 64) > 0);
    assert_eq!(board.daq_open(8, 64), 0);
}

#[test]
fn fill_level_is_constant() {
    let mut board = board_with_chips(1);
    assert_eq!(board.daq_fill_level(), DEFAULT_FILL_LEVEL_PERCENT);
    board.daq_start(0).expect("channel 0 exists");
    board.pg_triggers(100, 0).expect("channel active");
    assert_eq!(board.daq_fill_level(), DEFAULT_FILL_LEVEL_PERCENT);
}

#[test]
fn generator_trigger_source_switches_to_emulated_headers() {
    let mut board = board_with_chips(1);
    board.trigger_select(TRG_SEL_GEN);
    board.daq_start(0).expect("channel 0 exists");
    board.pg_triggers(1, 0).expect("channel active");

    let read = board.daq_read(0, 100).expect("channel 0 exists");
    assert_eq!(read.words, vec![0xA000, 0x8080, 0x47F8, 0xE000, 0xC000]);
}

#[rstest]
#[case(1, 8, 8)]
#[case(2, 8, 4)]
#[case(3, 8, 2)]
#[case(4, 16, 4)]
#[case(4, 3, 0)]
fn chips_split_evenly_over_active_channels(
    #[case] channels: u8,
    #[case] chips: u8,
    #[case] expected_rocs: usize,
) {
    let mut board = board_with_chips(chips);
    for channel in 0..channels {
        board.daq_start(channel).expect("configured channel");
    }
    let result = board.pg_triggers(1, 0).expect("channels active");
    assert_eq!(result.plan.rocs_per_channel, expected_rocs);
    assert_eq!(result.events, u64::from(channels));
}
