//! Emulated Digital Test Board (DTB) for pixel readout chips.
//!
//! The crate replaces the hardware board behind the host RPC interface: DAQ
//! channels buffer synthetic raw readout words, triggers and calibration
//! sweeps fill them, and reads drain them. The same codecs decode the words
//! back into pixel hits.

/// Fault taxonomy types for bounds, encoding, and distribution faults.
pub mod fault;
pub use fault::{FaultClass, FaultCode};

/// Pixel address codecs for the linear RPC and raw deserializer encodings.
pub mod encoding;
pub use encoding::{
    decode_linear, decode_raw, decode_raw_with_mode, encode_linear, encode_raw, AddressMode,
    ROC_NUM_COLS, ROC_NUM_ROWS,
};

/// Decoded pixel and event records.
pub mod pixel;
pub use pixel::{Event, Pixel};

/// Raw readout frames with framing-error flags.
pub mod frame;
pub use frame::{RawFrame, FRAME_FLAG_END_ERROR, FRAME_FLAG_OVERFLOW, FRAME_FLAG_START_ERROR};

/// Word-level framing constants of the readout stream.
pub mod framing;
pub use framing::Framing;

/// Public host-facing configuration and result types.
pub mod api;
pub use api::{
    DaqRead, EmulatorConfig, TbmType, DEFAULT_CALIBRATE_PULSE_HEIGHT, DEFAULT_DAQ_CHANNELS,
    DEFAULT_FILL_LEVEL_PERCENT, DEFAULT_MAX_FRAME_WORDS, TRG_SEL_ASYNC, TRG_SEL_ASYNC_DIR,
    TRG_SEL_GEN, TRG_SEL_PG, TRG_SEL_PG_DIR, TRG_SEL_SINGLE, TRG_SEL_SINGLE_DIR, TRG_SEL_SYNC,
};

/// Chip configuration records.
pub mod config;
pub use config::{PixelConfig, RocConfig, TbmConfig};

/// Ordered chip address set.
pub mod chips;
pub use chips::ChipAddressSet;

/// DAQ channel buffers.
pub mod daq;
pub use daq::{DaqChannel, DaqChannelStore};

/// Trigger distribution, event synthesis, and sweeps.
pub mod trigger;
pub use trigger::{
    distribute_triggers, fill_raw_event, run_sweep, ChannelPlan, ChipScope, DacAxes, DacAxis,
    Distribution, EventLayout, PixelExtent, SweepSpec, SyntheticHit, FLAG_XTALK,
};

/// Stream splitting and event decoding.
pub mod decoder;
pub use decoder::{complete_frames_len, split_frames, DecodedStream, EventDecoder};

/// Session diagnostics counters.
pub mod diag;
pub use diag::DiagCounters;

/// Text rendering of pixels, events, and word dumps.
pub mod format;
pub use format::{format_event, format_pixel, format_words};

/// The emulated testboard session.
pub mod board;
pub use board::{PowerSettings, Testboard};
