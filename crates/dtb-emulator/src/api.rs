//! Public host-facing configuration and result types.

/// Default number of DAQ channels on the emulated board.
pub const DEFAULT_DAQ_CHANNELS: u8 = 4;

/// Fill level reported by the emulated DAQ, in percent.
pub const DEFAULT_FILL_LEVEL_PERCENT: u8 = 30;

/// Default upper bound on words accepted into one raw frame by the splitter.
pub const DEFAULT_MAX_FRAME_WORDS: usize = 4096;

/// Pulse height carried by synthesised calibration hits without a DAC axis.
pub const DEFAULT_CALIBRATE_PULSE_HEIGHT: i32 = 100;

/// Trigger source: asynchronous external trigger.
pub const TRG_SEL_ASYNC: u16 = 0x0800;
/// Trigger source: synchronous external trigger.
pub const TRG_SEL_SYNC: u16 = 0x0400;
/// Trigger source: single software trigger.
pub const TRG_SEL_SINGLE: u16 = 0x0200;
/// Trigger source: internal trigger generator.
pub const TRG_SEL_GEN: u16 = 0x0100;
/// Trigger source: pattern generator.
pub const TRG_SEL_PG: u16 = 0x0080;
/// Trigger source: asynchronous trigger routed directly to the chips.
pub const TRG_SEL_ASYNC_DIR: u16 = 0x0040;
/// Trigger source: pattern generator routed directly to the chips.
pub const TRG_SEL_PG_DIR: u16 = 0x0020;
/// Trigger source: single trigger routed directly to the chips.
pub const TRG_SEL_SINGLE_DIR: u16 = 0x0010;

/// Sources in this mask are delivered through the TBM emulator.
pub const TRG_SEL_TBM_EMU_MASK: u16 = 0x00F0;

/// Header-framing device in front of the readout chips.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum TbmType {
    /// No TBM: chips are read out directly, frames delimited by marker bits.
    #[default]
    None,
    /// A physical TBM framing events with header and trailer words.
    Basic,
    /// The board's TBM emulator framing events on the 400 Mbps link.
    Emulated,
}

impl TbmType {
    /// Returns true when events carry TBM header and trailer words.
    #[must_use]
    pub const fn has_tbm_framing(self) -> bool {
        matches!(self, Self::Basic | Self::Emulated)
    }

    /// Data-id byte written into the second TBM header word.
    #[must_use]
    pub const fn header_data_id(self) -> u8 {
        match self {
            Self::None | Self::Basic => 0x00,
            Self::Emulated => 0x80,
        }
    }

    /// TBM type in effect after a trigger-source selection.
    ///
    /// Sources routed through the TBM emulator switch to [`TbmType::Emulated`];
    /// every other selection leaves the current type untouched.
    #[must_use]
    pub const fn after_trigger_select(self, source: u16) -> Self {
        if source & TRG_SEL_TBM_EMU_MASK != 0 || source == TRG_SEL_GEN {
            Self::Emulated
        } else {
            self
        }
    }
}

/// Top-level configuration for one emulator session.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct EmulatorConfig {
    /// Number of DAQ channels; valid channel indices are `0..daq_channels`.
    pub daq_channels: u8,
    /// TBM type at construction.
    pub initial_tbm: TbmType,
    /// Constant reported by the fill-level query.
    pub fill_level_percent: u8,
    /// Words accepted into one frame before the splitter flags an overflow.
    pub max_frame_words: usize,
    /// Pulse height of calibration hits when no DAC axis is swept.
    pub calibrate_pulse_height: i32,
}

impl Default for EmulatorConfig {
    fn default() -> Self {
        Self {
            daq_channels: DEFAULT_DAQ_CHANNELS,
            initial_tbm: TbmType::None,
            fill_level_percent: DEFAULT_FILL_LEVEL_PERCENT,
            max_frame_words: DEFAULT_MAX_FRAME_WORDS,
            calibrate_pulse_height: DEFAULT_CALIBRATE_PULSE_HEIGHT,
        }
    }
}

/// Result of draining a DAQ channel.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DaqRead {
    /// Words removed from the front of the channel queue, FIFO order.
    pub words: Vec<u16>,
    /// Words still queued after this read.
    pub available: u32,
}
