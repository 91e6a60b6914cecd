//! Raw event frames as produced by the deserializer.

use crate::FaultCode;

/// Flag bit: first word of the frame did not carry a start marker.
pub const FRAME_FLAG_START_ERROR: u8 = 0x01;
/// Flag bit: frame ended without an end marker.
pub const FRAME_FLAG_END_ERROR: u8 = 0x02;
/// Flag bit: frame exceeded the deserializer buffer.
pub const FRAME_FLAG_OVERFLOW: u8 = 0x04;

/// Undecoded 16-bit words of one raw event plus framing-error flags.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct RawFrame {
    data: Vec<u16>,
    flags: u8,
}

impl RawFrame {
    /// Creates an empty frame with all flags cleared.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            data: Vec::new(),
            flags: 0,
        }
    }

    /// Marks the frame as having a misaligned start.
    pub fn set_start_error(&mut self) {
        self.flags |= FRAME_FLAG_START_ERROR;
    }

    /// Marks the frame as missing its end marker.
    pub fn set_end_error(&mut self) {
        self.flags |= FRAME_FLAG_END_ERROR;
    }

    /// Marks the frame as overflowed.
    pub fn set_overflow(&mut self) {
        self.flags |= FRAME_FLAG_OVERFLOW;
    }

    /// Clears the start-error flag.
    pub fn reset_start_error(&mut self) {
        self.flags &= !FRAME_FLAG_START_ERROR;
    }

    /// Clears the end-error flag.
    pub fn reset_end_error(&mut self) {
        self.flags &= !FRAME_FLAG_END_ERROR;
    }

    /// Clears the overflow flag.
    pub fn reset_overflow(&mut self) {
        self.flags &= !FRAME_FLAG_OVERFLOW;
    }

    /// Returns true if the start-error flag is set.
    #[must_use]
    pub const fn is_start_error(&self) -> bool {
        self.flags & FRAME_FLAG_START_ERROR != 0
    }

    /// Returns true if the end-error flag is set.
    #[must_use]
    pub const fn is_end_error(&self) -> bool {
        self.flags & FRAME_FLAG_END_ERROR != 0
    }

    /// Returns true if the overflow flag is set.
    #[must_use]
    pub const fn is_overflow(&self) -> bool {
        self.flags & FRAME_FLAG_OVERFLOW != 0
    }

    /// Returns the raw flag bits.
    #[must_use]
    pub const fn flags(&self) -> u8 {
        self.flags
    }

    /// Appends one data word.
    pub fn push(&mut self, word: u16) {
        self.data.push(word);
    }

    /// Number of accumulated words.
    #[must_use]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Returns true when no words have been accumulated.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Returns the word at `index`.
    ///
    /// # Errors
    ///
    /// Returns [`FaultCode::FrameIndexOutOfRange`] when `index >= len()`.
    pub fn get(&self, index: usize) -> Result<u16, FaultCode> {
        self.data
            .get(index)
            .copied()
            .ok_or(FaultCode::FrameIndexOutOfRange)
    }

    /// Accumulated words in arrival order.
    #[must_use]
    pub fn words(&self) -> &[u16] {
        &self.data
    }

    /// Empties the word buffer and clears every flag.
    pub fn clear(&mut self) {
        self.data.clear();
        self.flags = 0;
    }
}

impl Extend<u16> for RawFrame {
    fn extend<T: IntoIterator<Item = u16>>(&mut self, iter: T) {
        self.data.extend(iter);
    }
}
