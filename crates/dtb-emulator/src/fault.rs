use thiserror::Error;

/// Fault classes used for diagnostics aggregation and propagation policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum FaultClass {
    /// Channel, frame, or queue index outside the valid range.
    Bounds,
    /// Pixel address or address mode the codec cannot represent.
    Encoding,
    /// Trigger distribution could not be performed.
    Distribution,
}

/// Stable fault taxonomy for the protocol engine.
///
/// The numeric values are reported as the RPC status byte and must not change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Error)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
#[repr(u8)]
pub enum FaultCode {
    /// DAQ channel index is not below the configured channel count.
    #[error("daq channel index out of range")]
    ChannelOutOfRange = 0x01,
    /// Raw frame index is not below the accumulated word count.
    #[error("raw frame index out of range")]
    FrameIndexOutOfRange = 0x02,
    /// Pixel column, row, or value does not fit the raw-link encoding.
    #[error("pixel address outside the sensor grid")]
    PixelOutOfRange = 0x03,
    /// Raw decoding was requested for the inverted-address link variant.
    #[error("unsupported address mode")]
    UnsupportedAddressMode = 0x04,
    /// A trigger or sweep arrived while no DAQ channel was active.
    #[error("no open daq channel")]
    NoOpenDaqChannel = 0x05,
    /// Sweep descriptor has an empty or malformed iteration range.
    #[error("invalid sweep range")]
    InvalidSweep = 0x06,
}

impl FaultCode {
    /// Converts a fault code to the stable status byte.
    #[must_use]
    pub const fn as_u8(self) -> u8 {
        self as u8
    }

    /// Converts a stable status byte back into a fault code.
    #[must_use]
    pub const fn from_u8(code: u8) -> Option<Self> {
        match code {
            0x01 => Some(Self::ChannelOutOfRange),
            0x02 => Some(Self::FrameIndexOutOfRange),
            0x03 => Some(Self::PixelOutOfRange),
            0x04 => Some(Self::UnsupportedAddressMode),
            0x05 => Some(Self::NoOpenDaqChannel),
            0x06 => Some(Self::InvalidSweep),
            _ => None,
        }
    }

    /// Returns the diagnostics fault class for this fault code.
    #[must_use]
    pub const fn class(self) -> FaultClass {
        match self {
            Self::ChannelOutOfRange | Self::FrameIndexOutOfRange => FaultClass::Bounds,
            Self::PixelOutOfRange | Self::UnsupportedAddressMode => FaultClass::Encoding,
            Self::NoOpenDaqChannel | Self::InvalidSweep => FaultClass::Distribution,
        }
    }

    /// Caller protocol violations that must abort the session instead of being
    /// reported back as a status value.
    #[must_use]
    pub const fn is_fatal(self) -> bool {
        matches!(self.class(), FaultClass::Bounds | FaultClass::Encoding)
    }
}
