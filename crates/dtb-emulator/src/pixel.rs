//! Decoded pixel hits and events.

use crate::encoding::{decode_linear, decode_raw};

/// One decoded pixel hit.
///
/// Fields hold whatever the decoder extracted; values outside the sensor grid
/// are representable on purpose.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct Pixel {
    /// Readout chip identifier (4-bit range).
    pub roc_id: u8,
    /// Pixel column (6-bit range).
    pub column: u8,
    /// Pixel row (7-bit range).
    pub row: u8,
    /// Pulse height or accumulated signal value.
    pub value: i32,
}

impl Pixel {
    /// Creates a pixel from explicit fields.
    #[must_use]
    pub const fn new(roc_id: u8, column: u8, row: u8, value: i32) -> Self {
        Self {
            roc_id,
            column,
            row,
            value,
        }
    }

    /// Creates a pixel from a linear RPC address and its separately carried value.
    #[must_use]
    pub const fn from_linear(address: u32, value: i32) -> Self {
        decode_linear(address, value)
    }

    /// Creates a pixel from a raw deserializer word, tagging it with `roc_id`.
    #[must_use]
    pub const fn from_raw(raw: u32, roc_id: u8) -> Self {
        let mut px = decode_raw(raw);
        px.roc_id = roc_id;
        px
    }
}

/// One readout event: a 16-bit header and the pixels of its frame in arrival order.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct Event {
    /// Event header word.
    pub header: u16,
    /// Pixel hits in arrival order.
    pub pixels: Vec<Pixel>,
}

impl Event {
    /// Creates an event without pixels.
    #[must_use]
    pub const fn new(header: u16) -> Self {
        Self {
            header,
            pixels: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{Event, Pixel};

    #[test]
    fn from_raw_keeps_caller_chip_id() {
        let px = Pixel::from_raw(0, 7);
        assert_eq!(px, Pixel::new(7, 0, 80, 0));
    }

    #[test]
    fn from_linear_passes_value_through() {
        let px = Pixel::from_linear(0x0003_0105, -12);
        assert_eq!(px, Pixel::new(3, 1, 5, -12));
    }

    #[test]
    fn new_event_is_empty() {
        let event = Event::new(0xA0FF);
        assert_eq!(event.header, 0xA0FF);
        assert!(event.pixels.is_empty());
    }
}
