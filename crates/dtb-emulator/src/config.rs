//! Chip configuration records handed to the board before data taking.

use std::collections::BTreeMap;

use crate::encoding::{ROC_NUM_COLS, ROC_NUM_ROWS};

/// Default trim value of a freshly configured pixel.
pub const DEFAULT_PIXEL_TRIM: u8 = 15;

/// Per-pixel configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct PixelConfig {
    /// Pixel column.
    pub column: u8,
    /// Pixel row.
    pub row: u8,
    /// Threshold trim.
    pub trim: u8,
    /// Masked pixels never report hits.
    pub mask: bool,
    /// Enabled pixels receive calibration pulses.
    pub enable: bool,
}

impl PixelConfig {
    /// Creates a masked, disabled pixel with default trim.
    #[must_use]
    pub const fn new(column: u8, row: u8) -> Self {
        Self {
            column,
            row,
            trim: DEFAULT_PIXEL_TRIM,
            mask: true,
            enable: false,
        }
    }

    /// Returns true when the address lies on the sensor grid.
    #[must_use]
    pub const fn is_on_grid(&self) -> bool {
        self.column < ROC_NUM_COLS && self.row < ROC_NUM_ROWS
    }
}

impl Default for PixelConfig {
    fn default() -> Self {
        Self::new(0, 0)
    }
}

/// Readout chip configuration.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct RocConfig {
    /// Pixel settings; pixels not listed keep their power-on state.
    pub pixels: Vec<PixelConfig>,
    /// DAC register values keyed by register number.
    pub dacs: BTreeMap<u8, u8>,
    /// Chip type code.
    pub chip_type: u8,
    /// I2C address on the module.
    pub i2c_address: u8,
    /// Disabled chips are skipped during programming.
    pub enable: bool,
}

impl RocConfig {
    /// Creates an enabled chip at `i2c_address` with no pixel or DAC settings.
    #[must_use]
    pub const fn new(i2c_address: u8) -> Self {
        Self {
            pixels: Vec::new(),
            dacs: BTreeMap::new(),
            chip_type: 0,
            i2c_address,
            enable: true,
        }
    }

    /// Pixels flagged for calibration pulses.
    pub fn enabled_pixels(&self) -> impl Iterator<Item = &PixelConfig> {
        self.pixels.iter().filter(|px| px.enable && px.is_on_grid())
    }
}

/// Token bit manager configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct TbmConfig {
    /// Register values keyed by register number.
    pub dacs: BTreeMap<u8, u8>,
    /// TBM type code.
    pub tbm_type: u8,
    /// Disabled TBMs are skipped during programming.
    pub enable: bool,
}

impl Default for TbmConfig {
    fn default() -> Self {
        Self {
            dacs: BTreeMap::new(),
            tbm_type: 0,
            enable: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{PixelConfig, RocConfig, TbmConfig, DEFAULT_PIXEL_TRIM};

    #[test]
    fn new_pixel_is_masked_and_disabled() {
        let px = PixelConfig::new(3, 4);
        assert_eq!(px.trim, DEFAULT_PIXEL_TRIM);
        assert!(px.mask);
        assert!(!px.enable);
    }

    #[test]
    fn chips_and_tbms_default_to_enabled() {
        assert!(RocConfig::new(7).enable);
        assert!(TbmConfig::default().enable);
    }

    #[test]
    fn enabled_pixels_skip_off_grid_entries() {
        let mut roc = RocConfig::new(0);
        roc.pixels.push(PixelConfig {
            enable: true,
            ..PixelConfig::new(1, 1)
        });
        roc.pixels.push(PixelConfig {
            enable: true,
            ..PixelConfig::new(52, 1)
        });
        roc.pixels.push(PixelConfig::new(2, 2));
        let enabled: Vec<_> = roc.enabled_pixels().map(|px| (px.column, px.row)).collect();
        assert_eq!(enabled, vec![(1, 1)]);
    }
}
