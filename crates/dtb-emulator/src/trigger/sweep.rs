//! Calibration and DAC scan sweeps.
//!
//! All scan RPC variants reduce to one [`SweepSpec`]: which chips take part,
//! which pixels are pulsed, and how many DAC axes are scanned. The iteration
//! order is column, row, first DAC, second DAC, trigger, channel; downstream
//! event counting relies on it.

use tracing::debug;

use crate::api::TbmType;
use crate::daq::DaqChannelStore;
use crate::encoding::{ROC_NUM_COLS, ROC_NUM_ROWS};
use crate::trigger::{fill_raw_event, ChannelPlan, Distribution, SyntheticHit};
use crate::FaultCode;

/// Calibration flag: pulse the neighbouring row to measure crosstalk.
pub const FLAG_XTALK: u16 = 0x0004;

/// Chips taking part in a sweep.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum ChipScope {
    /// One chip addressed by I2C address.
    Single(u8),
    /// An ordered list of chip I2C addresses.
    Multi(Vec<u8>),
}

impl ChipScope {
    /// Addresses of the participating chips.
    #[must_use]
    pub fn addresses(&self) -> &[u8] {
        match self {
            Self::Single(address) => std::slice::from_ref(address),
            Self::Multi(addresses) => addresses,
        }
    }
}

/// Pixels pulsed during a sweep.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum PixelExtent {
    /// Every pixel of the 52 x 80 grid, column-major.
    AllPixels,
    /// A single pixel.
    OnePixel {
        /// Pixel column.
        column: u8,
        /// Pixel row.
        row: u8,
    },
}

/// One scanned DAC register and its inclusive range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct DacAxis {
    /// DAC register number.
    pub register: u8,
    /// First value.
    pub min: u8,
    /// Last value, inclusive.
    pub max: u8,
    /// Increment between values.
    pub step: u8,
}

impl DacAxis {
    /// Creates an axis with unit step.
    #[must_use]
    pub const fn new(register: u8, min: u8, max: u8) -> Self {
        Self {
            register,
            min,
            max,
            step: 1,
        }
    }

    /// Values visited by the axis, ascending.
    ///
    /// # Errors
    ///
    /// Returns [`FaultCode::InvalidSweep`] for a zero step or `min > max`.
    pub fn values(&self) -> Result<Vec<u8>, FaultCode> {
        if self.step == 0 || self.min > self.max {
            return Err(FaultCode::InvalidSweep);
        }
        Ok((self.min..=self.max).step_by(usize::from(self.step)).collect())
    }
}

/// Scanned DAC dimensions of a sweep.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum DacAxes {
    /// Calibration only.
    None,
    /// One DAC scanned.
    One(DacAxis),
    /// Two DACs scanned, the second nested inside the first.
    Two(DacAxis, DacAxis),
}

/// Complete description of one calibration or scan loop.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct SweepSpec {
    /// Participating chips.
    pub scope: ChipScope,
    /// Pulsed pixels.
    pub extent: PixelExtent,
    /// Scanned DACs.
    pub dacs: DacAxes,
    /// Triggers sent per sweep point.
    pub triggers: u16,
    /// Calibration flags.
    pub flags: u16,
}

impl SweepSpec {
    /// Full-grid calibration of a chip list, no DAC axis.
    #[must_use]
    pub const fn calibrate_all(chips: Vec<u8>, triggers: u16, flags: u16) -> Self {
        Self {
            scope: ChipScope::Multi(chips),
            extent: PixelExtent::AllPixels,
            dacs: DacAxes::None,
            triggers,
            flags,
        }
    }

    fn pixels(&self) -> Result<Vec<(u8, u8)>, FaultCode> {
        match self.extent {
            PixelExtent::AllPixels => Ok((0..ROC_NUM_COLS)
                .flat_map(|column| (0..ROC_NUM_ROWS).map(move |row| (column, row)))
                .collect()),
            PixelExtent::OnePixel { column, row } => {
                if column >= ROC_NUM_COLS || row >= ROC_NUM_ROWS {
                    return Err(FaultCode::InvalidSweep);
                }
                Ok(vec![(column, row)])
            }
        }
    }

    /// Sweep points of the DAC axes: `(first, second)` values, second innermost.
    fn dac_points(&self) -> Result<Vec<(Option<u8>, Option<u8>)>, FaultCode> {
        match self.dacs {
            DacAxes::None => Ok(vec![(None, None)]),
            DacAxes::One(axis) => Ok(axis.values()?.into_iter().map(|v| (Some(v), None)).collect()),
            DacAxes::Two(outer, inner) => {
                let inner_values = inner.values()?;
                Ok(outer
                    .values()?
                    .into_iter()
                    .flat_map(|o| inner_values.iter().map(move |&i| (Some(o), Some(i))))
                    .collect())
            }
        }
    }

    /// Number of events appended per active channel.
    ///
    /// # Errors
    ///
    /// Returns [`FaultCode::InvalidSweep`] for a malformed pixel or DAC range.
    pub fn events_per_channel(&self) -> Result<u64, FaultCode> {
        let pixels = self.pixels()?.len() as u64;
        let points = self.dac_points()?.len() as u64;
        Ok(pixels * points * u64::from(self.triggers))
    }
}

/// Row pulsed for `row` under the crosstalk flag: the neighbour above, or
/// below on the last row.
const fn crosstalk_row(row: u8) -> u8 {
    if row + 1 < ROC_NUM_ROWS {
        row + 1
    } else {
        row - 1
    }
}

/// Runs a sweep and appends its events to every active channel.
///
/// Each event carries one hit per chip at the swept pixel. The hit value is
/// the first DAC axis value when present, else `pulse_height`. The second DAC
/// axis only multiplies the event count: events of different inner values are
/// identical apart from the TBM event counter.
///
/// # Errors
///
/// Returns [`FaultCode::NoOpenDaqChannel`] when no channel is active and
/// [`FaultCode::InvalidSweep`] for a malformed pixel or DAC range.
pub fn run_sweep(
    store: &mut DaqChannelStore,
    spec: &SweepSpec,
    tbm: TbmType,
    pulse_height: i32,
) -> Result<Distribution, FaultCode> {
    let plan = ChannelPlan::for_store(store, spec.scope.addresses().len())?;
    let pixels = spec.pixels()?;
    let dac_points = spec.dac_points()?;
    let rocs = plan.rocs_per_channel;
    let mut distribution = Distribution::new(plan);

    let mut event = 0u32;
    for &(column, row) in &pixels {
        let row = if spec.flags & FLAG_XTALK != 0 {
            crosstalk_row(row)
        } else {
            row
        };
        for &(dac1, _) in &dac_points {
            let hit = SyntheticHit {
                column,
                row,
                value: dac1.map_or(pulse_height, i32::from),
            };
            for _ in 0..spec.triggers {
                let frame = fill_raw_event(event, tbm, rocs, Some(hit))?;
                distribution.append_to_all(store, frame.words())?;
                event = event.wrapping_add(1);
            }
        }
    }

    debug!(
        pixels = pixels.len(),
        dac_points = dac_points.len(),
        triggers = spec.triggers,
        events = distribution.events,
        words = distribution.words,
        "sweep finished"
    );
    Ok(distribution)
}
