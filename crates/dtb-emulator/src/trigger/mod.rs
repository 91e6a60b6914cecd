//! Trigger distribution across DAQ channels.
//!
//! Every trigger produces one event per active channel. Configured chips are
//! spread evenly: each active channel reads out `chips / active_channels`
//! chips (integer division). A chip count not evenly divisible by the active
//! channel count leaves the residual chips out of synthesis.

/// Single-event synthesis.
pub mod generator;
/// Parameterised calibration and DAC sweeps.
pub mod sweep;

pub use generator::{fill_raw_event, EventLayout, SyntheticHit};
pub use sweep::{run_sweep, ChipScope, DacAxes, DacAxis, PixelExtent, SweepSpec, FLAG_XTALK};

use tracing::{debug, warn};

use crate::api::TbmType;
use crate::daq::DaqChannelStore;
use crate::FaultCode;

/// Assignment of chips to the active channels for one trigger or sweep call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelPlan {
    /// Active channels in ascending order.
    pub channels: Vec<u8>,
    /// Chips read out on every active channel.
    pub rocs_per_channel: usize,
    /// Chips left out because they do not divide evenly.
    pub excluded_chips: usize,
}

impl ChannelPlan {
    /// Plans the distribution of `chips` over the store's active channels.
    ///
    /// # Errors
    ///
    /// Returns [`FaultCode::NoOpenDaqChannel`] when no channel is active.
    pub fn for_store(store: &DaqChannelStore, chips: usize) -> Result<Self, FaultCode> {
        let channels = store.active_channels();
        if channels.is_empty() {
            warn!(chips, "trigger rejected: no open daq channel");
            return Err(FaultCode::NoOpenDaqChannel);
        }

        let rocs_per_channel = chips / channels.len();
        let excluded_chips = chips - rocs_per_channel * channels.len();
        if excluded_chips != 0 {
            debug!(
                chips,
                channels = channels.len(),
                excluded_chips,
                "chip count not divisible by active channels"
            );
        }

        Ok(Self {
            channels,
            rocs_per_channel,
            excluded_chips,
        })
    }
}

/// Totals of one synthesis call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Distribution {
    /// Channel plan used.
    pub plan: ChannelPlan,
    /// Triggers sent; one event per active channel each.
    pub triggers: u64,
    /// Events appended, summed over channels.
    pub events: u64,
    /// Words appended, summed over channels.
    pub words: u64,
}

impl Distribution {
    pub(crate) const fn new(plan: ChannelPlan) -> Self {
        Self {
            plan,
            triggers: 0,
            events: 0,
            words: 0,
        }
    }

    /// Sends one trigger: appends the synthesised event to every planned
    /// channel, in channel order.
    pub(crate) fn append_to_all(
        &mut self,
        store: &mut DaqChannelStore,
        words: &[u16],
    ) -> Result<(), FaultCode> {
        self.triggers += 1;
        for &channel in &self.plan.channels {
            store.append(channel, words)?;
            self.events += 1;
            self.words += words.len() as u64;
        }
        Ok(())
    }
}

/// Synthesises `triggers` header-only events into every active channel.
///
/// Loop order is trigger, then channel ascending. The trigger index feeds the
/// TBM event counter.
///
/// # Errors
///
/// Returns [`FaultCode::NoOpenDaqChannel`] when no channel is active.
pub fn distribute_triggers(
    store: &mut DaqChannelStore,
    chips: usize,
    tbm: TbmType,
    triggers: u32,
) -> Result<Distribution, FaultCode> {
    let plan = ChannelPlan::for_store(store, chips)?;
    let rocs = plan.rocs_per_channel;
    let mut distribution = Distribution::new(plan);

    for trigger in 0..triggers {
        let frame = fill_raw_event(trigger, tbm, rocs, None)?;
        distribution.append_to_all(store, frame.words())?;
    }

    debug!(
        triggers,
        events = distribution.events,
        words = distribution.words,
        "triggers distributed"
    );
    Ok(distribution)
}

#[cfg(test)]
mod tests {
    use super::{distribute_triggers, ChannelPlan, EventLayout};
    use crate::api::TbmType;
    use crate::daq::DaqChannelStore;
    use crate::FaultCode;

    #[test]
    fn plan_requires_an_active_channel() {
        let store = DaqChannelStore::new(4);
        assert_eq!(
            ChannelPlan::for_store(&store, 3),
            Err(FaultCode::NoOpenDaqChannel)
        );
    }

    #[test]
    fn plan_truncates_residual_chips() {
        let mut store = DaqChannelStore::new(4);
        store.start(0).expect("channel 0 exists");
        store.start(1).expect("channel 1 exists");

        let plan = ChannelPlan::for_store(&store, 3).expect("two active channels");
        assert_eq!(plan.channels, vec![0, 1]);
        assert_eq!(plan.rocs_per_channel, 1);
        assert_eq!(plan.excluded_chips, 1);
    }

    #[test]
    fn five_triggers_fill_one_channel() {
        let mut store = DaqChannelStore::new(4);
        store.start(0).expect("channel 0 exists");

        let result = distribute_triggers(&mut store, 2, TbmType::None, 5).expect("channel open");

        let layout = EventLayout {
            tbm: TbmType::None,
            rocs: 2,
            hits_per_roc: 0,
        };
        assert_eq!(store.size(0), Ok(5 * layout.words() as u32));
        assert_eq!(result.triggers, 5);
        assert_eq!(result.events, 5);
    }

    #[test]
    fn inactive_channels_receive_nothing() {
        let mut store = DaqChannelStore::new(4);
        store.start(2).expect("channel 2 exists");

        distribute_triggers(&mut store, 1, TbmType::Basic, 3).expect("channel open");

        assert_eq!(store.queued(0), Ok(0));
        assert_eq!(store.queued(1), Ok(0));
        assert_eq!(store.queued(2), Ok(3 * 5));
        assert_eq!(store.queued(3), Ok(0));
    }

    #[test]
    fn triggers_without_chips_still_queue_one_event_each() {
        let mut store = DaqChannelStore::new(4);
        store.start(0).expect("channel 0 exists");
        store.start(1).expect("channel 1 exists");

        let result = distribute_triggers(&mut store, 1, TbmType::None, 5).expect("channels open");

        assert_eq!(result.plan.rocs_per_channel, 0);
        assert_eq!(result.events, 10);
        assert_eq!(result.words, 10);
        let words = store.read(0, 1000).expect("channel 0 exists").words;
        assert_eq!(words, vec![0xC7F8; 5]);
    }

    #[test]
    fn tbm_event_counter_follows_trigger_index() {
        let mut store = DaqChannelStore::new(1);
        store.start(0).expect("channel 0 exists");

        distribute_triggers(&mut store, 0, TbmType::Basic, 3).expect("channel open");

        let words = store.read(0, 1000).expect("channel 0 exists").words;
        let headers: Vec<u16> = words.iter().copied().filter(|w| w & 0xE000 == 0xA000).collect();
        assert_eq!(headers, vec![0xA000, 0xA001, 0xA002]);
    }
}
