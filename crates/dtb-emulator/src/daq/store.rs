use tracing::warn;

use crate::api::DaqRead;
use crate::daq::DaqChannel;
use crate::FaultCode;

/// Fixed-size set of DAQ channels owned by one emulator session.
///
/// Every operation except [`DaqChannelStore::open`] treats an out-of-range
/// channel index as a fatal [`FaultCode::ChannelOutOfRange`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DaqChannelStore {
    channels: Vec<DaqChannel>,
}

impl DaqChannelStore {
    /// Creates `count` closed, empty channels.
    #[must_use]
    pub fn new(count: u8) -> Self {
        Self {
            channels: vec![DaqChannel::default(); usize::from(count)],
        }
    }

    /// Number of channels; valid indices are `0..channel_count()`.
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub fn channel_count(&self) -> u8 {
        self.channels.len() as u8
    }

    fn channel(&self, channel: u8) -> Result<&DaqChannel, FaultCode> {
        self.channels
            .get(usize::from(channel))
            .ok_or(FaultCode::ChannelOutOfRange)
    }

    fn channel_mut(&mut self, channel: u8) -> Result<&mut DaqChannel, FaultCode> {
        self.channels
            .get_mut(usize::from(channel))
            .ok_or(FaultCode::ChannelOutOfRange)
    }

    /// Reserves queue space for `buffer_bytes / 2` words.
    ///
    /// Returns the resulting capacity in words, or `0` when `channel` is not a
    /// configured channel. The reservation is advisory; queues grow past it.
    pub fn open(&mut self, channel: u8, buffer_bytes: u32) -> u32 {
        let count = self.channel_count();
        let Ok(slot) = self.channel_mut(channel) else {
            warn!(channel, count, "daq open rejected: channel out of range");
            return 0;
        };

        let words = usize::try_from(buffer_bytes / 2).unwrap_or(usize::MAX);
        slot.reserve_total(words);
        u32::try_from(slot.capacity()).unwrap_or(u32::MAX)
    }

    /// Empties the channel queue and marks it inactive.
    ///
    /// # Errors
    ///
    /// Returns [`FaultCode::ChannelOutOfRange`] for an unknown channel.
    pub fn close(&mut self, channel: u8) -> Result<(), FaultCode> {
        self.channel_mut(channel)?.close();
        Ok(())
    }

    /// Marks the channel active.
    ///
    /// # Errors
    ///
    /// Returns [`FaultCode::ChannelOutOfRange`] for an unknown channel.
    pub fn start(&mut self, channel: u8) -> Result<(), FaultCode> {
        self.channel_mut(channel)?.set_active(true);
        Ok(())
    }

    /// Marks the channel inactive; buffered words are kept.
    ///
    /// # Errors
    ///
    /// Returns [`FaultCode::ChannelOutOfRange`] for an unknown channel.
    pub fn stop(&mut self, channel: u8) -> Result<(), FaultCode> {
        self.channel_mut(channel)?.set_active(false);
        Ok(())
    }

    /// Returns whether the channel is active.
    ///
    /// # Errors
    ///
    /// Returns [`FaultCode::ChannelOutOfRange`] for an unknown channel.
    pub fn is_active(&self, channel: u8) -> Result<bool, FaultCode> {
        Ok(self.channel(channel)?.is_active())
    }

    /// Queued word count of an active channel; an inactive channel reports 0.
    ///
    /// # Errors
    ///
    /// Returns [`FaultCode::ChannelOutOfRange`] for an unknown channel.
    pub fn size(&self, channel: u8) -> Result<u32, FaultCode> {
        let slot = self.channel(channel)?;
        if !slot.is_active() {
            return Ok(0);
        }
        Ok(u32::try_from(slot.queued()).unwrap_or(u32::MAX))
    }

    /// Queued word count regardless of the activity flag.
    ///
    /// # Errors
    ///
    /// Returns [`FaultCode::ChannelOutOfRange`] for an unknown channel.
    pub fn queued(&self, channel: u8) -> Result<usize, FaultCode> {
        Ok(self.channel(channel)?.queued())
    }

    /// Drains up to `max_bytes / 2` words from the front of an active channel.
    ///
    /// Odd byte counts drop the trailing half word. An inactive channel yields
    /// no words and `available == 0`.
    ///
    /// # Errors
    ///
    /// Returns [`FaultCode::ChannelOutOfRange`] for an unknown channel.
    pub fn read(&mut self, channel: u8, max_bytes: u32) -> Result<DaqRead, FaultCode> {
        let slot = self.channel_mut(channel)?;
        if !slot.is_active() {
            return Ok(DaqRead::default());
        }

        let want = usize::try_from(max_bytes / 2).unwrap_or(usize::MAX);
        let words = slot.drain_front(want);
        let available = u32::try_from(slot.queued()).unwrap_or(u32::MAX);
        Ok(DaqRead { words, available })
    }

    /// Appends synthesised words to a channel queue.
    ///
    /// # Errors
    ///
    /// Returns [`FaultCode::ChannelOutOfRange`] for an unknown channel.
    pub fn append(&mut self, channel: u8, words: &[u16]) -> Result<(), FaultCode> {
        self.channel_mut(channel)?.extend_from_slice(words);
        Ok(())
    }

    /// Indices of active channels in ascending order.
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub fn active_channels(&self) -> Vec<u8> {
        self.channels
            .iter()
            .enumerate()
            .filter(|(_, slot)| slot.is_active())
            .map(|(index, _)| index as u8)
            .collect()
    }
}
