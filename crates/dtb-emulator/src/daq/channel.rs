use std::collections::VecDeque;

/// One DAQ channel: an activity flag and a FIFO of 16-bit words.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DaqChannel {
    active: bool,
    queue: VecDeque<u16>,
}

impl DaqChannel {
    /// Returns true while the channel is started.
    #[must_use]
    pub const fn is_active(&self) -> bool {
        self.active
    }

    /// Sets the activity flag without touching buffered data.
    pub fn set_active(&mut self, active: bool) {
        self.active = active;
    }

    /// Number of queued words, regardless of the activity flag.
    #[must_use]
    pub fn queued(&self) -> usize {
        self.queue.len()
    }

    /// Allocated queue capacity in words.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.queue.capacity()
    }

    /// Ensures room for at least `words` queued words in total.
    pub fn reserve_total(&mut self, words: usize) {
        let additional = words.saturating_sub(self.queue.len());
        self.queue.reserve(additional);
    }

    /// Appends words at the back of the queue.
    pub fn extend_from_slice(&mut self, words: &[u16]) {
        self.queue.extend(words.iter().copied());
    }

    /// Removes up to `max_words` words from the front of the queue.
    pub fn drain_front(&mut self, max_words: usize) -> Vec<u16> {
        let take = max_words.min(self.queue.len());
        self.queue.drain(..take).collect()
    }

    /// Empties the queue and clears the activity flag.
    pub fn close(&mut self) {
        self.queue.clear();
        self.active = false;
    }
}

#[cfg(test)]
mod tests {
    use super::DaqChannel;

    #[test]
    fn drain_front_preserves_fifo_order() {
        let mut channel = DaqChannel::default();
        channel.extend_from_slice(&[1, 2, 3, 4, 5]);

        assert_eq!(channel.drain_front(2), vec![1, 2]);
        assert_eq!(channel.drain_front(10), vec![3, 4, 5]);
        assert_eq!(channel.queued(), 0);
    }

    #[test]
    fn reserve_total_is_advisory() {
        let mut channel = DaqChannel::default();
        channel.reserve_total(500);
        assert!(channel.capacity() >= 500);

        channel.extend_from_slice(&vec![0xAAAA; 600]);
        assert_eq!(channel.queued(), 600);
    }

    #[test]
    fn close_empties_and_deactivates() {
        let mut channel = DaqChannel::default();
        channel.set_active(true);
        channel.extend_from_slice(&[7, 8]);

        channel.close();

        assert!(!channel.is_active());
        assert_eq!(channel.queued(), 0);
    }
}
