/// Ordered set of chip (I2C) addresses seen during a session.
///
/// First-seen order is preserved and duplicates are suppressed; the order
/// decides which chips land on which DAQ channel.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct ChipAddressSet {
    addresses: Vec<u8>,
}

impl ChipAddressSet {
    /// Creates an empty set.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            addresses: Vec::new(),
        }
    }

    /// Adds `address` unless already present. Returns true if it was new.
    pub fn insert(&mut self, address: u8) -> bool {
        if self.addresses.contains(&address) {
            return false;
        }
        self.addresses.push(address);
        true
    }

    /// Number of distinct addresses.
    #[must_use]
    pub fn len(&self) -> usize {
        self.addresses.len()
    }

    /// Returns true when no address has been recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.addresses.is_empty()
    }

    /// Addresses in first-seen order.
    #[must_use]
    pub fn as_slice(&self) -> &[u8] {
        &self.addresses
    }

    /// Forgets every address.
    pub fn clear(&mut self) {
        self.addresses.clear();
    }
}

impl FromIterator<u8> for ChipAddressSet {
    fn from_iter<T: IntoIterator<Item = u8>>(iter: T) -> Self {
        let mut set = Self::new();
        for address in iter {
            set.insert(address);
        }
        set
    }
}
