//! DAQ channel state and the operations that manage it.

/// Per-channel queue and activity flag.
pub mod channel;
/// Fixed-size channel store with open/close/start/stop/read semantics.
pub mod store;

pub use channel::DaqChannel;
pub use store::DaqChannelStore;
