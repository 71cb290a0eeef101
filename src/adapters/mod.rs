pub mod decryptor;
pub mod event_applier;
pub mod file_source;
pub mod traffic;

/// Re-export commonly used types from adapters
pub use decryptor::PlaintextDecryptor;
pub use event_applier::ResourceEventApplier;
pub use file_source::FileResourceSource;
pub use traffic::{ChannelTrafficPublisher, DirectTrafficPublisher, run_traffic_sink};
