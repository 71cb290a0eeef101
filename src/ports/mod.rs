pub mod credential_decryptor;
pub mod resource_source;
pub mod traffic_publisher;

pub use credential_decryptor::{CredentialDecryptor, DecryptError};
pub use resource_source::ResourceSource;
pub use traffic_publisher::TrafficPublisher;
