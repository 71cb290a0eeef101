use thiserror::Error;

use crate::config::models::CredentialRecord;

/// Error type for credential decryption
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum DecryptError {
    /// A revision value could not be decrypted
    #[error("cannot decrypt revision {index} of credential {namespace}/{name}: {reason}")]
    Revision {
        namespace: String,
        name: String,
        index: usize,
        reason: String,
    },
}

/// CredentialDecryptor defines the port that turns sealed credential
/// revisions into the plaintext values the credential store is keyed by.
///
/// The stores never see ciphertext; decryption happens before a record is
/// handed to them.
pub trait CredentialDecryptor: Send + Sync + 'static {
    /// Return `sealed` with every revision value decrypted.
    fn decrypt(&self, sealed: CredentialRecord) -> Result<CredentialRecord, DecryptError>;
}
