use crate::{
    config::CredentialRecord,
    ports::{CredentialDecryptor, DecryptError},
};

/// Decryptor for manifests that already carry plaintext revision values.
///
/// Empty revision values are rejected so a blank entry in a manifest cannot
/// register the empty string as a credential.
#[derive(Debug, Default, Clone, Copy)]
pub struct PlaintextDecryptor;

impl CredentialDecryptor for PlaintextDecryptor {
    fn decrypt(&self, sealed: CredentialRecord) -> Result<CredentialRecord, DecryptError> {
        if let Some(index) = sealed.revisions.iter().position(|r| r.is_empty()) {
            return Err(DecryptError::Revision {
                namespace: sealed.namespace,
                name: sealed.name,
                index,
                reason: "empty value".to_string(),
            });
        }
        Ok(sealed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_passes_values_through() {
        let record = CredentialRecord {
            name: "alice".to_string(),
            namespace: "default".to_string(),
            revisions: vec!["k1".to_string()],
        };
        assert_eq!(PlaintextDecryptor.decrypt(record.clone()).unwrap(), record);
    }

    #[test]
    fn test_rejects_empty_revision() {
        let record = CredentialRecord {
            name: "alice".to_string(),
            namespace: "default".to_string(),
            revisions: vec!["k1".to_string(), String::new()],
        };
        let err = PlaintextDecryptor.decrypt(record).unwrap_err();
        assert!(err.to_string().contains("revision 1"));
    }
}
