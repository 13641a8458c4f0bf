use anyhow::{Context, Result};
use keyring::Entry;

const SERVICE_NAME: &str = "followwatch";

/// API tokens for the fetch backends, kept in the OS keychain under the
/// `followwatch` service with one entry per backend.
pub struct CredentialStore;

impl CredentialStore {
    fn entry(backend: &str) -> Result<Entry> {
        Entry::new(SERVICE_NAME, backend)
            .with_context(|| format!("Keychain unavailable for the {} token", backend))
    }

    pub fn save_token(backend: &str, token: &str) -> Result<()> {
        Self::entry(backend)?
            .set_password(token)
            .with_context(|| format!("Failed to save the {} token", backend))
    }

    /// `None` when no token was ever saved for `backend`.
    pub fn load_token(backend: &str) -> Result<Option<String>> {
        match Self::entry(backend)?.get_password() {
            Ok(token) => Ok(Some(token)),
            Err(keyring::Error::NoEntry) => Ok(None),
            Err(e) => Err(e).with_context(|| format!("Failed to read the {} token", backend)),
        }
    }

    /// Forget the token for `backend`. Forgetting a missing token is not an error.
    pub fn remove_token(backend: &str) -> Result<()> {
        match Self::entry(backend)?.delete_credential() {
            Ok(()) | Err(keyring::Error::NoEntry) => Ok(()),
            Err(e) => Err(e).with_context(|| format!("Failed to remove the {} token", backend)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_token_is_none() {
        let backend = "followwatch-test-never-saved";
        assert_eq!(CredentialStore::load_token(backend).unwrap(), None);
        CredentialStore::remove_token(backend).unwrap();
    }
}
