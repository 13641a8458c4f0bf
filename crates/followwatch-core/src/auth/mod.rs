//! Credential handling for the fetch backends.
//!
//! The Apify token is taken from the `APIFY_TOKEN` environment variable when
//! set, otherwise from the OS keychain via `CredentialStore`.

pub mod credentials;

use tracing::warn;

pub use credentials::CredentialStore;

/// Environment variable holding the Apify API token.
pub const APIFY_TOKEN_ENV: &str = "APIFY_TOKEN";

/// Keychain account under which the Apify token is stored.
pub const APIFY_ACCOUNT: &str = "apify";

/// Find the Apify token, preferring the environment over the keychain.
pub fn resolve_apify_token() -> Option<String> {
    if let Some(token) = non_blank(std::env::var(APIFY_TOKEN_ENV).ok()) {
        return Some(token);
    }

    match CredentialStore::load_token(APIFY_ACCOUNT) {
        Ok(token) => non_blank(token),
        Err(e) => {
            warn!(error = %e, "Could not read Apify token from keychain");
            None
        }
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_non_blank_token() {
        assert_eq!(non_blank(Some(" abc \n".into())), Some("abc".to_string()));
        assert_eq!(non_blank(Some("   ".into())), None);
        assert_eq!(non_blank(None), None);
    }
}
