//! Token storage and client-side expiry checking.
//!
//! The stored token lives in the config file, one per OS user. The expiry
//! check here is a local hint only: the backend verifies the signature on
//! every request, and its 401 stays authoritative (see `api`).

use anyhow::Result;
use chrono::Utc;
use jsonwebtoken::{Algorithm, DecodingKey, Validation};
use serde::Deserialize;
use std::path::PathBuf;

use crate::config::Config;

#[derive(Debug, Deserialize)]
struct Claims {
    exp: i64,
}

/// Read/write access to the persisted bearer token.
#[derive(Debug, Clone)]
pub struct CredentialStore {
    config_path: PathBuf,
}

impl CredentialStore {
    pub fn new(config_path: PathBuf) -> Self {
        Self { config_path }
    }

    pub fn open_default() -> Result<Self> {
        Ok(Self::new(Config::config_path()?))
    }

    /// Persist a token, overwriting any prior value.
    pub fn set(&self, token: &str) -> Result<()> {
        let mut config = Config::load_from(&self.config_path)?;
        config.remote.token = Some(token.to_string());
        config.save_to(&self.config_path)
    }

    /// The stored token, if any. No validation of its content.
    pub fn get(&self) -> Option<String> {
        Config::load_from(&self.config_path)
            .ok()
            .and_then(|config| config.remote.token)
    }

    /// Remove any stored token.
    pub fn clear(&self) -> Result<()> {
        let mut config = Config::load_from(&self.config_path)?;
        if config.remote.token.take().is_some() {
            config.save_to(&self.config_path)?;
        }
        Ok(())
    }
}

/// Extract the `exp` claim without verifying the signature.
fn token_expiry(token: &str) -> Option<i64> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.insecure_disable_signature_validation();
    validation.validate_exp = false;
    validation.required_spec_claims.clear();

    jsonwebtoken::decode::<Claims>(token, &DecodingKey::from_secret(&[]), &validation)
        .ok()
        .map(|data| data.claims.exp)
}

/// True while the expiry instant is strictly in the future.
fn token_is_current(token: &str) -> bool {
    match token_expiry(token) {
        Some(exp) => Utc::now().timestamp() < exp,
        None => false,
    }
}

/// Returns the stored token when it decodes and has not expired; otherwise
/// clears the store and returns `None`.
pub fn usable_token(store: &CredentialStore) -> Option<String> {
    let token = store.get()?;
    if token_is_current(&token) {
        return Some(token);
    }
    tracing::debug!("stored token expired or malformed, clearing");
    if let Err(e) = store.clear() {
        tracing::warn!("failed to clear stale token: {e}");
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use jsonwebtoken::{encode, EncodingKey, Header};
    use serde::Serialize;

    #[derive(Serialize)]
    struct TestClaims {
        sub: String,
        exp: i64,
    }

    fn make_token(exp: i64) -> String {
        encode(
            &Header::default(),
            &TestClaims {
                sub: "1".to_string(),
                exp,
            },
            &EncodingKey::from_secret(b"test-secret"),
        )
        .unwrap()
    }

    fn store_with_token(dir: &tempfile::TempDir, token: &str) -> CredentialStore {
        let store = CredentialStore::new(dir.path().join("config.toml"));
        store.set(token).unwrap();
        store
    }

    #[test]
    fn test_future_expiry_is_accepted() {
        let token = make_token(Utc::now().timestamp() + 3600);
        assert!(token_is_current(&token));
    }

    #[test]
    fn test_expiry_boundary_is_exclusive() {
        // exp == now must already count as expired.
        let token = make_token(Utc::now().timestamp());
        assert!(!token_is_current(&token));
    }

    #[test]
    fn test_past_expiry_is_rejected() {
        let token = make_token(Utc::now().timestamp() - 10);
        assert!(!token_is_current(&token));
    }

    #[test]
    fn test_malformed_tokens_never_panic() {
        for junk in ["", "not-a-jwt", "a.b", "a.b.c", "🦀🦀🦀"] {
            assert!(token_expiry(junk).is_none(), "accepted {junk:?}");
        }
    }

    #[test]
    fn test_token_without_exp_claim_is_invalid() {
        #[derive(Serialize)]
        struct NoExp {
            sub: String,
        }
        let token = encode(
            &Header::default(),
            &NoExp {
                sub: "1".to_string(),
            },
            &EncodingKey::from_secret(b"test-secret"),
        )
        .unwrap();
        assert!(token_expiry(&token).is_none());
    }

    #[test]
    fn test_usable_token_returns_stored_value_unchanged() {
        let dir = tempfile::tempdir().unwrap();
        let token = make_token(Utc::now().timestamp() + 3600);
        let store = store_with_token(&dir, &token);
        assert_eq!(usable_token(&store), Some(token));
    }

    #[test]
    fn test_expired_token_clears_store() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_with_token(&dir, &make_token(Utc::now().timestamp() - 1));
        assert_eq!(usable_token(&store), None);
        assert_eq!(store.get(), None);
    }

    #[test]
    fn test_malformed_token_clears_store() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_with_token(&dir, "garbage");
        assert_eq!(usable_token(&store), None);
        assert_eq!(store.get(), None);
    }

    #[test]
    fn test_set_overwrites_previous_token() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_with_token(&dir, "first");
        store.set("second").unwrap();
        assert_eq!(store.get().as_deref(), Some("second"));
    }

    #[test]
    fn test_clear_on_empty_store_is_a_noop() {
        let dir = tempfile::tempdir().unwrap();
        let store = CredentialStore::new(dir.path().join("config.toml"));
        store.clear().unwrap();
        assert_eq!(store.get(), None);
    }
}
