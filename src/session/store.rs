//! Credential persistence. A store owns exactly one credential pair and updates
//! it as a unit so readers never observe an access token from one login paired
//! with a refresh token from another.

use super::types::CredentialPair;
use secrecy::SecretString;
use std::sync::{PoisonError, RwLock};

/// CRUD over the single credential pair of a client. Implementations never
/// fail; a missing value is reported as `None`.
pub trait TokenStore: Send + Sync {
    /// Persists both tokens, replacing any previous pair.
    fn set_tokens(&self, tokens: CredentialPair);

    fn access_token(&self) -> Option<SecretString>;

    fn refresh_token(&self) -> Option<SecretString>;

    /// Removes both tokens. Safe to call on an empty store.
    fn clear_tokens(&self);
}

/// Process-wide store for embedding the session controller outside of the
/// HTTP facade (workers, tests, tools).
#[derive(Debug, Default)]
pub struct MemoryTokenStore {
    tokens: RwLock<Option<CredentialPair>>,
}

impl MemoryTokenStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a copy of the whole pair, read under one lock.
    #[must_use]
    pub fn tokens(&self) -> Option<CredentialPair> {
        self.tokens
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl TokenStore for MemoryTokenStore {
    fn set_tokens(&self, tokens: CredentialPair) {
        *self.tokens.write().unwrap_or_else(PoisonError::into_inner) = Some(tokens);
    }

    fn access_token(&self) -> Option<SecretString> {
        self.tokens
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .map(|tokens| tokens.access_token.clone())
    }

    fn refresh_token(&self) -> Option<SecretString> {
        self.tokens
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .map(|tokens| tokens.refresh_token.clone())
    }

    fn clear_tokens(&self) {
        *self.tokens.write().unwrap_or_else(PoisonError::into_inner) = None;
    }
}
