//! API key storage and the key-selection collaborator.
//!
//! [`CredentialStore`] is read on **every** remote call, so a key entered on
//! the key wall after a permission failure takes effect on the next request
//! without rebuilding the client.

use std::sync::{Arc, RwLock};

use async_trait::async_trait;

use crate::config::GenAiConfig;

use super::error::GenAiError;

/// Environment variables consulted when no key has been selected.
pub const KEY_ENV_VARS: &[&str] = &["GEMINI_API_KEY", "API_KEY"];

// ---------------------------------------------------------------------------
// KeySelector trait
// ---------------------------------------------------------------------------

/// The permission collaborator behind the key wall.
#[async_trait]
pub trait KeySelector: Send + Sync {
    /// Whether a usable key is currently selected.
    async fn has_selected_api_key(&self) -> Result<bool, GenAiError>;

    /// Select `key` as the active credential.
    async fn open_select_key(&self, key: &str) -> Result<(), GenAiError>;
}

// ---------------------------------------------------------------------------
// CredentialStore
// ---------------------------------------------------------------------------

/// Shared, swappable API key.
///
/// Cheap to clone; all clones see the same key.
#[derive(Clone)]
pub struct CredentialStore {
    key: Arc<RwLock<Option<String>>>,
    env_vars: &'static [&'static str],
}

impl CredentialStore {
    /// Store seeded from `config.api_key`, falling back to [`KEY_ENV_VARS`].
    pub fn from_config(config: &GenAiConfig) -> Self {
        Self {
            key: Arc::new(RwLock::new(config.api_key.clone())),
            env_vars: KEY_ENV_VARS,
        }
    }

    /// Store that never looks at the environment.
    pub fn in_memory(key: Option<String>) -> Self {
        Self {
            key: Arc::new(RwLock::new(key)),
            env_vars: &[],
        }
    }

    /// The key to use right now: the selected key if non-blank, otherwise the
    /// first non-blank environment variable.
    pub fn resolve(&self) -> Option<String> {
        let selected = self.key.read().unwrap().clone();
        selected
            .into_iter()
            .chain(self.env_vars.iter().filter_map(|name| std::env::var(name).ok()))
            .map(|k| k.trim().to_string())
            .find(|k| !k.is_empty())
    }

    /// Replace the selected key.
    pub fn set(&self, key: impl Into<String>) {
        *self.key.write().unwrap() = Some(key.into());
    }
}

#[async_trait]
impl KeySelector for CredentialStore {
    async fn has_selected_api_key(&self) -> Result<bool, GenAiError> {
        Ok(self.resolve().is_some())
    }

    async fn open_select_key(&self, key: &str) -> Result<(), GenAiError> {
        self.set(key);
        log::info!("genai: API key selected");
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_store_resolves_nothing() {
        assert!(CredentialStore::in_memory(None).resolve().is_none());
    }

    #[test]
    fn blank_key_is_ignored() {
        assert!(CredentialStore::in_memory(Some("   ".into())).resolve().is_none());
    }

    #[test]
    fn key_is_trimmed() {
        let store = CredentialStore::in_memory(Some("  AIza-1 \n".into()));
        assert_eq!(store.resolve().as_deref(), Some("AIza-1"));
    }

    #[test]
    fn clones_share_the_key() {
        let store = CredentialStore::in_memory(None);
        let other = store.clone();
        store.set("AIza-2");
        assert_eq!(other.resolve().as_deref(), Some("AIza-2"));
        other.set("AIza-4");
        assert_eq!(store.resolve().as_deref(), Some("AIza-4"));
    }

    #[tokio::test]
    async fn selector_reflects_store() {
        let store = CredentialStore::in_memory(None);
        assert!(!store.has_selected_api_key().await.unwrap());
        store.open_select_key("AIza-3").await.unwrap();
        assert!(store.has_selected_api_key().await.unwrap());
    }

    #[test]
    fn selector_is_object_safe() {
        let _: Box<dyn KeySelector> = Box::new(CredentialStore::in_memory(None));
    }
}
