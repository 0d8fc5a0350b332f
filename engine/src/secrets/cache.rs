use crate::secrets::string::SecretString;
use crate::secrets::SecretManager;
use sdk::errors::EngineError;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

/// An in-memory cache in front of [`SecretManager`].
///
/// Keys are looked up once per process; values can also be seeded directly,
/// which is how tests and the CLI inject keys without touching the environment.
#[derive(Clone)]
pub struct SecretCache {
    manager: Arc<SecretManager>,
    cache: Arc<RwLock<HashMap<String, SecretString>>>,
}

impl SecretCache {
    /// Creates a new SecretCache wrapping the provided SecretManager
    pub fn new(manager: Arc<SecretManager>) -> Self {
        Self {
            manager,
            cache: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Creates a cache that only knows the given values
    pub fn from_values<I, K, V>(values: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let cache = Self::new(Arc::new(SecretManager::env_only()));
        for (key, value) in values {
            cache.insert(key, value);
        }
        cache
    }

    /// Retrieves a secret, checking the memory cache first.
    pub fn get_secret(&self, key: &str) -> Result<SecretString, EngineError> {
        {
            let cache = self.cache.read().expect("SecretCache lock poisoned");
            if let Some(secret) = cache.get(key) {
                return Ok(secret.clone());
            }
        }

        let secret = SecretString::new(self.manager.get_secret(key)?);

        {
            let mut cache = self.cache.write().expect("SecretCache lock poisoned");
            cache.insert(key.to_string(), secret.clone());
        }

        Ok(secret)
    }

    /// Seeds a value, replacing any cached one
    pub fn insert(&self, key: impl Into<String>, value: impl Into<String>) {
        let mut cache = self.cache.write().expect("SecretCache lock poisoned");
        cache.insert(key.into(), SecretString::new(value.into()));
    }

    /// True when the key resolves
    pub fn has_secret(&self, key: &str) -> bool {
        self.get_secret(key).is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_seeded_values_are_returned() {
        let cache = SecretCache::from_values([("SERPAPI_KEY", "serp-123")]);
        assert_eq!(cache.get_secret("SERPAPI_KEY").unwrap().unsecure(), "serp-123");
        assert!(cache.has_secret("SERPAPI_KEY"));
        assert!(!cache.has_secret("MIBU_CACHE_TEST_UNSET_KEY"));
    }
}
