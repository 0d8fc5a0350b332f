pub mod cache;
pub mod string;

pub use cache::SecretCache;
pub use string::SecretString;

use keyring::Entry;
use regex::Regex;
use sdk::errors::EngineError;
use std::sync::OnceLock;

/// SecretManager resolves API keys for the upstream services.
///
/// Lookup order for a key such as `GROK_API_KEY`:
/// 1. The environment variable of the same name
/// 2. The OS keychain entry under the manager's service name
///
/// Keys are never prompted for: the server runs unattended, so a missing key
/// surfaces as `EngineError::MissingSecret` and the request fails with
/// `"<KEY> not configured"`.
///
/// The SecretManager also provides secret scrubbing for upstream error bodies
/// before they reach logs or error messages.
pub struct SecretManager {
    service_name: String,
    use_keychain: bool,
}

/// Regex patterns for detecting common secret formats.
/// These are compiled once and reused for performance.
static SECRET_PATTERNS: OnceLock<Vec<Regex>> = OnceLock::new();

/// Initializes and returns the secret detection patterns.
///
/// Patterns match:
/// - OpenAI API keys: sk-[a-zA-Z0-9]{20,}
/// - xAI API keys: xai-[a-zA-Z0-9]{20,}
/// - SerpApi keys passed as query parameters: api_key=...
/// - Bearer tokens: Bearer\s+[^\s]{20,}
fn get_secret_patterns() -> &'static Vec<Regex> {
    SECRET_PATTERNS.get_or_init(|| {
        vec![
            Regex::new(r"sk-[a-zA-Z0-9\-_]{20,}").expect("Invalid OpenAI pattern"),
            Regex::new(r"xai-[a-zA-Z0-9\-_]{20,}").expect("Invalid xAI pattern"),
            Regex::new(r"api_key=[^&\s]+").expect("Invalid query key pattern"),
            Regex::new(r"Bearer\s+[^\s]{20,}").expect("Invalid Bearer pattern"),
        ]
    })
}

impl SecretManager {
    /// Creates a SecretManager that consults the environment and then the
    /// OS keychain under `service_name`.
    pub fn new(service_name: impl Into<String>) -> Self {
        Self {
            service_name: service_name.into(),
            use_keychain: true,
        }
    }

    /// Creates a SecretManager that only reads environment variables.
    pub fn env_only() -> Self {
        Self {
            service_name: String::new(),
            use_keychain: false,
        }
    }

    /// Retrieves a secret.
    ///
    /// # Errors
    /// Returns `EngineError::MissingSecret` when neither the environment nor
    /// the keychain has a non-empty value for `key`.
    pub fn get_secret(&self, key: &str) -> Result<String, EngineError> {
        if let Ok(value) = std::env::var(key) {
            let value = value.trim().to_string();
            if !value.is_empty() {
                tracing::debug!("Resolved secret '{}' from environment", key);
                return Ok(value);
            }
        }

        if self.use_keychain {
            match self.keychain_entry(key).and_then(|entry| {
                entry
                    .get_password()
                    .map_err(|e| EngineError::KeyringError(e.to_string()))
            }) {
                Ok(secret) if !secret.trim().is_empty() => {
                    tracing::debug!("Retrieved secret '{}' from keychain", key);
                    return Ok(secret);
                }
                Ok(_) => {}
                Err(e) => tracing::debug!("Keychain lookup for '{}' failed: {}", key, e),
            }
        }

        Err(EngineError::MissingSecret(key.to_string()))
    }

    /// Stores a secret in the OS keychain.
    ///
    /// # Errors
    /// Returns `EngineError::KeyringError` if keychain access fails
    pub fn set_secret(&self, key: &str, value: &str) -> Result<(), EngineError> {
        let entry = self.keychain_entry(key)?;

        entry.set_password(value).map_err(|e| {
            EngineError::KeyringError(format!("Failed to store secret '{}': {}", key, e))
        })?;

        tracing::info!("Stored secret '{}' in keychain", key);
        Ok(())
    }

    /// Checks if a secret can be resolved without failing.
    pub fn has_secret(&self, key: &str) -> bool {
        self.get_secret(key).is_ok()
    }

    fn keychain_entry(&self, key: &str) -> Result<Entry, EngineError> {
        if !self.use_keychain {
            return Err(EngineError::KeyringError(
                "Keychain disabled for this manager".to_string(),
            ));
        }
        Entry::new(&self.service_name, key).map_err(|e| {
            EngineError::KeyringError(format!("Failed to create keyring entry: {}", e))
        })
    }

    /// Scrubs secrets from text by replacing them with [REDACTED].
    ///
    /// # Examples
    /// ```
    /// use mibu_engine::secrets::SecretManager;
    ///
    /// let scrubbed = SecretManager::scrub("My API key is xai-1234567890abcdefghij");
    /// assert_eq!(scrubbed, "My API key is [REDACTED]");
    /// ```
    pub fn scrub(text: &str) -> String {
        let patterns = get_secret_patterns();
        let mut result = text.to_string();

        for pattern in patterns {
            result = pattern.replace_all(&result, "[REDACTED]").to_string();
        }

        result
    }
}
