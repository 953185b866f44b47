//! Secure token manager with memory-safe handling and masking capabilities
//!
//! This module resolves the push credential for the configured registry from
//! environment variables, using the `secrecy` crate to prevent accidental
//! exposure in logs or memory dumps.

use crate::core::request::Credentials;
use secrecy::{ExposeSecret, SecretString};
use std::collections::HashMap;

/// Environment variables holding the push secret, in lookup order
const SECRET_VARS: &[&str] = &["INPUT_NUGET_KEY", "NUGET_KEY"];

/// Environment variables holding the principal (user) name, in lookup order
const PRINCIPAL_VARS: &[&str] = &["INPUT_GITHUB_USER", "GITHUB_USER", "GITHUB_ACTOR"];

/// Secure token manager for package registry authentication
///
/// # Examples
///
/// ```
/// use nuget_publisher::security::SecureTokenManager;
/// use std::collections::HashMap;
///
/// let env = HashMap::from([("NUGET_KEY".to_string(), "oy2secretvalue".to_string())]);
/// let manager = SecureTokenManager::from_env_map(env);
/// assert!(manager.credentials().is_some());
/// ```
#[derive(Default)]
pub struct SecureTokenManager {
    env: HashMap<String, String>,
}

impl SecureTokenManager {
    /// Creates a token manager over the current process environment
    pub fn new() -> Self {
        Self::from_env_map(std::env::vars().collect())
    }

    /// Creates a token manager over an explicit environment snapshot
    pub fn from_env_map(env: HashMap<String, String>) -> Self {
        Self { env }
    }

    fn first_non_empty(&self, names: &[&str]) -> Option<String> {
        names
            .iter()
            .filter_map(|name| self.env.get(*name))
            .find(|value| !value.is_empty())
            .cloned()
    }

    /// Retrieves the push secret
    ///
    /// Returns `None` if no secret variable is set or all are empty.
    pub fn get_token(&self) -> Option<SecretString> {
        self.first_non_empty(SECRET_VARS)
            .map(SecretString::from)
    }

    /// Checks if a push secret is configured
    pub fn has_token(&self) -> bool {
        self.get_token().is_some()
    }

    /// Resolves the principal and secret into [`Credentials`]
    ///
    /// The principal is optional; the secret is what makes credentials exist.
    pub fn credentials(&self) -> Option<Credentials> {
        let secret = self.get_token()?;
        Some(Credentials {
            principal: self.first_non_empty(PRINCIPAL_VARS),
            secret,
        })
    }

    /// Masks a token for safe logging
    ///
    /// Shows only the first 3 and last 3 characters for identification purposes.
    /// Tokens shorter than 10 characters are fully masked as "****".
    ///
    /// # Examples
    ///
    /// ```
    /// use nuget_publisher::security::SecureTokenManager;
    ///
    /// assert_eq!(SecureTokenManager::mask_token("abcdef123456"), "abc...456");
    /// assert_eq!(SecureTokenManager::mask_token("short"), "****");
    /// ```
    pub fn mask_token(token: &str) -> String {
        let chars: Vec<char> = token.chars().collect();
        if chars.len() < 10 {
            return "****".to_string();
        }

        let prefix: String = chars[..3].iter().collect();
        let suffix: String = chars[chars.len() - 3..].iter().collect();
        format!("{}...{}", prefix, suffix)
    }

    /// Masks the configured secret wherever it appears in a string
    pub fn mask_tokens_in_string(&self, text: &str) -> String {
        match self.get_token() {
            Some(token) if !token.expose_secret().is_empty() => {
                let token_str = token.expose_secret();
                text.replace(token_str, &Self::mask_token(token_str))
            }
            _ => text.to_string(),
        }
    }
}
