//! Avatar resolution with a deterministic fallback.
//!
//! The identity lookup is tried first; any failure or empty result falls
//! back to a hash-derived identicon URL, so resolution never fails.

use std::sync::Arc;

use sha2::{Digest, Sha256};
use tracing::{debug, warn};

use crate::adapters::IdentityLookup;

/// Base URL for the default identicon
pub const FALLBACK_AVATAR_BASE: &str = "https://www.gravatar.com/avatar";

/// Resolves an avatar URL for an email address
#[derive(Clone)]
pub struct AvatarResolver {
    lookup: Arc<dyn IdentityLookup>,
}

impl AvatarResolver {
    pub fn new(lookup: Arc<dyn IdentityLookup>) -> Self {
        Self { lookup }
    }

    /// Resolve an avatar for `email`; never fails
    pub async fn resolve(&self, email: &str) -> String {
        match self.lookup.search_by_email(email).await {
            Ok(Some(url)) => url,
            Ok(None) => {
                debug!(email, lookup = self.lookup.name(), "No identity match, using fallback avatar");
                fallback_avatar(email)
            }
            Err(e) => {
                warn!(email, lookup = self.lookup.name(), "Avatar lookup failed: {:#}", e);
                fallback_avatar(email)
            }
        }
    }
}

/// Deterministic identicon URL for an email (SHA-256 of the trimmed, lowercased address)
pub fn fallback_avatar(email: &str) -> String {
    let normalized = email.trim().to_lowercase();
    let mut hasher = Sha256::new();
    hasher.update(normalized.as_bytes());
    let hash = hex::encode(hasher.finalize());

    format!("{}/{}?d=identicon", FALLBACK_AVATAR_BASE, hash)
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;
    use async_trait::async_trait;

    struct FailingLookup;

    #[async_trait]
    impl IdentityLookup for FailingLookup {
        fn name(&self) -> &str {
            "failing"
        }

        async fn search_by_email(&self, _email: &str) -> Result<Option<String>> {
            anyhow::bail!("rate limited")
        }
    }

    struct FixedLookup(&'static str);

    #[async_trait]
    impl IdentityLookup for FixedLookup {
        fn name(&self) -> &str {
            "fixed"
        }

        async fn search_by_email(&self, _email: &str) -> Result<Option<String>> {
            Ok(Some(self.0.to_string()))
        }
    }

    #[test]
    fn test_fallback_is_deterministic_and_case_insensitive() {
        let a = fallback_avatar("bo@x.com");
        assert_eq!(a, fallback_avatar("bo@x.com"));
        assert_eq!(a, fallback_avatar("BO@X.com "));
        assert_ne!(a, fallback_avatar("ava@x.com"));

        assert!(a.starts_with("https://www.gravatar.com/avatar/"));
        assert!(a.ends_with("?d=identicon"));
        // 32 bytes of SHA-256 = 64 hex chars
        let hash = a
            .trim_start_matches("https://www.gravatar.com/avatar/")
            .trim_end_matches("?d=identicon");
        assert_eq!(hash.len(), 64);
    }

    #[tokio::test]
    async fn test_lookup_failure_falls_back() {
        let resolver = AvatarResolver::new(Arc::new(FailingLookup));
        let first = resolver.resolve("bo@x.com").await;
        let second = resolver.resolve("bo@x.com").await;

        assert_eq!(first, fallback_avatar("bo@x.com"));
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_lookup_match_wins() {
        let resolver = AvatarResolver::new(Arc::new(FixedLookup("https://avatars.example/1")));
        assert_eq!(resolver.resolve("ava@x.com").await, "https://avatars.example/1");
    }
}
