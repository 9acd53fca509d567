//! Session token store.
//!
//! Maps opaque tokens to the client address that obtained them plus an
//! expiry instant. A token only validates for the address it was issued to.

use std::net::IpAddr;
use std::time::{Duration, Instant};

use dashmap::DashMap;
use rand::{distributions::Alphanumeric, Rng};

use crate::observability::metrics;

const TOKEN_LEN: usize = 48;

/// Longest lifetime a token can be given (ten years).
pub const MAX_TTL: Duration = Duration::from_secs(10 * 365 * 24 * 60 * 60);

/// What a token is bound to.
#[derive(Debug, Clone)]
pub struct TokenRecord {
    /// Address the token was issued to.
    pub client: IpAddr,
    /// Instant after which the token is dead.
    pub expires_at: Instant,
}

impl TokenRecord {
    pub fn is_expired(&self, now: Instant) -> bool {
        now >= self.expires_at
    }
}

/// Concurrent token store. Created at startup, shared by handle.
#[derive(Debug)]
pub struct TokenStore {
    tokens: DashMap<String, TokenRecord>,
    ttl: Duration,
}

impl TokenStore {
    /// `ttl` is capped at [`MAX_TTL`].
    pub fn new(ttl: Duration) -> Self {
        Self {
            tokens: DashMap::new(),
            ttl: ttl.min(MAX_TTL),
        }
    }

    /// Lifetime given to newly issued tokens.
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Issue a fresh token bound to `client`.
    pub fn issue(&self, client: IpAddr) -> String {
        let token: String = rand::thread_rng()
            .sample_iter(&Alphanumeric)
            .take(TOKEN_LEN)
            .map(char::from)
            .collect();
        let now = Instant::now();
        let expires_at = now
            .checked_add(self.ttl)
            .or_else(|| now.checked_add(Duration::from_secs(86_400)))
            .unwrap_or(now);
        self.tokens.insert(token.clone(), TokenRecord { client, expires_at });
        metrics::record_token_count(self.tokens.len());
        tracing::debug!(client = %client, "Token issued");
        token
    }

    /// Check `token` against the presenting client's address.
    ///
    /// Unknown tokens, expired tokens (evicted on the spot) and tokens bound
    /// to another address all fail.
    pub fn validate(&self, token: &str, client: IpAddr) -> bool {
        let now = Instant::now();
        let verdict = match self.tokens.get(token) {
            None => return false,
            Some(record) if record.is_expired(now) => None,
            Some(record) => Some(record.client == client),
        };

        match verdict {
            Some(true) => true,
            Some(false) => {
                tracing::warn!(client = %client, "Token presented from a different address");
                false
            }
            None => {
                self.tokens.remove_if(token, |_, r| r.is_expired(now));
                metrics::record_token_count(self.tokens.len());
                false
            }
        }
    }

    /// Revoke a token. Returns whether it existed.
    pub fn revoke(&self, token: &str) -> bool {
        let removed = self.tokens.remove(token).is_some();
        if removed {
            metrics::record_token_count(self.tokens.len());
        }
        removed
    }

    /// Drop every expired token. Returns how many were removed.
    pub fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let before = self.tokens.len();
        self.tokens.retain(|_, record| !record.is_expired(now));
        let removed = before.saturating_sub(self.tokens.len());
        metrics::record_token_count(self.tokens.len());
        removed
    }

    /// Drop every token.
    pub fn clear(&self) {
        self.tokens.clear();
        metrics::record_token_count(0);
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CLIENT_A: IpAddr = IpAddr::V4(std::net::Ipv4Addr::new(192, 168, 1, 10));
    const CLIENT_B: IpAddr = IpAddr::V4(std::net::Ipv4Addr::new(192, 168, 1, 11));

    #[test]
    fn test_issue_and_validate() {
        let store = TokenStore::new(Duration::from_secs(60));
        let token = store.issue(CLIENT_A);
        assert_eq!(token.len(), TOKEN_LEN);
        assert!(store.validate(&token, CLIENT_A));
        assert!(!store.validate("not-a-token", CLIENT_A));
    }

    #[test]
    fn test_token_bound_to_address() {
        let store = TokenStore::new(Duration::from_secs(60));
        let token = store.issue(CLIENT_A);
        assert!(!store.validate(&token, CLIENT_B));
        // A mismatch does not burn the token for its owner.
        assert!(store.validate(&token, CLIENT_A));
    }

    #[test]
    fn test_tokens_are_unique() {
        let store = TokenStore::new(Duration::from_secs(60));
        let a = store.issue(CLIENT_A);
        let b = store.issue(CLIENT_A);
        assert_ne!(a, b);
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn test_expired_token_is_evicted() {
        let store = TokenStore::new(Duration::ZERO);
        let token = store.issue(CLIENT_A);
        assert!(!store.validate(&token, CLIENT_A));
        assert!(store.is_empty());
    }

    #[test]
    fn test_huge_ttl_is_capped() {
        let store = TokenStore::new(Duration::MAX);
        assert_eq!(store.ttl(), MAX_TTL);
        let token = store.issue(CLIENT_A);
        assert!(store.validate(&token, CLIENT_A));
    }

    #[test]
    fn test_revoke() {
        let store = TokenStore::new(Duration::from_secs(60));
        let token = store.issue(CLIENT_A);
        assert!(store.revoke(&token));
        assert!(!store.revoke(&token));
        assert!(!store.validate(&token, CLIENT_A));
    }

    #[test]
    fn test_purge_expired() {
        let expired = TokenStore::new(Duration::ZERO);
        expired.issue(CLIENT_A);
        expired.issue(CLIENT_B);
        assert_eq!(expired.purge_expired(), 2);
        assert!(expired.is_empty());

        let live = TokenStore::new(Duration::from_secs(60));
        live.issue(CLIENT_A);
        assert_eq!(live.purge_expired(), 0);
        assert_eq!(live.len(), 1);
    }
}
