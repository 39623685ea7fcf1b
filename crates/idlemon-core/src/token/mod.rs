// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Auth token issuance and validation against an expiring cache.
//!
//! Each player has at most one valid token: it is stored under the player's ID
//! with a fixed TTL and overwritten on re-issue. Validation is a cache lookup
//! plus exact comparison. A missing entry and a mismatch are both reported as
//! "not valid", so callers cannot tell an expired token from one that was
//! never issued.

pub mod memory;
pub mod redis;

pub use self::memory::MemoryTokenCache;
pub use self::redis::RedisTokenCache;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use rand::Rng;
use rand::distributions::Alphanumeric;
use tracing::debug;
use uuid::Uuid;

/// Number of characters in an issued token.
pub const API_TOKEN_LEN: usize = 32;

/// Token cache failures. These are infrastructure errors, not rejections.
#[derive(Debug, Clone, thiserror::Error)]
pub enum TokenError {
    /// The cache backend failed.
    #[error("cache error: {0}")]
    Cache(String),
}

impl From<::redis::RedisError> for TokenError {
    fn from(err: ::redis::RedisError) -> Self {
        TokenError::Cache(err.to_string())
    }
}

/// Key-value cache with per-entry expiry.
#[async_trait]
pub trait TokenCache: Send + Sync {
    /// Store `value` under `key`, replacing any previous value, expiring after `ttl`.
    async fn put(&self, key: &str, value: &str, ttl: Duration) -> Result<(), TokenError>;

    /// Read an unexpired value.
    async fn get(&self, key: &str) -> Result<Option<String>, TokenError>;

    /// Delete `key` if present.
    async fn remove(&self, key: &str) -> Result<(), TokenError>;

    /// Check that the backend is reachable.
    async fn ping(&self) -> Result<(), TokenError> {
        Ok(())
    }
}

/// Issues and checks player tokens.
#[derive(Clone)]
pub struct TokenService {
    cache: Arc<dyn TokenCache>,
    ttl: Duration,
}

impl TokenService {
    /// Create a token service over `cache` issuing tokens that live for `ttl`.
    pub fn new(cache: Arc<dyn TokenCache>, ttl: Duration) -> Self {
        Self { cache, ttl }
    }

    /// Lifetime of issued tokens.
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Issue a fresh token for `player_id`, invalidating any earlier one.
    pub async fn issue(&self, player_id: Uuid) -> Result<String, TokenError> {
        let token = generate_token();
        self.cache
            .put(&player_id.to_string(), &token, self.ttl)
            .await?;
        debug!(player_id = %player_id, "Issued API token");
        Ok(token)
    }

    /// Whether `token` is the current token for `player_id`.
    pub async fn validate(&self, player_id: &str, token: &str) -> Result<bool, TokenError> {
        if player_id.is_empty() || token.is_empty() {
            return Ok(false);
        }
        let stored = self.cache.get(player_id).await?;
        Ok(stored.is_some_and(|stored| stored == token))
    }

    /// Drop the player's token (sign-out).
    pub async fn revoke(&self, player_id: Uuid) -> Result<(), TokenError> {
        self.cache.remove(&player_id.to_string()).await?;
        debug!(player_id = %player_id, "Revoked API token");
        Ok(())
    }

    /// Resolve an authorization header to the authenticated player.
    ///
    /// Returns `Ok(None)` for anything that does not authenticate: a missing
    /// colon, a player ID that is not a UUID, an unknown or expired token, or a
    /// mismatch.
    pub async fn authenticate(&self, authorization: &str) -> Result<Option<Uuid>, TokenError> {
        let Some((id, token)) = parse_auth_header(authorization) else {
            return Ok(None);
        };
        let Ok(player_id) = Uuid::parse_str(id) else {
            return Ok(None);
        };
        // Validate against the canonical form so differently-cased IDs hit the same key.
        if self.validate(&player_id.to_string(), token).await? {
            Ok(Some(player_id))
        } else {
            Ok(None)
        }
    }

    /// Check that the cache backend is reachable.
    pub async fn ping(&self) -> Result<(), TokenError> {
        self.cache.ping().await
    }
}

/// Generate a random alphanumeric token.
pub fn generate_token() -> String {
    let mut rng = rand::thread_rng();
    (0..API_TOKEN_LEN)
        .map(|_| char::from(rng.sample(Alphanumeric)))
        .collect()
}

/// Split an authorization header of the form `<playerID>:<token>` on the first colon.
pub fn parse_auth_header(authorization: &str) -> Option<(&str, &str)> {
    authorization.split_once(':')
}
