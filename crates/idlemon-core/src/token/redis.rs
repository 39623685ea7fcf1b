// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Redis-backed token cache.

use std::time::Duration;

use async_trait::async_trait;
use redis::AsyncCommands;
use redis::aio::ConnectionManager;
use tracing::info;

use super::{TokenCache, TokenError};

/// [`TokenCache`] storing entries with `SET key value EX ttl`.
///
/// The connection manager reconnects on its own after transient failures.
#[derive(Clone)]
pub struct RedisTokenCache {
    conn: ConnectionManager,
}

impl RedisTokenCache {
    /// Connect to the Redis server at `url`.
    pub async fn connect(url: &str) -> Result<Self, TokenError> {
        let client = redis::Client::open(url)?;
        let conn = ConnectionManager::new(client).await?;
        info!("Connected to Redis token cache");
        Ok(Self { conn })
    }

    /// Wrap an existing connection manager.
    pub fn new(conn: ConnectionManager) -> Self {
        Self { conn }
    }
}

/// Redis expiries are whole seconds and must be positive.
fn ttl_secs(ttl: Duration) -> u64 {
    ttl.as_secs().max(1)
}

#[async_trait]
impl TokenCache for RedisTokenCache {
    async fn put(&self, key: &str, value: &str, ttl: Duration) -> Result<(), TokenError> {
        let mut conn = self.conn.clone();
        let _: () = conn.set_ex(key, value, ttl_secs(ttl)).await?;
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<String>, TokenError> {
        let mut conn = self.conn.clone();
        let value: Option<String> = conn.get(key).await?;
        Ok(value)
    }

    async fn remove(&self, key: &str) -> Result<(), TokenError> {
        let mut conn = self.conn.clone();
        let _: () = conn.del(key).await?;
        Ok(())
    }

    async fn ping(&self) -> Result<(), TokenError> {
        let mut conn = self.conn.clone();
        let _: String = redis::cmd("PING").query_async(&mut conn).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ttl_rounds_to_whole_seconds() {
        assert_eq!(ttl_secs(Duration::from_secs(43_200)), 43_200);
        assert_eq!(ttl_secs(Duration::from_millis(1500)), 1);
        assert_eq!(ttl_secs(Duration::from_millis(10)), 1);
    }
}
