// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Idlemon Core - Player-State Engine
//!
//! Connects to PostgreSQL and Redis, applies migrations, loads the game
//! content, and keeps the engine running until interrupted.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use tracing::{error, info, warn};

use idlemon_core::catalog::Catalog;
use idlemon_core::config::{Config, SERVER_VERSION};
use idlemon_core::credentials::Argon2Hasher;
use idlemon_core::migrations;
use idlemon_core::persistence::PostgresStore;
use idlemon_core::service::GameService;
use idlemon_core::token::{RedisTokenCache, TokenService};

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file (from crate directory or parent directories)
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("idlemon_core=info".parse()?),
        )
        .init();

    info!(version = SERVER_VERSION, "Starting Idlemon Core");

    let config = Config::from_env().map_err(|e| {
        error!("Configuration error: {}", e);
        e
    })?;

    info!(
        max_db_connections = config.max_db_connections,
        token_ttl = ?config.token_ttl,
        lock_timeout = ?config.lock_timeout,
        "Configuration loaded"
    );

    let pool = connect_with_retries(&config).await?;

    if config.run_migrations {
        info!("Running database migrations...");
        migrations::run_postgres(&pool).await?;
        info!("Migrations completed");
    }

    let catalog = Arc::new(Catalog::embedded()?);
    info!(
        unit_templates = catalog.unit_templates.len(),
        daily_quests = catalog.daily_quests.len(),
        "Game content loaded"
    );

    let cache = RedisTokenCache::connect(&config.redis_url).await?;
    let tokens = TokenService::new(Arc::new(cache), config.token_ttl);

    let store = PostgresStore::new(pool.clone(), config.lock_timeout);
    let service = GameService::new(Arc::new(store), tokens, catalog, Arc::new(Argon2Hasher))
        .with_lock_timeout(config.lock_timeout)
        .with_client_version(config.client_version.clone());

    let health = service.health_check().await;
    if health.is_healthy() {
        info!("Health check passed");
    } else {
        warn!(database = health.database, cache = health.cache, "Health check failed");
    }

    info!("Idlemon Core initialized successfully");

    tokio::signal::ctrl_c().await?;
    info!("Shutting down...");

    pool.close().await;
    info!("Shutdown complete");

    Ok(())
}

/// Connect to PostgreSQL, retrying with a linear backoff.
async fn connect_with_retries(config: &Config) -> Result<PgPool> {
    let mut attempt = 1;
    loop {
        info!(attempt, "Connecting to database...");
        match PgPoolOptions::new()
            .max_connections(config.max_db_connections)
            .connect(&config.database_url)
            .await
        {
            Ok(pool) => {
                info!("Database connection established");
                return Ok(pool);
            }
            Err(e) if attempt < config.db_connect_retries => {
                warn!(attempt, error = %e, "Database connection failed, retrying");
                tokio::time::sleep(Duration::from_secs(u64::from(attempt))).await;
                attempt += 1;
            }
            Err(e) => {
                error!(attempt, error = %e, "Giving up on database connection");
                return Err(e.into());
            }
        }
    }
}
