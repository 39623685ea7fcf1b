// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! SQLite-backed player store.
//!
//! SQLite has no row locks. A locked update starts with a no-op
//! `UPDATE players SET version = version` on the target row, which takes the
//! database write lock before anything is read; every other writer then waits
//! for this transaction to finish.

use std::path::Path;
use std::time::Duration;

use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use sqlx::types::Json;
use sqlx::{Sqlite, SqlitePool, Transaction};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::error::StoreError;
use crate::migrations;
use crate::progression::Progression;

use super::{
    CreatePlayerOutcome, LockedPlayer, NewPlayer, PlayerRecord, PlayerRow, PlayerStore,
    RenameOutcome, UniqueField, unique_violation,
};

const SELECT_PLAYER: &str = r#"
    SELECT id, name, email, credential_hash, created_at, version, progression
    FROM players
"#;

/// SQLite-backed [`PlayerStore`].
#[derive(Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    /// Create a store over an existing, migrated pool.
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Open (creating if needed) a database file and run migrations.
    ///
    /// The database is opened in WAL mode with a busy timeout so concurrent
    /// locked updates queue instead of failing.
    pub async fn from_path(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref();

        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent).map_err(|e| StoreError::Database {
                operation: "create_dir".to_string(),
                details: format!("Failed to create directory {:?}: {}", parent, e),
            })?;
        }

        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .busy_timeout(Duration::from_secs(10));

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await
            .map_err(|e| StoreError::Database {
                operation: "connect".to_string(),
                details: format!("Failed to connect to SQLite at {:?}: {}", path, e),
            })?;

        migrations::run_sqlite(&pool).await?;

        Ok(Self { pool })
    }

    /// The underlying pool.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

#[async_trait::async_trait]
impl PlayerStore for SqliteStore {
    async fn create_player(&self, player: &NewPlayer) -> Result<CreatePlayerOutcome, StoreError> {
        let result = sqlx::query(
            r#"
            INSERT INTO players (id, name, email, credential_hash, created_at, version, progression)
            VALUES (?, ?, ?, ?, ?, 1, ?)
            "#,
        )
        .bind(player.id)
        .bind(&player.name)
        .bind(&player.email)
        .bind(&player.credential_hash)
        .bind(player.created_at)
        .bind(Json(&player.progression))
        .execute(&self.pool)
        .await;

        match result {
            Ok(_) => Ok(CreatePlayerOutcome::Created(Box::new(PlayerRecord {
                id: player.id,
                name: player.name.clone(),
                email: player.email.clone(),
                credential_hash: player.credential_hash.clone(),
                created_at: player.created_at,
                version: 1,
                progression: player.progression.clone(),
            }))),
            Err(e) => match unique_violation(&e) {
                Some(UniqueField::Name) => Ok(CreatePlayerOutcome::NameTaken),
                Some(UniqueField::Email) => Ok(CreatePlayerOutcome::EmailTaken),
                None => Err(e.into()),
            },
        }
    }

    async fn get_player(&self, player_id: Uuid) -> Result<Option<PlayerRecord>, StoreError> {
        let row = sqlx::query_as::<_, PlayerRow>(&format!("{SELECT_PLAYER} WHERE id = ?"))
            .bind(player_id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(Into::into))
    }

    async fn find_player_by_email(
        &self,
        email: &str,
    ) -> Result<Option<PlayerRecord>, StoreError> {
        let row = sqlx::query_as::<_, PlayerRow>(&format!("{SELECT_PLAYER} WHERE email = ?"))
            .bind(email)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(Into::into))
    }

    async fn rename_player(
        &self,
        player_id: Uuid,
        name: &str,
    ) -> Result<RenameOutcome, StoreError> {
        let result = sqlx::query("UPDATE players SET name = ? WHERE id = ?")
            .bind(name)
            .bind(player_id)
            .execute(&self.pool)
            .await;

        match result {
            Ok(done) if done.rows_affected() == 0 => Err(StoreError::PlayerNotFound(player_id)),
            Ok(_) => Ok(RenameOutcome::Renamed),
            Err(e) => match unique_violation(&e) {
                Some(UniqueField::Name) => Ok(RenameOutcome::NameTaken),
                _ => Err(e.into()),
            },
        }
    }

    async fn lock_player(&self, player_id: Uuid) -> Result<Box<dyn LockedPlayer>, StoreError> {
        let mut tx = self.pool.begin().await?;

        let touched = sqlx::query("UPDATE players SET version = version WHERE id = ?")
            .bind(player_id)
            .execute(&mut *tx)
            .await?;

        if touched.rows_affected() == 0 {
            tx.rollback().await?;
            return Err(StoreError::PlayerNotFound(player_id));
        }

        let row = sqlx::query_as::<_, PlayerRow>(&format!("{SELECT_PLAYER} WHERE id = ?"))
            .bind(player_id)
            .fetch_one(&mut *tx)
            .await?;

        debug!(player_id = %player_id, "Locked player row");
        Ok(Box::new(SqliteLockedPlayer {
            tx: Some(tx),
            record: row.into(),
        }))
    }

    async fn ping(&self) -> Result<(), StoreError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}

struct SqliteLockedPlayer {
    tx: Option<Transaction<'static, Sqlite>>,
    record: PlayerRecord,
}

#[async_trait::async_trait]
impl LockedPlayer for SqliteLockedPlayer {
    fn record(&self) -> &PlayerRecord {
        &self.record
    }

    async fn commit(&mut self, progression: &Progression) -> Result<i64, StoreError> {
        let Some(mut tx) = self.tx.take() else {
            return Err(StoreError::TransactionClosed(self.record.id));
        };

        let written = sqlx::query(
            r#"
            UPDATE players
            SET progression = ?, version = version + 1
            WHERE id = ? AND version = ?
            "#,
        )
        .bind(Json(progression))
        .bind(self.record.id)
        .bind(self.record.version)
        .execute(&mut *tx)
        .await?;

        if written.rows_affected() == 0 {
            warn!(
                player_id = %self.record.id,
                version = self.record.version,
                "Conditional write matched no row"
            );
            tx.rollback().await?;
            return Err(StoreError::VersionConflict {
                player_id: self.record.id,
                expected: self.record.version,
            });
        }

        tx.commit().await?;
        self.record.version += 1;
        self.record.progression = progression.clone();
        Ok(self.record.version)
    }

    async fn rollback(&mut self) -> Result<(), StoreError> {
        let Some(tx) = self.tx.take() else {
            return Err(StoreError::TransactionClosed(self.record.id));
        };
        tx.rollback().await?;
        Ok(())
    }
}
