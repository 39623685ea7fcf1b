// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! PostgreSQL-backed player store.
//!
//! Row locks are taken with `SELECT ... FOR UPDATE`. Each locked transaction
//! sets `lock_timeout` locally so a stuck lock holder cannot block waiters
//! indefinitely.

use std::time::Duration;

use sqlx::types::Json;
use sqlx::{PgPool, Postgres, Transaction};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::error::StoreError;
use crate::progression::Progression;

use super::{
    CreatePlayerOutcome, LockedPlayer, NewPlayer, PlayerRecord, PlayerRow, PlayerStore,
    RenameOutcome, UniqueField, unique_violation,
};

const SELECT_PLAYER: &str = r#"
    SELECT id, name, email, credential_hash, created_at, version, progression
    FROM players
"#;

/// PostgreSQL-backed [`PlayerStore`].
#[derive(Clone)]
pub struct PostgresStore {
    pool: PgPool,
    lock_timeout: Duration,
}

impl PostgresStore {
    /// Create a store over an existing pool.
    ///
    /// `lock_timeout` bounds how long a locked update waits for the row lock.
    pub fn new(pool: PgPool, lock_timeout: Duration) -> Self {
        Self { pool, lock_timeout }
    }

    /// The underlying pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait::async_trait]
impl PlayerStore for PostgresStore {
    async fn create_player(&self, player: &NewPlayer) -> Result<CreatePlayerOutcome, StoreError> {
        let result = sqlx::query_as::<_, PlayerRow>(
            r#"
            INSERT INTO players (id, name, email, credential_hash, created_at, version, progression)
            VALUES ($1, $2, $3, $4, $5, 1, $6)
            RETURNING id, name, email, credential_hash, created_at, version, progression
            "#,
        )
        .bind(player.id)
        .bind(&player.name)
        .bind(&player.email)
        .bind(&player.credential_hash)
        .bind(player.created_at)
        .bind(Json(&player.progression))
        .fetch_one(&self.pool)
        .await;

        match result {
            Ok(row) => Ok(CreatePlayerOutcome::Created(Box::new(row.into()))),
            Err(e) => match unique_violation(&e) {
                Some(UniqueField::Name) => Ok(CreatePlayerOutcome::NameTaken),
                Some(UniqueField::Email) => Ok(CreatePlayerOutcome::EmailTaken),
                None => Err(e.into()),
            },
        }
    }

    async fn get_player(&self, player_id: Uuid) -> Result<Option<PlayerRecord>, StoreError> {
        let row = sqlx::query_as::<_, PlayerRow>(&format!("{SELECT_PLAYER} WHERE id = $1"))
            .bind(player_id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(Into::into))
    }

    async fn find_player_by_email(
        &self,
        email: &str,
    ) -> Result<Option<PlayerRecord>, StoreError> {
        let row = sqlx::query_as::<_, PlayerRow>(&format!("{SELECT_PLAYER} WHERE email = $1"))
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
        let result = sqlx::query("UPDATE players SET name = $2 WHERE id = $1")
            .bind(player_id)
            .bind(name)
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

        sqlx::query("SELECT set_config('lock_timeout', $1, true)")
            .bind(format!("{}ms", self.lock_timeout.as_millis()))
            .execute(&mut *tx)
            .await?;

        let row = sqlx::query_as::<_, PlayerRow>(&format!(
            "{SELECT_PLAYER} WHERE id = $1 FOR UPDATE"
        ))
        .bind(player_id)
        .fetch_optional(&mut *tx)
        .await?;

        let Some(row) = row else {
            tx.rollback().await?;
            return Err(StoreError::PlayerNotFound(player_id));
        };

        debug!(player_id = %player_id, "Locked player row");
        Ok(Box::new(PostgresLockedPlayer {
            tx: Some(tx),
            record: row.into(),
        }))
    }

    async fn ping(&self) -> Result<(), StoreError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}

struct PostgresLockedPlayer {
    tx: Option<Transaction<'static, Postgres>>,
    record: PlayerRecord,
}

#[async_trait::async_trait]
impl LockedPlayer for PostgresLockedPlayer {
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
            SET progression = $2, version = version + 1
            WHERE id = $1 AND version = $3
            "#,
        )
        .bind(self.record.id)
        .bind(Json(progression))
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
