// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Player state storage and the locked read-modify-write protocol.
//!
//! Every mutation of a player's progression goes through [`locked_update`]:
//!
//! 1. begin a transaction and take an exclusive lock on the player's row,
//! 2. hand a copy of the locked progression to the mutator,
//! 3. on [`Mutation::Changed`] write it back conditionally on the locked
//!    version and commit; on [`Mutation::Unchanged`] roll back.
//!
//! Concurrent updates of the same player are serialized by the row lock, so
//! each mutator sees the result of every update committed before it. Any
//! failure or cancellation drops the transaction, which rolls it back; the
//! previously committed state stays authoritative.

pub mod postgres;
pub mod sqlite;

pub use self::postgres::PostgresStore;
pub use self::sqlite::SqliteStore;

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::types::Json;
use uuid::Uuid;

use crate::error::StoreError;
use crate::progression::Progression;

/// A player row with its decoded progression document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlayerRecord {
    /// Player ID.
    pub id: Uuid,
    /// Unique display name.
    pub name: String,
    /// Unique sign-in email.
    pub email: String,
    /// Opaque credential hash.
    pub credential_hash: String,
    /// When the player signed up.
    pub created_at: DateTime<Utc>,
    /// Row version, incremented by every committed locked update.
    pub version: i64,
    /// Mutable game state.
    pub progression: Progression,
}

impl PlayerRecord {
    /// The public part of the record.
    pub fn profile(&self) -> PlayerProfile {
        PlayerProfile {
            id: self.id,
            name: self.name.clone(),
            email: self.email.clone(),
            created_at: self.created_at,
        }
    }
}

/// Player identity without credentials or game state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlayerProfile {
    /// Player ID.
    pub id: Uuid,
    /// Display name.
    pub name: String,
    /// Sign-in email.
    pub email: String,
    /// When the player signed up.
    pub created_at: DateTime<Utc>,
}

/// Data for inserting a new player.
#[derive(Debug, Clone)]
pub struct NewPlayer {
    /// Player ID.
    pub id: Uuid,
    /// Display name.
    pub name: String,
    /// Sign-in email.
    pub email: String,
    /// Credential hash.
    pub credential_hash: String,
    /// Sign-up time.
    pub created_at: DateTime<Utc>,
    /// Initial progression document.
    pub progression: Progression,
}

/// Result of inserting a player.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CreatePlayerOutcome {
    /// The row was inserted.
    Created(Box<PlayerRecord>),
    /// Another player already has this name. Nothing was written.
    NameTaken,
    /// Another player already has this email. Nothing was written.
    EmailTaken,
}

/// Result of renaming a player.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RenameOutcome {
    /// The name was changed.
    Renamed,
    /// Another player already has this name. Nothing was written.
    NameTaken,
}

/// What a mutator did with the locked progression.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mutation<T> {
    /// The progression was modified and must be written back.
    Changed(T),
    /// Nothing to persist; the transaction is rolled back.
    Unchanged(T),
}

/// Player persistence backend.
#[async_trait::async_trait]
pub trait PlayerStore: Send + Sync {
    /// Insert a player together with its initial progression.
    async fn create_player(&self, player: &NewPlayer) -> Result<CreatePlayerOutcome, StoreError>;

    /// Read a player without locking.
    async fn get_player(&self, player_id: Uuid) -> Result<Option<PlayerRecord>, StoreError>;

    /// Read a player by sign-in email without locking.
    async fn find_player_by_email(&self, email: &str)
    -> Result<Option<PlayerRecord>, StoreError>;

    /// Change a player's display name.
    ///
    /// Fails with [`StoreError::PlayerNotFound`] if the player does not exist.
    async fn rename_player(&self, player_id: Uuid, name: &str)
    -> Result<RenameOutcome, StoreError>;

    /// Begin a transaction holding an exclusive lock on the player's row.
    ///
    /// The lock is held until the returned handle is committed, rolled back, or
    /// dropped. Fails with [`StoreError::PlayerNotFound`] if the row is missing.
    async fn lock_player(&self, player_id: Uuid) -> Result<Box<dyn LockedPlayer>, StoreError>;

    /// Check that the database is reachable.
    async fn ping(&self) -> Result<(), StoreError>;
}

/// An open transaction holding a player's row lock.
///
/// Dropping the handle without committing rolls the transaction back.
#[async_trait::async_trait]
pub trait LockedPlayer: Send {
    /// The row as read under the lock.
    fn record(&self) -> &PlayerRecord;

    /// Write `progression` back if the row is still at the locked version,
    /// then commit. Returns the new version.
    async fn commit(&mut self, progression: &Progression) -> Result<i64, StoreError>;

    /// Release the lock without writing.
    async fn rollback(&mut self) -> Result<(), StoreError>;
}

/// Run `mutator` against the locked progression of `player_id`.
///
/// The mutator receives a copy of the locked document; its edits are only
/// persisted when it returns [`Mutation::Changed`].
pub async fn locked_update<T, F>(
    store: &dyn PlayerStore,
    player_id: Uuid,
    mutator: F,
) -> Result<T, StoreError>
where
    T: Send,
    F: FnOnce(&mut Progression) -> Mutation<T> + Send,
{
    let mut locked = store.lock_player(player_id).await?;
    let mut progression = locked.record().progression.clone();

    match mutator(&mut progression) {
        Mutation::Changed(out) => {
            locked.commit(&progression).await?;
            Ok(out)
        }
        Mutation::Unchanged(out) => {
            locked.rollback().await?;
            Ok(out)
        }
    }
}

/// Which unique column a failed insert or update collided with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum UniqueField {
    Name,
    Email,
}

/// Classify a unique-constraint violation by the column it names.
///
/// PostgreSQL reports the constraint name; SQLite only reports
/// `UNIQUE constraint failed: players.<column>` in the message.
pub(crate) fn unique_violation(err: &sqlx::Error) -> Option<UniqueField> {
    let sqlx::Error::Database(db_err) = err else {
        return None;
    };
    if !db_err.is_unique_violation() {
        return None;
    }
    let target = db_err.constraint().unwrap_or_else(|| db_err.message());
    if target.contains("email") {
        Some(UniqueField::Email)
    } else if target.contains("name") {
        Some(UniqueField::Name)
    } else {
        None
    }
}

/// Row shape shared by both backends.
#[derive(Debug, sqlx::FromRow)]
pub(crate) struct PlayerRow {
    id: Uuid,
    name: String,
    email: String,
    credential_hash: String,
    created_at: DateTime<Utc>,
    version: i64,
    progression: Json<Progression>,
}

impl From<PlayerRow> for PlayerRecord {
    fn from(row: PlayerRow) -> Self {
        Self {
            id: row.id,
            name: row.name,
            email: row.email,
            credential_hash: row.credential_hash,
            created_at: row.created_at,
            version: row.version,
            progression: row.progression.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::Catalog;
    use crate::progression::ResourceKind;

    #[test]
    fn test_profile_omits_credentials() {
        let catalog = Catalog::embedded().unwrap();
        let record = PlayerRecord {
            id: Uuid::new_v4(),
            name: "ash".to_string(),
            email: "ash@example.com".to_string(),
            credential_hash: "secret-hash".to_string(),
            created_at: Utc::now(),
            version: 3,
            progression: Progression::seed(&catalog, Utc::now()),
        };

        let profile = record.profile();
        assert_eq!(profile.id, record.id);
        assert_eq!(profile.name, "ash");

        let json = serde_json::to_string(&profile).unwrap();
        assert!(!json.contains("secret-hash"));
        assert!(!json.contains(ResourceKind::Gold.as_str()));
    }
}
