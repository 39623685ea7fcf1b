// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Player-facing operations.
//!
//! [`GameService`] composes the store, token service, catalog, and credential
//! hasher. Every change to a player's progression runs inside
//! [`locked_update`], bounded by the configured lock timeout.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use serde::Serialize;
use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;

use crate::campaign::{self, Collection};
use crate::catalog::Catalog;
use crate::config::SERVER_VERSION;
use crate::credentials::CredentialHasher;
use crate::error::{Error, Result, StoreError};
use crate::persistence::{
    CreatePlayerOutcome, Mutation, NewPlayer, PlayerProfile, PlayerStore, RenameOutcome,
    locked_update,
};
use crate::progression::Progression;
use crate::quest::{self, DAILY_QUEST_SIGN_IN, QuestCompletion};
use crate::request::{RenameRequest, SignInRequest, SignUpRequest, normalize_email};
use crate::reward::Reward;
use crate::token::TokenService;
use crate::units::{self, SummonOutcome, ToggleLockOutcome};

/// Conflict message for a duplicate player name.
pub const NAME_TAKEN_MESSAGE: &str = "name is already taken";
/// Conflict message for a duplicate email.
pub const EMAIL_TAKEN_MESSAGE: &str = "an account with this email already exists";

/// Default bound on a single locked update.
pub const DEFAULT_LOCK_TIMEOUT: Duration = Duration::from_secs(5);

/// Result of a sign-up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SignUpOutcome {
    /// The player was created.
    Created(PlayerProfile),
    /// The name is in use. No row was created.
    NameTaken,
    /// The email is in use. No row was created.
    EmailTaken,
}

impl SignUpOutcome {
    /// Turn rejections into [`Error::Conflict`].
    pub fn into_result(self) -> Result<PlayerProfile> {
        match self {
            SignUpOutcome::Created(profile) => Ok(profile),
            SignUpOutcome::NameTaken => Err(Error::Conflict(NAME_TAKEN_MESSAGE.to_string())),
            SignUpOutcome::EmailTaken => Err(Error::Conflict(EMAIL_TAKEN_MESSAGE.to_string())),
        }
    }
}

impl RenameOutcome {
    /// Turn rejections into [`Error::Conflict`].
    pub fn into_result(self) -> Result<()> {
        match self {
            RenameOutcome::Renamed => Ok(()),
            RenameOutcome::NameTaken => Err(Error::Conflict(NAME_TAKEN_MESSAGE.to_string())),
        }
    }
}

/// Result of a sign-in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SignInOutcome {
    /// Credentials accepted; a fresh token was issued.
    SignedIn {
        /// Token for the authorization header.
        token: String,
        /// The player.
        profile: PlayerProfile,
        /// The player's progression after the sign-in quest was advanced.
        progression: Progression,
    },
    /// Unknown email or wrong password. The two are not distinguished.
    InvalidCredentials,
}

/// Result of completing a daily quest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DailyQuestOutcome {
    /// What the state machine decided.
    #[serde(flatten)]
    pub completion: QuestCompletion,
    /// The reward granted, only on a fresh completion.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reward: Option<Reward>,
}

/// Server and expected client versions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VersionInfo {
    /// This server's version.
    pub server: String,
    /// Client version the server expects.
    pub client: String,
}

/// Reachability of the service's dependencies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct HealthStatus {
    /// The player store answered.
    pub database: bool,
    /// The token cache answered.
    pub cache: bool,
}

impl HealthStatus {
    /// Whether every dependency is reachable.
    pub fn is_healthy(&self) -> bool {
        self.database && self.cache
    }
}

/// The game engine's public surface.
#[derive(Clone)]
pub struct GameService {
    store: Arc<dyn PlayerStore>,
    tokens: TokenService,
    catalog: Arc<Catalog>,
    hasher: Arc<dyn CredentialHasher>,
    lock_timeout: Duration,
    client_version: String,
}

impl GameService {
    /// Build a service with the default lock timeout and a client version
    /// equal to the server version.
    pub fn new(
        store: Arc<dyn PlayerStore>,
        tokens: TokenService,
        catalog: Arc<Catalog>,
        hasher: Arc<dyn CredentialHasher>,
    ) -> Self {
        Self {
            store,
            tokens,
            catalog,
            hasher,
            lock_timeout: DEFAULT_LOCK_TIMEOUT,
            client_version: SERVER_VERSION.to_string(),
        }
    }

    /// Bound every locked update by `timeout`.
    pub fn with_lock_timeout(mut self, timeout: Duration) -> Self {
        self.lock_timeout = timeout;
        self
    }

    /// Set the client version reported by [`GameService::version`].
    pub fn with_client_version(mut self, version: impl Into<String>) -> Self {
        self.client_version = version.into();
        self
    }

    /// The game content.
    pub fn catalog(&self) -> &Arc<Catalog> {
        &self.catalog
    }

    /// The token service.
    pub fn tokens(&self) -> &TokenService {
        &self.tokens
    }

    /// Resolve an authorization header to a player, or [`Error::Unauthorized`].
    pub async fn authenticate(&self, authorization: &str) -> Result<Uuid> {
        match reported(self.tokens.authenticate(authorization).await)? {
            Some(player_id) => Ok(player_id),
            None => {
                debug!("Rejected authorization header");
                Err(Error::Unauthorized)
            }
        }
    }

    /// Create a player with a freshly seeded progression.
    #[instrument(skip_all, fields(name = %request.name))]
    pub async fn sign_up(&self, request: SignUpRequest) -> Result<SignUpOutcome> {
        request.validate()?;

        let credential_hash = reported(self.hash_credential(request.password).await)?;
        let now = Utc::now();
        let player = NewPlayer {
            id: Uuid::new_v4(),
            name: request.name,
            email: normalize_email(&request.email),
            credential_hash,
            created_at: now,
            progression: Progression::seed(&self.catalog, now),
        };

        let outcome = match reported(self.store.create_player(&player).await)? {
            CreatePlayerOutcome::Created(record) => {
                info!(player_id = %record.id, "New player registered");
                SignUpOutcome::Created(record.profile())
            }
            CreatePlayerOutcome::NameTaken => {
                info!("Sign-up rejected: name taken");
                SignUpOutcome::NameTaken
            }
            CreatePlayerOutcome::EmailTaken => {
                info!("Sign-up rejected: email taken");
                SignUpOutcome::EmailTaken
            }
        };
        Ok(outcome)
    }

    /// Check credentials, advance the sign-in quest, and issue a token.
    #[instrument(skip_all)]
    pub async fn sign_in(&self, request: SignInRequest) -> Result<SignInOutcome> {
        request.validate()?;

        let email = normalize_email(&request.email);
        let Some(record) = reported(self.store.find_player_by_email(&email).await)? else {
            info!("Sign-in rejected: unknown email");
            return Ok(SignInOutcome::InvalidCredentials);
        };

        let hasher = Arc::clone(&self.hasher);
        let hash = record.credential_hash.clone();
        let password = request.password;
        let verified = reported(
            tokio::task::spawn_blocking(move || hasher.verify(&password, &hash))
                .await
                .map_err(|e| Error::Credential(format!("verification task failed: {e}")))
                .and_then(|verified| verified),
        )?;
        if !verified {
            info!(player_id = %record.id, "Sign-in rejected: wrong password");
            return Ok(SignInOutcome::InvalidCredentials);
        }

        let progression = self
            .locked(record.id, |progression| {
                let advanced =
                    quest::record_event(progression.quests.entry(DAILY_QUEST_SIGN_IN).or_default());
                if advanced {
                    Mutation::Changed(progression.clone())
                } else {
                    Mutation::Unchanged(progression.clone())
                }
            })
            .await?;

        let token = reported(self.tokens.issue(record.id).await)?;

        info!(player_id = %record.id, "Player signed in");
        Ok(SignInOutcome::SignedIn {
            token,
            profile: record.profile(),
            progression,
        })
    }

    /// Invalidate the player's token.
    #[instrument(skip_all, fields(player_id = %player_id))]
    pub async fn sign_out(&self, player_id: Uuid) -> Result<()> {
        reported(self.tokens.revoke(player_id).await)?;
        info!("Player signed out");
        Ok(())
    }

    /// Change the player's display name.
    #[instrument(skip_all, fields(player_id = %player_id, name = %request.name))]
    pub async fn rename(&self, player_id: Uuid, request: RenameRequest) -> Result<RenameOutcome> {
        request.validate()?;

        let outcome = reported(self.store.rename_player(player_id, &request.name).await)?;
        match outcome {
            RenameOutcome::Renamed => info!("Player renamed"),
            RenameOutcome::NameTaken => info!("Rename rejected: name taken"),
        }
        Ok(outcome)
    }

    /// Collect campaign resources accrued since the last collection.
    ///
    /// Only a collection with positive gains is persisted.
    #[instrument(skip_all, fields(player_id = %player_id))]
    pub async fn collect_campaign(&self, player_id: Uuid) -> Result<Collection> {
        let now = Utc::now();
        let collection = self
            .locked(player_id, move |progression| {
                let collection = campaign::collect(&progression.campaign, now);
                if collection.has_gains() {
                    collection.apply(progression);
                    Mutation::Changed(collection)
                } else {
                    Mutation::Unchanged(collection)
                }
            })
            .await?;

        info!(
            exp = collection.exp,
            gold = collection.gold,
            exp_stones = collection.exp_stones,
            "Campaign collected"
        );
        Ok(collection)
    }

    /// Complete a daily quest and grant its reward, at most once.
    #[instrument(skip_all, fields(player_id = %player_id, quest_id = quest_id))]
    pub async fn complete_daily_quest(
        &self,
        player_id: Uuid,
        quest_id: u32,
    ) -> Result<DailyQuestOutcome> {
        let Some(definition) = self.catalog.daily_quest(quest_id).cloned() else {
            return Err(Error::validation(
                "quest_id",
                format!("unknown daily quest {}", quest_id),
            ));
        };

        let now = Utc::now();
        let outcome = self
            .locked(player_id, move |progression| {
                let progress = progression.quests.entry(definition.id).or_default();
                match quest::complete(progress, &definition, now) {
                    completion @ QuestCompletion::Completed { .. } => {
                        definition.reward.apply(progression);
                        Mutation::Changed(DailyQuestOutcome {
                            completion,
                            reward: Some(definition.reward),
                        })
                    }
                    completion => Mutation::Unchanged(DailyQuestOutcome {
                        completion,
                        reward: None,
                    }),
                }
            })
            .await?;

        match &outcome.completion {
            QuestCompletion::Completed { .. } => info!("Daily quest completed"),
            other => info!(outcome = ?other, "Daily quest not completed"),
        }
        Ok(outcome)
    }

    /// Flip the lock flag of one of the player's units.
    #[instrument(skip_all, fields(player_id = %player_id, unit_id = %unit_id))]
    pub async fn toggle_unit_lock(
        &self,
        player_id: Uuid,
        unit_id: &str,
    ) -> Result<ToggleLockOutcome> {
        let outcome = self
            .locked(player_id, |progression| {
                match units::toggle_lock(progression, unit_id) {
                    toggled @ ToggleLockOutcome::Toggled { .. } => Mutation::Changed(toggled),
                    other => Mutation::Unchanged(other),
                }
            })
            .await?;

        match &outcome {
            ToggleLockOutcome::Toggled { locked, .. } => info!(locked, "Unit lock toggled"),
            ToggleLockOutcome::UnitNotFound => info!("Unit lock toggle rejected: unit not found"),
        }
        Ok(outcome)
    }

    /// Spend gems on a random unit.
    #[instrument(skip_all, fields(player_id = %player_id))]
    pub async fn summon_unit(&self, player_id: Uuid) -> Result<SummonOutcome> {
        let catalog = Arc::clone(&self.catalog);
        let now = Utc::now();
        let outcome = self
            .locked(player_id, move |progression| {
                let mut rng = rand::thread_rng();
                match units::summon(progression, &catalog, &mut rng, now) {
                    summoned @ SummonOutcome::Summoned { .. } => Mutation::Changed(summoned),
                    other => Mutation::Unchanged(other),
                }
            })
            .await?;

        match &outcome {
            SummonOutcome::Summoned { unit_id, unit } => info!(
                unit_id = %unit_id,
                template_id = unit.template_id,
                "Unit summoned"
            ),
            other => info!(outcome = ?other, "Summon rejected"),
        }
        Ok(outcome)
    }

    /// Server and expected client versions.
    pub fn version(&self) -> VersionInfo {
        VersionInfo {
            server: SERVER_VERSION.to_string(),
            client: self.client_version.clone(),
        }
    }

    /// Probe the store and the token cache.
    #[instrument(skip(self))]
    pub async fn health_check(&self) -> HealthStatus {
        let database = match self.store.ping().await {
            Ok(()) => true,
            Err(e) => {
                warn!(error = %e, "Player store unreachable");
                false
            }
        };
        let cache = match self.tokens.ping().await {
            Ok(()) => true,
            Err(e) => {
                warn!(error = %e, "Token cache unreachable");
                false
            }
        };
        HealthStatus { database, cache }
    }

    async fn hash_credential(&self, password: String) -> Result<String> {
        let hasher = Arc::clone(&self.hasher);
        tokio::task::spawn_blocking(move || hasher.hash(&password))
            .await
            .map_err(|e| Error::Credential(format!("hashing task failed: {e}")))?
    }

    /// [`locked_update`] bounded by the lock timeout. A timed-out update is
    /// dropped, which rolls its transaction back.
    async fn locked<T, F>(&self, player_id: Uuid, mutator: F) -> Result<T>
    where
        T: Send,
        F: FnOnce(&mut Progression) -> Mutation<T> + Send,
    {
        let update = locked_update(self.store.as_ref(), player_id, mutator);
        let result = match tokio::time::timeout(self.lock_timeout, update).await {
            Ok(result) => result,
            Err(_) => Err(StoreError::Timeout(self.lock_timeout)),
        };
        reported(result)
    }
}

/// Convert into [`Error`], logging infrastructure failures with their detail.
fn reported<T, E: Into<Error>>(result: std::result::Result<T, E>) -> Result<T> {
    result.map_err(|e| {
        let err = e.into();
        if err.is_internal() {
            error!(error = %err, code = err.error_code(), "Operation failed");
        }
        err
    })
}
