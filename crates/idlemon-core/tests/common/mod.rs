// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Common test infrastructure for idlemon-core integration tests.
//!
//! Provides a [`TestContext`] wiring a [`GameService`] to a SQLite store, an
//! in-memory token cache, and a cheap credential hasher.

#![allow(dead_code)]

use std::io::Write;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::Utc;
use sqlx::sqlite::SqlitePoolOptions;
use tracing_subscriber::fmt::MakeWriter;
use uuid::Uuid;

use idlemon_core::catalog::Catalog;
use idlemon_core::credentials::CredentialHasher;
use idlemon_core::error::Result;
use idlemon_core::migrations;
use idlemon_core::persistence::{
    Mutation, PlayerRecord, PlayerStore, SqliteStore, locked_update,
};
use idlemon_core::progression::ResourceKind;
use idlemon_core::request::{SignInRequest, SignUpRequest};
use idlemon_core::service::{GameService, SignInOutcome, SignUpOutcome};
use idlemon_core::token::{MemoryTokenCache, TokenService};

pub const TEST_PASSWORD: &str = "hunter2hunter2";

/// Reversible stand-in for Argon2 so tests stay fast.
pub struct FakeHasher;

impl CredentialHasher for FakeHasher {
    fn hash(&self, password: &str) -> Result<String> {
        Ok(format!("fake${}", password))
    }

    fn verify(&self, password: &str, hash: &str) -> Result<bool> {
        Ok(hash.strip_prefix("fake$") == Some(password))
    }
}

/// A signed-in test player.
pub struct TestPlayer {
    pub id: Uuid,
    pub token: String,
    pub email: String,
}

impl TestPlayer {
    /// Authorization header value for this player.
    pub fn header(&self) -> String {
        format!("{}:{}", self.id, self.token)
    }
}

/// Service plus direct handles on its store and cache.
pub struct TestContext {
    pub service: GameService,
    pub store: Arc<SqliteStore>,
    pub cache: Arc<MemoryTokenCache>,
}

impl TestContext {
    /// In-memory SQLite with a single connection.
    pub async fn new() -> Self {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .expect("Failed to create in-memory SQLite pool");
        migrations::run_sqlite(&pool)
            .await
            .expect("Failed to run migrations");

        Self::with_store(SqliteStore::new(pool))
    }

    /// File-backed SQLite with a multi-connection pool.
    pub async fn file_backed(dir: &tempfile::TempDir) -> Self {
        let store = SqliteStore::from_path(dir.path().join("idlemon.db"))
            .await
            .expect("Failed to open SQLite database");
        Self::with_store(store)
    }

    fn with_store(store: SqliteStore) -> Self {
        let store = Arc::new(store);
        let cache = Arc::new(MemoryTokenCache::new());
        let _ = cache.spawn_purger(Duration::from_secs(1));
        let tokens = TokenService::new(cache.clone(), Duration::from_secs(60));
        let catalog = Arc::new(Catalog::embedded().expect("Failed to load catalog"));
        let dyn_store: Arc<dyn PlayerStore> = store.clone();

        let service = GameService::new(dyn_store, tokens, catalog, Arc::new(FakeHasher))
            .with_lock_timeout(Duration::from_secs(10));

        Self {
            service,
            store,
            cache,
        }
    }

    /// Sign up and sign in a player named `name`.
    pub async fn signed_in_player(&self, name: &str) -> TestPlayer {
        let email = format!("{}@example.com", name.to_lowercase());
        let outcome = self
            .service
            .sign_up(SignUpRequest {
                name: name.to_string(),
                email: email.clone(),
                password: TEST_PASSWORD.to_string(),
            })
            .await
            .expect("sign-up failed");
        assert!(
            matches!(outcome, SignUpOutcome::Created(_)),
            "unexpected sign-up outcome: {:?}",
            outcome
        );

        let outcome = self
            .service
            .sign_in(SignInRequest {
                email: email.clone(),
                password: TEST_PASSWORD.to_string(),
            })
            .await
            .expect("sign-in failed");
        let SignInOutcome::SignedIn { token, profile, .. } = outcome else {
            panic!("unexpected sign-in outcome: {:?}", outcome);
        };

        TestPlayer {
            id: profile.id,
            token,
            email,
        }
    }

    /// Current committed state of a player.
    pub async fn record(&self, player_id: Uuid) -> PlayerRecord {
        self.store
            .get_player(player_id)
            .await
            .expect("get_player failed")
            .expect("player not found")
    }

    /// Number of player rows.
    pub async fn player_count(&self) -> i64 {
        sqlx::query_scalar("SELECT COUNT(*) FROM players")
            .fetch_one(self.store.pool())
            .await
            .expect("count failed")
    }

    /// Move the campaign timer `secs` into the past.
    pub async fn backdate_campaign(&self, player_id: Uuid, secs: i64) {
        locked_update(&*self.store, player_id, |progression| {
            progression.campaign.last_collected_at = Utc::now() - chrono::Duration::seconds(secs);
            Mutation::Changed(())
        })
        .await
        .expect("backdate failed");
    }

    /// Credit gems directly.
    pub async fn grant_gems(&self, player_id: Uuid, amount: u64) {
        locked_update(&*self.store, player_id, |progression| {
            progression.ledger.credit(ResourceKind::Gems, amount);
            Mutation::Changed(())
        })
        .await
        .expect("grant failed");
    }
}

/// Tracing output written into memory.
#[derive(Clone, Default)]
pub struct CapturedLogs(Arc<Mutex<Vec<u8>>>);

impl CapturedLogs {
    /// Everything logged so far.
    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
    }
}

impl Write for CapturedLogs {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

impl<'a> MakeWriter<'a> for CapturedLogs {
    type Writer = CapturedLogs;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}

/// Route this thread's tracing output into memory until the guard drops.
///
/// Only works with the default single-threaded `#[tokio::test]` runtime.
pub fn capture_logs() -> (CapturedLogs, tracing::subscriber::DefaultGuard) {
    let logs = CapturedLogs::default();
    let subscriber = tracing_subscriber::fmt()
        .with_writer(logs.clone())
        .with_ansi(false)
        .with_max_level(tracing::Level::DEBUG)
        .finish();
    let guard = tracing::subscriber::set_default(subscriber);
    (logs, guard)
}

/// Skip test if TEST_DATABASE_URL is not set.
#[macro_export]
macro_rules! skip_if_no_db {
    () => {
        if std::env::var("TEST_DATABASE_URL").is_err() {
            eprintln!("Skipping test: TEST_DATABASE_URL not set");
            return;
        }
    };
}
