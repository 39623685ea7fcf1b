// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Idlemon Core - Player-State Engine
//!
//! This crate is the backend engine of an idle collection game. Players accrue
//! resources over time, complete daily quests, summon and manage units, and
//! authenticate with short-lived tokens. All of a player's mutable state lives
//! in one progression document per player row.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Transport (HTTP / WebSocket)                        │
//! │                 routes, headers, framing - not in this crate             │
//! └─────────────────────────────────────────────────────────────────────────┘
//!                                    │ Route + body + authorization
//!                                    ▼
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                             GameService                                  │
//! │   sign-up/in/out, rename, campaign, daily quests, summon, unit lock      │
//! └─────────────────────────────────────────────────────────────────────────┘
//!        │                    │                         │
//!        ▼                    ▼                         ▼
//! ┌──────────────┐   ┌──────────────────┐   ┌──────────────────────────────┐
//! │ TokenService │   │  locked_update   │   │ campaign / quest / reward /  │
//! │ Redis or     │   │  PlayerStore     │   │ units (pure, catalog-driven) │
//! │ in-memory    │   │  Postgres/SQLite │   │                              │
//! └──────────────┘   └──────────────────┘   └──────────────────────────────┘
//! ```
//!
//! # Locked Updates
//!
//! Every progression change runs as: begin transaction, lock the player row,
//! compute on a copy, then either write back conditionally on the row version
//! and commit, or roll back when nothing changed. Concurrent requests for the
//! same player are serialized by the row lock; a failure or timeout leaves the
//! last committed state in place.
//!
//! # Configuration
//!
//! Configuration is loaded from environment variables:
//!
//! | Variable | Required | Default | Description |
//! |----------|----------|---------|-------------|
//! | `IDLEMON_DATABASE_URL` | Yes | - | PostgreSQL connection string |
//! | `IDLEMON_REDIS_URL` | No | `redis://127.0.0.1:6379` | Token cache |
//! | `IDLEMON_TOKEN_TTL_SECS` | No | `43200` | Token lifetime |
//! | `IDLEMON_MAX_DB_CONNECTIONS` | No | `10` | Pool size |
//! | `IDLEMON_DB_CONNECT_RETRIES` | No | `6` | Startup connection attempts |
//! | `IDLEMON_LOCK_TIMEOUT_MS` | No | `5000` | Bound on one locked update |
//! | `IDLEMON_CLIENT_VERSION` | No | `1.0.0` | Expected client version |
//! | `IDLEMON_RUN_MIGRATIONS` | No | `true` | Migrate at startup |

#![deny(missing_docs)]

/// Campaign accrual.
pub mod campaign;

/// Static game content.
pub mod catalog;

/// Server configuration loaded from environment variables.
pub mod config;

/// Credential hashing.
pub mod credentials;

/// Error types with caller-facing codes.
pub mod error;

/// Embedded database migrations.
pub mod migrations;

/// Player storage backends and the locked update protocol.
pub mod persistence;

/// The per-player progression document.
pub mod progression;

/// Daily quest state machine.
pub mod quest;

/// Route table and request body validation.
pub mod request;

/// Reward application.
pub mod reward;

/// Player-facing operations.
pub mod service;

/// Auth token issuance and validation.
pub mod token;

/// Unit summoning and locking.
pub mod units;

pub use error::{Error, Result};
pub use service::GameService;
