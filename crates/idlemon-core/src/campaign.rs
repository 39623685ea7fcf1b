// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Campaign accrual.
//!
//! Resources are not generated on a running timer. Instead, each collection
//! computes what accrued since the previous one:
//!
//! ```text
//! elapsed = clamp(now - last_collected_at, 0, CAMPAIGN_MAX_COLLECT_SECS)
//! rate    = base + growth * floor((level - 1) / 5)
//! gained  = rate * elapsed_seconds
//! ```
//!
//! The timer always advances to `now`, but the caller only persists the new
//! state when something was gained.

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;

use crate::progression::{CampaignState, Progression, ResourceKind};

/// Longest absence, in seconds, that still accrues. Time beyond this is not granted.
pub const CAMPAIGN_MAX_COLLECT_SECS: i64 = 24 * 60 * 60;

/// Exp per second at level 1.
pub const CAMPAIGN_EXP_PER_SEC: u64 = 5;
/// Gold per second at level 1.
pub const CAMPAIGN_GOLD_PER_SEC: u64 = 20;
/// Exp stones per second at level 1.
pub const CAMPAIGN_EXP_STONE_PER_SEC: u64 = 2;

/// Exp rate increase every [`CAMPAIGN_LEVELS_PER_STEP`] levels.
pub const CAMPAIGN_EXP_GROWTH: u64 = 2;
/// Gold rate increase every [`CAMPAIGN_LEVELS_PER_STEP`] levels.
pub const CAMPAIGN_GOLD_GROWTH: u64 = 1;
/// Exp stone rate increase every [`CAMPAIGN_LEVELS_PER_STEP`] levels.
pub const CAMPAIGN_EXP_STONE_GROWTH: u64 = 3;

/// Number of levels between rate increases.
pub const CAMPAIGN_LEVELS_PER_STEP: u32 = 5;

/// Per-second accrual rates for a campaign level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CampaignRates {
    /// Exp per second.
    pub exp: u64,
    /// Gold per second.
    pub gold: u64,
    /// Exp stones per second.
    pub exp_stones: u64,
}

impl CampaignRates {
    /// Rates at `level`. Levels below 1 use the level 1 rates.
    pub fn for_level(level: u32) -> Self {
        let steps = u64::from(level.max(1) - 1) / u64::from(CAMPAIGN_LEVELS_PER_STEP);

        Self {
            exp: CAMPAIGN_EXP_PER_SEC + CAMPAIGN_EXP_GROWTH * steps,
            gold: CAMPAIGN_GOLD_PER_SEC + CAMPAIGN_GOLD_GROWTH * steps,
            exp_stones: CAMPAIGN_EXP_STONE_PER_SEC + CAMPAIGN_EXP_STONE_GROWTH * steps,
        }
    }
}

/// Result of one collection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Collection {
    /// Exp gained.
    pub exp: u64,
    /// Gold gained.
    pub gold: u64,
    /// Exp stones gained.
    pub exp_stones: u64,
    /// Campaign state with the timer advanced.
    pub state: CampaignState,
}

impl Collection {
    /// Whether anything was gained. Only then is the new state worth persisting.
    pub fn has_gains(&self) -> bool {
        self.exp > 0 || self.gold > 0 || self.exp_stones > 0
    }

    /// Credit the gains and store the advanced campaign state.
    pub fn apply(&self, progression: &mut Progression) {
        progression.exp = progression.exp.saturating_add(self.exp);
        progression.ledger.credit(ResourceKind::Gold, self.gold);
        progression
            .ledger
            .credit(ResourceKind::ExpStones, self.exp_stones);
        progression.campaign = self.state.clone();
    }
}

/// Seconds that accrue between `last_collected_at` and `now`.
///
/// Negative spans (clock skew) count as zero; spans above the cap are clamped.
pub fn collectible_seconds(last_collected_at: DateTime<Utc>, now: DateTime<Utc>) -> u64 {
    let cap = Duration::seconds(CAMPAIGN_MAX_COLLECT_SECS);
    let elapsed = (now - last_collected_at).clamp(Duration::zero(), cap);
    // Bounded by the cap, so the conversion cannot fail.
    u64::try_from(elapsed.num_seconds()).unwrap_or(0)
}

/// Compute what the campaign yields when collected at `now`.
pub fn collect(state: &CampaignState, now: DateTime<Utc>) -> Collection {
    let seconds = collectible_seconds(state.last_collected_at, now);
    let rates = CampaignRates::for_level(state.level);

    Collection {
        exp: rates.exp.saturating_mul(seconds),
        gold: rates.gold.saturating_mul(seconds),
        exp_stones: rates.exp_stones.saturating_mul(seconds),
        state: CampaignState {
            level: state.level,
            last_collected_at: state.last_collected_at.max(now),
        },
    }
}
