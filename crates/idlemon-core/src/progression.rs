// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! The progression document: everything about a player that changes during play.
//!
//! The document is stored as one serialized blob per player row and is only ever
//! mutated through [`locked_update`](crate::persistence::locked_update). Optional
//! fields default when absent so documents written by older builds still load.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::catalog::Catalog;

/// Kinds of countable resources held in the ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
    /// Soft currency.
    Gold,
    /// Premium currency.
    Gems,
    /// Used to level units.
    ExpStones,
    /// Used to evolve units.
    EvoStones,
}

impl ResourceKind {
    /// Every resource kind, in ledger order.
    pub const ALL: [ResourceKind; 4] = [
        ResourceKind::Gold,
        ResourceKind::Gems,
        ResourceKind::ExpStones,
        ResourceKind::EvoStones,
    ];

    /// Stable string form, matching the serialized representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Gold => "gold",
            Self::Gems => "gems",
            Self::ExpStones => "exp_stones",
            Self::EvoStones => "evo_stones",
        }
    }
}

impl std::fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Non-negative resource balances plus item counts.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResourceLedger {
    /// Balance per resource kind. Missing kinds read as zero.
    pub balances: BTreeMap<ResourceKind, u64>,
    /// Item counts keyed by catalog reference.
    pub items: BTreeMap<String, u64>,
}

impl ResourceLedger {
    /// Current balance of a resource.
    pub fn balance(&self, kind: ResourceKind) -> u64 {
        self.balances.get(&kind).copied().unwrap_or(0)
    }

    /// Add to a balance, saturating at `u64::MAX`.
    pub fn credit(&mut self, kind: ResourceKind, amount: u64) {
        let balance = self.balances.entry(kind).or_insert(0);
        *balance = balance.saturating_add(amount);
    }

    /// Subtract from a balance.
    ///
    /// Returns `false` and leaves the balance untouched when it is insufficient.
    pub fn debit(&mut self, kind: ResourceKind, amount: u64) -> bool {
        let current = self.balance(kind);
        match current.checked_sub(amount) {
            Some(remaining) => {
                self.balances.insert(kind, remaining);
                true
            }
            None => false,
        }
    }

    /// Current count of an item.
    pub fn item_count(&self, reference: &str) -> u64 {
        self.items.get(reference).copied().unwrap_or(0)
    }

    /// Add items, saturating at `u64::MAX`.
    pub fn credit_item(&mut self, reference: &str, amount: u64) {
        let count = self.items.entry(reference.to_string()).or_insert(0);
        *count = count.saturating_add(amount);
    }
}

/// Campaign progress and the accrual timer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CampaignState {
    /// Current campaign level, starting at 1.
    pub level: u32,
    /// When resources were last collected.
    pub last_collected_at: DateTime<Utc>,
}

impl CampaignState {
    /// Fresh campaign at level 1 whose timer starts at `now`.
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            level: 1,
            last_collected_at: now,
        }
    }
}

impl Default for CampaignState {
    fn default() -> Self {
        Self::new(Utc::now())
    }
}

/// Progress on a single daily quest.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct QuestProgress {
    /// Qualifying events seen so far.
    pub count: u32,
    /// Whether the quest has been completed. One-way.
    pub completed: bool,
    /// When the quest was completed.
    pub completed_at: Option<DateTime<Utc>>,
}

/// A unit owned by the player.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OwnedUnit {
    /// Catalog template this unit was created from.
    pub template_id: u32,
    /// Locked units cannot be disposed of.
    #[serde(default)]
    pub locked: bool,
    /// When the unit was acquired.
    #[serde(default = "epoch")]
    pub acquired_at: DateTime<Utc>,
}

fn epoch() -> DateTime<Utc> {
    DateTime::UNIX_EPOCH
}

/// The full mutable record of a player's progress.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Progression {
    /// Resource balances and items.
    pub ledger: ResourceLedger,
    /// Player experience.
    pub exp: u64,
    /// Campaign level and accrual timer.
    pub campaign: CampaignState,
    /// Daily quest progress keyed by quest ID.
    pub quests: BTreeMap<u32, QuestProgress>,
    /// Owned units keyed by unit instance ID.
    pub units: BTreeMap<String, OwnedUnit>,
}

impl Progression {
    /// Document for a newly signed-up player.
    ///
    /// Every catalog resource starts at zero, every daily quest at zero
    /// progress, the campaign at level 1 with its timer at `now`, and no units.
    pub fn seed(catalog: &Catalog, now: DateTime<Utc>) -> Self {
        let balances = catalog.resources.keys().map(|kind| (*kind, 0)).collect();
        let quests = catalog
            .daily_quests
            .keys()
            .map(|id| (*id, QuestProgress::default()))
            .collect();

        Self {
            ledger: ResourceLedger {
                balances,
                items: BTreeMap::new(),
            },
            exp: 0,
            campaign: CampaignState::new(now),
            quests,
            units: BTreeMap::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_debit_rejects_instead_of_underflowing() {
        let mut ledger = ResourceLedger::default();
        ledger.credit(ResourceKind::Gems, 30);

        assert!(!ledger.debit(ResourceKind::Gems, 31));
        assert_eq!(ledger.balance(ResourceKind::Gems), 30);

        assert!(ledger.debit(ResourceKind::Gems, 30));
        assert_eq!(ledger.balance(ResourceKind::Gems), 0);

        assert!(!ledger.debit(ResourceKind::Gold, 1));
        assert_eq!(ledger.balance(ResourceKind::Gold), 0);
    }

    #[test]
    fn test_credit_saturates() {
        let mut ledger = ResourceLedger::default();
        ledger.credit(ResourceKind::Gold, u64::MAX - 1);
        ledger.credit(ResourceKind::Gold, 10);
        assert_eq!(ledger.balance(ResourceKind::Gold), u64::MAX);

        ledger.credit_item("summon_scroll", u64::MAX);
        ledger.credit_item("summon_scroll", 1);
        assert_eq!(ledger.item_count("summon_scroll"), u64::MAX);
    }

    #[test]
    fn test_seed_from_catalog() {
        let catalog = Catalog::embedded().unwrap();
        let now = Utc::now();
        let progression = Progression::seed(&catalog, now);

        for kind in ResourceKind::ALL {
            assert_eq!(progression.ledger.balances.get(&kind), Some(&0));
        }
        assert_eq!(progression.quests.len(), catalog.daily_quests.len());
        assert!(progression.quests.values().all(|q| q.count == 0 && !q.completed));
        assert_eq!(progression.campaign.level, 1);
        assert_eq!(progression.campaign.last_collected_at, now);
        assert!(progression.units.is_empty());
        assert_eq!(progression.exp, 0);
    }

    #[test]
    fn test_document_tolerates_missing_fields() {
        let json = r#"{"ledger":{"balances":{"gold":12}},"campaign":{"level":4,"last_collected_at":"2026-01-01T00:00:00Z"}}"#;
        let progression: Progression = serde_json::from_str(json).unwrap();

        assert_eq!(progression.ledger.balance(ResourceKind::Gold), 12);
        assert_eq!(progression.ledger.balance(ResourceKind::Gems), 0);
        assert_eq!(progression.campaign.level, 4);
        assert_eq!(progression.exp, 0);
        assert!(progression.quests.is_empty());
        assert!(progression.ledger.items.is_empty());
    }

    #[test]
    fn test_document_ignores_unknown_fields() {
        let json = r#"{"exp":5,"guild":{"id":9},"units":{"u1":{"template_id":3,"future_flag":true}}}"#;
        let progression: Progression = serde_json::from_str(json).unwrap();

        assert_eq!(progression.exp, 5);
        let unit = &progression.units["u1"];
        assert_eq!(unit.template_id, 3);
        assert!(!unit.locked);
    }
}
