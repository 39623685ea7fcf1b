// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Unit ownership: summoning new units and toggling their lock flag.

use chrono::{DateTime, Utc};
use rand::Rng;
use rand::distributions::Alphanumeric;
use serde::Serialize;

use crate::catalog::Catalog;
use crate::progression::{OwnedUnit, Progression, ResourceKind};

/// Length of a unit instance ID.
pub const UNIT_ID_LEN: usize = 32;

/// Gems spent per summon.
pub const SUMMON_GEM_COST: u64 = 100;

/// Result of a summon attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SummonOutcome {
    /// A unit was added and the cost was paid.
    Summoned {
        /// New unit instance ID.
        unit_id: String,
        /// The new unit.
        unit: OwnedUnit,
    },
    /// Not enough gems. Nothing changed.
    InsufficientFunds {
        /// Gems needed.
        required: u64,
        /// Gems held.
        available: u64,
    },
    /// The catalog has nothing to summon. Nothing changed.
    Unavailable,
}

/// Result of a lock toggle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ToggleLockOutcome {
    /// The flag was flipped.
    Toggled {
        /// The unit.
        unit_id: String,
        /// New value of the flag.
        locked: bool,
    },
    /// The player owns no unit with that ID. Nothing changed.
    UnitNotFound,
}

/// Generate a random unit instance ID.
pub fn new_unit_id<R: Rng>(rng: &mut R) -> String {
    (0..UNIT_ID_LEN)
        .map(|_| char::from(rng.sample(Alphanumeric)))
        .collect()
}

/// Spend [`SUMMON_GEM_COST`] gems on a random catalog unit.
pub fn summon<R: Rng>(
    progression: &mut Progression,
    catalog: &Catalog,
    rng: &mut R,
    now: DateTime<Utc>,
) -> SummonOutcome {
    let available = progression.ledger.balance(ResourceKind::Gems);
    if available < SUMMON_GEM_COST {
        return SummonOutcome::InsufficientFunds {
            required: SUMMON_GEM_COST,
            available,
        };
    }

    let template_count = catalog.unit_templates.len();
    if template_count == 0 {
        return SummonOutcome::Unavailable;
    }
    let Some(template) = catalog
        .unit_templates
        .values()
        .nth(rng.gen_range(0..template_count))
    else {
        return SummonOutcome::Unavailable;
    };

    let mut unit_id = new_unit_id(rng);
    while progression.units.contains_key(&unit_id) {
        unit_id = new_unit_id(rng);
    }

    if !progression.ledger.debit(ResourceKind::Gems, SUMMON_GEM_COST) {
        return SummonOutcome::InsufficientFunds {
            required: SUMMON_GEM_COST,
            available,
        };
    }

    let unit = OwnedUnit {
        template_id: template.id,
        locked: false,
        acquired_at: now,
    };
    progression.units.insert(unit_id.clone(), unit.clone());

    SummonOutcome::Summoned { unit_id, unit }
}

/// Flip the lock flag of an owned unit.
pub fn toggle_lock(progression: &mut Progression, unit_id: &str) -> ToggleLockOutcome {
    match progression.units.get_mut(unit_id) {
        Some(unit) => {
            unit.locked = !unit.locked;
            ToggleLockOutcome::Toggled {
                unit_id: unit_id.to_string(),
                locked: unit.locked,
            }
        }
        None => ToggleLockOutcome::UnitNotFound,
    }
}
