// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Reward descriptors and their application onto a progression document.

use serde::{Deserialize, Serialize};

use crate::progression::{Progression, ResourceKind};

/// A typed instruction to add something to a player's ledger.
///
/// Applying a reward performs no idempotency check. Callers must guarantee
/// at-most-once application (quests do it with their completion flag).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Reward {
    /// Add an amount of a resource.
    Currency {
        /// Resource to credit.
        resource: ResourceKind,
        /// Amount to add.
        amount: u64,
    },
    /// Add a number of items.
    Item {
        /// Catalog reference of the item.
        reference: String,
        /// Number of items to add.
        amount: u64,
    },
}

impl Reward {
    /// Add this reward onto the document. Never decreases a balance.
    pub fn apply(&self, progression: &mut Progression) {
        match self {
            Self::Currency { resource, amount } => progression.ledger.credit(*resource, *amount),
            Self::Item { reference, amount } => progression.ledger.credit_item(reference, *amount),
        }
    }
}
