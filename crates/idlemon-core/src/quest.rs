// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Daily quest state machine.
//!
//! ```text
//!   count < required          count >= required
//! ┌──────────────┐  event   ┌──────────────┐  complete  ┌───────────┐
//! │ NOT STARTED  │ ───────► │ IN PROGRESS  │ ─────────► │ COMPLETED │
//! └──────────────┘          └──────────────┘            └───────────┘
//! ```
//!
//! Completion is one-way. Completing twice reports the earlier completion and
//! must not re-apply the reward, so the check and the reward are applied in the
//! same locked update.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::catalog::DailyQuest;
use crate::progression::QuestProgress;

/// ID of the quest advanced by signing in.
pub const DAILY_QUEST_SIGN_IN: u32 = 0;

/// Observable state of a quest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum QuestState {
    /// No qualifying events yet.
    NotStarted,
    /// Some progress, not yet completable.
    InProgress,
    /// Requirement met, awaiting completion.
    Completable,
    /// Terminal.
    Completed,
}

/// Result of a completion attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum QuestCompletion {
    /// The quest transitioned to completed; the reward must be applied.
    Completed {
        /// Completion time.
        completed_at: DateTime<Utc>,
    },
    /// The quest was already completed. Nothing changed.
    AlreadyCompleted {
        /// When it was originally completed.
        completed_at: Option<DateTime<Utc>>,
    },
    /// Not enough progress yet. Nothing changed.
    RequirementsNotMet {
        /// Current progress.
        count: u32,
        /// Progress required.
        required: u32,
    },
}

/// Classify a quest's progress against its definition.
pub fn state(progress: &QuestProgress, quest: &DailyQuest) -> QuestState {
    if progress.completed {
        QuestState::Completed
    } else if progress.count >= quest.required {
        QuestState::Completable
    } else if progress.count == 0 {
        QuestState::NotStarted
    } else {
        QuestState::InProgress
    }
}

/// Attempt to complete a quest at `now`.
///
/// Only the [`QuestCompletion::Completed`] outcome mutates `progress`.
pub fn complete(
    progress: &mut QuestProgress,
    quest: &DailyQuest,
    now: DateTime<Utc>,
) -> QuestCompletion {
    if progress.completed {
        return QuestCompletion::AlreadyCompleted {
            completed_at: progress.completed_at,
        };
    }

    if progress.count < quest.required {
        return QuestCompletion::RequirementsNotMet {
            count: progress.count,
            required: quest.required,
        };
    }

    progress.completed = true;
    progress.completed_at = Some(now);
    QuestCompletion::Completed { completed_at: now }
}

/// Record one qualifying event. Completed quests ignore further events.
///
/// Returns whether the counter moved.
pub fn record_event(progress: &mut QuestProgress) -> bool {
    if progress.completed {
        return false;
    }
    let next = progress.count.saturating_add(1);
    let moved = next != progress.count;
    progress.count = next;
    moved
}
