//! Achievement ledger transition.
//!
//! Given the stored progress row (if any) and a progress event, decides what
//! the row must look like afterwards. Storage backends only persist the
//! outcome; the rules live here so both backends share them.
//!
//! Invariants upheld by [`advance`]:
//! - a completed row is never modified again
//! - progress never decreases
//! - `unlocked_at` is stamped exactly once, on the transition to completed

use chrono::{DateTime, Utc};

use super::{AchievementKind, UserId};
use crate::models::ProgressRecord;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LedgerAction {
    /// No row existed; the record must be inserted.
    Insert,
    /// The row existed and was incomplete; the record replaces it.
    Update,
    /// The row is already completed and stays frozen.
    Unchanged,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedgerStep {
    pub action: LedgerAction,
    pub record: ProgressRecord,
    pub newly_completed: bool,
}

/// A single progress event against one (user, achievement) pair.
#[derive(Debug, Clone, Copy)]
pub struct ProgressEvent {
    pub user_id: UserId,
    pub achievement: AchievementKind,
    pub delta: i32,
    pub force_complete: bool,
}

#[must_use]
pub fn advance(
    existing: Option<ProgressRecord>,
    event: ProgressEvent,
    now: DateTime<Utc>,
) -> LedgerStep {
    let Some(existing) = existing else {
        let completed = event.force_complete;
        return LedgerStep {
            action: LedgerAction::Insert,
            record: ProgressRecord {
                user_id: event.user_id,
                achievement: event.achievement,
                progress: event.delta.max(0),
                completed,
                unlocked_at: completed.then_some(now),
            },
            newly_completed: completed,
        };
    };

    if existing.completed {
        return LedgerStep {
            action: LedgerAction::Unchanged,
            record: existing,
            newly_completed: false,
        };
    }

    let progress = existing
        .progress
        .saturating_add(event.delta)
        .max(existing.progress);
    let reached_target = event
        .achievement
        .target()
        .is_some_and(|target| progress >= target);
    let completed = event.force_complete || reached_target;

    LedgerStep {
        action: LedgerAction::Update,
        record: ProgressRecord {
            progress,
            completed,
            unlocked_at: if completed { Some(now) } else { existing.unlocked_at },
            ..existing
        },
        newly_completed: completed,
    }
}
