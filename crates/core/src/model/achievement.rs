use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::model::ids::AchievementId;

/// Category of an achievement badge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AchievementKind {
    Completion,
    Speed,
    Accuracy,
    Engagement,
    Milestone,
}

/// A badge issued once when a section or lesson first reaches completion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Achievement {
    pub id: AchievementId,
    pub kind: AchievementKind,
    pub title: String,
    pub description: String,
    pub points: u32,
    pub unlocked_at: DateTime<Utc>,
}

/// Append-only set of achievements keyed by id, kept in unlock order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AchievementLedger {
    entries: Vec<Achievement>,
}

impl AchievementLedger {
    /// Insert `achievement` unless one with the same id is already present.
    ///
    /// Returns `true` if the achievement was added.
    pub fn insert_if_absent(&mut self, achievement: Achievement) -> bool {
        if self.contains(&achievement.id) {
            return false;
        }
        self.entries.push(achievement);
        true
    }

    #[must_use]
    pub fn contains(&self, id: &AchievementId) -> bool {
        self.entries.iter().any(|a| &a.id == id)
    }

    #[must_use]
    pub fn get(&self, id: &AchievementId) -> Option<&Achievement> {
        self.entries.iter().find(|a| &a.id == id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Achievement> {
        self.entries.iter()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[must_use]
    pub fn total_points(&self) -> u32 {
        self.entries.iter().map(|a| a.points).sum()
    }

    /// Achievements present here but absent from `before`, in unlock order.
    #[must_use]
    pub fn unlocked_since(&self, before: &AchievementLedger) -> Vec<Achievement> {
        self.entries
            .iter()
            .filter(|a| !before.contains(&a.id))
            .cloned()
            .collect()
    }
}

impl<'a> IntoIterator for &'a AchievementLedger {
    type Item = &'a Achievement;
    type IntoIter = std::slice::Iter<'a, Achievement>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}
