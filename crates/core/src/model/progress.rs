use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::model::achievement::AchievementLedger;
use crate::model::ids::{LessonId, SectionId};

//
// ─── SECTION PROGRESS ──────────────────────────────────────────────────────────
//

/// Per-session progress through a single section.
///
/// Only the progress engine mutates this record; consumers read it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SectionProgress {
    section_id: SectionId,
    completed: bool,
    time_spent_secs: u64,
    interactions_completed: BTreeSet<String>,
    quiz_scores: BTreeMap<String, f64>,
    last_accessed: DateTime<Utc>,
}

impl SectionProgress {
    #[must_use]
    pub fn new(section_id: SectionId, now: DateTime<Utc>) -> Self {
        Self {
            section_id,
            completed: false,
            time_spent_secs: 0,
            interactions_completed: BTreeSet::new(),
            quiz_scores: BTreeMap::new(),
            last_accessed: now,
        }
    }

    #[must_use]
    pub fn section_id(&self) -> &SectionId {
        &self.section_id
    }

    #[must_use]
    pub fn is_completed(&self) -> bool {
        self.completed
    }

    #[must_use]
    pub fn time_spent_secs(&self) -> u64 {
        self.time_spent_secs
    }

    #[must_use]
    pub fn interactions(&self) -> &BTreeSet<String> {
        &self.interactions_completed
    }

    #[must_use]
    pub fn has_interaction(&self, interaction_id: &str) -> bool {
        self.interactions_completed.contains(interaction_id)
    }

    #[must_use]
    pub fn interaction_count(&self) -> usize {
        self.interactions_completed.len()
    }

    #[must_use]
    pub fn quiz_scores(&self) -> &BTreeMap<String, f64> {
        &self.quiz_scores
    }

    #[must_use]
    pub fn quiz_score(&self, quiz_id: &str) -> Option<f64> {
        self.quiz_scores.get(quiz_id).copied()
    }

    /// Arithmetic mean of the recorded quiz scores, `None` before any quiz.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn quiz_mean(&self) -> Option<f64> {
        if self.quiz_scores.is_empty() {
            return None;
        }
        let sum: f64 = self.quiz_scores.values().sum();
        Some(sum / self.quiz_scores.len() as f64)
    }

    #[must_use]
    pub fn last_accessed(&self) -> DateTime<Utc> {
        self.last_accessed
    }

    pub(crate) fn touch(&mut self, at: DateTime<Utc>) {
        self.last_accessed = at;
    }

    pub(crate) fn set_time_spent(&mut self, secs: u64) {
        self.time_spent_secs = secs;
    }

    /// Returns `false` if the interaction was already recorded.
    pub(crate) fn record_interaction(&mut self, interaction_id: impl Into<String>) -> bool {
        self.interactions_completed.insert(interaction_id.into())
    }

    pub(crate) fn record_quiz_score(&mut self, quiz_id: impl Into<String>, score: f64) {
        self.quiz_scores.insert(quiz_id.into(), score);
    }

    pub(crate) fn mark_completed(&mut self, at: DateTime<Utc>) {
        self.completed = true;
        self.last_accessed = at;
    }
}

//
// ─── LESSON PROGRESS ───────────────────────────────────────────────────────────
//

/// Progress of one learner through one lesson during a session.
///
/// `sections` is index-aligned with the lesson's section sequence. The derived
/// fields (`overall_progress`, `time_spent_secs`, `completed`, `score`) are
/// recomputed by the engine after every applied update.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserLessonProgress {
    lesson_id: LessonId,
    sections: Vec<SectionProgress>,
    overall_progress: f64,
    time_spent_secs: u64,
    last_accessed: DateTime<Utc>,
    completed: bool,
    score: Option<f64>,
    achievements: AchievementLedger,
}

impl UserLessonProgress {
    pub(crate) fn new(lesson_id: LessonId, sections: Vec<SectionProgress>, now: DateTime<Utc>) -> Self {
        Self {
            lesson_id,
            sections,
            overall_progress: 0.0,
            time_spent_secs: 0,
            last_accessed: now,
            completed: false,
            score: None,
            achievements: AchievementLedger::default(),
        }
    }

    #[must_use]
    pub fn lesson_id(&self) -> &LessonId {
        &self.lesson_id
    }

    #[must_use]
    pub fn sections(&self) -> &[SectionProgress] {
        &self.sections
    }

    #[must_use]
    pub fn section(&self, index: usize) -> Option<&SectionProgress> {
        self.sections.get(index)
    }

    #[must_use]
    pub fn section_index(&self, section_id: &SectionId) -> Option<usize> {
        self.sections
            .iter()
            .position(|sp| sp.section_id() == section_id)
    }

    /// Percentage of completed sections, in `0.0..=100.0`.
    #[must_use]
    pub fn overall_progress(&self) -> f64 {
        self.overall_progress
    }

    /// Sum of the time spent in every section.
    #[must_use]
    pub fn time_spent_secs(&self) -> u64 {
        self.time_spent_secs
    }

    #[must_use]
    pub fn last_accessed(&self) -> DateTime<Utc> {
        self.last_accessed
    }

    #[must_use]
    pub fn is_completed(&self) -> bool {
        self.completed
    }

    /// Mean of every quiz score recorded in the lesson, if any quiz was taken.
    #[must_use]
    pub fn score(&self) -> Option<f64> {
        self.score
    }

    #[must_use]
    pub fn achievements(&self) -> &AchievementLedger {
        &self.achievements
    }

    #[must_use]
    pub fn completed_count(&self) -> usize {
        self.sections.iter().filter(|sp| sp.is_completed()).count()
    }

    #[must_use]
    pub fn total_sections(&self) -> usize {
        self.sections.len()
    }

    /// Compact record for course-level dashboards.
    #[must_use]
    pub fn summary(&self) -> LessonProgressSummary {
        LessonProgressSummary {
            lesson_id: self.lesson_id.clone(),
            completed: self.completed,
            progress: self.overall_progress,
            time_spent_secs: self.time_spent_secs,
            last_accessed: Some(self.last_accessed),
        }
    }

    pub(crate) fn section_mut(&mut self, index: usize) -> Option<&mut SectionProgress> {
        self.sections.get_mut(index)
    }

    pub(crate) fn achievements_mut(&mut self) -> &mut AchievementLedger {
        &mut self.achievements
    }

    pub(crate) fn set_last_accessed(&mut self, at: DateTime<Utc>) {
        self.last_accessed = at;
    }

    pub(crate) fn set_completed(&mut self) {
        self.completed = true;
    }

    /// Recompute the aggregates derived from the section records.
    #[allow(clippy::cast_precision_loss)]
    pub(crate) fn recompute(&mut self) {
        let total = self.sections.len();
        let done = self.completed_count();
        self.overall_progress = if total == 0 {
            0.0
        } else {
            100.0 * done as f64 / total as f64
        };
        self.time_spent_secs = self.sections.iter().map(SectionProgress::time_spent_secs).sum();

        let scores: Vec<f64> = self
            .sections
            .iter()
            .flat_map(|sp| sp.quiz_scores().values().copied())
            .collect();
        self.score = if scores.is_empty() {
            None
        } else {
            Some(scores.iter().sum::<f64>() / scores.len() as f64)
        };
    }

    /// True when the lesson has sections and all of them are completed.
    pub(crate) fn all_sections_completed(&self) -> bool {
        !self.sections.is_empty() && self.sections.iter().all(SectionProgress::is_completed)
    }
}

/// Lesson-level progress as seen from a course dashboard.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LessonProgressSummary {
    pub lesson_id: LessonId,
    pub completed: bool,
    pub progress: f64,
    pub time_spent_secs: u64,
    pub last_accessed: Option<DateTime<Utc>>,
}

impl LessonProgressSummary {
    /// A lesson the learner has not opened yet.
    #[must_use]
    pub fn not_started(lesson_id: LessonId) -> Self {
        Self {
            lesson_id,
            completed: false,
            progress: 0.0,
            time_spent_secs: 0,
            last_accessed: None,
        }
    }
}
