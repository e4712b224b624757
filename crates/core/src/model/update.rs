use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::ids::SectionId;

#[derive(Debug, Error, Clone, PartialEq)]
#[non_exhaustive]
pub enum UpdateError {
    #[error("quiz score must be a finite percentage in 0..=100, got {score}")]
    InvalidScore { score: f64 },

    #[error("{field} cannot be blank")]
    BlankId { field: &'static str },
}

/// What happened in a section, with the data that goes with it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "kebab-case")]
pub enum UpdateKind {
    SectionStart,
    SectionComplete,
    Interaction { interaction_id: String },
    QuizComplete { quiz_id: String, score: f64 },
    /// Absolute time spent in the section, not an increment.
    TimeUpdate { time_spent_secs: u64 },
}

impl UpdateKind {
    /// Stable name used in logs.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::SectionStart => "section-start",
            Self::SectionComplete => "section-complete",
            Self::Interaction { .. } => "interaction",
            Self::QuizComplete { .. } => "quiz-complete",
            Self::TimeUpdate { .. } => "time-update",
        }
    }
}

/// A single progress event targeting one section.
///
/// Updates are applied in the order they were generated; the engine never
/// reorders or batches them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgressUpdate {
    pub section_id: SectionId,
    #[serde(flatten)]
    pub kind: UpdateKind,
    pub timestamp: DateTime<Utc>,
}

impl ProgressUpdate {
    #[must_use]
    pub fn new(section_id: SectionId, kind: UpdateKind, timestamp: DateTime<Utc>) -> Self {
        Self {
            section_id,
            kind,
            timestamp,
        }
    }

    #[must_use]
    pub fn section_start(section_id: SectionId, at: DateTime<Utc>) -> Self {
        Self::new(section_id, UpdateKind::SectionStart, at)
    }

    #[must_use]
    pub fn section_complete(section_id: SectionId, at: DateTime<Utc>) -> Self {
        Self::new(section_id, UpdateKind::SectionComplete, at)
    }

    #[must_use]
    pub fn interaction(
        section_id: SectionId,
        interaction_id: impl Into<String>,
        at: DateTime<Utc>,
    ) -> Self {
        Self::new(
            section_id,
            UpdateKind::Interaction {
                interaction_id: interaction_id.into(),
            },
            at,
        )
    }

    /// Build a quiz result update.
    ///
    /// # Errors
    ///
    /// Returns `UpdateError::InvalidScore` unless `score` is finite and within `0..=100`.
    pub fn quiz_complete(
        section_id: SectionId,
        quiz_id: impl Into<String>,
        score: f64,
        at: DateTime<Utc>,
    ) -> Result<Self, UpdateError> {
        let update = Self::new(
            section_id,
            UpdateKind::QuizComplete {
                quiz_id: quiz_id.into(),
                score,
            },
            at,
        );
        update.validate()?;
        Ok(update)
    }

    #[must_use]
    pub fn time_update(section_id: SectionId, time_spent_secs: u64, at: DateTime<Utc>) -> Self {
        Self::new(section_id, UpdateKind::TimeUpdate { time_spent_secs }, at)
    }

    /// Check the payload of the update.
    ///
    /// Deserialized updates bypass the constructors, so the engine runs this
    /// before applying anything.
    ///
    /// # Errors
    ///
    /// Returns `UpdateError` for out-of-range scores or blank identifiers.
    pub fn validate(&self) -> Result<(), UpdateError> {
        match &self.kind {
            UpdateKind::Interaction { interaction_id } if interaction_id.trim().is_empty() => {
                Err(UpdateError::BlankId {
                    field: "interaction_id",
                })
            }
            UpdateKind::QuizComplete { quiz_id, .. } if quiz_id.trim().is_empty() => {
                Err(UpdateError::BlankId { field: "quiz_id" })
            }
            UpdateKind::QuizComplete { score, .. }
                if !score.is_finite() || !(0.0..=100.0).contains(score) =>
            {
                Err(UpdateError::InvalidScore { score: *score })
            }
            _ => Ok(()),
        }
    }
}
