use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::criteria::CompletionCriteria;
use crate::model::ids::{LessonId, SectionId};

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum LessonError {
    #[error("lesson id cannot be blank")]
    BlankId,

    #[error("lesson title cannot be empty")]
    EmptyTitle,

    #[error("lesson must contain at least one section")]
    NoSections,

    #[error("section id cannot be blank")]
    BlankSectionId,

    #[error("duplicate section id: {0}")]
    DuplicateSection(SectionId),
}

//
// ─── SECTION ───────────────────────────────────────────────────────────────────
//

/// Pedagogical role of a section.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SectionKind {
    Introduction,
    Concept,
    Demonstration,
    Practice,
    Challenge,
}

/// An independently trackable unit of a lesson with its own completion rule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Section {
    pub id: SectionId,
    pub kind: SectionKind,
    pub title: String,
    pub estimated_minutes: u32,
    pub order: u32,
    pub criteria: CompletionCriteria,
}

impl Section {
    #[must_use]
    pub fn new(
        id: SectionId,
        kind: SectionKind,
        title: impl Into<String>,
        estimated_minutes: u32,
        order: u32,
        criteria: CompletionCriteria,
    ) -> Self {
        Self {
            id,
            kind,
            title: title.into(),
            estimated_minutes,
            order,
            criteria,
        }
    }
}

//
// ─── LESSON ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Difficulty {
    #[default]
    Beginner,
    Intermediate,
    Advanced,
}

/// Unvalidated lesson content, as supplied by a content source.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LessonDraft {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub sections: Vec<Section>,
    /// Defaults to the sum of the section estimates.
    #[serde(default)]
    pub total_estimated_minutes: Option<u32>,
    #[serde(default)]
    pub difficulty: Difficulty,
    #[serde(default)]
    pub prerequisites: Vec<LessonId>,
    #[serde(default)]
    pub learning_objectives: Vec<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub version: Option<String>,
}

impl LessonDraft {
    #[must_use]
    pub fn new(id: impl Into<String>, title: impl Into<String>, sections: Vec<Section>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            sections,
            ..Self::default()
        }
    }

    /// Validate the draft and order its sections by their `order` field.
    ///
    /// # Errors
    ///
    /// Returns `LessonError` for blank ids, an empty title, no sections or
    /// duplicate section ids.
    pub fn validate(self) -> Result<Lesson, LessonError> {
        let id = self.id.trim();
        if id.is_empty() {
            return Err(LessonError::BlankId);
        }
        let title = self.title.trim();
        if title.is_empty() {
            return Err(LessonError::EmptyTitle);
        }
        if self.sections.is_empty() {
            return Err(LessonError::NoSections);
        }

        let mut seen = HashSet::with_capacity(self.sections.len());
        for section in &self.sections {
            if section.id.as_str().trim().is_empty() {
                return Err(LessonError::BlankSectionId);
            }
            if !seen.insert(section.id.clone()) {
                return Err(LessonError::DuplicateSection(section.id.clone()));
            }
        }

        let mut sections = self.sections;
        sections.sort_by_key(|s| s.order);

        let total_estimated_minutes = self
            .total_estimated_minutes
            .unwrap_or_else(|| {
                sections
                    .iter()
                    .fold(0u32, |total, s| total.saturating_add(s.estimated_minutes))
            });

        Ok(Lesson {
            id: LessonId::new(id),
            title: title.to_owned(),
            description: self.description,
            sections,
            total_estimated_minutes,
            difficulty: self.difficulty,
            prerequisites: self.prerequisites,
            learning_objectives: self.learning_objectives,
            tags: self.tags,
            version: self.version,
        })
    }
}

/// Immutable lesson reference data. The progress engine never mutates it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "LessonDraft")]
pub struct Lesson {
    id: LessonId,
    title: String,
    description: String,
    sections: Vec<Section>,
    total_estimated_minutes: u32,
    difficulty: Difficulty,
    prerequisites: Vec<LessonId>,
    learning_objectives: Vec<String>,
    tags: Vec<String>,
    version: Option<String>,
}

impl TryFrom<LessonDraft> for Lesson {
    type Error = LessonError;

    fn try_from(draft: LessonDraft) -> Result<Self, Self::Error> {
        draft.validate()
    }
}

impl Lesson {
    #[must_use]
    pub fn id(&self) -> &LessonId {
        &self.id
    }

    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }

    #[must_use]
    pub fn description(&self) -> &str {
        &self.description
    }

    #[must_use]
    pub fn sections(&self) -> &[Section] {
        &self.sections
    }

    #[must_use]
    pub fn section(&self, index: usize) -> Option<&Section> {
        self.sections.get(index)
    }

    #[must_use]
    pub fn section_index(&self, section_id: &SectionId) -> Option<usize> {
        self.sections.iter().position(|s| &s.id == section_id)
    }

    #[must_use]
    pub fn section_count(&self) -> usize {
        self.sections.len()
    }

    #[must_use]
    pub fn total_estimated_minutes(&self) -> u32 {
        self.total_estimated_minutes
    }

    #[must_use]
    pub fn difficulty(&self) -> Difficulty {
        self.difficulty
    }

    #[must_use]
    pub fn prerequisites(&self) -> &[LessonId] {
        &self.prerequisites
    }

    #[must_use]
    pub fn learning_objectives(&self) -> &[String] {
        &self.learning_objectives
    }

    #[must_use]
    pub fn tags(&self) -> &[String] {
        &self.tags
    }

    #[must_use]
    pub fn version(&self) -> Option<&str> {
        self.version.as_deref()
    }
}
