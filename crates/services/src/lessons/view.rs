use serde::Serialize;

use learn_core::model::{SectionId, SectionKind};

/// Per-section state for a progress tracker sidebar.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SectionStatus {
    pub index: usize,
    pub section_id: SectionId,
    pub kind: SectionKind,
    pub title: String,
    pub completed: bool,
    pub current: bool,
    pub unlocked: bool,
}

/// Lesson-wide figures shown next to the progress bar.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LessonOverview {
    pub completed_sections: usize,
    pub total_sections: usize,
    pub overall_progress: f64,
    pub time_spent_secs: u64,
    pub estimated_minutes_remaining: u32,
    pub score: Option<f64>,
    pub points: u32,
}
