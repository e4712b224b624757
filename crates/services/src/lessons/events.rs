use learn_core::UpdateOutcome;
use learn_core::model::{Achievement, SectionId};

/// Notifications produced by one session action, for celebratory UI feedback.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SessionEvents {
    /// At least one update changed the progress.
    pub applied: bool,
    pub completed_sections: Vec<SectionId>,
    pub new_achievements: Vec<Achievement>,
    pub lesson_completed: bool,
}

impl SessionEvents {
    pub(crate) fn absorb(&mut self, outcome: &UpdateOutcome, completed: Option<SectionId>) {
        self.applied |= outcome.applied;
        self.lesson_completed |= outcome.lesson_completed;
        self.new_achievements
            .extend(outcome.new_achievements.iter().cloned());
        if let Some(section_id) = completed {
            self.completed_sections.push(section_id);
        }
    }

    pub(crate) fn merge(&mut self, other: SessionEvents) {
        self.applied |= other.applied;
        self.lesson_completed |= other.lesson_completed;
        self.completed_sections.extend(other.completed_sections);
        self.new_achievements.extend(other.new_achievements);
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        !self.applied
    }
}
