use chrono::{DateTime, Utc};
use tracing::debug;

use learn_core::model::{
    Lesson, ProgressUpdate, Section, SectionId, SectionProgress, UpdateKind, UserLessonProgress,
};
use learn_core::{Clock, EngineError, LessonProgressEngine};

use super::events::SessionEvents;
use super::view::{LessonOverview, SectionStatus};
use crate::error::LessonSessionError;

//
// ─── SESSION ───────────────────────────────────────────────────────────────────
//

/// In-memory lesson session.
///
/// Wraps the progress engine with the behavior of a lesson viewer: the current
/// section, unlock-gated navigation, automatic completion checks after each
/// interaction/quiz/time update, and auto-advance once a section completes.
#[derive(Debug, Clone)]
pub struct LessonSession {
    engine: LessonProgressEngine,
    progress: UserLessonProgress,
    current: usize,
    clock: Clock,
}

impl LessonSession {
    /// Start a fresh session on the first section.
    #[must_use]
    pub fn start(engine: LessonProgressEngine, clock: Clock) -> Self {
        let progress = engine.initialize(clock.now());
        Self {
            engine,
            progress,
            current: 0,
            clock,
        }
    }

    /// Continue from previously stored progress.
    ///
    /// The current section becomes the first incomplete one, or the last
    /// section if the lesson is already done.
    ///
    /// # Errors
    ///
    /// Returns `EngineError::LessonMismatch` if `progress` belongs to another
    /// lesson, `EngineError::SectionMismatch` if its section records are not
    /// aligned with the lesson's sections.
    pub fn resume(
        engine: LessonProgressEngine,
        progress: UserLessonProgress,
        clock: Clock,
    ) -> Result<Self, LessonSessionError> {
        engine.ensure_owned(&progress)?;
        let last = progress.total_sections().saturating_sub(1);
        let current = progress
            .sections()
            .iter()
            .position(|sp| !sp.is_completed())
            .unwrap_or(last);
        Ok(Self {
            engine,
            progress,
            current,
            clock,
        })
    }

    #[must_use]
    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    #[must_use]
    pub fn engine(&self) -> &LessonProgressEngine {
        &self.engine
    }

    #[must_use]
    pub fn lesson(&self) -> &Lesson {
        self.engine.lesson()
    }

    #[must_use]
    pub fn progress(&self) -> &UserLessonProgress {
        &self.progress
    }

    #[must_use]
    pub fn current_index(&self) -> usize {
        self.current
    }

    #[must_use]
    pub fn current_section(&self) -> Option<&Section> {
        self.lesson().section(self.current)
    }

    #[must_use]
    pub fn current_section_progress(&self) -> Option<&SectionProgress> {
        self.progress.section(self.current)
    }

    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.progress.is_completed()
    }

    /// Apply an update produced anywhere (UI, timer, replay).
    ///
    /// Interaction, quiz and time updates trigger a completion check on their
    /// section; a completed current section advances the session when the
    /// engine config enables it.
    pub fn apply(&mut self, update: ProgressUpdate) -> SessionEvents {
        let mut events = SessionEvents::default();
        let index = self.progress.section_index(&update.section_id);
        let was_completed = self.section_completed(index);

        let outcome = self.engine.apply_update(&self.progress, &update);
        let applied = outcome.applied;
        let newly_completed = {
            let now_completed = index
                .and_then(|i| outcome.progress.section(i))
                .is_some_and(SectionProgress::is_completed);
            (!was_completed && now_completed).then(|| update.section_id.clone())
        };
        events.absorb(&outcome, newly_completed.clone());
        self.progress = outcome.progress;

        let (true, Some(index)) = (applied, index) else {
            return events;
        };

        match update.kind {
            UpdateKind::Interaction { .. }
            | UpdateKind::QuizComplete { .. }
            | UpdateKind::TimeUpdate { .. } => {
                events.merge(self.check_completion(index, update.timestamp));
            }
            UpdateKind::SectionComplete if newly_completed.is_some() => {
                events.merge(self.advance_after(index, update.timestamp));
            }
            UpdateKind::SectionComplete | UpdateKind::SectionStart => {}
        }
        events
    }

    /// Enter the section at `index`.
    ///
    /// # Errors
    ///
    /// Returns `SectionLocked` if the previous section is not completed, or
    /// `Engine(InvalidIndex)` for an index outside the lesson.
    pub fn activate_section(&mut self, index: usize) -> Result<SessionEvents, LessonSessionError> {
        if !self.engine.is_section_unlocked(&self.progress, index)? {
            return Err(LessonSessionError::SectionLocked { index });
        }
        let section_id = self.section_id_at(index)?;
        self.current = index;
        debug!(lesson_id = %self.lesson().id(), %section_id, index, "section activated");
        Ok(self.apply(ProgressUpdate::section_start(section_id, self.clock.now())))
    }

    /// # Errors
    ///
    /// Returns `NoAdjacentSection` on the last section, `SectionLocked` if the
    /// next section is still locked.
    pub fn next_section(&mut self) -> Result<SessionEvents, LessonSessionError> {
        let next = self.current + 1;
        if next >= self.progress.total_sections() {
            return Err(LessonSessionError::NoAdjacentSection);
        }
        self.activate_section(next)
    }

    /// # Errors
    ///
    /// Returns `NoAdjacentSection` on the first section.
    pub fn previous_section(&mut self) -> Result<SessionEvents, LessonSessionError> {
        let Some(previous) = self.current.checked_sub(1) else {
            return Err(LessonSessionError::NoAdjacentSection);
        };
        self.activate_section(previous)
    }

    /// Record an interaction in the current section.
    pub fn record_interaction(&mut self, interaction_id: impl Into<String>) -> SessionEvents {
        let Some(section_id) = self.current_section_id() else {
            return SessionEvents::default();
        };
        let update = ProgressUpdate::interaction(section_id, interaction_id, self.clock.now());
        self.apply(update)
    }

    /// Record a quiz result in the current section. Retakes replace the previous score.
    ///
    /// # Errors
    ///
    /// Returns `Update(InvalidScore)` unless `score` is a percentage.
    pub fn record_quiz(
        &mut self,
        quiz_id: impl Into<String>,
        score: f64,
    ) -> Result<SessionEvents, LessonSessionError> {
        let section_id = self.section_id_at(self.current)?;
        let update = ProgressUpdate::quiz_complete(section_id, quiz_id, score, self.clock.now())?;
        Ok(self.apply(update))
    }

    /// Record the absolute time spent in the current section.
    pub fn record_time(&mut self, time_spent_secs: u64) -> SessionEvents {
        let Some(section_id) = self.current_section_id() else {
            return SessionEvents::default();
        };
        let update = ProgressUpdate::time_update(section_id, time_spent_secs, self.clock.now());
        self.apply(update)
    }

    /// Mark the section at `index` complete without evaluating its criteria.
    ///
    /// # Errors
    ///
    /// Returns `Engine(InvalidIndex)` for an index outside the lesson.
    pub fn complete_section(&mut self, index: usize) -> Result<SessionEvents, LessonSessionError> {
        let section_id = self.section_id_at(index)?;
        Ok(self.apply(ProgressUpdate::section_complete(section_id, self.clock.now())))
    }

    /// Handle the learner's explicit "mark complete" action on the current section.
    ///
    /// This is the only path that evaluates manual criteria. Completing an
    /// already completed section is a no-op.
    ///
    /// # Errors
    ///
    /// Returns `CriteriaNotMet` if the section's criteria are not satisfied.
    pub fn request_manual_completion(&mut self) -> Result<SessionEvents, LessonSessionError> {
        let index = self.current;
        let section_id = self.section_id_at(index)?;
        if self.section_completed(Some(index)) {
            return Ok(SessionEvents::default());
        }
        let satisfied = match (self.lesson().section(index), self.progress.section(index)) {
            (Some(section), Some(progress)) => {
                self.engine.evaluate_completion_criteria(section, progress)
            }
            _ => false,
        };
        if !satisfied {
            return Err(LessonSessionError::CriteriaNotMet { index });
        }
        Ok(self.apply(ProgressUpdate::section_complete(section_id, self.clock.now())))
    }

    /// Estimated minutes left: the lesson estimate minus completed sections' estimates.
    #[must_use]
    pub fn estimated_minutes_remaining(&self) -> u32 {
        let lesson = self.lesson();
        let done: u32 = lesson
            .sections()
            .iter()
            .zip(self.progress.sections())
            .filter(|(_, sp)| sp.is_completed())
            .fold(0u32, |total, (section, _)| total.saturating_add(section.estimated_minutes));
        lesson.total_estimated_minutes().saturating_sub(done)
    }

    #[must_use]
    pub fn section_statuses(&self) -> Vec<SectionStatus> {
        self.lesson()
            .sections()
            .iter()
            .zip(self.progress.sections())
            .enumerate()
            .map(|(index, (section, sp))| SectionStatus {
                index,
                section_id: section.id.clone(),
                kind: section.kind,
                title: section.title.clone(),
                completed: sp.is_completed(),
                current: index == self.current,
                unlocked: self
                    .engine
                    .is_section_unlocked(&self.progress, index)
                    .unwrap_or(false),
            })
            .collect()
    }

    #[must_use]
    pub fn overview(&self) -> LessonOverview {
        LessonOverview {
            completed_sections: self.progress.completed_count(),
            total_sections: self.progress.total_sections(),
            overall_progress: self.progress.overall_progress(),
            time_spent_secs: self.progress.time_spent_secs(),
            estimated_minutes_remaining: self.estimated_minutes_remaining(),
            score: self.progress.score(),
            points: self.progress.achievements().total_points(),
        }
    }

    // ─── internals ─────────────────────────────────────────────────────────────

    fn section_completed(&self, index: Option<usize>) -> bool {
        index
            .and_then(|i| self.progress.section(i))
            .is_some_and(SectionProgress::is_completed)
    }

    fn current_section_id(&self) -> Option<SectionId> {
        self.current_section().map(|s| s.id.clone())
    }

    fn section_id_at(&self, index: usize) -> Result<SectionId, EngineError> {
        self.lesson()
            .section(index)
            .map(|s| s.id.clone())
            .ok_or(EngineError::InvalidIndex {
                index,
                len: self.lesson().section_count(),
            })
    }

    fn check_completion(&mut self, index: usize, at: DateTime<Utc>) -> SessionEvents {
        let ready = match (self.lesson().section(index), self.progress.section(index)) {
            (Some(section), Some(progress)) => {
                !section.criteria.is_manual()
                    && !progress.is_completed()
                    && self.engine.evaluate_completion_criteria(section, progress)
            }
            _ => false,
        };
        if !ready {
            return SessionEvents::default();
        }
        match self.section_id_at(index) {
            Ok(section_id) => self.apply(ProgressUpdate::section_complete(section_id, at)),
            Err(_) => SessionEvents::default(),
        }
    }

    fn advance_after(&mut self, index: usize, at: DateTime<Utc>) -> SessionEvents {
        let next = index + 1;
        if !self.engine.config().auto_advance
            || index != self.current
            || next >= self.progress.total_sections()
        {
            return SessionEvents::default();
        }
        match self.section_id_at(next) {
            Ok(section_id) => {
                self.current = next;
                self.apply(ProgressUpdate::section_start(section_id, at))
            }
            Err(_) => SessionEvents::default(),
        }
    }
}
