use std::sync::Arc;

use tokio::sync::mpsc::{self, UnboundedReceiver};
use tracing::{debug, info, warn};

use learn_core::model::{LessonId, ProgressUpdate, SectionId, SectionProgress, UserLessonProgress};
use learn_core::{Clock, EngineConfig, EngineError, LessonProgressEngine};
use storage::repository::{LessonRepository, ProgressRepository};

use super::events::SessionEvents;
use super::service::LessonSession;
use super::timer::SectionTimer;
use crate::error::LessonSessionError;

/// A lesson session plus the time tracker of its current section.
///
/// Time updates produced by the tracker are queued and applied in arrival
/// order by [`LessonLoopService::pump_time_updates`] or
/// [`LessonLoopService::next_tick`]. Queued updates are always applied before
/// any learner action, and before the tracker is replaced.
#[derive(Debug)]
pub struct ActiveLesson {
    session: LessonSession,
    timer: Option<SectionTimer>,
    updates_rx: UnboundedReceiver<ProgressUpdate>,
}

impl ActiveLesson {
    fn new(session: LessonSession) -> Self {
        // no tracker yet: the receiver starts disconnected
        let (_, updates_rx) = mpsc::unbounded_channel();
        Self {
            session,
            timer: None,
            updates_rx,
        }
    }

    #[must_use]
    pub fn session(&self) -> &LessonSession {
        &self.session
    }

    /// Section currently tracked by the timer, if any.
    #[must_use]
    pub fn timed_section(&self) -> Option<&SectionId> {
        self.timer.as_ref().map(SectionTimer::section_id)
    }

    /// Apply every update already queued by the tracker.
    fn drain_pending(&mut self) -> SessionEvents {
        let mut events = SessionEvents::default();
        while let Ok(update) = self.updates_rx.try_recv() {
            events.merge(self.session.apply(update));
        }
        events
    }

    /// Restart the timer if the current section changed since it was started.
    ///
    /// The old tracker is cancelled and its queued updates applied before the
    /// new base time is read. Each tracker gets its own channel, so a tick the
    /// old task sends after this point has no receiver and is dropped.
    fn sync_timer(&mut self, clock: Clock) -> SessionEvents {
        let current = self.session.current_section().map(|s| s.id.clone());
        if current.is_some() && self.timed_section() == current.as_ref() {
            return SessionEvents::default();
        }

        self.timer = None;
        let events = self.drain_pending();
        let (updates_tx, updates_rx) = mpsc::unbounded_channel();
        self.updates_rx = updates_rx;

        let Some(section_id) = self.session.current_section().map(|s| s.id.clone()) else {
            return events;
        };
        let base_secs = self
            .session
            .current_section_progress()
            .map_or(0, SectionProgress::time_spent_secs);
        let period = self.session.engine().config().time_tick;
        self.timer = Some(SectionTimer::start(
            section_id, base_secs, period, clock, updates_tx,
        ));
        events
    }
}

/// Orchestrates lesson start/resume, timed tracking and persisted updates.
#[derive(Clone)]
pub struct LessonLoopService {
    clock: Clock,
    config: EngineConfig,
    lessons: Arc<dyn LessonRepository>,
    progress: Arc<dyn ProgressRepository>,
}

impl LessonLoopService {
    #[must_use]
    pub fn new(
        clock: Clock,
        config: EngineConfig,
        lessons: Arc<dyn LessonRepository>,
        progress: Arc<dyn ProgressRepository>,
    ) -> Self {
        Self {
            clock,
            config,
            lessons,
            progress,
        }
    }

    /// Start or resume a lesson and begin tracking time on its current section.
    ///
    /// Stored progress recorded against a different version of the lesson
    /// (sections added, removed or reordered) cannot be resumed; the lesson
    /// then starts over with fresh progress.
    ///
    /// Must be called within a tokio runtime.
    ///
    /// # Errors
    ///
    /// Returns `LessonSessionError` for storage failures or a stored progress
    /// that belongs to another lesson.
    pub async fn start_lesson(&self, lesson_id: &LessonId) -> Result<ActiveLesson, LessonSessionError> {
        let lesson = self.lessons.get_lesson(lesson_id).await?;
        let engine = LessonProgressEngine::new(lesson, self.config.clone());
        let session = match self.progress.load_progress(lesson_id).await? {
            Some(stored) => match engine.ensure_owned(&stored) {
                Ok(()) => {
                    info!(%lesson_id, "resuming lesson");
                    LessonSession::resume(engine, stored, self.clock)?
                }
                Err(err @ EngineError::SectionMismatch { .. }) => {
                    warn!(%lesson_id, error = %err, "stored progress is stale, starting over");
                    LessonSession::start(engine, self.clock)
                }
                Err(err) => return Err(err.into()),
            },
            None => {
                info!(%lesson_id, "starting lesson");
                LessonSession::start(engine, self.clock)
            }
        };

        let mut active = ActiveLesson::new(session);
        let index = active.session.current_index();
        active.session.activate_section(index)?;
        active.sync_timer(self.clock);
        self.persist(&active).await?;
        Ok(active)
    }

    /// Run a session action, then restart the timer if the current section
    /// changed and persist the resulting progress.
    ///
    /// Time updates queued before the call are applied first.
    ///
    /// # Errors
    ///
    /// Returns the action's error or a storage error. Queued time updates that
    /// were applied before a failing action are still persisted.
    pub async fn perform<F>(
        &self,
        active: &mut ActiveLesson,
        action: F,
    ) -> Result<SessionEvents, LessonSessionError>
    where
        F: FnOnce(&mut LessonSession) -> Result<SessionEvents, LessonSessionError>,
    {
        let mut events = active.drain_pending();
        match action(&mut active.session) {
            Ok(outcome) => events.merge(outcome),
            Err(err) => {
                if events.applied {
                    self.persist(active).await?;
                }
                return Err(err);
            }
        }
        events.merge(active.sync_timer(self.clock));
        if events.applied {
            self.persist(active).await?;
        }
        Ok(events)
    }

    /// Apply every queued time update without waiting.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if persisting fails.
    pub async fn pump_time_updates(
        &self,
        active: &mut ActiveLesson,
    ) -> Result<SessionEvents, LessonSessionError> {
        let mut events = active.drain_pending();
        events.merge(active.sync_timer(self.clock));
        if events.applied {
            self.persist(active).await?;
        }
        Ok(events)
    }

    /// Wait for the next time update, apply it and persist.
    ///
    /// Returns empty events right away when no section is being tracked.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if persisting fails.
    pub async fn next_tick(
        &self,
        active: &mut ActiveLesson,
    ) -> Result<SessionEvents, LessonSessionError> {
        let Some(update) = active.updates_rx.recv().await else {
            return Ok(SessionEvents::default());
        };
        let mut events = active.session.apply(update);
        events.merge(active.sync_timer(self.clock));
        if events.applied {
            self.persist(active).await?;
        }
        Ok(events)
    }

    /// Stop tracking, apply pending time updates and return the final progress.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the final save fails.
    pub async fn finish(
        &self,
        mut active: ActiveLesson,
    ) -> Result<UserLessonProgress, LessonSessionError> {
        if let Some(timer) = active.timer.take() {
            timer.stop().await;
        }
        active.drain_pending();
        self.persist(&active).await?;
        debug!(lesson_id = %active.session.lesson().id(), "lesson session finished");
        Ok(active.session.progress().clone())
    }

    async fn persist(&self, active: &ActiveLesson) -> Result<(), LessonSessionError> {
        self.progress.save_progress(active.session.progress()).await?;
        Ok(())
    }
}
