use async_trait::async_trait;
use learn_core::model::{Course, CourseId, Lesson, LessonId, UserLessonProgress};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use thiserror::Error;

/// Errors surfaced by storage adapters.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StorageError {
    #[error("not found")]
    NotFound,

    #[error("conflict")]
    Conflict,

    #[error("connection error: {0}")]
    Connection(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

/// Read access to lesson reference data.
#[async_trait]
pub trait LessonRepository: Send + Sync {
    /// Persist or replace a lesson.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the lesson cannot be stored.
    async fn upsert_lesson(&self, lesson: &Lesson) -> Result<(), StorageError>;

    /// Fetch a lesson by ID.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if missing, or other storage errors.
    async fn get_lesson(&self, id: &LessonId) -> Result<Lesson, StorageError>;
}

/// Boundary for saving learner progress between sessions.
///
/// The record layout is left to each adapter; `UserLessonProgress` is
/// serde-serializable for adapters that need it.
#[async_trait]
pub trait ProgressRepository: Send + Sync {
    /// Persist the latest progress for its lesson, replacing any previous record.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the progress cannot be stored.
    async fn save_progress(&self, progress: &UserLessonProgress) -> Result<(), StorageError>;

    /// Fetch stored progress for a lesson, `None` if the lesson was never started.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` for backend failures.
    async fn load_progress(
        &self,
        lesson_id: &LessonId,
    ) -> Result<Option<UserLessonProgress>, StorageError>;
}

#[async_trait]
pub trait CourseRepository: Send + Sync {
    /// Persist or replace a course outline.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the course cannot be stored.
    async fn upsert_course(&self, course: &Course) -> Result<(), StorageError>;

    /// Fetch a course by ID.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if missing, or other storage errors.
    async fn get_course(&self, id: &CourseId) -> Result<Course, StorageError>;
}

/// Simple in-memory repository implementation for testing and prototyping.
#[derive(Clone, Default)]
pub struct InMemoryRepository {
    lessons: Arc<Mutex<HashMap<LessonId, Lesson>>>,
    progress: Arc<Mutex<HashMap<LessonId, UserLessonProgress>>>,
    courses: Arc<Mutex<HashMap<CourseId, Course>>>,
}

impl InMemoryRepository {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

fn poisoned<T>(err: std::sync::PoisonError<T>) -> StorageError {
    StorageError::Connection(err.to_string())
}

#[async_trait]
impl LessonRepository for InMemoryRepository {
    async fn upsert_lesson(&self, lesson: &Lesson) -> Result<(), StorageError> {
        let mut guard = self.lessons.lock().map_err(poisoned)?;
        guard.insert(lesson.id().clone(), lesson.clone());
        Ok(())
    }

    async fn get_lesson(&self, id: &LessonId) -> Result<Lesson, StorageError> {
        let guard = self.lessons.lock().map_err(poisoned)?;
        guard.get(id).cloned().ok_or(StorageError::NotFound)
    }
}

#[async_trait]
impl ProgressRepository for InMemoryRepository {
    async fn save_progress(&self, progress: &UserLessonProgress) -> Result<(), StorageError> {
        let mut guard = self.progress.lock().map_err(poisoned)?;
        guard.insert(progress.lesson_id().clone(), progress.clone());
        Ok(())
    }

    async fn load_progress(
        &self,
        lesson_id: &LessonId,
    ) -> Result<Option<UserLessonProgress>, StorageError> {
        let guard = self.progress.lock().map_err(poisoned)?;
        Ok(guard.get(lesson_id).cloned())
    }
}

#[async_trait]
impl CourseRepository for InMemoryRepository {
    async fn upsert_course(&self, course: &Course) -> Result<(), StorageError> {
        let mut guard = self.courses.lock().map_err(poisoned)?;
        guard.insert(course.id().clone(), course.clone());
        Ok(())
    }

    async fn get_course(&self, id: &CourseId) -> Result<Course, StorageError> {
        let guard = self.courses.lock().map_err(poisoned)?;
        guard.get(id).cloned().ok_or(StorageError::NotFound)
    }
}

/// Aggregates the repositories behind trait objects for easy backend swapping.
#[derive(Clone)]
pub struct Storage {
    pub lessons: Arc<dyn LessonRepository>,
    pub progress: Arc<dyn ProgressRepository>,
    pub courses: Arc<dyn CourseRepository>,
}

impl Storage {
    #[must_use]
    pub fn in_memory() -> Self {
        let repo = InMemoryRepository::new();
        let lessons: Arc<dyn LessonRepository> = Arc::new(repo.clone());
        let progress: Arc<dyn ProgressRepository> = Arc::new(repo.clone());
        let courses: Arc<dyn CourseRepository> = Arc::new(repo);
        Self {
            lessons,
            progress,
            courses,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use learn_core::model::{
        CompletionCriteria, CourseLesson, LessonDraft, ProgressUpdate, Section, SectionId,
        SectionKind,
    };
    use learn_core::time::fixed_now;
    use learn_core::{EngineConfig, LessonProgressEngine};

    fn build_lesson(id: &str) -> Lesson {
        LessonDraft::new(
            id,
            format!("Lesson {id}"),
            vec![Section::new(
                SectionId::new("s1"),
                SectionKind::Introduction,
                "Intro",
                5,
                0,
                CompletionCriteria::manual(false),
            )],
        )
        .validate()
        .unwrap()
    }

    #[tokio::test]
    async fn lessons_round_trip() {
        let repo = InMemoryRepository::new();
        let lesson = build_lesson("1-1");
        repo.upsert_lesson(&lesson).await.unwrap();

        let fetched = repo.get_lesson(&LessonId::new("1-1")).await.unwrap();
        assert_eq!(fetched, lesson);
        assert!(matches!(
            repo.get_lesson(&LessonId::new("nope")).await,
            Err(StorageError::NotFound)
        ));
    }

    #[tokio::test]
    async fn progress_is_replaced_on_save() {
        let repo = InMemoryRepository::new();
        let engine = LessonProgressEngine::new(build_lesson("1-1"), EngineConfig::default());
        let initial = engine.initialize(fixed_now());
        repo.save_progress(&initial).await.unwrap();

        let done = engine
            .apply_update(
                &initial,
                &ProgressUpdate::section_complete(SectionId::new("s1"), fixed_now()),
            )
            .progress;
        repo.save_progress(&done).await.unwrap();

        let loaded = repo
            .load_progress(&LessonId::new("1-1"))
            .await
            .unwrap()
            .unwrap();
        assert!(loaded.is_completed());
        assert!(repo.load_progress(&LessonId::new("2-1")).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn storage_shares_one_backend() {
        let storage = Storage::in_memory();
        let course = Course::new(
            CourseId::new("3d"),
            "3D",
            vec![CourseLesson {
                lesson_id: LessonId::new("1-1"),
                title: "Intro".into(),
                duration_minutes: 20,
            }],
        )
        .unwrap();
        storage.courses.upsert_course(&course).await.unwrap();
        let fetched = storage.courses.get_course(&CourseId::new("3d")).await.unwrap();
        assert_eq!(fetched.total_duration_minutes(), 20);
    }
}
