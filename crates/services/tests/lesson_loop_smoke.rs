use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use learn_core::{EngineConfig, LessonProgressEngine};
use learn_core::model::{
    CompletionCriteria, LessonDraft, LessonId, ProgressUpdate, Section, SectionId, SectionKind,
    UserLessonProgress,
};
use learn_core::time::fixed_now;
use services::{Clock, LessonLoopService, LessonSessionError};
use storage::repository::{
    InMemoryRepository, LessonRepository, ProgressRepository, StorageError,
};

struct OfflineProgress;

#[async_trait]
impl ProgressRepository for OfflineProgress {
    async fn save_progress(&self, _progress: &UserLessonProgress) -> Result<(), StorageError> {
        Err(StorageError::Connection("offline".into()))
    }

    async fn load_progress(
        &self,
        _lesson_id: &LessonId,
    ) -> Result<Option<UserLessonProgress>, StorageError> {
        Ok(None)
    }
}

async fn seeded_repo() -> InMemoryRepository {
    let repo = InMemoryRepository::new();
    let lesson = LessonDraft::new(
        "1-1",
        "Viewport Navigation",
        vec![
            Section::new(
                SectionId::new("s1"),
                SectionKind::Introduction,
                "Welcome",
                5,
                0,
                CompletionCriteria::manual(false),
            ),
            Section::new(
                SectionId::new("s2"),
                SectionKind::Demonstration,
                "Orbit and pan",
                10,
                1,
                CompletionCriteria::time_based(60),
            ),
        ],
    )
    .validate()
    .unwrap();
    repo.upsert_lesson(&lesson).await.unwrap();
    repo
}

fn loop_service(repo: &InMemoryRepository) -> LessonLoopService {
    LessonLoopService::new(
        Clock::fixed(fixed_now()),
        EngineConfig::default().with_time_tick(Duration::from_secs(10)),
        Arc::new(repo.clone()),
        Arc::new(repo.clone()),
    )
}

#[tokio::test(start_paused = true)]
async fn lesson_loop_tracks_time_and_persists() {
    let repo = seeded_repo().await;
    let svc = loop_service(&repo);
    let lesson_id = LessonId::new("1-1");

    let mut active = svc.start_lesson(&lesson_id).await.unwrap();
    assert_eq!(active.timed_section(), Some(&SectionId::new("s1")));
    assert!(repo.load_progress(&lesson_id).await.unwrap().is_some());

    let events = svc.next_tick(&mut active).await.unwrap();
    assert!(events.applied);
    assert_eq!(active.session().progress().time_spent_secs(), 10);

    tokio::time::sleep(Duration::from_secs(15)).await;
    svc.pump_time_updates(&mut active).await.unwrap();
    assert_eq!(active.session().progress().time_spent_secs(), 20);

    let events = svc
        .perform(&mut active, |s| s.request_manual_completion())
        .await
        .unwrap();
    assert_eq!(events.completed_sections, vec![SectionId::new("s1")]);
    assert_eq!(active.timed_section(), Some(&SectionId::new("s2")));

    let stored = repo.load_progress(&lesson_id).await.unwrap().unwrap();
    assert_eq!(stored.completed_count(), 1);
    assert_eq!(stored.time_spent_secs(), 20);

    let progress = svc.finish(active).await.unwrap();
    assert!(!progress.is_completed());
}

#[tokio::test(start_paused = true)]
async fn lesson_loop_resumes_at_first_incomplete_section() {
    let repo = seeded_repo().await;
    let svc = loop_service(&repo);
    let lesson_id = LessonId::new("1-1");

    let mut active = svc.start_lesson(&lesson_id).await.unwrap();
    svc.perform(&mut active, |s| s.complete_section(0)).await.unwrap();
    svc.finish(active).await.unwrap();

    let mut resumed = svc.start_lesson(&lesson_id).await.unwrap();
    assert_eq!(resumed.session().current_index(), 1);
    assert_eq!(resumed.timed_section(), Some(&SectionId::new("s2")));

    // six ticks of ten seconds satisfy the sixty second criterion
    tokio::time::sleep(Duration::from_secs(65)).await;
    let events = svc.pump_time_updates(&mut resumed).await.unwrap();
    assert!(events.lesson_completed);

    let stored = repo.load_progress(&lesson_id).await.unwrap().unwrap();
    assert!(stored.is_completed());
    assert_eq!(stored.achievements().len(), 3);
}

#[tokio::test(start_paused = true)]
async fn save_failures_surface_as_storage_errors() {
    let repo = seeded_repo().await;
    let svc = LessonLoopService::new(
        Clock::fixed(fixed_now()),
        EngineConfig::default(),
        Arc::new(repo),
        Arc::new(OfflineProgress),
    );
    let err = svc.start_lesson(&LessonId::new("1-1")).await.unwrap_err();
    assert!(matches!(
        err,
        LessonSessionError::Storage(StorageError::Connection(_))
    ));
}

fn section_secs(progress: &UserLessonProgress, index: usize) -> u64 {
    progress.section(index).map_or(0, |sp| sp.time_spent_secs())
}

#[tokio::test(start_paused = true)]
async fn switching_sections_keeps_queued_time_in_order() {
    let repo = seeded_repo().await;
    let svc = loop_service(&repo);
    let lesson_id = LessonId::new("1-1");

    let mut active = svc.start_lesson(&lesson_id).await.unwrap();
    svc.perform(&mut active, |s| s.complete_section(0)).await.unwrap();
    assert_eq!(active.timed_section(), Some(&SectionId::new("s2")));

    // ticks at 10s and 20s stay queued until the next call
    tokio::time::sleep(Duration::from_secs(25)).await;

    svc.perform(&mut active, |s| s.previous_section()).await.unwrap();
    assert_eq!(active.timed_section(), Some(&SectionId::new("s1")));
    assert_eq!(section_secs(active.session().progress(), 1), 20);

    svc.perform(&mut active, |s| s.next_section()).await.unwrap();
    assert_eq!(active.timed_section(), Some(&SectionId::new("s2")));

    let mut seen = vec![section_secs(active.session().progress(), 1)];
    for _ in 0..3 {
        tokio::time::sleep(Duration::from_secs(11)).await;
        svc.pump_time_updates(&mut active).await.unwrap();
        seen.push(section_secs(active.session().progress(), 1));
    }
    assert!(seen.windows(2).all(|w| w[0] <= w[1]), "time went backwards: {seen:?}");
    assert_eq!(seen.first(), Some(&20));
    assert_eq!(seen.last(), Some(&50));

    let stored = repo.load_progress(&lesson_id).await.unwrap().unwrap();
    assert_eq!(section_secs(&stored, 1), 50);
}

#[tokio::test(start_paused = true)]
async fn queued_ticks_apply_before_the_learner_action() {
    let repo = seeded_repo().await;
    let svc = loop_service(&repo);
    let lesson_id = LessonId::new("1-1");

    let mut active = svc.start_lesson(&lesson_id).await.unwrap();
    svc.perform(&mut active, |s| s.complete_section(0)).await.unwrap();

    // six queued ticks satisfy the sixty second criterion of s2
    tokio::time::sleep(Duration::from_secs(65)).await;
    let events = svc
        .perform(&mut active, |s| Ok(s.record_interaction("orbit")))
        .await
        .unwrap();
    assert!(events.lesson_completed);
    assert_eq!(events.completed_sections, vec![SectionId::new("s2")]);
}

#[tokio::test(start_paused = true)]
async fn stale_stored_progress_starts_the_lesson_over() {
    let repo = seeded_repo().await;
    let lesson_id = LessonId::new("1-1");

    let old_version = LessonDraft::new(
        "1-1",
        "Viewport Navigation",
        vec![Section::new(
            SectionId::new("s1"),
            SectionKind::Introduction,
            "Welcome",
            5,
            0,
            CompletionCriteria::manual(false),
        )],
    )
    .validate()
    .unwrap();
    let engine = LessonProgressEngine::new(old_version, EngineConfig::default());
    let stale = engine
        .apply_update(
            &engine.initialize(fixed_now()),
            &ProgressUpdate::section_complete(SectionId::new("s1"), fixed_now()),
        )
        .progress;
    assert!(stale.is_completed());
    repo.save_progress(&stale).await.unwrap();

    let svc = loop_service(&repo);
    let active = svc.start_lesson(&lesson_id).await.unwrap();
    let progress = active.session().progress();
    assert_eq!(progress.total_sections(), 2);
    assert_eq!(progress.completed_count(), 0);
    assert!(!progress.is_completed());
    assert_eq!(active.session().current_index(), 0);

    let stored = repo.load_progress(&lesson_id).await.unwrap().unwrap();
    assert_eq!(stored.total_sections(), 2);
}
