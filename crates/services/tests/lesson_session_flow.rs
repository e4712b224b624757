use learn_core::model::{
    CompletionCriteria, Lesson, LessonDraft, Section, SectionId, SectionKind,
};
use learn_core::time::fixed_clock;
use learn_core::{EngineConfig, EngineError, LessonProgressEngine};
use services::{LessonSession, LessonSessionError};

fn four_section_lesson() -> Lesson {
    LessonDraft::new(
        "2-1",
        "Lighting Basics",
        vec![
            Section::new(
                SectionId::new("intro"),
                SectionKind::Introduction,
                "Intro",
                5,
                0,
                CompletionCriteria::manual(false),
            ),
            Section::new(
                SectionId::new("concept"),
                SectionKind::Concept,
                "Three-point lighting",
                10,
                1,
                CompletionCriteria::interaction_based(["key-light", "fill-light"]),
            ),
            Section::new(
                SectionId::new("check"),
                SectionKind::Practice,
                "Check",
                10,
                2,
                CompletionCriteria::quiz_based(70.0),
            ),
            Section::new(
                SectionId::new("render"),
                SectionKind::Challenge,
                "Render",
                5,
                3,
                CompletionCriteria::time_based(30),
            ),
        ],
    )
    .validate()
    .unwrap()
}

fn session() -> LessonSession {
    let engine = LessonProgressEngine::new(four_section_lesson(), EngineConfig::default());
    LessonSession::start(engine, fixed_clock())
}

#[test]
fn locked_section_cannot_be_activated() {
    let mut session = session();
    let err = session.activate_section(2).unwrap_err();
    assert!(matches!(err, LessonSessionError::SectionLocked { index: 2 }));
    assert_eq!(session.current_index(), 0);

    let err = session.activate_section(9).unwrap_err();
    assert!(matches!(err, LessonSessionError::Engine(_)));
}

#[test]
fn walkthrough_completes_and_advances_each_section() {
    let mut session = session();
    session.activate_section(0).unwrap();

    let events = session.request_manual_completion().unwrap();
    assert_eq!(events.completed_sections, vec![SectionId::new("intro")]);
    assert_eq!(session.current_index(), 1);

    let events = session.record_interaction("key-light");
    assert!(events.applied);
    assert!(events.completed_sections.is_empty());
    let events = session.record_interaction("fill-light");
    assert_eq!(events.completed_sections, vec![SectionId::new("concept")]);
    assert_eq!(session.current_index(), 2);

    let events = session.record_quiz("q1", 50.0).unwrap();
    assert!(events.completed_sections.is_empty());
    let events = session.record_quiz("q1", 90.0).unwrap();
    assert_eq!(events.completed_sections, vec![SectionId::new("check")]);
    assert_eq!(session.current_index(), 3);
    assert_eq!(session.estimated_minutes_remaining(), 5);

    let events = session.record_time(20);
    assert!(events.completed_sections.is_empty());
    let events = session.record_time(30);
    assert_eq!(events.completed_sections, vec![SectionId::new("render")]);
    assert!(events.lesson_completed);
    assert!(session.is_complete());
    assert_eq!(session.current_index(), 3);

    let overview = session.overview();
    assert_eq!(overview.completed_sections, 4);
    assert_eq!(overview.time_spent_secs, 30);
    assert_eq!(overview.estimated_minutes_remaining, 0);
    assert_eq!(overview.score, Some(90.0));
    assert_eq!(overview.points, 90);
    assert_eq!(session.progress().achievements().len(), 5);
}

#[test]
fn manual_completion_requires_a_step_when_configured() {
    let lesson = LessonDraft::new(
        "2-2",
        "Materials",
        vec![Section::new(
            SectionId::new("steps"),
            SectionKind::Practice,
            "Follow along",
            10,
            0,
            CompletionCriteria::manual(true),
        )],
    )
    .validate()
    .unwrap();
    let engine = LessonProgressEngine::new(lesson, EngineConfig::default());
    let mut session = LessonSession::start(engine, fixed_clock());

    let err = session.request_manual_completion().unwrap_err();
    assert!(matches!(err, LessonSessionError::CriteriaNotMet { index: 0 }));

    // manual sections never complete on their own
    let events = session.record_interaction("step-1");
    assert!(events.completed_sections.is_empty());

    let events = session.request_manual_completion().unwrap();
    assert!(events.lesson_completed);
    assert!(session.request_manual_completion().unwrap().is_empty());
}

#[test]
fn navigation_stops_at_the_ends() {
    let mut session = session();
    assert!(matches!(
        session.previous_section(),
        Err(LessonSessionError::NoAdjacentSection)
    ));
    assert!(matches!(
        session.next_section(),
        Err(LessonSessionError::SectionLocked { index: 1 })
    ));

    session.complete_section(0).unwrap();
    assert_eq!(session.current_index(), 1);
    session.previous_section().unwrap();
    assert_eq!(session.current_index(), 0);
    session.next_section().unwrap();
    assert_eq!(session.current_index(), 1);
}

#[test]
fn auto_advance_can_be_disabled() {
    let engine = LessonProgressEngine::new(
        four_section_lesson(),
        EngineConfig::default().with_auto_advance(false),
    );
    let mut session = LessonSession::start(engine, fixed_clock());
    session.complete_section(0).unwrap();
    assert_eq!(session.current_index(), 0);

    let statuses = session.section_statuses();
    assert!(statuses[0].completed && statuses[0].current);
    assert!(statuses[1].unlocked);
    assert!(!statuses[2].unlocked);
}

#[test]
fn resume_rejects_progress_from_another_lesson_version() {
    let old_version = LessonDraft::new(
        "2-1",
        "Lighting Basics",
        vec![Section::new(
            SectionId::new("intro"),
            SectionKind::Introduction,
            "Intro",
            5,
            0,
            CompletionCriteria::manual(false),
        )],
    )
    .validate()
    .unwrap();
    let stored = LessonProgressEngine::new(old_version, EngineConfig::default())
        .initialize(fixed_clock().now());

    let engine = LessonProgressEngine::new(four_section_lesson(), EngineConfig::default());
    let err = LessonSession::resume(engine, stored, fixed_clock()).unwrap_err();
    assert!(matches!(
        err,
        LessonSessionError::Engine(EngineError::SectionMismatch { .. })
    ));
}
