//! Built-in content for the `demo` command.

use learn_core::model::{
    CompletionCriteria, Course, CourseLesson, Difficulty, Lesson, LessonDraft, LessonId, Section,
    SectionId, SectionKind,
};

pub const SAMPLE_LESSON_ID: &str = "1-1";
pub const SAMPLE_COURSE_ID: &str = "blender-fundamentals";

pub fn sample_lesson() -> Result<Lesson, learn_core::Error> {
    let mut draft = LessonDraft::new(
        SAMPLE_LESSON_ID,
        "Getting Around the Viewport",
        vec![
            Section::new(
                SectionId::new("welcome"),
                SectionKind::Introduction,
                "Welcome",
                2,
                0,
                CompletionCriteria::manual(false),
            ),
            Section::new(
                SectionId::new("navigation"),
                SectionKind::Concept,
                "Orbit, pan and zoom",
                6,
                1,
                CompletionCriteria::interaction_based(["orbit", "pan", "zoom"]),
            ),
            Section::new(
                SectionId::new("checkpoint"),
                SectionKind::Practice,
                "Checkpoint quiz",
                5,
                2,
                CompletionCriteria::quiz_based(70.0),
            ),
            Section::new(
                SectionId::new("explore"),
                SectionKind::Challenge,
                "Free exploration",
                3,
                3,
                CompletionCriteria::time_based(120),
            ),
        ],
    );
    draft.description = "Learn to move the camera around a scene.".to_owned();
    draft.difficulty = Difficulty::Beginner;
    draft.learning_objectives = vec![
        "Orbit the view around a selection".to_owned(),
        "Frame objects with zoom and pan".to_owned(),
    ];
    draft.tags = vec!["blender".to_owned(), "viewport".to_owned()];
    Ok(draft.validate()?)
}

pub fn sample_course() -> Result<Course, learn_core::Error> {
    let lessons = vec![
        CourseLesson {
            lesson_id: LessonId::new(SAMPLE_LESSON_ID),
            title: "Getting Around the Viewport".to_owned(),
            duration_minutes: 16,
        },
        CourseLesson {
            lesson_id: LessonId::new("1-2"),
            title: "Selecting and Transforming".to_owned(),
            duration_minutes: 20,
        },
        CourseLesson {
            lesson_id: LessonId::new("1-3"),
            title: "Your First Render".to_owned(),
            duration_minutes: 25,
        },
    ];
    Ok(Course::new(
        learn_core::model::CourseId::new(SAMPLE_COURSE_ID),
        "Blender Fundamentals",
        lessons,
    )?)
}
