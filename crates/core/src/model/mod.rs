mod achievement;
mod course;
mod criteria;
mod ids;
mod lesson;
mod progress;
mod update;

pub use ids::{AchievementId, CourseId, LessonId, ParseIdError, SectionId};

pub use achievement::{Achievement, AchievementKind, AchievementLedger};
pub use course::{Course, CourseError, CourseLesson};
pub use criteria::{CompletionCriteria, DEFAULT_MINIMUM_QUIZ_SCORE};
pub use lesson::{Difficulty, Lesson, LessonDraft, LessonError, Section, SectionKind};
pub use progress::{LessonProgressSummary, SectionProgress, UserLessonProgress};
pub use update::{ProgressUpdate, UpdateError, UpdateKind};
