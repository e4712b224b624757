mod events;
mod service;
mod timer;
mod view;
mod workflow;

// Public API of the lesson subsystem.
pub use crate::error::LessonSessionError;
pub use events::SessionEvents;
pub use service::LessonSession;
pub use timer::SectionTimer;
pub use view::{LessonOverview, SectionStatus};
pub use workflow::{ActiveLesson, LessonLoopService};
