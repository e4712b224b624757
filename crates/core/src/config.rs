use std::collections::BTreeSet;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::LessonId;

/// Points awarded for the first completion of a section.
pub const DEFAULT_SECTION_POINTS: u32 = 10;
/// Points awarded for the first completion of a whole lesson.
pub const DEFAULT_LESSON_POINTS: u32 = 50;
/// Period of the section time tracker.
pub const DEFAULT_TIME_TICK: Duration = Duration::from_secs(10);

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ConfigError {
    #[error("time tick must be > 0")]
    ZeroTimeTick,
}

/// Tunables for the progress engine and the session layer built on it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Lessons whose sections are all unlocked from the start (free navigation).
    pub free_navigation_lessons: BTreeSet<LessonId>,
    pub section_points: u32,
    pub lesson_points: u32,
    pub time_tick: Duration,
    /// Move to the next section after the current one completes.
    pub auto_advance: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            free_navigation_lessons: BTreeSet::new(),
            section_points: DEFAULT_SECTION_POINTS,
            lesson_points: DEFAULT_LESSON_POINTS,
            time_tick: DEFAULT_TIME_TICK,
            auto_advance: true,
        }
    }
}

impl EngineConfig {
    #[must_use]
    pub fn with_free_navigation(mut self, lesson_id: LessonId) -> Self {
        self.free_navigation_lessons.insert(lesson_id);
        self
    }

    #[must_use]
    pub fn with_points(mut self, section_points: u32, lesson_points: u32) -> Self {
        self.section_points = section_points;
        self.lesson_points = lesson_points;
        self
    }

    #[must_use]
    pub fn with_time_tick(mut self, time_tick: Duration) -> Self {
        self.time_tick = time_tick;
        self
    }

    #[must_use]
    pub fn with_auto_advance(mut self, auto_advance: bool) -> Self {
        self.auto_advance = auto_advance;
        self
    }

    #[must_use]
    pub fn is_free_navigation(&self, lesson_id: &LessonId) -> bool {
        self.free_navigation_lessons.contains(lesson_id)
    }

    /// # Errors
    ///
    /// Returns `ConfigError::ZeroTimeTick` if the tracker period is zero.
    pub fn validate(self) -> Result<Self, ConfigError> {
        if self.time_tick.is_zero() {
            return Err(ConfigError::ZeroTimeTick);
        }
        Ok(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_badge_values() {
        let config = EngineConfig::default();
        assert_eq!(config.section_points, 10);
        assert_eq!(config.lesson_points, 50);
        assert_eq!(config.time_tick, Duration::from_secs(10));
        assert!(config.free_navigation_lessons.is_empty());
    }

    #[test]
    fn zero_tick_is_rejected() {
        let err = EngineConfig::default()
            .with_time_tick(Duration::ZERO)
            .validate()
            .unwrap_err();
        assert_eq!(err, ConfigError::ZeroTimeTick);
    }

    #[test]
    fn free_navigation_is_per_lesson() {
        let config = EngineConfig::default().with_free_navigation(LessonId::new("demo"));
        assert!(config.is_free_navigation(&LessonId::new("demo")));
        assert!(!config.is_free_navigation(&LessonId::new("1-1")));
    }
}
