use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::model::progress::SectionProgress;

/// Passing threshold applied to quiz-based sections that do not specify one.
pub const DEFAULT_MINIMUM_QUIZ_SCORE: f64 = 70.0;

fn default_minimum_quiz_score() -> f64 {
    DEFAULT_MINIMUM_QUIZ_SCORE
}

/// Rule deciding when a section counts as done.
///
/// Each strategy carries only the fields it needs. Missing thresholds fall back
/// to explicit defaults when deserialized: `0` seconds for time-based sections and
/// [`DEFAULT_MINIMUM_QUIZ_SCORE`] for quiz-based ones.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum CompletionCriteria {
    /// Satisfied once the learner spent at least `minimum_time_secs` in the section.
    TimeBased {
        #[serde(default)]
        minimum_time_secs: u64,
    },
    /// Satisfied once every listed interaction has been recorded.
    InteractionBased {
        #[serde(default)]
        required_interaction_ids: BTreeSet<String>,
    },
    /// Satisfied once the mean of the recorded quiz scores reaches the threshold.
    QuizBased {
        #[serde(default = "default_minimum_quiz_score")]
        minimum_score_percent: f64,
    },
    /// Driven by an explicit "mark complete" request from the learner.
    Manual {
        #[serde(default)]
        all_steps_completed: bool,
    },
}

impl CompletionCriteria {
    #[must_use]
    pub fn time_based(minimum_time_secs: u64) -> Self {
        Self::TimeBased { minimum_time_secs }
    }

    #[must_use]
    pub fn interaction_based<I, S>(ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::InteractionBased {
            required_interaction_ids: ids.into_iter().map(Into::into).collect(),
        }
    }

    #[must_use]
    pub fn quiz_based(minimum_score_percent: f64) -> Self {
        Self::QuizBased {
            minimum_score_percent,
        }
    }

    #[must_use]
    pub fn manual(all_steps_completed: bool) -> Self {
        Self::Manual {
            all_steps_completed,
        }
    }

    /// Manual criteria are only evaluated on an explicit completion request.
    #[must_use]
    pub fn is_manual(&self) -> bool {
        matches!(self, Self::Manual { .. })
    }

    /// Decide whether `progress` qualifies the section as complete.
    ///
    /// An empty interaction requirement is a content misconfiguration and is
    /// never satisfied. A quiz-based section with no recorded score is never
    /// satisfied either, whatever its threshold.
    #[must_use]
    pub fn is_satisfied(&self, progress: &SectionProgress) -> bool {
        match self {
            Self::TimeBased { minimum_time_secs } => {
                progress.time_spent_secs() >= *minimum_time_secs
            }
            Self::InteractionBased {
                required_interaction_ids,
            } => {
                if required_interaction_ids.is_empty() {
                    tracing::warn!(
                        section_id = %progress.section_id(),
                        "interaction-based section has no required interactions; treating as unsatisfied"
                    );
                    return false;
                }
                required_interaction_ids
                    .iter()
                    .all(|id| progress.has_interaction(id))
            }
            Self::QuizBased {
                minimum_score_percent,
            } => match progress.quiz_mean() {
                Some(mean) => mean >= *minimum_score_percent,
                None => false,
            },
            Self::Manual {
                all_steps_completed,
            } => !*all_steps_completed || progress.interaction_count() > 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::SectionId;
    use crate::time::fixed_now;

    fn progress() -> SectionProgress {
        SectionProgress::new(SectionId::new("s"), fixed_now())
    }

    #[test]
    fn time_based_threshold_is_inclusive() {
        let criteria = CompletionCriteria::time_based(60);
        let mut p = progress();
        p.set_time_spent(59);
        assert!(!criteria.is_satisfied(&p));
        p.set_time_spent(60);
        assert!(criteria.is_satisfied(&p));
    }

    #[test]
    fn interaction_based_requires_every_id() {
        let criteria = CompletionCriteria::interaction_based(["a", "b"]);
        let mut p = progress();
        p.record_interaction("a");
        assert!(!criteria.is_satisfied(&p));
        p.record_interaction("b");
        p.record_interaction("c");
        assert!(criteria.is_satisfied(&p));
    }

    #[test]
    fn empty_interaction_requirement_never_passes() {
        let criteria = CompletionCriteria::interaction_based(Vec::<String>::new());
        let mut p = progress();
        p.record_interaction("anything");
        assert!(!criteria.is_satisfied(&p));
    }

    #[test]
    fn quiz_based_uses_mean_score() {
        let criteria = CompletionCriteria::quiz_based(70.0);
        let mut p = progress();
        p.record_quiz_score("q1", 60.0);
        p.record_quiz_score("q2", 90.0);
        assert!(criteria.is_satisfied(&p));

        let mut low = progress();
        low.record_quiz_score("q1", 50.0);
        assert!(!criteria.is_satisfied(&low));
    }

    #[test]
    fn quiz_based_without_scores_is_unsatisfied() {
        assert!(!CompletionCriteria::quiz_based(0.0).is_satisfied(&progress()));
    }

    #[test]
    fn manual_with_steps_needs_an_interaction() {
        let criteria = CompletionCriteria::manual(true);
        let mut p = progress();
        assert!(!criteria.is_satisfied(&p));
        p.record_interaction("checklist");
        assert!(criteria.is_satisfied(&p));
        assert!(CompletionCriteria::manual(false).is_satisfied(&progress()));
    }

    #[test]
    fn missing_thresholds_use_defaults() {
        let quiz: CompletionCriteria = serde_json::from_str(r#"{"type":"quiz-based"}"#).unwrap();
        assert_eq!(quiz, CompletionCriteria::quiz_based(DEFAULT_MINIMUM_QUIZ_SCORE));

        let time: CompletionCriteria = serde_json::from_str(r#"{"type":"time-based"}"#).unwrap();
        assert!(time.is_satisfied(&progress()));
    }
}
