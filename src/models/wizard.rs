// src/models/wizard.rs

//! Wizard context: which paper is being composed and which step comes next.
//!
//! The stage is a plain value. Handlers load it, ask it for the next stage,
//! do their work, then store the new stage. Nothing here touches the
//! database.

use std::fmt;

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::models::{
    paper::PaperStatus,
    section::{Part, PendingCounts},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "step", rename_all = "snake_case")]
pub enum WizardStage {
    /// Waiting for header metadata.
    Heading,
    /// Step 0 of a section: counts and marks.
    Counts { part: Part },
    /// Step 1 of a section: question entry sized by the pending counts.
    Questions { part: Part, counts: PendingCounts },
    /// All three sections saved.
    Review,
}

/// A request that does not fit the current stage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WizardError {
    pub stage: WizardStage,
    pub attempted: &'static str,
}

impl fmt::Display for WizardError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "cannot {} while the wizard is at {}",
            self.attempted,
            self.stage.describe()
        )
    }
}

impl std::error::Error for WizardError {}

impl WizardStage {
    /// Stage a paper re-enters at when resumed.
    pub fn resume_at(status: PaperStatus) -> WizardStage {
        match status.pending_part() {
            Some(part) => WizardStage::Counts { part },
            None => WizardStage::Review,
        }
    }

    pub fn describe(&self) -> String {
        match self {
            WizardStage::Heading => "heading".to_string(),
            WizardStage::Counts { part } => format!("part {} counts", part.code()),
            WizardStage::Questions { part, .. } => format!("part {} questions", part.code()),
            WizardStage::Review => "review".to_string(),
        }
    }

    /// Heading saved: move to the first section.
    pub fn after_heading(self) -> Result<WizardStage, WizardError> {
        match self {
            WizardStage::Heading => Ok(WizardStage::Counts { part: Part::A }),
            other => Err(other.reject("submit the heading")),
        }
    }

    /// Counts accepted for `part`. Re-sending counts from the question step
    /// replaces the pending values.
    pub fn after_counts(
        self,
        part: Part,
        counts: PendingCounts,
    ) -> Result<WizardStage, WizardError> {
        match self {
            WizardStage::Counts { part: current }
            | WizardStage::Questions { part: current, .. }
                if current == part =>
            {
                Ok(WizardStage::Questions { part, counts })
            }
            other => Err(other.reject("submit counts for this part")),
        }
    }

    /// Pending counts for the question step of `part`.
    pub fn pending_counts(self, part: Part) -> Result<PendingCounts, WizardError> {
        match self {
            WizardStage::Questions {
                part: current,
                counts,
            } if current == part => Ok(counts),
            other => Err(other.reject("submit questions for this part")),
        }
    }

    /// Section saved: move on to the next section or to review.
    pub fn after_questions(self, part: Part) -> Result<WizardStage, WizardError> {
        self.pending_counts(part)?;
        Ok(match part.next() {
            Some(next) => WizardStage::Counts { part: next },
            None => WizardStage::Review,
        })
    }

    fn reject(self, attempted: &'static str) -> WizardError {
        WizardError {
            stage: self,
            attempted,
        }
    }
}

/// Represents the 'wizard_sessions' table in the database.
#[derive(Debug, Clone, FromRow)]
pub struct WizardSessionRow {
    pub token: String,
    pub paper_id: Option<i64>,
    pub stage: sqlx::types::Json<WizardStage>,
}

/// Wizard context handed back to the client after every step.
#[derive(Debug, Clone, Serialize)]
pub struct WizardContext {
    pub token: String,
    pub paper_id: Option<i64>,
    pub stage: WizardStage,
}

impl From<WizardSessionRow> for WizardContext {
    fn from(row: WizardSessionRow) -> Self {
        WizardContext {
            token: row.token,
            paper_id: row.paper_id,
            stage: row.stage.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn counts(q: i64) -> PendingCounts {
        PendingCounts {
            question_count: q,
            required_count: Some(q / 2),
            mark_per_question: 5,
        }
    }

    #[test]
    fn walks_all_stages_in_order() {
        let mut stage = WizardStage::Heading.after_heading().unwrap();
        for part in Part::ALL {
            assert_eq!(stage, WizardStage::Counts { part });
            stage = stage.after_counts(part, counts(4)).unwrap();
            assert_eq!(stage.pending_counts(part).unwrap(), counts(4));
            stage = stage.after_questions(part).unwrap();
        }
        assert_eq!(stage, WizardStage::Review);
    }

    #[test]
    fn rejects_out_of_order_steps() {
        let stage = WizardStage::Counts { part: Part::A };
        assert!(stage.after_heading().is_err());
        assert!(stage.after_counts(Part::B, counts(2)).is_err());
        assert!(stage.after_questions(Part::A).is_err());

        let err = WizardStage::Review.after_counts(Part::C, counts(2)).unwrap_err();
        assert_eq!(err.stage, WizardStage::Review);
    }

    #[test]
    fn counts_can_be_resent_from_question_step() {
        let stage = WizardStage::Counts { part: Part::B }
            .after_counts(Part::B, counts(4))
            .unwrap()
            .after_counts(Part::B, counts(6))
            .unwrap();
        assert_eq!(stage.pending_counts(Part::B).unwrap(), counts(6));
    }

    #[test]
    fn resume_targets_first_missing_section() {
        assert_eq!(
            WizardStage::resume_at(PaperStatus::HeadingOnly),
            WizardStage::Counts { part: Part::A }
        );
        assert_eq!(
            WizardStage::resume_at(PaperStatus::HasB),
            WizardStage::Counts { part: Part::C }
        );
        assert_eq!(WizardStage::resume_at(PaperStatus::HasC), WizardStage::Review);
    }

    #[test]
    fn stage_serializes_with_step_tag() {
        let json = serde_json::to_value(WizardStage::Counts { part: Part::B }).unwrap();
        assert_eq!(json, serde_json::json!({"step": "counts", "part": "b"}));
    }
}
