// src/models/paper.rs

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

use crate::{
    config::PERCENT_TOLERANCE,
    models::section::{Part, SectionWithQuestions},
};

/// Represents the 'question_papers' table in the database.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct QuestionPaper {
    pub id: i64,
    pub code: i64,
    pub revision: String,
    pub subject_code: String,
    pub subject_name: String,
    pub exam_name: String,
    pub duration_hours: i64,

    /// Maximum marks printed on the paper.
    pub exam_marks: i64,

    /// Running sum of the saved section totals.
    pub maximum_mark: i64,

    pub module1_hours: Option<i64>,
    pub module2_hours: Option<i64>,
    pub module3_hours: Option<i64>,
    pub module4_hours: Option<i64>,

    pub percent_r: Option<f64>,
    pub percent_u: Option<f64>,
    pub percent_a: Option<f64>,

    pub created_at: Option<chrono::NaiveDateTime>,
}

impl QuestionPaper {
    /// Teaching hours of modules 1..=4, missing values read as 0.
    pub fn module_hours(&self) -> [i64; 4] {
        [
            self.module1_hours.unwrap_or(0),
            self.module2_hours.unwrap_or(0),
            self.module3_hours.unwrap_or(0),
            self.module4_hours.unwrap_or(0),
        ]
    }

    /// Course code as printed on documents.
    pub fn course_code(&self) -> String {
        format!("TED({}){}", self.revision, self.subject_code)
    }
}

/// Progress of a paper through the wizard, derived from which sections exist.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PaperStatus {
    HeadingOnly,
    HasA,
    HasB,
    HasC,
}

impl PaperStatus {
    /// Sections are checked in order; the first missing one decides.
    pub fn derive(has_a: bool, has_b: bool, has_c: bool) -> PaperStatus {
        if !has_a {
            PaperStatus::HeadingOnly
        } else if !has_b {
            PaperStatus::HasA
        } else if !has_c {
            PaperStatus::HasB
        } else {
            PaperStatus::HasC
        }
    }

    pub fn from_parts(parts: &[Part]) -> PaperStatus {
        PaperStatus::derive(
            parts.contains(&Part::A),
            parts.contains(&Part::B),
            parts.contains(&Part::C),
        )
    }

    /// First section still to be written, `None` once complete.
    pub fn pending_part(self) -> Option<Part> {
        match self {
            PaperStatus::HeadingOnly => Some(Part::A),
            PaperStatus::HasA => Some(Part::B),
            PaperStatus::HasB => Some(Part::C),
            PaperStatus::HasC => None,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            PaperStatus::HeadingOnly => "Part A Pending",
            PaperStatus::HasA => "Part B Pending",
            PaperStatus::HasB => "Part C Pending",
            PaperStatus::HasC => "Complete",
        }
    }
}

/// A paper with all of its saved sections, A before B before C.
#[derive(Debug, Clone, Serialize)]
pub struct PaperAggregate {
    pub paper: QuestionPaper,
    pub sections: Vec<SectionWithQuestions>,
}

impl PaperAggregate {
    pub fn section(&self, part: Part) -> Option<&SectionWithQuestions> {
        self.sections.iter().find(|s| s.section.part == part)
    }

    pub fn status(&self) -> PaperStatus {
        let parts: Vec<Part> = self.sections.iter().map(|s| s.section.part).collect();
        PaperStatus::from_parts(&parts)
    }
}

/// Row of the resume list.
#[derive(Debug, Serialize)]
pub struct PaperSummary {
    pub id: i64,
    pub code: i64,
    pub subject_code: String,
    pub subject_name: String,
    pub exam_name: String,
    pub maximum_mark: i64,
    pub status: PaperStatus,
    pub status_label: &'static str,
    pub created_at: Option<chrono::NaiveDateTime>,
}

/// DTO for the heading step (create and edit).
#[derive(Debug, Clone, Deserialize, Serialize, Validate)]
pub struct HeadingRequest {
    #[validate(range(min = 1))]
    pub code: i64,
    #[validate(length(min = 1, max = 10))]
    pub revision: String,
    #[validate(length(min = 1, max = 20))]
    pub subject_code: String,
    /// An exam name, or "OTHER" together with `custom_exam_name`.
    #[validate(length(min = 1, max = 500))]
    pub exam_name: String,
    #[validate(length(max = 500))]
    pub custom_exam_name: Option<String>,
    /// Falls back to the subject code's stored name.
    #[validate(length(min = 1, max = 500))]
    pub subject_name: Option<String>,
    /// Falls back to the subject code's stored duration.
    #[validate(range(min = 1, max = 24))]
    pub duration_hours: Option<i64>,
    /// Falls back to the configured default maximum marks.
    #[validate(range(min = 1, max = 1000))]
    pub exam_marks: Option<i64>,

    #[validate(range(min = 0, max = 500))]
    pub module1_hours: Option<i64>,
    #[validate(range(min = 0, max = 500))]
    pub module2_hours: Option<i64>,
    #[validate(range(min = 0, max = 500))]
    pub module3_hours: Option<i64>,
    #[validate(range(min = 0, max = 500))]
    pub module4_hours: Option<i64>,

    #[validate(range(min = 0.0, max = 100.0))]
    pub percent_r: Option<f64>,
    #[validate(range(min = 0.0, max = 100.0))]
    pub percent_u: Option<f64>,
    #[validate(range(min = 0.0, max = 100.0))]
    pub percent_a: Option<f64>,
}

impl HeadingRequest {
    /// R + U + A must be about 100 whenever any of them is given.
    pub fn check_percentages(&self) -> Result<(), String> {
        let sum = self.percent_r.unwrap_or(0.0)
            + self.percent_u.unwrap_or(0.0)
            + self.percent_a.unwrap_or(0.0);

        if sum > 0.0 && (sum - 100.0).abs() > PERCENT_TOLERANCE {
            return Err("Sum of R + U + A should be around 100%.".to_string());
        }
        Ok(())
    }

    /// Resolves the "OTHER" choice into the custom name.
    pub fn resolved_exam_name(&self) -> Result<String, String> {
        if self.exam_name == "OTHER" {
            match self.custom_exam_name.as_deref().map(str::trim) {
                Some(name) if !name.is_empty() => Ok(name.to_string()),
                _ => Err("Please enter a custom exam name.".to_string()),
            }
        } else {
            Ok(self.exam_name.trim().to_string())
        }
    }
}
