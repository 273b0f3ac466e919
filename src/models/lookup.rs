// src/models/lookup.rs

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

use crate::models::section::Part;

/// Represents the 'revisions' table (syllabus revision years).
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Revision {
    pub id: i64,
    pub year: String,
    pub is_active: bool,
}

#[derive(Debug, Deserialize, Validate)]
pub struct RevisionRequest {
    #[validate(length(min = 1, max = 10))]
    pub year: String,
    #[serde(default = "active")]
    pub is_active: bool,
}

/// Represents the 'exam_names' table.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct ExamName {
    pub id: i64,
    pub name: String,
    pub is_active: bool,
    /// Lower numbers are listed first.
    pub display_order: i64,
}

#[derive(Debug, Deserialize, Validate)]
pub struct ExamNameRequest {
    #[validate(length(min = 1, max = 500))]
    pub name: String,
    #[serde(default = "active")]
    pub is_active: bool,
    #[serde(default)]
    pub display_order: i64,
}

/// Represents the 'subject_codes' table.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct SubjectCode {
    pub id: i64,
    pub code: String,
    pub subject_name: String,
    pub duration_hours: i64,
    pub is_active: bool,
}

#[derive(Debug, Deserialize, Validate)]
pub struct SubjectCodeRequest {
    #[validate(length(min = 1, max = 20))]
    pub code: String,
    #[validate(length(min = 1, max = 500))]
    pub subject_name: String,
    #[serde(default = "default_duration")]
    #[validate(range(min = 1, max = 24))]
    pub duration_hours: i64,
    #[serde(default = "active")]
    pub is_active: bool,
}

/// Represents the 'question_modules' table.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct QuestionModule {
    pub id: i64,
    pub module_number: i64,
    pub is_active: bool,
}

#[derive(Debug, Deserialize, Validate)]
pub struct QuestionModuleRequest {
    #[validate(range(min = 1, max = 4))]
    pub module_number: i64,
    #[serde(default = "active")]
    pub is_active: bool,
}

/// Represents the 'module_outcomes' table (e.g. "M1.01").
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct ModuleOutcome {
    pub id: i64,
    pub outcome_code: String,
    pub description: Option<String>,
    pub is_active: bool,
}

#[derive(Debug, Deserialize, Validate)]
pub struct ModuleOutcomeRequest {
    #[validate(length(min = 1, max = 20))]
    pub outcome_code: String,
    #[validate(length(max = 500))]
    pub description: Option<String>,
    #[serde(default = "active")]
    pub is_active: bool,
}

/// Active modules and outcomes a question may be filed under.
#[derive(Debug, Clone, Default, Serialize)]
pub struct QuestionChoices {
    pub modules: Vec<QuestionModule>,
    pub outcomes: Vec<ModuleOutcome>,
}

impl QuestionChoices {
    pub fn has_module(&self, number: i64) -> bool {
        self.modules.iter().any(|m| m.module_number == number)
    }

    pub fn has_outcome(&self, code: &str) -> bool {
        self.outcomes.iter().any(|o| o.outcome_code == code)
    }
}

/// Represents the 'section_instructions' table.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct SectionInstruction {
    pub id: i64,
    pub text: String,
    #[sqlx(try_from = "String")]
    pub part: Part,
    pub is_active: bool,
}

#[derive(Debug, Deserialize, Validate)]
pub struct SectionInstructionRequest {
    #[validate(length(min = 1, max = 5000))]
    pub text: String,
    pub part: Part,
    #[serde(default = "active")]
    pub is_active: bool,
}

/// Singleton row of 'system_configuration'.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize, Validate)]
pub struct SystemConfiguration {
    #[validate(range(min = 1, max = 1000))]
    pub default_max_marks: i64,
}

/// Query string for list endpoints.
#[derive(Debug, Deserialize)]
pub struct SearchParams {
    pub search: Option<String>,
}

impl SearchParams {
    /// `LIKE` pattern, or `None` when no search was given.
    pub fn pattern(&self) -> Option<String> {
        self.search
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(|s| format!("%{}%", s))
    }
}

/// Response of the subject-details lookup.
#[derive(Debug, Serialize)]
pub struct SubjectDetails {
    pub success: bool,
    pub subject_name: String,
    pub duration_hours: i64,
}

/// Choices shown on the heading step.
#[derive(Debug, Serialize)]
pub struct HeadingChoices {
    pub default_max_marks: i64,
    pub revisions: Vec<Revision>,
    pub exam_names: Vec<ExamName>,
    pub subject_codes: Vec<SubjectCode>,
}

fn active() -> bool {
    true
}

fn default_duration() -> i64 {
    3
}
