// src/models/section.rs

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::{
    config::{MAX_MARK_PER_QUESTION, MAX_SECTION_QUESTIONS},
    models::question::{Question, QuestionInput, UnknownVariant},
};

/// The three sections of a paper.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Part {
    #[serde(rename = "a", alias = "A")]
    A,
    #[serde(rename = "b", alias = "B")]
    B,
    #[serde(rename = "c", alias = "C")]
    C,
}

impl Part {
    pub const ALL: [Part; 3] = [Part::A, Part::B, Part::C];

    /// Column value stored in `sections.part`.
    pub fn code(self) -> &'static str {
        match self {
            Part::A => "A",
            Part::B => "B",
            Part::C => "C",
        }
    }

    pub fn title(self) -> &'static str {
        match self {
            Part::A => "PART A",
            Part::B => "PART B",
            Part::C => "PART C",
        }
    }

    /// Roman prefix used when numbering questions ("I.3", "II.1").
    pub fn numeral(self) -> &'static str {
        match self {
            Part::A => "I",
            Part::B => "II",
            Part::C => "III",
        }
    }

    pub fn next(self) -> Option<Part> {
        match self {
            Part::A => Some(Part::B),
            Part::B => Some(Part::C),
            Part::C => None,
        }
    }

    /// Part C questions come in OR pairs.
    pub fn is_or_grouped(self) -> bool {
        self == Part::C
    }
}

impl TryFrom<String> for Part {
    type Error = UnknownVariant;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        match value.as_str() {
            "A" | "a" => Ok(Part::A),
            "B" | "b" => Ok(Part::B),
            "C" | "c" => Ok(Part::C),
            _ => Err(UnknownVariant(value)),
        }
    }
}

/// Represents the 'sections' table in the database.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Section {
    pub id: i64,
    pub paper_id: i64,
    #[sqlx(try_from = "String")]
    pub part: Part,
    /// Section instructions printed above the questions.
    pub info: String,
    pub question_count: i64,
    pub required_count: Option<i64>,
    pub mark_per_question: i64,
    pub total: i64,
    pub or_grouped: bool,
}

/// A section together with its questions in display order.
#[derive(Debug, Clone, Serialize)]
pub struct SectionWithQuestions {
    #[serde(flatten)]
    pub section: Section,
    pub questions: Vec<Question>,
}

/// Step-0 parameters of a section, held in the wizard until step 1 succeeds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingCounts {
    pub question_count: i64,
    #[serde(default)]
    pub required_count: Option<i64>,
    #[serde(default = "default_mark")]
    pub mark_per_question: i64,
}

fn default_mark() -> i64 {
    1
}

impl PendingCounts {
    /// Checks the counts against the bounds of `part`.
    ///
    /// Part A ignores `required_count`; B and C need it within
    /// `1..=question_count`; C also needs an even question count.
    pub fn validate(self, part: Part) -> Result<PendingCounts, String> {
        if !(1..=MAX_SECTION_QUESTIONS).contains(&self.question_count) {
            return Err(format!(
                "Number of questions must be between 1 and {}",
                MAX_SECTION_QUESTIONS
            ));
        }
        if !(1..=MAX_MARK_PER_QUESTION).contains(&self.mark_per_question) {
            return Err(format!(
                "Mark per question must be between 1 and {}",
                MAX_MARK_PER_QUESTION
            ));
        }

        match part {
            Part::A => Ok(PendingCounts {
                required_count: None,
                ..self
            }),
            Part::B | Part::C => {
                let required = self
                    .required_count
                    .ok_or_else(|| "Required questions must be given".to_string())?;
                if required < 1 {
                    return Err("Required questions must be at least 1".to_string());
                }
                if required > self.question_count {
                    return Err(
                        "Required questions cannot be greater than total questions".to_string(),
                    );
                }
                if part == Part::C && self.question_count % 2 != 0 {
                    return Err(
                        "For OR type, Number of Questions must be EVEN (2, 4, 6 ...)".to_string(),
                    );
                }
                Ok(self)
            }
        }
    }

    /// Marks this section contributes to the paper.
    pub fn total(self) -> i64 {
        let counted = self.required_count.unwrap_or(self.question_count);
        counted * self.mark_per_question
    }
}

/// Step-1 submission: instructions plus one input per declared slot.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct QuestionsSubmission {
    #[serde(default)]
    pub info: String,
    pub questions: Vec<QuestionInput>,
}

/// Full section payload for the edit endpoint.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SectionSubmission {
    pub counts: PendingCounts,
    #[serde(flatten)]
    pub body: QuestionsSubmission,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn counts(q: i64, r: Option<i64>, m: i64) -> PendingCounts {
        PendingCounts {
            question_count: q,
            required_count: r,
            mark_per_question: m,
        }
    }

    #[test]
    fn part_a_total_uses_every_question() {
        let c = counts(10, Some(4), 2).validate(Part::A).unwrap();
        assert_eq!(c.required_count, None);
        assert_eq!(c.total(), 20);
    }

    #[test]
    fn part_b_total_uses_required_count() {
        let c = counts(8, Some(6), 6).validate(Part::B).unwrap();
        assert_eq!(c.total(), 36);
    }

    #[test]
    fn required_cannot_exceed_count() {
        assert!(counts(3, Some(4), 5).validate(Part::B).is_err());
        assert!(counts(3, None, 5).validate(Part::B).is_err());
    }

    #[test]
    fn part_c_needs_even_count() {
        assert!(counts(5, Some(2), 7).validate(Part::C).is_err());
        assert!(counts(6, Some(3), 7).validate(Part::C).is_ok());
    }

    #[test]
    fn counts_are_bounded() {
        assert!(counts(0, None, 1).validate(Part::A).is_err());
        assert!(counts(51, None, 1).validate(Part::A).is_err());
        assert!(counts(3, None, 0).validate(Part::A).is_err());
    }
}
