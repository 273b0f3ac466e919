// src/services/batch.rs

//! Validation of one section's question batch.
//!
//! `SectionBatch::declare` fixes the number of slots from the pending
//! counts; `validate` checks every slot, resolves parent references and
//! produces the records the section store writes. Nothing is persisted
//! unless the whole batch passes.

use std::collections::HashMap;
use std::sync::LazyLock;

use regex::Regex;

use crate::{
    config::MODULE_COUNT,
    models::{
        lookup::QuestionChoices,
        question::{CognitiveLevel, ImagePosition, ImageSize, ParentRef, Question, QuestionInput},
        section::{Part, PendingCounts},
    },
    services::reconcile,
    utils::html::clean_html,
};

static LETTER: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^[a-z]{1,5}$").unwrap());

const MAX_QUESTION_TEXT: usize = 5000;
const MAX_ANSWER_TEXT: usize = 5000;

/// Resolved parent of a validated question.
#[derive(Debug, Clone, PartialEq)]
pub enum ParentLink {
    /// Top-level slot of this batch.
    Slot(usize),
    /// Stored question of another section (or of this section's previous
    /// version); the store finds or recreates an equivalent parent.
    Existing(Box<Question>),
}

/// A question ready to be written.
#[derive(Debug, Clone, PartialEq)]
pub struct NewQuestion {
    pub position: i64,
    pub module: i64,
    pub outcome: String,
    pub level: CognitiveLevel,
    pub question: String,
    pub text_below_image: Option<String>,
    pub image_path: Option<String>,
    pub image_position: ImagePosition,
    pub image_size: ImageSize,
    pub parent: Option<ParentLink>,
    pub sub_question_letter: Option<String>,
    pub answer_text: String,
    pub answer_equation: Option<String>,
    pub answer_image_path: Option<String>,
    pub or_group: Option<i64>,
}

impl NewQuestion {
    pub fn is_top_level(&self) -> bool {
        self.parent.is_none()
    }
}

/// Declared slots of one section submission.
#[derive(Debug, Clone, Copy)]
pub struct SectionBatch {
    part: Part,
    slots: usize,
}

impl SectionBatch {
    pub fn declare(part: Part, counts: PendingCounts) -> SectionBatch {
        SectionBatch {
            part,
            slots: counts.question_count.max(0) as usize,
        }
    }

    /// Validates `inputs` against the declared slots.
    ///
    /// `existing` holds the stored questions referenced through
    /// `ParentRef::Existing`, already restricted to the current paper;
    /// `choices` the active modules and outcomes.
    pub fn validate(
        self,
        inputs: Vec<QuestionInput>,
        existing: &HashMap<i64, Question>,
        choices: &QuestionChoices,
    ) -> Result<Vec<NewQuestion>, String> {
        if inputs.len() != self.slots {
            return Err(format!(
                "Expected {} questions, got {}",
                self.slots,
                inputs.len()
            ));
        }

        let top_level: Vec<bool> = inputs.iter().map(|q| q.parent.is_none()).collect();

        let mut questions = Vec::with_capacity(inputs.len());
        for (index, input) in inputs.into_iter().enumerate() {
            let number = index + 1;
            let parent = match &input.parent {
                None => None,
                Some(ParentRef::Slot(slot)) => {
                    if *slot >= index {
                        return Err(format!(
                            "Question {}: parent must be an earlier question",
                            number
                        ));
                    }
                    if !top_level[*slot] {
                        return Err(format!(
                            "Question {}: parent cannot itself be a sub-question",
                            number
                        ));
                    }
                    Some(ParentLink::Slot(*slot))
                }
                Some(ParentRef::Existing(id)) => {
                    let stored = existing.get(id).ok_or_else(|| {
                        format!("Question {}: parent question {} not found", number, id)
                    })?;
                    if stored.is_sub_question() {
                        return Err(format!(
                            "Question {}: parent cannot itself be a sub-question",
                            number
                        ));
                    }
                    Some(ParentLink::Existing(Box::new(stored.clone())))
                }
            };

            questions.push(check_slot(number, index, input, parent, choices)?);
        }

        reconcile::match_existing_parents(&mut questions);
        reconcile::assign_letters(&mut questions);

        if self.part.is_or_grouped() {
            reconcile::pair_alternatives(&mut questions)?;
        }

        Ok(questions)
    }
}

fn check_slot(
    number: usize,
    index: usize,
    input: QuestionInput,
    parent: Option<ParentLink>,
    choices: &QuestionChoices,
) -> Result<NewQuestion, String> {
    if !(1..=MODULE_COUNT).contains(&input.module) {
        return Err(format!(
            "Question {}: module must be between 1 and {}",
            number, MODULE_COUNT
        ));
    }
    if !choices.has_module(input.module) {
        return Err(format!(
            "Question {}: module {} is not active",
            number, input.module
        ));
    }

    let outcome = input.outcome.trim();
    if outcome.is_empty() {
        return Err(format!("Question {}: module outcome is required", number));
    }
    if !choices.has_outcome(outcome) {
        return Err(format!(
            "Question {}: module outcome {} is not available",
            number, outcome
        ));
    }

    let question = clean_html(input.question.trim());
    if question.is_empty() {
        return Err(format!("Question {}: question text is required", number));
    }
    if question.len() > MAX_QUESTION_TEXT {
        return Err(format!("Question {}: question text is too long", number));
    }

    let answer_text = clean_html(input.answer_text.trim());
    if answer_text.is_empty() {
        return Err(format!("Question {}: answer is required", number));
    }
    if answer_text.len() > MAX_ANSWER_TEXT {
        return Err(format!("Question {}: answer is too long", number));
    }

    let letter = match input.sub_question_letter.as_deref().map(str::trim) {
        Some(l) if !l.is_empty() => {
            if parent.is_none() {
                return Err(format!(
                    "Question {}: only sub-questions carry a letter",
                    number
                ));
            }
            if !LETTER.is_match(l) {
                return Err(format!(
                    "Question {}: sub-question letter must be lowercase letters (a, b, c ...)",
                    number
                ));
            }
            Some(l.to_string())
        }
        _ => None,
    };

    let image_path = checked_media_path(number, input.image_path)?;
    let answer_image_path = checked_media_path(number, input.answer_image_path)?;

    // Text below the image only means something for middle placement.
    let text_below_image = match input.image_position {
        ImagePosition::Middle => non_empty(input.text_below_image).map(|t| clean_html(&t)),
        _ => None,
    };

    Ok(NewQuestion {
        position: index as i64,
        module: input.module,
        outcome: outcome.to_string(),
        level: input.level,
        question,
        text_below_image,
        image_path,
        image_position: input.image_position,
        image_size: input.image_size,
        parent,
        sub_question_letter: letter,
        answer_text,
        answer_equation: non_empty(input.answer_equation).map(|t| clean_html(&t)),
        answer_image_path,
        or_group: None,
    })
}

/// Media paths are relative to the media root and may not climb out of it.
fn checked_media_path(number: usize, path: Option<String>) -> Result<Option<String>, String> {
    let Some(path) = non_empty(path) else {
        return Ok(None);
    };

    let escapes = path.starts_with('/')
        || path.starts_with('\\')
        || path.contains(':')
        || path.split(['/', '\\']).any(|seg| seg == "..");
    if escapes {
        return Err(format!("Question {}: invalid image path", number));
    }
    Ok(Some(path))
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::models::lookup::{ModuleOutcome, QuestionModule};

    pub(crate) fn input(module: i64, text: &str) -> QuestionInput {
        QuestionInput {
            module,
            outcome: "M1.01".into(),
            level: CognitiveLevel::Remembering,
            question: text.into(),
            text_below_image: None,
            image_path: None,
            image_position: ImagePosition::Top,
            image_size: ImageSize::Medium,
            parent: None,
            sub_question_letter: None,
            answer_text: "answer".into(),
            answer_equation: None,
            answer_image_path: None,
        }
    }

    /// Modules 1 to 4 and one outcome per module, all active.
    pub(crate) fn choices() -> QuestionChoices {
        QuestionChoices {
            modules: (1..=4)
                .map(|n| QuestionModule {
                    id: n,
                    module_number: n,
                    is_active: true,
                })
                .collect(),
            outcomes: (1..=4)
                .map(|n| ModuleOutcome {
                    id: n,
                    outcome_code: format!("M{}.01", n),
                    description: None,
                    is_active: true,
                })
                .collect(),
        }
    }

    fn counts(n: i64) -> PendingCounts {
        PendingCounts {
            question_count: n,
            required_count: Some(1),
            mark_per_question: 2,
        }
    }

    #[test]
    fn slot_count_must_match_declaration() {
        let batch = SectionBatch::declare(Part::A, counts(3));
        let err = batch
            .validate(vec![input(1, "q1"), input(1, "q2")], &HashMap::new(), &choices())
            .unwrap_err();
        assert!(err.contains("Expected 3"));
    }

    #[test]
    fn missing_answer_rejects_whole_batch() {
        let mut bad = input(2, "q2");
        bad.answer_text = "  ".into();
        let err = SectionBatch::declare(Part::B, counts(2))
            .validate(vec![input(1, "q1"), bad], &HashMap::new(), &choices())
            .unwrap_err();
        assert!(err.starts_with("Question 2"));
    }

    #[test]
    fn module_outside_blueprint_is_rejected() {
        let err = SectionBatch::declare(Part::A, counts(1))
            .validate(vec![input(5, "q")], &HashMap::new(), &choices())
            .unwrap_err();
        assert!(err.contains("module"));
    }

    #[test]
    fn slot_parent_must_point_backwards_to_top_level() {
        let mut child = input(1, "child");
        child.parent = Some(ParentRef::Slot(1));
        let err = SectionBatch::declare(Part::A, counts(2))
            .validate(vec![child, input(1, "parent")], &HashMap::new(), &choices())
            .unwrap_err();
        assert!(err.contains("earlier"));

        let mut first = input(1, "first sub");
        first.parent = Some(ParentRef::Slot(0));
        let mut nested = input(1, "nested");
        nested.parent = Some(ParentRef::Slot(1));
        let err = SectionBatch::declare(Part::A, counts(3))
            .validate(vec![input(1, "root"), first, nested], &HashMap::new(), &choices())
            .unwrap_err();
        assert!(err.contains("sub-question"));
    }

    #[test]
    fn image_paths_cannot_escape_media_root() {
        let mut q = input(1, "q");
        q.image_path = Some("../secrets.png".into());
        assert!(SectionBatch::declare(Part::A, counts(1))
            .validate(vec![q], &HashMap::new(), &choices())
            .is_err());

        let mut ok = input(1, "q");
        ok.image_path = Some("question_images/a.png".into());
        let out = SectionBatch::declare(Part::A, counts(1))
            .validate(vec![ok], &HashMap::new(), &choices())
            .unwrap();
        assert_eq!(out[0].image_path.as_deref(), Some("question_images/a.png"));
    }

    #[test]
    fn text_below_image_only_kept_for_middle() {
        let mut top = input(1, "above");
        top.text_below_image = Some("ignored".into());
        let mut middle = input(1, "above");
        middle.image_position = ImagePosition::Middle;
        middle.text_below_image = Some("below".into());

        let out = SectionBatch::declare(Part::A, counts(2))
            .validate(vec![top, middle], &HashMap::new(), &choices())
            .unwrap();
        assert_eq!(out[0].text_below_image, None);
        assert_eq!(out[1].text_below_image.as_deref(), Some("below"));
    }

    #[test]
    fn module_and_outcome_must_be_active_choices() {
        let mut only_two = choices();
        only_two.modules.retain(|m| m.module_number != 3);

        let err = SectionBatch::declare(Part::A, counts(1))
            .validate(vec![input(3, "q")], &HashMap::new(), &only_two)
            .unwrap_err();
        assert!(err.contains("module 3"));

        let mut q = input(1, "q");
        q.outcome = "M9.99".into();
        let err = SectionBatch::declare(Part::A, counts(1))
            .validate(vec![q], &HashMap::new(), &choices())
            .unwrap_err();
        assert!(err.contains("M9.99"));
    }

    #[test]
    fn overlong_answer_is_rejected() {
        let mut q = input(1, "q");
        q.answer_text = "word ".repeat(2000);
        let err = SectionBatch::declare(Part::B, counts(1))
            .validate(vec![q], &HashMap::new(), &choices())
            .unwrap_err();
        assert!(err.contains("answer is too long"));
    }
}
