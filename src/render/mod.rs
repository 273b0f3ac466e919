// src/render/mod.rs

//! PDF documents generated from a stored paper.

pub mod answer_sheet;
pub mod blueprint;
pub mod imaging;
pub mod pdf;
pub mod question_paper;

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::{
    error::AppError,
    models::{paper::PaperAggregate, question::Question},
};

/// The three downloadable documents of a paper.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DocumentKind {
    QuestionPaper,
    AnswerSheet,
    Blueprint,
}

impl DocumentKind {
    pub const ALL: [DocumentKind; 3] = [
        DocumentKind::QuestionPaper,
        DocumentKind::AnswerSheet,
        DocumentKind::Blueprint,
    ];

    /// Path segment under `/papers/{id}/pdf/`.
    pub fn slug(self) -> &'static str {
        match self {
            DocumentKind::QuestionPaper => "question-paper",
            DocumentKind::AnswerSheet => "answer-sheet",
            DocumentKind::Blueprint => "blueprint",
        }
    }

    pub fn title(self) -> &'static str {
        match self {
            DocumentKind::QuestionPaper => "Question Paper",
            DocumentKind::AnswerSheet => "Answer Sheet",
            DocumentKind::Blueprint => "Blueprint",
        }
    }

    pub fn filename(self, paper_id: i64) -> String {
        format!("{}_{}.pdf", self.slug().replace('-', "_"), paper_id)
    }

    /// Renders the document. CPU bound; call from a blocking thread.
    pub fn render(self, aggregate: &PaperAggregate, media_root: &Path) -> Result<Vec<u8>, AppError> {
        match self {
            DocumentKind::QuestionPaper => question_paper::render(aggregate, media_root),
            DocumentKind::AnswerSheet => answer_sheet::render(aggregate, media_root),
            DocumentKind::Blueprint => blueprint::render(aggregate),
        }
    }
}

/// A top-level question with its sub-questions, numbered from 1.
#[derive(Debug)]
pub struct Numbered<'a> {
    pub number: usize,
    pub question: &'a Question,
    pub subs: Vec<&'a Question>,
}

/// Groups a section's questions for printing.
///
/// Top-level questions keep their stored order; sub-questions are listed
/// under their parent by letter.
pub fn number_questions(questions: &[Question]) -> Vec<Numbered<'_>> {
    let mut numbered: Vec<Numbered<'_>> = questions
        .iter()
        .filter(|q| !q.is_sub_question())
        .enumerate()
        .map(|(i, question)| Numbered {
            number: i + 1,
            question,
            subs: Vec::new(),
        })
        .collect();

    for q in questions.iter().filter(|q| q.is_sub_question()) {
        if let Some(entry) = numbered
            .iter_mut()
            .find(|entry| Some(entry.question.id) == q.parent_id)
        {
            entry.subs.push(q);
        }
    }

    for entry in &mut numbered {
        entry
            .subs
            .sort_by(|a, b| a.sub_question_letter.cmp(&b.sub_question_letter).then(a.position.cmp(&b.position)));
    }
    numbered
}

/// Label of a sub-question, "(a)".
pub fn letter_label(q: &Question) -> String {
    format!("({})", q.sub_question_letter.as_deref().unwrap_or("-"))
}
