// src/render/answer_sheet.rs

//! Scoring indicators: one table row per answer.

use std::path::Path;

use crate::{
    error::AppError,
    models::{
        paper::PaperAggregate,
        question::Question,
        section::{Part, SectionWithQuestions},
    },
    render::{
        Numbered,
        imaging::{ANSWER_AREA, Figure, IMAGE_PLACEHOLDER, load_media},
        letter_label, number_questions,
        pdf::{Align, Canvas, Cell, Font},
    },
    utils::html::to_plain_text,
};

const WIDTHS: [i64; 5] = [40, 303, 60, 60, 60];
const SIZE: i64 = 10;

/// Answer text, equation and diagram of one question as a table cell.
fn answer_cell(prefix: &str, q: &Question, media_root: &Path) -> Cell {
    let mut lines = Vec::new();

    let answer = to_plain_text(&q.answer_text);
    let answer = answer.trim();
    match (prefix.is_empty(), answer.is_empty()) {
        (true, _) => lines.push(answer.to_string()),
        (false, true) => lines.push(prefix.to_string()),
        (false, false) => lines.push(format!("{} {}", prefix, answer)),
    }

    if let Some(equation) = q.answer_equation.as_deref() {
        let equation = to_plain_text(equation);
        if !equation.trim().is_empty() {
            lines.push(equation.trim().to_string());
        }
    }

    let image = match load_media(media_root, q.answer_image_path.as_deref(), ANSWER_AREA) {
        Some(Figure::Image(image)) => {
            lines.push("Diagram:".to_string());
            Some(image)
        }
        Some(Figure::Unreadable) => {
            lines.push(IMAGE_PLACEHOLDER.to_string());
            None
        }
        None => None,
    };

    Cell::new(lines.join("\n")).with_image(image)
}

fn part_row(title: &str, total: i64) -> Vec<Cell> {
    vec![
        Cell::new(""),
        Cell::bold(title).centered(),
        Cell::new(""),
        Cell::new(""),
        Cell::bold(total.to_string()).centered(),
    ]
}

fn mark_row(label: String, answer: Cell, split: String, total: Option<i64>) -> Vec<Cell> {
    vec![
        Cell::new(label).centered(),
        answer,
        Cell::new(split.clone()).centered(),
        Cell::new(split).centered(),
        Cell::new(total.map(|t| t.to_string()).unwrap_or_default()).centered(),
    ]
}

fn blank_row(middle: Cell) -> Vec<Cell> {
    vec![Cell::new(""), middle, Cell::new(""), Cell::new(""), Cell::new("")]
}

/// Parts A and B: one row per top-level question, one per sub-question.
fn flat_rows(
    rows: &mut Vec<Vec<Cell>>,
    section: &SectionWithQuestions,
    mark: i64,
    total: i64,
    media_root: &Path,
) {
    let numeral = section.section.part.numeral();
    let numbered = number_questions(&section.questions);

    for (i, entry) in numbered.iter().enumerate() {
        let label = format!("{}.{}", numeral, entry.number);
        let show_total = (i == 0).then_some(total);
        rows.push(mark_row(
            label.clone(),
            answer_cell("", entry.question, media_root),
            mark.to_string(),
            show_total,
        ));

        for sub in &entry.subs {
            rows.push(mark_row(
                format!("{}{}", label, letter_label(sub)),
                answer_cell("", sub, media_root),
                mark.to_string(),
                None,
            ));
        }
    }
}

fn alternative_rows(rows: &mut Vec<Vec<Cell>>, entry: &Numbered<'_>, prefix: &str, media_root: &Path) -> Cell {
    let cell = answer_cell(prefix, entry.question, media_root);
    for sub in &entry.subs {
        rows.push(blank_row(answer_cell(&letter_label(sub), sub, media_root)));
    }
    cell
}

/// Part C: a row per OR pair, the alternatives shown as (i) / OR / (ii).
fn paired_rows(rows: &mut Vec<Vec<Cell>>, section: &SectionWithQuestions, media_root: &Path) {
    let numeral = section.section.part.numeral();
    let mark = section.section.mark_per_question;
    let numbered = number_questions(&section.questions);

    let mut groups: Vec<Vec<&Numbered<'_>>> = Vec::new();
    for entry in &numbered {
        match groups.last_mut() {
            Some(last)
                if entry.question.or_group.is_some()
                    && last[0].question.or_group == entry.question.or_group =>
            {
                last.push(entry)
            }
            _ => groups.push(vec![entry]),
        }
    }

    for (index, group) in groups.iter().enumerate() {
        let show_total = (index == 0).then_some(section.section.total);

        let mut sub_rows = Vec::new();
        let first = alternative_rows(&mut sub_rows, group[0], "(i)", media_root);
        rows.push(mark_row(
            format!("{}.{}", numeral, index + 1),
            first,
            mark.to_string(),
            show_total,
        ));
        rows.append(&mut sub_rows);

        for second in group.iter().skip(1) {
            rows.push(blank_row(Cell::bold("OR").centered()));
            let cell = alternative_rows(&mut sub_rows, second, "(ii)", media_root);
            rows.push(blank_row(cell));
            rows.append(&mut sub_rows);
        }
    }
}

/// The answer / scoring sheet.
pub fn render(aggregate: &PaperAggregate, media_root: &Path) -> Result<Vec<u8>, AppError> {
    let paper = &aggregate.paper;
    let mut canvas = Canvas::new();

    canvas.paragraph(0, "SCORING INDICATORS", Font::Bold, 16, Align::Center);
    canvas.space(8);
    canvas.paragraph(
        0,
        &format!("COURSE NAME : {}", paper.subject_name.to_uppercase()),
        Font::Regular,
        11,
        Align::Left,
    );
    canvas.split_line(
        &format!("COURSE CODE : {}", paper.course_code()),
        "QID : __________",
        Font::Regular,
        11,
    );
    canvas.space(10);

    let mut rows = vec![vec![
        Cell::bold("Q No").centered(),
        Cell::bold("Scoring Indicators").centered(),
        Cell::bold("Split").centered(),
        Cell::bold("Sub Total").centered(),
        Cell::bold("Total").centered(),
    ]];

    for section in &aggregate.sections {
        match section.section.part {
            Part::A => {
                // Every Part A answer counts one mark.
                let total = section.questions.len() as i64;
                rows.push(part_row(section.section.part.title(), total));
                flat_rows(&mut rows, section, 1, total, media_root);
            }
            Part::B => {
                rows.push(part_row(section.section.part.title(), section.section.total));
                flat_rows(
                    &mut rows,
                    section,
                    section.section.mark_per_question,
                    section.section.total,
                    media_root,
                );
            }
            Part::C => {
                rows.push(part_row(section.section.part.title(), section.section.total));
                paired_rows(&mut rows, section, media_root);
            }
        }
    }

    canvas.table(&WIDTHS, rows, SIZE);
    canvas.finish()
}
