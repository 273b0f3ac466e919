// src/render/question_paper.rs

use std::path::Path;

use crate::{
    error::AppError,
    models::{
        paper::PaperAggregate,
        question::Question,
        section::{Part, SectionWithQuestions},
    },
    render::{
        imaging::{Figure, IMAGE_PLACEHOLDER, load_media},
        letter_label, number_questions,
        pdf::{Align, Canvas, Font},
    },
    utils::html::to_plain_text,
};

const BODY: i64 = 11;
const HANG: i64 = 26;

/// "(10 x 1 = 10 Marks)". B and C count only the questions to answer.
fn marks_line(section: &SectionWithQuestions) -> String {
    let s = &section.section;
    let counted = match s.part {
        Part::A => s.question_count,
        Part::B | Part::C => s.required_count.unwrap_or(s.question_count),
    };
    format!("({} x {} = {} Marks)", counted, s.mark_per_question, s.total)
}

/// Question text with its image between the part above and the part below.
fn question_block(canvas: &mut Canvas, indent: i64, label: &str, q: &Question, media_root: &Path) {
    let (above, below) = q.text_parts();
    let above = to_plain_text(above);
    let below = to_plain_text(below);

    canvas.labelled(indent, label, HANG, above.trim(), BODY);

    match load_media(media_root, q.image_path.as_deref(), q.image_size.print_area()) {
        Some(Figure::Image(image)) => canvas.image(indent + HANG, image),
        Some(Figure::Unreadable) => {
            canvas.paragraph(indent + HANG, IMAGE_PLACEHOLDER, Font::Regular, BODY - 1, Align::Left)
        }
        None => {}
    }

    if !below.trim().is_empty() {
        canvas.paragraph(indent + HANG, below.trim(), Font::Regular, BODY, Align::Left);
    }
}

fn render_section(canvas: &mut Canvas, section: &SectionWithQuestions, media_root: &Path) {
    let part = section.section.part;

    canvas.space(8);
    canvas.paragraph(0, part.title(), Font::Bold, 12, Align::Center);
    canvas.paragraph(0, &to_plain_text(&section.section.info), Font::Regular, BODY - 1, Align::Left);
    canvas.paragraph(0, &marks_line(section), Font::Bold, BODY - 1, Align::Right);
    canvas.space(4);

    let numbered = number_questions(&section.questions);
    for (i, entry) in numbered.iter().enumerate() {
        canvas.ensure(40);
        question_block(canvas, 0, &format!("{}.", entry.number), entry.question, media_root);
        for sub in &entry.subs {
            question_block(canvas, HANG, &letter_label(sub), sub, media_root);
        }
        canvas.space(4);

        // The first alternative of an OR pair is followed by the separator.
        let group = entry.question.or_group;
        let next_group = numbered.get(i + 1).and_then(|n| n.question.or_group);
        let starts_pair = numbered[..i]
            .iter()
            .filter(|prev| prev.question.or_group == group)
            .count()
            == 0;
        if part.is_or_grouped() && group.is_some() && group == next_group && starts_pair {
            canvas.paragraph(0, "OR", Font::Bold, BODY, Align::Center);
            canvas.space(2);
        }
    }
}

/// The printable question paper.
pub fn render(aggregate: &PaperAggregate, media_root: &Path) -> Result<Vec<u8>, AppError> {
    let paper = &aggregate.paper;
    let mut canvas = Canvas::new();

    canvas.split_line("", "QID : __________", Font::Regular, 10);
    canvas.paragraph(0, &paper.exam_name.to_uppercase(), Font::Bold, 14, Align::Center);
    canvas.paragraph(
        0,
        &format!("COURSE CODE : {}", paper.course_code()),
        Font::Bold,
        BODY,
        Align::Center,
    );
    canvas.paragraph(
        0,
        &format!("COURSE NAME : {}", paper.subject_name.to_uppercase()),
        Font::Bold,
        BODY,
        Align::Center,
    );
    canvas.split_line(
        &format!("Time : {} Hours", paper.duration_hours),
        &format!("Maximum Marks : {}", paper.exam_marks),
        Font::Bold,
        BODY,
    );
    canvas.rule();

    for section in &aggregate.sections {
        render_section(&mut canvas, section, media_root);
    }

    canvas.finish()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::question::CognitiveLevel;
    use crate::services::blueprint::tests::{paper, question, section};

    #[test]
    fn marks_line_uses_required_count_outside_part_a() {
        let a = section(Part::A, 1, vec![question(1, 1, CognitiveLevel::Remembering)]);
        assert_eq!(marks_line(&a), "(1 x 1 = 1 Marks)");

        let mut b = section(Part::B, 6, vec![question(2, 1, CognitiveLevel::Remembering)]);
        b.section.question_count = 8;
        b.section.required_count = Some(6);
        b.section.total = 36;
        assert_eq!(marks_line(&b), "(6 x 6 = 36 Marks)");
    }

    #[test]
    fn missing_image_still_renders() {
        let mut q = question(1, 1, CognitiveLevel::Application);
        q.image_path = Some("question_images/missing.png".into());
        let mut c1 = question(2, 1, CognitiveLevel::Application);
        c1.or_group = Some(1);
        let mut c2 = question(3, 1, CognitiveLevel::Application);
        c2.or_group = Some(1);

        let aggregate = PaperAggregate {
            paper: paper(15, [None; 4]),
            sections: vec![section(Part::A, 1, vec![q]), section(Part::C, 14, vec![c1, c2])],
        };

        let dir = tempfile::tempdir().unwrap();
        let bytes = render(&aggregate, dir.path()).unwrap();
        assert!(bytes.starts_with(b"%PDF"));
    }
}
