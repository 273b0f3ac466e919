// src/services/blueprint.rs

//! Coverage report: questions and marks per module and per cognitive level,
//! split by section.

use serde::Serialize;

use crate::{
    config::MODULE_COUNT,
    models::{
        paper::PaperAggregate,
        question::{CognitiveLevel, Question},
        section::Part,
    },
};

/// Question count and marks of one cell.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Tally {
    pub questions: i64,
    pub marks: i64,
}

impl Tally {
    fn add(&mut self, other: Tally) {
        self.questions += other.questions;
        self.marks += other.marks;
    }
}

/// One row of either table: a cell per section plus the row total.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PartTallies {
    pub a: Tally,
    pub b: Tally,
    pub c: Tally,
    pub total: Tally,
}

impl PartTallies {
    fn set(&mut self, part: Part, tally: Tally) {
        match part {
            Part::A => self.a = tally,
            Part::B => self.b = tally,
            Part::C => self.c = tally,
        }
        self.total.add(tally);
    }

    fn add(&mut self, other: &PartTallies) {
        self.a.add(other.a);
        self.b.add(other.b);
        self.c.add(other.c);
        self.total.add(other.total);
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ModuleRow {
    pub module: i64,
    pub hours: i64,
    /// Marks the module deserves by teaching hours.
    pub mark_share: f64,
    #[serde(flatten)]
    pub tallies: PartTallies,
}

#[derive(Debug, Clone, Serialize)]
pub struct LevelRow {
    pub code: &'static str,
    pub name: &'static str,
    /// Target percentage from the paper heading.
    pub percent: Option<f64>,
    #[serde(flatten)]
    pub tallies: PartTallies,
}

#[derive(Debug, Clone, Serialize)]
pub struct ModuleTotals {
    pub hours: i64,
    pub mark_share: f64,
    #[serde(flatten)]
    pub tallies: PartTallies,
}

#[derive(Debug, Clone, Serialize)]
pub struct LevelTotals {
    /// Sum of the three target percentages.
    pub percent: f64,
    #[serde(flatten)]
    pub tallies: PartTallies,
}

#[derive(Debug, Clone, Serialize)]
pub struct Blueprint {
    pub paper_id: i64,
    pub maximum_mark: i64,
    pub module_rows: Vec<ModuleRow>,
    pub module_totals: ModuleTotals,
    pub level_rows: Vec<LevelRow>,
    pub level_totals: LevelTotals,
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Marks one question of `part` is worth in the report.
///
/// Part A always weighs 1; B and C use the section's mark per question.
/// A missing section weighs 0.
fn weight(aggregate: &PaperAggregate, part: Part) -> i64 {
    match (part, aggregate.section(part)) {
        (_, None) => 0,
        (Part::A, Some(_)) => 1,
        (_, Some(s)) => s.section.mark_per_question,
    }
}

fn tally_by<F>(aggregate: &PaperAggregate, keep: F) -> PartTallies
where
    F: Fn(&Question) -> bool,
{
    let mut row = PartTallies::default();
    for part in Part::ALL {
        let questions = aggregate
            .section(part)
            .map(|s| s.questions.iter().filter(|&q| keep(q)).count() as i64)
            .unwrap_or(0);
        row.set(
            part,
            Tally {
                questions,
                marks: questions * weight(aggregate, part),
            },
        );
    }
    row
}

/// Builds both coverage tables for a paper. Reads only.
pub fn compute(aggregate: &PaperAggregate) -> Blueprint {
    let paper = &aggregate.paper;
    let hours = paper.module_hours();
    let total_hours: i64 = hours.iter().sum();
    let maximum_mark = paper.maximum_mark;

    let mut module_rows = Vec::with_capacity(MODULE_COUNT as usize);
    let mut module_tallies = PartTallies::default();
    let mut share_total = 0.0;

    for (index, &module_hours) in hours.iter().enumerate() {
        let module = index as i64 + 1;
        let tallies = tally_by(aggregate, |q| q.module == module);

        let mark_share = if total_hours > 0 && maximum_mark > 0 && module_hours > 0 {
            round2(module_hours as f64 / total_hours as f64 * maximum_mark as f64)
        } else {
            0.0
        };

        module_tallies.add(&tallies);
        share_total += mark_share;
        module_rows.push(ModuleRow {
            module,
            hours: module_hours,
            mark_share,
            tallies,
        });
    }

    let targets = [paper.percent_r, paper.percent_u, paper.percent_a];
    let mut level_rows = Vec::with_capacity(CognitiveLevel::ALL.len());
    let mut level_tallies = PartTallies::default();

    for (level, percent) in CognitiveLevel::ALL.into_iter().zip(targets) {
        let tallies = tally_by(aggregate, |q| q.level == level);
        level_tallies.add(&tallies);
        level_rows.push(LevelRow {
            code: level.code(),
            name: level.name(),
            percent,
            tallies,
        });
    }

    Blueprint {
        paper_id: paper.id,
        maximum_mark,
        module_rows,
        module_totals: ModuleTotals {
            hours: total_hours,
            mark_share: round2(share_total),
            tallies: module_tallies,
        },
        level_rows,
        level_totals: LevelTotals {
            percent: round2(targets.iter().map(|p| p.unwrap_or(0.0)).sum()),
            tallies: level_tallies,
        },
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::models::{
        paper::QuestionPaper,
        question::{ImagePosition, ImageSize},
        section::{Section, SectionWithQuestions},
    };

    pub(crate) fn paper(maximum_mark: i64, hours: [Option<i64>; 4]) -> QuestionPaper {
        QuestionPaper {
            id: 1,
            code: 101,
            revision: "2021".into(),
            subject_code: "CS101".into(),
            subject_name: "Programming".into(),
            exam_name: "Semester Exam".into(),
            duration_hours: 3,
            exam_marks: 75,
            maximum_mark,
            module1_hours: hours[0],
            module2_hours: hours[1],
            module3_hours: hours[2],
            module4_hours: hours[3],
            percent_r: Some(30.0),
            percent_u: Some(40.0),
            percent_a: Some(30.0),
            created_at: None,
        }
    }

    pub(crate) fn question(id: i64, module: i64, level: CognitiveLevel) -> Question {
        Question {
            id,
            section_id: 1,
            position: id,
            module,
            outcome: format!("M{}.01", module),
            level,
            question: format!("Question {}", id),
            text_below_image: None,
            image_path: None,
            image_position: ImagePosition::Top,
            image_size: ImageSize::Medium,
            parent_id: None,
            sub_question_letter: None,
            answer_text: format!("Answer {}", id),
            answer_equation: None,
            answer_image_path: None,
            or_group: None,
        }
    }

    pub(crate) fn section(part: Part, mark: i64, questions: Vec<Question>) -> SectionWithQuestions {
        let count = questions.len() as i64;
        let required = (part != Part::A).then_some(count);
        SectionWithQuestions {
            section: Section {
                id: part as i64 + 1,
                paper_id: 1,
                part,
                info: "Answer all questions".into(),
                question_count: count,
                required_count: required,
                mark_per_question: mark,
                total: required.unwrap_or(count) * mark,
                or_grouped: part.is_or_grouped(),
            },
            questions,
        }
    }

    #[test]
    fn equal_hours_share_marks_equally() {
        let aggregate = PaperAggregate {
            paper: paper(100, [Some(3); 4]),
            sections: vec![],
        };
        let bp = compute(&aggregate);
        for row in &bp.module_rows {
            assert_eq!(row.mark_share, 25.0);
        }
        assert_eq!(bp.module_totals.mark_share, 100.0);
        assert_eq!(bp.module_totals.hours, 12);
    }

    #[test]
    fn share_is_zero_without_hours() {
        let aggregate = PaperAggregate {
            paper: paper(100, [Some(4), None, Some(0), Some(2)]),
            sections: vec![],
        };
        let shares: Vec<f64> = compute(&aggregate)
            .module_rows
            .iter()
            .map(|r| r.mark_share)
            .collect();
        assert_eq!(shares, vec![66.67, 0.0, 0.0, 33.33]);

        let empty = PaperAggregate {
            paper: paper(0, [Some(3); 4]),
            sections: vec![],
        };
        assert!(compute(&empty).module_rows.iter().all(|r| r.mark_share == 0.0));
    }

    #[test]
    fn part_a_questions_weigh_one_mark() {
        use CognitiveLevel::*;
        let a = section(
            Part::A,
            2,
            vec![
                question(1, 1, Remembering),
                question(2, 2, Remembering),
                question(3, 1, Understanding),
                question(4, 3, Understanding),
                question(5, 4, Understanding),
                question(6, 2, Application),
            ],
        );
        let aggregate = PaperAggregate {
            paper: paper(12, [None; 4]),
            sections: vec![a],
        };

        let bp = compute(&aggregate);
        let r = &bp.level_rows[0];
        assert_eq!(r.code, "R");
        assert_eq!(r.tallies.a, Tally { questions: 2, marks: 2 });
        assert_eq!(r.tallies.total.marks, 2);
        assert_eq!(bp.level_rows[1].tallies.total.marks, 3);
        assert_eq!(bp.level_totals.tallies.total.questions, 6);
        assert_eq!(bp.level_totals.percent, 100.0);
    }

    #[test]
    fn sections_b_and_c_use_their_mark() {
        use CognitiveLevel::*;
        let aggregate = PaperAggregate {
            paper: paper(30, [Some(1); 4]),
            sections: vec![
                section(Part::B, 6, vec![question(1, 1, Application), question(2, 1, Remembering)]),
                section(Part::C, 9, vec![question(3, 1, Application), question(4, 1, Application)]),
            ],
        };

        let module1 = &compute(&aggregate).module_rows[0].tallies;
        assert_eq!(module1.a, Tally::default());
        assert_eq!(module1.b, Tally { questions: 2, marks: 12 });
        assert_eq!(module1.c, Tally { questions: 2, marks: 18 });
        assert_eq!(module1.total, Tally { questions: 4, marks: 30 });
    }
}
