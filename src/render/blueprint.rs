// src/render/blueprint.rs

use crate::{
    error::AppError,
    models::paper::PaperAggregate,
    render::pdf::{Align, Canvas, Cell, Font},
    services::blueprint::{self, PartTallies},
};

const MODULE_WIDTHS: [i64; 11] = [55, 44, 56, 46, 46, 46, 46, 46, 46, 46, 46];
const LEVEL_WIDTHS: [i64; 10] = [100, 55, 46, 46, 46, 46, 46, 46, 46, 46];
const SIZE: i64 = 9;

const NUMERALS: [&str; 4] = ["I", "II", "III", "IV"];

fn tally_cells(t: &PartTallies, bold: bool) -> Vec<Cell> {
    [t.a, t.b, t.c, t.total]
        .iter()
        .flat_map(|cell| [cell.questions, cell.marks])
        .map(|n| {
            let cell = if bold {
                Cell::bold(n.to_string())
            } else {
                Cell::new(n.to_string())
            };
            cell.centered()
        })
        .collect()
}

fn tally_header(first: &[&str]) -> Vec<Cell> {
    first
        .iter()
        .chain(&["A Q", "A M", "B Q", "B M", "C Q", "C M", "Total Q", "Total M"])
        .map(|h| Cell::bold(*h).centered())
        .collect()
}

fn format_share(value: f64) -> String {
    format!("{:.2}", value)
}

/// Module-wise and level-wise coverage tables.
pub fn render(aggregate: &PaperAggregate) -> Result<Vec<u8>, AppError> {
    let paper = &aggregate.paper;
    let report = blueprint::compute(aggregate);
    let mut canvas = Canvas::new();

    canvas.paragraph(0, "BLUEPRINT", Font::Bold, 16, Align::Center);
    canvas.paragraph(0, &paper.exam_name.to_uppercase(), Font::Bold, 11, Align::Center);
    canvas.space(6);
    canvas.split_line(
        &format!("COURSE CODE : {}", paper.course_code()),
        &format!("Maximum Marks : {}", report.maximum_mark),
        Font::Regular,
        10,
    );
    canvas.paragraph(
        0,
        &format!("COURSE NAME : {}", paper.subject_name.to_uppercase()),
        Font::Regular,
        10,
        Align::Left,
    );
    canvas.space(10);

    canvas.paragraph(0, "Module-wise Distribution", Font::Bold, 11, Align::Left);
    canvas.space(4);
    let mut rows = vec![tally_header(&["Module", "Hours", "Marks (hrs)"])];
    for row in &report.module_rows {
        let numeral = NUMERALS
            .get((row.module - 1) as usize)
            .copied()
            .unwrap_or("?");
        let mut cells = vec![
            Cell::new(numeral).centered(),
            Cell::new(row.hours.to_string()).centered(),
            Cell::new(format_share(row.mark_share)).centered(),
        ];
        cells.extend(tally_cells(&row.tallies, false));
        rows.push(cells);
    }
    let totals = &report.module_totals;
    let mut cells = vec![
        Cell::bold("Total").centered(),
        Cell::bold(totals.hours.to_string()).centered(),
        Cell::bold(format_share(totals.mark_share)).centered(),
    ];
    cells.extend(tally_cells(&totals.tallies, true));
    rows.push(cells);
    canvas.table(&MODULE_WIDTHS, rows, SIZE);

    canvas.space(16);
    canvas.paragraph(0, "Cognitive Level-wise Distribution", Font::Bold, 11, Align::Left);
    canvas.space(4);
    let mut rows = vec![tally_header(&["Level", "Target %"])];
    for row in &report.level_rows {
        let mut cells = vec![
            Cell::new(format!("{} ({})", row.name, row.code)),
            Cell::new(row.percent.map(format_share).unwrap_or_else(|| "-".to_string())).centered(),
        ];
        cells.extend(tally_cells(&row.tallies, false));
        rows.push(cells);
    }
    let totals = &report.level_totals;
    let mut cells = vec![
        Cell::bold("Total"),
        Cell::bold(format_share(totals.percent)).centered(),
    ];
    cells.extend(tally_cells(&totals.tallies, true));
    rows.push(cells);
    canvas.table(&LEVEL_WIDTHS, rows, SIZE);

    canvas.finish()
}
