// src/render/pdf.rs

//! Minimal page canvas over `lopdf`.
//!
//! Content flows top to bottom on A4 pages with the two built-in Helvetica
//! faces. Text is wrapped with the standard Helvetica metrics, tables draw
//! a grid of wrapped cells, and monochrome images are embedded as gray
//! image XObjects. All coordinates are whole points.

use std::collections::VecDeque;

use lopdf::{
    Dictionary, Document, Object, ObjectId, Stream,
    content::{Content, Operation},
    dictionary,
};

use crate::{error::AppError, render::imaging::PrintImage};

pub const PAGE_WIDTH: i64 = 595;
pub const PAGE_HEIGHT: i64 = 842;
pub const MARGIN: i64 = 36;

const CELL_PADDING: i64 = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Font {
    Regular,
    Bold,
}

impl Font {
    fn resource(self) -> &'static [u8] {
        match self {
            Font::Regular => b"F1",
            Font::Bold => b"F2",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Align {
    Left,
    Center,
    Right,
}

/// Helvetica advance widths for ' ' through '~', in 1/1000 em.
const HELVETICA_WIDTHS: [i64; 95] = [
    278, 278, 355, 556, 556, 889, 667, 191, 333, 333, 389, 584, 278, 333, 278, 278, // ' '..'/'
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556, // '0'..'9'
    278, 278, 584, 584, 584, 556, 1015, // ':'..'@'
    667, 667, 722, 722, 667, 611, 778, 722, 278, 500, 667, 556, 833, // 'A'..'M'
    722, 778, 667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611, // 'N'..'Z'
    278, 278, 278, 469, 556, 333, // '['..'`'
    556, 556, 500, 556, 556, 278, 556, 556, 222, 222, 500, 222, 833, // 'a'..'m'
    556, 556, 556, 556, 333, 500, 278, 556, 500, 722, 500, 500, 500, // 'n'..'z'
    334, 260, 334, 584, // '{'..'~'
];

fn char_width(c: char, font: Font) -> i64 {
    let base = match c as u32 {
        code @ 32..=126 => HELVETICA_WIDTHS[(code - 32) as usize],
        _ => 556,
    };
    match font {
        Font::Regular => base,
        // Helvetica-Bold runs about 6% wider.
        Font::Bold => base * 106 / 100,
    }
}

/// Width of `text` in points at `size`.
pub fn text_width(text: &str, font: Font, size: i64) -> i64 {
    let units: i64 = text.chars().map(|c| char_width(c, font)).sum();
    (units * size + 999) / 1000
}

/// Breaks `text` into lines no wider than `width`.
///
/// Explicit newlines always break. Words wider than a line are split.
pub fn wrap(text: &str, width: i64, font: Font, size: i64) -> Vec<String> {
    let mut lines = Vec::new();
    if text.trim().is_empty() {
        return lines;
    }

    for paragraph in text.lines() {
        let mut current = String::new();
        for word in paragraph.split_whitespace() {
            let candidate = if current.is_empty() {
                word.to_string()
            } else {
                format!("{} {}", current, word)
            };

            if text_width(&candidate, font, size) <= width {
                current = candidate;
                continue;
            }

            if !current.is_empty() {
                lines.push(std::mem::take(&mut current));
            }

            for c in word.chars() {
                current.push(c);
                if text_width(&current, font, size) > width && current.chars().count() > 1 {
                    current.pop();
                    lines.push(std::mem::replace(&mut current, c.to_string()));
                }
            }
        }
        lines.push(current);
    }
    lines
}

/// Maps text onto WinAnsiEncoding; anything it cannot show becomes '?'.
pub fn encode_text(text: &str) -> Vec<u8> {
    text.chars()
        .map(|c| match c {
            '\u{20AC}' => 0x80,
            '\u{2026}' => 0x85,
            '\u{2018}' => 0x91,
            '\u{2019}' => 0x92,
            '\u{201C}' => 0x93,
            '\u{201D}' => 0x94,
            '\u{2022}' => 0x95,
            '\u{2013}' => 0x96,
            '\u{2014}' => 0x97,
            '\t' => b' ',
            c if (c as u32) < 0x20 => b' ',
            c if (c as u32) < 0x80 || (0xA0..=0xFF).contains(&(c as u32)) => c as u32 as u8,
            _ => b'?',
        })
        .collect()
}

fn leading(size: i64) -> i64 {
    size + size / 3 + 1
}

/// One table cell: wrapped text with an optional image under it.
#[derive(Debug, Clone)]
pub struct Cell {
    pub text: String,
    pub font: Font,
    pub align: Align,
    pub image: Option<PrintImage>,
}

impl Cell {
    pub fn new(text: impl Into<String>) -> Cell {
        Cell {
            text: text.into(),
            font: Font::Regular,
            align: Align::Left,
            image: None,
        }
    }

    pub fn bold(text: impl Into<String>) -> Cell {
        Cell {
            font: Font::Bold,
            ..Cell::new(text)
        }
    }

    pub fn centered(mut self) -> Cell {
        self.align = Align::Center;
        self
    }

    pub fn with_image(mut self, image: Option<PrintImage>) -> Cell {
        self.image = image;
        self
    }
}

/// What is left of a cell while its row is laid out.
struct CellFlow {
    lines: VecDeque<String>,
    font: Font,
    align: Align,
    image: Option<PrintImage>,
    width: i64,
}

impl CellFlow {
    fn content_height(&self, line_height: i64) -> i64 {
        self.lines.len() as i64 * line_height + self.image.as_ref().map_or(0, |img| img.height + 4)
    }

    fn is_done(&self) -> bool {
        self.lines.is_empty() && self.image.is_none()
    }
}

#[derive(Default)]
struct Page {
    operations: Vec<Operation>,
    images: Vec<usize>,
}

/// Top-down page writer.
pub struct Canvas {
    pages: Vec<Page>,
    images: Vec<PrintImage>,
    /// Baseline cursor of the current page, from the bottom edge.
    y: i64,
}

impl Default for Canvas {
    fn default() -> Self {
        Canvas::new()
    }
}

impl Canvas {
    pub fn new() -> Canvas {
        Canvas {
            pages: vec![Page::default()],
            images: Vec::new(),
            y: PAGE_HEIGHT - MARGIN,
        }
    }

    pub fn content_width(&self) -> i64 {
        PAGE_WIDTH - 2 * MARGIN
    }

    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    pub fn new_page(&mut self) {
        self.pages.push(Page::default());
        self.y = PAGE_HEIGHT - MARGIN;
    }

    /// Starts a new page unless `height` points still fit.
    pub fn ensure(&mut self, height: i64) {
        if self.y - height < MARGIN && self.y < PAGE_HEIGHT - MARGIN {
            self.new_page();
        }
    }

    pub fn space(&mut self, height: i64) {
        self.ensure(height);
        self.y -= height;
    }

    fn push(&mut self, op: Operation) {
        if let Some(page) = self.pages.last_mut() {
            page.operations.push(op);
        }
    }

    fn draw_text(&mut self, x: i64, baseline: i64, text: &str, font: Font, size: i64) {
        self.push(Operation::new("BT", vec![]));
        self.push(Operation::new(
            "Tf",
            vec![Object::Name(font.resource().to_vec()), size.into()],
        ));
        self.push(Operation::new("Td", vec![x.into(), baseline.into()]));
        self.push(Operation::new(
            "Tj",
            vec![Object::string_literal(encode_text(text))],
        ));
        self.push(Operation::new("ET", vec![]));
    }

    fn aligned_x(left: i64, width: i64, text: &str, font: Font, size: i64, align: Align) -> i64 {
        match align {
            Align::Left => left,
            Align::Center => left + (width - text_width(text, font, size)).max(0) / 2,
            Align::Right => left + (width - text_width(text, font, size)).max(0),
        }
    }

    /// Wrapped text across the content width, `indent` points in.
    pub fn paragraph(&mut self, indent: i64, text: &str, font: Font, size: i64, align: Align) {
        let width = self.content_width() - indent;
        for line in wrap(text, width, font, size) {
            self.ensure(leading(size));
            self.y -= leading(size);
            let x = Canvas::aligned_x(MARGIN + indent, width, &line, font, size, align);
            self.draw_text(x, self.y + size / 4, &line, font, size);
        }
    }

    /// A label hanging left of wrapped text, as in numbered questions.
    pub fn labelled(&mut self, indent: i64, label: &str, hang: i64, text: &str, size: i64) {
        let width = self.content_width() - indent - hang;
        let mut lines = wrap(text, width, Font::Regular, size);
        if lines.is_empty() {
            lines.push(String::new());
        }

        for (i, line) in lines.iter().enumerate() {
            self.ensure(leading(size));
            self.y -= leading(size);
            let baseline = self.y + size / 4;
            if i == 0 {
                self.draw_text(MARGIN + indent, baseline, label, Font::Bold, size);
            }
            self.draw_text(MARGIN + indent + hang, baseline, line, Font::Regular, size);
        }
    }

    /// Two texts on one line, flush left and flush right.
    pub fn split_line(&mut self, left: &str, right: &str, font: Font, size: i64) {
        self.ensure(leading(size));
        self.y -= leading(size);
        let baseline = self.y + size / 4;
        self.draw_text(MARGIN, baseline, left, font, size);
        let x = PAGE_WIDTH - MARGIN - text_width(right, font, size);
        self.draw_text(x, baseline, right, font, size);
    }

    /// Horizontal line across the content width.
    pub fn rule(&mut self) {
        self.ensure(8);
        self.y -= 4;
        self.push(Operation::new("m", vec![MARGIN.into(), self.y.into()]));
        self.push(Operation::new(
            "l",
            vec![(PAGE_WIDTH - MARGIN).into(), self.y.into()],
        ));
        self.push(Operation::new("S", vec![]));
        self.y -= 4;
    }

    fn place_image(&mut self, x: i64, top: i64, image: PrintImage) {
        let index = self.images.len();
        let (width, height) = (image.width, image.height);
        self.images.push(image);
        if let Some(page) = self.pages.last_mut() {
            page.images.push(index);
        }

        self.push(Operation::new("q", vec![]));
        self.push(Operation::new(
            "cm",
            vec![
                width.into(),
                Object::Integer(0),
                Object::Integer(0),
                height.into(),
                x.into(),
                (top - height).into(),
            ],
        ));
        self.push(Operation::new(
            "Do",
            vec![Object::Name(format!("Im{}", index).into_bytes())],
        ));
        self.push(Operation::new("Q", vec![]));
    }

    /// Image block in the flow, `indent` points in.
    pub fn image(&mut self, indent: i64, image: PrintImage) {
        self.ensure(image.height + 6);
        self.y -= 3;
        let top = self.y;
        self.y -= image.height + 3;
        self.place_image(MARGIN + indent, top, image);
    }

    /// Grid table. A row that fits on a page is kept whole and starts a new
    /// page when needed; a taller row continues across pages with its cell
    /// borders drawn again on each.
    pub fn table(&mut self, widths: &[i64], rows: Vec<Vec<Cell>>, size: i64) {
        let line_height = leading(size);
        for row in rows {
            let mut flows: Vec<CellFlow> = row
                .into_iter()
                .zip(widths)
                .map(|(cell, &width)| CellFlow {
                    lines: wrap(&cell.text, width - 2 * CELL_PADDING, cell.font, size).into(),
                    font: cell.font,
                    align: cell.align,
                    image: cell.image,
                    width,
                })
                .collect();

            let row_height = flows
                .iter()
                .map(|flow| flow.content_height(line_height))
                .fold(line_height, i64::max)
                + 2 * CELL_PADDING;

            if row_height <= PAGE_HEIGHT - 2 * MARGIN {
                self.ensure(row_height);
            } else {
                self.ensure(line_height + 2 * CELL_PADDING);
            }

            loop {
                self.table_segment(&mut flows, size);
                if flows.iter().all(CellFlow::is_done) {
                    break;
                }
                self.new_page();
            }
        }
    }

    /// Draws as much of a row as fits above the bottom margin.
    fn table_segment(&mut self, flows: &mut [CellFlow], size: i64) {
        let line_height = leading(size);
        let top = self.y;
        let room = top - MARGIN - 2 * CELL_PADDING;
        let capacity = (room / line_height).max(1) as usize;
        let fresh = top == PAGE_HEIGHT - MARGIN;

        let mut segments = Vec::with_capacity(flows.len());
        for flow in flows.iter_mut() {
            let take = flow.lines.len().min(capacity);
            let lines: Vec<String> = flow.lines.drain(..take).collect();
            let mut height = lines.len() as i64 * line_height;

            let mut image = None;
            if flow.lines.is_empty() {
                let fits = flow
                    .image
                    .as_ref()
                    .is_some_and(|img| height + img.height + 4 <= room);
                if fits || (fresh && lines.is_empty()) {
                    image = flow.image.take();
                }
            }
            if let Some(img) = &image {
                height += img.height + 4;
            }
            segments.push((lines, image, height));
        }

        let segment_height = segments
            .iter()
            .map(|(_, _, height)| *height)
            .fold(line_height, i64::max)
            + 2 * CELL_PADDING;

        let mut x = MARGIN;
        for (flow, (lines, image, _)) in flows.iter().zip(segments) {
            self.push(Operation::new(
                "re",
                vec![
                    x.into(),
                    (top - segment_height).into(),
                    flow.width.into(),
                    segment_height.into(),
                ],
            ));
            self.push(Operation::new("S", vec![]));

            let mut line_top = top - CELL_PADDING;
            for line in &lines {
                line_top -= line_height;
                let tx = Canvas::aligned_x(
                    x + CELL_PADDING,
                    flow.width - 2 * CELL_PADDING,
                    line,
                    flow.font,
                    size,
                    flow.align,
                );
                self.draw_text(tx, line_top + size / 4, line, flow.font, size);
            }

            if let Some(image) = image {
                self.place_image(x + CELL_PADDING, line_top - 2, image);
            }
            x += flow.width;
        }

        self.y = top - segment_height;
    }

    /// Assembles the PDF file.
    pub fn finish(self) -> Result<Vec<u8>, AppError> {
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();

        let regular = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Helvetica",
            "Encoding" => "WinAnsiEncoding",
        });
        let bold = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Helvetica-Bold",
            "Encoding" => "WinAnsiEncoding",
        });

        let image_ids: Vec<ObjectId> = self
            .images
            .into_iter()
            .map(|img| {
                doc.add_object(Stream::new(
                    dictionary! {
                        "Type" => "XObject",
                        "Subtype" => "Image",
                        "Width" => img.pixel_width as i64,
                        "Height" => img.pixel_height as i64,
                        "ColorSpace" => "DeviceGray",
                        "BitsPerComponent" => 8_i64,
                    },
                    img.pixels,
                ))
            })
            .collect();

        let mut kids: Vec<Object> = Vec::with_capacity(self.pages.len());
        for page in self.pages {
            let mut xobjects = Dictionary::new();
            for index in page.images {
                xobjects.set(format!("Im{}", index), image_ids[index]);
            }

            let content = Content {
                operations: page.operations,
            };
            let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode()?));

            let page_id = doc.add_object(dictionary! {
                "Type" => "Page",
                "Parent" => pages_id,
                "Contents" => content_id,
                "Resources" => dictionary! {
                    "Font" => dictionary! {
                        "F1" => regular,
                        "F2" => bold,
                    },
                    "XObject" => xobjects,
                },
            });
            kids.push(page_id.into());
        }

        let count = kids.len() as i64;
        let media_box: Vec<Object> = vec![
            Object::Integer(0),
            Object::Integer(0),
            PAGE_WIDTH.into(),
            PAGE_HEIGHT.into(),
        ];
        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => kids,
                "Count" => count,
                "MediaBox" => media_box,
            }),
        );

        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        doc.trailer.set("Root", catalog_id);
        doc.compress();

        let mut bytes = Vec::new();
        doc.save_to(&mut bytes)
            .map_err(|e| AppError::InternalServerError(format!("Failed to write PDF: {}", e)))?;
        Ok(bytes)
    }
}
