//! PDF rendering for the export pipeline.
//!
//! The document is laid out directly from the markdown text with `printpdf`
//! builtin fonts: headings get larger bold type, body text is wrapped to the
//! page width. If PDF generation fails, the caller falls back to the styled
//! HTML document under the same `.pdf` filename.

use printpdf::{BuiltinFont, Mm, Op, PdfDocument, PdfPage, PdfSaveOptions, Point, Pt, TextItem};

use wikiport_shared::{Result, WikiportError};

// A4 geometry, in millimeters.
const PAGE_WIDTH: f32 = 210.0;
const PAGE_HEIGHT: f32 = 297.0;
const MARGIN: f32 = 18.0;

/// Maximum characters per wrapped body line.
const WRAP_COLUMNS: usize = 95;

/// Line style derived from markdown structure.
struct LineStyle {
    font: BuiltinFont,
    size: f32,
    /// Vertical advance after the line, in mm.
    leading: f32,
}

/// Render markdown text into PDF bytes.
pub(crate) fn build(title: &str, markdown: &str) -> Result<Vec<u8>> {
    if markdown.trim().is_empty() {
        return Err(WikiportError::Render("empty content blob".into()));
    }

    let mut doc = PdfDocument::new(title);
    let mut pages: Vec<PdfPage> = Vec::new();
    let mut ops: Vec<Op> = Vec::new();
    let mut cursor_y = PAGE_HEIGHT - MARGIN;
    let mut in_fence = false;

    for raw_line in markdown.lines() {
        let trimmed = raw_line.trim_start();
        if trimmed.starts_with("```") || trimmed.starts_with("~~~") {
            in_fence = !in_fence;
            continue;
        }

        let (style, text) = classify_line(raw_line, in_fence);
        for segment in wrap_line(&text, WRAP_COLUMNS) {
            if cursor_y < MARGIN + style.leading {
                pages.push(PdfPage::new(Mm(PAGE_WIDTH), Mm(PAGE_HEIGHT), std::mem::take(&mut ops)));
                cursor_y = PAGE_HEIGHT - MARGIN;
            }

            if !segment.is_empty() {
                ops.push(Op::StartTextSection);
                ops.push(Op::SetTextCursor {
                    pos: Point::new(Mm(MARGIN), Mm(cursor_y)),
                });
                ops.push(Op::SetFontSizeBuiltinFont {
                    size: Pt(style.size),
                    font: style.font,
                });
                ops.push(Op::WriteTextBuiltinFont {
                    items: vec![TextItem::Text(segment)],
                    font: style.font,
                });
                ops.push(Op::EndTextSection);
            }
            cursor_y -= style.leading;
        }
    }

    if !ops.is_empty() {
        pages.push(PdfPage::new(Mm(PAGE_WIDTH), Mm(PAGE_HEIGHT), ops));
    }
    if pages.is_empty() {
        return Err(WikiportError::Render("no renderable content".into()));
    }

    let bytes = doc
        .with_pages(pages)
        .save(&PdfSaveOptions::default(), &mut Vec::new());
    Ok(bytes)
}

/// Map a markdown line to its type style and display text.
fn classify_line(line: &str, in_fence: bool) -> (LineStyle, String) {
    if !in_fence {
        if let Some(text) = line.strip_prefix("### ") {
            return (
                LineStyle {
                    font: BuiltinFont::HelveticaBold,
                    size: 13.0,
                    leading: 7.0,
                },
                text.trim().to_string(),
            );
        }
        if let Some(text) = line.strip_prefix("## ") {
            return (
                LineStyle {
                    font: BuiltinFont::HelveticaBold,
                    size: 15.0,
                    leading: 8.0,
                },
                text.trim().to_string(),
            );
        }
        if let Some(text) = line.strip_prefix("# ") {
            return (
                LineStyle {
                    font: BuiltinFont::HelveticaBold,
                    size: 18.0,
                    leading: 10.0,
                },
                text.trim().to_string(),
            );
        }
        if line.trim() == "---" {
            // Horizontal rules become blank separation.
            return (
                LineStyle {
                    font: BuiltinFont::Helvetica,
                    size: 11.0,
                    leading: 6.0,
                },
                String::new(),
            );
        }
    }

    let font = if in_fence {
        BuiltinFont::Courier
    } else {
        BuiltinFont::Helvetica
    };
    (
        LineStyle {
            font,
            size: 11.0,
            leading: 5.5,
        },
        line.to_string(),
    )
}

/// Wrap text at word boundaries to at most `columns` characters per line.
fn wrap_line(text: &str, columns: usize) -> Vec<String> {
    if text.chars().count() <= columns {
        return vec![text.to_string()];
    }

    let mut lines = Vec::new();
    let mut current = String::new();
    for word in text.split_whitespace() {
        if !current.is_empty() && current.chars().count() + word.chars().count() + 1 > columns {
            lines.push(std::mem::take(&mut current));
        }
        if !current.is_empty() {
            current.push(' ');
        }
        current.push_str(word);
    }
    if !current.is_empty() {
        lines.push(current);
    }
    if lines.is_empty() {
        lines.push(String::new());
    }
    lines
}
