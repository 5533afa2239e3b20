//! Intake summary document.
//!
//! Rendering happens in two steps. [`layout`] places every line of the
//! classification text on a page (pure, no I/O). A [`DocumentBackend`] then
//! encodes the placed text into a binary document. The only backend shipped
//! is [`PdfBackend`].

pub mod pdf;

use std::io::Cursor;

use serde::Serialize;

use crate::error::RenderError;

pub use pdf::PdfBackend;

/// Title printed at the top of the first page.
pub const SUMMARY_TITLE: &str = "Wellness Intake Summary";

/// Download name offered to the user.
pub const SUMMARY_FILE_NAME: &str = "wellness_intake_summary.pdf";

/// Standard Type1 fonts used by the summary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum BaseFont {
    Helvetica,
    HelveticaBold,
}

impl BaseFont {
    pub fn postscript_name(&self) -> &'static str {
        match self {
            Self::Helvetica => "Helvetica",
            Self::HelveticaBold => "Helvetica-Bold",
        }
    }
}

/// Fixed page geometry and typography, in PDF points.
#[derive(Debug, Clone, PartialEq)]
pub struct PageStyle {
    pub width: f32,
    pub height: f32,
    pub margin_left: f32,
    pub title: String,
    pub title_font: BaseFont,
    pub title_size: f32,
    pub title_y: f32,
    pub body_font: BaseFont,
    pub body_size: f32,
    /// Baseline of the first body line on page one.
    pub body_start_y: f32,
    /// Baseline of the first line on continuation pages.
    pub continuation_y: f32,
    pub line_step: f32,
    /// A line whose baseline would fall below this starts a new page.
    pub bottom_margin: f32,
}

impl Default for PageStyle {
    fn default() -> Self {
        Self {
            // US Letter
            width: 612.0,
            height: 792.0,
            margin_left: 50.0,
            title: SUMMARY_TITLE.to_string(),
            title_font: BaseFont::HelveticaBold,
            title_size: 14.0,
            title_y: 770.0,
            body_font: BaseFont::Helvetica,
            body_size: 11.0,
            body_start_y: 740.0,
            continuation_y: 750.0,
            line_step: 18.0,
            bottom_margin: 60.0,
        }
    }
}

/// A single line of text placed on a page.
#[derive(Debug, Clone, PartialEq)]
pub struct TextRun {
    pub font: BaseFont,
    pub size: f32,
    pub x: f32,
    pub y: f32,
    pub text: String,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct PageLayout {
    pub runs: Vec<TextRun>,
}

/// Every page of a document with its placed text.
#[derive(Debug, Clone, PartialEq)]
pub struct DocumentLayout {
    pub width: f32,
    pub height: f32,
    pub pages: Vec<PageLayout>,
}

impl DocumentLayout {
    /// Body runs across all pages, in reading order (the title excluded).
    pub fn body_lines(&self) -> impl Iterator<Item = &TextRun> {
        self.pages
            .iter()
            .flat_map(|p| p.runs.iter())
            .skip(1)
    }
}

/// Place `text` on pages.
///
/// Lines are split on `\n` and never wrapped; a line wider than the page is
/// kept whole and simply runs off the right edge.
pub fn layout(text: &str, style: &PageStyle) -> DocumentLayout {
    let mut pages = Vec::new();
    let mut page = PageLayout::default();

    page.runs.push(TextRun {
        font: style.title_font,
        size: style.title_size,
        x: style.margin_left,
        y: style.title_y,
        text: style.title.clone(),
    });

    let mut y = style.body_start_y;
    for line in text.split('\n') {
        if y < style.bottom_margin {
            pages.push(std::mem::take(&mut page));
            y = style.continuation_y;
        }
        page.runs.push(TextRun {
            font: style.body_font,
            size: style.body_size,
            x: style.margin_left,
            y,
            text: line.strip_suffix('\r').unwrap_or(line).to_string(),
        });
        y -= style.line_step;
    }
    pages.push(page);

    DocumentLayout {
        width: style.width,
        height: style.height,
        pages,
    }
}

/// Encodes a laid-out document into bytes.
pub trait DocumentBackend: Send + Sync {
    fn content_type(&self) -> &'static str;

    fn encode(&self, layout: &DocumentLayout) -> Result<Vec<u8>, RenderError>;
}

/// A rendered summary, held in memory.
#[derive(Debug, Clone)]
pub struct SummaryDocument {
    pub bytes: Vec<u8>,
    pub page_count: usize,
    pub content_type: &'static str,
    pub file_name: &'static str,
}

impl SummaryDocument {
    /// Seekable reader over the document bytes.
    pub fn reader(&self) -> Cursor<&[u8]> {
        Cursor::new(self.bytes.as_slice())
    }
}

/// Turns classification text into a downloadable document.
pub struct SummaryRenderer {
    style: PageStyle,
    backend: Box<dyn DocumentBackend>,
}

impl Default for SummaryRenderer {
    fn default() -> Self {
        Self::new(PageStyle::default(), Box::new(PdfBackend))
    }
}

impl SummaryRenderer {
    pub fn new(style: PageStyle, backend: Box<dyn DocumentBackend>) -> Self {
        Self { style, backend }
    }

    pub fn style(&self) -> &PageStyle {
        &self.style
    }

    pub fn render(&self, text: &str) -> Result<SummaryDocument, RenderError> {
        let layout = layout(text, &self.style);
        let bytes = self.backend.encode(&layout)?;
        tracing::debug!(pages = layout.pages.len(), bytes = bytes.len(), "Summary rendered");
        Ok(SummaryDocument {
            bytes,
            page_count: layout.pages.len(),
            content_type: self.backend.content_type(),
            file_name: SUMMARY_FILE_NAME,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::io::{Read, Seek, SeekFrom};

    use super::*;

    fn numbered_lines(n: usize) -> String {
        (1..=n)
            .map(|i| format!("Line {i:03}"))
            .collect::<Vec<_>>()
            .join("\n")
    }

    #[test]
    fn short_text_fits_one_page() {
        let layout = layout("ISSUE_CLUSTER: work stress\nSEVERITY: medium", &PageStyle::default());
        assert_eq!(layout.pages.len(), 1);
        let runs = &layout.pages[0].runs;
        assert_eq!(runs[0].text, SUMMARY_TITLE);
        assert_eq!(runs[0].font, BaseFont::HelveticaBold);
        assert_eq!((runs[0].x, runs[0].y), (50.0, 770.0));
        assert_eq!(runs[1].y, 740.0);
        assert_eq!(runs[1].font, BaseFont::Helvetica);
        assert_eq!(runs[2].y, 722.0);
    }

    #[test]
    fn first_body_line_carries_issue_cluster() {
        let layout = layout("ISSUE_CLUSTER: work stress\nSEVERITY: medium\n", &PageStyle::default());
        let first = layout.body_lines().next().unwrap();
        assert!(first.text.contains("work stress"));
    }

    #[test]
    fn page_capacity_matches_margins() {
        let style = PageStyle::default();
        assert_eq!(layout(&numbered_lines(38), &style).pages.len(), 1);
        assert_eq!(layout(&numbered_lines(39), &style).pages.len(), 2);
        // 38 on page one, 39 on each continuation page.
        assert_eq!(layout(&numbered_lines(38 + 39), &style).pages.len(), 2);
        assert_eq!(layout(&numbered_lines(38 + 39 + 1), &style).pages.len(), 3);
    }

    #[test]
    fn page_break_drops_no_lines() {
        let text = numbered_lines(100);
        let layout = layout(&text, &PageStyle::default());
        assert_eq!(layout.pages.len(), 3);

        let body: Vec<&str> = layout.body_lines().map(|r| r.text.as_str()).collect();
        let expected: Vec<&str> = text.split('\n').collect();
        assert_eq!(body, expected);

        // Continuation pages restart at the top offset and carry no title.
        let second = &layout.pages[1].runs[0];
        assert_eq!(second.y, 750.0);
        assert_eq!(second.text, "Line 039");
        assert!(layout.pages[1..]
            .iter()
            .flat_map(|p| p.runs.iter())
            .all(|r| r.y >= 60.0 && r.font == BaseFont::Helvetica));
    }

    #[test]
    fn long_lines_are_not_wrapped() {
        let long = "x".repeat(400);
        let layout = layout(&long, &PageStyle::default());
        let body: Vec<&TextRun> = layout.body_lines().collect();
        assert_eq!(body.len(), 1);
        assert_eq!(body[0].text.len(), 400);
    }

    #[test]
    fn empty_text_renders_title_page() {
        let layout = layout("", &PageStyle::default());
        assert_eq!(layout.pages.len(), 1);
        assert!(layout.body_lines().all(|r| r.text.is_empty()));
    }

    #[test]
    fn crlf_is_normalized() {
        let layout = layout("a\r\nb", &PageStyle::default());
        let body: Vec<&str> = layout.body_lines().map(|r| r.text.as_str()).collect();
        assert_eq!(body, ["a", "b"]);
    }

    #[test]
    fn renderer_produces_seekable_pdf() {
        let doc = SummaryRenderer::default()
            .render("ISSUE_CLUSTER: work stress")
            .unwrap();
        assert_eq!(doc.page_count, 1);
        assert_eq!(doc.content_type, "application/pdf");
        assert_eq!(doc.file_name, SUMMARY_FILE_NAME);

        let mut reader = doc.reader();
        reader.seek(SeekFrom::Start(0)).unwrap();
        let mut header = [0u8; 8];
        reader.read_exact(&mut header).unwrap();
        assert_eq!(&header, b"%PDF-1.4");
    }
}
