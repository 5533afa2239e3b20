//! Minimal PDF 1.4 writer for laid-out text.
//!
//! Emits one uncompressed content stream per page and references the two
//! standard Type1 Helvetica faces, so no font data is embedded. Text is
//! encoded as WinAnsi; characters outside it are replaced with `?`.

use std::io::Write;

use super::{BaseFont, DocumentBackend, DocumentLayout, PageLayout};
use crate::error::RenderError;

/// Object numbers of the fixed objects. Pages start after these.
const CATALOG_ID: usize = 1;
const PAGES_ID: usize = 2;
const FONT_REGULAR_ID: usize = 3;
const FONT_BOLD_ID: usize = 4;
const FIRST_PAGE_ID: usize = 5;

/// Built-in PDF backend.
#[derive(Debug, Clone, Copy, Default)]
pub struct PdfBackend;

impl DocumentBackend for PdfBackend {
    fn content_type(&self) -> &'static str {
        "application/pdf"
    }

    fn encode(&self, layout: &DocumentLayout) -> Result<Vec<u8>, RenderError> {
        let mut writer = PdfWriter::default();
        writer
            .write_document(layout)
            .map_err(|e| RenderError::Encoding(e.to_string()))?;
        Ok(writer.finish())
    }
}

/// Accumulates bytes and the offset of each object for the xref table.
#[derive(Default)]
struct PdfWriter {
    buf: Vec<u8>,
    offsets: Vec<(usize, usize)>,
}

impl PdfWriter {
    fn write_document(&mut self, layout: &DocumentLayout) -> std::io::Result<()> {
        // Binary comment marks the file as 8-bit for transfer tools.
        self.buf.write_all(b"%PDF-1.4\n%\xE2\xE3\xCF\xD3\n")?;

        let page_ids: Vec<usize> = (0..layout.pages.len())
            .map(|i| FIRST_PAGE_ID + 2 * i)
            .collect();

        self.object(CATALOG_ID, |w| {
            write!(w, "<< /Type /Catalog /Pages {PAGES_ID} 0 R >>")
        })?;

        let kids = page_ids
            .iter()
            .map(|id| format!("{id} 0 R"))
            .collect::<Vec<_>>()
            .join(" ");
        let count = page_ids.len();
        self.object(PAGES_ID, |w| {
            write!(w, "<< /Type /Pages /Kids [{kids}] /Count {count} >>")
        })?;

        for (id, font) in [
            (FONT_REGULAR_ID, BaseFont::Helvetica),
            (FONT_BOLD_ID, BaseFont::HelveticaBold),
        ] {
            self.object(id, |w| {
                write!(
                    w,
                    "<< /Type /Font /Subtype /Type1 /BaseFont /{} /Encoding /WinAnsiEncoding >>",
                    font.postscript_name()
                )
            })?;
        }

        for (page, page_id) in layout.pages.iter().zip(&page_ids) {
            let content_id = page_id + 1;
            let (width, height) = (layout.width, layout.height);
            self.object(*page_id, |w| {
                write!(
                    w,
                    "<< /Type /Page /Parent {PAGES_ID} 0 R /MediaBox [0 0 {width} {height}] \
                     /Resources << /Font << /F1 {FONT_REGULAR_ID} 0 R /F2 {FONT_BOLD_ID} 0 R >> >> \
                     /Contents {content_id} 0 R >>"
                )
            })?;

            let stream = content_stream(page);
            self.object(content_id, |w| {
                writeln!(w, "<< /Length {} >>\nstream", stream.len())?;
                w.write_all(&stream)?;
                write!(w, "\nendstream")
            })?;
        }

        self.write_trailer()
    }

    fn object<F>(&mut self, id: usize, body: F) -> std::io::Result<()>
    where
        F: FnOnce(&mut Vec<u8>) -> std::io::Result<()>,
    {
        self.offsets.push((id, self.buf.len()));
        writeln!(self.buf, "{id} 0 obj")?;
        body(&mut self.buf)?;
        self.buf.write_all(b"\nendobj\n")
    }

    fn write_trailer(&mut self) -> std::io::Result<()> {
        self.offsets.sort_by_key(|(id, _)| *id);
        let size = self.offsets.len() + 1;
        let xref_offset = self.buf.len();

        writeln!(self.buf, "xref\n0 {size}")?;
        self.buf.write_all(b"0000000000 65535 f \n")?;
        for (_, offset) in &self.offsets {
            writeln!(self.buf, "{offset:010} 00000 n ")?;
        }
        writeln!(
            self.buf,
            "trailer\n<< /Size {size} /Root {CATALOG_ID} 0 R >>\nstartxref\n{xref_offset}\n%%EOF"
        )
    }

    fn finish(self) -> Vec<u8> {
        self.buf
    }
}

fn font_resource(font: BaseFont) -> &'static str {
    match font {
        BaseFont::Helvetica => "F1",
        BaseFont::HelveticaBold => "F2",
    }
}

/// Text-drawing operators for one page. Blank lines still occupy their slot
/// in the layout but draw nothing.
fn content_stream(page: &PageLayout) -> Vec<u8> {
    let mut out = Vec::new();
    for run in page.runs.iter().filter(|r| !r.text.is_empty()) {
        out.extend_from_slice(
            format!(
                "BT /{} {} Tf {} {} Td (",
                font_resource(run.font),
                run.size,
                run.x,
                run.y
            )
            .as_bytes(),
        );
        out.extend_from_slice(&escape_text(&run.text));
        out.extend_from_slice(b") Tj ET\n");
    }
    out
}

/// Encode `text` as the body of a PDF literal string.
fn escape_text(text: &str) -> Vec<u8> {
    let mut out = Vec::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '(' | ')' | '\\' => {
                out.push(b'\\');
                out.push(c as u8);
            }
            '\t' => out.push(b' '),
            _ => match to_win_ansi(c) {
                Some(b) if b.is_ascii() => out.push(b),
                Some(b) => out.extend_from_slice(format!("\\{b:03o}").as_bytes()),
                None => out.push(b'?'),
            },
        }
    }
    out
}

fn to_win_ansi(c: char) -> Option<u8> {
    let code = c as u32;
    match code {
        0x20..=0x7E | 0xA0..=0xFF => Some(code as u8),
        _ => match c {
            '€' => Some(0x80),
            '‚' => Some(0x82),
            'ƒ' => Some(0x83),
            '„' => Some(0x84),
            '…' => Some(0x85),
            '†' => Some(0x86),
            '‡' => Some(0x87),
            'ˆ' => Some(0x88),
            '‰' => Some(0x89),
            'Š' => Some(0x8A),
            '‹' => Some(0x8B),
            'Œ' => Some(0x8C),
            'Ž' => Some(0x8E),
            '‘' => Some(0x91),
            '’' => Some(0x92),
            '“' => Some(0x93),
            '”' => Some(0x94),
            '•' => Some(0x95),
            '–' => Some(0x96),
            '—' => Some(0x97),
            '˜' => Some(0x98),
            '™' => Some(0x99),
            'š' => Some(0x9A),
            '›' => Some(0x9B),
            'œ' => Some(0x9C),
            'ž' => Some(0x9E),
            'Ÿ' => Some(0x9F),
            _ => None,
        },
    }
}
