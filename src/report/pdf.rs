use pdf_writer::{Content, Name, Pdf, Rect, Ref, Str};
use std::fs::File;
use std::io::Write;
use std::path::Path;
use tracing::info;

use super::{ReportDocument, ReportRenderer};
use crate::errors::{AppError, AppResult};

/// Approximate Helvetica advance per character at 1pt, used to size columns.
const CHAR_WIDTH: f32 = 0.55;

/// Multi-page table writer on top of `pdf-writer`.
struct PdfManager {
    pdf: Pdf,
    catalog_id: Ref,
    pages_id: Ref,
    page_refs: Vec<Ref>,
    current_content_id: Option<Ref>,

    page_w: f32,
    page_h: f32,
    margin: f32,
    row_h: f32,

    next_id: i32,
    font_id: Ref,
    bold_font_id: Ref,

    font_size: f32,
    header_font_size: f32,
    title_font_size: f32,
}

impl PdfManager {
    fn new() -> Self {
        let mut pdf = Pdf::new();

        let catalog_id = Ref::new(1);
        let pages_id = Ref::new(2);
        let font_id = Ref::new(3);
        let bold_font_id = Ref::new(4);
        let next_id = 5;

        pdf.type1_font(font_id).base_font(Name(b"Helvetica"));
        pdf.type1_font(bold_font_id).base_font(Name(b"Helvetica-Bold"));

        Self {
            pdf,
            catalog_id,
            pages_id,
            page_refs: Vec::new(),
            current_content_id: None,

            // US Letter
            page_w: 612.0,
            page_h: 792.0,
            margin: 40.0,
            row_h: 20.0,

            next_id,
            font_id,
            bold_font_id,

            font_size: 9.0,
            header_font_size: 10.0,
            title_font_size: 14.0,
        }
    }

    fn fresh_ref(&mut self) -> Ref {
        let id = self.next_id;
        self.next_id += 1;
        Ref::new(id)
    }

    fn new_page(&mut self) -> Content {
        let page_id = self.fresh_ref();
        let content_id = self.fresh_ref();

        self.page_refs.push(page_id);

        let mut page = self.pdf.page(page_id);
        page.parent(self.pages_id)
            .media_box(Rect::new(0.0, 0.0, self.page_w, self.page_h))
            .contents(content_id);

        let mut resources = page.resources();
        let mut fonts = resources.fonts();
        fonts.pair(Name(b"F1"), self.font_id);
        fonts.pair(Name(b"F2"), self.bold_font_id);

        self.current_content_id = Some(content_id);

        Content::new()
    }

    fn finalize_page(&mut self, content: Content) {
        if let Some(id) = self.current_content_id.take() {
            self.pdf.stream(id, &content.finish());
        }
    }

    fn build_pages_tree(&mut self) {
        let mut pages = self.pdf.pages(self.pages_id);
        pages.count(self.page_refs.len() as i32);
        pages.kids(self.page_refs.iter().copied());
    }

    fn draw_text(&self, content: &mut Content, font: &[u8], x: f32, y: f32, size: f32, text: &str) {
        let bytes = latin1(text);
        content.begin_text();
        content.set_font(Name(font), size);
        content.set_text_matrix([1.0, 0.0, 0.0, 1.0, x, y]);
        content.show(Str(&bytes));
        content.end_text();
    }

    fn draw_cell_borders(&self, content: &mut Content, x: f32, y: f32, w: f32, h: f32) {
        content.save_state();
        content.set_line_width(0.75);
        content.set_stroke_rgb(0.0, 0.0, 0.0);
        content.rect(x, y, w, h);
        content.stroke();
        content.restore_state();
    }

    fn fill_row(&self, content: &mut Content, y: f32, width: f32, rgb: (f32, f32, f32)) {
        content.save_state();
        content.set_fill_rgb(rgb.0, rgb.1, rgb.2);
        content.rect(self.margin, y, width, self.row_h);
        content.fill_nonzero();
        content.restore_state();
    }

    /// Cells are centred in their column and clipped to fit it.
    fn draw_row(
        &self,
        content: &mut Content,
        y: f32,
        col_widths: &[f32],
        row: &[String],
        header: bool,
    ) {
        let (font, size): (&[u8], f32) = if header {
            (&b"F2"[..], self.header_font_size)
        } else {
            (&b"F1"[..], self.font_size)
        };

        let mut x = self.margin;
        for (i, text) in row.iter().enumerate() {
            let w = col_widths[i];
            let max_chars = ((w - 8.0) / (size * CHAR_WIDTH)).max(1.0) as usize;
            let shown = clip(text, max_chars);
            let text_w = shown.chars().count() as f32 * size * CHAR_WIDTH;
            let tx = x + ((w - text_w) / 2.0).max(4.0);

            if header {
                content.save_state();
                content.set_fill_rgb(0.96, 0.96, 0.96);
                self.draw_text(content, font, tx, y + 6.0, size, &shown);
                content.restore_state();
            } else {
                self.draw_text(content, font, tx, y + 6.0, size, &shown);
            }
            self.draw_cell_borders(content, x, y, w, self.row_h);
            x += w;
        }
    }

    /// Column widths from header + content, scaled down to the printable width.
    fn compute_col_widths(&self, headers: &[&str], rows: &[Vec<String>]) -> Vec<f32> {
        let per_char = self.font_size * CHAR_WIDTH;
        let mut widths: Vec<f32> = headers
            .iter()
            .map(|h| h.chars().count() as f32 * self.header_font_size * CHAR_WIDTH + 12.0)
            .collect();

        for row in rows {
            for (i, cell) in row.iter().enumerate().take(widths.len()) {
                widths[i] = (cell.chars().count() as f32 * per_char + 12.0).max(widths[i]);
            }
        }

        let total: f32 = widths.iter().sum();
        let max = self.page_w - 2.0 * self.margin;

        if total > max {
            let scale = max / total;
            for w in &mut widths {
                *w *= scale;
            }
        }

        widths
    }

    fn draw_page_header_footer(&self, content: &mut Content, title: &str, page: usize) {
        self.draw_text(
            content,
            b"F2",
            self.margin,
            self.page_h - self.margin,
            self.title_font_size,
            title,
        );

        let pg = format!("Page {page}");
        self.draw_text(
            content,
            b"F1",
            self.page_w - self.margin - 40.0,
            self.margin - 25.0,
            self.font_size,
            &pg,
        );
    }

    /// Paginated table; `footer` is printed under the last row.
    fn write_table(&mut self, title: &str, headers: &[&str], rows: &[Vec<String>], footer: &str) {
        let col_widths = self.compute_col_widths(headers, rows);
        let table_w: f32 = col_widths.iter().sum();
        let header_row: Vec<String> = headers.iter().map(|s| s.to_string()).collect();

        let mut remaining: &[Vec<String>] = rows;
        let mut page_idx = 1;

        loop {
            let mut content = self.new_page();
            self.draw_page_header_footer(&mut content, title, page_idx);

            let mut y = self.page_h - self.margin - 40.0;

            self.fill_row(&mut content, y, table_w, (0.5, 0.5, 0.5));
            self.draw_row(&mut content, y, &col_widths, &header_row, true);
            y -= self.row_h;

            let mut consumed = 0;
            for row in remaining {
                if y - self.row_h < self.margin {
                    break;
                }
                self.draw_row(&mut content, y, &col_widths, row, false);
                y -= self.row_h;
                consumed += 1;
            }
            remaining = &remaining[consumed..];

            if remaining.is_empty() && y - self.row_h >= self.margin {
                self.draw_text(
                    &mut content,
                    b"F2",
                    self.margin,
                    y - 4.0,
                    self.header_font_size,
                    footer,
                );
                self.finalize_page(content);
                break;
            }

            self.finalize_page(content);
            page_idx += 1;

            if remaining.is_empty() {
                // no room left for the footer on the previous page
                let mut content = self.new_page();
                self.draw_page_header_footer(&mut content, title, page_idx);
                self.draw_text(
                    &mut content,
                    b"F2",
                    self.margin,
                    self.page_h - self.margin - 40.0,
                    self.header_font_size,
                    footer,
                );
                self.finalize_page(content);
                break;
            }
        }
    }

    fn finish(mut self) -> Vec<u8> {
        self.pdf.catalog(self.catalog_id).pages(self.pages_id);
        self.build_pages_tree();
        self.pdf.finish()
    }
}

/// Type1 base fonts only cover single-byte text; anything outside Latin-1 becomes `?`.
fn latin1(text: &str) -> Vec<u8> {
    text.chars()
        .map(|c| u8::try_from(u32::from(c)).unwrap_or(b'?'))
        .collect()
}

fn clip(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let budget = max_chars.saturating_sub(3).max(1);
    let first = textwrap::wrap(text, budget)
        .into_iter()
        .next()
        .map(|l| l.into_owned())
        .unwrap_or_default();
    let first: String = first.chars().take(budget).collect();
    format!("{first}...")
}

/// Writes the report as a PDF table.
#[derive(Debug, Default, Clone, Copy)]
pub struct PdfRenderer;

impl PdfRenderer {
    pub fn to_bytes(&self, doc: &ReportDocument) -> Vec<u8> {
        let mut pdf = PdfManager::new();
        pdf.write_table(&doc.title, &doc.headers, &doc.rows, &doc.footer());
        pdf.finish()
    }
}

impl ReportRenderer for PdfRenderer {
    fn render(&self, doc: &ReportDocument, path: &Path) -> AppResult<()> {
        let bytes = self.to_bytes(doc);
        let mut f = File::create(path)
            .map_err(|e| AppError::Export(format!("cannot create {}: {e}", path.display())))?;
        f.write_all(&bytes)?;
        info!(path = %path.display(), rows = doc.rows.len(), "report written");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn doc(rows: usize) -> ReportDocument {
        ReportDocument {
            title: "Weekly Summary".into(),
            headers: super::super::headers(),
            rows: (0..rows)
                .map(|i| {
                    vec![
                        "2025-09-01".into(),
                        format!("Task number {i}"),
                        "2025-09-01 09:00:00".into(),
                        "2025-09-01 10:00:00".into(),
                        "1.0".into(),
                    ]
                })
                .collect(),
            total_hours: rows as f64,
        }
    }

    fn count(haystack: &[u8], needle: &[u8]) -> usize {
        haystack.windows(needle.len()).filter(|w| *w == needle).count()
    }

    fn pages(bytes: &[u8]) -> usize {
        count(bytes, b"/Type /Page") - count(bytes, b"/Type /Pages")
    }

    #[test]
    fn small_report_fits_one_page_with_footer() {
        let bytes = PdfRenderer.to_bytes(&doc(3));
        assert!(bytes.starts_with(b"%PDF-"));
        assert_eq!(pages(&bytes), 1);
        assert_eq!(count(&bytes, b"Total Hours Worked: 3.0"), 1);
        assert!(count(&bytes, b"Task Description") >= 1);
    }

    #[test]
    fn long_report_spans_pages() {
        let bytes = PdfRenderer.to_bytes(&doc(120));
        assert!(pages(&bytes) > 1);
        assert_eq!(count(&bytes, b"Total Hours Worked: 120.0"), 1);
    }

    #[test]
    fn render_writes_the_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("weekly_summary.pdf");
        PdfRenderer.render(&doc(2), &path).unwrap();
        let bytes = std::fs::read(&path).unwrap();
        assert!(bytes.starts_with(b"%PDF-"));
    }

    #[test]
    fn clip_shortens_long_cells() {
        assert_eq!(clip("short", 10), "short");
        let c = clip("a rather long task description", 12);
        assert!(c.ends_with("..."));
        assert!(c.chars().count() <= 12);
    }

    #[test]
    fn non_latin_text_is_replaced() {
        assert_eq!(latin1("café ✓"), b"caf\xe9 ?".to_vec());
    }
}
