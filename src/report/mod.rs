//! Summary of the ledger as a table plus a total-hours footer.

mod pdf;

pub use pdf::PdfRenderer;

use chrono::NaiveDate;
use std::path::Path;

use crate::errors::{AppError, AppResult};
use crate::ledger::{LedgerRecord, LocalLedger};
use crate::utils::time::{DATE_FORMAT, format_epoch, format_float, round2};

pub const REPORT_TITLE: &str = "Weekly Summary";
pub const DEFAULT_REPORT_FILE: &str = "weekly_summary.pdf";

/// Column headers of the summary table.
pub fn headers() -> Vec<&'static str> {
    vec!["Date", "Task Description", "Clock-in", "Clock-out", "Hours"]
}

/// Renderer-independent content of the report.
#[derive(Debug, Clone, PartialEq)]
pub struct ReportDocument {
    pub title: String,
    pub headers: Vec<&'static str>,
    pub rows: Vec<Vec<String>>,
    pub total_hours: f64,
}

impl ReportDocument {
    pub fn footer(&self) -> String {
        format!("Total Hours Worked: {}", format_float(self.total_hours))
    }
}

/// Something that can turn a [`ReportDocument`] into a file.
pub trait ReportRenderer {
    fn render(&self, doc: &ReportDocument, path: &Path) -> AppResult<()>;
}

fn record_to_row(r: &LedgerRecord) -> Vec<String> {
    vec![
        r.date.clone(),
        r.task_description.clone(),
        format_epoch(r.start),
        format_epoch(r.end),
        format_float(r.duration_hours),
    ]
}

pub struct SummaryReport;

impl SummaryReport {
    /// Build the table. An empty input is an error: no report is produced.
    pub fn generate<I>(records: I) -> AppResult<ReportDocument>
    where
        I: IntoIterator<Item = LedgerRecord>,
    {
        let mut rows = Vec::new();
        let mut total = 0.0;

        for r in records {
            total += r.duration_hours;
            rows.push(record_to_row(&r));
        }

        if rows.is_empty() {
            return Err(AppError::EmptyLedger);
        }

        Ok(ReportDocument {
            title: REPORT_TITLE.to_string(),
            headers: headers(),
            rows,
            total_hours: round2(total),
        })
    }

    /// Read the ledger, keep the rows dated within `period` (inclusive), and build the table.
    pub fn from_ledger(
        ledger: &LocalLedger,
        period: Option<(NaiveDate, NaiveDate)>,
    ) -> AppResult<ReportDocument> {
        let mut selected = Vec::new();

        for record in ledger.read_all()? {
            let record = record?;
            if let Some((from, to)) = period {
                let Ok(date) = NaiveDate::parse_from_str(&record.date, DATE_FORMAT) else {
                    continue;
                };
                if date < from || date > to {
                    continue;
                }
            }
            selected.push(record);
        }

        let mut doc = Self::generate(selected)?;
        if let Some((from, to)) = period {
            doc.title = format!(
                "{REPORT_TITLE} {} - {}",
                from.format(DATE_FORMAT),
                to.format(DATE_FORMAT)
            );
        }
        Ok(doc)
    }

    /// Render `doc` to `path` with `renderer`.
    pub fn write(doc: &ReportDocument, renderer: &dyn ReportRenderer, path: &Path) -> AppResult<()> {
        renderer.render(doc, path)
    }
}
