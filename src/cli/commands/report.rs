use chrono::{Local, NaiveDate};
use std::path::{Path, PathBuf};

use crate::app::Context;
use crate::cli::parser::Commands;
use crate::errors::{AppError, AppResult};
use crate::report::{DEFAULT_REPORT_FILE, PdfRenderer, SummaryReport};
use crate::ui::messages;
use crate::utils::path::expand_tilde;
use crate::utils::period::parse_period;

/// Handle the `report` subcommand
///
/// An empty ledger is not a failure: the user is told and no file is written.
pub fn handle(cmd: &Commands, ctx: &Context) -> AppResult<()> {
    if let Commands::Report { file, period } = cmd {
        let range = match period {
            Some(p) => Some(parse_period(p, Local::now().date_naive())?),
            None => None,
        };
        let out = file
            .as_deref()
            .map(expand_tilde)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_REPORT_FILE));

        generate(ctx, range, &out)?;
    }
    Ok(())
}

/// Build and write the summary; shared with the interactive shell.
pub fn generate(
    ctx: &Context,
    range: Option<(NaiveDate, NaiveDate)>,
    out: &Path,
) -> AppResult<()> {
    let doc = match SummaryReport::from_ledger(&ctx.ledger(), range) {
        Ok(doc) => doc,
        Err(AppError::EmptyLedger) => {
            messages::warning(format!("{}.", AppError::EmptyLedger));
            return Ok(());
        }
        Err(e) => return Err(e),
    };

    SummaryReport::write(&doc, &PdfRenderer, out)?;
    messages::success(format!(
        "Summary saved as {} ({} sessions, {})",
        out.display(),
        doc.rows.len(),
        doc.footer()
    ));
    Ok(())
}
