use chrono::{Local, NaiveDate};

use crate::app::Context;
use crate::cli::parser::Commands;
use crate::errors::AppResult;
use crate::report;
use crate::utils::period::parse_period;
use crate::utils::table::Table;
use crate::utils::time::{DATE_FORMAT, format_epoch, format_float, round2};

pub fn handle(cmd: &Commands, ctx: &Context) -> AppResult<()> {
    if let Commands::List { period } = cmd {
        let range = match period {
            Some(p) => Some(parse_period(p, Local::now().date_naive())?),
            None => None,
        };

        let mut table = Table::with_headers(&report::headers());
        let mut total = 0.0;

        for record in ctx.ledger().read_all()? {
            let record = record?;
            if let Some((from, to)) = range {
                match NaiveDate::parse_from_str(&record.date, DATE_FORMAT) {
                    Ok(d) if d >= from && d <= to => {}
                    _ => continue,
                }
            }
            total += record.duration_hours;
            table.add_row(vec![
                record.date,
                record.task_description,
                format_epoch(record.start),
                format_epoch(record.end),
                format_float(record.duration_hours),
            ]);
        }

        if table.rows.is_empty() {
            println!("No sessions recorded.");
            return Ok(());
        }

        print!("{}", table.render());
        println!("\nTotal Hours Worked: {}", format_float(round2(total)));
    }
    Ok(())
}
