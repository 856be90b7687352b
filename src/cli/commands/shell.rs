//! Interactive mode.
//!
//! One process, one clock service: pushes run in the background while the
//! prompt stays responsive, and the open session is mirrored to the same
//! session file the one-shot commands use.

use chrono::Local;
use std::io::Write;
use std::path::PathBuf;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};

use crate::app::{self, Context};
use crate::cli::commands::report;
use crate::core::active::ActiveSessionFile;
use crate::core::service::ClockService;
use crate::core::session::WorkerIdentity;
use crate::errors::AppResult;
use crate::report::DEFAULT_REPORT_FILE;
use crate::ui::messages;
use crate::utils::period::parse_period;
use crate::utils::time::{format_epoch, format_float, readable_elapsed};

/// Grace period for pushes still running when the shell exits.
const EXIT_GRACE: Duration = Duration::from_secs(30);

#[derive(Debug, PartialEq, Eq)]
enum ShellCommand {
    In(String),
    Out,
    User(String),
    Dept(String),
    Status,
    Settings,
    Set(String),
    Report(Option<String>),
    Help,
    Quit,
    Empty,
    Unknown(String),
}

fn parse_line(line: &str) -> ShellCommand {
    let line = line.trim();
    let (word, rest) = match line.split_once(char::is_whitespace) {
        Some((w, r)) => (w, r.trim()),
        None => (line, ""),
    };

    match word.to_ascii_lowercase().as_str() {
        "" => ShellCommand::Empty,
        "in" => ShellCommand::In(rest.to_string()),
        "out" => ShellCommand::Out,
        "user" => ShellCommand::User(rest.to_string()),
        "dept" => ShellCommand::Dept(rest.to_string()),
        "status" => ShellCommand::Status,
        "settings" if rest.is_empty() => ShellCommand::Settings,
        "settings" | "set" => ShellCommand::Set(rest.to_string()),
        "report" if rest.is_empty() => ShellCommand::Report(None),
        "report" => ShellCommand::Report(Some(rest.to_string())),
        "help" | "?" => ShellCommand::Help,
        "quit" | "exit" => ShellCommand::Quit,
        _ => ShellCommand::Unknown(word.to_string()),
    }
}

fn print_help() {
    println!("Commands:");
    println!("  in <task>            clock in on a task");
    println!("  out                  clock out and record the session");
    println!("  user <id>            set your worker ID");
    println!("  dept <department>    set your department");
    println!("  status               show the open session");
    println!("  settings             show the remote settings");
    println!("  set key=value        change a remote setting");
    println!("  report [period]      write {DEFAULT_REPORT_FILE}");
    println!("  quit                 leave the shell");
}

fn prompt(service: &ClockService) {
    match service.tracker().open_session() {
        Some(open) => print!("[{}] > ", open.task_description),
        None => print!("> "),
    }
    let _ = std::io::stdout().flush();
}

/// Handle the `shell` subcommand
pub async fn handle(ctx: &Context) -> AppResult<()> {
    let active = ctx.session_file();
    let (mut service, reporter) = app::clock_service(ctx);
    active.restore_into(service.tracker_mut())?;

    messages::header("rClockIn interactive mode");
    print_help();

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        prompt(&service);
        let Some(line) = lines.next_line().await? else {
            println!();
            break;
        };

        match execute(parse_line(&line), &mut service, &active, ctx).await {
            Ok(true) => {}
            Ok(false) => break,
            Err(e) => messages::error(e),
        }
    }

    if let Some(open) = service.tracker().open_session() {
        messages::warning(format!(
            "Still clocked in on '{}'; run `rclockin out` to close it.",
            open.task_description
        ));
    }
    if service.pending_pushes() > 0 {
        messages::info("Waiting for pending remote pushes…");
    }
    service.shutdown(EXIT_GRACE).await;
    let _ = reporter.await;
    Ok(())
}

/// Run one command; `Ok(false)` ends the shell.
async fn execute(
    cmd: ShellCommand,
    service: &mut ClockService,
    active: &ActiveSessionFile,
    ctx: &Context,
) -> AppResult<bool> {
    // another invocation may have opened or closed the session meanwhile
    if matches!(
        cmd,
        ShellCommand::In(_)
            | ShellCommand::Out
            | ShellCommand::User(_)
            | ShellCommand::Dept(_)
            | ShellCommand::Status
    ) {
        active.reload_into(service.tracker_mut())?;
    }

    match cmd {
        ShellCommand::Empty => {}
        ShellCommand::Help => print_help(),
        ShellCommand::Quit => return Ok(false),
        ShellCommand::Unknown(word) => {
            messages::warning(format!("Unknown command '{word}', type `help`."))
        }

        ShellCommand::In(task) => {
            let start = service.clock_in(&task)?.start;
            if let Err(e) = active.save_from(service.tracker()) {
                service.tracker_mut().discard();
                return Err(e);
            }
            messages::success(format!("Clocked in at: {}", format_epoch(start)));
        }
        ShellCommand::Out => {
            let done = service.clock_out()?;
            active.settle_after_close(service.tracker());
            messages::success(format!(
                "Clocked out at: {} ({} h)",
                format_epoch(done.end),
                format_float(done.duration_hours)
            ));
        }

        ShellCommand::User(id) => {
            let identity = WorkerIdentity {
                user_id: id,
                department: service.tracker().identity().department.clone(),
            };
            service.set_identity(identity);
            active.save_from(service.tracker())?;
        }
        ShellCommand::Dept(dept) => {
            let identity = WorkerIdentity {
                user_id: service.tracker().identity().user_id.clone(),
                department: dept,
            };
            service.set_identity(identity);
            active.save_from(service.tracker())?;
        }

        ShellCommand::Status => match service.tracker().status() {
            Some((open, elapsed)) => messages::info(format!(
                "Working on '{}' for {} (pending pushes: {})",
                open.task_description,
                readable_elapsed(elapsed),
                service.pending_pushes()
            )),
            None => messages::info("Not clocked in."),
        },

        ShellCommand::Settings => {
            println!("{}", serde_json::to_string_pretty(service.settings())?);
        }
        ShellCommand::Set(assignment) => {
            let mut settings = service.settings().clone();
            settings.set(&assignment)?;
            let tokens = app::token_cache(&ctx.paths, &settings);
            service.update_settings(settings, tokens).await?;
            messages::success("Settings saved.");
        }

        ShellCommand::Report(period) => {
            let range = match period {
                Some(p) => Some(parse_period(&p, Local::now().date_naive())?),
                None => None,
            };
            report::generate(ctx, range, &PathBuf::from(DEFAULT_REPORT_FILE))?;
        }
    }
    Ok(true)
}
