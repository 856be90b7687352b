use std::sync::Arc;
use std::time::Duration;

use crate::app::{self, Context};
use crate::cli::parser::Commands;
use crate::core::session::SessionTracker;
use crate::errors::AppResult;
use crate::ui::messages;
use crate::utils::clock::SystemClock;
use crate::utils::time::{format_epoch, format_float, readable_elapsed};
use tracing::info;

/// Handle the `in` subcommand
///
/// Only the session file changes; nothing remote happens on clock-in.
pub fn handle_in(cmd: &Commands, ctx: &Context) -> AppResult<()> {
    let Commands::In { task, user, dept } = cmd else {
        return Ok(());
    };

    let active = ctx.session_file();
    let mut tracker = SessionTracker::new(Arc::new(SystemClock));
    active.restore_into(&mut tracker)?;

    let identity = app::merge_identity(tracker.identity(), user.as_deref(), dept.as_deref());
    tracker.set_identity(identity);

    tracker.begin(task)?;
    active.save_from(&tracker)?;

    if let Some(open) = tracker.open_session() {
        info!(task = %open.task_description, "clocked in");
        messages::success(format!(
            "Clocked in on '{}' at {}",
            open.task_description,
            format_epoch(open.start)
        ));
    }
    Ok(())
}

/// Handle the `out` subcommand
pub async fn handle_out(cmd: &Commands, ctx: &Context) -> AppResult<()> {
    let Commands::Out { user, dept, wait } = cmd else {
        return Ok(());
    };

    let active = ctx.session_file();
    let (mut service, reporter) = app::clock_service(ctx);
    active.restore_into(service.tracker_mut())?;

    let identity = app::merge_identity(
        service.tracker().identity(),
        user.as_deref(),
        dept.as_deref(),
    );
    service.set_identity(identity);

    let done = service.clock_out()?;
    // the row is in the ledger now; nothing below returns early
    active.settle_after_close(service.tracker());

    messages::success(format!(
        "Clocked out of '{}' at {} ({} h)",
        done.task_description,
        format_epoch(done.end),
        format_float(done.duration_hours)
    ));

    if service.pending_pushes() > 0 {
        messages::info("Sending the session to the remote list…");
    }
    service.shutdown(Duration::from_secs(*wait)).await;
    let _ = reporter.await;
    Ok(())
}

/// Handle the `status` subcommand
pub fn handle_status(ctx: &Context) -> AppResult<()> {
    let active = ctx.session_file();
    let mut tracker = SessionTracker::new(Arc::new(SystemClock));
    active.restore_into(&mut tracker)?;

    let identity = tracker.identity();
    if !identity.user_id.is_empty() || !identity.department.is_empty() {
        println!("👤 Worker      : {} ({})", identity.user_id, identity.department);
    }

    match tracker.status() {
        Some((open, elapsed)) => {
            println!("🟢 Clocked in  : {}", open.task_description);
            println!("🕘 Since       : {}", format_epoch(open.start));
            println!("⏱️  Elapsed     : {}", readable_elapsed(elapsed));
        }
        None => messages::info("Not clocked in."),
    }

    if !ctx.settings.remote_enabled() {
        messages::warning("Remote sync is not configured; sessions are recorded locally only.");
    }
    Ok(())
}
