use crate::app::Context;
use crate::config::Settings;
use crate::errors::AppResult;
use tracing::info;

/// Handle the `init` command
///
/// This creates:
///  - the data directory (if missing)
///  - `settings.json` with empty remote settings (an existing file is kept)
///
/// The ledger is created by the first clock-out.
pub fn handle(ctx: &Context) -> AppResult<()> {
    println!("⚙️  Initializing rClockIn…");

    ctx.paths.ensure_dir()?;

    let settings_file = ctx.paths.settings_file();
    if settings_file.exists() {
        println!("📄 Settings file already present: {}", settings_file.display());
    } else {
        Settings::default().save(&settings_file)?;
        info!(path = %settings_file.display(), "default settings written");
        println!("📄 Settings file : {}", settings_file.display());
    }
    println!("🗂️  Ledger       : {}", ctx.paths.ledger_file().display());

    println!("🎉 rClockIn initialization completed!");
    Ok(())
}
