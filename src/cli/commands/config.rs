use crate::app::Context;
use crate::cli::parser::Commands;
use crate::errors::AppResult;
use crate::remote::TargetCache;
use crate::ui::messages;

/// Handle the `config` subcommand
pub async fn handle(cmd: &Commands, ctx: &Context) -> AppResult<()> {
    if let Commands::Config { print_config, set } = cmd {
        let mut settings = ctx.settings.clone();

        if !set.is_empty() {
            for assignment in set {
                settings.set(assignment)?;
            }
            settings.save(&ctx.paths.settings_file())?;

            // site or list may have changed
            TargetCache::persistent(ctx.paths.target_file())
                .invalidate()
                .await;

            messages::success(format!(
                "Settings saved to {}",
                ctx.paths.settings_file().display()
            ));
            if !settings.remote_enabled() {
                messages::warning(
                    "Remote sync stays off until client_id, authority, site_url and list_name are all set.",
                );
            }
        }

        if *print_config || set.is_empty() {
            println!("📄 Current settings:\n");
            println!("{}", serde_json::to_string_pretty(&settings)?);
        }
    }

    Ok(())
}
