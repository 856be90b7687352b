use chrono::Local;

use crate::app::{self, Context};
use crate::errors::{AppError, AppResult};
use crate::ui::messages;

/// Handle the `login` subcommand: run the sign-in now and cache the account.
pub async fn handle(ctx: &Context) -> AppResult<()> {
    if ctx.settings.client_id.is_empty() || ctx.settings.authority.is_empty() {
        return Err(AppError::Config(
            "set client_id and authority first (rclockin config --set key=value)".into(),
        ));
    }

    let tokens = app::token_cache(&ctx.paths, &ctx.settings);
    let token = tokens.get(&ctx.settings.scopes).await?;

    messages::success(format!(
        "Signed in, token valid until {}",
        token
            .expires_at
            .with_timezone(&Local)
            .format("%Y-%m-%d %H:%M:%S")
    ));
    Ok(())
}
