use anyhow::Result;

use crate::{Context, Data};

pub type FrameworkError<'a> = poise::FrameworkError<'a, Data, anyhow::Error>;

async fn reply_ephemeral(ctx: Context<'_>, text: impl Into<String>) -> Result<()> {
    ctx.send(poise::CreateReply::default().content(text).ephemeral(true)).await?;
    Ok(())
}

async fn handle(error: FrameworkError<'_>) -> Result<()> {
    match error {
        poise::FrameworkError::Command { error, ctx, .. } => {
            tracing::error!("Error in command {}: {error:?}", ctx.command().qualified_name);
            reply_ephemeral(ctx, "An unknown error occurred, sorry!").await?;
        }
        poise::FrameworkError::CooldownHit { remaining_cooldown, ctx, .. } => {
            let text = format!("`/{}` is on cooldown, please try again in {:.1} seconds!", ctx.command().name, remaining_cooldown.as_secs_f32());
            reply_ephemeral(ctx, text).await?;
        }
        poise::FrameworkError::MissingUserPermissions { missing_permissions, ctx, .. } => {
            let text = match missing_permissions {
                Some(permissions) => format!("You cannot run this command as you are missing: {permissions}"),
                None => String::from("You do not have permission to run this command."),
            };

            reply_ephemeral(ctx, text).await?;
        }
        poise::FrameworkError::NsfwOnly { ctx, .. } => {
            tracing::debug!("Ignored {} outside an NSFW channel", ctx.command().name);
            reply_ephemeral(ctx, "This command can only be used in NSFW channels.").await?;
        }
        error => poise::builtins::on_error(error).await?,
    }

    Ok(())
}

/// The framework's `on_error` hook.
pub async fn on_error(error: FrameworkError<'_>) {
    if let Err(err) = handle(error).await {
        tracing::error!("Error while handling error: {err:?}");
    }
}
