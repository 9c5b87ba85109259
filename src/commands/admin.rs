use anyhow::Result;
use itertools::Itertools as _;

use crate::{
    jobs::deletions::Rules,
    sink::{self, ChannelDestination},
    Context,
};

#[must_use]
pub fn describe_rules(rules: &Rules) -> String {
    if rules.is_empty() {
        return String::from("No items in deletion list.");
    }

    let listed = rules.iter().map(|(tag, reason)| format!("`{tag}`: {reason}")).join("\n");
    format!("**Current deletion list:**\n{listed}")
}

/// List all tags in the deletion list.
#[poise::command(prefix_command, guild_only, required_permissions = "ADMINISTRATOR")]
pub async fn list_deletions(ctx: Context<'_>) -> Result<()> {
    let rules = ctx.data().deletions.snapshot();
    ctx.say(describe_rules(&rules)).await?;
    Ok(())
}

/// Manually delete a specific post.
///
/// Usage: ^manual_delete <post_id> [reason]
#[poise::command(prefix_command, guild_only, required_permissions = "ADMINISTRATOR")]
pub async fn manual_delete(ctx: Context<'_>, post_id: u64, #[rest] reason: Option<String>) -> Result<()> {
    let data = ctx.data();
    let reason = reason.unwrap_or_default();
    let post_url = data.config.booru.post_url(post_id);

    tracing::info!("Manual deletion requested for post {post_id} by {}", ctx.author().name);
    if let Err(err) = data.booru.delete_post(post_id, &reason).await {
        tracing::error!("Manual deletion of {post_id} failed: {err:?}");
        ctx.say(format!("Failed to delete <{post_url}>")).await?;
        return Ok(());
    }

    ctx.say(format!("Successfully deleted <{post_url}> (reason: {reason})")).await?;
    if let Some(channel) = data.config.maintenance_channel {
        let report = format!("**Manual deletion by {}:**\nDeleted <{post_url}> (reason: {reason})", ctx.author().name);
        sink::deliver_report(&ChannelDestination::new(ctx.serenity_context(), channel), &report).await;
    }

    Ok(())
}

/// Reload the deletion list from the YAML configuration file.
#[poise::command(prefix_command, guild_only, required_permissions = "ADMINISTRATOR")]
pub async fn reload_deletions(ctx: Context<'_>) -> Result<()> {
    let (old_count, new_count) = ctx.data().deletions.reload();
    ctx.say(format!("Reloaded deletion list. {old_count} → {new_count} rules loaded.")).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lists_rules_in_file_order() {
        let rules = Rules::from_iter([
            (String::from("zeta"), String::from("Requested.")),
            (String::from("alpha"), String::from("Off topic.")),
        ]);

        assert_eq!(describe_rules(&rules), "**Current deletion list:**\n`zeta`: Requested.\n`alpha`: Off topic.");
        assert_eq!(describe_rules(&Rules::new()), "No items in deletion list.");
    }
}
