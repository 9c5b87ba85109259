mod admin;
mod search;
mod upload;

use anyhow::Result;

use crate::{Command, Context};

/// The `/version` reply, given the access counter after this access.
fn version_reply(version: &str, counter: Result<u64>) -> String {
    let (status, count) = match counter {
        Ok(count) => ("Ready", count.saturating_sub(1).to_string()),
        Err(err) => {
            tracing::error!("Error retrieving key, error was {err:?}");
            ("Not Ready (connected but cant retrieve now)", String::from("None"))
        }
    };

    format!("I am running version `{version}`. DB is `{status}`, access `{count}`")
}

/// Prints the revision/version.
#[poise::command(slash_command)]
pub async fn version(ctx: Context<'_>) -> Result<()> {
    let data = ctx.data();
    let counter = data.store.increment("version_count", 0).await;
    ctx.say(version_reply(&data.config.version, counter)).await?;

    Ok(())
}

#[must_use]
pub fn commands() -> Vec<Command> {
    vec![
        version(),
        search::random(),
        search::fav(),
        upload::upload_message(),
        admin::list_deletions(),
        admin::manual_delete(),
        admin::reload_deletions(),
    ]
}
