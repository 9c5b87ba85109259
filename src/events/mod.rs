//! Gateway event dispatch.

pub mod confirm;
pub mod reply_tags;
pub mod uploads;

use anyhow::Result;

use crate::{jobs, serenity, sink::ChannelDestination, Data, FrameworkContext};

pub async fn event_handler(
    ctx: &serenity::Context,
    event: &serenity::FullEvent,
    _framework: FrameworkContext<'_>,
    data: &Data,
) -> Result<()> {
    match event {
        serenity::FullEvent::Ready { data_about_bot } => {
            tracing::info!("{} is ready in {} guilds", data_about_bot.user.name, data_about_bot.guilds.len());
            ready(ctx, data).await
        }
        serenity::FullEvent::Message { new_message } => {
            if new_message.author.bot {
                return Ok(());
            }

            let (replied, uploaded) = tokio::join!(
                reply_tags::handle(ctx, data, new_message),
                uploads::handle(ctx, data, new_message),
            );

            if let Err(err) = replied {
                tracing::error!("Reply tagging failed: {err:?}");
            }

            uploaded
        }
        serenity::FullEvent::ReactionAdd { add_reaction } => confirm::handle(ctx, data, add_reaction).await,
        _ => Ok(()),
    }
}

async fn ready(ctx: &serenity::Context, data: &Data) -> Result<()> {
    jobs::start_all(ctx, data);

    let channel = crate::require_channel!(data.config.maintenance_channel, "changelog alerts");
    let destination = ChannelDestination::new(ctx, channel);
    jobs::changelog::announce(
        &*data.store,
        &destination,
        data.config.changelog_path.as_deref(),
        &data.config.version,
    )
    .await?;

    Ok(())
}
