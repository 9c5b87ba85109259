use anyhow::Result;
use poise::Modal as _;

use crate::{booru::NewPost, events::uploads::download, serenity, ApplicationContext, Context, MessageExt as _};

#[derive(Debug, poise::Modal)]
#[name = "Enter Tags"]
struct TagModal {
    #[name = "Tags"]
    #[placeholder = "Enter tags separated by spaces"]
    tags: String,
    #[name = "Rating"]
    #[placeholder = "Rating s, q or e"]
    #[max_length = 1]
    rating: String,
}

async fn reply_ephemeral(ctx: Context<'_>, text: &str) -> Result<()> {
    ctx.send(poise::CreateReply::default().content(text).ephemeral(true)).await?;
    Ok(())
}

/// Uploads the first image of a message with tags entered by hand.
#[poise::command(context_menu_command = "Upload to booru", guild_only)]
pub async fn upload_message(app_ctx: ApplicationContext<'_>, message: serenity::Message) -> Result<()> {
    let ctx = Context::Application(app_ctx);
    let attachment = crate::require!(message.attachments.first(), {
        reply_ephemeral(ctx, "The message you selected doesn't contain directly embedded images!").await
    });

    if !attachment.content_type.as_deref().is_some_and(|kind| kind.starts_with("image/")) {
        return reply_ephemeral(ctx, "The attachment is not an image.").await;
    }

    let http = &ctx.serenity_context().http;
    message.react_str(http, "🤔").await?;

    let input = crate::require!(TagModal::execute(app_ctx).await?, {
        tracing::debug!("Upload modal for {} timed out", message.id);
        Ok(())
    });

    let data = ctx.data();
    let bytes = download(&data.reqwest, &attachment.url).await?;
    message.react_str(http, "⬇").await?;

    let post = NewPost {
        tags: input.tags,
        rating: input.rating.trim().to_lowercase(),
        source: String::new(),
        description: format!("Uploaded by {} via {}", message.author.name, ctx.author().name),
    };

    match data.booru.upload(bytes, attachment.filename.clone(), post).await? {
        Some(post_id) => {
            message.react_str(http, "⬆").await?;
            reply_ephemeral(ctx, &format!("Uploaded as <{}>", data.config.booru.post_url(post_id))).await
        }
        None => {
            message.react_str(http, "✅").await?;
            reply_ephemeral(ctx, "That image has already been posted.").await
        }
    }
}
