use anyhow::Result;
use once_cell::sync::Lazy;
use regex::Regex;

use crate::{booru::BooruApi, serenity, Data};

static CONFIRMATION: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"Found author: `(?P<author>.+?)` and source: <(?P<source>.+?)> for post `(?P<post_id>\d+)`")
        .expect("valid regex")
});

#[derive(Debug, PartialEq, Eq)]
pub struct Confirmation {
    pub author: String,
    pub source: String,
    pub post_id: u64,
}

#[must_use]
pub fn parse_confirmation(content: &str) -> Option<Confirmation> {
    let captures = CONFIRMATION.captures(content)?;
    Some(Confirmation {
        author: captures["author"].to_owned(),
        source: captures["source"].to_owned(),
        post_id: captures["post_id"].parse().ok()?,
    })
}

/// Applies an accepted SauceNAO result to its post.
pub async fn accept(booru: &dyn BooruApi, confirmation: &Confirmation) -> Result<()> {
    booru.append_source(confirmation.post_id, &confirmation.source).await?;
    booru
        .edit_tags(
            confirmation.post_id,
            &[format!("art:{}", confirmation.author)],
            &[String::from("missing_artist"), String::from("missing_source")],
        )
        .await?;

    tracing::info!("Tags and source confirmed for {}!", confirmation.post_id);
    Ok(())
}

/// Handles ✅/❌ from the original poster on a SauceNAO confirmation.
pub async fn handle(ctx: &serenity::Context, data: &Data, reaction: &serenity::Reaction) -> Result<()> {
    let bot_id = ctx.cache.current_user().id;
    let user_id = crate::require!(reaction.user_id, Ok(()));
    if user_id == bot_id {
        return Ok(());
    }

    let accepted = match &reaction.emoji {
        serenity::ReactionType::Unicode(emoji) if emoji == "✅" => true,
        serenity::ReactionType::Unicode(emoji) if emoji == "❌" => false,
        _ => return Ok(()),
    };

    let message = reaction.message(ctx).await?;
    if message.author.id != bot_id {
        return Ok(());
    }

    let original = crate::require!(message.referenced_message.as_deref(), {
        tracing::warn!("No referenced message; cannot determine the OP.");
        Ok(())
    });

    if original.author.id != user_id {
        tracing::info!("Ignoring reaction from non-OP user {user_id}.");
        return Ok(());
    }

    let confirmation = crate::require!(parse_confirmation(&message.content), {
        tracing::warn!("Failed to parse confirmation message: {}", message.content);
        Ok(())
    });

    if accepted {
        accept(&*data.booru, &confirmation).await?;
    } else {
        tracing::warn!("Tags and source rejected for {}.", confirmation.post_id);
    }

    message.delete(ctx).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use mockall::predicate::eq;

    use super::*;
    use crate::booru::MockBooruApi;

    #[test]
    fn ignores_other_bot_messages() {
        assert_eq!(parse_confirmation("1234\n\nhttps://booru.example/posts/1234"), None);
    }

    #[tokio::test]
    async fn accepting_sets_artist_and_source() {
        let confirmation = Confirmation {
            author: String::from("some_artist"),
            source: String::from("https://art.example/1"),
            post_id: 12,
        };

        let mut booru = MockBooruApi::new();
        booru
            .expect_append_source()
            .with(eq(12), eq("https://art.example/1"))
            .times(1)
            .returning(|_, _| Ok(()));
        booru
            .expect_edit_tags()
            .with(
                eq(12),
                eq(vec![String::from("art:some_artist")]),
                eq(vec![String::from("missing_artist"), String::from("missing_source")]),
            )
            .times(1)
            .returning(|_, _, _| Ok(()));

        accept(&booru, &confirmation).await.unwrap();
    }
}
