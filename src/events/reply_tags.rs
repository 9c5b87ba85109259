//! Replying to one of the bot's post messages tags that post.
//!
//! The bot's tagme prompts start with the post id, so a reply like
//! `fox outdoors art:someone source:https://...` can be applied without
//! naming the post.

use anyhow::Result;

use crate::{
    booru::{self, BooruApi, TAGME_THRESHOLD},
    serenity, Data, MessageExt as _,
};

/// The message a reply points at.
#[derive(Clone, Copy, Debug)]
pub struct Referenced<'a> {
    pub author: serenity::UserId,
    pub content: &'a str,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ReplyState {
    NotAReply,
    ReplyToOther,
    MissingPostId,
    TagCommand { post_id: u64 },
}

/// The post id a bot message refers to: the last word of its first line.
/// Only messages that lead with a numeric id refer to a post at all.
#[must_use]
pub fn post_id_of(content: &str) -> Option<u64> {
    content.split_whitespace().next()?.parse::<u64>().ok()?;
    content.lines().next()?.split_whitespace().last()?.parse().ok()
}

#[must_use]
pub fn classify(referenced: Option<Referenced<'_>>, bot_id: serenity::UserId) -> ReplyState {
    let Some(referenced) = referenced else { return ReplyState::NotAReply };
    if referenced.author != bot_id {
        return ReplyState::ReplyToOther;
    }

    match post_id_of(referenced.content) {
        Some(post_id) => ReplyState::TagCommand { post_id },
        None => ReplyState::MissingPostId,
    }
}

#[derive(Debug, Default, PartialEq, Eq)]
pub struct TagReply {
    pub tags: Vec<String>,
    pub source: Option<String>,
}

#[must_use]
pub fn parse_tag_reply(content: &str) -> TagReply {
    let mut reply = TagReply::default();
    for word in content.split_whitespace() {
        match word.strip_prefix("source:") {
            Some(source) if !source.is_empty() => reply.source = Some(source.to_owned()),
            Some(_) => {}
            None => reply.tags.push(word.to_owned()),
        }
    }

    reply
}

/// What applying a reply changed, used to pick reactions.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct Applied {
    pub tags: Vec<String>,
    pub source_added: bool,
    pub tagme_free: bool,
}

async fn is_real_tag(booru: &dyn BooruApi, tag: &str) -> bool {
    if tag.contains("art:") {
        return true;
    }

    booru.tag_exists(tag).await.unwrap_or_else(|err| {
        tracing::warn!("Could not check tag {tag}: {err:?}");
        false
    })
}

pub async fn apply(booru: &dyn BooruApi, post_id: u64, reply: &TagReply) -> Result<Applied> {
    let mut applied = Applied::default();
    for tag in &reply.tags {
        if is_real_tag(booru, tag).await {
            applied.tags.push(tag.clone());
        }
    }

    booru.edit_tags(post_id, &applied.tags, &[]).await?;
    tracing::info!("Added {:?} to {post_id}", applied.tags);

    let post = booru.post(post_id).await?;
    applied.tagme_free = !post.has_tag("tagme");
    if !applied.tagme_free && post.tags().count() > TAGME_THRESHOLD {
        tracing::info!("Clearing tagme on {post_id}");
        booru::clear_tags(booru, post_id, &["tagme"]).await?;
        applied.tagme_free = true;
    }

    if let Some(source) = &reply.source {
        booru.append_source(post_id, source).await?;
        booru::clear_tags(booru, post_id, &["missing_source"]).await?;

        tracing::info!("Source URL {source} appended to post {post_id}");
        applied.source_added = true;
    }

    Ok(applied)
}

pub async fn handle(ctx: &serenity::Context, data: &Data, message: &serenity::Message) -> Result<()> {
    let bot_id = ctx.cache.current_user().id;
    let referenced = message.referenced_message.as_deref().map(|referenced| Referenced {
        author: referenced.author.id,
        content: &referenced.content,
    });

    let post_id = match classify(referenced, bot_id) {
        ReplyState::TagCommand { post_id } => post_id,
        ReplyState::MissingPostId => {
            tracing::debug!("Reply to a bot message without a post id, ignoring.");
            return Ok(());
        }
        ReplyState::NotAReply | ReplyState::ReplyToOther => return Ok(()),
    };

    let applied = apply(&*data.booru, post_id, &parse_tag_reply(&message.content)).await?;

    message.react_str(&ctx.http, "🙏").await?;
    if applied.source_added {
        message.react_str(&ctx.http, "🔗").await?;
    }

    if applied.tagme_free {
        message.react_str(&ctx.http, "✨").await?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use mockall::predicate::{always, eq};

    use super::*;
    use crate::booru::{MockBooruApi, Post};

    const BOT: serenity::UserId = serenity::UserId::new(1);
    const HUMAN: serenity::UserId = serenity::UserId::new(2);

    fn reply_to(author: serenity::UserId, content: &str) -> ReplyState {
        classify(Some(Referenced { author, content }), BOT)
    }

    #[test]
    fn classifies_each_state() {
        assert_eq!(classify(None, BOT), ReplyState::NotAReply);
        assert_eq!(reply_to(HUMAN, "1234"), ReplyState::ReplyToOther);
        assert_eq!(reply_to(BOT, "Fixed some regular maintenance things:"), ReplyState::MissingPostId);
        assert_eq!(reply_to(BOT, ""), ReplyState::MissingPostId);
        assert_eq!(reply_to(BOT, "Please tag post 77"), ReplyState::MissingPostId);
        assert_eq!(reply_to(BOT, "1234\n\nhttps://booru.example/posts/1234"), ReplyState::TagCommand { post_id: 1234 });
    }

    #[test]
    fn post_id_needs_a_leading_number() {
        assert_eq!(post_id_of("Please tag post 77\n88"), None);
        assert_eq!(post_id_of("post 77:\n88"), None);
        assert_eq!(post_id_of("12 then 77\n88"), Some(77));
        assert_eq!(post_id_of("12 then post\n88"), None);
    }

    #[test]
    fn splits_source_from_tags() {
        let reply = parse_tag_reply("fox  art:someone source:https://art.example/1 source:");
        assert_eq!(reply.tags, vec!["fox", "art:someone"]);
        assert_eq!(reply.source.as_deref(), Some("https://art.example/1"));
    }

    #[tokio::test]
    async fn applies_known_tags_and_clears_tagme() {
        let mut booru = MockBooruApi::new();
        booru.expect_tag_exists().returning(|tag| Ok(tag != "notatag"));
        booru
            .expect_edit_tags()
            .with(eq(5), eq(vec![String::from("fox"), String::from("art:someone")]), eq(Vec::<String>::new()))
            .times(1)
            .returning(|_, _, _| Ok(()));
        booru.expect_post().with(eq(5)).returning(|id| {
            Ok(Post {
                id,
                tag_string: String::from("tagme a b c d e f g h"),
                ..Post::default()
            })
        });
        booru
            .expect_edit_tags()
            .with(eq(5), eq(Vec::<String>::new()), eq(vec![String::from("tagme")]))
            .times(1)
            .returning(|_, _, _| Ok(()));

        let applied = apply(&booru, 5, &parse_tag_reply("fox notatag art:someone")).await.unwrap();
        assert_eq!(
            applied,
            Applied {
                tags: vec![String::from("fox"), String::from("art:someone")],
                source_added: false,
                tagme_free: true,
            }
        );
    }

    #[tokio::test]
    async fn source_clears_missing_source() {
        let mut booru = MockBooruApi::new();
        booru.expect_tag_exists().never();
        booru.expect_post().returning(|id| {
            Ok(Post {
                id,
                tag_string: String::from("tagme missing_source"),
                ..Post::default()
            })
        });
        booru.expect_edit_tags().with(eq(9), always(), always()).times(2).returning(|_, _, _| Ok(()));
        booru
            .expect_append_source()
            .with(eq(9), eq("https://art.example/2"))
            .times(1)
            .returning(|_, _| Ok(()));

        let applied = apply(&booru, 9, &parse_tag_reply("source:https://art.example/2")).await.unwrap();
        assert!(applied.source_added);
        assert!(!applied.tagme_free);
    }
}
