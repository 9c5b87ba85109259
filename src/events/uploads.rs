//! Images posted in chat are matched against the booru, and contributors'
//! new images in auto-upload channels are archived.

use std::collections::HashSet;

use anyhow::{Context as _, Result};
use once_cell::sync::Lazy;
use regex::Regex;

use crate::{
    booru::NewPost,
    sauce::SauceInfo,
    serenity, Data, MessageExt as _, OptionTryUnwrap as _,
};

static IMAGE_URL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^(https?://\S+?\.(?:png|jpg|jpeg|webp|gif|mp4|webm))(?:\?.*)?$").expect("valid regex")
});

const BASE_UPLOAD_TAGS: &str = "tagme discord_archive missing_source missing_artist";
const UPLOAD_RATING: &str = "e";

/// An image found in a message.
#[derive(Debug, PartialEq, Eq)]
pub struct FoundImage {
    pub url: String,
    pub filename: String,
    /// Posted as a bare link rather than an attachment.
    pub linked: bool,
}

/// A message consisting only of an image link.
#[must_use]
pub fn linked_image(content: &str) -> Option<FoundImage> {
    let content = content.trim();
    let captures = IMAGE_URL.captures(content)?;
    let filename = captures[1].rsplit('/').next().unwrap_or("image").to_owned();

    Some(FoundImage {
        url: content.to_owned(),
        filename,
        linked: true,
    })
}

fn find_image(message: &serenity::Message) -> Option<FoundImage> {
    let attachment = message.attachments.first().filter(|attachment| {
        attachment.content_type.as_deref().is_some_and(|kind| kind.starts_with("image/"))
    });

    match attachment {
        Some(attachment) => Some(FoundImage {
            url: attachment.url.clone(),
            filename: attachment.filename.clone(),
            linked: false,
        }),
        None => linked_image(&message.content),
    }
}

/// Tags for an automatic upload from `channel_name`.
#[must_use]
pub fn upload_tags(channel_name: &str) -> String {
    let channel_name = channel_name.to_lowercase();
    let mut tags = String::from(BASE_UPLOAD_TAGS);
    for extra in ["vore", "meme"] {
        if channel_name.contains(extra) {
            tags.push(' ');
            tags.push_str(extra);
        }
    }

    tags
}

#[must_use]
pub fn is_contributor(roles: &[serenity::RoleId], allowed: &HashSet<serenity::RoleId>) -> bool {
    roles.iter().any(|role| allowed.contains(role))
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UploadDecision {
    /// The image is already on the booru as this post.
    AlreadyPosted(u64),
    NotAutoUploadChannel,
    NotContributor,
    Upload,
}

/// Whether an image should be archived. A match always wins, so the
/// existing post gets reported even outside auto-upload channels.
#[must_use]
pub fn decide_upload(existing: Option<u64>, auto_upload_channel: bool, contributor: bool) -> UploadDecision {
    if let Some(post_id) = existing {
        UploadDecision::AlreadyPosted(post_id)
    } else if !auto_upload_channel {
        UploadDecision::NotAutoUploadChannel
    } else if !contributor {
        UploadDecision::NotContributor
    } else {
        UploadDecision::Upload
    }
}

/// The reply asking the uploader to confirm a SauceNAO result.
#[must_use]
pub fn confirmation(sauce: &SauceInfo, post_id: u64) -> String {
    format!(
        "Found author: `{}` and source: <{}> for post `{post_id}` via SauceNAO.\n\
        Please react with ✅ to confirm or ❌ if incorrect!",
        sauce.author, sauce.source
    )
}

pub async fn download(reqwest: &reqwest::Client, url: &str) -> Result<Vec<u8>> {
    let bytes = reqwest
        .get(url)
        .send()
        .await?
        .error_for_status()
        .with_context(|| format!("Could not download {url}"))?
        .bytes()
        .await?;

    Ok(bytes.to_vec())
}

pub async fn handle(ctx: &serenity::Context, data: &Data, message: &serenity::Message) -> Result<()> {
    let image = crate::require!(find_image(message), Ok(()));
    let bytes = download(&data.reqwest, &image.url).await?;
    if image.linked {
        tracing::info!("Caught a linked image from {}", message.author.name);
        message.react_str(&ctx.http, "🔗").await?;
    }

    let auto_upload_channel = data.config.is_auto_upload(message.channel_id);
    let existing = data.booru.find_match(bytes.clone(), image.filename.clone()).await?;
    let contributor = if auto_upload_channel && existing.is_none() {
        let member = message.member.as_deref().try_unwrap()?;
        is_contributor(&member.roles, &data.config.contributor_roles)
    } else {
        false
    };

    match decide_upload(existing, auto_upload_channel, contributor) {
        UploadDecision::AlreadyPosted(post_id) => {
            message.react_post_id(&ctx.http, post_id).await?;
            return Ok(());
        }
        UploadDecision::NotAutoUploadChannel => {
            tracing::debug!("Not uploading image in {}, not an auto upload channel", message.channel_id);
            return Ok(());
        }
        UploadDecision::NotContributor => {
            tracing::info!("User {} has no contributor role, disabling auto-upload", message.author.name);
            return Ok(());
        }
        UploadDecision::Upload => {}
    }

    message.react_str(&ctx.http, "💎").await?;
    let channel_name = message.channel_id.name(ctx).await.unwrap_or_default();
    let post = NewPost {
        tags: upload_tags(&channel_name),
        rating: String::from(UPLOAD_RATING),
        source: String::new(),
        description: format!("Uploaded by {} in channel {channel_name}", message.author.name),
    };

    let post_id = crate::require!(data.booru.upload(bytes, image.filename, post).await?, {
        tracing::warn!("Booru refused upload of {}, it may already exist", image.url);
        Ok(())
    });

    message.react_post_id(&ctx.http, post_id).await?;
    data.store.increment("image_count", 1).await?;

    tracing::debug!("Fetching sauce info");
    match data.sauce.lookup(&image.url).await {
        Ok(Some(sauce)) => {
            let reply = message.reply(ctx, confirmation(&sauce, post_id)).await?;
            reply.react_str(&ctx.http, "✅").await?;
            reply.react_str(&ctx.http, "❌").await?;
        }
        Ok(None) => tracing::warn!("SauceNAO couldn't find source for {}", image.url),
        Err(err) => tracing::error!("SauceNAO error: {err:?}"),
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recognises_bare_image_links() {
        let found = linked_image(" https://cdn.example/art/fox.PNG?width=300 ").unwrap();
        assert_eq!(found.url, "https://cdn.example/art/fox.PNG?width=300");
        assert_eq!(found.filename, "fox.PNG");
        assert!(found.linked);

        assert_eq!(linked_image("look at this https://cdn.example/fox.png"), None);
        assert_eq!(linked_image("https://cdn.example/page.html"), None);
    }

    #[test]
    fn channel_name_adds_tags() {
        assert_eq!(upload_tags("art-dump"), BASE_UPLOAD_TAGS);
        assert_eq!(upload_tags("Vore-Memes"), format!("{BASE_UPLOAD_TAGS} vore meme"));
    }

    #[test]
    fn contributor_needs_an_allowed_role() {
        let allowed = HashSet::from([serenity::RoleId::new(7)]);
        assert!(is_contributor(&[serenity::RoleId::new(3), serenity::RoleId::new(7)], &allowed));
        assert!(!is_contributor(&[serenity::RoleId::new(3)], &allowed));
        assert!(!is_contributor(&[], &allowed));
    }

    #[test]
    fn upload_decision_order() {
        assert_eq!(decide_upload(Some(42), true, true), UploadDecision::AlreadyPosted(42));
        assert_eq!(decide_upload(Some(42), false, false), UploadDecision::AlreadyPosted(42));
        assert_eq!(decide_upload(None, false, true), UploadDecision::NotAutoUploadChannel);
        assert_eq!(decide_upload(None, true, false), UploadDecision::NotContributor);
        assert_eq!(decide_upload(None, true, true), UploadDecision::Upload);
    }

    #[test]
    fn confirmation_round_trips_through_parser() {
        let sauce = SauceInfo {
            author: String::from("some_artist"),
            source: String::from("https://art.example/1"),
        };

        let parsed = crate::events::confirm::parse_confirmation(&confirmation(&sauce, 321)).unwrap();
        assert_eq!(parsed.author, "some_artist");
        assert_eq!(parsed.source, "https://art.example/1");
        assert_eq!(parsed.post_id, 321);
    }
}
