use std::{borrow::Cow, fmt::Write as _, sync::Arc};

use anyhow::Result;

use crate::{
    booru::{BooruApi, Post},
    config::BooruCredentials,
    watcher::Feed,
};

/// Tag lists in the report are cut to this many characters.
const TAG_PREVIEW: usize = 100;

/// Reports posts newly waiting in the moderation queue.
pub struct ModqueueFeed {
    pub booru: Arc<dyn BooruApi>,
    pub credentials: BooruCredentials,
}

impl ModqueueFeed {
    fn line(&self, post: &Post) -> String {
        let tags = if post.tag_string.is_empty() { "no tags" } else { post.tag_string.as_str() };
        let tags = match tags.char_indices().nth(TAG_PREVIEW) {
            Some((cut, _)) => format!("{}...", &tags[..cut]),
            None => tags.to_owned(),
        };

        format!(
            "- Post {} ({}): <{}>\n  Tags: `{tags}`",
            post.id,
            post.status(),
            self.credentials.post_url(post.id)
        )
    }
}

#[async_trait::async_trait]
impl Feed for ModqueueFeed {
    type Item = Post;

    const NAME: &'static str = "Modqueue Report";
    const MILLIS: u64 = 1000 * 60 * 60;
    const LIMIT: u32 = 100;

    fn key(&self) -> Cow<'_, str> {
        Cow::Borrowed("last_modqueue_id")
    }

    async fn fetch(&self, limit: u32) -> Result<Vec<Post>> {
        self.booru.modqueue(limit).await
    }

    async fn render(&self, post: &Post) -> String {
        self.line(post)
    }

    fn report(&self, batch: &[&Post]) -> Option<String> {
        let mut report = format!("**Modqueue Report ({} items):**\n", batch.len());
        for post in batch {
            write!(report, "\n{}", self.line(post)).ok()?;
        }

        Some(report)
    }
}
