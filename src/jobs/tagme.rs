use std::sync::Arc;

use anyhow::Result;

use crate::{
    booru::{BooruApi, Post, PostQuery},
    config::BooruCredentials,
    sauce::{SauceApi, SauceInfo},
    sink::{self, Destination},
};

/// Posts a random `tagme` post so it gets tagged by replying to it.
pub struct TagmePrompt {
    pub booru: Arc<dyn BooruApi>,
    pub sauce: Arc<dyn SauceApi>,
    pub credentials: BooruCredentials,
    pub destination: Option<Arc<dyn Destination>>,
}

/// The prompt text. The post id leads so replies can be resolved back to it.
#[must_use]
pub fn prompt(post: &Post, post_url: &str, sauce: Option<&SauceInfo>) -> String {
    let mut text = format!("{}\n\n{post_url}", post.id);
    if let Some(sauce) = sauce {
        text.push_str(&format!("\n\nFound author and source `{}` via SauceNAO.", sauce.tag_hint()));
    }

    text
}

impl TagmePrompt {
    async fn lookup(&self, post: &Post) -> Option<SauceInfo> {
        let file_url = post.file_url.as_deref()?;
        match self.sauce.lookup(file_url).await {
            Ok(found) => found,
            Err(err) => {
                tracing::warn!("SauceNAO lookup failed for post {}: {err:?}", post.id);
                None
            }
        }
    }
}

#[async_trait::async_trait]
impl crate::Looper for TagmePrompt {
    const NAME: &'static str = "Tagme Prompt";
    const MILLIS: u64 = 1000 * 60 * 10;

    async fn loop_func(&self) -> Result<()> {
        let destination = crate::require_channel!(&self.destination, Self::NAME);
        if !destination.exists() {
            tracing::warn!("Could not find maintenance {}.", destination.describe());
            return Ok(());
        }

        if destination.last_message_is_ours().await? {
            tracing::debug!("Last maintenance message is ours, waiting for a reply.");
            return Ok(());
        }

        let posts = self.booru.posts(&PostQuery::new("tagme", 1).random()).await?;
        let Some(post) = posts.first() else {
            tracing::info!("No tagme posts left.");
            return Ok(());
        };

        let sauce = self.lookup(post).await;
        let text = prompt(post, &self.credentials.post_url(post.id), sauce.as_ref());
        sink::deliver(&**destination, &text).await;
        Ok(())
    }
}
