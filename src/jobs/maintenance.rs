use std::sync::Arc;

use anyhow::Result;

use crate::{
    booru::{BooruApi, Post, PostQuery},
    config::BooruCredentials,
    sink::{self, Destination},
};

const SWEEP_TAGS: [&str; 3] = ["missing_source", "missing_artist", "bad_link"];
const SWEEP_SAMPLE: u32 = 20;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Fix {
    Remove(&'static str),
    Add(&'static str),
}

impl Fix {
    fn describe(self, post_url: &str) -> String {
        match self {
            Self::Remove(tag) => format!("Removed `{tag}` from <{post_url}>"),
            Self::Add(tag) => format!("Added `{tag}` to <{post_url}>"),
        }
    }
}

/// Tag corrections `post` needs.
#[must_use]
pub fn plan_fixes(post: &Post) -> Vec<Fix> {
    let mut fixes = Vec::new();

    if post.has_tag("missing_source") && !post.source.trim().is_empty() {
        fixes.push(Fix::Remove("missing_source"));
    }

    if post.has_tag("missing_artist") && !post.tag_string_artist.trim().is_empty() {
        fixes.push(Fix::Remove("missing_artist"));
    }

    if !post.has_tag("vore") && post.tags().any(|tag| tag.contains("vore") || tag.contains("unbirth")) {
        fixes.push(Fix::Add("vore"));
    }

    fixes
}

/// Samples posts flagged as incomplete and clears flags that no longer apply.
pub struct MaintenanceSweep {
    pub booru: Arc<dyn BooruApi>,
    pub credentials: BooruCredentials,
    pub destination: Option<Arc<dyn Destination>>,
}

impl MaintenanceSweep {
    /// Applies fixes to a random sample, returning a line per change made.
    pub async fn sweep(&self) -> Result<Vec<String>> {
        let posts = self.booru.posts(&PostQuery::any_of(&SWEEP_TAGS, SWEEP_SAMPLE).random()).await?;
        let mut changes = Vec::new();

        for post in posts {
            let post_url = self.credentials.post_url(post.id);
            for fix in plan_fixes(&post) {
                let (add, remove) = match fix {
                    Fix::Add(tag) => (vec![tag.to_owned()], Vec::new()),
                    Fix::Remove(tag) => (Vec::new(), vec![tag.to_owned()]),
                };

                match self.booru.edit_tags(post.id, &add, &remove).await {
                    Ok(()) => changes.push(fix.describe(&post_url)),
                    Err(err) => tracing::error!("Could not apply {fix:?} to post {}: {err:?}", post.id),
                }
            }
        }

        Ok(changes)
    }
}

#[async_trait::async_trait]
impl crate::Looper for MaintenanceSweep {
    const NAME: &'static str = "Maintenance Sweep";
    const MILLIS: u64 = 1000 * 60 * 30;

    async fn loop_func(&self) -> Result<()> {
        tracing::debug!("Running check and report posts.");

        let changes = self.sweep().await?;
        if changes.is_empty() {
            tracing::info!("No changes made during this check.");
            return Ok(());
        }

        let destination = crate::require_channel!(&self.destination, Self::NAME);
        if !destination.exists() {
            tracing::warn!("Could not find maintenance {}.", destination.describe());
            return Ok(());
        }

        let report = format!("Fixed some regular maintenance things:\n\n{}", changes.join("\n"));
        sink::deliver_report(&**destination, &report).await;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{booru::MockBooruApi, sink::testing::RecordingDestination, Looper};

    fn post(id: u64, tags: &str, source: &str, artist: &str) -> Post {
        Post {
            id,
            tag_string: tags.to_owned(),
            source: source.to_owned(),
            tag_string_artist: artist.to_owned(),
            ..Post::default()
        }
    }

    #[test]
    fn fixes_follow_post_state() {
        assert_eq!(plan_fixes(&post(1, "missing_source fox", "https://src", "")), vec![Fix::Remove("missing_source")]);
        assert_eq!(plan_fixes(&post(2, "missing_artist", "", "someone")), vec![Fix::Remove("missing_artist")]);
        assert_eq!(plan_fixes(&post(3, "missing_source oral_vore", "", "")), vec![Fix::Add("vore")]);
        assert_eq!(plan_fixes(&post(4, "vore unbirth missing_source", "", "")), Vec::new());
    }

    #[tokio::test]
    async fn reports_applied_fixes() {
        let mut booru = MockBooruApi::new();
        booru.expect_posts().returning(|query| {
            assert!(query.random);
            Ok(vec![post(5, "missing_source missing_artist", "https://src", "artist")])
        });
        booru.expect_edit_tags().times(2).returning(|_, _, _| Ok(()));

        let destination = Arc::new(RecordingDestination::default());
        let sweep = MaintenanceSweep {
            booru: Arc::new(booru),
            credentials: BooruCredentials {
                url: String::from("https://booru.example"),
                user: String::new(),
                key: String::new(),
            },
            destination: Some(destination.clone()),
        };

        sweep.loop_func().await.unwrap();

        assert_eq!(
            destination.sent(),
            vec![String::from(
                "Fixed some regular maintenance things:\n\n\
                Removed `missing_source` from <https://booru.example/posts/5>\n\
                Removed `missing_artist` from <https://booru.example/posts/5>"
            )]
        );
    }
}
