//! Denylist enforcement: posts carrying a listed tag are deleted.
//!
//! Rules come from a YAML file of the form
//!
//! ```yaml
//! deletions:
//!   some_character: Character requested removal.
//! ```

use std::{
    path::{Path, PathBuf},
    sync::Arc,
};

use anyhow::{Context as _, Result};
use indexmap::IndexMap;
use parking_lot::RwLock;

use crate::{
    booru::{BooruApi, PostQuery},
    config::BooruCredentials,
    sink::{self, Destination},
};

/// Search locations tried after the configured path.
const DEFAULT_PATHS: [&str; 4] = [
    "/app/boorubot/config/deletions.yaml",
    "/app/config/deletions.yaml",
    "boorubot/config/deletions.yaml",
    "config/deletions.yaml",
];

const FETCH_LIMIT: u32 = 1000;
/// Entries listed per section of the report before summarising.
const REPORT_ENTRIES: usize = 10;

pub type Rules = IndexMap<String, String>;

#[derive(serde::Deserialize, Default)]
struct RulesFile {
    #[serde(default)]
    deletions: Rules,
}

pub fn parse_rules(yaml: &str) -> Result<Rules> {
    let file: RulesFile = serde_yaml::from_str(yaml)?;
    Ok(file.deletions)
}

fn fallback_rules() -> Rules {
    IndexMap::from_iter([(String::from("fayanna"), String::from("Character requested removal."))])
}

/// The live rule set, reloadable at runtime.
pub struct DeletionList {
    configured: Option<PathBuf>,
    rules: RwLock<Rules>,
}

impl DeletionList {
    #[must_use]
    pub fn load(configured: Option<PathBuf>) -> Self {
        let rules = Self::read(configured.as_deref());
        Self {
            configured,
            rules: RwLock::new(rules),
        }
    }

    fn read(configured: Option<&Path>) -> Rules {
        let candidates = configured.into_iter().chain(DEFAULT_PATHS.iter().map(Path::new));
        for path in candidates {
            if !path.exists() {
                continue;
            }

            let loaded = std::fs::read_to_string(path)
                .with_context(|| format!("Could not read {}", path.display()))
                .and_then(|yaml| parse_rules(&yaml));

            match loaded {
                Ok(rules) => {
                    tracing::info!("Loaded {} deletion rules from {}", rules.len(), path.display());
                    return rules;
                }
                Err(err) => tracing::debug!("Could not load deletions from {}: {err:?}", path.display()),
            }
        }

        tracing::warn!("No deletions config file found, using default");
        fallback_rules()
    }

    /// Rereads the rules, returning the old and new counts.
    pub fn reload(&self) -> (usize, usize) {
        let rules = Self::read(self.configured.as_deref());
        let new_count = rules.len();
        let old_count = std::mem::replace(&mut *self.rules.write(), rules).len();

        (old_count, new_count)
    }

    #[must_use]
    pub fn snapshot(&self) -> Rules {
        self.rules.read().clone()
    }
}

/// Builds the report body, listing a few of each outcome.
#[must_use]
pub fn summarise(deleted: &[String], failed: &[String]) -> Option<String> {
    fn section(lines: &mut Vec<String>, title: &str, entries: &[String]) {
        lines.push(format!("**{title}:**"));
        lines.extend(entries.iter().take(REPORT_ENTRIES).cloned());
        if entries.len() > REPORT_ENTRIES {
            lines.push(format!("... and {} more", entries.len() - REPORT_ENTRIES));
        }
    }

    if deleted.is_empty() && failed.is_empty() {
        return None;
    }

    let mut lines = Vec::new();
    if !deleted.is_empty() {
        section(&mut lines, "Successfully deleted posts", deleted);
        lines.push(String::new());
    }

    if !failed.is_empty() {
        section(&mut lines, "Failed deletions", failed);
    }

    Some(lines.join("\n"))
}

pub struct DeletionSweep {
    pub booru: Arc<dyn BooruApi>,
    pub credentials: BooruCredentials,
    pub list: Arc<DeletionList>,
    pub destination: Option<Arc<dyn Destination>>,
}

impl DeletionSweep {
    /// Deletes every post matching a rule, returning (deleted, failed) report lines.
    pub async fn sweep(&self, rules: &Rules) -> (Vec<String>, Vec<String>) {
        let (mut deleted, mut failed) = (Vec::new(), Vec::new());

        for (tag, reason) in rules {
            tracing::info!("Checking for posts with tag '{tag}' for deletion.");
            let posts = match self.booru.posts(&PostQuery::new(tag.as_str(), FETCH_LIMIT)).await {
                Ok(posts) => posts,
                Err(err) => {
                    tracing::error!("Could not search for '{tag}': {err:?}");
                    continue;
                }
            };

            if posts.is_empty() {
                tracing::debug!("No posts found with tag '{tag}'.");
                continue;
            }

            tracing::info!("Found {} posts with tag '{tag}'.", posts.len());
            for post in posts {
                let post_url = self.credentials.post_url(post.id);
                tracing::info!("Attempting to delete post {} (tag: {tag}, reason: {reason})", post.id);

                match self.booru.delete_post(post.id, reason).await {
                    Ok(()) => deleted.push(format!("Deleted <{post_url}> (tag: `{tag}`, reason: {reason})")),
                    Err(err) => {
                        tracing::error!("Failed to delete post {}: {err:?}", post.id);
                        failed.push(format!("Failed to delete <{post_url}> (tag: `{tag}`, reason: {reason})"));
                    }
                }
            }
        }

        (deleted, failed)
    }
}

#[async_trait::async_trait]
impl crate::Looper for DeletionSweep {
    const NAME: &'static str = "Deletion Sweep";
    const MILLIS: u64 = 1000 * 60 * 15;

    async fn loop_func(&self) -> Result<()> {
        let rules = self.list.snapshot();
        if rules.is_empty() {
            tracing::debug!("No items in deletion list, skipping.");
            return Ok(());
        }

        let destination = crate::require_channel!(&self.destination, Self::NAME);
        if !destination.exists() {
            tracing::warn!("Could not find maintenance {}.", destination.describe());
            return Ok(());
        }

        let (deleted, failed) = self.sweep(&rules).await;
        if let Some(report) = summarise(&deleted, &failed) {
            sink::deliver_report(&**destination, &format!("**Automatic deletion report:**\n\n{report}")).await;
        } else {
            tracing::debug!("No posts were deleted or failed during this check.");
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write as _;

    use super::*;
    use crate::{booru::MockBooruApi, booru::Post, sink::testing::RecordingDestination, Looper};

    #[test]
    fn parses_rules_in_order() {
        let rules = parse_rules("deletions:\n  zeta: first\n  alpha: second\n").unwrap();
        assert_eq!(rules.keys().collect::<Vec<_>>(), vec!["zeta", "alpha"]);
    }

    #[test]
    fn empty_file_has_no_rules() {
        assert!(parse_rules("other: 1\n").unwrap().is_empty());
    }

    #[test]
    fn loads_and_reloads_configured_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "deletions:\n  some_tag: Requested.").unwrap();

        let list = DeletionList::load(Some(file.path().to_owned()));
        assert_eq!(list.snapshot().get("some_tag").map(String::as_str), Some("Requested."));

        std::fs::write(file.path(), "deletions:\n  a: x\n  b: y\n").unwrap();
        assert_eq!(list.reload(), (1, 2));
    }

    #[test]
    fn summary_caps_each_section() {
        let deleted: Vec<String> = (0..12).map(|i| format!("deleted {i}")).collect();
        let failed = vec![String::from("failed 0")];
        let report = summarise(&deleted, &failed).unwrap();

        assert!(report.starts_with("**Successfully deleted posts:**\ndeleted 0"));
        assert!(report.contains("deleted 9\n... and 2 more\n\n**Failed deletions:**\nfailed 0"));
        assert!(!report.contains("deleted 10"));
        assert_eq!(summarise(&[], &[]), None);
    }

    #[tokio::test]
    async fn deletes_and_reports() {
        let mut booru = MockBooruApi::new();
        booru.expect_posts().returning(|query| {
            assert_eq!(query.tags, "banned");
            Ok(vec![Post { id: 1, ..Post::default() }, Post { id: 2, ..Post::default() }])
        });
        booru.expect_delete_post().returning(|id, reason| {
            assert_eq!(reason, "Requested.");
            if id == 2 { Err(anyhow::anyhow!("forbidden")) } else { Ok(()) }
        });

        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "deletions:\n  banned: Requested.").unwrap();

        let destination = Arc::new(RecordingDestination::default());
        let sweep = DeletionSweep {
            booru: Arc::new(booru),
            credentials: BooruCredentials {
                url: String::from("https://booru.example"),
                user: String::new(),
                key: String::new(),
            },
            list: Arc::new(DeletionList::load(Some(file.path().to_owned()))),
            destination: Some(destination.clone()),
        };

        sweep.loop_func().await.unwrap();

        let sent = destination.sent();
        assert_eq!(sent.len(), 1);
        assert!(sent[0].starts_with("**Automatic deletion report:**"));
        assert!(sent[0].contains("Deleted <https://booru.example/posts/1> (tag: `banned`, reason: Requested.)"));
        assert!(sent[0].contains("Failed to delete <https://booru.example/posts/2>"));
    }
}
