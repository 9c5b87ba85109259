//! Process configuration, read once from the environment at startup.
//!
//! A `.env` file in the working directory is honoured. Optional values that
//! fail to parse are logged and ignored rather than aborting startup, only the
//! token, database URL and booru URL are required.

use std::{collections::HashSet, path::PathBuf};

use anyhow::{Context as _, Result};

use crate::serenity::{ChannelId, RoleId};

/// Credentials for the booru HTTP API.
#[derive(Clone, Debug)]
pub struct BooruCredentials {
    pub url: String,
    pub user: String,
    pub key: String,
}

impl BooruCredentials {
    #[must_use]
    pub fn post_url(&self, post_id: u64) -> String {
        format!("{}/posts/{post_id}", self.url)
    }
}

#[derive(Clone, Debug)]
pub struct Config {
    pub token: String,
    pub database_url: String,
    pub booru: BooruCredentials,
    pub saucenao_key: String,
    /// Channels where contributor images are uploaded. The first also receives
    /// comment and favorite relays.
    pub auto_upload_channels: Vec<ChannelId>,
    pub maintenance_channel: Option<ChannelId>,
    pub contributor_roles: HashSet<RoleId>,
    pub version: String,
    pub debug: bool,
    pub deletions_path: Option<PathBuf>,
    pub changelog_path: Option<PathBuf>,
    pub log_webhook: Option<String>,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        if let Err(err) = dotenvy::dotenv() {
            tracing::debug!("No .env file loaded: {err}");
        }

        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let optional = |key: &str| lookup(key).map(|v| v.trim().to_owned()).filter(|v| !v.is_empty());
        let required = |key: &str| optional(key).with_context(|| format!("{key} must be set"));

        Ok(Self {
            token: required("BOT_TOKEN")?,
            database_url: required("DATABASE_URL")?,
            booru: BooruCredentials {
                url: required("BOORU_URL")?.trim_end_matches('/').to_owned(),
                user: optional("BOORU_USER").unwrap_or_default(),
                key: optional("BOORU_KEY").unwrap_or_default(),
            },
            saucenao_key: optional("SAUCENAO_API_KEY").unwrap_or_default(),
            auto_upload_channels: parse_ids(optional("BOORU_AUTO_UPLOAD").as_deref(), "BOORU_AUTO_UPLOAD")
                .map(ChannelId::new)
                .collect(),
            maintenance_channel: parse_ids(optional("BOORU_MAINTENANCE").as_deref(), "BOORU_MAINTENANCE")
                .next()
                .map(ChannelId::new),
            contributor_roles: parse_ids(optional("CONTRIBUTOR_ROLES").as_deref(), "CONTRIBUTOR_ROLES")
                .map(RoleId::new)
                .collect(),
            version: optional("GIT_COMMIT").unwrap_or_else(|| String::from("unknown")),
            debug: optional("DEBUG").is_some_and(|v| matches!(v.to_lowercase().as_str(), "true" | "1" | "t")),
            deletions_path: optional("BOORU_DELETIONS").map(PathBuf::from),
            changelog_path: optional("CHANGELOG_PATH").map(PathBuf::from),
            log_webhook: optional("LOG_WEBHOOK"),
        })
    }

    /// Where comment and favorite relays are posted.
    #[must_use]
    pub fn relay_channel(&self) -> Option<ChannelId> {
        self.auto_upload_channels.first().copied()
    }

    #[must_use]
    pub fn is_auto_upload(&self, channel: ChannelId) -> bool {
        self.auto_upload_channels.contains(&channel)
    }

    #[must_use]
    pub fn tracing_level(&self) -> tracing::Level {
        if self.debug {
            tracing::Level::DEBUG
        } else {
            tracing::Level::INFO
        }
    }
}

/// Parses a comma separated list of Discord snowflakes, skipping junk and zero.
fn parse_ids<'a>(raw: Option<&'a str>, key: &'a str) -> impl Iterator<Item = u64> + 'a {
    raw.unwrap_or_default()
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .filter_map(move |s| match s.parse::<u64>() {
            Ok(0) | Err(_) => {
                tracing::warn!("Ignoring invalid id {s:?} in {key}");
                None
            }
            Ok(id) => Some(id),
        })
}
