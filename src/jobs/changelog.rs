//! Announces the newest `## Changelog <n>` section of the README once.

use std::path::{Path, PathBuf};

use anyhow::Result;
use once_cell::sync::Lazy;
use regex::Regex;

use crate::{
    sink::{self, Destination},
    store::CursorStore,
};

const LAST_CHANGELOG: &str = "LAST_CHANGELOG";
const DEFAULT_PATHS: [&str; 2] = ["/app/README.md", "README.md"];

static HEADING: Lazy<Regex> = Lazy::new(|| Regex::new(r"## Changelog (\d+)").expect("valid regex"));

/// The last changelog section in `readme`, as its number and trimmed body.
#[must_use]
pub fn parse_latest(readme: &str) -> Option<(u64, String)> {
    let headings: Vec<_> = HEADING.captures_iter(readme).collect();
    let last = headings.last()?;

    let number = last[1].parse().ok()?;
    let body_start = last.get(0)?.end();
    Some((number, readme[body_start..].trim().to_owned()))
}

/// The announcement text for changelog `number`.
#[must_use]
pub fn announcement(number: u64, body: &str, version: &str) -> String {
    format!("# Changelog {number}\n{}", body.replace("{{version}}", version))
}

fn locate(configured: Option<&Path>) -> Option<PathBuf> {
    configured
        .into_iter()
        .chain(DEFAULT_PATHS.iter().map(Path::new))
        .find(|path| path.exists())
        .map(Path::to_path_buf)
}

/// Posts the latest changelog if it has not been posted before.
/// Returns the number announced, if any.
pub async fn announce(
    store: &dyn CursorStore,
    destination: &dyn Destination,
    configured: Option<&Path>,
    version: &str,
) -> Result<Option<u64>> {
    let path = crate::require!(locate(configured), {
        tracing::warn!("Could not find README.md, skipping changelog check.");
        Ok(None)
    });

    tracing::info!("Loading {}", path.display());
    let readme = tokio::fs::read_to_string(&path).await?;
    let (number, body) = crate::require!(parse_latest(&readme), {
        tracing::warn!("No changelog found in {}", path.display());
        Ok(None)
    });

    let last = store.watermark(LAST_CHANGELOG).await?.unwrap_or(0);
    tracing::info!("Changelog is currently {number}/{last}.");
    if number == last {
        tracing::info!("No new changelog to report.");
        return Ok(None);
    }

    if !sink::deliver(destination, &announcement(number, &body, version)).await {
        return Ok(None);
    }

    store.set_watermark(LAST_CHANGELOG, number).await?;
    Ok(Some(number))
}
