//! SauceNAO reverse image search.

use anyhow::{Context as _, Result};
use serde::Deserialize;

const SAUCENAO_URL: &str = "https://saucenao.com/search.php";

/// Results below this similarity are ignored.
pub const MIN_SIMILARITY: f64 = 80.0;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SauceInfo {
    /// Artist name with spaces replaced, ready to be used as a tag.
    pub author: String,
    pub source: String,
}

impl SauceInfo {
    /// The tag command a user can paste as a reply to attach this info.
    #[must_use]
    pub fn tag_hint(&self) -> String {
        format!("art:{} source:{}", self.author, self.source)
    }
}

#[async_trait::async_trait]
pub trait SauceApi: Send + Sync {
    async fn lookup(&self, image_url: &str) -> Result<Option<SauceInfo>>;
}

pub struct SauceNao {
    reqwest: reqwest::Client,
    api_key: String,
}

impl SauceNao {
    #[must_use]
    pub fn new(reqwest: reqwest::Client, api_key: String) -> Self {
        Self { reqwest, api_key }
    }
}

#[async_trait::async_trait]
impl SauceApi for SauceNao {
    async fn lookup(&self, image_url: &str) -> Result<Option<SauceInfo>> {
        if self.api_key.is_empty() {
            tracing::debug!("No SauceNAO key configured, skipping lookup");
            return Ok(None);
        }

        let response: SauceResponse = self
            .reqwest
            .get(SAUCENAO_URL)
            .query(&[("output_type", "2"), ("numres", "1"), ("api_key", self.api_key.as_str()), ("url", image_url)])
            .send()
            .await
            .context("SauceNAO request failed")?
            .error_for_status()
            .context("SauceNAO rejected request")?
            .json()
            .await
            .context("SauceNAO returned malformed results")?;

        Ok(best_match(&response))
    }
}

#[derive(Deserialize, Debug, Default)]
pub struct SauceResponse {
    #[serde(default)]
    results: Vec<SauceResult>,
}

#[derive(Deserialize, Debug)]
struct SauceResult {
    header: SauceHeader,
    #[serde(default)]
    data: serde_json::Value,
}

#[derive(Deserialize, Debug)]
struct SauceHeader {
    similarity: String,
}

/// Picks the top result if it is similar enough and links somewhere.
#[must_use]
pub fn best_match(response: &SauceResponse) -> Option<SauceInfo> {
    let top = response.results.first()?;
    let similarity: f64 = top.header.similarity.parse().ok()?;
    if similarity < MIN_SIMILARITY {
        return None;
    }

    let source = top.data.get("ext_urls")?.as_array()?.first()?.as_str()?.to_owned();
    let author = ["author_name", "member_name", "creator", "artist"]
        .into_iter()
        .find_map(|key| match top.data.get(key)? {
            serde_json::Value::String(name) => Some(name.clone()),
            serde_json::Value::Array(names) => names.first()?.as_str().map(str::to_owned),
            _ => None,
        })
        .unwrap_or_else(|| String::from("Unknown (checked with SauceNAO)"));

    Some(SauceInfo {
        author: author.replace(' ', "_"),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn response(json: &str) -> SauceResponse {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn takes_confident_match() {
        let info = best_match(&response(
            r#"{"results": [{"header": {"similarity": "91.5"}, "data": {"ext_urls": ["https://art.example/1"], "member_name": "Some Artist"}}]}"#,
        ))
        .unwrap();

        assert_eq!(info.author, "Some_Artist");
        assert_eq!(info.source, "https://art.example/1");
        assert_eq!(info.tag_hint(), "art:Some_Artist source:https://art.example/1");
    }

    #[test]
    fn creator_lists_use_first_name() {
        let info = best_match(&response(
            r#"{"results": [{"header": {"similarity": "85"}, "data": {"ext_urls": ["https://x"], "creator": ["first", "second"]}}]}"#,
        ))
        .unwrap();

        assert_eq!(info.author, "first");
    }

    #[test]
    fn ignores_weak_or_sourceless_matches() {
        assert_eq!(
            best_match(&response(r#"{"results": [{"header": {"similarity": "42.0"}, "data": {"ext_urls": ["https://x"]}}]}"#)),
            None
        );
        assert_eq!(
            best_match(&response(r#"{"results": [{"header": {"similarity": "99.0"}, "data": {}}]}"#)),
            None
        );
        assert_eq!(best_match(&SauceResponse::default()), None);
    }
}
