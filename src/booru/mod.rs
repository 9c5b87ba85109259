//! The booru HTTP API, behind a trait so loops and handlers can be tested
//! without a live board.

mod client;
pub mod model;
pub mod query;

use anyhow::Result;

pub use client::BooruClient;
pub use model::{Comment, Favorite, NewPost, Post};
pub use query::PostQuery;

/// Tags a post needs before `tagme` is cleared automatically.
pub const TAGME_THRESHOLD: usize = 8;

#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait BooruApi: Send + Sync {
    async fn posts(&self, query: &PostQuery) -> Result<Vec<Post>>;
    async fn post(&self, post_id: u64) -> Result<Post>;
    /// Newest comments first.
    async fn comments(&self, limit: u32) -> Result<Vec<Comment>>;
    async fn username(&self, user_id: u64) -> Result<String>;
    /// Names of users who have favorited anything.
    async fn users_with_favorites(&self, limit: u32) -> Result<Vec<String>>;
    /// Newest favorites first.
    async fn favorites(&self, username: &str, limit: u32) -> Result<Vec<Favorite>>;
    async fn modqueue(&self, limit: u32) -> Result<Vec<Post>>;
    async fn tag_exists(&self, tag: &str) -> Result<bool>;
    /// Adds `add` and removes `remove` from a post's tags in one edit.
    async fn edit_tags(&self, post_id: u64, add: &[String], remove: &[String]) -> Result<()>;
    async fn append_source(&self, post_id: u64, source: &str) -> Result<()>;
    async fn delete_post(&self, post_id: u64, reason: &str) -> Result<()>;
    /// Post id of an existing image that matches `image`, if any.
    async fn find_match(&self, image: Vec<u8>, filename: String) -> Result<Option<u64>>;
    /// Uploads and posts `image`. `None` if the booru already has it.
    async fn upload(&self, image: Vec<u8>, filename: String, post: NewPost) -> Result<Option<u64>>;
}

/// Helper for the common "remove these tags" edit.
pub async fn clear_tags(booru: &dyn BooruApi, post_id: u64, tags: &[&str]) -> Result<()> {
    let remove: Vec<String> = tags.iter().map(|t| (*t).to_owned()).collect();
    booru.edit_tags(post_id, &[], &remove).await
}

/// Computes the tag string after an edit, keeping the original order.
#[must_use]
pub fn edited_tag_string(current: &str, add: &[String], remove: &[String]) -> String {
    let mut tags: Vec<&str> = current
        .split_whitespace()
        .filter(|tag| !remove.iter().any(|r| r == tag))
        .collect();

    for tag in add {
        if !tag.is_empty() && !tags.contains(&tag.as_str()) && !remove.contains(tag) {
            tags.push(tag);
        }
    }

    tags.join(" ")
}
