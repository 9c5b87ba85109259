use anyhow::{Context as _, Result};
use reqwest::{multipart, Method, RequestBuilder};
use serde::de::DeserializeOwned;

use super::{
    model::{IqdbMatch, Tag, Upload, User},
    BooruApi, Comment, Favorite, NewPost, Post, PostQuery,
};
use crate::config::BooruCredentials;

/// Minimum IQDB similarity for an upload to count as already posted.
const IQDB_MATCH_SCORE: f64 = 90.0;

/// Danbooru-compatible JSON API client.
pub struct BooruClient {
    reqwest: reqwest::Client,
    credentials: BooruCredentials,
}

impl BooruClient {
    #[must_use]
    pub fn new(reqwest: reqwest::Client, credentials: BooruCredentials) -> Self {
        Self { reqwest, credentials }
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        self.reqwest
            .request(method, format!("{}/{path}", self.credentials.url))
            .basic_auth(&self.credentials.user, Some(&self.credentials.key))
    }

    async fn send<T: DeserializeOwned>(&self, request: RequestBuilder, what: &str) -> Result<T> {
        request
            .send()
            .await
            .with_context(|| format!("Booru request for {what} failed"))?
            .error_for_status()
            .with_context(|| format!("Booru rejected request for {what}"))?
            .json()
            .await
            .with_context(|| format!("Booru returned malformed {what}"))
    }

    async fn send_empty(&self, request: RequestBuilder, what: &str) -> Result<()> {
        request
            .send()
            .await
            .with_context(|| format!("Booru request to {what} failed"))?
            .error_for_status()
            .with_context(|| format!("Booru rejected request to {what}"))?;

        Ok(())
    }
}

#[async_trait::async_trait]
impl BooruApi for BooruClient {
    async fn posts(&self, query: &PostQuery) -> Result<Vec<Post>> {
        let request = self.request(Method::GET, "posts.json").query(&query.params());
        self.send(request, "posts").await
    }

    async fn post(&self, post_id: u64) -> Result<Post> {
        self.send(self.request(Method::GET, &format!("posts/{post_id}.json")), "post").await
    }

    async fn comments(&self, limit: u32) -> Result<Vec<Comment>> {
        let request = self
            .request(Method::GET, "comments.json")
            .query(&[("group_by", "comment")])
            .query(&[("limit", limit)]);

        self.send(request, "comments").await
    }

    async fn username(&self, user_id: u64) -> Result<String> {
        let user: User = self.send(self.request(Method::GET, &format!("users/{user_id}.json")), "user").await?;
        Ok(user.name)
    }

    async fn users_with_favorites(&self, limit: u32) -> Result<Vec<String>> {
        let request = self
            .request(Method::GET, "users.json")
            .query(&[("search[favorite_count]", ">0")])
            .query(&[("limit", limit)]);

        let users: Vec<User> = self.send(request, "users").await?;
        Ok(users.into_iter().map(|u| u.name).collect())
    }

    async fn favorites(&self, username: &str, limit: u32) -> Result<Vec<Favorite>> {
        let request = self
            .request(Method::GET, "favorites.json")
            .query(&[("search[user_name]", username)])
            .query(&[("limit", limit)]);

        self.send(request, "favorites").await
    }

    async fn modqueue(&self, limit: u32) -> Result<Vec<Post>> {
        let request = self.request(Method::GET, "modqueue.json").query(&[("limit", limit)]);
        self.send(request, "modqueue").await
    }

    async fn tag_exists(&self, tag: &str) -> Result<bool> {
        let request = self.request(Method::GET, "tags.json").query(&[("search[name]", tag)]);
        let tags: Vec<Tag> = self.send(request, "tags").await?;

        Ok(tags.iter().any(|t| t.name == tag && t.post_count > 0))
    }

    async fn edit_tags(&self, post_id: u64, add: &[String], remove: &[String]) -> Result<()> {
        let current = self.post(post_id).await?;
        let tag_string = super::edited_tag_string(&current.tag_string, add, remove);
        if tag_string == current.tag_string {
            return Ok(());
        }

        let request = self
            .request(Method::PUT, &format!("posts/{post_id}.json"))
            .form(&[("post[tag_string]", tag_string)]);

        self.send_empty(request, "edit tags").await
    }

    async fn append_source(&self, post_id: u64, source: &str) -> Result<()> {
        let current = self.post(post_id).await?;
        let existing = current.source.trim();
        if existing.split_whitespace().any(|s| s == source) {
            return Ok(());
        }

        let source = if existing.is_empty() {
            source.to_owned()
        } else {
            format!("{existing} {source}")
        };

        let request = self
            .request(Method::PUT, &format!("posts/{post_id}.json"))
            .form(&[("post[source]", source)]);

        self.send_empty(request, "append source").await
    }

    async fn delete_post(&self, post_id: u64, reason: &str) -> Result<()> {
        let request = self
            .request(Method::DELETE, &format!("posts/{post_id}.json"))
            .query(&[("reason", reason)]);

        self.send_empty(request, "delete post").await
    }

    async fn find_match(&self, image: Vec<u8>, filename: String) -> Result<Option<u64>> {
        let form = multipart::Form::new().part("search[file]", multipart::Part::bytes(image).file_name(filename));
        let request = self.request(Method::POST, "iqdb_queries.json").multipart(form);

        let matches: Vec<IqdbMatch> = self.send(request, "iqdb matches").await?;
        Ok(matches
            .into_iter()
            .filter(|m| m.score >= IQDB_MATCH_SCORE)
            .max_by(|a, b| a.score.total_cmp(&b.score))
            .map(|m| m.post_id))
    }

    async fn upload(&self, image: Vec<u8>, filename: String, post: NewPost) -> Result<Option<u64>> {
        let form = multipart::Form::new().part("upload[files][0]", multipart::Part::bytes(image).file_name(filename));
        let upload: Upload = self
            .send(self.request(Method::POST, "uploads.json").multipart(form), "upload")
            .await?;

        let asset = crate::require!(upload.upload_media_assets.first(), {
            tracing::warn!("Upload {} produced no media asset", upload.id);
            Ok(None)
        });

        let response = self
            .request(Method::POST, "posts.json")
            .form(&[
                ("upload_media_asset_id", asset.id.to_string()),
                ("post[tag_string]", post.tags),
                ("post[rating]", post.rating),
                ("post[source]", post.source),
                ("post[artist_commentary_desc]", post.description),
            ])
            .send()
            .await
            .context("Booru request to create post failed")?;

        // The board answers 422 when the media is already posted.
        if response.status() == reqwest::StatusCode::UNPROCESSABLE_ENTITY {
            tracing::info!("Upload {} was already posted", upload.id);
            return Ok(None);
        }

        let created: Post = response
            .error_for_status()
            .context("Booru rejected new post")?
            .json()
            .await
            .context("Booru returned malformed post")?;

        Ok(Some(created.id))
    }
}
