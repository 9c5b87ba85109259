use serde::Deserialize;

use crate::watcher::FeedItem;

#[derive(Deserialize, Clone, Debug, Default, PartialEq, Eq)]
pub struct Post {
    pub id: u64,
    #[serde(default)]
    pub tag_string: String,
    #[serde(default)]
    pub tag_string_artist: String,
    #[serde(default)]
    pub source: String,
    #[serde(default)]
    pub rating: Option<String>,
    #[serde(default)]
    pub file_url: Option<String>,
    #[serde(default)]
    pub is_pending: bool,
    #[serde(default)]
    pub is_flagged: bool,
    #[serde(default)]
    pub is_deleted: bool,
}

impl Post {
    pub fn tags(&self) -> impl Iterator<Item = &str> {
        self.tag_string.split_whitespace()
    }

    #[must_use]
    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags().any(|t| t == tag)
    }

    #[must_use]
    pub fn status(&self) -> &'static str {
        if self.is_deleted {
            "deleted"
        } else if self.is_flagged {
            "flagged"
        } else if self.is_pending {
            "pending"
        } else {
            "active"
        }
    }
}

impl FeedItem for Post {
    fn id(&self) -> u64 {
        self.id
    }
}

#[derive(Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct Comment {
    pub id: u64,
    pub post_id: u64,
    pub creator_id: u64,
    #[serde(default)]
    pub body: String,
}

impl FeedItem for Comment {
    fn id(&self) -> u64 {
        self.id
    }
}

/// A favorite record. Its own id increases with every favorite made, unlike the post id.
#[derive(Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct Favorite {
    pub id: u64,
    pub post_id: u64,
    pub user_id: u64,
}

impl FeedItem for Favorite {
    fn id(&self) -> u64 {
        self.id
    }
}

#[derive(Deserialize, Clone, Debug)]
pub struct User {
    pub id: u64,
    pub name: String,
}

#[derive(Deserialize, Clone, Debug)]
pub struct Tag {
    pub name: String,
    #[serde(default)]
    pub post_count: u64,
}

#[derive(Deserialize, Clone, Debug)]
pub struct IqdbMatch {
    pub post_id: u64,
    pub score: f64,
}

#[derive(Deserialize, Clone, Debug)]
pub struct Upload {
    pub id: u64,
    #[serde(default)]
    pub upload_media_assets: Vec<UploadMediaAsset>,
}

#[derive(Deserialize, Clone, Debug)]
pub struct UploadMediaAsset {
    pub id: u64,
}

/// Everything needed to turn an uploaded file into a post.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct NewPost {
    pub tags: String,
    pub rating: String,
    pub source: String,
    pub description: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deserializes_sparse_posts() {
        let post: Post = serde_json::from_str(r#"{"id": 7, "tag_string": "tagme missing_source", "is_pending": true}"#).unwrap();

        assert!(post.has_tag("tagme"));
        assert!(!post.has_tag("missing"));
        assert_eq!(post.status(), "pending");
        assert!(post.source.is_empty());
    }
}
