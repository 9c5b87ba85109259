use std::{borrow::Cow, sync::Arc};

use anyhow::Result;

use crate::{
    booru::{BooruApi, Comment},
    config::BooruCredentials,
    watcher::Feed,
};

/// Relays new comments on the board.
pub struct CommentFeed {
    pub booru: Arc<dyn BooruApi>,
    pub credentials: BooruCredentials,
}

#[async_trait::async_trait]
impl Feed for CommentFeed {
    type Item = Comment;

    const NAME: &'static str = "Comment Relay";
    const MILLIS: u64 = 1000 * 30;
    const LIMIT: u32 = 20;

    fn key(&self) -> Cow<'_, str> {
        Cow::Borrowed("last_comment_id")
    }

    async fn fetch(&self, limit: u32) -> Result<Vec<Comment>> {
        self.booru.comments(limit).await
    }

    async fn render(&self, comment: &Comment) -> String {
        let username = match self.booru.username(comment.creator_id).await {
            Ok(name) => name,
            Err(err) => {
                tracing::warn!("Could not look up commenter {}: {err:?}", comment.creator_id);
                format!("user #{}", comment.creator_id)
            }
        };

        format!(
            "New comment by {username} on post {}:\n{}\n\n{}",
            comment.post_id,
            comment.body,
            self.credentials.post_url(comment.post_id),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{booru::MockBooruApi, sink::testing::RecordingDestination, store::MemoryStore, watcher::run_cycle};

    fn credentials() -> BooruCredentials {
        BooruCredentials {
            url: String::from("https://booru.example"),
            user: String::new(),
            key: String::new(),
        }
    }

    fn comment(id: u64, creator_id: u64) -> Comment {
        Comment {
            id,
            post_id: 100 + id,
            creator_id,
            body: format!("body {id}"),
        }
    }

    #[tokio::test]
    async fn relays_new_comments_with_usernames() {
        let mut booru = MockBooruApi::new();
        booru
            .expect_comments()
            .returning(|_| Ok(vec![comment(12, 1), comment(11, 2), comment(10, 1)]));
        booru.expect_username().returning(|id| match id {
            1 => Ok(String::from("alice")),
            _ => Err(anyhow::anyhow!("no such user")),
        });

        let feed = CommentFeed {
            booru: Arc::new(booru),
            credentials: credentials(),
        };
        let store = MemoryStore::with(&[("last_comment_id", "10")]);
        let destination = RecordingDestination::default();

        run_cycle(&store, &feed, &destination).await.unwrap();

        assert_eq!(
            destination.sent(),
            vec![
                String::from("New comment by user #2 on post 111:\nbody 11\n\nhttps://booru.example/posts/111"),
                String::from("New comment by alice on post 112:\nbody 12\n\nhttps://booru.example/posts/112"),
            ]
        );
        assert_eq!(store.raw("last_comment_id").as_deref(), Some("12"));
    }
}
