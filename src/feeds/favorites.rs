use std::{borrow::Cow, sync::Arc};

use anyhow::Result;

use crate::{
    booru::{BooruApi, Favorite},
    config::BooruCredentials,
    sink::Destination,
    store::CursorStore,
    watcher::{run_cycle, Cycle, Feed},
};

/// Users whose favorites are relayed each cycle.
const ROSTER_LIMIT: u32 = 100;

/// One user's favorites, watermarked under `fav_<username>`.
pub struct UserFavorites<'a> {
    pub booru: &'a dyn BooruApi,
    pub credentials: &'a BooruCredentials,
    pub username: &'a str,
}

#[async_trait::async_trait]
impl Feed for UserFavorites<'_> {
    type Item = Favorite;

    const NAME: &'static str = "Favorite Relay";
    const MILLIS: u64 = 1000 * 60 * 2;
    const LIMIT: u32 = 10;

    fn key(&self) -> Cow<'_, str> {
        Cow::Owned(format!("fav_{}", self.username))
    }

    async fn fetch(&self, limit: u32) -> Result<Vec<Favorite>> {
        self.booru.favorites(self.username, limit).await
    }

    async fn render(&self, favorite: &Favorite) -> String {
        format!(
            "**{}** added a new favorite!\n{}",
            self.username,
            self.credentials.post_url(favorite.post_id)
        )
    }
}

/// Relays every user's new favorites. Users are rediscovered each cycle, so
/// someone favoriting for the first time is picked up without a restart.
pub struct FavoritesWatcher {
    pub booru: Arc<dyn BooruApi>,
    pub credentials: BooruCredentials,
    pub store: Arc<dyn CursorStore>,
    pub destination: Arc<dyn Destination>,
}

impl FavoritesWatcher {
    /// Runs the watermark cycle for each user, returning each user's outcome.
    /// A failure for one user is logged and does not stop the rest.
    pub async fn cycle(&self) -> Result<Vec<(String, Cycle)>> {
        if !self.destination.exists() {
            tracing::warn!("Could not find favorites channel {}.", self.destination.describe());
            return Ok(Vec::new());
        }

        let users = self.booru.users_with_favorites(ROSTER_LIMIT).await?;
        let mut outcomes = Vec::with_capacity(users.len());

        for username in users {
            let feed = UserFavorites {
                booru: &*self.booru,
                credentials: &self.credentials,
                username: &username,
            };

            match run_cycle(&*self.store, &feed, &*self.destination).await {
                Ok(outcome) => {
                    if let Cycle::Bootstrapped { watermark, .. } = outcome {
                        tracing::info!("Tracking new favs for user {username} starting at {watermark}");
                    }

                    outcomes.push((username, outcome));
                }
                Err(err) => tracing::error!("Favorite relay failed for {username}: {err:?}"),
            }
        }

        Ok(outcomes)
    }
}

#[async_trait::async_trait]
impl crate::Looper for FavoritesWatcher {
    const NAME: &'static str = "Favorite Relay";
    const MILLIS: u64 = <UserFavorites<'static> as Feed>::MILLIS;

    async fn loop_func(&self) -> Result<()> {
        self.cycle().await.map(drop)
    }
}

#[cfg(test)]
mod tests {
    use mockall::predicate::eq;

    use super::*;
    use crate::{booru::MockBooruApi, sink::testing::RecordingDestination, store::MemoryStore};

    fn favorite(id: u64) -> Favorite {
        Favorite {
            id,
            post_id: id * 10,
            user_id: 1,
        }
    }

    fn watcher(booru: MockBooruApi, store: Arc<MemoryStore>, destination: Arc<RecordingDestination>) -> FavoritesWatcher {
        FavoritesWatcher {
            booru: Arc::new(booru),
            credentials: BooruCredentials {
                url: String::from("https://booru.example"),
                user: String::new(),
                key: String::new(),
            },
            store,
            destination,
        }
    }

    #[tokio::test]
    async fn new_user_is_seeded_then_relayed() {
        let mut booru = MockBooruApi::new();
        booru.expect_users_with_favorites().returning(|_| Ok(vec![String::from("newcomer")]));

        let mut responses = vec![vec![favorite(7), favorite(6), favorite(5)], vec![favorite(3), favorite(2)]];
        booru
            .expect_favorites()
            .with(eq("newcomer"), eq(<UserFavorites<'static> as Feed>::LIMIT))
            .times(2)
            .returning(move |_, _| Ok(responses.pop().unwrap_or_default()));

        let store = Arc::new(MemoryStore::default());
        let destination = Arc::new(RecordingDestination::default());
        let watcher = watcher(booru, store.clone(), destination.clone());

        let first = watcher.cycle().await.unwrap();
        assert!(matches!(first[0].1, Cycle::Bootstrapped { watermark: 3, .. }));
        assert!(destination.sent().is_empty());
        assert_eq!(store.raw("fav_newcomer").as_deref(), Some("3"));

        watcher.cycle().await.unwrap();
        assert_eq!(
            destination.sent(),
            vec![
                String::from("**newcomer** added a new favorite!\nhttps://booru.example/posts/50"),
                String::from("**newcomer** added a new favorite!\nhttps://booru.example/posts/60"),
                String::from("**newcomer** added a new favorite!\nhttps://booru.example/posts/70"),
            ]
        );
        assert_eq!(store.raw("fav_newcomer").as_deref(), Some("7"));
    }

    #[tokio::test]
    async fn one_broken_user_does_not_stop_the_rest() {
        let mut booru = MockBooruApi::new();
        booru
            .expect_users_with_favorites()
            .returning(|_| Ok(vec![String::from("broken"), String::from("fine")]));
        booru.expect_favorites().returning(|user, _| match user {
            "broken" => Err(anyhow::anyhow!("timeout")),
            _ => Ok(vec![favorite(9)]),
        });

        let store = Arc::new(MemoryStore::with(&[("fav_broken", "1"), ("fav_fine", "8")]));
        let destination = Arc::new(RecordingDestination::default());
        let outcomes = watcher(booru, store.clone(), destination.clone()).cycle().await.unwrap();

        assert_eq!(outcomes, vec![(String::from("fine"), Cycle::Delivered { sent: 1, failed: 0, watermark: 9 })]);
        assert_eq!(store.raw("fav_broken").as_deref(), Some("1"));
        assert_eq!(destination.sent().len(), 1);
    }
}
