use std::sync::Arc;

use anyhow::Result;
use parking_lot::RwLock;

use crate::booru::BooruApi;

/// Discord caps autocomplete responses at this many choices.
const MAX_CHOICES: usize = 25;
const ROSTER_LIMIT: u32 = 100;

/// Names offered by `/fav` autocomplete.
#[derive(Default)]
pub struct FavoriteRoster {
    users: RwLock<Vec<String>>,
}

impl FavoriteRoster {
    pub fn replace(&self, users: Vec<String>) {
        *self.users.write() = users;
    }

    /// Roster names closest to `partial` first.
    #[must_use]
    pub fn suggest(&self, partial: &str) -> Vec<String> {
        let partial = partial.to_lowercase();
        let users = self.users.read();

        let mut ranked: Vec<(usize, &String)> = users
            .iter()
            .map(|user| (strsim::levenshtein(&partial, &user.to_lowercase()), user))
            .collect();

        ranked.sort_by_key(|&(distance, _)| distance);
        ranked.into_iter().take(MAX_CHOICES).map(|(_, user)| user.clone()).collect()
    }
}

pub struct RosterRefresh {
    pub booru: Arc<dyn BooruApi>,
    pub roster: Arc<FavoriteRoster>,
}

#[async_trait::async_trait]
impl crate::Looper for RosterRefresh {
    const NAME: &'static str = "Favorite Roster";
    const MILLIS: u64 = 1000 * 60 * 15;

    async fn loop_func(&self) -> Result<()> {
        tracing::info!("Fetching usernames with favs...");
        let users = self.booru.users_with_favorites(ROSTER_LIMIT).await?;

        tracing::info!("Fetched {} users with favs", users.len());
        self.roster.replace(users);
        Ok(())
    }
}
