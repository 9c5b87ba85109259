use anyhow::Result;
use rand::seq::SliceRandom as _;

use crate::{
    booru::{query::search_suffix, PostQuery},
    config::BooruCredentials,
    Context,
};

const FAV_RESULTS: u32 = 100;

/// A post link that keeps the search in the page's query string.
#[must_use]
pub fn post_link(credentials: &BooruCredentials, post_id: u64, tags: &str) -> String {
    format!("{}?q={}", credentials.post_url(post_id), search_suffix(tags))
}

#[allow(clippy::unused_async)]
async fn autocomplete_user(ctx: Context<'_>, partial: &str) -> Vec<String> {
    ctx.data().roster.suggest(partial)
}

/// Grab a random image with space-separated tags!
#[poise::command(slash_command, guild_only, nsfw_only)]
pub async fn random(
    ctx: Context<'_>,
    #[description = "Like `cute canine outdoors`"] tags: String,
) -> Result<()> {
    let data = ctx.data();
    let query = PostQuery::new(tags.as_str(), 1).random().with_default_excludes();

    let reply = match data.booru.posts(&query).await?.first() {
        Some(post) => post_link(&data.config.booru, post.id, &tags),
        None => format!("No match for `{tags}`!"),
    };

    ctx.say(reply).await?;
    Ok(())
}

/// Grab a favorite post from a user's fav list! Use the `tags` to filter!
#[poise::command(slash_command, guild_only, nsfw_only)]
pub async fn fav(
    ctx: Context<'_>,
    #[description = "If you dont see your name listed, try favoriting something and waiting 15 minutes!"]
    #[autocomplete = "autocomplete_user"]
    user: String,
    #[description = "Like `vulpine outdoors`"] tags: Option<String>,
) -> Result<()> {
    let data = ctx.data();
    let tags = format!("ordfav:{user} {}", tags.unwrap_or_default());
    let tags = tags.trim();

    let posts = data.booru.posts(&PostQuery::new(tags, FAV_RESULTS).with_default_excludes()).await?;
    let reply = match posts.choose(&mut rand::thread_rng()) {
        Some(post) => post_link(&data.config.booru, post.id, tags),
        None => format!("No match for `{tags}`!"),
    };

    ctx.say(reply).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn link_carries_search() {
        let credentials = BooruCredentials {
            url: String::from("https://booru.example"),
            user: String::new(),
            key: String::new(),
        };

        assert_eq!(
            post_link(&credentials, 9, "ordfav:vixi  fox"),
            "https://booru.example/posts/9?q=ordfav:vixi+fox"
        );
    }
}
