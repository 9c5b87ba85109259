use anyhow::Result;

use crate::serenity;

pub trait OptionTryUnwrap<T> {
    fn try_unwrap(self) -> Result<T>;
}

impl<T> OptionTryUnwrap<T> for Option<T> {
    #[track_caller]
    fn try_unwrap(self) -> Result<T> {
        match self {
            Some(v) => Ok(v),
            None => Err({
                let location = std::panic::Location::caller();
                anyhow::anyhow!("Unexpected None value on line {} in {}", location.line(), location.file())
            })
        }
    }
}

/// Keycap emoji for each decimal digit, indexed by value.
const KEYCAPS: [&str; 10] = ["0️⃣", "1️⃣", "2️⃣", "3️⃣", "4️⃣", "5️⃣", "6️⃣", "7️⃣", "8️⃣", "9️⃣"];

/// Reactions spelling out `post_id`, or `None` if a digit repeats.
///
/// Discord only allows each emoji once per message, so an id like `1224`
/// cannot be spelled and callers fall back to 🔢.
#[must_use]
pub fn digit_reactions(post_id: u64) -> Option<Vec<&'static str>> {
    let digits = post_id.to_string();
    let mut seen = [false; 10];
    let mut reactions = Vec::with_capacity(digits.len());

    for digit in digits.bytes().map(|b| usize::from(b - b'0')) {
        if std::mem::replace(&mut seen[digit], true) {
            return None;
        }

        reactions.push(KEYCAPS[digit]);
    }

    Some(reactions)
}

#[serenity::async_trait]
pub trait MessageExt {
    async fn react_str(&self, http: &serenity::Http, emoji: &str) -> Result<()>;
    /// Reacts with the digits of a booru post id.
    async fn react_post_id(&self, http: &serenity::Http, post_id: u64) -> Result<()>;
}

#[serenity::async_trait]
impl MessageExt for serenity::Message {
    async fn react_str(&self, http: &serenity::Http, emoji: &str) -> Result<()> {
        self.react(http, serenity::ReactionType::Unicode(emoji.to_owned())).await?;
        Ok(())
    }

    async fn react_post_id(&self, http: &serenity::Http, post_id: u64) -> Result<()> {
        if let Some(reactions) = digit_reactions(post_id) {
            tracing::info!("Reacting with digits for {post_id}");
            for emoji in reactions {
                self.react_str(http, emoji).await?;
            }
        } else {
            tracing::warn!("Duplicated digits for post {post_id}");
            self.react_str(http, "🔢").await?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn spells_unique_digits() {
        assert_eq!(digit_reactions(1_408), Some(vec!["1️⃣", "4️⃣", "0️⃣", "8️⃣"]));
        assert_eq!(digit_reactions(0), Some(vec!["0️⃣"]));
    }

    #[test]
    fn refuses_repeated_digits() {
        assert_eq!(digit_reactions(1_224), None);
    }

    #[test]
    fn try_unwrap_reports_location() {
        let err = None::<u8>.try_unwrap().unwrap_err();
        assert!(err.to_string().contains("traits.rs"));
    }
}
