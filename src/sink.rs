//! Delivering rendered text to a Discord channel.
//!
//! Delivery never fails upward: a missing channel or a rejected send is
//! logged and reported back as `false`, the caller decides whether to care.

use std::{borrow::Cow, sync::Arc};

use anyhow::Result;

use crate::serenity;

/// Discord rejects message content over this many characters.
pub const MESSAGE_LIMIT: usize = 2000;
/// Text is cut here, leaving room for a truncation notice.
pub const REPORT_BUDGET: usize = MESSAGE_LIMIT - 100;
pub const TRUNCATION_NOTICE: &str = "\n\n... (report truncated due to length)";
pub const MESSAGE_TRUNCATION_NOTICE: &str = "\n\n... (message truncated due to length)";

#[async_trait::async_trait]
pub trait Destination: Send + Sync {
    /// Human readable name for logs.
    fn describe(&self) -> String;
    /// Whether the destination can currently be sent to.
    fn exists(&self) -> bool;
    async fn send(&self, text: &str) -> Result<()>;
    /// Whether the most recent message here was posted by the bot.
    async fn last_message_is_ours(&self) -> Result<bool>;
}

fn truncate_with<'a>(text: &'a str, budget: usize, notice: &str) -> Cow<'a, str> {
    match text.char_indices().nth(budget) {
        Some((cut, _)) => Cow::Owned(format!("{}{notice}", &text[..cut])),
        None => Cow::Borrowed(text),
    }
}

/// Cuts `text` to `budget` characters plus [`TRUNCATION_NOTICE`], or returns it untouched.
#[must_use]
pub fn truncate_report(text: &str, budget: usize) -> Cow<'_, str> {
    truncate_with(text, budget, TRUNCATION_NOTICE)
}

async fn send_logged(destination: &dyn Destination, text: &str) -> bool {
    match destination.send(text).await {
        Ok(()) => true,
        Err(err) => {
            tracing::error!("Failed to send to {}: {err:?}", destination.describe());
            false
        }
    }
}

/// Sends a single message, cut with [`MESSAGE_TRUNCATION_NOTICE`] if needed.
/// Returns whether it was sent.
pub async fn deliver(destination: &dyn Destination, text: &str) -> bool {
    send_logged(destination, &truncate_with(text, REPORT_BUDGET, MESSAGE_TRUNCATION_NOTICE)).await
}

/// Sends a multi-entry report, cut with [`TRUNCATION_NOTICE`] if needed.
pub async fn deliver_report(destination: &dyn Destination, text: &str) -> bool {
    send_logged(destination, &truncate_report(text, REPORT_BUDGET)).await
}

/// A guild text channel, resolved through the gateway cache.
#[derive(Clone)]
pub struct ChannelDestination {
    cache: Arc<serenity::Cache>,
    http: Arc<serenity::Http>,
    channel: serenity::ChannelId,
}

impl ChannelDestination {
    #[must_use]
    pub fn new(ctx: &serenity::Context, channel: serenity::ChannelId) -> Self {
        Self {
            cache: Arc::clone(&ctx.cache),
            http: Arc::clone(&ctx.http),
            channel,
        }
    }
}

#[async_trait::async_trait]
impl Destination for ChannelDestination {
    fn describe(&self) -> String {
        format!("channel {}", self.channel)
    }

    fn exists(&self) -> bool {
        self.cache.channel(self.channel).is_some()
    }

    async fn send(&self, text: &str) -> Result<()> {
        self.channel.say(&*self.http, text).await?;
        Ok(())
    }

    async fn last_message_is_ours(&self) -> Result<bool> {
        let bot_id = self.cache.current_user().id;
        let last = self.channel.messages(&*self.http, serenity::GetMessages::new().limit(1)).await?;

        Ok(last.first().is_some_and(|message| message.author.id == bot_id))
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use parking_lot::Mutex;

    use super::*;

    /// Records sends, optionally failing some of them.
    #[derive(Default)]
    pub struct RecordingDestination {
        pub missing: bool,
        pub ours_last: bool,
        pub fail_containing: Option<&'static str>,
        pub sent: Mutex<Vec<String>>,
    }

    impl RecordingDestination {
        pub fn sent(&self) -> Vec<String> {
            self.sent.lock().clone()
        }
    }

    #[async_trait::async_trait]
    impl Destination for RecordingDestination {
        fn describe(&self) -> String {
            String::from("test destination")
        }

        fn exists(&self) -> bool {
            !self.missing
        }

        async fn send(&self, text: &str) -> Result<()> {
            if self.fail_containing.is_some_and(|needle| text.contains(needle)) {
                anyhow::bail!("rejected {text:?}");
            }

            self.sent.lock().push(text.to_owned());
            Ok(())
        }

        async fn last_message_is_ours(&self) -> Result<bool> {
            Ok(self.ours_last)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{testing::RecordingDestination, *};

    #[test]
    fn short_text_is_untouched() {
        let text = "Fixed some regular maintenance things";
        assert!(matches!(truncate_report(text, REPORT_BUDGET), Cow::Borrowed(t) if t == text));
    }

    #[test]
    fn exactly_budget_is_untouched() {
        let text = "x".repeat(REPORT_BUDGET);
        assert_eq!(truncate_report(&text, REPORT_BUDGET), text);
    }

    #[test]
    fn long_text_is_cut_with_notice() {
        let text = "é".repeat(REPORT_BUDGET + 50);
        let truncated = truncate_report(&text, REPORT_BUDGET);

        assert!(truncated.ends_with(TRUNCATION_NOTICE));
        assert_eq!(truncated.chars().count(), REPORT_BUDGET + TRUNCATION_NOTICE.chars().count());
        assert!(truncated.chars().count() <= MESSAGE_LIMIT);
    }

    #[tokio::test]
    async fn deliver_swallows_failures() {
        let destination = RecordingDestination {
            fail_containing: Some("boom"),
            ..RecordingDestination::default()
        };

        assert!(!deliver(&destination, "boom").await);
        assert!(deliver(&destination, "fine").await);
        assert_eq!(destination.sent(), vec![String::from("fine")]);
    }

    #[tokio::test]
    async fn single_messages_and_reports_use_their_own_notice() {
        let destination = RecordingDestination::default();
        let text = "x".repeat(MESSAGE_LIMIT);

        assert!(deliver(&destination, &text).await);
        assert!(deliver_report(&destination, &text).await);

        let sent = destination.sent();
        assert!(sent[0].ends_with(MESSAGE_TRUNCATION_NOTICE));
        assert!(!sent[0].contains("report"));
        assert!(sent[1].ends_with(TRUNCATION_NOTICE));
        assert!(sent.iter().all(|message| message.chars().count() <= MESSAGE_LIMIT));
    }
}
