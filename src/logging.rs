//! Log output: stderr always, plus a Discord webhook when `LOG_WEBHOOK` is set.

use std::{borrow::Cow, collections::HashMap, fmt::Write, sync::Arc};

use anyhow::Result;
use parking_lot::Mutex;
use tracing_subscriber::{filter::LevelFilter, layer::SubscriberExt as _, util::SubscriberInitExt as _, Layer};

use crate::{serenity, sink::MESSAGE_LIMIT, Config};

type LogMessage = (&'static str, String);

const LOG_PREFIX: &str = "boorubot";

pub struct WebhookLogger {
    http: Arc<serenity::Http>,
    webhook_name: &'static str,
    max_verbosity: tracing::Level,
    level_lookup: HashMap<tracing::Level, String>,

    pending_logs: Mutex<HashMap<tracing::Level, Vec<LogMessage>>>,

    webhook: serenity::Webhook,
}

impl WebhookLogger {
    pub fn new(
        http: Arc<serenity::Http>,
        webhook_name: &'static str,
        max_verbosity: tracing::Level,
        webhook: serenity::Webhook,
    ) -> ArcWrapper<Self> {
        let level_lookup = HashMap::from_iter([
            (tracing::Level::TRACE, 1),
            (tracing::Level::DEBUG, 1),
            (tracing::Level::INFO, 0),
            (tracing::Level::WARN, 3),
            (tracing::Level::ERROR, 4),
        ].map(|(level, value)| (level, format!("https://cdn.discordapp.com/embed/avatars/{value}.png"))));

        ArcWrapper(Arc::new(Self {
            http, max_verbosity, level_lookup, webhook, webhook_name,
            pending_logs: Mutex::default(),
        }))
    }

}

/// Our own logs are forwarded up to `max_verbosity`, dependencies' from WARN up.
fn forwards(target: &str, level: tracing::Level, max_verbosity: tracing::Level) -> bool {
    if target.starts_with(LOG_PREFIX) {
        max_verbosity >= level
    } else {
        tracing::Level::WARN >= level
    }
}

/// Splits formatted log lines into webhook sized messages without breaking lines.
fn chunk_lines(pre_chunked: &str) -> Vec<Cow<'_, str>> {
    let mut chunks: Vec<Cow<'_, str>> = Vec::new();
    for line in pre_chunked.split_inclusive('\n') {
        if let Some(chunk) = chunks.last_mut() {
            if chunk.len() + line.len() > MESSAGE_LIMIT {
                chunks.push(Cow::Borrowed(line));
            } else {
                chunk.to_mut().push_str(line);
            }
        } else {
            chunks.push(Cow::Borrowed(line));
        }
    }

    chunks
}

fn format_messages(messages: Vec<LogMessage>) -> String {
    messages
        .into_iter()
        .map(|(target, log_message)| {
            log_message.trim().split('\n').map(move |line| {
                format!("`[{target}]`: {line}\n")
            }).collect::<String>()
        })
        .collect()
}

#[serenity::async_trait]
impl crate::Looper for WebhookLogger {
    const NAME: &'static str = "Logging";
    const MILLIS: u64 = 1100;

    async fn loop_func(&self) -> Result<()> {
        let pending_logs = self.pending_logs.lock().drain().collect::<HashMap<_, _>>();

        for (severity, messages) in pending_logs {
            let pre_chunked = format_messages(messages);
            let webhook_name = format!("{} [{}]", self.webhook_name, severity.as_str());
            let avatar_url = self.level_lookup.get(&severity).cloned().unwrap_or_else(|| String::from(
                "https://cdn.discordapp.com/embed/avatars/5.png",
            ));

            for chunk in chunk_lines(&pre_chunked) {
                let message = serenity::ExecuteWebhook::new()
                    .content(chunk)
                    .username(webhook_name.clone())
                    .avatar_url(avatar_url.clone());

                self.webhook.execute(&*self.http, false, message).await?;
            }
        }

        Ok(())
    }
}

impl<S: tracing::Subscriber> Layer<S> for ArcWrapper<WebhookLogger> {
    fn on_event(&self, event: &tracing::Event<'_>, _ctx: tracing_subscriber::layer::Context<'_, S>) {
        pub struct StringVisitor<'a> {
            string: &'a mut String,
        }

        impl tracing::field::Visit for StringVisitor<'_> {
            fn record_debug(&mut self, _field: &tracing::field::Field, value: &dyn std::fmt::Debug) {
                let _ = write!(self.string, "{value:?}");
            }

            fn record_str(&mut self, _field: &tracing::field::Field, value: &str) {
                self.string.push_str(value);
            }
        }

        let metadata = event.metadata();
        if !forwards(metadata.target(), *metadata.level(), self.max_verbosity) {
            return;
        }

        let mut message = String::new();
        event.record(&mut StringVisitor {string: &mut message});

        self.pending_logs
            .lock()
            .entry(*metadata.level())
            .or_insert_with(Vec::new)
            .push((metadata.target(), message));
    }
}

// So we can impl Layer for Arc<WebhookLogger>
pub struct ArcWrapper<T>(pub Arc<T>);
impl<T> Clone for ArcWrapper<T> {
    fn clone(&self) -> Self {
        Self(Arc::clone(&self.0))
    }
}

impl<T> std::ops::Deref for ArcWrapper<T> {
    type Target = T;
    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

/// Installs the global subscriber. The returned logger, if any, must be
/// started as a [`crate::Looper`] to flush to Discord.
pub async fn init(config: &Config) -> Result<Option<ArcWrapper<WebhookLogger>>> {
    let level = config.tracing_level();
    let webhook_logger = match &config.log_webhook {
        Some(url) => {
            let http = Arc::new(serenity::Http::new(&config.token));
            let webhook = serenity::Webhook::from_url(&*http, url).await?;
            Some(WebhookLogger::new(http, "boorubot", level, webhook))
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_filter(LevelFilter::from_level(level)))
        .with(webhook_logger.clone())
        .try_init()?;

    Ok(webhook_logger)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prefixes_every_line_with_target() {
        let formatted = format_messages(vec![("boorubot::jobs", String::from("first\nsecond\n"))]);
        assert_eq!(formatted, "`[boorubot::jobs]`: first\n`[boorubot::jobs]`: second\n");
    }

    #[test]
    fn own_logs_follow_configured_level() {
        use tracing::Level;

        assert!(forwards("boorubot::watcher", Level::INFO, Level::INFO));
        assert!(!forwards("boorubot::watcher", Level::DEBUG, Level::INFO));
        assert!(forwards("boorubot::watcher", Level::DEBUG, Level::DEBUG));

        assert!(!forwards("serenity::gateway", Level::INFO, Level::DEBUG));
        assert!(forwards("serenity::gateway", Level::WARN, Level::DEBUG));
        assert!(forwards("sqlx::query", Level::ERROR, Level::INFO));
    }

    #[test]
    fn chunks_stay_under_message_limit() {
        let line = format!("{}\n", "x".repeat(300));
        let text = line.repeat(20);
        let chunks = chunk_lines(&text);

        assert_eq!(chunks.len(), 4);
        assert!(chunks.iter().all(|chunk| chunk.len() <= MESSAGE_LIMIT && chunk.ends_with('\n')));
        assert_eq!(chunks.concat(), text);
    }
}
