use std::sync::Arc;

use anyhow::Result;
use chrono::{NaiveDate, Utc};
use parking_lot::Mutex;
use rand::seq::SliceRandom as _;

use crate::{serenity, store::CursorStore};

/// Commands run since midnight UTC.
pub struct CommandCounter {
    today: Mutex<(NaiveDate, u64)>,
}

impl Default for CommandCounter {
    fn default() -> Self {
        Self {
            today: Mutex::new((Utc::now().date_naive(), 0)),
        }
    }
}

impl CommandCounter {
    pub fn increment(&self) {
        self.increment_on(Utc::now().date_naive());
    }

    #[must_use]
    pub fn get(&self) -> u64 {
        self.get_on(Utc::now().date_naive())
    }

    fn increment_on(&self, day: NaiveDate) {
        let mut today = self.today.lock();
        if today.0 == day {
            today.1 += 1;
        } else {
            *today = (day, 1);
        }
    }

    fn get_on(&self, day: NaiveDate) -> u64 {
        let today = self.today.lock();
        if today.0 == day { today.1 } else { 0 }
    }
}

#[derive(Clone, Copy, Debug)]
enum Status {
    Version,
    Guilds,
    ImagesScanned,
    CommandsToday,
}

const STATUSES: [Status; 4] = [Status::Version, Status::Guilds, Status::ImagesScanned, Status::CommandsToday];

pub struct Presence {
    pub ctx: serenity::Context,
    pub store: Arc<dyn CursorStore>,
    pub counter: Arc<CommandCounter>,
    pub version: String,
}

impl Presence {
    async fn render(&self, status: Status) -> Result<String> {
        Ok(match status {
            Status::Version => format!("version {}", self.version),
            Status::Guilds => format!("in {} servers", self.ctx.cache.guild_count()),
            Status::ImagesScanned => {
                let scanned = self.store.get("image_count").await?.unwrap_or_else(|| String::from("0"));
                format!("with {scanned} scanned images")
            }
            Status::CommandsToday => format!("{} commands run today", self.counter.get()),
        })
    }
}

#[async_trait::async_trait]
impl crate::Looper for Presence {
    const NAME: &'static str = "Presence";
    const MILLIS: u64 = 1000 * 60;

    async fn loop_func(&self) -> Result<()> {
        let status = *STATUSES.choose(&mut rand::thread_rng()).unwrap_or(&Status::Version);
        let text = self.render(status).await?;

        tracing::debug!("Setting presence to {text:?}");
        self.ctx.set_activity(Some(serenity::ActivityData::playing(text)));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counter_resets_on_new_day() {
        let monday = NaiveDate::from_ymd_opt(2024, 6, 3).unwrap();
        let tuesday = monday.succ_opt().unwrap();

        let counter = CommandCounter {
            today: Mutex::new((monday, 0)),
        };

        counter.increment_on(monday);
        counter.increment_on(monday);
        assert_eq!(counter.get_on(monday), 2);
        assert_eq!(counter.get_on(tuesday), 0);

        counter.increment_on(tuesday);
        assert_eq!(counter.get_on(tuesday), 1);
    }
}
