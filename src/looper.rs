use std::{sync::Arc, time::Duration};

use tokio::time::MissedTickBehavior;

/// A job run on a fixed interval for the lifetime of the process.
///
/// Errors from a single iteration are logged and the next tick runs as normal,
/// nothing a loop does can take the bot down.
#[poise::async_trait]
pub trait Looper {
    const NAME: &'static str;
    const MILLIS: u64;

    async fn loop_func(&self) -> anyhow::Result<()>;
    async fn start(self: Arc<Self>) where Self: Send + Sync + 'static {
        tracing::info!("Starting {} loop, every {}ms", Self::NAME, Self::MILLIS);

        let mut interval = tokio::time::interval(Duration::from_millis(Self::MILLIS));
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            interval.tick().await;
            if let Err(err) = self.loop_func().await {
                tracing::error!("{} Error: {:?}", Self::NAME, err);
            }
        }
    }

    fn spawn(self) -> tokio::task::JoinHandle<()> where Self: Sized + Send + Sync + 'static {
        tokio::spawn(Arc::new(self).start())
    }
}
