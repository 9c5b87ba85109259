//! Watermark based feed relaying.
//!
//! Every relayed feed (comments, modqueue, each user's favorites) follows the
//! same cycle:
//!
//! 1. Give up if the destination channel cannot be found.
//! 2. Read the feed's watermark, the id of the newest item already handled.
//! 3. Fetch the newest items. Nothing fetched means nothing to do.
//! 4. Items above the watermark form the batch, oldest first.
//! 5. With no watermark yet, the batch is treated as backlog and skipped,
//!    so a fresh database never floods a channel.
//! 6. Otherwise each item is sent in order, one at a time.
//! 7. The watermark moves to the newest id seen, even if some sends failed.
//!
//! A failed send is not retried: once an item is at or below the watermark it
//! will never be offered again. A crash between sending and storing the
//! watermark can resend a batch on restart.

use std::{borrow::Cow, sync::Arc};

use anyhow::Result;

use crate::{
    sink::{self, Destination},
    store::CursorStore,
};

pub trait FeedItem {
    fn id(&self) -> u64;
}

#[async_trait::async_trait]
pub trait Feed: Send + Sync {
    type Item: FeedItem + Send + Sync;

    const NAME: &'static str;
    const MILLIS: u64;
    /// How many items to ask the source for per cycle.
    const LIMIT: u32;

    /// Store key holding this feed's watermark.
    fn key(&self) -> Cow<'_, str>;
    async fn fetch(&self, limit: u32) -> Result<Vec<Self::Item>>;
    async fn render(&self, item: &Self::Item) -> String;

    /// Feeds that return `Some` send the whole batch as one report instead of
    /// one message per item.
    fn report(&self, _batch: &[&Self::Item]) -> Option<String> {
        None
    }
}

/// The part of a fetch that still needs delivering.
#[derive(Debug, PartialEq, Eq)]
pub struct Batch<'a, T> {
    /// Unseen items, ascending by id, without duplicates.
    pub items: Vec<&'a T>,
    /// Watermark to store once the batch is handled.
    pub advance_to: u64,
    /// Set when there was no watermark, the items are seeding it rather than news.
    pub bootstrap: bool,
}

/// Works out what to deliver from `fetched` given the stored `watermark`.
/// `None` if nothing was fetched.
#[must_use]
pub fn plan<T: FeedItem>(watermark: Option<u64>, fetched: &[T]) -> Option<Batch<'_, T>> {
    let newest = fetched.iter().map(|item| item.id()).max()?;
    let floor = watermark.unwrap_or(0);

    let mut items: Vec<&T> = fetched.iter().filter(|item| item.id() > floor).collect();
    items.sort_by_key(|item| item.id());
    items.dedup_by_key(|item| item.id());

    Some(Batch {
        items,
        advance_to: newest.max(floor),
        bootstrap: watermark.is_none(),
    })
}

/// What a single cycle did, mostly for logs and tests.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Cycle {
    NoDestination,
    Empty,
    Bootstrapped { watermark: u64, skipped: usize },
    Delivered { sent: usize, failed: usize, watermark: u64 },
}

/// Runs one poll, compare, deliver, advance cycle for `feed`.
///
/// Errors (store or fetch failures) leave the watermark untouched.
pub async fn run_cycle<F: Feed + ?Sized>(
    store: &dyn CursorStore,
    feed: &F,
    destination: &dyn Destination,
) -> Result<Cycle> {
    if !destination.exists() {
        tracing::warn!("{}: could not find {}, skipping cycle.", F::NAME, destination.describe());
        return Ok(Cycle::NoDestination);
    }

    let key = feed.key();
    let watermark = store.watermark(&key).await?;
    let fetched = feed.fetch(F::LIMIT).await?;

    let Some(batch) = plan(watermark, &fetched) else {
        tracing::debug!("{}: nothing fetched for {key}", F::NAME);
        return Ok(Cycle::Empty);
    };

    let outcome = if batch.bootstrap {
        tracing::warn!(
            "{}: no watermark for {key}, skipping {} existing items and starting at {}.",
            F::NAME, batch.items.len(), batch.advance_to
        );

        Cycle::Bootstrapped { watermark: batch.advance_to, skipped: batch.items.len() }
    } else {
        let (sent, failed) = deliver_batch(feed, &batch.items, destination).await;
        if sent + failed != 0 {
            tracing::info!("{}: relayed {sent} new items for {key} ({failed} failed)", F::NAME);
        }

        Cycle::Delivered { sent, failed, watermark: batch.advance_to }
    };

    if watermark != Some(batch.advance_to) {
        store.set_watermark(&key, batch.advance_to).await?;
    }

    Ok(outcome)
}

async fn deliver_batch<F: Feed + ?Sized>(feed: &F, items: &[&F::Item], destination: &dyn Destination) -> (usize, usize) {
    if items.is_empty() {
        return (0, 0);
    }

    if let Some(report) = feed.report(items) {
        return if sink::deliver_report(destination, &report).await { (items.len(), 0) } else { (0, items.len()) };
    }

    let (mut sent, mut failed) = (0, 0);
    for item in items {
        let text = feed.render(item).await;
        if sink::deliver(destination, &text).await {
            sent += 1;
        } else {
            failed += 1;
        }
    }

    (sent, failed)
}

/// A [`Feed`] bound to its store and destination, run as a [`crate::Looper`].
pub struct FeedWatcher<F> {
    feed: F,
    store: Arc<dyn CursorStore>,
    destination: Arc<dyn Destination>,
}

impl<F: Feed> FeedWatcher<F> {
    pub fn new(feed: F, store: Arc<dyn CursorStore>, destination: Arc<dyn Destination>) -> Self {
        Self { feed, store, destination }
    }

    pub async fn cycle(&self) -> Result<Cycle> {
        run_cycle(&*self.store, &self.feed, &*self.destination).await
    }
}

#[async_trait::async_trait]
impl<F: Feed> crate::Looper for FeedWatcher<F> {
    const NAME: &'static str = F::NAME;
    const MILLIS: u64 = F::MILLIS;

    async fn loop_func(&self) -> Result<()> {
        self.cycle().await.map(drop)
    }
}
