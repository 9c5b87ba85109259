//! Background loops, started once the gateway is ready.

pub mod changelog;
pub mod deletions;
pub mod maintenance;
pub mod presence;
pub mod roster;
pub mod tagme;

use std::sync::{atomic::Ordering, Arc};

use crate::{
    feeds::{CommentFeed, FavoritesWatcher, ModqueueFeed},
    serenity,
    sink::{ChannelDestination, Destination},
    watcher::FeedWatcher,
    Data, Looper as _,
};

fn destination(ctx: &serenity::Context, channel: Option<serenity::ChannelId>) -> Option<Arc<dyn Destination>> {
    channel.map(|channel| Arc::new(ChannelDestination::new(ctx, channel)) as Arc<dyn Destination>)
}

/// Spawns every loop. Later calls (gateway reconnects) do nothing.
pub fn start_all(ctx: &serenity::Context, data: &Data) {
    if data.loops_started.swap(true, Ordering::SeqCst) {
        return;
    }

    let config = &data.config;
    let credentials = config.booru.clone();
    let maintenance = destination(ctx, config.maintenance_channel);

    if let Some(relay) = destination(ctx, config.relay_channel()) {
        let comments = CommentFeed {
            booru: Arc::clone(&data.booru),
            credentials: credentials.clone(),
        };
        FeedWatcher::new(comments, Arc::clone(&data.store), Arc::clone(&relay)).spawn();

        FavoritesWatcher {
            booru: Arc::clone(&data.booru),
            credentials: credentials.clone(),
            store: Arc::clone(&data.store),
            destination: relay,
        }
        .spawn();
    } else {
        tracing::warn!("BOORU_AUTO_UPLOAD is not set, comment and favorite relays are disabled.");
    }

    if let Some(maintenance) = &maintenance {
        let modqueue = ModqueueFeed {
            booru: Arc::clone(&data.booru),
            credentials: credentials.clone(),
        };
        FeedWatcher::new(modqueue, Arc::clone(&data.store), Arc::clone(maintenance)).spawn();
    } else {
        tracing::warn!("BOORU_MAINTENANCE is not set, modqueue reports are disabled.");
    }

    maintenance::MaintenanceSweep {
        booru: Arc::clone(&data.booru),
        credentials: credentials.clone(),
        destination: maintenance.clone(),
    }
    .spawn();

    deletions::DeletionSweep {
        booru: Arc::clone(&data.booru),
        credentials: credentials.clone(),
        list: Arc::clone(&data.deletions),
        destination: maintenance.clone(),
    }
    .spawn();

    tagme::TagmePrompt {
        booru: Arc::clone(&data.booru),
        sauce: Arc::clone(&data.sauce),
        credentials,
        destination: maintenance,
    }
    .spawn();

    roster::RosterRefresh {
        booru: Arc::clone(&data.booru),
        roster: Arc::clone(&data.roster),
    }
    .spawn();

    presence::Presence {
        ctx: ctx.clone(),
        store: Arc::clone(&data.store),
        counter: Arc::clone(&data.commands_run),
        version: config.version.clone(),
    }
    .spawn();
}
