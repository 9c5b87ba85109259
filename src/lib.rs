#![warn(clippy::pedantic)]
#![allow(clippy::missing_errors_doc, clippy::missing_panics_doc)] // Every fallible fn here is an anyhow::Result
#![allow(clippy::cast_possible_wrap, clippy::cast_possible_truncation, clippy::cast_sign_loss)]

use std::sync::{atomic::AtomicBool, Arc};

pub use poise;
pub use poise::serenity_prelude as serenity;

pub mod booru;
pub mod commands;
pub mod config;
pub mod errors;
pub mod events;
pub mod feeds;
pub mod jobs;
pub mod logging;
pub mod sauce;
pub mod sink;
pub mod store;
pub mod watcher;
mod looper;
mod macros;
mod traits;

pub use config::Config;
pub use looper::Looper;
pub use traits::{MessageExt, OptionTryUnwrap};

pub type Context<'a> = poise::Context<'a, Data, anyhow::Error>;
pub type ApplicationContext<'a> = poise::ApplicationContext<'a, Data, anyhow::Error>;
pub type FrameworkContext<'a> = poise::FrameworkContext<'a, Data, anyhow::Error>;
pub type Command = poise::Command<Data, anyhow::Error>;

/// Everything the commands, event handlers and loops share.
pub struct Data {
    pub config: Arc<Config>,
    pub booru: Arc<dyn booru::BooruApi>,
    pub sauce: Arc<dyn sauce::SauceApi>,
    pub store: Arc<dyn store::CursorStore>,
    pub reqwest: reqwest::Client,
    pub deletions: Arc<jobs::deletions::DeletionList>,
    pub roster: Arc<jobs::roster::FavoriteRoster>,
    pub commands_run: Arc<jobs::presence::CommandCounter>,
    pub loops_started: AtomicBool,
}
