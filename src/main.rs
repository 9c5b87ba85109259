use std::sync::{atomic::AtomicBool, Arc};

use anyhow::Result;

use boorubot::{
    booru::BooruClient,
    commands, errors, events,
    jobs::{deletions::DeletionList, presence::CommandCounter, roster::FavoriteRoster},
    logging,
    sauce::SauceNao,
    serenity,
    store::PgStore,
    Config, Data, Looper as _,
};

#[tokio::main]
async fn main() -> Result<()> {
    let config = Arc::new(Config::from_env()?);
    if let Some(webhook_logger) = logging::init(&config).await? {
        tokio::spawn(Arc::clone(&webhook_logger.0).start());
    }

    tracing::info!("Starting boorubot version {}", config.version);

    let reqwest = reqwest::Client::new();
    let store = PgStore::connect(&config.database_url).await?;
    let data = Data {
        booru: Arc::new(BooruClient::new(reqwest.clone(), config.booru.clone())),
        sauce: Arc::new(SauceNao::new(reqwest.clone(), config.saucenao_key.clone())),
        store: Arc::new(store),
        deletions: Arc::new(DeletionList::load(config.deletions_path.clone())),
        roster: Arc::new(FavoriteRoster::default()),
        commands_run: Arc::new(CommandCounter::default()),
        loops_started: AtomicBool::new(false),
        config: Arc::clone(&config),
        reqwest,
    };

    let framework = poise::Framework::builder()
        .options(poise::FrameworkOptions {
            commands: commands::commands(),
            prefix_options: poise::PrefixFrameworkOptions {
                prefix: Some(String::from("^")),
                ..poise::PrefixFrameworkOptions::default()
            },
            on_error: |error| Box::pin(errors::on_error(error)),
            post_command: |ctx| Box::pin(async move {
                ctx.data().commands_run.increment();
            }),
            event_handler: |ctx, event, framework, data| {
                Box::pin(events::event_handler(ctx, event, framework, data))
            },
            ..poise::FrameworkOptions::default()
        })
        .setup(|ctx, ready, framework| Box::pin(async move {
            tracing::info!("Logged in as {}, registering commands", ready.user.name);
            poise::builtins::register_globally(ctx, &framework.options().commands).await?;
            Ok(data)
        }))
        .build();

    let intents = serenity::GatewayIntents::GUILDS
        | serenity::GatewayIntents::GUILD_MESSAGES
        | serenity::GatewayIntents::MESSAGE_CONTENT
        | serenity::GatewayIntents::GUILD_MESSAGE_REACTIONS;

    let mut client = serenity::ClientBuilder::new(&config.token, intents)
        .framework(framework)
        .await?;

    client.start().await?;
    Ok(())
}
