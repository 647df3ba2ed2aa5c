use dotenvy::dotenv;
use omnibot::bot::handlers::{self, BotDialogue, Command};
use omnibot::bot::state::State;
use omnibot::bot::AppServices;
use omnibot::config::{Settings, TransportMode};
use std::net::{Ipv4Addr, SocketAddr};
use std::sync::Arc;
use teloxide::dispatching::dialogue::InMemStorage;
use teloxide::dispatching::UpdateHandler;
use teloxide::prelude::*;
use teloxide::update_listeners::webhooks;
use tracing::{error, info};
use tracing_subscriber::{prelude::*, EnvFilter};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load .env file
    dotenv().ok();

    init_logging();

    info!("Starting Omnibot...");

    let settings = init_settings();

    let services = Arc::new(AppServices::new(&settings));
    info!("Upstream service adapters initialized.");

    let bot = Bot::new(settings.telegram_bot_token.clone());

    let handler = setup_handler();

    let mut dispatcher = Dispatcher::builder(bot.clone(), handler)
        .dependencies(dptree::deps![services, InMemStorage::<State>::new()])
        .enable_ctrlc_handler()
        .build();

    match settings.transport {
        TransportMode::Polling => {
            info!("Bot is running (long polling).");
            dispatcher.dispatch().await;
        }
        TransportMode::Webhook => {
            let listener = init_webhook_listener(&bot, &settings).await;
            info!("Bot is running (webhook on port {}).", settings.port);
            dispatcher
                .dispatch_with_listener(
                    listener,
                    LoggingErrorHandler::with_custom_text("An error from the update listener"),
                )
                .await;
        }
    }

    Ok(())
}

fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn init_settings() -> Arc<Settings> {
    match Settings::new() {
        Ok(s) => {
            info!("Configuration loaded successfully.");
            Arc::new(s)
        }
        Err(e) => {
            error!("Failed to load configuration: {}", e);
            std::process::exit(1);
        }
    }
}

async fn init_webhook_listener(
    bot: &Bot,
    settings: &Settings,
) -> impl teloxide::update_listeners::UpdateListener<Err = std::convert::Infallible> {
    let base = settings.webhook_url.as_deref().unwrap_or_default();
    let url = format!(
        "{}/{}",
        base.trim_end_matches('/'),
        settings.telegram_bot_token
    );
    let url = match url.parse() {
        Ok(u) => u,
        Err(e) => {
            error!("Invalid WEBHOOK_URL: {}", e);
            std::process::exit(1);
        }
    };
    let addr = SocketAddr::from((Ipv4Addr::UNSPECIFIED, settings.port));

    match webhooks::axum(bot.clone(), webhooks::Options::new(addr, url)).await {
        Ok(listener) => listener,
        Err(e) => {
            error!("Failed to register webhook: {}", e);
            std::process::exit(1);
        }
    }
}

fn setup_handler() -> UpdateHandler<teloxide::RequestError> {
    dptree::entry().branch(
        Update::filter_message()
            .enter_dialogue::<Message, InMemStorage<State>, State>()
            .branch(
                dptree::entry()
                    .filter_command::<Command>()
                    .endpoint(handle_command),
            )
            .branch(
                dptree::filter(|msg: Message| msg.photo().is_some()).endpoint(handle_photo_upload),
            )
            .branch(
                dptree::filter(|msg: Message| msg.video().is_some()).endpoint(handle_video_upload),
            )
            .branch(dptree::filter(|msg: Message| msg.text().is_some()).endpoint(handle_free_text)),
    )
}

async fn handle_command(
    bot: Bot,
    msg: Message,
    cmd: Command,
    services: Arc<AppServices>,
    dialogue: BotDialogue,
) -> Result<(), teloxide::RequestError> {
    let res = match cmd {
        Command::Start => handlers::start(&bot, &msg).await,
        Command::Help => handlers::help(&bot, &msg).await,
        Command::Ai(text) => handlers::ai(&bot, &msg, &services, &text).await,
        Command::Youtube(query) => handlers::youtube_search(&bot, &msg, &services, &query).await,
        Command::Movie(name) => handlers::movie_lookup(&bot, &msg, &services, &name).await,
        Command::Removebg => handlers::removebg(&bot, &msg, &dialogue).await,
    };
    if let Err(e) = res {
        error!("Command error: {}", e);
    }
    respond(())
}

async fn handle_photo_upload(
    bot: Bot,
    msg: Message,
    services: Arc<AppServices>,
    dialogue: BotDialogue,
) -> Result<(), teloxide::RequestError> {
    if let Err(e) = handlers::handle_photo(&bot, &msg, &services, &dialogue).await {
        error!("Photo handler error: {}", e);
    }
    respond(())
}

async fn handle_video_upload(
    bot: Bot,
    msg: Message,
    services: Arc<AppServices>,
    dialogue: BotDialogue,
) -> Result<(), teloxide::RequestError> {
    if let Err(e) = handlers::handle_video(&bot, &msg, &services, &dialogue).await {
        error!("Video handler error: {}", e);
    }
    respond(())
}

async fn handle_free_text(
    bot: Bot,
    msg: Message,
    services: Arc<AppServices>,
) -> Result<(), teloxide::RequestError> {
    if let Err(e) = handlers::handle_text(&bot, &msg, &services).await {
        error!("Text handler error: {}", e);
    }
    respond(())
}
