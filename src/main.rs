use std::sync::Arc;

use teloxide::prelude::*;
use teloxide::utils::command::BotCommands;
use tracing::{error, info, warn};
use tracing_subscriber::prelude::*;

use savvy::chatbot::{ReplyPipeline, TelegramClient};
use savvy::config::Config;
use savvy::health;

const WORKING_TEXT: &str = "💭 Working on it...";

#[derive(BotCommands, Clone)]
#[command(rename_rule = "lowercase")]
enum Command {
    /// Show the welcome message.
    Start,
}

struct BotState {
    pipeline: Arc<ReplyPipeline>,
    telegram: TelegramClient,
}

#[tokio::main]
async fn main() {
    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load config: {e}");
            std::process::exit(1);
        }
    };

    // Setup logging
    let log_dir = config.data_dir.join("logs");
    std::fs::create_dir_all(&log_dir).ok();
    let file_appender = tracing_appender::rolling::never(&log_dir, "savvy.log");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stdout)
                .with_filter(
                    tracing_subscriber::EnvFilter::from_default_env()
                        .add_directive(tracing::Level::INFO.into()),
                ),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(non_blocking)
                .with_ansi(false)
                .with_filter(
                    tracing_subscriber::EnvFilter::from_default_env()
                        .add_directive(tracing::Level::INFO.into()),
                ),
        )
        .init();

    info!("🚀 Starting Savvy Chatbot...");
    info!("Knowledge directory: {:?}", config.data_dir);

    let token = match config.require_bot_token() {
        Ok(token) => token.to_string(),
        Err(e) => {
            error!("{e}");
            std::process::exit(1);
        }
    };

    match tokio::net::TcpListener::bind(("0.0.0.0", config.port)).await {
        Ok(listener) => {
            tokio::spawn(async move {
                if let Err(e) = health::serve(listener).await {
                    warn!("Health endpoint stopped: {e}");
                }
            });
        }
        Err(e) => warn!("Health endpoint disabled, cannot bind port {}: {e}", config.port),
    }

    let bot = Bot::new(token);
    let state = Arc::new(BotState {
        pipeline: Arc::new(ReplyPipeline::from_config(&config)),
        telegram: TelegramClient::new(bot.clone()),
    });

    let handler = Update::filter_message()
        .branch(
            dptree::entry()
                .filter_command::<Command>()
                .endpoint(handle_command),
        )
        .branch(dptree::endpoint(handle_text));

    info!("🤖 Bot is running...");

    Dispatcher::builder(bot, handler)
        .dependencies(dptree::deps![state])
        .enable_ctrlc_handler()
        .build()
        .dispatch()
        .await;
}

async fn handle_command(msg: Message, cmd: Command, state: Arc<BotState>) -> ResponseResult<()> {
    match cmd {
        Command::Start => {
            let channel = &state.pipeline.contacts().channel;
            let welcome = format!(
                "🤖 Hello! I'm Savvy Chatbot, your AAU AI assistant built by Savvy Society Coordinator.\n\
                 🌐 Channel: {channel}\n\n\
                 Send me any question about Addis Ababa University or general topics!"
            );
            state.telegram.send_message(msg.chat.id.0, &welcome).await.ok();
        }
    }
    Ok(())
}

async fn handle_text(msg: Message, state: Arc<BotState>) -> ResponseResult<()> {
    let Some(text) = msg.text() else {
        return Ok(());
    };
    // Unknown commands are ignored.
    if text.starts_with('/') {
        return Ok(());
    }

    let chat_id = msg.chat.id.0;
    let user_text = text.trim().to_string();
    if user_text.is_empty() {
        state.telegram.send_message(chat_id, "Please send a text message.").await.ok();
        return Ok(());
    }

    let username = msg
        .from
        .as_ref()
        .map(|u| u.username.clone().unwrap_or_else(|| u.first_name.clone()))
        .unwrap_or_else(|| "unknown".to_string());
    let preview: String = user_text.chars().take(100).collect();
    info!("📨 {username} ({chat_id}): \"{preview}\"");

    let pipeline = state.pipeline.clone();
    let reply = async move { pipeline.generate_reply(&user_text).await };

    if let Err(e) = state.telegram.reply_after(chat_id, WORKING_TEXT, reply).await {
        warn!("Could not deliver reply to {chat_id}: {e}");
    }

    Ok(())
}
