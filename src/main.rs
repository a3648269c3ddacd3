use std::path::PathBuf;

use config::store::ChatBotConfig;
use server::ChatServer;
use utils::log::Logger;

mod chat;
mod config;
mod server;
mod utils;

#[tokio::main]
async fn main() {
    let config = match ChatBotConfig::load(PathBuf::from("config.toml")) {
        Ok(config) => config,
        Err(why) => {
            Logger::init(None);
            log::error!("Fatal error: {why:#}");
            std::process::exit(1);
        }
    };

    Logger::init(config.log_level());

    if let Err(why) = run(config).await {
        log::error!("Fatal error: {why:#}");
        std::process::exit(1);
    }
}

async fn run(config: ChatBotConfig) -> anyhow::Result<()> {
    log::debug!("configuration read from {}", config.path.display());
    log::info!(
        "Using LLM at {} (model: {}, streaming: {}).",
        config.llm.base_url.as_deref().unwrap_or_default(),
        config.llm.model,
        if config.llm.streaming { "on" } else { "off" }
    );

    let server = ChatServer::new(&config).await?;
    log::info!("Listening on port {}", server.local_addr()?.port());

    server.run().await
}
