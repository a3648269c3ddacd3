use std::net::SocketAddr;

use anyhow::Result;
use axum::Router;
use tokio::net::TcpListener;

use crate::{
    chat::{ChatEngine, SharedEngine},
    config::store::ChatBotConfig,
};

pub use handler::{AppState, router};

mod handler;

pub struct ChatServer {
    listener: TcpListener,
    router: Router,
}

impl ChatServer {
    pub async fn new(config: &ChatBotConfig) -> Result<Self> {
        let engine = ChatEngine::new(config)?;
        let state = AppState {
            engine: SharedEngine::new(engine),
            index_path: config.server.index_path.clone(),
        };

        let listener = TcpListener::bind(config.server.bind_address()).await?;

        Ok(Self {
            listener,
            router: router(state),
        })
    }

    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    pub async fn run(self) -> Result<()> {
        let ChatServer { listener, router } = self;

        axum::serve(listener, router)
            .with_graceful_shutdown(shutdown_signal())
            .await?;

        Ok(())
    }
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => log::info!("received ctrl-c, shutting down"),
        Err(why) => {
            log::error!("unable to listen for ctrl-c: {why:?}");
            std::future::pending::<()>().await;
        }
    }
}
