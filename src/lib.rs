//! arenad - turn-based tactical combat server daemon
//!
//! Runs multiplayer arena matches under pluggable rulesets (PF2-like
//! and GURPS-like) over a WebSocket API.

pub mod api;
pub mod character;
pub mod combat;
pub mod config;
pub mod content;
pub mod engine;
pub mod error;
pub mod rules;
pub mod rulesets;

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Result;
use axum::Router;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tracing::info;

pub use config::Config;
use engine::{CharacterProvider, InMemoryCharacters, InMemoryMatches, MatchEngine, MatchStore};

/// The arenad server instance
pub struct Server {
    config: Config,
    engine: Arc<MatchEngine>,
    characters: Arc<InMemoryCharacters>,
    shutdown_tx: watch::Sender<bool>,
    shutdown_rx: watch::Receiver<bool>,
}

impl Server {
    /// Create a new server instance
    pub fn new(config: Config) -> Self {
        let characters = Arc::new(InMemoryCharacters::new());
        let provider: Arc<dyn CharacterProvider> = characters.clone();
        let store: Arc<dyn MatchStore> = Arc::new(InMemoryMatches::new());
        let engine = Arc::new(MatchEngine::new(config.engine(), provider, store));
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        Self {
            config,
            engine,
            characters,
            shutdown_tx,
            shutdown_rx,
        }
    }

    /// Get the match engine handle
    pub fn engine(&self) -> Arc<MatchEngine> {
        self.engine.clone()
    }

    /// Build the router
    pub fn router(&self) -> Router {
        api::router(self.engine.clone(), self.characters.clone())
    }

    /// Run the server until shutdown
    pub async fn run(&self) -> Result<()> {
        let listener = TcpListener::bind(self.config.bind_addr).await?;
        self.serve(listener).await
    }

    /// Serve on an already-bound listener until shutdown
    pub async fn serve(&self, listener: TcpListener) -> Result<()> {
        let local_addr = listener.local_addr()?;
        info!("arenad listening on {}", local_addr);

        let router = self.router();
        let mut shutdown_rx = self.shutdown_rx.clone();

        axum::serve(listener, router)
            .with_graceful_shutdown(async move {
                shutdown_rx.changed().await.ok();
            })
            .await?;

        info!("arenad shutdown complete");
        Ok(())
    }

    /// Signal the server to shutdown
    pub fn shutdown(&self) {
        let _ = self.shutdown_tx.send(true);
    }

    /// Get the configured bind address
    pub fn bind_addr(&self) -> SocketAddr {
        self.config.bind_addr
    }
}
