//! Common test utilities - ArenaTest harness for end-to-end testing

#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use futures_util::{SinkExt, StreamExt};
use reqwest::Client;
use serde_json::Value;
use tokio::task::JoinHandle;
use tokio_tungstenite::{connect_async, tungstenite::Message};

use arenad::{Config, Server};

/// Test harness that runs a real arenad server on a random port
pub struct ArenaTest {
    pub addr: SocketAddr,
    pub client: Client,
    server: Arc<Server>,
    _handle: JoinHandle<()>,
}

impl ArenaTest {
    /// Start a new test server instance with short clocks
    pub async fn start() -> Result<Self> {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;

        let config = Config {
            bind_addr: addr,
            defense_timeout_ms: 200,
            reaction_timeout_ms: 200,
            bot_think_delay_ms: 1,
        };

        let server = Arc::new(Server::new(config));
        let server_clone = server.clone();

        // Spawn the server in a background task
        let handle = tokio::spawn(async move {
            if let Err(e) = server_clone.serve(listener).await {
                eprintln!("Server error: {}", e);
            }
        });

        // Wait for server to be ready
        let client = Client::builder().timeout(Duration::from_secs(5)).build()?;

        // Poll until server is ready (max 2 seconds)
        let mut ready = false;
        for _ in 0..20 {
            tokio::time::sleep(Duration::from_millis(100)).await;
            if client
                .get(format!("http://{}/health", addr))
                .send()
                .await
                .is_ok()
            {
                ready = true;
                break;
            }
        }

        if !ready {
            panic!("Server failed to start within 2 seconds");
        }

        Ok(Self {
            addr,
            client,
            server,
            _handle: handle,
        })
    }

    /// Get the base URL for the server
    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Make a GET request
    pub async fn get(&self, path: &str) -> Result<reqwest::Response> {
        Ok(self
            .client
            .get(format!("{}{}", self.base_url(), path))
            .send()
            .await?)
    }

    /// Get the WebSocket URL for the server
    pub fn ws_url(&self) -> String {
        format!("ws://{}/ws", self.addr)
    }

    /// Connect to the WebSocket endpoint and consume the welcome message
    pub async fn connect_ws(&self) -> Result<WsClient> {
        let (ws_stream, _) = connect_async(&self.ws_url()).await?;
        let (write, read) = ws_stream.split();
        let mut client = WsClient {
            write,
            read,
            player_id: String::new(),
        };
        let welcome = client.expect("welcome").await?;
        client.player_id = welcome["player_id"]
            .as_str()
            .unwrap_or_default()
            .to_string();
        Ok(client)
    }

    /// Shutdown the server gracefully
    pub fn shutdown(&self) {
        self.server.shutdown();
    }
}

/// WebSocket client for testing
pub struct WsClient {
    write: futures_util::stream::SplitSink<
        tokio_tungstenite::WebSocketStream<
            tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>,
        >,
        Message,
    >,
    read: futures_util::stream::SplitStream<
        tokio_tungstenite::WebSocketStream<
            tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>,
        >,
    >,
    pub player_id: String,
}

impl WsClient {
    /// Send any JSON message
    pub async fn send_json(&mut self, msg: Value) -> Result<()> {
        self.write
            .send(Message::Text(msg.to_string().into()))
            .await?;
        Ok(())
    }

    /// Create a match
    pub async fn create_match(&mut self, ruleset: &str, name: &str, vs_bot: bool) -> Result<()> {
        self.send_json(serde_json::json!({
            "type": "create_match",
            "ruleset": ruleset,
            "name": name,
            "vs_bot": vs_bot,
        }))
        .await
    }

    /// Join an open challenge
    pub async fn join(&mut self, match_id: &str, name: &str) -> Result<()> {
        self.send_json(serde_json::json!({
            "type": "join",
            "match_id": match_id,
            "name": name,
        }))
        .await
    }

    /// Submit an in-match action
    pub async fn action(&mut self, match_id: &str, action: Value) -> Result<()> {
        self.send_json(serde_json::json!({
            "type": "action",
            "match_id": match_id,
            "action": action,
        }))
        .await
    }

    /// Receive the next message as JSON
    pub async fn recv_json(&mut self) -> Result<Value> {
        loop {
            match self.read.next().await {
                Some(Ok(Message::Text(text))) => {
                    return Ok(serde_json::from_str(&text)?);
                }
                Some(Ok(Message::Close(_))) | None => {
                    anyhow::bail!("WebSocket closed");
                }
                _ => continue, // Skip binary/ping/pong frames
            }
        }
    }

    /// Receive with timeout
    pub async fn recv_json_timeout(&mut self, timeout: Duration) -> Result<Value> {
        match tokio::time::timeout(timeout, self.recv_json()).await {
            Ok(result) => result,
            Err(_) => anyhow::bail!("Timeout waiting for WebSocket message"),
        }
    }

    /// Wait for a message of a specific type, skipping others
    pub async fn expect(&mut self, msg_type: &str) -> Result<Value> {
        let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
        loop {
            let remaining = deadline.saturating_duration_since(tokio::time::Instant::now());
            if remaining.is_zero() {
                anyhow::bail!("Timeout waiting for message type '{}'", msg_type);
            }
            let msg = self.recv_json_timeout(remaining).await?;
            if msg["type"] == msg_type {
                return Ok(msg);
            }
        }
    }

    /// Wait for a match_state snapshot that satisfies a predicate
    pub async fn expect_state<F>(&mut self, mut pred: F) -> Result<Value>
    where
        F: FnMut(&Value) -> bool,
    {
        let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
        loop {
            let remaining = deadline.saturating_duration_since(tokio::time::Instant::now());
            if remaining.is_zero() {
                anyhow::bail!("Timeout waiting for matching match_state");
            }
            let msg = self.recv_json_timeout(remaining).await?;
            if msg["type"] == "match_state" && pred(&msg["state"]) {
                return Ok(msg["state"].clone());
            }
        }
    }

    /// Drain all pending messages (non-blocking)
    pub async fn drain(&mut self) -> Vec<Value> {
        let mut messages = Vec::new();
        while let Ok(Ok(msg)) =
            tokio::time::timeout(Duration::from_millis(50), self.recv_json()).await
        {
            messages.push(msg);
        }
        messages
    }

    /// Close the connection
    pub async fn close(&mut self) -> Result<()> {
        self.write.close().await?;
        Ok(())
    }
}

impl Drop for ArenaTest {
    fn drop(&mut self) {
        self.server.shutdown();
    }
}
