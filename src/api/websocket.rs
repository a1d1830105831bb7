//! WebSocket handler for real-time match play

use std::collections::HashMap;

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::IntoResponse,
};
use serde::{Deserialize, Serialize};
use tokio::sync::{broadcast, mpsc, RwLock};
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::character::CharacterSheet;
use crate::combat::actions::ActionPayload;
use crate::combat::attack::AttackEvent;
use crate::combat::grid::GridPosition;
use crate::combat::state::MatchState;
use crate::engine::{EngineEvent, NewPlayer};
use crate::rulesets::{gurps, pf2, RulesetId};

use super::{AppState, OpenChallenge};

/// A connected player session
pub struct PlayerSession {
    pub player_id: String,
    pub name: String,
    pub match_id: Option<String>,
    pub sender: mpsc::Sender<ServerMessage>,
    /// Task forwarding engine events to this connection
    pub forwarder: Option<JoinHandle<()>>,
}

/// Connection manager for all active WebSocket connections
#[derive(Default)]
pub struct ConnectionManager {
    sessions: RwLock<HashMap<String, PlayerSession>>,
}

impl ConnectionManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new player session
    pub async fn register(&self, session: PlayerSession) {
        let player_id = session.player_id.clone();
        self.sessions.write().await.insert(player_id, session);
    }

    /// Remove a player session and stop its event forwarder
    pub async fn unregister(&self, player_id: &str) {
        if let Some(session) = self.sessions.write().await.remove(player_id) {
            if let Some(forwarder) = session.forwarder {
                forwarder.abort();
            }
        }
    }

    /// Get a player's sender channel
    pub async fn get_sender(&self, player_id: &str) -> Option<mpsc::Sender<ServerMessage>> {
        self.sessions
            .read()
            .await
            .get(player_id)
            .map(|s| s.sender.clone())
    }

    /// Send a message to a specific player
    pub async fn send_to_player(&self, player_id: &str, msg: ServerMessage) {
        if let Some(sender) = self.get_sender(player_id).await {
            if sender.send(msg).await.is_err() {
                warn!("Failed to send message to player {}", player_id);
            }
        }
    }

    /// Point a session at a match, replacing any previous forwarder
    pub async fn attach_match(&self, player_id: &str, match_id: &str, forwarder: JoinHandle<()>) {
        if let Some(session) = self.sessions.write().await.get_mut(player_id) {
            session.match_id = Some(match_id.to_string());
            if let Some(old) = session.forwarder.replace(forwarder) {
                old.abort();
            }
        } else {
            forwarder.abort();
        }
    }
}

/// Messages sent from server to client
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type")]
pub enum ServerMessage {
    /// Welcome message on connect
    #[serde(rename = "welcome")]
    Welcome { player_id: String },
    /// An open challenge is waiting for an opponent
    #[serde(rename = "match_pending")]
    MatchPending { match_id: String },
    /// Full match snapshot
    #[serde(rename = "match_state")]
    MatchState { state: Box<MatchState> },
    /// One visual cue from a resolution
    #[serde(rename = "visual_effect")]
    VisualEffect {
        effect: &'static str,
        attacker_id: Option<String>,
        target_id: String,
        value: Option<i32>,
        position: GridPosition,
    },
    /// The recipient may spend a reaction
    #[serde(rename = "reaction_prompt")]
    ReactionPrompt { trigger_id: String },
    /// The recipient must pick a defense
    #[serde(rename = "defense_prompt")]
    DefensePrompt { attacker_id: String, attack_margin: i32 },
    /// Error message (requesting connection only)
    #[serde(rename = "error")]
    Error { message: String },
}

/// Messages sent from client to server
#[derive(Debug, Deserialize)]
#[serde(tag = "type")]
pub enum ClientMessage {
    /// Start a match; `vs_bot` fills the other seat immediately,
    /// otherwise the match waits as an open challenge
    #[serde(rename = "create_match")]
    CreateMatch {
        ruleset: RulesetId,
        name: String,
        vs_bot: bool,
    },
    /// Take the open seat of a pending challenge
    #[serde(rename = "join")]
    Join { match_id: String, name: String },
    /// Submit an in-match action
    #[serde(rename = "action")]
    Action {
        match_id: String,
        action: ActionPayload,
    },
    /// Ping to keep connection alive
    #[serde(rename = "ping")]
    Ping,
}

/// Handle WebSocket upgrade
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

/// Handle an individual WebSocket connection
async fn handle_socket(mut socket: WebSocket, state: AppState) {
    // Create message channel for this connection
    let (tx, mut rx) = mpsc::channel::<ServerMessage>(32);

    let player_id = uuid::Uuid::new_v4().to_string();
    let player_id_clone = player_id.clone();

    info!("WebSocket connected: {}", player_id);

    let session = PlayerSession {
        player_id: player_id.clone(),
        name: String::new(),
        match_id: None,
        sender: tx,
        forwarder: None,
    };

    state.connections.register(session).await;

    // Send welcome message
    let welcome = ServerMessage::Welcome {
        player_id: player_id.clone(),
    };
    if let Ok(json) = serde_json::to_string(&welcome) {
        let _ = socket.send(Message::Text(json.into())).await;
    }

    // Main loop: handle incoming messages and outgoing messages
    loop {
        tokio::select! {
            // Handle outgoing messages from our channel
            Some(msg) = rx.recv() => {
                if let Ok(json) = serde_json::to_string(&msg) {
                    if socket.send(Message::Text(json.into())).await.is_err() {
                        break;
                    }
                }
            }
            // Handle incoming messages from WebSocket
            result = socket.recv() => {
                match result {
                    Some(Ok(Message::Text(text))) => {
                        match serde_json::from_str::<ClientMessage>(&text) {
                            Ok(client_msg) => {
                                handle_client_message(&state, &player_id, client_msg).await;
                            }
                            Err(e) => {
                                state.connections.send_to_player(&player_id, ServerMessage::Error {
                                    message: format!("malformed message: {}", e),
                                }).await;
                            }
                        }
                    }
                    Some(Ok(Message::Close(_))) | None => break,
                    _ => {}
                }
            }
        }
    }

    // Clean up
    state.connections.unregister(&player_id_clone).await;
    info!("WebSocket disconnected: {}", player_id_clone);
}

/// Handle a message from the client
async fn handle_client_message(state: &AppState, player_id: &str, msg: ClientMessage) {
    match msg {
        ClientMessage::CreateMatch {
            ruleset,
            name,
            vs_bot,
        } => {
            if vs_bot {
                create_bot_match(state, player_id, ruleset, &name).await;
            } else {
                create_challenge(state, player_id, ruleset, &name).await;
            }
        }
        ClientMessage::Join { match_id, name } => {
            join_challenge(state, player_id, &match_id, &name).await;
        }
        ClientMessage::Action { match_id, action } => {
            submit_action(state, player_id, &match_id, action).await;
        }
        ClientMessage::Ping => {
            // Just keep the connection alive, no response needed
        }
    }
}

/// Stock character sheet for a fresh entrant
fn stock_sheet(ruleset: RulesetId, character_id: &str, name: &str) -> CharacterSheet {
    match ruleset {
        RulesetId::Pf2 => pf2::stock_fighter(character_id, name),
        RulesetId::Gurps => gurps::stock_warrior(character_id, name),
    }
}

fn entrant(state: &AppState, ruleset: RulesetId, player_id: &str, name: &str, is_bot: bool) -> NewPlayer {
    let character_id = format!("{}-char", player_id);
    state
        .characters
        .insert(stock_sheet(ruleset, &character_id, name));
    NewPlayer {
        id: player_id.to_string(),
        name: name.to_string(),
        character_id,
        is_bot,
    }
}

async fn create_bot_match(state: &AppState, player_id: &str, ruleset: RulesetId, name: &str) {
    let bot_id = format!("bot-{}", uuid::Uuid::new_v4());
    let entrants = vec![
        entrant(state, ruleset, player_id, name, false),
        entrant(state, ruleset, &bot_id, "Arena Bot", true),
    ];
    match state.engine.create_match(ruleset, entrants).await {
        Ok(match_state) => {
            attach(state, player_id, &match_state.id).await;
            state
                .connections
                .send_to_player(
                    player_id,
                    ServerMessage::MatchState {
                        state: Box::new(match_state),
                    },
                )
                .await;
        }
        Err(e) => {
            state
                .connections
                .send_to_player(player_id, ServerMessage::Error { message: e.to_string() })
                .await;
        }
    }
}

async fn create_challenge(state: &AppState, player_id: &str, ruleset: RulesetId, name: &str) {
    let challenge_id = uuid::Uuid::new_v4().to_string();
    state.challenges.write().await.insert(
        challenge_id.clone(),
        OpenChallenge {
            ruleset,
            host_player_id: player_id.to_string(),
            host_name: name.to_string(),
        },
    );
    info!(challenge = %challenge_id, host = %player_id, "challenge opened");
    state
        .connections
        .send_to_player(
            player_id,
            ServerMessage::MatchPending {
                match_id: challenge_id,
            },
        )
        .await;
}

async fn join_challenge(state: &AppState, player_id: &str, challenge_id: &str, name: &str) {
    let Some(challenge) = state.challenges.write().await.remove(challenge_id) else {
        state
            .connections
            .send_to_player(
                player_id,
                ServerMessage::Error {
                    message: format!("no open challenge {}", challenge_id),
                },
            )
            .await;
        return;
    };

    let entrants = vec![
        entrant(
            state,
            challenge.ruleset,
            &challenge.host_player_id,
            &challenge.host_name,
            false,
        ),
        entrant(state, challenge.ruleset, player_id, name, false),
    ];
    match state.engine.create_match(challenge.ruleset, entrants).await {
        Ok(match_state) => {
            attach(state, &challenge.host_player_id, &match_state.id).await;
            attach(state, player_id, &match_state.id).await;
            let snapshot = ServerMessage::MatchState {
                state: Box::new(match_state),
            };
            state
                .connections
                .send_to_player(&challenge.host_player_id, snapshot.clone())
                .await;
            state.connections.send_to_player(player_id, snapshot).await;
        }
        Err(e) => {
            state
                .connections
                .send_to_player(player_id, ServerMessage::Error { message: e.to_string() })
                .await;
        }
    }
}

async fn submit_action(state: &AppState, player_id: &str, match_id: &str, action: ActionPayload) {
    match state.engine.submit(match_id, player_id, action).await {
        Ok(Ok(())) => {}
        // rules rejection: only the requester hears about it
        Ok(Err(rejection)) => {
            state
                .connections
                .send_to_player(
                    player_id,
                    ServerMessage::Error {
                        message: rejection.to_string(),
                    },
                )
                .await;
        }
        Err(e) => {
            state
                .connections
                .send_to_player(player_id, ServerMessage::Error { message: e.to_string() })
                .await;
        }
    }
}

/// Subscribe the player to a match's event stream
async fn attach(state: &AppState, player_id: &str, match_id: &str) {
    let events = match state.engine.subscribe(match_id).await {
        Ok(events) => events,
        Err(e) => {
            warn!(player = %player_id, error = %e, "subscribe failed");
            return;
        }
    };
    let forwarder = spawn_forwarder(state, player_id.to_string(), events);
    state
        .connections
        .attach_match(player_id, match_id, forwarder)
        .await;
}

fn spawn_forwarder(
    state: &AppState,
    player_id: String,
    mut events: broadcast::Receiver<EngineEvent>,
) -> JoinHandle<()> {
    let connections = state.connections.clone();
    tokio::spawn(async move {
        loop {
            match events.recv().await {
                Ok(event) => {
                    for msg in event_messages(event, &player_id) {
                        connections.send_to_player(&player_id, msg).await;
                    }
                }
                Err(broadcast::error::RecvError::Lagged(missed)) => {
                    warn!(player = %player_id, missed, "event stream lagged");
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
    })
}

/// Translate an engine event into the messages this player should see.
/// Prompts are addressed; everything else fans out to everyone.
fn event_messages(event: EngineEvent, player_id: &str) -> Vec<ServerMessage> {
    match event {
        EngineEvent::StateChanged(state) => vec![ServerMessage::MatchState { state }],
        EngineEvent::VisualEffects(effects) => {
            effects.iter().map(effect_message).collect()
        }
        EngineEvent::ReactionPrompt {
            player_id: reactor,
            trigger_id,
        } => {
            if reactor == player_id {
                vec![ServerMessage::ReactionPrompt { trigger_id }]
            } else {
                Vec::new()
            }
        }
        EngineEvent::DefensePrompt {
            player_id: defender,
            attacker_id,
            attack_margin,
        } => {
            if defender == player_id {
                vec![ServerMessage::DefensePrompt {
                    attacker_id,
                    attack_margin,
                }]
            } else {
                Vec::new()
            }
        }
    }
}

fn effect_message(event: &AttackEvent) -> ServerMessage {
    match event {
        AttackEvent::Damage {
            attacker_id,
            target_id,
            value,
            position,
        } => ServerMessage::VisualEffect {
            effect: "damage",
            attacker_id: Some(attacker_id.clone()),
            target_id: target_id.clone(),
            value: Some(*value),
            position: *position,
        },
        AttackEvent::Miss {
            attacker_id,
            target_id,
            position,
        } => ServerMessage::VisualEffect {
            effect: "miss",
            attacker_id: Some(attacker_id.clone()),
            target_id: target_id.clone(),
            value: None,
            position: *position,
        },
        AttackEvent::Defend {
            defender_id,
            position,
        } => ServerMessage::VisualEffect {
            effect: "defend",
            attacker_id: None,
            target_id: defender_id.clone(),
            value: None,
            position: *position,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_action_message_decodes_tagged_payload() {
        let json = r#"{
            "type": "action",
            "match_id": "m1",
            "action": {"type": "strike", "target_id": "p2"}
        }"#;
        let msg: ClientMessage = serde_json::from_str(json).unwrap();
        match msg {
            ClientMessage::Action { match_id, action } => {
                assert_eq!(match_id, "m1");
                assert!(matches!(action, ActionPayload::Strike { .. }));
            }
            other => panic!("unexpected message: {:?}", other),
        }
    }

    #[test]
    fn test_effect_message_wire_shape() {
        let msg = effect_message(&AttackEvent::Damage {
            attacker_id: "p1".into(),
            target_id: "p2".into(),
            value: 7,
            position: GridPosition::new(1, 0),
        });
        let json = serde_json::to_value(&msg).unwrap();
        assert_eq!(json["type"], "visual_effect");
        assert_eq!(json["effect"], "damage");
        assert_eq!(json["value"], 7);
    }

    #[test]
    fn test_prompts_are_addressed() {
        let prompt = EngineEvent::DefensePrompt {
            player_id: "p2".into(),
            attacker_id: "p1".into(),
            attack_margin: 3,
        };
        assert!(event_messages(prompt.clone(), "p1").is_empty());
        assert_eq!(event_messages(prompt, "p2").len(), 1);
    }
}
