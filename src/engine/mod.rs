//! Match engine
//!
//! One actor task per match owns that match's `MatchState`; every
//! mutation flows through the actor's command queue, so resolution
//! never needs a lock. The actor also runs the clocks: reaction and
//! defense windows time out to a deterministic default (decline, no
//! defense), and bot turns fire after a short think delay. All timers
//! die with the match.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{broadcast, mpsc, oneshot, RwLock};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::character::CharacterSheet;
use crate::combat::actions::ActionPayload;
use crate::combat::attack::AttackEvent;
use crate::combat::state::{DefenseKind, MatchState, MatchStatus, PlayerInfo};
use crate::combat::{bot, resolve, scheduler};
use crate::error::{ActionError, ServerError};
use crate::rules::dice::{RandomRoller, Roller};
use crate::rulesets::{self, RulesetId};

/// Source of character sheets; persistence lives outside the engine.
pub trait CharacterProvider: Send + Sync {
    fn character(&self, id: &str) -> Option<CharacterSheet>;
}

/// Snapshot sink written after every state mutation.
pub trait MatchStore: Send + Sync {
    fn save(&self, state: &MatchState);
}

/// In-memory character registry
#[derive(Default)]
pub struct InMemoryCharacters {
    sheets: std::sync::RwLock<HashMap<String, CharacterSheet>>,
}

impl InMemoryCharacters {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, sheet: CharacterSheet) {
        if let Ok(mut sheets) = self.sheets.write() {
            sheets.insert(sheet.id().to_string(), sheet);
        }
    }
}

impl CharacterProvider for InMemoryCharacters {
    fn character(&self, id: &str) -> Option<CharacterSheet> {
        self.sheets.read().ok()?.get(id).cloned()
    }
}

/// In-memory snapshot store
#[derive(Default)]
pub struct InMemoryMatches {
    snapshots: std::sync::RwLock<HashMap<String, MatchState>>,
}

impl InMemoryMatches {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, match_id: &str) -> Option<MatchState> {
        self.snapshots.read().ok()?.get(match_id).cloned()
    }
}

impl MatchStore for InMemoryMatches {
    fn save(&self, state: &MatchState) {
        if let Ok(mut snapshots) = self.snapshots.write() {
            snapshots.insert(state.id.clone(), state.clone());
        }
    }
}

/// Engine timing knobs
#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub defense_timeout: Duration,
    pub reaction_timeout: Duration,
    pub bot_think_delay: Duration,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            defense_timeout: Duration::from_secs(30),
            reaction_timeout: Duration::from_secs(30),
            bot_think_delay: Duration::from_millis(1500),
        }
    }
}

/// A participant requested at match creation
#[derive(Debug, Clone)]
pub struct NewPlayer {
    pub id: String,
    pub name: String,
    pub character_id: String,
    pub is_bot: bool,
}

/// Pushed to subscribers after every mutation
#[derive(Debug, Clone)]
pub enum EngineEvent {
    StateChanged(Box<MatchState>),
    VisualEffects(Vec<AttackEvent>),
    ReactionPrompt { player_id: String, trigger_id: String },
    DefensePrompt { player_id: String, attacker_id: String, attack_margin: i32 },
}

enum Command {
    Action {
        player_id: String,
        action: ActionPayload,
        reply: oneshot::Sender<Result<(), ActionError>>,
    },
    Snapshot {
        reply: oneshot::Sender<MatchState>,
    },
    ReactionTimeout { generation: u64 },
    DefenseTimeout { generation: u64 },
    BotTurn { generation: u64 },
}

struct MatchHandle {
    tx: mpsc::Sender<Command>,
    events: broadcast::Sender<EngineEvent>,
}

type MatchRegistry = Arc<RwLock<HashMap<String, MatchHandle>>>;

/// Registry of running matches
pub struct MatchEngine {
    config: EngineConfig,
    characters: Arc<dyn CharacterProvider>,
    store: Arc<dyn MatchStore>,
    matches: MatchRegistry,
}

impl MatchEngine {
    pub fn new(
        config: EngineConfig,
        characters: Arc<dyn CharacterProvider>,
        store: Arc<dyn MatchStore>,
    ) -> Self {
        Self {
            config,
            characters,
            store,
            matches: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Create a match with the production roller.
    pub async fn create_match(
        &self,
        ruleset: RulesetId,
        entrants: Vec<NewPlayer>,
    ) -> Result<MatchState, ServerError> {
        self.create_match_with_roller(ruleset, entrants, Box::new(RandomRoller))
            .await
    }

    /// Create a match with an injected roller, for scripted replays.
    pub async fn create_match_with_roller(
        &self,
        ruleset: RulesetId,
        entrants: Vec<NewPlayer>,
        mut roller: Box<dyn Roller + Send>,
    ) -> Result<MatchState, ServerError> {
        let mut characters = Vec::new();
        let mut players = Vec::new();
        let mut combatants = Vec::new();

        for (index, entrant) in entrants.iter().enumerate() {
            let sheet = self
                .characters
                .character(&entrant.character_id)
                .ok_or_else(|| ServerError::CharacterNotFound(entrant.character_id.clone()))?;
            combatants.push(rulesets::create_combatant(
                &sheet,
                &entrant.id,
                rulesets::spawn_position(index, entrant.is_bot),
            ));
            characters.push(sheet);
            players.push(PlayerInfo {
                id: entrant.id.clone(),
                name: entrant.name.clone(),
                is_bot: entrant.is_bot,
                character_id: entrant.character_id.clone(),
            });
        }

        let ordered = rulesets::initiative_order(&players, &characters, roller.as_mut());
        let active = ordered
            .first()
            .map(|p| p.id.clone())
            .ok_or_else(|| ServerError::Config("match needs at least one player".into()))?;
        let first_name = ordered
            .first()
            .map(|p| p.name.clone())
            .unwrap_or_default();

        let state = MatchState {
            id: uuid::Uuid::new_v4().to_string(),
            ruleset,
            players: ordered,
            characters,
            combatants,
            active_turn_player_id: active,
            round: 1,
            log: vec![format!("Match started. {} acts first.", first_name)],
            status: MatchStatus::Active,
            winner_id: None,
            pending_defense: None,
            pending_reaction: None,
        };
        info!(match_id = %state.id, ruleset = %ruleset, "match created");
        self.store.save(&state);

        let (tx, rx) = mpsc::channel(32);
        let (events, _) = broadcast::channel(64);
        let snapshot = state.clone();
        let mut actor = MatchActor {
            state,
            roller,
            config: self.config.clone(),
            store: self.store.clone(),
            registry: self.matches.clone(),
            events: events.clone(),
            self_tx: tx.clone(),
            timer: None,
            generation: 0,
        };
        tokio::spawn(async move { actor.run(rx).await });

        self.matches
            .write()
            .await
            .insert(snapshot.id.clone(), MatchHandle { tx, events });
        Ok(snapshot)
    }

    /// Submit an action. The outer error is engine-level (unknown
    /// match); the inner is the rules rejection reported back to the
    /// submitting player only.
    pub async fn submit(
        &self,
        match_id: &str,
        player_id: &str,
        action: ActionPayload,
    ) -> Result<Result<(), ActionError>, ServerError> {
        let tx = self.sender(match_id).await?;
        let (reply, rx) = oneshot::channel();
        tx.send(Command::Action {
            player_id: player_id.to_string(),
            action,
            reply,
        })
        .await
        .map_err(|_| ServerError::EngineUnavailable)?;
        rx.await.map_err(|_| ServerError::EngineUnavailable)
    }

    /// Current state of a match.
    pub async fn snapshot(&self, match_id: &str) -> Result<MatchState, ServerError> {
        let tx = self.sender(match_id).await?;
        let (reply, rx) = oneshot::channel();
        tx.send(Command::Snapshot { reply })
            .await
            .map_err(|_| ServerError::EngineUnavailable)?;
        rx.await.map_err(|_| ServerError::EngineUnavailable)
    }

    /// Subscribe to a match's event stream.
    pub async fn subscribe(
        &self,
        match_id: &str,
    ) -> Result<broadcast::Receiver<EngineEvent>, ServerError> {
        let matches = self.matches.read().await;
        matches
            .get(match_id)
            .map(|h| h.events.subscribe())
            .ok_or_else(|| ServerError::MatchNotFound(match_id.to_string()))
    }

    async fn sender(&self, match_id: &str) -> Result<mpsc::Sender<Command>, ServerError> {
        let matches = self.matches.read().await;
        matches
            .get(match_id)
            .map(|h| h.tx.clone())
            .ok_or_else(|| ServerError::MatchNotFound(match_id.to_string()))
    }
}

struct MatchActor {
    state: MatchState,
    roller: Box<dyn Roller + Send>,
    config: EngineConfig,
    store: Arc<dyn MatchStore>,
    registry: MatchRegistry,
    events: broadcast::Sender<EngineEvent>,
    self_tx: mpsc::Sender<Command>,
    timer: Option<JoinHandle<()>>,
    generation: u64,
}

impl MatchActor {
    async fn run(&mut self, mut rx: mpsc::Receiver<Command>) {
        // kick off the clocks for whoever won initiative
        self.after_mutation(Vec::new());

        while let Some(command) = rx.recv().await {
            match command {
                Command::Action {
                    player_id,
                    action,
                    reply,
                } => {
                    let result = self.apply(&player_id, &action);
                    let _ = reply.send(result);
                }
                Command::Snapshot { reply } => {
                    let _ = reply.send(self.state.clone());
                }
                Command::ReactionTimeout { generation } => {
                    if generation != self.generation {
                        continue;
                    }
                    if let Some(pending) = &self.state.pending_reaction {
                        let reactor_id = pending.reactor_id.clone();
                        info!(match_id = %self.state.id, reactor = %reactor_id,
                            "reaction window timed out, declining");
                        let decline = ActionPayload::ReactionChoice { use_reaction: false };
                        if let Err(e) = self.apply(&reactor_id, &decline) {
                            warn!(match_id = %self.state.id, error = %e,
                                "reaction timeout failed to resolve");
                        }
                    }
                }
                Command::DefenseTimeout { generation } => {
                    if generation != self.generation {
                        continue;
                    }
                    if let Some(pending) = &self.state.pending_defense {
                        let defender_id = pending.defender_id.clone();
                        info!(match_id = %self.state.id, defender = %defender_id,
                            "defense window timed out, taking the hit");
                        let no_defense = ActionPayload::DefenseChoice {
                            defense: DefenseKind::None,
                            retreat: false,
                        };
                        if let Err(e) = self.apply(&defender_id, &no_defense) {
                            warn!(match_id = %self.state.id, error = %e,
                                "defense timeout failed to resolve");
                        }
                    }
                }
                Command::BotTurn { generation } => {
                    if generation != self.generation {
                        continue;
                    }
                    self.play_bot_turn();
                }
            }
            // the final snapshot is already persisted; the live handle
            // can go away once the match is decided
            if self.state.status == MatchStatus::Finished {
                break;
            }
        }

        if let Some(timer) = self.timer.take() {
            timer.abort();
        }
        self.registry.write().await.remove(&self.state.id);
        debug!(match_id = %self.state.id, "match actor stopped");
    }

    fn apply(&mut self, player_id: &str, action: &ActionPayload) -> Result<(), ActionError> {
        let outcome = resolve::submit_action(&mut self.state, player_id, action, self.roller.as_mut())?;
        if outcome.turn_over {
            scheduler::advance_turn(&mut self.state, self.roller.as_mut());
        }
        self.after_mutation(outcome.events);
        Ok(())
    }

    fn play_bot_turn(&mut self) {
        if self.state.status != MatchStatus::Active || self.state.has_pending_choice() {
            return;
        }
        let bot_id = self.state.active_turn_player_id.clone();
        if !self.state.player(&bot_id).map(|p| p.is_bot).unwrap_or(false) {
            return;
        }
        let action = bot::decide(&self.state, &bot_id).unwrap_or(ActionPayload::EndTurn);
        debug!(match_id = %self.state.id, bot = %bot_id, action = action.name(), "bot acts");
        if let Err(e) = self.apply(&bot_id, &action) {
            warn!(match_id = %self.state.id, error = %e, "bot action rejected, ending its turn");
            if let Err(e) = self.apply(&bot_id, &ActionPayload::EndTurn) {
                warn!(match_id = %self.state.id, error = %e, "bot could not end turn");
            }
        }
    }

    /// Persist, broadcast, and rearm the clocks after any change.
    fn after_mutation(&mut self, effects: Vec<AttackEvent>) {
        self.generation += 1;
        self.store.save(&self.state);
        let _ = self
            .events
            .send(EngineEvent::StateChanged(Box::new(self.state.clone())));
        if !effects.is_empty() {
            let _ = self.events.send(EngineEvent::VisualEffects(effects));
        }

        if let Some(timer) = self.timer.take() {
            timer.abort();
        }
        if self.state.status != MatchStatus::Active {
            if self.state.status == MatchStatus::Finished {
                info!(match_id = %self.state.id, winner = ?self.state.winner_id, "match finished");
            }
            return;
        }

        if let Some(pending) = &self.state.pending_reaction {
            let _ = self.events.send(EngineEvent::ReactionPrompt {
                player_id: pending.reactor_id.clone(),
                trigger_id: pending.trigger_id.clone(),
            });
            self.timer = Some(self.delayed(
                self.config.reaction_timeout,
                Command::ReactionTimeout {
                    generation: self.generation,
                },
            ));
        } else if let Some(pending) = &self.state.pending_defense {
            let _ = self.events.send(EngineEvent::DefensePrompt {
                player_id: pending.defender_id.clone(),
                attacker_id: pending.attacker_id.clone(),
                attack_margin: pending.attack_margin,
            });
            self.timer = Some(self.delayed(
                self.config.defense_timeout,
                Command::DefenseTimeout {
                    generation: self.generation,
                },
            ));
        } else if self
            .state
            .player(&self.state.active_turn_player_id)
            .map(|p| p.is_bot)
            .unwrap_or(false)
        {
            self.timer = Some(self.delayed(
                self.config.bot_think_delay,
                Command::BotTurn {
                    generation: self.generation,
                },
            ));
        }
    }

    fn delayed(&self, delay: Duration, command: Command) -> JoinHandle<()> {
        let tx = self.self_tx.clone();
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let _ = tx.send(command).await;
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::combat::state::Maneuver;
    use crate::rules::dice::FixedRoller;
    use crate::rulesets::{gurps, pf2};

    fn test_engine(ruleset: RulesetId) -> (MatchEngine, Arc<InMemoryMatches>) {
        let characters = Arc::new(InMemoryCharacters::new());
        match ruleset {
            RulesetId::Pf2 => {
                characters.insert(pf2::stock_fighter("c1", "Alice"));
                characters.insert(pf2::stock_fighter("c2", "Borg"));
            }
            RulesetId::Gurps => {
                characters.insert(gurps::stock_warrior("c1", "Alice"));
                characters.insert(gurps::stock_warrior("c2", "Borg"));
            }
        }
        let store = Arc::new(InMemoryMatches::new());
        let config = EngineConfig {
            defense_timeout: Duration::from_millis(20),
            reaction_timeout: Duration::from_millis(20),
            bot_think_delay: Duration::from_millis(1),
        };
        (
            MatchEngine::new(config, characters, store.clone()),
            store,
        )
    }

    fn entrants(bot_second: bool) -> Vec<NewPlayer> {
        vec![
            NewPlayer {
                id: "p1".into(),
                name: "Alice".into(),
                character_id: "c1".into(),
                is_bot: false,
            },
            NewPlayer {
                id: "p2".into(),
                name: "Borg".into(),
                character_id: "c2".into(),
                is_bot: bot_second,
            },
        ]
    }

    #[tokio::test]
    async fn test_create_match_rolls_initiative() {
        let (engine, store) = test_engine(RulesetId::Pf2);
        // identical sheets tie on score and dex; the roll breaks it
        let roller = Box::new(FixedRoller::new([999, 1]));
        let state = engine
            .create_match_with_roller(RulesetId::Pf2, entrants(false), roller)
            .await
            .unwrap();

        assert_eq!(state.status, MatchStatus::Active);
        assert_eq!(state.active_turn_player_id, "p1");
        assert_eq!(state.combatants.len(), 2);
        assert!(state.log[0].contains("Match started"));
        assert!(store.get(&state.id).is_some());
    }

    #[tokio::test]
    async fn test_unknown_character_rejected() {
        let (engine, _) = test_engine(RulesetId::Pf2);
        let err = engine
            .create_match(
                RulesetId::Pf2,
                vec![NewPlayer {
                    id: "p1".into(),
                    name: "Alice".into(),
                    character_id: "missing".into(),
                    is_bot: false,
                }],
            )
            .await
            .unwrap_err();
        assert!(matches!(err, ServerError::CharacterNotFound(_)));
    }

    #[tokio::test]
    async fn test_submit_to_unknown_match() {
        let (engine, _) = test_engine(RulesetId::Pf2);
        let err = engine
            .submit("nope", "p1", ActionPayload::EndTurn)
            .await
            .unwrap_err();
        assert!(matches!(err, ServerError::MatchNotFound(_)));
    }

    #[tokio::test]
    async fn test_turns_rotate_between_humans() {
        let (engine, _) = test_engine(RulesetId::Pf2);
        let roller = Box::new(FixedRoller::new([999, 1]));
        let state = engine
            .create_match_with_roller(RulesetId::Pf2, entrants(false), roller)
            .await
            .unwrap();

        engine
            .submit(&state.id, "p1", ActionPayload::EndTurn)
            .await
            .unwrap()
            .unwrap();
        let snap = engine.snapshot(&state.id).await.unwrap();
        assert_eq!(snap.active_turn_player_id, "p2");
        assert_eq!(snap.round, 1);

        engine
            .submit(&state.id, "p2", ActionPayload::EndTurn)
            .await
            .unwrap()
            .unwrap();
        let snap = engine.snapshot(&state.id).await.unwrap();
        assert_eq!(snap.active_turn_player_id, "p1");
        assert_eq!(snap.round, 2);
    }

    #[tokio::test]
    async fn test_rejection_is_returned_to_submitter() {
        let (engine, _) = test_engine(RulesetId::Pf2);
        let roller = Box::new(FixedRoller::new([999, 1]));
        let state = engine
            .create_match_with_roller(RulesetId::Pf2, entrants(false), roller)
            .await
            .unwrap();

        let rejection = engine
            .submit(&state.id, "p2", ActionPayload::EndTurn)
            .await
            .unwrap()
            .unwrap_err();
        assert_eq!(rejection, ActionError::NotYourTurn);
    }

    #[tokio::test]
    async fn test_bot_plays_its_turn() {
        let (engine, _) = test_engine(RulesetId::Pf2);
        // initiative, then one d20 for the bot's strike after it closes in
        let roller = Box::new(FixedRoller::new([999, 1, 5]));
        let state = engine
            .create_match_with_roller(RulesetId::Pf2, entrants(true), roller)
            .await
            .unwrap();

        engine
            .submit(&state.id, "p1", ActionPayload::EndTurn)
            .await
            .unwrap()
            .unwrap();
        tokio::time::sleep(Duration::from_millis(100)).await;

        let snap = engine.snapshot(&state.id).await.unwrap();
        assert_eq!(snap.active_turn_player_id, "p1");
        assert_eq!(snap.round, 2);
        assert!(snap.log.iter().any(|l| l.contains("attacks")));
    }

    #[tokio::test]
    async fn test_defense_timeout_takes_the_hit() {
        let (engine, _) = test_engine(RulesetId::Gurps);
        // initiative, attack d20 10 vs dodge 8, damage d6 4
        let roller = Box::new(FixedRoller::new([999, 1, 10, 4]));
        let state = engine
            .create_match_with_roller(RulesetId::Gurps, entrants(false), roller)
            .await
            .unwrap();

        // spawns are 2 hexes apart; step in, then attack next turn
        let approach = [
            ("p1", ActionPayload::SelectManeuver { maneuver: Maneuver::Move }),
            ("p1", ActionPayload::Move { to: crate::combat::grid::GridPosition::new(-2, 0) }),
            ("p2", ActionPayload::EndTurn),
            ("p1", ActionPayload::SelectManeuver { maneuver: Maneuver::Attack }),
            ("p1", ActionPayload::Attack { target_id: "p2".into() }),
        ];
        for (player, action) in approach {
            engine
                .submit(&state.id, player, action)
                .await
                .unwrap()
                .unwrap();
        }

        let snap = engine.snapshot(&state.id).await.unwrap();
        assert!(snap.pending_defense.is_some());

        tokio::time::sleep(Duration::from_millis(100)).await;
        let snap = engine.snapshot(&state.id).await.unwrap();
        assert!(snap.pending_defense.is_none());
        // broadsword [4]+1 minus DR 2
        let hp = snap.combatant("p2").unwrap().current_hp;
        assert_eq!(hp, 12 - 3);
        assert_eq!(snap.active_turn_player_id, "p2");
    }

    #[tokio::test]
    async fn test_finished_match_is_evicted() {
        let (engine, store) = test_engine(RulesetId::Gurps);
        // initiative, then three critical rounds of d20 20 and d6 6
        let roller = Box::new(FixedRoller::new([999, 1, 20, 6, 20, 6, 20, 6]));
        let state = engine
            .create_match_with_roller(RulesetId::Gurps, entrants(false), roller)
            .await
            .unwrap();

        let mut script = vec![
            ("p1", ActionPayload::SelectManeuver { maneuver: Maneuver::Move }),
            ("p1", ActionPayload::Move { to: crate::combat::grid::GridPosition::new(-2, 0) }),
            ("p2", ActionPayload::EndTurn),
        ];
        // each crit deals 5 past DR; three drop the 12 HP warrior
        for _ in 0..3 {
            script.push(("p1", ActionPayload::SelectManeuver { maneuver: Maneuver::Attack }));
            script.push(("p1", ActionPayload::Attack { target_id: "p2".into() }));
            script.push(("p2", ActionPayload::EndTurn));
        }
        script.pop();
        for (player, action) in script {
            engine
                .submit(&state.id, player, action)
                .await
                .unwrap()
                .unwrap();
        }

        // the actor tears itself down once the match is decided
        let mut evicted = false;
        for _ in 0..50 {
            if matches!(
                engine.snapshot(&state.id).await,
                Err(ServerError::MatchNotFound(_))
            ) {
                evicted = true;
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert!(evicted);

        // the final snapshot survives in the store
        let snap = store.get(&state.id).unwrap();
        assert_eq!(snap.status, MatchStatus::Finished);
        assert_eq!(snap.winner_id.as_deref(), Some("p1"));
    }
}
