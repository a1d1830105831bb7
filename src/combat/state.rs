//! Match and combatant state
//!
//! `MatchState` is the single authoritative record for one match. It is
//! serialized wholesale to clients after every resolution, so every
//! field here is part of the wire format.

use serde::{Deserialize, Serialize};

use crate::character::{CharacterSheet, DamageType};
use crate::combat::grid::GridPosition;
use crate::rules::conditions::{Condition, ConditionValue};
use crate::rulesets::RulesetId;

/// A participant in a match
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlayerInfo {
    pub id: String,
    pub name: String,
    pub is_bot: bool,
    pub character_id: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchStatus {
    Waiting,
    Active,
    Finished,
}

/// Spell slots consumed at one level for one casting entry
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct SlotUsage {
    pub caster_index: usize,
    pub level: u8,
    pub used: u8,
}

/// PF2-like per-combatant combat state
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Pf2Combatant {
    pub actions_remaining: u8,
    pub reaction_available: bool,
    /// Current multiple attack penalty, 0 / -5 / -10 (-4 / -8 agile)
    pub map_penalty: i32,
    pub conditions: Vec<ConditionValue>,
    pub temp_hp: i32,
    pub shield_raised: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub shield_hp: Option<i32>,
    pub dying: i32,
    pub wounded: i32,
    pub doomed: i32,
    pub slot_usage: Vec<SlotUsage>,
    pub focus_points_used: u8,
}

impl Default for Pf2Combatant {
    fn default() -> Self {
        Self {
            actions_remaining: 3,
            reaction_available: true,
            map_penalty: 0,
            conditions: Vec::new(),
            temp_hp: 0,
            shield_raised: false,
            shield_hp: None,
            dying: 0,
            wounded: 0,
            doomed: 0,
            slot_usage: Vec::new(),
            focus_points_used: 0,
        }
    }
}

impl Pf2Combatant {
    pub fn slots_used(&self, caster_index: usize, level: u8) -> u8 {
        self.slot_usage
            .iter()
            .find(|s| s.caster_index == caster_index && s.level == level)
            .map(|s| s.used)
            .unwrap_or(0)
    }

    pub fn spend_slot(&mut self, caster_index: usize, level: u8) {
        if let Some(entry) = self
            .slot_usage
            .iter_mut()
            .find(|s| s.caster_index == caster_index && s.level == level)
        {
            entry.used += 1;
        } else {
            self.slot_usage.push(SlotUsage {
                caster_index,
                level,
                used: 1,
            });
        }
    }

    pub fn has_condition(&self, condition: Condition) -> bool {
        crate::rules::conditions::has_condition(&self.conditions, condition)
    }

    pub fn remove_condition(&mut self, condition: Condition) {
        self.conditions.retain(|c| c.condition != condition);
    }

    /// Add or replace a condition, keeping at most one entry per tag.
    pub fn set_condition(&mut self, value: ConditionValue) {
        self.remove_condition(value.condition);
        self.conditions.push(value);
    }
}

/// GURPS-like body posture
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Posture {
    Standing,
    Crouching,
    Kneeling,
    Prone,
}

/// GURPS-like turn maneuver
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Maneuver {
    DoNothing,
    Move,
    Aim,
    Evaluate,
    ChangePosture,
    Attack,
    AllOutAttack,
    AllOutDefense,
    MoveAndAttack,
}

/// GURPS-like per-combatant combat state
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GurpsCombatant {
    pub posture: Posture,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub maneuver: Option<Maneuver>,
    pub current_fp: i32,
    pub aim_turns: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub aim_target_id: Option<String>,
    pub evaluate_bonus: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub evaluate_target_id: Option<String>,
    pub shock_penalty: i32,
    pub retreated_this_turn: bool,
    pub defenses_this_turn: u8,
    pub parry_weapons_used: Vec<String>,
    /// Weapon currently in hand; attacks without one land as punches
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ready_weapon_id: Option<String>,
}

impl GurpsCombatant {
    pub fn new(fatigue_points: i32, ready_weapon_id: Option<String>) -> Self {
        Self {
            posture: Posture::Standing,
            maneuver: None,
            current_fp: fatigue_points,
            aim_turns: 0,
            aim_target_id: None,
            evaluate_bonus: 0,
            evaluate_target_id: None,
            shock_penalty: 0,
            retreated_this_turn: false,
            defenses_this_turn: 0,
            parry_weapons_used: Vec::new(),
            ready_weapon_id,
        }
    }
}

/// Ruleset-specific slice of a combatant
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "ruleset", rename_all = "snake_case")]
pub enum RulesData {
    Pf2(Pf2Combatant),
    Gurps(GurpsCombatant),
}

/// What applying damage did to the target
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DamageOutcome {
    /// Still standing
    Wounded,
    /// Dropped to 0 HP; dying value recorded
    Unconscious { dying: i32 },
    /// Dying reached the death threshold
    Dead,
}

/// One combatant inside a match
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Combatant {
    pub player_id: String,
    pub character_id: String,
    pub position: GridPosition,
    pub current_hp: i32,
    pub status_effects: Vec<String>,
    #[serde(flatten)]
    pub rules: RulesData,
}

impl Combatant {
    pub fn pf2(&self) -> Option<&Pf2Combatant> {
        match &self.rules {
            RulesData::Pf2(c) => Some(c),
            RulesData::Gurps(_) => None,
        }
    }

    pub fn pf2_mut(&mut self) -> Option<&mut Pf2Combatant> {
        match &mut self.rules {
            RulesData::Pf2(c) => Some(c),
            RulesData::Gurps(_) => None,
        }
    }

    pub fn gurps(&self) -> Option<&GurpsCombatant> {
        match &self.rules {
            RulesData::Gurps(c) => Some(c),
            RulesData::Pf2(_) => None,
        }
    }

    pub fn gurps_mut(&mut self) -> Option<&mut GurpsCombatant> {
        match &mut self.rules {
            RulesData::Gurps(c) => Some(c),
            RulesData::Pf2(_) => None,
        }
    }

    pub fn has_status(&self, status: &str) -> bool {
        self.status_effects.iter().any(|s| s == status)
    }

    fn add_status(&mut self, status: &str) {
        if !self.has_status(status) {
            self.status_effects.push(status.to_string());
        }
    }

    fn remove_status(&mut self, status: &str) {
        self.status_effects.retain(|s| s != status);
    }

    /// Out of the fight: at 0 HP, unconscious, or dead.
    pub fn is_defeated(&self) -> bool {
        self.current_hp <= 0 || self.has_status("unconscious") || self.has_status("dead")
    }

    /// Apply damage. Temporary HP (PF2-like) absorbs first; HP clamps
    /// at 0. Dropping to 0 sets dying = 1 + wounded, unconscious, and
    /// prone; dying at or past the death threshold (4 - doomed) kills
    /// outright.
    pub fn apply_damage(&mut self, amount: i32) -> DamageOutcome {
        let mut remaining = amount.max(0);

        if let Some(pf2) = self.pf2_mut() {
            if pf2.temp_hp > 0 {
                let absorbed = pf2.temp_hp.min(remaining);
                pf2.temp_hp -= absorbed;
                remaining -= absorbed;
            }
        }

        self.current_hp = (self.current_hp - remaining).max(0);
        if self.current_hp > 0 {
            return DamageOutcome::Wounded;
        }

        match self.pf2_mut() {
            Some(pf2) => {
                let dying = 1 + pf2.wounded;
                let death_threshold = 4 - pf2.doomed;
                if dying >= death_threshold {
                    self.remove_status("unconscious");
                    self.add_status("dead");
                    DamageOutcome::Dead
                } else {
                    pf2.dying = dying;
                    pf2.set_condition(ConditionValue::new(Condition::Unconscious));
                    pf2.set_condition(ConditionValue::new(Condition::Prone));
                    self.add_status("unconscious");
                    DamageOutcome::Unconscious { dying }
                }
            }
            None => {
                self.add_status("unconscious");
                DamageOutcome::Unconscious { dying: 0 }
            }
        }
    }

    /// Apply healing, capped at `max_hp`. Healing a dying combatant
    /// clears dying and unconscious and adds one wounded.
    pub fn apply_healing(&mut self, amount: i32, max_hp: i32) {
        if amount <= 0 {
            return;
        }
        self.current_hp = (self.current_hp + amount).min(max_hp);

        let was_dying = self.pf2().map(|p| p.dying > 0).unwrap_or(false);
        if was_dying {
            if let Some(pf2) = self.pf2_mut() {
                pf2.dying = 0;
                pf2.wounded += 1;
                pf2.remove_condition(Condition::Unconscious);
            }
            self.remove_status("unconscious");
        }
    }
}

/// GURPS-like active defense choice
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DefenseKind {
    Dodge,
    Parry,
    Block,
    None,
}

/// A landed GURPS-like attack waiting on the defender's choice
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PendingDefense {
    pub attacker_id: String,
    pub defender_id: String,
    /// How much the attack roll succeeded by
    pub attack_margin: i32,
    pub weapon: String,
    /// Damage formula rolled only if the defense fails
    pub damage: String,
    pub damage_type: DamageType,
    pub deceptive_penalty: i32,
}

/// What movement triggered a pending reaction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReactionTrigger {
    Stride,
    Interact,
}

/// A paused action waiting on a reactor's use-it-or-decline choice
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PendingReaction {
    pub reactor_id: String,
    pub trigger_id: String,
    pub trigger: ReactionTrigger,
    /// Where the triggering move was headed; the move completes here
    /// after the reaction resolves (unless the mover drops)
    pub destination: GridPosition,
}

/// Authoritative state of one match
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchState {
    pub id: String,
    pub ruleset: RulesetId,
    pub players: Vec<PlayerInfo>,
    /// Sheet snapshots taken at match start
    pub characters: Vec<CharacterSheet>,
    pub combatants: Vec<Combatant>,
    pub active_turn_player_id: String,
    pub round: u32,
    pub log: Vec<String>,
    pub status: MatchStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub winner_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pending_defense: Option<PendingDefense>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pending_reaction: Option<PendingReaction>,
}

impl MatchState {
    pub fn player(&self, player_id: &str) -> Option<&PlayerInfo> {
        self.players.iter().find(|p| p.id == player_id)
    }

    pub fn player_name(&self, player_id: &str) -> &str {
        self.player(player_id).map(|p| p.name.as_str()).unwrap_or("Unknown")
    }

    pub fn combatant(&self, player_id: &str) -> Option<&Combatant> {
        self.combatants.iter().find(|c| c.player_id == player_id)
    }

    pub fn combatant_mut(&mut self, player_id: &str) -> Option<&mut Combatant> {
        self.combatants.iter_mut().find(|c| c.player_id == player_id)
    }

    pub fn character(&self, character_id: &str) -> Option<&CharacterSheet> {
        self.characters.iter().find(|c| c.id() == character_id)
    }

    /// Sheet for a combatant, by its character id.
    pub fn character_for(&self, combatant: &Combatant) -> Option<&CharacterSheet> {
        self.character(&combatant.character_id)
    }

    /// Cells occupied by everyone except `player_id`.
    pub fn occupied_except(&self, player_id: &str) -> Vec<GridPosition> {
        self.combatants
            .iter()
            .filter(|c| c.player_id != player_id)
            .map(|c| c.position)
            .collect()
    }

    pub fn push_log(&mut self, entry: impl Into<String>) {
        self.log.push(entry.into());
    }

    /// A pending defense or reaction suspends all normal actions.
    pub fn has_pending_choice(&self) -> bool {
        self.pending_defense.is_some() || self.pending_reaction.is_some()
    }

    /// Finish the match when at most one combatant is still standing.
    pub fn check_victory(&mut self) {
        if self.status == MatchStatus::Finished {
            return;
        }
        let alive: Vec<&Combatant> =
            self.combatants.iter().filter(|c| !c.is_defeated()).collect();
        if alive.len() <= 1 {
            let winner = alive.first().map(|c| c.player_id.clone());
            self.status = MatchStatus::Finished;
            let entry = match winner.as_deref() {
                Some(id) => format!("{} wins!", self.player_name(id)),
                None => "Draw - no survivors!".to_string(),
            };
            self.winner_id = winner;
            self.log.push(entry);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pf2_combatant(hp: i32) -> Combatant {
        Combatant {
            player_id: "p1".into(),
            character_id: "c1".into(),
            position: GridPosition::new(0, 0),
            current_hp: hp,
            status_effects: vec![],
            rules: RulesData::Pf2(Pf2Combatant::default()),
        }
    }

    #[test]
    fn test_damage_clamps_at_zero() {
        let mut c = pf2_combatant(10);
        let outcome = c.apply_damage(25);
        assert_eq!(c.current_hp, 0);
        assert_eq!(outcome, DamageOutcome::Unconscious { dying: 1 });
        assert!(c.has_status("unconscious"));
        assert!(c.pf2().unwrap().has_condition(Condition::Prone));
    }

    #[test]
    fn test_temp_hp_absorbs_first() {
        let mut c = pf2_combatant(10);
        c.pf2_mut().unwrap().temp_hp = 5;
        assert_eq!(c.apply_damage(7), DamageOutcome::Wounded);
        assert_eq!(c.pf2().unwrap().temp_hp, 0);
        assert_eq!(c.current_hp, 8);
    }

    #[test]
    fn test_dying_includes_wounded() {
        let mut c = pf2_combatant(5);
        c.pf2_mut().unwrap().wounded = 2;
        assert_eq!(c.apply_damage(5), DamageOutcome::Unconscious { dying: 3 });
        assert_eq!(c.pf2().unwrap().dying, 3);
    }

    #[test]
    fn test_death_threshold_shrinks_with_doomed() {
        let mut c = pf2_combatant(5);
        {
            let pf2 = c.pf2_mut().unwrap();
            pf2.wounded = 2;
            pf2.doomed = 1;
        }
        // dying would be 3, threshold is 4 - 1 = 3
        assert_eq!(c.apply_damage(5), DamageOutcome::Dead);
        assert!(c.has_status("dead"));
    }

    #[test]
    fn test_healing_a_dying_combatant_adds_wounded() {
        let mut c = pf2_combatant(10);
        c.apply_damage(10);
        c.apply_healing(6, 10);
        let pf2 = c.pf2().unwrap();
        assert_eq!(c.current_hp, 6);
        assert_eq!(pf2.dying, 0);
        assert_eq!(pf2.wounded, 1);
        assert!(!c.has_status("unconscious"));
    }

    #[test]
    fn test_healing_caps_at_max() {
        let mut c = pf2_combatant(8);
        c.apply_healing(10, 10);
        assert_eq!(c.current_hp, 10);
    }

    #[test]
    fn test_slot_ledger_is_per_caster_and_level() {
        let mut pf2 = Pf2Combatant::default();
        pf2.spend_slot(0, 1);
        pf2.spend_slot(0, 1);
        pf2.spend_slot(1, 1);
        assert_eq!(pf2.slots_used(0, 1), 2);
        assert_eq!(pf2.slots_used(1, 1), 1);
        assert_eq!(pf2.slots_used(0, 2), 0);
    }

    #[test]
    fn test_check_victory() {
        let mut state = MatchState {
            id: "m1".into(),
            ruleset: RulesetId::Pf2,
            players: vec![
                PlayerInfo {
                    id: "p1".into(),
                    name: "Alice".into(),
                    is_bot: false,
                    character_id: "c1".into(),
                },
                PlayerInfo {
                    id: "p2".into(),
                    name: "Bot".into(),
                    is_bot: true,
                    character_id: "c2".into(),
                },
            ],
            characters: vec![],
            combatants: vec![
                {
                    let mut c = pf2_combatant(10);
                    c.player_id = "p1".into();
                    c
                },
                {
                    let mut c = pf2_combatant(0);
                    c.player_id = "p2".into();
                    c.status_effects.push("unconscious".into());
                    c
                },
            ],
            active_turn_player_id: "p1".into(),
            round: 1,
            log: vec![],
            status: MatchStatus::Active,
            winner_id: None,
            pending_defense: None,
            pending_reaction: None,
        };

        state.check_victory();
        assert_eq!(state.status, MatchStatus::Finished);
        assert_eq!(state.winner_id.as_deref(), Some("p1"));
        assert_eq!(state.log.last().map(String::as_str), Some("Alice wins!"));
    }
}
