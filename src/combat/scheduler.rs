//! Turn rotation and start-of-turn upkeep
//!
//! Turn order is the fixed `players` list; wrapping past the end
//! increments the round counter. The incoming combatant gets its
//! per-turn state reset (ruleset-specific) and, in the PF2-like rules,
//! rolls a recovery check while dying.

use crate::combat::economy;
use crate::combat::state::{MatchState, MatchStatus};
use crate::rules::check::{roll_check, Degree};
use crate::rules::dice::Roller;

/// Advance to the next player's turn and run their upkeep. No-op once
/// the match has finished.
pub fn advance_turn(state: &mut MatchState, roller: &mut dyn Roller) {
    if state.status != MatchStatus::Active || state.players.is_empty() {
        return;
    }

    let current_index = state
        .players
        .iter()
        .position(|p| p.id == state.active_turn_player_id);
    let next_index = match current_index {
        Some(i) => (i + 1) % state.players.len(),
        None => 0,
    };
    if next_index == 0 {
        state.round += 1;
    }
    let next_player_id = state.players[next_index].id.clone();
    let previous_player_id = state.active_turn_player_id.clone();
    state.active_turn_player_id = next_player_id.clone();

    gurps_end_of_turn(state, &previous_player_id);
    start_turn(state, &next_player_id, roller);
}

fn start_turn(state: &mut MatchState, player_id: &str, roller: &mut dyn Roller) {
    let mut dying = 0;
    if let Some(combatant) = state.combatant_mut(player_id) {
        match &mut combatant.rules {
            crate::combat::state::RulesData::Pf2(pf2) => {
                economy::start_new_turn(pf2);
                dying = pf2.dying;
            }
            crate::combat::state::RulesData::Gurps(gurps) => {
                gurps.maneuver = None;
                gurps.shock_penalty = 0;
                gurps.retreated_this_turn = false;
                gurps.defenses_this_turn = 0;
                gurps.parry_weapons_used.clear();
            }
        }
    }
    if dying > 0 {
        recovery_check(state, player_id, dying, roller);
    }
}

/// An attacker who spent the turn attacking loses any stored evaluate
/// bonus.
fn gurps_end_of_turn(state: &mut MatchState, player_id: &str) {
    use crate::combat::state::Maneuver;
    if let Some(gurps) = state.combatant_mut(player_id).and_then(|c| c.gurps_mut()) {
        let attacked = matches!(
            gurps.maneuver,
            Some(Maneuver::Attack) | Some(Maneuver::AllOutAttack) | Some(Maneuver::MoveAndAttack)
        );
        if attacked {
            gurps.evaluate_bonus = 0;
            gurps.evaluate_target_id = None;
        }
    }
}

/// Flat recovery check against DC 10 + dying. Critical success drops
/// dying by 2, success by 1, failure raises it by 1, critical failure
/// by 2. Reaching 4 - doomed kills; reaching 0 wakes the combatant
/// with one added wounded.
fn recovery_check(state: &mut MatchState, player_id: &str, dying: i32, roller: &mut dyn Roller) {
    let name = state
        .combatant(player_id)
        .and_then(|c| state.character_for(c))
        .map(|c| c.name().to_string())
        .unwrap_or_else(|| state.player_name(player_id).to_string());

    let dc = 10 + dying;
    let check = roll_check(0, dc, roller);
    let new_dying = match check.degree {
        Degree::CriticalSuccess => (dying - 2).max(0),
        Degree::Success => (dying - 1).max(0),
        Degree::Failure => dying + 1,
        Degree::CriticalFailure => dying + 2,
    };

    let Some(combatant) = state.combatant_mut(player_id) else {
        return;
    };
    let doomed = combatant.pf2().map(|p| p.doomed).unwrap_or(0);
    let death_threshold = 4 - doomed;

    if new_dying >= death_threshold {
        if let Some(pf2) = combatant.pf2_mut() {
            pf2.dying = new_dying;
        }
        combatant.status_effects.retain(|s| s != "unconscious");
        combatant.status_effects.push("dead".to_string());
        state.push_log(format!(
            "{}: recovery check failed! Dying {} >= {}. {} dies.",
            name, new_dying, death_threshold, name
        ));
        state.check_victory();
    } else if new_dying == 0 {
        let wounded = combatant.pf2().map(|p| p.wounded).unwrap_or(0) + 1;
        if let Some(pf2) = combatant.pf2_mut() {
            pf2.dying = 0;
            pf2.wounded = wounded;
            pf2.remove_condition(crate::rules::conditions::Condition::Unconscious);
        }
        combatant.status_effects.retain(|s| s != "unconscious");
        state.push_log(format!(
            "{}: recovery check success! Dying reduced to 0. Wounded increased to {}.",
            name, wounded
        ));
    } else {
        if let Some(pf2) = combatant.pf2_mut() {
            pf2.dying = new_dying;
        }
        state.push_log(format!(
            "{}: recovery check [{}{:+}={} vs DC {}]. Dying: {} -> {}",
            name, check.roll, check.modifier, check.total, dc, dying, new_dying
        ));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::combat::state::{Maneuver, MatchStatus};
    use crate::combat::testutil::{gurps_match, pf2_match};
    use crate::rules::conditions::{Condition, ConditionValue};
    use crate::rules::dice::FixedRoller;

    #[test]
    fn test_turn_rotation_and_round_counter() {
        let mut state = pf2_match();
        let mut roller = FixedRoller::new([]);

        advance_turn(&mut state, &mut roller);
        assert_eq!(state.active_turn_player_id, "p2");
        assert_eq!(state.round, 1);

        advance_turn(&mut state, &mut roller);
        assert_eq!(state.active_turn_player_id, "p1");
        assert_eq!(state.round, 2);
    }

    #[test]
    fn test_new_turn_resets_action_economy() {
        let mut state = pf2_match();
        {
            let pf2 = state.combatant_mut("p2").unwrap().pf2_mut().unwrap();
            pf2.actions_remaining = 0;
            pf2.reaction_available = false;
            pf2.map_penalty = -10;
            pf2.shield_raised = true;
        }
        let mut roller = FixedRoller::new([]);
        advance_turn(&mut state, &mut roller);

        let pf2 = state.combatant("p2").unwrap().pf2().unwrap();
        assert_eq!(pf2.actions_remaining, 3);
        assert!(pf2.reaction_available);
        assert_eq!(pf2.map_penalty, 0);
        assert!(!pf2.shield_raised);
    }

    #[test]
    fn test_slowed_and_stunned_reduce_new_turn_actions() {
        let mut state = pf2_match();
        state
            .combatant_mut("p2")
            .unwrap()
            .pf2_mut()
            .unwrap()
            .set_condition(ConditionValue::with_value(Condition::Slowed, 1));
        let mut roller = FixedRoller::new([]);
        advance_turn(&mut state, &mut roller);
        assert_eq!(
            state.combatant("p2").unwrap().pf2().unwrap().actions_remaining,
            2
        );
    }

    #[test]
    fn test_recovery_check_success_reduces_dying() {
        let mut state = pf2_match();
        {
            let c = state.combatant_mut("p2").unwrap();
            c.current_hp = 0;
            c.status_effects.push("unconscious".into());
            c.pf2_mut().unwrap().dying = 2;
        }
        // DC 12, roll 15: success, dying 2 -> 1
        let mut roller = FixedRoller::new([15]);
        advance_turn(&mut state, &mut roller);
        assert_eq!(state.combatant("p2").unwrap().pf2().unwrap().dying, 1);
    }

    #[test]
    fn test_recovery_to_zero_wakes_with_wounded() {
        let mut state = pf2_match();
        {
            let c = state.combatant_mut("p2").unwrap();
            c.current_hp = 0;
            c.status_effects.push("unconscious".into());
            c.pf2_mut().unwrap().dying = 1;
        }
        // DC 11, roll 12: success, dying 1 -> 0
        let mut roller = FixedRoller::new([12]);
        advance_turn(&mut state, &mut roller);
        let c = state.combatant("p2").unwrap();
        assert!(!c.has_status("unconscious"));
        assert_eq!(c.pf2().unwrap().wounded, 1);
    }

    #[test]
    fn test_recovery_critical_failure_can_kill() {
        let mut state = pf2_match();
        {
            let c = state.combatant_mut("p2").unwrap();
            c.current_hp = 0;
            c.status_effects.push("unconscious".into());
            c.pf2_mut().unwrap().dying = 2;
        }
        // DC 12, natural 1 rolls total 1: crit failure, dying 2 -> 4
        let mut roller = FixedRoller::new([1]);
        advance_turn(&mut state, &mut roller);
        assert!(state.combatant("p2").unwrap().has_status("dead"));
        assert_eq!(state.status, MatchStatus::Finished);
        assert_eq!(state.winner_id.as_deref(), Some("p1"));
    }

    #[test]
    fn test_gurps_new_turn_resets_maneuver_and_defense_state() {
        let mut state = gurps_match();
        {
            let g = state.combatant_mut("p2").unwrap().gurps_mut().unwrap();
            g.maneuver = Some(Maneuver::Attack);
            g.shock_penalty = 2;
            g.defenses_this_turn = 2;
            g.retreated_this_turn = true;
            g.parry_weapons_used.push("broadsword".into());
        }
        let mut roller = FixedRoller::new([]);
        advance_turn(&mut state, &mut roller);

        let g = state.combatant("p2").unwrap().gurps().unwrap();
        assert_eq!(g.maneuver, None);
        assert_eq!(g.shock_penalty, 0);
        assert_eq!(g.defenses_this_turn, 0);
        assert!(!g.retreated_this_turn);
        assert!(g.parry_weapons_used.is_empty());
    }

    #[test]
    fn test_attacker_loses_evaluate_bonus_after_attacking_turn() {
        let mut state = gurps_match();
        {
            let g = state.combatant_mut("p1").unwrap().gurps_mut().unwrap();
            g.maneuver = Some(Maneuver::Attack);
            g.evaluate_bonus = 2;
        }
        let mut roller = FixedRoller::new([]);
        advance_turn(&mut state, &mut roller);
        assert_eq!(state.combatant("p1").unwrap().gurps().unwrap().evaluate_bonus, 0);
    }

    #[test]
    fn test_no_rotation_after_match_end() {
        let mut state = pf2_match();
        state.status = MatchStatus::Finished;
        let mut roller = FixedRoller::new([]);
        advance_turn(&mut state, &mut roller);
        assert_eq!(state.active_turn_player_id, "p1");
    }
}
