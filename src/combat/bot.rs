//! Bot decision making
//!
//! Pure functions from match state to the next action payload. The
//! engine feeds the chosen payload through the same dispatch path as a
//! human submission, so bots obey the identical economy and validation
//! rules.

use crate::character::CharacterSheet;
use crate::combat::actions::ActionPayload;
use crate::combat::attack::{defense_value, range_penalty};
use crate::combat::grid::{self, GridPosition};
use crate::combat::state::{Combatant, DefenseKind, Maneuver, MatchState, MatchStatus};

/// Nearest non-defeated enemy of `player_id` by grid distance.
pub fn nearest_enemy<'a>(state: &'a MatchState, player_id: &str) -> Option<&'a Combatant> {
    let me = state.combatant(player_id)?;
    let kind = state.ruleset.grid_kind();
    state
        .combatants
        .iter()
        .filter(|c| c.player_id != player_id && !c.is_defeated())
        .min_by_key(|c| grid::distance(kind, me.position, c.position))
}

/// Best reachable cell that closes distance to `target`, if any.
fn advance_toward(
    state: &MatchState,
    mover: &Combatant,
    target: GridPosition,
    max_cells: i32,
) -> Option<GridPosition> {
    if max_cells <= 0 {
        return None;
    }
    let kind = state.ruleset.grid_kind();
    let occupied = state.occupied_except(&mover.player_id);
    let current = grid::distance(kind, mover.position, target);
    grid::reachable_cells(kind, mover.position, max_cells, &occupied)
        .into_values()
        .filter(|cell| grid::distance(kind, cell.position, target) < current)
        .min_by_key(|cell| {
            (
                grid::distance(kind, cell.position, target),
                cell.cost,
                cell.position.q,
                cell.position.r,
            )
        })
        .map(|cell| cell.position)
}

/// Decide the bot's next action for its turn, or `None` to end it.
pub fn decide(state: &MatchState, bot_id: &str) -> Option<ActionPayload> {
    if state.status != MatchStatus::Active {
        return None;
    }
    // reaction prompts address the reactor, who is not the active player
    if let Some(pending) = &state.pending_reaction {
        if pending.reactor_id == bot_id {
            return Some(ActionPayload::ReactionChoice { use_reaction: true });
        }
        return None;
    }
    if state.pending_defense.is_some() || state.active_turn_player_id != bot_id {
        return None;
    }

    let me = state.combatant(bot_id)?;
    if me.is_defeated() {
        return None;
    }
    let sheet = state.character_for(me)?;
    let enemy = nearest_enemy(state, bot_id)?;

    match sheet {
        CharacterSheet::Pf2(pf2_sheet) => {
            let pf2 = me.pf2()?;
            if pf2.actions_remaining == 0 {
                return None;
            }
            let distance = grid::square_distance(me.position, enemy.position);
            // default weapon up close, else any ranged weapon that covers the gap
            let weapon = if distance <= 1 {
                pf2_sheet.weapon_or_default(None)
            } else {
                pf2_sheet
                    .weapons
                    .iter()
                    .find(|w| matches!(w.range, Some(r) if distance <= r as i32))
                    .cloned()
                    .unwrap_or_else(|| pf2_sheet.weapon_or_default(None))
            };
            let agile = weapon.is_agile();
            let map_floor = if agile { -8 } else { -10 };

            let in_reach = match weapon.range {
                Some(range) => distance <= range as i32,
                None => distance <= 1,
            };
            if in_reach && pf2.map_penalty > map_floor {
                return Some(ActionPayload::Strike {
                    target_id: enemy.player_id.clone(),
                    weapon_id: Some(weapon.id.clone()),
                });
            }
            if !in_reach {
                if let Some(to) =
                    advance_toward(state, me, enemy.position, pf2_sheet.speed_in_squares())
                {
                    return Some(ActionPayload::Stride { to });
                }
            }
            None
        }
        CharacterSheet::Gurps(gurps_sheet) => {
            let gurps = me.gurps()?;
            // spend the turn drawing before anything else
            if gurps.ready_weapon_id.is_none() && gurps_sheet.first_weapon().is_some() {
                return Some(ActionPayload::Interact);
            }
            let distance = grid::hex_distance(me.position, enemy.position);
            let weapon_range = gurps
                .ready_weapon_id
                .as_deref()
                .and_then(|id| gurps_sheet.equipment.iter().find(|e| e.id == id))
                .and_then(|e| e.range);
            // shoot from range only while the penalty band stays tolerable
            let in_reach = match weapon_range {
                Some(range) => distance <= range as i32 && range_penalty(distance) >= -4,
                None => distance <= 1,
            };
            match gurps.maneuver {
                None => {
                    let maneuver = if in_reach {
                        Maneuver::Attack
                    } else {
                        Maneuver::MoveAndAttack
                    };
                    Some(ActionPayload::SelectManeuver { maneuver })
                }
                Some(Maneuver::Attack | Maneuver::AllOutAttack) if in_reach => {
                    Some(ActionPayload::Attack {
                        target_id: enemy.player_id.clone(),
                    })
                }
                Some(Maneuver::MoveAndAttack) => {
                    if in_reach {
                        return Some(ActionPayload::Attack {
                            target_id: enemy.player_id.clone(),
                        });
                    }
                    advance_toward(state, me, enemy.position, gurps_sheet.derived.basic_move)
                        .map(|to| ActionPayload::Move { to })
                }
                Some(_) => None,
            }
        }
    }
}

/// Pick the best available defense against a pending attack: the
/// highest of dodge and parry, with parry docked 4 when the weapon
/// already parried this turn. Retreats when it still can.
pub fn choose_defense(sheet: &crate::character::GurpsSheet, combatant: &Combatant) -> (DefenseKind, bool) {
    let Some(gurps) = combatant.gurps() else {
        return (DefenseKind::Dodge, false);
    };

    let dodge = defense_value(sheet, DefenseKind::Dodge, false);
    let mut best = (DefenseKind::Dodge, dodge);

    if let Some(weapon) = sheet.first_weapon() {
        let mut parry = defense_value(sheet, DefenseKind::Parry, false);
        if gurps.parry_weapons_used.contains(&weapon.id) {
            parry -= 4;
        }
        if parry > best.1 {
            best = (DefenseKind::Parry, parry);
        }
    }

    (best.0, !gurps.retreated_this_turn)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::character::{DamageType, Equipment, Weapon};
    use crate::combat::state::PendingReaction;
    use crate::combat::state::ReactionTrigger;
    use crate::combat::testutil::{gurps_match, pf2_match};

    #[test]
    fn test_bot_strikes_adjacent_enemy() {
        let mut state = pf2_match();
        state.active_turn_player_id = "p2".into();
        match decide(&state, "p2") {
            Some(ActionPayload::Strike { target_id, .. }) => assert_eq!(target_id, "p1"),
            other => panic!("expected strike, got {:?}", other),
        }
    }

    #[test]
    fn test_bot_strides_toward_distant_enemy() {
        let mut state = pf2_match();
        state.active_turn_player_id = "p2".into();
        state.combatant_mut("p2").unwrap().position = GridPosition::new(8, 0);
        match decide(&state, "p2") {
            Some(ActionPayload::Stride { to }) => {
                let before = grid::square_distance(GridPosition::new(8, 0), GridPosition::new(0, 0));
                let after = grid::square_distance(to, GridPosition::new(0, 0));
                assert!(after < before);
            }
            other => panic!("expected stride, got {:?}", other),
        }
    }

    #[test]
    fn test_bot_stops_at_map_floor() {
        let mut state = pf2_match();
        state.active_turn_player_id = "p2".into();
        state.combatant_mut("p2").unwrap().pf2_mut().unwrap().map_penalty = -10;
        assert!(decide(&state, "p2").is_none());
    }

    #[test]
    fn test_bot_ends_turn_with_no_actions() {
        let mut state = pf2_match();
        state.active_turn_player_id = "p2".into();
        state.combatant_mut("p2").unwrap().pf2_mut().unwrap().actions_remaining = 0;
        assert!(decide(&state, "p2").is_none());
    }

    #[test]
    fn test_bot_uses_pending_reaction() {
        let mut state = pf2_match();
        state.pending_reaction = Some(PendingReaction {
            reactor_id: "p2".into(),
            trigger_id: "p1".into(),
            trigger: ReactionTrigger::Stride,
            destination: GridPosition::new(3, 0),
        });
        match decide(&state, "p2") {
            Some(ActionPayload::ReactionChoice { use_reaction }) => assert!(use_reaction),
            other => panic!("expected reaction choice, got {:?}", other),
        }
    }

    #[test]
    fn test_bot_strikes_with_ranged_weapon_at_distance() {
        let mut state = pf2_match();
        state.active_turn_player_id = "p2".into();
        state.combatant_mut("p2").unwrap().position = GridPosition::new(8, 0);
        for sheet in &mut state.characters {
            if let CharacterSheet::Pf2(pf2) = sheet {
                if pf2.id == "c2" {
                    pf2.weapons.push(Weapon {
                        id: "shortbow".into(),
                        name: "Shortbow".into(),
                        damage: "1d6".into(),
                        damage_type: DamageType::Piercing,
                        traits: vec![],
                        range: Some(20),
                        proficiency: None,
                    });
                }
            }
        }
        match decide(&state, "p2") {
            Some(ActionPayload::Strike { target_id, weapon_id }) => {
                assert_eq!(target_id, "p1");
                assert_eq!(weapon_id.as_deref(), Some("shortbow"));
            }
            other => panic!("expected ranged strike, got {:?}", other),
        }
    }

    #[test]
    fn test_gurps_bot_selects_maneuver_first() {
        let mut state = gurps_match();
        state.active_turn_player_id = "p2".into();
        match decide(&state, "p2") {
            Some(ActionPayload::SelectManeuver { maneuver }) => {
                assert_eq!(maneuver, Maneuver::Attack)
            }
            other => panic!("expected maneuver selection, got {:?}", other),
        }
    }

    #[test]
    fn test_gurps_bot_attacks_after_maneuver() {
        let mut state = gurps_match();
        state.active_turn_player_id = "p2".into();
        state.combatant_mut("p2").unwrap().gurps_mut().unwrap().maneuver =
            Some(Maneuver::Attack);
        match decide(&state, "p2") {
            Some(ActionPayload::Attack { target_id }) => assert_eq!(target_id, "p1"),
            other => panic!("expected attack, got {:?}", other),
        }
    }

    #[test]
    fn test_gurps_bot_readies_an_undrawn_weapon() {
        let mut state = gurps_match();
        state.active_turn_player_id = "p2".into();
        state.combatant_mut("p2").unwrap().gurps_mut().unwrap().ready_weapon_id = None;
        assert!(matches!(decide(&state, "p2"), Some(ActionPayload::Interact)));
    }

    #[test]
    fn test_gurps_bot_shoots_only_inside_the_penalty_band() {
        let mut state = gurps_match();
        state.active_turn_player_id = "p2".into();
        for sheet in &mut state.characters {
            if let CharacterSheet::Gurps(g) = sheet {
                if g.id == "c2" {
                    g.equipment.insert(
                        0,
                        Equipment {
                            id: "bow".into(),
                            name: "Bow".into(),
                            damage: Some("1d6".into()),
                            damage_type: Some(DamageType::Piercing),
                            range: Some(50),
                        },
                    );
                }
            }
        }
        state.combatant_mut("p2").unwrap().gurps_mut().unwrap().ready_weapon_id =
            Some("bow".into());

        // 12 hexes out the -5 penalty is too steep; close in instead
        state.combatant_mut("p2").unwrap().position = GridPosition::new(12, 0);
        match decide(&state, "p2") {
            Some(ActionPayload::SelectManeuver { maneuver }) => {
                assert_eq!(maneuver, Maneuver::MoveAndAttack)
            }
            other => panic!("expected maneuver selection, got {:?}", other),
        }

        // 9 hexes sits in the -4 band; take the shot
        state.combatant_mut("p2").unwrap().position = GridPosition::new(9, 0);
        match decide(&state, "p2") {
            Some(ActionPayload::SelectManeuver { maneuver }) => {
                assert_eq!(maneuver, Maneuver::Attack)
            }
            other => panic!("expected maneuver selection, got {:?}", other),
        }
    }

    #[test]
    fn test_bot_defense_prefers_highest_value() {
        let state = gurps_match();
        let combatant = state.combatant("p2").unwrap();
        let sheet = state.character("c2").unwrap().as_gurps().unwrap();
        // dodge 8 vs parry 3 + 12/2 = 9
        let (kind, retreat) = choose_defense(sheet, combatant);
        assert_eq!(kind, DefenseKind::Parry);
        assert!(retreat);
    }

    #[test]
    fn test_bot_defense_discounts_used_parry_weapon() {
        let mut state = gurps_match();
        {
            let g = state.combatant_mut("p2").unwrap().gurps_mut().unwrap();
            g.parry_weapons_used.push("broadsword".into());
            g.retreated_this_turn = true;
        }
        let combatant = state.combatant("p2").unwrap();
        let sheet = state.character("c2").unwrap().as_gurps().unwrap();
        // parry drops to 5, dodge 8 wins; no retreat left
        let (kind, retreat) = choose_defense(sheet, combatant);
        assert_eq!(kind, DefenseKind::Dodge);
        assert!(!retreat);
    }
}
