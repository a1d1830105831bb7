//! Action dispatch
//!
//! Single entry point for every inbound action. Validates ownership
//! and cost against the action economy, routes to the resolution code,
//! opens reaction windows for movement that leaves a threatened reach,
//! and reports whether the acting player's turn is over. Validation
//! failures abort with zero state mutation.

use crate::combat::actions::{action_traits, ActionCost, ActionPayload, ActionTraits};
use crate::combat::attack::{self, AttackEvent, GurpsAttackOutcome, StrikeOptions};
use crate::combat::grid::{self, GridPosition};
use crate::combat::state::{Combatant, Maneuver, MatchState, MatchStatus, ReactionTrigger};
use crate::combat::{bot, economy, reaction, spells};
use crate::content::feats;
use crate::error::ActionError;
use crate::rules::check::{roll_check, Degree};
use crate::rules::conditions::{Condition, ConditionValue};
use crate::rules::dice::Roller;
use crate::rulesets::{gurps as gurps_rules, RulesetId};

/// What dispatching one action produced
#[derive(Debug, Clone, Default)]
pub struct ActionResult {
    pub events: Vec<AttackEvent>,
    /// The active player's turn is complete; the caller should advance
    pub turn_over: bool,
}

/// Active combatant has no actions left and nothing is suspended.
fn turn_exhausted(state: &MatchState) -> bool {
    if state.status != MatchStatus::Active || state.has_pending_choice() {
        return false;
    }
    state
        .combatant(&state.active_turn_player_id)
        .map(|c| match c.pf2() {
            Some(pf2) => pf2.actions_remaining == 0,
            None => false,
        })
        .unwrap_or(false)
}

/// Dispatch one action for `player_id`. Out-of-turn answers to open
/// defense and reaction windows are accepted from the prompted player;
/// everything else requires the turn.
pub fn submit_action(
    state: &mut MatchState,
    player_id: &str,
    action: &ActionPayload,
    roller: &mut dyn Roller,
) -> Result<ActionResult, ActionError> {
    if state.status != MatchStatus::Active {
        return Err(ActionError::MatchNotActive);
    }

    match action {
        ActionPayload::ReactionChoice { use_reaction } => {
            let events = reaction::resolve_reaction_choice(state, player_id, *use_reaction, roller)?;
            return Ok(ActionResult {
                events,
                turn_over: turn_exhausted(state),
            });
        }
        ActionPayload::DefenseChoice { defense, retreat } => {
            let outcome = attack::resolve_gurps_defense(state, player_id, *defense, *retreat, roller)?;
            // the suspended attack is now final; the attacker's turn ends
            return Ok(ActionResult {
                events: outcome.events,
                turn_over: state.status == MatchStatus::Active,
            });
        }
        _ => {}
    }

    if state.has_pending_choice() {
        return Err(ActionError::ChoicePending);
    }
    if state.active_turn_player_id != player_id {
        return Err(ActionError::NotYourTurn);
    }
    let actor = state.combatant(player_id).ok_or(ActionError::InvalidTarget)?;
    if actor.is_defeated() {
        return Err(ActionError::Invalid("combatant is down".into()));
    }

    let mut result = match state.ruleset {
        RulesetId::Pf2 => pf2_action(state, player_id, action, roller)?,
        RulesetId::Gurps => gurps_action(state, player_id, action, roller)?,
    };
    result.turn_over = result.turn_over || turn_exhausted(state);
    Ok(result)
}

fn pf2_sheet(state: &MatchState, player_id: &str) -> Result<crate::character::Pf2Sheet, ActionError> {
    state
        .combatant(player_id)
        .and_then(|c| state.character_for(c))
        .and_then(|c| c.as_pf2())
        .cloned()
        .ok_or(ActionError::InvalidTarget)
}

fn require_feat(state: &MatchState, player_id: &str, feat: &str) -> Result<(), ActionError> {
    let has = state
        .combatant(player_id)
        .and_then(|c| state.character_for(c))
        .and_then(|c| c.as_pf2())
        .map(|s| s.has_feat(feat))
        .unwrap_or(false);
    if has {
        Ok(())
    } else {
        Err(ActionError::MissingFeature(feat.to_string()))
    }
}

fn afford(state: &MatchState, player_id: &str, cost: ActionCost) -> Result<(), ActionError> {
    let pf2 = state
        .combatant(player_id)
        .and_then(|c| c.pf2())
        .ok_or(ActionError::UnsupportedAction)?;
    economy::can_afford(pf2, cost)
}

fn apply_cost(state: &mut MatchState, player_id: &str, traits: ActionTraits, agile: bool) {
    if let Some(pf2) = state.combatant_mut(player_id).and_then(|c| c.pf2_mut()) {
        economy::apply_cost(pf2, traits, agile);
    }
}

fn actor_name(state: &MatchState, player_id: &str) -> String {
    state
        .combatant(player_id)
        .and_then(|c| state.character_for(c))
        .map(|c| c.name().to_string())
        .unwrap_or_else(|| state.player_name(player_id).to_string())
}

fn degree_label(degree: Degree) -> &'static str {
    match degree {
        Degree::CriticalFailure => "Critical Failure",
        Degree::Failure => "Failure",
        Degree::Success => "Success",
        Degree::CriticalSuccess => "Critical Success",
    }
}

fn pf2_action(
    state: &mut MatchState,
    player_id: &str,
    action: &ActionPayload,
    roller: &mut dyn Roller,
) -> Result<ActionResult, ActionError> {
    let traits = match action {
        // cast cost comes from the catalog, not the static table
        ActionPayload::CastSpell { spell, .. } => ActionTraits {
            cost: ActionCost::Actions(spells::cast_cost(spell)),
            attack_trait: false,
            applies_map: false,
        },
        _ => action_traits(action),
    };
    afford(state, player_id, traits.cost)?;

    match action {
        ActionPayload::Strike { target_id, weapon_id } => {
            let sheet = pf2_sheet(state, player_id)?;
            let weapon = sheet.weapon_or_default(weapon_id.as_deref());
            let outcome = attack::resolve_strike(
                state,
                player_id,
                target_id,
                weapon_id.as_deref(),
                StrikeOptions::default(),
                roller,
            )?;
            apply_cost(state, player_id, traits, weapon.is_agile());
            Ok(ActionResult {
                events: outcome.events,
                turn_over: false,
            })
        }
        ActionPayload::PowerAttack { target_id, weapon_id } => {
            require_feat(state, player_id, feats::POWER_ATTACK)?;
            let sheet = pf2_sheet(state, player_id)?;
            let weapon = sheet.weapon_or_default(weapon_id.as_deref());
            state.push_log(format!("{} uses Power Attack!", actor_name(state, player_id)));
            let outcome = attack::resolve_strike(
                state,
                player_id,
                target_id,
                weapon_id.as_deref(),
                StrikeOptions {
                    apply_map: true,
                    extra_damage_dice: 1,
                },
                roller,
            )?;
            apply_cost(state, player_id, traits, weapon.is_agile());
            Ok(ActionResult {
                events: outcome.events,
                turn_over: false,
            })
        }
        ActionPayload::SuddenCharge { to, target_id, weapon_id } => {
            require_feat(state, player_id, feats::SUDDEN_CHARGE)?;
            let sheet = pf2_sheet(state, player_id)?;
            let weapon = sheet.weapon_or_default(weapon_id.as_deref());
            move_combatant(state, player_id, *to, sheet.speed_in_squares() * 2)?;
            state.push_log(format!(
                "{} charges to {}!",
                actor_name(state, player_id),
                to
            ));
            // the strike only happens if the charge ends in reach
            let reach = weapon.range.map(|r| r as i32).unwrap_or(1);
            let in_reach = state
                .combatant(target_id)
                .map(|t| grid::square_distance(*to, t.position) <= reach)
                .unwrap_or(false);
            let events = if in_reach {
                attack::resolve_strike(
                    state,
                    player_id,
                    target_id,
                    weapon_id.as_deref(),
                    StrikeOptions::default(),
                    roller,
                )?
                .events
            } else {
                Vec::new()
            };
            apply_cost(state, player_id, traits, weapon.is_agile());
            Ok(ActionResult {
                events,
                turn_over: false,
            })
        }
        ActionPayload::Stride { to } => {
            let sheet = pf2_sheet(state, player_id)?;
            let path = reachable_path(state, player_id, *to, sheet.speed_in_squares())?;
            apply_cost(state, player_id, traits, false);
            stride_with_reactions(state, player_id, *to, &path, roller)
        }
        ActionPayload::Step { to } => {
            // a single careful square; never provokes
            if grid::square_distance(
                state.combatant(player_id).ok_or(ActionError::InvalidTarget)?.position,
                *to,
            ) != 1
            {
                return Err(ActionError::OutOfMovementRange);
            }
            if state.occupied_except(player_id).contains(to) {
                return Err(ActionError::DestinationOccupied);
            }
            apply_cost(state, player_id, traits, false);
            if let Some(c) = state.combatant_mut(player_id) {
                c.position = *to;
            }
            state.push_log(format!("{} steps to {}.", actor_name(state, player_id), to));
            Ok(ActionResult::default())
        }
        ActionPayload::Interact => {
            apply_cost(state, player_id, traits, false);
            state.push_log(format!("{} interacts.", actor_name(state, player_id)));
            interact_with_reactions(state, player_id, roller)
        }
        ActionPayload::RaiseShield => {
            let sheet = pf2_sheet(state, player_id)?;
            let shield = sheet.shield.ok_or_else(|| ActionError::MissingFeature("shield".into()))?;
            apply_cost(state, player_id, traits, false);
            if let Some(pf2) = state.combatant_mut(player_id).and_then(|c| c.pf2_mut()) {
                pf2.shield_raised = true;
                if pf2.shield_hp.is_none() {
                    pf2.shield_hp = Some(shield.hit_points);
                }
            }
            state.push_log(format!("{} raises their shield.", actor_name(state, player_id)));
            Ok(ActionResult::default())
        }
        ActionPayload::DropProne => {
            apply_cost(state, player_id, traits, false);
            if let Some(pf2) = state.combatant_mut(player_id).and_then(|c| c.pf2_mut()) {
                pf2.set_condition(ConditionValue::new(Condition::Prone));
            }
            state.push_log(format!("{} drops prone.", actor_name(state, player_id)));
            Ok(ActionResult::default())
        }
        ActionPayload::Stand => {
            apply_cost(state, player_id, traits, false);
            if let Some(pf2) = state.combatant_mut(player_id).and_then(|c| c.pf2_mut()) {
                pf2.remove_condition(Condition::Prone);
            }
            state.push_log(format!("{} stands up.", actor_name(state, player_id)));
            Ok(ActionResult::default())
        }
        ActionPayload::Grapple { target_id } => {
            skill_maneuver(state, player_id, target_id, traits, Maneuvers::Grapple, roller)
        }
        ActionPayload::Trip { target_id } => {
            skill_maneuver(state, player_id, target_id, traits, Maneuvers::Trip, roller)
        }
        ActionPayload::Disarm { target_id } => {
            skill_maneuver(state, player_id, target_id, traits, Maneuvers::Disarm, roller)
        }
        ActionPayload::Feint { target_id } => {
            skill_maneuver(state, player_id, target_id, traits, Maneuvers::Feint, roller)
        }
        ActionPayload::Demoralize { target_id } => {
            skill_maneuver(state, player_id, target_id, traits, Maneuvers::Demoralize, roller)
        }
        ActionPayload::CastSpell {
            spell,
            target_id,
            at,
            level,
            caster_index,
        } => {
            let request = spells::CastRequest {
                spell: spell.clone(),
                target_id: target_id.clone(),
                at: *at,
                level: *level,
                caster_index: *caster_index,
            };
            let outcome = spells::resolve_cast(state, player_id, &request, roller)?;
            apply_cost(state, player_id, traits, false);
            Ok(ActionResult {
                events: outcome.events,
                turn_over: false,
            })
        }
        ActionPayload::EndTurn => Ok(ActionResult {
            events: Vec::new(),
            turn_over: true,
        }),
        _ => Err(ActionError::UnsupportedAction),
    }
}

/// PF2-like skill maneuvers: who rolls what against which DC, and what
/// lands on a success.
#[derive(Debug, Clone, Copy)]
enum Maneuvers {
    Grapple,
    Trip,
    Disarm,
    Feint,
    Demoralize,
}

fn skill_maneuver(
    state: &mut MatchState,
    actor_id: &str,
    target_id: &str,
    traits: ActionTraits,
    kind: Maneuvers,
    roller: &mut dyn Roller,
) -> Result<ActionResult, ActionError> {
    let target = state.combatant(target_id).ok_or(ActionError::InvalidTarget)?;
    if target_id == actor_id || target.is_defeated() {
        return Err(ActionError::InvalidTarget);
    }
    let actor_sheet = pf2_sheet(state, actor_id)?;
    let target_sheet = pf2_sheet(state, target_id)?;

    let (label, skill, dc) = match kind {
        Maneuvers::Grapple => ("Grapple", "Athletics", 10 + target_sheet.derived.fortitude_save),
        Maneuvers::Trip => ("Trip", "Athletics", 10 + target_sheet.derived.reflex_save),
        Maneuvers::Disarm => ("Disarm", "Athletics", 10 + target_sheet.derived.reflex_save),
        Maneuvers::Feint => ("Feint", "Deception", 10 + target_sheet.derived.perception),
        Maneuvers::Demoralize => ("Demoralize", "Intimidation", 10 + target_sheet.derived.will_save),
    };

    let mut bonus = actor_sheet.skill_bonus(skill);
    if traits.applies_map {
        bonus += state
            .combatant(actor_id)
            .and_then(|c| c.pf2())
            .map(|p| p.map_penalty)
            .unwrap_or(0);
    }

    let check = roll_check(bonus, dc, roller);
    let actor = actor_name(state, actor_id);
    let mut log = format!(
        "{} attempts to {}: [{}{:+}={} vs DC {}] {}",
        actor, label, check.roll, check.modifier, check.total, check.dc,
        degree_label(check.degree)
    );

    match (kind, check.degree) {
        (Maneuvers::Grapple, Degree::CriticalSuccess) => {
            log.push_str(" - Target is grabbed and restrained!");
            if let Some(pf2) = state.combatant_mut(target_id).and_then(|c| c.pf2_mut()) {
                pf2.set_condition(ConditionValue::new(Condition::Grabbed));
                pf2.set_condition(ConditionValue::new(Condition::Restrained));
            }
        }
        (Maneuvers::Grapple, Degree::Success) => {
            log.push_str(" - Target is grabbed!");
            if let Some(pf2) = state.combatant_mut(target_id).and_then(|c| c.pf2_mut()) {
                pf2.set_condition(ConditionValue::new(Condition::Grabbed));
            }
        }
        (Maneuvers::Trip, Degree::Success | Degree::CriticalSuccess) => {
            log.push_str(" - Target falls prone and is flat-footed!");
            if let Some(pf2) = state.combatant_mut(target_id).and_then(|c| c.pf2_mut()) {
                pf2.set_condition(ConditionValue::new(Condition::Prone));
                pf2.set_condition(ConditionValue::new(Condition::FlatFooted));
            }
        }
        (Maneuvers::Trip, Degree::CriticalFailure) => {
            log.push_str(&format!(" - {} falls prone!", actor));
            if let Some(pf2) = state.combatant_mut(actor_id).and_then(|c| c.pf2_mut()) {
                pf2.set_condition(ConditionValue::new(Condition::Prone));
            }
        }
        (Maneuvers::Disarm, Degree::CriticalSuccess) => {
            log.push_str(" - Target drops their weapon!");
        }
        (Maneuvers::Disarm, Degree::Success) => {
            log.push_str(" - Target takes -2 to attacks with weapon!");
        }
        (Maneuvers::Disarm, Degree::CriticalFailure) => {
            log.push_str(&format!(" - {} drops their weapon!", actor));
        }
        (Maneuvers::Feint, Degree::Success | Degree::CriticalSuccess) => {
            log.push_str(" - Target is flat-footed!");
            if let Some(pf2) = state.combatant_mut(target_id).and_then(|c| c.pf2_mut()) {
                pf2.set_condition(ConditionValue::new(Condition::FlatFooted));
            }
        }
        (Maneuvers::Demoralize, Degree::CriticalSuccess) => {
            log.push_str(" - Target is frightened 2!");
            if let Some(pf2) = state.combatant_mut(target_id).and_then(|c| c.pf2_mut()) {
                pf2.set_condition(ConditionValue::with_value(Condition::Frightened, 2));
            }
        }
        (Maneuvers::Demoralize, Degree::Success) => {
            log.push_str(" - Target is frightened 1!");
            if let Some(pf2) = state.combatant_mut(target_id).and_then(|c| c.pf2_mut()) {
                pf2.set_condition(ConditionValue::with_value(Condition::Frightened, 1));
            }
        }
        _ => {}
    }

    state.push_log(log);
    apply_cost(state, actor_id, traits, false);
    Ok(ActionResult::default())
}

/// Validate a move and return the path walked.
fn reachable_path(
    state: &MatchState,
    player_id: &str,
    to: GridPosition,
    max_cells: i32,
) -> Result<Vec<GridPosition>, ActionError> {
    let from = state
        .combatant(player_id)
        .ok_or(ActionError::InvalidTarget)?
        .position;
    if from == to {
        return Err(ActionError::OutOfMovementRange);
    }
    let occupied = state.occupied_except(player_id);
    if occupied.contains(&to) {
        return Err(ActionError::DestinationOccupied);
    }
    let kind = state.ruleset.grid_kind();
    grid::path_to(kind, from, to, max_cells, &occupied)
        .map(|cell| cell.path)
        .ok_or(ActionError::OutOfMovementRange)
}

fn move_combatant(
    state: &mut MatchState,
    player_id: &str,
    to: GridPosition,
    max_cells: i32,
) -> Result<(), ActionError> {
    reachable_path(state, player_id, to, max_cells)?;
    if let Some(c) = state.combatant_mut(player_id) {
        c.position = to;
    }
    Ok(())
}

/// Reactors whose reach the path walks out of. Eligibility is the
/// opportunity list; the trigger is the step from an adjacent cell to
/// a non-adjacent one.
fn provoking_reactors(state: &MatchState, mover_id: &str, path: &[GridPosition]) -> Vec<String> {
    reaction::opportunity_reactors(state, mover_id)
        .into_iter()
        .filter(|reactor_id| {
            let Some(reactor) = state.combatant(reactor_id) else {
                return false;
            };
            path.windows(2).any(|pair| {
                grid::square_distance(pair[0], reactor.position) == 1
                    && grid::square_distance(pair[1], reactor.position) > 1
            })
        })
        .collect()
}

/// Complete a stride, opening a reaction window if the path leaves a
/// threatened reach. The action cost is already paid; a human reactor
/// suspends the move, a bot reactor resolves inline.
fn stride_with_reactions(
    state: &mut MatchState,
    mover_id: &str,
    to: GridPosition,
    path: &[GridPosition],
    roller: &mut dyn Roller,
) -> Result<ActionResult, ActionError> {
    let provokers = provoking_reactors(state, mover_id, path);

    if let Some(reactor_id) = provokers.first() {
        let reactor_is_bot = state.player(reactor_id).map(|p| p.is_bot).unwrap_or(false);
        if !reactor_is_bot {
            reaction::suspend_for_reaction(state, reactor_id, mover_id, ReactionTrigger::Stride, to);
            return Ok(ActionResult::default());
        }
        let events = reaction::execute_opportunity_strike(state, reactor_id, mover_id, roller)?;
        let dropped = state
            .combatant(mover_id)
            .map(Combatant::is_defeated)
            .unwrap_or(true);
        if dropped {
            state.push_log(format!(
                "{}'s stride is interrupted - they fall!",
                actor_name(state, mover_id)
            ));
            return Ok(ActionResult {
                events,
                turn_over: false,
            });
        }
        if let Some(c) = state.combatant_mut(mover_id) {
            c.position = to;
        }
        state.push_log(format!("{} strides to {}.", actor_name(state, mover_id), to));
        return Ok(ActionResult {
            events,
            turn_over: false,
        });
    }

    if let Some(c) = state.combatant_mut(mover_id) {
        c.position = to;
    }
    state.push_log(format!("{} strides to {}.", actor_name(state, mover_id), to));
    Ok(ActionResult::default())
}

/// Interact provokes like a stride but the actor stays put.
fn interact_with_reactions(
    state: &mut MatchState,
    actor_id: &str,
    roller: &mut dyn Roller,
) -> Result<ActionResult, ActionError> {
    let reactors = reaction::opportunity_reactors(state, actor_id);
    let Some(reactor_id) = reactors.first() else {
        return Ok(ActionResult::default());
    };
    let position = state
        .combatant(actor_id)
        .ok_or(ActionError::InvalidTarget)?
        .position;
    let reactor_is_bot = state.player(reactor_id).map(|p| p.is_bot).unwrap_or(false);
    if !reactor_is_bot {
        reaction::suspend_for_reaction(
            state,
            reactor_id,
            actor_id,
            ReactionTrigger::Interact,
            position,
        );
        return Ok(ActionResult::default());
    }
    let events = reaction::execute_opportunity_strike(state, reactor_id, actor_id, roller)?;
    Ok(ActionResult {
        events,
        turn_over: false,
    })
}

fn gurps_action(
    state: &mut MatchState,
    player_id: &str,
    action: &ActionPayload,
    roller: &mut dyn Roller,
) -> Result<ActionResult, ActionError> {
    match action {
        ActionPayload::SelectManeuver { maneuver } => {
            if let Some(g) = state.combatant_mut(player_id).and_then(|c| c.gurps_mut()) {
                g.maneuver = Some(*maneuver);
            }
            state.push_log(format!(
                "{} takes the {:?} maneuver.",
                actor_name(state, player_id),
                maneuver
            ));
            Ok(ActionResult::default())
        }
        ActionPayload::Attack { target_id } => {
            let outcome = attack::resolve_gurps_attack(state, player_id, target_id, roller)?;
            match outcome {
                GurpsAttackOutcome::Miss { .. } => Ok(ActionResult {
                    events: vec![miss_event(state, player_id, target_id)],
                    turn_over: true,
                }),
                GurpsAttackOutcome::CriticalHit { events, .. } => Ok(ActionResult {
                    events,
                    turn_over: true,
                }),
                GurpsAttackOutcome::PendingDefense { .. } => {
                    let defender_is_bot =
                        state.player(target_id).map(|p| p.is_bot).unwrap_or(false);
                    if !defender_is_bot {
                        // suspended until the defender chooses
                        return Ok(ActionResult::default());
                    }
                    let (kind, retreat) = {
                        let combatant = state
                            .combatant(target_id)
                            .ok_or(ActionError::InvalidTarget)?;
                        let sheet = state
                            .character_for(combatant)
                            .and_then(|c| c.as_gurps())
                            .ok_or(ActionError::InvalidTarget)?;
                        bot::choose_defense(sheet, combatant)
                    };
                    let defense =
                        attack::resolve_gurps_defense(state, target_id, kind, retreat, roller)?;
                    Ok(ActionResult {
                        events: defense.events,
                        turn_over: true,
                    })
                }
            }
        }
        ActionPayload::Move { to } => {
            let (maneuver, posture, basic_move) = {
                let combatant = state.combatant(player_id).ok_or(ActionError::InvalidTarget)?;
                let gurps = combatant.gurps().ok_or(ActionError::UnsupportedAction)?;
                let sheet = state
                    .character_for(combatant)
                    .and_then(|c| c.as_gurps())
                    .ok_or(ActionError::InvalidTarget)?;
                (gurps.maneuver, gurps.posture, sheet.derived.basic_move)
            };
            let allowance = gurps_rules::movement_allowance(maneuver, basic_move, posture);
            if allowance == 0 {
                return Err(ActionError::Invalid(
                    "current maneuver does not allow moving".into(),
                ));
            }
            move_combatant(state, player_id, *to, allowance)?;
            state.push_log(format!("{} moves to {}.", actor_name(state, player_id), to));
            Ok(ActionResult {
                events: Vec::new(),
                turn_over: maneuver == Some(Maneuver::Move),
            })
        }
        ActionPayload::ChangePosture { posture } => {
            if let Some(g) = state.combatant_mut(player_id).and_then(|c| c.gurps_mut()) {
                g.posture = *posture;
            }
            state.push_log(format!(
                "{} changes posture to {:?}.",
                actor_name(state, player_id),
                posture
            ));
            Ok(ActionResult {
                events: Vec::new(),
                turn_over: true,
            })
        }
        ActionPayload::Aim { target_id } => {
            if let Some(g) = state.combatant_mut(player_id).and_then(|c| c.gurps_mut()) {
                if g.aim_target_id.as_deref() == Some(target_id) {
                    g.aim_turns += 1;
                } else {
                    g.aim_target_id = Some(target_id.clone());
                    g.aim_turns = 1;
                }
            }
            state.push_log(format!("{} takes aim.", actor_name(state, player_id)));
            Ok(ActionResult {
                events: Vec::new(),
                turn_over: true,
            })
        }
        ActionPayload::Evaluate { target_id } => {
            if let Some(g) = state.combatant_mut(player_id).and_then(|c| c.gurps_mut()) {
                if g.evaluate_target_id.as_deref() == Some(target_id) {
                    g.evaluate_bonus = (g.evaluate_bonus + 1).min(3);
                } else {
                    g.evaluate_target_id = Some(target_id.clone());
                    g.evaluate_bonus = 1;
                }
            }
            state.push_log(format!(
                "{} studies their opponent.",
                actor_name(state, player_id)
            ));
            Ok(ActionResult {
                events: Vec::new(),
                turn_over: true,
            })
        }
        // draws the primary weapon; takes the turn like a ready
        ActionPayload::Interact => {
            let weapon = {
                let combatant = state.combatant(player_id).ok_or(ActionError::InvalidTarget)?;
                let sheet = state
                    .character_for(combatant)
                    .and_then(|c| c.as_gurps())
                    .ok_or(ActionError::InvalidTarget)?;
                sheet
                    .first_weapon()
                    .map(|w| (w.id.clone(), w.name.clone()))
                    .ok_or_else(|| ActionError::Invalid("no weapon to ready".into()))?
            };
            if let Some(g) = state.combatant_mut(player_id).and_then(|c| c.gurps_mut()) {
                g.ready_weapon_id = Some(weapon.0);
            }
            state.push_log(format!(
                "{} readies their {}.",
                actor_name(state, player_id),
                weapon.1
            ));
            Ok(ActionResult {
                events: Vec::new(),
                turn_over: true,
            })
        }
        ActionPayload::EndTurn => Ok(ActionResult {
            events: Vec::new(),
            turn_over: true,
        }),
        _ => Err(ActionError::UnsupportedAction),
    }
}

fn miss_event(state: &MatchState, attacker_id: &str, target_id: &str) -> AttackEvent {
    let position = state
        .combatant(target_id)
        .map(|c| c.position)
        .unwrap_or(GridPosition::new(0, 0));
    AttackEvent::Miss {
        attacker_id: attacker_id.to_string(),
        target_id: target_id.to_string(),
        position,
    }
}
