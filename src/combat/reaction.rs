//! Reactions: opportunity strikes, shield block, reactive shield
//!
//! Triggers come from movement (leaving an adjacent reach) and from
//! incoming hits. Bot reactors resolve synchronously inside the
//! triggering action; human reactors suspend the match behind a
//! `PendingReaction` until they answer or the timeout declines for
//! them. Reaction strikes never take the multiple attack penalty, and
//! declining does not consume the reaction.

use crate::combat::attack::{resolve_strike, AttackEvent, StrikeOptions};
use crate::combat::grid;
use crate::combat::state::{MatchState, PendingReaction, ReactionTrigger};
use crate::content::feats::{ATTACK_OF_OPPORTUNITY, REACTIVE_SHIELD, SHIELD_BLOCK};
use crate::error::ActionError;
use crate::rules::dice::Roller;

fn has_feat(state: &MatchState, player_id: &str, feat: &str) -> bool {
    state
        .combatant(player_id)
        .and_then(|c| state.character_for(c))
        .and_then(|c| c.as_pf2())
        .map(|s| s.has_feat(feat))
        .unwrap_or(false)
}

/// Player ids eligible to take an opportunity strike against the
/// moving combatant: adjacent, standing, reaction in hand, and holding
/// the feat.
pub fn opportunity_reactors(state: &MatchState, trigger_id: &str) -> Vec<String> {
    let trigger = match state.combatant(trigger_id) {
        Some(c) => c,
        None => return Vec::new(),
    };
    state
        .combatants
        .iter()
        .filter(|c| {
            c.player_id != trigger_id
                && !c.is_defeated()
                && c.pf2().map(|p| p.reaction_available).unwrap_or(false)
                && grid::square_distance(c.position, trigger.position) == 1
                && has_feat(state, &c.player_id, ATTACK_OF_OPPORTUNITY)
        })
        .map(|c| c.player_id.clone())
        .collect()
}

/// Execute an opportunity strike: consumes the reactor's reaction and
/// resolves a strike with no MAP applied.
pub fn execute_opportunity_strike(
    state: &mut MatchState,
    reactor_id: &str,
    trigger_id: &str,
    roller: &mut dyn Roller,
) -> Result<Vec<AttackEvent>, ActionError> {
    let reactor_name = state
        .combatant(reactor_id)
        .and_then(|c| state.character_for(c))
        .map(|c| c.name().to_string())
        .ok_or(ActionError::InvalidTarget)?;

    {
        let pf2 = state
            .combatant_mut(reactor_id)
            .and_then(|c| c.pf2_mut())
            .ok_or(ActionError::UnsupportedAction)?;
        if !pf2.reaction_available {
            return Err(ActionError::ResourceExhausted("reaction already used".into()));
        }
        pf2.reaction_available = false;
    }

    state.push_log(format!("{} makes an Attack of Opportunity!", reactor_name));
    let outcome = resolve_strike(
        state,
        reactor_id,
        trigger_id,
        None,
        StrikeOptions {
            apply_map: false,
            extra_damage_dice: 0,
        },
        roller,
    )?;
    Ok(outcome.events)
}

/// Shield Block: if the defender holds the feat with a raised shield
/// and a free reaction, damage is reduced by the shield's hardness and
/// the shield takes the excess. Returns the damage left over.
pub fn try_shield_block(state: &mut MatchState, defender_id: &str, incoming: i32) -> i32 {
    if incoming <= 0 || !has_feat(state, defender_id, SHIELD_BLOCK) {
        return incoming;
    }
    let (hardness, name) = match state
        .combatant(defender_id)
        .and_then(|c| state.character_for(c))
        .and_then(|c| c.as_pf2())
    {
        Some(sheet) => match sheet.shield {
            Some(shield) => (shield.hardness, sheet.name.clone()),
            None => return incoming,
        },
        None => return incoming,
    };

    let blocked = {
        let pf2 = match state.combatant_mut(defender_id).and_then(|c| c.pf2_mut()) {
            Some(p) => p,
            None => return incoming,
        };
        if !pf2.shield_raised || !pf2.reaction_available {
            return incoming;
        }
        pf2.reaction_available = false;
        let spill = (incoming - hardness).max(0);
        let shield_hp = pf2.shield_hp.unwrap_or(0);
        pf2.shield_hp = Some((shield_hp - spill).max(0));
        if pf2.shield_hp == Some(0) {
            pf2.shield_raised = false;
        }
        spill
    };

    let mut log = format!(
        "{} uses Shield Block: damage reduced by {} (hardness)",
        name, hardness
    );
    if blocked > 0 {
        log.push_str(&format!(", shield takes {} damage", blocked));
        if state
            .combatant(defender_id)
            .and_then(|c| c.pf2())
            .map(|p| p.shield_hp == Some(0))
            .unwrap_or(false)
        {
            log.push_str(" and breaks!");
        }
    }
    state.push_log(log);
    blocked
}

/// Reactive Shield: raise the shield as a reaction against an incoming
/// melee strike. Returns true if the shield went up.
pub fn try_reactive_shield(state: &mut MatchState, defender_id: &str) -> bool {
    if !has_feat(state, defender_id, REACTIVE_SHIELD) {
        return false;
    }
    let name = match state
        .combatant(defender_id)
        .and_then(|c| state.character_for(c))
    {
        Some(sheet) => sheet.name().to_string(),
        None => return false,
    };
    let raised = {
        let pf2 = match state.combatant_mut(defender_id).and_then(|c| c.pf2_mut()) {
            Some(p) => p,
            None => return false,
        };
        if pf2.shield_raised || !pf2.reaction_available {
            return false;
        }
        pf2.shield_raised = true;
        pf2.reaction_available = false;
        true
    };
    if raised {
        state.push_log(format!("{} uses Reactive Shield: shield raised as reaction", name));
    }
    raised
}

/// Open a reaction window. The triggering action's cost has already
/// been paid; a suspended stride completes when the reaction resolves.
pub fn suspend_for_reaction(
    state: &mut MatchState,
    reactor_id: &str,
    trigger_id: &str,
    trigger: ReactionTrigger,
    destination: grid::GridPosition,
) {
    state.pending_reaction = Some(PendingReaction {
        reactor_id: reactor_id.to_string(),
        trigger_id: trigger_id.to_string(),
        trigger,
        destination,
    });
}

/// Resolve the open reaction window. `use_reaction = false` declines
/// without consuming the reaction. Either way the suspended stride
/// then completes, unless the mover was dropped by the strike.
pub fn resolve_reaction_choice(
    state: &mut MatchState,
    reactor_id: &str,
    use_reaction: bool,
    roller: &mut dyn Roller,
) -> Result<Vec<AttackEvent>, ActionError> {
    let pending = state
        .pending_reaction
        .take()
        .ok_or(ActionError::NoPendingChoice)?;
    if pending.reactor_id != reactor_id {
        state.pending_reaction = Some(pending);
        return Err(ActionError::NoPendingChoice);
    }

    let mut events = Vec::new();
    if use_reaction {
        events = execute_opportunity_strike(state, reactor_id, &pending.trigger_id, roller)?;
    } else {
        let name = state
            .combatant(reactor_id)
            .and_then(|c| state.character_for(c))
            .map(|c| c.name().to_string())
            .unwrap_or_else(|| "Unknown".to_string());
        state.push_log(format!("{} declines the Attack of Opportunity.", name));
    }

    if pending.trigger == ReactionTrigger::Stride {
        let trigger_name = state.player_name(&pending.trigger_id).to_string();
        let dropped = state
            .combatant(&pending.trigger_id)
            .map(|c| c.is_defeated())
            .unwrap_or(true);
        if dropped {
            state.push_log(format!(
                "{}'s stride is interrupted - they fall!",
                trigger_name
            ));
        } else {
            if let Some(c) = state.combatant_mut(&pending.trigger_id) {
                c.position = pending.destination;
            }
            state.push_log(format!(
                "{} completes stride to {}.",
                trigger_name, pending.destination
            ));
        }
    }

    state.check_victory();
    Ok(events)
}
