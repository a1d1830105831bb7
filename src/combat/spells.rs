//! Spell casting and spell-resource accounting
//!
//! Cantrips are free, focus spells draw from the focus pool, leveled
//! spells consume one slot at the cast level. Slot and focus spending
//! happens before target resolution, so an area spell with nobody in
//! the burst still costs its slot. Spells missing from the catalog
//! degrade to a manual-resolution log entry instead of an error; an
//! explicit cast level still spends the slot.

use crate::character::{Pf2Sheet, SaveKind, SpellCaster};
use crate::combat::attack::AttackEvent;
use crate::combat::grid::{self, GridPosition};
use crate::combat::state::{DamageOutcome, MatchState, Pf2Combatant};
use crate::content::{self, SpellDefinition, TargetType};
use crate::error::ActionError;
use crate::rules::check::{roll_check, Degree};
use crate::rules::dice::Roller;

/// Parsed cast request, straight from the action payload
#[derive(Debug, Clone)]
pub struct CastRequest {
    pub spell: String,
    pub target_id: Option<String>,
    pub at: Option<GridPosition>,
    pub level: Option<u8>,
    pub caster_index: usize,
}

/// Outcome of a resolved cast
#[derive(Debug, Clone, Default)]
pub struct CastOutcome {
    pub events: Vec<AttackEvent>,
}

/// Action cost of casting a spell; unknown spells bill the standard
/// two actions.
pub fn cast_cost(spell_name: &str) -> u8 {
    content::spell(spell_name).map(|d| d.cast_actions).unwrap_or(2)
}

/// Whether the combatant can pay a spell's resource cost at the given
/// cast level. Does not spend anything.
pub fn can_cast(
    caster: &SpellCaster,
    pf2: &Pf2Combatant,
    caster_index: usize,
    def: &SpellDefinition,
    cast_level: u8,
) -> Result<(), ActionError> {
    if def.is_cantrip() {
        return Ok(());
    }
    if def.focus {
        if pf2.focus_points_used >= caster.focus_pool.max {
            return Err(ActionError::ResourceExhausted(
                "No focus points remaining".into(),
            ));
        }
        return Ok(());
    }
    if cast_level < def.level {
        return Err(ActionError::InvalidSpellLevel(cast_level));
    }
    if pf2.slots_used(caster_index, cast_level) >= caster.slot_total(cast_level) {
        return Err(ActionError::ResourceExhausted(format!(
            "No spell slots at level {}",
            cast_level
        )));
    }
    Ok(())
}

fn save_name(kind: SaveKind) -> &'static str {
    match kind {
        SaveKind::Fortitude => "Fortitude",
        SaveKind::Reflex => "Reflex",
        SaveKind::Will => "Will",
    }
}

fn save_label(degree: Degree) -> &'static str {
    match degree {
        Degree::CriticalFailure => "Critical Failure",
        Degree::Failure => "Failure",
        Degree::Success => "Success",
        Degree::CriticalSuccess => "Critical Success",
    }
}

/// Replace `{mod}` with the casting ability modifier, keeping the
/// formula parseable for negative modifiers.
fn substitute_mod(formula: &str, ability_mod: i32) -> String {
    formula
        .replace("+{mod}", &format!("{:+}", ability_mod))
        .replace("{mod}", &ability_mod.to_string())
}

fn condition_name(condition: crate::rules::conditions::Condition) -> String {
    serde_json::to_value(condition)
        .ok()
        .and_then(|v| v.as_str().map(str::to_owned))
        .unwrap_or_default()
}

fn pf2_sheet<'a>(state: &'a MatchState, player_id: &str) -> Result<&'a Pf2Sheet, ActionError> {
    state
        .combatant(player_id)
        .and_then(|c| state.character_for(c))
        .and_then(|c| c.as_pf2())
        .ok_or(ActionError::InvalidTarget)
}

/// Damage multiplier applied to a save result: critical failure takes
/// double, failure full, success half (floored), critical success none.
fn save_damage(rolled: i32, degree: Degree) -> i32 {
    match degree {
        Degree::CriticalFailure => rolled * 2,
        Degree::Failure => rolled,
        Degree::Success => rolled / 2,
        Degree::CriticalSuccess => 0,
    }
}

/// Resolve a cast end to end: resource validation and spending, target
/// collection, per-target saves and damage or healing, condition
/// riders, log entries. Action-cost deduction is the caller's concern.
pub fn resolve_cast(
    state: &mut MatchState,
    caster_id: &str,
    request: &CastRequest,
    roller: &mut dyn Roller,
) -> Result<CastOutcome, ActionError> {
    let caster_sheet = pf2_sheet(state, caster_id)?;
    let caster_name = caster_sheet.name.clone();

    let Some(def) = content::spell(&request.spell) else {
        // an explicit cast level still bills the slot; without one the
        // cast is treated like a cantrip and costs nothing
        if let Some(level) = request.level.filter(|l| *l > 0) {
            let caster_entry = caster_sheet
                .spellcasters
                .get(request.caster_index)
                .cloned()
                .ok_or_else(|| ActionError::MissingFeature("spellcasting".into()))?;
            {
                let pf2 = state
                    .combatant(caster_id)
                    .and_then(|c| c.pf2())
                    .ok_or(ActionError::UnsupportedAction)?;
                if pf2.slots_used(request.caster_index, level) >= caster_entry.slot_total(level) {
                    return Err(ActionError::ResourceExhausted(format!(
                        "No spell slots at level {}",
                        level
                    )));
                }
            }
            if let Some(pf2) = state.combatant_mut(caster_id).and_then(|c| c.pf2_mut()) {
                pf2.spend_slot(request.caster_index, level);
            }
            state.push_log(format!(
                "{} casts {} (level {} slot spent) - resolve its effects manually.",
                caster_name, request.spell, level
            ));
        } else {
            state.push_log(format!(
                "{} casts {} - resolve its effects manually.",
                caster_name, request.spell
            ));
        }
        return Ok(CastOutcome::default());
    };

    let caster_entry = caster_sheet
        .spellcasters
        .get(request.caster_index)
        .cloned()
        .ok_or_else(|| ActionError::MissingFeature("spellcasting".into()))?;
    let cast_level = request.level.unwrap_or(def.level).max(def.level);

    let ability_mod = caster_sheet
        .abilities
        .modifier(caster_entry.tradition.casting_ability());
    let spell_attack = ability_mod + caster_entry.proficiency.bonus(caster_sheet.level);
    let spell_dc = 10 + spell_attack;

    {
        let pf2 = state
            .combatant(caster_id)
            .and_then(|c| c.pf2())
            .ok_or(ActionError::UnsupportedAction)?;
        can_cast(&caster_entry, pf2, request.caster_index, def, cast_level)?;
    }

    // pay before targeting; an empty burst still costs the slot
    {
        let pf2 = state
            .combatant_mut(caster_id)
            .and_then(|c| c.pf2_mut())
            .ok_or(ActionError::UnsupportedAction)?;
        if def.focus {
            pf2.focus_points_used += 1;
        } else if !def.is_cantrip() {
            pf2.spend_slot(request.caster_index, cast_level);
        }
    }

    if def.is_cantrip() || cast_level == def.level {
        state.push_log(format!("{} casts {}!", caster_name, request.spell));
    } else {
        state.push_log(format!(
            "{} casts {} at level {}!",
            caster_name, request.spell, cast_level
        ));
    }

    let targets: Vec<String> = match def.target {
        TargetType::Single => {
            let target_id = request
                .target_id
                .as_deref()
                .ok_or(ActionError::InvalidTarget)?;
            let target = state.combatant(target_id).ok_or(ActionError::InvalidTarget)?;
            if def.heal_formula.is_none() && (target_id == caster_id || target.is_defeated()) {
                return Err(ActionError::InvalidTarget);
            }
            vec![target_id.to_string()]
        }
        TargetType::Area { radius } => {
            let center = request.at.ok_or(ActionError::InvalidTarget)?;
            state
                .combatants
                .iter()
                .filter(|c| {
                    !c.is_defeated() && grid::square_distance(c.position, center) <= radius
                })
                .map(|c| c.player_id.clone())
                .collect()
        }
    };

    let mut events = Vec::new();

    for target_id in targets {
        let target_sheet = pf2_sheet(state, &target_id)?;
        let target_name = target_sheet.name.clone();
        let target_max_hp = target_sheet.derived.hit_points;
        let target_pos = state
            .combatant(&target_id)
            .ok_or(ActionError::InvalidTarget)?
            .position;

        if let Some(formula) = def.heal_formula {
            let dice = def
                .heightened_dice(&substitute_mod(formula, ability_mod), cast_level)
                .map_err(ActionError::Invalid)?;
            let rolled = dice.roll(roller);
            state
                .combatant_mut(&target_id)
                .ok_or(ActionError::InvalidTarget)?
                .apply_healing(rolled.total, target_max_hp);
            state.push_log(format!(
                "{} is healed for {} HP.",
                target_name, rolled.total
            ));
            continue;
        }

        let save_result = match def.save {
            Some(kind) => {
                let save_bonus = target_sheet.derived.save(kind);
                let check = roll_check(save_bonus, spell_dc, roller);
                state.push_log(format!(
                    "{} rolls a {} save: [{}{:+}={} vs DC {}] {}",
                    target_name,
                    save_name(kind),
                    check.roll,
                    check.modifier,
                    check.total,
                    check.dc,
                    save_label(check.degree)
                ));
                Some(check.degree)
            }
            None => None,
        };

        if let (Some(formula), Some(damage_type)) = (def.damage_formula, def.damage_type) {
            let dice = def
                .heightened_dice(&substitute_mod(formula, ability_mod), cast_level)
                .map_err(ActionError::Invalid)?;
            let rolled = dice.roll(roller);
            let damage = match save_result {
                Some(degree) => save_damage(rolled.total, degree),
                None => rolled.total,
            };

            if damage > 0 {
                let outcome = state
                    .combatant_mut(&target_id)
                    .ok_or(ActionError::InvalidTarget)?
                    .apply_damage(damage);
                state.push_log(format!(
                    "{} takes {} {} damage.",
                    target_name, damage, damage_type
                ));
                match outcome {
                    DamageOutcome::Unconscious { .. } => {
                        state.push_log(format!("{} falls unconscious!", target_name));
                    }
                    DamageOutcome::Dead => {
                        state.push_log(format!("{} dies!", target_name));
                    }
                    DamageOutcome::Wounded => {}
                }
                events.push(AttackEvent::Damage {
                    attacker_id: caster_id.to_string(),
                    target_id: target_id.clone(),
                    value: damage,
                    position: target_pos,
                });
            } else {
                state.push_log(format!("{} takes no damage.", target_name));
            }
        }

        // riders land on a failed save
        if matches!(save_result, Some(Degree::Failure) | Some(Degree::CriticalFailure)) {
            for rider in &def.conditions {
                if let Some(pf2) = state
                    .combatant_mut(&target_id)
                    .and_then(|c| c.pf2_mut())
                {
                    pf2.set_condition(*rider);
                }
                let label = match rider.value {
                    Some(v) => format!("{} {}", condition_name(rider.condition), v),
                    None => condition_name(rider.condition),
                };
                state.push_log(format!("{} is now {}.", target_name, label));
            }
        }
    }

    state.check_victory();

    Ok(CastOutcome { events })
}
