//! Attack resolution for both rulesets
//!
//! PF2-like strikes resolve fully in one call: to-hit, degree of
//! success, damage, HP application. GURPS-like attacks that land do
//! not apply damage immediately; they suspend the match behind a
//! `PendingDefense` until the defender chooses (or the timeout picks
//! no defense).

use crate::character::{DamageType, GurpsSheet, Pf2Sheet, Weapon, WeaponTrait};
use crate::combat::grid::{self, GridKind, GridPosition};
use crate::combat::state::{
    Combatant, DamageOutcome, DefenseKind, Maneuver, MatchState, PendingDefense, Posture,
};
use crate::error::ActionError;
use crate::rules::check::{roll_check, CheckResult, Degree};
use crate::rules::conditions;
use crate::rules::dice::{parse_dice, Roller};

/// Visual cue emitted alongside a resolution, for client display
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttackEvent {
    Damage {
        attacker_id: String,
        target_id: String,
        value: i32,
        position: GridPosition,
    },
    Miss {
        attacker_id: String,
        target_id: String,
        position: GridPosition,
    },
    Defend {
        defender_id: String,
        position: GridPosition,
    },
}

/// How a strike call should treat cost and penalties
#[derive(Debug, Clone, Copy)]
pub struct StrikeOptions {
    /// Apply the attacker's current MAP to the roll
    pub apply_map: bool,
    /// Extra damage dice (Power Attack, heightened effects)
    pub extra_damage_dice: u32,
}

impl Default for StrikeOptions {
    fn default() -> Self {
        Self {
            apply_map: true,
            extra_damage_dice: 0,
        }
    }
}

/// Outcome of a resolved PF2-like strike
#[derive(Debug, Clone)]
pub struct StrikeOutcome {
    pub check: CheckResult,
    pub damage_dealt: i32,
    pub target_defeated: bool,
    pub events: Vec<AttackEvent>,
}

fn pf2_sheet<'a>(state: &'a MatchState, combatant: &Combatant) -> Result<&'a Pf2Sheet, ActionError> {
    state
        .character_for(combatant)
        .and_then(|c| c.as_pf2())
        .ok_or(ActionError::InvalidTarget)
}

fn gurps_sheet<'a>(
    state: &'a MatchState,
    combatant: &Combatant,
) -> Result<&'a GurpsSheet, ActionError> {
    state
        .character_for(combatant)
        .and_then(|c| c.as_gurps())
        .ok_or(ActionError::InvalidTarget)
}

/// Attack bonus for a weapon: STR modifier (or the better of STR/DEX
/// for finesse), weapon proficiency, MAP if it applies, condition
/// penalties.
fn pf2_attack_bonus(
    sheet: &Pf2Sheet,
    weapon: &Weapon,
    combatant: &Combatant,
    apply_map: bool,
) -> i32 {
    let str_mod = sheet.abilities.modifier(crate::character::Ability::Strength);
    let dex_mod = sheet.abilities.modifier(crate::character::Ability::Dexterity);
    let ability_mod = if weapon.has_trait(WeaponTrait::Finesse) || weapon.is_ranged() {
        str_mod.max(dex_mod)
    } else {
        str_mod
    };
    let proficiency = weapon
        .proficiency
        .unwrap_or(crate::rules::check::Proficiency::Trained);
    let mut bonus = ability_mod + proficiency.bonus(sheet.level);
    if apply_map {
        if let Some(pf2) = combatant.pf2() {
            bonus += pf2.map_penalty;
        }
    }
    if let Some(pf2) = combatant.pf2() {
        bonus += conditions::attack_modifier(&pf2.conditions);
    }
    bonus
}

/// Effective AC: sheet AC plus condition modifiers plus +2 while the
/// shield is raised.
fn pf2_effective_ac(sheet: &Pf2Sheet, target: &Combatant, melee: bool) -> i32 {
    let kind = if melee {
        conditions::AttackKind::Melee
    } else {
        conditions::AttackKind::Ranged
    };
    let mut ac = sheet.derived.armor_class;
    if let Some(pf2) = target.pf2() {
        ac += conditions::ac_modifier(&pf2.conditions, kind);
        if pf2.shield_raised {
            ac += sheet.shield.map(|s| s.ac_bonus).unwrap_or(2);
        }
    }
    ac
}

/// Resolve a PF2-like strike. Validates target and range, rolls the
/// attack against the effective AC, applies damage (doubled on a
/// critical hit), and appends log entries. Action cost and MAP
/// escalation are the caller's concern (the economy module) so the
/// same pipeline serves reaction strikes.
pub fn resolve_strike(
    state: &mut MatchState,
    attacker_id: &str,
    target_id: &str,
    weapon_id: Option<&str>,
    options: StrikeOptions,
    roller: &mut dyn Roller,
) -> Result<StrikeOutcome, ActionError> {
    let attacker = state.combatant(attacker_id).ok_or(ActionError::InvalidTarget)?;
    let target = state.combatant(target_id).ok_or(ActionError::InvalidTarget)?;
    if attacker_id == target_id || target.is_defeated() {
        return Err(ActionError::InvalidTarget);
    }

    let attacker_sheet = pf2_sheet(state, attacker)?;
    pf2_sheet(state, target)?;
    let weapon = attacker_sheet.weapon_or_default(weapon_id);

    let distance = grid::square_distance(attacker.position, target.position);
    let melee = !weapon.is_ranged();
    if melee && distance > 1 {
        return Err(ActionError::OutOfRange);
    }
    if let Some(range) = weapon.range {
        if distance > range as i32 {
            return Err(ActionError::OutOfRange);
        }
    }

    let attack_bonus = pf2_attack_bonus(attacker_sheet, &weapon, attacker, options.apply_map);
    let attacker_name = attacker_sheet.name.clone();
    let target_pos = target.position;
    let str_mod = attacker_sheet
        .abilities
        .modifier(crate::character::Ability::Strength);
    let condition_attack = attacker
        .pf2()
        .map(|p| conditions::attack_modifier(&p.conditions))
        .unwrap_or(0);
    let map_penalty = if options.apply_map {
        attacker.pf2().map(|p| p.map_penalty).unwrap_or(0)
    } else {
        0
    };

    // a melee strike gives the defender a chance to raise their shield
    if melee {
        crate::combat::reaction::try_reactive_shield(state, target_id);
    }

    let target = state.combatant(target_id).ok_or(ActionError::InvalidTarget)?;
    let target_sheet = pf2_sheet(state, target)?;
    let target_name = target_sheet.name.clone();
    let effective_ac = pf2_effective_ac(target_sheet, target, melee);
    let condition_ac = target
        .pf2()
        .map(|p| {
            conditions::ac_modifier(
                &p.conditions,
                if melee {
                    conditions::AttackKind::Melee
                } else {
                    conditions::AttackKind::Ranged
                },
            )
        })
        .unwrap_or(0);

    let check = roll_check(attack_bonus, effective_ac, roller);

    let mut log = format!(
        "{} attacks {} with {}",
        attacker_name, target_name, weapon.name
    );
    if map_penalty < 0 {
        log.push_str(&format!(" (MAP {})", map_penalty));
    }
    log.push_str(&conditions::format_modifiers(condition_attack, condition_ac));
    log.push_str(&format!(
        ": [{}{:+}={} vs AC {}] {}",
        check.roll, check.modifier, check.total, check.dc, check.degree
    ));

    let mut damage_dealt = 0;
    let mut events = Vec::new();
    let mut target_defeated = false;

    if check.degree.is_success() {
        let mut dice = parse_dice(&weapon.damage).map_err(ActionError::Invalid)?;
        if melee {
            dice.modifier += str_mod;
        }
        dice = dice.with_extra_dice(options.extra_damage_dice);
        let rolled = dice.roll(roller);
        damage_dealt = if check.degree == Degree::CriticalSuccess {
            rolled.total * 2
        } else {
            rolled.total
        };
        log.push_str(&format!(" for {} {} damage", damage_dealt, weapon.damage_type));
        if check.degree == Degree::CriticalSuccess {
            log.push_str(" (doubled)");
        }
        state.push_log(log);

        damage_dealt = crate::combat::reaction::try_shield_block(state, target_id, damage_dealt);

        let outcome = state
            .combatant_mut(target_id)
            .ok_or(ActionError::InvalidTarget)?
            .apply_damage(damage_dealt);
        match outcome {
            DamageOutcome::Unconscious { .. } => {
                state.push_log(format!("{} falls unconscious!", target_name));
                target_defeated = true;
            }
            DamageOutcome::Dead => {
                state.push_log(format!("{} dies!", target_name));
                target_defeated = true;
            }
            DamageOutcome::Wounded => {}
        }
        events.push(AttackEvent::Damage {
            attacker_id: attacker_id.to_string(),
            target_id: target_id.to_string(),
            value: damage_dealt,
            position: target_pos,
        });
    } else {
        events.push(AttackEvent::Miss {
            attacker_id: attacker_id.to_string(),
            target_id: target_id.to_string(),
            position: target_pos,
        });
        state.push_log(log);
    }

    state.check_victory();

    Ok(StrikeOutcome {
        check,
        damage_dealt,
        target_defeated,
        events,
    })
}

/// Ranged to-hit penalty by hex distance (GURPS-like speed/range band).
pub fn range_penalty(distance: i32) -> i32 {
    match distance {
        _ if distance <= 2 => 0,
        3 => -1,
        4..=5 => -2,
        6..=7 => -3,
        8..=10 => -4,
        11..=15 => -5,
        16..=20 => -6,
        21..=30 => -7,
        31..=50 => -8,
        51..=70 => -9,
        _ => -10,
    }
}

fn posture_to_hit(posture: Posture) -> i32 {
    match posture {
        Posture::Standing => 0,
        Posture::Crouching | Posture::Kneeling => -2,
        Posture::Prone => -4,
    }
}

/// What a GURPS-like attack call produced
#[derive(Debug, Clone)]
pub enum GurpsAttackOutcome {
    /// The attack missed outright
    Miss { check: CheckResult },
    /// The attack landed; the defender must now choose a defense
    PendingDefense { margin: i32 },
    /// A critical hit lands unanswerable; damage is already applied
    CriticalHit {
        damage_dealt: i32,
        events: Vec<AttackEvent>,
    },
}

/// Resolve a GURPS-like attack up to the defense window. The roll is
/// made against a target number derived from the defender's dodge; an
/// ordinary hit records a `PendingDefense` on the match instead of
/// applying damage, while a critical hit allows no defense and deals
/// its damage here. Attacks swing the readied weapon; an undrawn
/// weapon leaves the attacker punching.
pub fn resolve_gurps_attack(
    state: &mut MatchState,
    attacker_id: &str,
    target_id: &str,
    roller: &mut dyn Roller,
) -> Result<GurpsAttackOutcome, ActionError> {
    let attacker = state.combatant(attacker_id).ok_or(ActionError::InvalidTarget)?;
    let target = state.combatant(target_id).ok_or(ActionError::InvalidTarget)?;
    if attacker_id == target_id || target.is_defeated() {
        return Err(ActionError::InvalidTarget);
    }

    let gurps = attacker.gurps().ok_or(ActionError::UnsupportedAction)?;
    match gurps.maneuver {
        Some(Maneuver::Attack) | Some(Maneuver::AllOutAttack) | Some(Maneuver::MoveAndAttack) => {}
        _ => {
            return Err(ActionError::Invalid(
                "current maneuver does not allow attacking".into(),
            ))
        }
    }

    let attacker_sheet = gurps_sheet(state, attacker)?;
    let target_sheet = gurps_sheet(state, target)?;

    let weapon = gurps
        .ready_weapon_id
        .as_deref()
        .and_then(|id| {
            attacker_sheet
                .equipment
                .iter()
                .find(|e| e.id == id && e.damage.is_some())
        })
        .cloned();
    let (weapon_name, damage_formula, damage_type, weapon_range) = match &weapon {
        Some(w) => (
            w.name.clone(),
            w.damage.clone().unwrap_or_else(|| "1d6".to_string()),
            w.damage_type.unwrap_or(DamageType::Crushing),
            w.range,
        ),
        None => ("Fist".to_string(), "1d6-2".to_string(), DamageType::Crushing, None),
    };

    let distance = grid::hex_distance(attacker.position, target.position);
    let mut modifier = gurps.evaluate_bonus - gurps.shock_penalty + posture_to_hit(gurps.posture);
    match weapon_range {
        Some(range) => {
            if distance > range as i32 {
                return Err(ActionError::OutOfRange);
            }
            modifier += range_penalty(distance);
        }
        None => {
            if distance > 1 {
                return Err(ActionError::OutOfRange);
            }
        }
    }

    let target_number = target_sheet.derived.dodge;
    let check = roll_check(modifier, target_number, roller);
    let margin = check.total - check.dc;

    let attacker_name = attacker_sheet.name.clone();
    let target_name = target_sheet.name.clone();
    let target_pos = target.position;
    let dr = target_sheet.damage_resistance;

    if margin < 0 {
        state.push_log(format!(
            "{} attacks {} with {}: [{}{:+}={} vs {}] Miss",
            attacker_name, target_name, weapon_name, check.roll, check.modifier, check.total,
            check.dc
        ));
        return Ok(GurpsAttackOutcome::Miss { check });
    }

    // a critical hit leaves no room to defend
    if check.degree == Degree::CriticalSuccess {
        state.push_log(format!(
            "{} attacks {} with {}: [{}{:+}={} vs {}] Critical hit!",
            attacker_name, target_name, weapon_name, check.roll, check.modifier, check.total,
            check.dc
        ));

        let dice = parse_dice(&damage_formula).map_err(ActionError::Invalid)?;
        let rolled = dice.roll(roller);
        let final_damage = (rolled.total - dr).max(0);
        let outcome = state
            .combatant_mut(target_id)
            .ok_or(ActionError::InvalidTarget)?
            .apply_damage(final_damage);

        let mut log = format!(
            "{} takes {} {} damage ({} rolled - {} DR)",
            target_name, final_damage, damage_type, rolled.total, dr
        );
        if outcome != DamageOutcome::Wounded {
            log.push_str(&format!(". {} falls!", target_name));
        }
        state.push_log(log);

        let events = vec![AttackEvent::Damage {
            attacker_id: attacker_id.to_string(),
            target_id: target_id.to_string(),
            value: final_damage,
            position: target_pos,
        }];
        state.check_victory();
        return Ok(GurpsAttackOutcome::CriticalHit {
            damage_dealt: final_damage,
            events,
        });
    }

    state.push_log(format!(
        "{} attacks {} with {}: [{}{:+}={} vs {}] Hit by {} - awaiting defense",
        attacker_name, target_name, weapon_name, check.roll, check.modifier, check.total, check.dc,
        margin
    ));
    state.pending_defense = Some(PendingDefense {
        attacker_id: attacker_id.to_string(),
        defender_id: target_id.to_string(),
        attack_margin: margin,
        weapon: weapon_name,
        damage: damage_formula,
        damage_type,
        deceptive_penalty: 0,
    });

    Ok(GurpsAttackOutcome::PendingDefense { margin })
}

/// Outcome of resolving a pending defense
#[derive(Debug, Clone)]
pub struct DefenseOutcome {
    pub defended: bool,
    pub damage_dealt: i32,
    pub events: Vec<AttackEvent>,
}

/// Defense target number for the chosen kind. Parry derives from the
/// best weapon skill; retreat gives +3 to dodge and +1 otherwise.
pub fn defense_value(sheet: &GurpsSheet, kind: DefenseKind, retreat: bool) -> i32 {
    let base = match kind {
        DefenseKind::Dodge => sheet.derived.dodge,
        DefenseKind::Parry => 3 + sheet.weapon_skill() / 2,
        DefenseKind::Block => 3 + sheet.weapon_skill() / 2,
        DefenseKind::None => return 0,
    };
    let retreat_bonus = if retreat {
        if kind == DefenseKind::Dodge {
            3
        } else {
            1
        }
    } else {
        0
    };
    base + retreat_bonus
}

/// Resolve the defender's choice against the open `PendingDefense`.
/// A successful 3d6 roll under the defense value negates the attack;
/// otherwise the stored damage formula is rolled and reduced by the
/// defender's damage resistance.
pub fn resolve_gurps_defense(
    state: &mut MatchState,
    defender_id: &str,
    kind: DefenseKind,
    retreat: bool,
    roller: &mut dyn Roller,
) -> Result<DefenseOutcome, ActionError> {
    let pending = state
        .pending_defense
        .take()
        .ok_or(ActionError::NoPendingChoice)?;
    if pending.defender_id != defender_id {
        state.pending_defense = Some(pending);
        return Err(ActionError::NoPendingChoice);
    }

    let defender = state.combatant(defender_id).ok_or(ActionError::InvalidTarget)?;
    let defender_sheet = gurps_sheet(state, defender)?;
    let defender_name = defender_sheet.name.clone();
    let defender_pos = defender.position;
    let dr = defender_sheet.damage_resistance;

    let mut events = Vec::new();

    if kind != DefenseKind::None {
        let target = defense_value(defender_sheet, kind, retreat) - pending.deceptive_penalty;
        let roll = crate::rules::check::skill_check_3d6(target, roller);
        if let Some(gurps) = state.combatant_mut(defender_id).and_then(|c| c.gurps_mut()) {
            gurps.defenses_this_turn += 1;
            if retreat {
                gurps.retreated_this_turn = true;
            }
        }
        if roll.success {
            state.push_log(format!(
                "{} defends ({:?}): [{}={} vs {}] Success",
                defender_name,
                kind,
                roll.dice.iter().map(|d| d.to_string()).collect::<Vec<_>>().join("+"),
                roll.roll,
                roll.target
            ));
            events.push(AttackEvent::Defend {
                defender_id: defender_id.to_string(),
                position: defender_pos,
            });
            state.check_victory();
            return Ok(DefenseOutcome {
                defended: true,
                damage_dealt: 0,
                events,
            });
        }
        state.push_log(format!(
            "{} fails to defend ({:?}): [{}] vs {}",
            defender_name, kind, roll.roll, roll.target
        ));
    } else {
        state.push_log(format!("{} makes no defense.", defender_name));
    }

    let dice = parse_dice(&pending.damage).map_err(ActionError::Invalid)?;
    let rolled = dice.roll(roller);
    let final_damage = (rolled.total - dr).max(0);

    let outcome = state
        .combatant_mut(defender_id)
        .ok_or(ActionError::InvalidTarget)?
        .apply_damage(final_damage);

    let mut log = format!(
        "{} takes {} {} damage ({} rolled - {} DR)",
        defender_name, final_damage, pending.damage_type, rolled.total, dr
    );
    if outcome != DamageOutcome::Wounded {
        log.push_str(&format!(". {} falls!", defender_name));
    }
    state.push_log(log);

    events.push(AttackEvent::Damage {
        attacker_id: pending.attacker_id.clone(),
        target_id: defender_id.to_string(),
        value: final_damage,
        position: defender_pos,
    });

    state.check_victory();

    Ok(DefenseOutcome {
        defended: false,
        damage_dealt: final_damage,
        events,
    })
}
