//! Status-condition modifier engine
//!
//! Pure functions of a combatant's condition list. Callers apply the
//! returned deltas; nothing here mutates state.

use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Condition tags recognized by the engine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Condition {
    Blinded,
    Clumsy,
    Dazzled,
    Doomed,
    Drained,
    Dying,
    Enfeebled,
    Fatigued,
    FlatFooted,
    Fleeing,
    Frightened,
    Grabbed,
    Immobilized,
    Paralyzed,
    Prone,
    Quickened,
    Restrained,
    Sickened,
    Slowed,
    Stunned,
    Stupefied,
    Unconscious,
    Wounded,
}

impl FromStr for Condition {
    type Err = ();

    // Exact, case-sensitive tag match
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "blinded" => Ok(Condition::Blinded),
            "clumsy" => Ok(Condition::Clumsy),
            "dazzled" => Ok(Condition::Dazzled),
            "doomed" => Ok(Condition::Doomed),
            "drained" => Ok(Condition::Drained),
            "dying" => Ok(Condition::Dying),
            "enfeebled" => Ok(Condition::Enfeebled),
            "fatigued" => Ok(Condition::Fatigued),
            "flat_footed" => Ok(Condition::FlatFooted),
            "fleeing" => Ok(Condition::Fleeing),
            "frightened" => Ok(Condition::Frightened),
            "grabbed" => Ok(Condition::Grabbed),
            "immobilized" => Ok(Condition::Immobilized),
            "paralyzed" => Ok(Condition::Paralyzed),
            "prone" => Ok(Condition::Prone),
            "quickened" => Ok(Condition::Quickened),
            "restrained" => Ok(Condition::Restrained),
            "sickened" => Ok(Condition::Sickened),
            "slowed" => Ok(Condition::Slowed),
            "stunned" => Ok(Condition::Stunned),
            "stupefied" => Ok(Condition::Stupefied),
            "unconscious" => Ok(Condition::Unconscious),
            "wounded" => Ok(Condition::Wounded),
            _ => Err(()),
        }
    }
}

/// A condition attached to a combatant, with an optional value
/// (e.g. frightened 2, slowed 1). Data only; the functions below
/// interpret it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConditionValue {
    pub condition: Condition,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<i32>,
}

impl ConditionValue {
    pub fn new(condition: Condition) -> Self {
        Self { condition, value: None }
    }

    pub fn with_value(condition: Condition, value: i32) -> Self {
        Self { condition, value: Some(value) }
    }
}

/// Melee or ranged, for condition AC math
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttackKind {
    Melee,
    Ranged,
}

/// AC modifier from conditions, per attack kind:
/// prone is +2 vs ranged and -2 vs melee; flat-footed is -2 regardless.
/// Effects are additive.
pub fn ac_modifier(conditions: &[ConditionValue], kind: AttackKind) -> i32 {
    let mut modifier = 0;
    for c in conditions {
        match c.condition {
            Condition::Prone => {
                modifier += if kind == AttackKind::Ranged { 2 } else { -2 };
            }
            Condition::FlatFooted => modifier -= 2,
            _ => {}
        }
    }
    modifier
}

/// Attack-roll modifier from conditions: prone is -2.
pub fn attack_modifier(conditions: &[ConditionValue]) -> i32 {
    let mut modifier = 0;
    for c in conditions {
        if c.condition == Condition::Prone {
            modifier -= 2;
        }
    }
    modifier
}

/// Whether the list carries the given condition tag.
pub fn has_condition(conditions: &[ConditionValue], condition: Condition) -> bool {
    conditions.iter().any(|c| c.condition == condition)
}

/// Value of a condition if present (missing value reads as 1).
pub fn condition_value(conditions: &[ConditionValue], condition: Condition) -> Option<i32> {
    conditions
        .iter()
        .find(|c| c.condition == condition)
        .map(|c| c.value.unwrap_or(1))
}

/// Short log suffix describing active modifiers, e.g.
/// " [conditions: attack -2, AC -2]".
pub fn format_modifiers(attack_mod: i32, ac_mod: i32) -> String {
    let mut parts = Vec::new();
    if attack_mod != 0 {
        parts.push(format!("attack {:+}", attack_mod));
    }
    if ac_mod != 0 {
        parts.push(format!("AC {:+}", ac_mod));
    }
    if parts.is_empty() {
        String::new()
    } else {
        format!(" [conditions: {}]", parts.join(", "))
    }
}
