//! Static rules content: the spell catalog and feat names
//!
//! The engine consumes this data but never depends on specific
//! entries; an unknown spell degrades to a "resolve manually" log
//! entry rather than an error.

use std::collections::HashMap;
use std::sync::OnceLock;

use crate::character::{DamageType, SaveKind, Tradition};
use crate::rules::conditions::{Condition, ConditionValue};
use crate::rules::dice::{parse_dice, DiceRoll};

/// What a spell targets
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetType {
    Single,
    /// Burst centered on a cell, radius in cells
    Area { radius: i32 },
}

/// How a spell scales when cast above its base level
#[derive(Debug, Clone)]
pub enum Heighten {
    /// Extra dice per `interval` levels above base
    Interval { interval: u8, extra_dice: u32 },
    /// Discrete extra-dice entries summed at or below the cast level
    Fixed { levels: Vec<(u8, u32)> },
}

/// One catalog entry
#[derive(Debug, Clone)]
pub struct SpellDefinition {
    pub name: &'static str,
    pub level: u8,
    pub tradition: Tradition,
    pub cast_actions: u8,
    pub target: TargetType,
    pub save: Option<SaveKind>,
    /// Damage formula; `{mod}` substitutes the casting ability modifier
    pub damage_formula: Option<&'static str>,
    pub damage_type: Option<DamageType>,
    pub heal_formula: Option<&'static str>,
    pub conditions: Vec<ConditionValue>,
    pub focus: bool,
    pub heighten: Option<Heighten>,
}

impl SpellDefinition {
    pub fn is_cantrip(&self) -> bool {
        self.level == 0
    }

    /// Damage dice at a given cast level, preserving the base flat
    /// modifier. `{mod}` must already be substituted by the caller.
    pub fn heightened_dice(&self, formula: &str, cast_level: u8) -> Result<DiceRoll, String> {
        let base = parse_dice(formula)?;
        let extra = match &self.heighten {
            None => 0,
            Some(Heighten::Interval { interval, extra_dice }) => {
                let above = cast_level.saturating_sub(self.level);
                (above as u32 / *interval as u32) * extra_dice
            }
            Some(Heighten::Fixed { levels }) => levels
                .iter()
                .filter(|(lvl, _)| *lvl <= cast_level)
                .map(|(_, dice)| *dice)
                .sum(),
        };
        Ok(base.with_extra_dice(extra))
    }
}

fn catalog() -> &'static HashMap<&'static str, SpellDefinition> {
    static CATALOG: OnceLock<HashMap<&'static str, SpellDefinition>> = OnceLock::new();
    CATALOG.get_or_init(|| {
        let spells = vec![
            SpellDefinition {
                name: "Electric Arc",
                level: 0,
                tradition: Tradition::Arcane,
                cast_actions: 2,
                target: TargetType::Single,
                save: Some(SaveKind::Reflex),
                damage_formula: Some("1d4+{mod}"),
                damage_type: Some(DamageType::Electricity),
                heal_formula: None,
                conditions: vec![],
                focus: false,
                heighten: Some(Heighten::Interval { interval: 1, extra_dice: 1 }),
            },
            SpellDefinition {
                name: "Ray of Frost",
                level: 0,
                tradition: Tradition::Arcane,
                cast_actions: 2,
                target: TargetType::Single,
                save: None,
                damage_formula: Some("1d4+{mod}"),
                damage_type: Some(DamageType::Cold),
                heal_formula: None,
                conditions: vec![],
                focus: false,
                heighten: Some(Heighten::Interval { interval: 1, extra_dice: 1 }),
            },
            SpellDefinition {
                name: "Magic Missile",
                level: 1,
                tradition: Tradition::Arcane,
                cast_actions: 2,
                target: TargetType::Single,
                save: None,
                damage_formula: Some("1d4+1"),
                damage_type: Some(DamageType::Force),
                heal_formula: None,
                conditions: vec![],
                focus: false,
                heighten: Some(Heighten::Fixed {
                    levels: vec![(3, 1), (5, 1), (7, 1), (9, 1)],
                }),
            },
            SpellDefinition {
                name: "Fireball",
                level: 3,
                tradition: Tradition::Arcane,
                cast_actions: 2,
                target: TargetType::Area { radius: 4 },
                save: Some(SaveKind::Reflex),
                damage_formula: Some("6d6"),
                damage_type: Some(DamageType::Fire),
                heal_formula: None,
                conditions: vec![],
                focus: false,
                heighten: Some(Heighten::Interval { interval: 1, extra_dice: 2 }),
            },
            SpellDefinition {
                name: "Heal",
                level: 1,
                tradition: Tradition::Divine,
                cast_actions: 2,
                target: TargetType::Single,
                save: None,
                damage_formula: None,
                damage_type: None,
                heal_formula: Some("1d8"),
                conditions: vec![],
                focus: false,
                heighten: Some(Heighten::Interval { interval: 1, extra_dice: 1 }),
            },
            SpellDefinition {
                name: "Soothe",
                level: 1,
                tradition: Tradition::Occult,
                cast_actions: 2,
                target: TargetType::Single,
                save: None,
                damage_formula: None,
                damage_type: None,
                heal_formula: Some("1d10+4"),
                conditions: vec![],
                focus: false,
                heighten: None,
            },
            SpellDefinition {
                name: "Fear",
                level: 1,
                tradition: Tradition::Arcane,
                cast_actions: 2,
                target: TargetType::Single,
                save: Some(SaveKind::Will),
                damage_formula: None,
                damage_type: None,
                heal_formula: None,
                conditions: vec![ConditionValue::with_value(Condition::Frightened, 1)],
                focus: false,
                heighten: None,
            },
            SpellDefinition {
                name: "Lay on Hands",
                level: 1,
                tradition: Tradition::Divine,
                cast_actions: 1,
                target: TargetType::Single,
                save: None,
                damage_formula: None,
                damage_type: None,
                heal_formula: Some("1d6"),
                conditions: vec![],
                focus: true,
                heighten: Some(Heighten::Interval { interval: 1, extra_dice: 1 }),
            },
        ];
        spells.into_iter().map(|s| (s.name, s)).collect()
    })
}

/// Catalog lookup by exact name.
pub fn spell(name: &str) -> Option<&'static SpellDefinition> {
    catalog().get(name)
}

/// Feat names the engine gives mechanical weight to.
pub mod feats {
    pub const ATTACK_OF_OPPORTUNITY: &str = "Attack of Opportunity";
    pub const SHIELD_BLOCK: &str = "Shield Block";
    pub const REACTIVE_SHIELD: &str = "Reactive Shield";
    pub const POWER_ATTACK: &str = "Power Attack";
    pub const SUDDEN_CHARGE: &str = "Sudden Charge";
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_catalog_lookup() {
        assert!(spell("Fireball").is_some());
        assert!(spell("fireball").is_none()); // exact match only
        assert!(spell("Wish").is_none());
    }

    #[test]
    fn test_interval_heighten_adds_dice_per_level() {
        let fireball = spell("Fireball").unwrap();
        let dice = fireball.heightened_dice("6d6", 5).unwrap();
        // two levels above base 3, +2 dice per level
        assert_eq!(dice.count, 10);
        assert_eq!(dice.sides, 6);

        let at_base = fireball.heightened_dice("6d6", 3).unwrap();
        assert_eq!(at_base.count, 6);
    }

    #[test]
    fn test_fixed_heighten_sums_entries_at_or_below() {
        let mm = spell("Magic Missile").unwrap();
        assert_eq!(mm.heightened_dice("1d4+1", 1).unwrap().count, 1);
        assert_eq!(mm.heightened_dice("1d4+1", 3).unwrap().count, 2);
        assert_eq!(mm.heightened_dice("1d4+1", 6).unwrap().count, 3);
        // flat modifier preserved
        assert_eq!(mm.heightened_dice("1d4+1", 6).unwrap().modifier, 1);
    }

    #[test]
    fn test_cantrip_classification() {
        assert!(spell("Electric Arc").unwrap().is_cantrip());
        assert!(!spell("Heal").unwrap().is_cantrip());
    }
}
