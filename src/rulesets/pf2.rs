//! PF2-like derived statistics and stock characters

use crate::character::{
    Abilities, CharacterSheet, DamageType, Pf2Derived, Pf2Sheet, Shield, Weapon, WeaponTrait,
};
use crate::content::feats;
use crate::rules::check::{ability_modifier, Proficiency};

/// AC = 10 + capped DEX modifier + armor bonus + armor proficiency.
pub fn calculate_ac(
    abilities: &Abilities,
    armor_bonus: i32,
    proficiency: Proficiency,
    level: i32,
    dex_cap: Option<i32>,
) -> i32 {
    let dex_mod = ability_modifier(abilities.dexterity);
    let effective_dex = match dex_cap {
        Some(cap) => dex_mod.min(cap),
        None => dex_mod,
    };
    10 + effective_dex + armor_bonus + proficiency.bonus(level)
}

/// Save bonus: governing ability modifier + proficiency.
pub fn calculate_save(
    abilities: &Abilities,
    kind: crate::character::SaveKind,
    proficiency: Proficiency,
    level: i32,
) -> i32 {
    use crate::character::SaveKind;
    let score = match kind {
        SaveKind::Fortitude => abilities.constitution,
        SaveKind::Reflex => abilities.dexterity,
        SaveKind::Will => abilities.wisdom,
    };
    ability_modifier(score) + proficiency.bonus(level)
}

/// Full derived block from abilities, with trained proficiency across
/// the board. HP = class HP + CON modifier per level + (CON - 10).
pub fn calculate_derived_stats(
    abilities: &Abilities,
    level: i32,
    class_hp: i32,
    armor_bonus: i32,
) -> Pf2Derived {
    use crate::character::SaveKind;
    let con_mod = ability_modifier(abilities.constitution);
    Pf2Derived {
        hit_points: class_hp + con_mod * level + (abilities.constitution - 10),
        armor_class: calculate_ac(abilities, armor_bonus, Proficiency::Trained, level, None),
        fortitude_save: calculate_save(abilities, SaveKind::Fortitude, Proficiency::Trained, level),
        reflex_save: calculate_save(abilities, SaveKind::Reflex, Proficiency::Trained, level),
        will_save: calculate_save(abilities, SaveKind::Will, Proficiency::Trained, level),
        perception: ability_modifier(abilities.wisdom) + Proficiency::Trained.bonus(level),
        speed: 25,
    }
}

/// Stock sword-and-board fighter used for bot opponents.
pub fn stock_fighter(id: &str, name: &str) -> CharacterSheet {
    let abilities = Abilities {
        strength: 16,
        dexterity: 12,
        constitution: 14,
        intelligence: 10,
        wisdom: 10,
        charisma: 10,
    };
    let level = 1;
    CharacterSheet::Pf2(Pf2Sheet {
        id: id.to_string(),
        name: name.to_string(),
        level,
        abilities,
        derived: calculate_derived_stats(&abilities, level, 10, 2),
        weapons: vec![
            Weapon {
                id: "longsword".into(),
                name: "Longsword".into(),
                damage: "1d8".into(),
                damage_type: DamageType::Slashing,
                traits: vec![],
                range: None,
                proficiency: None,
            },
            Weapon {
                id: "dagger".into(),
                name: "Dagger".into(),
                damage: "1d4".into(),
                damage_type: DamageType::Piercing,
                traits: vec![WeaponTrait::Agile, WeaponTrait::Finesse, WeaponTrait::Thrown],
                range: Some(4),
                proficiency: None,
            },
        ],
        skills: vec![],
        feats: vec![
            feats::ATTACK_OF_OPPORTUNITY.to_string(),
            feats::SHIELD_BLOCK.to_string(),
        ],
        spellcasters: vec![],
        shield: Some(Shield {
            ac_bonus: 2,
            hardness: 5,
            hit_points: 20,
        }),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::character::SaveKind;

    #[test]
    fn test_calculate_ac_with_dex_cap() {
        let abilities = Abilities {
            dexterity: 18,
            ..Abilities::default()
        };
        // dex +4 uncapped: 10 + 4 + 2 + 3 = 19
        assert_eq!(calculate_ac(&abilities, 2, Proficiency::Trained, 1, None), 19);
        // capped at +1: 10 + 1 + 2 + 3 = 16
        assert_eq!(calculate_ac(&abilities, 2, Proficiency::Trained, 1, Some(1)), 16);
    }

    #[test]
    fn test_calculate_save_uses_governing_ability() {
        let abilities = Abilities {
            constitution: 14,
            wisdom: 8,
            ..Abilities::default()
        };
        assert_eq!(
            calculate_save(&abilities, SaveKind::Fortitude, Proficiency::Trained, 1),
            5
        );
        assert_eq!(
            calculate_save(&abilities, SaveKind::Will, Proficiency::Trained, 1),
            2
        );
    }

    #[test]
    fn test_derived_hp_formula() {
        let abilities = Abilities {
            constitution: 14,
            ..Abilities::default()
        };
        // 10 class + 2 con mod * 1 level + 4 over 10
        let derived = calculate_derived_stats(&abilities, 1, 10, 0);
        assert_eq!(derived.hit_points, 16);
        assert_eq!(derived.speed, 25);
    }

    #[test]
    fn test_stock_fighter_carries_reaction_feats() {
        let sheet = stock_fighter("b1", "Borg");
        let pf2 = sheet.as_pf2().unwrap();
        assert!(pf2.has_feat(feats::ATTACK_OF_OPPORTUNITY));
        assert!(pf2.has_feat(feats::SHIELD_BLOCK));
        assert!(pf2.shield.is_some());
    }
}
