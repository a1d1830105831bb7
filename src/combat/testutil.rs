//! Shared match fixtures for combat tests

use crate::character::{
    gurps_derived, Abilities, Attributes, CharacterSheet, DamageType, Equipment, GurpsSheet,
    Pf2Derived, Pf2Sheet, Weapon,
};
use crate::combat::grid::GridPosition;
use crate::combat::state::{
    Combatant, GurpsCombatant, MatchState, MatchStatus, Pf2Combatant, PlayerInfo, RulesData,
};
use crate::rulesets::RulesetId;

pub fn pf2_sheet(id: &str, name: &str) -> Pf2Sheet {
    Pf2Sheet {
        id: id.into(),
        name: name.into(),
        level: 1,
        abilities: Abilities {
            strength: 16,
            dexterity: 12,
            constitution: 12,
            intelligence: 10,
            wisdom: 10,
            charisma: 10,
        },
        derived: Pf2Derived {
            hit_points: 18,
            armor_class: 15,
            fortitude_save: 5,
            reflex_save: 4,
            will_save: 3,
            perception: 3,
            speed: 25,
        },
        weapons: vec![Weapon {
            id: "longsword".into(),
            name: "Longsword".into(),
            damage: "1d8".into(),
            damage_type: DamageType::Slashing,
            traits: vec![],
            range: None,
            proficiency: None,
        }],
        skills: vec![],
        feats: vec![],
        spellcasters: vec![],
        shield: None,
    }
}

pub fn gurps_sheet(id: &str, name: &str) -> GurpsSheet {
    let attributes = Attributes {
        strength: 12,
        dexterity: 11,
        intelligence: 10,
        health: 10,
    };
    GurpsSheet {
        id: id.into(),
        name: name.into(),
        attributes,
        derived: gurps_derived(&attributes),
        skills: vec![crate::character::GurpsSkill {
            name: "Broadsword".into(),
            level: 12,
        }],
        equipment: vec![Equipment {
            id: "broadsword".into(),
            name: "Broadsword".into(),
            damage: Some("1d6+1".into()),
            damage_type: Some(DamageType::Cutting),
            range: None,
        }],
        damage_resistance: 2,
    }
}

fn base_match(
    ruleset: RulesetId,
    characters: Vec<CharacterSheet>,
    combatants: Vec<Combatant>,
) -> MatchState {
    MatchState {
        id: "m1".into(),
        ruleset,
        players: vec![
            PlayerInfo {
                id: "p1".into(),
                name: "Alice".into(),
                is_bot: false,
                character_id: "c1".into(),
            },
            PlayerInfo {
                id: "p2".into(),
                name: "Borg".into(),
                is_bot: true,
                character_id: "c2".into(),
            },
        ],
        characters,
        combatants,
        active_turn_player_id: "p1".into(),
        round: 1,
        log: vec![],
        status: MatchStatus::Active,
        winner_id: None,
        pending_defense: None,
        pending_reaction: None,
    }
}

/// Two adjacent PF2-like combatants, Alice (p1) to act.
pub fn pf2_match() -> MatchState {
    let c1 = pf2_sheet("c1", "Alice");
    let c2 = pf2_sheet("c2", "Borg");
    let combatants = vec![
        Combatant {
            player_id: "p1".into(),
            character_id: "c1".into(),
            position: GridPosition::new(0, 0),
            current_hp: 18,
            status_effects: vec![],
            rules: RulesData::Pf2(Pf2Combatant::default()),
        },
        Combatant {
            player_id: "p2".into(),
            character_id: "c2".into(),
            position: GridPosition::new(1, 0),
            current_hp: 18,
            status_effects: vec![],
            rules: RulesData::Pf2(Pf2Combatant::default()),
        },
    ];
    base_match(
        RulesetId::Pf2,
        vec![CharacterSheet::Pf2(c1), CharacterSheet::Pf2(c2)],
        combatants,
    )
}

/// Two adjacent GURPS-like combatants (dodge 8, DR 2, HP 12).
pub fn gurps_match() -> MatchState {
    let c1 = gurps_sheet("c1", "Alice");
    let c2 = gurps_sheet("c2", "Borg");
    let fp = c1.derived.fatigue_points;
    let combatants = vec![
        Combatant {
            player_id: "p1".into(),
            character_id: "c1".into(),
            position: GridPosition::new(0, 0),
            current_hp: 12,
            status_effects: vec![],
            rules: RulesData::Gurps(GurpsCombatant::new(fp, Some("broadsword".into()))),
        },
        Combatant {
            player_id: "p2".into(),
            character_id: "c2".into(),
            position: GridPosition::new(1, 0),
            current_hp: 12,
            status_effects: vec![],
            rules: RulesData::Gurps(GurpsCombatant::new(fp, Some("broadsword".into()))),
        },
    ];
    base_match(
        RulesetId::Gurps,
        vec![CharacterSheet::Gurps(c1), CharacterSheet::Gurps(c2)],
        combatants,
    )
}
