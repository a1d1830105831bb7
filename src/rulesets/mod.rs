//! Ruleset selection and match setup
//!
//! The engine is ruleset-agnostic outside this module and the combat
//! resolution code; everything that differs between the two systems
//! hangs off [`RulesetId`].

use serde::{Deserialize, Serialize};

use crate::character::CharacterSheet;
use crate::combat::grid::{GridKind, GridPosition};
use crate::combat::state::{Combatant, GurpsCombatant, Pf2Combatant, PlayerInfo, RulesData};
use crate::rules::check::ability_modifier;
use crate::rules::dice::Roller;

pub mod gurps;
pub mod pf2;

/// Which rule system a match runs under
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RulesetId {
    Pf2,
    Gurps,
}

impl RulesetId {
    /// PF2-like plays on squares, GURPS-like on hexes.
    pub fn grid_kind(self) -> GridKind {
        match self {
            RulesetId::Pf2 => GridKind::Square,
            RulesetId::Gurps => GridKind::Hex,
        }
    }
}

impl std::fmt::Display for RulesetId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RulesetId::Pf2 => write!(f, "pf2"),
            RulesetId::Gurps => write!(f, "gurps"),
        }
    }
}

/// Opening spawn cell: humans on the left side of the field, bots on
/// the right, fanned out by join order.
pub fn spawn_position(index: usize, is_bot: bool) -> GridPosition {
    let row = (index / 2) as i32;
    let offset = if index % 2 == 0 { -1 } else { 1 };
    let q = if is_bot { 6 + offset } else { -2 + offset };
    GridPosition::new(q, row)
}

/// Build the per-match combat state for one participant.
pub fn create_combatant(
    sheet: &CharacterSheet,
    player_id: &str,
    position: GridPosition,
) -> Combatant {
    let rules = match sheet {
        CharacterSheet::Pf2(_) => RulesData::Pf2(Pf2Combatant::default()),
        CharacterSheet::Gurps(s) => RulesData::Gurps(GurpsCombatant::new(
            s.derived.fatigue_points,
            // the primary weapon starts drawn
            s.first_weapon().map(|w| w.id.clone()),
        )),
    };
    Combatant {
        player_id: player_id.to_string(),
        character_id: sheet.id().to_string(),
        position,
        current_hp: sheet.max_hp(),
        status_effects: Vec::new(),
        rules,
    }
}

/// Initiative score and tiebreaker for one sheet. PF2-like rolls off
/// perception + DEX modifier; GURPS-like uses basic speed. DEX breaks
/// ties, then a random roll.
fn initiative_key(sheet: &CharacterSheet) -> (f64, i32) {
    match sheet {
        CharacterSheet::Pf2(s) => (
            (s.derived.perception + ability_modifier(s.abilities.dexterity)) as f64,
            s.abilities.dexterity,
        ),
        CharacterSheet::Gurps(s) => (s.derived.basic_speed, s.attributes.dexterity),
    }
}

/// Sort players into turn order by initiative, highest first.
pub fn initiative_order(
    players: &[PlayerInfo],
    characters: &[CharacterSheet],
    roller: &mut dyn Roller,
) -> Vec<PlayerInfo> {
    let mut keyed: Vec<(f64, i32, u32, PlayerInfo)> = players
        .iter()
        .map(|p| {
            let (score, tiebreaker) = characters
                .iter()
                .find(|c| c.id() == p.character_id)
                .map(initiative_key)
                .unwrap_or((5.0, 10));
            (score, tiebreaker, roller.die(1000), p.clone())
        })
        .collect();
    keyed.sort_by(|a, b| {
        b.0.partial_cmp(&a.0)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then(b.1.cmp(&a.1))
            .then(b.2.cmp(&a.2))
    });
    keyed.into_iter().map(|(_, _, _, p)| p).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::combat::testutil::{gurps_sheet, pf2_sheet};
    use crate::rules::dice::FixedRoller;

    fn player(id: &str, character_id: &str) -> PlayerInfo {
        PlayerInfo {
            id: id.into(),
            name: id.into(),
            is_bot: false,
            character_id: character_id.into(),
        }
    }

    #[test]
    fn test_grid_kind_per_ruleset() {
        assert_eq!(RulesetId::Pf2.grid_kind(), GridKind::Square);
        assert_eq!(RulesetId::Gurps.grid_kind(), GridKind::Hex);
    }

    #[test]
    fn test_spawn_positions_split_by_side() {
        assert_eq!(spawn_position(0, false), GridPosition::new(-3, 0));
        assert_eq!(spawn_position(1, true), GridPosition::new(7, 0));
        assert_eq!(spawn_position(2, false), GridPosition::new(-3, 1));
    }

    #[test]
    fn test_create_combatant_snapshots_hp() {
        let sheet = CharacterSheet::Pf2(pf2_sheet("c1", "Alice"));
        let combatant = create_combatant(&sheet, "p1", GridPosition::new(0, 0));
        assert_eq!(combatant.current_hp, 18);
        assert!(combatant.pf2().is_some());
    }

    #[test]
    fn test_initiative_prefers_higher_speed() {
        let mut fast = gurps_sheet("c1", "Fast");
        fast.attributes.dexterity = 13;
        fast.derived = crate::character::gurps_derived(&fast.attributes);
        let slow = gurps_sheet("c2", "Slow");

        let players = vec![player("p2", "c2"), player("p1", "c1")];
        let characters = vec![CharacterSheet::Gurps(slow), CharacterSheet::Gurps(fast)];
        let mut roller = FixedRoller::new([500, 500]);
        let order = initiative_order(&players, &characters, &mut roller);
        assert_eq!(order[0].id, "p1");
    }

    #[test]
    fn test_initiative_ties_break_on_dex() {
        let mut nimble = pf2_sheet("c1", "Nimble");
        nimble.abilities.dexterity = 14;
        // keep the perception + dex-mod score equal
        nimble.derived.perception = 2;
        let steady = pf2_sheet("c2", "Steady");

        let players = vec![player("p2", "c2"), player("p1", "c1")];
        let characters = vec![CharacterSheet::Pf2(steady), CharacterSheet::Pf2(nimble)];
        let mut roller = FixedRoller::new([500, 500]);
        let order = initiative_order(&players, &characters, &mut roller);
        assert_eq!(order[0].id, "p1");
    }
}
