//! GURPS-like maneuver rules and stock characters

use crate::character::{
    gurps_derived, Attributes, CharacterSheet, DamageType, Equipment, GurpsSheet, GurpsSkill,
};
use crate::combat::state::{Maneuver, Posture};

/// Fraction of basic move available in a posture.
fn posture_move(basic_move: i32, posture: Posture) -> i32 {
    match posture {
        Posture::Standing => basic_move,
        Posture::Crouching => basic_move * 2 / 3,
        Posture::Kneeling => basic_move / 3,
        Posture::Prone => 0,
    }
}

/// Movement points granted by a maneuver. Attack-class maneuvers allow
/// a single step; Move and Move-and-Attack give the full allowance;
/// All-Out Attack gives half.
pub fn movement_allowance(maneuver: Option<Maneuver>, basic_move: i32, posture: Posture) -> i32 {
    let base = posture_move(basic_move, posture);
    match maneuver {
        None | Some(Maneuver::DoNothing) | Some(Maneuver::ChangePosture) => 0,
        Some(Maneuver::Move) | Some(Maneuver::MoveAndAttack) => base,
        Some(Maneuver::AllOutDefense) => base.min(1),
        Some(Maneuver::Attack) | Some(Maneuver::Aim) | Some(Maneuver::Evaluate) => 1,
        Some(Maneuver::AllOutAttack) => basic_move / 2,
    }
}

/// Whether a maneuver permits attacking this turn.
pub fn allows_attack(maneuver: Option<Maneuver>) -> bool {
    matches!(
        maneuver,
        Some(Maneuver::Attack) | Some(Maneuver::AllOutAttack) | Some(Maneuver::MoveAndAttack)
    )
}

/// Stock swordsman used for bot opponents.
pub fn stock_warrior(id: &str, name: &str) -> CharacterSheet {
    let attributes = Attributes {
        strength: 12,
        dexterity: 11,
        intelligence: 10,
        health: 11,
    };
    CharacterSheet::Gurps(GurpsSheet {
        id: id.to_string(),
        name: name.to_string(),
        attributes,
        derived: gurps_derived(&attributes),
        skills: vec![GurpsSkill {
            name: "Broadsword".into(),
            level: 13,
        }],
        equipment: vec![Equipment {
            id: "broadsword".into(),
            name: "Broadsword".into(),
            damage: Some("1d6+1".into()),
            damage_type: Some(DamageType::Cutting),
            range: None,
        }],
        damage_resistance: 2,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_movement_allowance_by_maneuver() {
        assert_eq!(movement_allowance(Some(Maneuver::Move), 5, Posture::Standing), 5);
        assert_eq!(movement_allowance(Some(Maneuver::Attack), 5, Posture::Standing), 1);
        assert_eq!(movement_allowance(Some(Maneuver::AllOutAttack), 5, Posture::Standing), 2);
        assert_eq!(movement_allowance(None, 5, Posture::Standing), 0);
    }

    #[test]
    fn test_posture_restricts_movement() {
        assert_eq!(movement_allowance(Some(Maneuver::Move), 6, Posture::Crouching), 4);
        assert_eq!(movement_allowance(Some(Maneuver::Move), 6, Posture::Kneeling), 2);
        assert_eq!(movement_allowance(Some(Maneuver::Move), 6, Posture::Prone), 0);
    }

    #[test]
    fn test_attack_maneuvers() {
        assert!(allows_attack(Some(Maneuver::Attack)));
        assert!(allows_attack(Some(Maneuver::MoveAndAttack)));
        assert!(!allows_attack(Some(Maneuver::Move)));
        assert!(!allows_attack(None));
    }

    #[test]
    fn test_stock_warrior_derived() {
        let sheet = stock_warrior("b1", "Borg");
        let gurps = sheet.as_gurps().unwrap();
        assert_eq!(gurps.derived.hit_points, 12);
        assert_eq!(gurps.derived.dodge, 8);
        assert_eq!(gurps.weapon_skill(), 13);
    }
}
