//! PF2-like action economy
//!
//! Validates and deducts action costs, and escalates the multiple
//! attack penalty after actions with the attack trait.

use crate::combat::actions::{ActionCost, ActionTraits};
use crate::combat::state::Pf2Combatant;
use crate::error::ActionError;
use crate::rules::conditions::{condition_value, has_condition, Condition};

/// Multiple attack penalty for the nth attack this turn (1-based).
/// Non-agile: 0, -5, -10; agile: 0, -4, -8. Floored at the third step.
pub fn multiple_attack_penalty(attack_number: u32, agile: bool) -> i32 {
    match attack_number {
        0 | 1 => 0,
        2 => {
            if agile {
                -4
            } else {
                -5
            }
        }
        _ => {
            if agile {
                -8
            } else {
                -10
            }
        }
    }
}

/// Next penalty after one more attack, floored.
pub fn escalate_map(current: i32, agile: bool) -> i32 {
    let step = if agile { -4 } else { -5 };
    let floor = if agile { -8 } else { -10 };
    (current + step).max(floor)
}

/// Check the combatant can pay for an action.
pub fn can_afford(combatant: &Pf2Combatant, cost: ActionCost) -> Result<(), ActionError> {
    match cost {
        ActionCost::Free => Ok(()),
        ActionCost::Reaction => {
            if combatant.reaction_available {
                Ok(())
            } else {
                Err(ActionError::ResourceExhausted("reaction already used".into()))
            }
        }
        ActionCost::Actions(n) => {
            if combatant.actions_remaining >= n {
                Ok(())
            } else {
                Err(ActionError::InsufficientActions {
                    need: n,
                    have: combatant.actions_remaining,
                })
            }
        }
    }
}

/// Deduct the cost and, for attack-trait actions, escalate the MAP.
pub fn apply_cost(combatant: &mut Pf2Combatant, traits: ActionTraits, agile: bool) {
    match traits.cost {
        ActionCost::Free => {}
        ActionCost::Reaction => combatant.reaction_available = false,
        ActionCost::Actions(n) => {
            combatant.actions_remaining = combatant.actions_remaining.saturating_sub(n);
        }
    }
    if traits.attack_trait {
        combatant.map_penalty = escalate_map(combatant.map_penalty, agile);
    }
}

/// Actions granted at the start of a turn: 3, minus slowed and stunned
/// values (floored at 0), plus 1 if quickened.
pub fn actions_for_new_turn(combatant: &Pf2Combatant) -> u8 {
    let mut actions: i32 = 3;
    if let Some(v) = condition_value(&combatant.conditions, Condition::Slowed) {
        actions = (actions - v).max(0);
    }
    if let Some(v) = condition_value(&combatant.conditions, Condition::Stunned) {
        actions = (actions - v).max(0);
    }
    if has_condition(&combatant.conditions, Condition::Quickened) {
        actions += 1;
    }
    actions as u8
}

/// Reset per-turn state: refill actions, restore the reaction, clear
/// the MAP, lower the shield.
pub fn start_new_turn(combatant: &mut Pf2Combatant) {
    combatant.actions_remaining = actions_for_new_turn(combatant);
    combatant.reaction_available = true;
    combatant.map_penalty = 0;
    combatant.shield_raised = false;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::conditions::ConditionValue;

    #[test]
    fn test_map_sequence_non_agile() {
        let mut map = 0;
        let seq: Vec<i32> = (0..4)
            .map(|_| {
                let current = map;
                map = escalate_map(map, false);
                current
            })
            .collect();
        assert_eq!(seq, vec![0, -5, -10, -10]);
    }

    #[test]
    fn test_map_sequence_agile() {
        let mut map = 0;
        let seq: Vec<i32> = (0..4)
            .map(|_| {
                let current = map;
                map = escalate_map(map, true);
                current
            })
            .collect();
        assert_eq!(seq, vec![0, -4, -8, -8]);
    }

    #[test]
    fn test_penalty_by_attack_number() {
        assert_eq!(multiple_attack_penalty(1, false), 0);
        assert_eq!(multiple_attack_penalty(2, false), -5);
        assert_eq!(multiple_attack_penalty(3, false), -10);
        assert_eq!(multiple_attack_penalty(5, false), -10);
        assert_eq!(multiple_attack_penalty(2, true), -4);
        assert_eq!(multiple_attack_penalty(3, true), -8);
    }

    #[test]
    fn test_can_afford() {
        let mut c = Pf2Combatant::default();
        assert!(can_afford(&c, ActionCost::Actions(3)).is_ok());
        c.actions_remaining = 1;
        assert_eq!(
            can_afford(&c, ActionCost::Actions(2)),
            Err(ActionError::InsufficientActions { need: 2, have: 1 })
        );
        assert!(can_afford(&c, ActionCost::Free).is_ok());

        c.reaction_available = false;
        assert!(can_afford(&c, ActionCost::Reaction).is_err());
    }

    #[test]
    fn test_apply_cost_deducts_and_escalates() {
        let mut c = Pf2Combatant::default();
        let attack = crate::combat::actions::ActionTraits {
            cost: ActionCost::Actions(1),
            attack_trait: true,
            applies_map: true,
        };
        apply_cost(&mut c, attack, false);
        assert_eq!(c.actions_remaining, 2);
        assert_eq!(c.map_penalty, -5);
        apply_cost(&mut c, attack, false);
        assert_eq!(c.map_penalty, -10);
    }

    #[test]
    fn test_new_turn_actions_with_conditions() {
        let mut c = Pf2Combatant::default();
        assert_eq!(actions_for_new_turn(&c), 3);

        c.conditions = vec![ConditionValue::with_value(Condition::Slowed, 1)];
        assert_eq!(actions_for_new_turn(&c), 2);

        c.conditions = vec![
            ConditionValue::with_value(Condition::Slowed, 2),
            ConditionValue::with_value(Condition::Stunned, 2),
        ];
        assert_eq!(actions_for_new_turn(&c), 0);

        c.conditions = vec![ConditionValue::new(Condition::Quickened)];
        assert_eq!(actions_for_new_turn(&c), 4);
    }

    #[test]
    fn test_start_new_turn_resets() {
        let mut c = Pf2Combatant {
            actions_remaining: 0,
            reaction_available: false,
            map_penalty: -10,
            shield_raised: true,
            ..Default::default()
        };
        start_new_turn(&mut c);
        assert_eq!(c.actions_remaining, 3);
        assert!(c.reaction_available);
        assert_eq!(c.map_penalty, 0);
        assert!(!c.shield_raised);
    }
}
