//! Rules primitives shared by both rulesets
//!
//! - dice: damage notation parsing and the `Roller` seam
//! - check: ability/proficiency math and degree-of-success classification
//! - conditions: status-condition modifier engine

pub mod check;
pub mod conditions;
pub mod dice;

pub use check::{ability_modifier, degree_of_success, roll_check, CheckResult, Degree, Proficiency};
pub use conditions::{AttackKind, Condition, ConditionValue};
pub use dice::{parse_dice, DiceRoll, FixedRoller, RandomRoller, Roller};
