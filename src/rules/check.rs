//! d20 check math: ability modifiers, proficiency, degree of success
//!
//! Also carries the 3d6 skill roll used by the GURPS-like ruleset for
//! maneuver checks.

use serde::{Deserialize, Serialize};

use super::dice::Roller;

/// Four-tier outcome of a d20 check
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Degree {
    CriticalFailure,
    Failure,
    Success,
    CriticalSuccess,
}

impl Degree {
    /// Step one tier up (natural 20), clamped at critical success.
    fn upgraded(self) -> Degree {
        match self {
            Degree::CriticalFailure => Degree::Failure,
            Degree::Failure => Degree::Success,
            Degree::Success | Degree::CriticalSuccess => Degree::CriticalSuccess,
        }
    }

    /// Step one tier down (natural 1), clamped at critical failure.
    fn downgraded(self) -> Degree {
        match self {
            Degree::CriticalSuccess => Degree::Success,
            Degree::Success => Degree::Failure,
            Degree::Failure | Degree::CriticalFailure => Degree::CriticalFailure,
        }
    }

    pub fn is_success(self) -> bool {
        matches!(self, Degree::Success | Degree::CriticalSuccess)
    }
}

impl std::fmt::Display for Degree {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Degree::CriticalFailure => "Critical Miss!",
            Degree::Failure => "Miss",
            Degree::Success => "Hit",
            Degree::CriticalSuccess => "Critical Hit!",
        };
        write!(f, "{}", s)
    }
}

/// A resolved d20 check
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct CheckResult {
    /// The raw d20
    pub roll: u32,
    /// Total bonus applied
    pub modifier: i32,
    /// roll + modifier
    pub total: i32,
    /// Difficulty class compared against
    pub dc: i32,
    pub degree: Degree,
    pub natural20: bool,
    pub natural1: bool,
}

/// Ability modifier from a score: floor((score - 10) / 2), clamped to [-5, 7].
pub fn ability_modifier(score: i32) -> i32 {
    ((score - 10).div_euclid(2)).clamp(-5, 7)
}

/// Proficiency rank for the PF2-like ruleset
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Proficiency {
    Untrained,
    Trained,
    Expert,
    Master,
    Legendary,
}

impl Proficiency {
    /// Proficiency bonus: rank bonus + level, except untrained which is 0.
    pub fn bonus(self, level: i32) -> i32 {
        match self {
            Proficiency::Untrained => 0,
            Proficiency::Trained => 2 + level,
            Proficiency::Expert => 4 + level,
            Proficiency::Master => 6 + level,
            Proficiency::Legendary => 8 + level,
        }
    }
}

/// Classify a d20 result against a DC.
///
/// total >= dc+10 -> critical success; total >= dc -> success;
/// total <= dc-10 -> critical failure; otherwise failure. A natural 20
/// upgrades one step, a natural 1 downgrades one step, both clamped.
pub fn degree_of_success(roll: u32, total: i32, dc: i32) -> Degree {
    let base = if total >= dc + 10 {
        Degree::CriticalSuccess
    } else if total >= dc {
        Degree::Success
    } else if total <= dc - 10 {
        Degree::CriticalFailure
    } else {
        Degree::Failure
    };

    match roll {
        20 => base.upgraded(),
        1 => base.downgraded(),
        _ => base,
    }
}

/// Roll 1d20 + modifier against a DC and classify the result.
pub fn roll_check(modifier: i32, dc: i32, roller: &mut dyn Roller) -> CheckResult {
    let roll = roller.d20();
    let total = roll as i32 + modifier;
    CheckResult {
        roll,
        modifier,
        total,
        dc,
        degree: degree_of_success(roll, total, dc),
        natural20: roll == 20,
        natural1: roll == 1,
    }
}

/// A resolved 3d6 skill roll (GURPS-like)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SkillRoll {
    pub dice: [u32; 3],
    pub roll: i32,
    pub target: i32,
    /// target - roll; success margin when non-negative
    pub margin: i32,
    pub success: bool,
    pub critical: bool,
}

/// Roll 3d6 against a skill target (roll-under).
///
/// Criticals follow the classic tables: 3-4 always crit, 5 at skill 15+,
/// 6 at skill 16+; 18 always fumbles, 17 at skill 15 or less.
pub fn skill_check_3d6(target: i32, roller: &mut dyn Roller) -> SkillRoll {
    let dice = roller.three_d6();
    let roll = dice.iter().sum::<u32>() as i32;
    let margin = target - roll;

    let critical_success =
        roll <= 4 || (roll == 5 && target >= 15) || (roll == 6 && target >= 16);
    let critical_failure = roll == 18 || (roll == 17 && target <= 15);

    SkillRoll {
        dice,
        roll,
        target,
        margin,
        success: margin >= 0 && !critical_failure,
        critical: critical_success || critical_failure,
    }
}
