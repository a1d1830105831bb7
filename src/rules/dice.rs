//! Dice rolling primitives
//!
//! Parses and rolls damage notation like "1d6+1", "2d8-2", "6d6".
//! All rolls go through the [`Roller`] trait so resolution code stays
//! deterministic under test.

use std::collections::VecDeque;
use std::str::FromStr;

use rand::Rng;

/// Source of individual die results.
pub trait Roller {
    /// Roll one die with the given number of sides (1..=sides).
    fn die(&mut self, sides: u32) -> u32;

    /// Roll a single d20.
    fn d20(&mut self) -> u32 {
        self.die(20)
    }

    /// Roll 3d6 and return the individual dice.
    fn three_d6(&mut self) -> [u32; 3] {
        [self.die(6), self.die(6), self.die(6)]
    }
}

/// Production roller backed by the thread RNG.
#[derive(Debug, Default, Clone, Copy)]
pub struct RandomRoller;

impl Roller for RandomRoller {
    fn die(&mut self, sides: u32) -> u32 {
        rand::rng().random_range(1..=sides)
    }
}

/// Deterministic roller fed a fixed sequence of die faces.
///
/// Used by tests and scripted replays. Panics in debug builds if the
/// sequence runs dry; release builds fall back to the die's midpoint.
#[derive(Debug, Default, Clone)]
pub struct FixedRoller {
    faces: VecDeque<u32>,
}

impl FixedRoller {
    pub fn new(faces: impl IntoIterator<Item = u32>) -> Self {
        Self {
            faces: faces.into_iter().collect(),
        }
    }

    pub fn remaining(&self) -> usize {
        self.faces.len()
    }
}

impl Roller for FixedRoller {
    fn die(&mut self, sides: u32) -> u32 {
        match self.faces.pop_front() {
            Some(face) => {
                debug_assert!(face >= 1 && face <= sides, "face {} out of 1..={}", face, sides);
                face.clamp(1, sides)
            }
            None => {
                debug_assert!(false, "FixedRoller exhausted");
                sides.div_ceil(2)
            }
        }
    }
}

/// A parsed damage-dice specification
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DiceRoll {
    /// Number of dice to roll
    pub count: u32,
    /// Number of sides per die
    pub sides: u32,
    /// Flat modifier to add/subtract
    pub modifier: i32,
}

/// Result of rolling a damage formula
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DamageRolled {
    /// Individual die results
    pub rolls: Vec<u32>,
    /// Flat modifier applied
    pub modifier: i32,
    /// Sum of rolls plus modifier, floored at 0
    pub total: i32,
}

impl DiceRoll {
    pub fn new(count: u32, sides: u32, modifier: i32) -> Self {
        Self { count, sides, modifier }
    }

    /// Roll the dice and return individual results plus total.
    pub fn roll(&self, roller: &mut dyn Roller) -> DamageRolled {
        let rolls: Vec<u32> = (0..self.count).map(|_| roller.die(self.sides)).collect();
        let sum: u32 = rolls.iter().sum();
        let total = (sum as i32 + self.modifier).max(0);
        DamageRolled {
            rolls,
            modifier: self.modifier,
            total,
        }
    }

    /// Minimum possible result
    pub fn min(&self) -> i32 {
        (self.count as i32 + self.modifier).max(0)
    }

    /// Maximum possible result
    pub fn max(&self) -> i32 {
        ((self.count * self.sides) as i32 + self.modifier).max(0)
    }

    /// Same dice with `extra` more of them, preserving the flat modifier.
    pub fn with_extra_dice(&self, extra: u32) -> Self {
        Self {
            count: self.count + extra,
            ..*self
        }
    }
}

impl FromStr for DiceRoll {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_dice(s)
    }
}

impl std::fmt::Display for DiceRoll {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.modifier > 0 {
            write!(f, "{}d{}+{}", self.count, self.sides, self.modifier)
        } else if self.modifier < 0 {
            write!(f, "{}d{}{}", self.count, self.sides, self.modifier)
        } else {
            write!(f, "{}d{}", self.count, self.sides)
        }
    }
}

/// Parse a damage notation string like "1d6+1"
pub fn parse_dice(notation: &str) -> Result<DiceRoll, String> {
    let notation = notation.trim().to_lowercase();

    let d_pos = notation.find('d').ok_or("missing 'd' in dice notation")?;

    let count_str = &notation[..d_pos];
    let count: u32 = if count_str.is_empty() {
        1 // "d6" means "1d6"
    } else {
        count_str
            .parse()
            .map_err(|_| format!("invalid dice count: {}", count_str))?
    };

    if count == 0 {
        return Err("dice count must be at least 1".to_string());
    }

    let rest = &notation[d_pos + 1..];

    let (sides_str, modifier) = if let Some(plus_pos) = rest.find('+') {
        let sides = &rest[..plus_pos];
        let mod_str = &rest[plus_pos + 1..];
        let modifier: i32 = mod_str
            .parse()
            .map_err(|_| format!("invalid modifier: {}", mod_str))?;
        (sides, modifier)
    } else if let Some(minus_pos) = rest.rfind('-') {
        if minus_pos == 0 {
            (rest, 0)
        } else {
            let sides = &rest[..minus_pos];
            let mod_str = &rest[minus_pos..]; // includes the minus sign
            let modifier: i32 = mod_str
                .parse()
                .map_err(|_| format!("invalid modifier: {}", mod_str))?;
            (sides, modifier)
        }
    } else {
        (rest, 0)
    };

    let sides: u32 = sides_str
        .parse()
        .map_err(|_| format!("invalid die sides: {}", sides_str))?;

    if sides == 0 {
        return Err("die sides must be at least 1".to_string());
    }

    Ok(DiceRoll { count, sides, modifier })
}
