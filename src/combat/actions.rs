//! Action payloads and the per-action trait table
//!
//! Every action a client can submit is one variant of [`ActionPayload`].
//! The table in [`action_traits`] decides cost, whether the action has
//! the attack trait (escalating the multiple attack penalty), and
//! whether the current penalty applies to its roll.

use serde::{Deserialize, Serialize};

use crate::combat::grid::GridPosition;
use crate::combat::state::{DefenseKind, Maneuver, Posture};

/// Client-submitted combat action, closed union over both rulesets
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ActionPayload {
    // PF2-like
    Strike {
        target_id: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        weapon_id: Option<String>,
    },
    Stride {
        to: GridPosition,
    },
    Step {
        to: GridPosition,
    },
    Interact,
    RaiseShield,
    DropProne,
    Stand,
    Grapple {
        target_id: String,
    },
    Trip {
        target_id: String,
    },
    Disarm {
        target_id: String,
    },
    Feint {
        target_id: String,
    },
    Demoralize {
        target_id: String,
    },
    /// Two-action feat strike: one attack with an extra damage die
    PowerAttack {
        target_id: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        weapon_id: Option<String>,
    },
    /// Two-action feat: stride up to double speed, then strike
    SuddenCharge {
        to: GridPosition,
        target_id: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        weapon_id: Option<String>,
    },
    CastSpell {
        spell: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        target_id: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        at: Option<GridPosition>,
        #[serde(skip_serializing_if = "Option::is_none")]
        level: Option<u8>,
        #[serde(default)]
        caster_index: usize,
    },
    /// Answer to a reaction prompt
    ReactionChoice {
        use_reaction: bool,
    },
    // GURPS-like
    SelectManeuver {
        maneuver: Maneuver,
    },
    Attack {
        target_id: String,
    },
    DefenseChoice {
        defense: DefenseKind,
        #[serde(default)]
        retreat: bool,
    },
    ChangePosture {
        posture: Posture,
    },
    Aim {
        target_id: String,
    },
    Evaluate {
        target_id: String,
    },
    Move {
        to: GridPosition,
    },
    // Shared
    EndTurn,
}

/// What an action costs from the three-action budget
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionCost {
    Free,
    Actions(u8),
    Reaction,
}

/// Static resolution traits of one action type
#[derive(Debug, Clone, Copy)]
pub struct ActionTraits {
    pub cost: ActionCost,
    /// Escalates the multiple attack penalty after resolving
    pub attack_trait: bool,
    /// The current multiple attack penalty applies to this roll
    pub applies_map: bool,
}

const ATTACK: ActionTraits = ActionTraits {
    cost: ActionCost::Actions(1),
    attack_trait: true,
    applies_map: true,
};

const SIMPLE: ActionTraits = ActionTraits {
    cost: ActionCost::Actions(1),
    attack_trait: false,
    applies_map: false,
};

/// Traits for a PF2-like action. Strikes and the athletics maneuvers
/// both carry the attack trait and take the penalty; feint and
/// demoralize do neither.
pub fn action_traits(action: &ActionPayload) -> ActionTraits {
    match action {
        ActionPayload::Strike { .. }
        | ActionPayload::Grapple { .. }
        | ActionPayload::Trip { .. }
        | ActionPayload::Disarm { .. } => ATTACK,
        ActionPayload::PowerAttack { .. } | ActionPayload::SuddenCharge { .. } => ActionTraits {
            cost: ActionCost::Actions(2),
            attack_trait: true,
            applies_map: true,
        },
        ActionPayload::Stride { .. }
        | ActionPayload::Step { .. }
        | ActionPayload::Interact
        | ActionPayload::RaiseShield
        | ActionPayload::Stand
        | ActionPayload::Feint { .. }
        | ActionPayload::Demoralize { .. } => SIMPLE,
        ActionPayload::DropProne => ActionTraits {
            cost: ActionCost::Free,
            attack_trait: false,
            applies_map: false,
        },
        ActionPayload::CastSpell { .. } => ActionTraits {
            cost: ActionCost::Actions(2),
            attack_trait: false,
            applies_map: false,
        },
        // Everything else is outside the PF2-like action economy
        _ => ActionTraits {
            cost: ActionCost::Free,
            attack_trait: false,
            applies_map: false,
        },
    }
}

impl ActionPayload {
    /// Human-readable action name for log entries and errors.
    pub fn name(&self) -> &'static str {
        match self {
            ActionPayload::Strike { .. } => "strike",
            ActionPayload::Stride { .. } => "stride",
            ActionPayload::Step { .. } => "step",
            ActionPayload::Interact => "interact",
            ActionPayload::RaiseShield => "raise_shield",
            ActionPayload::DropProne => "drop_prone",
            ActionPayload::Stand => "stand",
            ActionPayload::Grapple { .. } => "grapple",
            ActionPayload::Trip { .. } => "trip",
            ActionPayload::Disarm { .. } => "disarm",
            ActionPayload::Feint { .. } => "feint",
            ActionPayload::Demoralize { .. } => "demoralize",
            ActionPayload::PowerAttack { .. } => "power_attack",
            ActionPayload::SuddenCharge { .. } => "sudden_charge",
            ActionPayload::CastSpell { .. } => "cast_spell",
            ActionPayload::ReactionChoice { .. } => "reaction_choice",
            ActionPayload::SelectManeuver { .. } => "select_maneuver",
            ActionPayload::Attack { .. } => "attack",
            ActionPayload::DefenseChoice { .. } => "defense_choice",
            ActionPayload::ChangePosture { .. } => "change_posture",
            ActionPayload::Aim { .. } => "aim",
            ActionPayload::Evaluate { .. } => "evaluate",
            ActionPayload::Move { .. } => "move",
            ActionPayload::EndTurn => "end_turn",
        }
    }
}
