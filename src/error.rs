//! Error types for combat action handling

use thiserror::Error;

/// Why a submitted action was rejected.
///
/// Rejections are reported to the submitting client and leave match
/// state untouched.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ActionError {
    #[error("it is not your turn")]
    NotYourTurn,

    #[error("not enough actions remaining (need {need}, have {have})")]
    InsufficientActions { need: u8, have: u8 },

    #[error("no valid target")]
    InvalidTarget,

    #[error("target is out of range")]
    OutOfRange,

    #[error("destination is occupied")]
    DestinationOccupied,

    #[error("destination is out of movement range")]
    OutOfMovementRange,

    #[error("requires {0}")]
    MissingFeature(String),

    #[error("{0}")]
    ResourceExhausted(String),

    #[error("no pending choice to answer")]
    NoPendingChoice,

    #[error("a pending choice must be answered first")]
    ChoicePending,

    #[error("unknown spell: {0}")]
    UnknownSpell(String),

    #[error("spell cannot be cast at level {0}")]
    InvalidSpellLevel(u8),

    #[error("match is not active")]
    MatchNotActive,

    #[error("unknown action for this ruleset")]
    UnsupportedAction,

    #[error("invalid action: {0}")]
    Invalid(String),
}

/// Server-level failures outside a single action's resolution.
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("match not found: {0}")]
    MatchNotFound(String),

    #[error("character not found: {0}")]
    CharacterNotFound(String),

    #[error("player {0} is not in this match")]
    PlayerNotInMatch(String),

    #[error("match engine unavailable")]
    EngineUnavailable,

    #[error("configuration error: {0}")]
    Config(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_action_error_messages() {
        let e = ActionError::InsufficientActions { need: 2, have: 1 };
        assert_eq!(e.to_string(), "not enough actions remaining (need 2, have 1)");
        assert_eq!(
            ActionError::MissingFeature("Attack of Opportunity".into()).to_string(),
            "requires Attack of Opportunity"
        );
    }
}
