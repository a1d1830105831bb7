//! Turn-based combat
//!
//! Everything between an inbound action payload and the updated match
//! state: the battle grid, the action economy, attack and spell
//! resolution, reaction windows, turn scheduling, and the bot player.
//! [`resolve::submit_action`] is the single entry point the engine
//! drives.

pub mod actions;
pub mod attack;
pub mod bot;
pub mod economy;
pub mod grid;
pub mod reaction;
pub mod resolve;
pub mod scheduler;
pub mod spells;
pub mod state;

#[cfg(test)]
pub(crate) mod testutil;
