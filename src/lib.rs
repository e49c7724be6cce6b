//! Balkan Front - deterministic turn core for a historical conflict wargame
//!
//! Given a world state and a seed, [`pipeline::execute_turn`] advances the
//! world by exactly one discrete turn through a fixed ordered phase list and
//! returns a new, fully determined state plus an audit trail. Same seed and
//! same state always produce byte-identical canonical output.

pub mod bot;
pub mod control;
pub mod core;
pub mod displacement;
pub mod events;
pub mod graph;
pub mod pipeline;
pub mod progression;
pub mod state;
