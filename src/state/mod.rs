//! Turn lifecycle module
//!
//! Provides the turn-taking state machine with two states:
//! - Idle: input enabled, no pending turn
//! - AwaitingResponse: input disabled, a loading placeholder is shown
//!
//! and the input control whose availability it gates.

mod input;
mod machine;

pub use input::{Composition, InputControl, InputUpdate, SetValueOptions};
pub use machine::{TranscriptChange, TurnController, TurnState};
