//! Interaction module
//!
//! Routes clicks and key presses on transcript content: suggestions fill or
//! submit the input, message actions emit action records, links are opened
//! behind a confirmation for other origins.

mod keys;
mod links;
mod router;

pub use keys::{Key, ModifierState, Trigger};
pub use links::{LinkDecision, LinkError, LinkGuard};
pub use router::{InteractionRouter, MessageAction, RouterEffect, Target, COPY_ACK_DURATION};
