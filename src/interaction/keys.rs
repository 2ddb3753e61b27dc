//! Keyboard definitions for widget interactions
//!
//! Tracks which modifier keys accompanied a pointer or key event and names
//! the keys that activate suggestions, actions and the chat input.

use serde::{Deserialize, Serialize};

/// Modifier keys held while an event fired
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModifierState {
    /// Control key is held
    pub control: bool,
    /// Option/Alt key is held
    pub option: bool,
    /// Command/Meta key is held
    pub command: bool,
    /// Shift key is held
    pub shift: bool,
}

impl ModifierState {
    /// Check if all modifiers are released
    pub fn is_empty(&self) -> bool {
        !self.control && !self.option && !self.command && !self.shift
    }

    /// Command or Control: force a suggestion to submit
    pub fn is_primary(&self) -> bool {
        self.command || self.control
    }

    /// Option/Alt: force a suggestion to only fill the input
    pub fn is_secondary(&self) -> bool {
        self.option
    }
}

/// Keys the engine reacts to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Key {
    Enter,
    Space,
    Escape,
    #[serde(other)]
    Other,
}

impl Key {
    /// Keys that activate a focused suggestion or action button
    pub fn activates(&self) -> bool {
        matches!(self, Key::Enter | Key::Space)
    }
}

/// How an element on the transcript was triggered
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Trigger {
    Click {
        #[serde(default)]
        modifiers: ModifierState,
    },
    Key {
        key: Key,
        #[serde(default)]
        modifiers: ModifierState,
    },
}

impl Trigger {
    pub fn modifiers(&self) -> ModifierState {
        match self {
            Trigger::Click { modifiers } | Trigger::Key { modifiers, .. } => *modifiers,
        }
    }

    /// Clicks always activate; keys only when they are Enter or Space
    pub fn activates(&self) -> bool {
        match self {
            Trigger::Click { .. } => true,
            Trigger::Key { key, .. } => key.activates(),
        }
    }
}
