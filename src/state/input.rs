//! The chat input control
//!
//! Holds the text box value and tracks IME composition so that a submit key
//! pressed while composing is left to the input method.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::interaction::{Key, ModifierState};

/// Composition lifecycle of the text box
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Composition {
    #[default]
    Idle,
    Composing,
}

/// Options for programmatically setting the input value
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SetValueOptions {
    pub submit: bool,
    pub focus: bool,
}

/// Payload of an `update-user-input` signal
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct InputUpdate {
    pub value: Option<String>,
    pub placeholder: Option<String>,
    pub submit: bool,
    pub focus: bool,
}

/// Text box state
#[derive(Debug, Clone, Default, Serialize)]
pub struct InputControl {
    value: String,
    placeholder: String,
    disabled: bool,
    composition: Composition,
    focus_requested: bool,
}

impl InputControl {
    pub fn new(placeholder: impl Into<String>) -> Self {
        Self {
            placeholder: placeholder.into(),
            ..Default::default()
        }
    }

    pub fn value(&self) -> &str {
        &self.value
    }

    pub fn placeholder(&self) -> &str {
        &self.placeholder
    }

    pub fn is_disabled(&self) -> bool {
        self.disabled
    }

    pub fn composition(&self) -> Composition {
        self.composition
    }

    /// Whether focus was requested since the last call
    pub fn take_focus_request(&mut self) -> bool {
        std::mem::take(&mut self.focus_requested)
    }

    /// Whitespace-only values never submit
    pub fn is_empty(&self) -> bool {
        self.value.trim().is_empty()
    }

    pub fn set_placeholder(&mut self, placeholder: impl Into<String>) {
        self.placeholder = placeholder.into();
    }

    /// Typing in the box
    pub fn set_value(&mut self, value: impl Into<String>) {
        self.value = value.into();
    }

    pub fn request_focus(&mut self) {
        self.focus_requested = true;
    }

    pub(crate) fn set_disabled(&mut self, disabled: bool) {
        if self.disabled != disabled {
            debug!(disabled, "input availability changed");
        }
        self.disabled = disabled;
    }

    pub fn composition_start(&mut self) {
        self.composition = Composition::Composing;
    }

    pub fn composition_end(&mut self) {
        self.composition = Composition::Idle;
    }

    /// True when this key press should run the submit path
    pub fn is_submit_key(&self, key: Key, modifiers: ModifierState) -> bool {
        key == Key::Enter && !modifiers.shift && self.composition == Composition::Idle
    }

    /// Take the value for submission, leaving the box empty
    ///
    /// Returns `None` (and leaves the value alone) when the input is
    /// disabled or holds only whitespace.
    pub(crate) fn take_submission(&mut self, focus: bool) -> Option<String> {
        if self.disabled {
            debug!("submit ignored while input is disabled");
            return None;
        }
        if self.is_empty() {
            return None;
        }

        let value = std::mem::take(&mut self.value);
        if focus {
            self.focus_requested = true;
        }
        Some(value)
    }
}
