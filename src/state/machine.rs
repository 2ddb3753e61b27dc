//! Turn lifecycle controller
//!
//! Drives the request/response cycle: a submitted user turn appends the
//! user message and a loading placeholder and disables input; a finished
//! response re-enables it.

use std::time::Instant;

use serde::Serialize;
use tokio::sync::broadcast;
use tracing::{debug, info};

use crate::events::OutboundEvent;
use crate::interaction::{Key, ModifierState};
use crate::transcript::{Message, StoreUpdate, TranscriptError, TranscriptStore};

use super::input::{InputControl, InputUpdate};

/// Whether a turn is in flight
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TurnState {
    /// Input enabled, nothing pending
    #[default]
    Idle,
    /// Input disabled until the response finalizes
    AwaitingResponse,
}

impl std::fmt::Display for TurnState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TurnState::Idle => write!(f, "Idle"),
            TurnState::AwaitingResponse => write!(f, "AwaitingResponse"),
        }
    }
}

/// A visible change to the transcript, reported to the view
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TranscriptChange {
    Updated(usize),
    Removed(usize),
    Cleared,
}

fn changes_of(update: StoreUpdate, changes: &mut Vec<TranscriptChange>) {
    if let Some(index) = update.removed_placeholder {
        changes.push(TranscriptChange::Removed(index));
    }
    changes.push(TranscriptChange::Updated(update.index));
}

/// The turn-taking state machine and the input it gates
pub struct TurnController {
    state: TurnState,
    input: InputControl,
    /// Time the current turn started waiting
    state_entered_at: Option<Instant>,
    /// Channel for emitting outbound events
    event_tx: broadcast::Sender<OutboundEvent>,
}

impl TurnController {
    pub fn new(placeholder: impl Into<String>, event_tx: broadcast::Sender<OutboundEvent>) -> Self {
        Self {
            state: TurnState::Idle,
            input: InputControl::new(placeholder),
            state_entered_at: None,
            event_tx,
        }
    }

    pub fn state(&self) -> TurnState {
        self.state
    }

    pub fn input(&self) -> &InputControl {
        &self.input
    }

    pub fn input_mut(&mut self) -> &mut InputControl {
        &mut self.input
    }

    /// Run the submit path on the current input value
    pub fn submit(&mut self, store: &mut TranscriptStore, focus: bool) -> Vec<TranscriptChange> {
        let Some(value) = self.input.take_submission(focus) else {
            return Vec::new();
        };

        self.emit(OutboundEvent::InputSubmitted {
            value: value.clone(),
        });
        self.input_sent(store, value)
    }

    /// Set the input value and optionally submit it
    pub fn set_value(
        &mut self,
        store: &mut TranscriptStore,
        value: impl Into<String>,
        submit: bool,
        focus: bool,
    ) -> Vec<TranscriptChange> {
        self.input.set_value(value);

        let changes = if submit {
            self.submit(store, focus)
        } else {
            Vec::new()
        };
        if focus {
            self.input.request_focus();
        }
        changes
    }

    /// A key pressed inside the input box
    pub fn key_pressed(
        &mut self,
        store: &mut TranscriptStore,
        key: Key,
        modifiers: ModifierState,
    ) -> Vec<TranscriptChange> {
        if self.input.is_submit_key(key, modifiers) {
            self.submit(store, true)
        } else {
            Vec::new()
        }
    }

    /// Record a sent user turn and wait for the response
    pub fn input_sent(&mut self, store: &mut TranscriptStore, content: String) -> Vec<TranscriptChange> {
        if content.trim().is_empty() {
            debug!("ignoring empty user turn");
            return Vec::new();
        }

        let mut changes = Vec::new();
        changes_of(store.append(Message::user(content), false), &mut changes);
        changes_of(store.add_placeholder(), &mut changes);

        self.input.set_disabled(true);
        self.transition_to(TurnState::AwaitingResponse);
        changes
    }

    /// An atomic message arrived
    pub fn append_message(&mut self, store: &mut TranscriptStore, message: Message) -> Vec<TranscriptChange> {
        let update = store.append(message, true);
        let mut changes = Vec::new();
        changes_of(update, &mut changes);
        if update.finalize {
            self.finalize();
        }
        changes
    }

    /// A chunk of a streamed message arrived
    pub fn append_chunk(
        &mut self,
        store: &mut TranscriptStore,
        message: Message,
    ) -> Result<Vec<TranscriptChange>, TranscriptError> {
        let update = store.append_chunk(message)?;
        let mut changes = Vec::new();
        changes_of(update, &mut changes);
        if update.finalize {
            self.finalize();
        }
        Ok(changes)
    }

    /// The backend decided not to respond
    pub fn remove_loading(&mut self, store: &mut TranscriptStore) -> Vec<TranscriptChange> {
        let changes = store
            .remove_placeholder()
            .map(TranscriptChange::Removed)
            .into_iter()
            .collect();
        self.finalize();
        changes
    }

    /// Empty the transcript; input availability is left as it is
    pub fn clear(&mut self, store: &mut TranscriptStore) -> Vec<TranscriptChange> {
        store.clear();
        vec![TranscriptChange::Cleared]
    }

    /// Apply an `update-user-input` signal
    ///
    /// A `submit` while a turn is pending only sets the value.
    pub fn update_user_input(
        &mut self,
        store: &mut TranscriptStore,
        update: InputUpdate,
    ) -> Vec<TranscriptChange> {
        let mut changes = Vec::new();

        if let Some(value) = update.value {
            if update.submit && self.input.is_disabled() {
                debug!("update-user-input submit ignored while a turn is pending");
            }
            changes = self.set_value(store, value, update.submit, update.focus);
        } else if update.focus {
            self.input.request_focus();
        }

        if let Some(placeholder) = update.placeholder {
            self.input.set_placeholder(placeholder);
        }
        changes
    }

    /// Turn complete: re-enable input
    fn finalize(&mut self) {
        self.input.set_disabled(false);
        self.transition_to(TurnState::Idle);
    }

    /// Perform a state transition
    fn transition_to(&mut self, new_state: TurnState) {
        let old_state = self.state;
        if old_state == new_state {
            return;
        }

        let duration_ms = self
            .state_entered_at
            .map(|t| t.elapsed().as_millis() as u64)
            .unwrap_or(0);

        info!(
            from = %old_state,
            to = %new_state,
            duration_ms = duration_ms,
            "turn transition"
        );

        self.state = new_state;
        self.state_entered_at = match new_state {
            TurnState::AwaitingResponse => Some(Instant::now()),
            TurnState::Idle => None,
        };
    }

    fn emit(&self, event: OutboundEvent) {
        debug!(%event, "emitting outbound event");
        let _ = self.event_tx.send(event);
    }
}
