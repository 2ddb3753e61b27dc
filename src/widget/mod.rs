//! The chat widget container
//!
//! Owns the transcript and composes the turn lifecycle, voice capture and
//! interaction routing around it. Every entry point runs one event to
//! completion; nothing here blocks.

mod host;
mod signal;

use std::time::Instant;

use serde::Serialize;
use tokio::sync::broadcast;
use tracing::{debug, error, info, warn};
use url::Url;

use crate::capture::{
    format_elapsed, CaptureController, CaptureError, CaptureEvent, CaptureMode, CaptureOutcome,
    SessionState,
};
use crate::config::WidgetConfig;
use crate::events::{Feedback, OutboundEvent};
use crate::interaction::{InteractionRouter, LinkGuard, RouterEffect, Target, Trigger};
use crate::state::{InputControl, TranscriptChange, TurnController, TurnState};
use crate::transcript::{Message, Role, TranscriptError, TranscriptStore};
use crate::view::{MessageView, RenderEvent};

pub use host::{HostServices, WidgetPlatform};
pub use signal::{CaptureCommand, InputEvent, Signal};

/// Errors surfaced by widget entry points
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum WidgetError {
    #[error("widget {0} is detached")]
    Detached(String),

    #[error("no widget with id {0}")]
    UnknownWidget(String),

    #[error(transparent)]
    Transcript(#[from] TranscriptError),

    #[error(transparent)]
    Capture(#[from] CaptureError),
}

impl WidgetError {
    /// Stable error code for the wire
    pub fn code(&self) -> &'static str {
        match self {
            WidgetError::Detached(_) => "detached",
            WidgetError::UnknownWidget(_) => "unknown_widget",
            WidgetError::Transcript(_) => "protocol_violation",
            WidgetError::Capture(_) => "capture_failed",
        }
    }
}

/// Serializable view of a widget's state
#[derive(Debug, Clone, Serialize)]
pub struct WidgetSnapshot {
    pub id: String,
    pub attached: bool,
    pub turn_state: TurnState,
    pub input: InputControl,
    pub messages: Vec<Message>,
    pub feedback: Vec<(usize, Feedback)>,
    pub capture: CaptureSnapshot,
}

#[derive(Debug, Clone, Serialize)]
pub struct CaptureSnapshot {
    pub mode: Option<CaptureMode>,
    pub state: SessionState,
    pub display_text: Option<String>,
    pub elapsed: Option<String>,
}

pub struct Widget {
    id: String,
    config: WidgetConfig,
    store: TranscriptStore,
    turns: TurnController,
    capture: CaptureController,
    router: InteractionRouter,
    view: Box<dyn MessageView>,
    host: Box<dyn HostServices>,
    attached: bool,
    event_tx: broadcast::Sender<OutboundEvent>,
}

impl Widget {
    /// Create and attach a widget
    pub fn new(
        id: impl Into<String>,
        config: WidgetConfig,
        platform: WidgetPlatform,
        event_tx: broadcast::Sender<OutboundEvent>,
    ) -> Self {
        let id = id.into();
        info!(widget = %id, audio_input = ?config.audio_input, "widget attached");

        Self {
            store: TranscriptStore::new(config.icon_assistant.clone()),
            turns: TurnController::new(config.placeholder.clone(), event_tx.clone()),
            capture: CaptureController::new(config.audio_input, platform.speech, platform.audio),
            router: InteractionRouter::new(LinkGuard::new(config.page_origin.as_deref())),
            view: platform.view,
            host: platform.host,
            attached: true,
            id,
            config,
            event_tx,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn config(&self) -> &WidgetConfig {
        &self.config
    }

    pub fn is_attached(&self) -> bool {
        self.attached
    }

    pub fn transcript(&self) -> &TranscriptStore {
        &self.store
    }

    pub fn input(&self) -> &InputControl {
        self.turns.input()
    }

    pub fn turn_state(&self) -> TurnState {
        self.turns.state()
    }

    pub fn capture(&self) -> &CaptureController {
        &self.capture
    }

    pub fn router(&self) -> &InteractionRouter {
        &self.router
    }

    /// Re-attach after a detach
    pub fn attach(&mut self) {
        if !self.attached {
            info!(widget = %self.id, "widget re-attached");
        }
        self.attached = true;
        self.capture.attach();
    }

    /// Teardown: cancel any capture session and stop reacting to events
    pub fn detach(&mut self) {
        if self.attached {
            info!(widget = %self.id, "widget detached");
        }
        self.capture.detach();
        self.attached = false;
    }

    fn ensure_attached(&self) -> Result<(), WidgetError> {
        if self.attached {
            Ok(())
        } else {
            Err(WidgetError::Detached(self.id.clone()))
        }
    }

    /// Apply a signal from the transport
    pub fn handle_signal(&mut self, signal: Signal) -> Result<(), WidgetError> {
        self.ensure_attached()?;
        debug!(widget = %self.id, signal = signal.name(), "inbound signal");

        let changes = match signal {
            Signal::InputSent { content, role } => {
                if role.is_some_and(|r| r != Role::User) {
                    warn!(widget = %self.id, "input-sent with a non-user role, recording as user");
                }
                self.turns.input_sent(&mut self.store, content)
            }
            Signal::AppendMessage(payload) => {
                let message = Message::from_payload(payload, &self.config.message_actions);
                self.turns.append_message(&mut self.store, message)
            }
            Signal::AppendMessageChunk(payload) => {
                let message = Message::from_payload(payload, &self.config.message_actions);
                self.turns
                    .append_chunk(&mut self.store, message)
                    .map_err(|e| {
                        error!(widget = %self.id, error = %e, "protocol violation");
                        e
                    })?
            }
            Signal::ClearMessages => self.turns.clear(&mut self.store),
            Signal::UpdateUserInput(update) => self.turns.update_user_input(&mut self.store, update),
            Signal::RemoveLoadingMessage => self.turns.remove_loading(&mut self.store),
        };

        self.apply_changes(changes);
        Ok(())
    }

    /// Apply user activity in the input box
    pub fn handle_input(&mut self, event: InputEvent) -> Result<(), WidgetError> {
        self.ensure_attached()?;

        let changes = match event {
            InputEvent::Changed { value } => {
                self.turns.input_mut().set_value(value);
                Vec::new()
            }
            InputEvent::Key { key, modifiers } => {
                self.turns.key_pressed(&mut self.store, key, modifiers)
            }
            InputEvent::CompositionStart => {
                self.turns.input_mut().composition_start();
                Vec::new()
            }
            InputEvent::CompositionEnd => {
                self.turns.input_mut().composition_end();
                Vec::new()
            }
            InputEvent::Submit => self.turns.submit(&mut self.store, true),
        };

        self.apply_changes(changes);
        Ok(())
    }

    /// Route a click or key press on transcript content
    pub fn interact(&mut self, target: Target, trigger: Trigger) -> Result<(), WidgetError> {
        self.ensure_attached()?;

        let effects = self
            .router
            .activate(target, trigger, &self.store, self.view.as_ref());

        for effect in effects {
            match effect {
                RouterEffect::SetInput { text, options } => {
                    let changes =
                        self.turns
                            .set_value(&mut self.store, text, options.submit, options.focus);
                    self.apply_changes(changes);
                }
                RouterEffect::Emit(event) => self.emit(event),
                RouterEffect::WriteClipboard {
                    message_index,
                    text,
                } => self.host.write_clipboard(message_index, &text),
                RouterEffect::OpenMenu { message_index } => self.host.open_menu(message_index),
                RouterEffect::OpenLink(url) => self.host.open_link(&url),
                RouterEffect::ConfirmLink(url) => self.host.confirm_link(&url),
            }
        }
        Ok(())
    }

    /// The microphone controls
    pub fn handle_capture_command(
        &mut self,
        command: CaptureCommand,
        now: Instant,
    ) -> Result<(), WidgetError> {
        self.ensure_attached()?;

        let outcome = match command {
            CaptureCommand::Toggle => self.capture.toggle(now).map_err(|e| {
                warn!(widget = %self.id, error = %e, "could not start voice input");
                e
            })?,
            CaptureCommand::Stop => self.capture.stop(now),
            CaptureCommand::Cancel => {
                self.capture.cancel();
                None
            }
        };

        self.deliver(outcome);
        Ok(())
    }

    /// A capture platform callback
    ///
    /// Accepted while detached so a late microphone grant can be released.
    pub fn handle_capture_event(&mut self, event: CaptureEvent, now: Instant) {
        let outcome = self.capture.handle_event(event, now);
        if self.attached {
            self.deliver(outcome);
        } else if outcome.is_some() {
            warn!(widget = %self.id, "dropping capture result for a detached widget");
        }
    }

    /// Drive the recording clock
    pub fn tick(&mut self, now: Instant) {
        if self.capture.elapsed_seconds().is_some() {
            self.handle_capture_event(CaptureEvent::Tick, now);
        }
    }

    /// The page finished a clipboard write
    pub fn clipboard_result(&mut self, message_index: usize, result: Result<(), String>, now: Instant) {
        if !self.attached {
            return;
        }
        self.router.clipboard_written(message_index, result, now);
    }

    /// The page's link confirmation dialog answered
    pub fn link_confirmed(&mut self, url: Url, answer: Result<bool, String>) {
        if !self.attached {
            return;
        }
        if let Some(url) = self.router.links().resolve_confirmation(url, answer) {
            self.host.open_link(&url);
        }
    }

    /// Renderer callbacks never touch the transcript
    pub fn render_event(&mut self, event: RenderEvent) {
        event.log();
        if let RenderEvent::ContentChanged {
            index,
            text: Some(text),
        } = event
        {
            self.view.text_rendered(index, text);
        }
    }

    pub fn snapshot(&self) -> WidgetSnapshot {
        let feedback = (0..self.store.len())
            .filter_map(|i| self.router.feedback(i).map(|f| (i, f)))
            .collect();

        WidgetSnapshot {
            id: self.id.clone(),
            attached: self.attached,
            turn_state: self.turns.state(),
            input: self.turns.input().clone(),
            messages: self.store.messages().to_vec(),
            feedback,
            capture: CaptureSnapshot {
                mode: self.capture.active_mode(),
                state: self.capture.state(),
                display_text: self.capture.display_text(),
                elapsed: self.capture.elapsed_seconds().map(format_elapsed),
            },
        }
    }

    /// Route a finished capture session to the submission path
    fn deliver(&mut self, outcome: Option<CaptureOutcome>) {
        match outcome {
            Some(CaptureOutcome::Submit(text)) => {
                if self.turns.input().is_disabled() {
                    warn!(widget = %self.id, "dictation kept in the input while a turn is pending");
                }
                let changes = self.turns.set_value(&mut self.store, text, true, true);
                self.apply_changes(changes);
            }
            Some(CaptureOutcome::Audio(audio)) => self.emit(OutboundEvent::AudioInput(audio)),
            None => {}
        }
    }

    fn apply_changes(&mut self, changes: Vec<TranscriptChange>) {
        for change in changes {
            match change {
                TranscriptChange::Updated(index) => {
                    if let Some(message) = self.store.get(index) {
                        self.view.message_updated(index, message);
                    }
                }
                TranscriptChange::Removed(index) => self.view.message_removed(index),
                TranscriptChange::Cleared => {
                    self.router.reset();
                    self.view.cleared();
                }
            }
        }

        if self.turns.input_mut().take_focus_request() {
            self.host.focus_input();
        }
    }

    fn emit(&self, event: OutboundEvent) {
        debug!(widget = %self.id, %event, "emitting outbound event");
        let _ = self.event_tx.send(event);
    }
}

#[cfg(test)]
mod tests;
