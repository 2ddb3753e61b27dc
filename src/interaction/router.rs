//! Interaction router
//!
//! Turns activations on transcript content into input updates, outbound
//! action records, clipboard writes or link navigation. Copy and feedback
//! keep per-message UI state here; none of it touches the transcript.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use url::Url;

use crate::events::{ActionRecord, Feedback, OutboundEvent};
use crate::state::SetValueOptions;
use crate::transcript::{ActionKind, TranscriptStore};
use crate::view::MessageView;

use super::keys::Trigger;
use super::links::{LinkDecision, LinkGuard};

/// How long the "copied" acknowledgment stays visible
pub const COPY_ACK_DURATION: Duration = Duration::from_secs(2);

/// Actions offered on a message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageAction {
    Copy,
    ThumbsUp,
    ThumbsDown,
    Regenerate,
    Share,
    /// Open the secondary menu
    More,
    /// Menu item: copy the content as authored
    CopySource,
    /// Menu item: copy the rendered plain text
    CopyText,
}

impl MessageAction {
    fn required(self) -> ActionKind {
        match self {
            MessageAction::Copy => ActionKind::Copy,
            MessageAction::ThumbsUp | MessageAction::ThumbsDown => ActionKind::Feedback,
            MessageAction::Regenerate => ActionKind::Regenerate,
            MessageAction::Share => ActionKind::Share,
            MessageAction::More | MessageAction::CopySource | MessageAction::CopyText => {
                ActionKind::More
            }
        }
    }
}

/// The element an activation landed on
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Target {
    Suggestion {
        /// Explicit suggestion value, preferred over the element text
        #[serde(default)]
        value: Option<String>,
        #[serde(default)]
        text: String,
        /// The element asks to submit by default
        #[serde(default)]
        submit: bool,
    },
    Action {
        message_index: usize,
        action: MessageAction,
    },
    Link {
        href: String,
    },
}

/// Work the container carries out for an activation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RouterEffect {
    SetInput {
        text: String,
        options: SetValueOptions,
    },
    Emit(OutboundEvent),
    WriteClipboard {
        message_index: usize,
        text: String,
    },
    OpenMenu {
        message_index: usize,
    },
    OpenLink(Url),
    ConfirmLink(Url),
}

#[derive(Debug, Clone, Copy, Default)]
struct ActionUiState {
    feedback: Option<Feedback>,
    copied_at: Option<Instant>,
}

#[derive(Debug, Default)]
pub struct InteractionRouter {
    ui: HashMap<usize, ActionUiState>,
    links: LinkGuard,
}

impl InteractionRouter {
    pub fn new(links: LinkGuard) -> Self {
        Self {
            ui: HashMap::new(),
            links,
        }
    }

    pub fn links(&self) -> &LinkGuard {
        &self.links
    }

    pub fn feedback(&self, message_index: usize) -> Option<Feedback> {
        self.ui.get(&message_index).and_then(|s| s.feedback)
    }

    /// Whether the "copied" acknowledgment is showing
    pub fn is_copied(&self, message_index: usize, now: Instant) -> bool {
        self.ui
            .get(&message_index)
            .and_then(|s| s.copied_at)
            .is_some_and(|at| now.saturating_duration_since(at) < COPY_ACK_DURATION)
    }

    /// Forget per-message state when the transcript is cleared
    pub fn reset(&mut self) {
        self.ui.clear();
    }

    /// A clipboard write finished
    pub fn clipboard_written(&mut self, message_index: usize, result: Result<(), String>, now: Instant) {
        match result {
            Ok(()) => {
                self.ui.entry(message_index).or_default().copied_at = Some(now);
            }
            Err(e) => warn!(index = message_index, error = %e, "clipboard write failed"),
        }
    }

    pub fn activate(
        &mut self,
        target: Target,
        trigger: Trigger,
        store: &TranscriptStore,
        view: &dyn MessageView,
    ) -> Vec<RouterEffect> {
        if !trigger.activates() {
            return Vec::new();
        }

        match target {
            Target::Suggestion {
                value,
                text,
                submit,
            } => suggestion(value, text, submit, trigger).into_iter().collect(),
            Target::Action {
                message_index,
                action,
            } => self.message_action(message_index, action, store, view),
            Target::Link { href } => match self.links.classify(&href) {
                Ok(LinkDecision::Open(url)) => vec![RouterEffect::OpenLink(url)],
                Ok(LinkDecision::Confirm(url)) => vec![RouterEffect::ConfirmLink(url)],
                Err(e) => {
                    warn!(error = %e, "ignoring link");
                    Vec::new()
                }
            },
        }
    }

    fn message_action(
        &mut self,
        message_index: usize,
        action: MessageAction,
        store: &TranscriptStore,
        view: &dyn MessageView,
    ) -> Vec<RouterEffect> {
        let Some(message) = store.get(message_index) else {
            warn!(index = message_index, ?action, "action on a message that does not exist");
            return Vec::new();
        };
        if !message.actions.contains(action.required()) {
            debug!(index = message_index, ?action, "action not enabled for message");
            return Vec::new();
        }

        let record = |feedback| ActionRecord {
            message_index,
            content: message.content.clone(),
            feedback,
        };

        match action {
            MessageAction::Copy => vec![
                RouterEffect::WriteClipboard {
                    message_index,
                    text: message.content.clone(),
                },
                RouterEffect::Emit(OutboundEvent::MessageCopy(record(None))),
            ],
            MessageAction::ThumbsUp | MessageAction::ThumbsDown => {
                let polarity = if action == MessageAction::ThumbsUp {
                    Feedback::Positive
                } else {
                    Feedback::Negative
                };
                let state = self.ui.entry(message_index).or_default();
                if state.feedback == Some(polarity) {
                    state.feedback = None;
                    debug!(index = message_index, %polarity, "feedback cleared");
                    return Vec::new();
                }
                state.feedback = Some(polarity);
                vec![RouterEffect::Emit(OutboundEvent::MessageFeedback(record(Some(polarity))))]
            }
            MessageAction::Regenerate => {
                vec![RouterEffect::Emit(OutboundEvent::MessageRegenerate(record(None)))]
            }
            MessageAction::Share => {
                vec![RouterEffect::Emit(OutboundEvent::MessageShare(record(None)))]
            }
            MessageAction::More => vec![RouterEffect::OpenMenu { message_index }],
            MessageAction::CopySource => vec![RouterEffect::WriteClipboard {
                message_index,
                text: message.content.clone(),
            }],
            MessageAction::CopyText => vec![RouterEffect::WriteClipboard {
                message_index,
                text: view
                    .rendered_text(message_index)
                    .unwrap_or_else(|| message.content.clone()),
            }],
        }
    }
}

/// Resolve a suggestion activation into an input update
///
/// Command/Control forces submit, Option forces fill; otherwise the
/// element's own default applies.
fn suggestion(value: Option<String>, text: String, submit: bool, trigger: Trigger) -> Option<RouterEffect> {
    let text = value
        .filter(|v| !v.is_empty())
        .unwrap_or(text)
        .trim()
        .to_string();
    if text.is_empty() {
        return None;
    }

    let modifiers = trigger.modifiers();
    let submit = if modifiers.is_primary() {
        true
    } else if modifiers.is_secondary() {
        false
    } else {
        submit
    };

    Some(RouterEffect::SetInput {
        text,
        options: SetValueOptions {
            submit,
            focus: !submit,
        },
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interaction::{Key, ModifierState};
    use crate::transcript::{ActionSpec, Message, MessagePayload};
    use crate::view::NullView;

    fn click() -> Trigger {
        Trigger::Click {
            modifiers: ModifierState::default(),
        }
    }

    fn store_with_answer(actions: &str) -> TranscriptStore {
        let mut store = TranscriptStore::default();
        store.append(Message::user("question"), false);
        store.append(
            Message::from_payload(MessagePayload::assistant("answer"), &ActionSpec::parse(actions)),
            true,
        );
        store
    }

    fn act(router: &mut InteractionRouter, store: &TranscriptStore, action: MessageAction) -> Vec<RouterEffect> {
        router.activate(
            Target::Action {
                message_index: 1,
                action,
            },
            click(),
            store,
            &NullView,
        )
    }

    fn suggestion_target(submit: bool) -> Target {
        Target::Suggestion {
            value: None,
            text: " Tell me more ".into(),
            submit,
        }
    }

    #[test]
    fn test_suggestion_default_fill() {
        let mut router = InteractionRouter::default();
        let effects = router.activate(suggestion_target(false), click(), &TranscriptStore::default(), &NullView);
        assert_eq!(
            effects,
            vec![RouterEffect::SetInput {
                text: "Tell me more".into(),
                options: SetValueOptions {
                    submit: false,
                    focus: true
                },
            }]
        );
    }

    #[test]
    fn test_primary_modifier_forces_submit() {
        let mut router = InteractionRouter::default();
        for modifiers in [
            ModifierState {
                command: true,
                ..Default::default()
            },
            ModifierState {
                control: true,
                ..Default::default()
            },
        ] {
            let effects = router.activate(
                suggestion_target(false),
                Trigger::Click { modifiers },
                &TranscriptStore::default(),
                &NullView,
            );
            assert!(matches!(
                &effects[..],
                [RouterEffect::SetInput {
                    options: SetValueOptions {
                        submit: true,
                        focus: false
                    },
                    ..
                }]
            ));
        }
    }

    #[test]
    fn test_secondary_modifier_forces_fill() {
        let mut router = InteractionRouter::default();
        let trigger = Trigger::Key {
            key: Key::Enter,
            modifiers: ModifierState {
                option: true,
                ..Default::default()
            },
        };
        let effects = router.activate(suggestion_target(true), trigger, &TranscriptStore::default(), &NullView);
        assert!(matches!(
            &effects[..],
            [RouterEffect::SetInput {
                options: SetValueOptions { submit: false, .. },
                ..
            }]
        ));
    }

    #[test]
    fn test_suggestion_value_wins_over_text() {
        let mut router = InteractionRouter::default();
        let target = Target::Suggestion {
            value: Some("explicit".into()),
            text: "shown".into(),
            submit: true,
        };
        let effects = router.activate(target, click(), &TranscriptStore::default(), &NullView);
        assert!(matches!(&effects[..], [RouterEffect::SetInput { text, .. }] if text == "explicit"));
    }

    #[test]
    fn test_non_activating_key_is_ignored() {
        let mut router = InteractionRouter::default();
        let trigger = Trigger::Key {
            key: Key::Escape,
            modifiers: ModifierState::default(),
        };
        assert!(router
            .activate(suggestion_target(true), trigger, &TranscriptStore::default(), &NullView)
            .is_empty());
    }

    #[test]
    fn test_feedback_toggle() {
        let mut router = InteractionRouter::default();
        let store = store_with_answer("feedback");

        let first = act(&mut router, &store, MessageAction::ThumbsUp);
        assert_eq!(
            first,
            vec![RouterEffect::Emit(OutboundEvent::MessageFeedback(ActionRecord {
                message_index: 1,
                content: "answer".into(),
                feedback: Some(Feedback::Positive),
            }))]
        );
        assert_eq!(router.feedback(1), Some(Feedback::Positive));

        assert!(act(&mut router, &store, MessageAction::ThumbsUp).is_empty());
        assert_eq!(router.feedback(1), None);

        let down = act(&mut router, &store, MessageAction::ThumbsDown);
        assert_eq!(down.len(), 1);
        assert_eq!(router.feedback(1), Some(Feedback::Negative));
    }

    #[test]
    fn test_copy_writes_clipboard_and_emits() {
        let mut router = InteractionRouter::default();
        let store = store_with_answer("copy");

        let effects = act(&mut router, &store, MessageAction::Copy);
        assert_eq!(effects.len(), 2);
        assert!(matches!(
            &effects[0],
            RouterEffect::WriteClipboard { message_index: 1, text } if text == "answer"
        ));
        assert!(matches!(&effects[1], RouterEffect::Emit(OutboundEvent::MessageCopy(_))));

        let now = Instant::now();
        assert!(!router.is_copied(1, now));
        router.clipboard_written(1, Ok(()), now);
        assert!(router.is_copied(1, now + Duration::from_millis(500)));
        assert!(!router.is_copied(1, now + COPY_ACK_DURATION));
    }

    #[test]
    fn test_disabled_actions_do_nothing() {
        let mut router = InteractionRouter::default();
        let store = store_with_answer("none");
        assert!(act(&mut router, &store, MessageAction::Share).is_empty());
        assert!(act(&mut router, &store, MessageAction::ThumbsUp).is_empty());
        assert_eq!(router.feedback(1), None);
    }

    #[test]
    fn test_regenerate_and_share_emit_records() {
        let mut router = InteractionRouter::default();
        let store = store_with_answer("all");
        assert!(matches!(
            &act(&mut router, &store, MessageAction::Regenerate)[..],
            [RouterEffect::Emit(OutboundEvent::MessageRegenerate(r))] if r.message_index == 1
        ));
        assert!(matches!(
            &act(&mut router, &store, MessageAction::Share)[..],
            [RouterEffect::Emit(OutboundEvent::MessageShare(_))]
        ));
    }

    #[test]
    fn test_more_menu_copies_without_emitting() {
        struct Rendered;
        impl MessageView for Rendered {
            fn message_updated(&mut self, _: usize, _: &Message) {}
            fn message_removed(&mut self, _: usize) {}
            fn cleared(&mut self) {}
            fn rendered_text(&self, _: usize) -> Option<String> {
                Some("plain answer".into())
            }
        }

        let mut router = InteractionRouter::default();
        let store = store_with_answer("more");
        assert_eq!(
            act(&mut router, &store, MessageAction::More),
            vec![RouterEffect::OpenMenu { message_index: 1 }]
        );

        let effects = router.activate(
            Target::Action {
                message_index: 1,
                action: MessageAction::CopyText,
            },
            click(),
            &store,
            &Rendered,
        );
        assert_eq!(
            effects,
            vec![RouterEffect::WriteClipboard {
                message_index: 1,
                text: "plain answer".into()
            }]
        );
    }

    #[test]
    fn test_action_on_missing_message_is_ignored() {
        let mut router = InteractionRouter::default();
        assert!(act(&mut router, &TranscriptStore::default(), MessageAction::Copy).is_empty());
    }

    #[test]
    fn test_external_link_needs_confirmation() {
        let mut router = InteractionRouter::new(LinkGuard::new(Some("https://app.example.com")));
        let effects = router.activate(
            Target::Link {
                href: "https://elsewhere.org/page".into(),
            },
            click(),
            &TranscriptStore::default(),
            &NullView,
        );
        assert!(matches!(&effects[..], [RouterEffect::ConfirmLink(_)]));
    }
}
