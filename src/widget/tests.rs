use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use tokio::sync::broadcast;
use url::Url;

use super::*;
use crate::capture::fakes::{DeviceLog, FakeDevice, FakeSpeech, SpeechLog};
use crate::capture::{AudioInputMode, RecognitionSegment};
use crate::interaction::{Key, MessageAction, ModifierState};
use crate::transcript::{ChunkType, MessagePayload, Operation};

#[derive(Debug, Default)]
struct ShellLog {
    updated: Vec<usize>,
    removed: Vec<usize>,
    cleared: usize,
    clipboard: Vec<(usize, String)>,
    confirm: Vec<String>,
    opened: Vec<String>,
    focus: usize,
}

struct FakeShell(Arc<Mutex<ShellLog>>);

impl MessageView for FakeShell {
    fn message_updated(&mut self, index: usize, _message: &Message) {
        self.0.lock().unwrap().updated.push(index);
    }

    fn message_removed(&mut self, index: usize) {
        self.0.lock().unwrap().removed.push(index);
    }

    fn cleared(&mut self) {
        self.0.lock().unwrap().cleared += 1;
    }

    fn rendered_text(&self, _index: usize) -> Option<String> {
        None
    }
}

impl HostServices for FakeShell {
    fn write_clipboard(&mut self, message_index: usize, text: &str) {
        self.0.lock().unwrap().clipboard.push((message_index, text.to_string()));
    }

    fn confirm_link(&mut self, url: &Url) {
        self.0.lock().unwrap().confirm.push(url.to_string());
    }

    fn open_link(&mut self, url: &Url) {
        self.0.lock().unwrap().opened.push(url.to_string());
    }

    fn open_menu(&mut self, _message_index: usize) {}

    fn focus_input(&mut self) {
        self.0.lock().unwrap().focus += 1;
    }
}

struct Fixture {
    widget: Widget,
    events: broadcast::Receiver<OutboundEvent>,
    shell: Arc<Mutex<ShellLog>>,
    speech: Arc<Mutex<SpeechLog>>,
    device: Arc<Mutex<DeviceLog>>,
}

impl Fixture {
    fn new(config: WidgetConfig) -> Self {
        let (tx, events) = broadcast::channel(16);
        let (speech, speech_log) = FakeSpeech::new(true);
        let (device, device_log) = FakeDevice::new(true);
        let shell = Arc::new(Mutex::new(ShellLog::default()));

        let platform = WidgetPlatform {
            speech: Box::new(speech),
            audio: Box::new(device),
            view: Box::new(FakeShell(Arc::clone(&shell))),
            host: Box::new(FakeShell(Arc::clone(&shell))),
        };

        Self {
            widget: Widget::new("chat", config, platform, tx),
            events,
            shell,
            speech: speech_log,
            device: device_log,
        }
    }

    fn with_audio(mode: AudioInputMode) -> Self {
        Self::new(WidgetConfig {
            audio_input: mode,
            ..Default::default()
        })
    }

    fn drain(&mut self) -> Vec<OutboundEvent> {
        let mut out = Vec::new();
        while let Ok(event) = self.events.try_recv() {
            out.push(event);
        }
        out
    }

    fn signal(&mut self, signal: Signal) {
        self.widget.handle_signal(signal).unwrap();
    }

    fn type_and_submit(&mut self, text: &str) {
        self.widget
            .handle_input(InputEvent::Changed { value: text.into() })
            .unwrap();
        self.widget.handle_input(InputEvent::Submit).unwrap();
    }
}

fn chunk(chunk_type: Option<ChunkType>, content: &str) -> Signal {
    Signal::AppendMessageChunk(MessagePayload {
        content: content.into(),
        chunk_type,
        operation: Some(Operation::Append),
        ..Default::default()
    })
}

fn click() -> Trigger {
    Trigger::Click {
        modifiers: ModifierState::default(),
    }
}

#[test]
fn test_typed_turn_round_trip() {
    let mut f = Fixture::new(WidgetConfig::default());

    f.type_and_submit("hi there");
    assert_eq!(f.widget.turn_state(), TurnState::AwaitingResponse);
    assert!(f.widget.input().is_disabled());
    assert_eq!(
        f.drain(),
        vec![OutboundEvent::InputSubmitted {
            value: "hi there".into()
        }]
    );

    f.signal(Signal::AppendMessage(MessagePayload::assistant("hello")));

    let messages = f.widget.transcript().messages();
    assert_eq!(messages.len(), 2);
    assert_eq!(messages[1].content, "hello");
    assert!(!f.widget.input().is_disabled());
    assert_eq!(f.shell.lock().unwrap().removed, vec![1]);
    assert_eq!(f.shell.lock().unwrap().focus, 1);
}

#[test]
fn test_streamed_response_assembles_one_message() {
    let mut f = Fixture::new(WidgetConfig::default());
    f.type_and_submit("stream please");

    f.signal(chunk(Some(ChunkType::MessageStart), ""));
    f.signal(chunk(None, "Hel"));
    assert!(f.widget.input().is_disabled());
    f.signal(chunk(None, "lo"));
    f.signal(chunk(Some(ChunkType::MessageEnd), ""));

    let messages = f.widget.transcript().messages();
    assert_eq!(messages.len(), 2);
    assert_eq!(messages[1].content, "Hello");
    assert!(!messages[1].streaming);
    assert!(!f.widget.input().is_disabled());
    assert_eq!(messages.iter().filter(|m| m.is_placeholder()).count(), 0);
}

#[test]
fn test_orphan_chunk_is_reported() {
    let mut f = Fixture::new(WidgetConfig::default());
    let err = f.widget.handle_signal(chunk(None, "x")).unwrap_err();
    assert_eq!(err, WidgetError::Transcript(TranscriptError::NoActiveMessage));
    assert!(f.widget.transcript().is_empty());
}

#[test]
fn test_update_user_input_submit_equals_typing() {
    let mut f = Fixture::new(WidgetConfig::default());

    f.signal(Signal::UpdateUserInput(crate::state::InputUpdate {
        value: Some("x".into()),
        submit: true,
        ..Default::default()
    }));

    let messages = f.widget.transcript().messages();
    assert_eq!(messages.len(), 2);
    assert_eq!(messages[0].role, Role::User);
    assert_eq!(messages[0].content, "x");
    assert!(messages[1].is_placeholder());
    assert_eq!(f.drain(), vec![OutboundEvent::InputSubmitted { value: "x".into() }]);
}

#[test]
fn test_remove_loading_and_clear() {
    let mut f = Fixture::new(WidgetConfig::default());
    f.signal(Signal::InputSent {
        content: "q".into(),
        role: Some(Role::User),
    });
    assert!(f.widget.input().is_disabled());
    assert!(f.drain().is_empty());

    f.signal(Signal::RemoveLoadingMessage);
    assert_eq!(f.widget.transcript().len(), 1);
    assert!(!f.widget.input().is_disabled());

    f.signal(Signal::ClearMessages);
    assert!(f.widget.transcript().is_empty());
    assert_eq!(f.shell.lock().unwrap().cleared, 1);
}

#[test]
fn test_transcribe_stop_submits_text_turn() {
    let mut f = Fixture::with_audio(AudioInputMode::Transcribe);
    let now = Instant::now();

    f.widget
        .handle_capture_command(CaptureCommand::Toggle, now)
        .unwrap();
    f.widget.handle_capture_event(
        CaptureEvent::RecognitionResult {
            result_index: 0,
            results: vec![
                RecognitionSegment::final_text("hello "),
                RecognitionSegment::interim("world"),
            ],
        },
        now,
    );
    f.widget
        .handle_capture_command(CaptureCommand::Toggle, now)
        .unwrap();

    let events = f.drain();
    assert_eq!(
        events,
        vec![OutboundEvent::InputSubmitted {
            value: "hello world".into()
        }]
    );
    assert_eq!(f.widget.transcript().messages()[0].content, "hello world");
    assert!(f.shell.lock().unwrap().focus >= 1);
}

#[test]
fn test_raw_cancel_after_three_seconds_sends_nothing() {
    let mut f = Fixture::with_audio(AudioInputMode::Raw);
    let start = Instant::now();

    f.widget
        .handle_capture_command(CaptureCommand::Toggle, start)
        .unwrap();
    f.widget
        .handle_capture_event(CaptureEvent::MicrophoneGranted, start);
    f.widget
        .handle_capture_event(CaptureEvent::AudioData(vec![7; 32]), start);
    f.widget.tick(start + Duration::from_secs(3));
    assert_eq!(f.widget.snapshot().capture.elapsed.as_deref(), Some("0:03"));

    f.widget
        .handle_capture_command(CaptureCommand::Cancel, start + Duration::from_secs(3))
        .unwrap();
    f.widget
        .handle_capture_event(CaptureEvent::RecorderStopped, start + Duration::from_secs(3));

    assert!(f.drain().is_empty());
    assert_eq!(f.device.lock().unwrap().releases, 1);
    assert!(!f.widget.capture().is_capturing());
}

#[test]
fn test_raw_stop_emits_audio_input_only() {
    let mut f = Fixture::with_audio(AudioInputMode::Raw);
    let start = Instant::now();

    f.widget
        .handle_capture_command(CaptureCommand::Toggle, start)
        .unwrap();
    f.widget
        .handle_capture_event(CaptureEvent::MicrophoneGranted, start);
    f.widget
        .handle_capture_event(CaptureEvent::AudioData(vec![1, 2, 3, 4]), start);
    f.widget
        .handle_capture_command(CaptureCommand::Toggle, start + Duration::from_secs(5))
        .unwrap();
    f.widget
        .handle_capture_event(CaptureEvent::RecorderStopped, start + Duration::from_secs(5));

    let events = f.drain();
    assert_eq!(events.len(), 1);
    match &events[0] {
        OutboundEvent::AudioInput(audio) => {
            assert_eq!(audio.size_bytes, 4);
            assert_eq!(audio.duration_seconds, 5);
        }
        other => panic!("unexpected {other}"),
    }
    assert!(f.widget.transcript().is_empty());
}

#[test]
fn test_detach_cancels_capture_without_submission() {
    let mut f = Fixture::with_audio(AudioInputMode::Transcribe);
    let now = Instant::now();
    f.widget
        .handle_capture_command(CaptureCommand::Toggle, now)
        .unwrap();
    f.widget.handle_capture_event(
        CaptureEvent::RecognitionResult {
            result_index: 0,
            results: vec![RecognitionSegment::final_text("unsent words")],
        },
        now,
    );

    f.widget.detach();
    f.widget.handle_capture_event(CaptureEvent::RecognitionEnd, now);

    assert!(f.drain().is_empty());
    assert!(f.widget.transcript().is_empty());
    assert_eq!(f.speech.lock().unwrap().aborts, 1);
    assert_eq!(f.speech.lock().unwrap().starts, 1);
    assert!(matches!(
        f.widget.handle_signal(Signal::ClearMessages),
        Err(WidgetError::Detached(_))
    ));

    f.widget.attach();
    assert!(f
        .widget
        .handle_capture_command(CaptureCommand::Toggle, now)
        .is_ok());
}

#[test]
fn test_suggestion_with_primary_modifier_submits() {
    let mut f = Fixture::new(WidgetConfig::default());
    let target = Target::Suggestion {
        value: Some("Show an example".into()),
        text: String::new(),
        submit: false,
    };
    let trigger = Trigger::Click {
        modifiers: ModifierState {
            command: true,
            ..Default::default()
        },
    };

    f.widget.interact(target, trigger).unwrap();

    assert_eq!(f.widget.transcript().len(), 2);
    assert_eq!(
        f.drain(),
        vec![OutboundEvent::InputSubmitted {
            value: "Show an example".into()
        }]
    );
}

#[test]
fn test_suggestion_fill_sets_value_and_focuses() {
    let mut f = Fixture::new(WidgetConfig::default());
    let target = Target::Suggestion {
        value: None,
        text: "Fill me".into(),
        submit: false,
    };
    f.widget
        .interact(
            target,
            Trigger::Key {
                key: Key::Space,
                modifiers: ModifierState::default(),
            },
        )
        .unwrap();

    assert_eq!(f.widget.input().value(), "Fill me");
    assert!(f.widget.transcript().is_empty());
    assert_eq!(f.shell.lock().unwrap().focus, 1);
}

#[test]
fn test_feedback_and_copy_actions() {
    let mut f = Fixture::new(WidgetConfig {
        message_actions: crate::transcript::ActionSpec::All,
        ..Default::default()
    });
    f.signal(Signal::AppendMessage(MessagePayload::assistant("answer")));

    let thumbs_up = Target::Action {
        message_index: 0,
        action: MessageAction::ThumbsUp,
    };
    f.widget.interact(thumbs_up.clone(), click()).unwrap();
    f.widget.interact(thumbs_up, click()).unwrap();
    f.widget
        .interact(
            Target::Action {
                message_index: 0,
                action: MessageAction::ThumbsDown,
            },
            click(),
        )
        .unwrap();

    let feedback: Vec<_> = f
        .drain()
        .into_iter()
        .map(|event| match event {
            OutboundEvent::MessageFeedback(record) => record.feedback,
            other => panic!("unexpected {other}"),
        })
        .collect();
    assert_eq!(feedback, vec![Some(Feedback::Positive), Some(Feedback::Negative)]);
    assert_eq!(f.widget.snapshot().feedback, vec![(0, Feedback::Negative)]);

    f.widget
        .interact(
            Target::Action {
                message_index: 0,
                action: MessageAction::Copy,
            },
            click(),
        )
        .unwrap();
    assert_eq!(f.shell.lock().unwrap().clipboard, vec![(0, "answer".to_string())]);
    assert!(matches!(&f.drain()[..], [OutboundEvent::MessageCopy(_)]));

    let now = Instant::now();
    f.widget.clipboard_result(0, Ok(()), now);
    assert!(f.widget.router().is_copied(0, now));
    assert_eq!(f.widget.transcript().messages()[0].content, "answer");

    f.signal(Signal::ClearMessages);
    assert_eq!(f.widget.router().feedback(0), None);
}

#[test]
fn test_external_link_opens_when_dialog_fails() {
    let mut f = Fixture::new(WidgetConfig {
        page_origin: Some("https://app.example.com".into()),
        ..Default::default()
    });
    f.widget
        .interact(
            Target::Link {
                href: "https://elsewhere.org/".into(),
            },
            click(),
        )
        .unwrap();
    assert_eq!(f.shell.lock().unwrap().confirm, vec!["https://elsewhere.org/"]);
    assert!(f.shell.lock().unwrap().opened.is_empty());

    let url = Url::parse("https://elsewhere.org/").unwrap();
    f.widget.link_confirmed(url, Err("dialog crashed".into()));
    assert_eq!(f.shell.lock().unwrap().opened, vec!["https://elsewhere.org/"]);
}

#[test]
fn test_default_icon_applied_from_config() {
    let mut f = Fixture::new(WidgetConfig {
        icon_assistant: Some("robot".into()),
        ..Default::default()
    });
    f.signal(Signal::AppendMessage(MessagePayload::assistant("hi")));
    assert_eq!(
        f.widget.transcript().messages()[0].icon.as_deref(),
        Some("robot")
    );
}

#[test]
fn test_snapshot_serializes() {
    let mut f = Fixture::new(WidgetConfig::default());
    f.type_and_submit("q");
    let json = serde_json::to_string(&f.widget.snapshot()).unwrap();
    assert!(json.contains(r#""turn_state":"awaiting_response""#));
    assert!(json.contains(r#""content_type":"semi-markdown""#));
}
