//! Platform services backed by a connected front end
//!
//! Each service call becomes a `command` notification for subscribers. The
//! page answers asynchronously with `platform` requests.

use std::collections::HashMap;

use tokio::sync::broadcast;
use tracing::{debug, trace};
use url::Url;

use crate::capture::{AudioDevice, CaptureError, RecognitionConfig, SpeechService};
use crate::transcript::Message;
use crate::view::MessageView;
use crate::widget::{HostServices, WidgetPlatform};

use super::protocol::{HostCapabilities, Notification, PlatformCommand};

/// Sends commands for one widget
#[derive(Debug, Clone)]
struct CommandSink {
    widget: String,
    tx: broadcast::Sender<Notification>,
}

impl CommandSink {
    fn send(&self, command: PlatformCommand) {
        trace!(widget = %self.widget, ?command, "platform command");
        if self
            .tx
            .send(Notification::Command {
                widget: self.widget.clone(),
                command,
            })
            .is_err()
        {
            debug!(widget = %self.widget, "no subscriber for platform command");
        }
    }
}

/// Build the platform services for a widget driven by a front end
pub fn remote_platform(
    widget: &str,
    capabilities: HostCapabilities,
    tx: broadcast::Sender<Notification>,
) -> WidgetPlatform {
    let sink = CommandSink {
        widget: widget.to_string(),
        tx,
    };

    WidgetPlatform {
        speech: Box::new(RemoteSpeech {
            sink: sink.clone(),
            available: capabilities.speech,
        }),
        audio: Box::new(RemoteAudio {
            sink: sink.clone(),
            available: capabilities.audio,
            encodings: capabilities.encodings,
        }),
        view: Box::new(RemoteView::new(sink.clone())),
        host: Box::new(RemoteHost { sink }),
    }
}

struct RemoteSpeech {
    sink: CommandSink,
    available: bool,
}

impl SpeechService for RemoteSpeech {
    fn is_available(&self) -> bool {
        self.available
    }

    fn start(&mut self, config: RecognitionConfig) -> Result<(), CaptureError> {
        self.sink.send(PlatformCommand::StartRecognition {
            continuous: config.continuous,
            interim_results: config.interim_results,
        });
        Ok(())
    }

    fn stop(&mut self) {
        self.sink.send(PlatformCommand::StopRecognition);
    }

    fn abort(&mut self) {
        self.sink.send(PlatformCommand::AbortRecognition);
    }
}

struct RemoteAudio {
    sink: CommandSink,
    available: bool,
    encodings: Vec<String>,
}

impl AudioDevice for RemoteAudio {
    fn is_available(&self) -> bool {
        self.available
    }

    fn is_encoding_supported(&self, encoding: &str) -> bool {
        self.encodings.iter().any(|e| e == encoding)
    }

    fn request_microphone(&mut self) {
        self.sink.send(PlatformCommand::RequestMicrophone);
    }

    fn start_recording(&mut self, encoding: &str) -> Result<(), CaptureError> {
        self.sink.send(PlatformCommand::StartRecording {
            encoding: encoding.to_string(),
        });
        Ok(())
    }

    fn stop_recording(&mut self) {
        self.sink.send(PlatformCommand::StopRecording);
    }

    fn release_tracks(&mut self) {
        self.sink.send(PlatformCommand::ReleaseMicrophone);
    }
}

/// Forwards transcript changes and caches the text the page rendered
///
/// A message that only grew at the end goes out as an `append_content`
/// delta against the copy last sent.
struct RemoteView {
    sink: CommandSink,
    sent: HashMap<usize, Message>,
    rendered: HashMap<usize, String>,
}

impl RemoteView {
    fn new(sink: CommandSink) -> Self {
        Self {
            sink,
            sent: HashMap::new(),
            rendered: HashMap::new(),
        }
    }
}

/// The text `next` adds to `prev`, if nothing else changed
fn appended<'a>(prev: &Message, next: &'a Message) -> Option<&'a str> {
    let same_shape = prev.role == next.role
        && prev.content_type == next.content_type
        && prev.chunk_type == next.chunk_type
        && prev.operation == next.operation
        && prev.streaming == next.streaming
        && prev.icon == next.icon
        && prev.actions == next.actions
        && prev.placeholder == next.placeholder;
    if !same_shape {
        return None;
    }
    next.content.strip_prefix(prev.content.as_str())
}

impl MessageView for RemoteView {
    fn message_updated(&mut self, index: usize, message: &Message) {
        self.rendered.remove(&index);

        if let Some(prev) = self.sent.get_mut(&index) {
            if let Some(text) = appended(prev, message) {
                if text.is_empty() {
                    return;
                }
                prev.content.push_str(text);
                self.sink.send(PlatformCommand::AppendContent {
                    index,
                    text: text.to_string(),
                });
                return;
            }
        }

        self.sent.insert(index, message.clone());
        self.sink.send(PlatformCommand::RenderMessage {
            index,
            message: message.clone(),
        });
    }

    fn message_removed(&mut self, index: usize) {
        // Later entries shift down on the page
        self.sent.retain(|&i, _| i < index);
        self.rendered.retain(|&i, _| i < index);
        self.sink.send(PlatformCommand::RemoveMessage { index });
    }

    fn cleared(&mut self) {
        self.sent.clear();
        self.rendered.clear();
        self.sink.send(PlatformCommand::ClearMessages);
    }

    fn rendered_text(&self, index: usize) -> Option<String> {
        self.rendered.get(&index).cloned()
    }

    fn text_rendered(&mut self, index: usize, text: String) {
        self.rendered.insert(index, text);
    }
}

struct RemoteHost {
    sink: CommandSink,
}

impl HostServices for RemoteHost {
    fn write_clipboard(&mut self, message_index: usize, text: &str) {
        self.sink.send(PlatformCommand::WriteClipboard {
            message_index,
            text: text.to_string(),
        });
    }

    fn confirm_link(&mut self, url: &Url) {
        self.sink.send(PlatformCommand::ConfirmLink {
            url: url.to_string(),
        });
    }

    fn open_link(&mut self, url: &Url) {
        self.sink.send(PlatformCommand::OpenLink {
            url: url.to_string(),
        });
    }

    fn open_menu(&mut self, message_index: usize) {
        self.sink.send(PlatformCommand::OpenMenu { message_index });
    }

    fn focus_input(&mut self) {
        self.sink.send(PlatformCommand::FocusInput);
    }
}
