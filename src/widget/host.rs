//! Services the embedding page provides to a widget

use url::Url;

use crate::capture::{AudioDevice, SpeechService};
use crate::view::MessageView;

/// Page-side effects a widget asks for
///
/// Clipboard writes and link confirmations are asynchronous on the page;
/// their results come back through `Widget::clipboard_result` and
/// `Widget::link_confirmed`.
pub trait HostServices: Send {
    fn write_clipboard(&mut self, message_index: usize, text: &str);

    fn confirm_link(&mut self, url: &Url);

    fn open_link(&mut self, url: &Url);

    fn open_menu(&mut self, message_index: usize);

    fn focus_input(&mut self);
}

/// Everything a widget needs from its environment
pub struct WidgetPlatform {
    pub speech: Box<dyn SpeechService>,
    pub audio: Box<dyn AudioDevice>,
    pub view: Box<dyn MessageView>,
    pub host: Box<dyn HostServices>,
}
