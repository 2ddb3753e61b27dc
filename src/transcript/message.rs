//! Transcript entries and their inbound wire form

use serde::{Deserialize, Serialize};

use super::actions::{ActionSet, ActionSpec};

/// Who authored a message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    User,
    #[default]
    Assistant,
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Role::User => write!(f, "user"),
            Role::Assistant => write!(f, "assistant"),
        }
    }
}

/// How the external renderer should interpret `content`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ContentType {
    #[default]
    Markdown,
    Html,
    Text,
    SemiMarkdown,
}

/// Streaming boundary marker carried by a chunk
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChunkType {
    MessageStart,
    MessageEnd,
}

/// How chunk content combines with the content already on the tail message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operation {
    Append,
    /// Anything other than `append` replaces
    #[serde(other)]
    Replace,
}

/// A message as delivered by the transport
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MessagePayload {
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub role: Role,
    #[serde(default)]
    pub content_type: Option<ContentType>,
    #[serde(default)]
    pub chunk_type: Option<ChunkType>,
    #[serde(default)]
    pub operation: Option<Operation>,
    #[serde(default)]
    pub icon: Option<String>,
    /// Per-message action enablement, overriding the container default
    #[serde(default)]
    pub actions: Option<ActionSpec>,
}

impl MessagePayload {
    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            role: Role::Assistant,
            ..Default::default()
        }
    }

    pub fn chunk(chunk_type: Option<ChunkType>, content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            chunk_type,
            operation: Some(Operation::Append),
            ..Default::default()
        }
    }
}

/// One transcript entry
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Message {
    pub content: String,
    pub role: Role,
    pub content_type: ContentType,
    pub chunk_type: Option<ChunkType>,
    pub operation: Option<Operation>,
    pub streaming: bool,
    pub icon: Option<String>,
    pub actions: ActionSet,
    #[serde(skip)]
    pub(crate) placeholder: bool,
}

/// Which marker the view should show next to a message
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisplayIcon<'a> {
    None,
    Thinking,
    Static,
    Custom(&'a str),
}

impl Message {
    /// A user turn; user content is always semi-markdown
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            role: Role::User,
            content_type: ContentType::SemiMarkdown,
            chunk_type: None,
            operation: None,
            streaming: false,
            icon: None,
            actions: ActionSet::empty(),
            placeholder: false,
        }
    }

    /// The empty assistant entry standing in for a pending response
    pub fn placeholder() -> Self {
        Self {
            content: String::new(),
            role: Role::Assistant,
            content_type: ContentType::Markdown,
            chunk_type: None,
            operation: None,
            streaming: false,
            icon: None,
            actions: ActionSet::empty(),
            placeholder: true,
        }
    }

    /// Build a transcript entry from a transport payload
    pub fn from_payload(payload: MessagePayload, default_actions: &ActionSpec) -> Self {
        match payload.role {
            Role::User => Self {
                chunk_type: payload.chunk_type,
                operation: payload.operation,
                ..Self::user(payload.content)
            },
            Role::Assistant => Self {
                content: payload.content,
                role: Role::Assistant,
                content_type: payload.content_type.unwrap_or_default(),
                chunk_type: payload.chunk_type,
                operation: payload.operation,
                streaming: false,
                icon: payload.icon,
                actions: payload
                    .actions
                    .as_ref()
                    .unwrap_or(default_actions)
                    .resolve(),
                placeholder: false,
            },
        }
    }

    /// True while this entry is an unanswered loading placeholder
    pub fn is_placeholder(&self) -> bool {
        self.placeholder && self.content.is_empty()
    }

    pub fn display_icon(&self) -> DisplayIcon<'_> {
        match self.role {
            Role::User => DisplayIcon::None,
            Role::Assistant if self.content.is_empty() => DisplayIcon::Thinking,
            Role::Assistant => match self.icon.as_deref() {
                Some(icon) => DisplayIcon::Custom(icon),
                None => DisplayIcon::Static,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transcript::ActionKind;

    #[test]
    fn test_user_messages_are_semi_markdown() {
        let payload = MessagePayload {
            content: "hi".into(),
            role: Role::User,
            content_type: Some(ContentType::Html),
            actions: Some(ActionSpec::All),
            ..Default::default()
        };
        let msg = Message::from_payload(payload, &ActionSpec::All);
        assert_eq!(msg.content_type, ContentType::SemiMarkdown);
        assert!(msg.actions.is_empty());
    }

    #[test]
    fn test_assistant_defaults_to_markdown_and_container_actions() {
        let msg = Message::from_payload(
            MessagePayload::assistant("hello"),
            &ActionSpec::parse("copy"),
        );
        assert_eq!(msg.content_type, ContentType::Markdown);
        assert!(msg.actions.contains(ActionKind::Copy));
        assert!(!msg.actions.contains(ActionKind::Share));
    }

    #[test]
    fn test_per_message_actions_override_container() {
        let payload = MessagePayload {
            actions: Some(ActionSpec::None),
            ..MessagePayload::assistant("hello")
        };
        let msg = Message::from_payload(payload, &ActionSpec::All);
        assert!(msg.actions.is_empty());
    }

    #[test]
    fn test_payload_deserialization() {
        let json = r#"{"content":"x","role":"assistant","content_type":"semi-markdown","chunk_type":"message_end","operation":"append"}"#;
        let payload: MessagePayload = serde_json::from_str(json).unwrap();
        assert_eq!(payload.content_type, Some(ContentType::SemiMarkdown));
        assert_eq!(payload.chunk_type, Some(ChunkType::MessageEnd));
        assert_eq!(payload.operation, Some(Operation::Append));
    }

    #[test]
    fn test_unknown_operation_replaces() {
        let payload: MessagePayload =
            serde_json::from_str(r#"{"content":"x","operation":"overwrite"}"#).unwrap();
        assert_eq!(payload.operation, Some(Operation::Replace));
    }

    #[test]
    fn test_display_icon_tracks_content() {
        let mut msg = Message::placeholder();
        assert_eq!(msg.display_icon(), DisplayIcon::Thinking);
        msg.content.push_str("done");
        assert_eq!(msg.display_icon(), DisplayIcon::Static);
        msg.icon = Some("<svg/>".into());
        assert_eq!(msg.display_icon(), DisplayIcon::Custom("<svg/>"));
        assert_eq!(Message::user("q").display_icon(), DisplayIcon::None);
    }
}
