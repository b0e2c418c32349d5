//! Session entry domain types.
//!
//! A session is an ordered, append-only sequence of [`SessionEntry`] values.
//! Entries are immutable once appended: compaction never edits an entry, it
//! only drops a prefix from the visible sequence and introduces a single
//! [`CompactionEntry`] in its place.
//!
//! Entry kinds are a tagged sum type ([`EntryPayload`]) so the estimator and
//! classifier match on them exhaustively.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Branch used when an entry does not name one.
pub const DEFAULT_BRANCH: &str = "main";

fn default_branch() -> String {
    DEFAULT_BRANCH.into()
}

/// One atomic unit of session history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionEntry {
    /// Unique entry ID, assigned at creation and never reused
    pub id: String,

    /// Creation time; non-decreasing within a branch
    pub timestamp: DateTime<Utc>,

    /// Conversation branch this entry belongs to
    #[serde(default = "default_branch")]
    pub branch_id: String,

    /// Open metadata (flags such as `is_error`)
    #[serde(default, skip_serializing_if = "serde_json::Map::is_empty")]
    pub metadata: serde_json::Map<String, serde_json::Value>,

    /// Kind-specific payload, tagged by `kind`
    #[serde(flatten)]
    pub payload: EntryPayload,
}

/// The kind-specific part of an entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EntryPayload {
    /// A conversation message
    Message(MessageEntry),
    /// A filesystem operation performed by a tool
    FileOperation(FileEntry),
    /// A synthesized summary replacing a removed prefix
    CompactionRecord(CompactionEntry),
    /// The active model was switched
    ModelChange {
        model: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        provider: Option<String>,
    },
    /// The reasoning effort level was switched
    ThinkingLevelChange { level: String },
    /// Extension-defined entry
    Custom {
        custom_type: String,
        #[serde(default)]
        data: serde_json::Value,
    },
}

/// Payload-free discriminator of an entry's kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryKind {
    Message,
    FileOperation,
    CompactionRecord,
    ModelChange,
    ThinkingLevelChange,
    Custom,
}

impl std::fmt::Display for EntryKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Message => "message",
            Self::FileOperation => "file_operation",
            Self::CompactionRecord => "compaction_record",
            Self::ModelChange => "model_change",
            Self::ThinkingLevelChange => "thinking_level_change",
            Self::Custom => "custom",
        };
        f.write_str(name)
    }
}

/// The role of a message sender in a conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// System instructions
    System,
    /// The end user
    User,
    /// The AI assistant
    Assistant,
    /// Tool execution result
    Tool,
}

impl Role {
    /// Upper-case label used when rendering prompts.
    pub fn label(&self) -> &'static str {
        match self {
            Self::System => "SYSTEM",
            Self::User => "USER",
            Self::Assistant => "ASSISTANT",
            Self::Tool => "TOOL",
        }
    }
}

/// A conversation message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessageEntry {
    /// Who sent this message
    pub role: Role,

    /// Text or multi-part content
    pub content: MessageContent,

    /// Tool calls requested by the assistant (if any)
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tool_calls: Vec<MessageToolCall>,

    /// If this is a tool result, which tool call it responds to
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
}

/// A tool call embedded in an assistant message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageToolCall {
    /// Unique ID for this tool call
    pub id: String,

    /// Name of the tool to invoke
    pub name: String,

    /// Arguments as JSON string
    pub arguments: String,
}

/// Message content: either a single string or a list of typed parts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MessageContent {
    Text(String),
    Parts(Vec<ContentPart>),
}

/// One segment of multi-part content.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentPart {
    Text { text: String },
    Thinking { thinking: String },
}

impl ContentPart {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Text { text } => text,
            Self::Thinking { thinking } => thinking,
        }
    }
}

impl MessageContent {
    /// Iterate over the textual segments of this content.
    pub fn segments(&self) -> impl Iterator<Item = &str> {
        let parts: Vec<&str> = match self {
            Self::Text(text) => vec![text.as_str()],
            Self::Parts(parts) => parts.iter().map(ContentPart::as_str).collect(),
        };
        parts.into_iter()
    }

    /// Flatten the content into one string, segments separated by newlines.
    pub fn to_text(&self) -> String {
        match self {
            Self::Text(text) => text.clone(),
            Self::Parts(parts) => parts
                .iter()
                .map(ContentPart::as_str)
                .filter(|s| !s.is_empty())
                .collect::<Vec<_>>()
                .join("\n"),
        }
    }

    /// Whether every segment is empty or whitespace.
    pub fn is_blank(&self) -> bool {
        self.segments().all(|s| s.trim().is_empty())
    }
}

impl From<String> for MessageContent {
    fn from(text: String) -> Self {
        Self::Text(text)
    }
}

impl From<&str> for MessageContent {
    fn from(text: &str) -> Self {
        Self::Text(text.to_string())
    }
}

/// A file entry wraps a single filesystem operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileEntry {
    pub operation: FileOperation,
}

/// What was done to a file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OperationType {
    Read,
    Write,
    Edit,
    Delete,
}

impl OperationType {
    /// Whether this operation changes file contents.
    pub fn is_modification(&self) -> bool {
        matches!(self, Self::Write | Self::Edit | Self::Delete)
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Read => "READ",
            Self::Write => "WRITE",
            Self::Edit => "EDIT",
            Self::Delete => "DELETE",
        }
    }
}

impl std::fmt::Display for OperationType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.label().to_lowercase())
    }
}

/// A filesystem operation.
///
/// Two operations are equal iff path, operation type and content hash are
/// all equal; the timestamp does not take part.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileOperation {
    pub path: String,
    pub operation_type: OperationType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_hash: Option<String>,
    pub timestamp: DateTime<Utc>,
}

impl PartialEq for FileOperation {
    fn eq(&self, other: &Self) -> bool {
        self.path == other.path
            && self.operation_type == other.operation_type
            && self.content_hash == other.content_hash
    }
}

impl Eq for FileOperation {}

/// A summary standing in for a removed prefix of the session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompactionEntry {
    /// Summary text of the removed entries
    pub summary: String,

    /// How many entries the summary replaces
    pub entries_summarized: usize,
}

impl SessionEntry {
    /// Create an entry with a fresh ID and the current time on the default branch.
    pub fn new(payload: EntryPayload) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            timestamp: Utc::now(),
            branch_id: default_branch(),
            metadata: serde_json::Map::new(),
            payload,
        }
    }

    fn message(role: Role, content: impl Into<MessageContent>) -> Self {
        Self::new(EntryPayload::Message(MessageEntry {
            role,
            content: content.into(),
            tool_calls: Vec::new(),
            tool_call_id: None,
        }))
    }

    /// Create a new system message.
    pub fn system(content: impl Into<MessageContent>) -> Self {
        Self::message(Role::System, content)
    }

    /// Create a new user message.
    pub fn user(content: impl Into<MessageContent>) -> Self {
        Self::message(Role::User, content)
    }

    /// Create a new assistant message.
    pub fn assistant(content: impl Into<MessageContent>) -> Self {
        Self::message(Role::Assistant, content)
    }

    /// Create an assistant message that requests tool calls.
    pub fn assistant_with_tool_calls(
        content: impl Into<MessageContent>,
        tool_calls: Vec<MessageToolCall>,
    ) -> Self {
        let mut entry = Self::message(Role::Assistant, content);
        if let EntryPayload::Message(ref mut msg) = entry.payload {
            msg.tool_calls = tool_calls;
        }
        entry
    }

    /// Create a tool result message.
    pub fn tool_result(tool_call_id: impl Into<String>, content: impl Into<MessageContent>) -> Self {
        let mut entry = Self::message(Role::Tool, content);
        if let EntryPayload::Message(ref mut msg) = entry.payload {
            msg.tool_call_id = Some(tool_call_id.into());
        }
        entry
    }

    /// Create a tool result message flagged with `is_error`.
    pub fn tool_error(tool_call_id: impl Into<String>, content: impl Into<MessageContent>) -> Self {
        Self::tool_result(tool_call_id, content).with_metadata("is_error", true)
    }

    /// Create a file operation entry.
    pub fn file_operation(
        path: impl Into<String>,
        operation_type: OperationType,
        content_hash: Option<String>,
    ) -> Self {
        let timestamp = Utc::now();
        let mut entry = Self::new(EntryPayload::FileOperation(FileEntry {
            operation: FileOperation {
                path: path.into(),
                operation_type,
                content_hash,
                timestamp,
            },
        }));
        entry.timestamp = timestamp;
        entry
    }

    /// Create a compaction record.
    pub fn compaction(summary: impl Into<String>, entries_summarized: usize) -> Self {
        Self::new(EntryPayload::CompactionRecord(CompactionEntry {
            summary: summary.into(),
            entries_summarized,
        }))
    }

    /// Create a model change marker.
    pub fn model_change(model: impl Into<String>) -> Self {
        Self::new(EntryPayload::ModelChange {
            model: model.into(),
            provider: None,
        })
    }

    /// Create a thinking level change marker.
    pub fn thinking_level_change(level: impl Into<String>) -> Self {
        Self::new(EntryPayload::ThinkingLevelChange {
            level: level.into(),
        })
    }

    /// Create an extension-defined entry.
    pub fn custom(custom_type: impl Into<String>, data: serde_json::Value) -> Self {
        Self::new(EntryPayload::Custom {
            custom_type: custom_type.into(),
            data,
        })
    }

    /// Override the generated ID.
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    /// Move the entry to another branch.
    pub fn on_branch(mut self, branch_id: impl Into<String>) -> Self {
        self.branch_id = branch_id.into();
        self
    }

    /// Override the timestamp.
    pub fn at(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = timestamp;
        self
    }

    /// Attach a metadata value.
    pub fn with_metadata(
        mut self,
        key: impl Into<String>,
        value: impl Into<serde_json::Value>,
    ) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    pub fn kind(&self) -> EntryKind {
        match self.payload {
            EntryPayload::Message(_) => EntryKind::Message,
            EntryPayload::FileOperation(_) => EntryKind::FileOperation,
            EntryPayload::CompactionRecord(_) => EntryKind::CompactionRecord,
            EntryPayload::ModelChange { .. } => EntryKind::ModelChange,
            EntryPayload::ThinkingLevelChange { .. } => EntryKind::ThinkingLevelChange,
            EntryPayload::Custom { .. } => EntryKind::Custom,
        }
    }

    pub fn as_message(&self) -> Option<&MessageEntry> {
        match &self.payload {
            EntryPayload::Message(msg) => Some(msg),
            _ => None,
        }
    }

    pub fn as_file_operation(&self) -> Option<&FileOperation> {
        match &self.payload {
            EntryPayload::FileOperation(file) => Some(&file.operation),
            _ => None,
        }
    }

    pub fn as_compaction(&self) -> Option<&CompactionEntry> {
        match &self.payload {
            EntryPayload::CompactionRecord(record) => Some(record),
            _ => None,
        }
    }

    /// The message role, if this entry is a message.
    pub fn role(&self) -> Option<Role> {
        self.as_message().map(|m| m.role)
    }

    /// Whether this entry is a message with the given role.
    pub fn is_role(&self, role: Role) -> bool {
        self.role() == Some(role)
    }

    /// Whether this entry is an assistant message waiting on tool results.
    pub fn has_pending_tool_calls(&self) -> bool {
        self.as_message()
            .is_some_and(|m| m.role == Role::Assistant && !m.tool_calls.is_empty())
    }

    /// Whether the entry carries an error indicator.
    ///
    /// Recognizes `is_error: true` (boolean or `"true"` string) in metadata.
    pub fn is_error(&self) -> bool {
        match self.metadata.get("is_error") {
            Some(serde_json::Value::Bool(flag)) => *flag,
            Some(serde_json::Value::String(s)) => s.eq_ignore_ascii_case("true"),
            _ => false,
        }
    }
}
