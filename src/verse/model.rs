//! Entity model — verses, chat messages, components, cached artifacts.
//!
//! DESIGN
//! ======
//! A verse stores only its `parent_id`. The forward child list is never
//! persisted; [`super::VerseCollection::branches`] derives it by scanning the
//! collection, so the parent/child relationship has a single source of truth.
//! Branch provenance is carried by the explicit [`BranchKind`] tag; the text
//! of the seeded system message is display-only and derived from it.

use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

// =============================================================================
// IDENTIFIERS
// =============================================================================

macro_rules! define_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub Uuid);

        impl $name {
            #[must_use]
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                self.0.fmt(f)
            }
        }

        impl From<Uuid> for $name {
            fn from(id: Uuid) -> Self {
                Self(id)
            }
        }
    };
}

define_id!(
    /// Identifier of a verse. Assigned at creation, never changes.
    VerseId
);
define_id!(
    /// Identifier of a chat message. Required for message-level branch targeting.
    MessageId
);
define_id!(
    /// Identifier of a component attached to a verse.
    ComponentId
);
define_id!(
    /// Identifier of an insight-board card.
    CardId
);

/// Current time as milliseconds since Unix epoch.
pub(crate) fn now_ms() -> i64 {
    let Ok(dur) = SystemTime::now().duration_since(UNIX_EPOCH) else {
        return 0;
    };
    i64::try_from(dur.as_millis()).unwrap_or(0)
}

// =============================================================================
// GEOMETRY
// =============================================================================

/// Canvas-space coordinate. Round-trips only; the core never reads it.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    #[must_use]
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Size {
    pub width: f64,
    pub height: f64,
}

impl Size {
    #[must_use]
    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }
}

pub const DEFAULT_VERSE_SIZE: Size = Size { width: 900.0, height: 640.0 };
pub const DEFAULT_CHAT_SIZE: Size = Size { width: 420.0, height: 560.0 };

/// Horizontal gap between a parent verse and a freshly created branch.
pub const BRANCH_OFFSET_X: f64 = 80.0;
/// Vertical step between sibling branches of the same parent.
pub const BRANCH_STAGGER_Y: f64 = 120.0;

// =============================================================================
// CHAT MESSAGE
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
    System,
}

impl Role {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Assistant => "assistant",
            Self::System => "system",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One turn in a verse transcript.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub id: MessageId,
    pub role: Role,
    pub content: String,
    /// Milliseconds since Unix epoch. Display only; array order is authoritative.
    pub timestamp: i64,
}

/// A role/content pair as submitted to a model. Carries no identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContextTurn {
    pub role: Role,
    pub content: String,
}

impl From<&ChatMessage> for ContextTurn {
    fn from(message: &ChatMessage) -> Self {
        Self { role: message.role, content: message.content.clone() }
    }
}

// =============================================================================
// BRANCH KIND
// =============================================================================

/// How a verse was derived from its parent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum BranchKind {
    /// Branched from the parent's whole conversation.
    Verse,
    /// Branched from one message in the parent's transcript.
    Message,
}

impl BranchKind {
    /// Human-readable text for the synthetic system message seeded into a
    /// new branch.
    #[must_use]
    pub fn seed_text(self, parent_name: &str) -> String {
        match self {
            Self::Verse => format!(
                "This verse branches from \"{parent_name}\". The full conversation of the parent verse \
                 is available as context."
            ),
            Self::Message => format!(
                "This verse branches from a specific message in \"{parent_name}\". The parent \
                 conversation up to and including that message is available as context."
            ),
        }
    }
}

// =============================================================================
// COMPONENTS
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ComponentKind {
    Chat,
    Board,
    SystemMap,
    PostIt,
}

/// A panel attached to a verse. Positioned in the verse's local space.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerseComponent {
    pub id: ComponentId,
    #[serde(rename = "type")]
    pub kind: ComponentKind,
    pub position: Point,
    pub size: Size,
    pub z_index: i64,
    /// Kind-dependent payload (e.g. sticky-note text). Opaque to the core.
    #[serde(default)]
    pub data: serde_json::Value,
}

// =============================================================================
// CACHED ARTIFACTS
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CardColumn {
    Elaborate,
    Problems,
    Solutions,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoardCard {
    pub id: CardId,
    pub column: CardColumn,
    pub title: String,
    #[serde(default)]
    pub detail: String,
    pub position: Point,
}

/// Insight board extracted from a transcript.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct BoardCards {
    pub cards: Vec<BoardCard>,
}

impl BoardCards {
    pub fn in_column(&self, column: CardColumn) -> impl Iterator<Item = &BoardCard> {
        self.cards.iter().filter(move |card| card.column == column)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MapNode {
    pub id: String,
    pub label: String,
    #[serde(default)]
    pub kind: String,
    pub position: Point,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MapEdge {
    pub id: String,
    pub source: String,
    pub target: String,
    #[serde(default)]
    pub label: String,
}

/// System-architecture diagram extracted from a transcript.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SystemMapData {
    pub nodes: Vec<MapNode>,
    pub edges: Vec<MapEdge>,
}

// =============================================================================
// VERSE
// =============================================================================

/// A node in the branch forest: one independent conversation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Verse {
    pub id: VerseId,
    pub name: String,
    #[serde(default)]
    pub parent_id: Option<VerseId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub branch_source_message_id: Option<MessageId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub branch_kind: Option<BranchKind>,
    #[serde(default)]
    pub system_prompt: String,
    pub model_id: String,
    #[serde(default)]
    pub chat_history: Vec<ChatMessage>,
    #[serde(default)]
    pub components: Vec<VerseComponent>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub board_cards: Option<BoardCards>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system_map_data: Option<SystemMapData>,
    #[serde(default)]
    pub position: Point,
    #[serde(default = "default_verse_size")]
    pub size: Size,
    #[serde(default)]
    pub created_at: i64,
}

fn default_verse_size() -> Size {
    DEFAULT_VERSE_SIZE
}

/// Short default label derived from a verse id.
#[must_use]
pub fn default_verse_name(id: VerseId) -> String {
    let simple = id.0.simple().to_string();
    format!("Verse {}", &simple[..6])
}

impl Verse {
    /// A bare root verse with a single chat component and no history.
    #[must_use]
    pub fn new(model_id: impl Into<String>) -> Self {
        let id = VerseId::new();
        Self {
            id,
            name: default_verse_name(id),
            parent_id: None,
            branch_source_message_id: None,
            branch_kind: None,
            system_prompt: String::new(),
            model_id: model_id.into(),
            chat_history: Vec::new(),
            components: vec![VerseComponent {
                id: ComponentId::new(),
                kind: ComponentKind::Chat,
                position: Point::new(20.0, 40.0),
                size: DEFAULT_CHAT_SIZE,
                z_index: 1,
                data: serde_json::Value::Null,
            }],
            board_cards: None,
            system_map_data: None,
            position: Point::default(),
            size: DEFAULT_VERSE_SIZE,
            created_at: now_ms(),
        }
    }

    #[must_use]
    pub fn is_root(&self) -> bool {
        self.parent_id.is_none()
    }

    #[must_use]
    pub fn message(&self, message_id: MessageId) -> Option<&ChatMessage> {
        self.chat_history.iter().find(|m| m.id == message_id)
    }

    #[must_use]
    pub fn component(&self, component_id: ComponentId) -> Option<&VerseComponent> {
        self.components.iter().find(|c| c.id == component_id)
    }

    /// Highest z-index among this verse's components (0 when there are none).
    #[must_use]
    pub fn max_z_index(&self) -> i64 {
        self.components.iter().map(|c| c.z_index).max().unwrap_or(0)
    }

    /// Non-system turns of this verse's own transcript.
    #[must_use]
    pub fn transcript(&self) -> Vec<ContextTurn> {
        self.chat_history
            .iter()
            .filter(|m| m.role != Role::System)
            .map(ContextTurn::from)
            .collect()
    }

    /// Build the next message for this transcript. The timestamp is strictly
    /// greater than every earlier one even if the clock stalls or steps back.
    pub(crate) fn next_message(&self, role: Role, content: String) -> ChatMessage {
        let floor = self
            .chat_history
            .last()
            .map_or(i64::MIN, |m| m.timestamp.saturating_add(1));
        ChatMessage { id: MessageId::new(), role, content, timestamp: now_ms().max(floor) }
    }
}

#[cfg(test)]
#[path = "model_test.rs"]
mod tests;
