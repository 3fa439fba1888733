//! Verse mutation transactions.
//!
//! [`VerseOp`] describes one state transition scoped to a single verse. It is
//! the wire format of `PATCH /api/canvases/{id}/verses/{verse_id}` and the
//! unit the canvas service applies under its write lock.
//!
//! `apply` is the pure form: it returns a new collection and leaves the
//! receiver untouched. `apply_in_place` is the same transition against an
//! owned collection; both leave state unchanged when they fail.

use serde::{Deserialize, Serialize};

use super::collection::{VerseCollection, VerseError};
use super::model::{BoardCards, CardId, ComponentId, ComponentKind, Point, Role, Size, SystemMapData, VerseId};

const DEFAULT_COMPONENT_POSITION: Point = Point { x: 40.0, y: 40.0 };

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum VerseOp {
    SetPosition {
        position: Point,
    },
    SetSize {
        size: Size,
    },
    SetName {
        name: String,
    },
    SetModel {
        model_id: String,
    },
    SetSystemPrompt {
        system_prompt: String,
    },
    AppendMessage {
        role: Role,
        content: String,
    },
    AddComponent {
        kind: ComponentKind,
        #[serde(default)]
        position: Option<Point>,
        #[serde(default)]
        size: Option<Size>,
        #[serde(default)]
        data: serde_json::Value,
    },
    RemoveComponent {
        component_id: ComponentId,
    },
    MoveComponent {
        component_id: ComponentId,
        position: Point,
    },
    ResizeComponent {
        component_id: ComponentId,
        size: Size,
    },
    UpdateComponentData {
        component_id: ComponentId,
        data: serde_json::Value,
    },
    BringToFront {
        component_id: ComponentId,
    },
    SetBoardCards {
        board_cards: BoardCards,
    },
    MoveCard {
        card_id: CardId,
        position: Point,
    },
    SetSystemMapData {
        system_map_data: SystemMapData,
    },
    MoveMapNode {
        node_id: String,
        position: Point,
    },
    RelabelMapNode {
        node_id: String,
        label: String,
    },
    RelabelMapEdge {
        edge_id: String,
        label: String,
    },
}

impl VerseOp {
    /// Short name for logs.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::SetPosition { .. } => "setPosition",
            Self::SetSize { .. } => "setSize",
            Self::SetName { .. } => "setName",
            Self::SetModel { .. } => "setModel",
            Self::SetSystemPrompt { .. } => "setSystemPrompt",
            Self::AppendMessage { .. } => "appendMessage",
            Self::AddComponent { .. } => "addComponent",
            Self::RemoveComponent { .. } => "removeComponent",
            Self::MoveComponent { .. } => "moveComponent",
            Self::ResizeComponent { .. } => "resizeComponent",
            Self::UpdateComponentData { .. } => "updateComponentData",
            Self::BringToFront { .. } => "bringToFront",
            Self::SetBoardCards { .. } => "setBoardCards",
            Self::MoveCard { .. } => "moveCard",
            Self::SetSystemMapData { .. } => "setSystemMapData",
            Self::MoveMapNode { .. } => "moveMapNode",
            Self::RelabelMapNode { .. } => "relabelMapNode",
            Self::RelabelMapEdge { .. } => "relabelMapEdge",
        }
    }
}

/// Default footprint for a newly attached component of `kind`.
#[must_use]
pub fn default_component_size(kind: ComponentKind) -> Size {
    match kind {
        ComponentKind::Chat => super::model::DEFAULT_CHAT_SIZE,
        ComponentKind::Board => Size::new(820.0, 520.0),
        ComponentKind::SystemMap => Size::new(720.0, 520.0),
        ComponentKind::PostIt => Size::new(200.0, 200.0),
    }
}

impl VerseCollection {
    /// Apply `op` to a copy of this collection and return the copy.
    ///
    /// # Errors
    ///
    /// Returns the precondition failure of the underlying operation. `self`
    /// is never modified.
    pub fn apply(&self, verse_id: VerseId, op: VerseOp) -> Result<VerseCollection, VerseError> {
        let mut next = self.clone();
        next.apply_in_place(verse_id, op)?;
        Ok(next)
    }

    /// Apply `op` to this collection.
    ///
    /// # Errors
    ///
    /// Returns the precondition failure of the underlying operation, in which
    /// case nothing was changed.
    pub fn apply_in_place(&mut self, verse_id: VerseId, op: VerseOp) -> Result<(), VerseError> {
        match op {
            VerseOp::SetPosition { position } => self.set_position(verse_id, position),
            VerseOp::SetSize { size } => self.set_size(verse_id, size),
            VerseOp::SetName { name } => self.set_name(verse_id, name),
            VerseOp::SetModel { model_id } => self.set_model(verse_id, model_id),
            VerseOp::SetSystemPrompt { system_prompt } => self.set_system_prompt(verse_id, system_prompt),
            VerseOp::AppendMessage { role, content } => self.append_message(verse_id, role, content).map(|_| ()),
            VerseOp::AddComponent { kind, position, size, data } => self
                .add_component(
                    verse_id,
                    kind,
                    position.unwrap_or(DEFAULT_COMPONENT_POSITION),
                    size.unwrap_or_else(|| default_component_size(kind)),
                    data,
                )
                .map(|_| ()),
            VerseOp::RemoveComponent { component_id } => self.remove_component(verse_id, component_id),
            VerseOp::MoveComponent { component_id, position } => self.move_component(verse_id, component_id, position),
            VerseOp::ResizeComponent { component_id, size } => self.resize_component(verse_id, component_id, size),
            VerseOp::UpdateComponentData { component_id, data } => {
                self.update_component_data(verse_id, component_id, data)
            }
            VerseOp::BringToFront { component_id } => self.bring_to_front(verse_id, component_id).map(|_| ()),
            VerseOp::SetBoardCards { board_cards } => self.set_board_cards(verse_id, board_cards),
            VerseOp::MoveCard { card_id, position } => self.move_card(verse_id, card_id, position),
            VerseOp::SetSystemMapData { system_map_data } => self.set_system_map_data(verse_id, system_map_data),
            VerseOp::MoveMapNode { node_id, position } => self.move_map_node(verse_id, &node_id, position),
            VerseOp::RelabelMapNode { node_id, label } => self.relabel_map_node(verse_id, &node_id, label),
            VerseOp::RelabelMapEdge { edge_id, label } => self.relabel_map_edge(verse_id, &edge_id, label),
        }
    }
}

#[cfg(test)]
#[path = "mutation_test.rs"]
mod tests;
