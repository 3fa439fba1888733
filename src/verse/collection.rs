//! Verse collection — the arena holding every verse of one canvas.
//!
//! DESIGN
//! ======
//! Verses live in a `Vec` in creation order with a `HashMap` index by id.
//! Children are derived on demand by filtering on `parent_id`, so creation
//! and removal never have to keep a forward list in sync.
//!
//! Every mutator validates its preconditions before writing. A call that
//! returns `Err` leaves the collection exactly as it was.

use std::collections::{HashMap, HashSet, VecDeque};

use serde::{Deserialize, Serialize};

use super::model::{
    BoardCards, CardId, ChatMessage, ComponentId, ComponentKind, MapNode, MessageId, Point, Role, Size, SystemMapData,
    Verse, VerseComponent, VerseId,
};

// =============================================================================
// ERRORS
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum VerseError {
    #[error("verse not found: {0}")]
    VerseNotFound(VerseId),
    #[error("message {message} is not in the transcript of parent verse {parent}")]
    InvalidReference { parent: VerseId, message: MessageId },
    #[error("component {component} not found in verse {verse}")]
    ComponentNotFound { verse: VerseId, component: ComponentId },
    #[error("card {card} not found in verse {verse}")]
    CardNotFound { verse: VerseId, card: CardId },
    #[error("map node {node:?} not found in verse {verse}")]
    MapNodeNotFound { verse: VerseId, node: String },
    #[error("map edge {edge:?} not found in verse {verse}")]
    MapEdgeNotFound { verse: VerseId, edge: String },
    #[error("duplicate verse id: {0}")]
    DuplicateVerse(VerseId),
}

impl crate::error::ErrorCode for VerseError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::VerseNotFound(_) => "E_VERSE_NOT_FOUND",
            Self::InvalidReference { .. } => "E_INVALID_REFERENCE",
            Self::ComponentNotFound { .. } => "E_COMPONENT_NOT_FOUND",
            Self::CardNotFound { .. } => "E_CARD_NOT_FOUND",
            Self::MapNodeNotFound { .. } => "E_MAP_NODE_NOT_FOUND",
            Self::MapEdgeNotFound { .. } => "E_MAP_EDGE_NOT_FOUND",
            Self::DuplicateVerse(_) => "E_DUPLICATE_VERSE",
        }
    }
}

// =============================================================================
// COLLECTION
// =============================================================================

/// All verses of one canvas. Serializes as a plain array in creation order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<Verse>", into = "Vec<Verse>")]
pub struct VerseCollection {
    verses: Vec<Verse>,
    index: HashMap<VerseId, usize>,
}

impl TryFrom<Vec<Verse>> for VerseCollection {
    type Error = VerseError;

    fn try_from(verses: Vec<Verse>) -> Result<Self, Self::Error> {
        let mut collection = Self::new();
        for verse in verses {
            collection.insert(verse)?;
        }
        Ok(collection)
    }
}

impl From<VerseCollection> for Vec<Verse> {
    fn from(collection: VerseCollection) -> Self {
        collection.verses
    }
}

impl VerseCollection {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.verses.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.verses.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Verse> {
        self.verses.iter()
    }

    #[must_use]
    pub fn contains(&self, id: VerseId) -> bool {
        self.index.contains_key(&id)
    }

    #[must_use]
    pub fn get(&self, id: VerseId) -> Option<&Verse> {
        self.index.get(&id).map(|&i| &self.verses[i])
    }

    /// Look up a verse, failing with `VerseNotFound`.
    ///
    /// # Errors
    ///
    /// Returns `VerseNotFound` if no verse has this id.
    pub fn require(&self, id: VerseId) -> Result<&Verse, VerseError> {
        self.get(id).ok_or(VerseError::VerseNotFound(id))
    }

    fn require_mut(&mut self, id: VerseId) -> Result<&mut Verse, VerseError> {
        let i = *self.index.get(&id).ok_or(VerseError::VerseNotFound(id))?;
        Ok(&mut self.verses[i])
    }

    /// Add a fully-formed verse. Used by the branch engine and by document
    /// hydration.
    ///
    /// # Errors
    ///
    /// Returns `DuplicateVerse` if the id is already present.
    pub fn insert(&mut self, verse: Verse) -> Result<(), VerseError> {
        if self.index.contains_key(&verse.id) {
            return Err(VerseError::DuplicateVerse(verse.id));
        }
        self.index.insert(verse.id, self.verses.len());
        self.verses.push(verse);
        Ok(())
    }

    // -------------------------------------------------------------------------
    // Tree queries
    // -------------------------------------------------------------------------

    /// Direct children of `id`, in creation order.
    #[must_use]
    pub fn branches(&self, id: VerseId) -> Vec<VerseId> {
        self.verses
            .iter()
            .filter(|v| v.parent_id == Some(id))
            .map(|v| v.id)
            .collect()
    }

    /// Verses without a parent.
    pub fn roots(&self) -> impl Iterator<Item = &Verse> {
        self.verses.iter().filter(|v| v.is_root())
    }

    /// Every verse below `id`, breadth-first. Does not include `id` itself.
    #[must_use]
    pub fn descendants(&self, id: VerseId) -> Vec<VerseId> {
        let mut children_of: HashMap<VerseId, Vec<VerseId>> = HashMap::new();
        for verse in &self.verses {
            if let Some(parent) = verse.parent_id {
                children_of.entry(parent).or_default().push(verse.id);
            }
        }

        let mut out = Vec::new();
        let mut seen = HashSet::from([id]);
        let mut frontier = VecDeque::from([id]);
        while let Some(current) = frontier.pop_front() {
            let Some(children) = children_of.get(&current) else {
                continue;
            };
            for &child in children {
                if seen.insert(child) {
                    out.push(child);
                    frontier.push_back(child);
                }
            }
        }
        out
    }

    // -------------------------------------------------------------------------
    // Field updates
    // -------------------------------------------------------------------------

    /// # Errors
    ///
    /// Returns `VerseNotFound` if the verse is absent.
    pub fn set_position(&mut self, id: VerseId, position: Point) -> Result<(), VerseError> {
        self.require_mut(id)?.position = position;
        Ok(())
    }

    /// # Errors
    ///
    /// Returns `VerseNotFound` if the verse is absent.
    pub fn set_size(&mut self, id: VerseId, size: Size) -> Result<(), VerseError> {
        self.require_mut(id)?.size = size;
        Ok(())
    }

    /// # Errors
    ///
    /// Returns `VerseNotFound` if the verse is absent.
    pub fn set_name(&mut self, id: VerseId, name: impl Into<String>) -> Result<(), VerseError> {
        self.require_mut(id)?.name = name.into();
        Ok(())
    }

    /// # Errors
    ///
    /// Returns `VerseNotFound` if the verse is absent.
    pub fn set_model(&mut self, id: VerseId, model_id: impl Into<String>) -> Result<(), VerseError> {
        self.require_mut(id)?.model_id = model_id.into();
        Ok(())
    }

    /// # Errors
    ///
    /// Returns `VerseNotFound` if the verse is absent.
    pub fn set_system_prompt(&mut self, id: VerseId, prompt: impl Into<String>) -> Result<(), VerseError> {
        self.require_mut(id)?.system_prompt = prompt.into();
        Ok(())
    }

    // -------------------------------------------------------------------------
    // Transcript
    // -------------------------------------------------------------------------

    /// Append a message with a fresh id and timestamp. Earlier entries are
    /// never touched.
    ///
    /// # Errors
    ///
    /// Returns `VerseNotFound` if the verse is absent.
    pub fn append_message(
        &mut self,
        id: VerseId,
        role: Role,
        content: impl Into<String>,
    ) -> Result<ChatMessage, VerseError> {
        let verse = self.require_mut(id)?;
        let message = verse.next_message(role, content.into());
        verse.chat_history.push(message.clone());
        Ok(message)
    }

    // -------------------------------------------------------------------------
    // Removal
    // -------------------------------------------------------------------------

    /// Remove a verse together with its whole subtree. Returns the removed
    /// ids, the requested verse first.
    ///
    /// # Errors
    ///
    /// Returns `VerseNotFound` if the verse is absent.
    pub fn remove_verse(&mut self, id: VerseId) -> Result<Vec<VerseId>, VerseError> {
        self.require(id)?;
        let mut removed = vec![id];
        removed.extend(self.descendants(id));

        let doomed: HashSet<VerseId> = removed.iter().copied().collect();
        self.verses.retain(|v| !doomed.contains(&v.id));
        self.reindex();
        Ok(removed)
    }

    fn reindex(&mut self) {
        self.index = self
            .verses
            .iter()
            .enumerate()
            .map(|(i, v)| (v.id, i))
            .collect();
    }

    // -------------------------------------------------------------------------
    // Components
    // -------------------------------------------------------------------------

    /// Attach a component on top of the verse's existing ones.
    ///
    /// # Errors
    ///
    /// Returns `VerseNotFound` if the verse is absent.
    pub fn add_component(
        &mut self,
        id: VerseId,
        kind: ComponentKind,
        position: Point,
        size: Size,
        data: serde_json::Value,
    ) -> Result<ComponentId, VerseError> {
        let verse = self.require_mut(id)?;
        let component = VerseComponent {
            id: ComponentId::new(),
            kind,
            position,
            size,
            z_index: verse.max_z_index() + 1,
            data,
        };
        let component_id = component.id;
        verse.components.push(component);
        Ok(component_id)
    }

    /// # Errors
    ///
    /// Returns `VerseNotFound` or `ComponentNotFound`.
    pub fn remove_component(&mut self, id: VerseId, component_id: ComponentId) -> Result<(), VerseError> {
        let verse = self.require_mut(id)?;
        let before = verse.components.len();
        verse.components.retain(|c| c.id != component_id);
        if verse.components.len() == before {
            return Err(VerseError::ComponentNotFound { verse: id, component: component_id });
        }
        Ok(())
    }

    fn component_mut(&mut self, id: VerseId, component_id: ComponentId) -> Result<&mut VerseComponent, VerseError> {
        self.require_mut(id)?
            .components
            .iter_mut()
            .find(|c| c.id == component_id)
            .ok_or(VerseError::ComponentNotFound { verse: id, component: component_id })
    }

    /// # Errors
    ///
    /// Returns `VerseNotFound` or `ComponentNotFound`.
    pub fn move_component(&mut self, id: VerseId, component_id: ComponentId, position: Point) -> Result<(), VerseError> {
        self.component_mut(id, component_id)?.position = position;
        Ok(())
    }

    /// # Errors
    ///
    /// Returns `VerseNotFound` or `ComponentNotFound`.
    pub fn resize_component(&mut self, id: VerseId, component_id: ComponentId, size: Size) -> Result<(), VerseError> {
        self.component_mut(id, component_id)?.size = size;
        Ok(())
    }

    /// # Errors
    ///
    /// Returns `VerseNotFound` or `ComponentNotFound`.
    pub fn update_component_data(
        &mut self,
        id: VerseId,
        component_id: ComponentId,
        data: serde_json::Value,
    ) -> Result<(), VerseError> {
        self.component_mut(id, component_id)?.data = data;
        Ok(())
    }

    /// Raise a component above every other one in the same verse. Other
    /// components keep their z-index. Returns the new z-index.
    ///
    /// # Errors
    ///
    /// Returns `VerseNotFound` or `ComponentNotFound`.
    pub fn bring_to_front(&mut self, id: VerseId, component_id: ComponentId) -> Result<i64, VerseError> {
        let top = self.require(id)?.max_z_index() + 1;
        let component = self.component_mut(id, component_id)?;
        component.z_index = top;
        Ok(top)
    }

    // -------------------------------------------------------------------------
    // Cached artifacts
    // -------------------------------------------------------------------------

    /// # Errors
    ///
    /// Returns `VerseNotFound` if the verse is absent.
    pub fn set_board_cards(&mut self, id: VerseId, cards: BoardCards) -> Result<(), VerseError> {
        self.require_mut(id)?.board_cards = Some(cards);
        Ok(())
    }

    /// # Errors
    ///
    /// Returns `VerseNotFound` or `CardNotFound` (also when no board is cached).
    pub fn move_card(&mut self, id: VerseId, card_id: CardId, position: Point) -> Result<(), VerseError> {
        let card = self
            .require_mut(id)?
            .board_cards
            .as_mut()
            .and_then(|board| board.cards.iter_mut().find(|c| c.id == card_id))
            .ok_or(VerseError::CardNotFound { verse: id, card: card_id })?;
        card.position = position;
        Ok(())
    }

    /// # Errors
    ///
    /// Returns `VerseNotFound` if the verse is absent.
    pub fn set_system_map_data(&mut self, id: VerseId, map: SystemMapData) -> Result<(), VerseError> {
        self.require_mut(id)?.system_map_data = Some(map);
        Ok(())
    }

    /// # Errors
    ///
    /// Returns `VerseNotFound` or `MapNodeNotFound`.
    pub fn move_map_node(&mut self, id: VerseId, node_id: &str, position: Point) -> Result<(), VerseError> {
        self.map_node_mut(id, node_id)?.position = position;
        Ok(())
    }

    /// # Errors
    ///
    /// Returns `VerseNotFound` or `MapNodeNotFound`.
    pub fn relabel_map_node(&mut self, id: VerseId, node_id: &str, label: impl Into<String>) -> Result<(), VerseError> {
        self.map_node_mut(id, node_id)?.label = label.into();
        Ok(())
    }

    /// # Errors
    ///
    /// Returns `VerseNotFound` or `MapEdgeNotFound`.
    pub fn relabel_map_edge(&mut self, id: VerseId, edge_id: &str, label: impl Into<String>) -> Result<(), VerseError> {
        let edge = self
            .require_mut(id)?
            .system_map_data
            .as_mut()
            .and_then(|map| map.edges.iter_mut().find(|e| e.id == edge_id))
            .ok_or_else(|| VerseError::MapEdgeNotFound { verse: id, edge: edge_id.to_owned() })?;
        edge.label = label.into();
        Ok(())
    }

    fn map_node_mut(&mut self, id: VerseId, node_id: &str) -> Result<&mut MapNode, VerseError> {
        self.require_mut(id)?
            .system_map_data
            .as_mut()
            .and_then(|map| map.nodes.iter_mut().find(|n| n.id == node_id))
            .ok_or_else(|| VerseError::MapNodeNotFound { verse: id, node: node_id.to_owned() })
    }
}

#[cfg(test)]
#[path = "collection_test.rs"]
mod tests;
