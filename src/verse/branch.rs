//! Branch engine — creating root verses and child branches.
//!
//! A branch copies its parent's system prompt by value, inherits its model
//! unless one is given, and starts with exactly one synthetic system message
//! describing where it came from. The parent is never modified: the child
//! list is derived from `parent_id`, so there is nothing to append to.

use tracing::{debug, warn};

use super::collection::{VerseCollection, VerseError};
use super::model::{BRANCH_OFFSET_X, BRANCH_STAGGER_Y, BranchKind, MessageId, Point, Role, Verse, VerseId};

impl VerseCollection {
    /// Create a root verse. `model_id` falls back to `default_model`.
    pub fn create_root(
        &mut self,
        name: Option<&str>,
        model_id: Option<&str>,
        position: Point,
        default_model: &str,
    ) -> Verse {
        let mut verse = Verse::new(model_id.unwrap_or(default_model));
        if let Some(name) = name.filter(|n| !n.trim().is_empty()) {
            verse.name = name.trim().to_owned();
        }
        verse.position = position;

        if let Err(e) = self.insert(verse.clone()) {
            warn!(verse_id = %verse.id, error = %e, "verse: root insert rejected");
        }
        debug!(verse_id = %verse.id, model = %verse.model_id, "verse: root created");
        verse
    }

    /// Create a child of `parent_id`.
    ///
    /// With `source_message_id` the branch is message-level: the message must
    /// exist in the parent's current transcript, and context assembly will
    /// cut the parent's history after it.
    ///
    /// # Errors
    ///
    /// Returns `VerseNotFound` if the parent is absent, `InvalidReference` if
    /// the source message is not in the parent's transcript. Nothing is
    /// mutated on error.
    pub fn create_branch(
        &mut self,
        parent_id: VerseId,
        model_id: Option<&str>,
        source_message_id: Option<MessageId>,
        default_model: &str,
    ) -> Result<Verse, VerseError> {
        let parent = self.require(parent_id)?;

        if let Some(message_id) = source_message_id {
            if parent.message(message_id).is_none() {
                return Err(VerseError::InvalidReference { parent: parent_id, message: message_id });
            }
        }

        let kind = if source_message_id.is_some() { BranchKind::Message } else { BranchKind::Verse };
        let model = model_id
            .filter(|m| !m.is_empty())
            .or_else(|| Some(parent.model_id.as_str()).filter(|m| !m.is_empty()))
            .unwrap_or(default_model);

        let mut child = Verse::new(model);
        child.parent_id = Some(parent_id);
        child.branch_source_message_id = source_message_id;
        child.branch_kind = Some(kind);
        child.system_prompt.clone_from(&parent.system_prompt);
        #[allow(clippy::cast_precision_loss)]
        let stagger = self.branches(parent_id).len() as f64 * BRANCH_STAGGER_Y;
        child.position =
            Point::new(parent.position.x + parent.size.width + BRANCH_OFFSET_X, parent.position.y + stagger);
        let seed = child.next_message(Role::System, kind.seed_text(&parent.name));
        child.chat_history.push(seed);

        self.insert(child.clone())?;
        debug!(
            %parent_id,
            verse_id = %child.id,
            kind = ?kind,
            "verse: branch created"
        );
        Ok(child)
    }
}

#[cfg(test)]
#[path = "branch_test.rs"]
mod tests;
