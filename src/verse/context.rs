//! Context assembler — the ancestor transcript prefix sent with every turn.
//!
//! ALGORITHM
//! =========
//! Walk `parent_id` links upward from the target verse. At each ancestor,
//! take its history without system entries, which are branch metadata. If
//! the child we came from was branched at a specific message, cut that
//! filtered history after the message (inclusive), and only at that
//! ancestor. A branch point that is itself a system entry is not in the
//! filtered history, so it cuts nothing. Concatenate the pieces oldest
//! ancestor first.
//!
//! The walk is bounded by [`MAX_ANCESTOR_DEPTH`] and a visited set. A missing
//! ancestor, a cycle, or an overlong chain stops the walk where it is and the
//! context gathered so far is returned. Assembly is a pure read.

use std::collections::HashSet;

use tracing::warn;

use super::collection::{VerseCollection, VerseError};
use super::model::{ChatMessage, ContextTurn, MessageId, Role, Verse, VerseId};

/// Upper bound on the number of ancestors visited for one assembly.
pub const MAX_ANCESTOR_DEPTH: usize = 64;

impl VerseCollection {
    /// Assemble the ancestor context for `verse_id`, oldest turn first.
    /// Root verses get an empty context.
    ///
    /// # Errors
    ///
    /// Returns `VerseNotFound` only when the target verse itself is absent.
    /// Problems further up the chain degrade to a shorter context.
    pub fn assemble_context(&self, verse_id: VerseId) -> Result<Vec<ContextTurn>, VerseError> {
        let target = self.require(verse_id)?;

        // Segments are gathered nearest ancestor first, then reversed.
        let mut segments: Vec<Vec<ContextTurn>> = Vec::new();
        let mut visited = HashSet::from([verse_id]);
        let mut child = target;

        while let Some(parent_id) = child.parent_id {
            if segments.len() >= MAX_ANCESTOR_DEPTH {
                warn!(%verse_id, depth = MAX_ANCESTOR_DEPTH, "context: ancestor chain too deep; truncating");
                break;
            }
            if !visited.insert(parent_id) {
                warn!(%verse_id, %parent_id, "context: cycle in ancestor chain; truncating");
                break;
            }
            let Some(parent) = self.get(parent_id) else {
                warn!(%verse_id, %parent_id, "context: ancestor missing; truncating");
                break;
            };

            segments.push(ancestor_segment(parent, child.branch_source_message_id));
            child = parent;
        }

        Ok(segments.into_iter().rev().flatten().collect())
    }
}

/// One ancestor's contribution: its non-system history up to the branch
/// point. A branch point missing from that history means no truncation.
fn ancestor_segment(ancestor: &Verse, branch_point: Option<MessageId>) -> Vec<ContextTurn> {
    let visible: Vec<&ChatMessage> = ancestor
        .chat_history
        .iter()
        .filter(|m| m.role != Role::System)
        .collect();
    let end = branch_point
        .and_then(|id| visible.iter().position(|m| m.id == id))
        .map_or(visible.len(), |i| i + 1);
    visible[..end].iter().map(|m| ContextTurn::from(*m)).collect()
}

#[cfg(test)]
#[path = "context_test.rs"]
mod tests;
