//! Verse core — entity model, branch engine, context assembler, mutations.
//!
//! ARCHITECTURE
//! ============
//! Everything here is synchronous and free of I/O. A [`VerseCollection`] is
//! the explicit state container for one canvas; services hold it behind the
//! canvas lock and call into these functions, the HTTP layer never touches
//! verse fields directly.

pub mod branch;
pub mod collection;
pub mod context;
pub mod model;
pub mod mutation;

pub use collection::{VerseCollection, VerseError};
pub use context::MAX_ANCESTOR_DEPTH;
pub use model::{
    BoardCard, BoardCards, BranchKind, CardColumn, CardId, ChatMessage, ComponentId, ComponentKind, ContextTurn, MapEdge,
    MapNode, MessageId, Point, Role, Size, SystemMapData, Verse, VerseComponent, VerseId,
};
pub use mutation::VerseOp;
