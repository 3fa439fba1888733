//! Canvas service — document store, hydration, and whole-canvas operations.
//!
//! DESIGN
//! ======
//! A canvas is persisted as one JSONB document per row. It is hydrated into
//! `AppState::canvases` on first access and stays in memory; every mutation
//! marks it dirty and the persistence task writes the whole document back.
//! Save and load are whole-document: load replaces the entire collection,
//! save serializes all of it.
//!
//! ERROR HANDLING
//! ==============
//! A flush clears the dirty flag only if no mutation landed while the write
//! was in flight (revision check). A failed write leaves the flag set so the
//! next cycle retries.
//!
//! Writes and deletes both hold `AppState::persist_lock`. A write re-checks
//! under it that the canvas is still live, so a snapshot taken before a
//! delete is discarded instead of upserted back into the table.

use serde::Serialize;
use sqlx::PgPool;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::ErrorCode;
use crate::state::{AppState, CanvasDocument, CanvasState, CanvasView};
use crate::verse::{Point, VerseError, VerseId};

// =============================================================================
// TYPES
// =============================================================================

#[derive(Debug, thiserror::Error)]
pub enum CanvasError {
    #[error("canvas not found: {0}")]
    NotFound(Uuid),
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("document serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error(transparent)]
    Verse(#[from] VerseError),
}

impl ErrorCode for CanvasError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::NotFound(_) => "E_CANVAS_NOT_FOUND",
            Self::Database(_) => "E_DATABASE",
            Self::Serialization(_) => "E_SERIALIZATION",
            Self::Verse(e) => e.error_code(),
        }
    }

    fn retryable(&self) -> bool {
        matches!(self, Self::Database(_))
    }
}

/// Row returned from canvas listings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CanvasSummary {
    pub id: Uuid,
    pub title: String,
    pub last_modified: i64,
}

// =============================================================================
// STORE
// =============================================================================

/// Load one document by id.
///
/// # Errors
///
/// Returns `NotFound` if no row exists, or a database/serialization error.
pub async fn load_canvas(pool: &PgPool, canvas_id: Uuid) -> Result<CanvasDocument, CanvasError> {
    let row = sqlx::query_as::<_, (serde_json::Value,)>("SELECT document FROM canvases WHERE id = $1")
        .bind(canvas_id)
        .fetch_optional(pool)
        .await?;

    let Some((document,)) = row else {
        return Err(CanvasError::NotFound(canvas_id));
    };
    let mut document: CanvasDocument = serde_json::from_value(document)?;
    document.id = canvas_id;
    Ok(document)
}

/// Insert or replace a document.
///
/// # Errors
///
/// Returns a database or serialization error.
pub async fn save_canvas(pool: &PgPool, document: &CanvasDocument) -> Result<(), CanvasError> {
    let json = serde_json::to_value(document)?;
    sqlx::query(
        "INSERT INTO canvases (id, owner_key, title, document, last_modified)
         VALUES ($1, $2, $3, $4, to_timestamp($5::double precision / 1000.0))
         ON CONFLICT (id) DO UPDATE SET
            owner_key = EXCLUDED.owner_key,
            title = EXCLUDED.title,
            document = EXCLUDED.document,
            last_modified = EXCLUDED.last_modified",
    )
    .bind(document.id)
    .bind(&document.owner_key)
    .bind(&document.title)
    .bind(json)
    .bind(document.last_modified)
    .execute(pool)
    .await?;
    Ok(())
}

/// List an owner's documents, newest first.
///
/// # Errors
///
/// Returns a database error if the query fails.
pub async fn list_canvases(pool: &PgPool, owner_key: &str) -> Result<Vec<CanvasSummary>, CanvasError> {
    let rows = sqlx::query_as::<_, (Uuid, String, i64)>(
        "SELECT id, title, (extract(epoch FROM last_modified) * 1000)::bigint
         FROM canvases
         WHERE owner_key = $1
         ORDER BY last_modified DESC",
    )
    .bind(owner_key)
    .fetch_all(pool)
    .await?;

    Ok(rows
        .into_iter()
        .map(|(id, title, last_modified)| CanvasSummary { id, title, last_modified })
        .collect())
}

/// Delete a document owned by `owner_key`.
///
/// # Errors
///
/// Returns `NotFound` if nothing matched, or a database error.
pub async fn delete_canvas(pool: &PgPool, canvas_id: Uuid, owner_key: &str) -> Result<(), CanvasError> {
    let result = sqlx::query("DELETE FROM canvases WHERE id = $1 AND owner_key = $2")
        .bind(canvas_id)
        .bind(owner_key)
        .execute(pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(CanvasError::NotFound(canvas_id));
    }
    Ok(())
}

// =============================================================================
// LIVE STATE
// =============================================================================

/// Make sure a canvas is in memory, hydrating it from Postgres if needed.
///
/// # Errors
///
/// Returns `NotFound` if the canvas is neither live nor stored.
pub async fn ensure_loaded(state: &AppState, canvas_id: Uuid) -> Result<(), CanvasError> {
    if state.canvases.read().await.contains_key(&canvas_id) {
        return Ok(());
    }

    // Fetch outside the lock; apply only if nobody hydrated it meanwhile.
    let document = load_canvas(&state.pool, canvas_id).await?;
    let mut canvases = state.canvases.write().await;
    canvases.entry(canvas_id).or_insert_with(|| {
        info!(%canvas_id, verses = document.verses.len(), "canvas: hydrated from database");
        CanvasState::new(document)
    });
    Ok(())
}

/// Run `f` against a live canvas under the write lock.
///
/// # Errors
///
/// Returns `NotFound` if the canvas is not loaded, or whatever `f` returns.
pub async fn with_canvas_mut<T>(
    state: &AppState,
    canvas_id: Uuid,
    f: impl FnOnce(&mut CanvasState) -> Result<T, CanvasError>,
) -> Result<T, CanvasError> {
    let mut canvases = state.canvases.write().await;
    let canvas = canvases
        .get_mut(&canvas_id)
        .ok_or(CanvasError::NotFound(canvas_id))?;
    f(canvas)
}

/// Run `f` against a live canvas under the read lock.
///
/// # Errors
///
/// Returns `NotFound` if the canvas is not loaded, or whatever `f` returns.
pub async fn with_canvas<T>(
    state: &AppState,
    canvas_id: Uuid,
    f: impl FnOnce(&CanvasState) -> Result<T, CanvasError>,
) -> Result<T, CanvasError> {
    let canvases = state.canvases.read().await;
    let canvas = canvases.get(&canvas_id).ok_or(CanvasError::NotFound(canvas_id))?;
    f(canvas)
}

/// Create a canvas with one root verse, live and dirty.
///
/// It reaches Postgres on the next persistence cycle or an explicit save.
pub async fn create_canvas(state: &AppState, title: Option<&str>, owner_key: &str) -> CanvasDocument {
    let canvas_id = Uuid::new_v4();
    let default_model = state.config.default_model_id.as_str();
    let title = title
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .unwrap_or("Untitled canvas");

    let mut document = CanvasDocument::new(canvas_id, title, owner_key, default_model);
    let root = document
        .verses
        .create_root(None, None, Point::new(80.0, 80.0), default_model);
    document.active_verse_id = Some(root.id);

    let mut canvas = CanvasState::new(document);
    canvas.touch();
    let document = canvas.document.clone();
    state.canvases.write().await.insert(canvas_id, canvas);

    info!(%canvas_id, owner_key, "canvas: created");
    document
}

/// Snapshot the live document.
///
/// # Errors
///
/// Returns `NotFound` if the canvas cannot be loaded.
pub async fn get_canvas(state: &AppState, canvas_id: Uuid) -> Result<CanvasDocument, CanvasError> {
    ensure_loaded(state, canvas_id).await?;
    with_canvas(state, canvas_id, |canvas| Ok(canvas.document.clone())).await
}

/// Replace the entire document of a canvas, live or not.
///
/// The incoming collection is taken as-is; an `active_verse_id` that does not
/// resolve is dropped. Turns in flight for verses that no longer exist will
/// have their replies discarded.
pub async fn replace_canvas(state: &AppState, canvas_id: Uuid, mut document: CanvasDocument) -> CanvasDocument {
    document.id = canvas_id;
    if document
        .active_verse_id
        .is_some_and(|id| !document.verses.contains(id))
    {
        document.active_verse_id = None;
    }

    let mut canvases = state.canvases.write().await;
    let canvas = canvases
        .entry(canvas_id)
        .or_insert_with(|| CanvasState::new(document.clone()));
    canvas.document = document;
    canvas.touch();
    info!(%canvas_id, verses = canvas.document.verses.len(), "canvas: replaced");
    canvas.document.clone()
}

/// Update the viewport.
///
/// # Errors
///
/// Returns `NotFound` if the canvas cannot be loaded.
pub async fn set_view(state: &AppState, canvas_id: Uuid, view: CanvasView) -> Result<(), CanvasError> {
    ensure_loaded(state, canvas_id).await?;
    with_canvas_mut(state, canvas_id, |canvas| {
        canvas.document.canvas_view = view;
        canvas.touch();
        Ok(())
    })
    .await
}

/// Set the single active verse, or clear it.
///
/// # Errors
///
/// Returns `NotFound` for an unknown canvas, or `VerseNotFound`.
pub async fn set_active_verse(state: &AppState, canvas_id: Uuid, verse_id: Option<VerseId>) -> Result<(), CanvasError> {
    ensure_loaded(state, canvas_id).await?;
    with_canvas_mut(state, canvas_id, |canvas| {
        if let Some(id) = verse_id {
            canvas.document.verses.require(id)?;
        }
        canvas.document.active_verse_id = verse_id;
        canvas.touch();
        Ok(())
    })
    .await
}

/// Write a live canvas to Postgres now.
///
/// Returns `false` when the canvas is not live, so there was nothing to save.
///
/// # Errors
///
/// Returns a database or serialization error; the canvas stays dirty.
pub async fn flush_canvas(state: &AppState, canvas_id: Uuid) -> Result<bool, CanvasError> {
    let snapshot = {
        let canvases = state.canvases.read().await;
        canvases
            .get(&canvas_id)
            .map(|canvas| (canvas.document.clone(), canvas.revision))
    };
    let Some((document, revision)) = snapshot else {
        return Ok(false);
    };
    write_snapshot(state, canvas_id, &document, revision).await
}

/// Upsert a snapshot taken at `revision`, then acknowledge it.
///
/// Returns `false` without touching Postgres if the canvas stopped being
/// live after the snapshot was taken.
pub(crate) async fn write_snapshot(
    state: &AppState,
    canvas_id: Uuid,
    document: &CanvasDocument,
    revision: u64,
) -> Result<bool, CanvasError> {
    let _persist = state.persist_lock.lock().await;
    // EDGE: deleted between snapshot and write; the row must stay gone.
    if !state.canvases.read().await.contains_key(&canvas_id) {
        debug!(%canvas_id, revision, "canvas: snapshot of evicted canvas discarded");
        return Ok(false);
    }
    save_canvas(&state.pool, document).await?;
    mark_flushed(state, canvas_id, revision).await;
    Ok(true)
}

/// Clear the dirty flag if the canvas has not changed since `revision`.
pub(crate) async fn mark_flushed(state: &AppState, canvas_id: Uuid, revision: u64) {
    let mut canvases = state.canvases.write().await;
    let Some(canvas) = canvases.get_mut(&canvas_id) else {
        return;
    };
    // EDGE: keep dirty if the canvas was mutated again after the snapshot.
    if canvas.revision == revision {
        canvas.dirty = false;
    }
}

/// Delete a canvas from memory and from Postgres.
///
/// # Errors
///
/// Returns `NotFound` if the owner has no such stored canvas and it was not
/// live either.
pub async fn remove_canvas(state: &AppState, canvas_id: Uuid, owner_key: &str) -> Result<(), CanvasError> {
    let _persist = state.persist_lock.lock().await;
    let evicted = {
        let mut canvases = state.canvases.write().await;
        match canvases.get(&canvas_id) {
            Some(canvas) if canvas.document.owner_key == owner_key => canvases.remove(&canvas_id).is_some(),
            _ => false,
        }
    };

    match delete_canvas(&state.pool, canvas_id, owner_key).await {
        Ok(()) => {}
        // Created but never flushed: nothing in Postgres to delete.
        Err(CanvasError::NotFound(_)) if evicted => {}
        Err(e) => {
            if evicted {
                warn!(%canvas_id, error = %e, "canvas: evicted from memory but database delete failed");
            }
            return Err(e);
        }
    }
    info!(%canvas_id, "canvas: deleted");
    Ok(())
}

#[cfg(test)]
#[path = "canvas_test.rs"]
mod tests;
