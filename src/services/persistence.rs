//! Persistence service — background flush for dirty canvases.
//!
//! DESIGN
//! ======
//! A background task flushes every dirty canvas, then sleeps for
//! `CANVAS_FLUSH_INTERVAL_MS` before the next cycle. Each flush writes the
//! whole document; there is no partial update.
//!
//! ERROR HANDLING
//! ==============
//! Dirty flags are cleared only after a successful write, and only if the
//! canvas revision did not move while the write was in flight. A failed
//! write is logged and retried on the next cycle. A canvas deleted after
//! its snapshot was taken is skipped, not written back.

use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{debug, error, info};
use uuid::Uuid;

use super::canvas;
use crate::state::{AppState, CanvasDocument};

/// Spawn the background persistence task. Returns a handle for shutdown.
pub fn spawn_persistence_task(state: AppState) -> JoinHandle<()> {
    let flush_interval_ms = state.config.flush_interval_ms;
    info!(flush_interval_ms, "persistence: canvas flush configured");
    tokio::spawn(async move {
        loop {
            flush_all_dirty(&state).await;
            tokio::time::sleep(Duration::from_millis(flush_interval_ms)).await;
        }
    })
}

#[derive(Debug)]
struct DirtySnapshot {
    canvas_id: Uuid,
    document: CanvasDocument,
    revision: u64,
}

/// Flush every dirty canvas once. Returns how many were written.
pub(crate) async fn flush_all_dirty(state: &AppState) -> usize {
    // PHASE: SNAPSHOT DIRTY CANVASES
    let snapshots: Vec<DirtySnapshot> = {
        let canvases = state.canvases.read().await;
        canvases
            .iter()
            .filter(|(_, canvas)| canvas.dirty)
            .map(|(canvas_id, canvas)| DirtySnapshot {
                canvas_id: *canvas_id,
                document: canvas.document.clone(),
                revision: canvas.revision,
            })
            .collect()
    };

    // PHASE: WRITE + ACK
    let mut written = 0;
    for snapshot in snapshots {
        match canvas::write_snapshot(state, snapshot.canvas_id, &snapshot.document, snapshot.revision).await {
            Ok(false) => {}
            Ok(true) => {
                written += 1;
                debug!(canvas_id = %snapshot.canvas_id, revision = snapshot.revision, "persistence: canvas flushed");
            }
            Err(e) => {
                error!(error = %e, canvas_id = %snapshot.canvas_id, "persistence: flush failed; will retry");
            }
        }
    }
    written
}

#[cfg(test)]
#[path = "persistence_test.rs"]
mod tests;
