//! Extraction service — derive an insight board or a system map from a
//! verse transcript.
//!
//! DESIGN
//! ======
//! Extraction is a one-shot completion: the verse transcript is rendered
//! into a single user message under a fixed instruction prompt, and the
//! reply is expected to be one JSON object. The reply is validated and laid
//! out before anything is written; only a fully parsed artifact reaches the
//! verse's cache through the collection setters.
//!
//! ERROR HANDLING
//! ==============
//! Missing arrays default to empty and markdown fences are tolerated. Any
//! other shape mismatch is `ExtractionError::Parse`, in which case the
//! cached artifact is left exactly as it was.

use serde::Deserialize;
use serde_json::Value;
use tracing::{info, warn};
use uuid::Uuid;

use super::canvas::{self, CanvasError};
use crate::error::ErrorCode;
use crate::llm::{CompletionRequest, GatewayError};
use crate::state::AppState;
use crate::verse::mutation::default_component_size;
use crate::verse::{
    BoardCard, BoardCards, CardColumn, CardId, ComponentKind, ContextTurn, MapEdge, MapNode, Point, SystemMapData,
    VerseId,
};

const INSIGHTS_PROMPT: &str = "You analyse conversations. Read the transcript and reply with a single JSON \
object and nothing else, shaped as {\"elaborate\": [], \"problems\": [], \"solutions\": []}. Each item is \
{\"title\": string, \"detail\": string}. \"elaborate\" holds ideas worth expanding, \"problems\" holds risks \
or open issues, \"solutions\" holds concrete proposals.";

const SYSTEM_MAP_PROMPT: &str = "You extract system architecture from conversations. Read the transcript and \
reply with a single JSON object and nothing else, shaped as {\"nodes\": [{\"id\": string, \"label\": string, \
\"type\": string}], \"edges\": [{\"source\": string, \"target\": string, \"label\": string}]}. Edges must \
reference node ids.";

// Board layout, in the board component's local space.
const CARD_WIDTH: f64 = 240.0;
const CARD_HEIGHT: f64 = 120.0;
const COLUMN_GAP: f64 = 24.0;
const ROW_GAP: f64 = 16.0;
const COLUMN_HEADER: f64 = 48.0;

// Map layout.
const NODE_SPACING_X: f64 = 200.0;
const NODE_SPACING_Y: f64 = 140.0;
const MAP_MARGIN: f64 = 40.0;

// Where a freshly attached artifact panel lands in verse space.
const BOARD_PANEL_POSITION: Point = Point { x: 460.0, y: 20.0 };
const MAP_PANEL_POSITION: Point = Point { x: 460.0, y: 560.0 };

// =============================================================================
// ERRORS
// =============================================================================

#[derive(Debug, thiserror::Error)]
pub enum ExtractionError {
    #[error("verse {0} has no conversation to extract from")]
    EmptyTranscript(VerseId),
    #[error(transparent)]
    Gateway(#[from] GatewayError),
    #[error("extraction response did not match the expected shape: {0}")]
    Parse(String),
    #[error(transparent)]
    Canvas(#[from] CanvasError),
}

impl ErrorCode for ExtractionError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::EmptyTranscript(_) => "E_EMPTY_TRANSCRIPT",
            Self::Gateway(e) => e.error_code(),
            Self::Parse(_) => "E_EXTRACTION_PARSE",
            Self::Canvas(e) => e.error_code(),
        }
    }

    fn retryable(&self) -> bool {
        match self {
            Self::Gateway(e) => e.retryable(),
            Self::Canvas(e) => e.retryable(),
            Self::EmptyTranscript(_) | Self::Parse(_) => false,
        }
    }
}

// =============================================================================
// RESPONSE SHAPES
// =============================================================================

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawInsights {
    elaborate: Vec<RawInsight>,
    problems: Vec<RawInsight>,
    solutions: Vec<RawInsight>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawInsight {
    Text(String),
    Item {
        title: String,
        #[serde(default, alias = "description")]
        detail: String,
    },
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawSystemMap {
    nodes: Vec<RawNode>,
    edges: Vec<RawEdge>,
}

#[derive(Debug, Deserialize)]
struct RawNode {
    id: RawId,
    #[serde(default)]
    label: Option<String>,
    #[serde(default, alias = "kind", rename = "type")]
    kind: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawEdge {
    #[serde(alias = "from")]
    source: RawId,
    #[serde(alias = "to")]
    target: RawId,
    #[serde(default)]
    label: Option<String>,
}

/// Models emit node ids as either strings or numbers.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawId {
    Text(String),
    Number(serde_json::Number),
}

impl RawId {
    fn into_string(self) -> String {
        match self {
            Self::Text(s) => s,
            Self::Number(n) => n.to_string(),
        }
    }
}

// =============================================================================
// PARSING
// =============================================================================

/// Pull the JSON object out of a model reply: strip a markdown fence if
/// present, otherwise take the outermost braces.
fn json_payload(raw: &str) -> Option<&str> {
    let trimmed = raw.trim();
    if let Some(start) = trimmed.find("```") {
        let after = &trimmed[start + 3..];
        // Skip an info string such as `json`.
        let body_start = after.find('\n').map_or(0, |i| i + 1);
        let body = &after[body_start..];
        if let Some(end) = body.find("```") {
            return Some(body[..end].trim());
        }
    }
    let start = trimmed.find('{')?;
    let end = trimmed.rfind('}')?;
    (end > start).then(|| &trimmed[start..=end])
}

fn parse_object(raw: &str) -> Result<Value, ExtractionError> {
    let payload = json_payload(raw).ok_or_else(|| ExtractionError::Parse("no JSON object in response".into()))?;
    let value: Value = serde_json::from_str(payload).map_err(|e| ExtractionError::Parse(e.to_string()))?;
    if !value.is_object() {
        return Err(ExtractionError::Parse("top-level value is not an object".into()));
    }
    Ok(value)
}

/// Parse and lay out an insight board.
///
/// # Errors
///
/// Returns `Parse` if the reply holds no JSON object or an array has the
/// wrong item shape.
pub fn parse_insights(raw: &str) -> Result<BoardCards, ExtractionError> {
    let raw: RawInsights =
        serde_json::from_value(parse_object(raw)?).map_err(|e| ExtractionError::Parse(e.to_string()))?;

    let mut cards = Vec::new();
    for (column, items) in [
        (CardColumn::Elaborate, raw.elaborate),
        (CardColumn::Problems, raw.problems),
        (CardColumn::Solutions, raw.solutions),
    ] {
        let mut row = 0;
        for item in items {
            let (title, detail) = match item {
                RawInsight::Text(text) => (text, String::new()),
                RawInsight::Item { title, detail } => (title, detail),
            };
            if title.trim().is_empty() {
                continue;
            }
            row += 1;
            cards.push(BoardCard {
                id: CardId::new(),
                column,
                title: title.trim().to_owned(),
                detail: detail.trim().to_owned(),
                position: card_position(column, row - 1),
            });
        }
    }
    Ok(BoardCards { cards })
}

/// Parse and lay out a system map. Duplicate node ids keep the first node;
/// edges whose endpoints are not nodes are dropped.
///
/// # Errors
///
/// Returns `Parse` if the reply holds no JSON object or a node/edge has the
/// wrong shape.
pub fn parse_system_map(raw: &str) -> Result<SystemMapData, ExtractionError> {
    let raw: RawSystemMap =
        serde_json::from_value(parse_object(raw)?).map_err(|e| ExtractionError::Parse(e.to_string()))?;

    let mut nodes: Vec<MapNode> = Vec::with_capacity(raw.nodes.len());
    for node in raw.nodes {
        let id = node.id.into_string();
        if id.is_empty() || nodes.iter().any(|n| n.id == id) {
            continue;
        }
        nodes.push(MapNode {
            label: node.label.filter(|l| !l.is_empty()).unwrap_or_else(|| id.clone()),
            kind: node.kind.unwrap_or_default(),
            id,
            position: Point::default(),
        });
    }
    let columns = grid_columns(nodes.len());
    for (i, node) in nodes.iter_mut().enumerate() {
        node.position = node_position(i, columns);
    }

    let edges = raw
        .edges
        .into_iter()
        .map(|edge| (edge.source.into_string(), edge.target.into_string(), edge.label))
        .filter(|(source, target, _)| {
            nodes.iter().any(|n| &n.id == source) && nodes.iter().any(|n| &n.id == target)
        })
        .enumerate()
        .map(|(i, (source, target, label))| MapEdge {
            id: format!("edge-{i}"),
            source,
            target,
            label: label.unwrap_or_default(),
        })
        .collect();

    Ok(SystemMapData { nodes, edges })
}

// =============================================================================
// LAYOUT
// =============================================================================

#[allow(clippy::cast_precision_loss)]
fn card_position(column: CardColumn, row: usize) -> Point {
    let col = match column {
        CardColumn::Elaborate => 0.0,
        CardColumn::Problems => 1.0,
        CardColumn::Solutions => 2.0,
    };
    Point::new(col * (CARD_WIDTH + COLUMN_GAP), COLUMN_HEADER + row as f64 * (CARD_HEIGHT + ROW_GAP))
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss, clippy::cast_precision_loss)]
fn grid_columns(count: usize) -> usize {
    ((count as f64).sqrt().ceil() as usize).max(1)
}

#[allow(clippy::cast_precision_loss)]
fn node_position(index: usize, columns: usize) -> Point {
    let col = (index % columns) as f64;
    let row = (index / columns) as f64;
    Point::new(MAP_MARGIN + col * NODE_SPACING_X, MAP_MARGIN + row * NODE_SPACING_Y)
}

// =============================================================================
// REGENERATION
// =============================================================================

fn render_transcript(transcript: &[ContextTurn]) -> String {
    let mut out = String::from("Transcript:\n");
    for turn in transcript {
        let speaker = match turn.role {
            crate::verse::Role::Assistant => "Assistant",
            _ => "User",
        };
        out.push_str(&format!("\n{speaker}: {}", turn.content));
    }
    out
}

/// Snapshot the transcript, run one extraction call, return the raw reply.
async fn run_extraction(
    state: &AppState,
    canvas_id: Uuid,
    verse_id: VerseId,
    prompt: &str,
) -> Result<String, ExtractionError> {
    canvas::ensure_loaded(state, canvas_id).await?;
    let (transcript, model_id) = canvas::with_canvas(state, canvas_id, |canvas| {
        let verse = canvas.document.verses.require(verse_id)?;
        Ok((verse.transcript(), verse.model_id.clone()))
    })
    .await?;
    if transcript.is_empty() {
        return Err(ExtractionError::EmptyTranscript(verse_id));
    }

    let Some(llm) = &state.llm else {
        return Err(GatewayError::Unavailable("no inference provider is configured".into()).into());
    };
    let message = [ContextTurn { role: crate::verse::Role::User, content: render_transcript(&transcript) }];
    let request = CompletionRequest {
        transcript: &message,
        context: None,
        system_prompt: prompt,
        model_id: &model_id,
        max_tokens: state.config.max_tokens,
    };
    Ok(llm.complete(&request).await?)
}

/// Write an artifact and attach its panel if the verse has none yet.
async fn store_artifact(
    state: &AppState,
    canvas_id: Uuid,
    verse_id: VerseId,
    kind: ComponentKind,
    panel_position: Point,
    write: impl FnOnce(&mut crate::verse::VerseCollection) -> Result<(), crate::verse::VerseError>,
) -> Result<(), ExtractionError> {
    canvas::with_canvas_mut(state, canvas_id, |canvas| {
        let verses = &mut canvas.document.verses;
        write(verses)?;
        let has_panel = verses.require(verse_id)?.components.iter().any(|c| c.kind == kind);
        if !has_panel {
            verses.add_component(verse_id, kind, panel_position, default_component_size(kind), Value::Null)?;
        }
        canvas.touch();
        Ok(())
    })
    .await?;
    Ok(())
}

/// Regenerate and cache a verse's insight board.
///
/// # Errors
///
/// Returns `Gateway` or `Parse` without touching the cached board, or a
/// canvas/verse lookup error.
pub async fn regenerate_insights(
    state: &AppState,
    canvas_id: Uuid,
    verse_id: VerseId,
) -> Result<BoardCards, ExtractionError> {
    let raw = run_extraction(state, canvas_id, verse_id, INSIGHTS_PROMPT).await?;
    let board = parse_insights(&raw).inspect_err(|e| {
        warn!(%canvas_id, %verse_id, error = %e, "extract: insight board rejected; cache kept");
    })?;

    let cards = board.clone();
    store_artifact(state, canvas_id, verse_id, ComponentKind::Board, BOARD_PANEL_POSITION, |verses| {
        verses.set_board_cards(verse_id, cards)
    })
    .await?;

    info!(%canvas_id, %verse_id, cards = board.cards.len(), "extract: insight board cached");
    Ok(board)
}

/// Regenerate and cache a verse's system map.
///
/// # Errors
///
/// Returns `Gateway` or `Parse` without touching the cached map, or a
/// canvas/verse lookup error.
pub async fn regenerate_system_map(
    state: &AppState,
    canvas_id: Uuid,
    verse_id: VerseId,
) -> Result<SystemMapData, ExtractionError> {
    let raw = run_extraction(state, canvas_id, verse_id, SYSTEM_MAP_PROMPT).await?;
    let map = parse_system_map(&raw).inspect_err(|e| {
        warn!(%canvas_id, %verse_id, error = %e, "extract: system map rejected; cache kept");
    })?;

    let data = map.clone();
    store_artifact(state, canvas_id, verse_id, ComponentKind::SystemMap, MAP_PANEL_POSITION, |verses| {
        verses.set_system_map_data(verse_id, data)
    })
    .await?;

    info!(%canvas_id, %verse_id, nodes = map.nodes.len(), edges = map.edges.len(), "extract: system map cached");
    Ok(map)
}

#[cfg(test)]
#[path = "extraction_test.rs"]
mod tests;
