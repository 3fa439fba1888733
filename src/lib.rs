//! Verse canvas server.
//!
//! ARCHITECTURE
//! ============
//! `verse` is the pure core: the verse forest, branching, context assembly,
//! and the mutation API. `llm` is the inference gateway and its provider
//! clients. `services` combine the two against live per-canvas state and
//! Postgres, and `routes` exposes them over HTTP.

pub mod config;
pub mod db;
pub mod error;
pub mod llm;
pub mod routes;
pub mod services;
pub mod state;
pub mod verse;
