//! Domain services used by HTTP routes.
//!
//! ARCHITECTURE
//! ============
//! Service modules own business logic, locking, and persistence concerns so
//! route handlers can stay focused on request translation and auth plumbing.

pub mod canvas;
pub mod chat;
pub mod extraction;
pub mod persistence;
pub mod verses;
