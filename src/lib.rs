//! Markdown preview rendering.
//!
//! Converts markdown into HTML inside mount points of a host document, keeps
//! the mount's stylesheet injected exactly once, and re-renders when the
//! source text changes.

pub mod application;
pub mod config;
pub mod domain;
pub mod infra;
