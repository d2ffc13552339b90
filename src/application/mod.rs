//! Application services: the render pipeline, the change watcher, and the
//! document contract they write through.

pub mod document;
pub mod error;
pub mod render;
pub mod watch;
