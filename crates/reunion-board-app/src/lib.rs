//! Application layer logic for the reunion board.
//!
//! This crate provides the store abstraction, snapshot loading, the live state container,
//! editors, configuration, and filter helpers shared by user-facing surfaces.

pub mod config;
pub mod controller;
pub mod editor;
pub mod filter_util;
pub mod loader;
pub mod remote_store;

// Re-exports for convenience
pub use config::{BoardConfig, BoardSettings};
pub use controller::{BoardController, Subscription};
pub use editor::{AddTaskForm, BoardEditor, BoardLookup, CommentThread, EditorError, MilestoneForm};
pub use filter_util::{BoardFilterBuilder, FilterBuildError, parse_status_token};
pub use loader::load_snapshot;
pub use remote_store::RemoteStore;
