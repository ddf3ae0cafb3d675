//! kogura - Task Planning Library
//!
//! This library provides the core functionality for the kogura CLI:
//! turning one sentence into a task and keeping tasks in day buckets.
//!
//! # Core Concepts
//!
//! - **Task records**: structured activities derived from user text
//! - **Buckets**: tasks sharing a calendar date in one fixed zone
//! - **Collapse**: past days are hidden unless expanded
//! - **Moves**: relocating a task between (day, position) pairs
//!
//! # Module Organization
//!
//! - `cli`: Command-line interface using clap
//! - `config`: Configuration loading from `kogura.toml`
//! - `error`: Error types and result aliases
//! - `events`: JSONL event output
//! - `interpret`: Text to task draft via a chat-completions endpoint
//! - `output`: Shared human/JSON output
//! - `planner`: Session over loaded state and its store
//! - `reorder`: Cross-day move algorithm
//! - `schedule`: Day grouping, ordering and collapse rules
//! - `state`: Versioned state and the command reducer
//! - `storage`: Key-value persistence of tasks and collapse state
//! - `task`: Task records, drafts and ids

pub mod cli;
pub mod config;
pub mod error;
pub mod events;
pub mod interpret;
pub mod output;
pub mod planner;
pub mod reorder;
pub mod schedule;
pub mod state;
pub mod storage;
pub mod task;

pub use error::{Error, Result};
