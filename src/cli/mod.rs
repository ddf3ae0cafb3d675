//! Command-line interface for kogura
//!
//! This module defines the CLI structure using clap derive macros.
//! Each group of subcommands is implemented in its own submodule.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::config::{self, Config};
use crate::error::Result;
use crate::events::EventDestination;
use crate::output::OutputOptions;
use crate::planner::Planner;
use crate::storage::{FileStore, Gateway};

mod board;
mod init;
mod task;

/// kogura - one sentence in, one scheduled task out
///
/// Turns free-text activity notes into tasks via an LLM interpreter and keeps
/// them in a date-grouped, reorderable list.
#[derive(Parser, Debug)]
#[command(name = "kogura")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Directory holding tasks, collapse state and kogura.toml
    #[arg(long, global = true, env = "KOGURA_DATA_DIR")]
    pub data_dir: Option<PathBuf>,

    /// Output in JSON format
    #[arg(long, global = true)]
    pub json: bool,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Emit JSONL events for state changes ("-" for stdout)
    #[arg(long, global = true)]
    pub events: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Create the data directory and a default kogura.toml
    Init,

    /// Show the resolved configuration
    Config,

    /// Describe an activity in one sentence and add it as a task
    Add {
        /// The sentence, e.g. "明日14時 会議"
        #[arg(required = true, num_args = 1..)]
        text: Vec<String>,
    },

    /// Show tasks grouped by day
    #[command(alias = "ls")]
    List {
        /// Also show the tasks of collapsed days
        #[arg(long)]
        all: bool,
    },

    /// Edit a task
    Edit {
        /// Task id or unique id suffix
        id: String,

        /// New description
        #[arg(long)]
        content: Option<String>,

        /// New local date and time ("YYYY-MM-DD HH:MM")
        #[arg(long)]
        datetime: Option<String>,

        /// New type: task, schedule, reminder, other
        #[arg(long = "type")]
        task_type: Option<String>,

        /// New duration label, e.g. "01:30" (empty clears)
        #[arg(long)]
        duration: Option<String>,

        /// New memo (empty clears)
        #[arg(long)]
        memo: Option<String>,
    },

    /// Toggle a task between done and not done
    Done {
        /// Task id or unique id suffix
        id: String,
    },

    /// Delete a task
    Rm {
        /// Task id or unique id suffix
        id: String,

        /// Confirm the deletion
        #[arg(long, short = 'y')]
        yes: bool,
    },

    /// Move a task to a position within the same or another day
    Move {
        /// Day the task is on (YYYY-MM-DD)
        from_date: String,

        /// Position of the task within that day, starting at 1
        #[arg(value_parser = clap::value_parser!(u64).range(1..))]
        from_position: u64,

        /// Target day (YYYY-MM-DD)
        to_date: String,

        /// Target position within the target day, starting at 1
        #[arg(value_parser = clap::value_parser!(u64).range(1..))]
        to_position: u64,
    },

    /// Toggle whether a past day's tasks are hidden
    Collapse {
        /// Day to toggle (YYYY-MM-DD)
        date: String,
    },
}

/// Global options shared by every command.
#[derive(Debug, Clone)]
pub(crate) struct CommonOptions {
    pub data_dir: Option<PathBuf>,
    pub events: Option<String>,
    pub json: bool,
    pub quiet: bool,
}

impl CommonOptions {
    pub fn output(&self) -> OutputOptions {
        OutputOptions {
            json: self.json,
            quiet: self.quiet,
        }
    }

    pub fn resolve_data_dir(&self) -> Result<PathBuf> {
        config::resolve_data_dir(self.data_dir.as_deref())
    }
}

/// An opened data directory.
pub(crate) struct Session {
    pub config: Config,
    pub planner: Planner<FileStore>,
}

pub(crate) fn open_session(common: &CommonOptions) -> Result<Session> {
    let data_dir = common.resolve_data_dir()?;
    let config = Config::load_or_default(&data_dir)?;
    let zone = config.zone()?;
    let events = EventDestination::parse(common.events.as_deref())
        .map(|destination| destination.open())
        .transpose()?;

    tracing::debug!(data_dir = %data_dir.display(), "opening session");
    let planner = Planner::open(Gateway::new(FileStore::new(data_dir), zone), zone)?
        .with_events(events);
    Ok(Session { config, planner })
}

impl Cli {
    /// Execute the CLI command
    pub fn run(self) -> Result<()> {
        let common = CommonOptions {
            data_dir: self.data_dir,
            events: self.events,
            json: self.json,
            quiet: self.quiet,
        };

        match self.command {
            Commands::Init => init::run_init(common),
            Commands::Config => init::run_config(common),
            Commands::Add { text } => task::run_add(task::AddOptions {
                text: text.join(" "),
                common,
            }),
            Commands::List { all } => board::run_list(board::ListOptions { all, common }),
            Commands::Edit {
                id,
                content,
                datetime,
                task_type,
                duration,
                memo,
            } => task::run_edit(task::EditOptions {
                id,
                content,
                datetime,
                task_type,
                duration,
                memo,
                common,
            }),
            Commands::Done { id } => task::run_done(task::DoneOptions { id, common }),
            Commands::Rm { id, yes } => task::run_rm(task::RmOptions { id, yes, common }),
            Commands::Move {
                from_date,
                from_position,
                to_date,
                to_position,
            } => board::run_move(board::MoveOptions {
                from_date,
                from_position,
                to_date,
                to_position,
                common,
            }),
            Commands::Collapse { date } => {
                board::run_collapse(board::CollapseOptions { date, common })
            }
        }
    }
}
