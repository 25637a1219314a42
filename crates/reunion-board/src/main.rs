//! CLI entry point for reunion-board.

use std::io;
use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::{EnvFilter, fmt::format::FmtSpan};

mod commands;
mod render;

/// Month-by-month planning board for a reunion committee.
#[derive(Parser, Debug)]
#[command(
    name = "reunion-board",
    version,
    about = "reunion-board: shared scheduling board for a reunion-planning committee"
)]
struct Cli {
    /// Working directory holding `.reunion-board/` (defaults to current).
    #[arg(long)]
    dir: Option<PathBuf>,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Render the board.
    Show {
        /// Case-insensitive task name filter.
        #[arg(long)]
        search: Option<String>,
        /// すべて / 済 / 予定 / 未定 (or all / done / planned / undetermined).
        #[arg(long)]
        status: Option<String>,
    },

    /// Create a section at the end of the board.
    AddSection {
        #[arg(long)]
        name: String,
        #[arg(long)]
        color: Option<String>,
    },

    /// Create a task, optionally with its first cell.
    AddTask {
        /// Section id or name.
        #[arg(long)]
        section: String,
        #[arg(long)]
        name: String,
        /// Deadline as YYYY-MM-DD.
        #[arg(long)]
        due: Option<String>,
        /// Month id (1-13) of the first cell.
        #[arg(long)]
        month: Option<i64>,
        /// Status of the first cell.
        #[arg(long, requires = "month")]
        content: Option<String>,
    },

    /// Save the cell of a task/month slot.
    Cell {
        /// Task id or name.
        #[arg(long)]
        task: String,
        #[arg(long)]
        month: i64,
        /// 済 / 予定 / 未定 or free text.
        #[arg(long)]
        content: Option<String>,
        #[arg(long)]
        assignee: Option<String>,
        #[arg(long)]
        memo: Option<String>,
        /// Execution date as YYYY-MM-DD.
        #[arg(long)]
        date: Option<String>,
    },

    /// Print the cell of a task/month slot with its comments.
    ShowCell {
        /// Task id or name.
        #[arg(long)]
        task: String,
        #[arg(long)]
        month: i64,
    },

    /// Remove the cell of a task/month slot.
    ClearCell {
        #[arg(long)]
        task: String,
        #[arg(long)]
        month: i64,
    },

    /// Save the milestone of a month.
    Milestone {
        #[arg(long)]
        month: i64,
        #[arg(long)]
        text: Option<String>,
        /// Mark the culminating event.
        #[arg(long)]
        main: bool,
    },

    /// Remove the milestone of a month.
    ClearMilestone {
        #[arg(long)]
        month: i64,
    },

    /// Set a task's deadline; omit `--date` to clear it.
    Due {
        #[arg(long)]
        task: String,
        #[arg(long)]
        date: Option<String>,
    },

    /// Rename a task.
    RenameTask {
        #[arg(long)]
        task: String,
        #[arg(long)]
        name: String,
    },

    /// Rename a section.
    RenameSection {
        #[arg(long)]
        section: String,
        #[arg(long)]
        name: String,
    },

    /// Expand or collapse a section.
    ToggleSection {
        #[arg(long)]
        section: String,
    },

    /// Delete a task with its cells and comments.
    DeleteTask {
        #[arg(long)]
        task: String,
    },

    /// Comments on a task/month slot.
    Comment {
        #[command(subcommand)]
        action: CommentCommand,
    },
}

#[derive(Subcommand, Debug)]
enum CommentCommand {
    /// Append a comment.
    Add {
        #[arg(long)]
        task: String,
        #[arg(long)]
        month: i64,
        #[arg(long)]
        message: String,
    },
    /// List comments oldest first.
    List {
        #[arg(long)]
        task: String,
        #[arg(long)]
        month: i64,
    },
    /// Delete a comment.
    Rm {
        #[arg(long)]
        task: String,
        #[arg(long)]
        month: i64,
        #[arg(long)]
        id: String,
    },
}

fn main() -> Result<()> {
    let Cli { dir, cmd } = Cli::parse();
    install_tracing();

    let workdir = dir.unwrap_or_else(|| PathBuf::from("."));
    tokio::runtime::Runtime::new()?.block_on(async move {
        let session = commands::BoardSession::open(&workdir).await?;
        commands::run(&session, cmd, &mut io::stdout().lock()).await
    })
}

fn install_tracing() {
    // RUST_LOG で上書きできる。デフォルトは INFO。
    let filter = EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into());
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_span_events(FmtSpan::NONE)
        .with_writer(io::stderr)
        .compact()
        .try_init();
}
