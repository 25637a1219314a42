use std::io::Write;
use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result, anyhow};
use reunion_board_app::{
    AddTaskForm, BoardConfig, BoardController, BoardEditor, BoardFilterBuilder, BoardLookup,
    BoardSettings, MilestoneForm,
};
use reunion_board_core::date::{era_date, iso, parse_iso_date};
use reunion_board_core::id::{CommentId, SectionId, TaskId};
use reunion_board_core::model::{CellDraft, Comment};
use reunion_board_core::month::MonthId;
use reunion_board_core::status::{CellStatus, UNDETERMINED_LABEL};
use reunion_board_core::BoardFilter;
use reunion_board_store::MemoryStore;
use time::{Date, OffsetDateTime};
use tracing::info;

use crate::render;
use crate::{Command, CommentCommand};

/// Board opened from a working directory: store, live snapshot and editor.
pub struct BoardSession {
    editor: BoardEditor<Arc<MemoryStore>>,
    settings: BoardSettings,
}

impl BoardSession {
    /// Load configuration and the data file under `workdir`.
    pub async fn open(workdir: &Path) -> Result<Self> {
        let config = BoardConfig::from_workdir(workdir)?;
        let data_path = config.data_path(workdir);
        let store = MemoryStore::open(&data_path)
            .with_context(|| format!("failed to open {}", data_path.display()))?;
        let store = Arc::new(store);
        let board = Arc::new(BoardController::load(&store).await?);
        info!(path = %data_path.display(), "Opened board");

        let settings = config.board;
        let editor = BoardEditor::new(store, board, settings.author());
        Ok(Self { editor, settings })
    }

    const fn board(&self) -> &Arc<BoardController> {
        self.editor.board()
    }

    fn resolve_task(&self, needle: &str) -> Result<TaskId> {
        self.board()
            .with_snapshot(|snapshot| snapshot.find_task(needle).map(|view| view.task.id.clone()))
            .ok_or_else(|| anyhow!("unknown task: {needle}"))
    }

    fn resolve_section(&self, needle: &str) -> Result<SectionId> {
        self.board()
            .with_snapshot(|snapshot| {
                snapshot
                    .find_section(needle)
                    .map(|view| view.section.id.clone())
            })
            .ok_or_else(|| anyhow!("unknown section: {needle}"))
    }
}

#[allow(clippy::too_many_lines)]
pub async fn run(session: &BoardSession, command: Command, out: &mut impl Write) -> Result<()> {
    let editor = &session.editor;
    match command {
        Command::Show { search, status } => {
            let filter = build_filter(search, status.as_deref())?;
            let today = OffsetDateTime::now_utc().date();
            handle_show(session, &filter, today, out)?;
        }
        Command::AddSection { name, color } => {
            let section = editor.add_section(&name, color.as_deref()).await?;
            writeln!(out, "created section: {} ({})", section.name, section.id)?;
        }
        Command::AddTask {
            section,
            name,
            due,
            month,
            content,
        } => {
            let mut form = AddTaskForm::new(session.resolve_section(&section)?, name);
            form.due_date = parse_date(due.as_deref())?;
            form.month_id = month.map(parse_month).transpose()?;
            form.content = content.as_deref().and_then(CellStatus::parse);
            let view = editor.add_task(&form).await?;
            writeln!(out, "created task: {} ({})", view.task.name, view.task.id)?;
        }
        Command::Cell {
            task,
            month,
            content,
            assignee,
            memo,
            date,
        } => {
            let mut draft = CellDraft::new(session.resolve_task(&task)?, parse_month(month)?);
            draft.content = content.as_deref().and_then(CellStatus::parse);
            draft.assignee = assignee;
            draft.memo = memo;
            draft.cell_date = parse_date(date.as_deref())?;
            let cell = editor.save_cell(&draft).await?;
            let label = cell
                .content
                .as_ref()
                .map_or(UNDETERMINED_LABEL, CellStatus::as_str);
            writeln!(out, "saved cell: {task} {} = {label}", cell.month_id.month().label)?;
        }
        Command::ShowCell { task, month } => {
            handle_show_cell(session, &session.resolve_task(&task)?, parse_month(month)?, out).await?;
        }
        Command::ClearCell { task, month } => {
            let month = parse_month(month)?;
            if editor.clear_cell(&session.resolve_task(&task)?, month).await? {
                writeln!(out, "cleared cell: {task} {}", month.month().label)?;
            } else {
                writeln!(out, "no cell at {task} {}", month.month().label)?;
            }
        }
        Command::Milestone { month, text, main } => {
            let milestone = editor
                .save_milestone(&MilestoneForm {
                    month_id: parse_month(month)?,
                    text: text.unwrap_or_default(),
                    is_main: main,
                })
                .await?;
            writeln!(out, "saved milestone: {}", milestone.month_id.month().label)?;
        }
        Command::ClearMilestone { month } => {
            let month = parse_month(month)?;
            editor.clear_milestone(month).await?;
            writeln!(out, "cleared milestone: {}", month.month().label)?;
        }
        Command::Due { task, date } => {
            let due = parse_date(date.as_deref())?;
            editor.set_due_date(&session.resolve_task(&task)?, due).await?;
            match due {
                Some(due) => writeln!(out, "due: {task} {}", iso(due))?,
                None => writeln!(out, "due cleared: {task}")?,
            }
        }
        Command::RenameTask { task, name } => {
            editor.rename_task(&session.resolve_task(&task)?, &name).await?;
            writeln!(out, "renamed task: {task} -> {}", name.trim())?;
        }
        Command::RenameSection { section, name } => {
            editor
                .rename_section(&session.resolve_section(&section)?, &name)
                .await?;
            writeln!(out, "renamed section: {section} -> {}", name.trim())?;
        }
        Command::ToggleSection { section } => {
            let is_open = editor
                .toggle_section(&session.resolve_section(&section)?)
                .await?;
            let state = if is_open { "open" } else { "closed" };
            writeln!(out, "section {section}: {state}")?;
        }
        Command::DeleteTask { task } => {
            editor.delete_task(&session.resolve_task(&task)?).await?;
            writeln!(out, "deleted task: {task}")?;
        }
        Command::Comment { action } => handle_comment(session, action, out).await?,
    }
    Ok(())
}

fn handle_show(
    session: &BoardSession,
    filter: &BoardFilter,
    today: Date,
    out: &mut impl Write,
) -> Result<()> {
    session.board().with_projection(filter, |projection| -> Result<()> {
        render::render_board(out, projection, &session.settings, today)?;
        if !filter.is_empty() && projection.visible_tasks() == 0 {
            writeln!(out, "No tasks matched the provided filters")?;
        }
        Ok(())
    })
}

async fn handle_show_cell(
    session: &BoardSession,
    task_id: &TaskId,
    month: MonthId,
    out: &mut impl Write,
) -> Result<()> {
    let (task, cell) = session
        .board()
        .with_snapshot(|snapshot| {
            let view = snapshot.task(task_id)?;
            Some((view.task.clone(), view.cell(month).cloned()))
        })
        .ok_or_else(|| anyhow!("unknown task: {task_id}"))?;

    let or_dash = |value: Option<String>| value.unwrap_or_else(|| "-".to_owned());
    writeln!(out, "{} {}", task.name, month.month().label)?;
    writeln!(out, "due: {}", or_dash(task.due_date.map(era_date)))?;
    let status = cell
        .as_ref()
        .and_then(|cell| cell.content.as_ref())
        .map_or(UNDETERMINED_LABEL, CellStatus::as_str);
    writeln!(out, "status: {status}")?;
    writeln!(out, "assignee: {}", or_dash(cell.as_ref().and_then(|cell| cell.assignee.clone())))?;
    writeln!(out, "memo: {}", or_dash(cell.as_ref().and_then(|cell| cell.memo.clone())))?;
    writeln!(out, "date: {}", or_dash(cell.as_ref().and_then(|cell| cell.cell_date).map(era_date)))?;

    let comments = session.editor.comments(task.id, month).list().await?;
    writeln!(out, "comments: {}", comments.len())?;
    for comment in &comments {
        write_comment(out, comment)?;
    }
    Ok(())
}

fn write_comment(out: &mut impl Write, comment: &Comment) -> Result<()> {
    writeln!(
        out,
        "{} | {} | {} | {}",
        comment.id,
        iso(comment.created_at.date()),
        comment.author,
        comment.text
    )?;
    Ok(())
}

async fn handle_comment(
    session: &BoardSession,
    action: CommentCommand,
    out: &mut impl Write,
) -> Result<()> {
    match action {
        CommentCommand::Add { task, month, message } => {
            let thread = session
                .editor
                .comments(session.resolve_task(&task)?, parse_month(month)?);
            let comment = thread.add(&message).await?;
            writeln!(out, "commented: {} ({})", comment.id, comment.author)?;
        }
        CommentCommand::List { task, month } => {
            let thread = session
                .editor
                .comments(session.resolve_task(&task)?, parse_month(month)?);
            let comments = thread.list().await?;
            if comments.is_empty() {
                writeln!(out, "No comments")?;
            }
            for comment in &comments {
                write_comment(out, comment)?;
            }
        }
        CommentCommand::Rm { task, month, id } => {
            let month = parse_month(month)?;
            let thread = session.editor.comments(session.resolve_task(&task)?, month);
            let id = CommentId::from(id.as_str());
            if !thread.list().await?.iter().any(|comment| comment.id == id) {
                return Err(anyhow!("comment {id} is not on {task} {}", month.month().label));
            }
            thread.delete(&id).await?;
            writeln!(out, "deleted comment: {id}")?;
        }
    }
    Ok(())
}

fn build_filter(search: Option<String>, status: Option<&str>) -> Result<BoardFilter> {
    let builder = BoardFilterBuilder::new()
        .with_text(search)
        .with_status(status)
        .map_err(|err| anyhow!(err.describe_user_facing()))?;
    Ok(builder.build())
}

fn parse_month(raw: i64) -> Result<MonthId> {
    MonthId::new(raw).with_context(|| format!("Invalid month: {raw}"))
}

fn parse_date(raw: Option<&str>) -> Result<Option<Date>> {
    raw.map(|raw| parse_iso_date(raw).with_context(|| format!("Invalid date: {raw}")))
        .transpose()
}

#[cfg(test)]
mod tests {
    use super::*;
    use reunion_board_core::StatusFilter;
    use reunion_board_core::month::MONTHS;
    use std::fs;
    use tempfile::tempdir;
    use time::macros::date;

    fn output(buffer: &[u8]) -> String {
        String::from_utf8_lossy(buffer).into_owned()
    }

    async fn exec(session: &BoardSession, command: Command) -> Result<String> {
        let mut out = Vec::new();
        run(session, command, &mut out).await?;
        Ok(output(&out))
    }

    async fn seeded(workdir: &Path) -> Result<BoardSession> {
        let session = BoardSession::open(workdir).await?;
        exec(
            &session,
            Command::AddSection {
                name: "準備".into(),
                color: None,
            },
        )
        .await?;
        exec(
            &session,
            Command::AddTask {
                section: "準備".into(),
                name: "会場予約".into(),
                due: Some("2026-02-14".into()),
                month: Some(3),
                content: Some("予定".into()),
            },
        )
        .await?;
        Ok(session)
    }

    #[tokio::test]
    async fn edits_persist_across_sessions() -> Result<()> {
        let dir = tempdir()?;
        let session = seeded(dir.path()).await?;
        let saved = exec(
            &session,
            Command::Cell {
                task: "会場予約".into(),
                month: 3,
                content: Some("済".into()),
                assignee: Some("佐藤".into()),
                memo: None,
                date: Some("2025-12-05".into()),
            },
        )
        .await?;
        assert_eq!(saved, "saved cell: 会場予約 R7.12 = 済\n");
        exec(
            &session,
            Command::Milestone {
                month: 13,
                text: Some("同窓会".into()),
                main: true,
            },
        )
        .await?;
        assert!(dir.path().join(".reunion-board/board.json").exists());

        let reopened = BoardSession::open(dir.path()).await?;
        let snapshot = reopened.board().snapshot();
        let view = snapshot
            .find_task("会場予約")
            .unwrap_or_else(|| panic!("task must persist"));
        assert_eq!(view.task.due_date, Some(date!(2026 - 2 - 14)));
        assert!(view.is_completed());
        assert_eq!(view.cells[0].assignee.as_deref(), Some("佐藤"));
        assert_eq!(snapshot.milestones.len(), 1);
        Ok(())
    }

    #[tokio::test]
    async fn show_renders_filtered_board() -> Result<()> {
        let dir = tempdir()?;
        let session = seeded(dir.path()).await?;

        let mut out = Vec::new();
        let filter = build_filter(Some("会場".into()), Some("予定"))?;
        handle_show(&session, &filter, date!(2026 - 10 - 7), &mut out)?;
        let text = output(&out);
        assert!(text.starts_with("あと 10 日 (2026-10-17) | 進捗 0/1 (0%)"));
        assert!(text.contains("会場予約"));

        let mut out = Vec::new();
        let filter = build_filter(None, Some("済"))?;
        handle_show(&session, &filter, date!(2026 - 10 - 7), &mut out)?;
        let text = output(&out);
        assert!(!text.contains("会場予約"));
        assert!(text.ends_with("No tasks matched the provided filters\n"));
        Ok(())
    }

    #[tokio::test]
    async fn comments_use_configured_author() -> Result<()> {
        let dir = tempdir()?;
        fs::create_dir_all(dir.path().join(".reunion-board"))?;
        fs::write(
            dir.path().join(".reunion-board/config.toml"),
            "[board]\nauthor = \"幹事\"\n",
        )?;
        let session = seeded(dir.path()).await?;

        let added = exec(
            &session,
            Command::Comment {
                action: CommentCommand::Add {
                    task: "会場予約".into(),
                    month: 3,
                    message: "見積もり依頼済み".into(),
                },
            },
        )
        .await?;
        assert!(added.ends_with("(幹事)\n"));

        let listed = exec(
            &session,
            Command::Comment {
                action: CommentCommand::List {
                    task: "会場予約".into(),
                    month: 3,
                },
            },
        )
        .await?;
        assert!(listed.contains("| 幹事 | 見積もり依頼済み"));
        Ok(())
    }

    #[tokio::test]
    async fn show_cell_prints_details_with_era_dates() -> Result<()> {
        let dir = tempdir()?;
        let session = seeded(dir.path()).await?;
        exec(
            &session,
            Command::Cell {
                task: "会場予約".into(),
                month: 3,
                content: Some("済".into()),
                assignee: Some("佐藤".into()),
                memo: Some("手付金支払い済み".into()),
                date: Some("2025-12-05".into()),
            },
        )
        .await?;
        exec(
            &session,
            Command::Comment {
                action: CommentCommand::Add {
                    task: "会場予約".into(),
                    month: 3,
                    message: "見積もり依頼済み".into(),
                },
            },
        )
        .await?;

        let shown = exec(&session, Command::ShowCell { task: "会場予約".into(), month: 3 }).await?;
        let lines: Vec<&str> = shown.lines().collect();
        assert_eq!(
            lines[..7],
            [
                "会場予約 R7.12",
                "due: R8.2.14",
                "status: 済",
                "assignee: 佐藤",
                "memo: 手付金支払い済み",
                "date: R7.12.5",
                "comments: 1",
            ]
        );
        assert!(lines[7].ends_with("| 見積もり依頼済み"));

        let empty = exec(&session, Command::ShowCell { task: "会場予約".into(), month: 4 }).await?;
        assert_eq!(
            empty,
            "会場予約 R8.1\ndue: R8.2.14\nstatus: 未定\nassignee: -\nmemo: -\ndate: -\ncomments: 0\n"
        );
        Ok(())
    }

    #[tokio::test]
    async fn comment_rm_checks_the_slot() -> Result<()> {
        let dir = tempdir()?;
        let session = seeded(dir.path()).await?;
        exec(
            &session,
            Command::Comment {
                action: CommentCommand::Add {
                    task: "会場予約".into(),
                    month: 3,
                    message: "見積もり依頼済み".into(),
                },
            },
        )
        .await?;
        let task_id = session.resolve_task("会場予約")?;
        let comments = session
            .editor
            .comments(task_id.clone(), parse_month(3)?)
            .list()
            .await?;
        let id = comments[0].id.to_string();

        let Err(err) = exec(
            &session,
            Command::Comment {
                action: CommentCommand::Rm {
                    task: "会場予約".into(),
                    month: 4,
                    id: id.clone(),
                },
            },
        )
        .await
        else {
            panic!("comment from another month must not be deleted");
        };
        assert!(err.to_string().contains("is not on 会場予約 R8.1"));
        assert_eq!(
            session.editor.comments(task_id.clone(), parse_month(3)?).list().await?.len(),
            1
        );

        let deleted = exec(
            &session,
            Command::Comment {
                action: CommentCommand::Rm {
                    task: "会場予約".into(),
                    month: 3,
                    id: id.clone(),
                },
            },
        )
        .await?;
        assert_eq!(deleted, format!("deleted comment: {id}\n"));
        assert!(session.editor.comments(task_id, parse_month(3)?).list().await?.is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn unknown_names_and_months_are_errors() -> Result<()> {
        let dir = tempdir()?;
        let session = seeded(dir.path()).await?;

        let Err(err) = exec(&session, Command::DeleteTask { task: "存在しない".into() }).await else {
            panic!("unknown task should error");
        };
        assert!(err.to_string().contains("unknown task"));

        let Err(err) = exec(&session, Command::ClearMilestone { month: 14 }).await else {
            panic!("month off the axis should error");
        };
        assert!(err.to_string().contains("Invalid month: 14"));
        Ok(())
    }

    #[tokio::test]
    async fn toggle_and_clear_report_state() -> Result<()> {
        let dir = tempdir()?;
        let session = seeded(dir.path()).await?;

        let toggled = exec(&session, Command::ToggleSection { section: "準備".into() }).await?;
        assert_eq!(toggled, "section 準備: closed\n");

        let cleared = exec(&session, Command::ClearCell { task: "会場予約".into(), month: 3 }).await?;
        assert_eq!(cleared, "cleared cell: 会場予約 R7.12\n");
        let again = exec(&session, Command::ClearCell { task: "会場予約".into(), month: 3 }).await?;
        assert_eq!(again, "no cell at 会場予約 R7.12\n");

        let due = exec(&session, Command::Due { task: "会場予約".into(), date: None }).await?;
        assert_eq!(due, "due cleared: 会場予約\n");
        Ok(())
    }

    #[test]
    fn build_filter_rejects_unknown_status() {
        let Err(err) = build_filter(None, Some("later")) else {
            panic!("expected invalid status error");
        };
        assert!(err.to_string().contains("ステータス"));

        let filter = build_filter(Some(String::new()), None).unwrap_or_else(|err| panic!("{err}"));
        assert!(filter.text.is_none());
        assert_eq!(filter.status, StatusFilter::All);
    }

    #[test]
    fn parse_helpers_validate_input() -> Result<()> {
        assert_eq!(parse_month(1)?, MONTHS[0].id);
        assert!(parse_month(0).is_err());
        assert_eq!(parse_date(None)?, None);
        assert_eq!(parse_date(Some("2026-10-17"))?, Some(date!(2026 - 10 - 17)));
        assert!(parse_date(Some("2026/10/17")).is_err());
        Ok(())
    }
}
