//! Editors: remote write first, then fold the confirmed row into the board.

use std::sync::Arc;

use anyhow::Error;
use reunion_board_core::event::BoardChange;
use reunion_board_core::id::{CommentId, SectionId, TaskId};
use reunion_board_core::model::{
    CellDraft, Comment, Milestone, NewComment, NewSection, NewTask, Section, SectionPatch,
    TaskCell, TaskPatch,
};
use reunion_board_core::month::MonthId;
use reunion_board_core::status::CellStatus;
use reunion_board_core::{BoardSnapshot, BoardUpdate, SectionView, TaskView};
use thiserror::Error;
use time::Date;
use tracing::{info, warn};

use crate::controller::BoardController;
use crate::remote_store::RemoteStore;

/// Errors returned by editor actions. The board is unchanged whenever one is returned.
#[derive(Debug, Error)]
pub enum EditorError {
    /// Task names must contain non-whitespace text.
    #[error("task name must not be empty")]
    EmptyTaskName,
    /// Section names must contain non-whitespace text.
    #[error("section name must not be empty")]
    EmptySectionName,
    /// Comments must contain non-whitespace text.
    #[error("comment must not be empty")]
    EmptyComment,
    /// Section is not on the board.
    #[error("section {0} not found")]
    UnknownSection(SectionId),
    /// Task is not on the board.
    #[error("task {0} not found")]
    UnknownTask(TaskId),
    /// Backing store returned an error.
    #[error("store error: {0}")]
    Store(#[from] Error),
}

fn store_error<E: Into<Error>>(err: E) -> EditorError {
    EditorError::Store(err.into())
}

/// Input of the Add Task editor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AddTaskForm {
    /// Target section.
    pub section_id: SectionId,
    /// Task name; trimmed before saving.
    pub name: String,
    /// Optional deadline.
    pub due_date: Option<Date>,
    /// Month of the optional initial cell.
    pub month_id: Option<MonthId>,
    /// Status of the initial cell.
    pub content: Option<CellStatus>,
}

impl AddTaskForm {
    /// Form with only the required fields.
    pub fn new(section_id: SectionId, name: impl Into<String>) -> Self {
        Self {
            section_id,
            name: name.into(),
            due_date: None,
            month_id: None,
            content: None,
        }
    }
}

/// Input of the Milestone editor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MilestoneForm {
    /// Month slot.
    pub month_id: MonthId,
    /// Milestone text; may be empty.
    pub text: String,
    /// Marks the culminating event.
    pub is_main: bool,
}

/// Editor actions over one board.
pub struct BoardEditor<S> {
    store: S,
    board: Arc<BoardController>,
    author: String,
}

impl<S> BoardEditor<S> {
    /// Construct an editor writing comments as `author`.
    pub fn new(store: S, board: Arc<BoardController>, author: impl Into<String>) -> Self {
        Self {
            store,
            board,
            author: author.into(),
        }
    }

    /// Board the editor folds into.
    pub const fn board(&self) -> &Arc<BoardController> {
        &self.board
    }

    /// Expose a reference to the underlying store.
    pub const fn store(&self) -> &S {
        &self.store
    }

    /// Author recorded on new comments.
    pub fn author(&self) -> &str {
        &self.author
    }

    fn ensure_task(&self, task_id: &TaskId) -> Result<TaskView, EditorError> {
        self.board
            .with_snapshot(|snapshot| snapshot.task(task_id).cloned())
            .ok_or_else(|| EditorError::UnknownTask(task_id.clone()))
    }

    fn ensure_section(&self, section_id: &SectionId) -> Result<Section, EditorError> {
        self.board
            .with_snapshot(|snapshot| snapshot.section(section_id).map(|view| view.section.clone()))
            .ok_or_else(|| EditorError::UnknownSection(section_id.clone()))
    }

    fn fold(&self, update: BoardUpdate) {
        self.board.fold(&update);
    }
}

impl<S: RemoteStore> BoardEditor<S> {
    /// Create a section at the end of the board.
    ///
    /// # Errors
    /// Returns [`EditorError::EmptySectionName`] for a blank name or a store error.
    pub async fn add_section(&self, name: &str, color: Option<&str>) -> Result<Section, EditorError> {
        let name = non_blank(name).ok_or(EditorError::EmptySectionName)?;
        let sort_order = self.board.with_snapshot(|snapshot| {
            next_sort_order(snapshot.sections.iter().map(|view| view.section.sort_order))
        });
        let section = self
            .store
            .insert_section(NewSection {
                name,
                color: color.and_then(non_blank),
                sort_order,
            })
            .await
            .map_err(store_error)?;
        self.fold(BoardUpdate::SectionCreated(section.clone()));
        Ok(section)
    }

    /// Create a task, plus its initial cell when the form names a month.
    ///
    /// A failed initial cell leaves the task on the board without cells.
    ///
    /// # Errors
    /// Returns [`EditorError::EmptyTaskName`], [`EditorError::UnknownSection`] or a store
    /// error from the task insert.
    pub async fn add_task(&self, form: &AddTaskForm) -> Result<TaskView, EditorError> {
        let name = non_blank(&form.name).ok_or(EditorError::EmptyTaskName)?;
        self.ensure_section(&form.section_id)?;
        let sort_order = self.board.with_snapshot(|snapshot| {
            next_sort_order(
                snapshot
                    .section(&form.section_id)
                    .into_iter()
                    .flat_map(|view| view.tasks.iter().map(|task| task.task.sort_order)),
            )
        });

        let task = self
            .store
            .insert_task(NewTask {
                section_id: form.section_id.clone(),
                name,
                due_date: form.due_date,
                sort_order,
            })
            .await
            .map_err(store_error)?;

        let mut cells = Vec::new();
        if let Some(month_id) = form.month_id {
            let mut draft = CellDraft::new(task.id.clone(), month_id);
            draft.content.clone_from(&form.content);
            match self.store.upsert_cell(draft).await {
                Ok(cell) => cells.push(cell),
                Err(err) => {
                    let err: Error = err.into();
                    warn!(task = %task.id, month = %month_id, %err, "Initial cell was not saved");
                }
            }
        }

        let view = TaskView::new(task, cells);
        info!(task = %view.task.id, section = %view.task.section_id, "Added task");
        self.fold(BoardUpdate::TaskCreated(view.clone()));
        Ok(view)
    }

    /// Save the cell at the draft's slot.
    ///
    /// # Errors
    /// Returns [`EditorError::UnknownTask`] or a store error.
    pub async fn save_cell(&self, draft: &CellDraft) -> Result<TaskCell, EditorError> {
        let view = self.ensure_task(&draft.task_id)?;
        let cell = self
            .store
            .upsert_cell(draft.clone())
            .await
            .map_err(store_error)?;
        let replaced = view.cell(cell.month_id).is_some_and(|existing| existing.id == cell.id);
        self.fold(BoardChange::cell_saved(cell.clone(), replaced).into());
        Ok(cell)
    }

    /// Remove the cell at a slot. Returns `false` when the slot is already empty.
    ///
    /// # Errors
    /// Returns [`EditorError::UnknownTask`] or a store error.
    pub async fn clear_cell(&self, task_id: &TaskId, month_id: MonthId) -> Result<bool, EditorError> {
        let view = self.ensure_task(task_id)?;
        let Some(cell) = view.cell(month_id).cloned() else {
            return Ok(false);
        };
        self.store.delete_cell(&cell.id).await.map_err(store_error)?;
        self.fold(BoardChange::cell_deleted(&cell).into());
        Ok(true)
    }

    /// Save the milestone of a month.
    ///
    /// # Errors
    /// Returns a store error.
    pub async fn save_milestone(&self, form: &MilestoneForm) -> Result<Milestone, EditorError> {
        let milestone = self
            .store
            .upsert_milestone(Milestone {
                month_id: form.month_id,
                text: form.text.trim().to_owned(),
                is_main: form.is_main,
            })
            .await
            .map_err(store_error)?;
        self.fold(BoardChange::milestone_saved(milestone.clone()).into());
        Ok(milestone)
    }

    /// Remove the milestone of a month.
    ///
    /// # Errors
    /// Returns a store error, including when the month has no milestone.
    pub async fn clear_milestone(&self, month_id: MonthId) -> Result<(), EditorError> {
        self.store
            .delete_milestone(month_id)
            .await
            .map_err(store_error)?;
        self.fold(BoardChange::milestone_deleted(month_id).into());
        Ok(())
    }

    /// Set or clear a task's due date.
    ///
    /// # Errors
    /// Returns [`EditorError::UnknownTask`] or a store error.
    pub async fn set_due_date(&self, task_id: &TaskId, due_date: Option<Date>) -> Result<(), EditorError> {
        self.ensure_task(task_id)?;
        let mut patch = TaskPatch::new(task_id.clone());
        patch.due_date = Some(due_date);
        self.patch_task(patch).await
    }

    /// Rename a task.
    ///
    /// # Errors
    /// Returns [`EditorError::EmptyTaskName`], [`EditorError::UnknownTask`] or a store error.
    pub async fn rename_task(&self, task_id: &TaskId, name: &str) -> Result<(), EditorError> {
        let name = non_blank(name).ok_or(EditorError::EmptyTaskName)?;
        self.ensure_task(task_id)?;
        let mut patch = TaskPatch::new(task_id.clone());
        patch.name = Some(name);
        self.patch_task(patch).await
    }

    async fn patch_task(&self, patch: TaskPatch) -> Result<(), EditorError> {
        self.store.update_task(&patch).await.map_err(store_error)?;
        self.fold(BoardChange::task_patched(patch).into());
        Ok(())
    }

    /// Rename a section.
    ///
    /// # Errors
    /// Returns [`EditorError::EmptySectionName`], [`EditorError::UnknownSection`] or a store
    /// error.
    pub async fn rename_section(&self, section_id: &SectionId, name: &str) -> Result<(), EditorError> {
        let name = non_blank(name).ok_or(EditorError::EmptySectionName)?;
        self.ensure_section(section_id)?;
        let mut patch = SectionPatch::new(section_id.clone());
        patch.name = Some(name);
        self.patch_section(patch).await
    }

    /// Flip a section's expand/collapse state. Returns the new state.
    ///
    /// # Errors
    /// Returns [`EditorError::UnknownSection`] or a store error.
    pub async fn toggle_section(&self, section_id: &SectionId) -> Result<bool, EditorError> {
        let section = self.ensure_section(section_id)?;
        let is_open = !section.is_open;
        let mut patch = SectionPatch::new(section_id.clone());
        patch.is_open = Some(is_open);
        self.patch_section(patch).await?;
        Ok(is_open)
    }

    async fn patch_section(&self, patch: SectionPatch) -> Result<(), EditorError> {
        self.store.update_section(&patch).await.map_err(store_error)?;
        self.fold(BoardChange::section_patched(patch).into());
        Ok(())
    }

    /// Delete a task with its cells and comments.
    ///
    /// # Errors
    /// Returns [`EditorError::UnknownTask`] or a store error.
    pub async fn delete_task(&self, task_id: &TaskId) -> Result<(), EditorError> {
        self.ensure_task(task_id)?;
        self.store.delete_task(task_id).await.map_err(store_error)?;
        self.fold(BoardChange::task_deleted(task_id.clone()).into());
        Ok(())
    }

    /// Comment thread of a task/month slot.
    pub const fn comments(&self, task_id: TaskId, month_id: MonthId) -> CommentThread<'_, S> {
        CommentThread {
            editor: self,
            task_id,
            month_id,
        }
    }
}

/// Comments attached to one task/month slot. The cell need not exist.
pub struct CommentThread<'a, S> {
    editor: &'a BoardEditor<S>,
    task_id: TaskId,
    month_id: MonthId,
}

impl<S: RemoteStore> CommentThread<'_, S> {
    /// Comments oldest first.
    ///
    /// # Errors
    /// Returns a store error.
    pub async fn list(&self) -> Result<Vec<Comment>, EditorError> {
        self.editor
            .store
            .fetch_comments(&self.task_id, self.month_id)
            .await
            .map_err(store_error)
    }

    /// Append a comment under the editor's author.
    ///
    /// # Errors
    /// Returns [`EditorError::EmptyComment`] for blank text or a store error.
    pub async fn add(&self, text: &str) -> Result<Comment, EditorError> {
        if text.trim().is_empty() {
            return Err(EditorError::EmptyComment);
        }
        let comment = self
            .editor
            .store
            .insert_comment(NewComment {
                task_id: self.task_id.clone(),
                month_id: self.month_id,
                text: text.to_owned(),
                author: self.editor.author.clone(),
            })
            .await
            .map_err(store_error)?;
        Ok(comment)
    }

    /// Delete a comment.
    ///
    /// # Errors
    /// Returns a store error.
    pub async fn delete(&self, id: &CommentId) -> Result<(), EditorError> {
        self.editor.store.delete_comment(id).await.map_err(store_error)
    }
}

fn non_blank(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_owned())
}

fn next_sort_order(orders: impl Iterator<Item = i32>) -> i32 {
    orders.max().map_or(0, |max| max.saturating_add(1))
}

/// Snapshot lookups shared by surfaces that resolve user input against the board.
pub trait BoardLookup {
    /// Find a task by exact id or, failing that, by exact name.
    fn find_task(&self, needle: &str) -> Option<&TaskView>;

    /// Find a section by exact id or, failing that, by exact name.
    fn find_section(&self, needle: &str) -> Option<&SectionView>;
}

impl BoardLookup for BoardSnapshot {
    fn find_task(&self, needle: &str) -> Option<&TaskView> {
        let needle = needle.trim();
        self.tasks()
            .find(|view| view.task.id.as_str() == needle)
            .or_else(|| self.tasks().find(|view| view.task.name == needle))
    }

    fn find_section(&self, needle: &str) -> Option<&SectionView> {
        let needle = needle.trim();
        self.sections
            .iter()
            .find(|view| view.section.id.as_str() == needle)
            .or_else(|| self.sections.iter().find(|view| view.section.name == needle))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;
    use reunion_board_core::Progress;
    use reunion_board_core::model::Task;
    use reunion_board_store::MemoryStore;

    fn month(raw: i64) -> MonthId {
        MonthId::new(raw).unwrap_or_else(|err| panic!("valid month: {err}"))
    }

    async fn editor() -> Result<(BoardEditor<Arc<MemoryStore>>, Section)> {
        let store = MemoryStore::in_memory();
        let section = store.insert_section(NewSection {
            name: "準備".into(),
            color: None,
            sort_order: 0,
        })?;
        let store = Arc::new(store);
        let board = Arc::new(BoardController::load(&store).await?);
        Ok((BoardEditor::new(store, board, "ユーザー"), section))
    }

    #[tokio::test]
    async fn add_task_with_initial_cell_folds_once() -> Result<()> {
        let (editor, section) = editor().await?;
        let mut form = AddTaskForm::new(section.id.clone(), "  会場予約 ");
        form.month_id = Some(month(3));
        form.content = CellStatus::parse("予定");

        let view = editor.add_task(&form).await?;
        assert_eq!(view.task.name, "会場予約");
        assert_eq!(view.cells.len(), 1);

        let snapshot = editor.board().snapshot();
        assert_eq!(snapshot.sections[0].tasks.len(), 1);
        assert_eq!(snapshot.cell(&view.task.id, month(3)).map(TaskCell::is_planned), Some(true));
        assert_eq!(Progress::of(snapshot.tasks()).percentage(), 0);
        Ok(())
    }

    #[tokio::test]
    async fn add_task_appends_after_existing_tasks() -> Result<()> {
        let (editor, section) = editor().await?;
        let first = editor.add_task(&AddTaskForm::new(section.id.clone(), "一")).await?;
        let second = editor.add_task(&AddTaskForm::new(section.id.clone(), "二")).await?;
        assert_eq!(first.task.sort_order, 0);
        assert_eq!(second.task.sort_order, 1);
        Ok(())
    }

    #[tokio::test]
    async fn add_task_validates_before_writing() -> Result<()> {
        let (editor, section) = editor().await?;
        let blank = editor.add_task(&AddTaskForm::new(section.id, "   ")).await;
        assert!(matches!(blank, Err(EditorError::EmptyTaskName)));
        let orphan = editor.add_task(&AddTaskForm::new("missing".into(), "迷子")).await;
        assert!(matches!(orphan, Err(EditorError::UnknownSection(_))));
        assert!(editor.store().fetch_tasks().await?.is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn save_cell_then_clear_cell() -> Result<()> {
        let (editor, section) = editor().await?;
        let view = editor.add_task(&AddTaskForm::new(section.id, "会場予約")).await?;

        let mut draft = CellDraft::new(view.task.id.clone(), month(3));
        draft.content = CellStatus::parse("予定");
        let first = editor.save_cell(&draft).await?;
        draft.content = CellStatus::parse("済");
        let second = editor.save_cell(&draft).await?;
        assert_eq!(first.id, second.id);

        let snapshot = editor.board().snapshot();
        let cells = &snapshot.task(&view.task.id).unwrap_or_else(|| panic!("task")).cells;
        assert_eq!(cells.len(), 1);
        let progress = Progress::of(snapshot.tasks());
        assert_eq!((progress.completed, progress.total, progress.percentage()), (1, 1, 100));

        assert!(editor.clear_cell(&view.task.id, month(3)).await?);
        assert!(!editor.clear_cell(&view.task.id, month(3)).await?);
        assert!(editor.board().snapshot().cell(&view.task.id, month(3)).is_none());
        Ok(())
    }

    #[tokio::test]
    async fn failed_write_leaves_board_unchanged() -> Result<()> {
        let (editor, section) = editor().await?;
        // Present on the board but unknown to the store.
        let ghost = TaskView::new(
            Task {
                id: "ghost".into(),
                section_id: section.id,
                name: "幽霊".into(),
                due_date: None,
                sort_order: 0,
            },
            Vec::new(),
        );
        editor.board().fold(&BoardUpdate::TaskCreated(ghost));
        let before = editor.board().snapshot();

        let draft = CellDraft::new("ghost".into(), month(4));
        let result = editor.save_cell(&draft).await;
        assert!(matches!(result, Err(EditorError::Store(_))));
        assert_eq!(draft.month_id, month(4), "form stays available for retry");
        assert_eq!(editor.board().snapshot(), before);

        let renamed = editor.rename_task(&"ghost".into(), "実在").await;
        assert!(matches!(renamed, Err(EditorError::Store(_))));
        assert_eq!(editor.board().snapshot(), before);
        Ok(())
    }

    #[tokio::test]
    async fn task_and_section_patches_fold() -> Result<()> {
        let (editor, section) = editor().await?;
        let view = editor.add_task(&AddTaskForm::new(section.id.clone(), "名簿作成")).await?;

        editor.set_due_date(&view.task.id, Some(time::macros::date!(2026 - 2 - 14))).await?;
        editor.rename_task(&view.task.id, "名簿更新").await?;
        editor.rename_section(&section.id, "事前準備").await?;
        assert!(!editor.toggle_section(&section.id).await?);

        let snapshot = editor.board().snapshot();
        let task = &snapshot.task(&view.task.id).unwrap_or_else(|| panic!("task")).task;
        assert_eq!(task.name, "名簿更新");
        assert_eq!(task.due_date, Some(time::macros::date!(2026 - 2 - 14)));
        assert_eq!(snapshot.sections[0].section.name, "事前準備");
        assert!(!snapshot.sections[0].section.is_open);

        editor.set_due_date(&view.task.id, None).await?;
        assert_eq!(
            editor.board().snapshot().task(&view.task.id).and_then(|v| v.task.due_date),
            None
        );
        assert!(matches!(
            editor.rename_section(&section.id, " ").await,
            Err(EditorError::EmptySectionName)
        ));
        Ok(())
    }

    #[tokio::test]
    async fn milestones_and_task_delete_fold() -> Result<()> {
        let (editor, section) = editor().await?;
        let view = editor.add_task(&AddTaskForm::new(section.id, "受付")).await?;

        editor
            .save_milestone(&MilestoneForm {
                month_id: MonthId::MAIN_EVENT,
                text: "同窓会当日".into(),
                is_main: true,
            })
            .await?;
        assert_eq!(editor.board().snapshot().milestones.len(), 1);
        editor.clear_milestone(MonthId::MAIN_EVENT).await?;
        assert!(editor.board().snapshot().milestones.is_empty());

        editor.delete_task(&view.task.id).await?;
        assert!(editor.board().snapshot().task(&view.task.id).is_none());
        assert!(matches!(
            editor.delete_task(&view.task.id).await,
            Err(EditorError::UnknownTask(_))
        ));
        Ok(())
    }

    #[tokio::test]
    async fn comment_thread_orders_and_rejects_blank_text() -> Result<()> {
        let (editor, section) = editor().await?;
        let view = editor.add_task(&AddTaskForm::new(section.id, "会場予約")).await?;
        let thread = editor.comments(view.task.id.clone(), month(3));

        assert!(matches!(thread.add("   ").await, Err(EditorError::EmptyComment)));
        let first = thread.add("見積もり依頼済み").await?;
        thread.add("返信待ち").await?;
        assert_eq!(first.author, "ユーザー");

        let texts: Vec<_> = thread.list().await?.into_iter().map(|c| c.text).collect();
        assert_eq!(texts, vec!["見積もり依頼済み", "返信待ち"]);

        thread.delete(&first.id).await?;
        assert_eq!(thread.list().await?.len(), 1);
        assert!(editor.comments(view.task.id, month(4)).list().await?.is_empty());
        Ok(())
    }

    #[test]
    fn find_task_matches_id_then_name() {
        let board = BoardSnapshot::assemble(
            vec![Section {
                id: "s1".into(),
                name: "準備".into(),
                color: None,
                is_sub: false,
                sort_order: 0,
                is_open: true,
            }],
            vec![Task {
                id: "t1".into(),
                section_id: "s1".into(),
                name: "会場予約".into(),
                due_date: None,
                sort_order: 0,
            }],
            Vec::new(),
            Vec::new(),
        );
        assert!(board.find_task("t1").is_some());
        assert!(board.find_task(" 会場予約 ").is_some());
        assert!(board.find_task("会場").is_none());
        assert!(board.find_section("準備").is_some_and(|view| view.tasks.len() == 1));
        assert!(board.find_section("s2").is_none());
    }
}
