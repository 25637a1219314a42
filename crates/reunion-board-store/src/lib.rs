//! In-process backing store for the reunion board with a row-level change feed.

mod error;

pub use error::StoreError;

use reunion_board_core::event::{BoardChange, RowChange, Table};
use reunion_board_core::id::{CellId, CommentId, SectionId, TaskId};
use reunion_board_core::model::{
    CellDraft, Comment, Milestone, NewComment, NewSection, NewTask, Section, SectionPatch, Task,
    TaskCell, TaskPatch,
};
use reunion_board_core::month::MonthId;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};
use tempfile::NamedTempFile;
use time::OffsetDateTime;
use tokio::sync::broadcast;
use tracing::{debug, info};

const FEED_CAPACITY: usize = 256;

/// Rows of every board table, as persisted in the data file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct Tables {
    #[serde(default)]
    sections: Vec<Section>,
    #[serde(default)]
    tasks: Vec<Task>,
    #[serde(default)]
    task_cells: Vec<TaskCell>,
    #[serde(default)]
    milestones: Vec<Milestone>,
    #[serde(default)]
    comments: Vec<Comment>,
}

impl Tables {
    fn section_mut(&mut self, id: &SectionId) -> Result<&mut Section, StoreError> {
        self.sections
            .iter_mut()
            .find(|section| &section.id == id)
            .ok_or_else(|| StoreError::not_found(Table::Sections, id))
    }

    fn task_mut(&mut self, id: &TaskId) -> Result<&mut Task, StoreError> {
        self.tasks
            .iter_mut()
            .find(|task| &task.id == id)
            .ok_or_else(|| StoreError::not_found(Table::Tasks, id))
    }

    fn ensure_section(&self, id: &SectionId) -> Result<(), StoreError> {
        if self.sections.iter().any(|section| &section.id == id) {
            Ok(())
        } else {
            Err(StoreError::Rejected(format!("section {id} does not exist")))
        }
    }

    fn ensure_task(&self, id: &TaskId) -> Result<(), StoreError> {
        if self.tasks.iter().any(|task| &task.id == id) {
            Ok(())
        } else {
            Err(StoreError::Rejected(format!("task {id} does not exist")))
        }
    }
}

/// Board storage held in memory, optionally mirrored to a JSON file.
///
/// Every successful mutation is published on the change feed returned by
/// [`MemoryStore::subscribe`]. Comments are stored but never published.
pub struct MemoryStore {
    tables: Mutex<Tables>,
    path: Option<PathBuf>,
    feed: broadcast::Sender<BoardChange>,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::in_memory()
    }
}

impl MemoryStore {
    /// Empty store that never touches the filesystem.
    #[must_use]
    pub fn in_memory() -> Self {
        Self::with_tables(Tables::default(), None)
    }

    /// Open the store backed by `path`, loading it when the file exists.
    ///
    /// # Errors
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref().to_path_buf();
        let tables = if path.exists() {
            let raw = fs::read_to_string(&path)?;
            let tables: Tables = serde_json::from_str(&raw)?;
            debug!(
                path = %path.display(),
                sections = tables.sections.len(),
                tasks = tables.tasks.len(),
                "Loaded board data"
            );
            tables
        } else {
            Tables::default()
        };
        Ok(Self::with_tables(tables, Some(path)))
    }

    fn with_tables(tables: Tables, path: Option<PathBuf>) -> Self {
        let (feed, _) = broadcast::channel(FEED_CAPACITY);
        Self {
            tables: Mutex::new(tables),
            path,
            feed,
        }
    }

    /// Data file backing this store, if any.
    #[must_use]
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Receive every change published after this call.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<BoardChange> {
        self.feed.subscribe()
    }

    fn read(&self) -> Result<MutexGuard<'_, Tables>, StoreError> {
        self.tables.lock().map_err(|_| StoreError::Lock)
    }

    /// Run `op` against a copy of the tables; commit, persist and publish only on success.
    fn write<T>(
        &self,
        op: impl FnOnce(&mut Tables) -> Result<(T, Option<BoardChange>), StoreError>,
    ) -> Result<T, StoreError> {
        let mut guard = self.read()?;
        let mut next = guard.clone();
        let (value, change) = op(&mut next)?;
        if let Some(path) = &self.path {
            persist(path, &next)?;
        }
        *guard = next;
        drop(guard);

        if let Some(change) = change {
            let table = change.table();
            let action = change.action();
            if self.feed.send(change).is_err() {
                debug!(%table, ?action, "No change subscribers");
            }
        }
        Ok(value)
    }

    /// Sections ordered by `sort_order`.
    ///
    /// # Errors
    /// Returns an error if the table lock is poisoned.
    pub fn fetch_sections(&self) -> Result<Vec<Section>, StoreError> {
        let mut rows = self.read()?.sections.clone();
        rows.sort_by_key(|section| section.sort_order);
        Ok(rows)
    }

    /// Tasks ordered by `sort_order`.
    ///
    /// # Errors
    /// Returns an error if the table lock is poisoned.
    pub fn fetch_tasks(&self) -> Result<Vec<Task>, StoreError> {
        let mut rows = self.read()?.tasks.clone();
        rows.sort_by_key(|task| task.sort_order);
        Ok(rows)
    }

    /// Every cell in insertion order.
    ///
    /// # Errors
    /// Returns an error if the table lock is poisoned.
    pub fn fetch_cells(&self) -> Result<Vec<TaskCell>, StoreError> {
        Ok(self.read()?.task_cells.clone())
    }

    /// Milestones ordered by month.
    ///
    /// # Errors
    /// Returns an error if the table lock is poisoned.
    pub fn fetch_milestones(&self) -> Result<Vec<Milestone>, StoreError> {
        let mut rows = self.read()?.milestones.clone();
        rows.sort_by_key(|milestone| milestone.month_id);
        Ok(rows)
    }

    /// Comments on one task/month slot, oldest first.
    ///
    /// # Errors
    /// Returns an error if the table lock is poisoned.
    pub fn fetch_comments(&self, task_id: &TaskId, month_id: MonthId) -> Result<Vec<Comment>, StoreError> {
        let mut rows: Vec<Comment> = self
            .read()?
            .comments
            .iter()
            .filter(|comment| &comment.task_id == task_id && comment.month_id == month_id)
            .cloned()
            .collect();
        rows.sort_by_key(|comment| comment.created_at);
        Ok(rows)
    }

    /// Create a section.
    ///
    /// # Errors
    /// Returns an error if the data file cannot be written.
    pub fn insert_section(&self, new: NewSection) -> Result<Section, StoreError> {
        let section = self.write(|tables| {
            let section = new.into_section(SectionId::new());
            tables.sections.push(section.clone());
            let change = BoardChange::Section(RowChange::insert(SectionPatch::from(section.clone())));
            Ok((section, Some(change)))
        })?;
        info!(section = %section.id, name = %section.name, "Inserted section");
        Ok(section)
    }

    /// Create a task in an existing section.
    ///
    /// # Errors
    /// Returns [`StoreError::Rejected`] for an unknown section, or an I/O error.
    pub fn insert_task(&self, new: NewTask) -> Result<Task, StoreError> {
        let task = self.write(|tables| {
            tables.ensure_section(&new.section_id)?;
            let task = new.into_task(TaskId::new());
            tables.tasks.push(task.clone());
            let change = BoardChange::Task(RowChange::insert(TaskPatch::from(task.clone())));
            Ok((task, Some(change)))
        })?;
        info!(task = %task.id, section = %task.section_id, "Inserted task");
        Ok(task)
    }

    /// Attach a comment to a task/month slot.
    ///
    /// # Errors
    /// Returns [`StoreError::Rejected`] for an unknown task, or an I/O error.
    pub fn insert_comment(&self, new: NewComment) -> Result<Comment, StoreError> {
        let comment = self.write(|tables| {
            tables.ensure_task(&new.task_id)?;
            let comment = new.into_comment(CommentId::new(), OffsetDateTime::now_utc());
            tables.comments.push(comment.clone());
            Ok((comment, None))
        })?;
        info!(comment = %comment.id, task = %comment.task_id, month = %comment.month_id, "Inserted comment");
        Ok(comment)
    }

    /// Merge the present fields of `patch` into a section.
    ///
    /// # Errors
    /// Returns [`StoreError::RowNotFound`] for an unknown section, or an I/O error.
    pub fn update_section(&self, patch: &SectionPatch) -> Result<(), StoreError> {
        self.write(|tables| {
            let section = tables.section_mut(&patch.id)?;
            patch.apply_to(section);
            let change = BoardChange::section_patched(SectionPatch::from(section.clone()));
            Ok(((), Some(change)))
        })?;
        info!(section = %patch.id, "Updated section");
        Ok(())
    }

    /// Merge the present fields of `patch` into a task.
    ///
    /// # Errors
    /// Returns [`StoreError::RowNotFound`] for an unknown task, [`StoreError::Rejected`] when
    /// the patch points at an unknown section, or an I/O error.
    pub fn update_task(&self, patch: &TaskPatch) -> Result<(), StoreError> {
        self.write(|tables| {
            if let Some(section_id) = &patch.section_id {
                tables.ensure_section(section_id)?;
            }
            let task = tables.task_mut(&patch.id)?;
            patch.apply_to(task);
            let change = BoardChange::task_patched(TaskPatch::from(task.clone()));
            Ok(((), Some(change)))
        })?;
        info!(task = %patch.id, "Updated task");
        Ok(())
    }

    /// Insert or replace the cell at `(task_id, month_id)`.
    ///
    /// A replaced cell keeps its id.
    ///
    /// # Errors
    /// Returns [`StoreError::Rejected`] for an unknown task, or an I/O error.
    pub fn upsert_cell(&self, draft: CellDraft) -> Result<TaskCell, StoreError> {
        let cell = self.write(|tables| {
            tables.ensure_task(&draft.task_id)?;
            let draft = draft.normalized();
            let existing = tables
                .task_cells
                .iter_mut()
                .find(|cell| cell.task_id == draft.task_id && cell.month_id == draft.month_id);
            let (cell, replaced) = match existing {
                Some(slot) => {
                    let cell = draft.into_cell(slot.id.clone());
                    slot.clone_from(&cell);
                    (cell, true)
                }
                None => {
                    let cell = draft.into_cell(CellId::new());
                    tables.task_cells.push(cell.clone());
                    (cell, false)
                }
            };
            let change = BoardChange::cell_saved(cell.clone(), replaced);
            Ok((cell, Some(change)))
        })?;
        info!(cell = %cell.id, task = %cell.task_id, month = %cell.month_id, "Upserted cell");
        Ok(cell)
    }

    /// Insert or replace the milestone of a month.
    ///
    /// # Errors
    /// Returns an error if the data file cannot be written.
    pub fn upsert_milestone(&self, milestone: Milestone) -> Result<Milestone, StoreError> {
        let saved = self.write(|tables| {
            if let Some(slot) = tables
                .milestones
                .iter_mut()
                .find(|existing| existing.month_id == milestone.month_id)
            {
                slot.clone_from(&milestone);
            } else {
                tables.milestones.push(milestone.clone());
            }
            let change = BoardChange::milestone_saved(milestone.clone());
            Ok((milestone, Some(change)))
        })?;
        info!(month = %saved.month_id, "Upserted milestone");
        Ok(saved)
    }

    /// Remove a task together with its cells and comments.
    ///
    /// Only the task removal is published.
    ///
    /// # Errors
    /// Returns [`StoreError::RowNotFound`] for an unknown task, or an I/O error.
    pub fn delete_task(&self, id: &TaskId) -> Result<(), StoreError> {
        let cascaded = self.write(|tables| {
            let before = tables.tasks.len();
            tables.tasks.retain(|task| &task.id != id);
            if tables.tasks.len() == before {
                return Err(StoreError::not_found(Table::Tasks, id));
            }
            let cells = tables.task_cells.len();
            tables.task_cells.retain(|cell| &cell.task_id != id);
            tables.comments.retain(|comment| &comment.task_id != id);
            let cascaded = cells - tables.task_cells.len();
            Ok((cascaded, Some(BoardChange::task_deleted(id.clone()))))
        })?;
        info!(task = %id, cascaded_cells = cascaded, "Deleted task");
        Ok(())
    }

    /// Remove a cell.
    ///
    /// # Errors
    /// Returns [`StoreError::RowNotFound`] for an unknown cell, or an I/O error.
    pub fn delete_cell(&self, id: &CellId) -> Result<(), StoreError> {
        self.write(|tables| {
            let index = tables
                .task_cells
                .iter()
                .position(|cell| &cell.id == id)
                .ok_or_else(|| StoreError::not_found(Table::TaskCells, id))?;
            let cell = tables.task_cells.remove(index);
            Ok(((), Some(BoardChange::cell_deleted(&cell))))
        })?;
        info!(cell = %id, "Deleted cell");
        Ok(())
    }

    /// Remove the milestone of a month.
    ///
    /// # Errors
    /// Returns [`StoreError::RowNotFound`] when the month has no milestone, or an I/O error.
    pub fn delete_milestone(&self, month_id: MonthId) -> Result<(), StoreError> {
        self.write(|tables| {
            let before = tables.milestones.len();
            tables.milestones.retain(|milestone| milestone.month_id != month_id);
            if tables.milestones.len() == before {
                return Err(StoreError::not_found(Table::Milestones, month_id));
            }
            Ok(((), Some(BoardChange::milestone_deleted(month_id))))
        })?;
        info!(month = %month_id, "Deleted milestone");
        Ok(())
    }

    /// Remove a comment.
    ///
    /// # Errors
    /// Returns [`StoreError::Rejected`] for an unknown comment, or an I/O error.
    pub fn delete_comment(&self, id: &CommentId) -> Result<(), StoreError> {
        self.write(|tables| {
            let before = tables.comments.len();
            tables.comments.retain(|comment| &comment.id != id);
            if tables.comments.len() == before {
                return Err(StoreError::Rejected(format!("comment {id} does not exist")));
            }
            Ok(((), None))
        })?;
        info!(comment = %id, "Deleted comment");
        Ok(())
    }
}

/// Write `tables` next to `path` and atomically move it into place.
fn persist(path: &Path, tables: &Tables) -> Result<(), StoreError> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    fs::create_dir_all(dir)?;
    let mut file = NamedTempFile::new_in(dir)?;
    serde_json::to_writer_pretty(&mut file, tables)?;
    file.write_all(b"\n")?;
    file.as_file().sync_all()?;
    file.persist(path).map_err(|err| StoreError::Io(err.error))?;
    Ok(())
}
