use serde::{Deserialize, Serialize};
use std::fmt;

use crate::id::{CellId, SectionId, TaskId};
use crate::model::{Milestone, Section, SectionPatch, TaskCell, TaskPatch};
use crate::month::MonthId;
use crate::TaskView;

/// Store tables that emit change notifications.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Table {
    /// `sections`
    Sections,
    /// `tasks`
    Tasks,
    /// `task_cells`
    TaskCells,
    /// `milestones`
    Milestones,
}

impl Table {
    /// Every table the board listens to.
    pub const ALL: [Self; 4] = [Self::Sections, Self::Tasks, Self::TaskCells, Self::Milestones];

    /// Table name as used by the store.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Sections => "sections",
            Self::Tasks => "tasks",
            Self::TaskCells => "task_cells",
            Self::Milestones => "milestones",
        }
    }
}

impl fmt::Display for Table {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Row-level action reported by the change feed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ChangeAction {
    /// Row created.
    Insert,
    /// Row modified.
    Update,
    /// Row removed.
    Delete,
}

/// A single row change: new values and/or the old row's keys.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RowChange<N, K> {
    /// What happened to the row.
    pub action: ChangeAction,
    /// New values (absent for deletes).
    pub new: Option<N>,
    /// Keys of the previous row (absent for inserts).
    pub old: Option<K>,
}

impl<N, K> RowChange<N, K> {
    /// Insert carrying the created row.
    pub const fn insert(new: N) -> Self {
        Self {
            action: ChangeAction::Insert,
            new: Some(new),
            old: None,
        }
    }

    /// Update carrying the new row and the old keys.
    pub const fn update(new: N, old: K) -> Self {
        Self {
            action: ChangeAction::Update,
            new: Some(new),
            old: Some(old),
        }
    }

    /// Delete carrying the old keys.
    pub const fn delete(old: K) -> Self {
        Self {
            action: ChangeAction::Delete,
            new: None,
            old: Some(old),
        }
    }
}

/// Primary key of a section row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SectionKey {
    /// Section id.
    pub id: SectionId,
}

/// Primary key of a task row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskKey {
    /// Task id.
    pub id: TaskId,
}

/// Old-row payload of a cell change.
///
/// Depending on the store's replica identity the owning task may be missing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CellKey {
    /// Cell id.
    pub id: CellId,
    /// Owning task, when the store reports it.
    #[serde(default)]
    pub task_id: Option<TaskId>,
}

impl From<&TaskCell> for CellKey {
    fn from(cell: &TaskCell) -> Self {
        Self {
            id: cell.id.clone(),
            task_id: Some(cell.task_id.clone()),
        }
    }
}

/// Primary key of a milestone row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MilestoneKey {
    /// Month slot.
    pub month_id: MonthId,
}

/// A change notification for one of the board tables.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "table")]
pub enum BoardChange {
    /// `sections` row change.
    #[serde(rename = "sections")]
    Section(RowChange<SectionPatch, SectionKey>),
    /// `tasks` row change.
    #[serde(rename = "tasks")]
    Task(RowChange<TaskPatch, TaskKey>),
    /// `task_cells` row change.
    #[serde(rename = "task_cells")]
    Cell(RowChange<TaskCell, CellKey>),
    /// `milestones` row change.
    #[serde(rename = "milestones")]
    Milestone(RowChange<Milestone, MilestoneKey>),
}

impl BoardChange {
    /// Table the change originates from.
    #[must_use]
    pub const fn table(&self) -> Table {
        match self {
            Self::Section(_) => Table::Sections,
            Self::Task(_) => Table::Tasks,
            Self::Cell(_) => Table::TaskCells,
            Self::Milestone(_) => Table::Milestones,
        }
    }

    /// Action reported by the change.
    #[must_use]
    pub const fn action(&self) -> ChangeAction {
        match self {
            Self::Section(change) => change.action,
            Self::Task(change) => change.action,
            Self::Cell(change) => change.action,
            Self::Milestone(change) => change.action,
        }
    }

    /// Upsert result for a cell (insert when the slot was empty).
    #[must_use]
    pub fn cell_saved(cell: TaskCell, replaced: bool) -> Self {
        if replaced {
            let key = CellKey::from(&cell);
            Self::Cell(RowChange::update(cell, key))
        } else {
            Self::Cell(RowChange::insert(cell))
        }
    }

    /// Removal of a cell.
    #[must_use]
    pub fn cell_deleted(cell: &TaskCell) -> Self {
        Self::Cell(RowChange::delete(CellKey::from(cell)))
    }

    /// Upsert result for a milestone.
    #[must_use]
    pub fn milestone_saved(milestone: Milestone) -> Self {
        let key = MilestoneKey {
            month_id: milestone.month_id,
        };
        Self::Milestone(RowChange::update(milestone, key))
    }

    /// Removal of a milestone.
    #[must_use]
    pub const fn milestone_deleted(month_id: MonthId) -> Self {
        Self::Milestone(RowChange::delete(MilestoneKey { month_id }))
    }

    /// Partial task update.
    #[must_use]
    pub fn task_patched(patch: TaskPatch) -> Self {
        let key = TaskKey { id: patch.id.clone() };
        Self::Task(RowChange::update(patch, key))
    }

    /// Removal of a task.
    #[must_use]
    pub const fn task_deleted(id: TaskId) -> Self {
        Self::Task(RowChange::delete(TaskKey { id }))
    }

    /// Partial section update.
    #[must_use]
    pub fn section_patched(patch: SectionPatch) -> Self {
        let key = SectionKey { id: patch.id.clone() };
        Self::Section(RowChange::update(patch, key))
    }
}

/// Anything that can be folded into a [`crate::BoardSnapshot`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BoardUpdate {
    /// A live change event or a confirmed editor write expressed as one.
    Change(BoardChange),
    /// A task created by the add-task editor, with its initial cells.
    TaskCreated(TaskView),
    /// A section created by the add-section editor.
    SectionCreated(Section),
}

impl From<BoardChange> for BoardUpdate {
    fn from(change: BoardChange) -> Self {
        Self::Change(change)
    }
}
