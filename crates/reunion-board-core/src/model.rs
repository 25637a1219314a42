//! Row shapes of the five board tables plus insert/update payloads.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use time::{Date, OffsetDateTime};

use crate::date::iso_date;
use crate::id::{CellId, CommentId, SectionId, TaskId};
use crate::month::MonthId;
use crate::status::{self, CellStatus};

/// A named group of tasks (one band of the grid).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Section {
    /// Row identifier.
    pub id: SectionId,
    /// Display name.
    pub name: String,
    /// Optional color tag.
    #[serde(default)]
    pub color: Option<String>,
    /// Marks a sub-section band.
    #[serde(default)]
    pub is_sub: bool,
    /// Display order.
    #[serde(default)]
    pub sort_order: i32,
    /// Expand/collapse state.
    #[serde(default = "default_open")]
    pub is_open: bool,
}

const fn default_open() -> bool {
    true
}

/// A row of the grid.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    /// Row identifier.
    pub id: TaskId,
    /// Owning section.
    pub section_id: SectionId,
    /// Display name.
    pub name: String,
    /// Optional deadline.
    #[serde(default, with = "iso_date::option")]
    pub due_date: Option<Date>,
    /// Display order within the section.
    #[serde(default)]
    pub sort_order: i32,
}

/// Intersection of one task and one month.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskCell {
    /// Row identifier.
    pub id: CellId,
    /// Owning task.
    pub task_id: TaskId,
    /// Month slot.
    pub month_id: MonthId,
    /// Status tag; `None` is undetermined.
    #[serde(default, with = "status::content")]
    pub content: Option<CellStatus>,
    /// Person responsible for the month.
    #[serde(default)]
    pub assignee: Option<String>,
    /// Free-form note.
    #[serde(default)]
    pub memo: Option<String>,
    /// Execution date of the work within the month.
    #[serde(default, with = "iso_date::option")]
    pub cell_date: Option<Date>,
}

impl TaskCell {
    /// True when the cell is marked done.
    #[must_use]
    pub fn is_done(&self) -> bool {
        self.content.as_ref().is_some_and(CellStatus::is_done)
    }

    /// True when the cell is marked planned.
    #[must_use]
    pub fn is_planned(&self) -> bool {
        self.content.as_ref().is_some_and(CellStatus::is_planned)
    }
}

/// Milestone text shown above one month column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Milestone {
    /// Month slot; unique per milestone.
    pub month_id: MonthId,
    /// Milestone text.
    #[serde(default, deserialize_with = "null_as_empty")]
    pub text: String,
    /// Marks the culminating event.
    #[serde(default)]
    pub is_main: bool,
}

/// Comment attached to a task/month slot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Comment {
    /// Row identifier.
    pub id: CommentId,
    /// Task half of the slot reference.
    pub task_id: TaskId,
    /// Month half of the slot reference.
    pub month_id: MonthId,
    /// Comment body.
    pub text: String,
    /// Display name of the author.
    pub author: String,
    /// Creation time; comments are ordered by it.
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

/// Insert payload for a section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewSection {
    /// Display name.
    pub name: String,
    /// Optional color tag.
    pub color: Option<String>,
    /// Display order.
    pub sort_order: i32,
}

impl NewSection {
    /// Materialize the row under the given id.
    #[must_use]
    pub fn into_section(self, id: SectionId) -> Section {
        Section {
            id,
            name: self.name,
            color: self.color,
            is_sub: false,
            sort_order: self.sort_order,
            is_open: true,
        }
    }
}

/// Insert payload for a task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewTask {
    /// Owning section.
    pub section_id: SectionId,
    /// Display name.
    pub name: String,
    /// Optional deadline.
    #[serde(default, with = "iso_date::option")]
    pub due_date: Option<Date>,
    /// Display order within the section.
    pub sort_order: i32,
}

impl NewTask {
    /// Materialize the row under the given id.
    #[must_use]
    pub fn into_task(self, id: TaskId) -> Task {
        Task {
            id,
            section_id: self.section_id,
            name: self.name,
            due_date: self.due_date,
            sort_order: self.sort_order,
        }
    }
}

/// Upsert payload for a cell, keyed on `(task_id, month_id)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CellDraft {
    /// Owning task.
    pub task_id: TaskId,
    /// Month slot.
    pub month_id: MonthId,
    /// Status tag.
    #[serde(default, with = "status::content")]
    pub content: Option<CellStatus>,
    /// Person responsible.
    #[serde(default)]
    pub assignee: Option<String>,
    /// Free-form note.
    #[serde(default)]
    pub memo: Option<String>,
    /// Execution date.
    #[serde(default, with = "iso_date::option")]
    pub cell_date: Option<Date>,
}

impl CellDraft {
    /// Empty draft for a slot.
    #[must_use]
    pub const fn new(task_id: TaskId, month_id: MonthId) -> Self {
        Self {
            task_id,
            month_id,
            content: None,
            assignee: None,
            memo: None,
            cell_date: None,
        }
    }

    /// Collapse blank text fields to `None`.
    #[must_use]
    pub fn normalized(mut self) -> Self {
        self.assignee = non_blank(self.assignee);
        self.memo = non_blank(self.memo);
        self
    }

    /// Materialize the row under the given id.
    #[must_use]
    pub fn into_cell(self, id: CellId) -> TaskCell {
        TaskCell {
            id,
            task_id: self.task_id,
            month_id: self.month_id,
            content: self.content,
            assignee: self.assignee,
            memo: self.memo,
            cell_date: self.cell_date,
        }
    }
}

/// Insert payload for a comment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewComment {
    /// Task half of the slot reference.
    pub task_id: TaskId,
    /// Month half of the slot reference.
    pub month_id: MonthId,
    /// Comment body.
    pub text: String,
    /// Display name of the author.
    pub author: String,
}

impl NewComment {
    /// Materialize the row under the given id and timestamp.
    #[must_use]
    pub fn into_comment(self, id: CommentId, created_at: OffsetDateTime) -> Comment {
        Comment {
            id,
            task_id: self.task_id,
            month_id: self.month_id,
            text: self.text,
            author: self.author,
            created_at,
        }
    }
}

/// Partial section update. Absent fields are left untouched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SectionPatch {
    /// Target section.
    pub id: SectionId,
    /// New name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// New color; `Some(None)` clears it.
    #[serde(default, deserialize_with = "present", skip_serializing_if = "Option::is_none")]
    pub color: Option<Option<String>>,
    /// New sub-section flag.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_sub: Option<bool>,
    /// New display order.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sort_order: Option<i32>,
    /// New expand/collapse state.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_open: Option<bool>,
}

impl SectionPatch {
    /// Patch touching no field.
    #[must_use]
    pub const fn new(id: SectionId) -> Self {
        Self {
            id,
            name: None,
            color: None,
            is_sub: None,
            sort_order: None,
            is_open: None,
        }
    }

    /// Shallow-overwrite the present fields.
    pub fn apply_to(&self, section: &mut Section) {
        if let Some(name) = &self.name {
            section.name.clone_from(name);
        }
        if let Some(color) = &self.color {
            section.color.clone_from(color);
        }
        if let Some(is_sub) = self.is_sub {
            section.is_sub = is_sub;
        }
        if let Some(sort_order) = self.sort_order {
            section.sort_order = sort_order;
        }
        if let Some(is_open) = self.is_open {
            section.is_open = is_open;
        }
    }
}

impl From<Section> for SectionPatch {
    fn from(section: Section) -> Self {
        Self {
            id: section.id,
            name: Some(section.name),
            color: Some(section.color),
            is_sub: Some(section.is_sub),
            sort_order: Some(section.sort_order),
            is_open: Some(section.is_open),
        }
    }
}

/// Partial task update. Absent fields are left untouched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskPatch {
    /// Target task.
    pub id: TaskId,
    /// New owning section.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub section_id: Option<SectionId>,
    /// New name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// New deadline; `Some(None)` clears it.
    #[serde(
        default,
        deserialize_with = "present_date",
        serialize_with = "serialize_present_date",
        skip_serializing_if = "Option::is_none"
    )]
    pub due_date: Option<Option<Date>>,
    /// New display order.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sort_order: Option<i32>,
}

impl TaskPatch {
    /// Patch touching no field.
    #[must_use]
    pub const fn new(id: TaskId) -> Self {
        Self {
            id,
            section_id: None,
            name: None,
            due_date: None,
            sort_order: None,
        }
    }

    /// Shallow-overwrite the present fields.
    pub fn apply_to(&self, task: &mut Task) {
        if let Some(section_id) = &self.section_id {
            task.section_id.clone_from(section_id);
        }
        if let Some(name) = &self.name {
            task.name.clone_from(name);
        }
        if let Some(due_date) = self.due_date {
            task.due_date = due_date;
        }
        if let Some(sort_order) = self.sort_order {
            task.sort_order = sort_order;
        }
    }
}

impl From<Task> for TaskPatch {
    fn from(task: Task) -> Self {
        Self {
            id: task.id,
            section_id: Some(task.section_id),
            name: Some(task.name),
            due_date: Some(task.due_date),
            sort_order: Some(task.sort_order),
        }
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|text| !text.trim().is_empty())
}

fn null_as_empty<'de, D>(d: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(d)?.unwrap_or_default())
}

fn present<'de, D, T>(d: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(d).map(Some)
}

fn present_date<'de, D>(d: D) -> Result<Option<Option<Date>>, D::Error>
where
    D: Deserializer<'de>,
{
    iso_date::option::deserialize(d).map(Some)
}

#[allow(clippy::ref_option)]
fn serialize_present_date<S>(value: &Option<Option<Date>>, s: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    match value {
        Some(inner) => iso_date::option::serialize(inner, s),
        None => s.serialize_none(),
    }
}
