//! Async storage abstraction over the board store.

use anyhow::Error;
use reunion_board_core::event::BoardChange;
use reunion_board_core::id::{CellId, CommentId, TaskId};
use reunion_board_core::model::{
    CellDraft, Comment, Milestone, NewComment, NewSection, NewTask, Section, SectionPatch, Task,
    TaskCell, TaskPatch,
};
use reunion_board_core::month::MonthId;
use reunion_board_store::{MemoryStore, StoreError};
use std::sync::Arc;
use tokio::sync::broadcast;

/// Typed operations of the remote board store plus its change feed.
#[allow(async_fn_in_trait)]
pub trait RemoteStore: Send + Sync {
    /// Error type bubbled up from the backing store.
    type Error: Into<Error> + Send;

    /// Sections ordered by `sort_order`.
    ///
    /// # Errors
    /// Returns a store-specific error when the query fails.
    async fn fetch_sections(&self) -> Result<Vec<Section>, Self::Error>;

    /// Tasks ordered by `sort_order`.
    ///
    /// # Errors
    /// Returns a store-specific error when the query fails.
    async fn fetch_tasks(&self) -> Result<Vec<Task>, Self::Error>;

    /// Every task cell.
    ///
    /// # Errors
    /// Returns a store-specific error when the query fails.
    async fn fetch_cells(&self) -> Result<Vec<TaskCell>, Self::Error>;

    /// Every milestone.
    ///
    /// # Errors
    /// Returns a store-specific error when the query fails.
    async fn fetch_milestones(&self) -> Result<Vec<Milestone>, Self::Error>;

    /// Comments on a task/month slot ordered by creation time.
    ///
    /// # Errors
    /// Returns a store-specific error when the query fails.
    async fn fetch_comments(&self, task_id: &TaskId, month_id: MonthId) -> Result<Vec<Comment>, Self::Error>;

    /// Create a section.
    ///
    /// # Errors
    /// Returns a store-specific error when the write fails.
    async fn insert_section(&self, new: NewSection) -> Result<Section, Self::Error>;

    /// Create a task.
    ///
    /// # Errors
    /// Returns a store-specific error when the write fails.
    async fn insert_task(&self, new: NewTask) -> Result<Task, Self::Error>;

    /// Create a comment.
    ///
    /// # Errors
    /// Returns a store-specific error when the write fails.
    async fn insert_comment(&self, new: NewComment) -> Result<Comment, Self::Error>;

    /// Merge the present fields into a section.
    ///
    /// # Errors
    /// Returns a store-specific error when the write fails.
    async fn update_section(&self, patch: &SectionPatch) -> Result<(), Self::Error>;

    /// Merge the present fields into a task.
    ///
    /// # Errors
    /// Returns a store-specific error when the write fails.
    async fn update_task(&self, patch: &TaskPatch) -> Result<(), Self::Error>;

    /// Insert or replace the cell keyed on `(task_id, month_id)`.
    ///
    /// # Errors
    /// Returns a store-specific error when the write fails.
    async fn upsert_cell(&self, draft: CellDraft) -> Result<TaskCell, Self::Error>;

    /// Insert or replace the milestone keyed on `month_id`.
    ///
    /// # Errors
    /// Returns a store-specific error when the write fails.
    async fn upsert_milestone(&self, milestone: Milestone) -> Result<Milestone, Self::Error>;

    /// Remove a task and everything attached to it.
    ///
    /// # Errors
    /// Returns a store-specific error when the write fails.
    async fn delete_task(&self, id: &TaskId) -> Result<(), Self::Error>;

    /// Remove a cell.
    ///
    /// # Errors
    /// Returns a store-specific error when the write fails.
    async fn delete_cell(&self, id: &CellId) -> Result<(), Self::Error>;

    /// Remove the milestone of a month.
    ///
    /// # Errors
    /// Returns a store-specific error when the write fails.
    async fn delete_milestone(&self, month_id: MonthId) -> Result<(), Self::Error>;

    /// Remove a comment.
    ///
    /// # Errors
    /// Returns a store-specific error when the write fails.
    async fn delete_comment(&self, id: &CommentId) -> Result<(), Self::Error>;

    /// Receive row changes published after this call.
    fn subscribe(&self) -> broadcast::Receiver<BoardChange>;
}

async fn blocking<T, F>(store: &Arc<MemoryStore>, op: F) -> Result<T, StoreError>
where
    T: Send + 'static,
    F: FnOnce(&MemoryStore) -> Result<T, StoreError> + Send + 'static,
{
    let store = Arc::clone(store);
    tokio::task::spawn_blocking(move || op(&store))
        .await
        .map_err(|e| StoreError::Other(format!("Task join error: {e}")))?
}

impl RemoteStore for Arc<MemoryStore> {
    type Error = StoreError;

    async fn fetch_sections(&self) -> Result<Vec<Section>, Self::Error> {
        blocking(self, MemoryStore::fetch_sections).await
    }

    async fn fetch_tasks(&self) -> Result<Vec<Task>, Self::Error> {
        blocking(self, MemoryStore::fetch_tasks).await
    }

    async fn fetch_cells(&self) -> Result<Vec<TaskCell>, Self::Error> {
        blocking(self, MemoryStore::fetch_cells).await
    }

    async fn fetch_milestones(&self) -> Result<Vec<Milestone>, Self::Error> {
        blocking(self, MemoryStore::fetch_milestones).await
    }

    async fn fetch_comments(&self, task_id: &TaskId, month_id: MonthId) -> Result<Vec<Comment>, Self::Error> {
        let task_id = task_id.clone();
        blocking(self, move |store| store.fetch_comments(&task_id, month_id)).await
    }

    async fn insert_section(&self, new: NewSection) -> Result<Section, Self::Error> {
        blocking(self, move |store| store.insert_section(new)).await
    }

    async fn insert_task(&self, new: NewTask) -> Result<Task, Self::Error> {
        blocking(self, move |store| store.insert_task(new)).await
    }

    async fn insert_comment(&self, new: NewComment) -> Result<Comment, Self::Error> {
        blocking(self, move |store| store.insert_comment(new)).await
    }

    async fn update_section(&self, patch: &SectionPatch) -> Result<(), Self::Error> {
        let patch = patch.clone();
        blocking(self, move |store| store.update_section(&patch)).await
    }

    async fn update_task(&self, patch: &TaskPatch) -> Result<(), Self::Error> {
        let patch = patch.clone();
        blocking(self, move |store| store.update_task(&patch)).await
    }

    async fn upsert_cell(&self, draft: CellDraft) -> Result<TaskCell, Self::Error> {
        blocking(self, move |store| store.upsert_cell(draft)).await
    }

    async fn upsert_milestone(&self, milestone: Milestone) -> Result<Milestone, Self::Error> {
        blocking(self, move |store| store.upsert_milestone(milestone)).await
    }

    async fn delete_task(&self, id: &TaskId) -> Result<(), Self::Error> {
        let id = id.clone();
        blocking(self, move |store| store.delete_task(&id)).await
    }

    async fn delete_cell(&self, id: &CellId) -> Result<(), Self::Error> {
        let id = id.clone();
        blocking(self, move |store| store.delete_cell(&id)).await
    }

    async fn delete_milestone(&self, month_id: MonthId) -> Result<(), Self::Error> {
        blocking(self, move |store| store.delete_milestone(month_id)).await
    }

    async fn delete_comment(&self, id: &CommentId) -> Result<(), Self::Error> {
        let id = id.clone();
        blocking(self, move |store| store.delete_comment(&id)).await
    }

    fn subscribe(&self) -> broadcast::Receiver<BoardChange> {
        MemoryStore::subscribe(self)
    }
}
