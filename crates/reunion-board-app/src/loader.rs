//! Initial snapshot load.

use anyhow::{Error, Result};
use reunion_board_core::BoardSnapshot;
use tracing::debug;

use crate::remote_store::RemoteStore;

fn fetch_failed<E: Into<Error>>(collection: &'static str) -> impl FnOnce(E) -> Error {
    move |err| Into::<Error>::into(err).context(format!("failed to fetch {collection}"))
}

/// Fetch the four board collections concurrently and nest them.
///
/// # Errors
/// Returns the first fetch failure, naming the collection.
pub async fn load_snapshot<S: RemoteStore>(store: &S) -> Result<BoardSnapshot> {
    let (sections, tasks, cells, milestones) = tokio::try_join!(
        async { store.fetch_sections().await.map_err(fetch_failed("sections")) },
        async { store.fetch_tasks().await.map_err(fetch_failed("tasks")) },
        async { store.fetch_cells().await.map_err(fetch_failed("task_cells")) },
        async { store.fetch_milestones().await.map_err(fetch_failed("milestones")) },
    )?;

    let fetched_tasks = tasks.len();
    let fetched_cells = cells.len();
    let snapshot = BoardSnapshot::assemble(sections, tasks, cells, milestones);

    let kept_tasks = snapshot.tasks().count();
    let kept_cells: usize = snapshot.tasks().map(|view| view.cells.len()).sum();
    if kept_tasks != fetched_tasks || kept_cells != fetched_cells {
        debug!(
            orphan_tasks = fetched_tasks - kept_tasks,
            orphan_cells = fetched_cells - kept_cells,
            "Dropped rows without a parent"
        );
    }
    debug!(
        sections = snapshot.sections.len(),
        tasks = kept_tasks,
        milestones = snapshot.milestones.len(),
        "Loaded board snapshot"
    );
    Ok(snapshot)
}
