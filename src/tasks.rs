//! Task Subsystem (§4.5).
//!
//! Tasks are the `**`-prefixed sibling of a regular message: translated
//! the same way, but persisted to `tasks` rather than `messages` and
//! never touching the usage tracker.

use chrono::{DateTime, Duration, Utc};

use crate::collaborators::Translator;
use crate::entities::{Connection, Task, TaskStatus};
use crate::errors::{StoreError, TaskError};
use crate::store::Store;

const DEFAULT_LIST_WINDOW: Duration = Duration::hours(24);

/// Creates a task on `connection_id`. Only a manager may call this;
/// `actor_id` must equal the connection's `manager_id` (enforced by the
/// caller via [`crate::pipeline::dispatch`], checked again here so the
/// invariant holds regardless of entry point).
pub async fn create(
    store: &Store,
    translator: &dyn Translator,
    connection: &Connection,
    actor_id: i64,
    description: &str,
    worker_language: &str,
    industry: &str,
) -> Result<Task, TaskError> {
    if connection.manager_id != actor_id {
        return Err(TaskError::ManagerOnly);
    }
    let description = description.trim();
    if description.is_empty() {
        return Err(TaskError::EmptyDescription);
    }

    let translated = translator
        .translate(description, "auto", worker_language, None, industry, &[])
        .await?;

    Ok(Task::create(store.pool(), connection.connection_id, description, &translated).await?)
}

/// Outcome of [`complete`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CompleteOutcome {
    Completed(Task),
    AlreadyCompleted,
}

/// `complete(task_id, actor_id)` — preconditions checked against the
/// task's connection in one read, then the transition itself is the
/// atomic `UPDATE ... WHERE status = 'pending'` in
/// [`Task::complete`](crate::entities::Task::complete) (§4.5).
pub async fn complete(
    store: &Store,
    task_id: i64,
    actor_id: i64,
) -> Result<CompleteOutcome, TaskError> {
    let task = load_task(store, task_id).await?;
    let connection = load_connection(store, task.connection_id).await?;

    if connection.status != crate::entities::ConnectionStatus::Active {
        return Err(TaskError::Forbidden);
    }
    if connection.worker_id != actor_id {
        return Err(TaskError::Forbidden);
    }

    match Task::complete(store.pool(), task_id).await? {
        Some(task) => Ok(CompleteOutcome::Completed(task)),
        None => Ok(CompleteOutcome::AlreadyCompleted),
    }
}

/// Pending tasks plus tasks completed within the trailing window,
/// across every active connection a manager holds (§4.5 `list_for_manager`).
pub async fn list_for_manager(
    store: &Store,
    manager_id: i64,
    since: Option<DateTime<Utc>>,
) -> Result<Vec<Task>, StoreError> {
    let connections = Connection::list_active_for_manager(store.pool(), manager_id).await?;
    list_for_connections(store, &connections, since).await
}

/// Same shape for a single worker's (at most one) active connection
/// (§4.5 `list_for_worker`).
pub async fn list_for_worker(
    store: &Store,
    worker_id: i64,
    since: Option<DateTime<Utc>>,
) -> Result<Vec<Task>, StoreError> {
    let connection = Connection::get_active_for_worker(store.pool(), worker_id).await?;
    let connections: Vec<Connection> = connection.into_iter().collect();
    list_for_connections(store, &connections, since).await
}

async fn list_for_connections(
    store: &Store,
    connections: &[Connection],
    since: Option<DateTime<Utc>>,
) -> Result<Vec<Task>, StoreError> {
    if connections.is_empty() {
        return Ok(Vec::new());
    }
    let since = since.unwrap_or_else(|| Utc::now() - DEFAULT_LIST_WINDOW);
    let connection_ids: Vec<i64> = connections.iter().map(|c| c.connection_id).collect();
    Task::list_for_connections(store.pool(), &connection_ids, since).await
}

async fn load_task(store: &Store, task_id: i64) -> Result<Task, TaskError> {
    Task::get_by_id(store.pool(), task_id).await?.ok_or(TaskError::NotFound)
}

async fn load_connection(store: &Store, connection_id: i64) -> Result<Connection, TaskError> {
    Connection::get_by_id(store.pool(), connection_id)
        .await?
        .ok_or(TaskError::NotFound)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_task(status: TaskStatus) -> Task {
        Task {
            task_id: 1,
            connection_id: 1,
            description: "Check cow 115".to_string(),
            description_translated: Some("Comprueba la vaca 115".to_string()),
            status,
            created_at: Utc::now(),
            completed_at: None,
        }
    }

    #[test]
    fn completed_outcome_equality() {
        let a = CompleteOutcome::Completed(sample_task(TaskStatus::Completed));
        let b = CompleteOutcome::Completed(sample_task(TaskStatus::Completed));
        assert_eq!(a, b);
        assert_ne!(a, CompleteOutcome::AlreadyCompleted);
    }
}
