//! # PostgreSQL Workflow Store
//!
//! [`WorkflowStore`] backed by PostgreSQL through SQLx.
//!
//! ## Transaction Safety
//!
//! `commit` runs inside one transaction. Document updates are compare-and-set
//! on `lock_version`; zero affected rows aborts the transaction with
//! [`StoreError::VersionConflict`]. Transition rows get their `sort_key` and
//! `most_recent` flag maintained in the same transaction.
//!
//! ## Database Schema
//!
//! See `migrations/`: `docflow_documents`, `docflow_workflow_tasks` (unique on
//! `(document_id, round, validator_id)`) and `docflow_document_transitions`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::PgPoolOptions;
use sqlx::{FromRow, PgPool, Postgres, Transaction};
use uuid::Uuid;

use super::store::{ChangeSet, DocumentWrite, RoundSnapshot, StoreError, StoreResult, WorkflowStore};
use crate::constants::status_groups;
use crate::models::{
    AttachmentRef, Document, DocumentTransition, NewDocumentTransition, ValidatorId, WorkflowTask,
};
use crate::state_machine::TaskStatus;

const UNIQUE_VIOLATION: &str = "23505";

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db_err) = &err {
            if db_err.code().as_deref() == Some(UNIQUE_VIOLATION) {
                return StoreError::ConstraintViolation {
                    constraint: db_err.constraint().unwrap_or("unique").to_string(),
                };
            }
        }
        StoreError::Database(err.to_string())
    }
}

#[derive(Debug, FromRow)]
struct DocumentRow {
    document_id: Uuid,
    title: String,
    category: String,
    status: String,
    linked_document_id: Option<Uuid>,
    current_round: i32,
    attachment: Option<serde_json::Value>,
    lock_version: i64,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<DocumentRow> for Document {
    type Error = StoreError;

    fn try_from(row: DocumentRow) -> Result<Self, Self::Error> {
        let attachment = row
            .attachment
            .map(serde_json::from_value::<AttachmentRef>)
            .transpose()
            .map_err(|e| StoreError::CorruptRow(format!("attachment: {e}")))?;

        Ok(Document {
            document_id: row.document_id,
            title: row.title,
            category: row.category,
            status: row.status.parse().map_err(StoreError::CorruptRow)?,
            linked_document_id: row.linked_document_id,
            current_round: u32::try_from(row.current_round)
                .map_err(|_| StoreError::CorruptRow(format!("round {}", row.current_round)))?,
            attachment,
            lock_version: row.lock_version,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(Debug, FromRow)]
struct TaskRow {
    workflow_task_id: Uuid,
    document_id: Uuid,
    validator_id: String,
    round: i32,
    step: i32,
    status: String,
    comment: Option<String>,
    spawned_document_id: Option<Uuid>,
    created_at: DateTime<Utc>,
    assigned_at: DateTime<Utc>,
    validated_at: Option<DateTime<Utc>>,
}

impl TryFrom<TaskRow> for WorkflowTask {
    type Error = StoreError;

    fn try_from(row: TaskRow) -> Result<Self, Self::Error> {
        Ok(WorkflowTask {
            workflow_task_id: row.workflow_task_id,
            document_id: row.document_id,
            validator_id: ValidatorId::new(row.validator_id),
            round: u32::try_from(row.round)
                .map_err(|_| StoreError::CorruptRow(format!("round {}", row.round)))?,
            step: u32::try_from(row.step)
                .map_err(|_| StoreError::CorruptRow(format!("step {}", row.step)))?,
            status: row.status.parse().map_err(StoreError::CorruptRow)?,
            comment: row.comment,
            spawned_document_id: row.spawned_document_id,
            created_at: row.created_at,
            assigned_at: row.assigned_at,
            validated_at: row.validated_at,
        })
    }
}

#[derive(Debug, FromRow)]
struct TransitionRow {
    document_id: Uuid,
    from_state: Option<String>,
    to_state: String,
    event: String,
    sort_key: i32,
    most_recent: bool,
    metadata: serde_json::Value,
    created_at: DateTime<Utc>,
}

impl TryFrom<TransitionRow> for DocumentTransition {
    type Error = StoreError;

    fn try_from(row: TransitionRow) -> Result<Self, Self::Error> {
        Ok(DocumentTransition {
            document_id: row.document_id,
            from_status: row
                .from_state
                .map(|s| s.parse())
                .transpose()
                .map_err(StoreError::CorruptRow)?,
            to_status: row.to_state.parse().map_err(StoreError::CorruptRow)?,
            event: row.event,
            sort_key: row.sort_key,
            most_recent: row.most_recent,
            metadata: row.metadata,
            created_at: row.created_at,
        })
    }
}

const DOCUMENT_COLUMNS: &str = "document_id, title, category, status, linked_document_id, \
     current_round, attachment, lock_version, created_at, updated_at";

const TASK_COLUMNS: &str = "workflow_task_id, document_id, validator_id, round, step, status, \
     comment, spawned_document_id, created_at, assigned_at, validated_at";

fn to_i32(value: u32, field: &str) -> StoreResult<i32> {
    i32::try_from(value).map_err(|_| StoreError::CorruptRow(format!("{field} {value} out of range")))
}

fn attachment_json(document: &Document) -> StoreResult<Option<serde_json::Value>> {
    document
        .attachment
        .as_ref()
        .map(serde_json::to_value)
        .transpose()
        .map_err(|e| StoreError::CorruptRow(format!("attachment: {e}")))
}

fn collect<R, T>(rows: Vec<R>) -> StoreResult<Vec<T>>
where
    T: TryFrom<R, Error = StoreError>,
{
    rows.into_iter().map(T::try_from).collect()
}

/// PostgreSQL implementation of [`WorkflowStore`]
#[derive(Debug, Clone)]
pub struct PgWorkflowStore {
    pool: PgPool,
}

impl PgWorkflowStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Connect a pool and run the embedded migrations
    pub async fn connect(database_url: &str, max_connections: u32) -> StoreResult<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await?;
        super::migrations::run_migrations(&pool).await?;
        Ok(Self::new(pool))
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    pub async fn health_check(&self) -> StoreResult<bool> {
        let (health,): (i32,) = sqlx::query_as("SELECT 1").fetch_one(&self.pool).await?;
        Ok(health == 1)
    }

    async fn insert_document(
        tx: &mut Transaction<'_, Postgres>,
        document: &Document,
    ) -> StoreResult<()> {
        let result = sqlx::query(&format!(
            "INSERT INTO docflow_documents ({DOCUMENT_COLUMNS}) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10) \
             ON CONFLICT (document_id) DO NOTHING"
        ))
        .bind(document.document_id)
        .bind(&document.title)
        .bind(&document.category)
        .bind(document.status.as_str())
        .bind(document.linked_document_id)
        .bind(to_i32(document.current_round, "current_round")?)
        .bind(attachment_json(document)?)
        .bind(document.lock_version)
        .bind(document.created_at)
        .bind(document.updated_at)
        .execute(&mut **tx)
        .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::DuplicateDocument(document.document_id));
        }
        Ok(())
    }

    async fn update_document(
        tx: &mut Transaction<'_, Postgres>,
        document: &Document,
        expected_version: i64,
    ) -> StoreResult<()> {
        let result = sqlx::query(
            "UPDATE docflow_documents \
             SET title = $2, category = $3, status = $4, linked_document_id = $5, \
                 current_round = $6, attachment = $7, lock_version = $8, updated_at = $9 \
             WHERE document_id = $1 AND lock_version = $10",
        )
        .bind(document.document_id)
        .bind(&document.title)
        .bind(&document.category)
        .bind(document.status.as_str())
        .bind(document.linked_document_id)
        .bind(to_i32(document.current_round, "current_round")?)
        .bind(attachment_json(document)?)
        .bind(document.lock_version)
        .bind(document.updated_at)
        .bind(expected_version)
        .execute(&mut **tx)
        .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::VersionConflict {
                document_id: document.document_id,
                expected: expected_version,
            });
        }
        Ok(())
    }

    async fn upsert_task(tx: &mut Transaction<'_, Postgres>, task: &WorkflowTask) -> StoreResult<()> {
        sqlx::query(&format!(
            "INSERT INTO docflow_workflow_tasks ({TASK_COLUMNS}) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11) \
             ON CONFLICT (workflow_task_id) DO UPDATE \
             SET status = EXCLUDED.status, comment = EXCLUDED.comment, \
                 spawned_document_id = EXCLUDED.spawned_document_id, \
                 assigned_at = EXCLUDED.assigned_at, validated_at = EXCLUDED.validated_at"
        ))
        .bind(task.workflow_task_id)
        .bind(task.document_id)
        .bind(task.validator_id.as_str())
        .bind(to_i32(task.round, "round")?)
        .bind(to_i32(task.step, "step")?)
        .bind(task.status.as_str())
        .bind(task.comment.as_deref())
        .bind(task.spawned_document_id)
        .bind(task.created_at)
        .bind(task.assigned_at)
        .bind(task.validated_at)
        .execute(&mut **tx)
        .await?;
        Ok(())
    }

    async fn insert_transition(
        tx: &mut Transaction<'_, Postgres>,
        transition: &NewDocumentTransition,
    ) -> StoreResult<()> {
        let (sort_key,): (i32,) = sqlx::query_as(
            "SELECT COALESCE(MAX(sort_key), 0) + 1 \
             FROM docflow_document_transitions WHERE document_id = $1",
        )
        .bind(transition.document_id)
        .fetch_one(&mut **tx)
        .await?;

        sqlx::query(
            "UPDATE docflow_document_transitions SET most_recent = false \
             WHERE document_id = $1 AND most_recent = true",
        )
        .bind(transition.document_id)
        .execute(&mut **tx)
        .await?;

        sqlx::query(
            "INSERT INTO docflow_document_transitions \
             (document_id, from_state, to_state, event, sort_key, most_recent, metadata, created_at) \
             VALUES ($1, $2, $3, $4, $5, true, $6, $7)",
        )
        .bind(transition.document_id)
        .bind(transition.from_status.map(|s| s.as_str()))
        .bind(transition.to_status.as_str())
        .bind(&transition.event)
        .bind(sort_key)
        .bind(&transition.metadata)
        .bind(transition.created_at)
        .execute(&mut **tx)
        .await?;
        Ok(())
    }
}

#[async_trait]
impl WorkflowStore for PgWorkflowStore {
    async fn find_document(&self, document_id: Uuid) -> StoreResult<Option<Document>> {
        let row = sqlx::query_as::<_, DocumentRow>(&format!(
            "SELECT {DOCUMENT_COLUMNS} FROM docflow_documents WHERE document_id = $1"
        ))
        .bind(document_id)
        .fetch_optional(&self.pool)
        .await?;
        row.map(Document::try_from).transpose()
    }

    async fn find_task(&self, workflow_task_id: Uuid) -> StoreResult<Option<WorkflowTask>> {
        let row = sqlx::query_as::<_, TaskRow>(&format!(
            "SELECT {TASK_COLUMNS} FROM docflow_workflow_tasks WHERE workflow_task_id = $1"
        ))
        .bind(workflow_task_id)
        .fetch_optional(&self.pool)
        .await?;
        row.map(WorkflowTask::try_from).transpose()
    }

    async fn load_round_snapshot(&self, document_id: Uuid) -> StoreResult<Option<RoundSnapshot>> {
        let mut tx = self.pool.begin().await?;
        sqlx::query("SET TRANSACTION ISOLATION LEVEL REPEATABLE READ")
            .execute(&mut *tx)
            .await?;

        let row = sqlx::query_as::<_, DocumentRow>(&format!(
            "SELECT {DOCUMENT_COLUMNS} FROM docflow_documents WHERE document_id = $1"
        ))
        .bind(document_id)
        .fetch_optional(&mut *tx)
        .await?;
        let Some(row) = row else {
            tx.commit().await?;
            return Ok(None);
        };
        let document = Document::try_from(row)?;

        let rows = sqlx::query_as::<_, TaskRow>(&format!(
            "SELECT {TASK_COLUMNS} FROM docflow_workflow_tasks \
             WHERE document_id = $1 AND round = $2 ORDER BY step"
        ))
        .bind(document_id)
        .bind(to_i32(document.current_round, "current_round")?)
        .fetch_all(&mut *tx)
        .await?;
        tx.commit().await?;

        Ok(Some(RoundSnapshot {
            document,
            tasks: collect(rows)?,
        }))
    }

    async fn tasks_for_document(&self, document_id: Uuid) -> StoreResult<Vec<WorkflowTask>> {
        let rows = sqlx::query_as::<_, TaskRow>(&format!(
            "SELECT {TASK_COLUMNS} FROM docflow_workflow_tasks \
             WHERE document_id = $1 ORDER BY round, step"
        ))
        .bind(document_id)
        .fetch_all(&self.pool)
        .await?;
        collect(rows)
    }

    async fn tasks_for_validator(
        &self,
        validator_id: &ValidatorId,
        status: Option<TaskStatus>,
    ) -> StoreResult<Vec<WorkflowTask>> {
        let rows = sqlx::query_as::<_, TaskRow>(&format!(
            "SELECT {TASK_COLUMNS} FROM docflow_workflow_tasks \
             WHERE validator_id = $1 AND ($2::text IS NULL OR status = $2) \
             ORDER BY assigned_at, workflow_task_id"
        ))
        .bind(validator_id.as_str())
        .bind(status.map(|s| s.as_str()))
        .fetch_all(&self.pool)
        .await?;
        collect(rows)
    }

    async fn overdue_candidates(&self, cutoff: DateTime<Utc>) -> StoreResult<Vec<WorkflowTask>> {
        let in_flight: Vec<&str> = status_groups::DOCUMENT_IN_FLIGHT_STATES
            .iter()
            .map(|status| status.as_str())
            .collect();
        let rows = sqlx::query_as::<_, TaskRow>(&format!(
            "SELECT {TASK_COLUMNS} FROM docflow_workflow_tasks \
             WHERE status = 'pending' AND assigned_at < $1 \
               AND EXISTS ( \
                 SELECT 1 FROM docflow_documents d \
                 WHERE d.document_id = docflow_workflow_tasks.document_id \
                   AND d.current_round = docflow_workflow_tasks.round \
                   AND d.status = ANY($2)) \
             ORDER BY assigned_at, workflow_task_id"
        ))
        .bind(cutoff)
        .bind(in_flight)
        .fetch_all(&self.pool)
        .await?;
        collect(rows)
    }

    async fn transitions_for_document(
        &self,
        document_id: Uuid,
    ) -> StoreResult<Vec<DocumentTransition>> {
        let rows = sqlx::query_as::<_, TransitionRow>(
            "SELECT document_id, from_state, to_state, event, sort_key, most_recent, metadata, created_at \
             FROM docflow_document_transitions WHERE document_id = $1 ORDER BY sort_key",
        )
        .bind(document_id)
        .fetch_all(&self.pool)
        .await?;
        collect(rows)
    }

    async fn commit(&self, changes: ChangeSet) -> StoreResult<()> {
        // Start a transaction to ensure consistency
        let mut tx = self.pool.begin().await?;

        for write in &changes.documents {
            match write {
                DocumentWrite::Insert(document) => Self::insert_document(&mut tx, document).await?,
                DocumentWrite::Update {
                    document,
                    expected_version,
                } => Self::update_document(&mut tx, document, *expected_version).await?,
            }
        }

        for task in &changes.tasks {
            Self::upsert_task(&mut tx, task).await?;
        }

        for transition in &changes.transitions {
            Self::insert_transition(&mut tx, transition).await?;
        }

        tx.commit().await?;
        Ok(())
    }
}
