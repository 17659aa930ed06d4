//! Persistence: the fingerprint-keyed fact-check cache and the task log.
//!
//! Cache reads and writes are best-effort — a store failure must never fail
//! a successful fact-check, so `cached_fact` answers `None` and `put_fact`
//! logs and swallows. Task-log writes return errors; an unreachable store
//! legitimately fails a task.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use tracing::warn;
use uuid::Uuid;

use claimlens_common::{
    ClaimLensError, FactCheckRecord, ReasoningReport, TaskRecord, TaskStatus,
};

/// Fields written by the COMPLETED transition: result plus provenance.
#[derive(Debug, Clone)]
pub struct TaskCompletion {
    pub message: String,
    pub result: FactCheckRecord,
    pub original_content: String,
    pub summarized_content: String,
    pub fallacy: Option<ReasoningReport>,
}

#[async_trait]
pub trait CheckStore: Send + Sync {
    /// Exact-match cache lookup. Store failures answer `None`.
    async fn cached_fact(&self, fingerprint: &str) -> Option<FactCheckRecord>;

    /// Fire-and-forget cache write; failures are logged, never surfaced.
    async fn put_fact(&self, fingerprint: &str, record: &FactCheckRecord);

    async fn create_task(&self, task: &TaskRecord) -> Result<(), ClaimLensError>;

    async fn set_task_status(
        &self,
        task_id: Uuid,
        status: TaskStatus,
        message: &str,
    ) -> Result<(), ClaimLensError>;

    async fn complete_task(
        &self,
        task_id: Uuid,
        completion: &TaskCompletion,
    ) -> Result<(), ClaimLensError>;

    async fn task(&self, task_id: Uuid) -> Result<Option<TaskRecord>, ClaimLensError>;
}

// --- Postgres implementation ---

pub struct PgCheckStore {
    pool: PgPool,
}

#[derive(sqlx::FromRow)]
struct TaskRow {
    task_id: Uuid,
    status: String,
    message: String,
    input_data: serde_json::Value,
    result: Option<serde_json::Value>,
    original_content: Option<String>,
    summarized_content: Option<String>,
    fallacy: Option<serde_json::Value>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl PgCheckStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Run the embedded SQL migrations.
    pub async fn migrate(&self) -> Result<(), ClaimLensError> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| ClaimLensError::Database(e.to_string()))?;
        Ok(())
    }
}

fn db_err(e: sqlx::Error) -> ClaimLensError {
    ClaimLensError::Database(e.to_string())
}

fn task_from_row(row: TaskRow) -> Result<TaskRecord, ClaimLensError> {
    let status: TaskStatus =
        serde_json::from_value(serde_json::Value::String(row.status.clone()))
            .map_err(|e| ClaimLensError::Database(format!("bad task status: {e}")))?;

    fn decode<T: serde::de::DeserializeOwned>(
        label: &str,
        value: serde_json::Value,
    ) -> Result<T, ClaimLensError> {
        serde_json::from_value(value)
            .map_err(|e| ClaimLensError::Database(format!("bad {label} column: {e}")))
    }

    Ok(TaskRecord {
        task_id: row.task_id,
        status,
        message: row.message,
        input_data: decode("input_data", row.input_data)?,
        result: row.result.map(|v| decode("result", v)).transpose()?,
        original_content: row.original_content,
        summarized_content: row.summarized_content,
        fallacy: row.fallacy.map(|v| decode("fallacy", v)).transpose()?,
        created_at: row.created_at,
        updated_at: row.updated_at,
    })
}

#[async_trait]
impl CheckStore for PgCheckStore {
    async fn cached_fact(&self, fingerprint: &str) -> Option<FactCheckRecord> {
        let row: Result<Option<serde_json::Value>, _> =
            sqlx::query_scalar("SELECT record FROM fact_checks WHERE fingerprint = $1")
                .bind(fingerprint)
                .fetch_optional(&self.pool)
                .await;

        match row {
            Ok(Some(value)) => match serde_json::from_value(value) {
                Ok(record) => Some(record),
                Err(e) => {
                    warn!(fingerprint, error = %e, "cached record failed to decode");
                    None
                }
            },
            Ok(None) => None,
            Err(e) => {
                warn!(fingerprint, error = %e, "cache lookup failed");
                None
            }
        }
    }

    async fn put_fact(&self, fingerprint: &str, record: &FactCheckRecord) {
        let value = match serde_json::to_value(record) {
            Ok(v) => v,
            Err(e) => {
                warn!(fingerprint, error = %e, "fact-check record failed to serialize");
                return;
            }
        };

        let result = sqlx::query(
            r#"
            INSERT INTO fact_checks (fingerprint, record, updated_at)
            VALUES ($1, $2, now())
            ON CONFLICT (fingerprint)
            DO UPDATE SET record = EXCLUDED.record, updated_at = now()
            "#,
        )
        .bind(fingerprint)
        .bind(&value)
        .execute(&self.pool)
        .await;

        if let Err(e) = result {
            warn!(fingerprint, error = %e, "failed to write fact-check cache entry");
        }
    }

    async fn create_task(&self, task: &TaskRecord) -> Result<(), ClaimLensError> {
        let input = serde_json::to_value(&task.input_data)
            .map_err(|e| ClaimLensError::Database(e.to_string()))?;

        sqlx::query(
            r#"
            INSERT INTO tasks (task_id, status, message, input_data, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(task.task_id)
        .bind(task.status.to_string())
        .bind(&task.message)
        .bind(&input)
        .bind(task.created_at)
        .bind(task.updated_at)
        .execute(&self.pool)
        .await
        .map_err(db_err)?;

        Ok(())
    }

    async fn set_task_status(
        &self,
        task_id: Uuid,
        status: TaskStatus,
        message: &str,
    ) -> Result<(), ClaimLensError> {
        sqlx::query(
            "UPDATE tasks SET status = $2, message = $3, updated_at = now() WHERE task_id = $1",
        )
        .bind(task_id)
        .bind(status.to_string())
        .bind(message)
        .execute(&self.pool)
        .await
        .map_err(db_err)?;

        Ok(())
    }

    async fn complete_task(
        &self,
        task_id: Uuid,
        completion: &TaskCompletion,
    ) -> Result<(), ClaimLensError> {
        let result = serde_json::to_value(&completion.result)
            .map_err(|e| ClaimLensError::Database(e.to_string()))?;
        let fallacy = completion
            .fallacy
            .as_ref()
            .map(serde_json::to_value)
            .transpose()
            .map_err(|e| ClaimLensError::Database(e.to_string()))?;

        sqlx::query(
            r#"
            UPDATE tasks
            SET status = $2, message = $3, result = $4,
                original_content = $5, summarized_content = $6, fallacy = $7,
                updated_at = now()
            WHERE task_id = $1
            "#,
        )
        .bind(task_id)
        .bind(TaskStatus::Completed.to_string())
        .bind(&completion.message)
        .bind(&result)
        .bind(&completion.original_content)
        .bind(&completion.summarized_content)
        .bind(&fallacy)
        .execute(&self.pool)
        .await
        .map_err(db_err)?;

        Ok(())
    }

    async fn task(&self, task_id: Uuid) -> Result<Option<TaskRecord>, ClaimLensError> {
        let row: Option<TaskRow> = sqlx::query_as(
            r#"
            SELECT task_id, status, message, input_data, result,
                   original_content, summarized_content, fallacy,
                   created_at, updated_at
            FROM tasks WHERE task_id = $1
            "#,
        )
        .bind(task_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err)?;

        row.map(task_from_row).transpose()
    }
}
