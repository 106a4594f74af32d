//! libSQL run ledger (local file mode).
//!
//! The [`Ledger`] records every batch run and the per-prospect results it has
//! produced so far. Results are written one chunk at a time, so an interrupted
//! run can be resumed from its last finished chunk.

mod migrations;

use std::path::Path;

use chrono::{DateTime, Utc};
use libsql::{Connection, Database, params};
use outreach_shared::{OutreachError, ProcessingResult, Result, RunId};
use serde::{Deserialize, Serialize};

/// File name of the ledger database inside the output directory.
pub const LEDGER_FILE_NAME: &str = "ledger.db";

// ---------------------------------------------------------------------------
// Row types
// ---------------------------------------------------------------------------

/// Lifecycle state of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Running,
    Completed,
    /// Stopped by the operator between chunks.
    Cancelled,
    /// Stopped by a batch-fatal error (bad credentials).
    Aborted,
}

impl RunStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Cancelled => "cancelled",
            Self::Aborted => "aborted",
        }
    }

    fn parse(s: &str) -> Result<Self> {
        match s {
            "running" => Ok(Self::Running),
            "completed" => Ok(Self::Completed),
            "cancelled" => Ok(Self::Cancelled),
            "aborted" => Ok(Self::Aborted),
            other => Err(OutreachError::Storage(format!("unknown run status: {other}"))),
        }
    }

    /// Whether `--resume` may pick this run up again.
    pub fn is_resumable(&self) -> bool {
        !matches!(self, Self::Completed)
    }
}

impl std::fmt::Display for RunStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A row from the `runs` table.
#[derive(Debug, Clone, PartialEq)]
pub struct RunRecord {
    pub id: RunId,
    pub input_path: String,
    pub input_fingerprint: String,
    pub model_id: String,
    pub total: usize,
    pub status: RunStatus,
    pub started_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub summary_json: Option<String>,
}

/// Fields needed to start a run.
#[derive(Debug, Clone)]
pub struct NewRun<'a> {
    pub id: &'a RunId,
    pub input_path: &'a str,
    pub input_fingerprint: &'a str,
    pub model_id: &'a str,
    pub total: usize,
}

// ---------------------------------------------------------------------------
// Ledger
// ---------------------------------------------------------------------------

/// Run ledger handle wrapping a libSQL database.
pub struct Ledger {
    #[allow(dead_code)]
    db: Database,
    conn: Connection,
    readonly: bool,
}

impl Ledger {
    /// Open or create a ledger at `path` in read-write mode.
    pub async fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| OutreachError::io(parent, e))?;
        }

        let db = libsql::Builder::new_local(path)
            .build()
            .await
            .map_err(|e| OutreachError::Storage(e.to_string()))?;

        let conn = db
            .connect()
            .map_err(|e| OutreachError::Storage(e.to_string()))?;

        let ledger = Self {
            db,
            conn,
            readonly: false,
        };
        ledger.run_migrations().await?;
        Ok(ledger)
    }

    /// Open an existing ledger for inspection only.
    pub async fn open_readonly(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(OutreachError::Storage(format!(
                "no run ledger at {}",
                path.display()
            )));
        }

        let db = libsql::Builder::new_local(path)
            .build()
            .await
            .map_err(|e| OutreachError::Storage(e.to_string()))?;

        let conn = db
            .connect()
            .map_err(|e| OutreachError::Storage(e.to_string()))?;

        Ok(Self {
            db,
            conn,
            readonly: true,
        })
    }

    async fn run_migrations(&self) -> Result<()> {
        let current_version = self.get_schema_version().await;

        for migration in migrations::all_migrations() {
            if migration.version > current_version {
                tracing::info!(
                    version = migration.version,
                    description = migration.description,
                    "applying migration"
                );
                self.conn.execute_batch(migration.sql).await.map_err(|e| {
                    OutreachError::Storage(format!("migration v{} failed: {e}", migration.version))
                })?;
            }
        }
        Ok(())
    }

    /// Current schema version, or 0 before the first migration.
    async fn get_schema_version(&self) -> u32 {
        let result = self
            .conn
            .query("SELECT MAX(version) FROM schema_migrations", params![])
            .await;

        match result {
            Ok(mut rows) => match rows.next().await {
                Ok(Some(row)) => row.get::<u32>(0).unwrap_or(0),
                _ => 0,
            },
            Err(_) => 0, // table doesn't exist yet
        }
    }

    fn check_writable(&self) -> Result<()> {
        if self.readonly {
            return Err(OutreachError::Storage(
                "ledger is opened in read-only mode".into(),
            ));
        }
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Run operations
    // -----------------------------------------------------------------------

    /// Record the start of a run.
    pub async fn insert_run(&self, run: &NewRun<'_>) -> Result<()> {
        self.check_writable()?;
        let now = Utc::now().to_rfc3339();
        let id = run.id.to_string();
        self.conn
            .execute(
                "INSERT INTO runs
                   (id, input_path, input_fingerprint, model_id, total, status,
                    started_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                params![
                    id.as_str(),
                    run.input_path,
                    run.input_fingerprint,
                    run.model_id,
                    run.total as i64,
                    RunStatus::Running.as_str(),
                    now.as_str(),
                    now.as_str(),
                ],
            )
            .await
            .map_err(|e| OutreachError::Storage(e.to_string()))?;
        Ok(())
    }

    /// Get a run by ID.
    pub async fn get_run(&self, id: &RunId) -> Result<Option<RunRecord>> {
        let id = id.to_string();
        let mut rows = self
            .conn
            .query(
                "SELECT id, input_path, input_fingerprint, model_id, total, status,
                        started_at, updated_at, summary_json
                 FROM runs WHERE id = ?1",
                params![id.as_str()],
            )
            .await
            .map_err(|e| OutreachError::Storage(e.to_string()))?;

        match rows.next().await {
            Ok(Some(row)) => Ok(Some(row_to_run(&row)?)),
            Ok(None) => Ok(None),
            Err(e) => Err(OutreachError::Storage(e.to_string())),
        }
    }

    /// List runs, newest first.
    pub async fn list_runs(&self, limit: u32) -> Result<Vec<RunRecord>> {
        let mut rows = self
            .conn
            .query(
                "SELECT id, input_path, input_fingerprint, model_id, total, status,
                        started_at, updated_at, summary_json
                 FROM runs ORDER BY started_at DESC, id DESC LIMIT ?1",
                params![limit],
            )
            .await
            .map_err(|e| OutreachError::Storage(e.to_string()))?;

        let mut results = Vec::new();
        while let Some(row) = rows
            .next()
            .await
            .map_err(|e| OutreachError::Storage(e.to_string()))?
        {
            results.push(row_to_run(&row)?);
        }
        Ok(results)
    }

    /// Set a run's status, optionally attaching a JSON summary.
    pub async fn set_run_status(
        &self,
        id: &RunId,
        status: RunStatus,
        summary_json: Option<&str>,
    ) -> Result<()> {
        self.check_writable()?;
        let id = id.to_string();
        let now = Utc::now().to_rfc3339();
        self.conn
            .execute(
                "UPDATE runs
                 SET status = ?1, updated_at = ?2, summary_json = COALESCE(?3, summary_json)
                 WHERE id = ?4",
                params![status.as_str(), now.as_str(), summary_json, id.as_str()],
            )
            .await
            .map_err(|e| OutreachError::Storage(e.to_string()))?;
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Result operations
    // -----------------------------------------------------------------------

    /// Persist a chunk of results in one transaction (upsert by position).
    pub async fn save_results(&self, run_id: &RunId, results: &[ProcessingResult]) -> Result<()> {
        self.check_writable()?;
        if results.is_empty() {
            return Ok(());
        }

        let id = run_id.to_string();
        let now = Utc::now().to_rfc3339();

        let tx = self
            .conn
            .transaction()
            .await
            .map_err(|e| OutreachError::Storage(e.to_string()))?;

        for result in results {
            let json = serde_json::to_string(result)
                .map_err(|e| OutreachError::Storage(format!("serialize result: {e}")))?;
            tx.execute(
                "INSERT INTO results (run_id, position, status, result_json, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)
                 ON CONFLICT(run_id, position) DO UPDATE SET
                   status = excluded.status,
                   result_json = excluded.result_json,
                   updated_at = excluded.updated_at",
                params![
                    id.as_str(),
                    result.position as i64,
                    result.status.as_str(),
                    json.as_str(),
                    now.as_str(),
                ],
            )
            .await
            .map_err(|e| OutreachError::Storage(e.to_string()))?;
        }

        tx.execute(
            "UPDATE runs SET updated_at = ?1 WHERE id = ?2",
            params![now.as_str(), id.as_str()],
        )
        .await
        .map_err(|e| OutreachError::Storage(e.to_string()))?;

        tx.commit()
            .await
            .map_err(|e| OutreachError::Storage(e.to_string()))?;

        tracing::debug!(run_id = %run_id, count = results.len(), "saved results");
        Ok(())
    }

    /// Load every stored result for a run, in input order.
    pub async fn load_results(&self, run_id: &RunId) -> Result<Vec<ProcessingResult>> {
        let id = run_id.to_string();
        let mut rows = self
            .conn
            .query(
                "SELECT result_json FROM results WHERE run_id = ?1 ORDER BY position",
                params![id.as_str()],
            )
            .await
            .map_err(|e| OutreachError::Storage(e.to_string()))?;

        let mut results = Vec::new();
        while let Some(row) = rows
            .next()
            .await
            .map_err(|e| OutreachError::Storage(e.to_string()))?
        {
            let json: String = row
                .get(0)
                .map_err(|e| OutreachError::Storage(e.to_string()))?;
            let result: ProcessingResult = serde_json::from_str(&json)
                .map_err(|e| OutreachError::Storage(format!("corrupt result row: {e}")))?;
            results.push(result);
        }
        Ok(results)
    }
}

fn row_to_run(row: &libsql::Row) -> Result<RunRecord> {
    let storage = |e: libsql::Error| OutreachError::Storage(e.to_string());

    let id: String = row.get(0).map_err(storage)?;
    let status: String = row.get(5).map_err(storage)?;
    let started_at: String = row.get(6).map_err(storage)?;
    let updated_at: String = row.get(7).map_err(storage)?;

    Ok(RunRecord {
        id: id
            .parse()
            .map_err(|e| OutreachError::Storage(format!("invalid run id {id}: {e}")))?,
        input_path: row.get(1).map_err(storage)?,
        input_fingerprint: row.get(2).map_err(storage)?,
        model_id: row.get(3).map_err(storage)?,
        total: row.get::<i64>(4).map_err(storage)? as usize,
        status: RunStatus::parse(&status)?,
        started_at: parse_timestamp(&started_at)?,
        updated_at: parse_timestamp(&updated_at)?,
        summary_json: row.get::<String>(8).ok(),
    })
}

fn parse_timestamp(s: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| OutreachError::Storage(format!("invalid date: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use outreach_shared::{ProcessingStatus, Prospect, ResearchRecord};
    use uuid::Uuid;

    async fn test_ledger() -> Ledger {
        let tmp = std::env::temp_dir().join(format!("outreach_test_{}.db", Uuid::now_v7()));
        Ledger::open(&tmp).await.expect("open test db")
    }

    fn result(position: usize, status: ProcessingStatus) -> ProcessingResult {
        ProcessingResult {
            position,
            prospect: Prospect::new(format!("Person {position}"), "Acme", None),
            research: Some(ResearchRecord::empty()),
            email: None,
            status,
            failure: None,
            error_detail: None,
            research_match: None,
            email_subject_found: None,
            attempts: 1,
        }
    }

    async fn start_run(ledger: &Ledger, total: usize) -> RunId {
        let id = RunId::new();
        ledger
            .insert_run(&NewRun {
                id: &id,
                input_path: "prospects.csv",
                input_fingerprint: "abc",
                model_id: "openai-main/gpt-5",
                total,
            })
            .await
            .expect("insert run");
        id
    }

    #[tokio::test]
    async fn open_and_migrate() {
        let ledger = test_ledger().await;
        assert_eq!(ledger.get_schema_version().await, 1);
    }

    #[tokio::test]
    async fn idempotent_migration() {
        let tmp = std::env::temp_dir().join(format!("outreach_test_{}.db", Uuid::now_v7()));
        let first = Ledger::open(&tmp).await.expect("first open");
        drop(first);
        let second = Ledger::open(&tmp).await.expect("second open");
        assert_eq!(second.get_schema_version().await, 1);
    }

    #[tokio::test]
    async fn run_lifecycle() {
        let ledger = test_ledger().await;
        let id = start_run(&ledger, 3).await;

        let run = ledger.get_run(&id).await.unwrap().expect("run exists");
        assert_eq!(run.id, id);
        assert_eq!(run.total, 3);
        assert_eq!(run.status, RunStatus::Running);
        assert!(run.summary_json.is_none());

        ledger
            .set_run_status(&id, RunStatus::Completed, Some(r#"{"completed":3}"#))
            .await
            .unwrap();
        let run = ledger.get_run(&id).await.unwrap().unwrap();
        assert_eq!(run.status, RunStatus::Completed);
        assert!(!run.status.is_resumable());
        assert_eq!(run.summary_json.as_deref(), Some(r#"{"completed":3}"#));

        assert!(ledger.get_run(&RunId::new()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn list_runs_newest_first() {
        let ledger = test_ledger().await;
        let first = start_run(&ledger, 1).await;
        let second = start_run(&ledger, 2).await;

        let runs = ledger.list_runs(10).await.unwrap();
        assert_eq!(runs.len(), 2);
        assert_eq!(runs[0].id, second);
        assert_eq!(runs[1].id, first);

        assert_eq!(ledger.list_runs(1).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn results_roundtrip_in_position_order() {
        let ledger = test_ledger().await;
        let id = start_run(&ledger, 4).await;

        ledger
            .save_results(
                &id,
                &[
                    result(2, ProcessingStatus::Failure),
                    result(3, ProcessingStatus::Completed),
                ],
            )
            .await
            .unwrap();
        ledger
            .save_results(
                &id,
                &[
                    result(0, ProcessingStatus::Completed),
                    result(1, ProcessingStatus::PartialFailure),
                ],
            )
            .await
            .unwrap();

        let loaded = ledger.load_results(&id).await.unwrap();
        let positions: Vec<_> = loaded.iter().map(|r| r.position).collect();
        assert_eq!(positions, vec![0, 1, 2, 3]);
        assert_eq!(loaded[2].status, ProcessingStatus::Failure);
        assert_eq!(loaded[0], result(0, ProcessingStatus::Completed));
    }

    #[tokio::test]
    async fn save_results_upserts_by_position() {
        let ledger = test_ledger().await;
        let id = start_run(&ledger, 1).await;

        ledger
            .save_results(&id, &[result(0, ProcessingStatus::Failure)])
            .await
            .unwrap();
        ledger
            .save_results(&id, &[result(0, ProcessingStatus::Completed)])
            .await
            .unwrap();

        let loaded = ledger.load_results(&id).await.unwrap();
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded[0].status, ProcessingStatus::Completed);
    }

    #[tokio::test]
    async fn results_are_scoped_to_run() {
        let ledger = test_ledger().await;
        let a = start_run(&ledger, 1).await;
        let b = start_run(&ledger, 1).await;
        ledger
            .save_results(&a, &[result(0, ProcessingStatus::Completed)])
            .await
            .unwrap();
        assert!(ledger.load_results(&b).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn unreadable_result_row_fails_the_load() {
        let ledger = test_ledger().await;
        let id = start_run(&ledger, 3).await;
        ledger
            .save_results(
                &id,
                &[
                    result(0, ProcessingStatus::Completed),
                    result(2, ProcessingStatus::Completed),
                ],
            )
            .await
            .unwrap();
        ledger
            .conn
            .execute(
                "INSERT INTO results (run_id, position, status, result_json, updated_at)
                 VALUES (?1, 1, 'completed', '{truncated', '2026-01-01T00:00:00Z')",
                params![id.to_string()],
            )
            .await
            .unwrap();

        // resume must not continue with a partial result set
        let err = ledger.load_results(&id).await.unwrap_err();
        assert!(matches!(err, OutreachError::Storage(_)));
        assert!(err.to_string().contains("corrupt result row"));
    }

    #[tokio::test]
    async fn readonly_rejects_writes() {
        let tmp = std::env::temp_dir().join(format!("outreach_test_{}.db", Uuid::now_v7()));
        drop(Ledger::open(&tmp).await.unwrap());

        let ledger = Ledger::open_readonly(&tmp).await.unwrap();
        let id = RunId::new();
        let err = ledger
            .insert_run(&NewRun {
                id: &id,
                input_path: "x",
                input_fingerprint: "y",
                model_id: "z",
                total: 0,
            })
            .await
            .unwrap_err();
        assert!(err.to_string().contains("read-only"));
        assert!(ledger.list_runs(5).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn readonly_requires_existing_file() {
        let tmp = std::env::temp_dir().join(format!("outreach_missing_{}.db", Uuid::now_v7()));
        assert!(Ledger::open_readonly(&tmp).await.is_err());
    }
}
