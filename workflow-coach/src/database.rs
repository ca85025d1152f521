//! SQLite storage for workflows, insights and patterns
//!
//! This module provides the durable [`WorkflowRepository`] used by the coach.
//! Data persists across restarts and every append happens inside a single
//! transaction, so concurrent appends to one workflow never lose elements.
//!
//! # Database Schema
//!
//! 1. **workflows** - Workflow state; command and model-switch sequences are
//!    JSON arrays, the latest analysis is a JSON document
//! 2. **insights** - Stored coaching insights with lifecycle columns
//! 3. **workflow_patterns** - Historical behaviour patterns per user
//! 4. **schema_version** - Database schema version for migrations
//!
//! A partial unique index on `workflows(user_id, session_id) WHERE status = 'active'`
//! enforces at most one active workflow per (user, session).
//!
//! # Example Usage
//!
//! ```rust,no_run
//! use workflow_coach::database::Database;
//!
//! # fn main() -> anyhow::Result<()> {
//! let db = Database::new("/tmp/coach.db".into())?;
//! db.initialize_schema()?;
//! println!("schema v{}", db.get_schema_version()?);
//! # Ok(())
//! # }
//! ```
//!
//! Timestamps are stored as fixed-width RFC 3339 UTC strings so that text
//! ordering matches time ordering.

use anyhow::{anyhow, Context, Result};
use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::path::PathBuf;
use std::sync::{Mutex, MutexGuard};
use uuid::Uuid;
use workflow_coach_sdk::{
    async_trait, Command, ComplexityLevel, Feedback, ModelSwitch, RepositoryResult,
    StoredInsight, Workflow, WorkflowAnalysis, WorkflowPattern, WorkflowRepository,
    WorkflowStatus, WorkflowType,
};

pub const SCHEMA_VERSION: i32 = 1;

const WORKFLOW_COLUMNS: &str = r#"
    id, user_id, session_id, workflow_type, status, command_sequence,
    model_switch_patterns, total_steps, efficiency_score, complexity_level,
    analysis, last_analyzed_at, created_at, updated_at, completed_at
"#;

const INSIGHT_COLUMNS: &str = r#"
    id, user_id, workflow_id, content, created_at, expires_at, was_shown,
    shown_at, user_feedback, feedback_details, was_acted_upon
"#;

/// Database wrapper for coach persistence
pub struct Database {
    conn: Mutex<Connection>,
}

impl Database {
    /// Open (or create) a database at the specified path
    pub fn new(path: PathBuf) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(&path)
            .with_context(|| format!("Failed to open database at {}", path.display()))?;

        // WAL for concurrent readers
        conn.pragma_update(None, "journal_mode", "WAL")?;
        conn.pragma_update(None, "foreign_keys", "ON")?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Create an in-memory database with the schema applied
    pub fn new_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.pragma_update(None, "foreign_keys", "ON")?;
        let db = Self {
            conn: Mutex::new(conn),
        };
        db.initialize_schema()?;
        Ok(db)
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| anyhow!("Database connection mutex poisoned"))
    }

    /// Initialize database schema with all tables and indexes
    pub fn initialize_schema(&self) -> Result<()> {
        let conn = self.conn()?;

        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS workflows (
                id TEXT PRIMARY KEY,
                user_id TEXT NOT NULL,
                session_id TEXT NOT NULL,
                workflow_type TEXT NOT NULL,
                status TEXT NOT NULL,

                -- Append-only sequences (JSON arrays)
                command_sequence TEXT NOT NULL DEFAULT '[]',
                model_switch_patterns TEXT NOT NULL DEFAULT '[]',
                total_steps INTEGER NOT NULL DEFAULT 0,

                -- Analysis annotations
                efficiency_score INTEGER,
                complexity_level TEXT,
                analysis TEXT,
                last_analyzed_at TEXT,

                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL,
                completed_at TEXT
            );

            CREATE UNIQUE INDEX IF NOT EXISTS idx_workflows_active_session
                ON workflows(user_id, session_id) WHERE status = 'active';
            CREATE INDEX IF NOT EXISTS idx_workflows_user_created
                ON workflows(user_id, created_at DESC);
            "#,
        )?;

        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS insights (
                id TEXT PRIMARY KEY,
                user_id TEXT NOT NULL,
                workflow_id TEXT NOT NULL,
                content TEXT NOT NULL,
                priority_rank INTEGER NOT NULL,
                created_at TEXT NOT NULL,
                expires_at TEXT NOT NULL,
                was_shown INTEGER NOT NULL DEFAULT 0,
                shown_at TEXT,
                user_feedback TEXT,
                feedback_details TEXT,
                was_acted_upon INTEGER NOT NULL DEFAULT 0,

                FOREIGN KEY(workflow_id) REFERENCES workflows(id)
            );

            CREATE INDEX IF NOT EXISTS idx_insights_pending
                ON insights(user_id, was_shown, expires_at);
            "#,
        )?;

        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS workflow_patterns (
                user_id TEXT NOT NULL,
                pattern_name TEXT NOT NULL,
                frequency INTEGER NOT NULL DEFAULT 0,
                PRIMARY KEY(user_id, pattern_name)
            );

            CREATE TABLE IF NOT EXISTS schema_version (
                version INTEGER PRIMARY KEY,
                applied_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
            );
            "#,
        )?;

        conn.execute(
            "INSERT OR IGNORE INTO schema_version (version) VALUES (?1)",
            params![SCHEMA_VERSION],
        )?;

        Ok(())
    }

    /// Get current schema version
    pub fn get_schema_version(&self) -> Result<i32> {
        let version: i32 = self.conn()?.query_row(
            "SELECT MAX(version) FROM schema_version",
            [],
            |row| row.get(0),
        )?;
        Ok(version)
    }

    pub fn find_active_workflow(
        &self,
        user_id: &str,
        session_id: &str,
    ) -> Result<Option<Workflow>> {
        let conn = self.conn()?;
        let workflow = conn
            .query_row(
                &format!(
                    "SELECT {} FROM workflows
                     WHERE user_id = ?1 AND session_id = ?2 AND status = 'active'",
                    WORKFLOW_COLUMNS
                ),
                params![user_id, session_id],
                map_workflow_row,
            )
            .optional()?;
        Ok(workflow)
    }

    pub fn insert_workflow(&self, wf: &Workflow) -> Result<()> {
        let analysis = wf.analysis.as_ref().map(serde_json::to_string).transpose()?;

        self.conn()?.execute(
            r#"
            INSERT INTO workflows (
                id, user_id, session_id, workflow_type, status, command_sequence,
                model_switch_patterns, total_steps, efficiency_score, complexity_level,
                analysis, last_analyzed_at, created_at, updated_at, completed_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15)
            "#,
            params![
                wf.id.to_string(),
                wf.user_id,
                wf.session_id,
                wf.workflow_type.as_str(),
                wf.status.as_str(),
                serde_json::to_string(&wf.command_sequence)?,
                serde_json::to_string(&wf.model_switch_patterns)?,
                wf.total_steps as i64,
                wf.efficiency_score,
                wf.complexity_level.map(|l| l.as_str()),
                analysis,
                wf.last_analyzed_at.map(timestamp),
                timestamp(wf.created_at),
                timestamp(wf.updated_at),
                wf.completed_at.map(timestamp),
            ],
        )?;

        Ok(())
    }

    pub fn get_workflow(&self, id: &Uuid) -> Result<Option<Workflow>> {
        let conn = self.conn()?;
        load_workflow(&conn, id)
    }

    /// Append a command in one transaction and return the updated workflow
    pub fn append_command(&self, id: &Uuid, command: &Command) -> Result<Workflow> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;

        let mut wf = load_workflow(&tx, id)?.ok_or_else(|| anyhow!("Workflow not found: {}", id))?;
        wf.command_sequence.push(command.clone());
        wf.total_steps = wf.command_sequence.len();
        wf.updated_at = command.timestamp;

        tx.execute(
            r#"
            UPDATE workflows
            SET command_sequence = ?1, total_steps = ?2, updated_at = ?3
            WHERE id = ?4
            "#,
            params![
                serde_json::to_string(&wf.command_sequence)?,
                wf.total_steps as i64,
                timestamp(wf.updated_at),
                id.to_string(),
            ],
        )?;

        tx.commit()?;
        Ok(wf)
    }

    /// Append a model switch in one transaction and return the updated workflow
    pub fn append_model_switch(&self, id: &Uuid, switch: &ModelSwitch) -> Result<Workflow> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;

        let mut wf = load_workflow(&tx, id)?.ok_or_else(|| anyhow!("Workflow not found: {}", id))?;
        wf.model_switch_patterns.push(switch.clone());
        wf.updated_at = switch.timestamp;

        tx.execute(
            "UPDATE workflows SET model_switch_patterns = ?1, updated_at = ?2 WHERE id = ?3",
            params![
                serde_json::to_string(&wf.model_switch_patterns)?,
                timestamp(wf.updated_at),
                id.to_string(),
            ],
        )?;

        tx.commit()?;
        Ok(wf)
    }

    pub fn touch_workflow(&self, id: &Uuid, at: DateTime<Utc>) -> Result<Workflow> {
        let conn = self.conn()?;
        let updated = conn.execute(
            "UPDATE workflows SET updated_at = ?1 WHERE id = ?2",
            params![timestamp(at), id.to_string()],
        )?;
        if updated == 0 {
            return Err(anyhow!("Workflow not found: {}", id));
        }
        load_workflow(&conn, id)?.ok_or_else(|| anyhow!("Workflow not found: {}", id))
    }

    pub fn save_analysis(
        &self,
        id: &Uuid,
        analysis: &WorkflowAnalysis,
        analyzed_at: DateTime<Utc>,
    ) -> Result<()> {
        let updated = self.conn()?.execute(
            r#"
            UPDATE workflows
            SET efficiency_score = ?1, complexity_level = ?2, analysis = ?3, last_analyzed_at = ?4
            WHERE id = ?5
            "#,
            params![
                analysis.efficiency_score,
                analysis.complexity_assessment.level.as_str(),
                serde_json::to_string(analysis)?,
                timestamp(analyzed_at),
                id.to_string(),
            ],
        )?;
        if updated == 0 {
            return Err(anyhow!("Workflow not found: {}", id));
        }
        Ok(())
    }

    pub fn complete_workflow(&self, id: &Uuid, at: DateTime<Utc>) -> Result<bool> {
        let updated = self.conn()?.execute(
            r#"
            UPDATE workflows
            SET status = 'completed', completed_at = ?1, updated_at = ?1
            WHERE id = ?2
            "#,
            params![timestamp(at), id.to_string()],
        )?;
        Ok(updated > 0)
    }

    /// Most recent workflows of a user, newest first
    pub fn list_user_workflows(&self, user_id: &str, limit: usize) -> Result<Vec<Workflow>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM workflows WHERE user_id = ?1 ORDER BY created_at DESC LIMIT ?2",
            WORKFLOW_COLUMNS
        ))?;

        let workflows = stmt
            .query_map(params![user_id, limit as i64], map_workflow_row)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(workflows)
    }

    pub fn list_patterns(&self, user_id: &str) -> Result<Vec<WorkflowPattern>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT user_id, pattern_name, frequency
            FROM workflow_patterns
            WHERE user_id = ?1
            ORDER BY frequency DESC, pattern_name ASC
            "#,
        )?;

        let patterns = stmt
            .query_map(params![user_id], |row| {
                Ok(WorkflowPattern {
                    user_id: row.get(0)?,
                    pattern_name: row.get(1)?,
                    frequency: row.get(2)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(patterns)
    }

    /// Record one more occurrence of a pattern, returning its new frequency
    pub fn record_pattern(&self, user_id: &str, pattern_name: &str) -> Result<u32> {
        let conn = self.conn()?;
        conn.execute(
            r#"
            INSERT INTO workflow_patterns (user_id, pattern_name, frequency) VALUES (?1, ?2, 1)
            ON CONFLICT(user_id, pattern_name) DO UPDATE SET frequency = frequency + 1
            "#,
            params![user_id, pattern_name],
        )?;
        let frequency = conn.query_row(
            "SELECT frequency FROM workflow_patterns WHERE user_id = ?1 AND pattern_name = ?2",
            params![user_id, pattern_name],
            |row| row.get(0),
        )?;
        Ok(frequency)
    }

    pub fn insert_insight(&self, insight: &StoredInsight) -> Result<()> {
        self.conn()?.execute(
            r#"
            INSERT INTO insights (
                id, user_id, workflow_id, content, priority_rank, created_at, expires_at,
                was_shown, shown_at, user_feedback, feedback_details, was_acted_upon
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)
            "#,
            params![
                insight.id.to_string(),
                insight.user_id,
                insight.workflow_id.to_string(),
                serde_json::to_string(&insight.insight)?,
                insight.insight.priority.rank(),
                timestamp(insight.created_at),
                timestamp(insight.expires_at),
                insight.was_shown,
                insight.shown_at.map(timestamp),
                insight.user_feedback.map(|f| f.as_str()),
                insight.feedback_details,
                insight.was_acted_upon,
            ],
        )?;
        Ok(())
    }

    pub fn get_insight(&self, id: &Uuid) -> Result<Option<StoredInsight>> {
        let insight = self
            .conn()?
            .query_row(
                &format!("SELECT {} FROM insights WHERE id = ?1", INSIGHT_COLUMNS),
                params![id.to_string()],
                map_insight_row,
            )
            .optional()?;
        Ok(insight)
    }

    /// Unshown insights not yet expired, by priority then recency
    pub fn list_pending_insights(
        &self,
        user_id: &str,
        now: DateTime<Utc>,
        limit: usize,
    ) -> Result<Vec<StoredInsight>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            r#"
            SELECT {}
            FROM insights
            WHERE user_id = ?1 AND was_shown = 0 AND expires_at >= ?2
            ORDER BY priority_rank DESC, created_at DESC
            LIMIT ?3
            "#,
            INSIGHT_COLUMNS
        ))?;

        let insights = stmt
            .query_map(params![user_id, timestamp(now), limit as i64], map_insight_row)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(insights)
    }

    pub fn mark_insight_shown(&self, id: &Uuid, at: DateTime<Utc>) -> Result<bool> {
        let updated = self.conn()?.execute(
            "UPDATE insights SET was_shown = 1, shown_at = ?1 WHERE id = ?2",
            params![timestamp(at), id.to_string()],
        )?;
        Ok(updated > 0)
    }

    pub fn record_insight_feedback(
        &self,
        id: &Uuid,
        feedback: Feedback,
        details: Option<&str>,
        acted_upon: bool,
    ) -> Result<bool> {
        let updated = self.conn()?.execute(
            r#"
            UPDATE insights
            SET user_feedback = ?1, feedback_details = ?2, was_acted_upon = ?3
            WHERE id = ?4
            "#,
            params![feedback.as_str(), details, acted_upon, id.to_string()],
        )?;
        Ok(updated > 0)
    }

    /// Delete insights that expired before `now`
    pub fn delete_expired_insights(&self, now: DateTime<Utc>) -> Result<usize> {
        let deleted = self.conn()?.execute(
            "DELETE FROM insights WHERE expires_at < ?1",
            params![timestamp(now)],
        )?;
        Ok(deleted)
    }
}

#[async_trait]
impl WorkflowRepository for Database {
    async fn find_active_workflow(
        &self,
        user_id: &str,
        session_id: &str,
    ) -> RepositoryResult<Option<Workflow>> {
        Ok(Database::find_active_workflow(self, user_id, session_id)?)
    }

    async fn create_workflow(&self, workflow: &Workflow) -> RepositoryResult<()> {
        Ok(self.insert_workflow(workflow)?)
    }

    async fn get_workflow(&self, id: &Uuid) -> RepositoryResult<Option<Workflow>> {
        Ok(Database::get_workflow(self, id)?)
    }

    async fn append_command(&self, id: &Uuid, command: &Command) -> RepositoryResult<Workflow> {
        Ok(Database::append_command(self, id, command)?)
    }

    async fn append_model_switch(
        &self,
        id: &Uuid,
        switch: &ModelSwitch,
    ) -> RepositoryResult<Workflow> {
        Ok(Database::append_model_switch(self, id, switch)?)
    }

    async fn touch_workflow(&self, id: &Uuid, at: DateTime<Utc>) -> RepositoryResult<Workflow> {
        Ok(Database::touch_workflow(self, id, at)?)
    }

    async fn save_analysis(
        &self,
        id: &Uuid,
        analysis: &WorkflowAnalysis,
        analyzed_at: DateTime<Utc>,
    ) -> RepositoryResult<()> {
        Ok(Database::save_analysis(self, id, analysis, analyzed_at)?)
    }

    async fn complete_workflow(&self, id: &Uuid, at: DateTime<Utc>) -> RepositoryResult<bool> {
        Ok(Database::complete_workflow(self, id, at)?)
    }

    async fn list_user_workflows(
        &self,
        user_id: &str,
        limit: usize,
    ) -> RepositoryResult<Vec<Workflow>> {
        Ok(Database::list_user_workflows(self, user_id, limit)?)
    }

    async fn list_patterns(&self, user_id: &str) -> RepositoryResult<Vec<WorkflowPattern>> {
        Ok(Database::list_patterns(self, user_id)?)
    }

    async fn insert_insight(&self, insight: &StoredInsight) -> RepositoryResult<()> {
        Ok(Database::insert_insight(self, insight)?)
    }

    async fn get_insight(&self, id: &Uuid) -> RepositoryResult<Option<StoredInsight>> {
        Ok(Database::get_insight(self, id)?)
    }

    async fn list_pending_insights(
        &self,
        user_id: &str,
        now: DateTime<Utc>,
        limit: usize,
    ) -> RepositoryResult<Vec<StoredInsight>> {
        Ok(Database::list_pending_insights(self, user_id, now, limit)?)
    }

    async fn mark_insight_shown(&self, id: &Uuid, at: DateTime<Utc>) -> RepositoryResult<bool> {
        Ok(Database::mark_insight_shown(self, id, at)?)
    }

    async fn record_insight_feedback(
        &self,
        id: &Uuid,
        feedback: Feedback,
        details: Option<&str>,
        acted_upon: bool,
    ) -> RepositoryResult<bool> {
        Ok(Database::record_insight_feedback(
            self, id, feedback, details, acted_upon,
        )?)
    }

    async fn delete_expired_insights(&self, now: DateTime<Utc>) -> RepositoryResult<usize> {
        Ok(Database::delete_expired_insights(self, now)?)
    }
}

// Helper functions for mapping between database and Rust types

fn timestamp(dt: DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn load_workflow(conn: &Connection, id: &Uuid) -> Result<Option<Workflow>> {
    let workflow = conn
        .query_row(
            &format!("SELECT {} FROM workflows WHERE id = ?1", WORKFLOW_COLUMNS),
            params![id.to_string()],
            map_workflow_row,
        )
        .optional()?;
    Ok(workflow)
}

fn conversion_error<E>(idx: usize, e: E) -> rusqlite::Error
where
    E: std::error::Error + Send + Sync + 'static,
{
    rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e))
}

fn invalid_value(idx: usize, what: &str, value: &str) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(
        idx,
        rusqlite::types::Type::Text,
        format!("Unknown {}: {}", what, value).into(),
    )
}

fn parse_uuid(row: &Row, idx: usize) -> rusqlite::Result<Uuid> {
    let s: String = row.get(idx)?;
    Uuid::parse_str(&s).map_err(|e| conversion_error(idx, e))
}

fn parse_time(row: &Row, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
    let s: String = row.get(idx)?;
    DateTime::parse_from_rfc3339(&s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| conversion_error(idx, e))
}

fn parse_optional_time(row: &Row, idx: usize) -> rusqlite::Result<Option<DateTime<Utc>>> {
    let s: Option<String> = row.get(idx)?;
    s.map(|s| {
        DateTime::parse_from_rfc3339(&s)
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(|e| conversion_error(idx, e))
    })
    .transpose()
}

fn parse_json<T: serde::de::DeserializeOwned>(row: &Row, idx: usize) -> rusqlite::Result<T> {
    let s: String = row.get(idx)?;
    serde_json::from_str(&s).map_err(|e| conversion_error(idx, e))
}

/// Map a database row to Workflow
fn map_workflow_row(row: &Row) -> rusqlite::Result<Workflow> {
    let workflow_type: String = row.get(3)?;
    let status: String = row.get(4)?;
    let total_steps: i64 = row.get(7)?;
    let complexity_level: Option<String> = row.get(9)?;
    let analysis: Option<String> = row.get(10)?;

    Ok(Workflow {
        id: parse_uuid(row, 0)?,
        user_id: row.get(1)?,
        session_id: row.get(2)?,
        workflow_type: WorkflowType::parse(&workflow_type)
            .ok_or_else(|| invalid_value(3, "workflow type", &workflow_type))?,
        status: WorkflowStatus::parse(&status)
            .ok_or_else(|| invalid_value(4, "workflow status", &status))?,
        command_sequence: parse_json(row, 5)?,
        model_switch_patterns: parse_json(row, 6)?,
        total_steps: total_steps.max(0) as usize,
        efficiency_score: row.get(8)?,
        complexity_level: complexity_level
            .map(|l| {
                ComplexityLevel::parse(&l).ok_or_else(|| invalid_value(9, "complexity level", &l))
            })
            .transpose()?,
        analysis: analysis
            .map(|a| serde_json::from_str(&a).map_err(|e| conversion_error(10, e)))
            .transpose()?,
        last_analyzed_at: parse_optional_time(row, 11)?,
        created_at: parse_time(row, 12)?,
        updated_at: parse_time(row, 13)?,
        completed_at: parse_optional_time(row, 14)?,
    })
}

/// Map a database row to StoredInsight
fn map_insight_row(row: &Row) -> rusqlite::Result<StoredInsight> {
    let feedback: Option<String> = row.get(8)?;

    Ok(StoredInsight {
        id: parse_uuid(row, 0)?,
        user_id: row.get(1)?,
        workflow_id: parse_uuid(row, 2)?,
        insight: parse_json(row, 3)?,
        created_at: parse_time(row, 4)?,
        expires_at: parse_time(row, 5)?,
        was_shown: row.get(6)?,
        shown_at: parse_optional_time(row, 7)?,
        user_feedback: feedback
            .map(|f| Feedback::parse(&f).ok_or_else(|| invalid_value(8, "feedback", &f)))
            .transpose()?,
        feedback_details: row.get(9)?,
        was_acted_upon: row.get(10)?,
    })
}
