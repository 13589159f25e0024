//! Task record storage.
//!
//! Writes are guarded by the record's `version`; a write that matches zero
//! rows is reported as either `NotFound` or `Conflict`, never silently lost.

use super::{Database, from_ms, is_constraint_violation, to_ms};
use crate::error::ApiError;
use crate::types::{AnnotatedTask, TaskRecord};
use anyhow::Result;
use chrono::{DateTime, Utc};
use rusqlite::{Connection, OptionalExtension, Row, params};

const TASK_COLUMNS: &str =
    "t.id, t.owner_id, t.queue_name, t.start_time, t.end_time, t.comment, t.version, t.created_at, t.updated_at";

pub fn parse_task_row(row: &Row) -> rusqlite::Result<TaskRecord> {
    let start_time: i64 = row.get("start_time")?;
    let end_time: Option<i64> = row.get("end_time")?;
    let created_at: i64 = row.get("created_at")?;
    let updated_at: i64 = row.get("updated_at")?;

    Ok(TaskRecord {
        id: row.get("id")?,
        owner_id: row.get("owner_id")?,
        queue_name: row.get("queue_name")?,
        start_time: from_ms(start_time),
        end_time: end_time.map(from_ms),
        comment: row.get("comment")?,
        version: row.get("version")?,
        created_at: from_ms(created_at),
        updated_at: from_ms(updated_at),
    })
}

fn query_tasks(
    conn: &Connection,
    sql: &str,
    params: impl rusqlite::Params,
) -> Result<Vec<TaskRecord>> {
    let mut stmt = conn.prepare(sql)?;
    let tasks = stmt
        .query_map(params, parse_task_row)?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(tasks)
}

/// Distinguish a vanished row from a stale version after a guarded write
/// matched nothing.
fn stale_write_error(conn: &Connection, task_id: &str, expected: i64) -> Result<anyhow::Error> {
    let actual: Option<i64> = conn
        .query_row(
            "SELECT version FROM tasks WHERE id = ?1",
            params![task_id],
            |row| row.get(0),
        )
        .optional()?;
    Ok(match actual {
        None => ApiError::task_not_found(task_id).into(),
        Some(actual) => ApiError::version_conflict(task_id, expected, actual).into(),
    })
}

impl Database {
    /// Insert a new record. An open record for an owner who already has one
    /// trips the partial unique index and surfaces as `Conflict`.
    pub fn insert_task(&self, task: &TaskRecord) -> Result<()> {
        self.with_conn(|conn| {
            let inserted = conn.execute(
                "INSERT INTO tasks (id, owner_id, queue_name, start_time, end_time, comment, version, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
                params![
                    &task.id,
                    &task.owner_id,
                    &task.queue_name,
                    to_ms(task.start_time),
                    task.end_time.map(to_ms),
                    &task.comment,
                    task.version,
                    to_ms(task.created_at),
                    to_ms(task.updated_at),
                ],
            );

            match inserted {
                Ok(_) => Ok(()),
                Err(e) if is_constraint_violation(&e) && task.end_time.is_none() => {
                    let open_id: Option<String> = conn
                        .query_row(
                            "SELECT id FROM tasks WHERE owner_id = ?1 AND end_time IS NULL",
                            params![&task.owner_id],
                            |row| row.get(0),
                        )
                        .optional()?;
                    match open_id {
                        Some(id) => Err(ApiError::open_task_exists(&id).into()),
                        None => Err(e.into()),
                    }
                }
                Err(e) => Err(e.into()),
            }
        })
    }

    /// Get a record by ID.
    pub fn get_task(&self, task_id: &str) -> Result<Option<TaskRecord>> {
        self.with_conn(|conn| {
            let task = conn
                .query_row(
                    &format!("SELECT {} FROM tasks t WHERE t.id = ?1", TASK_COLUMNS),
                    params![task_id],
                    parse_task_row,
                )
                .optional()?;
            Ok(task)
        })
    }

    /// The owner's open record, if any.
    pub fn open_task_for_owner(&self, owner_id: &str) -> Result<Option<TaskRecord>> {
        Ok(self.open_tasks_for_owner(owner_id)?.into_iter().next())
    }

    /// All open records of an owner, oldest first.
    pub fn open_tasks_for_owner(&self, owner_id: &str) -> Result<Vec<TaskRecord>> {
        self.with_conn(|conn| {
            query_tasks(
                conn,
                &format!(
                    "SELECT {} FROM tasks t WHERE t.owner_id = ?1 AND t.end_time IS NULL
                     ORDER BY t.start_time, t.id",
                    TASK_COLUMNS
                ),
                params![owner_id],
            )
        })
    }

    /// Owners that currently have at least one open record.
    pub fn owners_with_open_tasks(&self) -> Result<Vec<String>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT DISTINCT owner_id FROM tasks WHERE end_time IS NULL ORDER BY owner_id",
            )?;
            let owners = stmt
                .query_map([], |row| row.get(0))?
                .collect::<rusqlite::Result<Vec<String>>>()?;
            Ok(owners)
        })
    }

    /// Replace the mutable fields of a record if its version still matches.
    /// Returns the stored record with the bumped version.
    pub fn update_task(
        &self,
        task: &TaskRecord,
        expected_version: i64,
        now: DateTime<Utc>,
    ) -> Result<TaskRecord> {
        self.with_conn(|conn| {
            let updated = conn.execute(
                "UPDATE tasks SET queue_name = ?1, start_time = ?2, end_time = ?3, comment = ?4,
                        version = version + 1, updated_at = ?5
                 WHERE id = ?6 AND version = ?7",
                params![
                    &task.queue_name,
                    to_ms(task.start_time),
                    task.end_time.map(to_ms),
                    &task.comment,
                    to_ms(now),
                    &task.id,
                    expected_version,
                ],
            )?;

            if updated == 0 {
                return Err(stale_write_error(conn, &task.id, expected_version)?);
            }

            let stored = conn.query_row(
                &format!("SELECT {} FROM tasks t WHERE t.id = ?1", TASK_COLUMNS),
                params![&task.id],
                parse_task_row,
            )?;
            Ok(stored)
        })
    }

    /// Delete a record. Returns false when it did not exist.
    pub fn delete_task(&self, task_id: &str) -> Result<bool> {
        self.with_conn(|conn| {
            let deleted = conn.execute("DELETE FROM tasks WHERE id = ?1", params![task_id])?;
            Ok(deleted > 0)
        })
    }

    /// Every record of an owner, ordered by start time.
    pub fn tasks_for_owner(&self, owner_id: &str) -> Result<Vec<TaskRecord>> {
        self.with_conn(|conn| {
            query_tasks(
                conn,
                &format!(
                    "SELECT {} FROM tasks t WHERE t.owner_id = ?1 ORDER BY t.start_time, t.id",
                    TASK_COLUMNS
                ),
                params![owner_id],
            )
        })
    }

    /// Records of an owner whose start falls in `[from, to]`.
    pub fn tasks_for_owner_started_between(
        &self,
        owner_id: &str,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<TaskRecord>> {
        self.with_conn(|conn| {
            query_tasks(
                conn,
                &format!(
                    "SELECT {} FROM tasks t
                     WHERE t.owner_id = ?1 AND t.start_time >= ?2 AND t.start_time <= ?3
                     ORDER BY t.start_time, t.id",
                    TASK_COLUMNS
                ),
                params![owner_id, to_ms(from), to_ms(to)],
            )
        })
    }

    /// Records of any owner whose start or end falls in `[from, to]`, with the
    /// owner's display name.
    pub fn tasks_touching_range(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<AnnotatedTask>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {}, u.first_name, u.last_name FROM tasks t
                 JOIN users u ON u.id = t.owner_id
                 WHERE (t.start_time >= ?1 AND t.start_time <= ?2)
                    OR (t.end_time IS NOT NULL AND t.end_time >= ?1 AND t.end_time <= ?2)
                 ORDER BY t.start_time, t.id",
                TASK_COLUMNS
            ))?;
            let tasks = stmt
                .query_map(params![to_ms(from), to_ms(to)], |row| {
                    let first: String = row.get("first_name")?;
                    let last: String = row.get("last_name")?;
                    Ok(AnnotatedTask {
                        task: parse_task_row(row)?,
                        team_member: format!("{} {}", first, last),
                    })
                })?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(tasks)
        })
    }

    /// Close several records of one owner atomically.
    ///
    /// Each entry is `(task_id, expected_version, end_time)`. Any guard miss
    /// rolls the whole batch back.
    pub fn close_tasks_for_owner(
        &self,
        owner_id: &str,
        closes: &[(String, i64, DateTime<Utc>)],
        now: DateTime<Utc>,
    ) -> Result<usize> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;
            for (task_id, version, end_time) in closes {
                let updated = tx.execute(
                    "UPDATE tasks SET end_time = ?1, version = version + 1, updated_at = ?2
                     WHERE id = ?3 AND owner_id = ?4 AND version = ?5 AND end_time IS NULL",
                    params![to_ms(*end_time), to_ms(now), task_id, owner_id, version],
                )?;
                if updated == 0 {
                    return Err(stale_write_error(&tx, task_id, *version)?);
                }
            }
            tx.commit()?;
            Ok(closes.len())
        })
    }
}
