//! User rows: the owners of task records.

use super::{Database, from_ms, is_constraint_violation, to_ms};
use crate::error::{ApiError, ErrorCode};
use crate::types::{NewUser, Role, User};
use anyhow::{Result, anyhow};
use chrono::{DateTime, Utc};
use rusqlite::{OptionalExtension, Row, params};
use uuid::Uuid;

const USER_COLUMNS: &str = "id, first_name, last_name, email, role, team, api_token, created_at";

pub fn parse_user_row(row: &Row) -> rusqlite::Result<User> {
    let role: String = row.get("role")?;
    let created_at: i64 = row.get("created_at")?;

    Ok(User {
        id: row.get("id")?,
        first_name: row.get("first_name")?,
        last_name: row.get("last_name")?,
        email: row.get("email")?,
        // Unknown roles never gain admin rights.
        role: role.parse().unwrap_or(Role::TeamMember),
        team: row.get("team")?,
        api_token: row.get("api_token")?,
        created_at: from_ms(created_at),
    })
}

impl Database {
    /// Register a user and issue a fresh access token.
    pub fn create_user(&self, new_user: &NewUser, now: DateTime<Utc>) -> Result<User> {
        let user = User {
            id: Uuid::now_v7().to_string(),
            first_name: new_user.first_name.trim().to_string(),
            last_name: new_user.last_name.trim().to_string(),
            email: new_user.email.trim().to_lowercase(),
            role: new_user.role,
            team: new_user.team.clone(),
            api_token: Uuid::new_v4().simple().to_string(),
            created_at: now,
        };

        if user.first_name.is_empty() || user.last_name.is_empty() || user.email.is_empty() {
            return Err(anyhow!("first name, last name and email are required"));
        }

        self.with_conn(|conn| {
            let inserted = conn.execute(
                "INSERT INTO users (id, first_name, last_name, email, role, team, api_token, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                params![
                    &user.id,
                    &user.first_name,
                    &user.last_name,
                    &user.email,
                    user.role.as_str(),
                    &user.team,
                    &user.api_token,
                    to_ms(user.created_at),
                ],
            );
            match inserted {
                Ok(_) => Ok(()),
                Err(e) if is_constraint_violation(&e) => {
                    Err(ApiError::new(
                        ErrorCode::Conflict,
                        format!("Email already in use: {}", user.email),
                    )
                    .into())
                }
                Err(e) => Err(e.into()),
            }
        })?;

        Ok(user)
    }

    /// Get a user by ID.
    pub fn get_user(&self, user_id: &str) -> Result<Option<User>> {
        self.with_conn(|conn| {
            let user = conn
                .query_row(
                    &format!("SELECT {} FROM users WHERE id = ?1", USER_COLUMNS),
                    params![user_id],
                    parse_user_row,
                )
                .optional()?;
            Ok(user)
        })
    }

    /// Resolve a bearer token to its user.
    pub fn find_user_by_token(&self, token: &str) -> Result<Option<User>> {
        self.with_conn(|conn| {
            let user = conn
                .query_row(
                    &format!("SELECT {} FROM users WHERE api_token = ?1", USER_COLUMNS),
                    params![token],
                    parse_user_row,
                )
                .optional()?;
            Ok(user)
        })
    }

    /// All users, ordered by name.
    pub fn list_users(&self) -> Result<Vec<User>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {} FROM users ORDER BY last_name, first_name, id",
                USER_COLUMNS
            ))?;
            let users = stmt
                .query_map([], parse_user_row)?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(users)
        })
    }

    /// Users with the given role, ordered by name.
    pub fn list_users_by_role(&self, role: Role) -> Result<Vec<User>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {} FROM users WHERE role = ?1 ORDER BY last_name, first_name, id",
                USER_COLUMNS
            ))?;
            let users = stmt
                .query_map(params![role.as_str()], parse_user_row)?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(users)
        })
    }
}
