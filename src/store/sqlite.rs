use std::path::Path;
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use rusqlite::types::{Type, Value};
use rusqlite::{Connection, OptionalExtension, Row, params, params_from_iter};

use super::Store;
use super::schema::SCHEMA;
use crate::error::{Error, Result};
use crate::robot::{NameMatch, Page, ProjectResolver, RobotFilter, RobotStore, parse_project_id};
use crate::types::*;

pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    pub fn new<P: AsRef<Path>>(db_path: P) -> Result<Self> {
        let conn = Connection::open(db_path)?;

        conn.pragma_update(None, "foreign_keys", "ON")?;
        conn.pragma_update(None, "journal_mode", "WAL")?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn conn(&self) -> std::sync::MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(|e| e.into_inner())
    }
}

fn parse_datetime(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .or_else(|_| {
            // Handle SQLite's default datetime format: "YYYY-MM-DD HH:MM:SS"
            chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S").map(|ndt| ndt.and_utc())
        })
        .unwrap_or_else(|e| {
            tracing::error!("Invalid datetime in database: '{}' - {}", s, e);
            Utc::now()
        })
}

fn format_datetime(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339()
}

/// Maps a UNIQUE/PRIMARY KEY violation to `on_conflict`, a foreign key
/// violation to `NotFound`, and passes everything else through.
fn map_constraint(e: rusqlite::Error, on_conflict: Error) -> Error {
    match e {
        rusqlite::Error::SqliteFailure(err, _)
            if err.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
                || err.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_PRIMARYKEY =>
        {
            on_conflict
        }
        rusqlite::Error::SqliteFailure(err, _)
            if err.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_FOREIGNKEY =>
        {
            Error::NotFound
        }
        e => Error::from(e),
    }
}

fn row_to_project(row: &Row<'_>) -> rusqlite::Result<Project> {
    Ok(Project {
        id: row.get(0)?,
        name: row.get(1)?,
        created_at: parse_datetime(&row.get::<_, String>(2)?),
    })
}

fn row_to_user(row: &Row<'_>) -> rusqlite::Result<User> {
    Ok(User {
        id: row.get(0)?,
        name: row.get(1)?,
        created_at: parse_datetime(&row.get::<_, String>(2)?),
        updated_at: parse_datetime(&row.get::<_, String>(3)?),
    })
}

fn row_to_token(row: &Row<'_>) -> rusqlite::Result<Token> {
    Ok(Token {
        id: row.get(0)?,
        token_hash: row.get(1)?,
        token_lookup: row.get(2)?,
        is_admin: row.get(3)?,
        user_id: row.get(4)?,
        created_at: parse_datetime(&row.get::<_, String>(5)?),
        expires_at: row
            .get::<_, Option<String>>(6)?
            .map(|s| parse_datetime(&s)),
        last_used_at: row
            .get::<_, Option<String>>(7)?
            .map(|s| parse_datetime(&s)),
    })
}

fn row_to_grant(row: &Row<'_>) -> rusqlite::Result<ProjectGrant> {
    Ok(ProjectGrant {
        user_id: row.get(0)?,
        project_id: row.get(1)?,
        allow_bits: Permission::from(row.get::<_, i64>(2)?),
        deny_bits: Permission::from(row.get::<_, i64>(3)?),
        created_at: parse_datetime(&row.get::<_, String>(4)?),
        updated_at: parse_datetime(&row.get::<_, String>(5)?),
    })
}

const ROBOT_COLUMNS: &str = "id, project_id, name, description, secret_hash, disabled, expires_at, \
     level, permissions, creation_time, update_time";

fn row_to_robot(row: &Row<'_>) -> rusqlite::Result<Robot> {
    let level: String = row.get(7)?;
    let level = RobotLevel::parse(&level).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            7,
            Type::Text,
            format!("unknown robot level '{level}'").into(),
        )
    })?;

    let permissions: String = row.get(8)?;
    let permissions = serde_json::from_str(&permissions)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(8, Type::Text, Box::new(e)))?;

    Ok(Robot {
        id: row.get(0)?,
        project_id: row.get(1)?,
        name: row.get(2)?,
        description: row.get(3)?,
        secret_hash: row.get(4)?,
        disabled: row.get(5)?,
        expires_at: row
            .get::<_, Option<String>>(6)?
            .map(|s| parse_datetime(&s)),
        level,
        permissions,
        creation_time: parse_datetime(&row.get::<_, String>(9)?),
        update_time: parse_datetime(&row.get::<_, String>(10)?),
    })
}

/// Builds the WHERE clause and positional values for a robot filter.
fn robot_where(filter: &RobotFilter) -> (String, Vec<Value>) {
    let mut clauses = vec!["project_id = ?"];
    let mut values = vec![Value::Integer(filter.project_id)];

    if let Some(id) = filter.id {
        clauses.push("id = ?");
        values.push(Value::Integer(id));
    }

    match &filter.name {
        Some(NameMatch::Exact(name)) => {
            clauses.push("name = ?");
            values.push(Value::Text(name.clone()));
        }
        Some(NameMatch::Fuzzy(name)) => {
            clauses.push("instr(name, ?) > 0");
            values.push(Value::Text(name.clone()));
        }
        None => {}
    }

    if let Some(disabled) = filter.disabled {
        clauses.push("disabled = ?");
        values.push(Value::Integer(i64::from(disabled)));
    }

    (clauses.join(" AND "), values)
}

impl Store for SqliteStore {
    fn initialize(&self) -> Result<()> {
        self.conn().execute_batch(SCHEMA)?;
        Ok(())
    }

    // Project operations

    fn create_project(&self, name: &str) -> Result<Project> {
        let created_at = Utc::now();
        let conn = self.conn();
        conn.execute(
            "INSERT INTO projects (name, created_at) VALUES (?1, ?2)",
            params![name, format_datetime(&created_at)],
        )
        .map_err(|e| map_constraint(e, Error::AlreadyExists))?;

        Ok(Project {
            id: conn.last_insert_rowid(),
            name: name.to_string(),
            created_at,
        })
    }

    fn get_project(&self, id: i64) -> Result<Option<Project>> {
        self.conn()
            .query_row(
                "SELECT id, name, created_at FROM projects WHERE id = ?1",
                params![id],
                row_to_project,
            )
            .optional()
            .map_err(Error::from)
    }

    fn get_project_by_name(&self, name: &str) -> Result<Option<Project>> {
        self.conn()
            .query_row(
                "SELECT id, name, created_at FROM projects WHERE name = ?1",
                params![name],
                row_to_project,
            )
            .optional()
            .map_err(Error::from)
    }

    fn list_projects(&self) -> Result<Vec<Project>> {
        let conn = self.conn();
        let mut stmt = conn.prepare("SELECT id, name, created_at FROM projects ORDER BY id")?;
        let rows = stmt.query_map([], row_to_project)?;

        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Error::from)
    }

    fn delete_project(&self, id: i64) -> Result<bool> {
        let rows = self
            .conn()
            .execute("DELETE FROM projects WHERE id = ?1", params![id])?;
        Ok(rows > 0)
    }

    // User operations

    fn create_user(&self, user: &User) -> Result<()> {
        self.conn()
            .execute(
                "INSERT INTO users (id, name, created_at, updated_at) VALUES (?1, ?2, ?3, ?4)",
                params![
                    user.id,
                    user.name,
                    format_datetime(&user.created_at),
                    format_datetime(&user.updated_at),
                ],
            )
            .map_err(|e| map_constraint(e, Error::AlreadyExists))?;
        Ok(())
    }

    fn get_user(&self, id: &str) -> Result<Option<User>> {
        self.conn()
            .query_row(
                "SELECT id, name, created_at, updated_at FROM users WHERE id = ?1",
                params![id],
                row_to_user,
            )
            .optional()
            .map_err(Error::from)
    }

    fn get_user_by_name(&self, name: &str) -> Result<Option<User>> {
        self.conn()
            .query_row(
                "SELECT id, name, created_at, updated_at FROM users WHERE name = ?1",
                params![name],
                row_to_user,
            )
            .optional()
            .map_err(Error::from)
    }

    fn list_users(&self, cursor: &str, limit: i32) -> Result<Vec<User>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(
            "SELECT id, name, created_at, updated_at FROM users
             WHERE id > ?1 ORDER BY id LIMIT ?2",
        )?;
        let rows = stmt.query_map(params![cursor, limit], row_to_user)?;

        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Error::from)
    }

    fn delete_user(&self, id: &str) -> Result<bool> {
        let rows = self
            .conn()
            .execute("DELETE FROM users WHERE id = ?1", params![id])?;
        Ok(rows > 0)
    }

    // Token operations

    fn create_token(&self, token: &Token) -> Result<()> {
        let result = self.conn().execute(
            "INSERT INTO tokens (id, token_hash, token_lookup, is_admin, user_id, created_at, expires_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                token.id,
                token.token_hash,
                token.token_lookup,
                token.is_admin,
                token.user_id,
                format_datetime(&token.created_at),
                token.expires_at.as_ref().map(format_datetime),
            ],
        );

        match result {
            Ok(_) => Ok(()),
            Err(rusqlite::Error::SqliteFailure(err, _))
                if err.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE =>
            {
                Err(Error::TokenLookupCollision)
            }
            Err(e) => Err(map_constraint(e, Error::AlreadyExists)),
        }
    }

    fn get_token_by_id(&self, id: &str) -> Result<Option<Token>> {
        self.conn()
            .query_row(
                "SELECT id, token_hash, token_lookup, is_admin, user_id, created_at, expires_at, last_used_at
                 FROM tokens WHERE id = ?1",
                params![id],
                row_to_token,
            )
            .optional()
            .map_err(Error::from)
    }

    fn get_token_by_lookup(&self, lookup: &str) -> Result<Option<Token>> {
        self.conn()
            .query_row(
                "SELECT id, token_hash, token_lookup, is_admin, user_id, created_at, expires_at, last_used_at
                 FROM tokens WHERE token_lookup = ?1",
                params![lookup],
                row_to_token,
            )
            .optional()
            .map_err(Error::from)
    }

    fn list_user_tokens(&self, user_id: &str) -> Result<Vec<Token>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(
            "SELECT id, token_hash, token_lookup, is_admin, user_id, created_at, expires_at, last_used_at
             FROM tokens WHERE user_id = ?1 ORDER BY created_at",
        )?;
        let rows = stmt.query_map(params![user_id], row_to_token)?;

        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Error::from)
    }

    fn delete_token(&self, id: &str) -> Result<bool> {
        let rows = self
            .conn()
            .execute("DELETE FROM tokens WHERE id = ?1", params![id])?;
        Ok(rows > 0)
    }

    fn update_token_last_used(&self, id: &str) -> Result<()> {
        self.conn().execute(
            "UPDATE tokens SET last_used_at = ?1 WHERE id = ?2",
            params![format_datetime(&Utc::now()), id],
        )?;
        Ok(())
    }

    // Project grant operations

    fn upsert_project_grant(&self, grant: &ProjectGrant) -> Result<()> {
        self.conn()
            .execute(
                "INSERT INTO project_grants (user_id, project_id, allow_bits, deny_bits, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                 ON CONFLICT(user_id, project_id) DO UPDATE SET
                     allow_bits = excluded.allow_bits,
                     deny_bits = excluded.deny_bits,
                     updated_at = excluded.updated_at",
                params![
                    grant.user_id,
                    grant.project_id,
                    i64::from(grant.allow_bits),
                    i64::from(grant.deny_bits),
                    format_datetime(&grant.created_at),
                    format_datetime(&grant.updated_at),
                ],
            )
            .map_err(|e| map_constraint(e, Error::AlreadyExists))?;
        Ok(())
    }

    fn get_project_grant(&self, user_id: &str, project_id: i64) -> Result<Option<ProjectGrant>> {
        self.conn()
            .query_row(
                "SELECT user_id, project_id, allow_bits, deny_bits, created_at, updated_at
                 FROM project_grants WHERE user_id = ?1 AND project_id = ?2",
                params![user_id, project_id],
                row_to_grant,
            )
            .optional()
            .map_err(Error::from)
    }

    fn list_user_project_grants(&self, user_id: &str) -> Result<Vec<ProjectGrant>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(
            "SELECT user_id, project_id, allow_bits, deny_bits, created_at, updated_at
             FROM project_grants WHERE user_id = ?1 ORDER BY project_id",
        )?;
        let rows = stmt.query_map(params![user_id], row_to_grant)?;

        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Error::from)
    }

    fn delete_project_grant(&self, user_id: &str, project_id: i64) -> Result<bool> {
        let rows = self.conn().execute(
            "DELETE FROM project_grants WHERE user_id = ?1 AND project_id = ?2",
            params![user_id, project_id],
        )?;
        Ok(rows > 0)
    }

    fn has_admin_token(&self) -> Result<bool> {
        let count: i64 = self.conn().query_row(
            "SELECT COUNT(*) FROM tokens WHERE is_admin = 1",
            [],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }
}

impl ProjectResolver for SqliteStore {
    fn resolve(&self, id_or_name: &str) -> Result<ProjectScope> {
        let project = match parse_project_id(id_or_name) {
            Some(id) => self.get_project(id)?,
            None => self.get_project_by_name(id_or_name)?,
        };

        project
            .map(|p| ProjectScope::from(&p))
            .ok_or_else(|| Error::ProjectNotFound(id_or_name.to_string()))
    }
}

impl RobotStore for SqliteStore {
    fn list_robots(&self, filter: &RobotFilter, page: Option<&Page>) -> Result<Vec<Robot>> {
        let (clause, mut values) = robot_where(filter);
        let mut sql = format!("SELECT {ROBOT_COLUMNS} FROM robots WHERE {clause} ORDER BY id");

        if let Some(page) = page {
            sql.push_str(" LIMIT ? OFFSET ?");
            values.push(Value::Integer(i64::try_from(page.size).unwrap_or(i64::MAX)));
            values.push(Value::Integer(
                i64::try_from(page.offset()).unwrap_or(i64::MAX),
            ));
        }

        let conn = self.conn();
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map(params_from_iter(values.iter()), row_to_robot)?;

        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Error::from)
    }

    fn count_robots(&self, filter: &RobotFilter) -> Result<i64> {
        let (clause, values) = robot_where(filter);
        let sql = format!("SELECT COUNT(*) FROM robots WHERE {clause}");

        self.conn()
            .query_row(&sql, params_from_iter(values.iter()), |row| row.get(0))
            .map_err(Error::from)
    }

    fn create_robot(&self, robot: &NewRobot) -> Result<Robot> {
        let permissions = serde_json::to_string(&robot.permissions)?;

        let conn = self.conn();
        conn.execute(
            "INSERT INTO robots (project_id, name, description, secret_hash, disabled, expires_at,
                                 level, permissions, creation_time, update_time)
             VALUES (?1, ?2, ?3, ?4, 0, ?5, ?6, ?7, ?8, ?8)",
            params![
                robot.project_id,
                robot.name,
                robot.description,
                robot.secret_hash,
                robot.expires_at.as_ref().map(format_datetime),
                robot.level.as_str(),
                permissions,
                format_datetime(&robot.creation_time),
            ],
        )
        .map_err(|e| map_constraint(e, Error::AlreadyExists))?;

        Ok(Robot {
            id: conn.last_insert_rowid(),
            project_id: robot.project_id,
            name: robot.name.clone(),
            description: robot.description.clone(),
            secret_hash: robot.secret_hash.clone(),
            disabled: false,
            expires_at: robot.expires_at,
            level: robot.level,
            permissions: robot.permissions.clone(),
            creation_time: robot.creation_time,
            update_time: robot.creation_time,
        })
    }

    fn update_robot(&self, project_id: i64, id: i64, changes: &RobotChanges) -> Result<()> {
        let mut sets = vec!["update_time = ?"];
        let mut values = vec![Value::Text(format_datetime(&Utc::now()))];

        if let Some(disabled) = changes.disabled {
            sets.push("disabled = ?");
            values.push(Value::Integer(i64::from(disabled)));
        }
        if let Some(description) = &changes.description {
            sets.push("description = ?");
            values.push(Value::Text(description.clone()));
        }
        values.push(Value::Integer(project_id));
        values.push(Value::Integer(id));

        let sql = format!(
            "UPDATE robots SET {} WHERE project_id = ? AND id = ?",
            sets.join(", ")
        );
        let rows = self.conn().execute(&sql, params_from_iter(values.iter()))?;

        if rows == 0 {
            return Err(Error::NotFound);
        }
        Ok(())
    }

    fn delete_robot(&self, project_id: i64, id: i64) -> Result<()> {
        let rows = self.conn().execute(
            "DELETE FROM robots WHERE project_id = ?1 AND id = ?2",
            params![project_id, id],
        )?;

        if rows == 0 {
            return Err(Error::NotFound);
        }
        Ok(())
    }

    fn robot_exists(&self, id: i64) -> Result<bool> {
        let count: i64 = self.conn().query_row(
            "SELECT COUNT(*) FROM robots WHERE id = ?1",
            params![id],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }
}
