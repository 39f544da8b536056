//! Todo CRUD. Every query is scoped to the owning identity.

use super::{Database, now_ms};
use crate::error::AppError;
use crate::types::{NewTodo, Todo, TodoPatch};
use anyhow::Result;
use chrono::{DateTime, Utc};
use rusqlite::{Connection, OptionalExtension, Row, params};
use uuid::Uuid;

const TODO_COLUMNS: &str =
    "id, owner, content, is_done, deadline, parent_todo_id, image_key, created_at, updated_at";

pub fn parse_todo_row(row: &Row) -> rusqlite::Result<Todo> {
    let deadline: Option<String> = row.get("deadline")?;
    Ok(Todo {
        id: row.get("id")?,
        owner: row.get("owner")?,
        content: row.get("content")?,
        is_done: row.get::<_, i64>("is_done")? != 0,
        deadline: deadline.as_deref().and_then(parse_stored_deadline),
        parent_todo_id: row.get("parent_todo_id")?,
        image_key: row.get("image_key")?,
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
    })
}

fn parse_stored_deadline(s: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

fn get_todo_internal(conn: &Connection, owner: &str, todo_id: &str) -> Result<Option<Todo>> {
    let todo = conn
        .query_row(
            &format!("SELECT {TODO_COLUMNS} FROM todos WHERE owner = ?1 AND id = ?2"),
            params![owner, todo_id],
            parse_todo_row,
        )
        .optional()?;
    Ok(todo)
}

/// Next creation timestamp: wall clock, but strictly after every existing row.
fn next_created_at(conn: &Connection) -> Result<i64> {
    let latest: Option<i64> =
        conn.query_row("SELECT MAX(created_at) FROM todos", [], |row| row.get(0))?;
    let now = now_ms();
    Ok(match latest {
        Some(latest) if latest >= now => latest + 1,
        _ => now,
    })
}

impl Database {
    /// Insert a todo for `owner`. The id and timestamps are assigned here.
    pub fn create_todo(&self, owner: &str, fields: &NewTodo) -> Result<Todo> {
        let id = Uuid::now_v7().to_string();

        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;
            let created_at = next_created_at(&tx)?;

            tx.execute(
                "INSERT INTO todos (id, owner, content, is_done, deadline, parent_todo_id, image_key, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?8)",
                params![
                    id,
                    owner,
                    fields.content,
                    fields.is_done as i64,
                    fields.deadline.map(|d| d.to_rfc3339()),
                    fields.parent_todo_id,
                    fields.image_key,
                    created_at,
                ],
            )?;
            tx.commit()?;

            Ok(Todo {
                id,
                owner: owner.to_string(),
                content: fields.content.clone(),
                is_done: fields.is_done,
                deadline: fields.deadline,
                parent_todo_id: fields.parent_todo_id.clone(),
                image_key: fields.image_key.clone(),
                created_at,
                updated_at: created_at,
            })
        })
    }

    pub fn get_todo(&self, owner: &str, todo_id: &str) -> Result<Option<Todo>> {
        self.with_conn(|conn| get_todo_internal(conn, owner, todo_id))
    }

    /// All todos of `owner`, oldest first.
    pub fn list_todos(&self, owner: &str) -> Result<Vec<Todo>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {TODO_COLUMNS} FROM todos WHERE owner = ?1 ORDER BY created_at, id"
            ))?;
            let todos = stmt
                .query_map(params![owner], parse_todo_row)?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(todos)
        })
    }

    /// Apply `patch` to a todo and return the updated row.
    pub fn update_todo(&self, owner: &str, todo_id: &str, patch: &TodoPatch) -> Result<Todo> {
        let now = now_ms();

        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;
            let todo = get_todo_internal(&tx, owner, todo_id)?
                .ok_or_else(|| AppError::todo_not_found(todo_id))?;

            let updated = Todo {
                content: patch.content.clone().unwrap_or(todo.content),
                is_done: patch.is_done.unwrap_or(todo.is_done),
                deadline: patch.deadline.unwrap_or(todo.deadline),
                parent_todo_id: patch
                    .parent_todo_id
                    .clone()
                    .unwrap_or(todo.parent_todo_id),
                image_key: patch.image_key.clone().unwrap_or(todo.image_key),
                updated_at: now,
                ..todo
            };

            tx.execute(
                "UPDATE todos SET content = ?1, is_done = ?2, deadline = ?3, parent_todo_id = ?4,
                 image_key = ?5, updated_at = ?6 WHERE owner = ?7 AND id = ?8",
                params![
                    updated.content,
                    updated.is_done as i64,
                    updated.deadline.map(|d| d.to_rfc3339()),
                    updated.parent_todo_id,
                    updated.image_key,
                    updated.updated_at,
                    owner,
                    todo_id,
                ],
            )?;
            tx.commit()?;

            Ok(updated)
        })
    }

    /// Delete a single todo. Children are left untouched.
    pub fn delete_todo(&self, owner: &str, todo_id: &str) -> Result<()> {
        self.with_conn(|conn| {
            let removed = conn.execute(
                "DELETE FROM todos WHERE owner = ?1 AND id = ?2",
                params![owner, todo_id],
            )?;
            if removed == 0 {
                return Err(AppError::todo_not_found(todo_id).into());
            }
            Ok(())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn setup_db() -> Database {
        Database::open_in_memory().expect("Failed to create in-memory database")
    }

    #[test]
    fn test_create_assigns_id_and_increasing_timestamps() {
        let db = setup_db();
        let a = db.create_todo("alice", &NewTodo::new("first")).unwrap();
        let b = db.create_todo("alice", &NewTodo::new("second")).unwrap();

        assert!(!a.id.is_empty());
        assert_ne!(a.id, b.id);
        assert!(b.created_at > a.created_at);
        assert!(!a.is_done);
    }

    #[test]
    fn test_deadline_roundtrips_through_text_column() {
        let db = setup_db();
        let deadline = crate::types::parse_deadline("2026-05-01T12:00:00Z").unwrap();
        let created = db
            .create_todo("alice", &NewTodo::new("taxes").with_deadline(deadline))
            .unwrap();

        let fetched = db.get_todo("alice", &created.id).unwrap().unwrap();
        assert_eq!(fetched.deadline, Some(deadline));
    }

    #[test]
    fn test_owner_scoping() {
        let db = setup_db();
        let todo = db.create_todo("alice", &NewTodo::new("private")).unwrap();

        assert!(db.get_todo("bob", &todo.id).unwrap().is_none());
        assert!(db.list_todos("bob").unwrap().is_empty());
        assert!(db.delete_todo("bob", &todo.id).is_err());
        assert!(db.update_todo("bob", &todo.id, &TodoPatch::done(true)).is_err());
        assert_eq!(db.list_todos("alice").unwrap().len(), 1);
    }

    #[test]
    fn test_update_clears_optional_fields() {
        let db = setup_db();
        let todo = db
            .create_todo("alice", &NewTodo::new("photo").with_image_key("1-cat.png"))
            .unwrap();

        let updated = db
            .update_todo("alice", &todo.id, &TodoPatch::image_key(None))
            .unwrap();
        assert_eq!(updated.image_key, None);
        assert_eq!(updated.content, "photo");
        assert_eq!(updated.created_at, todo.created_at);
    }

    #[test]
    fn test_delete_missing_is_not_found() {
        let db = setup_db();
        let err = AppError::from(db.delete_todo("alice", "nope").unwrap_err());
        assert_eq!(err.code, crate::error::ErrorCode::TodoNotFound);
    }
}
