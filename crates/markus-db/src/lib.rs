// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Context, Result, anyhow, bail};
use markus_app::{
    NewNote, Note, NoteId, NoteStatus, NoteStore, NoteUpdate, StoreError, StoreResult,
};
use rusqlite::{Connection, OptionalExtension, params};
use std::collections::BTreeSet;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use time::format_description::well_known::Rfc3339;
use time::macros::format_description;
use time::{Duration, OffsetDateTime, PrimitiveDateTime};
use tracing::debug;

pub const APP_NAME: &str = "markus";

const REQUIRED_SCHEMA: &[(&str, &[&str])] = &[(
    "notes",
    &[
        "id",
        "title",
        "content",
        "bg_color",
        "status",
        "created_at",
        "updated_at",
    ],
)];

struct RequiredIndex {
    name: &'static str,
    create_sql: &'static str,
}

const REQUIRED_INDEXES: &[RequiredIndex] = &[
    RequiredIndex {
        name: "idx_notes_status",
        create_sql: "CREATE INDEX IF NOT EXISTS idx_notes_status ON notes (status);",
    },
    RequiredIndex {
        name: "idx_notes_created_at",
        create_sql: "CREATE INDEX IF NOT EXISTS idx_notes_created_at ON notes (created_at);",
    },
];

struct DemoNote {
    title: &'static str,
    content: &'static str,
    bg_color: &'static str,
    status: NoteStatus,
    hours_ago: i64,
}

const DEMO_NOTES: &[DemoNote] = &[
    DemoNote {
        title: "Welcome to markus",
        content: "<h1>Welcome to markus</h1><p>Press <strong>n</strong> to write a note and <strong>?</strong> for every key.</p>",
        bg_color: "#fef3c7",
        status: NoteStatus::Active,
        hours_ago: 1,
    },
    DemoNote {
        title: "Groceries",
        content: "<h2>Groceries</h2><ul><li>oat milk</li><li>sourdough</li><li>tomatoes</li></ul>",
        bg_color: "#bbf7d0",
        status: NoteStatus::Active,
        hours_ago: 5,
    },
    DemoNote {
        title: "Standup notes",
        content: "<h1>Standup notes</h1><p><em>Blocked on review</em></p><ul><li>ship sorting</li><li>fix search</li></ul>",
        bg_color: "#bfdbfe",
        status: NoteStatus::Active,
        hours_ago: 26,
    },
    DemoNote {
        title: "Book list",
        content: "<h1>Book list</h1><ul><li>The Dispossessed</li><li>Piranesi</li></ul>",
        bg_color: "#ddd6fe",
        status: NoteStatus::Active,
        hours_ago: 72,
    },
    DemoNote {
        title: "Trip packing",
        content: "<h1>Trip packing</h1><ul><li><s>passport</s></li><li>charger</li></ul>",
        bg_color: "#fecaca",
        status: NoteStatus::Archived,
        hours_ago: 240,
    },
    DemoNote {
        title: "Old recipe",
        content: "<h1>Old recipe</h1><p>Too much salt.</p>",
        bg_color: "#e5e7eb",
        status: NoteStatus::Deleted,
        hours_ago: 500,
    },
];

pub struct Store {
    conn: Connection,
}

impl Store {
    pub fn open(path: &Path) -> Result<Self> {
        let printable = path.to_string_lossy().to_string();
        validate_db_path(&printable)?;
        let conn = Connection::open(path)
            .with_context(|| format!("open database at {}", path.display()))?;
        configure_connection(&conn)?;
        debug!(path = %path.display(), "database opened");
        Ok(Self { conn })
    }

    pub fn open_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().context("open in-memory database")?;
        configure_connection(&conn)?;
        Ok(Self { conn })
    }

    pub fn raw_connection(&self) -> &Connection {
        &self.conn
    }

    /// Creates the schema on an empty database, or checks that an existing
    /// one has every table, column and index the store reads.
    pub fn bootstrap(&self) -> Result<()> {
        let tables = schema_objects(&self.conn, "table")?;
        if !tables.is_empty() {
            validate_schema(&self.conn, &tables)?;
        } else {
            self.conn
                .execute_batch(include_str!("sql/schema.sql"))
                .context("create schema")?;
            debug!("schema created");
        }

        ensure_required_indexes(&self.conn)?;
        Ok(())
    }

    pub fn seed_demo_data(&self) -> Result<()> {
        let now = OffsetDateTime::now_utc();
        for demo in DEMO_NOTES {
            let created_at = format_datetime(now - Duration::hours(demo.hours_ago))?;
            self.conn
                .execute(
                    "
                    INSERT INTO notes (title, content, bg_color, status, created_at, updated_at)
                    VALUES (?, ?, ?, ?, ?, ?)
                    ",
                    params![
                        demo.title,
                        demo.content,
                        demo.bg_color,
                        demo.status.as_str(),
                        created_at,
                        created_at,
                    ],
                )
                .with_context(|| format!("insert demo note {:?}", demo.title))?;
        }
        debug!(count = DEMO_NOTES.len(), "demo notes seeded");
        Ok(())
    }

    pub fn list_notes(&self, status: NoteStatus) -> Result<Vec<Note>> {
        let mut stmt = self
            .conn
            .prepare(
                "
                SELECT id, title, content, bg_color, status, created_at, updated_at
                FROM notes
                WHERE status = ?
                ORDER BY id ASC
                ",
            )
            .context("prepare notes query")?;
        let rows = stmt
            .query_map(params![status.as_str()], note_from_row)
            .context("query notes")?;
        rows.collect::<rusqlite::Result<Vec<_>>>()
            .context("collect notes")
    }

    pub fn get_note(&self, note_id: NoteId) -> Result<Option<Note>> {
        self.conn
            .query_row(
                "
                SELECT id, title, content, bg_color, status, created_at, updated_at
                FROM notes
                WHERE id = ?
                ",
                params![note_id.get()],
                note_from_row,
            )
            .optional()
            .with_context(|| format!("load note {note_id}"))
    }

    pub fn create_note(&self, note: &NewNote) -> Result<Note> {
        let now = now_rfc3339()?;
        self.conn
            .execute(
                "
                INSERT INTO notes (title, content, bg_color, status, created_at, updated_at)
                VALUES (?, ?, ?, ?, ?, ?)
                ",
                params![
                    note.title,
                    note.content,
                    note.bg_color,
                    note.status.as_str(),
                    now,
                    now,
                ],
            )
            .context("insert note")?;

        let note_id = NoteId::new(self.conn.last_insert_rowid());
        self.get_note(note_id)?
            .ok_or_else(|| anyhow!("note {note_id} vanished right after insert"))
    }

    /// Applies `update` to every id inside one transaction. Returns the first
    /// id that does not exist, in which case nothing is written.
    pub fn update_notes(&self, note_ids: &[NoteId], update: &NoteUpdate) -> Result<Option<NoteId>> {
        let now = now_rfc3339()?;
        let tx = self
            .conn
            .unchecked_transaction()
            .context("begin note update")?;
        for note_id in note_ids {
            let rows_affected = tx
                .execute(
                    "
                    UPDATE notes
                    SET
                      title = COALESCE(?, title),
                      content = COALESCE(?, content),
                      bg_color = COALESCE(?, bg_color),
                      status = COALESCE(?, status),
                      updated_at = ?
                    WHERE id = ?
                    ",
                    params![
                        update.title,
                        update.content,
                        update.bg_color,
                        update.status.map(NoteStatus::as_str),
                        now,
                        note_id.get(),
                    ],
                )
                .with_context(|| format!("update note {note_id}"))?;
            if rows_affected == 0 {
                return Ok(Some(*note_id));
            }
        }
        tx.commit().context("commit note update")?;
        Ok(None)
    }

    /// Deletes every id inside one transaction. Returns the first id that does
    /// not exist, in which case nothing is deleted.
    pub fn delete_notes(&self, note_ids: &[NoteId]) -> Result<Option<NoteId>> {
        let tx = self
            .conn
            .unchecked_transaction()
            .context("begin note delete")?;
        for note_id in note_ids {
            let rows_affected = tx
                .execute("DELETE FROM notes WHERE id = ?", params![note_id.get()])
                .with_context(|| format!("delete note {note_id}"))?;
            if rows_affected == 0 {
                return Ok(Some(*note_id));
            }
        }
        tx.commit().context("commit note delete")?;
        Ok(None)
    }

    pub fn status_counts(&self) -> Result<Vec<(NoteStatus, i64)>> {
        NoteStatus::ALL
            .into_iter()
            .map(|status| {
                let count: i64 = self
                    .conn
                    .query_row(
                        "SELECT COUNT(*) FROM notes WHERE status = ?",
                        params![status.as_str()],
                        |row| row.get(0),
                    )
                    .with_context(|| format!("count {} notes", status.as_str()))?;
                Ok((status, count))
            })
            .collect()
    }
}

impl NoteStore for Store {
    fn fetch_by_status(&mut self, status: NoteStatus) -> StoreResult<Vec<Note>> {
        self.list_notes(status)
            .map_err(|error| backend_error("fetch notes", &error))
    }

    fn insert(&mut self, note: &NewNote) -> StoreResult<Note> {
        self.create_note(note)
            .map_err(|error| backend_error("create note", &error))
    }

    fn update(&mut self, id: NoteId, update: &NoteUpdate) -> StoreResult<()> {
        match self.update_notes(&[id], update) {
            Ok(None) => Ok(()),
            Ok(Some(missing)) => Err(StoreError::NotFound(missing)),
            Err(error) => Err(backend_error("update note", &error)),
        }
    }

    fn update_many(&mut self, ids: &[NoteId], update: &NoteUpdate) -> StoreResult<()> {
        match self.update_notes(ids, update) {
            Ok(None) => Ok(()),
            Ok(Some(missing)) => Err(StoreError::NotFound(missing)),
            Err(error) => Err(backend_error("update notes", &error)),
        }
    }

    fn remove(&mut self, id: NoteId) -> StoreResult<()> {
        match self.delete_notes(&[id]) {
            Ok(None) => Ok(()),
            Ok(Some(missing)) => Err(StoreError::NotFound(missing)),
            Err(error) => Err(backend_error("delete note", &error)),
        }
    }

    fn remove_many(&mut self, ids: &[NoteId]) -> StoreResult<()> {
        match self.delete_notes(ids) {
            Ok(None) => Ok(()),
            Ok(Some(missing)) => Err(StoreError::NotFound(missing)),
            Err(error) => Err(backend_error("delete notes", &error)),
        }
    }
}

fn backend_error(operation: &'static str, error: &anyhow::Error) -> StoreError {
    StoreError::backend(operation, format!("{error:#}"))
}

fn note_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Note> {
    let status_raw: String = row.get(4)?;
    let status = NoteStatus::parse(&status_raw)
        .ok_or_else(|| anyhow!("unknown note status {status_raw:?}"))
        .map_err(to_sql_error)?;

    let created_at_raw: String = row.get(5)?;
    let updated_at_raw: String = row.get(6)?;

    Ok(Note {
        id: NoteId::new(row.get(0)?),
        title: row.get(1)?,
        content: row.get(2)?,
        bg_color: row.get(3)?,
        status,
        created_at: parse_datetime(&created_at_raw).map_err(to_sql_error)?,
        updated_at: parse_datetime(&updated_at_raw).map_err(to_sql_error)?,
    })
}

pub fn data_dir() -> Result<PathBuf> {
    let data_root = dirs::data_local_dir().ok_or_else(|| {
        anyhow!("cannot resolve data directory; set MARKUS_DB_PATH to a writable database path")
    })?;

    let app_dir = data_root.join(APP_NAME);
    fs::create_dir_all(&app_dir)
        .with_context(|| format!("create data directory {}", app_dir.display()))?;
    Ok(app_dir)
}

pub fn default_db_path() -> Result<PathBuf> {
    if let Some(override_path) = env::var_os("MARKUS_DB_PATH") {
        return Ok(PathBuf::from(override_path));
    }
    Ok(data_dir()?.join("markus.db"))
}

pub fn validate_db_path(path: &str) -> Result<()> {
    if path.is_empty() {
        bail!("database path must not be empty");
    }
    if path == ":memory:" {
        return Ok(());
    }

    if let Some(index) = path.find("://")
        && index > 0
    {
        let scheme = &path[..index];
        if scheme.chars().all(char::is_alphabetic) {
            bail!(
                "database path {path:?} looks like a URI ({scheme}://); pass a filesystem path instead"
            );
        }
    }

    if path.starts_with("file:") {
        bail!("database path {path:?} uses file: URI syntax; pass a plain filesystem path");
    }

    if path.contains('?') {
        bail!(
            "database path {path:?} contains '?'; remove query parameters and use a plain file path"
        );
    }

    Ok(())
}

fn validate_schema(conn: &Connection, tables: &BTreeSet<String>) -> Result<()> {
    for (table, required_columns) in REQUIRED_SCHEMA {
        if !tables.contains(*table) {
            bail!(
                "database is missing required table `{table}`; point MARKUS_DB_PATH at a markus database"
            );
        }

        let columns = table_columns(conn, table)?;
        let missing: Vec<&str> = required_columns
            .iter()
            .copied()
            .filter(|column| !columns.contains(*column))
            .collect();
        if !missing.is_empty() {
            bail!(
                "table `{table}` is missing required columns: {}; this file was not written by markus or is from a newer version",
                missing.join(", ")
            );
        }
    }
    Ok(())
}

/// Creates any missing index, then confirms every one is present.
fn ensure_required_indexes(conn: &Connection) -> Result<()> {
    for index in REQUIRED_INDEXES {
        conn.execute_batch(index.create_sql)
            .with_context(|| format!("create index `{}`", index.name))?;
    }

    let present = schema_objects(conn, "index")?;
    let absent: Vec<&str> = REQUIRED_INDEXES
        .iter()
        .map(|index| index.name)
        .filter(|name| !present.contains(*name))
        .collect();
    if !absent.is_empty() {
        bail!("indexes {} could not be created", absent.join(", "));
    }
    Ok(())
}

/// User-defined objects of `kind` (`table` or `index`).
fn schema_objects(conn: &Connection, kind: &str) -> Result<BTreeSet<String>> {
    let mut stmt = conn
        .prepare("SELECT name FROM sqlite_master WHERE type = ?1 AND name NOT LIKE 'sqlite_%'")
        .with_context(|| format!("list {kind} names"))?;
    let names = stmt
        .query_map(params![kind], |row| row.get::<_, String>(0))
        .and_then(|rows| rows.collect::<rusqlite::Result<BTreeSet<_>>>())
        .with_context(|| format!("read {kind} names"))?;
    Ok(names)
}

fn table_columns(conn: &Connection, table: &str) -> Result<BTreeSet<String>> {
    let mut stmt = conn
        .prepare(&format!("PRAGMA table_info({table})"))
        .with_context(|| format!("inspect columns of {table}"))?;
    let columns = stmt
        .query_map([], |row| row.get::<_, String>(1))
        .and_then(|rows| rows.collect::<rusqlite::Result<BTreeSet<_>>>())
        .with_context(|| format!("read columns of {table}"))?;
    Ok(columns)
}

fn configure_connection(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        PRAGMA journal_mode = WAL;
        PRAGMA synchronous = NORMAL;
        PRAGMA busy_timeout = 5000;
        ",
    )
    .context("configure sqlite pragmas")
}

fn format_datetime(value: OffsetDateTime) -> Result<String> {
    value.format(&Rfc3339).context("format timestamp")
}

fn now_rfc3339() -> Result<String> {
    format_datetime(OffsetDateTime::now_utc())
}

fn parse_datetime(raw: &str) -> Result<OffsetDateTime> {
    if let Ok(value) = OffsetDateTime::parse(raw, &Rfc3339) {
        return Ok(value);
    }

    if let Ok(value) = PrimitiveDateTime::parse(
        raw,
        &format_description!("[year]-[month]-[day] [hour]:[minute]:[second].[subsecond]"),
    ) {
        return Ok(value.assume_utc());
    }

    // SQLite's CURRENT_TIMESTAMP format.
    if let Ok(value) = PrimitiveDateTime::parse(
        raw,
        &format_description!("[year]-[month]-[day] [hour]:[minute]:[second]"),
    ) {
        return Ok(value.assume_utc());
    }

    bail!("unsupported datetime format {raw:?}")
}

fn to_sql_error(error: anyhow::Error) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(
        0,
        rusqlite::types::Type::Text,
        Box::new(std::io::Error::new(
            std::io::ErrorKind::InvalidData,
            error.to_string(),
        )),
    )
}
