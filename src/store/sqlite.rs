use super::{Row, RowStore, FIRST_DATA_ROW, HEADER_ROW};
use crate::errors::{AppError, AppResult};
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

const SCHEMA_SQL: &str = include_str!("schema.sql");

/// Durable [`RowStore`] keeping each sheet row as a JSON array of cells.
#[derive(Debug)]
pub struct SqliteRowStore {
    conn: Mutex<Connection>,
    db_path: PathBuf,
}

impl SqliteRowStore {
    pub fn new(path: &Path) -> AppResult<Self> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|err| AppError::Io(err.to_string()))?;
        }
        let conn = Connection::open(path)?;
        conn.execute_batch(SCHEMA_SQL)?;

        Ok(Self {
            conn: Mutex::new(conn),
            db_path: path.to_path_buf(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.db_path
    }

    pub fn sheet_names(&self) -> AppResult<Vec<String>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare("SELECT name FROM sheets ORDER BY created_at, name")?;
        let names = stmt
            .query_map([], |row| row.get::<_, String>(0))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(names)
    }

    fn lock(&self) -> AppResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| AppError::Internal("database mutex poisoned".to_string()))
    }
}

impl RowStore for SqliteRowStore {
    fn read_rows(&self, sheet: &str) -> AppResult<Vec<Row>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            "SELECT row_index, cells_json FROM sheet_rows
             WHERE sheet = ?1 AND row_index >= ?2
             ORDER BY row_index ASC",
        )?;
        let stored = stmt
            .query_map(params![sheet, FIRST_DATA_ROW as i64], |row| {
                Ok((row.get::<_, i64>(0)?, row.get::<_, String>(1)?))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        let mut rows: Vec<Row> = Vec::with_capacity(stored.len());
        for (row_index, cells_json) in stored {
            let position = (row_index as usize).saturating_sub(FIRST_DATA_ROW);
            // keep positions aligned with row numbers even if a row is missing
            while rows.len() < position {
                rows.push(Vec::new());
            }
            rows.push(serde_json::from_str::<Row>(&cells_json)?);
        }
        Ok(rows)
    }

    fn append_row(&self, sheet: &str, row: Row) -> AppResult<()> {
        let now = Utc::now().to_rfc3339();
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        tx.execute(
            "INSERT OR IGNORE INTO sheets (name, created_at) VALUES (?1, ?2)",
            params![sheet, now],
        )?;
        let last: Option<i64> = tx.query_row(
            "SELECT MAX(row_index) FROM sheet_rows WHERE sheet = ?1",
            [sheet],
            |row| row.get(0),
        )?;
        let next = last.map(|value| value + 1).unwrap_or(FIRST_DATA_ROW as i64).max(FIRST_DATA_ROW as i64);
        tx.execute(
            "INSERT INTO sheet_rows (sheet, row_index, cells_json, updated_at) VALUES (?1, ?2, ?3, ?4)",
            params![sheet, next, serde_json::to_string(&row)?, now],
        )?;
        tx.commit()?;
        tracing::debug!(sheet, row_index = next, "appended row");
        Ok(())
    }

    fn update_cell(&self, sheet: &str, row_index: usize, column: usize, value: &str) -> AppResult<()> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        let existing: Option<String> = tx
            .query_row(
                "SELECT cells_json FROM sheet_rows WHERE sheet = ?1 AND row_index = ?2",
                params![sheet, row_index as i64],
                |row| row.get(0),
            )
            .optional()?;
        let Some(existing) = existing else {
            return Err(AppError::NotFound(format!(
                "Row {} not present in {}",
                row_index, sheet
            )));
        };

        let mut cells: Row = serde_json::from_str(&existing)?;
        if cells.len() <= column {
            cells.resize(column + 1, String::new());
        }
        cells[column] = value.to_string();

        tx.execute(
            "UPDATE sheet_rows SET cells_json = ?1, updated_at = ?2 WHERE sheet = ?3 AND row_index = ?4",
            params![serde_json::to_string(&cells)?, Utc::now().to_rfc3339(), sheet, row_index as i64],
        )?;
        tx.commit()?;
        Ok(())
    }

    fn ensure_sheet(&self, sheet: &str, headers: &[&str]) -> AppResult<()> {
        let now = Utc::now().to_rfc3339();
        let conn = self.lock()?;
        conn.execute(
            "INSERT OR IGNORE INTO sheets (name, created_at) VALUES (?1, ?2)",
            params![sheet, now],
        )?;
        conn.execute(
            "INSERT INTO sheet_rows (sheet, row_index, cells_json, updated_at)
             VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(sheet, row_index) DO UPDATE SET cells_json = excluded.cells_json, updated_at = excluded.updated_at",
            params![sheet, HEADER_ROW as i64, serde_json::to_string(headers)?, now],
        )?;
        Ok(())
    }
}
