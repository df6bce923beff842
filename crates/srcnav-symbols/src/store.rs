//! Per-project persistence of the canonical symbol set.

use crate::{Symbol, SymbolIndex, SymbolKind};
use rusqlite::types::Type;
use rusqlite::{Connection, params};
use srcnav_config::symbol_store_path;
use std::path::{Path, PathBuf};

/// Persistence for one project's symbols.
///
/// `save_symbols` replaces everything stored for the project; it never merges.
pub trait SymbolStore {
    /// Open (creating if needed) the store that belongs to `root`.
    fn open(&mut self, root: &Path) -> Result<(), StoreError>;

    /// Whether a store was ever written for `root`. Does not need `open`.
    fn exists(&self, root: &Path) -> bool;

    /// Every symbol saved for `root`; opens the store for `root` first if
    /// nothing is open.
    fn load(&mut self, root: &Path) -> Result<SymbolIndex, StoreError>;

    /// Replace the symbols recorded for `root` and flush. Returns the number
    /// of records written.
    fn save_symbols(&mut self, symbols: &[Symbol], root: &Path) -> Result<usize, StoreError>;

    /// Release the handle. Safe to call when nothing is open.
    fn close(&mut self);
}

/// SQLite-backed store living at `<root>/.srcnav/symbols.db`.
///
/// A file created by `open` is removed again if the first save into it fails,
/// so a failed build never looks like an empty one.
#[derive(Default)]
pub struct SqliteSymbolStore {
    conn: Option<Connection>,
    db_path: Option<PathBuf>,
    created: bool,
}

impl SqliteSymbolStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_open(&self) -> bool {
        self.conn.is_some()
    }

    /// Number of records stored for `root`.
    pub fn count(&self, root: &Path) -> Result<usize, StoreError> {
        let conn = self.conn.as_ref().ok_or(StoreError::NotOpen)?;
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM symbols WHERE project_path = ?1",
            params![project_key(root)],
            |row| row.get(0),
        )?;
        Ok(count as usize)
    }

    /// Close and delete a store file this handle created.
    fn discard_created(&mut self) {
        let path = self.db_path.clone();
        self.close();
        if let Some(path) = path {
            remove_store_file(&path);
        }
    }

    fn replace_project(
        conn: &mut Connection,
        symbols: &[Symbol],
        project: &str,
    ) -> Result<(), StoreError> {
        let tx = conn.transaction()?;
        tx.execute(
            "DELETE FROM symbols WHERE project_path = ?1",
            params![project],
        )?;
        {
            let mut insert = tx.prepare(
                r#"
                INSERT INTO symbols
                (name, kind, file_path, "line", "column", end_line, end_column,
                 signature, project_path)
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
                "#,
            )?;
            for symbol in symbols {
                insert.execute(params![
                    symbol.name,
                    symbol.kind.as_str(),
                    symbol.file_path.to_string_lossy(),
                    symbol.line as i64,
                    symbol.column as i64,
                    symbol.end_line.map(|line| line as i64),
                    symbol.end_column.map(|column| column as i64),
                    symbol.signature,
                    project,
                ])?;
            }
        }
        tx.commit()?;
        Ok(())
    }

    fn create_schema(conn: &Connection) -> Result<(), StoreError> {
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS symbols (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name TEXT NOT NULL,
                kind TEXT NOT NULL,
                file_path TEXT NOT NULL,
                "line" INTEGER NOT NULL,
                "column" INTEGER NOT NULL,
                end_line INTEGER,
                end_column INTEGER,
                signature TEXT,
                project_path TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_symbols_name ON symbols(name);
            CREATE INDEX IF NOT EXISTS idx_symbols_kind ON symbols(kind);
            CREATE INDEX IF NOT EXISTS idx_symbols_file ON symbols(file_path);
            CREATE INDEX IF NOT EXISTS idx_symbols_project ON symbols(project_path);
            "#,
        )?;
        Ok(())
    }
}

impl SymbolStore for SqliteSymbolStore {
    fn open(&mut self, root: &Path) -> Result<(), StoreError> {
        let db_path = symbol_store_path(root);
        if self.conn.is_some() && self.db_path.as_deref() == Some(db_path.as_path()) {
            return Ok(());
        }
        self.close();

        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let created = !db_path.is_file();
        let conn = Connection::open(&db_path)?;
        if let Err(err) = Self::create_schema(&conn) {
            drop(conn);
            if created {
                remove_store_file(&db_path);
            }
            return Err(err);
        }
        tracing::debug!(path = %db_path.display(), created, "opened symbol store");

        self.conn = Some(conn);
        self.db_path = Some(db_path);
        self.created = created;
        Ok(())
    }

    fn exists(&self, root: &Path) -> bool {
        symbol_store_path(root).is_file()
    }

    fn load(&mut self, root: &Path) -> Result<SymbolIndex, StoreError> {
        if self.conn.is_none() {
            self.open(root)?;
        }
        let conn = self.conn.as_ref().ok_or(StoreError::NotOpen)?;
        let mut stmt = conn.prepare(
            r#"
            SELECT name, kind, file_path, "line", "column",
                   end_line, end_column, signature
            FROM symbols
            WHERE project_path = ?1
            ORDER BY id
            "#,
        )?;

        let symbols = stmt
            .query_map(params![project_key(root)], row_to_symbol)?
            .collect::<Result<Vec<_>, _>>()?;

        tracing::debug!(count = symbols.len(), "loaded symbols");
        Ok(SymbolIndex::from_symbols(symbols))
    }

    fn save_symbols(&mut self, symbols: &[Symbol], root: &Path) -> Result<usize, StoreError> {
        let conn = self.conn.as_mut().ok_or(StoreError::NotOpen)?;
        let project = project_key(root);

        if let Err(err) = Self::replace_project(conn, symbols, &project) {
            if self.created {
                self.discard_created();
            }
            return Err(err);
        }
        self.created = false;

        tracing::info!(count = symbols.len(), project = %project, "saved symbols");
        Ok(symbols.len())
    }

    fn close(&mut self) {
        self.db_path = None;
        self.created = false;
        if let Some(conn) = self.conn.take() {
            if let Err((_, err)) = conn.close() {
                tracing::warn!(error = %err, "failed to close symbol store cleanly");
            }
        }
    }
}

impl Drop for SqliteSymbolStore {
    fn drop(&mut self) {
        self.close();
    }
}

fn remove_store_file(path: &Path) {
    if let Err(err) = std::fs::remove_file(path) {
        tracing::warn!(path = %path.display(), error = %err, "failed to remove symbol store");
    }
}

fn project_key(root: &Path) -> String {
    root.to_string_lossy().to_string()
}

fn row_to_symbol(row: &rusqlite::Row) -> rusqlite::Result<Symbol> {
    let kind: String = row.get(1)?;
    let kind = kind.parse::<SymbolKind>().map_err(|err| {
        rusqlite::Error::FromSqlConversionFailure(1, Type::Text, Box::new(err))
    })?;
    let file_path: String = row.get(2)?;

    Ok(Symbol {
        name: row.get(0)?,
        kind,
        file_path: PathBuf::from(file_path),
        line: row.get::<_, i64>(3)? as usize,
        column: row.get::<_, i64>(4)? as usize,
        end_line: row.get::<_, Option<i64>>(5)?.map(|line| line as usize),
        end_column: row.get::<_, Option<i64>>(6)?.map(|column| column as usize),
        signature: row.get(7)?,
    })
}

/// Error type for symbol store operations
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("symbol store is not open")]
    NotOpen,
}
