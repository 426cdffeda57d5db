//! Index database access.
//!
//! The index is normally encrypted with a scheme the plain driver cannot read.
//! [`IndexDb::open`] tries a direct read-only open first and, if a trivial
//! query fails the way an unreadable database does, decrypts once to a
//! plaintext copy through the native cipher engine and opens that instead.

pub mod cipher;
pub mod native;

use std::path::{Path, PathBuf};

use rusqlite::{Connection, ErrorCode, OpenFlags, params};
use tracing::{debug, info, warn};

use crate::crypto::keys::{INDEX_DB_KEY, index_decrypt_key};
use crate::domain::IndexRecord;
use crate::error::{Result, TlxError};
use crate::ident::StoryId;
use crate::index::cipher::{CipherEngine, decrypt_to_plaintext};
use crate::index::native::{Sqlite3mc, default_library_dir};

const CHECK_SQL: &str = "SELECT 1 FROM a LIMIT 1";
const QUERY_SQL: &str = "SELECT h, n, e FROM a WHERE n LIKE ?1";

pub const DECRYPTED_FILE_NAME: &str = "meta_decrypted.sqlite";

#[derive(Clone, Debug)]
pub struct IndexOpenOptions {
    /// The (possibly encrypted) index file.
    pub path: PathBuf,
    /// Destination of the plaintext copy made by the decrypt fallback.
    pub decrypted_path: PathBuf,
    /// Directory holding the native cipher library.
    pub library_dir: PathBuf,
}

impl IndexOpenOptions {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let library_dir = default_library_dir();
        Self {
            path: path.into(),
            decrypted_path: library_dir.join(DECRYPTED_FILE_NAME),
            library_dir,
        }
    }
}

#[derive(Debug)]
pub struct IndexDb {
    conn: Connection,
    path: PathBuf,
}

impl IndexDb {
    pub fn open(opts: &IndexOpenOptions) -> Result<Self> {
        Self::open_with(opts, || {
            let engine: Box<dyn CipherEngine> = Box::new(Sqlite3mc::load(&opts.library_dir)?);
            Ok(engine)
        })
    }

    /// Open with a caller-supplied cipher engine, loaded only if the direct
    /// open fails.
    pub fn open_with<F>(opts: &IndexOpenOptions, load_engine: F) -> Result<Self>
    where
        F: FnOnce() -> Result<Box<dyn CipherEngine>>,
    {
        if !opts.path.is_file() {
            return Err(TlxError::IndexMissing(opts.path.clone()));
        }

        match open_checked(&opts.path, Some(INDEX_DB_KEY)) {
            Ok(conn) => {
                info!(path = %opts.path.display(), "connected to index");
                return Ok(Self {
                    conn,
                    path: opts.path.clone(),
                });
            }
            Err(e) if is_unreadable(&e) => {
                warn!(error = %e, "index appears encrypted; attempting decryption");
            }
            Err(e) => return Err(e),
        }

        let engine = load_engine()?;
        decrypt_to_plaintext(
            engine.as_ref(),
            &opts.path,
            &opts.decrypted_path,
            &index_decrypt_key()?,
        )?;
        let conn = open_checked(&opts.decrypted_path, None)?;
        info!(path = %opts.decrypted_path.display(), "connected to decrypted index");
        Ok(Self {
            conn,
            path: opts.decrypted_path.clone(),
        })
    }

    /// The file actually being read (the plaintext copy after a fallback).
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Every row whose path hint matches the identifier's query pattern, in
    /// engine order.
    pub fn query(&self, id: &StoryId) -> Result<Vec<IndexRecord>> {
        self.query_pattern(&id.query_pattern())
    }

    pub fn query_pattern(&self, pattern: &str) -> Result<Vec<IndexRecord>> {
        debug!(pattern, "querying index");
        let mut stmt = self.conn.prepare(QUERY_SQL)?;
        let rows = stmt.query_map(params![pattern], |row| {
            Ok(IndexRecord {
                content_hash: row.get(0)?,
                path_hint: row.get(1)?,
                bundle_key: row.get::<_, Option<i64>>(2)?.unwrap_or(0),
            })
        })?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }
}

fn open_checked(path: &Path, hexkey: Option<&str>) -> Result<Connection> {
    let file = uri_path(path);
    let uri = match hexkey {
        Some(key) => format!("file:{file}?hexkey={key}"),
        None => format!("file:{file}"),
    };
    let conn = Connection::open_with_flags(
        uri,
        OpenFlags::SQLITE_OPEN_URI
            | OpenFlags::SQLITE_OPEN_READ_ONLY
            | OpenFlags::SQLITE_OPEN_NO_MUTEX,
    )?;
    conn.prepare(CHECK_SQL)?.exists([])?;
    Ok(conn)
}

/// Path part of a `file:` URI. Only the characters SQLite treats as URI
/// syntax are escaped.
fn uri_path(path: &Path) -> String {
    let raw = path.to_string_lossy();
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '%' => out.push_str("%25"),
            '?' => out.push_str("%3f"),
            '#' => out.push_str("%23"),
            _ => out.push(c),
        }
    }
    out
}

/// "not a database", "cannot open" and generic SQL errors all mean the plain
/// driver cannot see the schema.
fn is_unreadable(err: &TlxError) -> bool {
    match err {
        TlxError::Sql(e) => matches!(
            e.sqlite_error_code(),
            Some(ErrorCode::NotADatabase | ErrorCode::CannotOpen | ErrorCode::Unknown)
        ),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uri_path_escapes_query_and_fragment_markers() {
        assert_eq!(
            uri_path(Path::new("/data/50%/a?b#c/meta")),
            "/data/50%25/a%3fb%23c/meta"
        );
        assert_eq!(uri_path(Path::new("/plain/meta")), "/plain/meta");
    }
}
