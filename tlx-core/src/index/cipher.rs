//! Decrypt-to-plaintext through a cipher-capable SQLite engine.
//!
//! The engine is reached through three narrow traits so the native binding
//! ([`crate::index::native`]) can be swapped for a test double.

use std::path::Path;

use tracing::{debug, info};

use crate::crypto::keys::INDEX_CIPHER_SCHEME;
use crate::error::{Result, TlxError};

pub const SQLITE_OK: i32 = 0;
pub const SQLITE_DONE: i32 = 101;

/// Pages copied per backup step.
pub const PAGES_PER_STEP: i32 = 5;

pub trait CipherEngine {
    /// Open `path` read-write (creating it if absent).
    fn open(&self, path: &Path) -> Result<Box<dyn KeyedDb + '_>>;
}

/// An open connection on the cipher engine. Closed on drop.
pub trait KeyedDb {
    /// Set a cipher parameter; returns the engine's result (negative on error).
    fn configure(&mut self, param: &str, value: i32) -> i32;

    /// Present the raw key; returns an SQLite status code.
    fn key(&mut self, key: &[u8]) -> i32;

    fn errmsg(&self) -> String;

    /// Start an online backup of this database's `main` into a fresh file.
    fn backup_to(&mut self, dst: &Path) -> Result<Box<dyn BackupJob + '_>>;
}

/// A running backup. Finished (and its destination closed) on drop.
pub trait BackupJob {
    fn step(&mut self, pages: i32) -> i32;
}

/// Step `job` until the engine reports completion.
pub fn run_backup(job: &mut dyn BackupJob) -> Result<()> {
    let mut steps = 0u64;
    loop {
        match job.step(PAGES_PER_STEP) {
            SQLITE_DONE => {
                debug!(steps, "backup complete");
                return Ok(());
            }
            SQLITE_OK => steps += 1,
            status => return Err(TlxError::Backup { status }),
        }
    }
}

/// Key `src` with `key` and copy it page by page into a plaintext `dst`.
///
/// The copy lands in a temporary file next to `dst` and is renamed into place
/// only after the backup completes.
pub fn decrypt_to_plaintext(
    engine: &dyn CipherEngine,
    src: &Path,
    dst: &Path,
    key: &[u8],
) -> Result<()> {
    // the engine opens with CREATE; never let it invent an empty source
    if !src.is_file() {
        return Err(TlxError::IndexMissing(src.to_path_buf()));
    }
    info!(src = %src.display(), "decrypting index database");
    let mut db = engine.open(src)?;

    let status = db.configure("cipher", INDEX_CIPHER_SCHEME);
    if status < 0 {
        return Err(TlxError::CipherConfig {
            param: "cipher".to_owned(),
            status,
        });
    }
    if db.key(key) != SQLITE_OK {
        return Err(TlxError::KeyRejected(db.errmsg()));
    }

    let dir = match dst.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(dir)?;
    let tmp = tempfile::Builder::new()
        .prefix(".tlx-index-")
        .tempfile_in(dir)?
        .into_temp_path();
    {
        let mut job = db.backup_to(&tmp)?;
        run_backup(job.as_mut())?;
    }
    drop(db);
    tmp.persist(dst).map_err(|e| e.error)?;
    info!(dst = %dst.display(), "decrypted index written");
    Ok(())
}
