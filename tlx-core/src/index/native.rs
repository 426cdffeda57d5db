//! Runtime binding to the SQLite3 Multiple Ciphers library.
#![allow(unsafe_code)]

use std::ffi::{CStr, CString, c_char, c_int, c_void};
use std::path::{Path, PathBuf};
use std::ptr;

use libloading::Library;
use tracing::debug;

use crate::error::{Result, TlxError};
use crate::index::cipher::{BackupJob, CipherEngine, KeyedDb, SQLITE_OK};

#[cfg(windows)]
pub const LIBRARY_NAME: &str = "sqlite3mc_x64.dll";
#[cfg(target_os = "macos")]
pub const LIBRARY_NAME: &str = "libsqlite3mc.dylib";
#[cfg(all(unix, not(target_os = "macos")))]
pub const LIBRARY_NAME: &str = "libsqlite3mc.so";

const SQLITE_ERROR: c_int = 1;
const SQLITE_OPEN_READWRITE: c_int = 0x0000_0002;
const SQLITE_OPEN_CREATE: c_int = 0x0000_0004;

type OpenV2Fn = unsafe extern "C" fn(*const c_char, *mut *mut c_void, c_int, *const c_char) -> c_int;
type CloseFn = unsafe extern "C" fn(*mut c_void) -> c_int;
type ErrMsgFn = unsafe extern "C" fn(*mut c_void) -> *const c_char;
type McConfigFn = unsafe extern "C" fn(*mut c_void, *const c_char, c_int) -> c_int;
type KeyFn = unsafe extern "C" fn(*mut c_void, *const c_void, c_int) -> c_int;
type BackupInitFn =
    unsafe extern "C" fn(*mut c_void, *const c_char, *mut c_void, *const c_char) -> *mut c_void;
type BackupStepFn = unsafe extern "C" fn(*mut c_void, c_int) -> c_int;
type BackupFinishFn = unsafe extern "C" fn(*mut c_void) -> c_int;

pub struct Sqlite3mc {
    open_v2: OpenV2Fn,
    close: CloseFn,
    errmsg: ErrMsgFn,
    mc_config: McConfigFn,
    key: KeyFn,
    backup_init: BackupInitFn,
    backup_step: BackupStepFn,
    backup_finish: BackupFinishFn,
    // Keeps the symbols above mapped.
    _lib: Library,
}

/// Default location of the library: next to the running executable.
pub fn default_library_dir() -> PathBuf {
    std::env::current_exe()
        .ok()
        .and_then(|p| p.parent().map(Path::to_path_buf))
        .unwrap_or_else(|| PathBuf::from("."))
}

impl Sqlite3mc {
    pub fn load(dir: &Path) -> Result<Self> {
        let path = dir.join(LIBRARY_NAME);
        if !path.is_file() {
            return Err(TlxError::NativeLibraryMissing(path));
        }
        debug!(path = %path.display(), "loading native cipher library");
        // SAFETY: sqlite3mc has no load-time initialisers beyond SQLite's own,
        // and every symbol is resolved against its documented C signature.
        unsafe {
            let lib = Library::new(&path)?;
            let open_v2 = *lib.get::<OpenV2Fn>(b"sqlite3_open_v2\0")?;
            let close = *lib.get::<CloseFn>(b"sqlite3_close\0")?;
            let errmsg = *lib.get::<ErrMsgFn>(b"sqlite3_errmsg\0")?;
            let mc_config = *lib.get::<McConfigFn>(b"sqlite3mc_config\0")?;
            let key = *lib.get::<KeyFn>(b"sqlite3_key\0")?;
            let backup_init = *lib.get::<BackupInitFn>(b"sqlite3_backup_init\0")?;
            let backup_step = *lib.get::<BackupStepFn>(b"sqlite3_backup_step\0")?;
            let backup_finish = *lib.get::<BackupFinishFn>(b"sqlite3_backup_finish\0")?;
            Ok(Self {
                open_v2,
                close,
                errmsg,
                mc_config,
                key,
                backup_init,
                backup_step,
                backup_finish,
                _lib: lib,
            })
        }
    }

    fn open_raw(&self, path: &Path) -> Result<*mut c_void> {
        let c_path = path_cstring(path)?;
        let mut db = ptr::null_mut();
        // SAFETY: c_path is NUL-terminated and outlives the call; db is an out-param.
        let status = unsafe {
            (self.open_v2)(
                c_path.as_ptr(),
                &mut db,
                SQLITE_OPEN_READWRITE | SQLITE_OPEN_CREATE,
                ptr::null(),
            )
        };
        if status != SQLITE_OK || db.is_null() {
            if !db.is_null() {
                // SAFETY: sqlite3_open_v2 may hand back a handle even on failure.
                unsafe { (self.close)(db) };
            }
            return Err(TlxError::CipherOpen {
                path: path.to_path_buf(),
                status,
            });
        }
        Ok(db)
    }
}

impl CipherEngine for Sqlite3mc {
    fn open(&self, path: &Path) -> Result<Box<dyn KeyedDb + '_>> {
        let db = self.open_raw(path)?;
        Ok(Box::new(NativeDb { api: self, db }))
    }
}

struct NativeDb<'a> {
    api: &'a Sqlite3mc,
    db: *mut c_void,
}

impl KeyedDb for NativeDb<'_> {
    fn configure(&mut self, param: &str, value: i32) -> i32 {
        let Ok(name) = CString::new(param) else {
            return -1;
        };
        // SAFETY: self.db is a live handle; name is NUL-terminated.
        unsafe { (self.api.mc_config)(self.db, name.as_ptr(), value) }
    }

    fn key(&mut self, key: &[u8]) -> i32 {
        let Ok(len) = c_int::try_from(key.len()) else {
            return SQLITE_ERROR;
        };
        // SAFETY: the engine copies `len` bytes from `key` before returning.
        unsafe { (self.api.key)(self.db, key.as_ptr().cast(), len) }
    }

    fn errmsg(&self) -> String {
        // SAFETY: sqlite3_errmsg returns a NUL-terminated string owned by the
        // connection, valid until the next call on it.
        unsafe {
            let p = (self.api.errmsg)(self.db);
            if p.is_null() {
                String::new()
            } else {
                CStr::from_ptr(p).to_string_lossy().into_owned()
            }
        }
    }

    fn backup_to(&mut self, dst: &Path) -> Result<Box<dyn BackupJob + '_>> {
        let dst_db = self.api.open_raw(dst)?;
        let main = c"main";
        // SAFETY: both handles are live and distinct.
        let backup =
            unsafe { (self.api.backup_init)(dst_db, main.as_ptr(), self.db, main.as_ptr()) };
        if backup.is_null() {
            // SAFETY: dst_db was opened above and is not shared.
            unsafe { (self.api.close)(dst_db) };
            return Err(TlxError::Backup {
                status: SQLITE_ERROR,
            });
        }
        Ok(Box::new(NativeBackup {
            api: self.api,
            backup,
            dst_db,
        }))
    }
}

impl Drop for NativeDb<'_> {
    fn drop(&mut self) {
        // SAFETY: the handle came from sqlite3_open_v2 and is closed exactly once.
        unsafe { (self.api.close)(self.db) };
    }
}

struct NativeBackup<'a> {
    api: &'a Sqlite3mc,
    backup: *mut c_void,
    dst_db: *mut c_void,
}

impl BackupJob for NativeBackup<'_> {
    fn step(&mut self, pages: i32) -> i32 {
        // SAFETY: backup is live until drop.
        unsafe { (self.api.backup_step)(self.backup, pages) }
    }
}

impl Drop for NativeBackup<'_> {
    fn drop(&mut self) {
        // SAFETY: finish releases the backup object; the destination is closed after it.
        unsafe {
            (self.api.backup_finish)(self.backup);
            (self.api.close)(self.dst_db);
        }
    }
}

fn path_cstring(path: &Path) -> Result<CString> {
    CString::new(path.to_string_lossy().as_bytes()).map_err(|e| {
        std::io::Error::new(
            std::io::ErrorKind::InvalidInput,
            format!("path contains NUL: {e}"),
        )
        .into()
    })
}
