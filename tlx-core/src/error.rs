use std::path::PathBuf;

use thiserror::Error;

use crate::ident::StoryKind;

#[derive(Error, Debug)]
pub enum TlxError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("SQLite error: {0}")]
    Sql(#[from] rusqlite::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid hex: {0}")]
    Hex(#[from] hex::FromHexError),

    #[error("index database not found at {}", .0.display())]
    IndexMissing(PathBuf),

    #[error("native cipher library not found at {}", .0.display())]
    NativeLibraryMissing(PathBuf),

    #[error("native cipher library: {0}")]
    NativeLibrary(#[from] libloading::Error),

    #[error("cipher engine could not open {} (rc={status})", .path.display())]
    CipherOpen { path: PathBuf, status: i32 },

    #[error("cipher configuration `{param}` rejected (rc={status})")]
    CipherConfig { param: String, status: i32 },

    #[error("key rejected: {0}")]
    KeyRejected(String),

    #[error("backup/decrypt failed (rc={status})")]
    Backup { status: i32 },

    #[error("bundle not found at {}; is the data directory correct?", .0.display())]
    AssetMissing(PathBuf),

    #[error("identifier for {kind} must be ASCII digits: {token:?}")]
    InvalidToken { kind: StoryKind, token: String },

    #[error("path hint too short for {kind}: {hint:?}")]
    PathHintTooShort { kind: StoryKind, hint: String },

    #[error("object graph: {0}")]
    Graph(String),

    #[error("schema: {0}")]
    Schema(String),
}

// Convenient crate-wide result type
pub type Result<T> = std::result::Result<T, TlxError>;
