#![deny(unsafe_code)]

pub mod domain;
pub mod error;
pub mod ident;
pub mod repo;
pub mod repo_factory;
pub mod repo_fs;
pub mod stats;

pub mod util {
    pub mod sanitize;
}

pub mod crypto {
    pub mod hex;
    pub mod kdf;
    pub mod keys;
}

pub mod bundle {
    pub mod decode;
}

pub mod index;
pub mod graph;

pub mod extract {
    pub mod output;
    pub mod pipeline;
    pub mod record;
    pub mod walk;
}

// Re-exports: stable API surface
pub use domain::IndexRecord;
pub use extract::pipeline::{ExtractOptions, Extractor, Outcome, SkipReason};
pub use extract::record::{ExtractedRecord, TextBlock};
pub use ident::{StoryId, StoryKind};
pub use index::{IndexDb, IndexOpenOptions};
pub use stats::Tally;
