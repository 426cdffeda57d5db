use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

use tlx_core::StoryKind;

#[derive(Parser)]
#[command(author, version, about = "tlxdev: narrative text extractor", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Log progress details (info level)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Log everything (debug level)
    #[arg(long, global = true)]
    pub debug: bool,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum KindArg {
    Story,
    Home,
    Lyrics,
    Preview,
}

impl From<KindArg> for StoryKind {
    fn from(k: KindArg) -> Self {
        match k {
            KindArg::Story => StoryKind::Story,
            KindArg::Home => StoryKind::Home,
            KindArg::Lyrics => StoryKind::Lyrics,
            KindArg::Preview => StoryKind::Preview,
        }
    }
}

/// Narrowing flags shared by `extract` and `query`.
#[derive(Args, Clone, Debug)]
pub struct Selector {
    /// Story kind to select
    #[arg(short = 't', long = "type", value_enum, default_value_t = KindArg::Story)]
    pub kind: KindArg,

    /// Home set (5 digits)
    #[arg(short, long)]
    pub set: Option<String>,

    /// Group (2 digits)
    #[arg(short, long)]
    pub group: Option<String>,

    /// Unit id (4 digits)
    #[arg(long)]
    pub id: Option<String>,

    /// Index within the unit (3 digits)
    #[arg(long)]
    pub idx: Option<String>,

    /// Composite identifier, e.g. 040012001; explicit fields take precedence
    #[arg(long)]
    pub story: Option<String>,

    /// Game data directory holding `dat/` and `meta`
    #[arg(long, env = "UMA_DATA_DIR", default_value = ".")]
    pub data_dir: PathBuf,

    /// Index database (defaults to <data-dir>/meta)
    #[arg(long)]
    pub meta: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Extract narrative text to JSON files
    Extract {
        #[command(flatten)]
        selector: Selector,

        /// Output root
        #[arg(long, default_value = "raw")]
        dst: PathBuf,

        /// Re-extract units that already have output
        #[arg(short = 'O', long)]
        overwrite: bool,

        /// Worker threads
        #[arg(short, long, default_value_t = 4)]
        workers: usize,

        /// Skip the asset-root sanity check
        #[arg(long)]
        no_preflight: bool,
    },

    /// List matching index rows without extracting
    Query {
        #[command(flatten)]
        selector: Selector,
    },

    /// Decrypt the index database to a plaintext copy
    DecryptIndex {
        /// Encrypted index database
        meta: PathBuf,

        /// Plaintext output path
        out: PathBuf,

        /// Directory holding the native cipher library (defaults to the executable's)
        #[arg(long)]
        lib_dir: Option<PathBuf>,
    },

    /// Decode one bundle file with its record key
    Decode {
        input: PathBuf,
        out: PathBuf,

        /// Record key from the index `e` column
        #[arg(long, allow_negative_numbers = true)]
        key: i64,
    },
}
