//! Batch extraction over a bounded worker pool.
//!
//! Each index record becomes one independent task. A task either writes one
//! JSON document or ends as a skip or a failure; nothing a task does can
//! abort the batch. Outcomes flow back over a channel and are folded into a
//! [`Tally`] on the calling thread.

use std::any::Any;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::path::PathBuf;
use std::sync::mpsc;

use rayon::prelude::*;
use tracing::{debug, error, info};

use crate::bundle::decode::BundleDecoder;
use crate::domain::IndexRecord;
use crate::error::{Result, TlxError};
use crate::extract::output::{output_dir, output_exists, write_record};
use crate::extract::record::ExtractedRecord;
use crate::extract::walk::build_record;
use crate::graph::GraphParser;
use crate::graph::schema::find_root;
use crate::ident::{StoryId, StoryKind};
use crate::repo::BundleRepo;
use crate::stats::Tally;

#[derive(Clone, Debug)]
pub struct ExtractOptions {
    pub kind: StoryKind,
    pub output_root: PathBuf,
    /// Re-extract even when output already exists.
    pub overwrite: bool,
    /// Worker threads; clamped to at least one.
    pub workers: usize,
}

impl Default for ExtractOptions {
    fn default() -> Self {
        Self {
            kind: StoryKind::Story,
            output_root: PathBuf::from("raw"),
            overwrite: false,
            workers: 4,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SkipReason {
    PathHintTooShort,
    OutputExists,
    BundleMissing,
    Patched,
    NoSchema,
    NoText,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Outcome {
    Extracted { path: PathBuf },
    Skipped(SkipReason),
    Failed { content_hash: String, message: String },
}

pub struct Extractor {
    opts: ExtractOptions,
    repo: Box<dyn BundleRepo>,
    parser: Box<dyn GraphParser>,
    decoder: BundleDecoder,
}

impl Extractor {
    pub fn new(
        opts: ExtractOptions,
        repo: Box<dyn BundleRepo>,
        parser: Box<dyn GraphParser>,
    ) -> Result<Self> {
        Ok(Self::with_decoder(opts, repo, parser, BundleDecoder::new()?))
    }

    pub fn with_decoder(
        opts: ExtractOptions,
        repo: Box<dyn BundleRepo>,
        parser: Box<dyn GraphParser>,
        decoder: BundleDecoder,
    ) -> Self {
        Self {
            opts,
            repo,
            parser,
            decoder,
        }
    }

    pub fn options(&self) -> &ExtractOptions {
        &self.opts
    }

    /// Fail fast when the first candidate's bundle is absent: that almost
    /// always means the asset root is wrong rather than one file missing.
    pub fn preflight(&self, records: &[IndexRecord]) -> Result<()> {
        let Some(first) = records.first() else {
            return Ok(());
        };
        let path = self.repo.bundle_path(&first.content_hash);
        debug!(path = %path.display(), "pre-flight check");
        if self.repo.exists(&first.content_hash) {
            Ok(())
        } else {
            Err(TlxError::AssetMissing(path))
        }
    }

    pub fn run(&self, records: &[IndexRecord]) -> Result<Tally> {
        self.run_with_progress(records, |_, _| {})
    }

    /// Process every record; `on_outcome` sees the running tally and each
    /// outcome as tasks complete, in completion order.
    pub fn run_with_progress<F>(&self, records: &[IndexRecord], mut on_outcome: F) -> Result<Tally>
    where
        F: FnMut(&Tally, &Outcome),
    {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.opts.workers.max(1))
            .thread_name(|i| format!("tlx-worker-{i}"))
            .build()
            .map_err(std::io::Error::other)?;

        let (tx, rx) = mpsc::channel::<Outcome>();
        let mut tally = Tally::default();
        std::thread::scope(|s| {
            s.spawn(|| {
                pool.install(|| {
                    records.par_iter().for_each_with(tx, |tx, rec| {
                        // receiver outlives every sender
                        let _ = tx.send(self.export_one(rec));
                    });
                });
            });
            for outcome in rx {
                tally.record(&outcome);
                on_outcome(&tally, &outcome);
            }
        });
        info!(
            extracted = tally.extracted,
            skipped = tally.skipped,
            failed = tally.failed,
            "batch complete"
        );
        Ok(tally)
    }

    /// Run one record through resolve, decode, extract and write.
    pub fn export_one(&self, rec: &IndexRecord) -> Outcome {
        let hash = rec.content_hash.as_str();
        debug!(content_hash = hash, path_hint = %rec.path_hint, "processing");

        let id = match StoryId::from_path_hint(self.opts.kind, &rec.path_hint) {
            Ok(id) => id,
            Err(e) => {
                debug!(content_hash = hash, error = %e, "skipping");
                return Outcome::Skipped(SkipReason::PathHintTooShort);
            }
        };

        let dir = output_dir(&self.opts.output_root, &id);
        if !self.opts.overwrite && output_exists(&dir, &id) {
            return Outcome::Skipped(SkipReason::OutputExists);
        }
        if !self.repo.exists(hash) {
            return Outcome::Skipped(SkipReason::BundleMissing);
        }
        if self.repo.is_patched(hash) {
            debug!(content_hash = hash, "bundle carries patch marker");
            return Outcome::Skipped(SkipReason::Patched);
        }

        let record = match self.extract(rec) {
            Ok(Some(r)) => r,
            Ok(None) => return Outcome::Skipped(SkipReason::NoSchema),
            Err(e) => return self.failed(hash, e.to_string()),
        };
        if record.is_empty() {
            return Outcome::Skipped(SkipReason::NoText);
        }

        let filename = id.filename(&record.title);
        match write_record(&dir, &filename, &record) {
            Ok(path) => {
                info!(content_hash = hash, file = %filename, "extracted");
                Outcome::Extracted { path }
            }
            Err(e) => self.failed(hash, e.to_string()),
        }
    }

    /// Decode the bundle and walk its narrative root. `None` when no object
    /// carries a recognized schema.
    fn extract(&self, rec: &IndexRecord) -> Result<Option<ExtractedRecord>> {
        let raw = self.repo.read(&rec.content_hash)?;
        let data = self.decoder.decode(raw, rec.bundle_key);
        let kind = self.opts.kind;
        let parser = self.parser.as_ref();

        // the parser is foreign code; a panic in it must stay inside this task
        catch_unwind(AssertUnwindSafe(|| -> Result<Option<ExtractedRecord>> {
            let graph = parser.parse(data)?;
            let Some(root) = find_root(graph.as_ref(), kind) else {
                return Ok(None);
            };
            build_record(kind, &root, graph.as_ref()).map(Some)
        }))
        .unwrap_or_else(|payload| Err(TlxError::Graph(panic_message(payload.as_ref()))))
    }

    fn failed(&self, hash: &str, message: String) -> Outcome {
        error!(content_hash = hash, error = %message, "failed extracting");
        Outcome::Failed {
            content_hash: hash.to_owned(),
            message,
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        format!("parser panicked: {s}")
    } else if let Some(s) = payload.downcast_ref::<String>() {
        format!("parser panicked: {s}")
    } else {
        "parser panicked".to_owned()
    }
}
