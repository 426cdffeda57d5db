use std::path::PathBuf;

use tlx_core::bundle::decode::BundleDecoder;
use tlx_core::crypto::keys::index_decrypt_key;
use tlx_core::error::Result;
use tlx_core::graph::json::JsonGraphParser;
use tlx_core::index::cipher::decrypt_to_plaintext;
use tlx_core::index::native::{Sqlite3mc, default_library_dir};
use tlx_core::repo_factory::{Backend, open_repo};
use tlx_core::{
    ExtractOptions, Extractor, IndexDb, IndexOpenOptions, IndexRecord, StoryId, StoryKind,
};
use tracing::info;

use crate::presentation::cli::Selector;

const PROGRESS_EVERY: u64 = 100;

/// Explicit fields override the matching parts of `--story`.
fn story_id(sel: &Selector) -> Result<StoryId> {
    let kind = StoryKind::from(sel.kind);
    let base = match &sel.story {
        Some(token) => StoryId::parse(kind, token)?,
        None => StoryId::any(kind),
    };
    let pick = |flag: &Option<String>, parsed: Option<&str>| {
        flag.clone().or_else(|| parsed.map(str::to_owned))
    };
    Ok(StoryId::new(
        kind,
        pick(&sel.set, base.set()),
        pick(&sel.group, base.group()),
        pick(&sel.id, base.id()),
        pick(&sel.idx, base.idx()),
    ))
}

fn lookup(sel: &Selector) -> Result<(StoryId, Vec<IndexRecord>)> {
    let meta = sel
        .meta
        .clone()
        .unwrap_or_else(|| sel.data_dir.join("meta"));
    let id = story_id(sel)?;
    let db = IndexDb::open(&IndexOpenOptions::new(meta))?;
    let records = db.query(&id)?;
    info!(pattern = %id.query_pattern(), rows = records.len(), "index query");
    Ok((id, records))
}

pub fn handle_extract(
    selector: Selector,
    dst: PathBuf,
    overwrite: bool,
    workers: usize,
    no_preflight: bool,
) -> Result<()> {
    let (id, records) = lookup(&selector)?;
    println!("Found {} assets", records.len());

    let opts = ExtractOptions {
        kind: id.kind(),
        output_root: dst,
        overwrite,
        workers,
    };
    let repo = open_repo(Backend::Fs, selector.data_dir.join("dat"));
    let extractor = Extractor::new(opts, repo, Box::new(JsonGraphParser))?;
    if !no_preflight {
        extractor.preflight(&records)?;
    }

    let total = records.len();
    let tally = extractor.run_with_progress(&records, |t, _| {
        let done = t.total();
        if done % PROGRESS_EVERY == 0 {
            println!("Progress: {done}/{total}");
        }
    })?;
    println!("Done. {tally}");
    Ok(())
}

pub fn handle_query(selector: Selector) -> Result<()> {
    let (_, records) = lookup(&selector)?;
    for r in &records {
        println!("{}\t{}\t{}", r.content_hash, r.path_hint, r.bundle_key);
    }
    eprintln!("{} rows", records.len());
    Ok(())
}

pub fn handle_decrypt_index(meta: PathBuf, out: PathBuf, lib_dir: Option<PathBuf>) -> Result<()> {
    let lib_dir = lib_dir.unwrap_or_else(default_library_dir);
    let engine = Sqlite3mc::load(&lib_dir)?;
    decrypt_to_plaintext(&engine, &meta, &out, &index_decrypt_key()?)?;
    println!("decrypted index written to {}", out.display());
    Ok(())
}

pub fn handle_decode(input: PathBuf, out: PathBuf, key: i64) -> Result<()> {
    let raw = std::fs::read(&input)?;
    let decoded = BundleDecoder::new()?.decode(raw, key);
    std::fs::write(&out, decoded)?;
    println!("decoded {} -> {}", input.display(), out.display());
    Ok(())
}
