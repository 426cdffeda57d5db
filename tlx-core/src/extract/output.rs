use std::io::Write;
use std::path::{Path, PathBuf};

use serde::Serialize;
use serde_json::ser::PrettyFormatter;
use walkdir::WalkDir;

use crate::error::Result;
use crate::extract::record::ExtractedRecord;
use crate::ident::StoryId;

/// `<root>/<kind>/[<set>/<group>/<id>/]`
pub fn output_dir(root: &Path, id: &StoryId) -> PathBuf {
    root.join(id.kind().as_str()).join(id.sub_path())
}

/// Whether a previous run already produced output for `id` in `dir`.
///
/// Preview filenames embed the decoded title, so for flat kinds any
/// `<id>.json` or `<id> (...).json` counts.
pub fn output_exists(dir: &Path, id: &StoryId) -> bool {
    if !id.kind().is_flat() {
        return dir.join(id.filename("")).is_file();
    }
    let stem = id.filename_stem();
    let exact = format!("{stem}.json");
    let titled = format!("{stem} (");
    WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .any(|e| {
            let name = e.file_name().to_string_lossy();
            name == exact.as_str() || (name.starts_with(&titled) && name.ends_with(".json"))
        })
}

/// Serialize `record` as 4-space indented UTF-8 JSON.
pub fn to_json(record: &ExtractedRecord) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    let mut ser =
        serde_json::Serializer::with_formatter(&mut buf, PrettyFormatter::with_indent(b"    "));
    record.serialize(&mut ser)?;
    Ok(buf)
}

/// Write `record` to `dir/filename` through a temp file in the same directory,
/// so readers never see a partial document.
pub fn write_record(dir: &Path, filename: &str, record: &ExtractedRecord) -> Result<PathBuf> {
    std::fs::create_dir_all(dir)?;
    let target = dir.join(filename);
    let mut tmp = tempfile::Builder::new()
        .prefix(".tlx-")
        .suffix(".part")
        .tempfile_in(dir)?;
    tmp.write_all(&to_json(record)?)?;
    tmp.as_file().sync_all()?;
    tmp.persist(&target).map_err(|e| e.error)?;
    Ok(target)
}
