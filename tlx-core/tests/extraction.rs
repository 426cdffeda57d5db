use std::path::{Path, PathBuf};

use serde_json::{Value, json};
use tlx_core::bundle::decode::{BundleDecoder, HEADER_LEN, PATCH_MARK};
use tlx_core::graph::json::JsonGraphParser;
use tlx_core::repo_factory::{Backend, open_repo};
use tlx_core::repo_fs::shard_path;
use tlx_core::{
    ExtractOptions, ExtractedRecord, Extractor, IndexRecord, Outcome, SkipReason, StoryKind,
    TextBlock,
};

const STORY_HINT: &str = "story/data/04/0012/storytimeline_040012001";

struct Fixture {
    _dir: tempfile::TempDir,
    dat: PathBuf,
    out: PathBuf,
}

impl Fixture {
    fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let dat = dir.path().join("dat");
        let out = dir.path().join("raw");
        Self { _dir: dir, dat, out }
    }

    fn extractor(&self, kind: StoryKind) -> Extractor {
        let opts = ExtractOptions {
            kind,
            output_root: self.out.clone(),
            overwrite: false,
            workers: 3,
        };
        Extractor::new(
            opts,
            open_repo(Backend::Fs, self.dat.clone()),
            Box::new(JsonGraphParser),
        )
        .unwrap()
    }

    fn put_bundle(&self, hash: &str, bytes: &[u8]) {
        let path = shard_path(&self.dat, hash);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, bytes).unwrap();
    }
}

/// A typetree export laid out like a real bundle: clear header, then body.
fn bundle(objects: Value) -> Vec<u8> {
    let mut data = vec![b' '; HEADER_LEN];
    data.extend(serde_json::to_vec(&json!({ "objects": objects })).unwrap());
    data
}

fn timeline_bundle(title: &str, texts: &[(&str, &str)]) -> Vec<u8> {
    let clips: Vec<_> = (0..texts.len())
        .map(|i| json!({"m_PathID": 100 + i as i64}))
        .collect();
    let mut objects = vec![json!({
        "path_id": 1,
        "tree": {"Title": title, "BlockList": [{"TextTrack": {"ClipList": clips}}]}
    })];
    for (i, (name, text)) in texts.iter().enumerate() {
        objects.push(json!({
            "path_id": 100 + i as i64,
            "tree": {"Name": name, "Text": text, "ChoiceDataList": []}
        }));
    }
    bundle(Value::Array(objects))
}

fn record(hash: &str, hint: &str, key: i64) -> IndexRecord {
    IndexRecord {
        content_hash: hash.into(),
        path_hint: hint.into(),
        bundle_key: key,
    }
}

fn read_output(path: &Path) -> ExtractedRecord {
    serde_json::from_slice(&std::fs::read(path).unwrap()).unwrap()
}

#[test]
fn story_is_written_once_then_skipped() {
    let fx = Fixture::new();
    fx.put_bundle("AB12", &timeline_bundle("Prologue", &[("", "Hello")]));
    let ex = fx.extractor(StoryKind::Story);
    let rec = record("AB12", STORY_HINT, 0);

    let expected = fx.out.join("story/04/0012/storytimeline_040012001.json");
    assert_eq!(
        ex.export_one(&rec),
        Outcome::Extracted {
            path: expected.clone()
        }
    );
    let out = read_output(&expected);
    assert_eq!(out.title, "Prologue");
    assert!(!out.no_wrap);
    assert_eq!(out.text_blocks, vec![TextBlock::new("", "Hello")]);

    assert_eq!(
        ex.export_one(&rec),
        Outcome::Skipped(SkipReason::OutputExists)
    );
}

#[test]
fn overwrite_re_extracts_existing_output() {
    let fx = Fixture::new();
    fx.put_bundle("AB12", &timeline_bundle("Prologue", &[("", "Hello")]));
    let rec = record("AB12", STORY_HINT, 0);
    assert!(matches!(
        fx.extractor(StoryKind::Story).export_one(&rec),
        Outcome::Extracted { .. }
    ));

    let opts = ExtractOptions {
        output_root: fx.out.clone(),
        overwrite: true,
        ..Default::default()
    };
    let ex = Extractor::new(
        opts,
        open_repo(Backend::Fs, fx.dat.clone()),
        Box::new(JsonGraphParser),
    )
    .unwrap();
    assert!(matches!(ex.export_one(&rec), Outcome::Extracted { .. }));
}

#[test]
fn encrypted_bundle_is_decoded_before_parsing() {
    let fx = Fixture::new();
    let key = 0x1234;
    let plain = timeline_bundle("Act 2", &[("Trainer", "Good morning"), ("Uma", "Let's go")]);
    let decoder = BundleDecoder::new().unwrap();
    let encoded = decoder.decode(plain.clone(), key);
    assert_ne!(encoded, plain);
    assert_eq!(&encoded[..HEADER_LEN], &plain[..HEADER_LEN]);
    fx.put_bundle("C0DE", &encoded);

    let ex = fx.extractor(StoryKind::Story);
    let Outcome::Extracted { path } = ex.export_one(&record("C0DE", STORY_HINT, key)) else {
        panic!("expected extraction");
    };
    let out = read_output(&path);
    assert_eq!(out.title, "Act 2");
    assert_eq!(
        out.text_blocks,
        vec![
            TextBlock::new("Trainer", "Good morning"),
            TextBlock::new("Uma", "Let's go"),
        ]
    );
}

#[test]
fn patched_bundle_is_skipped_not_failed() {
    let fx = Fixture::new();
    let mut data = timeline_bundle("x", &[("", "Hello")]);
    data.extend_from_slice(&PATCH_MARK);
    fx.put_bundle("AB12", &data);

    let ex = fx.extractor(StoryKind::Story);
    assert_eq!(
        ex.export_one(&record("AB12", STORY_HINT, 0)),
        Outcome::Skipped(SkipReason::Patched)
    );
    assert!(!fx.out.exists());
}

#[test]
fn empty_block_list_writes_nothing() {
    let fx = Fixture::new();
    fx.put_bundle("AB12", &timeline_bundle("Empty", &[]));
    let ex = fx.extractor(StoryKind::Story);
    assert_eq!(
        ex.export_one(&record("AB12", STORY_HINT, 0)),
        Outcome::Skipped(SkipReason::NoText)
    );
    assert!(!fx.out.exists());
}

#[test]
fn bundle_without_narrative_root_is_skipped() {
    let fx = Fixture::new();
    fx.put_bundle(
        "AB12",
        &bundle(json!([{"path_id": 1, "tree": {"m_Name": "texture"}}, {"path_id": 2}])),
    );
    let ex = fx.extractor(StoryKind::Story);
    assert_eq!(
        ex.export_one(&record("AB12", STORY_HINT, 0)),
        Outcome::Skipped(SkipReason::NoSchema)
    );
}

#[test]
fn unparseable_bundle_is_a_failure() {
    let fx = Fixture::new();
    fx.put_bundle("AB12", b"UnityFS\0not an export");
    let ex = fx.extractor(StoryKind::Story);
    match ex.export_one(&record("AB12", STORY_HINT, 0)) {
        Outcome::Failed { content_hash, .. } => assert_eq!(content_hash, "AB12"),
        other => panic!("expected failure, got {other:?}"),
    }
}

#[test]
fn home_units_nest_by_set_and_are_no_wrap() {
    let fx = Fixture::new();
    fx.put_bundle("EF56", &timeline_bundle("", &[("", "Welcome back")]));
    let ex = fx.extractor(StoryKind::Home);
    let rec = record("EF56", "home/data/00001/01/hometimeline_00001_01_0001001", 0);

    let Outcome::Extracted { path } = ex.export_one(&rec) else {
        panic!("expected extraction");
    };
    assert_eq!(
        path,
        fx.out
            .join("home/00001/01/0001/hometimeline_00001_01_0001001.json")
    );
    assert!(read_output(&path).no_wrap);
}

#[test]
fn preview_filename_carries_sanitized_title() {
    let fx = Fixture::new();
    fx.put_bundle(
        "AA01",
        &bundle(json!([{
            "path_id": 1,
            "tree": {
                "Title": "Fan/Fest: Day 1",
                "DataArray": [{"Name": "Host", "Text": "Welcome"}, {"Name": "", "Text": ""}]
            }
        }])),
    );
    let ex = fx.extractor(StoryKind::Preview);
    let rec = record(
        "AA01",
        "outgame/announceevent/loguiasset/ast_announce_event_log_ui_asset_00042",
        0,
    );

    let Outcome::Extracted { path } = ex.export_one(&rec) else {
        panic!("expected extraction");
    };
    assert_eq!(path, fx.out.join("preview/0042 (FanFest Day 1).json"));
    assert_eq!(read_output(&path).text_blocks.len(), 2);
    assert_eq!(
        ex.export_one(&rec),
        Outcome::Skipped(SkipReason::OutputExists)
    );
}

#[test]
fn lyrics_come_from_the_script_table() {
    let fx = Fixture::new();
    fx.put_bundle(
        "BB02",
        &bundle(json!([
            {"path_id": 3, "tree": {"m_Script": {"m_FileID": 0, "m_PathID": 11}}},
            {
                "path_id": 7,
                "tree": {"m_Name": "m1001_lyrics", "m_Script": "time,lyrics\n0,first\n900,second\n"}
            }
        ])),
    );
    let ex = fx.extractor(StoryKind::Lyrics);
    let Outcome::Extracted { path } =
        ex.export_one(&record("BB02", "live/musicscores/m1001/m1001_lyrics", 0))
    else {
        panic!("expected extraction");
    };
    assert_eq!(path, fx.out.join("lyrics/1001.json"));
    let out = read_output(&path);
    assert_eq!(out.title, "");
    assert_eq!(
        out.text_blocks,
        vec![TextBlock::new("", "first"), TextBlock::new("", "second")]
    );
}

#[test]
fn batch_tally_accounts_for_every_record() {
    let fx = Fixture::new();
    fx.put_bundle("AB12", &timeline_bundle("One", &[("", "Hello")]));
    fx.put_bundle("CD34", b"garbage");
    let mut patched = timeline_bundle("Three", &[("", "Hi")]);
    patched.extend_from_slice(&PATCH_MARK);
    fx.put_bundle("EF56", &patched);

    let records = vec![
        record("AB12", STORY_HINT, 0),
        record("CD34", "story/data/04/0012/storytimeline_040012002", 0),
        record("EF56", "story/data/04/0012/storytimeline_040012003", 0),
        record("0000", "story/data/04/0012/storytimeline_040012004", 0),
        record("1111", "short", 0),
    ];
    let ex = fx.extractor(StoryKind::Story);
    ex.preflight(&records).unwrap();

    let mut seen = Vec::new();
    let tally = ex
        .run_with_progress(&records, |t, o| seen.push((t.total(), o.clone())))
        .unwrap();
    assert_eq!(tally.extracted, 1);
    assert_eq!(tally.failed, 1);
    assert_eq!(tally.skipped, 3);
    assert_eq!(tally.to_string(), "Extracted: 1, Skipped/Failed: 4");
    assert_eq!(
        seen.iter().map(|(n, _)| *n).collect::<Vec<_>>(),
        vec![1, 2, 3, 4, 5]
    );

    // a second pass only re-reports the written unit as existing
    let again = ex.run(&records).unwrap();
    assert_eq!(again.extracted, 0);
    assert_eq!(again.total(), 5);
}

#[test]
fn preflight_rejects_wrong_asset_root() {
    let fx = Fixture::new();
    let ex = fx.extractor(StoryKind::Story);
    let err = ex
        .preflight(&[record("AB12", STORY_HINT, 0)])
        .unwrap_err();
    assert!(err.to_string().contains("AB12"));
}
