//! Per-kind typetree walks that turn a schema root into an [`ExtractedRecord`].

use serde_json::Value;

use crate::error::{Result, TlxError};
use crate::extract::record::{ExtractedRecord, TextBlock};
use crate::graph::ObjectGraph;
use crate::graph::schema::SchemaRoot;
use crate::ident::StoryKind;

pub fn build_record(
    kind: StoryKind,
    root: &SchemaRoot,
    graph: &dyn ObjectGraph,
) -> Result<ExtractedRecord> {
    let title = root
        .tree
        .get("Title")
        .and_then(Value::as_str)
        .unwrap_or_default();
    let mut record = ExtractedRecord::new(title, kind.no_wrap());
    record.text_blocks = match kind {
        StoryKind::Story | StoryKind::Home => timeline_blocks(&root.tree, graph)?,
        StoryKind::Preview => preview_blocks(&root.tree)?,
        StoryKind::Lyrics => lyrics_blocks(&root.tree),
    };
    Ok(record)
}

/// BlockList -> TextTrack -> ClipList -> referenced text object.
fn timeline_blocks(tree: &Value, graph: &dyn ObjectGraph) -> Result<Vec<TextBlock>> {
    let mut out = Vec::new();
    for block in array(tree, "BlockList")? {
        let track = field(block, "TextTrack")?;
        for clip in array(track, "ClipList")? {
            let path_id = field(clip, "m_PathID")?
                .as_i64()
                .ok_or_else(|| TlxError::Schema("`m_PathID` is not an integer".into()))?;
            // clips may point outside this bundle
            let Some(obj) = graph.object(path_id) else {
                continue;
            };
            if !obj.has_typetree() {
                continue;
            }
            if let Some(b) = text_object(&obj.read_typetree()?)? {
                out.push(b);
            }
        }
    }
    Ok(out)
}

/// One text clip; `None` when its text is empty.
fn text_object(tree: &Value) -> Result<Option<TextBlock>> {
    let text = string(tree, "Text")?;
    if text.is_empty() {
        return Ok(None);
    }
    let mut block = TextBlock::new(string(tree, "Name")?, text);
    if let Some(choices) = tree.get("ChoiceDataList").and_then(Value::as_array) {
        block.choices = choices
            .iter()
            .filter_map(|c| c.get("Text").and_then(Value::as_str))
            .filter(|t| !t.is_empty())
            .map(str::to_owned)
            .collect();
    }
    Ok(Some(block))
}

fn preview_blocks(tree: &Value) -> Result<Vec<TextBlock>> {
    array(tree, "DataArray")?
        .iter()
        .map(|row| Ok(TextBlock::new(string(row, "Name")?, string(row, "Text")?)))
        .collect()
}

/// CSV rows `time,text,...` after one header row.
fn lyrics_blocks(tree: &Value) -> Vec<TextBlock> {
    let Some(script) = tree.get("m_Script").and_then(Value::as_str) else {
        return Vec::new();
    };
    script
        .lines()
        .skip(1)
        .filter_map(|line| {
            let cols = csv_row(line.trim_end_matches('\r'));
            let text = cols.get(1)?.trim();
            (!text.is_empty()).then(|| TextBlock::new("", text))
        })
        .collect()
}

/// Split one CSV row; double-quoted fields may contain commas and `""`.
fn csv_row(line: &str) -> Vec<String> {
    let mut cols = Vec::new();
    let mut cur = String::new();
    let mut quoted = false;
    let mut chars = line.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '"' if quoted && chars.peek() == Some(&'"') => {
                cur.push('"');
                chars.next();
            }
            '"' => quoted = !quoted,
            ',' if !quoted => cols.push(std::mem::take(&mut cur)),
            _ => cur.push(c),
        }
    }
    cols.push(cur);
    cols
}

fn field<'a>(v: &'a Value, name: &str) -> Result<&'a Value> {
    v.get(name)
        .ok_or_else(|| TlxError::Schema(format!("missing field `{name}`")))
}

fn array<'a>(v: &'a Value, name: &str) -> Result<&'a Vec<Value>> {
    field(v, name)?
        .as_array()
        .ok_or_else(|| TlxError::Schema(format!("`{name}` is not an array")))
}

fn string<'a>(v: &'a Value, name: &str) -> Result<&'a str> {
    field(v, name)?
        .as_str()
        .ok_or_else(|| TlxError::Schema(format!("`{name}` is not a string")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::json::{JsonGraph, JsonObject};
    use serde_json::json;

    fn graph(objects: Vec<(i64, Value)>) -> JsonGraph {
        JsonGraph::from_objects(
            objects
                .into_iter()
                .map(|(path_id, tree)| JsonObject {
                    path_id,
                    tree: Some(tree),
                })
                .collect(),
        )
    }

    fn root(tree: Value) -> SchemaRoot {
        SchemaRoot { path_id: 1, tree }
    }

    #[test]
    fn timeline_follows_clip_references() {
        let g = graph(vec![
            (10, json!({"Name": "Trainer", "Text": "Hi", "NextBlock": 2})),
            (11, json!({"Name": "", "Text": "", "NextBlock": -1})),
            (
                12,
                json!({"Name": "Uma", "Text": "Pick", "ChoiceDataList": [
                    {"Text": "Yes"}, {"Text": ""}, {"Text": "No"}
                ]}),
            ),
        ]);
        let r = root(json!({
            "Title": "Chapter 1",
            "BlockList": [
                {"TextTrack": {"ClipList": [{"m_PathID": 10}, {"m_PathID": 11}]}},
                {"TextTrack": {"ClipList": [{"m_PathID": 99}, {"m_PathID": 12}]}}
            ]
        }));
        let rec = build_record(StoryKind::Story, &r, &g).unwrap();
        assert_eq!(rec.title, "Chapter 1");
        assert!(!rec.no_wrap);
        assert_eq!(
            rec.text_blocks,
            vec![
                TextBlock::new("Trainer", "Hi"),
                TextBlock {
                    name: "Uma".into(),
                    text: "Pick".into(),
                    choices: vec!["Yes".into(), "No".into()],
                },
            ]
        );
    }

    #[test]
    fn home_records_are_no_wrap() {
        let g = graph(vec![(2, json!({"Name": "", "Text": "Hello"}))]);
        let r = root(json!({"BlockList": [{"TextTrack": {"ClipList": [{"m_PathID": 2}]}}]}));
        let rec = build_record(StoryKind::Home, &r, &g).unwrap();
        assert!(rec.no_wrap);
        assert_eq!(rec.title, "");
        assert_eq!(rec.text_blocks, vec![TextBlock::new("", "Hello")]);
    }

    #[test]
    fn missing_block_list_is_a_schema_error() {
        let g = graph(vec![]);
        let r = root(json!({"TextTrack": {}}));
        let err = build_record(StoryKind::Story, &r, &g).unwrap_err();
        assert!(matches!(err, TlxError::Schema(_)));
    }

    #[test]
    fn preview_copies_name_text_pairs() {
        let r = root(json!({
            "Title": "Event",
            "BlockList": [],
            "DataArray": [{"Name": "A", "Text": "one"}, {"Name": "B", "Text": "two"}]
        }));
        let rec = build_record(StoryKind::Preview, &r, &graph(vec![])).unwrap();
        assert_eq!(
            rec.text_blocks,
            vec![TextBlock::new("A", "one"), TextBlock::new("B", "two")]
        );
    }

    #[test]
    fn lyrics_rows_skip_header_and_blanks() {
        let script = "time,lyrics,size\r\n0,first line,1\r\n1500,\r\n3000,\"second, \"\"quoted\"\"\"\n";
        let r = root(json!({ "m_Script": script }));
        let rec = build_record(StoryKind::Lyrics, &r, &graph(vec![])).unwrap();
        assert_eq!(
            rec.text_blocks,
            vec![
                TextBlock::new("", "first line"),
                TextBlock::new("", "second, \"quoted\""),
            ]
        );
    }
}
