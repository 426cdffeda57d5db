use serde_json::Value;
use tracing::debug;

use crate::graph::{AssetObject, ObjectGraph};
use crate::ident::StoryKind;

/// Typed handle on the object that anchors a bundle's narrative data.
#[derive(Clone, Debug, PartialEq)]
pub struct SchemaRoot {
    pub path_id: i64,
    pub tree: Value,
}

/// Top-level members that mark a narrative root for `kind`.
pub fn root_markers(kind: StoryKind) -> &'static [&'static str] {
    match kind {
        StoryKind::Story | StoryKind::Home => &["BlockList", "TextTrack"],
        StoryKind::Preview => &["BlockList", "TextTrack", "DataArray"],
        // lyrics ship as a plain text asset
        StoryKind::Lyrics => &["BlockList", "TextTrack", "m_Script"],
    }
}

pub fn try_as_schema_object(obj: &dyn AssetObject, kind: StoryKind) -> Option<SchemaRoot> {
    if !obj.has_typetree() {
        return None;
    }
    let tree = match obj.read_typetree() {
        Ok(t) => t,
        Err(e) => {
            debug!(path_id = obj.path_id(), error = %e, "typetree unreadable; skipping object");
            return None;
        }
    };
    let members = tree.as_object()?;
    root_markers(kind)
        .iter()
        .any(|m| match members.get(*m) {
            // MonoBehaviours carry `m_Script` as a PPtr; only the text asset holds a string
            Some(v) if *m == "m_Script" => v.is_string(),
            Some(_) => true,
            None => false,
        })
        .then(|| SchemaRoot {
            path_id: obj.path_id(),
            tree,
        })
}

/// First object in graph order that carries a recognized schema.
pub fn find_root(graph: &dyn ObjectGraph, kind: StoryKind) -> Option<SchemaRoot> {
    graph.objects().find_map(|o| try_as_schema_object(o, kind))
}
