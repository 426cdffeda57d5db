//! Object graphs from JSON typetree exports.
//!
//! Layout: `{"objects": [{"path_id": 1, "tree": {...}}, ...]}`, where a null or
//! missing `tree` marks an object without type information. Leading
//! whitespace is ignored, so an export padded to a fixed header size parses
//! as-is.

use std::collections::BTreeMap;

use serde::Deserialize;
use serde_json::Value;

use crate::error::{Result, TlxError};
use crate::graph::{AssetObject, GraphParser, ObjectGraph};

#[derive(Clone, Debug, Deserialize)]
pub struct JsonObject {
    pub path_id: i64,
    #[serde(default)]
    pub tree: Option<Value>,
}

#[derive(Debug, Deserialize)]
struct Export {
    objects: Vec<JsonObject>,
}

#[derive(Debug, Default)]
pub struct JsonGraph {
    order: Vec<i64>,
    by_id: BTreeMap<i64, JsonObject>,
}

impl JsonGraph {
    pub fn from_objects(objects: Vec<JsonObject>) -> Self {
        let mut graph = Self::default();
        for o in objects {
            graph.order.push(o.path_id);
            graph.by_id.insert(o.path_id, o);
        }
        graph
    }
}

impl AssetObject for JsonObject {
    fn path_id(&self) -> i64 {
        self.path_id
    }

    fn has_typetree(&self) -> bool {
        self.tree.is_some()
    }

    fn read_typetree(&self) -> Result<Value> {
        self.tree
            .clone()
            .ok_or_else(|| TlxError::Graph(format!("object {} has no typetree", self.path_id)))
    }
}

impl ObjectGraph for JsonGraph {
    fn objects(&self) -> Box<dyn Iterator<Item = &dyn AssetObject> + '_> {
        Box::new(
            self.order
                .iter()
                .filter_map(|id| self.by_id.get(id))
                .map(|o| o as &dyn AssetObject),
        )
    }

    fn object(&self, path_id: i64) -> Option<&dyn AssetObject> {
        self.by_id.get(&path_id).map(|o| o as &dyn AssetObject)
    }
}

#[derive(Clone, Copy, Debug, Default)]
pub struct JsonGraphParser;

impl GraphParser for JsonGraphParser {
    fn parse(&self, data: Vec<u8>) -> Result<Box<dyn ObjectGraph>> {
        let export: Export = serde_json::from_slice(&data)
            .map_err(|e| TlxError::Graph(format!("malformed typetree export: {e}")))?;
        Ok(Box::new(JsonGraph::from_objects(export.objects)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_padded_export_in_order() {
        let body = json!({"objects": [
            {"path_id": 9, "tree": {"Text": "b"}},
            {"path_id": 2, "tree": null},
            {"path_id": 5}
        ]});
        let mut data = vec![b' '; 256];
        data.extend(serde_json::to_vec(&body).unwrap());

        let graph = JsonGraphParser.parse(data).unwrap();
        let ids: Vec<i64> = graph.objects().map(|o| o.path_id()).collect();
        assert_eq!(ids, vec![9, 2, 5]);
        assert!(graph.object(9).unwrap().has_typetree());
        assert!(!graph.object(2).unwrap().has_typetree());
        assert!(graph.object(5).unwrap().read_typetree().is_err());
        assert!(graph.object(7).is_none());
    }

    #[test]
    fn garbage_is_a_graph_error() {
        let err = JsonGraphParser.parse(b"\x00\x01UnityFS".to_vec()).err().unwrap();
        assert!(matches!(err, TlxError::Graph(_)));
    }
}
