//! Seam to the serialized-object parser.
//!
//! Decoded bundle bytes go to a [`GraphParser`], which yields an
//! [`ObjectGraph`]. Objects are only ever inspected through their
//! materialized typetree, a field-name-to-value tree.

pub mod json;
pub mod schema;

use serde_json::Value;

use crate::error::Result;

/// One serialized object in a bundle.
pub trait AssetObject {
    fn path_id(&self) -> i64;

    /// Whether the object carries type information to materialize.
    fn has_typetree(&self) -> bool;

    fn read_typetree(&self) -> Result<Value>;
}

pub trait ObjectGraph {
    fn objects(&self) -> Box<dyn Iterator<Item = &dyn AssetObject> + '_>;

    /// Resolve a `m_PathID` reference within the same bundle.
    fn object(&self, path_id: i64) -> Option<&dyn AssetObject>;
}

pub trait GraphParser: Send + Sync {
    fn parse(&self, data: Vec<u8>) -> Result<Box<dyn ObjectGraph>>;
}
