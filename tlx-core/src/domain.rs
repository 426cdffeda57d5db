// tlx_core/src/domain.rs
/// One row of the index table `a`: `(h, n, e)`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct IndexRecord {
    /// Content hash naming the bundle file.
    pub content_hash: String,
    /// Logical asset path; its tail encodes the story identifier.
    pub path_hint: String,
    /// Keystream seed; zero means the bundle is stored in the clear.
    pub bundle_key: i64,
}
