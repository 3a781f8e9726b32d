use crate::error::BlobError;

/// BlobStore provides storage for generated binary artifacts (code images).
///
/// Keys are relative, path-like strings: `qrcodes/P20250101A1B2C3.svg`.
/// The default implementation (`FileStore`) maps keys to local filesystem paths.
pub trait BlobStore: Send + Sync {
    /// Store a blob. Overwrites if the key already exists.
    fn put(&self, key: &str, data: &[u8]) -> Result<(), BlobError>;

    /// Retrieve a blob. Returns None if the key does not exist.
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, BlobError>;
}
