use sha2::{Digest, Sha256};
use std::path::Path;

/// Compute the stable `source_hash` for a resource.
///
/// `sources` is every file's `(path, content)` pair read while building the
/// resource, in whatever order they happened to be read. The hash depends
/// only on content: inputs are sorted by path before hashing so that
/// re-reading the same files in a different order — or on a different
/// platform with a different directory-iteration order — produces the same
/// digest. Changing a single byte of any source changes the digest.
pub fn source_hash<P, C>(sources: &[(P, C)]) -> String
where
    P: AsRef<Path>,
    C: AsRef<[u8]>,
{
    let mut ordered: Vec<(&Path, &[u8])> = sources
        .iter()
        .map(|(p, c)| (p.as_ref(), c.as_ref()))
        .collect();
    ordered.sort_by(|a, b| a.0.cmp(b.0));

    let mut hasher = Sha256::new();
    for (path, content) in ordered {
        hasher.update(path.to_string_lossy().as_bytes());
        hasher.update([0u8]);
        hasher.update(content);
        hasher.update([0u8]);
    }
    hex::encode(hasher.finalize())
}

/// Compute the digest of a single concatenated blob (used for `output_hash`,
/// where "sources" are the generated output files of one export).
pub fn content_hash<C: AsRef<[u8]>>(blobs: &[C]) -> String {
    let mut hasher = Sha256::new();
    for blob in blobs {
        hasher.update(blob.as_ref());
        hasher.update([0u8]);
    }
    hex::encode(hasher.finalize())
}
