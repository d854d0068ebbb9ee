//! Adapter families (§4.10 step 4): turn a [`ResourceIr`] into the ordered
//! `{relative_path, content}` pairs a client expects on disk.

mod portable_skills;
mod protocol_native;

pub use portable_skills::PortableSkillsAdapter;
pub use protocol_native::ProtocolNativeAdapter;

use crate::client::ClientSpec;
use crate::ir::ResourceIr;

/// One file an adapter wants written, relative to the client's scoped
/// output directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputFile {
    pub relative_path: String,
    pub content: String,
}

/// Converts a [`ResourceIr`] into the file set a specific client consumes.
/// Implementations must be deterministic: the same `ResourceIr` always
/// produces byte-identical `content` and the same file ordering
/// (Property 10).
pub trait Adapter {
    /// Render `resource` (already disambiguated — `output_dir` is the
    /// per-resource subdirectory the caller has already decided on, e.g.
    /// `review` or `development/review`) into its output files, in the
    /// exact order they must be written/hashed in.
    fn adapt(&self, resource: &ResourceIr, output_dir: &str, client: &ClientSpec) -> Vec<OutputFile>;
}

/// Build the adapter matching `client`'s declared family.
pub fn for_client(client: &ClientSpec) -> Box<dyn Adapter> {
    match client.family {
        crate::client::AdapterFamily::ProtocolNative => Box::new(ProtocolNativeAdapter),
        crate::client::AdapterFamily::PortableSkills => Box::new(PortableSkillsAdapter),
    }
}

/// Concatenate `files`' content in order and return the digest the
/// manifest records as `output_hash`.
pub fn output_hash(files: &[OutputFile]) -> String {
    use sha2::{Digest, Sha256};
    let mut hasher = Sha256::new();
    for file in files {
        hasher.update(file.content.as_bytes());
    }
    hex::encode(hasher.finalize())
}
