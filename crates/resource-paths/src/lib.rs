//! # Resource Paths
//!
//! The Path Resolver (root-directory resolution from environment, package
//! manifest location, and workspace overlays) and the small YAML/JSON
//! discovery helpers every resource loader builds on.

mod resolver;
mod yaml;

pub use resolver::PathResolver;
pub use yaml::{discover_flat, discover_nested, load_json_file, load_text_file, load_yaml_file};
