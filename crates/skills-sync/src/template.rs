//! Compiles a resource's raw template body into a client-facing rendering.
//!
//! Argument references (`{{name}}`) and `{% if name %} … {% else %} …
//! {% endif %}` conditionals are genuine Tera syntax, so compilation is a
//! real Tera render — not a hand-rolled regex pass. Each declared argument
//! is bound in the render context to the placeholder text the target
//! adapter wants in its place (`$0`, `$1`, … for protocol-native clients;
//! `{name}` for portable-skills clients). Because every bound placeholder
//! is a non-empty string, it is truthy, so a `{% if name %}` condition on
//! a declared argument always takes its if-branch — this reproduces the
//! documented "rejected else-branch" limitation (§9 REDESIGN FLAGS) as a
//! side effect of genuine Tera evaluation rather than a special case.
//!
//! Limitation, stated once: a condition on anything other than a single
//! declared-argument name (a comparison, a negation, an undeclared
//! variable) is evaluated for real against the placeholder text and may
//! not take the if-branch. The corpus's templates only use single-name
//! conditions, so this is acceptable but fragile, per design.
//!
//! Parsing a body into a [`tera::Tera`] instance is pure work on the
//! body text alone, so compiled templates are cached by content hash: an
//! export run that renders the same resource for several clients (or a
//! diff run that re-renders the same resources repeatedly) reuses the
//! parse instead of repeating it.

use std::hash::{Hash, Hasher};
use std::num::NonZeroUsize;
use std::sync::{Arc, OnceLock};

use lru::LruCache;
use parking_lot::Mutex;

use crate::ir::ArgumentIr;

const TEMPLATE_NAME: &str = "body";
const TEMPLATE_CACHE_CAPACITY: usize = 256;

fn template_cache() -> &'static Mutex<LruCache<u64, Arc<tera::Tera>>> {
    static CACHE: OnceLock<Mutex<LruCache<u64, Arc<tera::Tera>>>> = OnceLock::new();
    CACHE.get_or_init(|| Mutex::new(LruCache::new(NonZeroUsize::new(TEMPLATE_CACHE_CAPACITY).unwrap())))
}

fn content_key(body: &str) -> u64 {
    let mut hasher = std::collections::hash_map::DefaultHasher::new();
    body.hash(&mut hasher);
    hasher.finish()
}

/// Parse `body` into a Tera template, or reuse an already-compiled
/// instance for the same body text.
fn compiled_template(body: &str) -> Option<Arc<tera::Tera>> {
    let key = content_key(body);
    if let Some(cached) = template_cache().lock().get(&key) {
        return Some(Arc::clone(cached));
    }

    let mut tera = tera::Tera::default();
    tera.add_raw_template(TEMPLATE_NAME, body).ok()?;
    let tera = Arc::new(tera);
    template_cache().lock().put(key, Arc::clone(&tera));
    Some(tera)
}

/// Render `body` with every argument bound to its positional token
/// (`$0`, `$1`, … in `arguments` order) — the protocol-native body format.
pub fn compile_positional(body: &str, arguments: &[ArgumentIr]) -> String {
    let bindings: Vec<(String, String)> = arguments
        .iter()
        .enumerate()
        .map(|(index, arg)| (arg.name.clone(), format!("${index}")))
        .collect();
    render_with_bindings(body, &bindings)
}

/// Render `body` with every argument bound to a human-readable `{name}`
/// placeholder — the portable-skills body format.
pub fn compile_named(body: &str, arguments: &[ArgumentIr]) -> String {
    let bindings: Vec<(String, String)> = arguments
        .iter()
        .map(|arg| (arg.name.clone(), format!("{{{}}}", arg.name)))
        .collect();
    render_with_bindings(body, &bindings)
}

fn render_with_bindings(body: &str, bindings: &[(String, String)]) -> String {
    let Some(tera) = compiled_template(body) else {
        // Not valid Tera syntax (stray `{{`/`{%`) — pass the body through
        // unmodified rather than failing the whole export.
        return body.to_string();
    };

    let mut context = tera::Context::new();
    for (name, placeholder) in bindings {
        context.insert(name, placeholder);
    }

    match tera.render(TEMPLATE_NAME, &context) {
        Ok(rendered) => rendered,
        Err(err) => {
            tracing::warn!(error = %err, "template compilation failed; emitting body unmodified");
            body.to_string()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(names: &[&str]) -> Vec<ArgumentIr> {
        names
            .iter()
            .map(|name| ArgumentIr {
                name: name.to_string(),
                required: true,
            })
            .collect()
    }

    #[test]
    fn positional_tokens_follow_declaration_order() {
        let body = "Review {{code}} for {{target}}.";
        let rendered = compile_positional(body, &args(&["code", "target"]));
        assert_eq!(rendered, "Review $0 for $1.");
    }

    #[test]
    fn named_placeholders_are_human_readable() {
        let body = "Review {{code}} for {{target}}.";
        let rendered = compile_named(body, &args(&["code", "target"]));
        assert_eq!(rendered, "Review {code} for {target}.");
    }

    #[test]
    fn if_branch_is_kept_and_else_branch_is_dropped() {
        let body = "{% if target %}Target: {{target}}{% else %}No target given{% endif %}";
        let rendered = compile_positional(body, &args(&["target"]));
        assert_eq!(rendered, "Target: $0");
    }

    #[test]
    fn body_with_no_placeholders_passes_through() {
        let body = "Run the linter.";
        assert_eq!(compile_positional(body, &[]), "Run the linter.");
    }

    #[test]
    fn invalid_template_syntax_falls_back_to_original_body() {
        let body = "{% if unterminated";
        assert_eq!(compile_positional(body, &[]), body);
    }

    #[test]
    fn repeated_compiles_of_the_same_body_reuse_the_cached_template() {
        let body = "Review {{code}}.";
        let first = compile_positional(body, &args(&["code"]));
        let second = compile_named(body, &args(&["code"]));
        assert_eq!(first, "Review $0.");
        assert_eq!(second, "Review {code}.");
    }

    #[test]
    fn distinct_bodies_do_not_collide_in_the_cache() {
        let a = compile_positional("Review {{code}}.", &args(&["code"]));
        let b = compile_positional("Audit {{code}}.", &args(&["code"]));
        assert_eq!(a, "Review $0.");
        assert_eq!(b, "Audit $0.");
    }
}
