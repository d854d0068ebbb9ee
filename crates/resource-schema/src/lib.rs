//! # Resource Schema
//!
//! Independent, per-resource-type schema validators. Pure functions: no
//! filesystem access, no caching — inputs are an already-parsed structured
//! value and the id the enclosing directory implied.

mod validator;

pub use validator::{
    validate_gate, validate_methodology, validate_prompt, validate_script_tool, validate_style,
    ValidationOutcome,
};
