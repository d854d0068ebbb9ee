use std::sync::OnceLock;

use serde_json::Value;

/// Outcome of validating one resource's structured value against its
/// type's schema and cross-field rules.
///
/// Pure — no filesystem access. The caller supplies the already-parsed
/// value and the id the enclosing directory implied.
#[derive(Debug, Clone, Default)]
pub struct ValidationOutcome {
    /// Whether the resource may be loaded.
    pub valid: bool,
    /// Hard failures. Non-empty implies `valid == false`.
    pub errors: Vec<String>,
    /// Soft findings that never block a load (e.g. an unresolved cross-
    /// resource reference, checked only at consumer time).
    pub warnings: Vec<String>,
}

impl ValidationOutcome {
    fn ok() -> Self {
        Self {
            valid: true,
            errors: Vec::new(),
            warnings: Vec::new(),
        }
    }

    fn push_error(&mut self, message: impl Into<String>) {
        self.errors.push(message.into());
        self.valid = false;
    }

    fn push_warning(&mut self, message: impl Into<String>) {
        self.warnings.push(message.into());
    }
}

/// `id` must be lowercase and token-safe (`[a-z0-9-]+` with optional `/`
/// path separators for nested category ids), and must match the directory
/// name the loader derived it from.
fn validate_id(value: &Value, expected_id: &str, outcome: &mut ValidationOutcome) {
    let Some(declared) = value.get("id").and_then(Value::as_str) else {
        return;
    };

    if declared != declared.to_lowercase() {
        outcome.push_error(format!("id '{declared}' must be lowercase"));
    }
    if !declared
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-' || c == '_')
    {
        outcome.push_error(format!("id '{declared}' contains characters outside [a-z0-9-_]"));
    }
    if declared != expected_id {
        outcome.push_error(format!(
            "id '{declared}' does not match enclosing directory name '{expected_id}'"
        ));
    }
}

fn compile(schema: &Value) -> jsonschema::Validator {
    jsonschema::validator_for(schema).expect("schema constant must be a valid JSON Schema")
}

fn run_schema(validator: &jsonschema::Validator, value: &Value, outcome: &mut ValidationOutcome) {
    for error in validator.iter_errors(value) {
        outcome.push_error(error.to_string());
    }
}

fn prompt_schema() -> &'static jsonschema::Validator {
    static SCHEMA: OnceLock<jsonschema::Validator> = OnceLock::new();
    SCHEMA.get_or_init(|| {
        compile(&serde_json::json!({
            "type": "object",
            "properties": {
                "arguments": {
                    "type": "array",
                    "items": {
                        "type": "object",
                        "required": ["name", "type"],
                        "properties": {
                            "name": {"type": "string", "minLength": 1},
                            "type": {"enum": ["string", "number", "boolean", "object", "array"]},
                            "required": {"type": "boolean"},
                        }
                    }
                },
                "chainSteps": {
                    "type": "array",
                    "items": {
                        "type": "object",
                        "required": ["promptId", "stepName"],
                        "properties": {
                            "promptId": {"type": "string", "minLength": 1},
                            "stepName": {"type": "string", "minLength": 1},
                            "retryCount": {"type": "integer", "minimum": 0},
                        }
                    }
                },
            }
        }))
    })
}

fn gate_schema() -> &'static jsonschema::Validator {
    static SCHEMA: OnceLock<jsonschema::Validator> = OnceLock::new();
    SCHEMA.get_or_init(|| {
        compile(&serde_json::json!({
            "type": "object",
            "required": ["name", "type", "severity", "description"],
            "properties": {
                "name": {"type": "string", "minLength": 1},
                "type": {"enum": ["validation", "guidance"]},
                "severity": {"enum": ["info", "warning", "error", "critical"]},
                "description": {"type": "string"},
                "scope": {"enum": ["execution", "session", "chain", "step"]},
            }
        }))
    })
}

fn methodology_schema() -> &'static jsonschema::Validator {
    static SCHEMA: OnceLock<jsonschema::Validator> = OnceLock::new();
    SCHEMA.get_or_init(|| {
        compile(&serde_json::json!({
            "type": "object",
            "required": ["type", "version"],
            "properties": {
                "type": {"type": "string", "minLength": 1},
                "version": {"type": "string", "minLength": 1},
                "phases": {
                    "type": "array",
                    "items": {
                        "type": "object",
                        "required": ["name"],
                        "properties": {"name": {"type": "string", "minLength": 1}}
                    }
                },
            }
        }))
    })
}

fn style_schema() -> &'static jsonschema::Validator {
    static SCHEMA: OnceLock<jsonschema::Validator> = OnceLock::new();
    SCHEMA.get_or_init(|| {
        compile(&serde_json::json!({
            "type": "object",
            "required": ["priority", "enhancementMode"],
            "properties": {
                "priority": {"type": "integer"},
                "enhancementMode": {"enum": ["prepend", "append", "replace"]},
                "compatibleFrameworks": {"type": "array", "items": {"type": "string"}},
            }
        }))
    })
}

fn script_tool_schema() -> &'static jsonschema::Validator {
    static SCHEMA: OnceLock<jsonschema::Validator> = OnceLock::new();
    SCHEMA.get_or_init(|| {
        compile(&serde_json::json!({
            "type": "object",
            "required": ["runtime"],
            "properties": {
                "runtime": {"type": "string", "minLength": 1},
                "inputSchema": {"type": "object"},
            }
        }))
    })
}

/// Validate a prompt's raw structured value.
///
/// Chain-step `promptId` references are never hard errors here — §4.2
/// requires cross-resource reference validation to stay a warning at load
/// time; the consumer is responsible for hard-failing on an unresolved
/// reference once the whole registry is populated. `known_prompt_ids` is
/// optional context a caller may supply to surface that warning early; pass
/// `None` to skip the check entirely.
pub fn validate_prompt(
    value: &Value,
    expected_id: &str,
    known_prompt_ids: Option<&[String]>,
) -> ValidationOutcome {
    let mut outcome = ValidationOutcome::ok();
    validate_id(value, expected_id, &mut outcome);
    run_schema(prompt_schema(), value, &mut outcome);

    let has_user_message = value.get("userMessage").and_then(Value::as_str).is_some();
    let has_system_message = value.get("systemMessage").and_then(Value::as_str).is_some();
    let chain_steps_len = value
        .get("chainSteps")
        .and_then(Value::as_array)
        .map(Vec::len)
        .unwrap_or(0);
    if !has_user_message && !has_system_message && chain_steps_len == 0 {
        outcome.push_error(
            "prompt must supply a user-message template, a system message, or chain steps",
        );
    }

    if let (Some(known), Some(steps)) = (known_prompt_ids, value.get("chainSteps").and_then(Value::as_array)) {
        for step in steps {
            if let Some(prompt_id) = step.get("promptId").and_then(Value::as_str) {
                if !known.iter().any(|id| id == prompt_id) {
                    outcome.push_warning(format!(
                        "chain step references unknown prompt id '{prompt_id}'"
                    ));
                }
            }
        }
    }

    outcome
}

/// Validate a gate's raw structured value.
pub fn validate_gate(value: &Value, expected_id: &str) -> ValidationOutcome {
    let mut outcome = ValidationOutcome::ok();
    validate_id(value, expected_id, &mut outcome);
    run_schema(gate_schema(), value, &mut outcome);
    outcome
}

/// Validate a methodology's raw structured value.
pub fn validate_methodology(value: &Value, expected_id: &str) -> ValidationOutcome {
    let mut outcome = ValidationOutcome::ok();
    validate_id(value, expected_id, &mut outcome);
    run_schema(methodology_schema(), value, &mut outcome);
    outcome
}

/// Validate a style's raw structured value.
pub fn validate_style(value: &Value, expected_id: &str) -> ValidationOutcome {
    let mut outcome = ValidationOutcome::ok();
    validate_id(value, expected_id, &mut outcome);
    run_schema(style_schema(), value, &mut outcome);
    outcome
}

/// Validate a script-tool's raw structured value.
pub fn validate_script_tool(value: &Value, expected_id: &str) -> ValidationOutcome {
    let mut outcome = ValidationOutcome::ok();
    validate_id(value, expected_id, &mut outcome);
    run_schema(script_tool_schema(), value, &mut outcome);
    outcome
}
