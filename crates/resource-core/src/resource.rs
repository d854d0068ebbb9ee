use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// The kind of resource a [`Resource`] carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ResourceType {
    /// A user/system prompt, optionally chained into other prompts.
    Prompt,
    /// A validation or guidance gate.
    Gate,
    /// A multi-phase methodology.
    Methodology,
    /// A prepend/append/replace style overlay.
    Style,
    /// A script-backed tool attached to a prompt.
    ScriptTool,
}

impl ResourceType {
    /// Plural directory name used under a resources root (e.g. `prompts`).
    pub fn plural(self) -> &'static str {
        match self {
            Self::Prompt => "prompts",
            Self::Gate => "gates",
            Self::Methodology => "methodologies",
            Self::Style => "styles",
            Self::ScriptTool => "script-tools",
        }
    }

    /// Short tag used in the qualified key and CLI `--resource-type` flag.
    pub fn tag(self) -> &'static str {
        match self {
            Self::Prompt => "prompt",
            Self::Gate => "gate",
            Self::Methodology => "methodology",
            Self::Style => "style",
            Self::ScriptTool => "script-tool",
        }
    }

    /// Name of the entry file for the directory layout (e.g. `gate.yaml`).
    pub fn entry_filename(self) -> &'static str {
        match self {
            Self::Prompt => "prompt.yaml",
            Self::Gate => "gate.yaml",
            Self::Methodology => "methodology.yaml",
            Self::Style => "style.yaml",
            Self::ScriptTool => "tool.yaml",
        }
    }

    /// The environment variable honoured by the Path Resolver for this type.
    pub fn env_var(self) -> &'static str {
        match self {
            Self::Prompt => "RESOURCES_PROMPTS_PATH",
            Self::Gate => "RESOURCES_GATES_PATH",
            Self::Methodology => "RESOURCES_METHODOLOGIES_PATH",
            Self::Style => "RESOURCES_STYLES_PATH",
            Self::ScriptTool => "RESOURCES_SCRIPT_TOOLS_PATH",
        }
    }
}

impl std::fmt::Display for ResourceType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.tag())
    }
}

/// Whether a resource opts in/out of the external protocol's registered-tool
/// view, or inherits its category's default.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RegisterPolicy {
    /// Explicitly registered.
    Explicit(bool),
    /// Falls back to the enclosing category's default.
    Inherit,
}

impl Default for RegisterPolicy {
    fn default() -> Self {
        Self::Inherit
    }
}

/// Where a loaded resource's files live relative to the overlay stack.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceRoot {
    /// Loaded from the primary root.
    Primary,
    /// Loaded from a named overlay root.
    Overlay(String),
}

/// Argument type accepted by a prompt's template.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArgType {
    /// UTF-8 text.
    String,
    /// A signed or floating-point number.
    Number,
    /// A boolean flag.
    Boolean,
    /// A JSON object.
    Object,
    /// A JSON array.
    Array,
}

/// One named argument a prompt's template accepts.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Argument {
    /// Argument name, referenced in the template body as `{{name}}`.
    pub name: String,
    /// Declared type.
    #[serde(rename = "type")]
    pub arg_type: ArgType,
    /// Whether the argument must be supplied at execution time.
    #[serde(default)]
    pub required: bool,
    /// Optional free-form validation expression (consumer-interpreted).
    #[serde(default)]
    pub validation: Option<String>,
}

/// One step of a prompt chain.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChainStep {
    /// Id of the prompt this step invokes.
    pub prompt_id: String,
    /// Human-readable name for this step within the chain.
    pub step_name: String,
    /// External argument name -> this step's input name.
    #[serde(default)]
    pub input_mapping: std::collections::BTreeMap<String, String>,
    /// This step's output name -> exported name visible to later steps.
    #[serde(default)]
    pub output_mapping: std::collections::BTreeMap<String, String>,
    /// Number of times to retry this step on failure.
    #[serde(default)]
    pub retry_count: u32,
}

/// Gate ids and pass behaviour attached to a prompt.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GateConfig {
    /// Gate ids evaluated for this prompt, in declaration order.
    #[serde(default)]
    pub gate_ids: Vec<String>,
}

/// Body of a prompt resource.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PromptPayload {
    /// Optional system message (inlined from `system-message.md`).
    #[serde(default)]
    pub system_message: Option<String>,
    /// User-message template (inlined from `user-message.md`); required
    /// unless chain steps or the system message supply intent.
    #[serde(default)]
    pub user_message: Option<String>,
    /// Declared arguments, in declaration order.
    #[serde(default)]
    pub arguments: Vec<Argument>,
    /// Chain steps, empty for a leaf prompt.
    #[serde(default)]
    pub chain_steps: Vec<ChainStep>,
    /// Gates evaluated around this prompt's execution.
    #[serde(default)]
    pub gate_config: GateConfig,
    /// Script-tool ids attached to this prompt.
    #[serde(default)]
    pub script_tool_ids: Vec<String>,
}

/// Severity of a gate failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GateSeverity {
    /// Informational only; never blocks.
    Info,
    /// Should be addressed but does not block.
    Warning,
    /// Blocks unless resolved.
    Error,
    /// Blocks and halts the chain.
    Critical,
}

/// A gate's type: does it hard-fail or merely guide?
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GateType {
    /// Hard pass/fail validation.
    Validation,
    /// Soft guidance injected into context, never blocks.
    Guidance,
}

/// Scope a gate's pass/fail result is remembered for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GateScope {
    /// Re-evaluated every execution.
    Execution,
    /// Remembered for the lifetime of a session.
    Session,
    /// Remembered for the lifetime of a chain run.
    Chain,
    /// Remembered for a single chain step.
    Step,
}

/// One typed pass-criterion a gate checks.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Criterion {
    /// Criterion kind (consumer-interpreted, e.g. `"regex"`, `"llm-judge"`).
    #[serde(rename = "type")]
    pub criterion_type: String,
    /// Human-readable description shown on failure.
    pub description: String,
    /// Criterion-specific configuration.
    #[serde(default)]
    pub config: serde_json::Value,
}

/// Retry policy attached to a gate.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RetryPolicy {
    /// Maximum number of retries before the gate gives up.
    pub max_retries: u32,
    /// Backoff between retries, in milliseconds.
    #[serde(default)]
    pub backoff_ms: u64,
}

/// Body of a gate resource.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GatePayload {
    /// Human-readable gate name.
    pub name: String,
    /// Validation or guidance.
    #[serde(rename = "type")]
    pub gate_type: GateType,
    /// Severity applied when the gate fails.
    pub severity: GateSeverity,
    /// Human-readable description.
    #[serde(default)]
    pub description: String,
    /// Guidance text inlined from `guidance.md`, referenced on disk via
    /// `guidanceFile:` and stripped from the structure once inlined.
    #[serde(default)]
    pub guidance: Option<String>,
    /// Ordered list of pass criteria.
    #[serde(default)]
    pub pass_criteria: Vec<Criterion>,
    /// Optional retry policy.
    #[serde(default)]
    pub retry_policy: Option<RetryPolicy>,
    /// Optional scope the result is cached at.
    #[serde(default)]
    pub scope: Option<GateScope>,
    /// Optional expiration timestamp for a cached result.
    #[serde(default)]
    pub expires_at: Option<chrono::DateTime<chrono::Utc>>,
}

/// One phase of a methodology.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Phase {
    /// Phase name.
    pub name: String,
    /// Phase description / guidance.
    #[serde(default)]
    pub description: String,
}

/// Body of a methodology resource.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MethodologyPayload {
    /// Methodology kind (consumer-interpreted).
    #[serde(rename = "type")]
    pub methodology_type: String,
    /// Methodology version string.
    pub version: String,
    /// Ordered phases.
    #[serde(default)]
    pub phases: Vec<Phase>,
    /// System-prompt guidance, inlined from `system-prompt.md` when the
    /// manifest references a file rather than inline text.
    #[serde(default)]
    pub system_prompt: String,
    /// Gate ids evaluated as part of this methodology.
    #[serde(default)]
    pub gates: Vec<String>,
}

/// How a style's guidance is combined with the prompt it's applied to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EnhancementMode {
    /// Guidance goes before the prompt body.
    Prepend,
    /// Guidance goes after the prompt body.
    Append,
    /// Guidance replaces the prompt body outright.
    Replace,
}

/// Body of a style resource.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StylePayload {
    /// Ordering priority; higher wins when multiple styles apply.
    pub priority: i32,
    /// How this style's guidance combines with the target prompt.
    pub enhancement_mode: EnhancementMode,
    /// Framework ids this style is compatible with; empty means "all".
    #[serde(default)]
    pub compatible_frameworks: Vec<String>,
    /// Guidance text, inlined from `guidance.md`.
    #[serde(default)]
    pub guidance: String,
}

/// Body of a script-tool resource.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScriptToolPayload {
    /// Runtime identifier (e.g. `"python3"`, `"node"`, `"bash"`).
    pub runtime: String,
    /// Script body, inlined from the sibling script file.
    #[serde(default)]
    pub script_body: String,
    /// JSON Schema describing the script's input.
    #[serde(default)]
    pub input_schema: serde_json::Value,
}

/// Type-specific resource body.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Payload {
    /// [`PromptPayload`].
    Prompt(PromptPayload),
    /// [`GatePayload`].
    Gate(GatePayload),
    /// [`MethodologyPayload`].
    Methodology(MethodologyPayload),
    /// [`StylePayload`].
    Style(StylePayload),
    /// [`ScriptToolPayload`].
    ScriptTool(ScriptToolPayload),
}

impl Payload {
    /// The [`ResourceType`] this payload variant corresponds to.
    pub fn resource_type(&self) -> ResourceType {
        match self {
            Self::Prompt(_) => ResourceType::Prompt,
            Self::Gate(_) => ResourceType::Gate,
            Self::Methodology(_) => ResourceType::Methodology,
            Self::Style(_) => ResourceType::Style,
            Self::ScriptTool(_) => ResourceType::ScriptTool,
        }
    }
}

/// A fully-loaded, validated resource.
///
/// Construction either fully succeeds or does not happen at all: there is no
/// way to observe a partially-built `Resource`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Resource {
    /// Lowercased, unique-within-type id.
    pub id: String,
    /// Category, meaningful only for prompts.
    pub category: Option<String>,
    /// Absolute paths read to build this resource, in the order they were
    /// read (not necessarily the order they were hashed in).
    pub source_paths: Vec<PathBuf>,
    /// Stable digest over the sorted, concatenated source contents.
    pub source_hash: String,
    /// Type-specific body.
    pub payload: Payload,
    /// Whether this resource is active.
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    /// Registration policy against the external protocol surface.
    #[serde(default)]
    pub register_with_protocol: RegisterPolicy,
    /// Which root (primary or a named overlay) this resource was loaded
    /// from, for provenance display.
    pub source_root: SourceRoot,
}

fn default_enabled() -> bool {
    true
}

impl Resource {
    /// The resource's type, derived from its payload.
    pub fn resource_type(&self) -> ResourceType {
        self.payload.resource_type()
    }

    /// The qualified key consumers use to look this resource up in its
    /// registry: `prompt:{category}/{id}` for prompts, `{type}:{id}`
    /// otherwise.
    pub fn qualified_key(&self) -> String {
        crate::qualified_key(self.resource_type(), self.category.as_deref(), &self.id)
    }
}
