use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::str::FromStr;

/// A registered, named unit of AI-augmented behavior.
///
/// The serialized form (camelCase keys, `definition.type` tag) is the same
/// document shape used for persistence, import and export.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Skill {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub category: SkillCategory,
    #[serde(default = "default_version")]
    pub version: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    pub definition: SkillDefinition,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub config: Option<SkillConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub permissions: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shortcut: Option<String>,
}

fn default_version() -> String {
    "1.0.0".into()
}

fn default_enabled() -> bool {
    true
}

impl Skill {
    /// A minimal enabled skill in the `custom` category.
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        description: impl Into<String>,
        definition: SkillDefinition,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            description: description.into(),
            category: SkillCategory::default(),
            version: default_version(),
            author: None,
            enabled: true,
            definition,
            config: None,
            permissions: None,
            tags: Vec::new(),
            icon: None,
            shortcut: None,
        }
    }

    pub fn with_category(mut self, category: SkillCategory) -> Self {
        self.category = category;
        self
    }

    pub fn with_tags(mut self, tags: &[&str]) -> Self {
        self.tags = tags.iter().map(|t| t.to_string()).collect();
        self
    }

    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }

    /// Declared input parameters (prompt and workflow skills only).
    pub fn parameters(&self) -> &[SkillParameter] {
        match &self.definition {
            SkillDefinition::Prompt(p) => &p.parameters,
            SkillDefinition::Workflow(w) => &w.parameters,
            SkillDefinition::Tool(_) | SkillDefinition::Hybrid(_) => &[],
        }
    }

    /// Case-insensitive substring match on name, description and tags.
    pub fn matches(&self, query: &str) -> bool {
        let query = query.to_lowercase();
        self.name.to_lowercase().contains(&query)
            || self.description.to_lowercase().contains(&query)
            || self.tags.iter().any(|t| t.to_lowercase().contains(&query))
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SkillCategory {
    Writing,
    Editing,
    Analysis,
    Automation,
    #[default]
    Custom,
}

impl SkillCategory {
    pub const ALL: [SkillCategory; 5] = [
        SkillCategory::Writing,
        SkillCategory::Editing,
        SkillCategory::Analysis,
        SkillCategory::Automation,
        SkillCategory::Custom,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SkillCategory::Writing => "writing",
            SkillCategory::Editing => "editing",
            SkillCategory::Analysis => "analysis",
            SkillCategory::Automation => "automation",
            SkillCategory::Custom => "custom",
        }
    }
}

impl fmt::Display for SkillCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SkillCategory {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|c| c.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| format!("unknown skill category: {s}"))
    }
}

/// The behavior attached to a skill, tagged by `type`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum SkillDefinition {
    Prompt(PromptSkill),
    Workflow(WorkflowSkill),
    Tool(ToolSkill),
    Hybrid(HybridSkill),
}

impl SkillDefinition {
    pub fn kind(&self) -> &'static str {
        match self {
            SkillDefinition::Prompt(_) => "prompt",
            SkillDefinition::Workflow(_) => "workflow",
            SkillDefinition::Tool(_) => "tool",
            SkillDefinition::Hybrid(_) => "hybrid",
        }
    }
}

/// Generation settings a prompt can pin.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
}

impl ModelConfig {
    pub fn sampling(temperature: f32, max_tokens: u32) -> Self {
        Self {
            temperature: Some(temperature),
            max_tokens: Some(max_tokens),
            ..Default::default()
        }
    }
}

// ── Prompt ─────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PromptSkill {
    pub template: String,
    #[serde(default)]
    pub parameters: Vec<SkillParameter>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system_prompt: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<ModelConfig>,
}

// ── Workflow ───────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowSkill {
    pub steps: Vec<WorkflowStep>,
    #[serde(default)]
    pub parameters: Vec<SkillParameter>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub outputs: Vec<SkillOutput>,
    #[serde(default)]
    pub mode: ExecutionMode,
    #[serde(default)]
    pub on_error: ErrorPolicy,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_retries: Option<u32>,
}

impl WorkflowSkill {
    pub fn sequential(steps: Vec<WorkflowStep>) -> Self {
        Self {
            steps,
            parameters: Vec::new(),
            outputs: Vec::new(),
            mode: ExecutionMode::Sequential,
            on_error: ErrorPolicy::Stop,
            max_retries: None,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExecutionMode {
    #[default]
    Sequential,
    Parallel,
    Conditional,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorPolicy {
    #[default]
    Stop,
    Continue,
    Retry,
}

/// One unit of work inside a workflow.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowStep {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(rename = "type")]
    pub step_type: StepType,
    pub config: StepConfig,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub depends_on: Vec<String>,
    /// Guard expression. Carried, never evaluated.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub condition: Option<String>,
}

impl WorkflowStep {
    /// A step whose declared type follows its config.
    pub fn new(id: impl Into<String>, name: impl Into<String>, config: StepConfig) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            description: None,
            step_type: config.step_type(),
            config,
            depends_on: Vec::new(),
            condition: None,
        }
    }

    pub fn depends_on(mut self, ids: &[&str]) -> Self {
        self.depends_on = ids.iter().map(|s| s.to_string()).collect();
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StepType {
    Prompt,
    Tool,
    Condition,
    Loop,
    Transform,
}

impl fmt::Display for StepType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            StepType::Prompt => "prompt",
            StepType::Tool => "tool",
            StepType::Condition => "condition",
            StepType::Loop => "loop",
            StepType::Transform => "transform",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum StepConfig {
    Prompt(PromptStepConfig),
    Tool(ToolStepConfig),
    Condition(ConditionStepConfig),
    Loop(LoopStepConfig),
    Transform(TransformStepConfig),
}

impl StepConfig {
    pub fn step_type(&self) -> StepType {
        match self {
            StepConfig::Prompt(_) => StepType::Prompt,
            StepConfig::Tool(_) => StepType::Tool,
            StepConfig::Condition(_) => StepType::Condition,
            StepConfig::Loop(_) => StepType::Loop,
            StepConfig::Transform(_) => StepType::Transform,
        }
    }

    pub fn prompt(template: impl Into<String>) -> Self {
        StepConfig::Prompt(PromptStepConfig {
            template: template.into(),
            model: None,
        })
    }

    pub fn tool(tool: impl Into<String>, parameters: Value) -> Self {
        StepConfig::Tool(ToolStepConfig {
            tool: tool.into(),
            parameters,
        })
    }

    pub fn transform(transform: impl Into<String>, input: impl Into<Value>) -> Self {
        StepConfig::Transform(TransformStepConfig {
            transform: transform.into(),
            input: input.into(),
            output: None,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PromptStepConfig {
    pub template: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<ModelConfig>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolStepConfig {
    pub tool: String,
    /// A parameter object, or a single `$name` reference to one.
    #[serde(default)]
    pub parameters: Value,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConditionStepConfig {
    pub expression: String,
    pub then_step: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub else_step: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoopStepConfig {
    pub items: String,
    pub step: String,
    pub variable: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransformStepConfig {
    pub transform: String,
    pub input: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<String>,
}

// ── Tool ───────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolSkill {
    pub tool: String,
    #[serde(default)]
    pub parameter_mapping: Map<String, Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result_processing: Option<ResultProcessing>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultProcessing {
    pub format: ResultFormat,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub template: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResultFormat {
    Raw,
    Text,
    Json,
    Markdown,
}

// ── Hybrid ─────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HybridSkill {
    pub skills: Vec<SubSkillRef>,
    #[serde(default)]
    pub orchestration: Orchestration,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result_merge: Option<ResultMerge>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubSkillRef {
    pub skill_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alias: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parameter_mapping: Option<Map<String, Value>>,
}

impl SubSkillRef {
    pub fn new(skill_id: impl Into<String>) -> Self {
        Self {
            skill_id: skill_id.into(),
            alias: None,
            parameter_mapping: None,
        }
    }

    pub fn with_mapping(mut self, mapping: Map<String, Value>) -> Self {
        self.parameter_mapping = Some(mapping);
        self
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Orchestration {
    #[serde(default)]
    pub mode: OrchestrationMode,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub decision_logic: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrchestrationMode {
    #[default]
    Sequential,
    Parallel,
    Dynamic,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultMerge {
    pub strategy: MergeStrategy,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub template: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MergeStrategy {
    Append,
    Merge,
    Template,
    Custom,
}

// ── Parameters & config ────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SkillParameter {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(rename = "type")]
    pub param_type: ParameterType,
    #[serde(default)]
    pub required: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
    #[serde(rename = "enum", default, skip_serializing_if = "Option::is_none")]
    pub allowed: Option<Vec<Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ui: Option<ParameterUi>,
}

impl SkillParameter {
    pub fn required(name: &str, description: &str, param_type: ParameterType) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            param_type,
            required: true,
            default: None,
            allowed: None,
            ui: None,
        }
    }

    pub fn optional(name: &str, description: &str, default: impl Into<Value>) -> Self {
        let default = default.into();
        Self {
            name: name.into(),
            description: description.into(),
            param_type: ParameterType::of(&default),
            required: false,
            default: Some(default),
            allowed: None,
            ui: None,
        }
    }

    pub fn with_ui(mut self, ui: ParameterUi) -> Self {
        self.ui = Some(ui);
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParameterType {
    String,
    Number,
    Boolean,
    Object,
    Array,
}

impl ParameterType {
    /// The parameter type a JSON value naturally has (`null` maps to string).
    pub fn of(value: &Value) -> Self {
        match value {
            Value::Number(_) => ParameterType::Number,
            Value::Bool(_) => ParameterType::Boolean,
            Value::Object(_) => ParameterType::Object,
            Value::Array(_) => ParameterType::Array,
            Value::String(_) | Value::Null => ParameterType::String,
        }
    }
}

/// Presentation hints for hosts that render parameter forms.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParameterUi {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub placeholder: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub multiline: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkillOutput {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(rename = "type")]
    pub output_type: ParameterType,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SkillConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub execution: Option<ExecutionConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ui: Option<UiConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub permissions: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limits: Option<Limits>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionConfig {
    /// Milliseconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retry_on_error: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_retries: Option<u32>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UiConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<UiPosition>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UiPosition {
    Toolbar,
    Menu,
    Context,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Limits {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_input_length: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_output_length: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub allowed_users: Option<Vec<String>>,
}
