pub mod catalog;
pub mod packs;
pub mod registry;

use serde::{Deserialize, Serialize};

/// Backend providers models can be served through.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ModelProvider {
    OpenAi,
    OpenRouter,
}

impl ModelProvider {
    /// Environment variable holding the provider's API key.
    pub fn api_key_env_var(&self) -> &'static str {
        match self {
            Self::OpenAi => "OPENAI_API_KEY",
            Self::OpenRouter => "OPENROUTER_API_KEY",
        }
    }

    pub fn base_url(&self) -> &'static str {
        match self {
            Self::OpenAi => "https://api.openai.com/v1",
            Self::OpenRouter => "https://openrouter.ai/api/v1",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::OpenAi => "openai",
            Self::OpenRouter => "openrouter",
        }
    }
}

/// Abstract purpose a model fills in the pipeline, decoupled from any
/// specific backend model.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ModelRole {
    Planner,
    Architect,
    Coder,
    PlanSummary,
    Builder,
    WholeFileBuilder,
    Namer,
    CommitMsg,
    ExecStatus,
}

impl ModelRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Planner => "planner",
            Self::Architect => "architect",
            Self::Coder => "coder",
            Self::PlanSummary => "plan-summary",
            Self::Builder => "builder",
            Self::WholeFileBuilder => "whole-file-builder",
            Self::Namer => "namer",
            Self::CommitMsg => "commit-msg",
            Self::ExecStatus => "exec-status",
        }
    }
}

/// Preferred response format for a model. OpenAI models are reliable with
/// strict JSON tool calls; most other providers do better emitting a tagged
/// text block, even when they claim JSON support.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ModelOutputFormat {
    #[default]
    ToolCallJson,
    Xml,
}

/// Reasoning effort level for models that accept one (e.g. o3-mini).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReasoningEffort {
    Low,
    Medium,
    High,
}

/// Feature-support flags checked before attaching optional request content.
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize)]
pub struct ModelCompatibility {
    pub image_input: bool,
}

impl ModelCompatibility {
    pub const FULL: Self = Self { image_input: true };
}

/// Immutable description of one backend model.
///
/// `max_tokens` is the provider's absolute input limit and
/// `max_output_tokens` the absolute output limit. `reserved_output_tokens`
/// is the realistic output allowance set aside from the input window; the
/// effective input budget is `max_tokens - reserved_output_tokens`. These
/// budgets are soft: moderate overage is tolerated by providers, so the
/// resolver treats them as escalation triggers, not hard failures.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct BaseModelConfig {
    pub provider: ModelProvider,
    /// Model name on the provider's side.
    pub model_name: String,
    /// Locally-unique identifier, unique per provider. Lets two entries with
    /// the same provider model but different settings coexist.
    pub model_id: String,
    pub max_tokens: usize,
    pub max_output_tokens: usize,
    pub reserved_output_tokens: usize,
    pub compatibility: ModelCompatibility,
    pub preferred_output_format: ModelOutputFormat,
    /// Some early releases reject temperature/top_p changes.
    pub role_params_disabled: bool,
    /// Some early releases reject system prompts.
    pub system_prompt_disabled: bool,
    pub reasoning_effort: Option<ReasoningEffort>,
    pub predicted_output_enabled: bool,
    /// Environment variable name holding the credential, never the
    /// credential itself.
    pub api_key_env_var: String,
    pub base_url: String,
}

impl BaseModelConfig {
    /// Input budget after reserving room for output.
    pub fn effective_input_tokens(&self) -> usize {
        self.max_tokens.saturating_sub(self.reserved_output_tokens)
    }

    /// Composite lookup key, unique across the registry.
    pub fn key(&self) -> String {
        format!("{}/{}", self.provider.as_str(), self.model_id)
    }
}

/// A registered model: human description plus base config plus the default
/// conversation-token budget before summarization kicks in.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AvailableModel {
    pub description: String,
    pub default_max_convo_tokens: usize,
    pub config: BaseModelConfig,
}
