use crate::error::GaleError;
use crate::models::registry::ModelRegistry;
use crate::models::{BaseModelConfig, ModelProvider, ModelRole};

/// Sampling parameters applied per role. Some roles want determinism
/// (builders), others benefit from a little variety (planning, naming).
#[derive(Clone, Copy, Debug)]
pub struct RoleParams {
    pub temperature: f32,
    pub top_p: f32,
}

/// Default sampling parameters by role.
pub fn default_params(role: ModelRole) -> RoleParams {
    match role {
        ModelRole::Planner | ModelRole::Architect => RoleParams {
            temperature: 0.6,
            top_p: 0.7,
        },
        ModelRole::Coder => RoleParams {
            temperature: 0.5,
            top_p: 0.7,
        },
        ModelRole::PlanSummary | ModelRole::CommitMsg | ModelRole::Namer => RoleParams {
            temperature: 0.8,
            top_p: 0.5,
        },
        ModelRole::Builder | ModelRole::WholeFileBuilder | ModelRole::ExecStatus => RoleParams {
            temperature: 0.1,
            top_p: 0.1,
        },
    }
}

/// A concrete model bound to a role, with per-axis escalation ladders.
///
/// Each ladder is an ordered list of alternatives tried when the matching
/// token budget is exceeded; walking a finite list makes the "bounded,
/// non-cyclic" escalation invariant structural. Input pressure and output
/// pressure are independent axes and are resolved in two separate passes,
/// never conflated into one ladder.
#[derive(Clone, Debug)]
pub struct ModelRoleConfig {
    pub role: ModelRole,
    pub base: BaseModelConfig,
    pub temperature: f32,
    pub top_p: f32,
    /// Tried in order when estimated input tokens exceed the effective
    /// input budget.
    pub large_context_fallback: Vec<ModelRoleConfig>,
    /// Tried in order when estimated output tokens exceed
    /// `max_output_tokens`.
    pub large_output_fallback: Vec<ModelRoleConfig>,
    /// Quality escalation, orthogonal to token pressure.
    pub strong_model: Option<Box<ModelRoleConfig>>,
}

impl ModelRoleConfig {
    /// Resolve for input pressure: the first config (self, then the context
    /// ladder in order) whose effective input budget covers the estimate.
    /// When nothing fits, the last candidate is returned anyway — budgets
    /// are soft, and providers tolerate moderate overage.
    pub fn for_input_tokens(&self, estimated_input_tokens: usize) -> &ModelRoleConfig {
        let mut resolved = self;
        for fallback in &self.large_context_fallback {
            if estimated_input_tokens <= resolved.base.effective_input_tokens() {
                break;
            }
            resolved = fallback;
        }
        if estimated_input_tokens > resolved.base.effective_input_tokens() {
            tracing::warn!(
                role = self.role.as_str(),
                model = %resolved.base.model_id,
                estimated_input_tokens,
                budget = resolved.base.effective_input_tokens(),
                "input estimate exceeds budget after escalation; using last fallback"
            );
        }
        resolved
    }

    /// Resolve for output pressure, same ladder rule against
    /// `max_output_tokens`. Run this on the result of `for_input_tokens`.
    pub fn for_output_tokens(&self, estimated_output_tokens: usize) -> &ModelRoleConfig {
        let mut resolved = self;
        for fallback in &self.large_output_fallback {
            if estimated_output_tokens <= resolved.base.max_output_tokens {
                break;
            }
            resolved = fallback;
        }
        if estimated_output_tokens > resolved.base.max_output_tokens {
            tracing::warn!(
                role = self.role.as_str(),
                model = %resolved.base.model_id,
                estimated_output_tokens,
                budget = resolved.base.max_output_tokens,
                "output estimate exceeds budget after escalation; using last fallback"
            );
        }
        resolved
    }

    /// The quality-escalation alternative, when one is configured.
    pub fn strong(&self) -> Option<&ModelRoleConfig> {
        self.strong_model.as_deref()
    }
}

/// Planner variant with the extra conversation budget field.
#[derive(Clone, Debug)]
pub struct PlannerRoleConfig {
    pub config: ModelRoleConfig,
    pub max_convo_tokens: usize,
}

/// A named, complete assignment of model configurations to every role.
/// Built once at startup from a registry and never mutated afterward.
#[derive(Clone, Debug)]
pub struct ModelPack {
    pub name: String,
    pub description: String,
    pub planner: PlannerRoleConfig,
    pub architect: ModelRoleConfig,
    pub coder: ModelRoleConfig,
    pub plan_summary: ModelRoleConfig,
    pub builder: ModelRoleConfig,
    pub whole_file_builder: Option<ModelRoleConfig>,
    pub namer: ModelRoleConfig,
    pub commit_msg: ModelRoleConfig,
    pub exec_status: ModelRoleConfig,
}

impl ModelPack {
    /// The whole-file role falls back to the plain builder when no dedicated
    /// model is assigned.
    pub fn whole_file_builder(&self) -> &ModelRoleConfig {
        self.whole_file_builder.as_ref().unwrap_or(&self.builder)
    }

    pub fn role_config(&self, role: ModelRole) -> &ModelRoleConfig {
        match role {
            ModelRole::Planner => &self.planner.config,
            ModelRole::Architect => &self.architect,
            ModelRole::Coder => &self.coder,
            ModelRole::PlanSummary => &self.plan_summary,
            ModelRole::Builder => &self.builder,
            ModelRole::WholeFileBuilder => self.whole_file_builder(),
            ModelRole::Namer => &self.namer,
            ModelRole::CommitMsg => &self.commit_msg,
            ModelRole::ExecStatus => &self.exec_status,
        }
    }

    /// The default pack: reliability over speed for builds, large-context
    /// planning. A pack referencing an unregistered model is a configuration
    /// bug, surfaced as `Err` for the host to treat as fatal.
    pub fn strong(registry: &ModelRegistry) -> Result<ModelPack, GaleError> {
        use ModelProvider::{OpenAi, OpenRouter};

        let gemini_pro = |role| {
            role_config(
                registry,
                role,
                OpenRouter,
                "google/gemini-2.5-pro-preview-03-25",
                Fallbacks::default(),
            )
        };
        let o3_mini_high = |role, fallbacks| {
            role_config(registry, role, OpenAi, "openai/o3-mini-high", fallbacks)
        };

        // Builders escalate to gemini for oversized context or output.
        let builder_fallbacks = Fallbacks {
            large_context: vec![gemini_pro(ModelRole::Builder)?],
            large_output: vec![gemini_pro(ModelRole::Builder)?],
            strong: None,
        };
        let whole_file_fallbacks = Fallbacks {
            large_context: vec![gemini_pro(ModelRole::WholeFileBuilder)?],
            large_output: vec![gemini_pro(ModelRole::WholeFileBuilder)?],
            strong: None,
        };

        Ok(ModelPack {
            name: "strong".to_string(),
            description: "For difficult tasks where slower responses and builds are ok. \
                Prioritizes reliability over speed for builds."
                .to_string(),
            planner: PlannerRoleConfig {
                config: gemini_pro(ModelRole::Planner)?,
                max_convo_tokens: registry
                    .get(OpenRouter, "google/gemini-2.5-pro-preview-03-25")
                    .map(|m| m.default_max_convo_tokens)
                    .unwrap_or_default(),
            },
            architect: gemini_pro(ModelRole::Architect)?,
            coder: role_config(
                registry,
                ModelRole::Coder,
                OpenRouter,
                "anthropic/claude-3.7-sonnet:thinking",
                Fallbacks::default(),
            )?,
            plan_summary: role_config(
                registry,
                ModelRole::PlanSummary,
                OpenAi,
                "openai/o3-mini-low",
                Fallbacks::default(),
            )?,
            builder: o3_mini_high(ModelRole::Builder, builder_fallbacks)?,
            whole_file_builder: Some(o3_mini_high(
                ModelRole::WholeFileBuilder,
                whole_file_fallbacks,
            )?),
            namer: o3_mini_high(ModelRole::Namer, Fallbacks::default())?,
            commit_msg: o3_mini_high(ModelRole::CommitMsg, Fallbacks::default())?,
            exec_status: role_config(
                registry,
                ModelRole::ExecStatus,
                OpenAi,
                "openai/o3-mini-medium",
                Fallbacks::default(),
            )?,
        })
    }

    /// All built-in packs, first entry is the process default.
    pub fn builtin(registry: &ModelRegistry) -> Result<Vec<ModelPack>, GaleError> {
        Ok(vec![Self::strong(registry)?])
    }
}

/// Escalation ladders handed to `role_config`.
#[derive(Clone, Debug, Default)]
pub struct Fallbacks {
    pub large_context: Vec<ModelRoleConfig>,
    pub large_output: Vec<ModelRoleConfig>,
    pub strong: Option<Box<ModelRoleConfig>>,
}

/// Bind a registered model to a role with the role's default sampling
/// parameters. Unknown `(provider, model_id)` is a configuration bug.
pub fn role_config(
    registry: &ModelRegistry,
    role: ModelRole,
    provider: ModelProvider,
    model_id: &str,
    fallbacks: Fallbacks,
) -> Result<ModelRoleConfig, GaleError> {
    let available = registry
        .get(provider, model_id)
        .ok_or_else(|| GaleError::ModelNotFound {
            key: format!("{}/{}", provider.as_str(), model_id),
        })?;

    let params = default_params(role);

    Ok(ModelRoleConfig {
        role,
        base: available.config.clone(),
        temperature: params.temperature,
        top_p: params.top_p,
        large_context_fallback: fallbacks.large_context,
        large_output_fallback: fallbacks.large_output,
        strong_model: fallbacks.strong,
    })
}
