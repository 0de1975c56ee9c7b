use crate::models::{
    AvailableModel, BaseModelConfig, ModelCompatibility, ModelOutputFormat, ModelProvider,
    ReasoningEffort,
};

/// Shorthand for a catalog entry. Provider-derived fields (credential env
/// var, base URL) are filled from the provider so entries can't drift.
fn model(
    description: &str,
    default_max_convo_tokens: usize,
    config: BaseModelConfig,
) -> AvailableModel {
    AvailableModel {
        description: description.to_string(),
        default_max_convo_tokens,
        config,
    }
}

fn base(
    provider: ModelProvider,
    model_name: &str,
    model_id: &str,
    max_tokens: usize,
    max_output_tokens: usize,
    reserved_output_tokens: usize,
    preferred_output_format: ModelOutputFormat,
) -> BaseModelConfig {
    BaseModelConfig {
        provider,
        model_name: model_name.to_string(),
        model_id: model_id.to_string(),
        max_tokens,
        max_output_tokens,
        reserved_output_tokens,
        compatibility: ModelCompatibility::FULL,
        preferred_output_format,
        role_params_disabled: false,
        system_prompt_disabled: false,
        reasoning_effort: None,
        predicted_output_enabled: false,
        api_key_env_var: provider.api_key_env_var().to_string(),
        base_url: provider.base_url().to_string(),
    }
}

/// The built-in model table.
///
/// `reserved_output_tokens` is a realistic output allowance, not the hard
/// limit: o3-mini can emit 100k tokens, but in practice ~25k of reasoning
/// plus ~15k of real output covers most requests, so reserving 40k leaves a
/// 160k effective input window. For models with a low output ceiling the
/// reservation just equals `max_output_tokens`.
pub fn builtin_models() -> Vec<AvailableModel> {
    use ModelOutputFormat::{ToolCallJson, Xml};
    use ModelProvider::{OpenAi, OpenRouter};

    vec![
        // Direct OpenAI models
        model("OpenAI o3-mini-high", 10000, {
            let mut c = base(
                OpenAi,
                "o3-mini",
                "openai/o3-mini-high",
                200000,
                100000,
                30000,
                ToolCallJson,
            );
            c.role_params_disabled = true;
            c.reasoning_effort = Some(ReasoningEffort::High);
            c
        }),
        model("OpenAI o3-mini-medium", 10000, {
            let mut c = base(
                OpenAi,
                "o3-mini",
                "openai/o3-mini-medium",
                200000,
                100000,
                40000,
                ToolCallJson,
            );
            c.role_params_disabled = true;
            c.reasoning_effort = Some(ReasoningEffort::Medium);
            c
        }),
        model("OpenAI o3-mini-low", 10000, {
            let mut c = base(
                OpenAi,
                "o3-mini",
                "openai/o3-mini-low",
                200000,
                100000,
                40000,
                ToolCallJson,
            );
            c.role_params_disabled = true;
            c.reasoning_effort = Some(ReasoningEffort::Low);
            c
        }),
        model("OpenAI o1", 15000, {
            let mut c = base(
                OpenAi,
                "o1",
                "openai/o1",
                200000,
                100000,
                40000,
                ToolCallJson,
            );
            c.role_params_disabled = true;
            c.system_prompt_disabled = true;
            c
        }),
        model(
            "OpenAI gpt-4.1",
            15000,
            base(
                OpenAi,
                "gpt-4.1",
                "openai/gpt-4.1",
                1047576,
                32768,
                32768,
                ToolCallJson,
            ),
        ),
        // OpenRouter models
        model(
            "Anthropic Claude 3.7 Sonnet via OpenRouter",
            15000,
            base(
                OpenRouter,
                "anthropic/claude-3.7-sonnet",
                "anthropic/claude-3.7-sonnet",
                200000,
                128000,
                20000,
                Xml,
            ),
        ),
        model(
            "Anthropic Claude 3.7 Sonnet (thinking) via OpenRouter",
            15000,
            base(
                OpenRouter,
                "anthropic/claude-3.7-sonnet:thinking",
                "anthropic/claude-3.7-sonnet:thinking",
                200000,
                128000,
                40000,
                Xml,
            ),
        ),
        model(
            "Google Gemini Pro 2.5 via OpenRouter",
            75000,
            base(
                OpenRouter,
                "google/gemini-2.5-pro-preview-03-25",
                "google/gemini-2.5-pro-preview-03-25",
                1000000,
                65535,
                65535,
                Xml,
            ),
        ),
        model(
            "Google Gemini Flash 2.5 via OpenRouter",
            75000,
            base(
                OpenRouter,
                "google/gemini-2.5-flash-preview",
                "google/gemini-2.5-flash-preview",
                1000000,
                8192,
                8192,
                Xml,
            ),
        ),
        model("OpenAI gpt-4o via OpenRouter", 10000, {
            let mut c = base(
                OpenRouter,
                "openai/gpt-4o",
                "openai/gpt-4o",
                128000,
                16384,
                16384,
                ToolCallJson,
            );
            c.predicted_output_enabled = true;
            c
        }),
        model("OpenAI gpt-4o-mini via OpenRouter", 10000, {
            let mut c = base(
                OpenRouter,
                "openai/gpt-4o-mini",
                "openai/gpt-4o-mini",
                128000,
                16384,
                16384,
                ToolCallJson,
            );
            c.predicted_output_enabled = true;
            c
        }),
    ]
}
