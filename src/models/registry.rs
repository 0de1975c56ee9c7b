use std::collections::HashMap;

use crate::error::GaleError;
use crate::models::{AvailableModel, ModelProvider};

/// Catalog of available backend models, keyed by `provider/model_id`.
///
/// Loaded once at process startup and read-only afterward: no interior
/// mutability, so concurrent reads need no locking. A malformed model table
/// would otherwise surface as confusing runtime errors deep inside a build,
/// so `load` validates every entry up front and the host treats `Err` as
/// fatal.
#[derive(Debug)]
pub struct ModelRegistry {
    models: HashMap<String, AvailableModel>,
}

impl ModelRegistry {
    /// Validate and index a model list. Rejects entries with unset required
    /// fields and duplicate composite keys — the map would silently
    /// overwrite on collision, so uniqueness is enforced here.
    pub fn load(entries: Vec<AvailableModel>) -> Result<Self, GaleError> {
        let mut models = HashMap::with_capacity(entries.len());

        for entry in entries {
            let key = entry.config.key();
            validate(&key, &entry)?;

            if models.insert(key.clone(), entry).is_some() {
                return Err(GaleError::DuplicateModel { key });
            }
        }

        if models.is_empty() {
            tracing::warn!("model registry loaded with no models");
        }

        Ok(Self { models })
    }

    /// Load the built-in catalog.
    pub fn builtin() -> Result<Self, GaleError> {
        Self::load(crate::models::catalog::builtin_models())
    }

    pub fn get(&self, provider: ModelProvider, model_id: &str) -> Option<&AvailableModel> {
        self.models
            .get(&format!("{}/{}", provider.as_str(), model_id))
    }

    pub fn len(&self) -> usize {
        self.models.len()
    }

    pub fn is_empty(&self) -> bool {
        self.models.is_empty()
    }
}

fn validate(key: &str, entry: &AvailableModel) -> Result<(), GaleError> {
    let missing = |field: &'static str| GaleError::MissingField {
        key: key.to_string(),
        field,
    };

    let config = &entry.config;

    if entry.description.is_empty() {
        return Err(missing("description"));
    }
    if entry.default_max_convo_tokens == 0 {
        return Err(missing("default_max_convo_tokens"));
    }
    if config.model_name.is_empty() {
        return Err(missing("model_name"));
    }
    if config.model_id.is_empty() {
        return Err(missing("model_id"));
    }
    if config.max_tokens == 0 {
        return Err(missing("max_tokens"));
    }
    if config.max_output_tokens == 0 {
        return Err(missing("max_output_tokens"));
    }
    if config.reserved_output_tokens == 0 {
        return Err(missing("reserved_output_tokens"));
    }
    if config.api_key_env_var.is_empty() {
        return Err(missing("api_key_env_var"));
    }
    if config.base_url.is_empty() {
        return Err(missing("base_url"));
    }

    // A reservation at or above the input limit would leave no room for
    // input at all.
    if config.reserved_output_tokens >= config.max_tokens {
        return Err(GaleError::InvalidModelConfig {
            key: key.to_string(),
            reason: format!(
                "reserved_output_tokens ({}) must be below max_tokens ({})",
                config.reserved_output_tokens, config.max_tokens
            ),
        });
    }

    Ok(())
}
