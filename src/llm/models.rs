//! Centralized model definitions

use super::openai::{OpenAIModel, OpenAIService};
use super::LlmService;
use std::sync::Arc;

/// Model definition with metadata
#[derive(Debug, Clone)]
pub struct ModelDef {
    /// User-facing model ID, also what `DEFAULT_MODEL` refers to
    pub id: &'static str,
    /// Factory function to create the service from an API key and optional gateway
    pub factory: fn(&str, Option<&str>) -> Result<Arc<dyn LlmService>, String>,
}

fn openai_factory(
    model: OpenAIModel,
    api_key: &str,
    gateway: Option<&str>,
) -> Result<Arc<dyn LlmService>, String> {
    if api_key.is_empty() {
        return Err(format!(
            "{} requires OPENAI_API_KEY or gateway",
            model.api_name()
        ));
    }
    let service = OpenAIService::new(api_key.to_string(), model, gateway).map_err(|e| e.to_string())?;
    Ok(Arc::new(service))
}

/// Get all available model definitions
pub fn all_models() -> &'static [ModelDef] {
    &[
        ModelDef {
            id: "gpt-4-turbo",
            factory: |api_key, gateway| openai_factory(OpenAIModel::GPT4Turbo, api_key, gateway),
        },
        ModelDef {
            id: "gpt-4o",
            factory: |api_key, gateway| openai_factory(OpenAIModel::GPT4o, api_key, gateway),
        },
        ModelDef {
            id: "gpt-4o-mini",
            factory: |api_key, gateway| openai_factory(OpenAIModel::GPT4oMini, api_key, gateway),
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ids_are_unique() {
        let mut ids: Vec<_> = all_models().iter().map(|m| m.id).collect();
        ids.sort_unstable();
        ids.dedup();
        assert_eq!(ids.len(), all_models().len());
    }

    #[test]
    fn test_factory_requires_key() {
        let def = &all_models()[0];
        assert!((def.factory)("", None).is_err());
        let service = (def.factory)("sk-test", None).unwrap();
        assert_eq!(service.model_id(), "gpt-4-turbo");
    }
}
