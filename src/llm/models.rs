//! Model catalogue — which provider serves which model id.

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LlmProviderKind {
    Anthropic,
    OpenAi,
}

impl LlmProviderKind {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Anthropic => "anthropic",
            Self::OpenAi => "openai",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelInfo {
    pub id: &'static str,
    pub label: &'static str,
    pub provider: LlmProviderKind,
}

/// Models offered in the picker, in display order.
pub const MODELS: &[ModelInfo] = &[
    ModelInfo { id: "claude-sonnet-4-5-20250929", label: "Claude Sonnet 4.5", provider: LlmProviderKind::Anthropic },
    ModelInfo { id: "claude-opus-4-1-20250805", label: "Claude Opus 4.1", provider: LlmProviderKind::Anthropic },
    ModelInfo { id: "claude-3-5-haiku-20241022", label: "Claude Haiku 3.5", provider: LlmProviderKind::Anthropic },
    ModelInfo { id: "gpt-4o", label: "GPT-4o", provider: LlmProviderKind::OpenAi },
    ModelInfo { id: "gpt-4o-mini", label: "GPT-4o mini", provider: LlmProviderKind::OpenAi },
    ModelInfo { id: "o3-mini", label: "o3-mini", provider: LlmProviderKind::OpenAi },
];

/// Resolve the provider for a model id. Ids outside the catalogue are matched
/// by family prefix so newer snapshots work without a code change.
#[must_use]
pub fn provider_for(model_id: &str) -> Option<LlmProviderKind> {
    if let Some(model) = MODELS.iter().find(|m| m.id == model_id) {
        return Some(model.provider);
    }
    let id = model_id.trim().to_ascii_lowercase();
    if id.starts_with("claude") {
        Some(LlmProviderKind::Anthropic)
    } else if ["gpt", "o1", "o3", "o4", "chatgpt"].iter().any(|p| id.starts_with(p)) {
        Some(LlmProviderKind::OpenAi)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn catalogue_entries_resolve_to_their_provider() {
        for model in MODELS {
            assert_eq!(provider_for(model.id), Some(model.provider), "{}", model.id);
        }
    }

    #[test]
    fn unlisted_ids_resolve_by_family() {
        assert_eq!(provider_for("claude-3-opus-20240229"), Some(LlmProviderKind::Anthropic));
        assert_eq!(provider_for("gpt-4.1"), Some(LlmProviderKind::OpenAi));
        assert_eq!(provider_for("o4-mini"), Some(LlmProviderKind::OpenAi));
        assert_eq!(provider_for("llama-3-70b"), None);
        assert_eq!(provider_for(""), None);
    }
}
