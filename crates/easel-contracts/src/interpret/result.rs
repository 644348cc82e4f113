use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::schema::VisualSpec;

/// Which tier of the fallback chain produced the final description.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provenance {
    Image,
    Llm,
    Rules,
    Fallback,
    Error,
}

impl Provenance {
    pub fn as_str(self) -> &'static str {
        match self {
            Provenance::Image => "image",
            Provenance::Llm => "llm",
            Provenance::Rules => "rules",
            Provenance::Fallback => "fallback",
            Provenance::Error => "error",
        }
    }
}

/// Outcome of one interpretation request. Created fresh per command,
/// immutable once returned, never persisted by this subsystem.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InterpretationResult {
    pub request_id: Uuid,
    pub source: Provenance,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<VisualSpec>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_detail: Option<String>,
}

impl InterpretationResult {
    pub fn resolved(request_id: Uuid, source: Provenance, description: VisualSpec) -> Self {
        Self {
            request_id,
            source,
            description: Some(description),
            error_detail: None,
        }
    }

    pub fn error(request_id: Uuid, detail: impl Into<String>) -> Self {
        Self {
            request_id,
            source: Provenance::Error,
            description: None,
            error_detail: Some(detail.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn provenance_serializes_lowercase() {
        assert_eq!(
            serde_json::to_value(Provenance::Fallback).unwrap(),
            serde_json::json!("fallback")
        );
        assert_eq!(Provenance::Llm.as_str(), "llm");
    }

    #[test]
    fn error_results_carry_detail_and_no_description() {
        let result = InterpretationResult::error(Uuid::nil(), "AI unavailable");
        assert_eq!(result.source, Provenance::Error);
        assert!(result.description.is_none());
        let value = serde_json::to_value(&result).unwrap();
        assert_eq!(value["errorDetail"], serde_json::json!("AI unavailable"));
    }
}
