use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Subscription tier supplied by the account collaborator. Unknown values
/// degrade to FREE rather than failing the request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SubscriptionTier {
    Free,
    Pro,
    Team,
    Enterprise,
}

impl SubscriptionTier {
    pub fn parse(value: &str) -> Self {
        match value.trim().to_ascii_uppercase().as_str() {
            "PRO" => SubscriptionTier::Pro,
            "TEAM" => SubscriptionTier::Team,
            "ENTERPRISE" => SubscriptionTier::Enterprise,
            _ => SubscriptionTier::Free,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            SubscriptionTier::Free => "FREE",
            SubscriptionTier::Pro => "PRO",
            SubscriptionTier::Team => "TEAM",
            SubscriptionTier::Enterprise => "ENTERPRISE",
        }
    }
}

/// Per-tier capabilities. The daily quota is enforced by the account
/// collaborator before `interpret` is invoked; it is carried here only so
/// one table owns the tier story.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TierConfig {
    pub llm_model: String,
    pub enable_images: bool,
    pub daily_ai_quota: Option<u32>,
}

#[derive(Debug, Clone)]
pub struct TierRegistry {
    tiers: IndexMap<SubscriptionTier, TierConfig>,
}

impl TierRegistry {
    pub fn new(tiers: Option<IndexMap<SubscriptionTier, TierConfig>>) -> Self {
        Self {
            tiers: tiers
                .filter(|map| !map.is_empty())
                .unwrap_or_else(default_tiers),
        }
    }

    pub fn config(&self, tier: SubscriptionTier) -> &TierConfig {
        self.tiers
            .get(&tier)
            .or_else(|| self.tiers.get(&SubscriptionTier::Free))
            .or_else(|| self.tiers.values().next())
            .expect("tier registry is never empty")
    }
}

impl Default for TierRegistry {
    fn default() -> Self {
        Self::new(None)
    }
}

fn default_tiers() -> IndexMap<SubscriptionTier, TierConfig> {
    let mut map = IndexMap::new();
    map.insert(
        SubscriptionTier::Free,
        TierConfig {
            llm_model: "gpt-4o-mini".to_string(),
            enable_images: false,
            daily_ai_quota: Some(20),
        },
    );
    for tier in [
        SubscriptionTier::Pro,
        SubscriptionTier::Team,
        SubscriptionTier::Enterprise,
    ] {
        map.insert(
            tier,
            TierConfig {
                llm_model: "gpt-4o".to_string(),
                enable_images: false,
                daily_ai_quota: None,
            },
        );
    }
    map
}

/// Process-wide behavior switches, read once at startup and passed
/// explicitly so `interpret` stays pure and testable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeploymentFlags {
    pub image_first: bool,
    pub rules_disabled: bool,
    pub ai_required: bool,
}

impl DeploymentFlags {
    pub fn from_env() -> Self {
        Self {
            image_first: env_flag("AI_IMAGE_FIRST", true),
            rules_disabled: env_flag("AI_DISABLE_RULES", false),
            ai_required: env_flag("AI_REQUIRE", false),
        }
    }
}

impl Default for DeploymentFlags {
    fn default() -> Self {
        Self {
            image_first: true,
            rules_disabled: false,
            ai_required: false,
        }
    }
}

fn env_flag(name: &str, default: bool) -> bool {
    match std::env::var(name) {
        Ok(value) => is_truthy(&value),
        Err(_) => default,
    }
}

fn is_truthy(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

/// Read-only per-request context. The orchestrator must not mutate or
/// cache it across requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TierContext {
    pub subscription_tier: SubscriptionTier,
    pub image_generation_allowed: bool,
    pub rules_disabled: bool,
    pub ai_required: bool,
}

impl TierContext {
    pub fn for_tier(
        tier: SubscriptionTier,
        registry: &TierRegistry,
        flags: DeploymentFlags,
    ) -> Self {
        Self {
            subscription_tier: tier,
            image_generation_allowed: registry.config(tier).enable_images,
            rules_disabled: flags.rules_disabled,
            ai_required: flags.ai_required,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_tier_parses_as_free() {
        assert_eq!(SubscriptionTier::parse("pro"), SubscriptionTier::Pro);
        assert_eq!(SubscriptionTier::parse("PLATINUM"), SubscriptionTier::Free);
        assert_eq!(SubscriptionTier::parse(""), SubscriptionTier::Free);
    }

    #[test]
    fn free_tier_uses_the_cheaper_model() {
        let registry = TierRegistry::default();
        assert_eq!(registry.config(SubscriptionTier::Free).llm_model, "gpt-4o-mini");
        assert_eq!(registry.config(SubscriptionTier::Pro).llm_model, "gpt-4o");
        assert_eq!(
            registry.config(SubscriptionTier::Free).daily_ai_quota,
            Some(20)
        );
    }

    #[test]
    fn missing_tier_falls_back_to_free_config() {
        let mut map = IndexMap::new();
        map.insert(
            SubscriptionTier::Free,
            TierConfig {
                llm_model: "local".to_string(),
                enable_images: true,
                daily_ai_quota: None,
            },
        );
        let registry = TierRegistry::new(Some(map));
        assert_eq!(registry.config(SubscriptionTier::Team).llm_model, "local");
    }

    #[test]
    fn truthy_values_match_the_deployment_convention() {
        for value in ["1", "true", "YES", " on "] {
            assert!(is_truthy(value));
        }
        for value in ["0", "false", "off", "", "maybe"] {
            assert!(!is_truthy(value));
        }
    }

    #[test]
    fn context_reflects_tier_capabilities_and_flags() {
        let registry = TierRegistry::default();
        let flags = DeploymentFlags {
            image_first: true,
            rules_disabled: true,
            ai_required: false,
        };
        let context = TierContext::for_tier(SubscriptionTier::Free, &registry, flags);
        assert!(!context.image_generation_allowed);
        assert!(context.rules_disabled);
        assert!(!context.ai_required);
    }
}
