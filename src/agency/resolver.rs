use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

/// Membership probe against an external registry of enrolled stakeholders.
///
/// Used only when no static mapping matches, to recognize organizations
/// whose display name coincides with their canonical id.
#[async_trait]
pub trait StakeholderRegistry: Send + Sync {
    async fn exists(&self, id: &str) -> bool;
}

/// The outcome of resolving a normalized agency name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    /// Canonical identifier, falling back to the (rewritten) name itself
    /// when nothing maps.
    pub id: String,
    /// The agency name after rewrites and overrides were applied.
    pub name: String,
    pub is_stakeholder: bool,
}

/// Maps a normalized agency name to a canonical identifier through a
/// prioritized fallback chain. Resolution is total: no input string is an
/// error.
pub struct AgencyResolver {
    /// name -> canonical id, from the agencies reference table
    mapping: HashMap<String, String>,
    /// Ordered substring rewrites applied before lookup. Order is
    /// significant: later rules see the output of earlier ones.
    rewrites: Vec<(String, String)>,
    /// Wholesale name replacements for organizations outside the
    /// stakeholder program.
    non_stakeholder_overrides: HashMap<String, String>,
    registry: Option<Arc<dyn StakeholderRegistry>>,
}

impl AgencyResolver {
    pub fn new(mapping: HashMap<String, String>) -> Self {
        Self {
            mapping,
            rewrites: Vec::new(),
            non_stakeholder_overrides: HashMap::new(),
            registry: None,
        }
    }

    pub fn with_rewrites(mut self, rewrites: Vec<(String, String)>) -> Self {
        self.rewrites = rewrites;
        self
    }

    pub fn with_non_stakeholder_overrides(mut self, overrides: HashMap<String, String>) -> Self {
        self.non_stakeholder_overrides = overrides;
        self
    }

    pub fn with_registry(mut self, registry: Arc<dyn StakeholderRegistry>) -> Self {
        self.registry = Some(registry);
        self
    }

    /// Resolve a normalized agency name to its canonical id and
    /// stakeholder status.
    pub async fn resolve(&self, normalized_name: &str) -> Resolution {
        let mut name = normalized_name.to_string();

        for (trigger, replacement) in &self.rewrites {
            name = name.replace(trigger.as_str(), replacement);
        }

        let mut overridden = false;
        if let Some(override_name) = self.non_stakeholder_overrides.get(&name) {
            debug!(from = %name, to = %override_name, "applying non-stakeholder override");
            name = override_name.clone();
            overridden = true;
        }

        if let Some(id) = self.mapping.get(&name) {
            return Resolution {
                id: id.clone(),
                is_stakeholder: !overridden,
                name,
            };
        }

        if let Some(registry) = &self.registry {
            if registry.exists(&name).await {
                return Resolution {
                    id: name.clone(),
                    is_stakeholder: true,
                    name,
                };
            }
        }

        Resolution {
            id: name.clone(),
            is_stakeholder: false,
            name,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FixedRegistry(Vec<&'static str>);

    #[async_trait]
    impl StakeholderRegistry for FixedRegistry {
        async fn exists(&self, id: &str) -> bool {
            self.0.iter().any(|known| *known == id)
        }
    }

    fn mapping() -> HashMap<String, String> {
        HashMap::from([
            ("Department of Example".to_string(), "DOE".to_string()),
            ("Department of X".to_string(), "DOX".to_string()),
        ])
    }

    #[tokio::test]
    async fn test_direct_lookup() {
        let resolver = AgencyResolver::new(mapping());
        let res = resolver.resolve("Department of Example").await;
        assert_eq!(res.id, "DOE");
        assert_eq!(res.name, "Department of Example");
        assert!(res.is_stakeholder);
    }

    #[tokio::test]
    async fn test_rewrite_applies_before_lookup() {
        let resolver = AgencyResolver::new(mapping())
            .with_rewrites(vec![("Dept".to_string(), "Department".to_string())]);
        let res = resolver.resolve("Dept of X").await;
        assert_eq!(res.id, "DOX");
        assert!(res.is_stakeholder);
    }

    #[tokio::test]
    async fn test_rewrites_apply_in_table_order() {
        // The second rule acts on the first rule's output.
        let resolver = AgencyResolver::new(mapping()).with_rewrites(vec![
            ("Dept".to_string(), "Dep't".to_string()),
            ("Dep't".to_string(), "Department".to_string()),
        ]);
        let res = resolver.resolve("Dept of X").await;
        assert_eq!(res.id, "DOX");
    }

    #[tokio::test]
    async fn test_non_stakeholder_override_clears_stakeholder_flag() {
        let overrides = HashMap::from([(
            "Department of Example OIG".to_string(),
            "Department of Example".to_string(),
        )]);
        let resolver =
            AgencyResolver::new(mapping()).with_non_stakeholder_overrides(overrides);
        let res = resolver.resolve("Department of Example OIG").await;
        assert_eq!(res.id, "DOE");
        assert_eq!(res.name, "Department of Example");
        assert!(!res.is_stakeholder);
    }

    #[tokio::test]
    async fn test_registry_probe_fallback() {
        let resolver = AgencyResolver::new(mapping())
            .with_registry(Arc::new(FixedRegistry(vec!["GSA"])));
        let res = resolver.resolve("GSA").await;
        assert_eq!(res.id, "GSA");
        assert!(res.is_stakeholder);
    }

    #[tokio::test]
    async fn test_identity_fallback_never_fails() {
        let resolver = AgencyResolver::new(mapping());
        for name in ["", "Unknown Commission", "Dept of Nowhere"] {
            let res = resolver.resolve(name).await;
            assert_eq!(res.id, name);
            assert!(!res.is_stakeholder);
        }
    }
}
