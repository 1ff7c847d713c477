//! Entitlement resolution
//!
//! Effective flag = organization flag OR user flag, restricted by the flag's
//! scope. An absent row contributes `false` for every flag; a present row that
//! omits a flag contributes the flag's configured default. Nothing is cached:
//! a change to either row is visible on the next request.

use crate::store::EntitlementStore;
use atlvs_core::models::{EffectiveEntitlements, EntitlementRecord};
use atlvs_core::{AppError, FeatureFlagDefinition, FeatureFlagRegistry};
use std::collections::BTreeMap;
use std::sync::Arc;
use uuid::Uuid;

fn level_value(flag: &FeatureFlagDefinition, record: Option<&EntitlementRecord>) -> bool {
    match record {
        Some(r) => r
            .flags
            .get(&flag.name)
            .copied()
            .unwrap_or(flag.default_enabled),
        None => false,
    }
}

/// Merge the two entitlement levels for every flag the registry knows.
pub fn merge(
    registry: &FeatureFlagRegistry,
    organization: Option<&EntitlementRecord>,
    user: Option<&EntitlementRecord>,
) -> EffectiveEntitlements {
    let mut effective = BTreeMap::new();
    for flag in registry.iter() {
        let from_org = flag.scope.consults_organization() && level_value(flag, organization);
        let from_user = flag.scope.consults_user() && level_value(flag, user);
        effective.insert(flag.name.clone(), from_org || from_user);
    }
    EffectiveEntitlements(effective)
}

#[derive(Clone)]
pub struct EntitlementResolver {
    store: Arc<dyn EntitlementStore>,
    registry: Arc<FeatureFlagRegistry>,
}

impl EntitlementResolver {
    pub fn new(store: Arc<dyn EntitlementStore>, registry: Arc<FeatureFlagRegistry>) -> Self {
        Self { store, registry }
    }

    pub fn registry(&self) -> &FeatureFlagRegistry {
        &self.registry
    }

    #[tracing::instrument(skip(self))]
    pub async fn resolve(
        &self,
        organization_id: Uuid,
        user_id: Option<Uuid>,
    ) -> Result<EffectiveEntitlements, AppError> {
        let needs_org = self.registry.iter().any(|f| f.scope.consults_organization());
        let needs_user = self.registry.iter().any(|f| f.scope.consults_user());

        let org_record = if needs_org {
            self.store.organization_entitlements(organization_id).await?
        } else {
            None
        };
        let user_record = match user_id {
            Some(id) if needs_user => self.store.user_entitlements(id).await?,
            _ => None,
        };

        Ok(merge(
            &self.registry,
            org_record.as_ref(),
            user_record.as_ref(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::InMemoryStore;
    use atlvs_core::feature_flags::{FEATURE_ATLVS, FEATURE_OPENDECK};
    use atlvs_core::FlagScope;

    fn record(flags: &[(&str, bool)]) -> EntitlementRecord {
        flags
            .iter()
            .fold(EntitlementRecord::new(Uuid::new_v4()), |r, (name, on)| {
                r.with_flag(*name, *on)
            })
    }

    #[test]
    fn test_absent_rows_are_all_false() {
        let registry = FeatureFlagRegistry::builtin();
        let effective = merge(&registry, None, None);
        assert_eq!(effective.as_map().len(), registry.len());
        assert!(effective.as_map().values().all(|on| !on));
    }

    #[test]
    fn test_or_is_monotonic_and_idempotent() {
        let registry = FeatureFlagRegistry::builtin();
        let states = [None, Some(false), Some(true)];
        for org in states {
            for user in states {
                let org_row = org.map(|v| record(&[(FEATURE_OPENDECK, v)]));
                let user_row = user.map(|v| record(&[(FEATURE_OPENDECK, v)]));
                let effective = merge(&registry, org_row.as_ref(), user_row.as_ref());
                let expected = org == Some(true) || user == Some(true);
                assert_eq!(effective.is_enabled(FEATURE_OPENDECK), expected);

                // merging a level with itself changes nothing
                let twice = merge(&registry, org_row.as_ref(), org_row.as_ref());
                assert_eq!(
                    twice.is_enabled(FEATURE_OPENDECK),
                    org == Some(true)
                );
            }
        }
    }

    #[test]
    fn test_scope_limits_which_level_grants() {
        let registry = FeatureFlagRegistry::new(vec![
            FeatureFlagDefinition::new("org_only", FlagScope::Organization, false),
            FeatureFlagDefinition::new("user_only", FlagScope::User, false),
        ])
        .unwrap();
        let org = record(&[("user_only", true)]);
        let user = record(&[("org_only", true)]);
        let effective = merge(&registry, Some(&org), Some(&user));
        assert!(!effective.is_enabled("org_only"));
        assert!(!effective.is_enabled("user_only"));
    }

    #[test]
    fn test_default_applies_only_to_present_rows() {
        let registry = FeatureFlagRegistry::new(vec![FeatureFlagDefinition::new(
            "beta",
            FlagScope::Any,
            true,
        )])
        .unwrap();
        assert!(!merge(&registry, None, None).is_enabled("beta"));
        assert!(merge(&registry, Some(&record(&[])), None).is_enabled("beta"));
        assert!(!merge(&registry, Some(&record(&[("beta", false)])), None).is_enabled("beta"));
    }

    #[test]
    fn test_unknown_flags_in_rows_are_ignored() {
        let registry = FeatureFlagRegistry::builtin();
        let org = record(&[("legacy_flag", true)]);
        let effective = merge(&registry, Some(&org), None);
        assert!(!effective.as_map().contains_key("legacy_flag"));
    }

    #[tokio::test]
    async fn test_org_false_user_true_resolves_true() {
        let store = Arc::new(InMemoryStore::new());
        let org = store.add_organization("O1").await;
        let user = Uuid::new_v4();
        store
            .set_organization_entitlements(org, &[(FEATURE_OPENDECK, false)])
            .await;
        store
            .set_user_entitlements(user, &[(FEATURE_OPENDECK, true)])
            .await;

        let resolver =
            EntitlementResolver::new(store.clone(), Arc::new(FeatureFlagRegistry::builtin()));
        let effective = resolver.resolve(org, Some(user)).await.unwrap();
        assert!(effective.is_enabled(FEATURE_OPENDECK));
        assert!(!effective.is_enabled(FEATURE_ATLVS));

        // without an identity only the organization row counts
        let anonymous = resolver.resolve(org, None).await.unwrap();
        assert!(!anonymous.is_enabled(FEATURE_OPENDECK));
    }

    #[tokio::test]
    async fn test_changes_are_visible_on_next_resolution() {
        let store = Arc::new(InMemoryStore::new());
        let org = store.add_organization("O1").await;
        let resolver =
            EntitlementResolver::new(store.clone(), Arc::new(FeatureFlagRegistry::builtin()));

        store
            .set_organization_entitlements(org, &[(FEATURE_ATLVS, true)])
            .await;
        assert!(resolver.resolve(org, None).await.unwrap().is_enabled(FEATURE_ATLVS));

        store
            .set_organization_entitlements(org, &[(FEATURE_ATLVS, false)])
            .await;
        assert!(!resolver.resolve(org, None).await.unwrap().is_enabled(FEATURE_ATLVS));
    }
}
