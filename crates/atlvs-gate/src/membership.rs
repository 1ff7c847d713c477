//! Membership lookup

use crate::store::MembershipStore;
use atlvs_core::models::{Identity, Membership, MembershipSummary};
use atlvs_core::AppError;
use std::collections::HashSet;
use std::sync::Arc;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MembershipResolution {
    Found(Membership),
    NoMembership,
}

#[derive(Clone)]
pub struct MembershipLookup {
    store: Arc<dyn MembershipStore>,
}

impl MembershipLookup {
    pub fn new(store: Arc<dyn MembershipStore>) -> Self {
        Self { store }
    }

    /// Find the caller's active membership.
    ///
    /// With `organization_id` only that organization is considered. Without it the
    /// earliest created active membership wins, ties broken by membership id.
    /// Two rows for the same (identity, organization) pair are a data integrity
    /// error and are never resolved silently.
    #[tracing::instrument(skip(self, identity), fields(user_id = %identity.id))]
    pub async fn resolve(
        &self,
        identity: &Identity,
        organization_id: Option<Uuid>,
    ) -> Result<MembershipResolution, AppError> {
        let rows = self
            .store
            .find_memberships(identity.id, organization_id)
            .await?;

        let mut seen = HashSet::new();
        for row in &rows {
            if !seen.insert(row.organization_id) {
                tracing::error!(
                    user_id = %identity.id,
                    organization_id = %row.organization_id,
                    "Multiple membership rows for one user and organization"
                );
                return Err(AppError::Internal(format!(
                    "duplicate membership rows for user {} in organization {}",
                    identity.id, row.organization_id
                )));
            }
        }

        let chosen = rows
            .into_iter()
            .filter(|m| m.is_active())
            .filter(|m| organization_id.map_or(true, |org| m.organization_id == org))
            .min_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));

        Ok(match chosen {
            Some(membership) => MembershipResolution::Found(membership),
            None => MembershipResolution::NoMembership,
        })
    }

    /// Active memberships for the organization switcher.
    pub async fn list(&self, identity: &Identity) -> Result<Vec<MembershipSummary>, AppError> {
        self.store.membership_summaries(identity.id).await
    }
}
