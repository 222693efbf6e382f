use crate::{
    auth::AuthUser,
    error::AppError,
    models::{AnalyticsStats, TrendPoint},
    policy::{Resource, authorize, resolve_scope},
    repository::RepositoryState,
};

/// AnalyticsService
///
/// Dashboard counters over the caller's Analytics scope. For a company or receptionist
/// `totalUsers` counts every account carrying the company code, the company included.
pub struct AnalyticsService {
    repo: RepositoryState,
}

impl AnalyticsService {
    pub fn new(repo: RepositoryState) -> Self {
        Self { repo }
    }

    pub async fn stats(&self, identity: &AuthUser) -> Result<AnalyticsStats, AppError> {
        authorize(identity, &[])?;
        let scope = resolve_scope(self.repo.as_ref(), identity, Resource::Analytics).await?;

        let total_users = self.repo.count_users(&scope).await?;
        let (total_visitors, active_visitors) = self.repo.visitor_stats(&scope).await?;

        Ok(AnalyticsStats {
            total_users,
            total_visitors,
            active_visitors,
        })
    }

    /// Visitors created per UTC day inside the caller's scope, oldest day first.
    pub async fn visitor_trend(&self, identity: &AuthUser) -> Result<Vec<TrendPoint>, AppError> {
        authorize(identity, &[])?;
        let scope = resolve_scope(self.repo.as_ref(), identity, Resource::Analytics).await?;
        self.repo.visitor_trend(&scope).await
    }
}
