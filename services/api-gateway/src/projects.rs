//! Project status operations.
//!
//! The business-logic boundary where upstream failures are translated into
//! domain errors: a missing project becomes the gateway's own not-found
//! error rather than leaking storage-layer detail, and an illegal lifecycle
//! change rejects before anything is written.

use tracing::info;

use crate::error::GatewayError;
use crate::lifecycle::{self, ProjectStatus, Transition};
use crate::store::{DataStore, ProjectRecord};

/// Change a project's status through the lifecycle rules.
///
/// Fetches the current record, evaluates the requested state against the
/// transition graph, and persists only a genuine, legal change. Requesting
/// the state the project is already in returns the unchanged record.
///
/// # Errors
///
/// - [`GatewayError::NotFound`] when the project does not exist upstream
/// - [`GatewayError::InvalidTransition`] when the change is illegal; nothing
///   is written in that case
/// - [`GatewayError::Upstream`] / [`GatewayError::RetryExhausted`] for other
///   store failures
pub async fn change_project_status(
    store: &dyn DataStore,
    project_id: &str,
    requested: ProjectStatus,
) -> Result<ProjectRecord, GatewayError> {
    let project = store
        .get_project(project_id)
        .await
        .map_err(|e| GatewayError::from_upstream(e, "project"))?;

    match lifecycle::validate_transition(project.status, requested)? {
        Transition::Unchanged => Ok(project),
        Transition::Apply(next) => {
            let updated = store
                .update_project_status(project_id, next)
                .await
                .map_err(|e| GatewayError::from_upstream(e, "project"))?;
            info!(
                project_id,
                from = project.status.as_str(),
                to = next.as_str(),
                "project status changed"
            );
            Ok(updated)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{Page, UserRecord};
    use async_trait::async_trait;
    use gateway_common::UpstreamError;
    use std::sync::atomic::{AtomicU32, Ordering};

    struct FakeStore {
        status: ProjectStatus,
        updates: AtomicU32,
    }

    impl FakeStore {
        fn with_status(status: ProjectStatus) -> Self {
            Self {
                status,
                updates: AtomicU32::new(0),
            }
        }

        fn record(&self, status: ProjectStatus) -> ProjectRecord {
            ProjectRecord {
                id: "p1".to_string(),
                owner_id: "u1".to_string(),
                name: "demo".to_string(),
                status,
                created_at: chrono::Utc::now(),
            }
        }
    }

    #[async_trait]
    impl DataStore for FakeStore {
        async fn get_user(&self, _id: &str) -> Result<UserRecord, UpstreamError> {
            Err(UpstreamError::NotFound("user".to_string()))
        }

        async fn get_project(&self, id: &str) -> Result<ProjectRecord, UpstreamError> {
            if id == "p1" {
                Ok(self.record(self.status))
            } else {
                Err(UpstreamError::NotFound(format!("projects/{id}")))
            }
        }

        async fn list_projects(
            &self,
            _owner_id: &str,
            page: i64,
            limit: i64,
        ) -> Result<Page<ProjectRecord>, UpstreamError> {
            Ok(Page {
                items: vec![],
                page,
                limit,
                total: 0,
            })
        }

        async fn update_project_status(
            &self,
            _id: &str,
            status: ProjectStatus,
        ) -> Result<ProjectRecord, UpstreamError> {
            self.updates.fetch_add(1, Ordering::SeqCst);
            Ok(self.record(status))
        }
    }

    #[tokio::test]
    async fn legal_change_is_persisted() {
        let store = FakeStore::with_status(ProjectStatus::Pending);
        let updated = change_project_status(&store, "p1", ProjectStatus::Active)
            .await
            .unwrap();
        assert_eq!(updated.status, ProjectStatus::Active);
        assert_eq!(store.updates.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn resubmitting_current_status_writes_nothing() {
        let store = FakeStore::with_status(ProjectStatus::Active);
        let record = change_project_status(&store, "p1", ProjectStatus::Active)
            .await
            .unwrap();
        assert_eq!(record.status, ProjectStatus::Active);
        assert_eq!(store.updates.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn illegal_change_writes_nothing() {
        let store = FakeStore::with_status(ProjectStatus::Completed);
        let result = change_project_status(&store, "p1", ProjectStatus::Active).await;
        assert!(matches!(
            result,
            Err(GatewayError::InvalidTransition { .. })
        ));
        assert_eq!(store.updates.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn missing_project_becomes_domain_not_found() {
        let store = FakeStore::with_status(ProjectStatus::Pending);
        let result = change_project_status(&store, "ghost", ProjectStatus::Active).await;
        match result {
            Err(GatewayError::NotFound { resource }) => assert_eq!(resource, "project"),
            other => panic!("expected NotFound, got {other:?}"),
        }
    }
}
