// SPDX-FileCopyrightText: 2025 RAprogramm <andrey.rozanov.vl@gmail.com>
// SPDX-License-Identifier: MIT

//! One collection cycle from fan-out to exposition text.
//!
//! [`Exporter`] owns everything a cycle needs: the client, the configured
//! targets, the fetch options and the metric catalog. The catalog is built
//! once and only ever borrowed by the projector and the exposition layer.

use std::sync::Arc;

use tracing::{debug, info};

use crate::{
    catalog::MetricCatalog,
    client::RemoteQueryClient,
    error::Error,
    exposition::render_text,
    orchestrator::{Collection, FetchOptions, Targets, gather},
    projector::{project, project_failures},
};

/// Drives collection cycles against a [`RemoteQueryClient`].
pub struct Exporter<C,>
{
    client:  Arc<C,>,
    targets: Targets,
    options: FetchOptions,
    catalog: MetricCatalog,
    dedupe:  bool,
}

impl<C,> Exporter<C,>
where
    C: RemoteQueryClient,
{
    pub fn new(client: Arc<C,>, targets: Targets, options: FetchOptions,) -> Self
    {
        Self {
            client,
            targets,
            options,
            catalog: MetricCatalog::new(),
            dedupe: false,
        }
    }

    /// Enables the repository deduplication pass applied after each gather.
    pub fn with_dedupe(mut self, dedupe: bool,) -> Self
    {
        self.dedupe = dedupe;
        self
    }

    pub fn catalog(&self,) -> &MetricCatalog
    {
        &self.catalog
    }

    pub fn targets(&self,) -> &Targets
    {
        &self.targets
    }

    /// Runs the fan-out and returns the merged snapshot and failure ledger.
    ///
    /// Never fails: individual query failures end up in
    /// [`Collection::failures`].
    pub async fn collect(&self,) -> Collection
    {
        let mut collection = gather(Arc::clone(&self.client,), &self.targets, &self.options,).await;

        if self.dedupe {
            let before = collection.snapshot.repositories().count();
            collection.snapshot = collection.snapshot.deduplicated();
            let after = collection.snapshot.repositories().count();
            debug!("Deduplication removed {} repositories", before - after);
        }

        collection
    }

    /// Runs one cycle and renders it in the Prometheus text format.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Exposition`] when the measurements cannot be encoded.
    pub async fn render(&self,) -> Result<String, Error,>
    {
        let collection = self.collect().await;
        let text = render_text(
            &self.catalog,
            project(&collection.snapshot, &self.catalog,)
                .chain(project_failures(&collection.failures, &self.catalog,),),
        )?;

        info!(
            "Rendered {} bytes for {} repositories",
            text.len(),
            collection.snapshot.repositories().count()
        );
        Ok(text,)
    }
}

#[cfg(test)]
mod tests
{
    use std::{
        collections::HashSet,
        sync::atomic::{AtomicUsize, Ordering},
    };

    use super::*;
    use crate::{
        client::{Fetched, PageSizes, RepositoryRef},
        error::QueryError,
        schema::{
            OrganizationRecord, RateLimitBudget, RepositoryConnection, RepositoryRecord, TotalCount,
            UserRecord,
        },
    };

    #[derive(Default)]
    struct StubClient
    {
        calls:   AtomicUsize,
        missing: HashSet<String,>,
    }

    impl StubClient
    {
        fn budget() -> RateLimitBudget
        {
            RateLimitBudget {
                limit: 5000.0,
                remaining: 4321.0,
                ..RateLimitBudget::default()
            }
        }

        fn repository(owner: &str, name: &str, stars: u64,) -> RepositoryRecord
        {
            let mut repository = RepositoryRecord::named(owner, name,);
            repository.stargazers = TotalCount::new(stars,);
            repository
        }

        fn check(&self, entity: &str,) -> Result<(), QueryError,>
        {
            self.calls.fetch_add(1, Ordering::SeqCst,);
            if self.missing.contains(entity,) {
                return Err(QueryError::NotFound {
                    entity: entity.to_owned(),
                },);
            }
            Ok((),)
        }
    }

    impl RemoteQueryClient for StubClient
    {
        async fn query_organization(
            &self,
            login: &str,
            _pages: PageSizes,
        ) -> Result<Fetched<OrganizationRecord,>, QueryError,>
        {
            self.check(login,)?;
            let record = OrganizationRecord {
                login: login.to_owned(),
                repositories: RepositoryConnection::from_nodes(vec![
                    Self::repository(login, "shared", 7,),
                    Self::repository(login, "solo", 1,),
                ],),
                ..OrganizationRecord::default()
            };
            Ok(Fetched::new(record, Self::budget(),),)
        }

        async fn query_user(&self, login: &str, _pages: PageSizes,) -> Result<Fetched<UserRecord,>, QueryError,>
        {
            self.check(login,)?;
            let record = UserRecord {
                login: login.to_owned(),
                ..UserRecord::default()
            };
            Ok(Fetched::new(record, Self::budget(),),)
        }

        async fn query_repository(
            &self,
            repository: &RepositoryRef,
            _pages: PageSizes,
        ) -> Result<Fetched<RepositoryRecord,>, QueryError,>
        {
            self.check(&repository.to_string(),)?;
            Ok(Fetched::new(Self::repository(&repository.owner, &repository.name, 3,), Self::budget(),),)
        }
    }

    fn targets() -> Targets
    {
        Targets {
            organizations: vec!["acme".to_owned()],
            users:         vec!["ghost".to_owned()],
            repositories:  vec![RepositoryRef::new("acme", "shared",)],
        }
    }

    fn missing(entities: &[&str],) -> StubClient
    {
        StubClient {
            missing: entities.iter().map(|entity| entity.to_string(),).collect(),
            ..StubClient::default()
        }
    }

    #[tokio::test]
    async fn render_includes_repository_budget_and_failure_gauges()
    {
        let client = Arc::new(missing(&["ghost",],),);
        let exporter = Exporter::new(Arc::clone(&client,), targets(), FetchOptions::default(),);

        let text = exporter.render().await.expect("rendered",);

        assert_eq!(client.calls.load(Ordering::SeqCst,), 3);
        assert!(text.contains("repo=\"solo\""));
        assert!(text.contains("github_rate_remaining 4321"));
        assert!(text.contains("github_exporter_query_failures{kind=\"user\",reason=\"not_found\"} 1"));
        assert!(text.contains("github_exporter_query_failures{kind=\"repository\",reason=\"not_found\"} 0"));
    }

    #[tokio::test]
    async fn collect_keeps_duplicates_by_default()
    {
        let exporter = Exporter::new(Arc::new(StubClient::default(),), targets(), FetchOptions::default(),);
        let collection = exporter.collect().await;

        assert_eq!(collection.snapshot.repositories().count(), 3);
        assert!(collection.failures.is_empty());
    }

    #[tokio::test]
    async fn dedupe_removes_repeated_repositories()
    {
        let exporter = Exporter::new(Arc::new(StubClient::default(),), targets(), FetchOptions::default(),)
            .with_dedupe(true,);
        let collection = exporter.collect().await;

        let keys: Vec<_,> = collection.snapshot.repositories().map(RepositoryRecord::key,).collect();
        assert_eq!(keys, vec![("acme", "shared"), ("acme", "solo")]);
        assert_eq!(collection.snapshot.repositories().next().map(|r| r.stargazers.total_count), Some(7));
    }

    #[tokio::test]
    async fn total_failure_still_renders_zero_budget()
    {
        let client = missing(&["acme", "ghost", "acme/shared",],);
        let exporter = Exporter::new(Arc::new(client,), targets(), FetchOptions::default(),);

        let text = exporter.render().await.expect("rendered",);

        assert!(text.contains("github_rate_limit 0"));
        assert!(text.contains("github_rate_remaining 0"));
        assert!(!text.contains("github_repo_stars"));
        assert!(text.contains("github_exporter_query_failures{kind=\"organization\",reason=\"not_found\"} 1"));
    }

    #[test]
    fn exporter_exposes_catalog_and_targets()
    {
        let exporter = Exporter::new(Arc::new(StubClient::default(),), targets(), FetchOptions::default(),);
        assert_eq!(exporter.catalog().len(), 11);
        assert_eq!(exporter.targets().len(), 3);
    }
}
