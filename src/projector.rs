// SPDX-FileCopyrightText: 2025 RAprogramm <andrey.rozanov.vl@gmail.com>
// SPDX-License-Identifier: MIT

//! Projection of a [`Snapshot`] into label-tagged measurements.
//!
//! Projection is lazy and side-effect free: the returned iterator borrows the
//! snapshot and yields every repository gauge followed by the budget gauges.
//! A measurement that fails validation is dropped on its own; the remaining
//! ones are still produced.

#![allow(non_shorthand_field_patterns)]

use std::collections::BTreeMap;

use tracing::debug;

use crate::{
    catalog::{MetricCatalog, MetricDescriptor, MetricKey},
    error::QueryError,
    orchestrator::{EntityKind, FailureRecord},
    schema::RepositoryRecord,
    snapshot::Snapshot,
};

/// Reasons a single measurement is rejected.
#[derive(Debug, Clone, PartialEq, Eq, masterror::Error,)]
pub enum ProjectionError
{
    /// The catalog has no descriptor for the key.
    #[error("metric {key} is not described in the catalog")]
    UnknownMetric {
        key: MetricKey,
    },
    /// Label values do not match the descriptor's label schema.
    #[error("metric {metric} expects {expected} labels, got {actual}")]
    LabelCardinality {
        metric:   String,
        expected: usize,
        actual:   usize,
    },
    /// The value is NaN or infinite.
    #[error("metric {metric} has a non-finite value")]
    NonFinite {
        metric: String,
    },
    /// The repository lacks an owner login or a name.
    #[error("repository {owner:?}/{name:?} has no identity")]
    MissingIdentity {
        owner: String,
        name:  String,
    },
}

/// One `(metric, value, labels)` tuple handed to the exposition registry.
#[derive(Debug, Clone, PartialEq,)]
pub struct Measurement
{
    pub key:    MetricKey,
    /// Fully-qualified metric name copied from the descriptor.
    pub name:   String,
    pub value:  f64,
    /// Label values in the order declared by the descriptor.
    pub labels: Vec<String,>,
}

impl Measurement
{
    /// Validates and builds a measurement for `key`.
    ///
    /// # Errors
    ///
    /// Returns [`ProjectionError`] when the key is not in the catalog, the
    /// label count differs from the descriptor, or the value is not finite.
    pub fn new(
        catalog: &MetricCatalog,
        key: MetricKey,
        value: f64,
        labels: Vec<String,>,
    ) -> Result<Self, ProjectionError,>
    {
        let descriptor = catalog.get(key,).ok_or(ProjectionError::UnknownMetric {
            key,
        },)?;
        validate(descriptor, value, &labels,)?;

        Ok(Self {
            key,
            name: descriptor.name().to_owned(),
            value,
            labels,
        },)
    }
}

fn validate(descriptor: &MetricDescriptor, value: f64, labels: &[String],) -> Result<(), ProjectionError,>
{
    if labels.len() != descriptor.labels().len() {
        return Err(ProjectionError::LabelCardinality {
            metric:   descriptor.name().to_owned(),
            expected: descriptor.labels().len(),
            actual:   labels.len(),
        },);
    }
    if !value.is_finite() {
        return Err(ProjectionError::NonFinite {
            metric: descriptor.name().to_owned(),
        },);
    }
    Ok((),)
}

/// Label values shared by every gauge of one repository.
///
/// Order: name, owner, private, fork, archived, license key, primary
/// language. Booleans render as `"true"`/`"false"`.
///
/// # Errors
///
/// Returns [`ProjectionError::MissingIdentity`] when the owner login or the
/// name is empty.
pub fn repository_labels(repository: &RepositoryRecord,) -> Result<[String; 7], ProjectionError,>
{
    if repository.owner.login.is_empty() || repository.name.is_empty() {
        return Err(ProjectionError::MissingIdentity {
            owner: repository.owner.login.clone(),
            name:  repository.name.clone(),
        },);
    }

    Ok([
        repository.name.clone(),
        repository.owner.login.clone(),
        repository.is_private.to_string(),
        repository.is_fork.to_string(),
        repository.is_archived.to_string(),
        repository.license_info.key.clone(),
        repository.primary_language.name.clone(),
    ],)
}

fn repository_value(repository: &RepositoryRecord, key: MetricKey,) -> Option<f64,>
{
    let value = match key {
        MetricKey::Stars => repository.stargazers.total_count,
        MetricKey::OpenIssues => repository.open_issues.total_count,
        MetricKey::Watchers => repository.watchers.total_count,
        MetricKey::Forks => repository.fork_count,
        MetricKey::Size => repository.disk_usage,
        MetricKey::OpenPullRequests => repository.open_pull_requests.total_count,
        MetricKey::ClosedIssues => repository.closed_issues.total_count,
        MetricKey::Limit | MetricKey::Remaining | MetricKey::Reset | MetricKey::QueryFailures => {
            return None;
        }
    };
    Some(value as f64,)
}

fn build(catalog: &MetricCatalog, key: MetricKey, value: f64, labels: Vec<String,>,) -> Option<Measurement,>
{
    match Measurement::new(catalog, key, value, labels,) {
        Ok(measurement,) => Some(measurement,),
        Err(error,) => {
            debug!("Dropping measurement: {}", error);
            None
        }
    }
}

fn repository_measurements<'a,>(
    repository: &'a RepositoryRecord,
    catalog: &'a MetricCatalog,
) -> impl Iterator<Item = Measurement,> + 'a
{
    let labels = match repository_labels(repository,) {
        Ok(labels,) => Some(labels,),
        Err(error,) => {
            debug!("Skipping repository: {}", error);
            None
        }
    };

    labels.into_iter().flat_map(move |labels| {
        MetricKey::REPOSITORY.into_iter().filter_map(move |key| {
            let value = repository_value(repository, key,)?;
            build(catalog, key, value, labels.to_vec(),)
        },)
    },)
}

/// Lazily projects a snapshot into measurements.
///
/// Repositories are visited in [`Snapshot::repositories`] order and each
/// one yields every repository-scoped gauge of [`MetricKey::REPOSITORY`].
/// The [`MetricKey::BUDGET`] gauges follow, read from the snapshot budget.
/// Duplicated repositories are emitted as many times as they occur.
///
/// # Examples
///
/// ```
/// use github_exporter::{MetricCatalog, Snapshot, project};
///
/// let catalog = MetricCatalog::new();
/// let snapshot = Snapshot::default();
/// let names: Vec<_> = project(&snapshot, &catalog,).map(|m| m.name).collect();
/// assert_eq!(names, ["github_rate_limit", "github_rate_remaining"]);
/// ```
pub fn project<'a,>(
    snapshot: &'a Snapshot,
    catalog: &'a MetricCatalog,
) -> impl Iterator<Item = Measurement,> + 'a
{
    let repositories =
        snapshot.repositories().flat_map(move |repository| repository_measurements(repository, catalog,),);

    let budget = MetricKey::BUDGET.into_iter().filter_map(move |key| {
        let value = match key {
            MetricKey::Limit => snapshot.budget.limit,
            _ => snapshot.budget.remaining,
        };
        build(catalog, key, value, Vec::new(),)
    },);

    repositories.chain(budget,)
}

/// Summarizes a failure ledger as one measurement per `(kind, reason)`
/// pair, sorted by label values.
///
/// Every [`EntityKind`] is paired with every [`QueryError::REASONS`] value,
/// so pairs without failures are emitted at zero.
pub fn project_failures(failures: &[FailureRecord], catalog: &MetricCatalog,) -> Vec<Measurement,>
{
    let mut groups: BTreeMap<(&'static str, &'static str,), u64,> = EntityKind::ALL
        .into_iter()
        .flat_map(|kind| QueryError::REASONS.into_iter().map(move |reason| ((kind.as_str(), reason,), 0,),),)
        .collect();
    for failure in failures {
        *groups.entry((failure.kind.as_str(), failure.reason,),).or_default() += 1;
    }

    groups
        .into_iter()
        .filter_map(|((kind, reason,), count,)| {
            build(catalog, MetricKey::QueryFailures, count as f64, vec![
                kind.to_owned(),
                reason.to_owned(),
            ],)
        },)
        .collect()
}

#[cfg(test)]
mod tests
{
    use proptest::prelude::*;

    use super::*;
    use crate::{
        orchestrator::EntityKind,
        schema::{
            License, OrganizationRecord, RateLimitBudget, RepositoryConnection, TotalCount,
            UserRecord,
        },
    };

    fn starred(owner: &str, name: &str, stars: u64, private: bool,) -> RepositoryRecord
    {
        RepositoryRecord {
            stargazers: TotalCount::new(stars,),
            is_private: private,
            ..RepositoryRecord::named(owner, name,)
        }
    }

    fn acme_snapshot() -> Snapshot
    {
        Snapshot {
            organizations: vec![OrganizationRecord {
                login: "acme".to_owned(),
                repositories: RepositoryConnection::from_nodes(vec![
                    starred("acme", "r1", 5, false,),
                    starred("acme", "r2", 0, true,),
                ],),
                ..OrganizationRecord::default()
            }],
            ..Snapshot::default()
        }
    }

    #[test]
    fn acme_scenario_emits_star_gauges_per_repository()
    {
        let catalog = MetricCatalog::new();
        let snapshot = acme_snapshot();

        let stars: Vec<_,> =
            project(&snapshot, &catalog,).filter(|m| m.key == MetricKey::Stars,).collect();

        assert_eq!(stars.len(), 2);
        assert_eq!(stars[0].value, 5.0);
        assert_eq!(stars[1].value, 0.0);
        assert!(stars.iter().all(|m| m.labels[1] == "acme"));
        assert_eq!(stars[0].labels[2], "false");
        assert_eq!(stars[1].labels[2], "true");
    }

    #[test]
    fn every_repository_emits_all_repository_gauges_then_budget()
    {
        let catalog = MetricCatalog::new();
        let mut snapshot = acme_snapshot();
        snapshot.budget = RateLimitBudget {
            limit: 5000.0, remaining: 4321.0, ..RateLimitBudget::default()
        };

        let measurements: Vec<_,> = project(&snapshot, &catalog,).collect();

        assert_eq!(measurements.len(), 2 * MetricKey::REPOSITORY.len() + 2);
        let keys: Vec<_,> = measurements.iter().take(7,).map(|m| m.key,).collect();
        assert_eq!(keys, MetricKey::REPOSITORY.to_vec());

        let tail = &measurements[measurements.len() - 2..];
        assert_eq!(tail[0].name, "github_rate_limit");
        assert_eq!(tail[0].value, 5000.0);
        assert_eq!(tail[1].name, "github_rate_remaining");
        assert_eq!(tail[1].value, 4321.0);
        assert!(tail.iter().all(|m| m.labels.is_empty()));
    }

    #[test]
    fn repository_gauges_read_matching_fields()
    {
        let catalog = MetricCatalog::new();
        let repository = RepositoryRecord {
            stargazers: TotalCount::new(1,),
            open_issues: TotalCount::new(2,),
            watchers: TotalCount::new(3,),
            fork_count: 4,
            disk_usage: 5,
            open_pull_requests: TotalCount::new(6,),
            closed_issues: TotalCount::new(7,),
            ..RepositoryRecord::named("o", "n",)
        };
        let snapshot = Snapshot {
            repositories: vec![repository],
            ..Snapshot::default()
        };

        let values: Vec<_,> = project(&snapshot, &catalog,).take(7,).map(|m| m.value,).collect();
        assert_eq!(values, vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0]);
    }

    #[test]
    fn labels_follow_fixed_order()
    {
        let repository = RepositoryRecord {
            is_fork: true,
            license_info: License {
                name: "MIT License".to_owned(), key: "mit".to_owned(),
            },
            primary_language: crate::schema::Language {
                name: "Rust".to_owned(),
            },
            ..RepositoryRecord::named("ferris", "crab",)
        };

        let labels = repository_labels(&repository,).expect("labels",);
        assert_eq!(labels, ["crab", "ferris", "false", "true", "false", "mit", "Rust"].map(String::from));
    }

    #[test]
    fn repositories_without_identity_are_skipped()
    {
        let catalog = MetricCatalog::new();
        let snapshot = Snapshot {
            repositories: vec![
                RepositoryRecord::named("", "orphan",),
                RepositoryRecord::named("acme", "",),
                starred("acme", "anvil", 9, false,),
            ],
            ..Snapshot::default()
        };

        let stars: Vec<_,> =
            project(&snapshot, &catalog,).filter(|m| m.key == MetricKey::Stars,).collect();
        assert_eq!(stars.len(), 1);
        assert_eq!(stars[0].labels[0], "anvil");
    }

    #[test]
    fn empty_snapshot_emits_budget_gauges_at_zero()
    {
        let catalog = MetricCatalog::new();
        let measurements: Vec<_,> = project(&Snapshot::default(), &catalog,).collect();

        assert_eq!(measurements.len(), 2);
        assert!(measurements.iter().all(|m| m.value == 0.0));
        assert_eq!(measurements[0].key, MetricKey::Limit);
        assert_eq!(measurements[1].key, MetricKey::Remaining);
    }

    #[test]
    fn duplicated_repositories_are_emitted_twice()
    {
        let catalog = MetricCatalog::new();
        let mut snapshot = acme_snapshot();
        snapshot.users.push(UserRecord {
            login: "acme".to_owned(),
            repositories: RepositoryConnection::from_nodes(vec![starred("acme", "r1", 5, false,)],),
            ..UserRecord::default()
        },);

        let r1: Vec<_,> = project(&snapshot, &catalog,)
            .filter(|m| m.key == MetricKey::Stars && m.labels[0] == "r1",)
            .collect();
        assert_eq!(r1.len(), 2);
        assert_eq!(r1[0], r1[1]);
    }

    #[test]
    fn measurement_rejects_wrong_label_count()
    {
        let catalog = MetricCatalog::new();
        let error = Measurement::new(&catalog, MetricKey::Stars, 1.0, vec!["only-one".to_owned()],)
            .expect_err("cardinality mismatch",);

        assert_eq!(error, ProjectionError::LabelCardinality {
            metric:   "github_repo_stars".to_owned(),
            expected: 7,
            actual:   1,
        });
    }

    #[test]
    fn measurement_rejects_non_finite_values()
    {
        let catalog = MetricCatalog::new();
        let error = Measurement::new(&catalog, MetricKey::Limit, f64::NAN, Vec::new(),)
            .expect_err("nan rejected",);
        assert!(matches!(error, ProjectionError::NonFinite { .. }));
    }

    #[test]
    fn failures_are_grouped_by_kind_and_reason()
    {
        let catalog = MetricCatalog::new();
        let failures = [
            FailureRecord::new(EntityKind::User, "ghost", "not_found",),
            FailureRecord::new(EntityKind::Organization, "acme", "timeout",),
            FailureRecord::new(EntityKind::User, "phantom", "not_found",),
        ];

        let measurements = project_failures(&failures, &catalog,);
        let count = |kind: &str, reason: &str| {
            measurements
                .iter()
                .find(|m| m.labels == [kind, reason])
                .map(|m| m.value)
        };

        assert_eq!(measurements.len(), EntityKind::ALL.len() * QueryError::REASONS.len());
        assert_eq!(count("organization", "timeout"), Some(1.0));
        assert_eq!(count("user", "not_found"), Some(2.0));
        assert_eq!(count("repository", "task"), Some(0.0));
        assert!(measurements.iter().all(|m| m.name == "github_exporter_query_failures"));
    }

    #[test]
    fn healthy_cycle_reports_zero_failures_for_every_pair()
    {
        let catalog = MetricCatalog::new();
        let measurements = project_failures(&[], &catalog,);

        assert_eq!(measurements.len(), 21);
        assert!(measurements.iter().all(|m| m.value == 0.0));
        let labels: Vec<_,> = measurements.iter().map(|m| m.labels.clone(),).collect();
        let mut sorted = labels.clone();
        sorted.sort();
        assert_eq!(labels, sorted);
    }

    proptest! {
        #[test]
        fn projection_is_idempotent(stars in proptest::collection::vec(0u64..10_000, 0..12), private in any::<bool>()) {
            let catalog = MetricCatalog::new();
            let snapshot = Snapshot {
                repositories: stars
                    .iter()
                    .enumerate()
                    .map(|(index, count)| starred("owner", &format!("repo-{index}"), *count, private))
                    .collect(),
                ..Snapshot::default()
            };

            let first: Vec<_> = project(&snapshot, &catalog).collect();
            let second: Vec<_> = project(&snapshot, &catalog).collect();
            prop_assert_eq!(&first, &second);
            prop_assert_eq!(first.len(), stars.len() * 7 + 2);
        }

        #[test]
        fn repository_labels_always_have_seven_values(archived in any::<bool>(), fork in any::<bool>()) {
            let repository = RepositoryRecord {
                is_archived: archived,
                is_fork: fork,
                ..RepositoryRecord::named("o", "n")
            };
            let labels = repository_labels(&repository).expect("labels");
            prop_assert_eq!(labels.len(), 7);
            prop_assert!(labels[2..5].iter().all(|value| value == "true" || value == "false"));
        }
    }
}
