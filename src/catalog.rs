// SPDX-FileCopyrightText: 2025 RAprogramm <andrey.rozanov.vl@gmail.com>
// SPDX-License-Identifier: MIT

//! Static registry of metric descriptors.
//!
//! The catalog is built once at startup and passed by reference to the
//! projector and the exposition layer. Nothing mutates it afterwards, so
//! shared reads need no synchronization.

use std::{collections::BTreeMap, fmt};

const NAMESPACE: &str = "github";

/// Label names attached to every repository-scoped gauge, in order.
pub const REPOSITORY_LABELS: [&str; 7] =
    ["repo", "user", "private", "fork", "archived", "license", "language",];

/// Label names attached to the query failure gauge.
pub const FAILURE_LABELS: [&str; 2] = ["kind", "reason",];

/// Identifies a metric in the [`MetricCatalog`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord,)]
pub enum MetricKey
{
    Stars,
    OpenIssues,
    Watchers,
    Forks,
    Size,
    OpenPullRequests,
    ClosedIssues,
    Limit,
    Remaining,
    Reset,
    QueryFailures,
}

impl MetricKey
{
    /// Repository-scoped gauges in emission order.
    pub const REPOSITORY: [MetricKey; 7] = [
        MetricKey::Stars,
        MetricKey::OpenIssues,
        MetricKey::Watchers,
        MetricKey::Forks,
        MetricKey::Size,
        MetricKey::OpenPullRequests,
        MetricKey::ClosedIssues,
    ];

    /// Budget gauges emitted for every snapshot. [`MetricKey::Reset`] is
    /// described in the catalog but not part of this list.
    pub const BUDGET: [MetricKey; 2] = [MetricKey::Limit, MetricKey::Remaining,];
}

impl fmt::Display for MetricKey
{
    fn fmt(&self, f: &mut fmt::Formatter<'_,>,) -> fmt::Result
    {
        fmt::Debug::fmt(self, f,)
    }
}

/// Name, help text and label schema of one metric.
#[derive(Debug, Clone, PartialEq, Eq,)]
pub struct MetricDescriptor
{
    name:   String,
    help:   &'static str,
    labels: Vec<&'static str,>,
}

impl MetricDescriptor
{
    fn new(subsystem: &str, name: &str, help: &'static str, labels: &[&'static str],) -> Self
    {
        Self {
            name: fq_name(NAMESPACE, subsystem, name,), help, labels: labels.to_vec(),
        }
    }

    /// Fully-qualified metric name, e.g. `github_repo_stars`.
    pub fn name(&self,) -> &str
    {
        &self.name
    }

    pub fn help(&self,) -> &'static str
    {
        self.help
    }

    /// Ordered label names.
    pub fn labels(&self,) -> &[&'static str]
    {
        &self.labels
    }
}

/// Joins the non-empty name parts with underscores.
///
/// # Examples
///
/// ```
/// use github_exporter::fq_name;
///
/// assert_eq!(fq_name("github", "rate", "limit",), "github_rate_limit");
/// assert_eq!(fq_name("github", "", "up",), "github_up");
/// ```
pub fn fq_name(namespace: &str, subsystem: &str, name: &str,) -> String
{
    [namespace, subsystem, name,]
        .into_iter()
        .filter(|part| !part.is_empty(),)
        .collect::<Vec<_,>>()
        .join("_",)
}

/// Immutable mapping from [`MetricKey`] to [`MetricDescriptor`].
#[derive(Debug, Clone, PartialEq, Eq,)]
pub struct MetricCatalog
{
    descriptors: BTreeMap<MetricKey, MetricDescriptor,>,
}

impl MetricCatalog
{
    /// Builds the catalog with every metric the exporter knows about.
    pub fn new() -> Self
    {
        let repository = |name, help| MetricDescriptor::new("repo", name, help, &REPOSITORY_LABELS,);
        let rate = |name, help| MetricDescriptor::new("rate", name, help, &[],);

        let descriptors = BTreeMap::from([
            (MetricKey::Stars, repository("stars", "Total number of Stars for given repository",),),
            (
                MetricKey::OpenIssues,
                repository("open_issues", "Total number of open issues for given repository",),
            ),
            (
                MetricKey::Watchers,
                repository("watchers", "Total number of watchers/subscribers for given repository",),
            ),
            (MetricKey::Forks, repository("forks", "Total number of forks for given repository",),),
            (MetricKey::Size, repository("size_kb", "Size in KB for given repository",),),
            (
                MetricKey::OpenPullRequests,
                repository(
                    "open_pull_requests",
                    "Total number of open pull requests for given repository",
                ),
            ),
            (
                MetricKey::ClosedIssues,
                repository("closed_issues", "Total number of closed issues for given repository",),
            ),
            (
                MetricKey::Limit,
                rate("limit", "Number of API queries allowed in a 60 minute window",),
            ),
            (
                MetricKey::Remaining,
                rate("remaining", "Number of API queries remaining in the current window",),
            ),
            (
                MetricKey::Reset,
                rate(
                    "reset",
                    "The time at which the current rate limit window resets in UTC epoch seconds",
                ),
            ),
            (
                MetricKey::QueryFailures,
                MetricDescriptor::new(
                    "exporter",
                    "query_failures",
                    "Number of failed queries in the last collection cycle",
                    &FAILURE_LABELS,
                ),
            ),
        ],);

        Self {
            descriptors,
        }
    }

    /// Looks up the descriptor registered for `key`.
    pub fn get(&self, key: MetricKey,) -> Option<&MetricDescriptor,>
    {
        self.descriptors.get(&key,)
    }

    /// Iterates over all descriptors in key order.
    pub fn iter(&self,) -> impl Iterator<Item = (MetricKey, &MetricDescriptor,),> + '_
    {
        self.descriptors.iter().map(|(key, descriptor,)| (*key, descriptor,),)
    }

    pub fn len(&self,) -> usize
    {
        self.descriptors.len()
    }

    pub fn is_empty(&self,) -> bool
    {
        self.descriptors.is_empty()
    }
}

impl Default for MetricCatalog
{
    fn default() -> Self
    {
        Self::new()
    }
}

#[cfg(test)]
mod tests
{
    use super::*;

    #[test]
    fn catalog_describes_every_key()
    {
        let catalog = MetricCatalog::new();
        let keys = MetricKey::REPOSITORY
            .into_iter()
            .chain(MetricKey::BUDGET,)
            .chain([MetricKey::Reset, MetricKey::QueryFailures,],);

        for key in keys {
            assert!(catalog.get(key).is_some(), "missing descriptor for {key}");
        }
        assert_eq!(catalog.len(), 11);
    }

    #[test]
    fn repository_gauges_share_label_schema()
    {
        let catalog = MetricCatalog::new();
        for key in MetricKey::REPOSITORY {
            let descriptor = catalog.get(key,).expect("descriptor",);
            assert_eq!(descriptor.labels(), REPOSITORY_LABELS.as_slice());
            assert!(descriptor.name().starts_with("github_repo_"));
        }
    }

    #[test]
    fn budget_gauges_have_no_labels()
    {
        let catalog = MetricCatalog::new();
        let limit = catalog.get(MetricKey::Limit,).expect("limit",);
        let reset = catalog.get(MetricKey::Reset,).expect("reset",);

        assert_eq!(limit.name(), "github_rate_limit");
        assert!(limit.labels().is_empty());
        assert_eq!(reset.name(), "github_rate_reset");
    }

    #[test]
    fn failure_gauge_uses_exporter_subsystem()
    {
        let catalog = MetricCatalog::new();
        let failures = catalog.get(MetricKey::QueryFailures,).expect("failures",);
        assert_eq!(failures.name(), "github_exporter_query_failures");
        assert_eq!(failures.labels(), FAILURE_LABELS.as_slice());
    }

    #[test]
    fn stars_descriptor_name_and_help()
    {
        let catalog = MetricCatalog::new();
        let stars = catalog.get(MetricKey::Stars,).expect("stars",);
        assert_eq!(stars.name(), "github_repo_stars");
        assert_eq!(stars.help(), "Total number of Stars for given repository");
    }
}
