// SPDX-FileCopyrightText: 2025 RAprogramm <andrey.rozanov.vl@gmail.com>
// SPDX-License-Identifier: MIT

//! Result of a single collection cycle.

use std::collections::HashSet;

use crate::schema::{OrganizationRecord, RateLimitBudget, RepositoryRecord, UserRecord};

/// Everything gathered during one collection cycle.
///
/// A snapshot is built by [`crate::gather`] and handed to the projector by
/// value or shared reference once every query has finished. It is never
/// persisted; the next cycle builds a fresh one.
#[derive(Debug, Clone, Default, PartialEq,)]
pub struct Snapshot
{
    /// Budget reported by the last merged successful query.
    pub budget:        RateLimitBudget,
    pub organizations: Vec<OrganizationRecord,>,
    pub users:         Vec<UserRecord,>,
    /// Directly configured repositories.
    pub repositories:  Vec<RepositoryRecord,>,
}

impl Snapshot
{
    /// Iterates over every repository in projection order: repositories
    /// nested under organizations, then under users, then the directly
    /// configured ones.
    pub fn repositories(&self,) -> impl Iterator<Item = &RepositoryRecord,> + '_
    {
        self.organizations
            .iter()
            .flat_map(|organization| organization.repositories.nodes.iter(),)
            .chain(self.users.iter().flat_map(|user| user.repositories.nodes.iter(),),)
            .chain(self.repositories.iter(),)
    }

    /// Returns `true` when no entity was collected.
    pub fn is_empty(&self,) -> bool
    {
        self.organizations.is_empty() && self.users.is_empty() && self.repositories.is_empty()
    }

    /// Drops repeated `(owner, name)` repositories.
    ///
    /// The first occurrence in projection order wins, so a repository that
    /// is both nested under its organization and configured directly keeps
    /// the nested copy. Collections are otherwise untouched.
    ///
    /// # Examples
    ///
    /// ```
    /// use github_exporter::{OrganizationRecord, RepositoryConnection, RepositoryRecord, Snapshot};
    ///
    /// let snapshot = Snapshot {
    ///     organizations: vec![OrganizationRecord {
    ///         login: "acme".to_owned(),
    ///         repositories: RepositoryConnection::from_nodes(vec![RepositoryRecord::named(
    ///             "acme", "anvil",
    ///         )]),
    ///         ..OrganizationRecord::default()
    ///     }],
    ///     repositories: vec![RepositoryRecord::named("acme", "anvil",)],
    ///     ..Snapshot::default()
    /// };
    ///
    /// let deduplicated = snapshot.deduplicated();
    /// assert_eq!(deduplicated.repositories().count(), 1);
    /// assert!(deduplicated.repositories.is_empty());
    /// ```
    pub fn deduplicated(mut self,) -> Self
    {
        let mut seen: HashSet<(String, String,),> = HashSet::new();
        let mut first_sighting = |record: &RepositoryRecord| {
            seen.insert((record.owner.login.clone(), record.name.clone(),),)
        };

        for organization in &mut self.organizations {
            organization.repositories.nodes.retain(&mut first_sighting,);
        }
        for user in &mut self.users {
            user.repositories.nodes.retain(&mut first_sighting,);
        }
        self.repositories.retain(&mut first_sighting,);

        self
    }
}

#[cfg(test)]
mod tests
{
    use super::*;
    use crate::schema::RepositoryConnection;

    fn organization(login: &str, repositories: &[&str],) -> OrganizationRecord
    {
        OrganizationRecord {
            login: login.to_owned(),
            repositories: RepositoryConnection::from_nodes(
                repositories.iter().map(|name| RepositoryRecord::named(login, name,),).collect(),
            ),
            ..OrganizationRecord::default()
        }
    }

    fn user(login: &str, repositories: &[&str],) -> UserRecord
    {
        UserRecord {
            login: login.to_owned(),
            repositories: RepositoryConnection::from_nodes(
                repositories.iter().map(|name| RepositoryRecord::named(login, name,),).collect(),
            ),
            ..UserRecord::default()
        }
    }

    #[test]
    fn repositories_follow_group_order()
    {
        let snapshot = Snapshot {
            organizations: vec![organization("acme", &["anvil", "rocket"],)],
            users: vec![user("wile", &["trap"],)],
            repositories: vec![RepositoryRecord::named("road", "runner",)],
            ..Snapshot::default()
        };

        let keys: Vec<_,> = snapshot.repositories().map(RepositoryRecord::key,).collect();
        assert_eq!(keys, vec![
            ("acme", "anvil"),
            ("acme", "rocket"),
            ("wile", "trap"),
            ("road", "runner"),
        ]);
    }

    #[test]
    fn default_snapshot_is_empty()
    {
        let snapshot = Snapshot::default();
        assert!(snapshot.is_empty());
        assert_eq!(snapshot.repositories().count(), 0);
        assert_eq!(snapshot.budget, RateLimitBudget::default());
    }

    #[test]
    fn duplicates_survive_without_deduplication()
    {
        let snapshot = Snapshot {
            organizations: vec![organization("acme", &["anvil"],)],
            repositories: vec![RepositoryRecord::named("acme", "anvil",)],
            ..Snapshot::default()
        };

        assert_eq!(snapshot.repositories().count(), 2);
    }

    #[test]
    fn deduplication_keeps_first_occurrence_across_groups()
    {
        let snapshot = Snapshot {
            organizations: vec![organization("acme", &["anvil", "rocket"],)],
            users: vec![user("acme", &["rocket", "glue"],)],
            repositories: vec![
                RepositoryRecord::named("acme", "anvil",),
                RepositoryRecord::named("road", "runner",),
            ],
            ..Snapshot::default()
        }
        .deduplicated();

        let keys: Vec<_,> = snapshot.repositories().map(RepositoryRecord::key,).collect();
        assert_eq!(keys, vec![
            ("acme", "anvil"),
            ("acme", "rocket"),
            ("acme", "glue"),
            ("road", "runner"),
        ]);
        assert_eq!(snapshot.organizations.len(), 1);
        assert_eq!(snapshot.users.len(), 1);
    }
}
