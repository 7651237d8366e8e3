// SPDX-FileCopyrightText: 2025 RAprogramm <andrey.rozanov.vl@gmail.com>
// SPDX-License-Identifier: MIT

//! Typed records returned by the GitHub GraphQL API.
//!
//! Field names follow the camelCase shape of the GraphQL response so the
//! records deserialize directly from the `data` object. Objects that GitHub
//! reports as `null` (a missing license, an empty primary language) collapse
//! into their default value, which keeps label derivation free of `Option`
//! handling.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

/// Deserializes `null` as the default value of `T`.
fn null_as_default<'de, D, T,>(deserializer: D,) -> Result<T, D::Error,>
where
    D: Deserializer<'de,>,
    T: Default + Deserialize<'de,>,
{
    Ok(Option::<T,>::deserialize(deserializer,)?.unwrap_or_default(),)
}

/// Rate-limit accounting returned alongside every GraphQL query.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize,)]
#[serde(rename_all = "camelCase")]
pub struct RateLimitBudget
{
    /// Points charged for the query that produced this value.
    #[serde(default)]
    pub cost:       f64,
    /// Points available per rolling window.
    #[serde(default)]
    pub limit:      f64,
    /// Nodes touched by the query.
    #[serde(default)]
    pub node_count: f64,
    /// Points left in the current window.
    #[serde(default)]
    pub remaining:  f64,
    /// Moment the window resets.
    #[serde(default)]
    pub reset_at:   Option<DateTime<Utc,>,>,
}

/// GraphQL `{ totalCount }` connection summary.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize,)]
#[serde(rename_all = "camelCase")]
pub struct TotalCount
{
    #[serde(default)]
    pub total_count: u64,
}

impl TotalCount
{
    pub fn new(total_count: u64,) -> Self
    {
        Self {
            total_count,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize,)]
#[serde(rename_all = "camelCase")]
pub struct PageInfo
{
    #[serde(default)]
    pub has_next_page: bool,
    #[serde(default, deserialize_with = "null_as_default")]
    pub end_cursor:    String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize,)]
pub struct Owner
{
    pub login: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize,)]
pub struct License
{
    #[serde(default, deserialize_with = "null_as_default")]
    pub name: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub key:  String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize,)]
pub struct Language
{
    #[serde(default, deserialize_with = "null_as_default")]
    pub name: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize,)]
pub struct LanguageEdge
{
    #[serde(default)]
    pub size: u64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub node: Language,
}

/// Language breakdown ordered by size, largest first.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize,)]
#[serde(rename_all = "camelCase")]
pub struct LanguageConnection
{
    #[serde(default)]
    pub total_count: u64,
    #[serde(default)]
    pub total_size:  u64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub edges:       Vec<LanguageEdge,>,
}

/// Metadata describing a single repository.
///
/// The identity of a record is the `(owner.login, name)` pair. The same
/// repository may appear several times in one snapshot: once nested under
/// its owner and once more when it is configured directly.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize,)]
#[serde(rename_all = "camelCase")]
pub struct RepositoryRecord
{
    #[serde(default)]
    pub owner:                  Owner,
    #[serde(default)]
    pub name:                   String,
    #[serde(default)]
    pub name_with_owner:        String,
    #[serde(default)]
    pub id:                     String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub description:            String,
    #[serde(default)]
    pub url:                    String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub homepage_url:           String,
    /// Disk usage in kilobytes.
    #[serde(default, deserialize_with = "null_as_default")]
    pub disk_usage:             u64,
    #[serde(default)]
    pub updated_at:             Option<DateTime<Utc,>,>,
    #[serde(default)]
    pub fork_count:             u64,
    #[serde(default)]
    pub stargazers:             TotalCount,
    #[serde(default)]
    pub watchers:               TotalCount,
    #[serde(default)]
    pub releases:               TotalCount,
    #[serde(default, deserialize_with = "null_as_default")]
    pub labels:                 TotalCount,
    #[serde(default)]
    pub repository_topics:      TotalCount,
    #[serde(default)]
    pub open_issues:            TotalCount,
    #[serde(default)]
    pub closed_issues:          TotalCount,
    #[serde(default)]
    pub open_pull_requests:     TotalCount,
    #[serde(default)]
    pub closed_pull_requests:   TotalCount,
    #[serde(default)]
    pub merged_pull_requests:   TotalCount,
    #[serde(default)]
    pub open_milestones:        TotalCount,
    #[serde(default)]
    pub closed_milestones:      TotalCount,
    #[serde(default)]
    pub is_archived:            bool,
    #[serde(default)]
    pub is_private:             bool,
    #[serde(default)]
    pub is_fork:                bool,
    #[serde(default)]
    pub is_locked:              bool,
    #[serde(default)]
    pub is_mirror:              bool,
    #[serde(default)]
    pub has_issues_enabled:     bool,
    #[serde(default)]
    pub has_wiki_enabled:       bool,
    #[serde(default, deserialize_with = "null_as_default")]
    pub license_info:           License,
    #[serde(default, deserialize_with = "null_as_default")]
    pub primary_language:       Language,
    #[serde(default, deserialize_with = "null_as_default")]
    pub languages:              LanguageConnection,
}

impl RepositoryRecord
{
    /// Creates an otherwise empty record carrying only its identity.
    ///
    /// # Examples
    ///
    /// ```
    /// use github_exporter::RepositoryRecord;
    ///
    /// let record = RepositoryRecord::named("rust-lang", "rust",);
    /// assert_eq!(record.name_with_owner, "rust-lang/rust");
    /// ```
    pub fn named(owner: &str, name: &str,) -> Self
    {
        Self {
            owner: Owner {
                login: owner.to_owned(),
            },
            name: name.to_owned(),
            name_with_owner: format!("{owner}/{name}"),
            ..Self::default()
        }
    }

    /// Returns the `(owner, name)` identity key.
    pub fn key(&self,) -> (&str, &str,)
    {
        (self.owner.login.as_str(), self.name.as_str(),)
    }
}

/// Page of repositories nested under a user or organization.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize,)]
#[serde(rename_all = "camelCase")]
pub struct RepositoryConnection
{
    #[serde(default)]
    pub total_count: u64,
    #[serde(default)]
    pub page_info:   PageInfo,
    #[serde(default, deserialize_with = "null_as_default")]
    pub nodes:       Vec<RepositoryRecord,>,
}

impl RepositoryConnection
{
    pub fn from_nodes(nodes: Vec<RepositoryRecord,>,) -> Self
    {
        Self {
            total_count: nodes.len() as u64,
            page_info: PageInfo::default(),
            nodes,
        }
    }
}

/// Aggregate contribution totals for a user.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize,)]
#[serde(rename_all = "camelCase")]
pub struct ContributionsCollection
{
    #[serde(default)]
    pub total_issue_contributions: u64,
    #[serde(default)]
    pub total_commit_contributions: u64,
    #[serde(default)]
    pub total_repository_contributions: u64,
    #[serde(default)]
    pub total_pull_request_contributions: u64,
    #[serde(default)]
    pub total_pull_request_review_contributions: u64,
    #[serde(default)]
    pub total_repositories_with_contributed_issues: u64,
    #[serde(default)]
    pub total_repositories_with_contributed_commits: u64,
    #[serde(default)]
    pub total_repositories_with_contributed_pull_requests: u64,
}

/// Metadata describing a user account and its most recently updated
/// repositories.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize,)]
#[serde(rename_all = "camelCase")]
pub struct UserRecord
{
    #[serde(default, deserialize_with = "null_as_default")]
    pub name:                     String,
    pub login:                    String,
    #[serde(default)]
    pub id:                       String,
    #[serde(default)]
    pub contributions_collection: ContributionsCollection,
    #[serde(default)]
    pub commit_comments:          TotalCount,
    #[serde(default)]
    pub issue_comments:           TotalCount,
    #[serde(default)]
    pub gist_comments:            TotalCount,
    #[serde(default)]
    pub gists:                    TotalCount,
    #[serde(default)]
    pub open_issues:              TotalCount,
    #[serde(default)]
    pub closed_issues:            TotalCount,
    #[serde(default)]
    pub open_pull_requests:       TotalCount,
    #[serde(default)]
    pub closed_pull_requests:     TotalCount,
    #[serde(default)]
    pub merged_pull_requests:     TotalCount,
    #[serde(default)]
    pub followers:                TotalCount,
    #[serde(default)]
    pub following:                TotalCount,
    #[serde(default)]
    pub starred_repositories:     TotalCount,
    #[serde(default)]
    pub repositories:             RepositoryConnection,
}

/// Metadata describing an organization and a page of its repositories.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize,)]
#[serde(rename_all = "camelCase")]
pub struct OrganizationRecord
{
    #[serde(default, deserialize_with = "null_as_default")]
    pub name:              String,
    pub login:             String,
    #[serde(default)]
    pub id:                String,
    #[serde(default)]
    pub members_with_role: TotalCount,
    #[serde(default)]
    pub teams:             TotalCount,
    #[serde(default, rename = "projectsV2")]
    pub projects:          TotalCount,
    #[serde(default)]
    pub repositories:      RepositoryConnection,
}
