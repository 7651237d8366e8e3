// SPDX-FileCopyrightText: 2025 RAprogramm <andrey.rozanov.vl@gmail.com>
// SPDX-License-Identifier: MIT

//! GitHub GraphQL implementation of [`RemoteQueryClient`].
//!
//! Each query is a single GraphQL document that returns the entity together
//! with the caller's `rateLimit` accounting. Attempts are bounded by a
//! timeout and transient failures are retried with exponential backoff.

use std::{fmt, time::Duration};

use octocrab::Octocrab;
use serde::{Deserialize, de::DeserializeOwned};
use serde_json::{Value, json};
use tracing::debug;

use crate::{
    client::{Fetched, PageSizes, RemoteQueryClient, RepositoryRef},
    error::{Error, QueryError},
    retry::{RetryConfig, retry_with_backoff},
    schema::{OrganizationRecord, RateLimitBudget, RepositoryRecord, UserRecord},
};

/// Public GitHub API endpoint.
pub const DEFAULT_API_URL: &str = "https://api.github.com";
/// Per-attempt timeout applied when none is configured.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(15,);

macro_rules! repository_fields {
    () => {
        r#"
fragment RepositoryFields on Repository {
  owner { login }
  name
  nameWithOwner
  id
  description
  url
  homepageUrl
  diskUsage
  updatedAt
  forkCount
  stargazers { totalCount }
  watchers { totalCount }
  releases { totalCount }
  labels { totalCount }
  repositoryTopics { totalCount }
  openIssues: issues(states: OPEN) { totalCount }
  closedIssues: issues(states: CLOSED) { totalCount }
  openPullRequests: pullRequests(states: OPEN) { totalCount }
  closedPullRequests: pullRequests(states: CLOSED) { totalCount }
  mergedPullRequests: pullRequests(states: MERGED) { totalCount }
  openMilestones: milestones(states: OPEN) { totalCount }
  closedMilestones: milestones(states: CLOSED) { totalCount }
  isArchived
  isPrivate
  isFork
  isLocked
  isMirror
  hasIssuesEnabled
  hasWikiEnabled
  licenseInfo { name key }
  primaryLanguage { name }
  languages(first: $languageCount, orderBy: {field: SIZE, direction: DESC}) {
    totalCount
    totalSize
    edges { size node { name } }
  }
}
"#
    };
}

const ORGANIZATION_QUERY: &str = concat!(
    r#"
query OrganizationMetrics($login: String!, $repoCount: Int!, $languageCount: Int!) {
  rateLimit { cost limit nodeCount remaining resetAt }
  organization(login: $login) {
    name
    login
    id
    membersWithRole { totalCount }
    teams { totalCount }
    projectsV2 { totalCount }
    repositories(first: $repoCount) {
      totalCount
      pageInfo { hasNextPage endCursor }
      nodes { ...RepositoryFields }
    }
  }
}
"#,
    repository_fields!()
);

const USER_QUERY: &str = concat!(
    r#"
query UserMetrics($login: String!, $repoCount: Int!, $languageCount: Int!) {
  rateLimit { cost limit nodeCount remaining resetAt }
  user(login: $login) {
    name
    login
    id
    contributionsCollection {
      totalIssueContributions
      totalCommitContributions
      totalRepositoryContributions
      totalPullRequestContributions
      totalPullRequestReviewContributions
      totalRepositoriesWithContributedIssues
      totalRepositoriesWithContributedCommits
      totalRepositoriesWithContributedPullRequests
    }
    commitComments { totalCount }
    issueComments { totalCount }
    gistComments { totalCount }
    gists { totalCount }
    openIssues: issues(states: OPEN) { totalCount }
    closedIssues: issues(states: CLOSED) { totalCount }
    openPullRequests: pullRequests(states: OPEN) { totalCount }
    closedPullRequests: pullRequests(states: CLOSED) { totalCount }
    mergedPullRequests: pullRequests(states: MERGED) { totalCount }
    followers { totalCount }
    following { totalCount }
    starredRepositories { totalCount }
    repositories(first: $repoCount, orderBy: {field: UPDATED_AT, direction: DESC}) {
      totalCount
      pageInfo { hasNextPage endCursor }
      nodes { ...RepositoryFields }
    }
  }
}
"#,
    repository_fields!()
);

const REPOSITORY_QUERY: &str = concat!(
    r#"
query RepositoryMetrics($owner: String!, $name: String!, $languageCount: Int!) {
  rateLimit { cost limit nodeCount remaining resetAt }
  repository(owner: $owner, name: $name) { ...RepositoryFields }
}
"#,
    repository_fields!()
);

/// GraphQL response envelope.
#[derive(Debug, Deserialize,)]
struct Envelope<D,>
{
    data:   Option<D,>,
    #[serde(default)]
    errors: Vec<GraphqlError,>,
}

#[derive(Debug, Deserialize,)]
struct GraphqlError
{
    #[serde(default)]
    message: String,
    #[serde(default, rename = "type")]
    kind:    Option<String,>,
}

/// `data` object of a query: the budget plus a nullable entity.
trait Payload: DeserializeOwned
{
    type Record;

    fn into_parts(self,) -> (Option<RateLimitBudget,>, Option<Self::Record,>,);
}

#[derive(Debug, Deserialize,)]
#[serde(rename_all = "camelCase")]
struct OrganizationData
{
    rate_limit:   Option<RateLimitBudget,>,
    organization: Option<OrganizationRecord,>,
}

#[derive(Debug, Deserialize,)]
#[serde(rename_all = "camelCase")]
struct UserData
{
    rate_limit: Option<RateLimitBudget,>,
    user:       Option<UserRecord,>,
}

#[derive(Debug, Deserialize,)]
#[serde(rename_all = "camelCase")]
struct RepositoryData
{
    rate_limit: Option<RateLimitBudget,>,
    repository: Option<RepositoryRecord,>,
}

impl Payload for OrganizationData
{
    type Record = OrganizationRecord;

    fn into_parts(self,) -> (Option<RateLimitBudget,>, Option<OrganizationRecord,>,)
    {
        (self.rate_limit, self.organization,)
    }
}

impl Payload for UserData
{
    type Record = UserRecord;

    fn into_parts(self,) -> (Option<RateLimitBudget,>, Option<UserRecord,>,)
    {
        (self.rate_limit, self.user,)
    }
}

impl Payload for RepositoryData
{
    type Record = RepositoryRecord;

    fn into_parts(self,) -> (Option<RateLimitBudget,>, Option<RepositoryRecord,>,)
    {
        (self.rate_limit, self.repository,)
    }
}

/// Decodes a raw GraphQL response into a record and its budget.
fn decode<P: Payload,>(entity: &str, response: Value,) -> Result<Fetched<P::Record,>, QueryError,>
{
    let envelope: Envelope<P,> = serde_json::from_value(response,).map_err(|error| {
        QueryError::Malformed {
            entity: entity.to_owned(), message: error.to_string(),
        }
    },)?;

    let messages = || {
        envelope.errors.iter().map(|error| error.message.as_str(),).collect::<Vec<_,>>().join("; ",)
    };

    let Some(data,) = envelope.data else {
        if envelope.errors.is_empty() {
            return Err(QueryError::Malformed {
                entity: entity.to_owned(), message: "response carries no data".to_owned(),
            },);
        }
        return Err(QueryError::Graphql {
            entity: entity.to_owned(), message: messages(),
        },);
    };

    match data.into_parts() {
        (budget, Some(record,),) => Ok(Fetched::new(record, budget.unwrap_or_default(),),),
        (_, None,)
            if envelope.errors.is_empty()
                || envelope.errors.iter().any(|error| error.kind.as_deref() == Some("NOT_FOUND"),) =>
        {
            Err(QueryError::NotFound {
                entity: entity.to_owned(),
            },)
        }
        (_, None,) => Err(QueryError::Graphql {
            entity: entity.to_owned(), message: messages(),
        },),
    }
}

/// Maps an octocrab failure onto the query failure taxonomy.
fn classify(entity: &str, error: octocrab::Error,) -> QueryError
{
    match &error {
        octocrab::Error::GitHub {
            source, ..
        } if matches!(source.status_code.as_u16(), 401 | 403) => QueryError::Unauthorized {
            entity: entity.to_owned(), message: error.to_string(),
        },
        octocrab::Error::Serde {
            ..
        }
        | octocrab::Error::Json {
            ..
        } => QueryError::Malformed {
            entity: entity.to_owned(), message: error.to_string(),
        },
        _ => QueryError::Transport {
            entity: entity.to_owned(), message: error.to_string(),
        },
    }
}

/// Authenticated GraphQL client bound to one API endpoint.
#[derive(Clone,)]
pub struct GitHubClient
{
    octocrab: Octocrab,
    timeout:  Duration,
    retry:    RetryConfig,
}

impl fmt::Debug for GitHubClient
{
    fn fmt(&self, f: &mut fmt::Formatter<'_,>,) -> fmt::Result
    {
        f.debug_struct("GitHubClient",)
            .field("timeout", &self.timeout,)
            .field("retry", &self.retry,)
            .finish_non_exhaustive()
    }
}

impl GitHubClient
{
    /// Builds a client for `api_url`, optionally authenticated with a
    /// personal access token.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Validation`] when the URL cannot be parsed and
    /// [`Error::Service`] when the HTTP client cannot be initialized.
    pub fn new(
        api_url: &str,
        token: Option<&str,>,
        timeout: Duration,
        retry: RetryConfig,
    ) -> Result<Self, Error,>
    {
        let mut builder = Octocrab::builder()
            .base_uri(api_url,)
            .map_err(|e| Error::validation(format!("invalid API URL '{api_url}': {e}"),),)?;
        if let Some(token,) = token {
            builder = builder.personal_token(token.to_owned(),);
        }
        let octocrab = builder
            .build()
            .map_err(|e| Error::service(format!("failed to initialize GitHub client: {e}"),),)?;

        Ok(Self {
            octocrab, timeout, retry,
        },)
    }

    async fn query<P: Payload,>(
        &self,
        entity: &str,
        document: &'static str,
        variables: Value,
    ) -> Result<Fetched<P::Record,>, QueryError,>
    {
        let payload = json!({ "query": document, "variables": variables });
        debug!("Querying {}", entity);

        retry_with_backoff(&self.retry, &format!("query for {entity}"), || {
            self.attempt::<P,>(entity, &payload,)
        },)
        .await
    }

    async fn attempt<P: Payload,>(&self, entity: &str, payload: &Value,) -> Result<Fetched<P::Record,>, QueryError,>
    {
        let response = tokio::time::timeout(self.timeout, self.octocrab.graphql::<Value,>(payload,),)
            .await
            .map_err(|_| QueryError::Timeout {
                entity: entity.to_owned(), seconds: self.timeout.as_secs(),
            },)?
            .map_err(|error| classify(entity, error,),)?;

        decode::<P,>(entity, response,)
    }
}

impl RemoteQueryClient for GitHubClient
{
    async fn query_organization(
        &self,
        login: &str,
        pages: PageSizes,
    ) -> Result<Fetched<OrganizationRecord,>, QueryError,>
    {
        let variables = json!({
            "login": login,
            "repoCount": pages.repositories,
            "languageCount": pages.languages,
        });
        self.query::<OrganizationData,>(&format!("organization {login}"), ORGANIZATION_QUERY, variables,)
            .await
    }

    async fn query_user(&self, login: &str, pages: PageSizes,) -> Result<Fetched<UserRecord,>, QueryError,>
    {
        let variables = json!({
            "login": login,
            "repoCount": pages.repositories,
            "languageCount": pages.languages,
        });
        self.query::<UserData,>(&format!("user {login}"), USER_QUERY, variables,).await
    }

    async fn query_repository(
        &self,
        repository: &RepositoryRef,
        pages: PageSizes,
    ) -> Result<Fetched<RepositoryRecord,>, QueryError,>
    {
        let variables = json!({
            "owner": repository.owner,
            "name": repository.name,
            "languageCount": pages.languages,
        });
        self.query::<RepositoryData,>(&format!("repository {repository}"), REPOSITORY_QUERY, variables,)
            .await
    }
}

#[cfg(test)]
mod tests
{
    use super::*;

    #[test]
    fn documents_include_repository_fragment()
    {
        for document in [ORGANIZATION_QUERY, USER_QUERY, REPOSITORY_QUERY,] {
            assert!(document.contains("fragment RepositoryFields on Repository"));
            assert!(document.contains("...RepositoryFields"));
            assert!(document.contains("rateLimit { cost limit nodeCount remaining resetAt }"));
        }
        assert!(USER_QUERY.contains("orderBy: {field: UPDATED_AT, direction: DESC}"));
        assert!(!REPOSITORY_QUERY.contains("$repoCount"));
    }

    #[test]
    fn decode_returns_record_and_budget()
    {
        let response = json!({
            "data": {
                "rateLimit": {"cost": 1, "limit": 5000, "nodeCount": 20, "remaining": 4999, "resetAt": "2024-05-01T11:00:00Z"},
                "user": {"login": "octocat", "name": "The Octocat", "repositories": {"totalCount": 1, "nodes": [
                    {"owner": {"login": "octocat"}, "name": "hello-world", "stargazers": {"totalCount": 3}}
                ]}}
            }
        });

        let fetched = decode::<UserData,>("user octocat", response,).expect("decoded user",);

        assert_eq!(fetched.record.login, "octocat");
        assert_eq!(fetched.record.repositories.nodes[0].stargazers.total_count, 3);
        assert_eq!(fetched.budget.remaining, 4999.0);
        assert_eq!(fetched.budget.limit, 5000.0);
    }

    #[test]
    fn decode_maps_null_entity_to_not_found()
    {
        let response = json!({
            "data": {"rateLimit": {"remaining": 10}, "organization": null},
            "errors": [{"type": "NOT_FOUND", "message": "Could not resolve to an Organization with the login of 'ghost'."}]
        });

        let error = decode::<OrganizationData,>("organization ghost", response,).expect_err("not found",);
        assert_eq!(error, QueryError::NotFound {
            entity: "organization ghost".to_owned(),
        });
    }

    #[test]
    fn decode_maps_errors_without_data_to_graphql()
    {
        let response = json!({
            "errors": [{"message": "Variable $login is required"}, {"message": "Parse error"}]
        });

        let error = decode::<RepositoryData,>("repository a/b", response,).expect_err("graphql error",);
        assert_eq!(error, QueryError::Graphql {
            entity:  "repository a/b".to_owned(),
            message: "Variable $login is required; Parse error".to_owned(),
        });
    }

    #[test]
    fn decode_rejects_unexpected_shape()
    {
        let response = json!({"data": {"repository": {"owner": "not-an-object"}}});
        let error = decode::<RepositoryData,>("repository a/b", response,).expect_err("malformed",);
        assert_eq!(error.reason(), "malformed");
    }

    #[test]
    fn decode_defaults_missing_budget_to_zero()
    {
        let response = json!({"data": {"repository": {"owner": {"login": "a"}, "name": "b"}}});
        let fetched = decode::<RepositoryData,>("repository a/b", response,).expect("decoded",);
        assert_eq!(fetched.budget, RateLimitBudget::default());
        assert_eq!(fetched.record.key(), ("a", "b"));
    }

    #[test]
    fn client_rejects_invalid_url()
    {
        let error = GitHubClient::new("not a url", None, DEFAULT_TIMEOUT, RetryConfig::default(),)
            .expect_err("invalid url",);
        assert!(matches!(error, Error::Validation { .. }));
    }

    #[tokio::test]
    async fn client_builds_for_default_endpoint()
    {
        let client = GitHubClient::new(DEFAULT_API_URL, Some("token",), DEFAULT_TIMEOUT, RetryConfig::default(),)
            .expect("client built",);
        let rendered = format!("{client:?}");
        assert!(rendered.starts_with("GitHubClient"));
        assert!(rendered.contains("timeout: 15s"));
        assert!(!rendered.contains("token"));
    }
}
