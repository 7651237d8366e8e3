// SPDX-FileCopyrightText: 2025 RAprogramm <andrey.rozanov.vl@gmail.com>
// SPDX-License-Identifier: MIT

//! Contract between the collection cycle and the remote API.
//!
//! The orchestrator only knows about [`RemoteQueryClient`]. The production
//! implementation lives in [`crate::github`]; tests substitute instrumented
//! fakes.

use std::{fmt, future::Future};

use serde::{Deserialize, Serialize};

use crate::{
    error::QueryError,
    schema::{OrganizationRecord, RateLimitBudget, RepositoryRecord, UserRecord},
};

/// Number of repositories nested under a user or organization.
pub const DEFAULT_REPOSITORY_PAGE_SIZE: u32 = 10;
/// Number of languages requested per repository.
pub const DEFAULT_LANGUAGE_PAGE_SIZE: u32 = 5;

/// Page-size parameters sent with every query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize,)]
pub struct PageSizes
{
    /// Repositories per user or organization.
    pub repositories: u32,
    /// Languages per repository.
    pub languages:    u32,
}

impl Default for PageSizes
{
    fn default() -> Self
    {
        Self {
            repositories: DEFAULT_REPOSITORY_PAGE_SIZE,
            languages:    DEFAULT_LANGUAGE_PAGE_SIZE,
        }
    }
}

/// Owner and name of a directly configured repository.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize,)]
pub struct RepositoryRef
{
    pub owner: String,
    pub name:  String,
}

impl RepositoryRef
{
    pub fn new(owner: impl Into<String,>, name: impl Into<String,>,) -> Self
    {
        Self {
            owner: owner.into(), name: name.into(),
        }
    }
}

impl fmt::Display for RepositoryRef
{
    fn fmt(&self, f: &mut fmt::Formatter<'_,>,) -> fmt::Result
    {
        write!(f, "{}/{}", self.owner, self.name)
    }
}

/// A record together with the rate-limit budget reported by the same call.
#[derive(Debug, Clone, PartialEq,)]
pub struct Fetched<T,>
{
    pub record: T,
    pub budget: RateLimitBudget,
}

impl<T,> Fetched<T,>
{
    pub fn new(record: T, budget: RateLimitBudget,) -> Self
    {
        Self {
            record, budget,
        }
    }

    /// Transforms the record while keeping the budget.
    pub fn map<U,>(self, f: impl FnOnce(T,) -> U,) -> Fetched<U,>
    {
        Fetched {
            record: f(self.record,), budget: self.budget,
        }
    }
}

/// Queries one entity at a time from the remote API.
///
/// Implementations must be shareable across tasks: the orchestrator clones
/// an `Arc` of the client into every spawned query. A failed call returns a
/// [`QueryError`]; it is never retried or surfaced by the orchestrator.
pub trait RemoteQueryClient: Send + Sync + 'static
{
    /// Fetches an organization and a page of its repositories.
    fn query_organization(
        &self,
        login: &str,
        pages: PageSizes,
    ) -> impl Future<Output = Result<Fetched<OrganizationRecord,>, QueryError,>,> + Send;

    /// Fetches a user and a page of their most recently updated repositories.
    fn query_user(
        &self,
        login: &str,
        pages: PageSizes,
    ) -> impl Future<Output = Result<Fetched<UserRecord,>, QueryError,>,> + Send;

    /// Fetches a single repository.
    fn query_repository(
        &self,
        repository: &RepositoryRef,
        pages: PageSizes,
    ) -> impl Future<Output = Result<Fetched<RepositoryRecord,>, QueryError,>,> + Send;
}
