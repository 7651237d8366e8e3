// SPDX-FileCopyrightText: 2025 RAprogramm <andrey.rozanov.vl@gmail.com>
// SPDX-License-Identifier: MIT

//! Concurrent fan-out of entity queries and merge into a [`Snapshot`].
//!
//! Every configured organization, user and repository gets its own tokio
//! task. Tasks never touch shared state: each one returns its outcome and
//! [`gather`] merges the outcomes one by one, in configured order, after the
//! corresponding task has finished. The snapshot is only handed out once
//! every task has completed.

use std::{fmt, future::Future, num::NonZeroUsize, sync::Arc};

use serde::{Deserialize, Serialize};
use tokio::{sync::Semaphore, task::JoinHandle};
use tracing::{debug, info, warn};

use crate::{
    client::{Fetched, PageSizes, RemoteQueryClient, RepositoryRef},
    error::QueryError,
    schema::{OrganizationRecord, RepositoryRecord, UserRecord},
    snapshot::Snapshot,
};

/// Entities configured for collection.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize,)]
pub struct Targets
{
    pub organizations: Vec<String,>,
    pub users:         Vec<String,>,
    pub repositories:  Vec<RepositoryRef,>,
}

impl Targets
{
    /// Total number of configured entities, i.e. queries per cycle.
    pub fn len(&self,) -> usize
    {
        self.organizations.len() + self.users.len() + self.repositories.len()
    }

    pub fn is_empty(&self,) -> bool
    {
        self.len() == 0
    }
}

/// Knobs applied to one collection cycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq,)]
pub struct FetchOptions
{
    pub pages:           PageSizes,
    /// Upper bound on in-flight queries; `None` runs every query at once.
    pub max_concurrency: Option<NonZeroUsize,>,
}

/// Kind of entity a query targeted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind
{
    Organization,
    User,
    Repository,
}

impl EntityKind
{
    pub const ALL: [EntityKind; 3] = [EntityKind::Organization, EntityKind::User, EntityKind::Repository,];

    pub fn as_str(self,) -> &'static str
    {
        match self {
            Self::Organization => "organization",
            Self::User => "user",
            Self::Repository => "repository",
        }
    }
}

impl fmt::Display for EntityKind
{
    fn fmt(&self, f: &mut fmt::Formatter<'_,>,) -> fmt::Result
    {
        f.write_str(self.as_str(),)
    }
}

/// A query that did not contribute to the snapshot.
#[derive(Debug, Clone, PartialEq, Eq,)]
pub struct FailureRecord
{
    pub kind:   EntityKind,
    /// Login or `owner/name` of the entity.
    pub entity: String,
    /// [`QueryError::reason`] of the failure.
    pub reason: &'static str,
}

impl FailureRecord
{
    pub fn new(kind: EntityKind, entity: impl Into<String,>, reason: &'static str,) -> Self
    {
        Self {
            kind, entity: entity.into(), reason,
        }
    }
}

/// Output of one collection cycle.
#[derive(Debug, Clone, Default, PartialEq,)]
pub struct Collection
{
    pub snapshot: Snapshot,
    /// One entry per failed query, in configured order.
    pub failures: Vec<FailureRecord,>,
}

enum Entity
{
    Organization(OrganizationRecord,),
    User(UserRecord,),
    Repository(RepositoryRecord,),
}

type Outcome = Result<Fetched<Entity,>, QueryError,>;

struct Pending
{
    kind:   EntityKind,
    entity: String,
    handle: JoinHandle<Outcome,>,
}

fn spawn_query<Fut,>(limiter: Option<Arc<Semaphore,>,>, query: Fut,) -> JoinHandle<Outcome,>
where
    Fut: Future<Output = Outcome,> + Send + 'static,
{
    tokio::spawn(async move {
        // Held until the query resolves; the semaphore is never closed.
        let _permit = match limiter {
            Some(semaphore,) => semaphore.acquire_owned().await.ok(),
            None => None,
        };
        query.await
    },)
}

/// Runs one collection cycle.
///
/// Issues exactly one query per configured entity and waits for all of them.
/// Failed queries are logged, recorded in [`Collection::failures`] and
/// otherwise ignored; the cycle itself cannot fail. Successful results are
/// merged in configured order (organizations, users, repositories), so the
/// snapshot budget is the one reported by the last successful entity in that
/// order.
///
/// # Examples
///
/// ```no_run
/// use std::{sync::Arc, time::Duration};
///
/// use github_exporter::{FetchOptions, GitHubClient, RetryConfig, Targets, gather};
///
/// # async fn example() -> Result<(), github_exporter::Error> {
/// let client = GitHubClient::new(
///     "https://api.github.com",
///     None,
///     Duration::from_secs(15,),
///     RetryConfig::default(),
/// )?;
/// let targets = Targets {
///     organizations: vec!["rust-lang".to_owned()],
///     ..Targets::default()
/// };
/// let collection = gather(Arc::new(client,), &targets, &FetchOptions::default(),).await;
/// println!("{} organizations", collection.snapshot.organizations.len());
/// # Ok(())
/// # }
/// ```
pub async fn gather<C,>(client: Arc<C,>, targets: &Targets, options: &FetchOptions,) -> Collection
where
    C: RemoteQueryClient,
{
    let limiter = options.max_concurrency.map(|limit| Arc::new(Semaphore::new(limit.get(),),),);
    let pages = options.pages;
    let mut pending = Vec::with_capacity(targets.len(),);

    debug!("Fanning out {} queries", targets.len());

    for login in &targets.organizations {
        let client = Arc::clone(&client,);
        let owned = login.clone();
        let handle = spawn_query(limiter.clone(), async move {
            client.query_organization(&owned, pages,).await.map(|f| f.map(Entity::Organization,),)
        },);
        pending.push(Pending {
            kind: EntityKind::Organization, entity: login.clone(), handle,
        },);
    }

    for login in &targets.users {
        let client = Arc::clone(&client,);
        let owned = login.clone();
        let handle = spawn_query(limiter.clone(), async move {
            client.query_user(&owned, pages,).await.map(|f| f.map(Entity::User,),)
        },);
        pending.push(Pending {
            kind: EntityKind::User, entity: login.clone(), handle,
        },);
    }

    for repository in &targets.repositories {
        let client = Arc::clone(&client,);
        let owned = repository.clone();
        let handle = spawn_query(limiter.clone(), async move {
            client.query_repository(&owned, pages,).await.map(|f| f.map(Entity::Repository,),)
        },);
        pending.push(Pending {
            kind: EntityKind::Repository, entity: repository.to_string(), handle,
        },);
    }

    let mut collection = Collection::default();
    for Pending {
        kind,
        entity,
        handle,
    } in pending
    {
        let outcome = handle.await.unwrap_or_else(|error| {
            Err(QueryError::Task {
                entity: entity.clone(), message: error.to_string(),
            },)
        },);

        match outcome {
            Ok(fetched,) => {
                debug!("Merged {} {}", kind, entity);
                merge(&mut collection.snapshot, fetched,);
            }
            Err(error,) => {
                warn!("Skipping {} {}: {}", kind, entity, error);
                collection.failures.push(FailureRecord::new(kind, entity, error.reason(),),);
            }
        }
    }

    info!(
        "Collected {} organizations, {} users, {} repositories ({} failed queries)",
        collection.snapshot.organizations.len(),
        collection.snapshot.users.len(),
        collection.snapshot.repositories.len(),
        collection.failures.len()
    );

    collection
}

fn merge(snapshot: &mut Snapshot, fetched: Fetched<Entity,>,)
{
    snapshot.budget = fetched.budget;
    match fetched.record {
        Entity::Organization(organization,) => snapshot.organizations.push(organization,),
        Entity::User(user,) => snapshot.users.push(user,),
        Entity::Repository(repository,) => snapshot.repositories.push(repository,),
    }
}
