// SPDX-FileCopyrightText: 2025 RAprogramm <andrey.rozanov.vl@gmail.com>
// SPDX-License-Identifier: MIT

//! Prometheus exporter for GitHub repository, user and organization metrics.
//!
//! A collection cycle fans out one GraphQL query per configured entity,
//! merges the outcomes into a [`Snapshot`], projects the snapshot into
//! label-tagged [`Measurement`]s using the [`MetricCatalog`] and renders them
//! in the Prometheus text exposition format. Failed queries never abort a
//! cycle; they are recorded in the failure ledger and exposed through the
//! `github_exporter_query_failures` gauge.
//!
//! The remote side is abstracted behind [`RemoteQueryClient`] so the
//! orchestration can run against [`GitHubClient`] or any test double.

mod catalog;
mod client;
mod config;
mod error;
mod exporter;
mod exposition;
mod file;
mod github;
mod orchestrator;
mod projector;
mod retry;
mod schema;
mod snapshot;

pub use catalog::{
    FAILURE_LABELS, MetricCatalog, MetricDescriptor, MetricKey, REPOSITORY_LABELS, fq_name,
};
pub use client::{
    DEFAULT_LANGUAGE_PAGE_SIZE, DEFAULT_REPOSITORY_PAGE_SIZE, Fetched, PageSizes, RemoteQueryClient,
    RepositoryRef,
};
pub use config::{
    ConfigDocument, ConfigSources, ExporterConfig, load_document, parse_document, parse_repository,
    resolve_token, split_list,
};
pub use error::{Error, QueryError, io_error, token_io_error};
pub use exporter::Exporter;
pub use exposition::render_text;
pub use file::{TextfileWrite, write_textfile};
pub use github::{DEFAULT_API_URL, DEFAULT_TIMEOUT, GitHubClient};
pub use orchestrator::{Collection, EntityKind, FailureRecord, FetchOptions, Targets, gather};
pub use projector::{Measurement, ProjectionError, project, project_failures, repository_labels};
pub use retry::{RetryConfig, retry_with_backoff};
pub use schema::{
    ContributionsCollection, Language, LanguageConnection, LanguageEdge, License, OrganizationRecord,
    Owner, PageInfo, RateLimitBudget, RepositoryConnection, RepositoryRecord, TotalCount, UserRecord,
};
pub use snapshot::Snapshot;
