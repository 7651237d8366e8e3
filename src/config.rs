// SPDX-FileCopyrightText: 2025 RAprogramm <andrey.rozanov.vl@gmail.com>
// SPDX-License-Identifier: MIT

//! Runtime configuration for the exporter.
//!
//! Entity lists arrive as comma-separated strings (from flags or environment
//! variables) and, optionally, from a YAML document. [`ConfigSources`]
//! gathers the raw inputs; [`ConfigSources::resolve`] validates them and
//! produces an [`ExporterConfig`] that the binary uses to build the client
//! and drive collection cycles.

use std::{
    fs,
    num::NonZeroUsize,
    path::{Path, PathBuf},
    sync::LazyLock,
    time::Duration,
};

use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{
    client::{PageSizes, RepositoryRef},
    error::{Error, io_error, token_io_error},
    github::{DEFAULT_API_URL, DEFAULT_TIMEOUT},
    orchestrator::{FetchOptions, Targets},
};

static LOGIN_PATTERN: LazyLock<Regex,> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z0-9][A-Za-z0-9_-]{0,99}$",).expect("valid login pattern",)
},);

static REPOSITORY_NAME_PATTERN: LazyLock<Regex,> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9._-]{1,100}$",).expect("valid repository pattern",),);

/// Optional YAML document listing entities and tuning knobs.
///
/// # Examples
///
/// ```
/// use github_exporter::ConfigDocument;
///
/// let yaml = r#"
/// organizations: [rust-lang]
/// users: [octocat]
/// repositories: [tokio-rs/tokio]
/// repo_page_size: 20
/// "#;
/// let document: ConfigDocument = serde_yaml::from_str(yaml,).expect("valid configuration",);
/// assert_eq!(document.repositories, vec!["tokio-rs/tokio".to_owned()]);
/// assert_eq!(document.repo_page_size, Some(20));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize,)]
#[serde(deny_unknown_fields)]
pub struct ConfigDocument
{
    /// Organization logins.
    #[serde(default, alias = "orgs", alias = "organisations")]
    pub organizations:      Vec<String,>,
    /// User logins.
    #[serde(default)]
    pub users:              Vec<String,>,
    /// Repositories in `owner/name` form.
    #[serde(default, alias = "repos")]
    pub repositories:       Vec<String,>,
    /// Repositories nested under each user or organization.
    #[serde(default)]
    pub repo_page_size:     Option<u32,>,
    /// Languages reported per repository.
    #[serde(default)]
    pub language_page_size: Option<u32,>,
    /// Upper bound on in-flight queries.
    #[serde(default)]
    pub max_concurrency:    Option<usize,>,
    /// Enables the repository deduplication pass.
    #[serde(default)]
    pub dedupe:             Option<bool,>,
}

/// Raw configuration inputs before validation.
///
/// Flags and environment variables take precedence over the YAML document
/// for scalar values; entity lists from both sources are concatenated.
#[derive(Debug, Clone, Default, PartialEq, Eq,)]
pub struct ConfigSources
{
    pub organizations:      Option<String,>,
    pub users:              Option<String,>,
    pub repositories:       Option<String,>,
    pub document:           Option<PathBuf,>,
    pub api_url:            Option<String,>,
    pub token:              Option<String,>,
    pub token_file:         Option<PathBuf,>,
    pub repo_page_size:     Option<u32,>,
    pub language_page_size: Option<u32,>,
    pub max_concurrency:    Option<usize,>,
    pub timeout_secs:       Option<u64,>,
    pub dedupe:             bool,
}

/// Validated configuration consumed by the binary.
#[derive(Debug, Clone, PartialEq, Eq,)]
pub struct ExporterConfig
{
    pub targets: Targets,
    pub api_url: String,
    pub token:   Option<String,>,
    pub fetch:   FetchOptions,
    pub timeout: Duration,
    pub dedupe:  bool,
}

impl ConfigSources
{
    /// Validates the inputs and resolves the token.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Validation`] for malformed logins, repository
    /// specifications or zero page sizes, [`Error::Io`]/[`Error::Parse`]
    /// when the YAML document cannot be loaded, and [`Error::TokenIo`] when
    /// the token file cannot be read.
    pub fn resolve(self,) -> Result<ExporterConfig, Error,>
    {
        let document = match self.document.as_deref() {
            Some(path,) => load_document(path,)?,
            None => ConfigDocument::default(),
        };

        let organizations = collect_logins(self.organizations.as_deref(), &document.organizations, "organization",)?;
        let users = collect_logins(self.users.as_deref(), &document.users, "user",)?;

        let mut repositories = Vec::new();
        let listed = self.repositories.as_deref().map(split_list,).unwrap_or_default();
        for raw in listed.iter().chain(document.repositories.iter(),) {
            let repository = parse_repository(raw,)?;
            if !repositories.contains(&repository,) {
                repositories.push(repository,);
            }
        }

        let pages = PageSizes {
            repositories: positive(
                "repository page size",
                self.repo_page_size.or(document.repo_page_size,),
                PageSizes::default().repositories,
            )?,
            languages:    positive(
                "language page size",
                self.language_page_size.or(document.language_page_size,),
                PageSizes::default().languages,
            )?,
        };

        let max_concurrency = match self.max_concurrency.or(document.max_concurrency,) {
            None => None,
            Some(limit,) => Some(
                NonZeroUsize::new(limit,)
                    .ok_or_else(|| Error::validation("max concurrency must be greater than zero",),)?,
            ),
        };

        let timeout = match self.timeout_secs {
            None => DEFAULT_TIMEOUT,
            Some(0,) => return Err(Error::validation("timeout must be greater than zero",),),
            Some(seconds,) => Duration::from_secs(seconds,),
        };

        let api_url = self
            .api_url
            .map(|url| url.trim().trim_end_matches('/',).to_owned(),)
            .filter(|url| !url.is_empty(),)
            .unwrap_or_else(|| DEFAULT_API_URL.to_owned(),);

        let token = resolve_token(self.token.as_deref(), self.token_file.as_deref(),)?;

        let targets = Targets {
            organizations,
            users,
            repositories,
        };
        debug!(
            "Resolved {} organizations, {} users, {} repositories",
            targets.organizations.len(),
            targets.users.len(),
            targets.repositories.len()
        );

        Ok(ExporterConfig {
            targets,
            api_url,
            token,
            fetch: FetchOptions {
                pages,
                max_concurrency,
            },
            timeout,
            dedupe: self.dedupe || document.dedupe.unwrap_or(false,),
        },)
    }
}

/// Splits a comma-separated list, trimming entries and dropping empty ones.
///
/// # Examples
///
/// ```
/// use github_exporter::split_list;
///
/// assert_eq!(split_list(" acme, ,globex ,"), vec!["acme", "globex"]);
/// assert!(split_list("").is_empty());
/// ```
pub fn split_list(raw: &str,) -> Vec<String,>
{
    raw.split(',',).map(str::trim,).filter(|value| !value.is_empty(),).map(str::to_owned,).collect()
}

/// Parses an `owner/name` repository specification.
///
/// # Errors
///
/// Returns [`Error::Validation`] when the value is not exactly two
/// non-empty segments or a segment contains characters GitHub rejects.
pub fn parse_repository(raw: &str,) -> Result<RepositoryRef, Error,>
{
    let trimmed = raw.trim();
    let mut parts = trimmed.split('/',);
    let (Some(owner,), Some(name,), None,) = (parts.next(), parts.next(), parts.next(),) else {
        return Err(Error::validation(format!(
            "repository '{trimmed}' must be in owner/name form"
        ),),);
    };

    if !LOGIN_PATTERN.is_match(owner,) {
        return Err(Error::validation(format!("repository '{trimmed}' has an invalid owner"),),);
    }
    if !REPOSITORY_NAME_PATTERN.is_match(name,) || name == "." || name == ".." {
        return Err(Error::validation(format!("repository '{trimmed}' has an invalid name"),),);
    }

    Ok(RepositoryRef::new(owner, name,),)
}

/// Returns the token to authenticate with.
///
/// An explicit token wins. Otherwise the token file is read and trimmed.
/// Without either the client runs anonymously.
///
/// # Errors
///
/// Returns [`Error::TokenIo`] when the token file cannot be read.
pub fn resolve_token(token: Option<&str,>, token_file: Option<&Path,>,) -> Result<Option<String,>, Error,>
{
    if let Some(token,) = token.map(str::trim,).filter(|value| !value.is_empty(),) {
        return Ok(Some(token.to_owned(),),);
    }

    let Some(path,) = token_file else {
        return Ok(None,);
    };

    let contents = fs::read_to_string(path,).map_err(|source| token_io_error(path, source,),)?;
    let trimmed = contents.trim();
    Ok((!trimmed.is_empty()).then(|| trimmed.to_owned(),),)
}

/// Reads and parses a YAML configuration document.
///
/// # Errors
///
/// Returns [`Error::Io`] when the file cannot be read and [`Error::Parse`]
/// when it is not a valid document.
pub fn load_document(path: &Path,) -> Result<ConfigDocument, Error,>
{
    let contents = fs::read_to_string(path,).map_err(|source| io_error(path, source,),)?;
    parse_document(&contents,)
}

/// Parses a YAML configuration document from a string.
///
/// # Errors
///
/// Returns [`Error::Parse`] when the YAML is invalid.
pub fn parse_document(contents: &str,) -> Result<ConfigDocument, Error,>
{
    if contents.trim().is_empty() {
        return Ok(ConfigDocument::default(),);
    }
    Ok(serde_yaml::from_str(contents,)?,)
}

fn collect_logins(listed: Option<&str,>, documented: &[String], kind: &str,) -> Result<Vec<String,>, Error,>
{
    let mut logins: Vec<String,> = Vec::new();
    let listed = listed.map(split_list,).unwrap_or_default();

    for login in listed.iter().chain(documented.iter(),) {
        let login = login.trim();
        if !LOGIN_PATTERN.is_match(login,) {
            return Err(Error::validation(format!("{kind} login '{login}' is invalid"),),);
        }
        if !logins.iter().any(|existing| existing == login,) {
            logins.push(login.to_owned(),);
        }
    }

    Ok(logins,)
}

fn positive(name: &str, value: Option<u32,>, default: u32,) -> Result<u32, Error,>
{
    match value {
        None => Ok(default,),
        Some(0,) => Err(Error::validation(format!("{name} must be greater than zero"),),),
        Some(value,) => Ok(value,),
    }
}
