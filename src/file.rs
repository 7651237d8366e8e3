// SPDX-FileCopyrightText: 2025 RAprogramm <andrey.rozanov.vl@gmail.com>
// SPDX-License-Identifier: MIT

//! Textfile output for the rendered exposition.
//!
//! Scrapers such as the node exporter textfile collector read the target
//! file at arbitrary moments, so it is replaced atomically: contents go to a
//! sibling temporary file which is then renamed over the destination.

use std::{
    fs,
    io::Write,
    path::{Path, PathBuf}
};

use serde::{Deserialize, Serialize};

use crate::error::{Error, io_error};

/// Result of a textfile write.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextfileWrite {
    /// Destination path that now holds the exposition.
    pub destination: PathBuf,
    /// Number of bytes written.
    pub bytes:       usize
}

/// Atomically replaces `destination` with `contents`, creating parent
/// directories as needed.
///
/// # Errors
///
/// Returns [`Error::Validation`] when the destination is a directory and
/// [`Error::Io`] when any filesystem step fails.
///
/// # Example
///
/// ```no_run
/// use std::path::Path;
///
/// use github_exporter::write_textfile;
///
/// # fn example() -> Result<(), github_exporter::Error> {
/// let written = write_textfile(Path::new("/var/lib/node_exporter/github.prom"), "github_rate_limit 5000\n")?;
/// println!("Wrote {} bytes to {}", written.bytes, written.destination.display());
/// # Ok(())
/// # }
/// ```
pub fn write_textfile(destination: &Path, contents: &str) -> Result<TextfileWrite, Error> {
    if destination.is_dir() {
        return Err(Error::validation(format!(
            "output path is a directory: {}",
            destination.display()
        )));
    }

    if let Some(parent) = destination.parent()
        && !parent.as_os_str().is_empty()
        && !parent.exists()
    {
        fs::create_dir_all(parent).map_err(|source| io_error(parent, source))?;
    }

    let staging = staging_path(destination);
    let result = write_staged(&staging, contents)
        .and_then(|()| fs::rename(&staging, destination).map_err(|source| io_error(destination, source)));

    if result.is_err() {
        let _ = fs::remove_file(&staging);
    }
    result?;

    Ok(TextfileWrite {
        destination: destination.to_path_buf(),
        bytes:       contents.len()
    })
}

fn write_staged(staging: &Path, contents: &str) -> Result<(), Error> {
    let mut file = fs::File::create(staging).map_err(|source| io_error(staging, source))?;
    file.write_all(contents.as_bytes())
        .and_then(|()| file.sync_all())
        .map_err(|source| io_error(staging, source))
}

fn staging_path(destination: &Path) -> PathBuf {
    let mut name = destination
        .file_name()
        .map(|name| name.to_os_string())
        .unwrap_or_default();
    name.push(format!(".{}.tmp", std::process::id()));
    destination.with_file_name(name)
}
