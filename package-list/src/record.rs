// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

/*! Package records and their derivation from record lines. */

use {
    crate::{
        archive::{strip_archive_extension, ArchiveFormat},
        error::{PackageListError, Result},
    },
    std::path::{Component, Path},
};

/// Where the source of a package comes from.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum PackageSource {
    /// A directly downloadable archive.
    Url(String),
    /// A Git repository checked out at a named branch or commit.
    Git { url: String, branch: String },
}

/// Raw fields collected from a single record line.
///
/// Fields with empty values are treated as unset.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct RecordFields {
    pub url: Option<String>,
    pub git: Option<String>,
    pub branch: Option<String>,
    pub sha1: Option<String>,
    pub patches: Option<String>,
    pub src_dir: Option<String>,
}

impl RecordFields {
    /// Names of recognized fields.
    pub const NAMES: [&'static str; 6] = ["URL", "GIT", "BRANCH", "SHA1", "PATCHES", "SRCDIR"];

    /// Set a field from a `NAME=VALUE` token.
    ///
    /// Returns false if the field name isn't recognized.
    pub fn set(&mut self, name: &str, value: &str) -> bool {
        let slot = match name {
            "URL" => &mut self.url,
            "GIT" => &mut self.git,
            "BRANCH" => &mut self.branch,
            "SHA1" => &mut self.sha1,
            "PATCHES" => &mut self.patches,
            "SRCDIR" => &mut self.src_dir,
            _ => return false,
        };

        *slot = if value.is_empty() {
            None
        } else {
            Some(value.to_string())
        };

        true
    }
}

/// Split an extension-less package file name into its basename and version.
///
/// The split happens at the last hyphen. Names without a hyphen have an empty version.
pub fn split_basename_version(name: &str) -> (&str, &str) {
    name.rsplit_once('-').unwrap_or((name, ""))
}

/// Ensure a field value names a path that stays beneath the directory it is joined to.
fn check_relative_path(line: usize, field: &'static str, value: Option<&str>) -> Result<()> {
    if let Some(value) = value {
        if !Path::new(value)
            .components()
            .all(|c| matches!(c, Component::Normal(_)))
        {
            return Err(PackageListError::UnsafePathField {
                line,
                field,
                value: value.to_string(),
            });
        }
    }

    Ok(())
}

fn last_path_segment(url: &str) -> &str {
    url.rsplit('/').next().unwrap_or(url)
}

/// A package defined in a package list.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct PackageRecord {
    index: usize,
    basename: String,
    version: String,
    file: String,
    src_dir: String,
    source: PackageSource,
    sha1: Option<String>,
    patches: Option<String>,
}

impl PackageRecord {
    /// Derive a record from the fields of a record line.
    ///
    /// `index` is the 1-based position of the record in its list. `line` is the
    /// line number the fields came from and is only used for error reporting.
    pub fn from_fields(index: usize, line: usize, fields: RecordFields) -> Result<Self> {
        let RecordFields {
            url,
            git,
            branch,
            sha1,
            patches,
            src_dir,
        } = fields;

        check_relative_path(line, "SRCDIR", src_dir.as_deref())?;
        check_relative_path(line, "PATCHES", patches.as_deref())?;

        let (basename, version, file, source) = match (url, git) {
            (Some(_), Some(_)) => return Err(PackageListError::ConflictingSourceFields { line }),
            (Some(url), None) => {
                let file = last_path_segment(&url).to_string();
                let (basename, version) = split_basename_version(strip_archive_extension(&file));
                let (basename, version) = (basename.to_string(), version.to_string());

                (basename, version, file, PackageSource::Url(url))
            }
            (None, Some(url)) => {
                let branch = branch.ok_or(PackageListError::MissingBranch { line })?;
                let segment = last_path_segment(&url);
                let basename = segment.strip_suffix(".git").unwrap_or(segment).to_string();
                let file = format!(
                    "{}-{}{}",
                    basename,
                    branch,
                    ArchiveFormat::TarXz.extension()
                );

                (
                    basename,
                    branch.clone(),
                    file,
                    PackageSource::Git { url, branch },
                )
            }
            (None, None) => return Err(PackageListError::MissingSourceField { line }),
        };

        if basename.is_empty() {
            return Err(PackageListError::UnusableSourceName {
                line,
                value: match source {
                    PackageSource::Url(url) => url,
                    PackageSource::Git { url, .. } => url,
                },
            });
        }

        let mut record = Self {
            index,
            basename,
            version,
            file,
            src_dir: String::new(),
            source,
            sha1,
            patches,
        };
        record.src_dir = src_dir.unwrap_or_else(|| record.full_name());

        Ok(record)
    }

    /// The 1-based position of this record in its package list.
    pub fn index(&self) -> usize {
        self.index
    }

    /// The unversioned package name.
    pub fn basename(&self) -> &str {
        &self.basename
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    /// `<basename>-<version>`, or just the basename if there is no version.
    pub fn full_name(&self) -> String {
        if self.version.is_empty() {
            self.basename.clone()
        } else {
            format!("{}-{}", self.basename, self.version)
        }
    }

    /// File name of the package's source archive.
    pub fn filename(&self) -> &str {
        &self.file
    }

    /// Name of the directory the source archive extracts into.
    pub fn src_dir(&self) -> &str {
        &self.src_dir
    }

    pub fn source(&self) -> &PackageSource {
        &self.source
    }

    pub fn is_git(&self) -> bool {
        matches!(self.source, PackageSource::Git { .. })
    }

    /// The download URL, for archive sourced packages.
    pub fn url(&self) -> Option<&str> {
        match &self.source {
            PackageSource::Url(url) => Some(url),
            PackageSource::Git { .. } => None,
        }
    }

    /// The clone URL, for Git sourced packages.
    pub fn git_url(&self) -> Option<&str> {
        match &self.source {
            PackageSource::Git { url, .. } => Some(url),
            PackageSource::Url(_) => None,
        }
    }

    pub fn git_branch(&self) -> Option<&str> {
        match &self.source {
            PackageSource::Git { branch, .. } => Some(branch),
            PackageSource::Url(_) => None,
        }
    }

    /// Expected SHA-1 of the source archive, as hex.
    pub fn sha1(&self) -> Option<&str> {
        self.sha1.as_deref()
    }

    /// Name of the patch tarball, if one was declared.
    pub fn patches(&self) -> Option<&str> {
        self.patches.as_deref()
    }
}
