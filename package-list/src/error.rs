// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

/*! Error handling. */

use {std::path::PathBuf, thiserror::Error};

/// Primary crate error type.
#[derive(Debug, Error)]
pub enum PackageListError {
    #[error("package list {path} could not be read: {source}")]
    DocumentNotFound {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("I/O error reading package list at line {line}: {source}")]
    DocumentRead {
        line: usize,
        #[source]
        source: std::io::Error,
    },

    #[error("line {line}: URL and GIT cannot both be set")]
    ConflictingSourceFields { line: usize },

    #[error("line {line}: GIT requires BRANCH")]
    MissingBranch { line: usize },

    #[error("line {line}: one of URL or GIT must be set")]
    MissingSourceField { line: usize },

    #[error("line {line}: could not derive a package name from {value}")]
    UnusableSourceName { line: usize, value: String },

    #[error("line {line}: {field} must be a relative path without '..': {value}")]
    UnsafePathField {
        line: usize,
        field: &'static str,
        value: String,
    },

    #[error("line {line}: package {basename} is already defined")]
    DuplicateBasename { line: usize, basename: String },

    #[error("unknown package: {0}")]
    UnknownPackage(String),

    #[error("{package}: unable to create directory {path}: {source}")]
    DirectoryCreateFailed {
        package: String,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{package}: unable to unpack {path}: {source}")]
    UnpackFailed {
        package: String,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{package}: expected directory {path} not found after unpacking")]
    MissingExtractedDirectory { package: String, path: PathBuf },

    #[error("{package}: failed to apply patch {patch}: {source}")]
    PatchApplyFailed {
        package: String,
        patch: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{0}: no SHA1 defined")]
    MissingSha1(String),

    #[error("{package}: SHA1 mismatch for {path}; expected {expected}, got {actual}")]
    Sha1Mismatch {
        package: String,
        path: PathBuf,
        expected: String,
        actual: String,
    },

    #[error("I/O error on path {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Result wrapper for this crate.
pub type Result<T> = std::result::Result<T, PackageListError>;
