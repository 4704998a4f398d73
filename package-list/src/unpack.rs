// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

/*! Unpacking source packages and applying their patches.

[unpack_and_patch] extracts a package's source archive, verifies the expected source
directory materialized, then applies the patches shipped in the package's patch
tarball, if one exists.

Extraction and patch application are delegated to implementations of
[ArchiveUnpacker] and [PatchApplier]. [NativeArchiveUnpacker] extracts archives
in-process. [PatchCommand] runs an external `patch` program.
*/

use {
    crate::{
        archive::{extract_archive, strip_archive_extension, ArchiveFormat},
        error::{PackageListError, Result},
        store::PackageListStore,
    },
    duct::cmd,
    log::info,
    std::{
        ffi::OsString,
        io::{BufRead, BufReader},
        path::{Path, PathBuf},
    },
};

/// Extracts an archive into a directory.
pub trait ArchiveUnpacker {
    fn unpack(&self, archive_path: &Path, dest_dir: &Path) -> std::io::Result<()>;
}

/// Applies a unified diff to a directory tree.
pub trait PatchApplier {
    fn apply(&self, patch_path: &Path, working_dir: &Path) -> std::io::Result<()>;
}

/// Extracts archives in-process, detecting the format from the file extension.
#[derive(Clone, Copy, Debug, Default)]
pub struct NativeArchiveUnpacker;

impl ArchiveUnpacker for NativeArchiveUnpacker {
    fn unpack(&self, archive_path: &Path, dest_dir: &Path) -> std::io::Result<()> {
        extract_archive(archive_path, dest_dir)
    }
}

/// Applies patches by invoking a `patch` executable.
#[derive(Clone, Debug)]
pub struct PatchCommand {
    program: OsString,
    strip: usize,
}

impl Default for PatchCommand {
    fn default() -> Self {
        Self {
            program: OsString::from("patch"),
            strip: 1,
        }
    }
}

impl PatchCommand {
    /// Construct an instance using a specific `patch` executable.
    ///
    /// A bare program name is searched for in `PATH`.
    pub fn new(program: impl Into<OsString>) -> Self {
        Self {
            program: program.into(),
            ..Default::default()
        }
    }

    /// Set the number of leading path components to strip from patch paths.
    pub fn strip(mut self, strip: usize) -> Self {
        self.strip = strip;
        self
    }

    fn arguments(&self, patch_path: &Path) -> Vec<OsString> {
        vec![
            format!("-p{}", self.strip).into(),
            "-N".into(),
            "-i".into(),
            patch_path.as_os_str().to_owned(),
        ]
    }
}

impl PatchApplier for PatchCommand {
    fn apply(&self, patch_path: &Path, working_dir: &Path) -> std::io::Result<()> {
        // The process runs in working_dir, so relative paths would no longer resolve.
        let patch_path = std::fs::canonicalize(patch_path)?;

        let command = cmd(self.program.as_os_str(), self.arguments(&patch_path))
            .dir(working_dir)
            .stdin_null()
            .stderr_to_stdout()
            .unchecked()
            .reader()?;
        {
            let reader = BufReader::new(&command);
            for line in reader.lines() {
                info!("patch> {}", line?);
            }
        }

        let output = command.try_wait()?.ok_or_else(|| {
            std::io::Error::new(std::io::ErrorKind::Other, "unable to wait on patch")
        })?;

        if output.status.success() {
            Ok(())
        } else {
            Err(std::io::Error::new(
                std::io::ErrorKind::Other,
                format!(
                    "{} exited with {}",
                    self.program.to_string_lossy(),
                    output.status
                ),
            ))
        }
    }
}

/// Find `*.patch` files directly inside a directory, sorted by file name.
pub fn find_patches(dir: &Path) -> std::io::Result<Vec<PathBuf>> {
    let walk = walkdir::WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .sort_by(|a, b| a.file_name().cmp(b.file_name()));

    let mut res = vec![];

    for entry in walk {
        let entry = entry?;

        if entry.file_type().is_file()
            && entry.path().extension().map(|ext| ext == "patch") == Some(true)
        {
            res.push(entry.into_path());
        }
    }

    Ok(res)
}

/// Name of the patch tarball for a package.
///
/// An explicit `PATCHES` value wins over the `<full name>-patches.tar.xz` convention.
fn patches_filename(patches: Option<&str>, full_name: &str) -> String {
    match patches {
        Some(name) => name.to_string(),
        None => format!("{}-patches{}", full_name, ArchiveFormat::TarXz.extension()),
    }
}

/// Unpack a package's source archive and apply its patches.
///
/// The archive `<archive_dir>/<filename>` is extracted into `dest_dir`, which is
/// created if needed. The extraction must produce `<dest_dir>/<src_dir>`.
///
/// If the patch tarball exists in `archive_dir`, it is also extracted into `dest_dir`
/// and every `*.patch` file in the directory it produces is applied to the source
/// directory in file name order. The first failing patch aborts the operation.
/// Patches applied before it are left in place.
///
/// Returns the path of the extracted source directory.
pub fn unpack_and_patch(
    store: &PackageListStore,
    basename: &str,
    archive_dir: &Path,
    dest_dir: &Path,
    unpacker: &dyn ArchiveUnpacker,
    patcher: &dyn PatchApplier,
) -> Result<PathBuf> {
    let record = store
        .get(basename)
        .ok_or_else(|| PackageListError::UnknownPackage(basename.to_string()))?;
    let full_name = record.full_name();
    let archive_path = archive_dir.join(record.filename());

    std::fs::create_dir_all(dest_dir).map_err(|source| {
        PackageListError::DirectoryCreateFailed {
            package: basename.to_string(),
            path: dest_dir.to_path_buf(),
            source,
        }
    })?;

    info!(
        "{}: unpacking {} into {}",
        basename,
        archive_path.display(),
        dest_dir.display()
    );
    unpacker
        .unpack(&archive_path, dest_dir)
        .map_err(|source| PackageListError::UnpackFailed {
            package: basename.to_string(),
            path: archive_path.clone(),
            source,
        })?;

    let source_dir = dest_dir.join(record.src_dir());
    if !source_dir.is_dir() {
        return Err(PackageListError::MissingExtractedDirectory {
            package: basename.to_string(),
            path: source_dir,
        });
    }

    let patches_name = patches_filename(record.patches(), &full_name);
    let patches_archive = archive_dir.join(&patches_name);

    if !patches_archive.is_file() {
        info!("{}: no patches", basename);
        return Ok(source_dir);
    }

    info!("{}: unpacking {}", basename, patches_archive.display());
    unpacker
        .unpack(&patches_archive, dest_dir)
        .map_err(|source| PackageListError::UnpackFailed {
            package: basename.to_string(),
            path: patches_archive.clone(),
            source,
        })?;

    let patches_dir = dest_dir.join(strip_archive_extension(&patches_name));
    if !patches_dir.is_dir() {
        return Err(PackageListError::MissingExtractedDirectory {
            package: basename.to_string(),
            path: patches_dir,
        });
    }

    let patches = find_patches(&patches_dir).map_err(|source| PackageListError::Io {
        path: patches_dir.clone(),
        source,
    })?;

    for patch in patches {
        info!("{}: applying {}", basename, patch.display());

        patcher
            .apply(&patch, &source_dir)
            .map_err(|source| PackageListError::PatchApplyFailed {
                package: basename.to_string(),
                patch: patch.clone(),
                source,
            })?;
    }

    Ok(source_dir)
}
