// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

/*! Archive format detection and extraction. */

use {
    log::debug,
    std::{
        fs::File,
        io::{BufReader, Read},
        path::Path,
    },
};

/// Archive formats a package can be distributed as.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum ArchiveFormat {
    Zip,
    TarGz,
    TarBz2,
    TarXz,
}

impl ArchiveFormat {
    /// All formats, multi-part extensions first.
    pub const ALL: [Self; 4] = [Self::TarGz, Self::TarBz2, Self::TarXz, Self::Zip];

    /// The filename extension of this format, including the leading dot.
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Zip => ".zip",
            Self::TarGz => ".tar.gz",
            Self::TarBz2 => ".tar.bz2",
            Self::TarXz => ".tar.xz",
        }
    }

    /// Resolve the format of a file from its name.
    ///
    /// Returns `None` if the name doesn't end in a recognized extension.
    pub fn from_filename(name: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|format| name.ends_with(format.extension()))
    }
}

/// Strip a recognized archive extension from a filename.
///
/// Names without a recognized extension are returned unchanged. e.g. `foo.tar.bz2`
/// becomes `foo` but `foo.tar` stays `foo.tar`.
pub fn strip_archive_extension(name: &str) -> &str {
    match ArchiveFormat::from_filename(name) {
        Some(format) => &name[..name.len() - format.extension().len()],
        None => name,
    }
}

fn zip_error(err: zip::result::ZipError) -> std::io::Error {
    std::io::Error::new(std::io::ErrorKind::Other, err)
}

/// Extract an archive into a directory.
///
/// The format is derived from the archive's filename. Members resolving to paths
/// outside `dest_dir` are rejected.
pub fn extract_archive(archive_path: &Path, dest_dir: &Path) -> std::io::Result<()> {
    let filename = archive_path
        .file_name()
        .map(|name| name.to_string_lossy().to_string())
        .unwrap_or_default();

    let format = ArchiveFormat::from_filename(&filename).ok_or_else(|| {
        std::io::Error::new(
            std::io::ErrorKind::InvalidInput,
            format!("unrecognized archive format: {}", archive_path.display()),
        )
    })?;

    let fh = BufReader::new(File::open(archive_path)?);

    match format {
        ArchiveFormat::Zip => extract_zip(fh, dest_dir),
        ArchiveFormat::TarGz => extract_tar(flate2::read::GzDecoder::new(fh), dest_dir),
        ArchiveFormat::TarBz2 => extract_tar(bzip2::read::BzDecoder::new(fh), dest_dir),
        ArchiveFormat::TarXz => extract_tar(xz2::read::XzDecoder::new(fh), dest_dir),
    }
}

fn extract_tar(reader: impl Read, dest_dir: &Path) -> std::io::Result<()> {
    let mut archive = tar::Archive::new(reader);
    archive.set_preserve_permissions(true);

    for entry in archive.entries()? {
        let mut entry = entry?;

        if !entry.unpack_in(dest_dir)? {
            return Err(std::io::Error::new(
                std::io::ErrorKind::InvalidData,
                format!(
                    "archive member escapes destination: {}",
                    entry.path()?.display()
                ),
            ));
        }

        debug!("extracted {}", entry.path()?.display());
    }

    Ok(())
}

#[cfg(unix)]
fn set_file_mode(path: &Path, mode: u32) -> std::io::Result<()> {
    use std::os::unix::fs::PermissionsExt;

    std::fs::set_permissions(path, std::fs::Permissions::from_mode(mode))
}

#[cfg(not(unix))]
fn set_file_mode(_path: &Path, _mode: u32) -> std::io::Result<()> {
    Ok(())
}

fn extract_zip(reader: BufReader<File>, dest_dir: &Path) -> std::io::Result<()> {
    let mut za = zip::ZipArchive::new(reader).map_err(zip_error)?;

    for i in 0..za.len() {
        let mut file = za.by_index(i).map_err(zip_error)?;

        let rel_path = file.enclosed_name().map(|p| p.to_path_buf()).ok_or_else(|| {
            std::io::Error::new(
                std::io::ErrorKind::InvalidData,
                format!("archive member escapes destination: {}", file.name()),
            )
        })?;
        let dest_path = dest_dir.join(&rel_path);

        if file.is_dir() {
            std::fs::create_dir_all(&dest_path)?;
            continue;
        }

        if let Some(parent) = dest_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let mut fh = File::create(&dest_path)?;
        std::io::copy(&mut file, &mut fh)?;

        if let Some(mode) = file.unix_mode() {
            set_file_mode(&dest_path, mode)?;
        }

        debug!("extracted {}", rel_path.display());
    }

    Ok(())
}
