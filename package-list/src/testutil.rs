// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use {
    crate::archive::ArchiveFormat,
    std::{fs::File, io::Write, path::Path},
};

fn write_tar<W: Write>(writer: W, entries: &[(&str, &str)]) -> std::io::Result<W> {
    let mut builder = tar::Builder::new(writer);

    for (path, content) in entries {
        let mut header = tar::Header::new_gnu();
        header.set_size(content.len() as u64);
        header.set_mode(0o644);
        header.set_mtime(0);
        header.set_cksum();

        builder.append_data(&mut header, path, content.as_bytes())?;
    }

    builder.into_inner()
}

/// Write a compressed tarball holding the given files.
///
/// The compression is derived from the filename of `path`.
pub fn write_archive(path: &Path, entries: &[(&str, &str)]) -> std::io::Result<()> {
    let name = path
        .file_name()
        .map(|name| name.to_string_lossy().to_string())
        .unwrap_or_default();

    let fh = File::create(path)?;

    match ArchiveFormat::from_filename(&name) {
        Some(ArchiveFormat::TarGz) => {
            write_tar(
                flate2::write::GzEncoder::new(fh, flate2::Compression::default()),
                entries,
            )?
            .finish()?;
        }
        Some(ArchiveFormat::TarBz2) => {
            write_tar(
                bzip2::write::BzEncoder::new(fh, bzip2::Compression::default()),
                entries,
            )?
            .finish()?;
        }
        Some(ArchiveFormat::TarXz) => {
            write_tar(xz2::write::XzEncoder::new(fh, 6), entries)?.finish()?;
        }
        _ => panic!("unsupported test archive: {}", path.display()),
    }

    Ok(())
}
