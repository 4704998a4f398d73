// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

/*! Content digest verification of package archives. */

use {
    crate::{
        error::{PackageListError, Result},
        store::PackageListStore,
    },
    log::info,
    sha1::{Digest, Sha1},
    std::path::Path,
};

/// Compute the hex encoded SHA-1 of a file's content.
pub fn sha1_file(path: &Path) -> std::io::Result<String> {
    let mut fh = std::fs::File::open(path)?;
    let mut hasher = Sha1::new();
    std::io::copy(&mut fh, &mut hasher)?;

    Ok(hex::encode(hasher.finalize()))
}

/// Verify the archive of a package in `archive_dir` against its declared SHA-1.
///
/// Hex digests are compared case insensitively.
pub fn verify_archive(store: &PackageListStore, basename: &str, archive_dir: &Path) -> Result<()> {
    let record = store
        .get(basename)
        .ok_or_else(|| PackageListError::UnknownPackage(basename.to_string()))?;

    let expected = record
        .sha1()
        .ok_or_else(|| PackageListError::MissingSha1(basename.to_string()))?;

    let path = archive_dir.join(record.filename());
    let actual = sha1_file(&path).map_err(|source| PackageListError::Io {
        path: path.clone(),
        source,
    })?;

    if actual.eq_ignore_ascii_case(expected) {
        info!("{}: verified SHA1 of {}", basename, path.display());
        Ok(())
    } else {
        Err(PackageListError::Sha1Mismatch {
            package: basename.to_string(),
            path,
            expected: expected.to_string(),
            actual,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // SHA-1 of "hello world".
    const HELLO_SHA1: &str = "2aae6c35c94fcfb415dbe95f408b9ce91ee846ed";

    #[test]
    fn file_digest() -> std::io::Result<()> {
        let td = tempfile::tempdir()?;
        let path = td.path().join("data");
        std::fs::write(&path, b"hello world")?;

        assert_eq!(sha1_file(&path)?, HELLO_SHA1);

        Ok(())
    }

    #[test]
    fn verify() -> anyhow::Result<()> {
        let td = tempfile::tempdir()?;
        std::fs::write(td.path().join("good-1.0.tar.gz"), b"hello world")?;
        std::fs::write(td.path().join("bad-1.0.tar.gz"), b"goodbye")?;

        let store = PackageListStore::parse_str(&format!(
            "URL=http://x/good-1.0.tar.gz SHA1={}\n\
             URL=http://x/bad-1.0.tar.gz SHA1={}\n\
             URL=http://x/none-1.0.tar.gz\n",
            HELLO_SHA1.to_uppercase(),
            HELLO_SHA1
        ))?;

        verify_archive(&store, "good", td.path())?;

        match verify_archive(&store, "bad", td.path()) {
            Err(PackageListError::Sha1Mismatch {
                package,
                expected,
                actual,
                ..
            }) => {
                assert_eq!(package, "bad");
                assert_eq!(expected, HELLO_SHA1);
                assert_ne!(actual, HELLO_SHA1);
            }
            other => panic!("unexpected result: {:?}", other),
        }

        assert!(matches!(
            verify_archive(&store, "none", td.path()),
            Err(PackageListError::MissingSha1(_))
        ));
        assert!(matches!(
            verify_archive(&store, "missing", td.path()),
            Err(PackageListError::UnknownPackage(_))
        ));

        Ok(())
    }
}
