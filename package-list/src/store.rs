// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

/*! Parsed package lists. */

use {
    crate::{
        error::{PackageListError, Result},
        record::{PackageRecord, RecordFields},
    },
    log::{debug, warn},
    std::{
        collections::HashMap,
        fmt::{Display, Formatter},
        io::BufRead,
        path::{Path, PathBuf},
    },
};

/// A non-fatal problem encountered while parsing a package list.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum ParseWarning {
    /// A `NAME=VALUE` token with an unrecognized name.
    UnknownField { line: usize, name: String },
    /// A token on a record line lacking a `=`.
    MalformedToken { line: usize, token: String },
}

impl Display for ParseWarning {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UnknownField { line, name } => {
                write!(f, "line {}: ignoring unknown field {}", line, name)
            }
            Self::MalformedToken { line, token } => {
                write!(f, "line {}: ignoring token without '=': {}", line, token)
            }
        }
    }
}

/// An ordered collection of packages parsed from a package list document.
///
/// A package list is a line based text document. Blank lines and lines whose first
/// non-space character is `#` are ignored. Every other line defines a package through
/// whitespace separated `NAME=VALUE` tokens:
///
/// ```text
/// URL=<url> [SHA1=<sha1>] [SRCDIR=<dir>] [PATCHES=<name>]
/// GIT=<url> BRANCH=<name> [SHA1=<sha1>] [SRCDIR=<dir>]
/// ```
///
/// Records retain the order they appear in. Lookups are by package basename and
/// return `None` for packages that aren't defined.
#[derive(Clone, Debug, Default)]
pub struct PackageListStore {
    records: Vec<PackageRecord>,
    by_basename: HashMap<String, usize>,
    warnings: Vec<ParseWarning>,
}

impl PackageListStore {
    /// Parse the package list document at the given path.
    pub fn parse(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();

        let not_found = |source| PackageListError::DocumentNotFound {
            path: path.to_path_buf(),
            source,
        };

        let fh = std::fs::File::open(path).map_err(not_found)?;

        // Directories open fine on some platforms but can't be read as documents.
        if !fh.metadata().map_err(not_found)?.is_file() {
            return Err(not_found(std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                "not a regular file",
            )));
        }

        Self::from_reader(std::io::BufReader::new(fh))
    }

    /// Parse a package list document from a string.
    pub fn parse_str(data: &str) -> Result<Self> {
        Self::from_reader(data.as_bytes())
    }

    /// Parse a package list document from a reader.
    ///
    /// Parsing aborts on the first fatal error.
    pub fn from_reader(reader: impl BufRead) -> Result<Self> {
        let mut store = Self::default();

        for (i, line) in reader.lines().enumerate() {
            let number = i + 1;
            let line = line.map_err(|source| PackageListError::DocumentRead {
                line: number,
                source,
            })?;

            store.parse_line(number, &line)?;
        }

        Ok(store)
    }

    fn parse_line(&mut self, number: usize, line: &str) -> Result<()> {
        let line = line.trim();

        if line.is_empty() || line.starts_with('#') {
            return Ok(());
        }

        let mut fields = RecordFields::default();

        for token in line.split_whitespace() {
            match token.split_once('=') {
                Some((name, value)) => {
                    if !fields.set(name, value) {
                        self.add_warning(ParseWarning::UnknownField {
                            line: number,
                            name: name.to_string(),
                        });
                    }
                }
                None => {
                    self.add_warning(ParseWarning::MalformedToken {
                        line: number,
                        token: token.to_string(),
                    });
                }
            }
        }

        let record = PackageRecord::from_fields(self.records.len() + 1, number, fields)?;

        if self.by_basename.contains_key(record.basename()) {
            return Err(PackageListError::DuplicateBasename {
                line: number,
                basename: record.basename().to_string(),
            });
        }

        debug!(
            "line {}: package {} version {} from {}",
            number,
            record.basename(),
            record.version(),
            record.filename()
        );

        self.by_basename
            .insert(record.basename().to_string(), self.records.len());
        self.records.push(record);

        Ok(())
    }

    fn add_warning(&mut self, warning: ParseWarning) {
        warn!("{}", warning);
        self.warnings.push(warning);
    }

    /// Non-fatal problems encountered during parsing.
    pub fn warnings(&self) -> &[ParseWarning] {
        &self.warnings
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Iterate over records in document order.
    pub fn iter(&self) -> std::slice::Iter<'_, PackageRecord> {
        self.records.iter()
    }

    /// Obtain the record for a package.
    pub fn get(&self, basename: &str) -> Option<&PackageRecord> {
        self.by_basename
            .get(basename)
            .map(|index| &self.records[*index])
    }

    /// Basenames of all packages, in document order.
    pub fn basenames(&self) -> impl Iterator<Item = &str> + '_ {
        self.records.iter().map(|record| record.basename())
    }

    pub fn version(&self, basename: &str) -> Option<&str> {
        self.get(basename).map(|record| record.version())
    }

    /// `<basename>-<version>` of a package.
    pub fn full_name(&self, basename: &str) -> Option<String> {
        self.get(basename).map(|record| record.full_name())
    }

    /// File name of a package's source archive.
    pub fn filename(&self, basename: &str) -> Option<&str> {
        self.get(basename).map(|record| record.filename())
    }

    pub fn url(&self, basename: &str) -> Option<&str> {
        self.get(basename).and_then(|record| record.url())
    }

    pub fn git_url(&self, basename: &str) -> Option<&str> {
        self.get(basename).and_then(|record| record.git_url())
    }

    pub fn git_branch(&self, basename: &str) -> Option<&str> {
        self.get(basename).and_then(|record| record.git_branch())
    }

    pub fn sha1(&self, basename: &str) -> Option<&str> {
        self.get(basename).and_then(|record| record.sha1())
    }

    pub fn patches(&self, basename: &str) -> Option<&str> {
        self.get(basename).and_then(|record| record.patches())
    }

    pub fn src_dir(&self, basename: &str) -> Option<&str> {
        self.get(basename).map(|record| record.src_dir())
    }

    /// Unpack a package's source archive and apply its patches.
    ///
    /// Archives are extracted natively and patches are applied with `patch -p1`.
    /// See [crate::unpack::unpack_and_patch] for the details. Returns the path of
    /// the extracted source directory.
    pub fn unpack_and_patch(
        &self,
        basename: &str,
        archive_dir: &Path,
        dest_dir: &Path,
    ) -> Result<PathBuf> {
        crate::unpack::unpack_and_patch(
            self,
            basename,
            archive_dir,
            dest_dir,
            &crate::unpack::NativeArchiveUnpacker,
            &crate::unpack::PatchCommand::default(),
        )
    }

    /// Verify the SHA-1 of a package's source archive in `archive_dir`.
    pub fn verify_archive(&self, basename: &str, archive_dir: &Path) -> Result<()> {
        crate::digest::verify_archive(self, basename, archive_dir)
    }
}

impl<'a> IntoIterator for &'a PackageListStore {
    type Item = &'a PackageRecord;
    type IntoIter = std::slice::Iter<'a, PackageRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.iter()
    }
}

#[cfg(test)]
mod tests {
    use {super::*, indoc::indoc};

    const PACKAGES: &str = indoc! {"
        # Source packages for the emulator host libraries.

        URL=http://zlib.net/zlib-1.2.8.tar.gz SHA1=a4d316c404ff54ca545ea71a27af7dbc29817088
        URL=http://downloads.sourceforge.net/expat/expat-2.1.0.tar.gz
          # Indented comment.
        URL=ftp://ftp.freedesktop.org/pub/mesa/10.4.2/MesaLib-10.4.2.tar.gz SRCDIR=Mesa-10.4.2
        GIT=git://git.kernel.org/pub/scm/utils/dtc/dtc.git BRANCH=master
        URL=http://x/libffi-3.2.1.tar.gz PATCHES=libffi-3.2.1-patches.tar.xz
    "};

    #[test]
    fn parse_document() -> Result<()> {
        let store = PackageListStore::parse_str(PACKAGES)?;

        assert_eq!(store.len(), 5);
        assert!(!store.is_empty());
        assert_eq!(
            store.basenames().collect::<Vec<_>>(),
            vec!["zlib", "expat", "MesaLib", "dtc", "libffi"]
        );
        assert_eq!(
            store.iter().map(|r| r.index()).collect::<Vec<_>>(),
            vec![1, 2, 3, 4, 5]
        );
        assert!(store.warnings().is_empty());

        Ok(())
    }

    #[test]
    fn url_lookups() -> Result<()> {
        let store = PackageListStore::parse_str("URL=http://x/zlib-1.2.8.tar.gz\n")?;

        assert_eq!(store.full_name("zlib").as_deref(), Some("zlib-1.2.8"));
        assert_eq!(store.version("zlib"), Some("1.2.8"));
        assert_eq!(store.filename("zlib"), Some("zlib-1.2.8.tar.gz"));
        assert_eq!(store.url("zlib"), Some("http://x/zlib-1.2.8.tar.gz"));
        assert_eq!(store.src_dir("zlib"), Some("zlib-1.2.8"));
        assert_eq!(store.git_url("zlib"), None);
        assert_eq!(store.git_branch("zlib"), None);
        assert_eq!(store.sha1("zlib"), None);
        assert_eq!(store.patches("zlib"), None);

        Ok(())
    }

    #[test]
    fn git_lookups() -> Result<()> {
        let store = PackageListStore::parse_str(PACKAGES)?;

        assert_eq!(store.filename("dtc"), Some("dtc-master.tar.xz"));
        assert_eq!(store.git_branch("dtc"), Some("master"));
        assert_eq!(
            store.git_url("dtc"),
            Some("git://git.kernel.org/pub/scm/utils/dtc/dtc.git")
        );
        assert_eq!(store.version("dtc"), Some("master"));
        assert_eq!(store.url("dtc"), None);

        Ok(())
    }

    #[test]
    fn explicit_fields() -> Result<()> {
        let store = PackageListStore::parse_str(PACKAGES)?;

        assert_eq!(store.src_dir("MesaLib"), Some("Mesa-10.4.2"));
        assert_eq!(store.full_name("MesaLib").as_deref(), Some("MesaLib-10.4.2"));
        assert_eq!(
            store.sha1("zlib"),
            Some("a4d316c404ff54ca545ea71a27af7dbc29817088")
        );
        assert_eq!(store.patches("libffi"), Some("libffi-3.2.1-patches.tar.xz"));

        Ok(())
    }

    #[test]
    fn unknown_package_lookups() -> Result<()> {
        let store = PackageListStore::parse_str(PACKAGES)?;

        assert!(store.get("nonexistent").is_none());
        assert_eq!(store.version("nonexistent"), None);
        assert_eq!(store.full_name("nonexistent"), None);
        assert_eq!(store.filename("nonexistent"), None);
        assert_eq!(store.src_dir("nonexistent"), None);

        Ok(())
    }

    #[test]
    fn unknown_fields_warn() -> Result<()> {
        let store = PackageListStore::parse_str(indoc! {"
            URL=http://x/zlib-1.2.8.tar.gz LICENSE=zlib
            URL=http://x/expat-2.1.0.tar.gz stray
        "})?;

        assert_eq!(store.len(), 2);
        assert_eq!(
            store.warnings(),
            &[
                ParseWarning::UnknownField {
                    line: 1,
                    name: "LICENSE".into()
                },
                ParseWarning::MalformedToken {
                    line: 2,
                    token: "stray".into()
                },
            ]
        );
        // Recognized fields on the same line still apply.
        assert_eq!(store.version("zlib"), Some("1.2.8"));

        Ok(())
    }

    #[test]
    fn conflicting_source_fields() {
        let res = PackageListStore::parse_str(indoc! {"
            URL=http://x/zlib-1.2.8.tar.gz
            URL=http://x/dtc-1.0.tar.gz GIT=git://h/dtc.git BRANCH=master
        "});

        assert!(matches!(
            res,
            Err(PackageListError::ConflictingSourceFields { line: 2 })
        ));
    }

    #[test]
    fn missing_branch() {
        let res = PackageListStore::parse_str("\n\nGIT=git://h/dtc.git\n");

        assert!(matches!(
            res,
            Err(PackageListError::MissingBranch { line: 3 })
        ));
    }

    #[test]
    fn missing_source_field() {
        let res = PackageListStore::parse_str("SHA1=abc SRCDIR=foo\n");

        assert!(matches!(
            res,
            Err(PackageListError::MissingSourceField { line: 1 })
        ));
    }

    // Repeating a basename is rejected rather than merging or replacing the
    // earlier record.
    #[test]
    fn duplicate_basename_rejected() {
        let res = PackageListStore::parse_str(indoc! {"
            URL=http://x/dtc-1.4.0.tar.gz
            GIT=git://h/dtc.git BRANCH=master
        "});

        match res {
            Err(PackageListError::DuplicateBasename { line, basename }) => {
                assert_eq!(line, 2);
                assert_eq!(basename, "dtc");
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn record_count_matches_record_lines() -> Result<()> {
        let store = PackageListStore::parse_str(PACKAGES)?;

        let record_lines = PACKAGES
            .lines()
            .map(|l| l.trim())
            .filter(|l| !l.is_empty() && !l.starts_with('#'))
            .count();

        assert_eq!(store.basenames().count(), record_lines);

        Ok(())
    }

    #[test]
    fn parse_missing_document() -> anyhow::Result<()> {
        let td = tempfile::tempdir()?;
        let path = td.path().join("packages.txt");

        assert!(matches!(
            PackageListStore::parse(&path),
            Err(PackageListError::DocumentNotFound { .. })
        ));

        std::fs::write(&path, PACKAGES)?;
        let store = PackageListStore::parse(&path)?;
        assert_eq!(store.len(), 5);

        Ok(())
    }

    #[test]
    fn parse_directory_document() -> anyhow::Result<()> {
        let td = tempfile::tempdir()?;

        match PackageListStore::parse(td.path()) {
            Err(PackageListError::DocumentNotFound { path, .. }) => {
                assert_eq!(path, td.path());
            }
            other => panic!("unexpected result: {:?}", other),
        }

        Ok(())
    }

    #[test]
    fn empty_document() -> Result<()> {
        let store = PackageListStore::parse_str("\n# nothing here\n   \n")?;

        assert!(store.is_empty());
        assert_eq!(store.basenames().count(), 0);

        Ok(())
    }
}
