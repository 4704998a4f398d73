// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

/*! Package lists describing buildable source packages.

A *package list* is a line oriented text document naming the source packages a
build consumes. Each record line declares where a package comes from, either an
archive URL (`URL=`) or a Git repository and branch (`GIT=` and `BRANCH=`), plus
optional metadata such as the expected SHA-1 of the archive (`SHA1=`), the directory
the archive extracts into (`SRCDIR=`) and the name of a patch tarball (`PATCHES=`).

[store::PackageListStore] parses a document and answers queries by package
*basename*, the unversioned package name derived from the URL. e.g. the record
`URL=http://zlib.net/zlib-1.2.8.tar.gz` defines the package `zlib` at version
`1.2.8` with the archive file `zlib-1.2.8.tar.gz`. Individual entries are
represented by [record::PackageRecord].

The [unpack] module extracts a package's archive and applies its patches. The
[archive] module implements archive format detection and extraction. The [digest]
module verifies archives against their declared SHA-1.

All fatal conditions are reported through [error::PackageListError]. Non-fatal
parse problems, such as unknown fields, are logged via the `log` crate and retained
as [store::ParseWarning].
*/

pub mod archive;
pub mod digest;
pub mod error;
pub mod record;
pub mod store;
#[cfg(test)]
mod testutil;
pub mod unpack;

pub use {
    error::{PackageListError, Result},
    record::{PackageRecord, PackageSource},
    store::{PackageListStore, ParseWarning},
};
