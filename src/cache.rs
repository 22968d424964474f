//! Content-addressed artifact store
//!
//! Entries are sharded by digest prefix:
//!
//! ```text
//! <root>/cache/<digest[0..4]>/<digest[4..8]>/<digest[8..]>/<filename>
//! ```
//!
//! The layout is shared with existing caches and must not change.
//!
//! Every write goes to a temporary file inside the shard directory and is then
//! renamed over the target, so readers only ever see complete entries. Two
//! writers adopting the same digest concurrently both succeed; the bytes are
//! identical and the last rename wins. No cross-process locking is used.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::error::{CacheError, Result};
use crate::hash::digest_file;
use crate::types::ContentDigest;

/// Name of the directory under the root that holds all entries
pub const CACHE_DIR_NAME: &str = "cache";

const LEVEL_1_LEN: usize = 4;
const LEVEL_2_LEN: usize = 4;

/// Prefix of in-flight adoption files; never treated as entries
const ADOPT_PREFIX: &str = ".adopt-";

/// Shard directory for a digest: `<root>/cache/<4>/<4>/<56>`
pub fn shard_dir(root: &Path, digest: &ContentDigest) -> PathBuf {
    let hex = digest.as_str();
    root.join(CACHE_DIR_NAME)
        .join(&hex[..LEVEL_1_LEN])
        .join(&hex[LEVEL_1_LEN..LEVEL_1_LEN + LEVEL_2_LEN])
        .join(&hex[LEVEL_1_LEN + LEVEL_2_LEN..])
}

/// The on-disk store of verified artifacts
#[derive(Clone, Debug)]
pub struct ArtifactCache {
    root: PathBuf,
}

impl ArtifactCache {
    /// Open a store rooted at `root`; nothing is created until the first adoption
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Root directory
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Deterministic path of the entry for `(digest, filename)`
    pub fn cache_path(&self, digest: &ContentDigest, filename: &str) -> Result<PathBuf> {
        validate_filename(filename)?;
        Ok(shard_dir(&self.root, digest).join(filename))
    }

    /// Whether an entry exists for `(digest, filename)`; no hashing, no sibling reuse
    pub fn contains(&self, digest: &ContentDigest, filename: &str) -> bool {
        self.cache_path(digest, filename)
            .is_ok_and(|path| path.is_file())
    }

    /// Find the entry for `(digest, filename)`, reusing a sibling if needed
    ///
    /// If the exact entry exists it is returned, re-hashed first when `verify`
    /// is set; an entry that fails re-verification is a
    /// [`CacheError::CorruptEntry`]. Otherwise files in the same shard directory
    /// (the same content cached under another name) are checked and the first
    /// match is copied to `filename`. Returns `None` when nothing usable exists.
    pub fn locate(
        &self,
        digest: &ContentDigest,
        filename: &str,
        verify: bool,
    ) -> Result<Option<PathBuf>> {
        let target = self.cache_path(digest, filename)?;

        if target.is_file() {
            if verify {
                let actual = digest_file(&target)?;
                if actual != *digest {
                    return Err(CacheError::CorruptEntry {
                        path: target,
                        expected: digest.clone(),
                        actual,
                    }
                    .into());
                }
            }
            return Ok(Some(target));
        }

        let shard = shard_dir(&self.root, digest);
        let entries = match fs::read_dir(&shard) {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        for entry in entries {
            let entry = entry?;
            if !entry.file_type()?.is_file() || is_adoption_file(&entry.file_name()) {
                continue;
            }
            let sibling = entry.path();
            if verify {
                match digest_file(&sibling) {
                    Ok(actual) if actual == *digest => {}
                    Ok(actual) => {
                        tracing::warn!(
                            path = %sibling.display(),
                            expected = %digest,
                            actual = %actual,
                            "Ignoring cache sibling with mismatched digest"
                        );
                        continue;
                    }
                    // removed by someone else since the listing
                    Err(e) if e.kind() == io::ErrorKind::NotFound => continue,
                    Err(e) => return Err(e.into()),
                }
            }

            tracing::debug!(
                digest = %digest,
                from = %sibling.display(),
                filename = filename,
                "Reusing cached sibling under new filename"
            );
            copy_into_place(&sibling, &target)?;
            return Ok(Some(target));
        }

        Ok(None)
    }

    /// Adopt `source` into the store as `(expected, filename)`
    ///
    /// Fails with [`CacheError::DigestMismatch`] without touching the store if
    /// the file's digest is not `expected`. An existing entry (or sibling) is
    /// reused rather than copied again.
    pub fn adopt(&self, source: &Path, expected: &ContentDigest, filename: &str) -> Result<PathBuf> {
        validate_filename(filename)?;

        let actual = digest_file(source)?;
        if actual != *expected {
            return Err(CacheError::DigestMismatch {
                path: source.to_path_buf(),
                filename: filename.to_string(),
                expected: expected.clone(),
                actual,
            }
            .into());
        }

        if let Some(existing) = self.locate(expected, filename, true)? {
            return Ok(existing);
        }

        let target = self.cache_path(expected, filename)?;
        copy_into_place(source, &target)?;
        tracing::debug!(digest = %expected, path = %target.display(), "Adopted artifact into cache");
        Ok(target)
    }
}

fn validate_filename(filename: &str) -> Result<()> {
    let invalid = filename.is_empty()
        || filename == "."
        || filename == ".."
        || filename.contains(['/', '\\'])
        || filename.starts_with(ADOPT_PREFIX);
    if invalid {
        return Err(CacheError::InvalidFilename(filename.to_string()).into());
    }
    Ok(())
}

fn is_adoption_file(name: &std::ffi::OsStr) -> bool {
    name.to_str().is_some_and(|n| n.starts_with(ADOPT_PREFIX))
}

/// Copy `source` to `target` through a temp file in the target's directory
fn copy_into_place(source: &Path, target: &Path) -> Result<()> {
    let dir = target
        .parent()
        .ok_or_else(|| CacheError::InvalidFilename(target.display().to_string()))?;

    // create_dir_all treats a concurrently created directory as success
    fs::create_dir_all(dir).map_err(|source| CacheError::CreateDir {
        path: dir.to_path_buf(),
        source,
    })?;

    let mut staged = tempfile::Builder::new()
        .prefix(ADOPT_PREFIX)
        .tempfile_in(dir)?;
    let mut input = fs::File::open(source)?;
    io::copy(&mut input, staged.as_file_mut())?;
    staged.as_file().sync_all()?;
    staged.persist(target).map_err(|e| e.error)?;
    Ok(())
}
