//! Store directory management.
//!
//! ```text
//! <store_path>/
//! ├─ CURRENT   # Marks the directory as a store, holds the format tag
//! ├─ LOCK      # Advisory lock held for the lifetime of a connection
//! └─ LOG       # Record log
//! ```
//!
//! A directory is a store if and only if `CURRENT` exists in it. The
//! `create_if_missing` / `error_if_exists` checks are made against that.

use crate::error::{EngineError, EngineResult};
use crate::options::EngineOptions;
use fs2::FileExt;
use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

const CURRENT_FILE: &str = "CURRENT";
const LOCK_FILE: &str = "LOCK";
const LOG_FILE: &str = "LOG";

/// Format tag written to `CURRENT`.
const FORMAT_TAG: &str = "burrow-1";

/// An opened store directory. Holds the exclusive lock until dropped.
#[derive(Debug)]
pub(crate) struct StoreDir {
    path: PathBuf,
    lock_file: File,
}

impl StoreDir {
    /// Opens the directory at `path`, creating it if the options allow.
    ///
    /// # Errors
    ///
    /// - [`EngineError::NotFound`] if no store exists and `create_if_missing` is false
    /// - [`EngineError::AlreadyExists`] if a store exists and `error_if_exists` is true
    /// - [`EngineError::Locked`] if another connection holds the lock
    /// - [`EngineError::Corruption`] if `CURRENT` carries an unknown tag
    pub fn open(path: &Path, options: &EngineOptions) -> EngineResult<Self> {
        let current_path = path.join(CURRENT_FILE);
        let exists = current_path.is_file();

        if !exists && !options.create_if_missing {
            return Err(EngineError::NotFound {
                path: path.to_path_buf(),
            });
        }
        if exists && options.error_if_exists {
            return Err(EngineError::AlreadyExists {
                path: path.to_path_buf(),
            });
        }

        fs::create_dir_all(path)?;
        if !path.is_dir() {
            return Err(EngineError::invalid_argument(format!(
                "path is not a directory: {}",
                path.display()
            )));
        }

        let lock_file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(path.join(LOCK_FILE))?;
        if lock_file.try_lock_exclusive().is_err() {
            return Err(EngineError::Locked {
                path: path.to_path_buf(),
            });
        }

        if exists {
            let tag = fs::read_to_string(&current_path)?;
            if tag.trim() != FORMAT_TAG {
                return Err(EngineError::corruption(format!(
                    "unrecognized store format {:?} in {}",
                    tag.trim(),
                    current_path.display()
                )));
            }
        } else {
            Self::write_current(path)?;
        }

        Ok(Self {
            path: path.to_path_buf(),
            lock_file,
        })
    }

    /// Writes `CURRENT` via a temporary file and rename.
    fn write_current(path: &Path) -> EngineResult<()> {
        let temp_path = path.join(format!("{CURRENT_FILE}.tmp"));
        let mut file = File::create(&temp_path)?;
        writeln!(file, "{FORMAT_TAG}")?;
        file.sync_all()?;
        drop(file);

        fs::rename(&temp_path, path.join(CURRENT_FILE))?;
        Ok(())
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    #[must_use]
    pub fn log_path(&self) -> PathBuf {
        self.path.join(LOG_FILE)
    }
}

impl Drop for StoreDir {
    fn drop(&mut self) {
        let _ = FileExt::unlock(&self.lock_file);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn creates_store_when_missing() {
        let temp = tempdir().unwrap();
        let path = temp.path().join("store");

        let dir = StoreDir::open(&path, &EngineOptions::default()).unwrap();
        assert!(path.join(CURRENT_FILE).is_file());
        assert_eq!(dir.path(), path);
        assert_eq!(dir.log_path(), path.join(LOG_FILE));
    }

    #[test]
    fn missing_store_without_create() {
        let temp = tempdir().unwrap();
        let options = EngineOptions {
            create_if_missing: false,
            ..EngineOptions::default()
        };

        let result = StoreDir::open(&temp.path().join("absent"), &options);
        assert!(matches!(result, Err(EngineError::NotFound { .. })));
    }

    #[test]
    fn existing_store_with_error_if_exists() {
        let temp = tempdir().unwrap();
        let path = temp.path().join("store");
        drop(StoreDir::open(&path, &EngineOptions::default()).unwrap());

        let options = EngineOptions {
            error_if_exists: true,
            ..EngineOptions::default()
        };
        let result = StoreDir::open(&path, &options);
        assert!(matches!(result, Err(EngineError::AlreadyExists { .. })));
    }

    #[test]
    fn plain_directory_is_not_a_store() {
        let temp = tempdir().unwrap();
        let options = EngineOptions {
            create_if_missing: false,
            ..EngineOptions::default()
        };

        let result = StoreDir::open(temp.path(), &options);
        assert!(matches!(result, Err(EngineError::NotFound { .. })));
    }

    #[test]
    fn lock_prevents_second_open() {
        let temp = tempdir().unwrap();
        let path = temp.path().join("store");

        let _first = StoreDir::open(&path, &EngineOptions::default()).unwrap();
        let second = StoreDir::open(&path, &EngineOptions::default());
        assert!(matches!(second, Err(EngineError::Locked { .. })));
    }

    #[test]
    fn lock_released_on_drop() {
        let temp = tempdir().unwrap();
        let path = temp.path().join("store");

        drop(StoreDir::open(&path, &EngineOptions::default()).unwrap());
        assert!(StoreDir::open(&path, &EngineOptions::default()).is_ok());
    }

    #[test]
    fn foreign_format_tag_is_corruption() {
        let temp = tempdir().unwrap();
        fs::write(temp.path().join(CURRENT_FILE), "something-else\n").unwrap();

        let result = StoreDir::open(temp.path(), &EngineOptions::default());
        assert!(matches!(result, Err(EngineError::Corruption(_))));
    }
}
