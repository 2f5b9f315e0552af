//! File-backed log storage.

use super::LogStorage;
use crate::error::{EngineError, EngineResult};
use std::fs::{self, File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

/// Log storage in a single file.
///
/// `rewrite` goes through a sibling `.tmp` file and a rename, so the log
/// file is always either the old or the new content.
#[derive(Debug)]
pub struct FileLog {
    path: PathBuf,
    file: File,
    size: u64,
}

impl FileLog {
    /// Opens or creates the log file at `path`.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be opened or created.
    pub fn open(path: &Path) -> EngineResult<Self> {
        let file = Self::open_file(path)?;
        let size = file.metadata()?.len();

        Ok(Self {
            path: path.to_path_buf(),
            file,
            size,
        })
    }

    /// Returns the path to the log file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn open_file(path: &Path) -> EngineResult<File> {
        Ok(OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(path)?)
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self.path.as_os_str().to_owned();
        name.push(".tmp");
        PathBuf::from(name)
    }
}

impl LogStorage for FileLog {
    fn read_all(&self) -> EngineResult<Vec<u8>> {
        let mut file = &self.file;
        file.seek(SeekFrom::Start(0))?;

        let mut data = Vec::with_capacity(self.size as usize);
        file.take(self.size).read_to_end(&mut data)?;
        Ok(data)
    }

    fn append(&mut self, data: &[u8]) -> EngineResult<u64> {
        let offset = self.size;
        if data.is_empty() {
            return Ok(offset);
        }

        self.file.seek(SeekFrom::End(0))?;
        self.file.write_all(data)?;
        self.size += data.len() as u64;
        Ok(offset)
    }

    fn sync(&mut self) -> EngineResult<()> {
        self.file.flush()?;
        self.file.sync_all()?;
        Ok(())
    }

    fn size(&self) -> EngineResult<u64> {
        Ok(self.size)
    }

    fn truncate(&mut self, new_size: u64) -> EngineResult<()> {
        if new_size > self.size {
            return Err(EngineError::invalid_argument(format!(
                "cannot truncate log to {new_size} bytes, it holds {}",
                self.size
            )));
        }

        self.file.set_len(new_size)?;
        self.file.sync_all()?;
        self.size = new_size;
        Ok(())
    }

    fn rewrite(&mut self, data: &[u8]) -> EngineResult<()> {
        let temp_path = self.temp_path();
        {
            let mut temp = File::create(&temp_path)?;
            temp.write_all(data)?;
            temp.sync_all()?;
        }

        fs::rename(&temp_path, &self.path)?;
        self.file = Self::open_file(&self.path)?;
        self.size = data.len() as u64;
        Ok(())
    }
}
