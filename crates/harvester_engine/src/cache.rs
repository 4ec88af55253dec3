use std::fs;
use std::io;
use std::path::PathBuf;

use harvester_core::{parse_detail, DetailPayload, ProgramId, SchemaError};

use crate::filename::{cache_filename, program_id_from_filename};
use crate::persist::{ensure_output_dir, AtomicFileWriter, PersistError};

#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    #[error("corrupt cache file {}: {source} (delete it to force a re-fetch)", .path.display())]
    Corrupt {
        program_id: ProgramId,
        path: PathBuf,
        source: SchemaError,
    },
    #[error("cannot read cache file {}: {source}", .path.display())]
    Io { path: PathBuf, source: io::Error },
    #[error("cannot write cache file: {0}")]
    Persist(#[from] PersistError),
}

/// One directory, one `{programId}.json` file per program, holding the
/// verbatim detail response.
#[derive(Debug, Clone)]
pub struct CacheStore {
    dir: PathBuf,
    writer: AtomicFileWriter,
}

impl CacheStore {
    /// Open (creating if needed) the cache directory.
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self, CacheError> {
        let dir = dir.into();
        ensure_output_dir(&dir)?;
        Ok(Self::at(dir))
    }

    pub fn at(dir: impl Into<PathBuf>) -> Self {
        let dir = dir.into();
        Self {
            writer: AtomicFileWriter::new(dir.clone()),
            dir,
        }
    }

    pub fn path_for(&self, program_id: ProgramId) -> PathBuf {
        self.dir.join(cache_filename(program_id))
    }

    /// True iff a complete payload file is present. Writes are atomic, so
    /// a file under the final name is always complete.
    pub fn exists(&self, program_id: ProgramId) -> bool {
        self.path_for(program_id).is_file()
    }

    pub fn read_bytes(&self, program_id: ProgramId) -> Result<Vec<u8>, CacheError> {
        let path = self.path_for(program_id);
        fs::read(&path).map_err(|source| CacheError::Io { path, source })
    }

    pub fn read(&self, program_id: ProgramId) -> Result<DetailPayload, CacheError> {
        let bytes = self.read_bytes(program_id)?;
        parse_detail(&bytes).map_err(|source| CacheError::Corrupt {
            program_id,
            path: self.path_for(program_id),
            source,
        })
    }

    /// Store the payload bytes verbatim, replacing any previous file in one
    /// step. Never merges.
    pub fn write(&self, program_id: ProgramId, bytes: &[u8]) -> Result<PathBuf, CacheError> {
        Ok(self.writer.write(&cache_filename(program_id), bytes)?)
    }

    /// Ids with a cache file, ascending. Files that do not follow the naming
    /// scheme are ignored.
    pub fn cached_ids(&self) -> Result<Vec<ProgramId>, CacheError> {
        let entries = match fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(source) => {
                return Err(CacheError::Io {
                    path: self.dir.clone(),
                    source,
                })
            }
        };
        let mut ids: Vec<ProgramId> = entries
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().map(|ft| ft.is_file()).unwrap_or(false))
            .filter_map(|e| program_id_from_filename(e.file_name().to_str()?))
            .collect();
        ids.sort_unstable();
        Ok(ids)
    }
}
