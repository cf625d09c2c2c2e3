// Folder listing and the name -> path lookup used to resolve upload handles.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::error::{Result, UploadError};
use crate::natsort::natural_key;

/// A file (or any directory entry) found in a source folder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalFile {
    pub name: String,
    pub path: PathBuf,
}

/// List the direct entries of `folder`, skipping hidden ones.
///
/// Entries are not filtered by type and subfolders are not descended into.
/// The returned order is whatever the filesystem produced.
pub fn list_folder(folder: &Path) -> Result<Vec<LocalFile>> {
    if !folder.is_dir() {
        return Err(UploadError::NotFound(folder.to_path_buf()));
    }

    let mut files = Vec::new();
    for entry in fs::read_dir(folder)? {
        let entry = entry?;
        let name = match entry.file_name().into_string() {
            Ok(name) => name,
            Err(raw) => {
                warn!("Skipping entry with non UTF-8 name {:?} in {}", raw, folder.display());
                continue;
            }
        };
        if name.starts_with('.') {
            continue;
        }
        files.push(LocalFile {
            path: entry.path(),
            name,
        });
    }
    debug!("Listed {} entries in {}", files.len(), folder.display());
    Ok(files)
}

/// A source folder paired with its slot, files in natural order.
#[derive(Debug, Clone)]
pub struct SortedFolder {
    pub slot_name: String,
    pub path: PathBuf,
    pub files: Vec<LocalFile>,
}

impl SortedFolder {
    /// List `path` and sort the result with the natural key.
    pub fn load(slot_name: &str, path: &Path) -> Result<Self> {
        let mut files = list_folder(path)?;
        files.sort_by_cached_key(|f| natural_key(&f.name));
        Ok(Self::from_sorted(slot_name, path, files))
    }

    /// Build from files that are already in the wanted order.
    pub fn from_sorted(slot_name: &str, path: &Path, files: Vec<LocalFile>) -> Self {
        SortedFolder {
            slot_name: slot_name.to_string(),
            path: path.to_path_buf(),
            files,
        }
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

/// Maps a bare file name to its local path across all folders.
///
/// Keyed by name only: when two folders contain the same name, the folder
/// that comes later wins.
#[derive(Debug, Default)]
pub struct FileIndex {
    paths: HashMap<String, PathBuf>,
}

impl FileIndex {
    pub fn build(folders: &[SortedFolder]) -> Self {
        let mut paths = HashMap::new();
        for folder in folders {
            for file in &folder.files {
                if let Some(previous) = paths.insert(file.name.clone(), file.path.clone()) {
                    warn!(
                        "File name {} appears in more than one folder; {} replaces {}",
                        file.name,
                        file.path.display(),
                        previous.display()
                    );
                }
            }
        }
        FileIndex { paths }
    }

    pub fn resolve(&self, name: &str) -> Option<&Path> {
        self.paths.get(name).map(PathBuf::as_path)
    }

    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }
}
