use crate::error::{Error, Result};
use crate::hash;
use crate::in_toto::{DigestSet, Subject};

use log::debug;
use std::path::{Component, Path, PathBuf};
use walkdir::WalkDir;

/// Anything that can name the artifacts a Statement is about.
pub trait Subjecter {
    fn subjects(&self) -> Result<Vec<Subject>>;
}

/// Resolves subjects by hashing every regular file under a path.
///
/// `root` may be a single file or a directory. Subject names are relative to
/// `root`; when `root` is itself the file, its base name is used.
#[derive(Debug, Clone)]
pub struct FilePathSubjecter {
    root: PathBuf,
}

impl FilePathSubjecter {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn subject_name(&self, path: &Path) -> String {
        let relative = path.strip_prefix(&self.root).unwrap_or(path);
        if relative.as_os_str().is_empty() {
            return self
                .root
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| self.root.to_string_lossy().into_owned());
        }

        relative
            .components()
            .filter_map(|c| match c {
                Component::Normal(part) => Some(part.to_string_lossy()),
                _ => None,
            })
            .collect::<Vec<_>>()
            .join("/")
    }
}

impl Subjecter for FilePathSubjecter {
    fn subjects(&self) -> Result<Vec<Subject>> {
        if std::fs::symlink_metadata(&self.root).is_err() {
            return Err(Error::NotFound(format!(
                "resource path not found: [provided={}]",
                self.root.display()
            )));
        }

        let mut subjects = Vec::new();
        for entry in WalkDir::new(&self.root).sort_by_file_name() {
            let entry = entry.map_err(|e| {
                let path = e.path().unwrap_or(&self.root).to_path_buf();
                match e.into_io_error() {
                    Some(io) => Error::file_io("failed to walk", &path, io),
                    None => Error::Validation(format!(
                        "filesystem loop detected under {}",
                        self.root.display()
                    )),
                }
            })?;

            // Follows symlinks, so a link to a file is hashed and a link to a
            // directory is skipped like the directory itself.
            let metadata = std::fs::metadata(entry.path())
                .map_err(|e| Error::file_io("failed to stat", entry.path(), e))?;
            if !metadata.is_file() {
                if !metadata.is_dir() {
                    debug!("skipping non-regular file {}", entry.path().display());
                }
                continue;
            }

            let digest = hash::calculate_file_hash(entry.path())?;
            subjects.push(Subject::new(
                self.subject_name(entry.path()),
                DigestSet::from([(hash::SHA256.to_string(), digest)]),
            ));
        }

        debug!(
            "resolved {} subject(s) from {}",
            subjects.len(),
            self.root.display()
        );
        Ok(subjects)
    }
}
