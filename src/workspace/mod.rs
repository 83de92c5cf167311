//! Local file workspace backing the file commands
//!
//! Every operation is confined to a single root directory. Names given by
//! the user are matched loosely (case-insensitive substring), while new names
//! must be plain file names so nothing can be moved outside the root.

use std::path::{Component, Path, PathBuf};

use serde::Serialize;
use tokio::fs;

/// Maximum number of entries returned by a listing
pub const LIST_LIMIT: usize = 50;

pub const FOLDER_MIME: &str = "inode/directory";

#[derive(Debug, thiserror::Error)]
pub enum WorkspaceError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid name: {0}")]
    InvalidName(String),

    #[error("'{0}' already exists")]
    AlreadyExists(String),

    #[error("'{0}' is a folder and cannot be read directly")]
    IsFolder(String),

    #[error("File too large: {size} bytes (max: {max} bytes)")]
    TooLarge { size: u64, max: u64 },

    #[error("Access denied: path '{0}' is outside the workspace")]
    OutsideRoot(String),
}

/// A file or folder inside the workspace
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Entry {
    pub name: String,
    pub path: PathBuf,
    pub is_dir: bool,
}

impl Entry {
    /// Best-effort MIME type derived from the file extension
    pub fn mime_type(&self) -> String {
        if self.is_dir {
            return FOLDER_MIME.to_string();
        }
        mime_guess::from_path(&self.path)
            .first_or_octet_stream()
            .essence_str()
            .to_string()
    }
}

pub struct FileWorkspace {
    root: PathBuf,
    max_file_size: u64,
}

impl FileWorkspace {
    pub fn new(root: impl Into<PathBuf>, max_file_size: u64) -> Self {
        Self {
            root: root.into(),
            max_file_size,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Every entry under the root, each folder's children in path order
    async fn walk(&self) -> Result<Vec<Entry>, WorkspaceError> {
        let mut entries = Vec::new();
        let mut pending = vec![self.root.clone()];

        while let Some(dir) = pending.pop() {
            let mut children = Vec::new();
            let mut read_dir = fs::read_dir(&dir).await?;
            while let Some(child) = read_dir.next_entry().await? {
                let file_type = child.file_type().await?;
                if file_type.is_symlink() {
                    continue;
                }
                children.push(Entry {
                    name: child.file_name().to_string_lossy().into_owned(),
                    path: child.path(),
                    is_dir: file_type.is_dir(),
                });
            }
            children.sort_by(|a, b| a.path.cmp(&b.path));

            // Sub-directories are pushed in reverse so the stack pops them in order.
            for child in children.iter().rev().filter(|c| c.is_dir) {
                pending.push(child.path.clone());
            }
            entries.extend(children);
        }

        Ok(entries)
    }

    /// Files and folders, capped at `LIST_LIMIT`
    pub async fn list(&self) -> Result<Vec<Entry>, WorkspaceError> {
        let mut entries = self.walk().await?;
        entries.truncate(LIST_LIMIT);
        Ok(entries)
    }

    /// First entry whose name contains `name`, ignoring case
    ///
    /// Files and folders both match unless `folders_only` is set.
    pub async fn find(
        &self,
        name: &str,
        folders_only: bool,
    ) -> Result<Option<Entry>, WorkspaceError> {
        let needle = name.to_lowercase();
        if needle.is_empty() {
            return Ok(None);
        }

        let mut matches: Vec<Entry> = self
            .walk()
            .await?
            .into_iter()
            .filter(|e| (e.is_dir || !folders_only) && e.name.to_lowercase().contains(&needle))
            .collect();
        matches.sort_by(|a, b| a.path.cmp(&b.path));

        Ok(matches.into_iter().next())
    }

    /// Read a file as text, replacing invalid UTF-8
    pub async fn read_text(&self, entry: &Entry) -> Result<String, WorkspaceError> {
        self.ensure_inside(&entry.path)?;
        if entry.is_dir {
            return Err(WorkspaceError::IsFolder(entry.name.clone()));
        }

        let metadata = fs::metadata(&entry.path).await?;
        if metadata.len() > self.max_file_size {
            return Err(WorkspaceError::TooLarge {
                size: metadata.len(),
                max: self.max_file_size,
            });
        }

        let bytes = fs::read(&entry.path).await?;
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }

    /// Rename an entry within its current folder
    pub async fn rename(&self, entry: &Entry, new_name: &str) -> Result<Entry, WorkspaceError> {
        self.ensure_inside(&entry.path)?;
        validate_name(new_name)?;

        let parent = entry
            .path
            .parent()
            .ok_or_else(|| WorkspaceError::OutsideRoot(entry.path.display().to_string()))?;
        let target = parent.join(new_name);
        ensure_vacant(&target, new_name).await?;
        fs::rename(&entry.path, &target).await?;

        tracing::debug!("Renamed {} to {}", entry.path.display(), target.display());

        Ok(Entry {
            name: new_name.to_string(),
            path: target,
            is_dir: entry.is_dir,
        })
    }

    /// Move an entry into `folder`, keeping its name
    pub async fn move_into(&self, entry: &Entry, folder: &Entry) -> Result<Entry, WorkspaceError> {
        self.ensure_inside(&entry.path)?;
        self.ensure_inside(&folder.path)?;
        if !folder.is_dir {
            return Err(WorkspaceError::InvalidName(format!(
                "'{}' is not a folder",
                folder.name
            )));
        }

        let target = folder.path.join(&entry.name);
        ensure_vacant(&target, &entry.name).await?;
        fs::rename(&entry.path, &target).await?;

        tracing::debug!("Moved {} to {}", entry.path.display(), target.display());

        Ok(Entry {
            name: entry.name.clone(),
            path: target,
            is_dir: entry.is_dir,
        })
    }

    fn ensure_inside(&self, path: &Path) -> Result<(), WorkspaceError> {
        let escapes = path
            .strip_prefix(&self.root)
            .map(|rel| rel.components().any(|c| !matches!(c, Component::Normal(_))))
            .unwrap_or(true);

        if escapes {
            return Err(WorkspaceError::OutsideRoot(path.display().to_string()));
        }
        Ok(())
    }
}

/// `fs::rename` silently replaces an existing target
async fn ensure_vacant(target: &Path, name: &str) -> Result<(), WorkspaceError> {
    if fs::try_exists(target).await? {
        return Err(WorkspaceError::AlreadyExists(name.to_string()));
    }
    Ok(())
}

fn validate_name(name: &str) -> Result<(), WorkspaceError> {
    let mut components = Path::new(name).components();
    match (components.next(), components.next()) {
        (Some(Component::Normal(_)), None) => Ok(()),
        _ => Err(WorkspaceError::InvalidName(name.to_string())),
    }
}
