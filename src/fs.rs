//! Filesystem gateway used by every component that touches disk.
//!
//! All operations are async. [`LocalFs`] is the tokio-backed implementation;
//! tests wrap it to inject failures for single paths.

use std::{
    io,
    path::{Path, PathBuf},
    time::{SystemTime, UNIX_EPOCH},
};

use async_trait::async_trait;
use tracing::{debug, warn};

#[async_trait]
pub trait FileSystemGateway: Send + Sync {
    /// True when an entry exists at `path`, including dangling symlinks.
    async fn exists(&self, path: &Path) -> bool;

    /// True when `path` resolves (following links) to a directory.
    async fn is_dir(&self, path: &Path) -> bool;

    /// Full paths of the immediate children of `path`.
    async fn list_directory(&self, path: &Path) -> io::Result<Vec<PathBuf>>;

    async fn create_directory(&self, path: &Path) -> io::Result<()>;

    /// Removes a directory tree, or only the link when `path` is a symlink.
    async fn delete_directory(&self, path: &Path) -> io::Result<()>;

    async fn delete_file(&self, path: &Path) -> io::Result<()>;

    async fn rename_directory(&self, from: &Path, to: &Path) -> io::Result<()>;

    async fn rename_file(&self, from: &Path, to: &Path) -> io::Result<()>;

    async fn copy_file(&self, from: &Path, to: &Path) -> io::Result<()>;

    /// Creates `link` pointing at `target`.
    async fn create_symlink(&self, target: &Path, link: &Path) -> io::Result<()>;

    /// Target of the symlink at `path`, or `None` when `path` is not a link.
    async fn read_link(&self, path: &Path) -> io::Result<Option<PathBuf>>;

    /// Probes whether links can be created inside `path`.
    async fn is_symlink_supported(&self, path: &Path) -> bool;

    async fn read_file(&self, path: &Path) -> io::Result<String>;

    async fn write_file(&self, path: &Path, contents: &str) -> io::Result<()>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct LocalFs;

impl LocalFs {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl FileSystemGateway for LocalFs {
    async fn exists(&self, path: &Path) -> bool {
        tokio::fs::symlink_metadata(path).await.is_ok()
    }

    async fn is_dir(&self, path: &Path) -> bool {
        tokio::fs::metadata(path)
            .await
            .map(|meta| meta.is_dir())
            .unwrap_or(false)
    }

    async fn list_directory(&self, path: &Path) -> io::Result<Vec<PathBuf>> {
        let mut entries = tokio::fs::read_dir(path).await?;
        let mut children = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            children.push(entry.path());
        }
        Ok(children)
    }

    async fn create_directory(&self, path: &Path) -> io::Result<()> {
        tokio::fs::create_dir_all(path).await
    }

    async fn delete_directory(&self, path: &Path) -> io::Result<()> {
        let meta = tokio::fs::symlink_metadata(path).await?;
        if meta.file_type().is_symlink() {
            remove_link(path).await
        } else {
            tokio::fs::remove_dir_all(path).await
        }
    }

    async fn delete_file(&self, path: &Path) -> io::Result<()> {
        tokio::fs::remove_file(path).await
    }

    async fn rename_directory(&self, from: &Path, to: &Path) -> io::Result<()> {
        tokio::fs::rename(from, to).await
    }

    async fn rename_file(&self, from: &Path, to: &Path) -> io::Result<()> {
        tokio::fs::rename(from, to).await
    }

    async fn copy_file(&self, from: &Path, to: &Path) -> io::Result<()> {
        tokio::fs::copy(from, to).await.map(|_| ())
    }

    async fn create_symlink(&self, target: &Path, link: &Path) -> io::Result<()> {
        create_symlink(target, link).await
    }

    async fn read_link(&self, path: &Path) -> io::Result<Option<PathBuf>> {
        let meta = tokio::fs::symlink_metadata(path).await?;
        if !meta.file_type().is_symlink() {
            return Ok(None);
        }
        tokio::fs::read_link(path).await.map(Some)
    }

    async fn is_symlink_supported(&self, path: &Path) -> bool {
        let stamp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_nanos();
        let probe = path.join(format!(".modshelf-probe-{}-{stamp}", std::process::id()));
        match create_symlink(path, &probe).await {
            Ok(()) => {
                if let Err(e) = remove_link(&probe).await {
                    warn!(path = %probe.display(), error = %e, "failed to remove symlink probe");
                }
                true
            }
            Err(e) => {
                debug!(path = %path.display(), error = %e, "symlink probe failed");
                false
            }
        }
    }

    async fn read_file(&self, path: &Path) -> io::Result<String> {
        tokio::fs::read_to_string(path).await
    }

    async fn write_file(&self, path: &Path, contents: &str) -> io::Result<()> {
        tokio::fs::write(path, contents).await
    }
}

#[cfg(unix)]
async fn create_symlink(target: &Path, link: &Path) -> io::Result<()> {
    tokio::fs::symlink(target, link).await
}

#[cfg(windows)]
async fn create_symlink(target: &Path, link: &Path) -> io::Result<()> {
    if tokio::fs::metadata(target).await?.is_dir() {
        tokio::fs::symlink_dir(target, link).await
    } else {
        tokio::fs::symlink_file(target, link).await
    }
}

#[cfg(not(any(unix, windows)))]
async fn create_symlink(_target: &Path, _link: &Path) -> io::Result<()> {
    Err(io::Error::new(
        io::ErrorKind::Unsupported,
        "symlink unavailable on this platform",
    ))
}

#[cfg(windows)]
async fn remove_link(path: &Path) -> io::Result<()> {
    // Directory links on Windows are removed as directories.
    match tokio::fs::remove_dir(path).await {
        Ok(()) => Ok(()),
        Err(_) => tokio::fs::remove_file(path).await,
    }
}

#[cfg(not(windows))]
async fn remove_link(path: &Path) -> io::Result<()> {
    tokio::fs::remove_file(path).await
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    #[tokio::test]
    async fn delete_directory_removes_only_the_link() {
        let tmp = tempfile::tempdir().unwrap();
        let source = tmp.path().join("source");
        std::fs::create_dir(&source).unwrap();
        std::fs::write(source.join("data.txt"), "keep").unwrap();
        let link = tmp.path().join("link");
        std::os::unix::fs::symlink(&source, &link).unwrap();

        LocalFs::new().delete_directory(&link).await.unwrap();

        assert!(!link.exists());
        assert!(source.join("data.txt").exists());
    }

    #[tokio::test]
    async fn read_link_distinguishes_links_from_directories() {
        let tmp = tempfile::tempdir().unwrap();
        let source = tmp.path().join("source");
        std::fs::create_dir(&source).unwrap();
        let link = tmp.path().join("link");
        std::os::unix::fs::symlink(&source, &link).unwrap();

        let fs = LocalFs::new();
        assert_eq!(fs.read_link(&link).await.unwrap(), Some(source.clone()));
        assert_eq!(fs.read_link(&source).await.unwrap(), None);
    }

    #[tokio::test]
    async fn exists_reports_dangling_links() {
        let tmp = tempfile::tempdir().unwrap();
        let link = tmp.path().join("dangling");
        std::os::unix::fs::symlink(tmp.path().join("gone"), &link).unwrap();

        let fs = LocalFs::new();
        assert!(fs.exists(&link).await);
        assert!(!fs.is_dir(&link).await);
    }

    #[tokio::test]
    async fn symlink_probe_leaves_no_trace() {
        let tmp = tempfile::tempdir().unwrap();
        let fs = LocalFs::new();

        assert!(fs.is_symlink_supported(tmp.path()).await);
        assert!(fs.list_directory(tmp.path()).await.unwrap().is_empty());
    }
}
