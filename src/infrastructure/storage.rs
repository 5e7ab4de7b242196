// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::domain::models::report::report_timestamp;
use crate::utils::url_utils::source_dir_name;
use serde::Serialize;
use std::path::{Component, Path, PathBuf};
use thiserror::Error;
use tokio::fs;
use tracing::info;
use walkdir::WalkDir;

/// 本地存储错误
#[derive(Error, Debug)]
pub enum StorageError {
    /// 文件系统操作失败
    #[error("IO error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    /// 镜像数据目录不存在
    #[error("Data directory does not exist: {0}")]
    MissingDataDir(PathBuf),
    /// 仓库名会逃逸出数据源目录
    #[error("Invalid repository name: {0:?}")]
    InvalidName(String),
    /// 报告序列化失败
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

fn io_err(path: &Path) -> impl FnOnce(std::io::Error) -> StorageError + '_ {
    move |source| StorageError::Io {
        path: path.to_path_buf(),
        source,
    }
}

/// 词法规范化路径，相对路径以当前目录为基准
pub fn normalize_path(path: &Path) -> PathBuf {
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()
            .unwrap_or_else(|_| PathBuf::from("/"))
            .join(path)
    };

    let mut normalized = PathBuf::new();
    for component in absolute.components() {
        match component {
            Component::ParentDir => {
                normalized.pop();
            }
            Component::CurDir => {}
            other => normalized.push(other.as_os_str()),
        }
    }
    normalized
}

/// 本地镜像目录布局
///
/// 镜像位于 `data_dir/<sha256(source)>/<name>.git`，回收的镜像移动到
/// `backup_dir/repositories/` 下的相同相对位置
#[derive(Debug, Clone)]
pub struct MirrorStorage {
    data_dir: PathBuf,
    backup_dir: PathBuf,
}

impl MirrorStorage {
    pub fn new(data_dir: impl AsRef<Path>, backup_dir: impl AsRef<Path>) -> Self {
        Self {
            data_dir: normalize_path(data_dir.as_ref()),
            backup_dir: normalize_path(backup_dir.as_ref()),
        }
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    /// 确认数据目录存在
    pub fn check_data_dir(&self) -> Result<(), StorageError> {
        if self.data_dir.is_dir() {
            Ok(())
        } else {
            Err(StorageError::MissingDataDir(self.data_dir.clone()))
        }
    }

    /// 计算仓库的本地路径
    ///
    /// 允许 `group/repo` 形式的嵌套名称，拒绝绝对路径与逃逸出数据源目录的名称
    pub fn repository_path(&self, source_url: &str, name: &str) -> Result<PathBuf, StorageError> {
        let source_dir = self.data_dir.join(source_dir_name(source_url));
        let mut relative = PathBuf::new();
        for component in Path::new(name).components() {
            match component {
                Component::Normal(part) => relative.push(part),
                Component::CurDir => {}
                Component::ParentDir => {
                    if !relative.pop() {
                        return Err(StorageError::InvalidName(name.to_string()));
                    }
                }
                Component::RootDir | Component::Prefix(_) => {
                    return Err(StorageError::InvalidName(name.to_string()))
                }
            }
        }

        let Some(file_name) = relative.file_name().map(|f| f.to_string_lossy().into_owned())
        else {
            return Err(StorageError::InvalidName(name.to_string()));
        };
        if !file_name.ends_with(".git") {
            relative.set_file_name(format!("{}.git", file_name));
        }
        Ok(source_dir.join(relative))
    }

    /// 枚举本地已有的镜像
    ///
    /// 只收集数据源目录下以 `.git` 结尾的目录，不进入镜像内部
    pub fn list_local_mirrors(&self) -> Result<Vec<PathBuf>, StorageError> {
        self.check_data_dir()?;

        let mut mirrors = Vec::new();
        let mut walker = WalkDir::new(&self.data_dir).min_depth(1).into_iter();
        while let Some(entry) = walker.next() {
            let entry = entry.map_err(|e| StorageError::Io {
                path: e.path().map(Path::to_path_buf).unwrap_or_else(|| self.data_dir.clone()),
                source: e.into(),
            })?;
            if !entry.file_type().is_dir() {
                continue;
            }
            let name = entry.file_name().to_string_lossy();
            if name.ends_with(".partial") {
                walker.skip_current_dir();
                continue;
            }
            if entry.depth() >= 2 && name.ends_with(".git") && name != ".git" {
                mirrors.push(entry.path().to_path_buf());
                walker.skip_current_dir();
            }
        }
        mirrors.sort();
        Ok(mirrors)
    }

    /// 把镜像整体移动到备份区，目标已存在时追加时间戳后缀
    pub async fn relocate(&self, mirror: &Path) -> Result<PathBuf, StorageError> {
        let relative = mirror
            .strip_prefix(&self.data_dir)
            .map(Path::to_path_buf)
            .unwrap_or_else(|_| PathBuf::from(mirror.file_name().unwrap_or_default()));
        let mut dest = self.backup_dir.join("repositories").join(relative);
        if fs::try_exists(&dest).await.map_err(io_err(&dest))? {
            let file_name = dest
                .file_name()
                .map(|f| f.to_string_lossy().into_owned())
                .unwrap_or_default();
            dest.set_file_name(format!("{}.{}", file_name, report_timestamp()));
        }
        if let Some(parent) = dest.parent() {
            fs::create_dir_all(parent).await.map_err(io_err(parent))?;
        }
        fs::rename(mirror, &dest).await.map_err(io_err(mirror))?;
        info!("Moved {} to backup {}", mirror.display(), dest.display());
        Ok(dest)
    }
}

/// 写入 `info/web/last-modified`
pub async fn write_last_modified(repo: &Path, date: &str) -> Result<(), StorageError> {
    let dir = repo.join("info").join("web");
    fs::create_dir_all(&dir).await.map_err(io_err(&dir))?;
    let file = dir.join("last-modified");
    fs::write(&file, format!("{}\n", date))
        .await
        .map_err(io_err(&file))
}

/// 写入 `description`
pub async fn write_description(repo: &Path, description: &str) -> Result<(), StorageError> {
    let file = repo.join("description");
    fs::write(&file, format!("{}\n", description))
        .await
        .map_err(io_err(&file))
}

/// 创建 `git-daemon-export-ok`，已存在时不做任何修改
///
/// 返回是否新建
pub async fn ensure_export_marker(repo: &Path) -> Result<bool, StorageError> {
    let file = repo.join("git-daemon-export-ok");
    match fs::OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(&file)
        .await
    {
        Ok(_) => Ok(true),
        Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => Ok(false),
        Err(e) => Err(io_err(&file)(e)),
    }
}

/// 以缩进 JSON 写入运行报告
pub async fn write_report<T: Serialize>(
    dir: &Path,
    file_name: &str,
    report: &T,
) -> Result<PathBuf, StorageError> {
    fs::create_dir_all(dir).await.map_err(io_err(dir))?;
    let path = dir.join(file_name);
    let json = serde_json::to_string_pretty(report)?;
    fs::write(&path, json).await.map_err(io_err(&path))?;
    info!("Saved status report to {}", path.display());
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_repository_path_is_content_addressed() {
        let storage = MirrorStorage::new("/srv/git", "/srv/backup");
        let path = storage
            .repository_path("https://git.example.org/", "linux")
            .unwrap();

        assert_eq!(
            path,
            PathBuf::from("/srv/git")
                .join(source_dir_name("https://git.example.org/"))
                .join("linux.git")
        );
        assert_eq!(
            storage
                .repository_path("https://git.example.org/", "linux.git")
                .unwrap(),
            path
        );
    }

    #[test]
    fn test_repository_path_allows_nested_and_rejects_escape() {
        let storage = MirrorStorage::new("/srv/git", "/srv/backup");
        let nested = storage.repository_path("s", "group/./repo").unwrap();
        assert!(nested.ends_with("group/repo.git"));

        for bad in ["../evil", "a/../../evil", "/etc/passwd", "", "."] {
            assert!(
                matches!(
                    storage.repository_path("s", bad),
                    Err(StorageError::InvalidName(_))
                ),
                "{:?} should be rejected",
                bad
            );
        }
    }

    #[test]
    fn test_normalize_path_is_lexical() {
        assert_eq!(
            normalize_path(Path::new("/srv/./git/../data")),
            PathBuf::from("/srv/data")
        );
    }

    #[test]
    fn test_list_local_mirrors_does_not_descend() {
        let tmp = tempfile::tempdir().unwrap();
        let storage = MirrorStorage::new(tmp.path().join("data"), tmp.path().join("backup"));
        let root = storage.data_dir().to_path_buf();
        std::fs::create_dir_all(root.join("abc/one.git/refs/inner.git")).unwrap();
        std::fs::create_dir_all(root.join("abc/group/two.git")).unwrap();
        std::fs::create_dir_all(root.join("abc/three.git.partial/x.git")).unwrap();
        std::fs::create_dir_all(root.join("top.git")).unwrap();

        let mirrors = storage.list_local_mirrors().unwrap();

        assert_eq!(
            mirrors,
            vec![root.join("abc/group/two.git"), root.join("abc/one.git")]
        );
    }

    #[test]
    fn test_list_local_mirrors_requires_data_dir() {
        let tmp = tempfile::tempdir().unwrap();
        let storage = MirrorStorage::new(tmp.path().join("missing"), tmp.path());
        assert!(matches!(
            storage.list_local_mirrors(),
            Err(StorageError::MissingDataDir(_))
        ));
    }

    #[tokio::test]
    async fn test_export_marker_is_created_once() {
        let tmp = tempfile::tempdir().unwrap();
        assert!(ensure_export_marker(tmp.path()).await.unwrap());
        std::fs::write(tmp.path().join("git-daemon-export-ok"), "keep").unwrap();
        assert!(!ensure_export_marker(tmp.path()).await.unwrap());
        assert_eq!(
            std::fs::read_to_string(tmp.path().join("git-daemon-export-ok")).unwrap(),
            "keep"
        );
    }

    #[tokio::test]
    async fn test_relocate_adds_suffix_when_destination_exists() {
        let tmp = tempfile::tempdir().unwrap();
        let storage = MirrorStorage::new(tmp.path().join("data"), tmp.path().join("backup"));
        let mirror = storage.data_dir().join("abc/old.git");
        std::fs::create_dir_all(&mirror).unwrap();
        std::fs::write(mirror.join("HEAD"), "ref: refs/heads/main\n").unwrap();
        let taken = tmp.path().join("backup/repositories/abc/old.git");
        std::fs::create_dir_all(&taken).unwrap();

        let dest = storage.relocate(&mirror).await.unwrap();

        assert!(!mirror.exists());
        assert_ne!(dest, taken);
        assert!(dest
            .file_name()
            .unwrap()
            .to_string_lossy()
            .starts_with("old.git."));
        assert_eq!(
            std::fs::read_to_string(dest.join("HEAD")).unwrap(),
            "ref: refs/heads/main\n"
        );
    }
}
