//! 目录清单（path.json）
//!
//! 每个目录下都有一份 path.json，列出该目录的直接子项

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{AppError, AppResult, FileError};
use crate::snapshot::fs_util;

/// 清单文件名
pub const MANIFEST_FILE: &str = "path.json";

/// 不出现在清单里、也不进入的名字
const EXCLUDED_NAMES: [&str; 2] = [MANIFEST_FILE, ".git"];

/// 子项类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryKind {
    Dir,
    File,
}

/// 清单中的一项
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PathEntry {
    pub name: String,
    /// 相对输出根目录的路径，使用 `/` 分隔
    pub path: String,
    pub raw_url: String,
    pub static_url: String,
    #[serde(rename = "type")]
    pub kind: EntryKind,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub sha256: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub size: Option<u64>,
}

/// 清单生成器
#[derive(Debug, Clone)]
pub struct ManifestBuilder {
    root: PathBuf,
    raw_base_url: String,
    static_base_url: String,
}

impl ManifestBuilder {
    /// 创建清单生成器
    ///
    /// # 参数
    /// - `root`: 输出根目录
    /// - `raw_base_url` / `static_base_url`: 拼在相对路径前面的地址前缀
    pub fn new(
        root: impl Into<PathBuf>,
        raw_base_url: impl Into<String>,
        static_base_url: impl Into<String>,
    ) -> Self {
        Self {
            root: root.into(),
            raw_base_url: raw_base_url.into(),
            static_base_url: static_base_url.into(),
        }
    }

    /// 从根目录开始递归重建所有 path.json
    ///
    /// # 返回
    /// 写入的清单文件数量
    pub fn regenerate(&self) -> AppResult<usize> {
        if !self.root.is_dir() {
            return Err(FileError::NotADirectory {
                path: self.root.display().to_string(),
            }
            .into());
        }
        let written = self.regenerate_dir(&self.root)?;
        debug!("已重建 {} 个 path.json", written);
        Ok(written)
    }

    fn regenerate_dir(&self, dir: &Path) -> AppResult<usize> {
        let entries = self.list_dir(dir)?;
        fs_util::write_json_compact(&dir.join(MANIFEST_FILE), &entries)?;

        let mut written = 1;
        for entry in entries.iter().filter(|e| e.kind == EntryKind::Dir) {
            written += self.regenerate_dir(&dir.join(&entry.name))?;
        }
        Ok(written)
    }

    /// 列出一个目录的直接子项（按名称排序）
    pub fn list_dir(&self, dir: &Path) -> AppResult<Vec<PathEntry>> {
        let read_dir = fs::read_dir(dir).map_err(|e| AppError::file_read_failed(dir, e))?;

        let mut paths = Vec::new();
        for entry in read_dir {
            let entry = entry.map_err(|e| AppError::file_read_failed(dir, e))?;
            let name = entry.file_name().to_string_lossy().to_string();
            if EXCLUDED_NAMES.contains(&name.as_str()) {
                continue;
            }
            paths.push((name, entry.path()));
        }
        paths.sort_by(|a, b| a.0.cmp(&b.0));

        paths
            .into_iter()
            .map(|(name, path)| self.describe(name, &path))
            .collect()
    }

    fn describe(&self, name: String, path: &Path) -> AppResult<PathEntry> {
        let relative = self.relative_path(path);
        let mut entry = PathEntry {
            name,
            raw_url: format!("{}{}", self.raw_base_url, relative),
            static_url: format!("{}{}", self.static_base_url, relative),
            path: relative,
            kind: EntryKind::Dir,
            sha256: None,
            size: None,
        };

        if path.is_file() {
            let metadata = fs::metadata(path).map_err(|e| AppError::file_read_failed(path, e))?;
            entry.kind = EntryKind::File;
            entry.sha256 = Some(fs_util::sha256_file(path)?);
            entry.size = Some(metadata.len());
        }
        Ok(entry)
    }

    fn relative_path(&self, path: &Path) -> String {
        path.strip_prefix(&self.root)
            .unwrap_or(path)
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/")
    }
}
