//! 版本记录
//!
//! 两种版本记录共用同一个持久化格式：
//!
//! ```json
//! {"latest":"<key>","history":{"<key>":"<value>"}}
//! ```
//!
//! - 根目录：键为学年度代码（如 `1122`），值为显示名称（如 `112學年度暑期`）
//! - 学年度目录：键为时间戳 `YYYYMMDD_HHMMSS`，值为 RFC 3339 时间

use std::collections::BTreeMap;
use std::path::Path;

use chrono::{DateTime, Local, NaiveDateTime, SecondsFormat, SubsecRound};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::AppResult;
use crate::models::academic_year_label;
use crate::snapshot::fs_util;

/// 时间戳版本键的格式
pub const VERSION_KEY_FORMAT: &str = "%Y%m%d_%H%M%S";

/// 持久化的版本记录
///
/// `history` 按键排序；两种键都是定长且按时间递增，所以键序就是版本顺序。
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct VersionHistory {
    pub latest: String,
    pub history: BTreeMap<String, String>,
}

impl VersionHistory {
    /// 从文件加载，成功时替换当前状态
    ///
    /// # 返回
    /// 文件不存在或内容损坏时返回 false，当前状态保持不变
    pub fn load(&mut self, path: &Path) -> bool {
        if !path.is_file() {
            return false;
        }
        match fs_util::read_json::<VersionHistory>(path) {
            Ok(loaded) => {
                *self = loaded;
                true
            }
            Err(e) => {
                warn!("⚠️ 版本文件无法解析，视为没有历史: {}", e);
                false
            }
        }
    }

    /// 原子写入紧凑 JSON
    pub fn persist(&self, path: &Path) -> AppResult<()> {
        let data = fs_util::to_compact_json(path, self)?;
        fs_util::write_atomic(path, &data)?;
        debug!("版本文件已写入: {}", path.display());
        Ok(())
    }
}

/// 根目录版本记录（学年度）
#[derive(Debug, Clone, Default)]
pub struct RootVersionManager {
    state: VersionHistory,
}

impl RootVersionManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// 从已有状态创建
    pub fn from_history(state: VersionHistory) -> Self {
        Self { state }
    }

    /// 打开版本文件，不存在或损坏时为空
    pub fn open(path: &Path) -> Self {
        let mut manager = Self::new();
        manager.load(path);
        manager
    }

    pub fn load(&mut self, path: &Path) -> bool {
        self.state.load(path)
    }

    pub fn persist(&self, path: &Path) -> AppResult<()> {
        self.state.persist(path)
    }

    pub fn latest(&self) -> &str {
        &self.state.latest
    }

    pub fn history(&self) -> &VersionHistory {
        &self.state
    }

    pub fn contains(&self, academic_year: &str) -> bool {
        self.state.history.contains_key(academic_year)
    }

    /// 记录一个学年度
    ///
    /// # 参数
    /// - `academic_year`: 4 位学年度代码
    /// - `force`: 无论大小都设为最新
    ///
    /// # 返回
    /// `latest` 是否改变；代码格式不合法时返回错误且不修改任何状态
    pub fn add_version(&mut self, academic_year: &str, force: bool) -> AppResult<bool> {
        let label = academic_year_label(academic_year)?;
        self.state.history.insert(academic_year.to_string(), label);

        if force || self.state.latest.is_empty() || academic_year > self.state.latest.as_str() {
            self.state.latest = academic_year.to_string();
            return Ok(true);
        }
        Ok(false)
    }
}

/// 学年度目录版本记录（抓取时间）
#[derive(Debug, Clone, Default)]
pub struct DatasetVersionManager {
    state: VersionHistory,
}

impl DatasetVersionManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_history(state: VersionHistory) -> Self {
        Self { state }
    }

    /// 打开版本文件，不存在或损坏时为空
    pub fn open(path: &Path) -> Self {
        let mut manager = Self::new();
        manager.load(path);
        manager
    }

    pub fn load(&mut self, path: &Path) -> bool {
        self.state.load(path)
    }

    pub fn persist(&self, path: &Path) -> AppResult<()> {
        self.state.persist(path)
    }

    pub fn latest(&self) -> &str {
        &self.state.latest
    }

    pub fn history(&self) -> &VersionHistory {
        &self.state
    }

    pub fn len(&self) -> usize {
        self.state.history.len()
    }

    pub fn is_empty(&self) -> bool {
        self.state.history.is_empty()
    }

    /// 记录一次抓取
    ///
    /// # 参数
    /// - `update`: 抓取时间，None 时取当前时间
    /// - `force`: 无论先后都设为最新
    ///
    /// # 返回
    /// `latest` 改变时返回新的版本键，否则返回 None
    pub fn add_version(&mut self, update: Option<DateTime<Local>>, force: bool) -> Option<String> {
        let update = update.unwrap_or_else(Local::now).trunc_subsecs(0);
        let key = version_key(&update);
        self.state
            .history
            .insert(key.clone(), update.to_rfc3339_opts(SecondsFormat::Secs, false));

        let newer = match parse_version_key(&self.state.latest) {
            Some(latest) => update.naive_local() > latest,
            None => true,
        };

        if force || newer {
            self.state.latest = key.clone();
            return Some(key);
        }
        None
    }

    /// 超过保留数量的旧版本键（从最旧开始）
    pub fn excess_versions(&self, keep: usize) -> Vec<String> {
        let excess = self.state.history.len().saturating_sub(keep);
        self.state.history.keys().take(excess).cloned().collect()
    }

    /// 删除一个版本
    pub fn remove(&mut self, key: &str) -> bool {
        self.state.history.remove(key).is_some()
    }
}

/// 时间 → 版本键
pub fn version_key(instant: &DateTime<Local>) -> String {
    instant.format(VERSION_KEY_FORMAT).to_string()
}

/// 版本键 → 时间，格式不对时为 None
pub fn parse_version_key(key: &str) -> Option<NaiveDateTime> {
    NaiveDateTime::parse_from_str(key, VERSION_KEY_FORMAT).ok()
}
