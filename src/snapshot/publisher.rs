//! 快照发布
//!
//! 流程：清理超出数量的旧版本 → 比较上一版本 → 无变化则结束 → 分配版本 → 写入版本文件与产物
//! → 清理旧版本 → 重建 path.json
//!
//! 版本文件先于产物写入，info.json 最后写入。缺少 info.json 的版本视为未写完，
//! 下一次运行不拿它当比较基准，而是重新发布。

use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{info, warn};

use crate::config::Config;
use crate::error::{AppError, AppResult, BusinessError};
use crate::models::validate_academic_year;
use crate::snapshot::csv::records_to_csv;
use crate::snapshot::diff::DatasetDiff;
use crate::snapshot::fs_util;
use crate::snapshot::manifest::ManifestBuilder;
use crate::snapshot::version::{DatasetVersionManager, RootVersionManager};

/// 每页记录数
pub const PER_PAGE_SIZE: usize = 20;

/// 每个学年度保留的版本数
pub const MAX_HISTORY_COUNT: usize = 5;

/// 版本文件名
pub const VERSION_FILE: &str = "version.json";

/// 全量产物文件名
pub const ALL_FILE: &str = "all.json";

/// 版本信息文件名（版本目录写完的标记）
pub const INFO_FILE: &str = "info.json";

/// info.json 内容
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotInfo {
    /// 分页数量
    pub page_size: usize,
    /// 版本键
    pub updated: String,
}

/// 发布结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PublishOutcome {
    /// 与上一版本相同，没有写入任何文件
    Unchanged,
    /// 已发布新版本
    Published {
        version: String,
        page_count: usize,
        diff_entries: usize,
        trimmed: Vec<String>,
    },
    /// 没能分配到新版本键（时间没有前进）
    NotAllocated,
}

/// 快照发布器
///
/// 只有它会修改输出目录；不做加锁，调用方负责不要同时发布。
pub struct SnapshotPublisher {
    root: PathBuf,
    manifest: ManifestBuilder,
}

impl SnapshotPublisher {
    /// 按配置创建
    pub fn new(config: &Config) -> Self {
        Self::with_root(
            &config.output_root,
            &config.raw_base_url,
            &config.static_base_url,
        )
    }

    /// 使用指定的输出根目录创建
    pub fn with_root(root: impl AsRef<Path>, raw_base_url: &str, static_base_url: &str) -> Self {
        let root = root.as_ref().to_path_buf();
        Self {
            manifest: ManifestBuilder::new(root.clone(), raw_base_url, static_base_url),
            root,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// 以当前时间发布
    pub fn publish<T: Serialize>(&self, academic_year: &str, records: &[T]) -> AppResult<PublishOutcome> {
        self.publish_at(academic_year, records, Local::now())
    }

    /// 以指定时间发布
    ///
    /// # 参数
    /// - `academic_year`: 4 位学年度代码
    /// - `records`: 本次抓取的全部记录
    /// - `now`: 版本时间
    ///
    /// # 返回
    /// 返回发布结果；学年度不合法或记录为空时返回错误，且不写入任何文件
    pub fn publish_at<T: Serialize>(
        &self,
        academic_year: &str,
        records: &[T],
        now: DateTime<Local>,
    ) -> AppResult<PublishOutcome> {
        validate_academic_year(academic_year)?;
        if records.is_empty() {
            return Err(BusinessError::EmptyDataset.into());
        }

        let dataset_dir = self.root.join(academic_year);
        let candidate = records
            .iter()
            .map(serde_json::to_value)
            .collect::<Result<Vec<Value>, _>>()
            .map_err(|e| AppError::json_failed(dataset_dir.join(ALL_FILE), e))?;

        self.register_academic_year(academic_year)?;

        let version_path = dataset_dir.join(VERSION_FILE);
        let had_version_file = version_path.is_file();
        let mut versions = DatasetVersionManager::open(&version_path);

        let mut trimmed = trim_history(&mut versions, &dataset_dir, MAX_HISTORY_COUNT)?;
        if !trimmed.is_empty() {
            versions.persist(&version_path)?;
            info!("🧹 已清理旧版本: {}", trimmed.join(", "));
        }

        let baseline = self.load_baseline(&dataset_dir, versions.latest());
        let diff = DatasetDiff::compute(&baseline, &candidate);

        if had_version_file && diff.is_empty() {
            info!("📭 学年度 {} 资料没有变化，不发布新版本", academic_year);
            if !trimmed.is_empty() {
                self.manifest.regenerate()?;
            }
            return Ok(PublishOutcome::Unchanged);
        }

        let Some(version) = versions.add_version(Some(now), false) else {
            warn!("⚠️ 学年度 {} 没有分配到新版本，放弃发布", academic_year);
            if !trimmed.is_empty() {
                self.manifest.regenerate()?;
            }
            return Ok(PublishOutcome::NotAllocated);
        };

        versions.persist(&version_path)?;

        let version_dir = dataset_dir.join(&version);
        let page_count = write_artifacts(&version_dir, &candidate, &version, &diff)?;
        info!(
            "📦 学年度 {} 发布版本 {}: {} 条记录, {} 页, {} 处差异",
            academic_year,
            version,
            candidate.len(),
            page_count,
            diff.len()
        );

        let trimmed_after = trim_history(&mut versions, &dataset_dir, MAX_HISTORY_COUNT)?;
        if !trimmed_after.is_empty() {
            versions.persist(&version_path)?;
            info!("🧹 已清理旧版本: {}", trimmed_after.join(", "));
            trimmed.extend(trimmed_after);
        }

        self.manifest.regenerate()?;

        Ok(PublishOutcome::Published {
            version,
            page_count,
            diff_entries: diff.len(),
            trimmed,
        })
    }

    /// 根目录还没有这个学年度时登记并写回
    fn register_academic_year(&self, academic_year: &str) -> AppResult<()> {
        let root_version_path = self.root.join(VERSION_FILE);
        let mut root_versions = RootVersionManager::open(&root_version_path);
        if root_versions.contains(academic_year) {
            return Ok(());
        }

        let latest_changed = root_versions.add_version(academic_year, false)?;
        root_versions.persist(&root_version_path)?;
        info!(
            "📅 登记学年度 {}{}",
            academic_year,
            if latest_changed { "（最新）" } else { "" }
        );
        Ok(())
    }

    /// 读取上一版本的全量产物
    ///
    /// 没有最新版本、版本目录没写完（缺 info.json）或读取失败时为空
    fn load_baseline(&self, dataset_dir: &Path, latest: &str) -> Vec<Value> {
        if latest.is_empty() {
            return Vec::new();
        }
        let latest_dir = dataset_dir.join(latest);
        if !latest_dir.join(INFO_FILE).is_file() {
            warn!("⚠️ 版本 {} 没有写完，重新发布", latest);
            return Vec::new();
        }
        let path = latest_dir.join(ALL_FILE);
        fs_util::read_json(&path).unwrap_or_else(|e| {
            warn!("⚠️ 无法读取上一版本资料，视为空: {}", e);
            Vec::new()
        })
    }
}

/// 写入一个版本目录下的全部产物
///
/// # 返回
/// 分页数量
fn write_artifacts(
    version_dir: &Path,
    records: &[Value],
    version: &str,
    diff: &DatasetDiff,
) -> AppResult<usize> {
    fs_util::ensure_directory(version_dir)?;

    write_json_with_csv(version_dir, "all", records)?;

    let mut page_count = 0;
    for (index, page) in records.chunks(PER_PAGE_SIZE).enumerate() {
        write_json_with_csv(version_dir, &format!("page_{}", index + 1), page)?;
        page_count += 1;
    }

    let info = SnapshotInfo {
        page_size: page_count,
        updated: version.to_string(),
    };
    fs_util::write_file(&version_dir.join("diff.txt"), diff.render().as_bytes())?;
    fs_util::write_json_compact(&version_dir.join(INFO_FILE), &info)?;

    Ok(page_count)
}

fn write_json_with_csv(dir: &Path, stem: &str, records: &[Value]) -> AppResult<()> {
    fs_util::write_json_compact(&dir.join(format!("{}.json", stem)), records)?;
    if let Some(csv) = records_to_csv(records) {
        fs_util::write_file(&dir.join(format!("{}.csv", stem)), &csv)?;
    }
    Ok(())
}

/// 删除超过保留数量的最旧版本（目录与记录）
///
/// # 返回
/// 被删除的版本键
pub fn trim_history(
    versions: &mut DatasetVersionManager,
    dataset_dir: &Path,
    keep: usize,
) -> AppResult<Vec<String>> {
    let excess = versions.excess_versions(keep);
    for key in &excess {
        fs_util::remove_directory(&dataset_dir.join(key))?;
        versions.remove(key);
    }
    Ok(excess)
}
