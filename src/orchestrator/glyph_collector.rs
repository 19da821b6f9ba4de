//! 训练样本采集 - 编排层
//!
//! 反复取验证码并用第 1 页验证：
//! - 被拒绝的验证码原图存到 `errors/<n>_<code>.png`
//! - 通过的验证码切成 4 片，存到 `done/<数字>/<n>_<code>_<i>.png`

use std::path::Path;

use tracing::info;

use crate::error::{AppResult, FileError};
use crate::infrastructure::CoursePortal;
use crate::snapshot::fs_util;
use crate::workflow::{CodeOutcome, CrawlFlow};

/// 无法识别时文件名中代替验证码的文字
const UNSOLVED: &str = "unsolved";

/// 采集统计
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CollectStats {
    pub total: usize,
    pub done: usize,
    pub error: usize,
}

impl CollectStats {
    /// 通过率（百分比）
    pub fn success_rate(&self) -> f64 {
        if self.total == 0 {
            return 0.0;
        }
        self.done as f64 / self.total as f64 * 100.0
    }
}

/// 采集训练样本
///
/// # 参数
/// - `flow`: 抓取流程（提供取图、识别、验证能力）
/// - `academic_year`: 验证时使用的学年度
/// - `samples`: 采集的验证码张数
/// - `output`: 输出目录（开始前会被清空）
pub async fn collect_glyphs<P: CoursePortal>(
    flow: &CrawlFlow<P>,
    academic_year: &str,
    samples: usize,
    output: &Path,
) -> AppResult<CollectStats> {
    fs_util::remove_directory(output)?;
    info!("🗂️ 开始采集 {} 张验证码到 {}", samples, output.display());

    let mut stats = CollectStats::default();
    while stats.total < samples {
        let attempt = flow.attempt_code(academic_year).await?;
        stats.total += 1;

        match attempt.outcome {
            CodeOutcome::Accepted { code, .. } => {
                stats.done += 1;
                let slices = flow.solver().segmenter().raw_slices(&attempt.image)?;
                for (i, (slice, digit)) in slices.iter().zip(code.chars()).enumerate() {
                    let path = output
                        .join("done")
                        .join(digit.to_string())
                        .join(format!("{}_{}_{}.png", stats.done, code, i));
                    save_png(slice, &path)?;
                }
            }
            CodeOutcome::Rejected { code } => {
                stats.error += 1;
                let path = output.join("errors").join(format!("{}_{}.png", stats.error, code));
                fs_util::write_file(&path, &attempt.image)?;
            }
            CodeOutcome::Unsolvable { .. } => {
                stats.error += 1;
                let path = output
                    .join("errors")
                    .join(format!("{}_{}.png", stats.error, UNSOLVED));
                fs_util::write_file(&path, &attempt.image)?;
            }
        }

        info!(
            "total: {:04}, done: {:04}, error: {:04} [{:.2}%]",
            stats.total,
            stats.done,
            stats.error,
            stats.success_rate()
        );
    }

    Ok(stats)
}

fn save_png(image: &image::GrayImage, path: &Path) -> AppResult<()> {
    if let Some(parent) = path.parent() {
        fs_util::ensure_directory(parent)?;
    }
    image.save(path).map_err(|source| {
        FileError::ImageSaveFailed {
            path: path.display().to_string(),
            source,
        }
        .into()
    })
}
