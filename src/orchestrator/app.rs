//! 应用入口 - 编排层
//!
//! ## 职责
//!
//! 1. **应用初始化**：创建选课系统客户端、加载验证码模型、创建警告服务
//! 2. **抓取**：委托 `CrawlFlow` 抓取一个学年度的全部课程
//! 3. **发布**：把抓取结果交给 `SnapshotPublisher`
//! 4. **全局统计**：输出本次运行的汇总
//!
//! 抓取失败或结果为空时直接返回错误，不会写出任何快照。

use tracing::info;

use crate::config::Config;
use crate::error::{AppResult, BusinessError};
use crate::infrastructure::PortalClient;
use crate::services::{CaptchaSolver, WarnNotifier};
use crate::snapshot::{PublishOutcome, SnapshotPublisher};
use crate::utils::logging::{log_crawl_complete, log_startup, print_final_stats};
use crate::workflow::CrawlFlow;

/// 应用主结构
pub struct App {
    flow: CrawlFlow<PortalClient>,
    publisher: SnapshotPublisher,
}

impl App {
    /// 初始化应用
    pub fn initialize(config: &Config) -> AppResult<Self> {
        log_startup(config);

        let portal = PortalClient::new(config)?;
        let solver = CaptchaSolver::from_config(config)?;
        let notifier = WarnNotifier::new(config)?;

        Ok(Self {
            flow: CrawlFlow::new(portal, solver, notifier, config),
            publisher: SnapshotPublisher::new(config),
        })
    }

    /// 抓取流程（采集训练样本时复用）
    pub fn flow(&self) -> &CrawlFlow<PortalClient> {
        &self.flow
    }

    /// 运行应用主逻辑：抓取 → 发布
    pub async fn run(&self) -> AppResult<PublishOutcome> {
        let crawl = self.flow.run().await?;
        log_crawl_complete(
            &crawl.academic_year,
            crawl.pages,
            crawl.records.len(),
            crawl.rejected,
        );

        if crawl.records.is_empty() {
            return Err(BusinessError::EmptyDataset.into());
        }

        info!("\n💾 正在发布快照到 {}", self.publisher.root().display());
        let outcome = self.publisher.publish(&crawl.academic_year, &crawl.records)?;

        print_final_stats(&summarize(&outcome, crawl.notify_failures));
        Ok(outcome)
    }
}

fn summarize(outcome: &PublishOutcome, notify_failures: usize) -> String {
    let mut summary = match outcome {
        PublishOutcome::Unchanged => "📭 资料没有变化，未发布新版本".to_string(),
        PublishOutcome::NotAllocated => "⚠️ 未能分配新版本，未发布".to_string(),
        PublishOutcome::Published {
            version,
            page_count,
            diff_entries,
            trimmed,
        } => format!(
            "✅ 已发布版本 {} ({} 页, {} 处差异, 清理 {} 个旧版本)",
            version,
            page_count,
            diff_entries,
            trimmed.len()
        ),
    };
    if notify_failures > 0 {
        summary.push_str(&format!("\n❌ Webhook 发送失败 {} 次", notify_failures));
    }
    summary
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_summary_mentions_version() {
        let outcome = PublishOutcome::Published {
            version: "20240101_120000".to_string(),
            page_count: 2,
            diff_entries: 3,
            trimmed: vec![],
        };
        let summary = summarize(&outcome, 0);
        assert!(summary.contains("20240101_120000"));
        assert!(!summary.contains("Webhook"));
        assert!(summarize(&PublishOutcome::Unchanged, 2).contains("Webhook 发送失败 2 次"));
    }

    #[test]
    fn test_initialize_requires_model() {
        let config = Config {
            model_path: "/nonexistent/model.json".to_string(),
            ..Config::default()
        };
        assert!(App::initialize(&config).is_err());
    }
}
