//! 抓取进度
//!
//! 每个页面抓取完成时计数，由单独的 tokio 任务定时打印

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::info;

/// 抓取进度计数器
#[derive(Debug)]
pub struct FetchProgress {
    total: usize,
    done: AtomicUsize,
}

impl FetchProgress {
    pub fn new(total: usize) -> Self {
        Self {
            total,
            done: AtomicUsize::new(0),
        }
    }

    /// 记录完成一页，返回目前完成数
    pub fn record(&self) -> usize {
        self.done.fetch_add(1, Ordering::Relaxed) + 1
    }

    pub fn done(&self) -> usize {
        self.done.load(Ordering::Relaxed)
    }

    pub fn total(&self) -> usize {
        self.total
    }

    pub fn is_finished(&self) -> bool {
        self.done() >= self.total
    }

    /// 完成百分比（0 - 100）
    pub fn percent(&self) -> usize {
        if self.total == 0 {
            return 100;
        }
        (self.done().min(self.total) * 100) / self.total
    }

    /// 启动定时打印任务，全部完成后自动结束
    ///
    /// 抓取中途失败时调用方需要 abort 返回的句柄。
    pub fn spawn_reporter(self: &Arc<Self>, every: Duration) -> JoinHandle<()> {
        let progress = Arc::clone(self);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(every);
            loop {
                ticker.tick().await;
                info!(
                    "📥 抓取进度: {}/{} 页 ({}%)",
                    progress.done(),
                    progress.total,
                    progress.percent()
                );
                if progress.is_finished() {
                    break;
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counts_and_percent() {
        let progress = FetchProgress::new(4);
        assert_eq!(progress.percent(), 0);
        progress.record();
        assert_eq!(progress.record(), 2);
        assert_eq!(progress.percent(), 50);
        assert!(!progress.is_finished());
        progress.record();
        progress.record();
        assert!(progress.is_finished());
        assert_eq!(FetchProgress::new(0).percent(), 100);
    }

    #[tokio::test]
    async fn test_reporter_stops_when_finished() {
        let progress = Arc::new(FetchProgress::new(1));
        let handle = progress.spawn_reporter(Duration::from_millis(10));
        progress.record();
        tokio::time::timeout(Duration::from_secs(2), handle)
            .await
            .expect("进度任务应在完成后结束")
            .unwrap();
    }
}
