//! 日志工具模块
//!
//! 提供日志初始化以及格式化输出的辅助函数

use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::config::Config;

/// 初始化 tracing 日志
///
/// `RUST_LOG` 优先；否则默认 `info`，开启详细日志时为 `debug`。
/// 重复调用不会报错，方便测试中多次初始化。
pub fn init(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}

/// 记录程序启动信息
pub fn log_startup(config: &Config) {
    info!("{}", "=".repeat(60));
    info!("🚀 程序启动 - 选课资料抓取");
    info!("🌐 选课系统: {}", config.base_url);
    info!("📁 输出目录: {}", config.output_root);
    info!("📊 最大并发页数: {}", config.max_concurrent_pages);
    if let Some(year) = &config.academic_year {
        info!("📅 指定学年度: {}", year);
    }
    info!("{}", "=".repeat(60));
}

/// 记录抓取完成信息
///
/// # 参数
/// - `academic_year`: 学年度
/// - `pages`: 抓取页数
/// - `records`: 解析成功的课程数量
/// - `rejected`: 被拒绝的行数
pub fn log_crawl_complete(academic_year: &str, pages: usize, records: usize, rejected: usize) {
    info!("\n{}", "─".repeat(60));
    info!("✓ 学年度 {} 抓取完成", academic_year);
    info!("📄 页数: {} | 课程: {} | 解析失败: {}", pages, records, rejected);
    info!("{}", "─".repeat(60));
}

/// 打印最终统计信息
pub fn print_final_stats(summary: &str) {
    info!("\n{}", "=".repeat(60));
    info!("📊 全部处理完成");
    info!(
        "完成时间: {}",
        chrono::Local::now().format("%Y-%m-%d %H:%M:%S")
    );
    info!("{}", summary);
    info!("{}", "=".repeat(60));
}

/// 截断长文本用于日志显示
///
/// # 参数
/// - `text`: 原始文本
/// - `max_len`: 最大字符数
///
/// # 返回
/// 返回截断后的文本
pub fn truncate_text(text: &str, max_len: usize) -> String {
    if text.chars().count() > max_len {
        text.chars().take(max_len).collect::<String>() + "..."
    } else {
        text.to_string()
    }
}
