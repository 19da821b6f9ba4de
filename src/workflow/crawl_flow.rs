//! 抓取流程 - 流程层
//!
//! 核心职责：定义"一个学年度"的完整抓取流程
//!
//! 流程顺序：
//! 1. 打开查询页，确定学年度
//! 2. 取验证码 → 识别 → 用第 1 页验证，错误则换一张重来
//! 3. 确定总页数
//! 4. 并发抓取全部页面（按页码顺序还原）
//! 5. 逐页解析，被拒绝的行交给警告服务

use std::sync::Arc;
use std::time::Duration;

use futures::future::try_join_all;
use tokio::sync::Semaphore;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::error::{AppResult, PortalError};
use crate::infrastructure::CoursePortal;
use crate::models::{validate_academic_year, CourseRecord};
use crate::services::portal_page::{is_wrong_validation_code, parse_academic_year_option, parse_total_pages};
use crate::services::{parse_course_page, CaptchaSolver, NotifyOutcome, WarnNotifier};
use crate::workflow::crawl_ctx::ParseCtx;
use crate::workflow::progress::FetchProgress;

/// 进度打印间隔
const PROGRESS_INTERVAL: Duration = Duration::from_secs(2);

/// 一次验证码尝试的结果
#[derive(Debug, Clone)]
pub enum CodeOutcome {
    /// 选课系统接受了验证码，附带第 1 页
    Accepted { code: String, first_page: String },
    /// 识别出了验证码，但选课系统拒绝
    Rejected { code: String },
    /// 图片无法识别
    Unsolvable { reason: String },
}

/// 一次验证码尝试（附带原始图片，采集训练样本时使用）
#[derive(Debug, Clone)]
pub struct CodeAttempt {
    pub image: Vec<u8>,
    pub outcome: CodeOutcome,
}

/// 一个学年度的抓取结果
#[derive(Debug, Clone, Default)]
pub struct CrawlResult {
    pub academic_year: String,
    pub pages: usize,
    pub records: Vec<CourseRecord>,
    pub rejected: usize,
    /// Webhook 发送失败次数
    pub notify_failures: usize,
}

/// 抓取流程
///
/// - 编排完整的抓取流程
/// - 决定何时重新取验证码、何时失败
/// - 不持有 HTTP 会话本身，只依赖 `CoursePortal` 能力
pub struct CrawlFlow<P: CoursePortal> {
    portal: P,
    solver: CaptchaSolver,
    notifier: WarnNotifier,
    academic_year: Option<String>,
    max_page: Option<u32>,
    max_concurrent_pages: usize,
    captcha_max_attempts: Option<u32>,
}

impl<P: CoursePortal> CrawlFlow<P> {
    /// 创建新的抓取流程
    pub fn new(portal: P, solver: CaptchaSolver, notifier: WarnNotifier, config: &Config) -> Self {
        Self {
            portal,
            solver,
            notifier,
            academic_year: config.academic_year.clone(),
            max_page: config.max_page,
            max_concurrent_pages: config.max_concurrent_pages.max(1),
            captcha_max_attempts: config.captcha_max_attempts,
        }
    }

    pub fn solver(&self) -> &CaptchaSolver {
        &self.solver
    }

    /// 执行完整抓取
    pub async fn run(&self) -> AppResult<CrawlResult> {
        let academic_year = self.resolve_academic_year().await?;
        info!("📅 本次抓取学年度: {}", academic_year);

        let (code, first_page) = self.acquire_code(&academic_year).await?;
        let total = self.total_pages(&first_page)?;
        info!("📄 共 {} 页", total);

        let pages = self.fetch_all_pages(&code, &academic_year, total).await?;
        let mut result = self.parse_pages(&academic_year, &pages).await;
        result.pages = pages.len();
        Ok(result)
    }

    /// 打开查询页并确定学年度（配置优先）
    ///
    /// 配置的学年度不合法时直接返回错误，不发出任何请求
    pub async fn resolve_academic_year(&self) -> AppResult<String> {
        if let Some(year) = &self.academic_year {
            validate_academic_year(year)?;
        }
        let query_page = self.portal.open_query_page().await?;
        if let Some(year) = &self.academic_year {
            return Ok(year.clone());
        }
        parse_academic_year_option(&query_page).ok_or_else(|| PortalError::AcademicYearNotFound.into())
    }

    /// 取一张验证码，识别后用第 1 页验证
    pub async fn attempt_code(&self, academic_year: &str) -> AppResult<CodeAttempt> {
        let image = self.portal.fetch_captcha().await?;

        let code = match self.solver.solve(&image) {
            Ok(code) => code,
            Err(e) => {
                return Ok(CodeAttempt {
                    image,
                    outcome: CodeOutcome::Unsolvable {
                        reason: e.to_string(),
                    },
                })
            }
        };

        let page = self.portal.fetch_page(&code, academic_year, 1).await?;
        let outcome = if is_wrong_validation_code(&page) {
            CodeOutcome::Rejected { code }
        } else {
            CodeOutcome::Accepted {
                code,
                first_page: page,
            }
        };
        Ok(CodeAttempt { image, outcome })
    }

    /// 反复尝试直到验证码通过
    ///
    /// # 返回
    /// 返回 (验证码, 第 1 页 HTML)
    pub async fn acquire_code(&self, academic_year: &str) -> AppResult<(String, String)> {
        let mut attempts = 0u32;
        loop {
            attempts += 1;
            match self.attempt_code(academic_year).await?.outcome {
                CodeOutcome::Accepted { code, first_page } => {
                    info!("🔓 验证码通过: {} (第 {} 次尝试)", code, attempts);
                    return Ok((code, first_page));
                }
                CodeOutcome::Rejected { code } => {
                    warn!("🔁 验证码错误: {}，重新获取", code);
                }
                CodeOutcome::Unsolvable { reason } => {
                    warn!("🔁 验证码无法识别: {}，重新获取", reason);
                }
            }

            if let Some(max) = self.captcha_max_attempts {
                if attempts >= max {
                    return Err(PortalError::CaptchaAttemptsExhausted { attempts }.into());
                }
            }
        }
    }

    /// 总页数（配置优先）
    pub fn total_pages(&self, first_page: &str) -> AppResult<u32> {
        let total = match self.max_page {
            Some(total) => total,
            None => parse_total_pages(first_page).ok_or(PortalError::PageCountNotFound)?,
        };
        if total == 0 {
            return Err(PortalError::ZeroPages.into());
        }
        Ok(total)
    }

    /// 并发抓取第 1 到 `total` 页
    ///
    /// 结果按页码排序；任一页失败则整批失败。
    pub async fn fetch_all_pages(&self, code: &str, academic_year: &str, total: u32) -> AppResult<Vec<String>> {
        let semaphore = Semaphore::new(self.max_concurrent_pages);
        let progress = Arc::new(FetchProgress::new(total as usize));
        let reporter = progress.spawn_reporter(PROGRESS_INTERVAL);

        let fetches = (1..=total).map(|index| {
            let semaphore = &semaphore;
            let progress = &progress;
            async move {
                // 信号量只在本函数内使用，不会被关闭
                let _permit = semaphore.acquire().await.ok();
                let page = self.portal.fetch_page(code, academic_year, index).await?;
                let done = progress.record();
                debug!("第 {} 页完成 ({}/{})", index, done, progress.total());
                Ok::<_, crate::error::AppError>(page)
            }
        });

        let result = try_join_all(fetches).await;
        reporter.abort();
        result
    }

    /// 逐页解析
    pub async fn parse_pages(&self, academic_year: &str, pages: &[String]) -> CrawlResult {
        let mut result = CrawlResult {
            academic_year: academic_year.to_string(),
            ..Default::default()
        };

        for (i, html) in pages.iter().enumerate() {
            let ctx = ParseCtx::new(academic_year, i + 1);
            let parsed = parse_course_page(html);
            debug!(
                "{} 解析出 {} 条课程, {} 行被拒绝",
                ctx,
                parsed.records.len(),
                parsed.rejections.len()
            );

            for rejection in &parsed.rejections {
                result.rejected += 1;
                let outcome = self
                    .notifier
                    .notify_rejection(&rejection.reason, &ctx, html)
                    .await;
                if matches!(outcome, NotifyOutcome::Failed(_)) {
                    result.notify_failures += 1;
                }
            }
            result.records.extend(parsed.records);
        }

        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{AppError, VersionError};
    use crate::infrastructure::GlyphClassifier;
    use crate::services::{GlyphSegmenter, GlyphTensor};
    use image::{DynamicImage, GrayImage, ImageFormat};
    use std::io::Cursor;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// 总是识别为 "1234" 的分类器
    struct FixedClassifier;

    impl GlyphClassifier for FixedClassifier {
        fn classify(&self, batch: &[GlyphTensor]) -> AppResult<Vec<usize>> {
            Ok((0..batch.len()).collect())
        }
    }

    /// 离线选课系统：前 `wrong_codes` 次验证返回验证码错误
    struct FakePortal {
        wrong_codes: usize,
        query_pages: AtomicUsize,
        verifications: AtomicUsize,
        total_pages: u32,
        rows_per_page: usize,
    }

    impl FakePortal {
        fn new(wrong_codes: usize, total_pages: u32, rows_per_page: usize) -> Self {
            Self {
                wrong_codes,
                query_pages: AtomicUsize::new(0),
                verifications: AtomicUsize::new(0),
                total_pages,
                rows_per_page,
            }
        }
    }

    impl CoursePortal for FakePortal {
        async fn open_query_page(&self) -> AppResult<String> {
            self.query_pages.fetch_add(1, Ordering::SeqCst);
            Ok(r#"<select id="YRSM"><option value=""></option><option value="1122">x</option></select>"#.to_string())
        }

        async fn fetch_captcha(&self) -> AppResult<Vec<u8>> {
            let mut bytes = Cursor::new(Vec::new());
            DynamicImage::ImageLuma8(GrayImage::new(40, 12))
                .write_to(&mut bytes, ImageFormat::Png)
                .unwrap();
            Ok(bytes.into_inner())
        }

        async fn fetch_page(&self, code: &str, academic_year: &str, index: u32) -> AppResult<String> {
            assert_eq!(code, "1234");
            assert_eq!(academic_year, "1122");
            if index == 1 && self.verifications.fetch_add(1, Ordering::SeqCst) < self.wrong_codes {
                return Ok("<script>alert('Wrong Validation Code')</script>".to_string());
            }
            let rows: String = (0..self.rows_per_page)
                .map(|r| course_row(&format!("P{}R{}", index, r)))
                .collect();
            Ok(format!(
                "<p>Showing page {} of {} pages</p><table><tr><td>標題</td></tr>{}<tr bgcolor=\"#eeeeee\"><td>壞行</td></tr></table>",
                index, self.total_pages, rows
            ))
        }
    }

    fn course_row(id: &str) -> String {
        let mut cells = vec![String::new(); 26];
        cells[3] = "資工系".to_string();
        cells[4] = id.to_string();
        cells[5] = "1".to_string();
        cells[7] = format!("<small><a href=\"syllabus.asp?id={}\">課程</a></small>", id);
        cells[8] = "3".to_string();
        cells[9] = "期".to_string();
        cells[10] = "選".to_string();
        for c in 11..15 {
            cells[c] = "0".to_string();
        }
        let tds: String = cells.iter().map(|c| format!("<td>{}</td>", c)).collect();
        format!("<tr bgcolor=\"#ffffff\">{}</tr>", tds)
    }

    fn flow(portal: FakePortal, config: &Config) -> CrawlFlow<FakePortal> {
        let solver = CaptchaSolver::new(GlyphSegmenter::new(false), Arc::new(FixedClassifier));
        let notifier = WarnNotifier::new(config).unwrap();
        CrawlFlow::new(portal, solver, notifier, config)
    }

    fn quiet_config() -> Config {
        Config {
            no_warning: true,
            max_concurrent_pages: 2,
            ..Config::default()
        }
    }

    #[tokio::test]
    async fn test_full_crawl_keeps_page_order() {
        let result = flow(FakePortal::new(2, 5, 3), &quiet_config()).run().await.unwrap();

        assert_eq!(result.academic_year, "1122");
        assert_eq!(result.pages, 5);
        assert_eq!(result.records.len(), 15);
        assert_eq!(result.rejected, 5);
        let ids: Vec<&str> = result.records.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(&ids[..4], &["P1R0", "P1R1", "P1R2", "P2R0"]);
        assert_eq!(ids[14], "P5R2");
    }

    #[tokio::test]
    async fn test_captcha_attempts_are_capped() {
        let config = Config {
            captcha_max_attempts: Some(3),
            ..quiet_config()
        };
        let err = flow(FakePortal::new(10, 1, 1), &config).run().await.unwrap_err();
        assert!(matches!(
            err,
            AppError::Portal(PortalError::CaptchaAttemptsExhausted { attempts: 3 })
        ));
    }

    #[tokio::test]
    async fn test_overrides_skip_discovery() {
        let config = Config {
            academic_year: Some("1122".to_string()),
            max_page: Some(2),
            ..quiet_config()
        };
        let result = flow(FakePortal::new(0, 9, 1), &config).run().await.unwrap();
        assert_eq!(result.pages, 2);
    }

    #[tokio::test]
    async fn test_invalid_year_override_fails_before_fetching() {
        let config = Config {
            academic_year: Some("112".to_string()),
            ..quiet_config()
        };
        let flow = flow(FakePortal::new(0, 1, 1), &config);
        let err = flow.run().await.unwrap_err();

        assert!(matches!(
            err,
            AppError::Version(VersionError::InvalidAcademicYear { .. })
        ));
        assert_eq!(flow.portal.query_pages.load(Ordering::SeqCst), 0);
        assert_eq!(flow.portal.verifications.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_zero_pages_is_fatal() {
        let config = Config {
            max_page: Some(0),
            ..quiet_config()
        };
        let err = flow(FakePortal::new(0, 1, 1), &config).run().await.unwrap_err();
        assert!(matches!(err, AppError::Portal(PortalError::ZeroPages)));
        assert!(err.is_structural());
    }

    #[test]
    fn test_missing_page_count_is_fatal() {
        let flow = flow(FakePortal::new(0, 1, 1), &quiet_config());
        assert!(matches!(
            flow.total_pages("<html></html>"),
            Err(AppError::Portal(PortalError::PageCountNotFound))
        ));
        assert_eq!(flow.total_pages("Showing page 1 of 7 pages").unwrap(), 7);
    }
}
