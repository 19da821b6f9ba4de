//! 选课系统客户端 - 基础设施层
//!
//! 唯一持有 HTTP 会话（cookie）的模块，只暴露"打开查询页 / 取验证码 / 取结果页"能力

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use tokio::time::sleep;
use tracing::{debug, warn};

use crate::config::Config;
use crate::error::{AppError, AppResult, PortalError};

/// 请求头中的浏览器标识
pub const USER_AGENT: &str = "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36";

/// 两次重试之间的等待时间
const RETRY_DELAY: Duration = Duration::from_millis(500);

/// 选课系统能力
///
/// 流程层只依赖这个 trait，测试时可以换成离线实现。
#[allow(async_fn_in_trait)]
pub trait CoursePortal {
    /// 打开查询页（建立会话），返回页面 HTML
    async fn open_query_page(&self) -> AppResult<String>;

    /// 取一张新的验证码图片
    async fn fetch_captcha(&self) -> AppResult<Vec<u8>>;

    /// 用验证码查询指定学年度的第 `index` 页（从 1 开始）
    async fn fetch_page(&self, code: &str, academic_year: &str, index: u32) -> AppResult<String>;
}

/// 传输错误重试策略
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    /// 最大重试次数，None 表示一直重试
    pub max_retries: Option<u32>,
    pub delay: Duration,
}

impl RetryPolicy {
    pub fn new(max_retries: Option<u32>) -> Self {
        Self {
            max_retries,
            delay: RETRY_DELAY,
        }
    }

    /// 第 `attempt` 次失败后是否还能重试
    pub fn allows(&self, attempt: u32) -> bool {
        self.max_retries.map_or(true, |max| attempt <= max)
    }
}

/// 选课系统 HTTP 客户端
pub struct PortalClient {
    client: reqwest::Client,
    base_url: String,
    retry: RetryPolicy,
}

impl PortalClient {
    /// 按配置创建（带 cookie 存储）
    pub fn new(config: &Config) -> AppResult<Self> {
        let client = reqwest::Client::builder()
            .cookie_store(true)
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| AppError::request_failed("portal client", e))?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            retry: RetryPolicy::new(config.fetch_max_retries),
        })
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }

    /// 带重试地执行一次请求
    ///
    /// 只有传输层错误（连接、超时、读取响应体）会重试，其余错误直接返回。
    async fn with_retry<T, F, Fut>(&self, endpoint: &str, mut send: F) -> AppResult<T>
    where
        F: FnMut() -> Fut,
        Fut: std::future::Future<Output = Result<T, reqwest::Error>>,
    {
        let mut attempt = 0u32;
        loop {
            match send().await {
                Ok(value) => return Ok(value),
                Err(e) if is_transient(&e) => {
                    attempt += 1;
                    if !self.retry.allows(attempt) {
                        return Err(PortalError::RetriesExhausted {
                            endpoint: endpoint.to_string(),
                            attempts: attempt,
                        }
                        .into());
                    }
                    warn!("⚠️ 请求 {} 失败 (第 {} 次): {}，稍后重试", endpoint, attempt, e);
                    sleep(self.retry.delay).await;
                }
                Err(e) => return Err(AppError::request_failed(endpoint, e)),
            }
        }
    }
}

impl CoursePortal for PortalClient {
    async fn open_query_page(&self) -> AppResult<String> {
        let endpoint = self.endpoint("qrycourse.asp?HIS=2");
        debug!("打开查询页: {}", endpoint);
        let url = endpoint.as_str();
        self.with_retry(url, || async move { self.client.get(url).send().await?.text().await })
            .await
    }

    async fn fetch_captcha(&self) -> AppResult<Vec<u8>> {
        let epoch = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs_f64())
            .unwrap_or_default();
        let endpoint = self.endpoint(&format!("validcode.asp?epoch={}", epoch));
        let url = endpoint.as_str();
        self.with_retry(url, || async move {
            let bytes = self.client.get(url).send().await?.bytes().await?;
            Ok(bytes.to_vec())
        })
        .await
    }

    async fn fetch_page(&self, code: &str, academic_year: &str, index: u32) -> AppResult<String> {
        let endpoint = self.endpoint(&format!("dplycourse.asp?page={}", index));
        let url = endpoint.as_str();
        let form = query_form(code, academic_year);
        let form = &form;
        self.with_retry(url, || async move {
            self.client.post(url).form(form).send().await?.text().await
        })
        .await
    }
}

/// 结果页查询表单
pub fn query_form<'a>(code: &'a str, academic_year: &'a str) -> [(&'static str, &'a str); 18] {
    [
        ("HIS", ""),
        ("IDNO", ""),
        ("ITEM", ""),
        ("D0", academic_year),
        ("DEG_COD", "*"),
        ("D1", ""),
        ("D2", ""),
        ("CLASS_COD", ""),
        ("SECT_COD", ""),
        ("TYP", "1"),
        ("SDG_COD", ""),
        ("teacher", ""),
        ("crsname", ""),
        ("T3", ""),
        ("WKDAY", ""),
        ("SECT", ""),
        ("nowhis", "1"),
        ("ValidCode", code),
    ]
}

fn is_transient(e: &reqwest::Error) -> bool {
    e.is_connect() || e.is_timeout() || e.is_request() || e.is_body()
}
