//! 解析警告服务 - 业务能力层
//!
//! 只负责"把一行解析失败报告出去"，不关心流程，也不会让抓取失败

use std::fmt::Display;
use std::time::Duration;

use reqwest::multipart::{Form, Part};
use tracing::{debug, warn};

use crate::config::Config;
use crate::error::{AppError, AppResult};
use crate::services::course_parser::RejectReason;
use crate::utils::logging::truncate_text;

/// Webhook 请求超时
const WEBHOOK_TIMEOUT: Duration = Duration::from_secs(15);

/// 一次警告的处理结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NotifyOutcome {
    /// 已关闭警告，什么都没做
    Suppressed,
    /// 只写了日志（未配置 Webhook）
    Logged,
    /// 日志 + Webhook 发送成功
    Delivered,
    /// Webhook 发送失败（已记录日志）
    Failed(String),
}

/// 解析警告服务
///
/// 职责：
/// - 记录被拒绝的行
/// - 配置了 Webhook 时附带整页 HTML 发送出去
/// - 发送失败只记录，不向上传播
pub struct WarnNotifier {
    client: reqwest::Client,
    webhook: Option<String>,
    suppressed: bool,
}

impl WarnNotifier {
    /// 按配置创建
    pub fn new(config: &Config) -> AppResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(WEBHOOK_TIMEOUT)
            .build()
            .map_err(|e| AppError::request_failed("webhook client", e))?;

        Ok(Self {
            client,
            webhook: config.webhook.clone(),
            suppressed: config.no_warning,
        })
    }

    /// 报告一行解析失败
    ///
    /// # 参数
    /// - `reason`: 拒绝原因
    /// - `ctx`: 所在学年度与页码
    /// - `page_source`: 整页 HTML
    ///
    /// # 返回
    /// 返回本次警告的处理结果
    pub async fn notify_rejection(
        &self,
        reason: &RejectReason,
        ctx: &impl Display,
        page_source: &str,
    ) -> NotifyOutcome {
        if self.suppressed {
            return NotifyOutcome::Suppressed;
        }

        warn!("{} ⚠️ 解析失败: {}", ctx, truncate_text(&reason.to_string(), 120));

        let Some(webhook) = &self.webhook else {
            return NotifyOutcome::Logged;
        };

        match self.post(webhook, reason, ctx, page_source).await {
            Ok(()) => {
                debug!("{} Webhook 已送达", ctx);
                NotifyOutcome::Delivered
            }
            Err(e) => {
                warn!("{} ❌ Webhook 发送失败: {}", ctx, e);
                NotifyOutcome::Failed(e.to_string())
            }
        }
    }

    async fn post(
        &self,
        webhook: &str,
        reason: &RejectReason,
        ctx: &impl Display,
        page_source: &str,
    ) -> Result<(), reqwest::Error> {
        let file = Part::text(page_source.to_string())
            .file_name("page.html")
            .mime_str("text/html")?;
        let form = Form::new()
            .text("content", format!("parse error: ```{}```\n{}", reason, ctx))
            .part("file", file);

        self.client
            .post(webhook)
            .multipart(form)
            .send()
            .await?
            .error_for_status()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn notifier(webhook: Option<&str>, no_warning: bool) -> WarnNotifier {
        let config = Config {
            webhook: webhook.map(str::to_string),
            no_warning,
            ..Config::default()
        };
        WarnNotifier::new(&config).unwrap()
    }

    #[test]
    fn test_suppressed_does_nothing() {
        let outcome = tokio_test::block_on(notifier(Some("http://127.0.0.1:9/hook"), true).notify_rejection(
            &RejectReason::MissingDetailLink,
            &"[学年 1122 第 1 页]",
            "<html></html>",
        ));
        assert_eq!(outcome, NotifyOutcome::Suppressed);
    }

    #[test]
    fn test_without_webhook_only_logs() {
        let outcome = tokio_test::block_on(notifier(None, false).notify_rejection(
            &RejectReason::InsufficientColumns { found: 3 },
            &"[学年 1122 第 2 页]",
            "<html></html>",
        ));
        assert_eq!(outcome, NotifyOutcome::Logged);
    }

    #[tokio::test]
    async fn test_unreachable_webhook_is_captured() {
        let outcome = notifier(Some("http://127.0.0.1:9/hook"), false)
            .notify_rejection(
                &RejectReason::MissingDetailLink,
                &"[学年 1122 第 3 页]",
                "<html></html>",
            )
            .await;
        assert!(matches!(outcome, NotifyOutcome::Failed(_)));
    }

    /// 接收一次请求并原样返回请求文本
    async fn receive_one(listener: tokio::net::TcpListener) -> String {
        use tokio::io::{AsyncReadExt, AsyncWriteExt};

        let (mut stream, _) = listener.accept().await.unwrap();
        let mut buf = Vec::new();
        let mut chunk = [0u8; 4096];
        loop {
            let n = stream.read(&mut chunk).await.unwrap();
            if n == 0 {
                break;
            }
            buf.extend_from_slice(&chunk[..n]);

            let text = String::from_utf8_lossy(&buf).to_string();
            let Some(start) = text.to_ascii_lowercase().find("boundary=") else {
                continue;
            };
            let boundary = text[start + "boundary=".len()..]
                .split("\r\n")
                .next()
                .unwrap()
                .trim_matches('"')
                .to_string();
            let closed = text.contains(&format!("--{}--", boundary));
            let chunked = text.to_ascii_lowercase().contains("transfer-encoding: chunked");
            if closed && (!chunked || text.ends_with("0\r\n\r\n")) {
                break;
            }
        }

        stream
            .write_all(b"HTTP/1.1 200 OK\r\ncontent-length: 0\r\nconnection: close\r\n\r\n")
            .await
            .unwrap();
        String::from_utf8_lossy(&buf).to_string()
    }

    #[tokio::test]
    async fn test_webhook_payload() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let url = format!("http://{}/hook", listener.local_addr().unwrap());
        let server = tokio::spawn(receive_one(listener));

        let page = "<html><body>第 4 页</body></html>";
        let outcome = notifier(Some(&url), false)
            .notify_rejection(&RejectReason::MissingDetailLink, &"[学年 1122 第 4 页]", page)
            .await;
        let request = server.await.unwrap();

        assert_eq!(outcome, NotifyOutcome::Delivered);
        assert!(request.starts_with("POST /hook"));
        assert!(request.contains("name=\"content\""));
        assert!(request.contains("parse error: ```missing detail link```\n[学年 1122 第 4 页]"));
        assert!(request.contains("name=\"file\"; filename=\"page.html\""));
        assert!(request.contains(page));
    }
}
