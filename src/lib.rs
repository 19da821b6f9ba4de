//! # SELCRS Crawler
//!
//! 抓取中山大学选课系统的课程资料，发布成带版本历史的静态 JSON / CSV 快照
//!
//! ## 架构设计
//!
//! 本系统采用分层架构：
//!
//! ### ① 基础设施层（Infrastructure）
//! - `infrastructure/` - 持有稀缺资源（HTTP 会话、模型权重），只暴露能力
//! - `PortalClient` - 唯一的会话 owner，提供查询页 / 验证码 / 结果页
//! - `DenseGlyphModel` - 验证码字符分类模型，加载一次后只读共享
//!
//! ### ② 业务能力层（Services）
//! - `services/` - 描述"我能做什么"，只处理单张图片 / 单行 / 单页
//! - `CaptchaSolver` - 验证码识别能力
//! - `course_parser` - 表格行 → 课程记录
//! - `WarnNotifier` - 解析警告能力
//!
//! ### ③ 流程层（Workflow）
//! - `workflow/` - 定义"一个学年度"的完整抓取流程
//! - `ParseCtx` - 上下文封装（academic_year + page_index）
//! - `CrawlFlow` - 流程编排（学年度 → 验证码 → 页数 → 抓取 → 解析）
//!
//! ### ④ 快照层（Snapshot）
//! - `snapshot/` - 版本记录、差异比较、产物写入、目录清单
//!
//! ### ⑤ 编排层（Orchestration）
//! - `orchestrator/app` - 抓取并发布
//! - `orchestrator/glyph_collector` - 训练样本采集
//!
//! ## 模块结构

pub mod cli;
pub mod config;
pub mod error;
pub mod infrastructure;

pub mod models;
pub mod orchestrator;
pub mod services;
pub mod snapshot;
pub mod utils;
pub mod workflow;

// 重新导出常用类型
pub use config::Config;
pub use error::{AppError, AppResult};
pub use infrastructure::{CoursePortal, PortalClient};
pub use models::{CourseRecord, YearSemester};
pub use orchestrator::App;
pub use snapshot::{PublishOutcome, SnapshotPublisher};
pub use workflow::{CrawlFlow, CrawlResult, ParseCtx};
