//! 编排层（Orchestration Layer）
//!
//! ## 职责
//!
//! 本层负责组装资源和调度流程，是整个系统的"指挥中心"。
//!
//! ## 模块划分
//!
//! ### `app` - 抓取并发布
//! - 创建选课系统客户端、验证码模型、警告服务
//! - 运行一次完整抓取
//! - 把结果交给快照发布器
//! - 输出全局统计信息
//!
//! ### `glyph_collector` - 训练样本采集
//! - 反复取验证码并验证
//! - 按结果保存原图或切片
//!
//! ## 层次关系
//!
//! ```text
//! app / glyph_collector
//!     ↓
//! workflow::CrawlFlow (一个学年度)
//!     ↓
//! services (能力层：captcha / parser / warn)        snapshot (发布)
//!     ↓
//! infrastructure (基础设施：PortalClient / GlyphModel)
//! ```

pub mod app;
pub mod glyph_collector;

// 重新导出主要类型
pub use app::App;
pub use glyph_collector::{collect_glyphs, CollectStats};
