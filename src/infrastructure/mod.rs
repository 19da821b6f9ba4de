//! 基础设施层（Infrastructure Layer）
//!
//! 持有稀缺资源（HTTP 会话、模型权重），只暴露能力

pub mod glyph_model;
pub mod portal_client;

pub use glyph_model::{DenseGlyphModel, GlyphClassifier, LABEL_OFFSET};
pub use portal_client::{CoursePortal, PortalClient, RetryPolicy};
