//! 验证码识别服务 - 业务能力层
//!
//! 组合切图服务与字符分类器，只负责"图片 → 验证码字符串"

use std::sync::Arc;

use tracing::debug;

use crate::config::Config;
use crate::error::{AppResult, CaptchaError};
use crate::infrastructure::glyph_model::{DenseGlyphModel, GlyphClassifier, LABEL_OFFSET};
use crate::services::glyph_segmenter::{GlyphSegmenter, GLYPH_COUNT};

/// 验证码识别服务
///
/// 模型在构造时加载一次，之后每次识别复用同一份只读权重。
/// 识别失败直接返回错误，不在这一层重试。
#[derive(Clone)]
pub struct CaptchaSolver {
    segmenter: Arc<GlyphSegmenter>,
    classifier: Arc<dyn GlyphClassifier>,
}

impl CaptchaSolver {
    /// 使用指定的切图服务和分类器创建
    pub fn new(segmenter: GlyphSegmenter, classifier: Arc<dyn GlyphClassifier>) -> Self {
        Self {
            segmenter: Arc::new(segmenter),
            classifier,
        }
    }

    /// 按配置加载模型权重并创建
    pub fn from_config(config: &Config) -> AppResult<Self> {
        let model = DenseGlyphModel::load(&config.model_path)?;
        Ok(Self::new(
            GlyphSegmenter::new(config.median_filter),
            Arc::new(model),
        ))
    }

    /// 切图服务（采集训练样本时使用）
    pub fn segmenter(&self) -> &GlyphSegmenter {
        &self.segmenter
    }

    /// 识别验证码
    ///
    /// # 参数
    /// - `image_bytes`: 验证码原始图片
    ///
    /// # 返回
    /// 返回 4 位验证码字符串
    pub fn solve(&self, image_bytes: &[u8]) -> AppResult<String> {
        let glyphs = self.segmenter.segment(image_bytes)?;
        let labels = self.classifier.classify(&glyphs)?;

        if labels.len() != GLYPH_COUNT {
            return Err(CaptchaError::LabelCountMismatch {
                expected: GLYPH_COUNT,
                actual: labels.len(),
            }
            .into());
        }

        let code: String = labels
            .iter()
            .map(|label| (label + LABEL_OFFSET).to_string())
            .collect();
        debug!("验证码识别结果: {}", code);
        Ok(code)
    }
}
