//! 字符识别模型 - 基础设施层
//!
//! 持有模型权重（启动时加载一次，之后只读共享），只暴露"分类"能力

use std::path::Path;

use serde::Deserialize;
use tracing::{debug, info};

use crate::error::{AppResult, CaptchaError};
use crate::services::glyph_segmenter::{GlyphTensor, GLYPH_SIZE};

/// 模型类别下标到数字的偏移量（训练时标签从 1 开始编号）
pub const LABEL_OFFSET: usize = 1;

/// 字符分类器
///
/// 输入一批归一化字符，输出每个字符的类别下标（未加偏移量）。
pub trait GlyphClassifier: Send + Sync {
    fn classify(&self, batch: &[GlyphTensor]) -> AppResult<Vec<usize>>;
}

/// 激活函数
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Activation {
    Relu,
    Linear,
    Softmax,
}

/// 全连接层，`weights` 为 输出 × 输入
#[derive(Debug, Clone, Deserialize)]
pub struct DenseLayer {
    pub weights: Vec<Vec<f32>>,
    pub bias: Vec<f32>,
    pub activation: Activation,
}

impl DenseLayer {
    fn forward(&self, input: &[f32]) -> Vec<f32> {
        let mut output: Vec<f32> = self
            .weights
            .iter()
            .zip(&self.bias)
            .map(|(row, b)| row.iter().zip(input).map(|(w, x)| w * x).sum::<f32>() + b)
            .collect();

        match self.activation {
            Activation::Relu => output.iter_mut().for_each(|v| *v = v.max(0.0)),
            Activation::Linear => {}
            Activation::Softmax => softmax(&mut output),
        }
        output
    }
}

/// 训练端导出的前馈网络（JSON 权重）
///
/// ```json
/// {"input_size": 784, "layers": [{"weights": [[...]], "bias": [...], "activation": "relu"}]}
/// ```
#[derive(Debug, Clone, Deserialize)]
pub struct DenseGlyphModel {
    pub input_size: usize,
    pub layers: Vec<DenseLayer>,
}

impl DenseGlyphModel {
    /// 从权重文件加载模型
    ///
    /// # 参数
    /// - `path`: JSON 权重文件路径
    pub fn load(path: impl AsRef<Path>) -> AppResult<Self> {
        let path = path.as_ref();
        info!("🧠 正在加载验证码模型: {}", path.display());

        let content = std::fs::read_to_string(path).map_err(|e| CaptchaError::ModelLoadFailed {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;

        let model = Self::from_json_str(&content).map_err(|e| match e {
            crate::error::AppError::Captcha(CaptchaError::InvalidModel { reason }) => {
                CaptchaError::ModelLoadFailed {
                    path: path.display().to_string(),
                    reason,
                }
                .into()
            }
            other => other,
        })?;

        info!(
            "✓ 模型加载完成: {} 层, {} 个类别",
            model.layers.len(),
            model.class_count()
        );
        Ok(model)
    }

    /// 从 JSON 文本解析模型并校验结构
    pub fn from_json_str(content: &str) -> AppResult<Self> {
        let model: Self = serde_json::from_str(content).map_err(|e| CaptchaError::InvalidModel {
            reason: e.to_string(),
        })?;
        model.validate()?;
        Ok(model)
    }

    /// 输出类别数
    pub fn class_count(&self) -> usize {
        self.layers.last().map_or(0, |layer| layer.bias.len())
    }

    fn validate(&self) -> AppResult<()> {
        let invalid = |reason: String| CaptchaError::InvalidModel { reason };

        let expected_input = (GLYPH_SIZE * GLYPH_SIZE) as usize;
        if self.input_size != expected_input {
            return Err(invalid(format!(
                "输入维度为 {}，预期 {}",
                self.input_size, expected_input
            ))
            .into());
        }
        if self.layers.is_empty() {
            return Err(invalid("模型没有任何层".to_string()).into());
        }

        let mut width = self.input_size;
        for (i, layer) in self.layers.iter().enumerate() {
            if layer.weights.len() != layer.bias.len() || layer.bias.is_empty() {
                return Err(invalid(format!(
                    "第 {} 层权重行数 {} 与偏置数 {} 不一致",
                    i,
                    layer.weights.len(),
                    layer.bias.len()
                ))
                .into());
            }
            if let Some(row) = layer.weights.iter().find(|row| row.len() != width) {
                return Err(invalid(format!(
                    "第 {} 层输入维度为 {}，上一层输出为 {}",
                    i,
                    row.len(),
                    width
                ))
                .into());
            }
            width = layer.bias.len();
        }
        Ok(())
    }

    fn forward(&self, input: &[f32]) -> Vec<f32> {
        self.layers
            .iter()
            .fold(input.to_vec(), |activations, layer| layer.forward(&activations))
    }
}

impl GlyphClassifier for DenseGlyphModel {
    fn classify(&self, batch: &[GlyphTensor]) -> AppResult<Vec<usize>> {
        let labels = batch
            .iter()
            .map(|glyph| argmax(&self.forward(glyph.as_slice())))
            .collect::<Vec<_>>();
        debug!("模型预测类别: {:?}", labels);
        Ok(labels)
    }
}

fn softmax(values: &mut [f32]) {
    let max = values.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    let mut sum = 0.0;
    for v in values.iter_mut() {
        *v = (*v - max).exp();
        sum += *v;
    }
    if sum > 0.0 {
        values.iter_mut().for_each(|v| *v /= sum);
    }
}

/// 最大值下标（并列时取第一个）
fn argmax(values: &[f32]) -> usize {
    values
        .iter()
        .enumerate()
        .fold((0, f32::NEG_INFINITY), |(best_i, best_v), (i, &v)| {
            if v > best_v {
                (i, v)
            } else {
                (best_i, best_v)
            }
        })
        .0
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{GrayImage, Luma};
    use serde_json::json;

    const INPUTS: usize = (GLYPH_SIZE * GLYPH_SIZE) as usize;

    /// 两类模型：平均亮度超过 0.25 时为类别 1，否则为类别 0
    fn brightness_model_json() -> String {
        json!({
            "input_size": INPUTS,
            "layers": [{
                "weights": [vec![-1.0f32; INPUTS], vec![1.0f32; INPUTS]],
                "bias": [0.0, -392.0],
                "activation": "softmax"
            }]
        })
        .to_string()
    }

    fn glyph(level: u8) -> GlyphTensor {
        GlyphTensor::from_image(&GrayImage::from_pixel(GLYPH_SIZE, GLYPH_SIZE, Luma([level])))
    }

    #[test]
    fn test_classify_by_brightness() {
        let model = DenseGlyphModel::from_json_str(&brightness_model_json()).unwrap();
        assert_eq!(model.class_count(), 2);

        let labels = model
            .classify(&[glyph(0), glyph(255), glyph(200), glyph(10)])
            .unwrap();
        assert_eq!(labels, vec![0, 1, 1, 0]);
    }

    #[test]
    fn test_hidden_layer_shapes_chain() {
        let content = json!({
            "input_size": INPUTS,
            "layers": [
                {"weights": vec![vec![1.0f32; INPUTS]; 3], "bias": [0.0, 0.0, 0.0], "activation": "relu"},
                {"weights": [[0.0, 0.0, 0.0], [1.0, 1.0, 1.0]], "bias": [0.5, 0.0], "activation": "linear"}
            ]
        })
        .to_string();
        let model = DenseGlyphModel::from_json_str(&content).unwrap();
        assert_eq!(model.classify(&[glyph(255)]).unwrap(), vec![1]);
        assert_eq!(model.classify(&[glyph(0)]).unwrap(), vec![0]);
    }

    #[test]
    fn test_rejects_inconsistent_shapes() {
        let wrong_input = json!({"input_size": 10, "layers": []}).to_string();
        assert!(DenseGlyphModel::from_json_str(&wrong_input).is_err());

        let wrong_chain = json!({
            "input_size": INPUTS,
            "layers": [{"weights": [[1.0, 2.0]], "bias": [0.0], "activation": "linear"}]
        })
        .to_string();
        assert!(DenseGlyphModel::from_json_str(&wrong_chain).is_err());
    }

    #[test]
    fn test_missing_weights_file() {
        let err = DenseGlyphModel::load("/nonexistent/model.json").unwrap_err();
        assert!(err.to_string().contains("/nonexistent/model.json"));
    }

    #[test]
    fn test_argmax_ties_take_first() {
        assert_eq!(argmax(&[0.5, 0.5, 0.1]), 0);
        assert_eq!(argmax(&[0.1, 0.2, 0.9]), 2);
    }
}
