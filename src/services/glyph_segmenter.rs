//! 验证码切图服务 - 业务能力层
//!
//! 把一张验证码图片切成 4 个等宽字符，并归一化成 28×28 的灰度张量

use image::imageops::{self, FilterType};
use image::{DynamicImage, GrayImage, Luma};

use crate::error::{AppResult, CaptchaError};

/// 每张验证码的字符数
pub const GLYPH_COUNT: usize = 4;

/// 归一化后字符图片的边长
pub const GLYPH_SIZE: u32 = 28;

/// 一个归一化后的字符（28×28 单通道，取值 [0, 1]，按行存储）
#[derive(Debug, Clone, PartialEq)]
pub struct GlyphTensor {
    pixels: Vec<f32>,
}

impl GlyphTensor {
    /// 从 28×28 灰度图生成（像素值 / 255）
    pub fn from_image(image: &GrayImage) -> Self {
        debug_assert_eq!(image.dimensions(), (GLYPH_SIZE, GLYPH_SIZE));
        let pixels = image.pixels().map(|p| f32::from(p.0[0]) / 255.0).collect();
        Self { pixels }
    }

    /// 展平后的像素
    pub fn as_slice(&self) -> &[f32] {
        &self.pixels
    }

    /// 像素平均值
    pub fn mean(&self) -> f32 {
        if self.pixels.is_empty() {
            return 0.0;
        }
        self.pixels.iter().sum::<f32>() / self.pixels.len() as f32
    }
}

/// 验证码切图服务
///
/// 职责：
/// - 解码图片并转灰度
/// - 可选中值滤波去噪
/// - 按 floor(宽度 / 4) 切成 4 片，缩放到 28×28 并归一化
pub struct GlyphSegmenter {
    median_filter: bool,
}

impl GlyphSegmenter {
    /// 创建切图服务
    ///
    /// # 参数
    /// - `median_filter`: 是否先做 3×3 中值滤波
    pub fn new(median_filter: bool) -> Self {
        Self { median_filter }
    }

    /// 计算 4 个切片的横向范围 `[start, end)`
    ///
    /// 宽度不是 4 的倍数时，右侧多出的列被丢弃。
    pub fn slice_bounds(width: u32) -> [(u32, u32); GLYPH_COUNT] {
        let slice_width = width / GLYPH_COUNT as u32;
        std::array::from_fn(|i| {
            let i = i as u32;
            (i * slice_width, (i + 1) * slice_width)
        })
    }

    /// 解码验证码并切成归一化字符
    ///
    /// # 参数
    /// - `image_bytes`: 验证码原始图片
    ///
    /// # 返回
    /// 返回 4 个字符张量
    pub fn segment(&self, image_bytes: &[u8]) -> AppResult<Vec<GlyphTensor>> {
        let gray = decode_grayscale(image_bytes)?;
        let gray = if self.median_filter {
            median_filter_3x3(&gray)
        } else {
            gray
        };

        let tensors = crop_slices(&gray)?
            .iter()
            .map(|slice| {
                let resized = imageops::resize(slice, GLYPH_SIZE, GLYPH_SIZE, FilterType::CatmullRom);
                GlyphTensor::from_image(&resized)
            })
            .collect();

        Ok(tensors)
    }

    /// 解码并切出原始灰度切片（不滤波、不缩放），用于采集训练样本
    pub fn raw_slices(&self, image_bytes: &[u8]) -> AppResult<Vec<GrayImage>> {
        let gray = decode_grayscale(image_bytes)?;
        crop_slices(&gray)
    }
}

impl Default for GlyphSegmenter {
    fn default() -> Self {
        Self::new(true)
    }
}

/// 解码图片并按 ITU-R 601-2 亮度公式转灰度
pub fn decode_grayscale(image_bytes: &[u8]) -> AppResult<GrayImage> {
    let image = image::load_from_memory(image_bytes)
        .map_err(|source| CaptchaError::DecodeFailed { source })?;

    if let DynamicImage::ImageLuma8(gray) = image {
        return Ok(gray);
    }

    let rgb = image.to_rgb8();
    let gray = GrayImage::from_fn(rgb.width(), rgb.height(), |x, y| {
        let [r, g, b] = rgb.get_pixel(x, y).0;
        let luma = (u32::from(r) * 299 + u32::from(g) * 587 + u32::from(b) * 114) / 1000;
        Luma([luma as u8])
    });
    Ok(gray)
}

fn crop_slices(gray: &GrayImage) -> AppResult<Vec<GrayImage>> {
    let (width, height) = gray.dimensions();
    if width < GLYPH_COUNT as u32 {
        return Err(CaptchaError::ImageTooNarrow { width }.into());
    }

    let slices = GlyphSegmenter::slice_bounds(width)
        .iter()
        .map(|&(start, end)| imageops::crop_imm(gray, start, 0, end - start, height).to_image())
        .collect();
    Ok(slices)
}

/// 3×3 中值滤波，边缘像素按最近像素补齐
pub fn median_filter_3x3(image: &GrayImage) -> GrayImage {
    let (width, height) = image.dimensions();
    if width == 0 || height == 0 {
        return image.clone();
    }

    GrayImage::from_fn(width, height, |x, y| {
        let mut window = [0u8; 9];
        let mut n = 0;
        for dy in -1i64..=1 {
            for dx in -1i64..=1 {
                let sx = (i64::from(x) + dx).clamp(0, i64::from(width) - 1) as u32;
                let sy = (i64::from(y) + dy).clamp(0, i64::from(height) - 1) as u32;
                window[n] = image.get_pixel(sx, sy).0[0];
                n += 1;
            }
        }
        window.sort_unstable();
        Luma([window[4]])
    })
}
