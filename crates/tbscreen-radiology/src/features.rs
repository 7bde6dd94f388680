//! 影像特征提取
//!
//! 三个相互独立的像素统计量，各自归一化到 [0,1]：
//!
//! 1. **不透光度**：上三分之一区域平均亮度 / 255。结核常表现为上叶实变，比含气肺组织更亮。
//! 2. **不对称度**：左半幅与水平镜像后的右半幅逐像素绝对差均值 / 255。早期结核多为单侧病变。
//! 3. **纹理**：全图像素标准差 / 128，作为纤维化或空洞导致的异质性替代指标。

use image::GrayImage;
use serde::{Deserialize, Serialize};
use tbscreen_core::utils::clamp_unit;

const MAX_INTENSITY: f64 = 255.0;
const TEXTURE_SCALE: f64 = 128.0;

/// 原始特征指数（未取整）
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq)]
pub struct FeatureIndices {
    pub opacity: f64,
    pub asymmetry: f64,
    pub texture: f64,
}

/// 从预处理后的灰度图提取全部特征
pub fn extract_features(image: &GrayImage) -> FeatureIndices {
    FeatureIndices {
        opacity: opacity_index(image),
        asymmetry: asymmetry_index(image),
        texture: texture_index(image),
    }
}

/// 上肺野不透光度
pub fn opacity_index(image: &GrayImage) -> f64 {
    let (width, height) = image.dimensions();
    let upper_len = (height / 3) as usize * width as usize;
    let upper_zone = &image.as_raw()[..upper_len];

    clamp_unit(mean(upper_zone) / MAX_INTENSITY)
}

/// 左右不对称度
pub fn asymmetry_index(image: &GrayImage) -> f64 {
    let width = image.width() as usize;
    let half = width / 2;
    if half == 0 {
        return 0.0;
    }

    let mut total: u64 = 0;
    let mut count: u64 = 0;
    for row in image.as_raw().chunks_exact(width) {
        for x in 0..half {
            total += u64::from(row[x].abs_diff(row[width - 1 - x]));
            count += 1;
        }
    }

    if count == 0 {
        return 0.0;
    }
    clamp_unit(total as f64 / count as f64 / MAX_INTENSITY)
}

/// 纹理异质性（总体标准差）
pub fn texture_index(image: &GrayImage) -> f64 {
    let pixels = image.as_raw();
    if pixels.is_empty() {
        return 0.0;
    }

    let mean = mean(pixels);
    let variance = pixels
        .iter()
        .map(|&p| {
            let d = f64::from(p) - mean;
            d * d
        })
        .sum::<f64>()
        / pixels.len() as f64;

    clamp_unit(variance.sqrt() / TEXTURE_SCALE)
}

fn mean(pixels: &[u8]) -> f64 {
    if pixels.is_empty() {
        return 0.0;
    }
    pixels.iter().map(|&p| f64::from(p)).sum::<f64>() / pixels.len() as f64
}
