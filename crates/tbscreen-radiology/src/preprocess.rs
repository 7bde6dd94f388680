//! 胸片预处理
//!
//! 统一不同设备之间的曝光和对比度差异：灰度化、全范围对比度拉伸、缩放到 224×224。

use image::imageops::{self, FilterType};
use image::{DynamicImage, GrayImage};
use std::path::Path;
use tbscreen_core::{Result, TbError};
use tracing::debug;

/// 特征提取使用的固定网格边长
pub const TARGET_SIZE: u32 = 224;

/// 缩放插值：双三次
pub const RESIZE_FILTER: FilterType = FilterType::CatmullRom;

/// 从文件解码影像，支持常见栅格格式
pub fn load_image(path: &Path) -> Result<DynamicImage> {
    image::open(path).map_err(|e| TbError::Image(format!("{}: {}", path.display(), e)))
}

/// 预处理：灰度化 → 对比度拉伸 → 缩放
pub fn preprocess(image: &DynamicImage) -> Result<GrayImage> {
    if image.width() == 0 || image.height() == 0 {
        return Err(TbError::Image("image has zero width or height".to_string()));
    }

    let mut gray = image.to_luma8();
    stretch_contrast(&mut gray);

    debug!(
        "Resizing {}x{} grayscale image to {}x{}",
        gray.width(),
        gray.height(),
        TARGET_SIZE,
        TARGET_SIZE
    );

    Ok(imageops::resize(&gray, TARGET_SIZE, TARGET_SIZE, RESIZE_FILTER))
}

/// 全范围对比度拉伸：最暗像素映射到 0，最亮像素映射到 255
///
/// 所有像素相同时保持不变。
pub fn stretch_contrast(image: &mut GrayImage) {
    let (lo, hi) = image
        .as_raw()
        .iter()
        .fold((u8::MAX, u8::MIN), |(lo, hi), &p| (lo.min(p), hi.max(p)));

    if hi <= lo {
        return;
    }

    let range = u32::from(hi - lo);
    for pixel in image.pixels_mut() {
        let stretched = u32::from(pixel.0[0] - lo) * 255 / range;
        pixel.0[0] = stretched.min(255) as u8;
    }
}
