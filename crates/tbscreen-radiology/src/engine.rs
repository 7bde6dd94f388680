//! 胸片影像引擎
//!
//! 基于特征的计算机辅助诊断（CAD）：预处理 → 特征提取 → 加权概率 → 阈值发现。
//! 任何IO或处理失败都返回降级结果而不是错误，调用方仍可输出仅临床的评估。

use crate::features::{extract_features, FeatureIndices};
use crate::preprocess::{load_image, preprocess};
use image::DynamicImage;
use std::path::Path;
use tbscreen_core::{utils::round_to, RadiologyResult, SegmentIndices};
use tracing::{debug, error, info};

const OPACITY_WEIGHT: f64 = 0.5;
const ASYMMETRY_WEIGHT: f64 = 0.3;
const TEXTURE_WEIGHT: f64 = 0.2;

/// 概率下限，确定性方法从不给出绝对结论
const MIN_PROBABILITY: f64 = 0.05;
/// 概率上限
const MAX_PROBABILITY: f64 = 0.98;

/// 对方法本身的固定置信度，与输入无关
const METHOD_CONFIDENCE: f64 = 0.85;

const OPACITY_THRESHOLD: f64 = 0.4;
const ASYMMETRY_THRESHOLD: f64 = 0.15;
const TEXTURE_THRESHOLD: f64 = 0.3;

/// 胸片影像引擎
#[derive(Debug, Clone, Copy, Default)]
pub struct RadiologyEngine;

impl RadiologyEngine {
    /// 创建新的影像引擎
    pub fn new() -> Self {
        Self
    }

    /// 分析影像文件
    pub fn analyze(&self, image_path: impl AsRef<Path>) -> RadiologyResult {
        let path = image_path.as_ref();
        info!("Analyzing chest X-ray: {}", path.display());

        match load_image(path) {
            Ok(image) => self.analyze_image(&image),
            Err(e) => {
                error!("Radiology analysis error: {}", e);
                RadiologyResult::failed(e.reason())
            }
        }
    }

    /// 分析已解码的影像
    pub fn analyze_image(&self, image: &DynamicImage) -> RadiologyResult {
        match preprocess(image) {
            Ok(processed) => self.score_features(&extract_features(&processed)),
            Err(e) => {
                error!("Radiology preprocessing error: {}", e);
                RadiologyResult::failed(e.reason())
            }
        }
    }

    /// 由特征指数计算概率和发现
    pub fn score_features(&self, indices: &FeatureIndices) -> RadiologyResult {
        let raw = OPACITY_WEIGHT * indices.opacity
            + ASYMMETRY_WEIGHT * indices.asymmetry
            + TEXTURE_WEIGHT * indices.texture;
        let probability = if raw.is_nan() {
            MIN_PROBABILITY
        } else {
            raw.clamp(MIN_PROBABILITY, MAX_PROBABILITY)
        };

        debug!(
            "Radiology features: opacity={:.4} asymmetry={:.4} texture={:.4} -> {:.4}",
            indices.opacity, indices.asymmetry, indices.texture, probability
        );

        RadiologyResult {
            probability,
            confidence: METHOD_CONFIDENCE,
            findings: findings_for(indices),
            segment_indices: Some(SegmentIndices {
                opacity: round_to(indices.opacity, 2),
                asymmetry: round_to(indices.asymmetry, 2),
                texture: round_to(indices.texture, 2),
            }),
            error: false,
        }
    }
}

fn findings_for(indices: &FeatureIndices) -> Vec<String> {
    let mut findings = Vec::new();

    if indices.opacity > OPACITY_THRESHOLD {
        findings.push("Upper-zone opacity detected (possible consolidation)".to_string());
    }
    if indices.asymmetry > ASYMMETRY_THRESHOLD {
        findings.push("Significant bilateral lung asymmetry observed".to_string());
    }
    if indices.texture > TEXTURE_THRESHOLD {
        findings.push(
            "Heterogeneous parenchymal texture (suggestive of cavitation/fibrosis)".to_string(),
        );
    }

    if findings.is_empty() {
        findings.push(
            "Clear lung fields; no significant radiological indicators of active TB".to_string(),
        );
    }

    findings
}

/// 影像分析入口
pub fn radiology_analyze(image_path: impl AsRef<Path>) -> RadiologyResult {
    RadiologyEngine::new().analyze(image_path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{GrayImage, Luma};

    fn luma(image: GrayImage) -> DynamicImage {
        DynamicImage::ImageLuma8(image)
    }

    #[test]
    fn test_score_reference_features() {
        let indices = FeatureIndices { opacity: 0.5, asymmetry: 0.2, texture: 0.35 };
        let result = RadiologyEngine::new().score_features(&indices);

        assert!((result.probability - 0.38).abs() < 1e-9);
        assert_eq!(result.confidence, 0.85);
        assert_eq!(result.findings.len(), 3);
        assert_eq!(
            result.segment_indices,
            Some(SegmentIndices { opacity: 0.5, asymmetry: 0.2, texture: 0.35 })
        );
        assert!(!result.error);
    }

    #[test]
    fn test_clear_lung_fields() {
        let indices = FeatureIndices { opacity: 0.1, asymmetry: 0.05, texture: 0.1 };
        let result = RadiologyEngine::new().score_features(&indices);

        assert_eq!(
            result.findings,
            vec!["Clear lung fields; no significant radiological indicators of active TB"]
        );
    }

    #[test]
    fn test_probability_clipping() {
        let engine = RadiologyEngine::new();

        let low = engine.score_features(&FeatureIndices::default());
        assert_eq!(low.probability, 0.05);

        let high = engine.score_features(&FeatureIndices { opacity: 1.0, asymmetry: 1.0, texture: 1.0 });
        assert_eq!(high.probability, 0.98);
    }

    #[test]
    fn test_thresholds_are_strict() {
        let indices = FeatureIndices { opacity: 0.4, asymmetry: 0.15, texture: 0.3 };
        let result = RadiologyEngine::new().score_features(&indices);
        assert_eq!(result.findings.len(), 1);
        assert!(result.findings[0].starts_with("Clear lung fields"));
    }

    #[test]
    fn test_black_and_white_images_stay_in_range() {
        let engine = RadiologyEngine::new();

        let black = engine.analyze_image(&luma(GrayImage::from_pixel(300, 300, Luma([0]))));
        assert!(!black.error);
        assert!(black.probability >= 0.05 && black.probability <= 0.98);
        assert_eq!(black.probability, 0.05);

        let white = engine.analyze_image(&luma(GrayImage::from_pixel(300, 300, Luma([255]))));
        assert!(!white.error);
        assert!(white.probability > 0.05 && white.probability < 0.98);
        assert!(white.segment_indices.unwrap().opacity > 0.99);
    }

    #[test]
    fn test_unilateral_bright_image() {
        let image = GrayImage::from_fn(400, 300, |x, _| if x < 200 { Luma([230]) } else { Luma([20]) });
        let result = RadiologyEngine::new().analyze_image(&luma(image));

        let segments = result.segment_indices.unwrap();
        assert!(segments.asymmetry > 0.9);
        assert!(segments.texture > 0.9);
        assert!((segments.opacity - 0.5).abs() < 0.05);
        assert_eq!(result.findings.len(), 3);
        assert!(result.probability > 0.7 && result.probability < 0.8);
    }

    #[test]
    fn test_analyze_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("xray.png");
        let image = GrayImage::from_fn(256, 256, |x, y| Luma([((x * 7 + y * 3) % 256) as u8]));
        image.save(&path).unwrap();

        let engine = RadiologyEngine::new();
        let from_file = engine.analyze(&path);
        let in_memory = engine.analyze_image(&luma(image));

        assert!(!from_file.error);
        assert_eq!(from_file, in_memory);
    }

    #[test]
    fn test_missing_file_returns_error_result() {
        let result = radiology_analyze("/nonexistent/xray.png");

        assert!(result.error);
        assert_eq!(result.probability, 0.0);
        assert_eq!(result.confidence, 0.0);
        assert!(result.segment_indices.is_none());
        assert!(result.findings[0].starts_with("Error in radiology processing:"));
    }

    #[test]
    fn test_corrupt_file_returns_error_result() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.png");
        std::fs::write(&path, b"definitely not a png").unwrap();

        let result = radiology_analyze(&path);
        assert!(result.error);
    }

    #[test]
    fn test_idempotent() {
        let image = luma(GrayImage::from_fn(128, 96, |x, y| Luma([((x ^ y) % 256) as u8])));
        let engine = RadiologyEngine::new();
        assert_eq!(engine.analyze_image(&image), engine.analyze_image(&image));
    }
}
