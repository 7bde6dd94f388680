//! 多模态融合引擎
//!
//! 加权一致性策略：有影像时按权重合并两路概率，并以两者差值衡量一致性；
//! 无影像时直接沿用临床结果。

use serde::{Deserialize, Serialize};
use tbscreen_core::utils::{clamp_unit, surface};
use tbscreen_core::{
    ClinicalResult, ConfidenceLevel, FusionResult, RadiologyResult, Result, RiskLevel, TbError,
};
use tracing::debug;

const HIGH_RISK_THRESHOLD: f64 = 0.75;
const MEDIUM_RISK_THRESHOLD: f64 = 0.40;

/// 一致性高于该值视为高度共识
const CONSENSUS_THRESHOLD: f64 = 0.8;
/// 一致性低于该值视为显著分歧
const DISCORDANCE_THRESHOLD: f64 = 0.4;
/// 一致性高于该值时置信度为 High
const HIGH_CONFIDENCE_THRESHOLD: f64 = 0.7;

const CLINICAL_ONLY_EXPLANATION: &str =
    "Diagnosis based purely on clinical assessment (no imaging provided).";
const CONSENSUS_EXPLANATION: &str =
    "High inter-model consensus between clinical symptoms and radiological findings.";
const DISCORDANCE_EXPLANATION: &str =
    "Clinical-radiological discordance observed. Further investigation (CBNAAT) is critical.";
const COMBINED_EXPLANATION: &str =
    "Combined assessment based on clinical history and imaging correlation.";

/// 融合权重
///
/// 影像权重默认更高，因为结构性改变的特异性更强。
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct FusionWeights {
    pub clinical_weight: f64,
    pub radiology_weight: f64,
}

impl Default for FusionWeights {
    fn default() -> Self {
        Self {
            clinical_weight: 0.4,
            radiology_weight: 0.6,
        }
    }
}

impl FusionWeights {
    /// 校验权重：各自位于 [0,1] 且和为 1
    pub fn validate(&self) -> Result<()> {
        for (name, weight) in [
            ("clinical_weight", self.clinical_weight),
            ("radiology_weight", self.radiology_weight),
        ] {
            if !(0.0..=1.0).contains(&weight) {
                return Err(TbError::Validation(format!(
                    "{} must be within [0, 1], got {}",
                    name, weight
                )));
            }
        }

        let sum = self.clinical_weight + self.radiology_weight;
        if (sum - 1.0).abs() > 1e-9 {
            return Err(TbError::Validation(format!(
                "fusion weights must sum to 1.0, got {}",
                sum
            )));
        }

        Ok(())
    }
}

/// 多模态融合引擎
#[derive(Debug, Clone, Copy, Default)]
pub struct FusionEngine {
    weights: FusionWeights,
}

impl FusionEngine {
    /// 使用默认权重 (0.4 / 0.6) 创建融合引擎
    pub fn new() -> Self {
        Self::default()
    }

    /// 使用自定义权重创建融合引擎
    pub fn with_weights(weights: FusionWeights) -> Result<Self> {
        weights.validate()?;
        Ok(Self { weights })
    }

    pub fn weights(&self) -> FusionWeights {
        self.weights
    }

    /// 合并两路证据，影像结果可缺失
    pub fn fuse(&self, clinical: &ClinicalResult, radiology: Option<&RadiologyResult>) -> FusionResult {
        let clinical_probability = clamp_unit(clinical.probability);

        let Some(radiology) = radiology else {
            debug!("No radiology result, passing clinical assessment through");
            return FusionResult {
                final_probability: surface(clinical_probability, 3),
                final_risk_level: clinical.risk_level,
                agreement_score: 1.0,
                fusion_explanation: CLINICAL_ONLY_EXPLANATION.to_string(),
                confidence_level: ConfidenceLevel::ClinicalOnly,
            };
        };

        let radiology_probability = clamp_unit(radiology.probability);

        let final_probability = surface(
            self.weights.clinical_weight * clinical_probability
                + self.weights.radiology_weight * radiology_probability,
            3,
        );
        let agreement_score = surface(1.0 - (clinical_probability - radiology_probability).abs(), 3);

        let fusion_explanation = if agreement_score > CONSENSUS_THRESHOLD {
            CONSENSUS_EXPLANATION
        } else if agreement_score < DISCORDANCE_THRESHOLD {
            DISCORDANCE_EXPLANATION
        } else {
            COMBINED_EXPLANATION
        };

        let confidence_level = if agreement_score > HIGH_CONFIDENCE_THRESHOLD {
            ConfidenceLevel::High
        } else {
            ConfidenceLevel::Moderate
        };

        debug!(
            "Fused clinical {} and radiology {} -> {} (agreement {})",
            clinical_probability, radiology_probability, final_probability, agreement_score
        );

        FusionResult {
            final_probability,
            final_risk_level: fusion_tier(final_probability),
            agreement_score,
            fusion_explanation: fusion_explanation.to_string(),
            confidence_level,
        }
    }
}

/// 融合概率到风险等级的映射
pub fn fusion_tier(probability: f64) -> RiskLevel {
    if probability > HIGH_RISK_THRESHOLD {
        RiskLevel::High
    } else if probability > MEDIUM_RISK_THRESHOLD {
        RiskLevel::Medium
    } else {
        RiskLevel::Low
    }
}

/// 融合入口（默认权重）
pub fn fuse(clinical: &ClinicalResult, radiology: Option<&RadiologyResult>) -> FusionResult {
    FusionEngine::new().fuse(clinical, radiology)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn clinical(probability: f64, risk_level: RiskLevel) -> ClinicalResult {
        ClinicalResult {
            probability,
            risk_level,
            findings: Vec::new(),
            confidence: 0.9,
        }
    }

    fn radiology(probability: f64) -> RadiologyResult {
        RadiologyResult {
            probability,
            confidence: 0.85,
            findings: Vec::new(),
            segment_indices: None,
            error: false,
        }
    }

    #[test]
    fn test_clinical_only_passthrough() {
        let result = fuse(&clinical(0.5263, RiskLevel::Medium), None);

        assert_eq!(result.final_probability, 0.526);
        assert_eq!(result.final_risk_level, RiskLevel::Medium);
        assert_eq!(result.agreement_score, 1.0);
        assert_eq!(result.confidence_level, ConfidenceLevel::ClinicalOnly);
        assert_eq!(result.fusion_explanation, CLINICAL_ONLY_EXPLANATION);
    }

    #[test]
    fn test_weighted_fusion_boundary_agreement() {
        let result = fuse(&clinical(0.2, RiskLevel::Low), Some(&radiology(0.8)));

        assert_eq!(result.final_probability, 0.56);
        assert_eq!(result.final_risk_level, RiskLevel::Medium);
        assert_eq!(result.agreement_score, 0.4);
        // 恰好 0.4 不算分歧
        assert_eq!(result.fusion_explanation, COMBINED_EXPLANATION);
        assert_eq!(result.confidence_level, ConfidenceLevel::Moderate);
    }

    #[test]
    fn test_negative_clinical_with_moderate_imaging() {
        let radiology_probability = 0.5 * 0.5 + 0.3 * 0.2 + 0.2 * 0.35;
        let result = fuse(&clinical(0.0, RiskLevel::Low), Some(&radiology(radiology_probability)));

        assert_eq!(result.final_probability, 0.228);
        assert_eq!(result.final_risk_level, RiskLevel::Low);
        assert_eq!(result.agreement_score, 0.62);
        assert_eq!(result.confidence_level, ConfidenceLevel::Moderate);
        assert_eq!(result.fusion_explanation, COMBINED_EXPLANATION);
    }

    #[test]
    fn test_consensus() {
        let result = fuse(&clinical(0.9, RiskLevel::High), Some(&radiology(0.95)));

        assert_eq!(result.final_probability, 0.93);
        assert_eq!(result.final_risk_level, RiskLevel::High);
        assert_eq!(result.agreement_score, 0.95);
        assert_eq!(result.fusion_explanation, CONSENSUS_EXPLANATION);
        assert_eq!(result.confidence_level, ConfidenceLevel::High);
    }

    #[test]
    fn test_discordance() {
        let result = fuse(&clinical(0.0, RiskLevel::Low), Some(&radiology(0.98)));

        assert_eq!(result.agreement_score, 0.02);
        assert_eq!(result.fusion_explanation, DISCORDANCE_EXPLANATION);
        assert_eq!(result.final_risk_level, RiskLevel::Medium);
    }

    #[test]
    fn test_errored_radiology_drags_probability_down() {
        let errored = RadiologyResult::failed("decode failure");
        let result = fuse(&clinical(0.526, RiskLevel::Medium), Some(&errored));

        assert_eq!(result.final_probability, 0.21);
        assert_eq!(result.final_risk_level, RiskLevel::Low);
    }

    #[test]
    fn test_out_of_range_inputs_are_clamped() {
        let result = fuse(&clinical(f64::NAN, RiskLevel::Low), Some(&radiology(1.5)));

        assert_eq!(result.final_probability, 0.6);
        assert_eq!(result.agreement_score, 0.0);
    }

    #[test]
    fn test_fusion_tier_thresholds() {
        assert_eq!(fusion_tier(0.40), RiskLevel::Low);
        assert_eq!(fusion_tier(0.401), RiskLevel::Medium);
        assert_eq!(fusion_tier(0.75), RiskLevel::Medium);
        assert_eq!(fusion_tier(0.751), RiskLevel::High);
    }

    #[test]
    fn test_custom_weights() {
        let engine = FusionEngine::with_weights(FusionWeights {
            clinical_weight: 0.5,
            radiology_weight: 0.5,
        })
        .unwrap();
        let result = engine.fuse(&clinical(0.2, RiskLevel::Low), Some(&radiology(0.8)));
        assert_eq!(result.final_probability, 0.5);
    }

    #[test]
    fn test_invalid_weights_rejected() {
        let unbalanced = FusionWeights { clinical_weight: 0.5, radiology_weight: 0.6 };
        assert!(FusionEngine::with_weights(unbalanced).is_err());

        let negative = FusionWeights { clinical_weight: -0.2, radiology_weight: 1.2 };
        assert!(negative.validate().is_err());
    }

    #[test]
    fn test_idempotent() {
        let engine = FusionEngine::new();
        let c = clinical(0.37, RiskLevel::Medium);
        let r = radiology(0.61);
        assert_eq!(engine.fuse(&c, Some(&r)), engine.fuse(&c, Some(&r)));
    }
}
