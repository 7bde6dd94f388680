//! 临床评分引擎
//!
//! 基于固定权重表的加性评分。权重参考 WHO 与 CDC 的结核病诊断指南，
//! 概率 = 命中指标权重之和 / 全部权重之和。

use serde::{Deserialize, Serialize};
use tbscreen_core::{utils::surface, ClinicalResult, PatientContext, RiskLevel, SymptomInput};
use tracing::debug;

/// 高风险阈值（严格大于）
const HIGH_RISK_THRESHOLD: f64 = 0.70;
/// 中风险阈值（严格大于）
const MEDIUM_RISK_THRESHOLD: f64 = 0.35;
/// 命中两个及以上指标时的置信度
const MULTI_INDICATOR_CONFIDENCE: f64 = 0.90;
const SINGLE_INDICATOR_CONFIDENCE: f64 = 0.60;

/// 临床指标，声明顺序即为权重表顺序和发现输出顺序
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum ClinicalIndicator {
    PersistentCough, // 咳嗽超过两周
    Hemoptysis,      // 咯血
    WeightLoss,      // 体重减轻
    NightSweats,     // 盗汗
    Fever,           // 发热
    ChestPain,       // 胸痛
    AgeRisk,         // 年龄相关易感性
}

impl ClinicalIndicator {
    pub const ALL: [ClinicalIndicator; 7] = [
        ClinicalIndicator::PersistentCough,
        ClinicalIndicator::Hemoptysis,
        ClinicalIndicator::WeightLoss,
        ClinicalIndicator::NightSweats,
        ClinicalIndicator::Fever,
        ClinicalIndicator::ChestPain,
        ClinicalIndicator::AgeRisk,
    ];

    /// 指标权重
    pub fn weight(self) -> f64 {
        match self {
            ClinicalIndicator::PersistentCough => 4.0,
            ClinicalIndicator::Hemoptysis => 5.0,
            ClinicalIndicator::WeightLoss => 3.0,
            ClinicalIndicator::NightSweats => 2.5,
            ClinicalIndicator::Fever => 2.0,
            ClinicalIndicator::ChestPain => 1.5,
            ClinicalIndicator::AgeRisk => 1.0,
        }
    }

    /// 全部指标权重之和
    pub fn total_weight() -> f64 {
        Self::ALL.iter().map(|indicator| indicator.weight()).sum()
    }

    fn finding(self, age: i64) -> String {
        match self {
            ClinicalIndicator::PersistentCough => "Persistent cough (>2 weeks)".to_string(),
            ClinicalIndicator::Hemoptysis => "Hemoptysis (blood in sputum)".to_string(),
            ClinicalIndicator::WeightLoss => "Unexplained weight loss".to_string(),
            ClinicalIndicator::NightSweats => "Night sweats".to_string(),
            ClinicalIndicator::Fever => "Persistent fever".to_string(),
            ClinicalIndicator::ChestPain => "Chest pain".to_string(),
            ClinicalIndicator::AgeRisk => format!("Age-related vulnerability ({} yrs)", age),
        }
    }

    fn is_present(self, symptoms: &SymptomInput, age: i64) -> bool {
        match self {
            ClinicalIndicator::PersistentCough => {
                let duration = &symptoms.cough_duration;
                duration.contains("2 weeks") || duration.contains("month")
            }
            ClinicalIndicator::Hemoptysis => {
                symptoms.blood_in_sputum
                    || symptoms
                        .selected_symptoms
                        .iter()
                        .any(|label| label.to_lowercase().contains("hemoptysis"))
            }
            ClinicalIndicator::WeightLoss => symptoms.weight_loss,
            ClinicalIndicator::NightSweats => symptoms.night_sweats,
            ClinicalIndicator::Fever => symptoms.fever,
            ClinicalIndicator::ChestPain => symptoms.chest_pain,
            ClinicalIndicator::AgeRisk => age > 60 || age < 5,
        }
    }
}

/// 临床评分引擎
///
/// 无状态服务对象，可在多个请求之间共享。
#[derive(Debug, Clone, Copy, Default)]
pub struct ClinicalEngine;

impl ClinicalEngine {
    /// 创建新的临床评分引擎
    pub fn new() -> Self {
        Self
    }

    /// 计算结核病临床概率
    ///
    /// 从不失败：缺失字段视为未出现，年龄无法解析时按 30 岁处理。
    pub fn analyze(&self, symptoms: &SymptomInput, patient: &PatientContext) -> ClinicalResult {
        let age = patient.age_years();

        let fired: Vec<ClinicalIndicator> = ClinicalIndicator::ALL
            .iter()
            .copied()
            .filter(|indicator| indicator.is_present(symptoms, age))
            .collect();

        let score: f64 = fired.iter().map(|indicator| indicator.weight()).sum();
        let probability = surface(score / ClinicalIndicator::total_weight(), 3);
        let risk_level = risk_tier(probability);

        let confidence = if fired.len() >= 2 {
            MULTI_INDICATOR_CONFIDENCE
        } else {
            SINGLE_INDICATOR_CONFIDENCE
        };

        debug!(
            "Clinical score {:.1} from {} indicators -> probability {} ({})",
            score,
            fired.len(),
            probability,
            risk_level
        );

        ClinicalResult {
            probability,
            risk_level,
            findings: fired.iter().map(|indicator| indicator.finding(age)).collect(),
            confidence,
        }
    }
}

/// 临床概率到风险等级的映射
pub fn risk_tier(probability: f64) -> RiskLevel {
    if probability > HIGH_RISK_THRESHOLD {
        RiskLevel::High
    } else if probability > MEDIUM_RISK_THRESHOLD {
        RiskLevel::Medium
    } else {
        RiskLevel::Low
    }
}

/// 临床评分入口
pub fn clinical_analyze(symptoms: &SymptomInput, patient: &PatientContext) -> ClinicalResult {
    ClinicalEngine::new().analyze(symptoms, patient)
}
