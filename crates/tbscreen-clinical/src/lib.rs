//! # 临床评分模块
//!
//! 提供结核病临床风险评估功能，包括：
//! - 临床评分引擎：按固定权重表对症状和人口学指标加权评分
//! - 生命体征筛查：体温和血氧的提示性检查，不参与评分

pub mod engine;
pub mod vitals;

// 重新导出主要类型
pub use engine::{clinical_analyze, risk_tier, ClinicalEngine, ClinicalIndicator};
pub use vitals::{assess_vitals, VitalsAssessment};
