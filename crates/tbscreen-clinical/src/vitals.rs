//! 生命体征筛查
//!
//! 体温和血氧仅作为提示性发现输出，不改变临床概率。
//! 格式错误的读数记录为缺失数据，绝不中断评估流程。

use serde::{Deserialize, Serialize};
use tbscreen_core::{RawValue, VitalInput};
use tracing::warn;

/// 高热阈值（°F）
const HIGH_FEVER_F: f64 = 100.4;
/// 低热阈值（°F）
const LOW_GRADE_FEVER_F: f64 = 99.0;
/// 严重低氧阈值（%）
const CRITICAL_SPO2: f64 = 90.0;
/// 低血氧阈值（%）
const LOW_SPO2: f64 = 95.0;

/// 生命体征筛查结果
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct VitalsAssessment {
    /// 提示性发现
    pub findings: Vec<String>,
    /// 缺失或无效数据说明
    pub missing_data: Vec<String>,
}

/// 筛查生命体征
pub fn assess_vitals(vitals: &VitalInput) -> VitalsAssessment {
    let mut assessment = VitalsAssessment::default();

    match read_vital(vitals.temperature.as_ref(), |_| true) {
        Reading::Valid(temp) => {
            if temp > HIGH_FEVER_F {
                assessment.findings.push(format!("High fever ({}°F)", temp));
            } else if temp > LOW_GRADE_FEVER_F {
                assessment.findings.push(format!("Low-grade fever ({}°F)", temp));
            }
        }
        Reading::Invalid(raw) => {
            warn!("Ignoring malformed temperature reading: {}", raw);
            assessment.missing_data.push(format!("Invalid temperature reading: {}", raw));
        }
        Reading::Absent => assessment.missing_data.push("Temperature not recorded".to_string()),
    }

    match read_vital(vitals.spo2.as_ref(), |v| (0.0..=100.0).contains(&v)) {
        Reading::Valid(spo2) => {
            if spo2 < CRITICAL_SPO2 {
                assessment.findings.push(format!("Critical hypoxia (SpO2 {}%)", spo2));
            } else if spo2 < LOW_SPO2 {
                assessment.findings.push(format!("Low oxygen saturation ({}%)", spo2));
            }
        }
        Reading::Invalid(raw) => {
            warn!("Ignoring malformed SpO2 reading: {}", raw);
            assessment.missing_data.push(format!("Invalid SpO2 reading: {}", raw));
        }
        Reading::Absent => assessment.missing_data.push("SpO2 not recorded".to_string()),
    }

    assessment
}

enum Reading {
    Valid(f64),
    Invalid(String),
    Absent,
}

fn read_vital(raw: Option<&RawValue>, in_range: impl Fn(f64) -> bool) -> Reading {
    match raw {
        None => Reading::Absent,
        Some(value) => match value.as_f64() {
            Some(v) if in_range(v) => Reading::Valid(v),
            _ => Reading::Invalid(value.to_string()),
        },
    }
}
