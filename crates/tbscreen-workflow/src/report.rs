//! 评估请求与评估报告

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tbscreen_clinical::VitalsAssessment;
use tbscreen_core::{
    ClinicalResult, FusionResult, PatientContext, RadiologyResult, SymptomInput, VitalInput,
};
use uuid::Uuid;

/// 一次评估请求
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AssessmentRequest {
    pub symptoms: SymptomInput,
    #[serde(default)]
    pub vitals: VitalInput,
    #[serde(default)]
    pub patient: PatientContext,
    /// 胸片路径，调用方负责校验上传文件类型
    #[serde(default)]
    pub image_path: Option<PathBuf>,
}

/// 评估报告
///
/// 除 `id` 和 `assessed_at` 外，报告内容对相同输入是确定的。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssessmentReport {
    pub id: Uuid,
    pub assessed_at: DateTime<Utc>,
    pub patient: PatientContext,
    pub clinical: ClinicalResult,
    pub vitals: VitalsAssessment,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub radiology: Option<RadiologyResult>,
    pub fusion: FusionResult,
    pub missing_data: Vec<String>,
    pub recommendations: Vec<String>,
}

impl AssessmentReport {
    /// 单行摘要，用于日志
    pub fn get_summary(&self) -> String {
        let imaging = match &self.radiology {
            Some(r) if r.error => "imaging failed",
            Some(_) => "imaging",
            None => "no imaging",
        };
        format!(
            "assessment {}: {} risk (p={:.3}, agreement={:.3}, {})",
            self.id,
            self.fusion.final_risk_level,
            self.fusion.final_probability,
            self.fusion.agreement_score,
            imaging
        )
    }
}
