//! 评估流水线
//!
//! 单次请求内顺序执行：临床评分 → 可选影像分析 → 融合。
//! 各引擎均为无状态纯函数，不同请求之间可以并行执行而无需加锁。

use crate::recommendations::recommendations;
use crate::report::{AssessmentReport, AssessmentRequest};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use tbscreen_clinical::{assess_vitals, ClinicalEngine};
use tbscreen_core::{RadiologyResult, TbError};
use tbscreen_fusion::FusionEngine;
use tbscreen_radiology::RadiologyEngine;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};
use uuid::Uuid;

/// 出错的影像结果如何参与融合
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ErroredRadiologyPolicy {
    /// 视为无影像，仅按临床结果融合
    #[default]
    TreatAsAbsent,
    /// 按零概率影像参与加权融合
    TreatAsPresent,
}

/// 流水线配置
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PipelineConfig {
    /// 影像解码与特征提取的截止时间（秒）
    pub radiology_timeout_secs: u64,
    pub errored_radiology: ErroredRadiologyPolicy,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            radiology_timeout_secs: 30,
            errored_radiology: ErroredRadiologyPolicy::default(),
        }
    }
}

/// 评估流水线
#[derive(Debug, Clone, Default)]
pub struct AssessmentPipeline {
    clinical: ClinicalEngine,
    radiology: RadiologyEngine,
    fusion: FusionEngine,
    config: PipelineConfig,
}

impl AssessmentPipeline {
    /// 创建新的评估流水线
    pub fn new(config: PipelineConfig) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }

    /// 替换融合引擎（例如使用配置中的权重）
    pub fn with_fusion_engine(mut self, fusion: FusionEngine) -> Self {
        self.fusion = fusion;
        self
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// 执行一次完整评估
    pub async fn assess(&self, request: AssessmentRequest) -> AssessmentReport {
        let id = Uuid::new_v4();
        info!("Starting TB assessment {}", id);

        // 1. 临床评分，始终执行
        let clinical = self.clinical.analyze(&request.symptoms, &request.patient);
        let vitals = assess_vitals(&request.vitals);

        // 2. 影像分析，仅在提供胸片时执行
        let radiology = match &request.image_path {
            Some(path) => Some(self.run_radiology(path.clone()).await),
            None => None,
        };

        // 3. 融合
        let fusion_input = match radiology.as_ref() {
            Some(r) if r.error && self.config.errored_radiology == ErroredRadiologyPolicy::TreatAsAbsent => {
                warn!("Assessment {}: radiology failed, fusing on clinical evidence only", id);
                None
            }
            other => other,
        };
        let fusion = self.fusion.fuse(&clinical, fusion_input);

        let mut missing_data = vitals.missing_data.clone();
        match &radiology {
            None => missing_data.push("No chest X-ray provided".to_string()),
            Some(r) if r.error => missing_data.push("Chest X-ray could not be analyzed".to_string()),
            Some(_) => {}
        }

        let has_xray = radiology.as_ref().map_or(false, |r| !r.error);

        let report = AssessmentReport {
            id,
            assessed_at: Utc::now(),
            patient: request.patient,
            recommendations: recommendations(fusion.final_risk_level, has_xray),
            clinical,
            vitals,
            radiology,
            fusion,
            missing_data,
        };

        info!("Completed {}", report.get_summary());
        report
    }

    /// 在阻塞线程池中执行影像分析，并施加截止时间
    async fn run_radiology(&self, path: PathBuf) -> RadiologyResult {
        let engine = self.radiology;
        let task = tokio::task::spawn_blocking(move || engine.analyze(&path));
        await_radiology(task, Duration::from_secs(self.config.radiology_timeout_secs)).await
    }
}

async fn await_radiology(task: JoinHandle<RadiologyResult>, deadline: Duration) -> RadiologyResult {
    let err = match tokio::time::timeout(deadline, task).await {
        Ok(Ok(result)) => return result,
        Ok(Err(join_error)) => {
            let err = TbError::Internal(format!("analysis task failed: {}", join_error));
            error!("Radiology task failed: {}", err);
            err
        }
        Err(_) => {
            let err = TbError::Timeout(format!(
                "analysis exceeded the {:.1}s deadline",
                deadline.as_secs_f64()
            ));
            warn!("Radiology analysis aborted: {}", err);
            err
        }
    };
    RadiologyResult::failed(err.reason())
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{GrayImage, Luma};
    use tbscreen_core::{ConfidenceLevel, PatientContext, RiskLevel, SymptomInput, VitalInput};

    fn elderly_cough_request() -> AssessmentRequest {
        AssessmentRequest {
            symptoms: SymptomInput {
                cough_duration: "3 months".to_string(),
                blood_in_sputum: true,
                ..Default::default()
            },
            vitals: VitalInput::default(),
            patient: PatientContext::new(70, "M"),
            image_path: None,
        }
    }

    #[tokio::test]
    async fn test_clinical_only_assessment() {
        let pipeline = AssessmentPipeline::default();
        let report = pipeline.assess(elderly_cough_request()).await;

        assert_eq!(report.clinical.probability, 0.526);
        assert_eq!(report.fusion.final_risk_level, RiskLevel::Medium);
        assert_eq!(report.fusion.agreement_score, 1.0);
        assert_eq!(report.fusion.confidence_level, ConfidenceLevel::ClinicalOnly);
        assert!(report.radiology.is_none());
        assert!(report.missing_data.contains(&"No chest X-ray provided".to_string()));
        assert!(report.recommendations[1].contains("AFB"));
    }

    #[tokio::test]
    async fn test_assessment_with_image() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("xray.png");
        GrayImage::from_fn(300, 300, |x, _| if x < 150 { Luma([240]) } else { Luma([10]) })
            .save(&path)
            .unwrap();

        let mut request = elderly_cough_request();
        request.image_path = Some(path);

        let report = AssessmentPipeline::default().assess(request).await;
        let radiology = report.radiology.as_ref().unwrap();

        assert!(!radiology.error);
        assert_eq!(radiology.findings.len(), 3);
        assert_ne!(report.fusion.confidence_level, ConfidenceLevel::ClinicalOnly);
        assert!(!report.missing_data.iter().any(|m| m.contains("X-ray")));
    }

    #[tokio::test]
    async fn test_errored_radiology_treated_as_absent() {
        let mut request = elderly_cough_request();
        request.image_path = Some(PathBuf::from("/nonexistent/xray.png"));

        let report = AssessmentPipeline::default().assess(request).await;

        assert!(report.radiology.as_ref().unwrap().error);
        assert_eq!(report.fusion.final_probability, 0.526);
        assert_eq!(report.fusion.confidence_level, ConfidenceLevel::ClinicalOnly);
        assert!(report.missing_data.contains(&"Chest X-ray could not be analyzed".to_string()));
        assert_eq!(report.recommendations[0], recommendations(RiskLevel::Medium, false)[0]);
    }

    #[tokio::test]
    async fn test_errored_radiology_treated_as_present() {
        let mut request = elderly_cough_request();
        request.image_path = Some(PathBuf::from("/nonexistent/xray.png"));

        let pipeline = AssessmentPipeline::new(PipelineConfig {
            errored_radiology: ErroredRadiologyPolicy::TreatAsPresent,
            ..PipelineConfig::default()
        });
        let report = pipeline.assess(request).await;

        assert_eq!(report.fusion.final_probability, 0.21);
        assert_eq!(report.fusion.final_risk_level, RiskLevel::Low);
    }

    #[tokio::test]
    async fn test_deadline_produces_error_result() {
        let task = tokio::task::spawn_blocking(|| {
            std::thread::sleep(Duration::from_millis(500));
            RadiologyResult::failed("unreachable")
        });
        let result = await_radiology(task, Duration::from_millis(10)).await;

        assert!(result.error);
        assert_eq!(
            result.findings[0],
            "Error in radiology processing: analysis exceeded the 0.0s deadline"
        );
    }

    #[tokio::test]
    async fn test_panicked_task_produces_error_result() {
        let task = tokio::task::spawn_blocking(|| -> RadiologyResult { panic!("decoder crashed") });
        let result = await_radiology(task, Duration::from_secs(5)).await;

        assert!(result.error);
        assert!(result.findings[0].starts_with("Error in radiology processing: analysis task failed"));
        assert!(!result.findings[0].contains("系统内部错误"));
    }

    #[tokio::test]
    async fn test_engine_outputs_are_repeatable() {
        let pipeline = AssessmentPipeline::default();
        let first = pipeline.assess(elderly_cough_request()).await;
        let second = pipeline.assess(elderly_cough_request()).await;

        assert_ne!(first.id, second.id);
        assert_eq!(first.clinical, second.clinical);
        assert_eq!(first.fusion, second.fusion);
    }

    #[test]
    fn test_policy_serialization() {
        let json = serde_json::to_string(&ErroredRadiologyPolicy::TreatAsAbsent).unwrap();
        assert_eq!(json, "\"treat_as_absent\"");
    }
}
