//! # 筛查工作流模块
//!
//! 编排一次完整的结核病筛查评估，包括：
//! - 评估流水线：临床评分 → 可选影像分析（带截止时间） → 融合
//! - 影像失败策略：出错的影像结果按缺失或按零概率参与融合
//! - 处置建议：根据最终风险等级给出固定的临床处置清单
//! - 评估报告：汇总三路结果、缺失数据和建议

pub mod pipeline;
pub mod recommendations;
pub mod report;

// 重新导出主要类型
pub use pipeline::{AssessmentPipeline, ErroredRadiologyPolicy, PipelineConfig};
pub use recommendations::recommendations;
pub use report::{AssessmentReport, AssessmentRequest};
