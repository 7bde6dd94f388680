//! # 多模态融合模块
//!
//! 将临床与影像两路独立证据合并为最终概率、风险等级、一致性评分和解释。

pub mod engine;

pub use engine::{fuse, fusion_tier, FusionEngine, FusionWeights};
