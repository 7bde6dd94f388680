//! # 影像特征模块
//!
//! 基于确定性像素统计的胸片分析，不使用任何学习模型：
//! - 预处理：解码、灰度化、对比度拉伸、缩放到固定网格
//! - 特征提取：上肺野不透光度、左右不对称度、纹理异质性
//! - 影像引擎：特征加权得到结核概率和影像发现

pub mod engine;
pub mod features;
pub mod preprocess;

pub use engine::{radiology_analyze, RadiologyEngine};
pub use features::{extract_features, FeatureIndices};
pub use preprocess::{load_image, preprocess, RESIZE_FILTER, TARGET_SIZE};
