//! 核心数据模型定义
//!
//! 输入记录（症状、生命体征、患者上下文）对来自前端的松散JSON保持宽容：
//! 缺失字段取默认值，格式错误的值不会导致反序列化失败。

use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

/// 年龄无法解析时使用的默认值
pub const DEFAULT_AGE: i64 = 30;

/// 风险等级
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum RiskLevel {
    #[default]
    Low,    // 低
    Medium, // 中
    High,   // 高
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RiskLevel::Low => write!(f, "Low"),
            RiskLevel::Medium => write!(f, "Medium"),
            RiskLevel::High => write!(f, "High"),
        }
    }
}

/// 融合结果的置信度等级
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum ConfidenceLevel {
    /// 仅有临床数据
    #[serde(rename = "Moderate (Clinical Only)")]
    ClinicalOnly,
    High,
    Moderate,
}

impl fmt::Display for ConfidenceLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfidenceLevel::ClinicalOnly => write!(f, "Moderate (Clinical Only)"),
            ConfidenceLevel::High => write!(f, "High"),
            ConfidenceLevel::Moderate => write!(f, "Moderate"),
        }
    }
}

/// 原始数值字段：可能是数字、字符串或任意其他JSON值
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum RawValue {
    Number(f64),
    Text(String),
    Other(serde_json::Value),
}

impl RawValue {
    /// 解析为有限浮点数，无法解析时返回 None
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            RawValue::Number(n) => Some(*n).filter(|v| v.is_finite()),
            RawValue::Text(s) => s.trim().parse::<f64>().ok().filter(|v| v.is_finite()),
            RawValue::Other(_) => None,
        }
    }
}

impl fmt::Display for RawValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RawValue::Number(n) => write!(f, "{}", n),
            RawValue::Text(s) => write!(f, "{}", s),
            RawValue::Other(v) => write!(f, "{}", v),
        }
    }
}

impl From<f64> for RawValue {
    fn from(value: f64) -> Self {
        RawValue::Number(value)
    }
}

impl From<&str> for RawValue {
    fn from(value: &str) -> Self {
        RawValue::Text(value.to_string())
    }
}

/// 症状输入
///
/// 每次评估请求构造一次，核心不做持久化。
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct SymptomInput {
    /// 咳嗽持续时间（自由文本，例如 "3 months"）
    #[serde(default, deserialize_with = "deserialize_text")]
    pub cough_duration: String,
    /// 痰中带血（咯血）
    #[serde(default, deserialize_with = "deserialize_flag")]
    pub blood_in_sputum: bool,
    /// 盗汗
    #[serde(default, deserialize_with = "deserialize_flag")]
    pub night_sweats: bool,
    /// 体重减轻
    #[serde(default, deserialize_with = "deserialize_flag")]
    pub weight_loss: bool,
    /// 发热
    #[serde(default, deserialize_with = "deserialize_flag")]
    pub fever: bool,
    /// 胸痛
    #[serde(default, deserialize_with = "deserialize_flag")]
    pub chest_pain: bool,
    /// 前端勾选的症状标签
    #[serde(default, deserialize_with = "deserialize_labels")]
    pub selected_symptoms: Vec<String>,
}

/// 生命体征输入
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct VitalInput {
    /// 体温（华氏度）
    #[serde(default)]
    pub temperature: Option<RawValue>,
    /// 血氧饱和度（%，0-100）
    #[serde(default)]
    pub spo2: Option<RawValue>,
}

/// 患者上下文
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct PatientContext {
    /// 年龄（岁）
    #[serde(default)]
    pub age: Option<RawValue>,
    /// 性别，仅作信息展示，不参与评分
    #[serde(default)]
    pub gender: Option<String>,
}

impl PatientContext {
    pub fn new(age: u32, gender: impl Into<String>) -> Self {
        Self {
            age: Some(RawValue::Number(f64::from(age))),
            gender: Some(gender.into()),
        }
    }

    /// 以整数年计的年龄，缺失、无法解析或为负数时返回 [`DEFAULT_AGE`]
    pub fn age_years(&self) -> i64 {
        self.age
            .as_ref()
            .and_then(RawValue::as_f64)
            .filter(|age| *age >= 0.0)
            .map(|age| age.trunc() as i64)
            .unwrap_or(DEFAULT_AGE)
    }
}

/// 临床评分结果
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ClinicalResult {
    pub probability: f64,
    pub risk_level: RiskLevel,
    pub findings: Vec<String>,
    pub confidence: f64,
}

/// 影像特征指数，保留两位小数用于审计
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct SegmentIndices {
    #[serde(rename = "opacity_index")]
    pub opacity: f64,
    #[serde(rename = "asymmetry_index")]
    pub asymmetry: f64,
    #[serde(rename = "texture_index")]
    pub texture: f64,
}

/// 影像分析结果
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RadiologyResult {
    pub probability: f64,
    pub confidence: f64,
    pub findings: Vec<String>,
    #[serde(rename = "segments", default, skip_serializing_if = "Option::is_none")]
    pub segment_indices: Option<SegmentIndices>,
    #[serde(default)]
    pub error: bool,
}

impl RadiologyResult {
    /// 构造处理失败的降级结果：概率和置信度为 0，发现中包含失败原因
    pub fn failed(reason: impl fmt::Display) -> Self {
        Self {
            probability: 0.0,
            confidence: 0.0,
            findings: vec![format!("Error in radiology processing: {}", reason)],
            segment_indices: None,
            error: true,
        }
    }
}

/// 多模态融合结果
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FusionResult {
    pub final_probability: f64,
    pub final_risk_level: RiskLevel,
    pub agreement_score: f64,
    pub fusion_explanation: String,
    pub confidence_level: ConfidenceLevel,
}

/// 宽容字段：前端可能发送布尔、数字、字符串或 null，其余形状按缺失处理
#[derive(Deserialize)]
#[serde(untagged)]
enum LenientField {
    Bool(bool),
    Number(f64),
    Text(String),
    Other(serde_json::Value),
}

/// 症状标签：逗号分隔的字符串或列表，列表中只保留字符串项
#[derive(Deserialize)]
#[serde(untagged)]
enum Labels {
    One(String),
    Many(Vec<serde_json::Value>),
    Other(serde_json::Value),
}

fn deserialize_flag<'de, D>(deserializer: D) -> std::result::Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    let flag = match Option::<LenientField>::deserialize(deserializer)? {
        Some(LenientField::Bool(b)) => b,
        Some(LenientField::Number(n)) => n != 0.0,
        Some(LenientField::Text(s)) => {
            matches!(s.trim().to_lowercase().as_str(), "true" | "yes" | "y" | "1")
        }
        Some(LenientField::Other(_)) | None => false,
    };
    Ok(flag)
}

fn deserialize_text<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let text = match Option::<LenientField>::deserialize(deserializer)? {
        Some(LenientField::Text(s)) => s,
        Some(LenientField::Number(n)) => n.to_string(),
        Some(LenientField::Bool(b)) => b.to_string(),
        Some(LenientField::Other(_)) | None => String::new(),
    };
    Ok(text)
}

fn deserialize_labels<'de, D>(deserializer: D) -> std::result::Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let labels = match Option::<Labels>::deserialize(deserializer)? {
        Some(Labels::Many(items)) => items
            .into_iter()
            .filter_map(|item| match item {
                serde_json::Value::String(label) => Some(label),
                _ => None,
            })
            .collect(),
        Some(Labels::One(label)) => label
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(String::from)
            .collect(),
        Some(Labels::Other(_)) | None => Vec::new(),
    };
    Ok(labels)
}
