//! 处置建议
//!
//! 风险等级到固定临床处置清单的映射。

use tbscreen_core::RiskLevel;

/// 根据最终风险等级生成处置建议
pub fn recommendations(risk_level: RiskLevel, has_xray: bool) -> Vec<String> {
    let items: Vec<&str> = match risk_level {
        RiskLevel::High => vec![
            "Immediate isolation: patient shows strong clinical signs of active TB.",
            "Confirm diagnosis: order CBNAAT (GeneXpert) / sputum smear microscopy immediately.",
            if has_xray {
                "Chest X-ray review by a radiologist required."
            } else {
                "Order chest X-ray immediately."
            },
            "Start contact tracing for family members.",
        ],
        RiskLevel::Medium => vec![
            "Clinical correlation recommended: symptoms suggest possible TB or respiratory infection.",
            "Order sputum acid-fast bacilli (AFB) test.",
            "Prescribe broad-spectrum antibiotics and review in 7 days.",
            "Monitor temperature and weight daily.",
        ],
        RiskLevel::Low => vec![
            "Symptomatic treatment for cough/fever.",
            "Follow up if symptoms persist > 1 week.",
            "Counsel on respiratory hygiene.",
        ],
    };

    items.into_iter().map(String::from).collect()
}
