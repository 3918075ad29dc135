//! report_data信封
//!
//! 规范形态为单字段 {"content": "..."}；历史数据仍是多段形态，
//! 在边界处统一归一化，装配引擎内部只处理规范形态。

use meg_core::{MegError, Result};
use serde::{Deserialize, Serialize};

/// 报告数据的两种持久化形态
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum ReportData {
    /// 规范形态
    Content { content: String },
    /// 遗留多段形态（只读兼容）
    LegacySections {
        #[serde(default)]
        patient_information: String,
        #[serde(default)]
        clinical_indication: String,
        #[serde(default)]
        procedure_performed: String,
        #[serde(default)]
        technical_parameters: String,
        #[serde(default)]
        findings: String,
        #[serde(default)]
        conclusion: String,
        #[serde(default)]
        recommendations: String,
    },
}

/// 遗留段名与标题的固定顺序
const LEGACY_SECTION_TITLES: &[(&str, usize)] = &[
    ("Patient Information", 0),
    ("Clinical Indication", 1),
    ("Procedure Performed", 2),
    ("Technical Parameters", 3),
    ("Findings", 4),
    ("Conclusion", 5),
    ("Recommendations", 6),
];

impl ReportData {
    /// 从持久化JSON解析，两种形态都接受
    pub fn from_value(value: &serde_json::Value) -> Result<Self> {
        serde_json::from_value(value.clone())
            .map_err(|e| MegError::Validation(format!("report_data形态无法识别: {}", e)))
    }

    pub fn to_value(&self) -> Result<serde_json::Value> {
        Ok(serde_json::to_value(self)?)
    }

    /// 归一化为规范的单字段内容
    ///
    /// 遗留形态拼接为带段落标题的单块文本，空段被跳过。
    pub fn into_canonical(self) -> String {
        match self {
            ReportData::Content { content } => content,
            ReportData::LegacySections {
                patient_information,
                clinical_indication,
                procedure_performed,
                technical_parameters,
                findings,
                conclusion,
                recommendations,
            } => {
                let fields = [
                    patient_information,
                    clinical_indication,
                    procedure_performed,
                    technical_parameters,
                    findings,
                    conclusion,
                    recommendations,
                ];
                let mut blocks = Vec::new();
                for (title, index) in LEGACY_SECTION_TITLES {
                    let body = &fields[*index];
                    if !body.trim().is_empty() {
                        blocks.push(format!("{}\n\n{}", title, body.trim()));
                    }
                }
                blocks.join("\n\n")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_canonical_shape_parses() {
        let value = json!({"content": "final text"});
        let data = ReportData::from_value(&value).unwrap();
        assert_eq!(data.into_canonical(), "final text");
    }

    #[test]
    fn test_legacy_shape_stays_readable() {
        let value = json!({
            "patient_information": "",
            "clinical_indication": "seizure work-up",
            "procedure_performed": "MEG resting state",
            "technical_parameters": "",
            "findings": "focal slowing",
            "conclusion": "abnormal study",
            "recommendations": ""
        });
        let data = ReportData::from_value(&value).unwrap();
        let canonical = data.into_canonical();

        assert!(canonical.contains("Clinical Indication"));
        assert!(canonical.contains("seizure work-up"));
        assert!(canonical.contains("focal slowing"));
        // 空段不出现
        assert!(!canonical.contains("Technical Parameters"));
    }

    #[test]
    fn test_unrecognized_shape_rejected() {
        let value = json!([1, 2, 3]);
        assert!(ReportData::from_value(&value).is_err());
    }

    #[test]
    fn test_round_trip_canonical() {
        let data = ReportData::Content { content: "body".to_string() };
        let value = data.to_value().unwrap();
        assert_eq!(ReportData::from_value(&value).unwrap(), data);
    }
}
