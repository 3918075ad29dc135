//! 患者隐私字段防护
//!
//! 送往外部AI供应商的载荷必须先通过本检查：命中禁用字段名或出现
//! 具体数值年龄即硬性报错中止AI路径，绝不静默剥离后继续。
//! 调用方捕获错误后显式选择本地模板生成。

use meg_core::{MegError, Result};
use serde_json::Value;

/// 禁止出现在外发载荷中的字段名
const DENIED_FIELDS: &[&str] = &[
    "name",
    "first_name",
    "last_name",
    "full_name",
    "patient_name",
    "mrn",
    "medical_record_number",
    "ssn",
    "dob",
    "date_of_birth",
    "birth_date",
    "address",
    "phone",
    "email",
    "physician_name",
    "referring_physician",
    "facility_name",
    "hospital_name",
];

/// 允许的年龄分类值（唯一可外发的年龄表达）
const AGE_CATEGORIES: &[&str] = &["infant", "child", "adolescent", "adult", "elderly"];

/// 校验外发AI载荷不含PHI/PII
///
/// 递归遍历整个JSON结构；年龄字段只允许分类字符串，数值年龄视为违规。
pub fn ensure_phi_safe(payload: &Value) -> Result<()> {
    walk(payload, "$")
}

fn walk(value: &Value, path: &str) -> Result<()> {
    match value {
        Value::Object(map) => {
            for (key, child) in map {
                let key_lower = key.to_lowercase();
                let child_path = format!("{}.{}", path, key);

                if DENIED_FIELDS.contains(&key_lower.as_str()) {
                    return Err(MegError::PhiViolation(format!(
                        "禁用字段 {} 出现在外发载荷中",
                        child_path
                    )));
                }

                if is_age_field(&key_lower) {
                    check_age_value(child, &child_path)?;
                }

                walk(child, &child_path)?;
            }
            Ok(())
        }
        Value::Array(items) => {
            for (index, item) in items.iter().enumerate() {
                walk(item, &format!("{}[{}]", path, index))?;
            }
            Ok(())
        }
        _ => Ok(()),
    }
}

fn is_age_field(key_lower: &str) -> bool {
    key_lower == "age" || key_lower.ends_with("_age") || key_lower == "patient_age"
}

fn check_age_value(value: &Value, path: &str) -> Result<()> {
    match value {
        Value::Number(_) => Err(MegError::PhiViolation(format!(
            "字段 {} 含具体数值年龄，只允许年龄分类",
            path
        ))),
        Value::String(s) => {
            let lower = s.to_lowercase();
            if lower.chars().any(|c| c.is_ascii_digit()) {
                return Err(MegError::PhiViolation(format!(
                    "字段 {} 含数字年龄表达，只允许年龄分类",
                    path
                )));
            }
            if !AGE_CATEGORIES.contains(&lower.as_str()) {
                return Err(MegError::PhiViolation(format!(
                    "字段 {} 的年龄分类 {:?} 不在允许列表中",
                    path, s
                )));
            }
            Ok(())
        }
        Value::Null => Ok(()),
        _ => Err(MegError::PhiViolation(format!("字段 {} 的年龄表达类型无效", path))),
    }
}

/// 将数值年龄折算为允许外发的年龄分类
pub fn age_category(age_years: u32) -> &'static str {
    match age_years {
        0..=1 => "infant",
        2..=11 => "child",
        12..=17 => "adolescent",
        18..=64 => "adult",
        _ => "elderly",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_clean_payload_passes() {
        let payload = json!({
            "symptoms": "episodic tremor, left hand",
            "age": "adult",
            "gender": "female",
            "candidates": {"exams": ["MEG Resting State"]},
        });
        assert!(ensure_phi_safe(&payload).is_ok());
    }

    #[test]
    fn test_denied_field_rejected() {
        let payload = json!({"symptoms": "tremor", "patient_name": "J. Doe"});
        assert!(matches!(ensure_phi_safe(&payload), Err(MegError::PhiViolation(_))));
    }

    #[test]
    fn test_nested_denied_field_rejected() {
        let payload = json!({"context": {"contact": {"email": "x@example.org"}}});
        assert!(matches!(ensure_phi_safe(&payload), Err(MegError::PhiViolation(_))));
    }

    #[test]
    fn test_numeric_age_rejected() {
        let payload = json!({"age": 42});
        assert!(matches!(ensure_phi_safe(&payload), Err(MegError::PhiViolation(_))));

        let payload = json!({"age": "42 years"});
        assert!(matches!(ensure_phi_safe(&payload), Err(MegError::PhiViolation(_))));
    }

    #[test]
    fn test_age_category_accepted() {
        let payload = json!({"age": "elderly"});
        assert!(ensure_phi_safe(&payload).is_ok());
    }

    #[test]
    fn test_age_category_mapping() {
        assert_eq!(age_category(1), "infant");
        assert_eq!(age_category(9), "child");
        assert_eq!(age_category(15), "adolescent");
        assert_eq!(age_category(40), "adult");
        assert_eq!(age_category(78), "elderly");
    }
}
