//! 脱敏规则表
//!
//! (角色 × 字段) → 规则 的静态映射，构建一次后只读。

use meg_core::UserRole;
use std::collections::HashMap;

/// 患者字段
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PatientField {
    FirstName,
    LastName,
    DateOfBirth,
    MedicalRecordNumber,
    Gender,
    Address,
    Phone,
    Email,
    MedicalHistory,
    Medications,
    EmergencyContactName,
    EmergencyContactPhone,
}

/// 脱敏规则
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MaskRule {
    /// 完全遮蔽
    Full,
    /// 仅年份（日期字段）
    YearOnly,
    /// 仅年龄数值
    AgeOnly,
    /// 年龄分组
    AgeGroup,
    /// 部分遮蔽（保留开头）
    Partial,
    /// 仅末4位
    Last4,
    /// 确定性顺序代号（MRN-###）
    Sequential,
    /// 以内部患者id替代
    PatientId,
    /// 完全隐藏（空值）
    Hidden,
    /// 仅邮箱域名
    DomainOnly,
    /// 名全称+姓首字母
    FirstAndInitial,
    /// 仅首字母
    InitialOnly,
    /// 不脱敏
    None,
}

/// 不可变规则表
#[derive(Debug)]
pub struct MaskingPolicy {
    rules: HashMap<(UserRole, PatientField), MaskRule>,
}

impl MaskingPolicy {
    /// 构建静态规则表
    pub fn new() -> Self {
        use MaskRule::*;
        use PatientField::*;
        use UserRole::*;

        let mut rules = HashMap::new();

        // 完全访问角色
        for role in [Super, Administrator, Doctor] {
            for field in ALL_FIELDS {
                rules.insert((role, *field), None);
            }
        }

        // 护士：联系方式部分遮蔽，标识字段保留
        for field in ALL_FIELDS {
            rules.insert((Nurse, *field), None);
        }
        rules.insert((Nurse, Address), Partial);
        rules.insert((Nurse, Phone), Last4);
        rules.insert((Nurse, Email), DomainOnly);
        rules.insert((Nurse, EmergencyContactPhone), Last4);

        // 技师：身份弱化，病史保留
        for field in ALL_FIELDS {
            rules.insert((Technician, *field), None);
        }
        rules.insert((Technician, FirstName), FirstAndInitial);
        rules.insert((Technician, LastName), InitialOnly);
        rules.insert((Technician, DateOfBirth), YearOnly);
        rules.insert((Technician, Address), Hidden);
        rules.insert((Technician, Phone), Last4);
        rules.insert((Technician, Email), DomainOnly);
        rules.insert((Technician, EmergencyContactName), Hidden);
        rules.insert((Technician, EmergencyContactPhone), Hidden);

        // 科学家：全面去标识化，代号化的MRN
        for field in ALL_FIELDS {
            rules.insert((Scientist, *field), Hidden);
        }
        rules.insert((Scientist, FirstName), Full);
        rules.insert((Scientist, LastName), Full);
        rules.insert((Scientist, DateOfBirth), AgeGroup);
        rules.insert((Scientist, MedicalRecordNumber), Sequential);
        rules.insert((Scientist, Gender), None);
        rules.insert((Scientist, MedicalHistory), None);
        rules.insert((Scientist, Medications), None);

        // 患者：查看本人数据不脱敏
        for field in ALL_FIELDS {
            rules.insert((UserRole::Patient, *field), None);
        }

        Self { rules }
    }

    /// 查询规则；未登记的组合按完全遮蔽处理
    pub fn rule(&self, role: UserRole, field: PatientField) -> MaskRule {
        self.rules.get(&(role, field)).copied().unwrap_or(MaskRule::Full)
    }
}

impl Default for MaskingPolicy {
    fn default() -> Self {
        Self::new()
    }
}

const ALL_FIELDS: &[PatientField] = &[
    PatientField::FirstName,
    PatientField::LastName,
    PatientField::DateOfBirth,
    PatientField::MedicalRecordNumber,
    PatientField::Gender,
    PatientField::Address,
    PatientField::Phone,
    PatientField::Email,
    PatientField::MedicalHistory,
    PatientField::Medications,
    PatientField::EmergencyContactName,
    PatientField::EmergencyContactPhone,
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_doctor_sees_everything() {
        let policy = MaskingPolicy::new();
        for field in ALL_FIELDS {
            assert_eq!(policy.rule(UserRole::Doctor, *field), MaskRule::None);
        }
    }

    #[test]
    fn test_scientist_gets_sequential_mrn() {
        let policy = MaskingPolicy::new();
        assert_eq!(
            policy.rule(UserRole::Scientist, PatientField::MedicalRecordNumber),
            MaskRule::Sequential
        );
        assert_eq!(policy.rule(UserRole::Scientist, PatientField::FirstName), MaskRule::Full);
        assert_eq!(policy.rule(UserRole::Scientist, PatientField::MedicalHistory), MaskRule::None);
    }

    #[test]
    fn test_technician_contact_hidden() {
        let policy = MaskingPolicy::new();
        assert_eq!(policy.rule(UserRole::Technician, PatientField::Address), MaskRule::Hidden);
        assert_eq!(policy.rule(UserRole::Technician, PatientField::Phone), MaskRule::Last4);
    }
}
