//! 患者脱敏服务
//!
//! 纯函数式脱敏：同一(对象, 查看者, 开关)输入恒产生同一输出。
//! 全局开关关闭时整体旁路返回原值（break-glass），但访问照常记录。

use chrono::{DateTime, Datelike, NaiveDate, Utc};
use meg_core::{Patient, User, UserRole};
use uuid::Uuid;

use crate::rules::{MaskRule, MaskingPolicy, PatientField};

/// 进程级脱敏配置
#[derive(Debug, Clone)]
pub struct MaskingConfig {
    /// 全局启用标志，默认启用；关闭即旁路全部脱敏
    pub enabled: bool,
}

impl Default for MaskingConfig {
    fn default() -> Self {
        Self { enabled: true }
    }
}

/// 访问记录
#[derive(Debug, Clone)]
pub struct MaskAccess {
    pub viewer_id: Uuid,
    pub viewer_role: UserRole,
    pub subject_patient_id: Uuid,
    pub masked: bool,
    pub accessed_at: DateTime<Utc>,
}

/// 访问日志接收器
pub trait AccessLogSink: Send + Sync {
    fn record(&self, access: &MaskAccess);
}

/// 默认接收器：写tracing日志
pub struct TracingAccessLog;

impl AccessLogSink for TracingAccessLog {
    fn record(&self, access: &MaskAccess) {
        tracing::info!(
            viewer_id = %access.viewer_id,
            viewer_role = access.viewer_role.as_str(),
            subject_patient_id = %access.subject_patient_id,
            masked = access.masked,
            "Patient record accessed"
        );
    }
}

/// 脱敏后的患者视图（全部为展示字符串）
#[derive(Debug, Clone, PartialEq)]
pub struct MaskedPatient {
    pub first_name: String,
    pub last_name: String,
    pub date_of_birth: String,
    pub medical_record_number: String,
    pub gender: String,
    pub address: String,
    pub phone: String,
    pub email: String,
    pub medical_history: String,
    pub medications: String,
    pub emergency_contact_name: String,
    pub emergency_contact_phone: String,
}

/// 患者脱敏服务
pub struct PatientMaskingService {
    policy: MaskingPolicy,
    config: MaskingConfig,
    access_log: Box<dyn AccessLogSink>,
}

impl PatientMaskingService {
    pub fn new(config: MaskingConfig, access_log: Box<dyn AccessLogSink>) -> Self {
        Self { policy: MaskingPolicy::new(), config, access_log }
    }

    pub fn with_defaults() -> Self {
        Self::new(MaskingConfig::default(), Box::new(TracingAccessLog))
    }

    /// 为查看者产出患者视图
    pub fn mask_for_user(&self, subject: &Patient, subject_user: &User, viewer: &User) -> MaskedPatient {
        let masked = self.config.enabled;
        self.access_log.record(&MaskAccess {
            viewer_id: viewer.id,
            viewer_role: viewer.role,
            subject_patient_id: subject.id,
            masked,
            accessed_at: Utc::now(),
        });

        if !masked {
            return raw_view(subject, subject_user);
        }

        let role = viewer.role;
        MaskedPatient {
            first_name: self.apply(role, PatientField::FirstName, &subject_user.first_name, subject),
            last_name: self.apply(role, PatientField::LastName, &subject_user.last_name, subject),
            date_of_birth: self.apply_date(role, subject),
            medical_record_number: self.apply(
                role,
                PatientField::MedicalRecordNumber,
                &subject.medical_record_number,
                subject,
            ),
            gender: self.apply_opt(role, PatientField::Gender, subject.gender.as_deref(), subject),
            address: self.apply_opt(role, PatientField::Address, subject.address.as_deref(), subject),
            phone: self.apply_opt(role, PatientField::Phone, subject.phone.as_deref(), subject),
            email: self.apply_opt(role, PatientField::Email, subject.email.as_deref(), subject),
            medical_history: self.apply_opt(
                role,
                PatientField::MedicalHistory,
                subject.medical_history.as_deref(),
                subject,
            ),
            medications: self.apply_opt(
                role,
                PatientField::Medications,
                subject.medications.as_deref(),
                subject,
            ),
            emergency_contact_name: self.apply_opt(
                role,
                PatientField::EmergencyContactName,
                subject.emergency_contact_name.as_deref(),
                subject,
            ),
            emergency_contact_phone: self.apply_opt(
                role,
                PatientField::EmergencyContactPhone,
                subject.emergency_contact_phone.as_deref(),
                subject,
            ),
        }
    }

    fn apply(&self, role: UserRole, field: PatientField, value: &str, subject: &Patient) -> String {
        apply_rule(self.policy.rule(role, field), value, subject)
    }

    fn apply_opt(
        &self,
        role: UserRole,
        field: PatientField,
        value: Option<&str>,
        subject: &Patient,
    ) -> String {
        value
            .map(|v| self.apply(role, field, v, subject))
            .unwrap_or_default()
    }

    fn apply_date(&self, role: UserRole, subject: &Patient) -> String {
        let Some(dob) = subject.date_of_birth else {
            return String::new();
        };
        match self.policy.rule(role, PatientField::DateOfBirth) {
            MaskRule::None => dob.to_string(),
            MaskRule::YearOnly => dob.year().to_string(),
            MaskRule::AgeOnly => age_years(dob).to_string(),
            MaskRule::AgeGroup => age_group(age_years(dob)).to_string(),
            rule => apply_rule(rule, &dob.to_string(), subject),
        }
    }
}

fn raw_view(subject: &Patient, subject_user: &User) -> MaskedPatient {
    MaskedPatient {
        first_name: subject_user.first_name.clone(),
        last_name: subject_user.last_name.clone(),
        date_of_birth: subject.date_of_birth.map(|d| d.to_string()).unwrap_or_default(),
        medical_record_number: subject.medical_record_number.clone(),
        gender: subject.gender.clone().unwrap_or_default(),
        address: subject.address.clone().unwrap_or_default(),
        phone: subject.phone.clone().unwrap_or_default(),
        email: subject.email.clone().unwrap_or_default(),
        medical_history: subject.medical_history.clone().unwrap_or_default(),
        medications: subject.medications.clone().unwrap_or_default(),
        emergency_contact_name: subject.emergency_contact_name.clone().unwrap_or_default(),
        emergency_contact_phone: subject.emergency_contact_phone.clone().unwrap_or_default(),
    }
}

fn apply_rule(rule: MaskRule, value: &str, subject: &Patient) -> String {
    if value.is_empty() {
        return String::new();
    }
    match rule {
        MaskRule::None => value.to_string(),
        MaskRule::Full => "***".to_string(),
        MaskRule::Hidden => String::new(),
        MaskRule::Partial => {
            let head: String = value.chars().take(2).collect();
            format!("{}***", head)
        }
        MaskRule::Last4 => {
            let digits: Vec<char> = value.chars().filter(|c| c.is_ascii_digit()).collect();
            let tail: String = digits.iter().rev().take(4).rev().collect();
            format!("****{}", tail)
        }
        // 确定性代号源自内部记录序号，而非真实值的散列
        MaskRule::Sequential => format!("MRN-{:03}", subject.record_number),
        MaskRule::PatientId => subject.id.to_string(),
        MaskRule::DomainOnly => match value.find('@') {
            Some(pos) => value[pos..].to_string(),
            None => "***".to_string(),
        },
        MaskRule::FirstAndInitial => {
            let mut words = value.split_whitespace();
            match (words.next(), words.next()) {
                (Some(first), Some(second)) => {
                    format!("{} {}.", first, initial(second))
                }
                (Some(first), None) => first.to_string(),
                _ => String::new(),
            }
        }
        MaskRule::InitialOnly => format!("{}.", initial(value)),
        MaskRule::YearOnly | MaskRule::AgeOnly | MaskRule::AgeGroup => {
            // 日期语义规则落在非日期字段上时按完全遮蔽处理
            "***".to_string()
        }
    }
}

fn initial(value: &str) -> String {
    value.chars().next().map(|c| c.to_uppercase().to_string()).unwrap_or_default()
}

fn age_years(dob: NaiveDate) -> u32 {
    let today = Utc::now().date_naive();
    let mut age = today.year() - dob.year();
    if (today.month(), today.day()) < (dob.month(), dob.day()) {
        age -= 1;
    }
    age.max(0) as u32
}

fn age_group(age: u32) -> &'static str {
    match age {
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
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    struct CountingSink(Arc<AtomicUsize>);

    impl AccessLogSink for CountingSink {
        fn record(&self, _access: &MaskAccess) {
            self.0.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn subject() -> (Patient, User) {
        let user_id = Uuid::new_v4();
        let user = User {
            id: user_id,
            hospital_id: Uuid::new_v4(),
            username: "pdoe".to_string(),
            email: "pdoe@example.org".to_string(),
            first_name: "Paulina".to_string(),
            last_name: "Doe".to_string(),
            role: UserRole::Patient,
            is_active: true,
            created_at: Utc::now(),
        };
        let patient = Patient {
            id: Uuid::new_v4(),
            user_id,
            record_number: 42,
            medical_record_number: "HX-2291-A".to_string(),
            date_of_birth: NaiveDate::from_ymd_opt(1984, 6, 30),
            gender: Some("female".to_string()),
            address: Some("12 Birch Lane".to_string()),
            phone: Some("+1 555 0119 7788".to_string()),
            email: Some("paulina@example.org".to_string()),
            medical_history: Some("migraine with aura".to_string()),
            medications: Some("sumatriptan".to_string()),
            emergency_contact_name: Some("R. Doe".to_string()),
            emergency_contact_phone: Some("+1 555 0119 0000".to_string()),
            created_at: Utc::now(),
        };
        (patient, user)
    }

    fn viewer(role: UserRole) -> User {
        User {
            id: Uuid::new_v4(),
            hospital_id: Uuid::new_v4(),
            username: "viewer".to_string(),
            email: "viewer@example.org".to_string(),
            first_name: "V".to_string(),
            last_name: "W".to_string(),
            role,
            is_active: true,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_doctor_sees_raw_values() {
        let service = PatientMaskingService::with_defaults();
        let (patient, user) = subject();

        let view = service.mask_for_user(&patient, &user, &viewer(UserRole::Doctor));
        assert_eq!(view.first_name, "Paulina");
        assert_eq!(view.medical_record_number, "HX-2291-A");
        assert_eq!(view.phone, "+1 555 0119 7788");
    }

    #[test]
    fn test_scientist_sees_deidentified_view() {
        let service = PatientMaskingService::with_defaults();
        let (patient, user) = subject();

        let view = service.mask_for_user(&patient, &user, &viewer(UserRole::Scientist));
        assert_eq!(view.first_name, "***");
        assert_eq!(view.medical_record_number, "MRN-042");
        assert_eq!(view.date_of_birth, "adult");
        assert_eq!(view.address, "");
        // 临床内容保留
        assert_eq!(view.medical_history, "migraine with aura");
    }

    #[test]
    fn test_technician_partial_identity() {
        let service = PatientMaskingService::with_defaults();
        let (patient, user) = subject();

        let view = service.mask_for_user(&patient, &user, &viewer(UserRole::Technician));
        assert_eq!(view.last_name, "D.");
        assert_eq!(view.date_of_birth, "1984");
        assert_eq!(view.phone, "****7788");
        assert_eq!(view.email, "@example.org");
    }

    #[test]
    fn test_masking_is_idempotent() {
        let service = PatientMaskingService::with_defaults();
        let (patient, user) = subject();
        let nurse = viewer(UserRole::Nurse);

        let first = service.mask_for_user(&patient, &user, &nurse);
        let second = service.mask_for_user(&patient, &user, &nurse);
        assert_eq!(first, second);
    }

    #[test]
    fn test_disabled_flag_bypasses_all_masking() {
        let service = PatientMaskingService::new(
            MaskingConfig { enabled: false },
            Box::new(TracingAccessLog),
        );
        let (patient, user) = subject();

        for role in [
            UserRole::Super,
            UserRole::Administrator,
            UserRole::Doctor,
            UserRole::Nurse,
            UserRole::Technician,
            UserRole::Scientist,
            UserRole::Patient,
        ] {
            let view = service.mask_for_user(&patient, &user, &viewer(role));
            assert_eq!(view.first_name, "Paulina");
            assert_eq!(view.medical_record_number, "HX-2291-A");
            assert_eq!(view.date_of_birth, "1984-06-30");
            assert_eq!(view.address, "12 Birch Lane");
        }
    }

    #[test]
    fn test_every_access_is_logged_even_when_bypassed() {
        let counter = Arc::new(AtomicUsize::new(0));
        let service = PatientMaskingService::new(
            MaskingConfig { enabled: false },
            Box::new(CountingSink(counter.clone())),
        );
        let (patient, user) = subject();

        service.mask_for_user(&patient, &user, &viewer(UserRole::Doctor));
        service.mask_for_user(&patient, &user, &viewer(UserRole::Scientist));
        assert_eq!(counter.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_sequential_surrogate_is_stable() {
        let service = PatientMaskingService::with_defaults();
        let (patient, user) = subject();
        let scientist = viewer(UserRole::Scientist);

        let a = service.mask_for_user(&patient, &user, &scientist);
        let b = service.mask_for_user(&patient, &user, &scientist);
        assert_eq!(a.medical_record_number, "MRN-042");
        assert_eq!(a.medical_record_number, b.medical_record_number);
    }
}
