//! 数据库行模型
//!
//! 枚举列以字符串落库，FromRow行模型经From转换还原为核心模型。
//! 非法的存量字符串按保守默认值处理，不让单行坏数据拖垮整个查询。

use chrono::{DateTime, NaiveDate, Utc};
use meg_core::models::*;
use sqlx::FromRow;
use uuid::Uuid;

/// 数据库病例表
#[derive(Debug, FromRow)]
pub struct DbCase {
    pub id: Uuid,
    pub hospital_id: Uuid,
    pub patient_id: Uuid,
    pub user_id: Uuid,
    pub current_user_id: Option<Uuid>,
    pub case_date: NaiveDate,
    pub department_id: Option<Uuid>,
    pub sedation_id: Option<Uuid>,
    pub priority: String,
    pub status: String,
    pub technician_status: String,
    pub scientist_status: String,
    pub doctor_status: String,
    pub symptoms: String,
    pub notes: Option<String>,
    pub current_version_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<DbCase> for Case {
    fn from(row: DbCase) -> Self {
        Case {
            id: row.id,
            hospital_id: row.hospital_id,
            patient_id: row.patient_id,
            user_id: row.user_id,
            current_user_id: row.current_user_id,
            case_date: row.case_date,
            department_id: row.department_id,
            sedation_id: row.sedation_id,
            priority: CasePriority::parse_or_default(&row.priority),
            status: CaseStatus::parse(&row.status).unwrap_or(CaseStatus::Draft),
            technician_status: RoleStatus::parse(&row.technician_status).unwrap_or(RoleStatus::Draft),
            scientist_status: RoleStatus::parse(&row.scientist_status).unwrap_or(RoleStatus::Draft),
            doctor_status: RoleStatus::parse(&row.doctor_status).unwrap_or(RoleStatus::Draft),
            symptoms: row.symptoms,
            notes: row.notes,
            current_version_id: row.current_version_id,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

/// 数据库病例版本表
#[derive(Debug, FromRow)]
pub struct DbCaseVersion {
    pub id: Uuid,
    pub case_id: Uuid,
    pub version_number: i32,
    pub user_id: Uuid,
    pub created_at: DateTime<Utc>,
}

impl From<DbCaseVersion> for CaseVersion {
    fn from(row: DbCaseVersion) -> Self {
        CaseVersion {
            id: row.id,
            case_id: row.case_id,
            version_number: row.version_number,
            user_id: row.user_id,
            created_at: row.created_at,
        }
    }
}

/// 数据库审计表
#[derive(Debug, FromRow)]
pub struct DbCaseAudit {
    pub id: Uuid,
    pub case_id: Uuid,
    pub version_id: Option<Uuid>,
    pub field_name: String,
    pub old_value: String,
    pub new_value: String,
    pub changed_by: Uuid,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<DbCaseAudit> for CaseAudit {
    fn from(row: DbCaseAudit) -> Self {
        CaseAudit {
            id: row.id,
            case_id: row.case_id,
            version_id: row.version_id,
            field_name: row.field_name,
            old_value: row.old_value,
            new_value: row.new_value,
            changed_by: row.changed_by,
            notes: row.notes,
            created_at: row.created_at,
        }
    }
}

/// 数据库交接表
#[derive(Debug, FromRow)]
pub struct DbCaseAssignment {
    pub id: Uuid,
    pub case_id: Uuid,
    pub case_version_id: Option<Uuid>,
    pub assigned_by: Uuid,
    pub assigned_to: Uuid,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<DbCaseAssignment> for CaseAssignment {
    fn from(row: DbCaseAssignment) -> Self {
        CaseAssignment {
            id: row.id,
            case_id: row.case_id,
            case_version_id: row.case_version_id,
            assigned_by: row.assigned_by,
            assigned_to: row.assigned_to,
            notes: row.notes,
            created_at: row.created_at,
        }
    }
}

/// 数据库病例检查项表
#[derive(Debug, FromRow)]
pub struct DbCaseProcedure {
    pub id: Uuid,
    pub case_id: Uuid,
    pub exams_procedure_id: Uuid,
    pub status: String,
    pub scheduled_at: Option<DateTime<Utc>>,
    pub notes: Option<String>,
}

impl From<DbCaseProcedure> for CaseProcedure {
    fn from(row: DbCaseProcedure) -> Self {
        CaseProcedure {
            id: row.id,
            case_id: row.case_id,
            exams_procedure_id: row.exams_procedure_id,
            status: match row.status.as_str() {
                "completed" => ProcedureStatus::Completed,
                _ => ProcedureStatus::Pending,
            },
            scheduled_at: row.scheduled_at,
            notes: row.notes,
        }
    }
}

/// 数据库文档表
#[derive(Debug, FromRow)]
pub struct DbDocument {
    pub id: Uuid,
    pub case_id: Uuid,
    pub user_id: Uuid,
    pub case_procedure_id: Option<Uuid>,
    pub document_type: String,
    pub file_path: String,
    pub file_type: String,
    pub file_size: i64,
    pub original_filename: String,
    pub description: Option<String>,
    pub uploaded_at: DateTime<Utc>,
}

impl From<DbDocument> for Document {
    fn from(row: DbDocument) -> Self {
        Document {
            id: row.id,
            case_id: row.case_id,
            user_id: row.user_id,
            case_procedure_id: row.case_procedure_id,
            document_type: parse_document_type(&row.document_type),
            file_path: row.file_path,
            file_type: row.file_type,
            file_size: row.file_size,
            original_filename: row.original_filename,
            description: row.description,
            uploaded_at: row.uploaded_at,
        }
    }
}

fn parse_document_type(value: &str) -> DocumentType {
    match value {
        "report" => DocumentType::Report,
        "image" => DocumentType::Image,
        "dicom" => DocumentType::Dicom,
        "consent" => DocumentType::Consent,
        "lab_result" => DocumentType::LabResult,
        "prescription" => DocumentType::Prescription,
        "referral" => DocumentType::Referral,
        "pathology" => DocumentType::Pathology,
        "radiology" => DocumentType::Radiology,
        "discharge_summary" => DocumentType::DischargeSummary,
        _ => DocumentType::Other,
    }
}

/// 数据库报告表
#[derive(Debug, FromRow)]
pub struct DbReport {
    pub id: Uuid,
    pub case_id: Uuid,
    pub hospital_id: Uuid,
    pub user_id: Uuid,
    pub status: String,
    pub report_type: String,
    pub report_data: serde_json::Value,
    pub confidence_score: Option<f64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<DbReport> for Report {
    fn from(row: DbReport) -> Self {
        Report {
            id: row.id,
            case_id: row.case_id,
            hospital_id: row.hospital_id,
            user_id: row.user_id,
            status: row.status,
            report_type: row.report_type,
            report_data: row.report_data,
            confidence_score: row.confidence_score,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

/// 数据库服务台账表
#[derive(Debug, FromRow)]
pub struct DbServiceUsageLog {
    pub id: Uuid,
    pub hospital_id: Uuid,
    pub service_type: String,
    pub provider: String,
    pub action: String,
    pub user_id: Option<Uuid>,
    pub related_id: Option<Uuid>,
    pub request_payload: Option<serde_json::Value>,
    pub response_payload: Option<serde_json::Value>,
    pub status: String,
    pub response_time_ms: Option<i64>,
    pub error_code: Option<String>,
    pub error_message: Option<String>,
    pub units_consumed: Option<i64>,
    pub unit_cost: Option<f64>,
    pub total_cost_usd: Option<f64>,
    pub metadata: Option<serde_json::Value>,
    pub created_at: DateTime<Utc>,
}

impl From<DbServiceUsageLog> for ServiceUsageLog {
    fn from(row: DbServiceUsageLog) -> Self {
        ServiceUsageLog {
            id: row.id,
            hospital_id: row.hospital_id,
            service_type: row.service_type,
            provider: row.provider,
            action: row.action,
            user_id: row.user_id,
            related_id: row.related_id,
            request_payload: row.request_payload,
            response_payload: row.response_payload,
            status: match row.status.as_str() {
                "success" => UsageStatus::Success,
                "failed" => UsageStatus::Failed,
                "timeout" => UsageStatus::Timeout,
                "cancelled" => UsageStatus::Cancelled,
                _ => UsageStatus::Pending,
            },
            response_time_ms: row.response_time_ms,
            error_code: row.error_code,
            error_message: row.error_message,
            units_consumed: row.units_consumed,
            unit_cost: row.unit_cost,
            total_cost_usd: row.total_cost_usd,
            metadata: row.metadata,
            created_at: row.created_at,
        }
    }
}

/// 数据库患者表
#[derive(Debug, FromRow)]
pub struct DbPatient {
    pub id: Uuid,
    pub user_id: Uuid,
    pub record_number: i64,
    pub medical_record_number: String,
    pub date_of_birth: Option<NaiveDate>,
    pub gender: Option<String>,
    pub address: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub medical_history: Option<String>,
    pub medications: Option<String>,
    pub emergency_contact_name: Option<String>,
    pub emergency_contact_phone: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<DbPatient> for Patient {
    fn from(row: DbPatient) -> Self {
        Patient {
            id: row.id,
            user_id: row.user_id,
            record_number: row.record_number,
            medical_record_number: row.medical_record_number,
            date_of_birth: row.date_of_birth,
            gender: row.gender,
            address: row.address,
            phone: row.phone,
            email: row.email,
            medical_history: row.medical_history,
            medications: row.medications,
            emergency_contact_name: row.emergency_contact_name,
            emergency_contact_phone: row.emergency_contact_phone,
            created_at: row.created_at,
        }
    }
}

/// 数据库用户表
#[derive(Debug, FromRow)]
pub struct DbUser {
    pub id: Uuid,
    pub hospital_id: Uuid,
    pub username: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub role: String,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

impl From<DbUser> for User {
    fn from(row: DbUser) -> Self {
        User {
            id: row.id,
            hospital_id: row.hospital_id,
            username: row.username,
            email: row.email,
            first_name: row.first_name,
            last_name: row.last_name,
            role: match row.role.as_str() {
                "super" => UserRole::Super,
                "administrator" => UserRole::Administrator,
                "doctor" => UserRole::Doctor,
                "nurse" => UserRole::Nurse,
                "technician" => UserRole::Technician,
                "scientist" => UserRole::Scientist,
                _ => UserRole::Patient,
            },
            is_active: row.is_active,
            created_at: row.created_at,
        }
    }
}

/// 数据库医院AI设置表
#[derive(Debug, FromRow)]
pub struct DbHospitalAiSettings {
    pub hospital_id: Uuid,
    pub preferred_provider: String,
    pub enabled_providers: Vec<String>,
    pub monthly_budget_usd: f64,
}

impl From<DbHospitalAiSettings> for HospitalAiSettings {
    fn from(row: DbHospitalAiSettings) -> Self {
        HospitalAiSettings {
            hospital_id: row.hospital_id,
            preferred_provider: row.preferred_provider,
            enabled_providers: row.enabled_providers,
            monthly_budget_usd: row.monthly_budget_usd,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_status_strings_fall_back() {
        let row = DbCaseProcedure {
            id: Uuid::new_v4(),
            case_id: Uuid::new_v4(),
            exams_procedure_id: Uuid::new_v4(),
            status: "garbled".to_string(),
            scheduled_at: None,
            notes: None,
        };
        let procedure: CaseProcedure = row.into();
        assert_eq!(procedure.status, ProcedureStatus::Pending);
    }

    #[test]
    fn test_document_type_round_trip() {
        for document_type in [
            DocumentType::Report,
            DocumentType::LabResult,
            DocumentType::DischargeSummary,
            DocumentType::Other,
        ] {
            assert_eq!(parse_document_type(document_type.as_str()), document_type);
        }
    }
}
