//! 核心数据模型定义

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// 病例优先级
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum CasePriority {
    Low,    // 低
    Medium, // 中
    High,   // 高
    Urgent, // 紧急
}

impl CasePriority {
    pub fn as_str(&self) -> &'static str {
        match self {
            CasePriority::Low => "low",
            CasePriority::Medium => "medium",
            CasePriority::High => "high",
            CasePriority::Urgent => "urgent",
        }
    }

    /// 解析优先级字符串，非法值回退到Medium
    pub fn parse_or_default(value: &str) -> Self {
        match value {
            "low" => CasePriority::Low,
            "medium" => CasePriority::Medium,
            "high" => CasePriority::High,
            "urgent" => CasePriority::Urgent,
            _ => CasePriority::Medium,
        }
    }
}

/// 病例全局状态
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum CaseStatus {
    Draft,      // 草稿
    InProgress, // 进行中
    Completed,  // 已完成
    Cancelled,  // 已取消（终态）
}

impl CaseStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CaseStatus::Draft => "draft",
            CaseStatus::InProgress => "in_progress",
            CaseStatus::Completed => "completed",
            CaseStatus::Cancelled => "cancelled",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "draft" => Some(CaseStatus::Draft),
            "in_progress" => Some(CaseStatus::InProgress),
            "completed" => Some(CaseStatus::Completed),
            "cancelled" => Some(CaseStatus::Cancelled),
            _ => None,
        }
    }
}

/// 角色子状态（技师/科学家/医生各自独立跟踪）
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum RoleStatus {
    Draft,      // 草稿
    InProgress, // 进行中
    Assigned,   // 已分配
    Completed,  // 已完成
}

impl RoleStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RoleStatus::Draft => "draft",
            RoleStatus::InProgress => "in_progress",
            RoleStatus::Assigned => "assigned",
            RoleStatus::Completed => "completed",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "draft" => Some(RoleStatus::Draft),
            "in_progress" => Some(RoleStatus::InProgress),
            "assigned" => Some(RoleStatus::Assigned),
            "completed" => Some(RoleStatus::Completed),
            _ => None,
        }
    }

    /// 状态在前向路径中的序号，用于单调性检查
    pub fn rank(&self) -> u8 {
        match self {
            RoleStatus::Draft => 0,
            RoleStatus::InProgress => 1,
            RoleStatus::Assigned => 2,
            RoleStatus::Completed => 3,
        }
    }
}

/// 工作流角色（对应病例上的三个状态列）
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum WorkflowRole {
    Technician,
    Scientist,
    Doctor,
}

impl WorkflowRole {
    /// 角色对应的病例状态列名（审计记录中使用）
    pub fn column_name(&self) -> &'static str {
        match self {
            WorkflowRole::Technician => "technician_status",
            WorkflowRole::Scientist => "scientist_status",
            WorkflowRole::Doctor => "doctor_status",
        }
    }

    /// 从用户角色映射到工作流角色，非工作流角色返回None
    pub fn from_user_role(role: &UserRole) -> Option<Self> {
        match role {
            UserRole::Technician => Some(WorkflowRole::Technician),
            UserRole::Scientist => Some(WorkflowRole::Scientist),
            UserRole::Doctor => Some(WorkflowRole::Doctor),
            _ => None,
        }
    }
}

/// 病例：系统的中心实体
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Case {
    pub id: Uuid,
    pub hospital_id: Uuid,
    pub patient_id: Uuid,
    pub user_id: Uuid,                      // 创建者
    pub current_user_id: Option<Uuid>,      // 当前负责人
    pub case_date: NaiveDate,
    pub department_id: Option<Uuid>,
    pub sedation_id: Option<Uuid>,          // 镇静方案，None表示无镇静
    pub priority: CasePriority,
    pub status: CaseStatus,
    pub technician_status: RoleStatus,
    pub scientist_status: RoleStatus,
    pub doctor_status: RoleStatus,
    pub symptoms: String,
    pub notes: Option<String>,
    pub current_version_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Case {
    /// 读取指定角色的子状态
    pub fn role_status(&self, role: WorkflowRole) -> RoleStatus {
        match role {
            WorkflowRole::Technician => self.technician_status,
            WorkflowRole::Scientist => self.scientist_status,
            WorkflowRole::Doctor => self.doctor_status,
        }
    }

    /// 写入指定角色的子状态
    pub fn set_role_status(&mut self, role: WorkflowRole, status: RoleStatus) {
        match role {
            WorkflowRole::Technician => self.technician_status = status,
            WorkflowRole::Scientist => self.scientist_status = status,
            WorkflowRole::Doctor => self.doctor_status = status,
        }
    }
}

/// 病例版本：追加式快照标记，version_number在单个病例内严格递增
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CaseVersion {
    pub id: Uuid,
    pub case_id: Uuid,
    pub version_number: i32,
    pub user_id: Uuid,
    pub created_at: DateTime<Utc>,
}

/// 病例审计记录：不可变日志行，每次跟踪字段变更/状态转换写入一条
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CaseAudit {
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

/// 病例交接记录：追加式，最新一条定义当前分配
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CaseAssignment {
    pub id: Uuid,
    pub case_id: Uuid,
    pub case_version_id: Option<Uuid>,
    pub assigned_by: Uuid,
    pub assigned_to: Uuid,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// 病例检查项状态
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ProcedureStatus {
    Pending,   // 待执行
    Completed, // 已完成
}

impl ProcedureStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProcedureStatus::Pending => "pending",
            ProcedureStatus::Completed => "completed",
        }
    }
}

/// 病例与检查项目目录的关联
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CaseProcedure {
    pub id: Uuid,
    pub case_id: Uuid,
    pub exams_procedure_id: Uuid,
    pub status: ProcedureStatus,
    pub scheduled_at: Option<DateTime<Utc>>,
    pub notes: Option<String>,
}

/// 检查项目目录条目
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExamsProcedure {
    pub id: Uuid,
    pub exam_name: String,
    pub modality: Option<String>,
    pub procedure_name: String,
    pub description: Option<String>,
}

impl ExamsProcedure {
    /// 报告中的展示名称: "{Exam} / {Modality} / {Procedure}"
    pub fn display_name(&self) -> String {
        match &self.modality {
            Some(modality) => format!("{} / {} / {}", self.exam_name, modality, self.procedure_name),
            None => format!("{} / {}", self.exam_name, self.procedure_name),
        }
    }
}

/// 文档类型分类桶
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum DocumentType {
    Report,
    Image,
    Dicom,
    Consent,
    LabResult,
    Prescription,
    Referral,
    Pathology,
    Radiology,
    DischargeSummary,
    Other,
}

impl DocumentType {
    pub fn as_str(&self) -> &'static str {
        match self {
            DocumentType::Report => "report",
            DocumentType::Image => "image",
            DocumentType::Dicom => "dicom",
            DocumentType::Consent => "consent",
            DocumentType::LabResult => "lab_result",
            DocumentType::Prescription => "prescription",
            DocumentType::Referral => "referral",
            DocumentType::Pathology => "pathology",
            DocumentType::Radiology => "radiology",
            DocumentType::DischargeSummary => "discharge_summary",
            DocumentType::Other => "other",
        }
    }
}

/// 报告内嵌图像允许的MIME类型
pub const IMAGE_MIME_ALLOWLIST: &[&str] = &[
    "image/jpeg",
    "image/png",
    "image/gif",
    "image/tiff",
    "image/bmp",
];

/// 上传的文档制品，创建后除检查项关联外不可变
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    pub id: Uuid,
    pub case_id: Uuid,
    pub user_id: Uuid,
    pub case_procedure_id: Option<Uuid>,
    pub document_type: DocumentType,
    pub file_path: String,
    pub file_type: String, // MIME类型
    pub file_size: i64,
    pub original_filename: String,
    pub description: Option<String>,
    pub uploaded_at: DateTime<Utc>,
}

impl Document {
    /// 是否为可内嵌到报告的图像类型
    pub fn is_image(&self) -> bool {
        IMAGE_MIME_ALLOWLIST.contains(&self.file_type.as_str())
    }
}

/// 报告
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Report {
    pub id: Uuid,
    pub case_id: Uuid,
    pub hospital_id: Uuid,
    pub user_id: Uuid,
    pub status: String,
    pub report_type: String,
    pub report_data: serde_json::Value, // 规范形态 {content} 或遗留多段形态
    pub confidence_score: Option<f64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// 外部服务调用状态
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum UsageStatus {
    Pending,
    Success,
    Failed,
    Timeout,
    Cancelled,
}

impl UsageStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            UsageStatus::Pending => "pending",
            UsageStatus::Success => "success",
            UsageStatus::Failed => "failed",
            UsageStatus::Timeout => "timeout",
            UsageStatus::Cancelled => "cancelled",
        }
    }
}

/// 外部服务调用审计/成本台账，追加式
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceUsageLog {
    pub id: Uuid,
    pub hospital_id: Uuid,
    pub service_type: String, // 如 "ai", "ocr", "export"
    pub provider: String,
    pub action: String,
    pub user_id: Option<Uuid>,
    pub related_id: Option<Uuid>,
    pub request_payload: Option<serde_json::Value>,
    pub response_payload: Option<serde_json::Value>,
    pub status: UsageStatus,
    pub response_time_ms: Option<i64>,
    pub error_code: Option<String>,
    pub error_message: Option<String>,
    pub units_consumed: Option<i64>,
    pub unit_cost: Option<f64>,
    pub total_cost_usd: Option<f64>,
    pub metadata: Option<serde_json::Value>,
    pub created_at: DateTime<Utc>,
}

/// 用户角色
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    Super,         // 超级管理员
    Administrator, // 医院管理员
    Doctor,        // 医生
    Nurse,         // 护士
    Technician,    // 技师
    Scientist,     // 科学家
    Patient,       // 患者
}

impl UserRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            UserRole::Super => "super",
            UserRole::Administrator => "administrator",
            UserRole::Doctor => "doctor",
            UserRole::Nurse => "nurse",
            UserRole::Technician => "technician",
            UserRole::Scientist => "scientist",
            UserRole::Patient => "patient",
        }
    }
}

/// 用户信息
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub hospital_id: Uuid,
    pub username: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub role: UserRole,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

impl User {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

/// 患者档案
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Patient {
    pub id: Uuid,
    pub user_id: Uuid,
    pub record_number: i64, // 内部记录序号，用于生成脱敏代号
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

/// 医院AI服务设置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HospitalAiSettings {
    pub hospital_id: Uuid,
    pub preferred_provider: String,
    pub enabled_providers: Vec<String>,
    pub monthly_budget_usd: f64, // 每供应商月度限额，<= 0 表示不限额
}
