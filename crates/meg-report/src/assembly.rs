//! 标准MEG报告装配
//!
//! 把病例、检查项、文档分析与交接记录合成为有序分节。分节的存在
//! 与否是输入状态的确定函数：无内容的分节整体省略，绝不渲染空壳。

use base64::Engine;
use meg_analysis::DocumentAnalysis;
use meg_core::utils::normalize_paragraphs;
use meg_core::{
    Case, CaseAssignment, CaseProcedure, Document, ExamsProcedure, ProcedureStatus, User, UserRole,
};
use std::collections::HashMap;

use crate::model::{AssembledReport, ReportNode, Section};

/// 固定默认报告标题
pub const DEFAULT_REPORT_TITLE: &str = "MEG Clinical Report";

/// Findings段的固定占位文本
pub const FINDINGS_PLACEHOLDER: &str =
    "No significant findings have been documented for this case.";

/// MEG Recordings段无病例备注时的固定段落
pub const MEG_RECORDINGS_FALLBACK: &str =
    "Magnetoencephalography recordings were acquired according to the standard \
     clinical protocol of this facility.";

const IMPRESSIONS_BOILERPLATE: &str =
    "Clinical interpretation is pending review of the recorded data.";

/// 检查项条目：病例关联 + 目录条目
#[derive(Debug, Clone)]
pub struct ProcedureEntry {
    pub link: CaseProcedure,
    pub catalog: ExamsProcedure,
}

/// 文档条目：文档 + 分析结果 + （图像类）原始字节
#[derive(Debug, Clone)]
pub struct DocumentEntry {
    pub document: Document,
    pub analysis: Option<DocumentAnalysis>,
    pub image_bytes: Option<Vec<u8>>,
}

/// 交接条目：交接记录 + 接收人
#[derive(Debug, Clone)]
pub struct AssignmentEntry {
    pub assignment: CaseAssignment,
    pub assignee: User,
}

/// 装配上下文：完全水合的病例视图
#[derive(Debug, Clone)]
pub struct ReportContext {
    pub case: Case,
    /// 已按查看者脱敏的患者展示名
    pub patient_display_name: String,
    pub patient_medical_history: Option<String>,
    pub patient_medications: Option<String>,
    pub department_name: Option<String>,
    pub sedation_name: Option<String>,
    pub procedures: Vec<ProcedureEntry>,
    pub documents: Vec<DocumentEntry>,
    /// 最新在前
    pub assignments: Vec<AssignmentEntry>,
}

/// 装配标准MEG报告
pub fn assemble_standard_report(ctx: &ReportContext) -> AssembledReport {
    let mut sections = Vec::new();

    if let Some(section) = patient_history_section(ctx) {
        sections.push(section);
    }
    sections.push(meg_recordings_section(ctx));
    if let Some(section) = technical_description_section(ctx) {
        sections.push(section);
    }
    sections.push(findings_section(ctx));
    if let Some(section) = reference_documents_section(ctx) {
        sections.push(section);
    }
    if let Some(section) = impressions_section(ctx) {
        sections.push(section);
    }

    let title = ctx
        .documents
        .first()
        .and_then(|d| d.analysis.as_ref())
        .and_then(|a| a.report_type.clone())
        .unwrap_or_else(|| DEFAULT_REPORT_TITLE.to_string());

    tracing::debug!(
        case_id = %ctx.case.id,
        sections = sections.len(),
        "Assembled standard MEG report"
    );

    AssembledReport { title, sections, variables: template_variables(ctx) }
}

/// 文本转段落节点：空行分段、段内换行折叠（全系统统一的规范化）
pub fn paragraphs(text: &str) -> Vec<ReportNode> {
    normalize_paragraphs(text)
        .into_iter()
        .map(ReportNode::Paragraph)
        .collect()
}

/// Patient History：症状或既往史/用药非空才出现
fn patient_history_section(ctx: &ReportContext) -> Option<Section> {
    let has_symptoms = !ctx.case.symptoms.trim().is_empty();
    let history = ctx.patient_medical_history.as_deref().unwrap_or("").trim();
    let medications = ctx.patient_medications.as_deref().unwrap_or("").trim();

    if !has_symptoms && history.is_empty() && medications.is_empty() {
        return None;
    }

    let mut nodes = Vec::new();
    if has_symptoms {
        nodes.extend(paragraphs(&format!("Presenting symptoms: {}", ctx.case.symptoms.trim())));
    }
    if !history.is_empty() {
        nodes.extend(paragraphs(&format!("Medical history: {}", history)));
    }
    if !medications.is_empty() {
        nodes.extend(paragraphs(&format!("Current medications: {}", medications)));
    }

    Some(Section::with_nodes("Patient History", false, nodes))
}

/// MEG Recordings：恒出现
fn meg_recordings_section(ctx: &ReportContext) -> Section {
    let mut nodes = match &ctx.case.notes {
        Some(notes) if !notes.trim().is_empty() => paragraphs(notes),
        _ => paragraphs(MEG_RECORDINGS_FALLBACK),
    };

    let sedation_phrase = match (&ctx.case.sedation_id, &ctx.sedation_name) {
        (Some(_), Some(name)) => format!("The recording was performed with sedation ({}).", name),
        (Some(_), None) => "The recording was performed with sedation.".to_string(),
        (None, _) => "The recording was performed without sedation.".to_string(),
    };
    nodes.push(ReportNode::Paragraph(sedation_phrase));

    if !ctx.procedures.is_empty() {
        let items = ctx
            .procedures
            .iter()
            .map(|p| p.catalog.display_name())
            .collect();
        nodes.push(ReportNode::List(items));
    }

    Section::with_nodes("MEG Recordings", true, nodes)
}

/// Technical Description of Procedures：仅当存在已完成检查项
fn technical_description_section(ctx: &ReportContext) -> Option<Section> {
    let completed: Vec<&ProcedureEntry> = ctx
        .procedures
        .iter()
        .filter(|p| p.link.status == ProcedureStatus::Completed)
        .collect();

    if completed.is_empty() {
        return None;
    }

    let mut section = Section::new("Technical Description of Procedures", false);
    for entry in completed {
        let mut nodes = Vec::new();
        if let Some(description) = &entry.catalog.description {
            nodes.extend(paragraphs(description));
        }
        if let Some(notes) = &entry.link.notes {
            if !notes.trim().is_empty() {
                nodes.extend(paragraphs(notes));
            }
        }
        if nodes.is_empty() {
            nodes.push(ReportNode::Paragraph(
                "Performed according to the standard protocol.".to_string(),
            ));
        }
        section
            .subsections
            .push(Section::with_nodes(&entry.catalog.display_name(), false, nodes));
    }
    Some(section)
}

/// Findings：聚合所有文档分析的summary与findings，无内容时固定占位
fn findings_section(ctx: &ReportContext) -> Section {
    let mut nodes = Vec::new();

    for entry in &ctx.documents {
        if let Some(analysis) = &entry.analysis {
            if !analysis.summary.trim().is_empty() {
                nodes.extend(paragraphs(&analysis.summary));
            }
            if !analysis.findings.is_empty() {
                nodes.push(ReportNode::List(analysis.findings.clone()));
            }
        }
    }

    if nodes.is_empty() {
        nodes.push(ReportNode::Paragraph(FINDINGS_PLACEHOLDER.to_string()));
    }

    Section::with_nodes("Findings", true, nodes)
}

/// Reference Documents：仅当存在图像类文档（按MIME白名单）
fn reference_documents_section(ctx: &ReportContext) -> Option<Section> {
    let images: Vec<&DocumentEntry> = ctx
        .documents
        .iter()
        .filter(|d| d.document.is_image() && d.image_bytes.is_some())
        .collect();

    if images.is_empty() {
        return None;
    }

    let mut nodes = Vec::new();
    for entry in images {
        let Some(bytes) = entry.image_bytes.as_ref() else { continue };
        let caption = entry
            .document
            .case_procedure_id
            .and_then(|link_id| ctx.procedures.iter().find(|p| p.link.id == link_id))
            .map(|p| p.catalog.display_name())
            .unwrap_or_else(|| entry.document.original_filename.clone());

        nodes.push(ReportNode::Image {
            data_base64: base64::engine::general_purpose::STANDARD.encode(bytes),
            mime_type: entry.document.file_type.clone(),
            caption,
        });
    }

    Some(Section::with_nodes("Reference Documents", false, nodes))
}

/// Impressions：仅当有交接指向医生或科学家
fn impressions_section(ctx: &ReportContext) -> Option<Section> {
    let interpreter = ctx.assignments.iter().find(|entry| {
        matches!(entry.assignee.role, UserRole::Doctor | UserRole::Scientist)
    })?;

    let nodes = vec![
        ReportNode::Paragraph(IMPRESSIONS_BOILERPLATE.to_string()),
        ReportNode::Paragraph(format!(
            "{}, {}",
            interpreter.assignee.full_name(),
            interpreter.assignee.role.as_str()
        )),
    ];
    Some(Section::with_nodes("Impressions", false, nodes))
}

fn template_variables(ctx: &ReportContext) -> HashMap<String, String> {
    let mut variables = HashMap::new();
    variables.insert("patient_name".to_string(), ctx.patient_display_name.clone());
    variables.insert("case_date".to_string(), ctx.case.case_date.to_string());
    variables.insert("priority".to_string(), ctx.case.priority.as_str().to_string());
    variables.insert(
        "department".to_string(),
        ctx.department_name.clone().unwrap_or_default(),
    );
    variables.insert("case_status".to_string(), ctx.case.status.as_str().to_string());
    variables.insert("image_max_width".to_string(), crate::model::IMAGE_MAX_WIDTH_PX.to_string());
    variables
}

#[cfg(test)]
pub(crate) mod tests_support {
    use super::*;
    use chrono::{NaiveDate, Utc};
    use meg_core::{CasePriority, CaseStatus, DocumentType, RoleStatus};
    use uuid::Uuid;

    /// 含一个带指定全文的文档的最小装配上下文
    pub fn context_with_document_text(text: &str) -> ReportContext {
        let case = Case {
            id: Uuid::new_v4(),
            hospital_id: Uuid::new_v4(),
            patient_id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            current_user_id: None,
            case_date: NaiveDate::from_ymd_opt(2026, 4, 1).unwrap(),
            department_id: None,
            sedation_id: None,
            priority: CasePriority::Medium,
            status: CaseStatus::InProgress,
            technician_status: RoleStatus::InProgress,
            scientist_status: RoleStatus::Draft,
            doctor_status: RoleStatus::Draft,
            symptoms: String::new(),
            notes: None,
            current_version_id: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };

        let document = Document {
            id: Uuid::new_v4(),
            case_id: case.id,
            user_id: case.user_id,
            case_procedure_id: None,
            document_type: DocumentType::Report,
            file_path: "h/c/doc.txt".to_string(),
            file_type: "text/plain".to_string(),
            file_size: text.len() as i64,
            original_filename: "doc.txt".to_string(),
            description: None,
            uploaded_at: Utc::now(),
        };

        let analysis = DocumentAnalysis {
            document_type: DocumentType::Report,
            confidence: 0.8,
            suggested_procedure_id: None,
            summary: String::new(),
            findings: Vec::new(),
            report_type: None,
            extracted_text: text.to_string(),
        };

        ReportContext {
            case,
            patient_display_name: "MRN-042".to_string(),
            patient_medical_history: None,
            patient_medications: None,
            department_name: None,
            sedation_name: None,
            procedures: Vec::new(),
            documents: vec![DocumentEntry { document, analysis: Some(analysis), image_bytes: None }],
            assignments: Vec::new(),
        }
    }
}
