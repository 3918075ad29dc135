//! 病例工作流演示程序
//!
//! 走通核心链路：建档 → 创建病例 → 查看转换 → 文档分析 → 交接 →
//! 级联完成 → 报告装配与导出，全部使用内存存储。

use chrono::{NaiveDate, Utc};
use meg_ai::memory::{MemorySettingsStore, MemoryUsageStore};
use meg_ai::{CaseRecommendationEngine, ProviderRouter, RecommendationRequest};
use meg_analysis::{DocumentAnalyzer, TextExtractor};
use meg_core::{
    CasePriority, Document, ExamsProcedure, Patient, User, UserRole, WorkflowRole,
};
use meg_masking::PatientMaskingService;
use meg_report::{
    assemble_standard_report, DocumentEntry, ExportFormat, ReportContext, ReportExporter,
};
use meg_workflow::memory::MemoryWorkflowStore;
use meg_workflow::service::{IntakeRequest, NewCaseRequest};
use meg_workflow::CaseWorkflowService;
use meg_workflow::WorkflowStore;
use std::collections::HashMap;
use std::sync::Arc;
use uuid::Uuid;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // 初始化日志
    tracing_subscriber::fmt::init();

    println!("🏥 MEG 病例管理演示\n");

    let hospital_id = Uuid::new_v4();
    let workflow = CaseWorkflowService::new(MemoryWorkflowStore::new());

    // 1. 技师建档（患者 + 账号，一个事务）
    let patient_user_id = Uuid::new_v4();
    let patient_user = User {
        id: patient_user_id,
        hospital_id,
        username: "p.novak".to_string(),
        email: "p.novak@example.org".to_string(),
        first_name: "Petra".to_string(),
        last_name: "Novak".to_string(),
        role: UserRole::Patient,
        is_active: true,
        created_at: Utc::now(),
    };
    let patient = Patient {
        id: Uuid::new_v4(),
        user_id: patient_user_id,
        record_number: 17,
        medical_record_number: "HX-0017".to_string(),
        date_of_birth: NaiveDate::from_ymd_opt(1990, 2, 11),
        gender: Some("female".to_string()),
        address: None,
        phone: None,
        email: None,
        medical_history: Some("childhood febrile seizures".to_string()),
        medications: None,
        emergency_contact_name: None,
        emergency_contact_phone: None,
        created_at: Utc::now(),
    };
    workflow
        .create_intake(IntakeRequest { patient: patient.clone(), user: patient_user.clone() })
        .await?;
    println!("✅ 患者建档完成");

    // 2. 技师创建病例
    let technician_id = Uuid::new_v4();
    let case = workflow
        .create_case(NewCaseRequest {
            hospital_id,
            patient_id: patient.id,
            user_id: technician_id,
            case_date: Utc::now().date_naive(),
            department_id: None,
            sedation_id: None,
            priority: CasePriority::High,
            symptoms: "recurrent focal seizures with aura".to_string(),
            notes: Some("Overnight sleep deprivation prior to recording.".to_string()),
        })
        .await?;
    println!("✅ 病例创建: {} (技师状态: {:?})", case.id, case.technician_status);

    // 3. AI推荐（无客户端时走确定性回退）
    let usage = Arc::new(MemoryUsageStore::new());
    let router = ProviderRouter::new(Arc::new(MemorySettingsStore::new()), usage.clone());
    let provider = router.determine_provider(hospital_id).await?;
    println!("✅ 路由供应商: {}", provider.as_str());

    let engine = CaseRecommendationEngine::new(None, usage);
    let recommendation = engine
        .recommend(&RecommendationRequest {
            hospital_id,
            user_id: Some(technician_id),
            symptoms: case.symptoms.clone(),
            age_category: Some("adult".to_string()),
            gender: Some("female".to_string()),
            exam_candidates: HashMap::new(),
            department_candidates: HashMap::new(),
            sedation_candidates: HashMap::new(),
        })
        .await;
    println!("✅ 推荐结果 (ai_generated={})", recommendation.ai_generated);

    // 4. 科学家查看病例，触发状态提升
    let scientist_id = Uuid::new_v4();
    workflow.view_case(case.id, WorkflowRole::Scientist, scientist_id).await?;

    // 5. 文档分析（纯文本，无OCR/PDF后端）
    let analyzer = DocumentAnalyzer::new(TextExtractor::without_backends());
    let catalog = ExamsProcedure {
        id: Uuid::new_v4(),
        exam_name: "MEG".to_string(),
        modality: Some("306ch".to_string()),
        procedure_name: "Resting State".to_string(),
        description: Some("Ten minute eyes-closed resting recording.".to_string()),
    };
    let candidates = vec![(catalog.id, catalog.display_name())];
    let temp = std::env::temp_dir().join("meg_demo_note.txt");
    tokio::fs::write(
        &temp,
        "MEG Clinical Report\nFindings show interictal spikes. Impression: left temporal focus.",
    )
    .await?;
    let analysis = analyzer
        .analyze(&temp.to_string_lossy(), "text/plain", "note.txt", &candidates)
        .await?;
    println!(
        "✅ 文档分析: 类型={} 置信度={:.2}",
        analysis.document_type.as_str(),
        analysis.confidence
    );

    // 6. 交接给医生并级联完成
    workflow
        .assign_case(
            case.id,
            WorkflowRole::Technician,
            WorkflowRole::Doctor,
            technician_id,
            scientist_id,
            Some("ready for interpretation".to_string()),
        )
        .await?;
    workflow.complete_case(case.id, scientist_id).await?;
    let audits = workflow.store().list_audits(case.id).await?;
    println!("✅ 工作流完成，审计行数: {}", audits.len());

    // 7. 脱敏视图
    let masking = PatientMaskingService::with_defaults();
    let scientist = User {
        id: scientist_id,
        hospital_id,
        username: "s.meier".to_string(),
        email: "s.meier@example.org".to_string(),
        first_name: "Sonja".to_string(),
        last_name: "Meier".to_string(),
        role: UserRole::Scientist,
        is_active: true,
        created_at: Utc::now(),
    };
    let masked = masking.mask_for_user(&patient, &patient_user, &scientist);
    println!("✅ 科学家视角患者标识: {}", masked.medical_record_number);

    // 8. 报告装配与导出
    let final_case = workflow.store().load_case(case.id).await?;
    let document = Document {
        id: Uuid::new_v4(),
        case_id: case.id,
        user_id: technician_id,
        case_procedure_id: None,
        document_type: analysis.document_type,
        file_path: temp.to_string_lossy().to_string(),
        file_type: "text/plain".to_string(),
        file_size: 80,
        original_filename: "note.txt".to_string(),
        description: None,
        uploaded_at: Utc::now(),
    };
    let ctx = ReportContext {
        case: final_case,
        patient_display_name: masked.medical_record_number.clone(),
        patient_medical_history: patient.medical_history.clone(),
        patient_medications: None,
        department_name: Some("Neurology".to_string()),
        sedation_name: None,
        procedures: Vec::new(),
        documents: vec![DocumentEntry { document, analysis: Some(analysis), image_bytes: None }],
        assignments: Vec::new(),
    };
    let report = assemble_standard_report(&ctx);
    println!("✅ 报告装配: \"{}\"，分节: {:?}", report.title, report.section_titles());

    let exporter = ReportExporter::without_renderers();
    for format in [ExportFormat::Html, ExportFormat::Txt, ExportFormat::Rtf] {
        let file = exporter.export(&report, format).await;
        println!("   导出 {} ({} bytes)", file.filename, file.content.len());
    }

    let _ = tokio::fs::remove_file(&temp).await;
    println!("\n🎉 演示完成");
    Ok(())
}
