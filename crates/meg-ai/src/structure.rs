//! AI报告结构生成
//!
//! 请求已路由的供应商产出报告骨架JSON（报告名、类型、分节与格式
//! 指令），供报告装配引擎的通用路径消费。载荷先过PHI防护，违规
//! 直接报错由调用方转本地模板路径。

use meg_core::{MegError, Result, UsageStatus};
use serde_json::json;
use std::sync::Arc;
use uuid::Uuid;

use crate::phi::ensure_phi_safe;
use crate::providers::ChatCompletion;
use crate::usage::{ServiceUsageTracker, UsageStart, UsageStore};

/// AI报告结构服务
pub struct ReportStructureService {
    client: Box<dyn ChatCompletion>,
    tracker: ServiceUsageTracker,
}

impl ReportStructureService {
    pub fn new(client: Box<dyn ChatCompletion>, usage: Arc<dyn UsageStore>) -> Self {
        Self { client, tracker: ServiceUsageTracker::new(usage) }
    }

    /// 生成报告结构JSON
    ///
    /// case_payload必须已去标识化；PHI违规作为硬错误返回，
    /// 调用方据此显式选择本地标准路径。
    pub async fn generate_structure(
        &self,
        hospital_id: Uuid,
        user_id: Option<Uuid>,
        case_payload: &serde_json::Value,
    ) -> Result<serde_json::Value> {
        ensure_phi_safe(case_payload)?;

        let log = self
            .tracker
            .start(UsageStart {
                hospital_id,
                service_type: "ai".to_string(),
                provider: self.client.provider().as_str().to_string(),
                action: "report_structure".to_string(),
                user_id,
                related_id: None,
                request_payload: Some(case_payload.clone()),
            })
            .await?;

        let prompt = format!(
            "Design the section structure for a clinical imaging report from this \
             de-identified case summary. Respond with one JSON object:\n\
             {{\"report_name\": \"...\", \"report_type\": \"...\", \"sections\": \
             [{{\"title\": \"...\", \"required\": true, \"content_type\": \
             \"symptoms_and_history|procedure_list|procedure_findings|document_summaries|conclusions\", \
             \"subsections\": []}}], \"formatting\": {{}}}}\n\nCase:\n{}",
            case_payload
        );

        match self.client.complete(SYSTEM_PROMPT, &prompt).await {
            Ok(completion) => {
                let cleaned = crate::recommendation::strip_code_fences(&completion.text);
                match serde_json::from_str::<serde_json::Value>(cleaned.trim()) {
                    Ok(structure) => {
                        let _ = self
                            .tracker
                            .complete(
                                log,
                                Some(json!({"text": completion.text})),
                                completion.tokens_used,
                                self.client.provider().rate_per_1k_tokens(),
                            )
                            .await;
                        Ok(structure)
                    }
                    Err(e) => {
                        let _ = self
                            .tracker
                            .fail(log, UsageStatus::Failed, Some("parse".to_string()), e.to_string())
                            .await;
                        Err(MegError::Ai(format!("report structure contract violated: {}", e)))
                    }
                }
            }
            Err(e) => {
                let _ = self
                    .tracker
                    .fail(log, UsageStatus::Failed, Some("request".to_string()), e.to_string())
                    .await;
                Err(e)
            }
        }
    }
}

const SYSTEM_PROMPT: &str =
    "You are a clinical report template designer. You only answer with strict JSON.";
