//! 病例推荐引擎
//!
//! 将去标识化的症状与患者元数据转为检查项/科室/镇静/优先级建议。
//! AI返回的每个id都必须在调用方提供的候选表中，否则静默丢弃；
//! 任何失败路径（网络、解析、禁用）都落到确定性的空建议上。

use meg_core::{CasePriority, MegError, Result};
use serde::Deserialize;
use serde_json::json;
use std::collections::HashMap;
use uuid::Uuid;

use crate::phi::ensure_phi_safe;
use crate::providers::ChatCompletion;
use crate::usage::{ServiceUsageTracker, UsageStart, UsageStore};
use meg_core::UsageStatus;
use std::sync::Arc;

/// 推荐请求（已去标识化）
#[derive(Debug, Clone)]
pub struct RecommendationRequest {
    pub hospital_id: Uuid,
    pub user_id: Option<Uuid>,
    pub symptoms: String,
    pub age_category: Option<String>,
    pub gender: Option<String>,
    pub exam_candidates: HashMap<Uuid, String>,
    pub department_candidates: HashMap<Uuid, String>,
    pub sedation_candidates: HashMap<Uuid, String>,
}

/// 推荐结果
#[derive(Debug, Clone)]
pub struct CaseRecommendation {
    pub recommended_exam_procedure_ids: Vec<Uuid>,
    pub department_id: Option<Uuid>,
    pub sedation_id: Option<Uuid>,
    pub priority: CasePriority,
    pub notes: Option<String>,
    pub ai_generated: bool,
}

impl CaseRecommendation {
    /// 确定性空建议：AI不可用时的统一回退
    pub fn fallback() -> Self {
        Self {
            recommended_exam_procedure_ids: Vec::new(),
            department_id: None,
            sedation_id: None,
            priority: CasePriority::Medium,
            notes: None,
            ai_generated: false,
        }
    }
}

/// AI响应的JSON契约
#[derive(Debug, Deserialize)]
struct RawRecommendation {
    #[serde(default)]
    recommended_exam_procedure_ids: Vec<String>,
    department_id: Option<String>,
    sedation_id: Option<String>,
    priority: Option<String>,
    notes: Option<String>,
}

/// 病例推荐引擎
pub struct CaseRecommendationEngine {
    client: Option<Box<dyn ChatCompletion>>,
    tracker: ServiceUsageTracker,
}

impl CaseRecommendationEngine {
    pub fn new(client: Option<Box<dyn ChatCompletion>>, usage: Arc<dyn UsageStore>) -> Self {
        Self { client, tracker: ServiceUsageTracker::new(usage) }
    }

    /// 生成推荐；失败不向上传播，统一退化为空建议
    pub async fn recommend(&self, request: &RecommendationRequest) -> CaseRecommendation {
        let client = match &self.client {
            Some(client) => client,
            None => return CaseRecommendation::fallback(),
        };

        let payload = Self::build_payload(request);
        if let Err(e) = ensure_phi_safe(&payload) {
            // PHI违规是硬中止：不剥离、不外发，直接走本地回退
            tracing::error!(error = %e, "Recommendation payload failed PHI check");
            return CaseRecommendation::fallback();
        }

        let log = match self
            .tracker
            .start(UsageStart {
                hospital_id: request.hospital_id,
                service_type: "ai".to_string(),
                provider: client.provider().as_str().to_string(),
                action: "case_recommendation".to_string(),
                user_id: request.user_id,
                related_id: None,
                request_payload: Some(payload.clone()),
            })
            .await
        {
            Ok(log) => log,
            Err(e) => {
                tracing::error!(error = %e, "Failed to open usage log, skipping AI call");
                return CaseRecommendation::fallback();
            }
        };

        let prompt = Self::build_prompt(&payload);
        match client.complete(SYSTEM_PROMPT, &prompt).await {
            Ok(completion) => {
                let recommendation = match Self::parse_and_validate(&completion.text, request) {
                    Ok(recommendation) => recommendation,
                    Err(e) => {
                        let _ = self
                            .tracker
                            .fail(log, UsageStatus::Failed, Some("parse".to_string()), e.to_string())
                            .await;
                        return CaseRecommendation::fallback();
                    }
                };
                let _ = self
                    .tracker
                    .complete(
                        log,
                        Some(json!({"text": completion.text})),
                        completion.tokens_used,
                        client.provider().rate_per_1k_tokens(),
                    )
                    .await;
                recommendation
            }
            Err(e) => {
                let _ = self
                    .tracker
                    .fail(log, UsageStatus::Failed, Some("request".to_string()), e.to_string())
                    .await;
                CaseRecommendation::fallback()
            }
        }
    }

    fn build_payload(request: &RecommendationRequest) -> serde_json::Value {
        json!({
            "symptoms": request.symptoms,
            "age": request.age_category,
            "gender": request.gender,
            "exam_candidates": candidate_list(&request.exam_candidates),
            "department_candidates": candidate_list(&request.department_candidates),
            "sedation_candidates": candidate_list(&request.sedation_candidates),
        })
    }

    fn build_prompt(payload: &serde_json::Value) -> String {
        format!(
            "Given the de-identified case description below, choose the most suitable \
             exam procedures, department, sedation option and priority.\n\
             Respond with a single JSON object:\n\
             {{\"recommended_exam_procedure_ids\": [], \"department_id\": null, \
             \"sedation_id\": null, \"priority\": \"low|medium|high|urgent\", \"notes\": null}}\n\
             Use only ids listed in the candidates.\n\nCase:\n{}",
            payload
        )
    }

    fn parse_and_validate(
        text: &str,
        request: &RecommendationRequest,
    ) -> Result<CaseRecommendation> {
        let cleaned = strip_code_fences(text);
        let raw: RawRecommendation = serde_json::from_str(cleaned.trim())
            .map_err(|e| MegError::Ai(format!("recommendation contract violated: {}", e)))?;

        // 候选表校验：不认识的id一律丢弃，绝不盲信AI返回
        let recommended_exam_procedure_ids = raw
            .recommended_exam_procedure_ids
            .iter()
            .filter_map(|s| Uuid::parse_str(s).ok())
            .filter(|id| request.exam_candidates.contains_key(id))
            .collect();

        let department_id = raw
            .department_id
            .and_then(|s| Uuid::parse_str(&s).ok())
            .filter(|id| request.department_candidates.contains_key(id));

        let sedation_id = raw
            .sedation_id
            .and_then(|s| Uuid::parse_str(&s).ok())
            .filter(|id| request.sedation_candidates.contains_key(id));

        let priority = raw
            .priority
            .as_deref()
            .map(CasePriority::parse_or_default)
            .unwrap_or(CasePriority::Medium);

        Ok(CaseRecommendation {
            recommended_exam_procedure_ids,
            department_id,
            sedation_id,
            priority,
            notes: raw.notes,
            ai_generated: true,
        })
    }
}

const SYSTEM_PROMPT: &str =
    "You are a clinical intake assistant for a MEG imaging facility. \
     You only answer with strict JSON following the requested contract.";

fn candidate_list(candidates: &HashMap<Uuid, String>) -> Vec<serde_json::Value> {
    let mut entries: Vec<_> = candidates.iter().collect();
    entries.sort_by_key(|(id, _)| **id); // 稳定顺序，便于缓存与测试
    entries
        .into_iter()
        .map(|(id, name)| json!({"id": id.to_string(), "name": name}))
        .collect()
}

/// 剥离markdown代码围栏
pub(crate) fn strip_code_fences(text: &str) -> String {
    let trimmed = text.trim();
    if let Some(start) = trimmed.find("```") {
        let after = &trimmed[start + 3..];
        let after = after.strip_prefix("json").unwrap_or(after);
        if let Some(end) = after.find("```") {
            return after[..end].trim().to_string();
        }
    }
    trimmed.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryUsageStore;
    use crate::providers::{AiCompletion, AiProvider};
    use async_trait::async_trait;

    struct CannedClient(String);

    #[async_trait]
    impl ChatCompletion for CannedClient {
        async fn complete(&self, _system: &str, _prompt: &str) -> Result<AiCompletion> {
            Ok(AiCompletion { text: self.0.clone(), tokens_used: 100 })
        }

        fn provider(&self) -> AiProvider {
            AiProvider::OpenAi
        }
    }

    fn request_with_candidates(exam_id: Uuid, department_id: Uuid) -> RecommendationRequest {
        RecommendationRequest {
            hospital_id: Uuid::new_v4(),
            user_id: None,
            symptoms: "recurrent focal seizures".to_string(),
            age_category: Some("adult".to_string()),
            gender: Some("male".to_string()),
            exam_candidates: HashMap::from([(exam_id, "MEG Resting State".to_string())]),
            department_candidates: HashMap::from([(department_id, "Neurology".to_string())]),
            sedation_candidates: HashMap::new(),
        }
    }

    #[tokio::test]
    async fn test_no_client_yields_fallback() {
        let engine = CaseRecommendationEngine::new(None, Arc::new(MemoryUsageStore::new()));
        let request = request_with_candidates(Uuid::new_v4(), Uuid::new_v4());

        let recommendation = engine.recommend(&request).await;
        assert!(!recommendation.ai_generated);
        assert!(recommendation.recommended_exam_procedure_ids.is_empty());
        assert_eq!(recommendation.priority, CasePriority::Medium);
    }

    #[tokio::test]
    async fn test_adversarial_ids_are_dropped() {
        let exam_id = Uuid::new_v4();
        let department_id = Uuid::new_v4();
        let foreign_id = Uuid::new_v4();

        let response = format!(
            r#"{{"recommended_exam_procedure_ids": ["{}", "{}", "not-a-uuid"],
                "department_id": "{}", "sedation_id": "{}",
                "priority": "high", "notes": "check sleep deprivation"}}"#,
            exam_id, foreign_id, department_id, foreign_id
        );

        let engine = CaseRecommendationEngine::new(
            Some(Box::new(CannedClient(response))),
            Arc::new(MemoryUsageStore::new()),
        );
        let request = request_with_candidates(exam_id, department_id);
        let recommendation = engine.recommend(&request).await;

        assert!(recommendation.ai_generated);
        assert_eq!(recommendation.recommended_exam_procedure_ids, vec![exam_id]);
        assert_eq!(recommendation.department_id, Some(department_id));
        assert_eq!(recommendation.sedation_id, None); // 不在候选表中
        assert_eq!(recommendation.priority, CasePriority::High);
    }

    #[tokio::test]
    async fn test_invalid_priority_defaults_to_medium() {
        let exam_id = Uuid::new_v4();
        let response = r#"{"recommended_exam_procedure_ids": [], "priority": "apocalyptic"}"#;

        let engine = CaseRecommendationEngine::new(
            Some(Box::new(CannedClient(response.to_string()))),
            Arc::new(MemoryUsageStore::new()),
        );
        let request = request_with_candidates(exam_id, Uuid::new_v4());
        let recommendation = engine.recommend(&request).await;

        assert_eq!(recommendation.priority, CasePriority::Medium);
    }

    #[tokio::test]
    async fn test_malformed_response_falls_back() {
        let engine = CaseRecommendationEngine::new(
            Some(Box::new(CannedClient("I think MRI would be good".to_string()))),
            Arc::new(MemoryUsageStore::new()),
        );
        let request = request_with_candidates(Uuid::new_v4(), Uuid::new_v4());
        let recommendation = engine.recommend(&request).await;

        assert!(!recommendation.ai_generated);
    }

    #[tokio::test]
    async fn test_code_fenced_response_parses() {
        let exam_id = Uuid::new_v4();
        let response = format!(
            "```json\n{{\"recommended_exam_procedure_ids\": [\"{}\"], \"priority\": \"urgent\"}}\n```",
            exam_id
        );

        let engine = CaseRecommendationEngine::new(
            Some(Box::new(CannedClient(response))),
            Arc::new(MemoryUsageStore::new()),
        );
        let request = request_with_candidates(exam_id, Uuid::new_v4());
        let recommendation = engine.recommend(&request).await;

        assert!(recommendation.ai_generated);
        assert_eq!(recommendation.recommended_exam_procedure_ids, vec![exam_id]);
        assert_eq!(recommendation.priority, CasePriority::Urgent);
    }
}
