//! # MEG AI
//!
//! AI服务接入层：供应商路由（预算闸门+固定回退顺序）、外部服务
//! 调用台账、病例推荐引擎、报告结构生成与患者隐私字段防护。
//! 所有AI路径都有确定性本地回退，单次尝试不重试。

pub mod memory;
pub mod phi;
pub mod providers;
pub mod recommendation;
pub mod router;
pub mod structure;
pub mod usage;

pub use phi::ensure_phi_safe;
pub use providers::{AiCompletion, AiProvider, ChatCompletion, GeminiClient, OpenAiClient};
pub use recommendation::{CaseRecommendation, CaseRecommendationEngine, RecommendationRequest};
pub use router::{ProviderRouter, SettingsStore};
pub use structure::ReportStructureService;
pub use usage::{ServiceUsageTracker, UsageStore};
