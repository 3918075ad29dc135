//! AI供应商路由
//!
//! 按医院偏好选择供应商：偏好供应商启用且月度预算未超时直接使用，
//! 否则按固定顺序逐个尝试，全部不合格时返回fallback哨兵供应商。
//! 预算超限不是错误，仅记录warning后继续向后路由。

use async_trait::async_trait;
use chrono::{Datelike, Utc};
use meg_core::{HospitalAiSettings, Result};
use std::sync::Arc;
use uuid::Uuid;

use crate::providers::AiProvider;
use crate::usage::UsageStore;

/// 固定的供应商回退顺序
pub const PROVIDER_PREFERENCE: &[AiProvider] = &[AiProvider::OpenAi, AiProvider::Gemini];

/// 医院AI设置读取接口
#[async_trait]
pub trait SettingsStore: Send + Sync {
    /// 医院的AI设置，未配置时返回None（视为全部禁用）
    async fn ai_settings(&self, hospital_id: Uuid) -> Result<Option<HospitalAiSettings>>;
}

/// 供应商路由器
pub struct ProviderRouter {
    settings: Arc<dyn SettingsStore>,
    usage: Arc<dyn UsageStore>,
}

impl ProviderRouter {
    pub fn new(settings: Arc<dyn SettingsStore>, usage: Arc<dyn UsageStore>) -> Self {
        Self { settings, usage }
    }

    /// 为医院选择供应商
    pub async fn determine_provider(&self, hospital_id: Uuid) -> Result<AiProvider> {
        let settings = match self.settings.ai_settings(hospital_id).await? {
            Some(settings) => settings,
            None => {
                tracing::debug!(hospital_id = %hospital_id, "No AI settings, using fallback");
                return Ok(AiProvider::Fallback);
            }
        };

        if let Some(preferred) = AiProvider::parse(&settings.preferred_provider) {
            if self.qualifies(hospital_id, preferred, &settings).await? {
                return Ok(preferred);
            }
        }

        for candidate in PROVIDER_PREFERENCE {
            if self.qualifies(hospital_id, *candidate, &settings).await? {
                return Ok(*candidate);
            }
        }

        tracing::info!(hospital_id = %hospital_id, "No qualified AI provider, using fallback");
        Ok(AiProvider::Fallback)
    }

    async fn qualifies(
        &self,
        hospital_id: Uuid,
        provider: AiProvider,
        settings: &HospitalAiSettings,
    ) -> Result<bool> {
        if provider == AiProvider::Fallback {
            return Ok(false); // 哨兵不参与常规选择
        }
        if !settings.enabled_providers.iter().any(|p| p == provider.as_str()) {
            return Ok(false);
        }
        self.within_budget(hospital_id, provider, settings.monthly_budget_usd).await
    }

    /// 月度预算检查：限额<=0视为不限
    async fn within_budget(
        &self,
        hospital_id: Uuid,
        provider: AiProvider,
        monthly_budget_usd: f64,
    ) -> Result<bool> {
        if monthly_budget_usd <= 0.0 {
            return Ok(true);
        }

        let now = Utc::now();
        let spent = self
            .usage
            .month_cost(hospital_id, provider.as_str(), now.year(), now.month())
            .await?;

        if spent >= monthly_budget_usd {
            tracing::warn!(
                hospital_id = %hospital_id,
                provider = provider.as_str(),
                spent_usd = spent,
                budget_usd = monthly_budget_usd,
                "Monthly AI budget exceeded, provider skipped"
            );
            return Ok(false);
        }
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::{MemorySettingsStore, MemoryUsageStore};

    fn settings(preferred: &str, enabled: &[&str], budget: f64, hospital_id: Uuid) -> HospitalAiSettings {
        HospitalAiSettings {
            hospital_id,
            preferred_provider: preferred.to_string(),
            enabled_providers: enabled.iter().map(|s| s.to_string()).collect(),
            monthly_budget_usd: budget,
        }
    }

    #[tokio::test]
    async fn test_preferred_provider_used_when_qualified() {
        let hospital_id = Uuid::new_v4();
        let settings_store = Arc::new(MemorySettingsStore::new());
        settings_store
            .put(settings("gemini", &["openai", "gemini"], 100.0, hospital_id))
            .await;
        let usage = Arc::new(MemoryUsageStore::new());
        let router = ProviderRouter::new(settings_store, usage);

        assert_eq!(router.determine_provider(hospital_id).await.unwrap(), AiProvider::Gemini);
    }

    #[tokio::test]
    async fn test_budget_exceeded_skips_preferred() {
        let hospital_id = Uuid::new_v4();
        let settings_store = Arc::new(MemorySettingsStore::new());
        settings_store
            .put(settings("openai", &["openai", "gemini"], 10.0, hospital_id))
            .await;

        // 当月openai已花费12美元，超过10美元限额
        let usage = Arc::new(MemoryUsageStore::new());
        usage.seed_month_cost(hospital_id, "openai", 12.0).await;

        let router = ProviderRouter::new(settings_store, usage);
        assert_eq!(router.determine_provider(hospital_id).await.unwrap(), AiProvider::Gemini);
    }

    #[tokio::test]
    async fn test_all_exhausted_returns_fallback() {
        let hospital_id = Uuid::new_v4();
        let settings_store = Arc::new(MemorySettingsStore::new());
        settings_store
            .put(settings("openai", &["openai", "gemini"], 10.0, hospital_id))
            .await;

        let usage = Arc::new(MemoryUsageStore::new());
        usage.seed_month_cost(hospital_id, "openai", 12.0).await;
        usage.seed_month_cost(hospital_id, "gemini", 11.0).await;

        let router = ProviderRouter::new(settings_store, usage);
        assert_eq!(router.determine_provider(hospital_id).await.unwrap(), AiProvider::Fallback);
    }

    #[tokio::test]
    async fn test_disabled_hospital_gets_fallback() {
        let hospital_id = Uuid::new_v4();
        let settings_store = Arc::new(MemorySettingsStore::new());
        settings_store.put(settings("openai", &[], 0.0, hospital_id)).await;

        let router = ProviderRouter::new(settings_store, Arc::new(MemoryUsageStore::new()));
        assert_eq!(router.determine_provider(hospital_id).await.unwrap(), AiProvider::Fallback);
    }

    #[tokio::test]
    async fn test_zero_budget_means_unlimited() {
        let hospital_id = Uuid::new_v4();
        let settings_store = Arc::new(MemorySettingsStore::new());
        settings_store.put(settings("openai", &["openai"], 0.0, hospital_id)).await;

        let usage = Arc::new(MemoryUsageStore::new());
        usage.seed_month_cost(hospital_id, "openai", 9999.0).await;

        let router = ProviderRouter::new(settings_store, usage);
        assert_eq!(router.determine_provider(hospital_id).await.unwrap(), AiProvider::OpenAi);
    }
}
