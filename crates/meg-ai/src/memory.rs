//! 内存实现的设置与台账存储（测试与演示用）

use async_trait::async_trait;
use chrono::{Datelike, Utc};
use meg_core::{HospitalAiSettings, Result, ServiceUsageLog, UsageStatus};
use std::collections::HashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::router::SettingsStore;
use crate::usage::UsageStore;

/// 内存设置存储
pub struct MemorySettingsStore {
    settings: RwLock<HashMap<Uuid, HospitalAiSettings>>,
}

impl MemorySettingsStore {
    pub fn new() -> Self {
        Self { settings: RwLock::new(HashMap::new()) }
    }

    pub async fn put(&self, settings: HospitalAiSettings) {
        self.settings.write().await.insert(settings.hospital_id, settings);
    }
}

impl Default for MemorySettingsStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SettingsStore for MemorySettingsStore {
    async fn ai_settings(&self, hospital_id: Uuid) -> Result<Option<HospitalAiSettings>> {
        Ok(self.settings.read().await.get(&hospital_id).cloned())
    }
}

/// 内存台账存储
pub struct MemoryUsageStore {
    logs: RwLock<Vec<ServiceUsageLog>>,
}

impl MemoryUsageStore {
    pub fn new() -> Self {
        Self { logs: RwLock::new(Vec::new()) }
    }

    /// 预置当月某供应商的花费（测试辅助）
    pub async fn seed_month_cost(&self, hospital_id: Uuid, provider: &str, total_usd: f64) {
        let log = ServiceUsageLog {
            id: Uuid::new_v4(),
            hospital_id,
            service_type: "ai".to_string(),
            provider: provider.to_string(),
            action: "seed".to_string(),
            user_id: None,
            related_id: None,
            request_payload: None,
            response_payload: None,
            status: UsageStatus::Success,
            response_time_ms: Some(1),
            error_code: None,
            error_message: None,
            units_consumed: None,
            unit_cost: None,
            total_cost_usd: Some(total_usd),
            metadata: None,
            created_at: Utc::now(),
        };
        self.logs.write().await.push(log);
    }

    pub async fn all(&self) -> Vec<ServiceUsageLog> {
        self.logs.read().await.clone()
    }
}

impl Default for MemoryUsageStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl UsageStore for MemoryUsageStore {
    async fn insert(&self, log: ServiceUsageLog) -> Result<()> {
        self.logs.write().await.push(log);
        Ok(())
    }

    async fn update(&self, log: ServiceUsageLog) -> Result<()> {
        let mut logs = self.logs.write().await;
        if let Some(existing) = logs.iter_mut().find(|l| l.id == log.id) {
            *existing = log;
        }
        Ok(())
    }

    async fn month_cost(
        &self,
        hospital_id: Uuid,
        provider: &str,
        year: i32,
        month: u32,
    ) -> Result<f64> {
        Ok(self
            .logs
            .read()
            .await
            .iter()
            .filter(|l| {
                l.hospital_id == hospital_id
                    && l.provider == provider
                    && l.created_at.year() == year
                    && l.created_at.month() == month
            })
            .filter_map(|l| l.total_cost_usd)
            .sum())
    }
}
