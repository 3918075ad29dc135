//! 外部服务调用台账
//!
//! 任何外部服务调用（AI/OCR/导出）的通用start/complete/fail记录，
//! 附带响应耗时与按token计的成本核算。台账只追加，不回写历史。

use async_trait::async_trait;
use chrono::Utc;
use meg_core::{Result, ServiceUsageLog, UsageStatus};
use std::sync::Arc;
use uuid::Uuid;

/// 台账存储接口
#[async_trait]
pub trait UsageStore: Send + Sync {
    /// 追加一条新台账记录
    async fn insert(&self, log: ServiceUsageLog) -> Result<()>;

    /// 更新记录的终态字段（状态、耗时、成本、错误）
    async fn update(&self, log: ServiceUsageLog) -> Result<()>;

    /// (医院, 供应商)在指定自然月内的成本合计
    async fn month_cost(
        &self,
        hospital_id: Uuid,
        provider: &str,
        year: i32,
        month: u32,
    ) -> Result<f64>;
}

/// 调用开始参数
#[derive(Debug, Clone)]
pub struct UsageStart {
    pub hospital_id: Uuid,
    pub service_type: String,
    pub provider: String,
    pub action: String,
    pub user_id: Option<Uuid>,
    pub related_id: Option<Uuid>,
    pub request_payload: Option<serde_json::Value>,
}

/// 服务调用跟踪器
pub struct ServiceUsageTracker {
    store: Arc<dyn UsageStore>,
}

impl ServiceUsageTracker {
    pub fn new(store: Arc<dyn UsageStore>) -> Self {
        Self { store }
    }

    /// 记录调用开始，返回pending状态的台账行
    pub async fn start(&self, params: UsageStart) -> Result<ServiceUsageLog> {
        let log = ServiceUsageLog {
            id: Uuid::new_v4(),
            hospital_id: params.hospital_id,
            service_type: params.service_type,
            provider: params.provider,
            action: params.action,
            user_id: params.user_id,
            related_id: params.related_id,
            request_payload: params.request_payload,
            response_payload: None,
            status: UsageStatus::Pending,
            response_time_ms: None,
            error_code: None,
            error_message: None,
            units_consumed: None,
            unit_cost: None,
            total_cost_usd: None,
            metadata: None,
            created_at: Utc::now(),
        };
        self.store.insert(log.clone()).await?;
        Ok(log)
    }

    /// 记录调用成功完成，units_consumed按token计，rate为每1000单位美元单价
    pub async fn complete(
        &self,
        mut log: ServiceUsageLog,
        response_payload: Option<serde_json::Value>,
        units_consumed: i64,
        rate_per_1k: f64,
    ) -> Result<ServiceUsageLog> {
        log.status = UsageStatus::Success;
        log.response_payload = response_payload;
        log.response_time_ms = Some(elapsed_ms(&log));
        log.units_consumed = Some(units_consumed);
        log.unit_cost = Some(rate_per_1k);
        log.total_cost_usd = Some(units_consumed as f64 / 1000.0 * rate_per_1k);

        self.store.update(log.clone()).await?;
        tracing::debug!(
            provider = log.provider,
            action = log.action,
            cost_usd = log.total_cost_usd,
            "Service call completed"
        );
        Ok(log)
    }

    /// 记录调用失败
    pub async fn fail(
        &self,
        mut log: ServiceUsageLog,
        status: UsageStatus,
        error_code: Option<String>,
        error_message: String,
    ) -> Result<ServiceUsageLog> {
        log.status = status;
        log.response_time_ms = Some(elapsed_ms(&log));
        log.error_code = error_code;
        log.error_message = Some(error_message.clone());

        self.store.update(log.clone()).await?;
        tracing::error!(
            provider = log.provider,
            action = log.action,
            error = error_message,
            "Service call failed"
        );
        Ok(log)
    }
}

fn elapsed_ms(log: &ServiceUsageLog) -> i64 {
    (Utc::now() - log.created_at).num_milliseconds().max(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryUsageStore;

    fn start_params(hospital_id: Uuid) -> UsageStart {
        UsageStart {
            hospital_id,
            service_type: "ai".to_string(),
            provider: "openai".to_string(),
            action: "recommendation".to_string(),
            user_id: None,
            related_id: None,
            request_payload: None,
        }
    }

    #[tokio::test]
    async fn test_cost_computation() {
        let store = Arc::new(MemoryUsageStore::new());
        let tracker = ServiceUsageTracker::new(store.clone());
        let hospital_id = Uuid::new_v4();

        let log = tracker.start(start_params(hospital_id)).await.unwrap();
        let log = tracker.complete(log, None, 2500, 0.01).await.unwrap();

        assert_eq!(log.status, UsageStatus::Success);
        assert!((log.total_cost_usd.unwrap() - 0.025).abs() < 1e-9);
        assert!(log.response_time_ms.is_some());
    }

    #[tokio::test]
    async fn test_failure_keeps_error_details() {
        let store = Arc::new(MemoryUsageStore::new());
        let tracker = ServiceUsageTracker::new(store.clone());

        let log = tracker.start(start_params(Uuid::new_v4())).await.unwrap();
        let log = tracker
            .fail(log, UsageStatus::Timeout, Some("timeout".to_string()), "deadline exceeded".to_string())
            .await
            .unwrap();

        assert_eq!(log.status, UsageStatus::Timeout);
        assert_eq!(log.error_code.as_deref(), Some("timeout"));
        assert_eq!(log.total_cost_usd, None);
    }

    #[tokio::test]
    async fn test_month_cost_accumulates() {
        let store = Arc::new(MemoryUsageStore::new());
        let tracker = ServiceUsageTracker::new(store.clone());
        let hospital_id = Uuid::new_v4();

        for _ in 0..3 {
            let log = tracker.start(start_params(hospital_id)).await.unwrap();
            tracker.complete(log, None, 1000, 0.01).await.unwrap();
        }

        let now = Utc::now();
        use chrono::Datelike;
        let total = store
            .month_cost(hospital_id, "openai", now.year(), now.month())
            .await
            .unwrap();
        assert!((total - 0.03).abs() < 1e-9);
    }
}
