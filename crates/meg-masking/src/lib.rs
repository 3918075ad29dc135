//! # MEG Masking
//!
//! 患者PII的按角色字段级脱敏。规则表在启动时构建且不可变，
//! 运行期唯一的开关是全局启用标志（break-glass场景整体旁路，
//! 默认启用）。每次访问（无论是否脱敏）都记录查看者与对象。

pub mod rules;
pub mod service;

pub use rules::{MaskRule, MaskingPolicy, PatientField};
pub use service::{AccessLogSink, MaskedPatient, MaskingConfig, PatientMaskingService, TracingAccessLog};
