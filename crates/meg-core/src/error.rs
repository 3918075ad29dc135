//! 错误定义模块

use thiserror::Error;

/// MEG病例管理系统统一错误类型
#[derive(Error, Debug)]
pub enum MegError {
    #[error("配置错误: {0}")]
    Config(String),

    #[error("数据库错误: {0}")]
    Database(String),

    #[error("存储错误: {0}")]
    Storage(String),

    #[error("IO错误: {0}")]
    Io(#[from] std::io::Error),

    #[error("序列化错误: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("验证错误: {0}")]
    Validation(String),

    #[error("资源未找到: {0}")]
    NotFound(String),

    #[error("工作流错误: {0}")]
    Workflow(String),

    #[error("审计日志写入失败: {0}")]
    Audit(String),

    #[error("并发冲突: {0}")]
    Conflict(String),

    #[error("文档分析错误: {0}")]
    Analysis(String),

    #[error("AI服务错误: {0}")]
    Ai(String),

    #[error("患者隐私字段违规: {0}")]
    PhiViolation(String),

    #[error("脱敏处理错误: {0}")]
    Masking(String),

    #[error("报告导出错误: {0}")]
    Export(String),

    #[error("无效状态转换: 从 {from} 到 {to}")]
    InvalidStateTransition { from: String, to: String },

    #[error("系统内部错误: {0}")]
    Internal(String),
}

/// MEG病例管理系统统一结果类型
pub type Result<T> = std::result::Result<T, MegError>;
