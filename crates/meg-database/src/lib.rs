//! # MEG Database
//!
//! sqlx/PostgreSQL持久化层：行模型与核心模型的转换、建表与索引、
//! 各实体的查询操作，以及工作流/台账/设置存储接口的SQL实现。

pub mod connection;
pub mod models;
pub mod queries;
pub mod stores;

pub use connection::DatabasePool;
pub use queries::DatabaseQueries;
pub use stores::{SqlSettingsStore, SqlUsageStore, SqlWorkflowStore};
