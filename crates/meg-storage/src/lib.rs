//! # MEG Storage
//!
//! 文档文件存储管理。

pub mod storage;

pub use storage::{DocumentStorage, StoredFile};
