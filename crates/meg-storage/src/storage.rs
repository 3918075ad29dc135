//! 文档文件存储管理
//!
//! 本地文件系统布局: {base}/{hospital}/{case}/{uuid}_{清洗后文件名}

use meg_core::{DocumentType, MegError, Result};
use std::path::Path;
use uuid::Uuid;

/// 存储结果
#[derive(Debug, Clone)]
pub struct StoredFile {
    pub file_path: String,
    pub mime_type: String,
    pub file_size: i64,
    pub original_name: String,
}

/// 文档存储管理器
pub struct DocumentStorage {
    base_path: String,
}

impl DocumentStorage {
    pub fn new(base_path: &str) -> Self {
        Self { base_path: base_path.to_string() }
    }

    /// 存储上传的文档文件
    pub async fn store_document(
        &self,
        data: &[u8],
        hospital_id: Uuid,
        case_id: Uuid,
        original_name: &str,
        document_type: DocumentType,
    ) -> Result<StoredFile> {
        let sanitized = sanitize_filename(original_name);
        let relative = format!("{}/{}/{}_{}", hospital_id, case_id, Uuid::new_v4(), sanitized);
        let full_path = Path::new(&self.base_path).join(&relative);

        if let Some(parent) = full_path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&full_path, data).await?;

        tracing::info!(
            case_id = %case_id,
            document_type = document_type.as_str(),
            size = data.len(),
            "Stored document file"
        );

        Ok(StoredFile {
            file_path: relative,
            mime_type: mime_for_filename(original_name).to_string(),
            file_size: data.len() as i64,
            original_name: original_name.to_string(),
        })
    }

    /// 读取文件内容
    pub async fn get_file(&self, relative_path: &str) -> Result<Vec<u8>> {
        let full_path = Path::new(&self.base_path).join(relative_path);
        let data = tokio::fs::read(full_path).await?;
        Ok(data)
    }

    /// 下载路径；文件不存在时返回None
    pub async fn download_path(&self, relative_path: &str) -> Option<String> {
        let full_path = Path::new(&self.base_path).join(relative_path);
        match tokio::fs::try_exists(&full_path).await {
            Ok(true) => Some(full_path.to_string_lossy().to_string()),
            _ => None,
        }
    }

    /// 删除文件
    pub async fn delete(&self, relative_path: &str) -> Result<bool> {
        let full_path = Path::new(&self.base_path).join(relative_path);
        match tokio::fs::remove_file(&full_path).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(MegError::Storage(e.to_string())),
        }
    }
}

/// 清洗文件名：路径分隔符与控制字符替换为下划线
fn sanitize_filename(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect();
    if cleaned.is_empty() {
        "unnamed".to_string()
    } else {
        cleaned
    }
}

/// 按扩展名推断MIME类型
fn mime_for_filename(name: &str) -> &'static str {
    let lower = name.to_lowercase();
    match lower.rsplit('.').next() {
        Some("pdf") => "application/pdf",
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("png") => "image/png",
        Some("gif") => "image/gif",
        Some("tif") | Some("tiff") => "image/tiff",
        Some("bmp") => "image/bmp",
        Some("txt") => "text/plain",
        Some("dcm") => "application/dicom",
        _ => "application/octet-stream",
    }
}
