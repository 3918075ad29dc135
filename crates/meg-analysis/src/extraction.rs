//! 文本提取路由
//!
//! 按声明的MIME类型路由到对应的提取后端：PDF走结构化文本提取，
//! 图像走OCR，text/plain直接读取。后端以协作方接口注入，
//! 缺失后端的环境自动降级。

use async_trait::async_trait;
use meg_core::Result;

/// OCR引擎协作方接口（失败时可返回空串）
#[async_trait]
pub trait OcrEngine: Send + Sync {
    async fn extract_text(&self, image_path: &str) -> Result<String>;
}

/// PDF文本提取协作方接口
#[async_trait]
pub trait PdfTextExtractor: Send + Sync {
    async fn extract_text(&self, pdf_path: &str) -> Result<String>;

    async fn page_count(&self, pdf_path: &str) -> Result<u32>;
}

/// 提取结果来源
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtractionSource {
    Pdf,
    Ocr,
    PlainText,
    None,
}

/// 提取结果
#[derive(Debug, Clone)]
pub struct ExtractedText {
    pub text: String,
    pub source: ExtractionSource,
}

impl ExtractedText {
    fn empty() -> Self {
        Self { text: String::new(), source: ExtractionSource::None }
    }
}

/// MIME路由的文本提取器
pub struct TextExtractor {
    ocr: Option<Box<dyn OcrEngine>>,
    pdf: Option<Box<dyn PdfTextExtractor>>,
}

impl TextExtractor {
    pub fn new(ocr: Option<Box<dyn OcrEngine>>, pdf: Option<Box<dyn PdfTextExtractor>>) -> Self {
        Self { ocr, pdf }
    }

    /// 无任何后端的提取器（仅支持text/plain，其余走文件名降级）
    pub fn without_backends() -> Self {
        Self { ocr: None, pdf: None }
    }

    /// 按MIME类型提取文本，任何失败都折叠为空结果
    pub async fn extract(&self, file_path: &str, mime_type: &str, filename: &str) -> ExtractedText {
        match mime_type {
            "application/pdf" => match &self.pdf {
                Some(pdf) => match pdf.extract_text(file_path).await {
                    Ok(text) => ExtractedText { text, source: ExtractionSource::Pdf },
                    Err(e) => {
                        tracing::error!(file = filename, error = %e, "PDF extraction failed");
                        ExtractedText::empty()
                    }
                },
                None => {
                    tracing::warn!(file = filename, "No PDF extractor configured");
                    ExtractedText::empty()
                }
            },
            mime if mime.starts_with("image/") => match &self.ocr {
                Some(ocr) => match ocr.extract_text(file_path).await {
                    Ok(text) => ExtractedText { text, source: ExtractionSource::Ocr },
                    Err(e) => {
                        tracing::error!(file = filename, error = %e, "OCR extraction failed");
                        ExtractedText::empty()
                    }
                },
                None => {
                    tracing::warn!(file = filename, "No OCR engine configured");
                    ExtractedText::empty()
                }
            },
            "text/plain" => match tokio::fs::read_to_string(file_path).await {
                Ok(text) => ExtractedText { text, source: ExtractionSource::PlainText },
                Err(e) => {
                    tracing::error!(file = filename, error = %e, "Plain text read failed");
                    ExtractedText::empty()
                }
            },
            other => {
                tracing::debug!(file = filename, mime = other, "Unsupported MIME for extraction");
                ExtractedText::empty()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FixedOcr(&'static str);

    #[async_trait]
    impl OcrEngine for FixedOcr {
        async fn extract_text(&self, _image_path: &str) -> Result<String> {
            Ok(self.0.to_string())
        }
    }

    #[tokio::test]
    async fn test_image_routes_to_ocr() {
        let extractor = TextExtractor::new(Some(Box::new(FixedOcr("scanned words"))), None);
        let result = extractor.extract("/tmp/x.png", "image/png", "x.png").await;
        assert_eq!(result.text, "scanned words");
        assert_eq!(result.source, ExtractionSource::Ocr);
    }

    #[tokio::test]
    async fn test_missing_backend_degrades_to_empty() {
        let extractor = TextExtractor::without_backends();
        let result = extractor.extract("/tmp/x.pdf", "application/pdf", "x.pdf").await;
        assert!(result.text.is_empty());
        assert_eq!(result.source, ExtractionSource::None);
    }

    #[tokio::test]
    async fn test_unknown_mime_yields_empty() {
        let extractor = TextExtractor::without_backends();
        let result = extractor
            .extract("/tmp/x.bin", "application/octet-stream", "x.bin")
            .await;
        assert!(result.text.is_empty());
    }
}
