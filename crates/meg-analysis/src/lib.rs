//! # MEG Analysis
//!
//! 文档内容提取与分析流水线：按MIME路由提取文本、分类文档类型、
//! 推荐检查项关联并生成摘要描述。全链路可降级，提取完全失败时
//! 退化为仅凭文件名的启发式判断。

pub mod classify;
pub mod description;
pub mod extraction;
pub mod procedure;

pub use classify::classify_document;
pub use extraction::{ExtractedText, ExtractionSource, OcrEngine, PdfTextExtractor, TextExtractor};
pub use procedure::suggest_procedure;

use meg_core::{DocumentType, Result};
use uuid::Uuid;

/// 文档分析结果
#[derive(Debug, Clone)]
pub struct DocumentAnalysis {
    pub document_type: DocumentType,
    pub confidence: f64,
    pub suggested_procedure_id: Option<Uuid>,
    pub summary: String,
    pub findings: Vec<String>,
    /// 文本中识别出的报告标题行（如 "MEG Clinical Report"）
    pub report_type: Option<String>,
    pub extracted_text: String,
}

/// 从文本开头识别报告标题行：前几行中包含"report"的短行
fn detect_report_type(text: &str) -> Option<String> {
    text.lines()
        .take(5)
        .map(str::trim)
        .find(|line| {
            !line.is_empty() && line.len() <= 80 && line.to_lowercase().contains("report")
        })
        .map(|line| line.to_string())
}

/// 文档分析流水线
pub struct DocumentAnalyzer {
    extractor: TextExtractor,
}

impl DocumentAnalyzer {
    pub fn new(extractor: TextExtractor) -> Self {
        Self { extractor }
    }

    /// 分析一个已上传的文档
    ///
    /// candidates为病例候选检查项 (id, 展示名称)，用于关联推荐。
    pub async fn analyze(
        &self,
        file_path: &str,
        mime_type: &str,
        original_filename: &str,
        candidates: &[(Uuid, String)],
    ) -> Result<DocumentAnalysis> {
        let extracted = self.extractor.extract(file_path, mime_type, original_filename).await;

        match extracted {
            ExtractedText { text, source } if !text.trim().is_empty() => {
                let classification = classify::classify_document(&text, original_filename);
                let suggested = procedure::suggest_procedure(&text, candidates);
                let summary = description::generate_description(&text, classification.document_type);
                let findings = description::extract_findings(&text);

                tracing::debug!(
                    file = original_filename,
                    document_type = classification.document_type.as_str(),
                    confidence = classification.confidence,
                    ?source,
                    "Document analyzed"
                );

                Ok(DocumentAnalysis {
                    document_type: classification.document_type,
                    confidence: classification.confidence,
                    suggested_procedure_id: suggested,
                    summary,
                    findings,
                    report_type: detect_report_type(&text),
                    extracted_text: text,
                })
            }
            _ => {
                // 提取失败或内容为空：仅凭文件名判断，置信度固定偏低
                let (document_type, confidence) = classify::classify_by_filename(original_filename);
                tracing::warn!(
                    file = original_filename,
                    document_type = document_type.as_str(),
                    "Extraction yielded no text, falling back to filename heuristics"
                );
                Ok(DocumentAnalysis {
                    document_type,
                    confidence,
                    suggested_procedure_id: None,
                    summary: String::new(),
                    findings: Vec::new(),
                    report_type: None,
                    extracted_text: String::new(),
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_analyze_plain_text_document() {
        let path = std::env::temp_dir().join(format!("meg-analysis-{}.txt", Uuid::new_v4()));
        tokio::fs::write(
            &path,
            "MEG Clinical Report\nFindings show interictal spikes during the mri correlation review.",
        )
        .await
        .unwrap();

        let mri_id = Uuid::new_v4();
        let analyzer = DocumentAnalyzer::new(TextExtractor::without_backends());
        let analysis = analyzer
            .analyze(
                &path.to_string_lossy(),
                "text/plain",
                "case_report.txt",
                &[(mri_id, "Brain MRI".to_string())],
            )
            .await
            .unwrap();

        assert_eq!(analysis.document_type, DocumentType::Report);
        assert_eq!(analysis.report_type.as_deref(), Some("MEG Clinical Report"));
        assert_eq!(analysis.suggested_procedure_id, Some(mri_id));
        assert!(!analysis.summary.is_empty());

        let _ = tokio::fs::remove_file(&path).await;
    }

    #[tokio::test]
    async fn test_analyze_degrades_to_filename_heuristics() {
        // PDF后端缺失：提取为空，回退到文件名
        let analyzer = DocumentAnalyzer::new(TextExtractor::without_backends());
        let analysis = analyzer
            .analyze("/nonexistent/consent_form.pdf", "application/pdf", "consent_form.pdf", &[])
            .await
            .unwrap();

        assert_eq!(analysis.document_type, DocumentType::Consent);
        assert!((0.5..=0.7).contains(&analysis.confidence));
        assert!(analysis.extracted_text.is_empty());
    }
}
