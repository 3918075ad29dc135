//! 文档类型分类
//!
//! 对固定的类型桶做关键词计数打分，文件名中同时出现的关键词
//! 每个加5分，取最高分；全零归为other。同样的输入恒产生同样的
//! 分类与置信度。

use meg_core::DocumentType;

/// 每个类型桶的关键词表
const TYPE_KEYWORDS: &[(DocumentType, &[&str])] = &[
    (
        DocumentType::Report,
        &["report", "impression", "findings", "conclusion", "interpretation", "summary"],
    ),
    (DocumentType::Image, &["image", "scan", "photo", "picture", "snapshot"]),
    (DocumentType::Dicom, &["dicom", "series", "slice", "modality", "instance"]),
    (
        DocumentType::Consent,
        &["consent", "authorization", "agree", "signature", "permission"],
    ),
    (
        DocumentType::LabResult,
        &["laboratory", "lab result", "specimen", "hemoglobin", "glucose", "panel", "reference range"],
    ),
    (
        DocumentType::Prescription,
        &["prescription", "rx", "dosage", "dispense", "refill", "medication"],
    ),
    (DocumentType::Referral, &["referral", "refer", "consultation", "consult"]),
    (
        DocumentType::Pathology,
        &["pathology", "biopsy", "histology", "cytology", "malignant", "benign"],
    ),
    (
        DocumentType::Radiology,
        &["radiology", "x-ray", "xray", "mri", "ct scan", "ultrasound", "contrast"],
    ),
    (
        DocumentType::DischargeSummary,
        &["discharge", "admission", "hospital course", "disposition", "follow-up"],
    ),
];

/// 分类结果
#[derive(Debug, Clone, Copy)]
pub struct Classification {
    pub document_type: DocumentType,
    pub confidence: f64,
    pub matched_keywords: usize,
}

fn count_occurrences(haystack: &str, needle: &str) -> usize {
    haystack.matches(needle).count()
}

/// 基于提取文本与文件名的文档类型分类
pub fn classify_document(text: &str, filename: &str) -> Classification {
    let text_lower = text.to_lowercase();
    let filename_lower = filename.to_lowercase();

    let mut best: Option<(DocumentType, usize, usize, usize)> = None; // (type, score, matched, total)

    for (document_type, keywords) in TYPE_KEYWORDS {
        let mut score = 0usize;
        let mut matched = 0usize;

        for keyword in *keywords {
            let occurrences = count_occurrences(&text_lower, keyword);
            if occurrences > 0 {
                score += occurrences;
                matched += 1;
            }
            // 文件名命中的关键词额外加权
            if filename_lower.contains(keyword) {
                score += 5;
            }
        }

        let is_better = match &best {
            Some((_, best_score, _, _)) => score > *best_score,
            None => score > 0,
        };
        if is_better {
            best = Some((*document_type, score, matched, keywords.len()));
        }
    }

    match best {
        Some((document_type, _, matched, total)) => Classification {
            document_type,
            confidence: confidence_score(matched, total),
            matched_keywords: matched,
        },
        None => Classification {
            document_type: DocumentType::Other,
            confidence: 0.4,
            matched_keywords: 0,
        },
    }
}

/// 置信度: matched/total，命中超过3个关键词加0.2，收敛到[0.4, 1.0]
fn confidence_score(matched: usize, total: usize) -> f64 {
    let mut confidence = if total == 0 { 0.0 } else { matched as f64 / total as f64 };
    if matched > 3 {
        confidence += 0.2;
    }
    confidence.clamp(0.4, 1.0)
}

/// 仅凭文件名的降级分类，置信度固定在0.5-0.7
pub fn classify_by_filename(filename: &str) -> (DocumentType, f64) {
    let lower = filename.to_lowercase();

    for (document_type, keywords) in TYPE_KEYWORDS {
        if keywords.iter().any(|k| lower.contains(k)) {
            let confidence = match document_type {
                DocumentType::Consent | DocumentType::Report => 0.7,
                DocumentType::Image | DocumentType::Dicom => 0.5,
                _ => 0.6,
            };
            return (*document_type, confidence);
        }
    }

    // 常见图像扩展名兜底
    if [".jpg", ".jpeg", ".png", ".gif", ".tiff", ".bmp"]
        .iter()
        .any(|ext| lower.ends_with(ext))
    {
        return (DocumentType::Image, 0.5);
    }

    (DocumentType::Other, 0.5)
}
