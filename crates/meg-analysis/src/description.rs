//! 文档摘要描述生成
//!
//! 句子级打分选取：按类型关键短语对句子计分，取得分最高的至多3句
//! （无打分信号时取前2句），总长不超过300字符；完全无句子结构时
//! 退化为200字符以内的开头摘录。

use meg_core::utils::{split_sentences, truncate_at_boundary};
use meg_core::DocumentType;

const SUMMARY_MAX_CHARS: usize = 300;
const EXCERPT_MAX_CHARS: usize = 200;

/// 各类型摘要选句用的关键短语
fn key_phrases(document_type: DocumentType) -> &'static [&'static str] {
    match document_type {
        DocumentType::Report | DocumentType::Radiology => {
            &["impression", "finding", "conclusion", "demonstrates", "consistent with"]
        }
        DocumentType::LabResult => &["result", "value", "abnormal", "elevated", "within normal"],
        DocumentType::Pathology => &["diagnosis", "specimen", "malignant", "benign", "margins"],
        DocumentType::Prescription => &["prescribed", "dose", "daily", "mg", "take"],
        DocumentType::DischargeSummary => &["discharged", "admitted", "course", "follow-up"],
        DocumentType::Consent => &["consent", "agrees", "authorized", "signed"],
        DocumentType::Referral => &["referred", "evaluation", "consultation"],
        _ => &[],
    }
}

/// 生成文档描述
pub fn generate_description(text: &str, document_type: DocumentType) -> String {
    let sentences = split_sentences(text);
    if sentences.is_empty() {
        return truncate_at_boundary(text, EXCERPT_MAX_CHARS);
    }

    let phrases = key_phrases(document_type);
    let mut scored: Vec<(usize, &String)> = sentences
        .iter()
        .map(|sentence| {
            let lower = sentence.to_lowercase();
            let score = phrases.iter().filter(|p| lower.contains(**p)).count();
            (score, sentence)
        })
        .collect();

    let has_signal = scored.iter().any(|(score, _)| *score > 0);

    let selected: Vec<&String> = if has_signal {
        // 稳定排序保持原文顺序内的同分先后
        scored.sort_by(|a, b| b.0.cmp(&a.0));
        scored.iter().take(3).map(|(_, s)| *s).collect()
    } else {
        sentences.iter().take(2).collect()
    };

    let mut out = String::new();
    for sentence in selected {
        if out.chars().count() + sentence.chars().count() + 1 > SUMMARY_MAX_CHARS {
            break;
        }
        if !out.is_empty() {
            out.push(' ');
        }
        out.push_str(sentence);
    }

    if out.is_empty() {
        truncate_at_boundary(text, EXCERPT_MAX_CHARS)
    } else {
        out
    }
}

/// 提取发现类语句（供报告Findings段聚合）
pub fn extract_findings(text: &str) -> Vec<String> {
    const FINDING_MARKERS: &[&str] = &[
        "finding",
        "impression",
        "shows",
        "demonstrates",
        "consistent with",
        "no evidence",
        "abnormal",
    ];

    split_sentences(text)
        .into_iter()
        .filter(|sentence| {
            let lower = sentence.to_lowercase();
            FINDING_MARKERS.iter().any(|m| lower.contains(m))
        })
        .take(5)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scored_sentences_selected() {
        let text = "Patient arrived on time. Impression: interictal spikes in left temporal region. \
                    The weather was noted. Findings demonstrate focal slowing.";
        let description = generate_description(text, DocumentType::Report);
        assert!(description.contains("Impression"));
        assert!(description.contains("demonstrate"));
    }

    #[test]
    fn test_no_signal_takes_first_two() {
        let text = "Alpha sentence here. Beta sentence here. Gamma sentence here.";
        let description = generate_description(text, DocumentType::Report);
        assert!(description.starts_with("Alpha sentence here."));
        assert!(description.contains("Beta"));
        assert!(!description.contains("Gamma"));
    }

    #[test]
    fn test_no_sentences_uses_excerpt() {
        let text = "word ".repeat(100);
        let description = generate_description(&text, DocumentType::Other);
        assert!(description.chars().count() <= EXCERPT_MAX_CHARS + 3);
    }

    #[test]
    fn test_summary_cap() {
        let long_sentence = format!("Impression: {}.", "x".repeat(400));
        let description = generate_description(&long_sentence, DocumentType::Report);
        // 单句超限时回退为摘录
        assert!(description.chars().count() <= EXCERPT_MAX_CHARS + 3);
    }

    #[test]
    fn test_extract_findings() {
        let text = "Normal study overall. Findings show mild slowing. No evidence of epileptiform activity.";
        let findings = extract_findings(text);
        assert_eq!(findings.len(), 2);
    }
}
