//! 通用文本工具函数

/// 将多段文本按空行拆分为段落，段内换行折叠为空格
///
/// 报告装配与导出共用此规则，保证视觉一致性。
pub fn normalize_paragraphs(text: &str) -> Vec<String> {
    let mut paragraphs = Vec::new();
    let mut current = Vec::new();

    for line in text.lines() {
        if line.trim().is_empty() {
            if !current.is_empty() {
                paragraphs.push(current.join(" "));
                current.clear();
            }
        } else {
            current.push(line.trim().to_string());
        }
    }
    if !current.is_empty() {
        paragraphs.push(current.join(" "));
    }

    paragraphs
}

/// 按句子边界拆分文本
pub fn split_sentences(text: &str) -> Vec<String> {
    text.split_inclusive(['.', '!', '?'])
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .map(|s| s.to_string())
        .collect()
}

/// 在不超过max_len的前提下截断文本，优先句子边界，其次单词边界
pub fn truncate_at_boundary(text: &str, max_len: usize) -> String {
    if text.chars().count() <= max_len {
        return text.trim().to_string();
    }

    let head: String = text.chars().take(max_len).collect();

    if let Some(pos) = head.rfind(['.', '!', '?']) {
        return head[..=pos].trim().to_string();
    }
    if let Some(pos) = head.rfind(char::is_whitespace) {
        return format!("{}...", head[..pos].trim_end());
    }
    format!("{}...", head)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_paragraphs() {
        let text = "first line\ncontinues here\n\nsecond paragraph";
        let paragraphs = normalize_paragraphs(text);
        assert_eq!(paragraphs, vec!["first line continues here", "second paragraph"]);
    }

    #[test]
    fn test_normalize_paragraphs_empty() {
        assert!(normalize_paragraphs("").is_empty());
        assert!(normalize_paragraphs("\n\n\n").is_empty());
    }

    #[test]
    fn test_split_sentences() {
        let sentences = split_sentences("One. Two! Three?");
        assert_eq!(sentences, vec!["One.", "Two!", "Three?"]);
    }

    #[test]
    fn test_truncate_at_sentence_boundary() {
        let text = "Short sentence. This part will definitely be cut off by the limit.";
        let truncated = truncate_at_boundary(text, 30);
        assert_eq!(truncated, "Short sentence.");
    }

    #[test]
    fn test_truncate_at_word_boundary() {
        let text = "no sentence boundary anywhere in this stretch of text";
        let truncated = truncate_at_boundary(text, 20);
        assert!(truncated.ends_with("..."));
        assert!(truncated.chars().count() <= 23);
    }
}
