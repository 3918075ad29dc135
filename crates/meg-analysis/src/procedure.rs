//! 检查项关联推荐
//!
//! 对病例候选检查项打分：全名在文本中逐字出现+10；检查类别关键词
//! 同时出现在检查项名称与文本中时，按文本出现次数每次+2。
//! 最高分大于0才返回推荐。

use uuid::Uuid;

/// 检查类别关键词
const CATEGORY_KEYWORDS: &[&str] = &[
    "mri", "ct", "xray", "ultrasound", "endoscopy", "biopsy", "blood", "ecg",
];

/// 推荐与文档最匹配的检查项
pub fn suggest_procedure(text: &str, candidates: &[(Uuid, String)]) -> Option<Uuid> {
    let text_lower = text.to_lowercase();

    let mut best: Option<(Uuid, usize)> = None;

    for (id, name) in candidates {
        let name_lower = name.to_lowercase();
        let mut score = 0usize;

        // 全名逐字命中
        if text_lower.contains(&name_lower) {
            score += 10;
        }

        // 类别关键词：检查项名称与文本都包含才计分
        for keyword in CATEGORY_KEYWORDS {
            if name_lower.contains(keyword) {
                score += 2 * text_lower.matches(keyword).count();
            }
        }

        match best {
            Some((_, best_score)) if score <= best_score => {}
            _ if score > 0 => best = Some((*id, score)),
            _ => {}
        }
    }

    best.map(|(id, _)| id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_verbatim_name_match_wins() {
        let resting = (Uuid::new_v4(), "MEG Resting State".to_string());
        let evoked = (Uuid::new_v4(), "MEG Evoked Fields".to_string());
        let candidates = vec![resting.clone(), evoked];

        let text = "Recording session covered meg resting state acquisition over 20 minutes.";
        assert_eq!(suggest_procedure(text, &candidates), Some(resting.0));
    }

    #[test]
    fn test_category_keyword_scoring() {
        let mri = (Uuid::new_v4(), "Brain MRI".to_string());
        let ecg = (Uuid::new_v4(), "Routine ECG".to_string());
        let candidates = vec![mri.clone(), ecg];

        let text = "mri was performed; follow-up mri recommended in six months";
        assert_eq!(suggest_procedure(text, &candidates), Some(mri.0));
    }

    #[test]
    fn test_no_signal_returns_none() {
        let candidates = vec![(Uuid::new_v4(), "Brain MRI".to_string())];
        assert_eq!(suggest_procedure("unrelated narrative text", &candidates), None);
    }

    #[test]
    fn test_empty_candidates() {
        assert_eq!(suggest_procedure("mri mri mri", &[]), None);
    }
}
