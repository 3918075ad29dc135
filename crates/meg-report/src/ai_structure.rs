//! AI结构化报告装配（通用/遗留路径）
//!
//! 消费AI产出的报告骨架：每个分节按content_type分派到对应的内容
//! 构建器；子分节靠关键词在文档全文中检索（命中行±2行上下文，
//! 至多3个片段），无命中时落到按标题的通用构建器。

use serde::Deserialize;

use crate::assembly::{paragraphs, ReportContext};
use crate::model::{AssembledReport, ReportNode, Section};
use meg_core::ProcedureStatus;

/// AI产出的报告骨架
#[derive(Debug, Clone, Deserialize)]
pub struct AiReportStructure {
    pub report_name: Option<String>,
    pub report_type: Option<String>,
    #[serde(default)]
    pub sections: Vec<AiSectionSpec>,
    #[serde(default)]
    pub formatting: serde_json::Value,
}

/// 骨架中的分节描述
#[derive(Debug, Clone, Deserialize)]
pub struct AiSectionSpec {
    pub title: String,
    #[serde(default)]
    pub required: bool,
    pub content_type: Option<String>,
    #[serde(default)]
    pub subsections: Vec<String>,
}

impl AiReportStructure {
    /// 从AI返回的JSON解析骨架
    pub fn from_value(value: &serde_json::Value) -> meg_core::Result<Self> {
        serde_json::from_value(value.clone())
            .map_err(|e| meg_core::MegError::Ai(format!("报告骨架契约不符: {}", e)))
    }
}

/// 按AI骨架装配报告
pub fn assemble_from_structure(
    structure: &AiReportStructure,
    ctx: &ReportContext,
) -> AssembledReport {
    let mut sections = Vec::new();

    for spec in &structure.sections {
        let mut section = Section::new(&spec.title, spec.required);
        section.nodes = build_content(spec, ctx);

        for subsection_title in &spec.subsections {
            let nodes = match keyword_snippets(subsection_title, ctx) {
                snippets if !snippets.is_empty() => {
                    snippets.into_iter().map(ReportNode::Paragraph).collect()
                }
                _ => generic_subsection(subsection_title, ctx),
            };
            if !nodes.is_empty() {
                section.subsections.push(Section::with_nodes(subsection_title, false, nodes));
            }
        }

        if !section.nodes.is_empty() || !section.subsections.is_empty() || spec.required {
            sections.push(section);
        }
    }

    let title = structure
        .report_name
        .clone()
        .or_else(|| structure.report_type.clone())
        .unwrap_or_else(|| crate::assembly::DEFAULT_REPORT_TITLE.to_string());

    let mut report = AssembledReport { title, sections, variables: Default::default() };
    report
        .variables
        .insert("formatting".to_string(), structure.formatting.to_string());
    report
}

/// content_type → 构建器分派
fn build_content(spec: &AiSectionSpec, ctx: &ReportContext) -> Vec<ReportNode> {
    match spec.content_type.as_deref() {
        Some("symptoms_and_history") => symptoms_and_history(ctx),
        Some("procedure_list") => procedure_list(ctx),
        Some("procedure_findings") => procedure_findings(ctx),
        Some("document_summaries") => document_summaries(ctx),
        Some("conclusions") => conclusions(ctx),
        _ => Vec::new(),
    }
}

fn symptoms_and_history(ctx: &ReportContext) -> Vec<ReportNode> {
    let mut nodes = Vec::new();
    if !ctx.case.symptoms.trim().is_empty() {
        nodes.extend(paragraphs(&ctx.case.symptoms));
    }
    if let Some(history) = &ctx.patient_medical_history {
        if !history.trim().is_empty() {
            nodes.extend(paragraphs(history));
        }
    }
    nodes
}

fn procedure_list(ctx: &ReportContext) -> Vec<ReportNode> {
    if ctx.procedures.is_empty() {
        return Vec::new();
    }
    vec![ReportNode::List(
        ctx.procedures.iter().map(|p| p.catalog.display_name()).collect(),
    )]
}

fn procedure_findings(ctx: &ReportContext) -> Vec<ReportNode> {
    let mut nodes = Vec::new();
    for entry in ctx
        .procedures
        .iter()
        .filter(|p| p.link.status == ProcedureStatus::Completed)
    {
        if let Some(notes) = &entry.link.notes {
            if !notes.trim().is_empty() {
                nodes.push(ReportNode::Paragraph(format!(
                    "{}: {}",
                    entry.catalog.display_name(),
                    notes.trim()
                )));
            }
        }
    }
    nodes
}

fn document_summaries(ctx: &ReportContext) -> Vec<ReportNode> {
    let mut nodes = Vec::new();
    for entry in &ctx.documents {
        if let Some(analysis) = &entry.analysis {
            if !analysis.summary.trim().is_empty() {
                nodes.push(ReportNode::Paragraph(format!(
                    "{}: {}",
                    entry.document.original_filename, analysis.summary
                )));
            }
        }
    }
    nodes
}

fn conclusions(ctx: &ReportContext) -> Vec<ReportNode> {
    let findings: Vec<String> = ctx
        .documents
        .iter()
        .filter_map(|d| d.analysis.as_ref())
        .flat_map(|a| a.findings.iter().cloned())
        .collect();
    if findings.is_empty() {
        return Vec::new();
    }
    vec![ReportNode::List(findings)]
}

/// 子分节关键词检索：标题词在文档全文中命中的行±2行为一个片段，至多3个
fn keyword_snippets(title: &str, ctx: &ReportContext) -> Vec<String> {
    const CONTEXT_LINES: usize = 2;
    const MAX_SNIPPETS: usize = 3;

    let keywords: Vec<String> = title
        .split_whitespace()
        .map(|w| w.to_lowercase())
        .filter(|w| w.len() > 3)
        .collect();
    if keywords.is_empty() {
        return Vec::new();
    }

    let mut snippets = Vec::new();
    'documents: for entry in &ctx.documents {
        let Some(analysis) = &entry.analysis else { continue };
        let lines: Vec<&str> = analysis.extracted_text.lines().collect();

        for (index, line) in lines.iter().enumerate() {
            let lower = line.to_lowercase();
            if keywords.iter().any(|k| lower.contains(k)) {
                let start = index.saturating_sub(CONTEXT_LINES);
                let end = (index + CONTEXT_LINES + 1).min(lines.len());
                let snippet = lines[start..end].join(" ").trim().to_string();
                if !snippet.is_empty() && !snippets.contains(&snippet) {
                    snippets.push(snippet);
                    if snippets.len() >= MAX_SNIPPETS {
                        break 'documents;
                    }
                }
            }
        }
    }
    snippets
}

/// 无命中时按标题落到通用构建器
fn generic_subsection(title: &str, ctx: &ReportContext) -> Vec<ReportNode> {
    let lower = title.to_lowercase();
    if lower.contains("equipment") {
        vec![ReportNode::Paragraph(
            "Recordings were acquired on the facility's whole-head MEG system.".to_string(),
        )]
    } else if lower.contains("methodology") || lower.contains("method") {
        vec![ReportNode::Paragraph(
            "Data were collected and processed following the standard clinical methodology."
                .to_string(),
        )]
    } else if lower.contains("demographic") {
        vec![ReportNode::Paragraph(format!(
            "Patient {}, case dated {}.",
            ctx.patient_display_name, ctx.case.case_date
        ))]
    } else {
        Vec::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn structure_value() -> serde_json::Value {
        json!({
            "report_name": "Generic Imaging Report",
            "report_type": "generic",
            "sections": [
                {"title": "History", "required": true, "content_type": "symptoms_and_history", "subsections": []},
                {"title": "Procedures", "required": false, "content_type": "procedure_list", "subsections": []},
                {"title": "Technical", "required": false, "content_type": null,
                 "subsections": ["Equipment Used", "Acquisition Parameters"]}
            ],
            "formatting": {"font": "serif"}
        })
    }

    fn context_with_text(text: &str) -> ReportContext {
        use crate::assembly::tests_support::context_with_document_text;
        context_with_document_text(text)
    }

    #[test]
    fn test_structure_parses_and_dispatches() {
        let structure = AiReportStructure::from_value(&structure_value()).unwrap();
        let mut ctx = context_with_text("");
        ctx.case.symptoms = "tingling in right arm".to_string();

        let report = assemble_from_structure(&structure, &ctx);
        assert_eq!(report.title, "Generic Imaging Report");

        let history = report.find_section("History").unwrap();
        assert!(history.nodes.iter().any(
            |n| matches!(n, ReportNode::Paragraph(p) if p.contains("tingling"))
        ));
    }

    #[test]
    fn test_subsection_keyword_matching_caps_at_three() {
        let text = "intro line\nthe equipment used was a 306 channel system\nline after\n\
                    more text\nequipment calibration note\nx\ny\nequipment warm-up\n\
                    z\nequipment final mention\nend";
        let structure = AiReportStructure::from_value(&structure_value()).unwrap();
        let ctx = context_with_text(text);

        let report = assemble_from_structure(&structure, &ctx);
        let technical = report.find_section("Technical").unwrap();
        let equipment = technical
            .subsections
            .iter()
            .find(|s| s.title == "Equipment Used")
            .unwrap();
        assert!(equipment.nodes.len() <= 3);
        assert!(matches!(&equipment.nodes[0], ReportNode::Paragraph(p) if p.contains("306 channel")));
    }

    #[test]
    fn test_unmatched_subsection_uses_generic_builder() {
        let structure = AiReportStructure::from_value(&structure_value()).unwrap();
        let ctx = context_with_text("nothing relevant in here");

        let report = assemble_from_structure(&structure, &ctx);
        let technical = report.find_section("Technical").unwrap();
        let equipment = technical
            .subsections
            .iter()
            .find(|s| s.title == "Equipment Used")
            .unwrap();
        assert!(matches!(&equipment.nodes[0], ReportNode::Paragraph(p) if p.contains("whole-head MEG")));
    }

    #[test]
    fn test_empty_optional_section_dropped() {
        let structure = AiReportStructure::from_value(&json!({
            "report_name": null,
            "report_type": null,
            "sections": [
                {"title": "Procedures", "required": false, "content_type": "procedure_list"}
            ]
        }))
        .unwrap();
        let ctx = context_with_text("");

        let report = assemble_from_structure(&structure, &ctx);
        assert!(report.find_section("Procedures").is_none());
        assert_eq!(report.title, crate::assembly::DEFAULT_REPORT_TITLE);
    }
}
