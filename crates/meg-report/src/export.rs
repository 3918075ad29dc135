//! 报告导出管线
//!
//! 把装配好的节点模型渲染到目标格式。HTML/TXT/RTF由本管线直接
//! 生成；PDF/DOCX交给渲染协作方接口，协作方缺失时确定性回退到
//! HTML字节并记录error日志，绝不阻断用户取报告。

use async_trait::async_trait;
use meg_core::Result;

use crate::model::{AssembledReport, ReportNode, Section, IMAGE_MAX_WIDTH_PX};

/// 导出目标格式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Pdf,
    Docx,
    Rtf,
    Html,
    Txt,
}

impl ExportFormat {
    pub fn parse(value: &str) -> Option<Self> {
        match value.to_lowercase().as_str() {
            "pdf" => Some(ExportFormat::Pdf),
            "docx" => Some(ExportFormat::Docx),
            "rtf" => Some(ExportFormat::Rtf),
            "html" => Some(ExportFormat::Html),
            "txt" => Some(ExportFormat::Txt),
            _ => None,
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            ExportFormat::Pdf => "pdf",
            ExportFormat::Docx => "docx",
            ExportFormat::Rtf => "rtf",
            ExportFormat::Html => "html",
            ExportFormat::Txt => "txt",
        }
    }

    pub fn mime_type(&self) -> &'static str {
        match self {
            ExportFormat::Pdf => "application/pdf",
            ExportFormat::Docx => {
                "application/vnd.openxmlformats-officedocument.wordprocessingml.document"
            }
            ExportFormat::Rtf => "application/rtf",
            ExportFormat::Html => "text/html",
            ExportFormat::Txt => "text/plain",
        }
    }
}

/// 导出产物
#[derive(Debug, Clone)]
pub struct ExportedFile {
    pub content: Vec<u8>,
    pub filename: String,
    pub mime_type: String,
}

/// PDF/DOCX渲染协作方接口（由具体渲染库在外部实现）
#[async_trait]
pub trait DocumentRenderer: Send + Sync {
    async fn render(&self, report: &AssembledReport) -> Result<Vec<u8>>;
}

/// 报告导出器
pub struct ReportExporter {
    pdf_renderer: Option<Box<dyn DocumentRenderer>>,
    docx_renderer: Option<Box<dyn DocumentRenderer>>,
}

impl ReportExporter {
    pub fn new(
        pdf_renderer: Option<Box<dyn DocumentRenderer>>,
        docx_renderer: Option<Box<dyn DocumentRenderer>>,
    ) -> Self {
        Self { pdf_renderer, docx_renderer }
    }

    /// 无外部渲染库的导出器（PDF/DOCX回退为HTML）
    pub fn without_renderers() -> Self {
        Self { pdf_renderer: None, docx_renderer: None }
    }

    /// 导出报告到指定格式
    pub async fn export(&self, report: &AssembledReport, format: ExportFormat) -> ExportedFile {
        let base_name = sanitize_filename(&report.title);

        match format {
            ExportFormat::Html => self.file(render_html(report).into_bytes(), &base_name, format),
            ExportFormat::Txt => self.file(render_txt(report).into_bytes(), &base_name, format),
            ExportFormat::Rtf => self.file(render_rtf(report).into_bytes(), &base_name, format),
            ExportFormat::Pdf => {
                self.render_or_fallback(report, &self.pdf_renderer, &base_name, format)
                    .await
            }
            ExportFormat::Docx => {
                self.render_or_fallback(report, &self.docx_renderer, &base_name, format)
                    .await
            }
        }
    }

    async fn render_or_fallback(
        &self,
        report: &AssembledReport,
        renderer: &Option<Box<dyn DocumentRenderer>>,
        base_name: &str,
        format: ExportFormat,
    ) -> ExportedFile {
        if let Some(renderer) = renderer {
            match renderer.render(report).await {
                Ok(content) => return self.file(content, base_name, format),
                Err(e) => {
                    tracing::error!(
                        format = format.extension(),
                        error = %e,
                        "Document renderer failed, falling back to HTML"
                    );
                }
            }
        } else {
            tracing::error!(
                format = format.extension(),
                "No renderer configured, falling back to HTML"
            );
        }
        self.file(render_html(report).into_bytes(), base_name, ExportFormat::Html)
    }

    fn file(&self, content: Vec<u8>, base_name: &str, format: ExportFormat) -> ExportedFile {
        ExportedFile {
            content,
            filename: format!("{}.{}", base_name, format.extension()),
            mime_type: format.mime_type().to_string(),
        }
    }
}

fn sanitize_filename(title: &str) -> String {
    let cleaned: String = title
        .chars()
        .map(|c| if c.is_alphanumeric() { c.to_ascii_lowercase() } else { '_' })
        .collect();
    let trimmed = cleaned.trim_matches('_');
    if trimmed.is_empty() {
        "report".to_string()
    } else {
        trimmed.to_string()
    }
}

// ========== HTML ==========

fn render_html(report: &AssembledReport) -> String {
    let mut html = String::new();
    html.push_str("<!DOCTYPE html>\n<html>\n<head>\n<meta charset=\"utf-8\">\n");
    html.push_str(&format!("<title>{}</title>\n", escape_html(&report.title)));
    html.push_str(
        "<style>body { font-family: serif; margin: 2em; } \
         table.figure { page-break-inside: avoid; margin: 1em 0; } \
         td.caption { font-style: italic; font-size: 0.9em; }</style>\n",
    );
    html.push_str("</head>\n<body>\n");
    html.push_str(&format!("<h1>{}</h1>\n", escape_html(&report.title)));

    for section in &report.sections {
        render_section_html(&mut html, section, 2);
    }

    html.push_str("</body>\n</html>\n");
    html
}

fn render_section_html(html: &mut String, section: &Section, level: usize) {
    let level = level.min(6);
    html.push_str(&format!("<h{}>{}</h{}>\n", level, escape_html(&section.title), level));
    for node in &section.nodes {
        render_node_html(html, node);
    }
    for subsection in &section.subsections {
        render_section_html(html, subsection, level + 1);
    }
}

fn render_node_html(html: &mut String, node: &ReportNode) {
    match node {
        ReportNode::Paragraph(text) => {
            html.push_str(&format!("<p>{}</p>\n", escape_html(text)));
        }
        ReportNode::List(items) => {
            html.push_str("<ul>\n");
            for item in items {
                html.push_str(&format!("<li>{}</li>\n", escape_html(item)));
            }
            html.push_str("</ul>\n");
        }
        ReportNode::Image { data_base64, mime_type, caption } => {
            // 表格包装提示渲染器避免跨页断开
            html.push_str("<table class=\"figure\"><tr><td>");
            html.push_str(&format!(
                "<img src=\"data:{};base64,{}\" style=\"max-width: {}px; height: auto;\" alt=\"{}\">",
                mime_type,
                data_base64,
                IMAGE_MAX_WIDTH_PX,
                escape_html(caption)
            ));
            html.push_str("</td></tr><tr><td class=\"caption\">");
            html.push_str(&escape_html(caption));
            html.push_str("</td></tr></table>\n");
        }
    }
}

fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

// ========== TXT ==========

fn render_txt(report: &AssembledReport) -> String {
    let mut out = String::new();
    out.push_str(&report.title);
    out.push('\n');
    out.push_str(&"=".repeat(report.title.chars().count()));
    out.push_str("\n\n");

    for section in &report.sections {
        render_section_txt(&mut out, section, 0);
    }
    out
}

fn render_section_txt(out: &mut String, section: &Section, depth: usize) {
    let indent = "  ".repeat(depth);
    out.push_str(&format!("{}{}\n", indent, section.title));
    out.push_str(&format!("{}{}\n\n", indent, "-".repeat(section.title.chars().count())));

    for node in &section.nodes {
        match node {
            ReportNode::Paragraph(text) => {
                out.push_str(&format!("{}{}\n\n", indent, text));
            }
            ReportNode::List(items) => {
                for item in items {
                    out.push_str(&format!("{}- {}\n", indent, item));
                }
                out.push('\n');
            }
            ReportNode::Image { caption, .. } => {
                out.push_str(&format!("{}[Image: {}]\n\n", indent, caption));
            }
        }
    }

    for subsection in &section.subsections {
        render_section_txt(out, subsection, depth + 1);
    }
}

// ========== RTF ==========

fn render_rtf(report: &AssembledReport) -> String {
    let mut out = String::from("{\\rtf1\\ansi\\deff0{\\fonttbl{\\f0 Times New Roman;}}\n");
    out.push_str(&format!("{{\\b\\fs32 {}}}\\par\\par\n", escape_rtf(&report.title)));

    for section in &report.sections {
        render_section_rtf(&mut out, section);
    }
    out.push('}');
    out
}

fn render_section_rtf(out: &mut String, section: &Section) {
    out.push_str(&format!("{{\\b\\fs26 {}}}\\par\n", escape_rtf(&section.title)));
    for node in &section.nodes {
        match node {
            ReportNode::Paragraph(text) => {
                out.push_str(&format!("{}\\par\\par\n", escape_rtf(text)));
            }
            ReportNode::List(items) => {
                for item in items {
                    out.push_str(&format!("\\bullet  {}\\par\n", escape_rtf(item)));
                }
                out.push_str("\\par\n");
            }
            ReportNode::Image { caption, .. } => {
                out.push_str(&format!("{{\\i [Image: {}]}}\\par\\par\n", escape_rtf(caption)));
            }
        }
    }
    for subsection in &section.subsections {
        render_section_rtf(out, subsection);
    }
}

fn escape_rtf(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '{' => out.push_str("\\{"),
            '}' => out.push_str("\\}"),
            c if (c as u32) > 127 => out.push_str(&format!("\\u{}?", c as i32)),
            c => out.push(c),
        }
    }
    out
}
