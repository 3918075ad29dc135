//! 报告文档模型
//!
//! 装配产出结构化节点而非字面标记，导出管线负责把同一套节点
//! 渲染到各目标格式。

use std::collections::HashMap;

/// 报告内容节点
#[derive(Debug, Clone, PartialEq)]
pub enum ReportNode {
    /// 一个段落（已按空行规范化，段内换行折叠）
    Paragraph(String),
    /// 无序列表
    List(Vec<String>),
    /// 内嵌图像，展示宽度上限700px、保持纵横比
    Image {
        data_base64: String,
        mime_type: String,
        caption: String,
    },
}

/// 图像展示宽度上限（像素）
pub const IMAGE_MAX_WIDTH_PX: u32 = 700;

/// 报告分节
#[derive(Debug, Clone)]
pub struct Section {
    pub title: String,
    pub required: bool,
    pub nodes: Vec<ReportNode>,
    pub subsections: Vec<Section>,
}

impl Section {
    pub fn new(title: &str, required: bool) -> Self {
        Self {
            title: title.to_string(),
            required,
            nodes: Vec::new(),
            subsections: Vec::new(),
        }
    }

    pub fn with_nodes(title: &str, required: bool, nodes: Vec<ReportNode>) -> Self {
        Self { title: title.to_string(), required, nodes, subsections: Vec::new() }
    }
}

/// 装配完成的报告
#[derive(Debug, Clone)]
pub struct AssembledReport {
    pub title: String,
    pub sections: Vec<Section>,
    /// 扁平模板变量（患者展示字段、病例字段、格式指令）
    pub variables: HashMap<String, String>,
}

impl AssembledReport {
    /// 按序返回分节标题，测试与调用方判定分节存在性用
    pub fn section_titles(&self) -> Vec<&str> {
        self.sections.iter().map(|s| s.title.as_str()).collect()
    }

    pub fn find_section(&self, title: &str) -> Option<&Section> {
        self.sections.iter().find(|s| s.title == title)
    }
}
