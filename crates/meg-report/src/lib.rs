//! # MEG Report
//!
//! 报告装配引擎与导出管线：标准MEG报告路径合成有序分节，
//! AI结构化路径按骨架分派内容构建器；导出管线把同一套节点模型
//! 渲染为PDF/DOCX/RTF/HTML/TXT。

pub mod ai_structure;
pub mod assembly;
pub mod export;
pub mod model;
pub mod report_data;

pub use ai_structure::{assemble_from_structure, AiReportStructure, AiSectionSpec};
pub use assembly::{
    assemble_standard_report, AssignmentEntry, DocumentEntry, ProcedureEntry, ReportContext,
    DEFAULT_REPORT_TITLE, FINDINGS_PLACEHOLDER,
};
pub use export::{DocumentRenderer, ExportFormat, ExportedFile, ReportExporter};
pub use model::{AssembledReport, ReportNode, Section};
pub use report_data::ReportData;
