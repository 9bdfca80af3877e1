// ==========================================
// 表格数据交换引擎 - 导出层
// ==========================================
// 流程: 记录 -> 值转换 -> 表格文档 -> CSV/XLSX 字节
// ==========================================

pub mod export_composer;
pub mod file_writer;

pub use export_composer::{ExportComposer, TabularDocument, TabularSheet};
pub use file_writer::{clean_sheet_name, sanitize_sheet_name, write_csv, write_document, write_xlsx};
