// ==========================================
// 表格数据交换引擎 - 领域层
// ==========================================
// 职责: 记录/字段值模型、导入结果模型、基础枚举
// ==========================================

pub mod outcome;
pub mod types;
pub mod value;

// 重导出核心类型
pub use outcome::{
    ConversionResult, ImportMessage, ImportOutcome, RowRecord, SheetRows, ValidationResult,
};
pub use types::{
    CollectionExportMode, ErrorKind, ExportFormat, ImportMode, ValidationMode, ValueKind,
};
pub use value::{FieldValue, Record, RecordId};
