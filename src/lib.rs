// ==========================================
// 表格数据交换引擎 - 核心库
// ==========================================
// 定位: 配置驱动的 CSV/XLSX 导入导出
// 技术栈: Rust + calamine/csv/rust_xlsxwriter + SQLite
// ==========================================

// ==========================================
// 模块声明
// ==========================================

// 领域层 - 记录、字段值、导入结果
pub mod domain;

// 类型配置层 - 字段映射声明
pub mod schema;

// 导入层 - 解析、校验、转换、对账
pub mod importer;

// 导出层 - 编排与写出
pub mod exporter;

// 对象存储层
pub mod repository;

// 配置层 - 引擎配置与调用选项
pub mod config;

// 数据库基础设施（连接初始化/PRAGMA 统一）
pub mod db;

// 日志系统
pub mod logging;

// 错误类型
pub mod error;

// API 层 - 导入导出入口
pub mod api;

// ==========================================
// 重导出核心类型
// ==========================================

pub use api::DataExchangeApi;
pub use config::{ExchangeSettings, ExportOptions, ImportOptions};
pub use domain::{
    ErrorKind, ExportFormat, FieldValue, ImportMessage, ImportMode, ImportOutcome, Record,
    RecordId, ValidationMode, ValueKind,
};
pub use error::{ExchangeError, ExchangeResult};
pub use importer::{ConverterRegistry, TabularImporter, TextEncoding};
pub use repository::{Criteria, InMemoryObjectStore, PersistentObjectStore, SqliteObjectStore};
pub use schema::{CollectionOptions, FieldConfiguration, ReferenceOptions, TypeDescriptor, TypeRegistry};

// 库版本
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }
}
