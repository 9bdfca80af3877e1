// ==========================================
// 表格数据交换引擎 - 导入层
// ==========================================
// 流程: 字节 -> 编码探测(CSV) -> 表格解析 -> 校验 -> 转换 -> 对账
// 支持: CSV, Excel (.xlsx/.xls/.ods)，多工作表主从导入
// ==========================================

// 模块声明
pub mod converter_registry;
pub mod datetime_corrector;
pub mod detail_importer;
pub mod encoding_detector;
pub mod field_validator;
pub mod file_parser;
pub mod importer_trait;
pub mod lookup_resolver;
pub mod reconciler;
pub mod value_converter;

// 重导出核心类型
pub use converter_registry::{ConverterRegistry, ExportConverterFn, ImportConverterFn};
pub use datetime_corrector::DateCorrection;
pub use encoding_detector::{decode, encode, EncodingDetectionResult, EncodingDetector, TextEncoding};
pub use field_validator::FieldValidator;
pub use file_parser::{
    CsvParser, ExcelParser, ParseOptions, ParsedDocument, ParsedFile, UniversalFileParser,
};
pub use lookup_resolver::{LookupOutcome, LookupResolver};
pub use reconciler::{ImportReconciler, ReconcilePolicy};
pub use value_converter::ValueConverter;

// 重导出 Trait 接口
pub use importer_trait::{FileParser, TabularImporter};
