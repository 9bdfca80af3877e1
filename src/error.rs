// ==========================================
// 表格数据交换引擎 - 错误类型
// ==========================================
// 工具: thiserror 派生宏
// 说明: 行级/字段级问题不走 Err，而是记录进 ImportOutcome；
//       这里只描述会中断整个调用的错误
// ==========================================

use crate::repository::error::StoreError;
use thiserror::Error;

/// 数据交换错误类型
#[derive(Error, Debug)]
pub enum ExchangeError {
    // ===== 文件相关错误 =====
    #[error("文件不存在: {0}")]
    FileNotFound(String),

    #[error("文件格式不支持: {0}（仅支持 .xlsx/.csv）")]
    UnsupportedFormat(String),

    #[error("文件读取失败: {0}")]
    FileReadError(String),

    #[error("Excel 解析失败: {0}")]
    ExcelParseError(String),

    #[error("CSV 解析失败: {0}")]
    CsvParseError(String),

    #[error("Excel 写出失败: {0}")]
    XlsxWriteError(String),

    #[error("文本编码失败 ({encoding}): {message}")]
    EncodingError { encoding: String, message: String },

    // ===== 配置错误 =====
    #[error("类型配置错误 ({type_name}): {}", .problems.join("; "))]
    Configuration {
        type_name: String,
        problems: Vec<String>,
    },

    #[error("未注册的记录类型: {0}")]
    UnknownType(String),

    #[error("类型 {0} 未启用导入")]
    ImportDisabled(String),

    #[error("类型 {0} 未启用导出")]
    ExportDisabled(String),

    #[error("自定义转换器未注册: {0}")]
    ConverterNotFound(String),

    #[error("字段转换失败 (字段 {field}): {message}")]
    Conversion { field: String, message: String },

    // ===== 存储错误 =====
    #[error("对象存储错误: {0}")]
    Store(#[from] StoreError),

    // ===== 通用错误 =====
    #[error("内部错误: {0}")]
    InternalError(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl From<std::io::Error> for ExchangeError {
    fn from(err: std::io::Error) -> Self {
        match err.kind() {
            std::io::ErrorKind::NotFound => ExchangeError::FileNotFound(err.to_string()),
            _ => ExchangeError::FileReadError(err.to_string()),
        }
    }
}

impl From<csv::Error> for ExchangeError {
    fn from(err: csv::Error) -> Self {
        ExchangeError::CsvParseError(err.to_string())
    }
}

impl From<calamine::XlsxError> for ExchangeError {
    fn from(err: calamine::XlsxError) -> Self {
        ExchangeError::ExcelParseError(err.to_string())
    }
}

impl From<rust_xlsxwriter::XlsxError> for ExchangeError {
    fn from(err: rust_xlsxwriter::XlsxError) -> Self {
        ExchangeError::XlsxWriteError(err.to_string())
    }
}

/// Result 类型别名
pub type ExchangeResult<T> = Result<T, ExchangeError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_configuration_error_lists_problems() {
        let err = ExchangeError::Configuration {
            type_name: "Employee".to_string(),
            problems: vec!["列名重复: 工号".to_string(), "列序号重复: 2".to_string()],
        };

        let text = err.to_string();
        assert!(text.contains("Employee"));
        assert!(text.contains("列名重复: 工号; 列序号重复: 2"));
    }

    #[test]
    fn test_io_not_found_maps_to_file_not_found() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "missing.csv");
        assert!(matches!(ExchangeError::from(io), ExchangeError::FileNotFound(_)));
    }
}
