// ==========================================
// 表格数据交换引擎 - 领域类型定义
// ==========================================
// 职责: 导入模式 / 校验模式 / 集合导出模式 / 错误类别等枚举
// 序列化格式: 与配置表、导入报告中的字符串保持一致
// ==========================================

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// ==========================================
// 导入模式 (Reconciliation Mode)
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum ImportMode {
    CreateOnly,     // 仅新增（已存在则跳过）
    UpdateOnly,     // 仅更新（不存在则跳过）
    #[default]
    CreateOrUpdate, // 新增或更新（Upsert）
    ReplaceAll,     // 先清空该类型全部记录，再逐行新增
}

impl fmt::Display for ImportMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ImportMode::CreateOnly => write!(f, "CreateOnly"),
            ImportMode::UpdateOnly => write!(f, "UpdateOnly"),
            ImportMode::CreateOrUpdate => write!(f, "CreateOrUpdate"),
            ImportMode::ReplaceAll => write!(f, "ReplaceAll"),
        }
    }
}

impl FromStr for ImportMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "createonly" | "create" => Ok(ImportMode::CreateOnly),
            "updateonly" | "update" => Ok(ImportMode::UpdateOnly),
            "createorupdate" | "upsert" => Ok(ImportMode::CreateOrUpdate),
            "replaceall" | "replace" => Ok(ImportMode::ReplaceAll),
            other => Err(format!("未知导入模式: {}", other)),
        }
    }
}

// ==========================================
// 校验严格度 (Validation Mode)
// ==========================================
// Lenient: 失败行跳过，继续处理
// Strict: 第一个校验失败即中止整批
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum ValidationMode {
    #[default]
    Lenient,
    Strict,
}

// ==========================================
// 集合字段导出模式
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum CollectionExportMode {
    #[default]
    Summary,    // 拼接为摘要字符串
    Count,      // 仅导出数量
    MultiSheet, // 拆分为独立明细表
}

// ==========================================
// 导出文件格式
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    Csv,
    #[default]
    Xlsx,
}

impl FromStr for ExportFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().trim_start_matches('.').to_lowercase().as_str() {
            "csv" => Ok(ExportFormat::Csv),
            "xlsx" => Ok(ExportFormat::Xlsx),
            other => Err(format!("不支持的导出格式: {}", other)),
        }
    }
}

// ==========================================
// 导入消息类别 (Error Kind)
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorKind {
    ParseError,         // 文件/行格式错误
    RequiredFieldEmpty, // 必填字段为空
    ValidationFailed,   // 格式/正则校验失败
    DataTypeConversion, // 类型转换失败
    DuplicateData,      // 重复数据（跳过场景下为警告）
    LookupError,        // 引用对象未找到/自动创建失败
    SystemError,        // 配置/存储等系统错误
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            ErrorKind::ParseError => "ParseError",
            ErrorKind::RequiredFieldEmpty => "RequiredFieldEmpty",
            ErrorKind::ValidationFailed => "ValidationFailed",
            ErrorKind::DataTypeConversion => "DataTypeConversion",
            ErrorKind::DuplicateData => "DuplicateData",
            ErrorKind::LookupError => "LookupError",
            ErrorKind::SystemError => "SystemError",
        };
        write!(f, "{}", text)
    }
}

// ==========================================
// 字段值类型
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValueKind {
    Text,
    Integer,
    Decimal,
    Boolean,
    Date,
    DateTime,
    /// 枚举字面量列表（声明顺序）
    Enum(Vec<String>),
    /// 引用目标类型名（由存储层解析）
    Reference(String),
    /// 子对象集合（元素类型名）
    Collection(String),
}

impl ValueKind {
    /// 值类型：空值时取零值并给出警告
    pub fn is_value_type(&self) -> bool {
        matches!(
            self,
            ValueKind::Integer
                | ValueKind::Decimal
                | ValueKind::Boolean
                | ValueKind::Date
                | ValueKind::DateTime
                | ValueKind::Enum(_)
        )
    }

    pub fn is_temporal(&self) -> bool {
        matches!(self, ValueKind::Date | ValueKind::DateTime)
    }

    pub fn is_numeric(&self) -> bool {
        matches!(self, ValueKind::Integer | ValueKind::Decimal)
    }
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValueKind::Text => write!(f, "Text"),
            ValueKind::Integer => write!(f, "Integer"),
            ValueKind::Decimal => write!(f, "Decimal"),
            ValueKind::Boolean => write!(f, "Boolean"),
            ValueKind::Date => write!(f, "Date"),
            ValueKind::DateTime => write!(f, "DateTime"),
            ValueKind::Enum(_) => write!(f, "Enum"),
            ValueKind::Reference(target) => write!(f, "Reference<{}>", target),
            ValueKind::Collection(item) => write!(f, "Collection<{}>", item),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_import_mode_from_str() {
        assert_eq!("upsert".parse::<ImportMode>(), Ok(ImportMode::CreateOrUpdate));
        assert_eq!("ReplaceAll".parse::<ImportMode>(), Ok(ImportMode::ReplaceAll));
        assert!("merge".parse::<ImportMode>().is_err());
    }

    #[test]
    fn test_export_format_from_str() {
        assert_eq!(".XLSX".parse::<ExportFormat>(), Ok(ExportFormat::Xlsx));
        assert_eq!("csv".parse::<ExportFormat>(), Ok(ExportFormat::Csv));
    }

    #[test]
    fn test_value_kind_classification() {
        assert!(ValueKind::Integer.is_value_type());
        assert!(!ValueKind::Text.is_value_type());
        assert!(!ValueKind::Reference("Dept".to_string()).is_value_type());
        assert!(ValueKind::DateTime.is_temporal());
    }
}
