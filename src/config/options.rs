// ==========================================
// 表格数据交换引擎 - 单次调用选项
// ==========================================
// ImportOptions: 导入模式 / 表头 / 错误上限 / 重复处理 / 批大小
// ExportOptions: 格式 / 表头 / 工作表名 / 编码与 BOM
// 未指定的项由类型配置或 ExchangeSettings 补齐
// ==========================================

use crate::config::settings::ExchangeSettings;
use crate::domain::types::{ExportFormat, ImportMode, ValidationMode};
use crate::importer::encoding_detector::TextEncoding;
use serde::{Deserialize, Serialize};

// ==========================================
// ImportOptions
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ImportOptions {
    pub mode: Option<ImportMode>,                 // None = 类型默认模式
    pub has_header_row: bool,
    pub max_error_count: Option<usize>,           // None = 配置默认值；0 = 不限制
    pub skip_duplicates: bool,                    // false 时重复数据记为错误
    pub batch_size: Option<usize>,                // None = 配置默认值
    pub validation_mode: Option<ValidationMode>,  // None = 类型默认
}

impl Default for ImportOptions {
    fn default() -> Self {
        Self {
            mode: None,
            has_header_row: true,
            max_error_count: None,
            skip_duplicates: true,
            batch_size: None,
            validation_mode: None,
        }
    }
}

impl ImportOptions {
    pub fn with_mode(mode: ImportMode) -> Self {
        Self {
            mode: Some(mode),
            ..Self::default()
        }
    }

    /// 实际生效的错误上限（None 表示不限制）
    pub fn effective_max_errors(&self, settings: &ExchangeSettings) -> Option<usize> {
        match self.max_error_count.unwrap_or(settings.default_max_error_count) {
            0 => None,
            n => Some(n),
        }
    }

    pub fn effective_batch_size(&self, settings: &ExchangeSettings) -> usize {
        self.batch_size
            .unwrap_or(settings.import_batch_size)
            .max(1)
    }
}

// ==========================================
// ExportOptions
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportOptions {
    pub format: ExportFormat,
    pub include_headers: bool,
    pub sheet_name: Option<String>, // None = 类型配置的工作表名
    pub encoding: TextEncoding,     // 仅 CSV 生效
    pub include_bom: bool,          // 仅 CSV 生效；UTF-16/32 总是写 BOM
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self {
            format: ExportFormat::Xlsx,
            include_headers: true,
            sheet_name: None,
            encoding: TextEncoding::Utf8,
            include_bom: true,
        }
    }
}

impl ExportOptions {
    pub fn csv() -> Self {
        Self {
            format: ExportFormat::Csv,
            ..Self::default()
        }
    }

    pub fn xlsx() -> Self {
        Self::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_effective_max_errors() {
        let settings = ExchangeSettings::default();

        assert_eq!(ImportOptions::default().effective_max_errors(&settings), Some(100));

        let unlimited = ImportOptions {
            max_error_count: Some(0),
            ..ImportOptions::default()
        };
        assert_eq!(unlimited.effective_max_errors(&settings), None);
    }

    #[test]
    fn test_options_deserialize_with_defaults() {
        let options: ImportOptions = serde_json::from_str(r#"{"mode":"ReplaceAll"}"#).unwrap();
        assert_eq!(options.mode, Some(ImportMode::ReplaceAll));
        assert!(options.has_header_row);
        assert!(options.skip_duplicates);

        let export: ExportOptions = serde_json::from_str(r#"{"format":"csv"}"#).unwrap();
        assert_eq!(export.format, ExportFormat::Csv);
        assert!(export.include_headers);
    }
}
