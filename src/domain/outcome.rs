// ==========================================
// 表格数据交换引擎 - 解析/转换/校验/导入结果模型
// ==========================================
// 职责: RowRecord / ConversionResult / ValidationResult / ImportOutcome
// 生命周期: RowRecord 与 ConversionResult 逐行创建、用后即弃；
//           ImportOutcome 在一次导入中增量构建，无论成败都返回给调用方
// ==========================================

use crate::domain::types::ErrorKind;
use crate::domain::value::FieldValue;
use crate::importer::encoding_detector::EncodingDetectionResult;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

// ==========================================
// RowRecord - 解析后的一行
// ==========================================
// 列对齐按位置：空表头列保留占位，不会挤占后续列
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RowRecord {
    pub row_number: usize, // 源文件中的物理行号（1 起）
    pub values: IndexMap<String, String>,
}

impl RowRecord {
    pub fn new(row_number: usize) -> Self {
        Self {
            row_number,
            values: IndexMap::new(),
        }
    }

    /// 按列名取值（缺列视为空串）
    pub fn get(&self, column: &str) -> &str {
        self.values.get(column).map(|s| s.as_str()).unwrap_or("")
    }

    /// 按列位置取值（0 起）
    pub fn get_at(&self, index: usize) -> &str {
        self.values
            .get_index(index)
            .map(|(_, v)| v.as_str())
            .unwrap_or("")
    }

    pub fn is_blank(&self) -> bool {
        self.values.values().all(|v| v.trim().is_empty())
    }
}

// ==========================================
// SheetRows - 单个工作表的行集
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SheetRows {
    pub name: String,
    pub headers: Vec<String>,
    pub rows: Vec<RowRecord>,
}

// ==========================================
// ConversionResult - 单字段转换结果
// ==========================================
#[derive(Debug, Clone, PartialEq)]
pub struct ConversionResult {
    pub success: bool,
    pub value: FieldValue,
    pub warning: Option<String>,
    pub error: Option<String>,
}

impl ConversionResult {
    pub fn ok(value: FieldValue) -> Self {
        Self {
            success: true,
            value,
            warning: None,
            error: None,
        }
    }

    pub fn ok_with_warning(value: FieldValue, warning: impl Into<String>) -> Self {
        Self {
            success: true,
            value,
            warning: Some(warning.into()),
            error: None,
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            success: false,
            value: FieldValue::Null,
            warning: None,
            error: Some(error.into()),
        }
    }

    pub fn has_warning(&self) -> bool {
        self.warning.is_some()
    }

    /// 合并前一阶段的警告（例如日期自动修正）
    pub fn prepend_warning(mut self, warning: Option<String>) -> Self {
        if let Some(earlier) = warning {
            self.warning = Some(match self.warning.take() {
                Some(later) => format!("{}; {}", earlier, later),
                None => earlier,
            });
        }
        self
    }
}

// ==========================================
// ValidationResult - 单字段校验结果
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationResult {
    pub is_valid: bool,
    pub field: String,
    pub row_number: usize,
    pub kind: Option<ErrorKind>,
    pub message: String,
}

impl ValidationResult {
    pub fn pass(field: &str, row_number: usize) -> Self {
        Self {
            is_valid: true,
            field: field.to_string(),
            row_number,
            kind: None,
            message: String::new(),
        }
    }

    pub fn fail(field: &str, row_number: usize, kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            is_valid: false,
            field: field.to_string(),
            row_number,
            kind: Some(kind),
            message: message.into(),
        }
    }
}

// ==========================================
// ImportMessage - 导入错误/警告条目
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImportMessage {
    pub row_number: usize,
    pub sheet: Option<String>,
    pub field: Option<String>,
    pub kind: ErrorKind,
    pub message: String,
}

impl ImportMessage {
    pub fn new(row_number: usize, kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            row_number,
            sheet: None,
            field: None,
            kind,
            message: message.into(),
        }
    }

    pub fn with_field(mut self, field: impl Into<String>) -> Self {
        self.field = Some(field.into());
        self
    }

    pub fn with_sheet(mut self, sheet: Option<&str>) -> Self {
        self.sheet = sheet.map(|s| s.to_string());
        self
    }
}

impl From<ValidationResult> for ImportMessage {
    fn from(result: ValidationResult) -> Self {
        ImportMessage {
            row_number: result.row_number,
            sheet: None,
            field: Some(result.field),
            kind: result.kind.unwrap_or(ErrorKind::ValidationFailed),
            message: result.message,
        }
    }
}

// ==========================================
// ImportOutcome - 一次导入的汇总
// ==========================================
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ImportOutcome {
    pub total_rows: usize,    // 参与处理的行数
    pub success_count: usize, // 成功写入（新增 + 更新）
    pub failure_count: usize, // 失败行
    pub created: usize,
    pub updated: usize,
    pub skipped: usize,       // 按模式跳过（已存在/不存在）
    pub aborted: bool,        // 严格模式或错误上限触发的提前终止
    pub errors: Vec<ImportMessage>,
    pub warnings: Vec<ImportMessage>,
    pub encoding: Option<EncodingDetectionResult>,
}

impl ImportOutcome {
    pub fn record_error(&mut self, message: ImportMessage) {
        self.errors.push(message);
    }

    pub fn record_warning(&mut self, message: ImportMessage) {
        self.warnings.push(message);
    }

    pub fn is_clean(&self) -> bool {
        self.errors.is_empty() && !self.aborted
    }
}
