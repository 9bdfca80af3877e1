// ==========================================
// 表格数据交换引擎 - 字段校验
// ==========================================
// 职责: 单字段校验管道，产出结构化 ValidationResult
// 顺序: 必填 -> 正则 -> 格式 -> 类型兼容
// 枚举字段配置了显示映射时，格式校验通过即不再做类型兼容检查
// ==========================================

use crate::domain::outcome::ValidationResult;
use crate::domain::types::{ErrorKind, ValueKind};
use crate::importer::converter_registry::ConverterRegistry;
use crate::importer::value_converter::ValueConverter;
use crate::schema::field_config::FieldConfiguration;

pub struct FieldValidator<'a> {
    converter: &'a ValueConverter<'a>,
    converters: &'a ConverterRegistry,
}

impl<'a> FieldValidator<'a> {
    pub fn new(converter: &'a ValueConverter<'a>, converters: &'a ConverterRegistry) -> Self {
        Self {
            converter,
            converters,
        }
    }

    /// 校验单个字段的原始值
    ///
    /// # 参数
    /// - raw: 单元格原始文本
    /// - field: 字段配置
    /// - row_number: 源文件行号（写入结果）
    pub fn validate(&self, raw: &str, field: &FieldConfiguration, row_number: usize) -> ValidationResult {
        let value = raw.trim();
        let has_replacement = field
            .null_value
            .as_deref()
            .map(|v| !v.trim().is_empty())
            .unwrap_or(false);

        // ===== 必填 =====
        if value.is_empty() {
            if field.required && !has_replacement {
                return ValidationResult::fail(
                    &field.property,
                    row_number,
                    ErrorKind::RequiredFieldEmpty,
                    format!("{} 不能为空", field.column()),
                );
            }
            return ValidationResult::pass(&field.property, row_number);
        }

        // ===== 正则 =====
        if let Some(rule) = &field.validation {
            if let Some(regex) = rule.regex() {
                if !regex.is_match(value) {
                    let message = if rule.message.is_empty() {
                        format!("{} 的值 {} 不符合规则 {}", field.column(), value, rule.pattern)
                    } else {
                        rule.message.clone()
                    };
                    return ValidationResult::fail(
                        &field.property,
                        row_number,
                        ErrorKind::ValidationFailed,
                        message,
                    );
                }
            }
        }

        // ===== 自定义转换器 =====
        if let Some(name) = field.import_converter.as_deref() {
            if !self.converters.has_import(name) {
                return ValidationResult::fail(
                    &field.property,
                    row_number,
                    ErrorKind::SystemError,
                    format!("{} 的导入转换器 {} 未注册", field.column(), name),
                );
            }
            // 交给转换器判定
            return ValidationResult::pass(&field.property, row_number);
        }

        // ===== 格式 =====
        let display_map = field.display_map();
        let format_checked = !display_map.is_empty();
        if format_checked {
            if let ValueKind::Enum(literals) = &field.kind {
                let lower = value.to_lowercase();
                let accepted = display_map
                    .iter()
                    .any(|(_, label)| label.to_lowercase() == lower)
                    || literals.iter().any(|l| l.to_lowercase() == lower);
                if !accepted {
                    let labels: Vec<&str> = display_map.iter().map(|(_, l)| l.as_str()).collect();
                    return ValidationResult::fail(
                        &field.property,
                        row_number,
                        ErrorKind::ValidationFailed,
                        format!(
                            "{} 的值 {} 不在可选范围内: {}",
                            field.column(),
                            value,
                            labels.join(", ")
                        ),
                    );
                }
                return ValidationResult::pass(&field.property, row_number);
            }
        }

        // ===== 类型兼容 =====
        if matches!(field.kind, ValueKind::Reference(_) | ValueKind::Text) {
            return ValidationResult::pass(&field.property, row_number);
        }

        let converted = self.converter.import_value(value, field);
        if converted.success {
            ValidationResult::pass(&field.property, row_number)
        } else {
            ValidationResult::fail(
                &field.property,
                row_number,
                ErrorKind::DataTypeConversion,
                format!(
                    "{}: {}",
                    field.column(),
                    converted.error.unwrap_or_else(|| format!("无法转换为 {}", field.kind))
                ),
            )
        }
    }
}
