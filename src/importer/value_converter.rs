// ==========================================
// 表格数据交换引擎 - 字段值转换器
// ==========================================
// 职责: 原始文本 <-> 强类型字段值（双向）
// 导入顺序: 空值处理 -> 自定义转换器 -> 按类型解析
// 日期: 容错修正 -> 配置格式 -> 常用格式列表 -> RFC3339 -> Excel 序列号
// 引用字段: 只返回原始文本，由对账阶段按存储解析
// ==========================================

use crate::config::settings::ExchangeSettings;
use crate::domain::outcome::ConversionResult;
use crate::domain::types::ValueKind;
use crate::domain::value::FieldValue;
use crate::error::{ExchangeError, ExchangeResult};
use crate::importer::converter_registry::ConverterRegistry;
use crate::importer::datetime_corrector::{self, DateCorrection};
use crate::schema::field_config::FieldConfiguration;
use chrono::{DateTime, Datelike, Duration, NaiveDate, NaiveDateTime, NaiveTime};
use std::fmt::Write;

// 常用日期时间格式（按优先级）
const DATETIME_PATTERNS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y/%m/%d %H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%Y/%m/%d %H:%M",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%d/%m/%Y %H:%M:%S",
    "%m/%d/%Y %H:%M:%S",
    "%Y%m%d%H%M%S",
];

const DATE_PATTERNS: &[&str] = &[
    "%Y-%m-%d",
    "%Y/%m/%d",
    "%Y.%m.%d",
    "%Y年%m月%d日",
    "%d/%m/%Y",
    "%m/%d/%Y",
    "%d.%m.%Y",
    "%Y%m%d",
    "%d-%b-%Y",
];

const DEFAULT_DATE_FORMAT: &str = "%Y-%m-%d";
const DEFAULT_DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

// Excel 序列号日期基准（含 1900 闰年缺陷的等效基准）
const EXCEL_EPOCH: (i32, u32, u32) = (1899, 12, 30);
const EXCEL_MAX_SERIAL: f64 = 2_958_466.0;

const CURRENCY_SYMBOLS: &[char] = &['¥', '￥', '$', '€', '£'];

pub struct ValueConverter<'a> {
    settings: &'a ExchangeSettings,
    converters: &'a ConverterRegistry,
}

impl<'a> ValueConverter<'a> {
    pub fn new(settings: &'a ExchangeSettings, converters: &'a ConverterRegistry) -> Self {
        Self {
            settings,
            converters,
        }
    }

    // ==========================================
    // 导入方向
    // ==========================================

    /// 原始文本 -> 字段值
    ///
    /// # 返回
    /// - success=false 时 error 为面向用户的原因，value 为 Null
    /// - 修正/降级（零值、年份过早、日期修正）通过 warning 报告
    pub fn import_value(
        &self,
        raw: &str,
        field: &FieldConfiguration,
    ) -> ConversionResult {
        let trimmed = raw.trim();

        let text = if trimmed.is_empty() {
            match field.null_value.as_deref() {
                Some(replacement) if !replacement.trim().is_empty() => replacement.trim(),
                _ => return self.empty_value(field),
            }
        } else {
            trimmed
        };

        if let Some(name) = field.import_converter.as_deref() {
            return match self.converters.resolve_import(name) {
                Ok(converter) => match converter(text, field) {
                    Ok(value) => ConversionResult::ok(value),
                    Err(e) => ConversionResult::failed(format!("转换器 {} 失败: {}", name, e)),
                },
                Err(e) => ConversionResult::failed(e.to_string()),
            };
        }

        match &field.kind {
            ValueKind::Text => ConversionResult::ok(FieldValue::Text(text.to_string())),
            ValueKind::Integer => parse_integer(text),
            ValueKind::Decimal => parse_decimal(text),
            ValueKind::Boolean => self.parse_boolean(text, field),
            ValueKind::Date | ValueKind::DateTime => self.parse_temporal(text, field),
            ValueKind::Enum(literals) => parse_enum(text, literals, field),
            ValueKind::Reference(_) => ConversionResult::ok(FieldValue::Text(text.to_string())),
            ValueKind::Collection(_) => ConversionResult::failed("集合字段不能从单元格导入"),
        }
    }

    /// 空单元格: 可空/时间/引用 -> Null；值类型 -> 零值 + 警告；文本 -> ""
    fn empty_value(&self, field: &FieldConfiguration) -> ConversionResult {
        if field.nullable {
            return ConversionResult::ok(FieldValue::Null);
        }

        match &field.kind {
            ValueKind::Text => ConversionResult::ok(FieldValue::Text(String::new())),
            ValueKind::Reference(_) | ValueKind::Collection(_) => {
                ConversionResult::ok(FieldValue::Null)
            }
            ValueKind::Date | ValueKind::DateTime => {
                ConversionResult::ok_with_warning(FieldValue::Null, "日期为空，按缺失处理")
            }
            ValueKind::Integer => ConversionResult::ok_with_warning(FieldValue::Integer(0), "值为空，使用 0"),
            ValueKind::Decimal => {
                ConversionResult::ok_with_warning(FieldValue::Decimal(0.0), "值为空，使用 0")
            }
            ValueKind::Boolean => {
                ConversionResult::ok_with_warning(FieldValue::Boolean(false), "值为空，使用 false")
            }
            ValueKind::Enum(literals) => match literals.first() {
                Some(first) => ConversionResult::ok_with_warning(
                    FieldValue::Enum(first.clone()),
                    format!("值为空，使用 {}", first),
                ),
                None => ConversionResult::ok(FieldValue::Null),
            },
        }
    }

    fn parse_boolean(
        &self,
        text: &str,
        field: &FieldConfiguration,
    ) -> ConversionResult {
        for (key, label) in field.display_map() {
            if label.eq_ignore_ascii_case(text) || key.eq_ignore_ascii_case(text) {
                if let Some(value) = boolean_literal(&key) {
                    return ConversionResult::ok(FieldValue::Boolean(value));
                }
            }
        }

        if text == self.settings.bool_true_display {
            return ConversionResult::ok(FieldValue::Boolean(true));
        }
        if text == self.settings.bool_false_display {
            return ConversionResult::ok(FieldValue::Boolean(false));
        }

        match boolean_literal(text) {
            Some(value) => ConversionResult::ok(FieldValue::Boolean(value)),
            None => ConversionResult::failed(format!("无法识别的布尔值: {}", text)),
        }
    }

    fn parse_temporal(
        &self,
        text: &str,
        field: &FieldConfiguration,
    ) -> ConversionResult {
        let mut warning = None;

        let parsed = match datetime_corrector::correct(text) {
            DateCorrection::Absent => return ConversionResult::ok(FieldValue::Null),
            DateCorrection::Parsed {
                value, adjustments, ..
            } => {
                if !adjustments.is_empty() {
                    warning = Some(format!("日期已修正: {}", adjustments.join("; ")));
                }
                Some(value)
            }
            DateCorrection::NotApplicable => None,
        };

        let parsed = parsed
            .or_else(|| {
                field
                    .format
                    .as_deref()
                    .filter(|f| !f.contains('='))
                    .and_then(|f| parse_with_format(text, &translate_format(f)))
            })
            .or_else(|| parse_with_patterns(text))
            .or_else(|| {
                DateTime::parse_from_rfc3339(text)
                    .ok()
                    .map(|dt| dt.naive_local())
            })
            .or_else(|| parse_excel_serial(text));

        let Some(value) = parsed else {
            return ConversionResult::failed(format!("无法识别的日期: {}", text));
        };

        if value.year() <= 1 || value.year() < self.settings.min_valid_year {
            return ConversionResult::ok_with_warning(
                FieldValue::Null,
                format!(
                    "年份 {} 早于 {}，按缺失处理",
                    value.year(),
                    self.settings.min_valid_year
                ),
            )
            .prepend_warning(warning);
        }

        let value = match field.kind {
            ValueKind::Date => FieldValue::Date(value.date()),
            _ => FieldValue::DateTime(value),
        };

        match warning {
            Some(w) => ConversionResult::ok_with_warning(value, w),
            None => ConversionResult::ok(value),
        }
    }

    // ==========================================
    // 导出方向
    // ==========================================

    /// 字段值 -> 单元格文本
    ///
    /// 引用与集合只给出基础表示，导出编排器会按存储内容替换
    pub fn export_value(
        &self,
        value: &FieldValue,
        field: &FieldConfiguration,
    ) -> ExchangeResult<String> {
        if let Some(name) = field.export_converter.as_deref() {
            let converter = self.converters.resolve_export(name)?;
            return converter(value, field).map_err(|e| ExchangeError::Conversion {
                field: field.property.clone(),
                message: e.to_string(),
            });
        }

        let format = field.format.as_deref().filter(|f| !f.trim().is_empty());

        let text = match value {
            FieldValue::Null => String::new(),
            FieldValue::Text(s) => s.clone(),
            FieldValue::Integer(v) => match format.and_then(|f| format_number(*v as f64, f)) {
                Some(s) => s,
                None => v.to_string(),
            },
            FieldValue::Decimal(v) => match format.and_then(|f| format_number(*v, f)) {
                Some(s) => s,
                None => v.to_string(),
            },
            FieldValue::Boolean(v) => self.boolean_display(*v, field),
            FieldValue::Date(d) => {
                let pattern = format
                    .filter(|f| !f.contains('='))
                    .map(translate_format)
                    .unwrap_or_else(|| DEFAULT_DATE_FORMAT.to_string());
                format_temporal(&d.and_time(NaiveTime::MIN), &pattern, field)?
            }
            FieldValue::DateTime(dt) => {
                let pattern = format
                    .filter(|f| !f.contains('='))
                    .map(translate_format)
                    .unwrap_or_else(|| DEFAULT_DATETIME_FORMAT.to_string());
                format_temporal(dt, &pattern, field)?
            }
            FieldValue::Enum(key) => field
                .display_map()
                .into_iter()
                .find(|(k, _)| k.eq_ignore_ascii_case(key))
                .map(|(_, label)| label)
                .unwrap_or_else(|| key.clone()),
            FieldValue::Reference(id) => id.to_string(),
            FieldValue::Collection(ids) => ids.len().to_string(),
        };

        Ok(text)
    }

    fn boolean_display(
        &self,
        value: bool,
        field: &FieldConfiguration,
    ) -> String {
        field
            .display_map()
            .into_iter()
            .find(|(key, _)| boolean_literal(key) == Some(value))
            .map(|(_, label)| label)
            .unwrap_or_else(|| {
                if value {
                    self.settings.bool_true_display.clone()
                } else {
                    self.settings.bool_false_display.clone()
                }
            })
    }
}

// ==========================================
// 数值
// ==========================================

fn clean_number(text: &str) -> String {
    text.chars()
        .filter(|c| !c.is_whitespace() && *c != ',' && *c != '，' && !CURRENCY_SYMBOLS.contains(c))
        .collect()
}

fn parse_integer(text: &str) -> ConversionResult {
    let cleaned = clean_number(text);

    if let Ok(v) = cleaned.parse::<i64>() {
        return ConversionResult::ok(FieldValue::Integer(v));
    }

    // 表格单元格常以浮点形式给出整数（如 "3.0"）
    match cleaned.parse::<f64>() {
        Ok(v) if v.is_finite() && v.fract() == 0.0 && v.abs() < i64::MAX as f64 => {
            ConversionResult::ok(FieldValue::Integer(v as i64))
        }
        Ok(v) if v.is_finite() => ConversionResult::failed(format!("需要整数，实际为 {}", text)),
        _ => ConversionResult::failed(format!("无法识别的整数: {}", text)),
    }
}

fn parse_decimal(text: &str) -> ConversionResult {
    let cleaned = clean_number(text);

    let (digits, scale) = match cleaned.strip_suffix('%') {
        Some(rest) => (rest, 100.0),
        None => (cleaned.as_str(), 1.0),
    };

    match digits.parse::<f64>() {
        Ok(v) if v.is_finite() => ConversionResult::ok(FieldValue::Decimal(v / scale)),
        _ => ConversionResult::failed(format!("无法识别的数值: {}", text)),
    }
}

/// 数值格式模式（0.00 / #,##0 / 0.0%）
fn is_number_pattern(pattern: &str) -> bool {
    !pattern.is_empty()
        && pattern.chars().all(|c| matches!(c, '0' | '#' | ',' | '.' | '%'))
        && pattern.chars().any(|c| c == '0' || c == '#')
}

pub fn format_number(value: f64, pattern: &str) -> Option<String> {
    let pattern = pattern.trim();
    if !is_number_pattern(pattern) {
        return None;
    }

    let percent = pattern.ends_with('%');
    let grouping = pattern.contains(',');
    let decimals = pattern
        .split_once('.')
        .map(|(_, frac)| frac.chars().filter(|c| *c == '0' || *c == '#').count())
        .unwrap_or(0);

    let value = if percent { value * 100.0 } else { value };
    let formatted = format!("{:.*}", decimals, value);

    let (sign, unsigned) = match formatted.strip_prefix('-') {
        Some(rest) => ("-", rest),
        None => ("", formatted.as_str()),
    };
    let (int_part, frac_part) = match unsigned.split_once('.') {
        Some((i, f)) => (i, Some(f)),
        None => (unsigned, None),
    };

    let int_part = if grouping {
        group_thousands(int_part)
    } else {
        int_part.to_string()
    };

    let mut out = format!("{}{}", sign, int_part);
    if let Some(frac) = frac_part {
        out.push('.');
        out.push_str(frac);
    }
    if percent {
        out.push('%');
    }
    Some(out)
}

fn group_thousands(digits: &str) -> String {
    let len = digits.len();
    let mut out = String::with_capacity(len + len / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (len - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}

// ==========================================
// 布尔 / 枚举
// ==========================================

fn boolean_literal(text: &str) -> Option<bool> {
    match text.trim().to_lowercase().as_str() {
        "true" | "1" | "是" | "yes" | "y" => Some(true),
        "false" | "0" | "否" | "no" | "n" => Some(false),
        _ => None,
    }
}

fn parse_enum(
    text: &str,
    literals: &[String],
    field: &FieldConfiguration,
) -> ConversionResult {
    let display_map = field.display_map();

    // 显示标签优先
    if let Some((key, _)) = display_map
        .iter()
        .find(|(_, label)| label.to_lowercase() == text.to_lowercase())
    {
        if let Some(literal) = literals.iter().find(|l| l.eq_ignore_ascii_case(key)) {
            return ConversionResult::ok(FieldValue::Enum(literal.clone()));
        }
    }

    if let Some(literal) = literals.iter().find(|l| l.to_lowercase() == text.to_lowercase()) {
        return ConversionResult::ok(FieldValue::Enum(literal.clone()));
    }

    let mut valid: Vec<String> = literals.to_vec();
    valid.extend(display_map.into_iter().map(|(_, label)| label));
    ConversionResult::failed(format!(
        "无法识别的枚举值: {}，有效值: {}",
        text,
        valid.join(", ")
    ))
}

// ==========================================
// 日期时间
// ==========================================

/// 将 yyyy-MM-dd HH:mm:ss 风格的格式翻译为 chrono 格式
///
/// 已含 '%' 的格式视为 chrono 格式原样返回
pub fn translate_format(format: &str) -> String {
    if format.contains('%') {
        return format.to_string();
    }

    let chars: Vec<char> = format.chars().collect();
    let mut out = String::with_capacity(format.len() * 2);
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        let mut run = 1;
        while i + run < chars.len() && chars[i + run] == c {
            run += 1;
        }

        let token = match (c, run) {
            ('y', 4) => Some("%Y"),
            ('y', 2) => Some("%y"),
            ('M', 2) => Some("%m"),
            ('M', 1) => Some("%-m"),
            ('M', 3) => Some("%b"),
            ('d', 2) => Some("%d"),
            ('d', 1) => Some("%-d"),
            ('H', 2) => Some("%H"),
            ('H', 1) => Some("%-H"),
            ('h', 2) => Some("%I"),
            ('h', 1) => Some("%-I"),
            ('m', 2) => Some("%M"),
            ('m', 1) => Some("%-M"),
            ('s', 2) => Some("%S"),
            ('s', 1) => Some("%-S"),
            ('f', 3) => Some("%3f"),
            ('t', 2) => Some("%p"),
            _ => None,
        };

        match token {
            Some(t) => out.push_str(t),
            None => {
                for _ in 0..run {
                    out.push(c);
                }
            }
        }
        i += run;
    }

    out
}

fn parse_with_format(text: &str, format: &str) -> Option<NaiveDateTime> {
    NaiveDateTime::parse_from_str(text, format)
        .ok()
        .or_else(|| {
            NaiveDate::parse_from_str(text, format)
                .ok()
                .map(|d| d.and_time(NaiveTime::MIN))
        })
}

fn parse_with_patterns(text: &str) -> Option<NaiveDateTime> {
    DATETIME_PATTERNS
        .iter()
        .find_map(|p| NaiveDateTime::parse_from_str(text, p).ok())
        .or_else(|| {
            DATE_PATTERNS
                .iter()
                .find_map(|p| NaiveDate::parse_from_str(text, p).ok())
                .map(|d| d.and_time(NaiveTime::MIN))
        })
}

fn parse_excel_serial(text: &str) -> Option<NaiveDateTime> {
    let serial = text.parse::<f64>().ok()?;
    if !(serial > 0.0 && serial < EXCEL_MAX_SERIAL) {
        return None;
    }

    let (y, m, d) = EXCEL_EPOCH;
    let epoch = NaiveDate::from_ymd_opt(y, m, d)?.and_time(NaiveTime::MIN);
    let days = serial.trunc() as i64;
    let seconds = ((serial - serial.trunc()) * 86_400.0).round() as i64;

    epoch
        .checked_add_signed(Duration::days(days))?
        .checked_add_signed(Duration::seconds(seconds))
}

fn format_temporal(
    value: &NaiveDateTime,
    pattern: &str,
    field: &FieldConfiguration,
) -> ExchangeResult<String> {
    let mut out = String::new();
    write!(out, "{}", value.format(pattern)).map_err(|_| ExchangeError::Conversion {
        field: field.property.clone(),
        message: format!("无效的日期格式: {}", pattern),
    })?;
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gender_field() -> FieldConfiguration {
        FieldConfiguration::new(
            "gender",
            ValueKind::Enum(vec!["Male".to_string(), "Female".to_string()]),
        )
        .format("Male=男;Female=女")
    }

    fn with_converter<T>(f: impl FnOnce(&ValueConverter) -> T) -> T {
        let settings = ExchangeSettings::default();
        let converters = ConverterRegistry::new();
        let converter = ValueConverter::new(&settings, &converters);
        f(&converter)
    }

    #[test]
    fn test_enum_label_and_literal() {
        with_converter(|c| {
            let field = gender_field();
            assert_eq!(
                c.import_value("女", &field).value,
                FieldValue::Enum("Female".to_string())
            );
            assert_eq!(
                c.import_value("female", &field).value,
                FieldValue::Enum("Female".to_string())
            );
            assert_eq!(
                c.export_value(&FieldValue::Enum("Female".to_string()), &field)
                    .unwrap(),
                "女"
            );

            let bad = c.import_value("未知", &field);
            assert!(!bad.success);
            assert!(bad.error.unwrap().contains("Female"));
        });
    }

    #[test]
    fn test_empty_values() {
        with_converter(|c| {
            let count = FieldConfiguration::new("count", ValueKind::Integer);
            let result = c.import_value("  ", &count);
            assert!(result.success);
            assert_eq!(result.value, FieldValue::Integer(0));
            assert!(result.has_warning());

            let optional = FieldConfiguration::new("count", ValueKind::Integer).nullable();
            assert_eq!(c.import_value("", &optional).value, FieldValue::Null);

            let name = FieldConfiguration::new("name", ValueKind::Text);
            assert_eq!(
                c.import_value("", &name).value,
                FieldValue::Text(String::new())
            );

            let status = FieldConfiguration::new("status", ValueKind::Text).null_value("在职");
            assert_eq!(
                c.import_value("", &status).value,
                FieldValue::Text("在职".to_string())
            );
        });
    }

    #[test]
    fn test_numbers() {
        with_converter(|c| {
            let amount = FieldConfiguration::new("amount", ValueKind::Decimal).format("#,##0.00");
            assert_eq!(
                c.import_value("¥1,234.50", &amount).value,
                FieldValue::Decimal(1234.5)
            );
            assert_eq!(
                c.export_value(&FieldValue::Decimal(1234.5), &amount).unwrap(),
                "1,234.50"
            );

            let rate = FieldConfiguration::new("rate", ValueKind::Decimal).format("0.0%");
            assert_eq!(c.import_value("12.5%", &rate).value, FieldValue::Decimal(0.125));
            assert_eq!(c.export_value(&FieldValue::Decimal(0.125), &rate).unwrap(), "12.5%");

            let qty = FieldConfiguration::new("qty", ValueKind::Integer);
            assert_eq!(c.import_value("3.0", &qty).value, FieldValue::Integer(3));
            assert!(!c.import_value("3.5", &qty).success);
        });
    }

    #[test]
    fn test_booleans() {
        with_converter(|c| {
            let active = FieldConfiguration::new("active", ValueKind::Boolean);
            for raw in ["是", "TRUE", "1", "Yes"] {
                assert_eq!(c.import_value(raw, &active).value, FieldValue::Boolean(true));
            }
            assert_eq!(c.import_value("否", &active).value, FieldValue::Boolean(false));
            assert!(!c.import_value("maybe", &active).success);
            assert_eq!(c.export_value(&FieldValue::Boolean(true), &active).unwrap(), "是");

            let custom = FieldConfiguration::new("active", ValueKind::Boolean)
                .format("true=启用;false=停用");
            assert_eq!(c.import_value("停用", &custom).value, FieldValue::Boolean(false));
            assert_eq!(c.export_value(&FieldValue::Boolean(true), &custom).unwrap(), "启用");
        });
    }

    #[test]
    fn test_dates() {
        with_converter(|c| {
            let hired = FieldConfiguration::new("hired", ValueKind::Date);
            assert_eq!(
                c.import_value("2024/03/05", &hired).value,
                FieldValue::Date(NaiveDate::from_ymd_opt(2024, 3, 5).unwrap())
            );
            assert_eq!(
                c.import_value("45356", &hired).value,
                FieldValue::Date(NaiveDate::from_ymd_opt(2024, 3, 5).unwrap())
            );

            let corrected = c.import_value("2023-02-30", &hired);
            assert_eq!(
                corrected.value,
                FieldValue::Date(NaiveDate::from_ymd_opt(2023, 2, 28).unwrap())
            );
            assert!(corrected.has_warning());

            let ancient = c.import_value("1800-01-01", &hired);
            assert!(ancient.success);
            assert_eq!(ancient.value, FieldValue::Null);

            assert_eq!(c.import_value("0000-00-00", &hired).value, FieldValue::Null);
            assert!(!c.import_value("下周一", &hired).success);
        });
    }

    #[test]
    fn test_configured_date_format() {
        with_converter(|c| {
            let field = FieldConfiguration::new("hired", ValueKind::Date).format("dd.MM.yyyy");
            let date = NaiveDate::from_ymd_opt(2024, 3, 5).unwrap();

            assert_eq!(c.import_value("05.03.2024", &field).value, FieldValue::Date(date));
            assert_eq!(c.export_value(&FieldValue::Date(date), &field).unwrap(), "05.03.2024");

            let stamp = FieldConfiguration::new("at", ValueKind::DateTime);
            let value = NaiveDate::from_ymd_opt(2024, 1, 2)
                .unwrap()
                .and_hms_opt(0, 0, 0)
                .unwrap();
            assert_eq!(
                c.import_value("2024-01-01 23:59:60", &stamp).value,
                FieldValue::DateTime(value)
            );
        });
    }

    #[test]
    fn test_translate_format() {
        assert_eq!(translate_format("yyyy-MM-dd HH:mm:ss"), "%Y-%m-%d %H:%M:%S");
        assert_eq!(translate_format("yyyy年M月d日"), "%Y年%-m月%-d日");
        assert_eq!(translate_format("%d/%m/%Y"), "%d/%m/%Y");
    }

    #[test]
    fn test_custom_converter() {
        let settings = ExchangeSettings::default();
        let mut converters = ConverterRegistry::new();
        converters.register_import("upper", |raw: &str, _f: &FieldConfiguration| {
            Ok(FieldValue::Text(raw.to_uppercase()))
        });
        let converter = ValueConverter::new(&settings, &converters);

        let field = FieldConfiguration::new("code", ValueKind::Text).import_converter("upper");
        assert_eq!(
            converter.import_value("e100", &field).value,
            FieldValue::Text("E100".to_string())
        );

        let missing = FieldConfiguration::new("code", ValueKind::Text).import_converter("lower");
        let result = converter.import_value("E100", &missing);
        assert!(!result.success);
    }
}
