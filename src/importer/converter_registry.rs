// ==========================================
// 表格数据交换引擎 - 自定义转换器注册表
// ==========================================
// 职责: 名称 -> 转换函数，启动时注册，字段配置按名称引用
// 失败: 未注册的名称是转换错误（记入行错误），不会 panic
// ==========================================

use crate::domain::value::FieldValue;
use crate::error::{ExchangeError, ExchangeResult};
use crate::schema::field_config::FieldConfiguration;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// 导入转换: 原始文本 -> 字段值
pub type ImportConverterFn =
    Arc<dyn Fn(&str, &FieldConfiguration) -> anyhow::Result<FieldValue> + Send + Sync>;

/// 导出转换: 字段值 -> 单元格文本
pub type ExportConverterFn =
    Arc<dyn Fn(&FieldValue, &FieldConfiguration) -> anyhow::Result<String> + Send + Sync>;

#[derive(Default, Clone)]
pub struct ConverterRegistry {
    import: HashMap<String, ImportConverterFn>,
    export: HashMap<String, ExportConverterFn>,
}

impl ConverterRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_import<F>(&mut self, name: impl Into<String>, converter: F)
    where
        F: Fn(&str, &FieldConfiguration) -> anyhow::Result<FieldValue> + Send + Sync + 'static,
    {
        self.import.insert(name.into(), Arc::new(converter));
    }

    pub fn register_export<F>(&mut self, name: impl Into<String>, converter: F)
    where
        F: Fn(&FieldValue, &FieldConfiguration) -> anyhow::Result<String> + Send + Sync + 'static,
    {
        self.export.insert(name.into(), Arc::new(converter));
    }

    pub fn resolve_import(&self, name: &str) -> ExchangeResult<ImportConverterFn> {
        self.import
            .get(name)
            .cloned()
            .ok_or_else(|| ExchangeError::ConverterNotFound(name.to_string()))
    }

    pub fn resolve_export(&self, name: &str) -> ExchangeResult<ExportConverterFn> {
        self.export
            .get(name)
            .cloned()
            .ok_or_else(|| ExchangeError::ConverterNotFound(name.to_string()))
    }

    pub fn has_import(&self, name: &str) -> bool {
        self.import.contains_key(name)
    }
}

impl fmt::Debug for ConverterRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut import: Vec<&String> = self.import.keys().collect();
        let mut export: Vec<&String> = self.export.keys().collect();
        import.sort();
        export.sort();
        f.debug_struct("ConverterRegistry")
            .field("import", &import)
            .field("export", &export)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::types::ValueKind;

    #[test]
    fn test_register_and_resolve() {
        let mut registry = ConverterRegistry::new();
        registry.register_import("upper", |raw: &str, _field: &FieldConfiguration| {
            Ok(FieldValue::Text(raw.to_uppercase()))
        });

        let field = FieldConfiguration::new("code", ValueKind::Text);
        let converter = registry.resolve_import("upper").unwrap();
        assert_eq!(
            converter("e100", &field).unwrap(),
            FieldValue::Text("E100".to_string())
        );

        assert!(matches!(
            registry.resolve_export("upper"),
            Err(ExchangeError::ConverterNotFound(_))
        ));
    }
}
